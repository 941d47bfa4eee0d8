//! Table definitions, applied in order at startup. Every statement is
//! idempotent so the list can run against an existing database.
//!
//! Conventions: UUID keys are stored as BLOB, timestamps as TEXT (UTC),
//! enums as their snake_case names.

pub const STATEMENTS: &[&str] = &[
    // ---- accounts -------------------------------------------------------
    r#"CREATE TABLE IF NOT EXISTS accounts (
        id BLOB PRIMARY KEY NOT NULL,
        role TEXT NOT NULL,
        username TEXT NOT NULL,
        email TEXT NOT NULL,
        password_hash TEXT NOT NULL,
        display_name TEXT,
        is_active BOOLEAN NOT NULL DEFAULT 1,
        mfa_enabled BOOLEAN NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        deleted_at TEXT
    )"#,
    "CREATE UNIQUE INDEX IF NOT EXISTS accounts_role_username ON accounts (role, username)",
    "CREATE UNIQUE INDEX IF NOT EXISTS accounts_role_email ON accounts (role, email)",
    // ---- discussion board -----------------------------------------------
    r#"CREATE TABLE IF NOT EXISTS board_topics (
        id BLOB PRIMARY KEY NOT NULL,
        author_id BLOB NOT NULL REFERENCES accounts (id),
        title TEXT NOT NULL,
        body TEXT NOT NULL,
        category TEXT NOT NULL,
        status TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        deleted_at TEXT
    )"#,
    "CREATE INDEX IF NOT EXISTS board_topics_created_at ON board_topics (created_at)",
    r#"CREATE TABLE IF NOT EXISTS board_replies (
        id BLOB PRIMARY KEY NOT NULL,
        topic_id BLOB NOT NULL REFERENCES board_topics (id) ON DELETE CASCADE,
        author_id BLOB NOT NULL REFERENCES accounts (id),
        parent_id BLOB REFERENCES board_replies (id) ON DELETE CASCADE,
        body TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        deleted_at TEXT
    )"#,
    "CREATE INDEX IF NOT EXISTS board_replies_topic ON board_replies (topic_id, created_at)",
    r#"CREATE TABLE IF NOT EXISTS board_reports (
        id BLOB PRIMARY KEY NOT NULL,
        reporter_id BLOB NOT NULL REFERENCES accounts (id),
        target_type TEXT NOT NULL,
        target_id BLOB NOT NULL,
        reason TEXT NOT NULL,
        status TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS board_moderation_actions (
        id BLOB PRIMARY KEY NOT NULL,
        moderator_id BLOB NOT NULL REFERENCES accounts (id),
        report_id BLOB REFERENCES board_reports (id),
        target_type TEXT NOT NULL,
        target_id BLOB NOT NULL,
        action TEXT NOT NULL,
        reason TEXT NOT NULL,
        reverted_at TEXT,
        created_at TEXT NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS board_appeals (
        id BLOB PRIMARY KEY NOT NULL,
        appellant_id BLOB NOT NULL REFERENCES accounts (id),
        action_id BLOB NOT NULL REFERENCES board_moderation_actions (id),
        body TEXT NOT NULL,
        status TEXT NOT NULL,
        decided_by BLOB REFERENCES accounts (id),
        decided_at TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )"#,
    "CREATE UNIQUE INDEX IF NOT EXISTS board_appeals_one_pending ON board_appeals (action_id) WHERE status = 'pending'",
    // ---- community --------------------------------------------------------
    r#"CREATE TABLE IF NOT EXISTS community_communities (
        id BLOB PRIMARY KEY NOT NULL,
        name TEXT NOT NULL UNIQUE,
        title TEXT NOT NULL,
        description TEXT,
        creator_id BLOB NOT NULL REFERENCES accounts (id),
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        deleted_at TEXT
    )"#,
    r#"CREATE TABLE IF NOT EXISTS community_posts (
        id BLOB PRIMARY KEY NOT NULL,
        community_id BLOB NOT NULL REFERENCES community_communities (id),
        author_id BLOB NOT NULL REFERENCES accounts (id),
        title TEXT NOT NULL,
        body TEXT NOT NULL,
        score INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        deleted_at TEXT
    )"#,
    "CREATE INDEX IF NOT EXISTS community_posts_community ON community_posts (community_id, created_at)",
    r#"CREATE TABLE IF NOT EXISTS community_comments (
        id BLOB PRIMARY KEY NOT NULL,
        post_id BLOB NOT NULL REFERENCES community_posts (id) ON DELETE CASCADE,
        author_id BLOB NOT NULL REFERENCES accounts (id),
        parent_id BLOB REFERENCES community_comments (id) ON DELETE CASCADE,
        body TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        deleted_at TEXT
    )"#,
    r#"CREATE TABLE IF NOT EXISTS community_votes (
        post_id BLOB NOT NULL REFERENCES community_posts (id) ON DELETE CASCADE,
        voter_id BLOB NOT NULL REFERENCES accounts (id),
        value INTEGER NOT NULL CHECK (value IN (-1, 1)),
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        PRIMARY KEY (post_id, voter_id)
    )"#,
    // ---- marketplace ------------------------------------------------------
    r#"CREATE TABLE IF NOT EXISTS market_products (
        id BLOB PRIMARY KEY NOT NULL,
        seller_id BLOB NOT NULL REFERENCES accounts (id),
        name TEXT NOT NULL,
        description TEXT NOT NULL,
        category TEXT NOT NULL,
        price_cents INTEGER NOT NULL CHECK (price_cents >= 0),
        stock INTEGER NOT NULL CHECK (stock >= 0),
        status TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        deleted_at TEXT
    )"#,
    r#"CREATE TABLE IF NOT EXISTS market_orders (
        id BLOB PRIMARY KEY NOT NULL,
        customer_id BLOB NOT NULL REFERENCES accounts (id),
        seller_id BLOB NOT NULL REFERENCES accounts (id),
        product_id BLOB NOT NULL REFERENCES market_products (id),
        quantity INTEGER NOT NULL CHECK (quantity > 0),
        unit_price_cents INTEGER NOT NULL,
        total_cents INTEGER NOT NULL,
        status TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS market_reviews (
        id BLOB PRIMARY KEY NOT NULL,
        product_id BLOB NOT NULL REFERENCES market_products (id),
        customer_id BLOB NOT NULL REFERENCES accounts (id),
        rating INTEGER NOT NULL CHECK (rating BETWEEN 1 AND 5),
        body TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        deleted_at TEXT
    )"#,
    "CREATE UNIQUE INDEX IF NOT EXISTS market_reviews_one_per_customer ON market_reviews (product_id, customer_id) WHERE deleted_at IS NULL",
    r#"CREATE TABLE IF NOT EXISTS market_shipments (
        id BLOB PRIMARY KEY NOT NULL,
        order_id BLOB NOT NULL UNIQUE REFERENCES market_orders (id),
        seller_id BLOB NOT NULL REFERENCES accounts (id),
        carrier TEXT NOT NULL,
        tracking_number TEXT NOT NULL,
        status TEXT NOT NULL,
        shipped_at TEXT NOT NULL,
        delivered_at TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )"#,
    // ---- todo list --------------------------------------------------------
    r#"CREATE TABLE IF NOT EXISTS todo_todos (
        id BLOB PRIMARY KEY NOT NULL,
        owner_id BLOB NOT NULL REFERENCES accounts (id) ON DELETE CASCADE,
        title TEXT NOT NULL,
        description TEXT,
        is_completed BOOLEAN NOT NULL DEFAULT 0,
        due_at TEXT,
        completed_at TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )"#,
    "CREATE INDEX IF NOT EXISTS todo_todos_owner ON todo_todos (owner_id, created_at)",
];
