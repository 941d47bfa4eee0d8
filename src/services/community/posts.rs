use chrono::Utc;
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::database::models::{Community, Post};
use crate::database::{find_in_404, Page, PageRequest, Repository};
use crate::error::ApiError;
use crate::middleware::Principal;
use crate::services::{ensure_owner, required_text, CreatedRange};

const SORTABLE: &[&str] = &["created_at", "updated_at", "score", "title"];

#[derive(Debug, Deserialize)]
pub struct PostCreate {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct PostUpdate {
    pub title: Option<String>,
    pub body: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    /// -1 down, 1 up, 0 withdraws the vote
    pub value: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct PostSearch {
    pub search: Option<String>,
    pub author_id: Option<Uuid>,
    pub min_score: Option<i64>,
    #[serde(flatten)]
    pub created: CreatedRange,
    pub sort: Option<String>,
    #[serde(flatten)]
    pub page: PageRequest,
}

pub async fn search(pool: &SqlitePool, community_id: Uuid, input: PostSearch) -> Result<Page<Post>, ApiError> {
    let window = input.page.resolve()?;
    Repository::<Community>::new(pool).find_404(community_id).await?;

    let repo = Repository::<Post>::new(pool);
    let mut filter = repo.filter()?;
    filter
        .eq("community_id", community_id)
        .eq_opt("author_id", input.author_id)
        .gte_opt("score", input.min_score)
        .contains_opt(&["title", "body"], input.search.as_deref());
    input.created.apply(&mut filter);
    filter.order(input.sort.as_deref(), SORTABLE, "created_at desc")?;

    Ok(repo.paginate(filter, window).await?)
}

pub async fn get(pool: &SqlitePool, id: Uuid) -> Result<Post, ApiError> {
    Ok(Repository::<Post>::new(pool).find_404(id).await?)
}

pub async fn create(pool: &SqlitePool, author: &Principal, community_id: Uuid, input: PostCreate) -> Result<Post, ApiError> {
    let community = Repository::<Community>::new(pool).find_404(community_id).await?;

    let now = Utc::now();
    let post = Post {
        id: Uuid::new_v4(),
        community_id: community.id,
        author_id: author.id,
        title: required_text("title", &input.title, 300)?,
        body: required_text("body", &input.body, 40_000)?,
        score: 0,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    };

    sqlx::query(
        "INSERT INTO community_posts (id, community_id, author_id, title, body, score, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?6)",
    )
    .bind(post.id)
    .bind(post.community_id)
    .bind(post.author_id)
    .bind(&post.title)
    .bind(&post.body)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(post)
}

pub async fn update(pool: &SqlitePool, author: &Principal, id: Uuid, input: PostUpdate) -> Result<Post, ApiError> {
    let mut post = get(pool, id).await?;
    ensure_owner(post.author_id, author, "post")?;

    if let Some(title) = input.title.as_deref() {
        post.title = required_text("title", title, 300)?;
    }
    if let Some(body) = input.body.as_deref() {
        post.body = required_text("body", body, 40_000)?;
    }
    post.updated_at = Utc::now();

    sqlx::query("UPDATE community_posts SET title = ?1, body = ?2, updated_at = ?3 WHERE id = ?4")
        .bind(&post.title)
        .bind(&post.body)
        .bind(post.updated_at)
        .bind(post.id)
        .execute(pool)
        .await?;
    Ok(post)
}

pub async fn remove(pool: &SqlitePool, author: &Principal, id: Uuid) -> Result<(), ApiError> {
    let post = get(pool, id).await?;
    ensure_owner(post.author_id, author, "post")?;
    Repository::<Post>::new(pool).soft_delete(id).await?;
    Ok(())
}

/// Staff removal, regardless of author.
pub async fn moderate_remove(pool: &SqlitePool, staff: &Principal, id: Uuid) -> Result<(), ApiError> {
    Repository::<Post>::new(pool).soft_delete(id).await?;
    info!("{} '{}' removed post {}", staff.role, staff.username, id);
    Ok(())
}

/// Cast, change or withdraw the caller's vote, then recompute the score
/// from all votes so it never drifts.
pub async fn vote(pool: &SqlitePool, voter: &Principal, id: Uuid, input: VoteRequest) -> Result<Post, ApiError> {
    if !matches!(input.value, -1..=1) {
        return Err(ApiError::invalid_field("value", "vote must be -1, 0 or 1"));
    }

    Repository::<Post>::new(pool).find_404(id).await?;

    // the vote write opens the transaction, which takes the write lock
    // before the score is read back
    let now = Utc::now();
    let mut tx = pool.begin().await?;

    if input.value == 0 {
        sqlx::query("DELETE FROM community_votes WHERE post_id = ?1 AND voter_id = ?2")
            .bind(id)
            .bind(voter.id)
            .execute(&mut *tx)
            .await?;
    } else {
        sqlx::query(
            "INSERT INTO community_votes (post_id, voter_id, value, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?4) \
             ON CONFLICT (post_id, voter_id) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(id)
        .bind(voter.id)
        .bind(input.value)
        .bind(now)
        .execute(&mut *tx)
        .await?;
    }

    sqlx::query(
        "UPDATE community_posts SET score = (SELECT COALESCE(SUM(value), 0) FROM community_votes WHERE post_id = ?1) \
         WHERE id = ?1",
    )
    .bind(id)
    .execute(&mut *tx)
    .await?;

    let post = find_in_404::<Post, _>(&mut *tx, id).await?;
    tx.commit().await?;
    Ok(post)
}
