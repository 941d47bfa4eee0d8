use chrono::Utc;
use serde::Deserialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::database::models::{Reply, Topic};
use crate::database::{Page, PageRequest, Repository};
use crate::error::ApiError;
use crate::middleware::Principal;
use crate::services::{ensure_owner, required_text, CreatedRange};

const SORTABLE: &[&str] = &["created_at", "updated_at"];

#[derive(Debug, Deserialize)]
pub struct ReplyCreate {
    pub body: String,
    /// Reply being answered, within the same topic
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct ReplyUpdate {
    pub body: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReplySearch {
    pub search: Option<String>,
    pub author_id: Option<Uuid>,
    pub parent_id: Option<Uuid>,
    /// Only top-level entries (`true`) or only answers (`false`)
    pub root_only: Option<bool>,
    #[serde(flatten)]
    pub created: CreatedRange,
    pub sort: Option<String>,
    #[serde(flatten)]
    pub page: PageRequest,
}

pub async fn search(pool: &SqlitePool, topic_id: Uuid, input: ReplySearch) -> Result<Page<Reply>, ApiError> {
    let window = input.page.resolve()?;
    Repository::<Topic>::new(pool).find_404(topic_id).await?;

    let repo = Repository::<Reply>::new(pool);
    let mut filter = repo.filter()?;
    filter
        .eq("topic_id", topic_id)
        .eq_opt("author_id", input.author_id)
        .eq_opt("parent_id", input.parent_id)
        .null_opt("parent_id", input.root_only)
        .contains_opt(&["body"], input.search.as_deref());
    input.created.apply(&mut filter);
    filter.order(input.sort.as_deref(), SORTABLE, "created_at asc")?;

    Ok(repo.paginate(filter, window).await?)
}

/// A reply addressed through its topic; a reply under another topic is
/// reported as missing.
pub async fn get(pool: &SqlitePool, topic_id: Uuid, id: Uuid) -> Result<Reply, ApiError> {
    Repository::<Topic>::new(pool).find_404(topic_id).await?;
    Repository::<Reply>::new(pool)
        .find(id)
        .await?
        .filter(|reply| reply.topic_id == topic_id)
        .ok_or_else(|| ApiError::not_found("Reply not found"))
}

pub async fn create(pool: &SqlitePool, author: &Principal, topic_id: Uuid, input: ReplyCreate) -> Result<Reply, ApiError> {
    let topic = Repository::<Topic>::new(pool).find_404(topic_id).await?;
    if !topic.status.accepts_replies() {
        return Err(ApiError::bad_request("Topic is closed to new replies"));
    }

    if let Some(parent_id) = input.parent_id {
        let parent = Repository::<Reply>::new(pool)
            .find(parent_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Parent reply not found"))?;
        if parent.topic_id != topic.id {
            return Err(ApiError::invalid_field("parent_id", "Parent reply belongs to a different topic"));
        }
    }

    let now = Utc::now();
    let reply = Reply {
        id: Uuid::new_v4(),
        topic_id: topic.id,
        author_id: author.id,
        parent_id: input.parent_id,
        body: required_text("body", &input.body, 20_000)?,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    };

    sqlx::query(
        "INSERT INTO board_replies (id, topic_id, author_id, parent_id, body, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
    )
    .bind(reply.id)
    .bind(reply.topic_id)
    .bind(reply.author_id)
    .bind(reply.parent_id)
    .bind(&reply.body)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(reply)
}

pub async fn update(
    pool: &SqlitePool,
    author: &Principal,
    topic_id: Uuid,
    id: Uuid,
    input: ReplyUpdate,
) -> Result<Reply, ApiError> {
    let mut reply = get(pool, topic_id, id).await?;
    ensure_owner(reply.author_id, author, "reply")?;

    reply.body = required_text("body", &input.body, 20_000)?;
    reply.updated_at = Utc::now();

    sqlx::query("UPDATE board_replies SET body = ?1, updated_at = ?2 WHERE id = ?3")
        .bind(&reply.body)
        .bind(reply.updated_at)
        .bind(reply.id)
        .execute(pool)
        .await?;
    Ok(reply)
}

pub async fn remove(pool: &SqlitePool, author: &Principal, topic_id: Uuid, id: Uuid) -> Result<(), ApiError> {
    let reply = get(pool, topic_id, id).await?;
    ensure_owner(reply.author_id, author, "reply")?;
    Repository::<Reply>::new(pool).soft_delete(id).await?;
    Ok(())
}
