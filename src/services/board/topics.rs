use chrono::Utc;
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::database::models::{Topic, TopicStatus};
use crate::database::{Page, PageRequest, Repository};
use crate::error::ApiError;
use crate::middleware::Principal;
use crate::services::{ensure_owner, required_text, CreatedRange};

const SORTABLE: &[&str] = &["created_at", "updated_at", "title", "category", "status"];

#[derive(Debug, Deserialize)]
pub struct TopicCreate {
    pub title: String,
    pub body: String,
    pub category: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct TopicUpdate {
    pub title: Option<String>,
    pub body: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TopicStatusUpdate {
    pub status: TopicStatus,
}

#[derive(Debug, Default, Deserialize)]
pub struct TopicSearch {
    /// Substring of title or body
    pub search: Option<String>,
    pub category: Option<String>,
    pub status: Option<TopicStatus>,
    pub author_id: Option<Uuid>,
    #[serde(flatten)]
    pub created: CreatedRange,
    pub sort: Option<String>,
    #[serde(flatten)]
    pub page: PageRequest,
}

pub async fn search(pool: &SqlitePool, input: TopicSearch) -> Result<Page<Topic>, ApiError> {
    let window = input.page.resolve()?;
    let repo = Repository::<Topic>::new(pool);

    let mut filter = repo.filter()?;
    filter
        .eq_opt("category", input.category)
        .eq_opt("status", input.status)
        .eq_opt("author_id", input.author_id)
        .contains_opt(&["title", "body"], input.search.as_deref());
    input.created.apply(&mut filter);
    filter.order(input.sort.as_deref(), SORTABLE, "created_at desc")?;

    Ok(repo.paginate(filter, window).await?)
}

pub async fn get(pool: &SqlitePool, id: Uuid) -> Result<Topic, ApiError> {
    Ok(Repository::<Topic>::new(pool).find_404(id).await?)
}

pub async fn create(pool: &SqlitePool, author: &Principal, input: TopicCreate) -> Result<Topic, ApiError> {
    let now = Utc::now();
    let topic = Topic {
        id: Uuid::new_v4(),
        author_id: author.id,
        title: required_text("title", &input.title, 200)?,
        body: required_text("body", &input.body, 20_000)?,
        category: required_text("category", &input.category, 64)?,
        status: TopicStatus::Open,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    };

    sqlx::query(
        "INSERT INTO board_topics (id, author_id, title, body, category, status, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
    )
    .bind(topic.id)
    .bind(topic.author_id)
    .bind(&topic.title)
    .bind(&topic.body)
    .bind(&topic.category)
    .bind(topic.status)
    .bind(now)
    .execute(pool)
    .await?;

    info!("Member '{}' opened topic {}", author.username, topic.id);
    Ok(topic)
}

pub async fn update(pool: &SqlitePool, author: &Principal, id: Uuid, input: TopicUpdate) -> Result<Topic, ApiError> {
    let mut topic = get(pool, id).await?;
    ensure_owner(topic.author_id, author, "topic")?;

    if let Some(title) = input.title.as_deref() {
        topic.title = required_text("title", title, 200)?;
    }
    if let Some(body) = input.body.as_deref() {
        topic.body = required_text("body", body, 20_000)?;
    }
    if let Some(category) = input.category.as_deref() {
        topic.category = required_text("category", category, 64)?;
    }
    topic.updated_at = Utc::now();

    sqlx::query("UPDATE board_topics SET title = ?1, body = ?2, category = ?3, updated_at = ?4 WHERE id = ?5")
        .bind(&topic.title)
        .bind(&topic.body)
        .bind(&topic.category)
        .bind(topic.updated_at)
        .bind(topic.id)
        .execute(pool)
        .await?;
    Ok(topic)
}

/// Author withdraws their own topic (soft delete).
pub async fn remove(pool: &SqlitePool, author: &Principal, id: Uuid) -> Result<(), ApiError> {
    let topic = get(pool, id).await?;
    ensure_owner(topic.author_id, author, "topic")?;
    Repository::<Topic>::new(pool).soft_delete(id).await?;
    Ok(())
}

pub async fn set_status(
    pool: &SqlitePool,
    staff: &Principal,
    id: Uuid,
    input: TopicStatusUpdate,
) -> Result<Topic, ApiError> {
    let mut topic = get(pool, id).await?;
    topic.status = input.status;
    topic.updated_at = Utc::now();

    sqlx::query("UPDATE board_topics SET status = ?1, updated_at = ?2 WHERE id = ?3")
        .bind(topic.status)
        .bind(topic.updated_at)
        .bind(topic.id)
        .execute(pool)
        .await?;

    info!("{} '{}' set topic {} to {}", staff.role, staff.username, topic.id, topic.status);
    Ok(topic)
}

/// Permanently delete a topic, including soft-deleted ones. Replies go
/// with it.
pub async fn erase(pool: &SqlitePool, admin: &Principal, id: Uuid) -> Result<(), ApiError> {
    Repository::<Topic>::new(pool).hard_delete(id).await?;
    info!("Admin '{}' erased topic {}", admin.username, id);
    Ok(())
}
