use chrono::Utc;
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::database::models::Community;
use crate::database::{Page, PageRequest, Repository};
use crate::error::ApiError;
use crate::middleware::Principal;
use crate::services::{ensure_owner, optional_text, required_text, CreatedRange};

const SORTABLE: &[&str] = &["created_at", "name", "title"];

#[derive(Debug, Deserialize)]
pub struct CommunityCreate {
    /// URL name, e.g. `rust_lang`
    pub name: String,
    pub title: String,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CommunityUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CommunitySearch {
    /// Substring of name, title or description
    pub search: Option<String>,
    pub creator_id: Option<Uuid>,
    #[serde(flatten)]
    pub created: CreatedRange,
    pub sort: Option<String>,
    #[serde(flatten)]
    pub page: PageRequest,
}

pub async fn search(pool: &SqlitePool, input: CommunitySearch) -> Result<Page<Community>, ApiError> {
    let window = input.page.resolve()?;
    let repo = Repository::<Community>::new(pool);

    let mut filter = repo.filter()?;
    filter
        .eq_opt("creator_id", input.creator_id)
        .contains_opt(&["name", "title", "description"], input.search.as_deref());
    input.created.apply(&mut filter);
    filter.order(input.sort.as_deref(), SORTABLE, "name asc")?;

    Ok(repo.paginate(filter, window).await?)
}

pub async fn get(pool: &SqlitePool, id: Uuid) -> Result<Community, ApiError> {
    Ok(Repository::<Community>::new(pool).find_404(id).await?)
}

pub async fn create(pool: &SqlitePool, creator: &Principal, input: CommunityCreate) -> Result<Community, ApiError> {
    let now = Utc::now();
    let community = Community {
        id: Uuid::new_v4(),
        name: validate_name(&input.name)?,
        title: required_text("title", &input.title, 100)?,
        description: optional_text("description", input.description.as_deref(), 2_000)?,
        creator_id: creator.id,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    };

    sqlx::query(
        "INSERT INTO community_communities (id, name, title, description, creator_id, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
    )
    .bind(community.id)
    .bind(&community.name)
    .bind(&community.title)
    .bind(&community.description)
    .bind(community.creator_id)
    .bind(now)
    .execute(pool)
    .await?;

    info!("Member '{}' created community '{}'", creator.username, community.name);
    Ok(community)
}

pub async fn update(pool: &SqlitePool, creator: &Principal, id: Uuid, input: CommunityUpdate) -> Result<Community, ApiError> {
    let mut community = get(pool, id).await?;
    ensure_owner(community.creator_id, creator, "community")?;

    if let Some(title) = input.title.as_deref() {
        community.title = required_text("title", title, 100)?;
    }
    if input.description.is_some() {
        community.description = optional_text("description", input.description.as_deref(), 2_000)?;
    }
    community.updated_at = Utc::now();

    sqlx::query("UPDATE community_communities SET title = ?1, description = ?2, updated_at = ?3 WHERE id = ?4")
        .bind(&community.title)
        .bind(&community.description)
        .bind(community.updated_at)
        .bind(community.id)
        .execute(pool)
        .await?;
    Ok(community)
}

pub async fn remove(pool: &SqlitePool, admin: &Principal, id: Uuid) -> Result<(), ApiError> {
    Repository::<Community>::new(pool).soft_delete(id).await?;
    info!("Admin '{}' removed community {}", admin.username, id);
    Ok(())
}

fn validate_name(name: &str) -> Result<String, ApiError> {
    let name = name.trim();
    let valid = (3..=32).contains(&name.len())
        && name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-');
    if !valid {
        return Err(ApiError::invalid_field(
            "name",
            "name must be 3 to 32 lowercase letters, digits, '_' or '-'",
        ));
    }
    Ok(name.to_string())
}
