use chrono::Utc;
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::database::models::{Appeal, AppealStatus, ModerationAction, ModerationKind};
use crate::database::{find_in_404, Page, PageRequest, Repository};
use crate::error::ApiError;
use crate::middleware::Principal;
use crate::services::{required_text, CreatedRange};

use super::moderation::{set_content_removed, set_member_active, target_owner};

const SORTABLE: &[&str] = &["created_at", "updated_at", "status"];

#[derive(Debug, Deserialize)]
pub struct AppealCreate {
    pub action_id: Uuid,
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct AppealDecision {
    pub status: AppealStatus,
}

#[derive(Debug, Default, Deserialize)]
pub struct AppealSearch {
    pub status: Option<AppealStatus>,
    pub action_id: Option<Uuid>,
    /// Ignored on the member route, which only lists the caller's appeals
    pub appellant_id: Option<Uuid>,
    #[serde(flatten)]
    pub created: CreatedRange,
    pub sort: Option<String>,
    #[serde(flatten)]
    pub page: PageRequest,
}

/// File an appeal against an action that targeted the caller or the
/// caller's content. One pending appeal per action.
pub async fn create(pool: &SqlitePool, appellant: &Principal, input: AppealCreate) -> Result<Appeal, ApiError> {
    let body = required_text("body", &input.body, 5_000)?;
    let action = Repository::<ModerationAction>::new(pool).find_404(input.action_id).await?;
    if action.reverted_at.is_some() {
        return Err(ApiError::bad_request("Moderation action has already been reverted"));
    }

    let owner = target_owner(pool, action.target_type, action.target_id).await?;
    if owner != appellant.id {
        return Err(ApiError::forbidden("Only the affected member may appeal this action"));
    }

    let repo = Repository::<Appeal>::new(pool);
    let mut pending = repo.filter()?;
    pending.eq("action_id", action.id).eq("status", AppealStatus::Pending);
    if repo.select_one(pending).await?.is_some() {
        return Err(ApiError::conflict("A pending appeal already exists for this action"));
    }

    let now = Utc::now();
    let appeal = Appeal {
        id: Uuid::new_v4(),
        appellant_id: appellant.id,
        action_id: action.id,
        body,
        status: AppealStatus::Pending,
        decided_by: None,
        decided_at: None,
        created_at: now,
        updated_at: now,
    };

    sqlx::query(
        "INSERT INTO board_appeals (id, appellant_id, action_id, body, status, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
    )
    .bind(appeal.id)
    .bind(appeal.appellant_id)
    .bind(appeal.action_id)
    .bind(&appeal.body)
    .bind(appeal.status)
    .bind(now)
    .execute(pool)
    .await?;

    info!("Member '{}' appealed action {}", appellant.username, action.id);
    Ok(appeal)
}

pub async fn search_own(pool: &SqlitePool, appellant: &Principal, input: AppealSearch) -> Result<Page<Appeal>, ApiError> {
    search_scoped(pool, Some(appellant.id), input).await
}

pub async fn search(pool: &SqlitePool, input: AppealSearch) -> Result<Page<Appeal>, ApiError> {
    let appellant = input.appellant_id;
    search_scoped(pool, appellant, input).await
}

async fn search_scoped(pool: &SqlitePool, appellant: Option<Uuid>, input: AppealSearch) -> Result<Page<Appeal>, ApiError> {
    let window = input.page.resolve()?;
    let repo = Repository::<Appeal>::new(pool);

    let mut filter = repo.filter()?;
    filter
        .eq_opt("appellant_id", appellant)
        .eq_opt("status", input.status)
        .eq_opt("action_id", input.action_id);
    input.created.apply(&mut filter);
    filter.order(input.sort.as_deref(), SORTABLE, "created_at desc")?;

    Ok(repo.paginate(filter, window).await?)
}

/// Accept or reject a pending appeal. Accepting reverts the action: removed
/// content is restored and a suspended member reactivated.
pub async fn decide(pool: &SqlitePool, staff: &Principal, id: Uuid, input: AppealDecision) -> Result<Appeal, ApiError> {
    if input.status == AppealStatus::Pending {
        return Err(ApiError::invalid_field("status", "decision must be accepted or rejected"));
    }

    let now = Utc::now();
    let mut tx = pool.begin().await?;

    // deciding first claims the appeal, so two staff racing on it cannot
    // both revert the action
    let decided = sqlx::query_as::<_, Appeal>(
        "UPDATE board_appeals SET status = ?1, decided_by = ?2, decided_at = ?3, updated_at = ?3 \
         WHERE id = ?4 AND status = ?5 RETURNING *",
    )
    .bind(input.status)
    .bind(staff.id)
    .bind(now)
    .bind(id)
    .bind(AppealStatus::Pending)
    .fetch_optional(&mut *tx)
    .await?;

    let appeal = match decided {
        Some(appeal) => appeal,
        None => {
            let appeal = find_in_404::<Appeal, _>(&mut *tx, id).await?;
            return Err(ApiError::bad_request(format!("Appeal was already {}", appeal.status)));
        }
    };

    if input.status == AppealStatus::Accepted {
        let action = find_in_404::<ModerationAction, _>(&mut *tx, appeal.action_id).await?;
        match action.action {
            ModerationKind::Warn => {}
            ModerationKind::RemoveContent => {
                set_content_removed(&mut tx, action.target_type, action.target_id, false).await?;
            }
            ModerationKind::SuspendMember => {
                set_member_active(&mut tx, action.target_id, true).await?;
            }
        }
        sqlx::query("UPDATE board_moderation_actions SET reverted_at = ?1 WHERE id = ?2")
            .bind(now)
            .bind(action.id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    info!("{} '{}' {} appeal {}", staff.role, staff.username, appeal.status, appeal.id);
    Ok(appeal)
}
