use chrono::Utc;
use serde::Deserialize;
use sqlx::{Executor, Sqlite, SqliteConnection, SqlitePool};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::Role;
use crate::database::models::{
    Account, ModerationAction, ModerationKind, ModerationTarget, Report, ReportStatus,
};
use crate::database::{find_in, Page, PageRequest, Repository};
use crate::error::ApiError;
use crate::middleware::Principal;
use crate::services::{required_text, CreatedRange};

const SORTABLE: &[&str] = &["created_at", "action", "target_type"];

#[derive(Debug, Deserialize)]
pub struct ModerationCreate {
    /// Report this action settles, if any
    pub report_id: Option<Uuid>,
    pub target_type: ModerationTarget,
    pub target_id: Uuid,
    pub action: ModerationKind,
    pub reason: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ModerationSearch {
    pub action: Option<ModerationKind>,
    pub target_type: Option<ModerationTarget>,
    pub target_id: Option<Uuid>,
    pub moderator_id: Option<Uuid>,
    #[serde(flatten)]
    pub created: CreatedRange,
    pub sort: Option<String>,
    #[serde(flatten)]
    pub page: PageRequest,
}

/// Record a moderation action and apply its effect in one transaction.
///
/// `remove_content` soft-deletes the topic or reply, `suspend_member`
/// deactivates the account, and a linked report is marked resolved.
pub async fn apply(pool: &SqlitePool, staff: &Principal, input: ModerationCreate) -> Result<ModerationAction, ApiError> {
    let reason = required_text("reason", &input.reason, 2_000)?;
    match (input.action, input.target_type) {
        (ModerationKind::RemoveContent, ModerationTarget::Member) => {
            return Err(ApiError::invalid_field("action", "remove_content applies to topics and replies"));
        }
        (ModerationKind::SuspendMember, ModerationTarget::Topic | ModerationTarget::Reply) => {
            return Err(ApiError::invalid_field("action", "suspend_member applies to members"));
        }
        _ => {}
    }

    if let Some(report_id) = input.report_id {
        Repository::<Report>::new(pool).find_404(report_id).await?;
    }
    if input.action != ModerationKind::RemoveContent {
        target_owner(pool, input.target_type, input.target_id).await?;
    }

    // every branch opens the transaction with a write
    let now = Utc::now();
    let mut tx = pool.begin().await?;
    match input.action {
        ModerationKind::Warn => {}
        ModerationKind::RemoveContent => {
            set_content_removed(&mut tx, input.target_type, input.target_id, true).await?;
        }
        ModerationKind::SuspendMember => {
            set_member_active(&mut tx, input.target_id, false).await?;
        }
    }

    let action = ModerationAction {
        id: Uuid::new_v4(),
        moderator_id: staff.id,
        report_id: input.report_id,
        target_type: input.target_type,
        target_id: input.target_id,
        action: input.action,
        reason,
        reverted_at: None,
        created_at: now,
    };

    sqlx::query(
        "INSERT INTO board_moderation_actions (id, moderator_id, report_id, target_type, target_id, action, reason, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    )
    .bind(action.id)
    .bind(action.moderator_id)
    .bind(action.report_id)
    .bind(action.target_type)
    .bind(action.target_id)
    .bind(action.action)
    .bind(&action.reason)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    if let Some(report_id) = action.report_id {
        sqlx::query("UPDATE board_reports SET status = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(ReportStatus::Resolved)
            .bind(now)
            .bind(report_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    info!(
        "{} '{}' applied {} to {} {}",
        staff.role, staff.username, action.action, action.target_type, action.target_id
    );
    Ok(action)
}

pub async fn search(pool: &SqlitePool, input: ModerationSearch) -> Result<Page<ModerationAction>, ApiError> {
    let window = input.page.resolve()?;
    let repo = Repository::<ModerationAction>::new(pool);

    let mut filter = repo.filter()?;
    filter
        .eq_opt("action", input.action)
        .eq_opt("target_type", input.target_type)
        .eq_opt("target_id", input.target_id)
        .eq_opt("moderator_id", input.moderator_id);
    input.created.apply(&mut filter);
    filter.order(input.sort.as_deref(), SORTABLE, "created_at desc")?;

    Ok(repo.paginate(filter, window).await?)
}

pub async fn get(pool: &SqlitePool, id: Uuid) -> Result<ModerationAction, ApiError> {
    Ok(Repository::<ModerationAction>::new(pool).find_404(id).await?)
}

/// The account answerable for a moderation target: the member themself, or
/// the author of the topic or reply. Removed content still has an owner.
pub(crate) async fn target_owner<'c, E>(executor: E, target_type: ModerationTarget, target_id: Uuid) -> Result<Uuid, ApiError>
where
    E: Executor<'c, Database = Sqlite>,
{
    match target_type {
        ModerationTarget::Member => {
            let account = find_in::<Account, _>(executor, target_id)
                .await?
                .filter(|account| account.role == Role::Member)
                .ok_or_else(|| ApiError::not_found("Member not found"))?;
            Ok(account.id)
        }
        ModerationTarget::Topic | ModerationTarget::Reply => {
            let sql = format!("SELECT author_id FROM \"{}\" WHERE id = ?1", content_table(target_type));
            sqlx::query_scalar::<_, Uuid>(&sql)
                .bind(target_id)
                .fetch_optional(executor)
                .await?
                .ok_or_else(|| ApiError::not_found(format!("{} not found", target_type)))
        }
    }
}

pub(crate) async fn set_content_removed(
    conn: &mut SqliteConnection,
    target_type: ModerationTarget,
    target_id: Uuid,
    removed: bool,
) -> Result<(), ApiError> {
    let table = content_table(target_type);
    let now = Utc::now();
    let result = if removed {
        let sql = format!("UPDATE \"{}\" SET deleted_at = ?1, updated_at = ?1 WHERE id = ?2 AND deleted_at IS NULL", table);
        sqlx::query(&sql).bind(now).bind(target_id).execute(&mut *conn).await?
    } else {
        let sql = format!("UPDATE \"{}\" SET deleted_at = NULL, updated_at = ?1 WHERE id = ?2", table);
        sqlx::query(&sql).bind(now).bind(target_id).execute(&mut *conn).await?
    };

    if result.rows_affected() == 0 {
        if removed {
            return Err(ApiError::not_found(format!("{} not found", target_type)));
        }
        // content erased for good since the action; nothing to restore
        warn!("Cannot restore {} {}: row no longer exists", target_type, target_id);
    }
    Ok(())
}

pub(crate) async fn set_member_active(conn: &mut SqliteConnection, member_id: Uuid, active: bool) -> Result<(), ApiError> {
    sqlx::query("UPDATE accounts SET is_active = ?1, updated_at = ?2 WHERE id = ?3 AND role = ?4")
        .bind(active)
        .bind(Utc::now())
        .bind(member_id)
        .bind(Role::Member)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Only topics and replies are stored content; members are accounts.
fn content_table(target_type: ModerationTarget) -> &'static str {
    match target_type {
        ModerationTarget::Topic => "board_topics",
        ModerationTarget::Reply => "board_replies",
        ModerationTarget::Member => "accounts",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{ReportTarget, Topic};
    use crate::services::board::{fixtures, reports};
    use crate::services::test_support;

    #[tokio::test]
    async fn remove_content_hides_topic_and_resolves_report() {
        let pool = test_support::pool().await;
        let member = test_support::principal(&pool, Role::Member, "member").await;
        let moderator = test_support::principal(&pool, Role::Moderator, "mod").await;
        let topic = fixtures::topic(&pool, &member, "Spam spam spam").await;
        let report = reports::create(
            &pool,
            &member,
            reports::ReportCreate { target_type: ReportTarget::Topic, target_id: topic.id, reason: "spam".into() },
        )
        .await
        .unwrap();

        let action = apply(
            &pool,
            &moderator,
            ModerationCreate {
                report_id: Some(report.id),
                target_type: ModerationTarget::Topic,
                target_id: topic.id,
                action: ModerationKind::RemoveContent,
                reason: "spam".into(),
            },
        )
        .await
        .unwrap();

        assert!(Repository::<Topic>::new(&pool).find(topic.id).await.unwrap().is_none());
        assert_eq!(reports::get(&pool, report.id).await.unwrap().status, ReportStatus::Resolved);
        assert_eq!(get(&pool, action.id).await.unwrap().action, ModerationKind::RemoveContent);
    }

    #[tokio::test]
    async fn suspend_member_deactivates_account() {
        let pool = test_support::pool().await;
        let member = test_support::principal(&pool, Role::Member, "troll").await;
        let admin = test_support::principal(&pool, Role::Admin, "admin").await;

        apply(
            &pool,
            &admin,
            ModerationCreate {
                report_id: None,
                target_type: ModerationTarget::Member,
                target_id: member.id,
                action: ModerationKind::SuspendMember,
                reason: "abuse".into(),
            },
        )
        .await
        .unwrap();

        let account = Repository::<Account>::new(&pool).find_404(member.id).await.unwrap();
        assert!(!account.is_active);
    }

    #[tokio::test]
    async fn failed_action_leaves_nothing_behind() {
        let pool = test_support::pool().await;
        let member = test_support::principal(&pool, Role::Member, "member").await;
        let moderator = test_support::principal(&pool, Role::Moderator, "mod").await;
        let topic = fixtures::topic(&pool, &member, "Fine").await;

        // missing report rolls the transaction back before anything is written
        let err = apply(
            &pool,
            &moderator,
            ModerationCreate {
                report_id: Some(Uuid::new_v4()),
                target_type: ModerationTarget::Topic,
                target_id: topic.id,
                action: ModerationKind::RemoveContent,
                reason: "oops".into(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
        assert!(Repository::<Topic>::new(&pool).find(topic.id).await.unwrap().is_some());
        assert_eq!(search(&pool, ModerationSearch::default()).await.unwrap().pagination.records, 0);
    }

    #[tokio::test]
    async fn action_must_fit_target() {
        let pool = test_support::pool().await;
        let moderator = test_support::principal(&pool, Role::Moderator, "mod").await;
        let err = apply(
            &pool,
            &moderator,
            ModerationCreate {
                report_id: None,
                target_type: ModerationTarget::Member,
                target_id: Uuid::new_v4(),
                action: ModerationKind::RemoveContent,
                reason: "nope".into(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::ValidationError { .. }));
    }
}
