use chrono::Utc;
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::database::models::{Reply, Report, ReportStatus, ReportTarget, Topic};
use crate::database::{Page, PageRequest, Repository};
use crate::error::ApiError;
use crate::middleware::Principal;
use crate::services::{required_text, CreatedRange};

const SORTABLE: &[&str] = &["created_at", "updated_at", "status"];

#[derive(Debug, Deserialize)]
pub struct ReportCreate {
    pub target_type: ReportTarget,
    pub target_id: Uuid,
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct ReportUpdate {
    pub status: ReportStatus,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportSearch {
    pub status: Option<ReportStatus>,
    pub target_type: Option<ReportTarget>,
    pub reporter_id: Option<Uuid>,
    #[serde(flatten)]
    pub created: CreatedRange,
    pub sort: Option<String>,
    #[serde(flatten)]
    pub page: PageRequest,
}

pub async fn create(pool: &SqlitePool, reporter: &Principal, input: ReportCreate) -> Result<Report, ApiError> {
    match input.target_type {
        ReportTarget::Topic => {
            Repository::<Topic>::new(pool).find_404(input.target_id).await?;
        }
        ReportTarget::Reply => {
            Repository::<Reply>::new(pool).find_404(input.target_id).await?;
        }
    }

    let now = Utc::now();
    let report = Report {
        id: Uuid::new_v4(),
        reporter_id: reporter.id,
        target_type: input.target_type,
        target_id: input.target_id,
        reason: required_text("reason", &input.reason, 2_000)?,
        status: ReportStatus::Pending,
        created_at: now,
        updated_at: now,
    };

    sqlx::query(
        "INSERT INTO board_reports (id, reporter_id, target_type, target_id, reason, status, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
    )
    .bind(report.id)
    .bind(report.reporter_id)
    .bind(report.target_type)
    .bind(report.target_id)
    .bind(&report.reason)
    .bind(report.status)
    .bind(now)
    .execute(pool)
    .await?;

    info!("Member '{}' reported {} {}", reporter.username, report.target_type, report.target_id);
    Ok(report)
}

pub async fn search(pool: &SqlitePool, input: ReportSearch) -> Result<Page<Report>, ApiError> {
    let window = input.page.resolve()?;
    let repo = Repository::<Report>::new(pool);

    let mut filter = repo.filter()?;
    filter
        .eq_opt("status", input.status)
        .eq_opt("target_type", input.target_type)
        .eq_opt("reporter_id", input.reporter_id);
    input.created.apply(&mut filter);
    filter.order(input.sort.as_deref(), SORTABLE, "created_at desc")?;

    Ok(repo.paginate(filter, window).await?)
}

pub async fn get(pool: &SqlitePool, id: Uuid) -> Result<Report, ApiError> {
    Ok(Repository::<Report>::new(pool).find_404(id).await?)
}

pub async fn update(pool: &SqlitePool, staff: &Principal, id: Uuid, input: ReportUpdate) -> Result<Report, ApiError> {
    let mut report = get(pool, id).await?;
    report.status = input.status;
    report.updated_at = Utc::now();

    sqlx::query("UPDATE board_reports SET status = ?1, updated_at = ?2 WHERE id = ?3")
        .bind(report.status)
        .bind(report.updated_at)
        .bind(report.id)
        .execute(pool)
        .await?;

    info!("{} '{}' marked report {} {}", staff.role, staff.username, report.id, report.status);
    Ok(report)
}
