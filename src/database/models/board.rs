use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::database::repository::Entity;

text_enum! {
    TopicStatus {
        Open => "open",
        Closed => "closed",
        Pinned => "pinned",
    }
}

impl TopicStatus {
    pub fn accepts_replies(&self) -> bool {
        !matches!(self, TopicStatus::Closed)
    }
}

text_enum! {
    ReportTarget {
        Topic => "topic",
        Reply => "reply",
    }
}

text_enum! {
    ReportStatus {
        Pending => "pending",
        Resolved => "resolved",
        Dismissed => "dismissed",
    }
}

text_enum! {
    ModerationTarget {
        Topic => "topic",
        Reply => "reply",
        Member => "member",
    }
}

text_enum! {
    ModerationKind {
        Warn => "warn",
        RemoveContent => "remove_content",
        SuspendMember => "suspend_member",
    }
}

text_enum! {
    AppealStatus {
        Pending => "pending",
        Accepted => "accepted",
        Rejected => "rejected",
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Topic {
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub body: String,
    pub category: String,
    pub status: TopicStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Entity for Topic {
    const TABLE: &'static str = "board_topics";
    const LABEL: &'static str = "Topic";
    const SOFT_DELETE: bool = true;
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Reply {
    pub id: Uuid,
    pub topic_id: Uuid,
    pub author_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Entity for Reply {
    const TABLE: &'static str = "board_replies";
    const LABEL: &'static str = "Reply";
    const SOFT_DELETE: bool = true;
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Report {
    pub id: Uuid,
    pub reporter_id: Uuid,
    pub target_type: ReportTarget,
    pub target_id: Uuid,
    pub reason: String,
    pub status: ReportStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Report {
    const TABLE: &'static str = "board_reports";
    const LABEL: &'static str = "Report";
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ModerationAction {
    pub id: Uuid,
    pub moderator_id: Uuid,
    pub report_id: Option<Uuid>,
    pub target_type: ModerationTarget,
    pub target_id: Uuid,
    pub action: ModerationKind,
    pub reason: String,
    pub reverted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Entity for ModerationAction {
    const TABLE: &'static str = "board_moderation_actions";
    const LABEL: &'static str = "Moderation action";
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Appeal {
    pub id: Uuid,
    pub appellant_id: Uuid,
    pub action_id: Uuid,
    pub body: String,
    pub status: AppealStatus,
    pub decided_by: Option<Uuid>,
    pub decided_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Appeal {
    const TABLE: &'static str = "board_appeals";
    const LABEL: &'static str = "Appeal";
}
