use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::database::repository::Entity;

text_enum! {
    /// The audience an account belongs to. The same person signing up as
    /// a member and as a seller gets two independent accounts.
    Role {
        Member => "member",
        Moderator => "moderator",
        Admin => "admin",
        Customer => "customer",
        Seller => "seller",
        User => "user",
    }
}

impl Role {
    /// Roles that may not self-register outside development setups
    pub fn is_privileged(&self) -> bool {
        matches!(self, Role::Moderator | Role::Admin)
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Account {
    pub id: Uuid,
    pub role: Role,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub display_name: Option<String>,
    pub is_active: bool,
    pub mfa_enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Entity for Account {
    const TABLE: &'static str = "accounts";
    const LABEL: &'static str = "Account";
    const SOFT_DELETE: bool = true;
}
