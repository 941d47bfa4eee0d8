use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::password;
use crate::auth::{decode_jwt, issue_token_pair, Role, TokenKind, TokenPair};
use crate::config::config;
use crate::database::models::Account;
use crate::database::{Page, PageRequest, Repository};
use crate::error::ApiError;
use crate::middleware::Principal;
use crate::services::{optional_text, CreatedRange};

const SORTABLE: &[&str] = &["created_at", "updated_at", "username", "email", "role"];

#[derive(Debug, Deserialize)]
pub struct JoinRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

#[derive(Debug, Deserialize)]
pub struct PasswordChangeRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct MfaRequest {
    pub enabled: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct AccountSearch {
    pub role: Option<Role>,
    /// Substring of username, email or display name
    pub search: Option<String>,
    pub is_active: Option<bool>,
    #[serde(flatten)]
    pub created: CreatedRange,
    pub sort: Option<String>,
    #[serde(flatten)]
    pub page: PageRequest,
}

#[derive(Debug, Deserialize)]
pub struct AccountUpdate {
    pub is_active: bool,
}

/// An account together with a fresh token pair.
#[derive(Debug, Serialize)]
pub struct Authorized {
    #[serde(flatten)]
    pub account: Account,
    pub token: TokenPair,
}

pub async fn join(pool: &SqlitePool, role: Role, input: JoinRequest) -> Result<Authorized, ApiError> {
    check_join_allowed(role, config().security.allow_privileged_join)?;

    let username = validate_username(&input.username)?;
    let email = validate_email(&input.email)?;
    validate_password("password", &input.password)?;
    let display_name = optional_text("display_name", input.display_name.as_deref(), 64)?;
    let password_hash = password::hash(&input.password).await?;

    let id = Uuid::new_v4();
    let now = Utc::now();
    sqlx::query(
        "INSERT INTO accounts (id, role, username, email, password_hash, display_name, is_active, mfa_enabled, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, 0, ?7, ?7)",
    )
    .bind(id)
    .bind(role)
    .bind(&username)
    .bind(&email)
    .bind(&password_hash)
    .bind(&display_name)
    .bind(now)
    .execute(pool)
    .await?;

    let account = Repository::<Account>::new(pool).find_404(id).await?;
    info!("New {} account '{}' joined", role, account.username);
    authorized(account)
}

/// Moderator and admin accounts can only be self-registered when the
/// deployment allows it.
fn check_join_allowed(role: Role, allow_privileged: bool) -> Result<(), ApiError> {
    if role.is_privileged() && !allow_privileged {
        warn!("Rejected self-registration as {}", role);
        return Err(ApiError::forbidden(format!("{} accounts cannot be self-registered", role)));
    }
    Ok(())
}

pub async fn login(pool: &SqlitePool, role: Role, input: LoginRequest) -> Result<Authorized, ApiError> {
    let repo = Repository::<Account>::new(pool);
    let mut filter = repo.filter()?;
    filter
        .include_deleted(true)
        .eq("role", role)
        .eq("email", input.email.trim().to_lowercase());

    let invalid = || ApiError::unauthorized("Invalid email or password");
    let account = repo.select_one(filter).await?.ok_or_else(invalid)?;
    if !password::verify(&input.password, &account.password_hash).await? {
        warn!("Failed {} login for '{}'", role, account.username);
        return Err(invalid());
    }
    if account.deleted_at.is_some() || !account.is_active {
        warn!("Login refused for inactive {} account '{}'", role, account.username);
        return Err(ApiError::forbidden("Account is not active"));
    }

    info!("{} '{}' logged in", role, account.username);
    authorized(account)
}

/// Exchange a refresh token for a new pair. The account is re-checked, so a
/// suspended account cannot keep refreshing.
pub async fn refresh(pool: &SqlitePool, role: Role, input: RefreshRequest) -> Result<Authorized, ApiError> {
    let claims = decode_jwt(input.refresh.trim(), TokenKind::Refresh)?;
    if claims.role != role {
        return Err(ApiError::forbidden(format!("Refresh token was not issued to a {} account", role)));
    }

    let repo = Repository::<Account>::new(pool);
    let account = repo
        .find(claims.sub)
        .await?
        .filter(|account| account.is_active && account.role == role)
        .ok_or_else(|| ApiError::forbidden("Account is not active"))?;

    authorized(account)
}

pub async fn me(pool: &SqlitePool, principal: &Principal) -> Result<Account, ApiError> {
    Ok(Repository::<Account>::new(pool).find_404(principal.id).await?)
}

pub async fn change_password(
    pool: &SqlitePool,
    principal: &Principal,
    input: PasswordChangeRequest,
) -> Result<(), ApiError> {
    let account = me(pool, principal).await?;
    if !password::verify(&input.current_password, &account.password_hash).await? {
        return Err(ApiError::invalid_field("current_password", "Current password is incorrect"));
    }
    validate_password("new_password", &input.new_password)?;

    let password_hash = password::hash(&input.new_password).await?;
    sqlx::query("UPDATE accounts SET password_hash = ?1, updated_at = ?2 WHERE id = ?3")
        .bind(password_hash)
        .bind(Utc::now())
        .bind(account.id)
        .execute(pool)
        .await?;

    info!("{} '{}' changed their password", account.role, account.username);
    Ok(())
}

pub async fn set_mfa(pool: &SqlitePool, principal: &Principal, input: MfaRequest) -> Result<Account, ApiError> {
    sqlx::query("UPDATE accounts SET mfa_enabled = ?1, updated_at = ?2 WHERE id = ?3")
        .bind(input.enabled)
        .bind(Utc::now())
        .bind(principal.id)
        .execute(pool)
        .await?;
    me(pool, principal).await
}

pub async fn search(pool: &SqlitePool, input: AccountSearch) -> Result<Page<Account>, ApiError> {
    let window = input.page.resolve()?;
    let repo = Repository::<Account>::new(pool);

    let mut filter = repo.filter()?;
    filter
        .eq_opt("role", input.role)
        .eq_opt("is_active", input.is_active)
        .contains_opt(&["username", "email", "display_name"], input.search.as_deref());
    input.created.apply(&mut filter);
    filter.order(input.sort.as_deref(), SORTABLE, "created_at desc")?;

    Ok(repo.paginate(filter, window).await?)
}

pub async fn update(pool: &SqlitePool, admin: &Principal, id: Uuid, input: AccountUpdate) -> Result<Account, ApiError> {
    if id == admin.id && !input.is_active {
        return Err(ApiError::bad_request("Administrators cannot deactivate their own account"));
    }

    let repo = Repository::<Account>::new(pool);
    let account = repo.find_404(id).await?;
    sqlx::query("UPDATE accounts SET is_active = ?1, updated_at = ?2 WHERE id = ?3")
        .bind(input.is_active)
        .bind(Utc::now())
        .bind(account.id)
        .execute(pool)
        .await?;

    info!(
        "Admin '{}' set {} '{}' active={}",
        admin.username, account.role, account.username, input.is_active
    );
    Ok(repo.find_404(id).await?)
}

fn authorized(account: Account) -> Result<Authorized, ApiError> {
    let token = issue_token_pair(&account)?;
    Ok(Authorized { account, token })
}

fn validate_username(username: &str) -> Result<String, ApiError> {
    let username = username.trim();
    let valid_chars = username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !(3..=32).contains(&username.len()) || !valid_chars {
        return Err(ApiError::invalid_field(
            "username",
            "username must be 3 to 32 letters, digits, '_' or '-'",
        ));
    }
    Ok(username.to_string())
}

fn validate_email(email: &str) -> Result<String, ApiError> {
    let email = email.trim().to_lowercase();
    let well_formed = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.'),
        None => false,
    };
    if !well_formed || email.len() > 254 || email.contains(char::is_whitespace) {
        return Err(ApiError::invalid_field("email", "email is not a valid address"));
    }
    Ok(email)
}

fn validate_password(field: &str, password: &str) -> Result<(), ApiError> {
    if password.chars().count() < 8 {
        return Err(ApiError::invalid_field(field, format!("{} must be at least 8 characters", field)));
    }
    Ok(())
}
