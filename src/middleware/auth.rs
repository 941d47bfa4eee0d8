use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use sqlx::SqlitePool;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::auth::{decode_jwt, Role, TokenKind};
use crate::database::models::Account;
use crate::database::Repository;
use crate::error::ApiError;
use crate::state::AppState;

/// The account a request acts as, inserted into request extensions by the
/// role guards.
#[derive(Clone, Debug)]
pub struct Principal {
    pub id: Uuid,
    pub role: Role,
    pub username: String,
}

/// Decode the bearer token and confirm its account may act as one of
/// `allowed`.
///
/// A missing or unverifiable token is 401. A valid token for the wrong
/// role, or for an account that is gone or deactivated, is 403.
pub async fn authorize(pool: &SqlitePool, headers: &HeaderMap, allowed: &[Role]) -> Result<Principal, ApiError> {
    authorize_account(pool, headers, allowed, true).await
}

/// Like [`authorize`], but a suspended (deactivated, not deleted) account
/// still passes. Only the routes a suspended member needs to appeal use it.
pub async fn authorize_suspended(pool: &SqlitePool, headers: &HeaderMap, allowed: &[Role]) -> Result<Principal, ApiError> {
    authorize_account(pool, headers, allowed, false).await
}

async fn authorize_account(
    pool: &SqlitePool,
    headers: &HeaderMap,
    allowed: &[Role],
    require_active: bool,
) -> Result<Principal, ApiError> {
    let token = extract_jwt_from_headers(headers).map_err(ApiError::unauthorized)?;
    let claims = decode_jwt(&token, TokenKind::Access)?;

    if !allowed.contains(&claims.role) {
        warn!(
            "Authorization failed: '{}' holds a {} token, route expects {:?}",
            claims.username, claims.role, allowed
        );
        return Err(ApiError::forbidden(format!("This resource requires a {} account", role_list(allowed))));
    }

    let repo = Repository::<Account>::new(pool);
    let mut filter = repo.filter()?;
    filter.eq("id", claims.sub).eq("role", claims.role);
    if require_active {
        filter.eq("is_active", true);
    }

    let account = repo.select_one(filter).await?.ok_or_else(|| {
        warn!(
            "Authorization failed: {} account '{}' ({}) not found or inactive",
            claims.role, claims.username, claims.sub
        );
        ApiError::forbidden("Account is not active")
    })?;

    if !account.is_active {
        debug!("Authorized suspended {} '{}'", account.role, account.username);
    } else {
        debug!("Authorized {} '{}'", account.role, account.username);
    }
    Ok(Principal {
        id: account.id,
        role: account.role,
        username: account.username,
    })
}

fn role_list(roles: &[Role]) -> String {
    roles.iter().map(|r| r.as_str()).collect::<Vec<_>>().join(" or ")
}

/// Extract JWT token from Authorization header
fn extract_jwt_from_headers(headers: &HeaderMap) -> Result<String, String> {
    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(|| "Missing Authorization header".to_string())?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    if let Some(token) = auth_str.strip_prefix("Bearer ") {
        if token.trim().is_empty() {
            return Err("Empty JWT token".to_string());
        }
        Ok(token.trim().to_string())
    } else {
        Err("Authorization header must use Bearer token format".to_string())
    }
}

async fn guard(state: &AppState, allowed: &[Role], mut request: Request, next: Next) -> Result<Response, ApiError> {
    let principal = authorize(&state.pool, request.headers(), allowed).await?;
    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}

pub async fn member_guard(State(state): State<AppState>, request: Request, next: Next) -> Result<Response, ApiError> {
    guard(&state, &[Role::Member], request, next).await
}

/// Members, suspended ones included, so a suspension can still be appealed
pub async fn appellant_guard(State(state): State<AppState>, mut request: Request, next: Next) -> Result<Response, ApiError> {
    let principal = authorize_suspended(&state.pool, request.headers(), &[Role::Member]).await?;
    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}

pub async fn moderator_guard(State(state): State<AppState>, request: Request, next: Next) -> Result<Response, ApiError> {
    guard(&state, &[Role::Moderator], request, next).await
}

pub async fn admin_guard(State(state): State<AppState>, request: Request, next: Next) -> Result<Response, ApiError> {
    guard(&state, &[Role::Admin], request, next).await
}

/// Moderators and admins
pub async fn staff_guard(State(state): State<AppState>, request: Request, next: Next) -> Result<Response, ApiError> {
    guard(&state, &[Role::Moderator, Role::Admin], request, next).await
}

pub async fn seller_guard(State(state): State<AppState>, request: Request, next: Next) -> Result<Response, ApiError> {
    guard(&state, &[Role::Seller], request, next).await
}

pub async fn customer_guard(State(state): State<AppState>, request: Request, next: Next) -> Result<Response, ApiError> {
    guard(&state, &[Role::Customer], request, next).await
}

pub async fn user_guard(State(state): State<AppState>, request: Request, next: Next) -> Result<Response, ApiError> {
    guard(&state, &[Role::User], request, next).await
}
