// handlers/auth.rs - /auth/:role account lifecycle
//
// join, login and refresh are public. me, password and mfa authorize the
// bearer token against the role named in the path.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    routing::{get, post, put},
    Json, Router,
};

use crate::auth::Role;
use crate::database::models::Account;
use crate::middleware::{authorize, ApiResponse, ApiResult};
use crate::services::accounts::{
    self, Authorized, JoinRequest, LoginRequest, MfaRequest, PasswordChangeRequest, RefreshRequest,
};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/:role/join", post(join))
        .route("/auth/:role/login", post(login))
        .route("/auth/:role/refresh", post(refresh))
        .route("/auth/:role/me", get(me))
        .route("/auth/:role/password", put(change_password))
        .route("/auth/:role/mfa", put(set_mfa))
}

/// POST /auth/:role/join - create an account and sign it in
async fn join(
    State(state): State<AppState>,
    Path(role): Path<Role>,
    Json(input): Json<JoinRequest>,
) -> ApiResult<Authorized> {
    Ok(ApiResponse::created(accounts::join(&state.pool, role, input).await?))
}

/// POST /auth/:role/login - exchange email and password for tokens
async fn login(
    State(state): State<AppState>,
    Path(role): Path<Role>,
    Json(input): Json<LoginRequest>,
) -> ApiResult<Authorized> {
    Ok(ApiResponse::success(accounts::login(&state.pool, role, input).await?))
}

/// POST /auth/:role/refresh - exchange a refresh token for a new pair
async fn refresh(
    State(state): State<AppState>,
    Path(role): Path<Role>,
    Json(input): Json<RefreshRequest>,
) -> ApiResult<Authorized> {
    Ok(ApiResponse::success(accounts::refresh(&state.pool, role, input).await?))
}

/// GET /auth/:role/me
async fn me(State(state): State<AppState>, Path(role): Path<Role>, headers: HeaderMap) -> ApiResult<Account> {
    let principal = authorize(&state.pool, &headers, &[role]).await?;
    Ok(ApiResponse::success(accounts::me(&state.pool, &principal).await?))
}

/// PUT /auth/:role/password
async fn change_password(
    State(state): State<AppState>,
    Path(role): Path<Role>,
    headers: HeaderMap,
    Json(input): Json<PasswordChangeRequest>,
) -> ApiResult<()> {
    let principal = authorize(&state.pool, &headers, &[role]).await?;
    accounts::change_password(&state.pool, &principal, input).await?;
    Ok(ApiResponse::no_content())
}

/// PUT /auth/:role/mfa - flip `mfa_enabled`
async fn set_mfa(
    State(state): State<AppState>,
    Path(role): Path<Role>,
    headers: HeaderMap,
    Json(input): Json<MfaRequest>,
) -> ApiResult<Account> {
    let principal = authorize(&state.pool, &headers, &[role]).await?;
    Ok(ApiResponse::success(accounts::set_mfa(&state.pool, &principal, input).await?))
}
