// handlers/admin.rs - /admin account administration (admin only)

use axum::{
    extract::{Path, State},
    middleware,
    routing::{patch, put},
    Extension, Json, Router,
};
use uuid::Uuid;

use crate::database::models::Account;
use crate::database::Page;
use crate::middleware::{admin_guard, ApiResponse, ApiResult, Principal};
use crate::services::accounts::{self, AccountSearch, AccountUpdate};
use crate::state::AppState;

pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/admin/accounts", patch(search))
        .route("/admin/accounts/:id", put(update))
        .route_layer(middleware::from_fn_with_state(state.clone(), admin_guard))
}

/// PATCH /admin/accounts - search accounts of every role
async fn search(State(state): State<AppState>, Json(input): Json<AccountSearch>) -> ApiResult<Page<Account>> {
    Ok(ApiResponse::success(accounts::search(&state.pool, input).await?))
}

/// PUT /admin/accounts/:id - activate or deactivate
async fn update(
    State(state): State<AppState>,
    Extension(admin): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(input): Json<AccountUpdate>,
) -> ApiResult<Account> {
    Ok(ApiResponse::success(accounts::update(&state.pool, &admin, id, input).await?))
}
