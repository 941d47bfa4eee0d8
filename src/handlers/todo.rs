// handlers/todo.rs - /todoList/user/todos (user only)

use axum::{
    extract::{Path, State},
    middleware,
    routing::{patch, put},
    Extension, Json, Router,
};
use uuid::Uuid;

use crate::database::models::Todo;
use crate::database::Page;
use crate::middleware::{user_guard, ApiResponse, ApiResult, Principal};
use crate::services::todo::{self, TodoCreate, TodoSearch, TodoUpdate};
use crate::state::AppState;

pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/todoList/user/todos", patch(search).post(create))
        .route("/todoList/user/todos/:todo_id", put(update).get(get).delete(remove))
        .route_layer(middleware::from_fn_with_state(state.clone(), user_guard))
}

/// POST /todoList/user/todos
async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<Principal>,
    Json(input): Json<TodoCreate>,
) -> ApiResult<Todo> {
    Ok(ApiResponse::created(todo::create(&state.pool, &user, input).await?))
}

/// PATCH /todoList/user/todos - the caller's todos only
async fn search(
    State(state): State<AppState>,
    Extension(user): Extension<Principal>,
    Json(input): Json<TodoSearch>,
) -> ApiResult<Page<Todo>> {
    Ok(ApiResponse::success(todo::search(&state.pool, &user, input).await?))
}

/// GET /todoList/user/todos/:todo_id
async fn get(State(state): State<AppState>, Extension(user): Extension<Principal>, Path(id): Path<Uuid>) -> ApiResult<Todo> {
    Ok(ApiResponse::success(todo::get(&state.pool, &user, id).await?))
}

/// PUT /todoList/user/todos/:todo_id
async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(input): Json<TodoUpdate>,
) -> ApiResult<Todo> {
    Ok(ApiResponse::success(todo::update(&state.pool, &user, id, input).await?))
}

/// DELETE /todoList/user/todos/:todo_id - permanent
async fn remove(State(state): State<AppState>, Extension(user): Extension<Principal>, Path(id): Path<Uuid>) -> ApiResult<()> {
    todo::delete(&state.pool, &user, id).await?;
    Ok(ApiResponse::no_content())
}
