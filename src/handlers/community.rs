// handlers/community.rs - /community

use axum::{
    extract::{Path, State},
    middleware,
    routing::{delete, get, patch, post, put},
    Extension, Json, Router,
};
use uuid::Uuid;

use crate::database::models::{Comment, Community, Post};
use crate::database::Page;
use crate::middleware::{admin_guard, member_guard, staff_guard, ApiResponse, ApiResult, Principal};
use crate::services::community::comments::{self, CommentCreate, CommentSearch, CommentUpdate};
use crate::services::community::communities::{self, CommunityCreate, CommunitySearch, CommunityUpdate};
use crate::services::community::posts::{self, PostCreate, PostSearch, PostUpdate, VoteRequest};
use crate::state::AppState;

pub fn routes(state: &AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/community/communities", patch(search_communities))
        .route("/community/communities/:community_id", get(get_community))
        .route("/community/communities/:community_id/posts", patch(search_posts))
        .route("/community/posts/:post_id", get(get_post))
        .route("/community/posts/:post_id/comments", patch(search_comments));

    let member = Router::new()
        .route("/community/member/communities", post(create_community))
        .route("/community/member/communities/:community_id", put(update_community))
        .route("/community/member/communities/:community_id/posts", post(create_post))
        .route("/community/member/posts/:post_id", put(update_post).delete(remove_post))
        .route("/community/member/posts/:post_id/vote", put(vote))
        .route("/community/member/posts/:post_id/comments", post(create_comment))
        .route("/community/member/comments/:comment_id", put(update_comment).delete(remove_comment))
        .route_layer(middleware::from_fn_with_state(state.clone(), member_guard));

    let staff = Router::new()
        .route("/community/moderator/posts/:post_id", delete(moderate_post))
        .route_layer(middleware::from_fn_with_state(state.clone(), staff_guard));

    let admin = Router::new()
        .route("/community/admin/communities/:community_id", delete(remove_community))
        .route_layer(middleware::from_fn_with_state(state.clone(), admin_guard));

    public.merge(member).merge(staff).merge(admin)
}

/// PATCH /community/communities
async fn search_communities(
    State(state): State<AppState>,
    Json(input): Json<CommunitySearch>,
) -> ApiResult<Page<Community>> {
    Ok(ApiResponse::success(communities::search(&state.pool, input).await?))
}

/// GET /community/communities/:community_id
async fn get_community(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Community> {
    Ok(ApiResponse::success(communities::get(&state.pool, id).await?))
}

/// POST /community/member/communities
async fn create_community(
    State(state): State<AppState>,
    Extension(member): Extension<Principal>,
    Json(input): Json<CommunityCreate>,
) -> ApiResult<Community> {
    Ok(ApiResponse::created(communities::create(&state.pool, &member, input).await?))
}

/// PUT /community/member/communities/:community_id
async fn update_community(
    State(state): State<AppState>,
    Extension(member): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(input): Json<CommunityUpdate>,
) -> ApiResult<Community> {
    Ok(ApiResponse::success(communities::update(&state.pool, &member, id, input).await?))
}

/// DELETE /community/admin/communities/:community_id
async fn remove_community(
    State(state): State<AppState>,
    Extension(admin): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    communities::remove(&state.pool, &admin, id).await?;
    Ok(ApiResponse::no_content())
}

/// PATCH /community/communities/:community_id/posts
async fn search_posts(
    State(state): State<AppState>,
    Path(community_id): Path<Uuid>,
    Json(input): Json<PostSearch>,
) -> ApiResult<Page<Post>> {
    Ok(ApiResponse::success(posts::search(&state.pool, community_id, input).await?))
}

/// GET /community/posts/:post_id
async fn get_post(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Post> {
    Ok(ApiResponse::success(posts::get(&state.pool, id).await?))
}

/// POST /community/member/communities/:community_id/posts
async fn create_post(
    State(state): State<AppState>,
    Extension(member): Extension<Principal>,
    Path(community_id): Path<Uuid>,
    Json(input): Json<PostCreate>,
) -> ApiResult<Post> {
    Ok(ApiResponse::created(posts::create(&state.pool, &member, community_id, input).await?))
}

/// PUT /community/member/posts/:post_id
async fn update_post(
    State(state): State<AppState>,
    Extension(member): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(input): Json<PostUpdate>,
) -> ApiResult<Post> {
    Ok(ApiResponse::success(posts::update(&state.pool, &member, id, input).await?))
}

/// DELETE /community/member/posts/:post_id
async fn remove_post(
    State(state): State<AppState>,
    Extension(member): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    posts::remove(&state.pool, &member, id).await?;
    Ok(ApiResponse::no_content())
}

/// DELETE /community/moderator/posts/:post_id
async fn moderate_post(
    State(state): State<AppState>,
    Extension(staff): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    posts::moderate_remove(&state.pool, &staff, id).await?;
    Ok(ApiResponse::no_content())
}

/// PUT /community/member/posts/:post_id/vote
async fn vote(
    State(state): State<AppState>,
    Extension(member): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(input): Json<VoteRequest>,
) -> ApiResult<Post> {
    Ok(ApiResponse::success(posts::vote(&state.pool, &member, id, input).await?))
}

/// PATCH /community/posts/:post_id/comments
async fn search_comments(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Json(input): Json<CommentSearch>,
) -> ApiResult<Page<Comment>> {
    Ok(ApiResponse::success(comments::search(&state.pool, post_id, input).await?))
}

/// POST /community/member/posts/:post_id/comments
async fn create_comment(
    State(state): State<AppState>,
    Extension(member): Extension<Principal>,
    Path(post_id): Path<Uuid>,
    Json(input): Json<CommentCreate>,
) -> ApiResult<Comment> {
    Ok(ApiResponse::created(comments::create(&state.pool, &member, post_id, input).await?))
}

/// PUT /community/member/comments/:comment_id
async fn update_comment(
    State(state): State<AppState>,
    Extension(member): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(input): Json<CommentUpdate>,
) -> ApiResult<Comment> {
    Ok(ApiResponse::success(comments::update(&state.pool, &member, id, input).await?))
}

/// DELETE /community/member/comments/:comment_id
async fn remove_comment(
    State(state): State<AppState>,
    Extension(member): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    comments::remove(&state.pool, &member, id).await?;
    Ok(ApiResponse::no_content())
}
