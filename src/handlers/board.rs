// handlers/board.rs - /discussionBoard
//
// Public reads, member authoring, staff (moderator or admin) moderation and
// admin-only hard deletes.

use axum::{
    extract::{Path, State},
    middleware,
    routing::{delete, get, patch, post, put},
    Extension, Json, Router,
};
use uuid::Uuid;

use crate::database::models::{Appeal, ModerationAction, Reply, Report, Topic};
use crate::database::Page;
use crate::middleware::{admin_guard, appellant_guard, member_guard, staff_guard, ApiResponse, ApiResult, Principal};
use crate::services::board::appeals::{self, AppealCreate, AppealDecision, AppealSearch};
use crate::services::board::moderation::{self, ModerationCreate, ModerationSearch};
use crate::services::board::replies::{self, ReplyCreate, ReplySearch, ReplyUpdate};
use crate::services::board::reports::{self, ReportCreate, ReportSearch, ReportUpdate};
use crate::services::board::topics::{self, TopicCreate, TopicSearch, TopicStatusUpdate, TopicUpdate};
use crate::state::AppState;

pub fn routes(state: &AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/discussionBoard/topics", patch(search_topics))
        .route("/discussionBoard/topics/:topic_id", get(get_topic))
        .route("/discussionBoard/topics/:topic_id/replies", patch(search_replies))
        .route("/discussionBoard/topics/:topic_id/replies/:reply_id", get(get_reply));

    let member = Router::new()
        .route("/discussionBoard/member/topics", post(create_topic))
        .route("/discussionBoard/member/topics/:topic_id", put(update_topic).delete(remove_topic))
        .route("/discussionBoard/member/topics/:topic_id/replies", post(create_reply))
        .route(
            "/discussionBoard/member/topics/:topic_id/replies/:reply_id",
            put(update_reply).delete(remove_reply),
        )
        .route("/discussionBoard/member/reports", post(create_report))
        .route_layer(middleware::from_fn_with_state(state.clone(), member_guard));

    let appellant = Router::new()
        .route("/discussionBoard/member/appeals", post(create_appeal).patch(search_own_appeals))
        .route_layer(middleware::from_fn_with_state(state.clone(), appellant_guard));

    let staff = Router::new()
        .route("/discussionBoard/moderator/topics/:topic_id/status", put(set_topic_status))
        .route("/discussionBoard/moderator/reports", patch(search_reports))
        .route("/discussionBoard/moderator/reports/:report_id", get(get_report).put(update_report))
        .route("/discussionBoard/moderator/moderationActions", post(apply_action).patch(search_actions))
        .route("/discussionBoard/moderator/moderationActions/:action_id", get(get_action))
        .route("/discussionBoard/moderator/appeals", patch(search_appeals))
        .route("/discussionBoard/moderator/appeals/:appeal_id", put(decide_appeal))
        .route_layer(middleware::from_fn_with_state(state.clone(), staff_guard));

    let admin = Router::new()
        .route("/discussionBoard/admin/topics/:topic_id", delete(erase_topic))
        .route_layer(middleware::from_fn_with_state(state.clone(), admin_guard));

    public.merge(member).merge(appellant).merge(staff).merge(admin)
}

// ---- topics -----------------------------------------------------------------

/// PATCH /discussionBoard/topics
async fn search_topics(State(state): State<AppState>, Json(input): Json<TopicSearch>) -> ApiResult<Page<Topic>> {
    Ok(ApiResponse::success(topics::search(&state.pool, input).await?))
}

/// GET /discussionBoard/topics/:topic_id
async fn get_topic(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Topic> {
    Ok(ApiResponse::success(topics::get(&state.pool, id).await?))
}

/// POST /discussionBoard/member/topics
async fn create_topic(
    State(state): State<AppState>,
    Extension(member): Extension<Principal>,
    Json(input): Json<TopicCreate>,
) -> ApiResult<Topic> {
    Ok(ApiResponse::created(topics::create(&state.pool, &member, input).await?))
}

/// PUT /discussionBoard/member/topics/:topic_id
async fn update_topic(
    State(state): State<AppState>,
    Extension(member): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(input): Json<TopicUpdate>,
) -> ApiResult<Topic> {
    Ok(ApiResponse::success(topics::update(&state.pool, &member, id, input).await?))
}

/// DELETE /discussionBoard/member/topics/:topic_id
async fn remove_topic(
    State(state): State<AppState>,
    Extension(member): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    topics::remove(&state.pool, &member, id).await?;
    Ok(ApiResponse::no_content())
}

/// PUT /discussionBoard/moderator/topics/:topic_id/status
async fn set_topic_status(
    State(state): State<AppState>,
    Extension(staff): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(input): Json<TopicStatusUpdate>,
) -> ApiResult<Topic> {
    Ok(ApiResponse::success(topics::set_status(&state.pool, &staff, id, input).await?))
}

/// DELETE /discussionBoard/admin/topics/:topic_id - permanent
async fn erase_topic(
    State(state): State<AppState>,
    Extension(admin): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    topics::erase(&state.pool, &admin, id).await?;
    Ok(ApiResponse::no_content())
}

// ---- replies ----------------------------------------------------------------

/// PATCH /discussionBoard/topics/:topic_id/replies
async fn search_replies(
    State(state): State<AppState>,
    Path(topic_id): Path<Uuid>,
    Json(input): Json<ReplySearch>,
) -> ApiResult<Page<Reply>> {
    Ok(ApiResponse::success(replies::search(&state.pool, topic_id, input).await?))
}

/// GET /discussionBoard/topics/:topic_id/replies/:reply_id
async fn get_reply(State(state): State<AppState>, Path((topic_id, id)): Path<(Uuid, Uuid)>) -> ApiResult<Reply> {
    Ok(ApiResponse::success(replies::get(&state.pool, topic_id, id).await?))
}

/// POST /discussionBoard/member/topics/:topic_id/replies
async fn create_reply(
    State(state): State<AppState>,
    Extension(member): Extension<Principal>,
    Path(topic_id): Path<Uuid>,
    Json(input): Json<ReplyCreate>,
) -> ApiResult<Reply> {
    Ok(ApiResponse::created(replies::create(&state.pool, &member, topic_id, input).await?))
}

/// PUT /discussionBoard/member/topics/:topic_id/replies/:reply_id
async fn update_reply(
    State(state): State<AppState>,
    Extension(member): Extension<Principal>,
    Path((topic_id, id)): Path<(Uuid, Uuid)>,
    Json(input): Json<ReplyUpdate>,
) -> ApiResult<Reply> {
    Ok(ApiResponse::success(replies::update(&state.pool, &member, topic_id, id, input).await?))
}

/// DELETE /discussionBoard/member/topics/:topic_id/replies/:reply_id
async fn remove_reply(
    State(state): State<AppState>,
    Extension(member): Extension<Principal>,
    Path((topic_id, id)): Path<(Uuid, Uuid)>,
) -> ApiResult<()> {
    replies::remove(&state.pool, &member, topic_id, id).await?;
    Ok(ApiResponse::no_content())
}

// ---- reports ----------------------------------------------------------------

/// POST /discussionBoard/member/reports
async fn create_report(
    State(state): State<AppState>,
    Extension(member): Extension<Principal>,
    Json(input): Json<ReportCreate>,
) -> ApiResult<Report> {
    Ok(ApiResponse::created(reports::create(&state.pool, &member, input).await?))
}

/// PATCH /discussionBoard/moderator/reports
async fn search_reports(State(state): State<AppState>, Json(input): Json<ReportSearch>) -> ApiResult<Page<Report>> {
    Ok(ApiResponse::success(reports::search(&state.pool, input).await?))
}

/// GET /discussionBoard/moderator/reports/:report_id
async fn get_report(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Report> {
    Ok(ApiResponse::success(reports::get(&state.pool, id).await?))
}

/// PUT /discussionBoard/moderator/reports/:report_id
async fn update_report(
    State(state): State<AppState>,
    Extension(staff): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(input): Json<ReportUpdate>,
) -> ApiResult<Report> {
    Ok(ApiResponse::success(reports::update(&state.pool, &staff, id, input).await?))
}

// ---- moderation actions -----------------------------------------------------

/// POST /discussionBoard/moderator/moderationActions
async fn apply_action(
    State(state): State<AppState>,
    Extension(staff): Extension<Principal>,
    Json(input): Json<ModerationCreate>,
) -> ApiResult<ModerationAction> {
    Ok(ApiResponse::created(moderation::apply(&state.pool, &staff, input).await?))
}

/// PATCH /discussionBoard/moderator/moderationActions
async fn search_actions(
    State(state): State<AppState>,
    Json(input): Json<ModerationSearch>,
) -> ApiResult<Page<ModerationAction>> {
    Ok(ApiResponse::success(moderation::search(&state.pool, input).await?))
}

/// GET /discussionBoard/moderator/moderationActions/:action_id
async fn get_action(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<ModerationAction> {
    Ok(ApiResponse::success(moderation::get(&state.pool, id).await?))
}

// ---- appeals ----------------------------------------------------------------

/// POST /discussionBoard/member/appeals
async fn create_appeal(
    State(state): State<AppState>,
    Extension(member): Extension<Principal>,
    Json(input): Json<AppealCreate>,
) -> ApiResult<Appeal> {
    Ok(ApiResponse::created(appeals::create(&state.pool, &member, input).await?))
}

/// PATCH /discussionBoard/member/appeals
async fn search_own_appeals(
    State(state): State<AppState>,
    Extension(member): Extension<Principal>,
    Json(input): Json<AppealSearch>,
) -> ApiResult<Page<Appeal>> {
    Ok(ApiResponse::success(appeals::search_own(&state.pool, &member, input).await?))
}

/// PATCH /discussionBoard/moderator/appeals
async fn search_appeals(State(state): State<AppState>, Json(input): Json<AppealSearch>) -> ApiResult<Page<Appeal>> {
    Ok(ApiResponse::success(appeals::search(&state.pool, input).await?))
}

/// PUT /discussionBoard/moderator/appeals/:appeal_id
async fn decide_appeal(
    State(state): State<AppState>,
    Extension(staff): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(input): Json<AppealDecision>,
) -> ApiResult<Appeal> {
    Ok(ApiResponse::success(appeals::decide(&state.pool, &staff, id, input).await?))
}
