//! Relationship handlers.
//!
//! Identity always comes from the verified token; no endpoint accepts the
//! acting user as input.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use courtside_query::pagination::Page;
use uuid::Uuid;

use crate::api::extractors::{PageQuery, ValidatedQuery};
use crate::auth::CurrentUser;
use crate::models::{FriendRequestView, Friendship, RelationshipView, UserSummary};
use crate::state::AppState;
use crate::Result;

pub async fn list_friends(
    State(state): State<AppState>,
    user: CurrentUser,
    ValidatedQuery(query): ValidatedQuery<PageQuery>,
) -> Result<Json<Page<UserSummary>>> {
    let page = state
        .friendships
        .list_friends(user.id, query.page_params())
        .await?;
    Ok(Json(page))
}

pub async fn remove_friend(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(user_id): Path<Uuid>,
) -> Result<StatusCode> {
    state.friendships.remove_friend(user.id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_incoming_requests(
    State(state): State<AppState>,
    user: CurrentUser,
    ValidatedQuery(query): ValidatedQuery<PageQuery>,
) -> Result<Json<Page<FriendRequestView>>> {
    let page = state
        .friendships
        .list_incoming(user.id, query.page_params())
        .await?;
    Ok(Json(page))
}

pub async fn send_request(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(user_id): Path<Uuid>,
) -> Result<(StatusCode, Json<Friendship>)> {
    let friendship = state.friendships.send_request(user.id, user_id).await?;
    Ok((StatusCode::CREATED, Json(friendship)))
}

pub async fn accept_request(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Friendship>> {
    Ok(Json(state.friendships.accept(user.id, id).await?))
}

pub async fn reject_request(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Friendship>> {
    Ok(Json(state.friendships.reject(user.id, id).await?))
}

pub async fn cancel_request(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Friendship>> {
    Ok(Json(state.friendships.cancel(user.id, id).await?))
}

pub async fn block_user(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Friendship>> {
    Ok(Json(state.friendships.block(user.id, user_id).await?))
}

pub async fn unblock_user(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(user_id): Path<Uuid>,
) -> Result<StatusCode> {
    state.friendships.unblock(user.id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn relationship_status(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(user_id): Path<Uuid>,
) -> Result<Json<RelationshipView>> {
    Ok(Json(
        state
            .friendships
            .relationship_status(user.id, user_id)
            .await?,
    ))
}
