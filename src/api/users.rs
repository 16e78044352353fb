use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::{
    error::AppResult,
    middleware::request_id::RequestId,
    models::{Film, Friendship, NewUser, User, UserId},
};

#[derive(Debug, Serialize)]
pub struct FriendshipResponse {
    pub requester: UserId,
    pub target: UserId,
    pub confirmed: bool,
}

impl From<Friendship> for FriendshipResponse {
    fn from(edge: Friendship) -> Self {
        Self {
            requester: edge.requester,
            target: edge.target(),
            confirmed: edge.confirmed,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RecommendationQuery {
    pub limit: Option<usize>,
}

/// Register a new user
pub async fn create_user(
    State(state): State<AppState>,
    Json(request): Json<NewUser>,
) -> AppResult<(StatusCode, Json<User>)> {
    let user = state.users.create(request).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> AppResult<Json<User>> {
    Ok(Json(state.users.get(id).await?))
}

/// Send a friend request from `id` to `friend_id`
pub async fn request_friend(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path((id, friend_id)): Path<(UserId, UserId)>,
) -> AppResult<(StatusCode, Json<FriendshipResponse>)> {
    tracing::info!(
        request_id = %request_id,
        user_id = %id,
        friend_id = %friend_id,
        "Processing friend request"
    );

    let edge = state.friendships.request(id, friend_id).await?;
    Ok((StatusCode::CREATED, Json(edge.into())))
}

/// `id` accepts the request previously sent by `friend_id`
pub async fn confirm_friend(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path((id, friend_id)): Path<(UserId, UserId)>,
) -> AppResult<Json<FriendshipResponse>> {
    tracing::info!(
        request_id = %request_id,
        user_id = %id,
        friend_id = %friend_id,
        "Processing friend confirmation"
    );

    let edge = state.friendships.confirm(id, friend_id).await?;
    Ok(Json(edge.into()))
}

pub async fn remove_friend(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path((id, friend_id)): Path<(UserId, UserId)>,
) -> AppResult<StatusCode> {
    tracing::info!(
        request_id = %request_id,
        user_id = %id,
        friend_id = %friend_id,
        "Processing friendship removal"
    );

    state.friendships.cancel(id, friend_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_friends(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> AppResult<Json<Vec<User>>> {
    Ok(Json(state.friendships.friends_of(id).await?))
}

pub async fn common_friends(
    State(state): State<AppState>,
    Path((id, other_id)): Path<(UserId, UserId)>,
) -> AppResult<Json<Vec<User>>> {
    Ok(Json(state.mutual_friends.mutual_friends(id, other_id).await?))
}

/// Films liked by users with the most similar taste
pub async fn recommendations(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(id): Path<UserId>,
    Query(params): Query<RecommendationQuery>,
) -> AppResult<Json<Vec<Film>>> {
    tracing::info!(
        request_id = %request_id,
        user_id = %id,
        limit = ?params.limit,
        "Processing recommendation request"
    );

    let films = state.recommendations.recommend(id, params.limit).await?;
    Ok(Json(films))
}
