use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::models::{FilmId, FriendPair, UserId};

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("User {0} not found")]
    UserNotFound(UserId),

    #[error("Film {0} not found")]
    FilmNotFound(FilmId),

    #[error("No friendship between users {} and {}", .0.low(), .0.high())]
    FriendshipNotFound(FriendPair),

    #[error("User {user_id} has not liked film {film_id}")]
    LikeNotFound { film_id: FilmId, user_id: UserId },

    #[error("Users {} and {} are already friends or have a pending request", .0.low(), .0.high())]
    AlreadyFriendsOrRequested(FriendPair),

    #[error("User {requester} has no pending friend request to user {responder}")]
    NotRequested { requester: UserId, responder: UserId },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Coarse classification used at the HTTP boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A required user, film, friendship edge or like is absent
    NotFound,
    /// The friendship pair already has a row
    Conflict,
    /// The entity exists but is not in the state the operation needs
    InvalidState,
    /// Rejected request payload or parameters
    Validation,
    /// Store or runtime failure
    Internal,
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::UserNotFound(_)
            | AppError::FilmNotFound(_)
            | AppError::FriendshipNotFound(_)
            | AppError::LikeNotFound { .. } => ErrorKind::NotFound,
            AppError::AlreadyFriendsOrRequested(_) => ErrorKind::Conflict,
            AppError::NotRequested { .. } => ErrorKind::InvalidState,
            AppError::InvalidInput(_) => ErrorKind::Validation,
            AppError::Database(_) | AppError::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self.kind() {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::InvalidState => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "Request failed");
        }

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let pair = FriendPair::new(UserId(1), UserId(2)).unwrap();

        assert_eq!(AppError::UserNotFound(UserId(1)).kind(), ErrorKind::NotFound);
        assert_eq!(
            AppError::LikeNotFound {
                film_id: FilmId(1),
                user_id: UserId(2)
            }
            .kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            AppError::AlreadyFriendsOrRequested(pair).kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            AppError::NotRequested {
                requester: UserId(1),
                responder: UserId(2)
            }
            .kind(),
            ErrorKind::InvalidState
        );
    }

    #[test]
    fn test_error_status_codes() {
        let pair = FriendPair::new(UserId(3), UserId(1)).unwrap();

        let response = AppError::FriendshipNotFound(pair).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = AppError::AlreadyFriendsOrRequested(pair).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = AppError::InvalidInput("bad".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = AppError::Internal("boom".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_friendship_message_uses_canonical_order() {
        let pair = FriendPair::new(UserId(9), UserId(4)).unwrap();
        assert_eq!(
            AppError::FriendshipNotFound(pair).to_string(),
            "No friendship between users 4 and 9"
        );
    }
}
