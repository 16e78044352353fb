use axum::{
    http::StatusCode,
    middleware,
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::{films, users, AppState};
use crate::middleware::request_id::{make_span_with_request_id, request_id_middleware};

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes())
        .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        // Users and friendships
        .route("/users", post(users::create_user))
        .route("/users/:id", get(users::get_user))
        .route("/users/:id/friends", get(users::get_friends))
        .route(
            "/users/:id/friends/:friend_id",
            put(users::request_friend).delete(users::remove_friend),
        )
        .route(
            "/users/:id/friends/:friend_id/confirm",
            put(users::confirm_friend),
        )
        .route(
            "/users/:id/friends/common/:other_id",
            get(users::common_friends),
        )
        .route("/users/:id/recommendations", get(users::recommendations))
        // Films and likes
        .route("/films", post(films::create_film))
        .route("/films/popular", get(films::popular_films))
        .route("/films/:id", get(films::get_film))
        .route(
            "/films/:id/like/:user_id",
            put(films::like_film).delete(films::unlike_film),
        )
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::request_id::REQUEST_ID_HEADER;
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_request_id_echoed() {
        let app = create_router(AppState::in_memory(10));
        let id = "6f1c1a9e-3b7e-4c43-9a59-0d2f0e7f6b11";

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header(REQUEST_ID_HEADER, id)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[REQUEST_ID_HEADER], id);
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let app = create_router(AppState::in_memory(10));
        let response = app
            .oneshot(Request::builder().uri("/api/v1/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
