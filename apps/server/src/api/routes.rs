//! Router assembly.

use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::api::handlers::{friendships, users};
use crate::api::middleware;
use crate::auth::auth_middleware;
use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/users", get(users::list_users))
        .route("/users/:id", get(users::get_user))
        .route("/friends", get(friendships::list_friends))
        .route("/friends/:user_id", delete(friendships::remove_friend))
        .route(
            "/friend-requests",
            get(friendships::list_incoming_requests),
        )
        .route(
            "/friend-requests/:user_id",
            post(friendships::send_request),
        )
        .route(
            "/friend-requests/:id/accept",
            post(friendships::accept_request),
        )
        .route(
            "/friend-requests/:id/reject",
            post(friendships::reject_request),
        )
        .route(
            "/friend-requests/:id/cancel",
            post(friendships::cancel_request),
        )
        .route(
            "/blocks/:user_id",
            post(friendships::block_user).delete(friendships::unblock_user),
        )
        .route(
            "/relationships/:user_id",
            get(friendships::relationship_status),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api)
        .layer(axum::middleware::from_fn(
            middleware::security_headers_middleware,
        ))
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(middleware::compression())
        .layer(middleware::cors(&state.config.server.cors_origins))
        .layer(DefaultBodyLimit::max(
            state.config.server.max_request_body_size,
        ))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
