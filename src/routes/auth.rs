//! Login, registration and current-account routes.

use crate::handlers::auth::{me, register, token};
use crate::state::AppState;
use axum::{routing::get, routing::post, Router};

pub fn auth_routes(state: AppState) -> Router {
    Router::new()
        .route("/token", post(token))
        .route("/users/create", post(register))
        .route("/users/me", get(me))
        .with_state(state)
}
