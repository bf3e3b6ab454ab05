//! Entity routes, generic over the registry path segment.
//! Parameter names are shared across routes so static segments (`filter`, `sorted`,
//! `picture`) can sit beside the parameters at the same depth.

use crate::handlers::assets::picture;
use crate::handlers::entity::{delete as delete_handler, field_value, filter, list, read, sorted, upsert};
use crate::state::AppState;
use axum::{routing::get, routing::post, Router};

pub fn entity_routes(state: AppState) -> Router {
    Router::new()
        .route("/:path_segment", get(list).post(upsert))
        .route("/:path_segment/filter", post(filter))
        .route("/:path_segment/sorted/:key", get(sorted))
        .route("/:path_segment/:key", get(read).delete(delete_handler))
        .route("/:path_segment/:key/picture", get(picture))
        .route("/:path_segment/:key/:value", get(field_value))
        .with_state(state)
}
