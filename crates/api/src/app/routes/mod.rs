use axum::{Router, routing::get};

pub mod dispatches;
pub mod reports;
pub mod supplies;
pub mod system;

/// Router for every endpoint.
pub fn router() -> Router {
    Router::new()
        .route("/", get(system::liveness))
        .route("/health", get(system::health))
        .nest("/supplies", supplies::router())
        .nest("/dispatches", dispatches::router())
        .nest("/reports", reports::router())
}
