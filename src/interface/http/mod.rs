pub mod auth;
pub mod dto;
pub mod problem;
pub mod routes;
pub mod state;
pub mod trace;

use axum::Router;
use axum::middleware::from_fn;
use state::AppState;

/// Assemble the full HTTP surface. Trace ids are assigned before logging and owner checks.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::health::router())
        .merge(routes::ready::router())
        .merge(routes::metrics::router())
        .merge(routes::events::router())
        .merge(routes::endpoints::router())
        .merge(routes::deliveries::router())
        .layer(from_fn(auth::owner_middleware))
        .layer(from_fn(trace::request_log_middleware))
        .layer(from_fn(trace::trace_id_middleware))
        .with_state(state)
}
