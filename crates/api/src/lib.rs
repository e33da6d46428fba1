//! # Sandworm API
//!
//! HTTP intake for the dispatcher.
//!
//! - `POST /` queues a run request `{registry_url, image, logging_endpoint}`
//!   and answers `202 Accepted` with the id used in logs
//! - `GET /health` liveness probe
//! - `GET /api/status` queue and worker pool snapshot
//!
//! Submission is fire-and-forget: a request that is accepted here can still
//! fail later while pulling or running, and that outcome only shows up in
//! the job's remote log.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod routes;

use axum::Router;
use tower::ServiceBuilder;

use sandworm_dispatcher::DispatcherHandle;

use middleware::{cors_layer, request_logging, trace_layer};
use routes::{create_routes, AppState};

/// Router with the request logging and CORS layers applied.
pub fn create_app(dispatcher: DispatcherHandle) -> Router {
    create_routes(AppState { dispatcher }).layer(
        ServiceBuilder::new()
            .layer(trace_layer())
            .layer(cors_layer())
            .layer(axum::middleware::from_fn(request_logging)),
    )
}
