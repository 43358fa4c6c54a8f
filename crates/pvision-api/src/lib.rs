//! Axum HTTP API server.
//!
//! This crate provides:
//! - Synchronous single-image detection
//! - Asynchronous video processing with job polling and download
//! - Liveness/readiness probes that track model load
//! - Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod readiness;
pub mod routes;
pub mod state;
pub mod store;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use readiness::{ModelState, ReadinessState};
pub use routes::create_router;
pub use state::{AppState, ProcessingContext};
pub use store::ArtifactStore;
