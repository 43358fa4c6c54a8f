//! Job tracking and supervised background execution.
//!
//! This crate provides:
//! - [`JobRegistry`]: the in-memory source of truth for job state
//! - [`JobScheduler`]: bounded-concurrency background processing with
//!   panic capture
//! - [`JobLogger`]: structured per-job logging

pub mod logging;
pub mod registry;
pub mod scheduler;

pub use logging::JobLogger;
pub use registry::JobRegistry;
pub use scheduler::JobScheduler;
