//! Request handlers.

pub mod detect;
pub mod health;
pub(crate) mod upload;
pub mod videos;

pub use detect::*;
pub use health::*;
pub use videos::*;
