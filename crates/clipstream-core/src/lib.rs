//! Clipstream Core Library
//!
//! This crate provides the domain models, error types, and configuration
//! shared across all clipstream components: the upload coordinator, the
//! transcode job queue, and the transcode worker.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod transcode_error;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, LogLevel};
pub use transcode_error::{TranscodeError, TranscodeResultExt};
