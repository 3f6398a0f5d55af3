//! Shared utilities for deploysnap.
//!
//! - Logging setup with tracing
//! - RAII-based timing for snapshot operations

pub mod log;
pub mod timing;

pub use log::{LogConfig, LogLevel};
pub use timing::TimingGuard;
