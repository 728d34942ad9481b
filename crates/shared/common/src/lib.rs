//! Common utilities shared across the workspace.
//!
//! This crate provides:
//! - Unified error handling with client/server fault classification
//! - Configuration structures
//! - Connection-string helpers (canonical scheme, credential masking)

pub mod config;
pub mod error;

pub use config::*;
pub use error::{AppError, AppResult, Fault};
