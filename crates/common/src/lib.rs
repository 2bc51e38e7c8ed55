//! ScholarPort Common Library
//!
//! Shared code for the ScholarPort services including:
//! - Database entities and repository pattern
//! - Error types and HTTP mapping
//! - Configuration management
//! - Response envelope types
//! - Citation formatting
//! - Metrics helpers

pub mod config;
pub mod db;
pub mod errors;
pub mod format;
pub mod metrics;
pub mod response;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::Repository;
pub use errors::{AppError, Result};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Lower bound for citation publication years
pub const MIN_CITATION_YEAR: i32 = 1800;

/// Maximum number of citations accepted in one bulk import request
pub const MAX_BULK_CITATIONS: usize = 100;
