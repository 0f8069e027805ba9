//! Sheet Dispatch - Split a spreadsheet and mail each part
//!
//! A Rust library for splitting a records spreadsheet by categorical columns
//! and emailing every resulting file to the matching recipient from a
//! distribution list.
//!
//! # Features
//!
//! - Load `.xlsx` and `.csv` tables
//! - One output file per distinct value of each grouping column
//! - Case- and whitespace-insensitive matching on (role, name)
//! - SMTP or pickup-directory mail transports
//! - Flagged distribution list and zipped output tree as results

/// Configuration management
pub mod config;
/// Matching and sending
pub mod dispatch;
/// Error types
pub mod error;
/// Result artifacts
pub mod export;
/// Spreadsheet writing
pub mod file_writer;
/// Spreadsheet loading
pub mod loader;
/// Logging setup and utilities
pub mod logging;
/// Mail composition and transports
pub mod mailer;
/// Metrics collection
pub mod metrics;
/// Data models and structures
pub mod models;
/// Record splitting
pub mod partition;
/// End-to-end run orchestration
pub mod service;
/// Input validation and sanitization
pub mod validation;

// Re-export key components for easier access
pub use config::AppConfig;
pub use error::{DispatchError, Result};
pub use models::{Cell, DistributionList, MatchKey, SentFlag, Table};
pub use service::{DispatchService, RunOutput, RunRequest};
