//! Session folder quarantine and CSV combining for storybook data collection.
//!
//! This crate provides tools for:
//! - Quarantining session folders whose command/event CSV exports are missing or empty
//! - Listing the subfolders of a subject folder
//! - Combining timestamped per-session CSV exports into one CSV and Excel file
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use storybook_pipeline::{processors::quarantine::check_parent, QuarantineConfig};
//!
//! let summary = check_parent(Path::new("Subjects/kipp_stations"), &QuarantineConfig::default(), false).unwrap();
//! println!("{} session folders remain", summary.total_remaining);
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod processors;

pub use crate::config::{CombineConfig, PipelineConfig, QuarantineConfig};
pub use crate::core::loaders::{CsvTable, FileStatus};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
