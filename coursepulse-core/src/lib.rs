//! # coursepulse-core
//!
//! Core library for coursepulse - learning progress tracking and course
//! analytics.
//!
//! This library provides:
//! - Domain types for progress records, activities and catalog entries
//! - Database storage layer with SQLite
//! - Video progress tracking with watched-segment merging
//! - Engagement, completion and class analytics
//! - A request boundary mapping routes to services
//! - Configuration management
//! - Logging infrastructure
//!
//! ## Data flow
//!
//! Player reports go through [`ProgressTracker`], which merges watched
//! segments into the stored record. Activity events are appended by
//! [`ActivityLog`]. [`MetricsService`] reads both stores and shapes the
//! results into distributions and time series.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use coursepulse_core::{Config, Database, ProgressKey, ProgressTracker, ProgressUpdate};
//!
//! # async fn run() -> coursepulse_core::Result<()> {
//! let config = Config::load()?;
//! let db = Database::open(&config.database_path())?;
//! db.migrate()?;
//!
//! let tracker = ProgressTracker::new(Arc::new(db));
//! let key = ProgressKey::new("student-1", "rust-101", "intro")?;
//! let record = tracker
//!     .track_progress(key, ProgressUpdate::new(42.0, 600.0)?)
//!     .await?;
//! println!("{} seconds watched", record.total_watch_time);
//! # Ok(())
//! # }
//! ```

// Re-export commonly used items at the crate root
pub use activity::{ActivityLog, ActivityReport};
pub use analytics::MetricsService;
pub use api::{dispatch, Api, Method, Request, Response};
pub use config::Config;
pub use db::{ActivityFilter, Database};
pub use error::{Error, Result};
pub use progress::{ProgressReport, ProgressTracker, ProgressUpdate};
pub use types::*;

// Public modules
pub mod activity;
pub mod analytics;
pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod progress;
pub mod types;
