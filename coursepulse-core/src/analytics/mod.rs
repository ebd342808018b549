//! Analytics for course dashboards
//!
//! Provides aggregate statistics over progress records and the activity log:
//! - Bracket distributions of percentages and skill levels
//! - Daily/weekly/monthly engagement series
//! - Course, class, video and per-student metrics
//!
//! The pure building blocks live in [`distribution`] and [`timeseries`];
//! [`metrics`] combines them with storage reads.

pub mod distribution;
pub mod metrics;
pub mod timeseries;

pub use distribution::{bucketize, BracketDistribution, BRACKETS};
pub use metrics::{
    ActivityCounts, ActivitySummary, ClassMetrics, CompletionStats, EngagementMetrics,
    MetricsService, StudentProgress, VideoAnalytics,
};
pub use timeseries::{aggregate, daily_counts, Granularity, SeriesPoint, TimeWindow};
