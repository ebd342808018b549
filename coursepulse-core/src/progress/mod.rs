//! Video progress tracking
//!
//! - [`segments`]: merging watched segments into canonical coverage
//! - [`completion`]: completion fractions and rounding
//! - [`tracker`]: the async progress record manager
//!
//! A player report arrives as a [`ProgressReport`], is validated once into a
//! [`ProgressUpdate`], and is then applied to the stored record with
//! [`apply_update`] inside a single storage transaction.

pub mod completion;
pub mod segments;
pub mod tracker;

pub use completion::{completion_percentage, round_one_decimal, StudentCompletion};
pub use segments::{merge_segments, total_watch_time};
pub use tracker::ProgressTracker;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::types::{PlaybackRate, VideoProgress, WatchedSegment};

/// Segment as sent by a client, before validation.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ReportedSegment {
    pub start: f64,
    pub end: f64,
}

/// Raw progress report body (`POST progress/{course}/{video}`).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressReport {
    pub current_time: f64,
    pub duration: f64,
    #[serde(default)]
    pub playback_rate: Option<f64>,
    #[serde(default)]
    pub watched_segments: Option<Vec<ReportedSegment>>,
    #[serde(default)]
    pub completed: Option<bool>,
}

/// A validated progress report.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    pub current_time: f64,
    pub duration: f64,
    pub playback_rate: Option<f64>,
    pub watched_segments: Vec<WatchedSegment>,
    pub completed: bool,
}

impl ProgressUpdate {
    /// Update that only moves the playhead.
    pub fn new(current_time: f64, duration: f64) -> Result<Self> {
        non_negative("currentTime", current_time)?;
        non_negative("duration", duration)?;
        Ok(Self {
            current_time,
            duration,
            playback_rate: None,
            watched_segments: Vec::new(),
            completed: false,
        })
    }

    pub fn with_segments(mut self, segments: Vec<WatchedSegment>) -> Self {
        self.watched_segments = segments;
        self
    }

    pub fn with_playback_rate(mut self, rate: f64) -> Result<Self> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(Error::validation(format!(
                "playbackRate must be a positive number (got {rate})"
            )));
        }
        self.playback_rate = Some(rate);
        Ok(self)
    }

    pub fn completed(mut self) -> Self {
        self.completed = true;
        self
    }
}

impl TryFrom<ProgressReport> for ProgressUpdate {
    type Error = Error;

    fn try_from(report: ProgressReport) -> Result<Self> {
        let segments = report
            .watched_segments
            .unwrap_or_default()
            .into_iter()
            .map(|s| WatchedSegment::new(s.start, s.end))
            .collect::<Result<Vec<_>>>()?;

        let mut update = ProgressUpdate::new(report.current_time, report.duration)?
            .with_segments(segments);
        if let Some(rate) = report.playback_rate {
            update = update.with_playback_rate(rate)?;
        }
        if report.completed == Some(true) {
            update = update.completed();
        }
        Ok(update)
    }
}

fn non_negative(field: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(Error::validation(format!(
            "{field} must be a non-negative number (got {value})"
        )));
    }
    Ok(())
}

/// Apply a validated update to a record.
///
/// Segments are merged with what is already stored, never replaced by the
/// report alone. `completed_at` is stamped only on the first transition to
/// completed.
pub fn apply_update(record: &mut VideoProgress, update: &ProgressUpdate, now: DateTime<Utc>) {
    if !update.watched_segments.is_empty() {
        record.watched_segments =
            segments::merge_into(&record.watched_segments, &update.watched_segments);
    }

    if let Some(rate) = update.playback_rate {
        record.playback_rates.push(PlaybackRate {
            timestamp: now,
            rate,
        });
    }

    if update.completed && !record.completed {
        record.completed = true;
        record.completed_at = Some(now);
    }

    record.last_position = update.current_time;
    record.duration = update.duration;
    record.last_updated = now;
    record.total_watch_time = total_watch_time(&record.watched_segments);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProgressKey;
    use chrono::{Duration, TimeZone};

    fn record() -> VideoProgress {
        let key = ProgressKey::new("u1", "c1", "v1").unwrap();
        VideoProgress::new(&key, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
    }

    fn seg(start: f64, end: f64) -> WatchedSegment {
        WatchedSegment::new(start, end).unwrap()
    }

    #[test]
    fn test_apply_merges_with_stored_segments() {
        let now = Utc::now();
        let mut progress = record();

        let first = ProgressUpdate::new(10.0, 300.0)
            .unwrap()
            .with_segments(vec![seg(0.0, 10.0), seg(20.0, 25.0)]);
        apply_update(&mut progress, &first, now);

        let second = ProgressUpdate::new(15.0, 300.0)
            .unwrap()
            .with_segments(vec![seg(5.0, 15.0)]);
        apply_update(&mut progress, &second, now);

        assert_eq!(progress.watched_segments, vec![seg(0.0, 15.0), seg(20.0, 25.0)]);
        assert_eq!(progress.total_watch_time, 20.0);
        assert_eq!(progress.last_position, 15.0);
    }

    #[test]
    fn test_redelivery_is_idempotent() {
        let now = Utc::now();
        let mut progress = record();
        let update = ProgressUpdate::new(30.0, 60.0)
            .unwrap()
            .with_segments(vec![seg(0.0, 30.0)]);

        apply_update(&mut progress, &update, now);
        let after_first = progress.watched_segments.clone();
        apply_update(&mut progress, &update, now + Duration::seconds(5));

        assert_eq!(progress.watched_segments, after_first);
        assert_eq!(progress.total_watch_time, 30.0);
    }

    #[test]
    fn test_empty_segments_keep_coverage() {
        let now = Utc::now();
        let mut progress = record();
        apply_update(
            &mut progress,
            &ProgressUpdate::new(5.0, 60.0)
                .unwrap()
                .with_segments(vec![seg(0.0, 5.0)]),
            now,
        );
        apply_update(&mut progress, &ProgressUpdate::new(50.0, 60.0).unwrap(), now);

        assert_eq!(progress.watched_segments, vec![seg(0.0, 5.0)]);
        assert_eq!(progress.last_position, 50.0);
    }

    #[test]
    fn test_completed_at_first_write_wins() {
        let first_time = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let later = first_time + Duration::days(3);
        let mut progress = record();

        let done = ProgressUpdate::new(60.0, 60.0).unwrap().completed();
        apply_update(&mut progress, &done, first_time);
        apply_update(&mut progress, &done, later);

        assert!(progress.completed);
        assert_eq!(progress.completed_at, Some(first_time));
        assert_eq!(progress.last_updated, later);
    }

    #[test]
    fn test_playback_rates_are_appended() {
        let now = Utc::now();
        let mut progress = record();
        let update = ProgressUpdate::new(1.0, 60.0)
            .unwrap()
            .with_playback_rate(1.5)
            .unwrap();

        apply_update(&mut progress, &update, now);
        apply_update(&mut progress, &update, now);

        assert_eq!(progress.playback_rates.len(), 2);
        assert!(progress.playback_rates.iter().all(|r| r.rate == 1.5));
    }

    #[test]
    fn test_report_validation() {
        let report: ProgressReport = serde_json::from_value(serde_json::json!({
            "currentTime": 12.0,
            "duration": 100.0,
            "watchedSegments": [{"start": 10.0, "end": 5.0}]
        }))
        .unwrap();
        assert!(matches!(
            ProgressUpdate::try_from(report),
            Err(Error::Validation(_))
        ));

        let report: ProgressReport = serde_json::from_value(serde_json::json!({
            "currentTime": 12.0,
            "duration": 100.0,
            "playbackRate": 1.25,
            "completed": true
        }))
        .unwrap();
        let update = ProgressUpdate::try_from(report).unwrap();
        assert!(update.completed);
        assert_eq!(update.playback_rate, Some(1.25));
        assert!(update.watched_segments.is_empty());

        assert!(ProgressUpdate::new(-1.0, 10.0).is_err());
    }
}
