//! Progress record manager.
//!
//! Owns per-(user, course, video) [`VideoProgress`] records. Each
//! `track_progress` call is one read-merge-write against a single record,
//! executed atomically by [`Database::update_video_progress`]. Records for
//! different keys share no state beyond the connection itself.

use std::sync::Arc;

use chrono::Utc;

use crate::db::{run_blocking, storage_precision, Database};
use crate::error::Result;
use crate::types::{ProgressKey, VideoProgress};

use super::{apply_update, ProgressUpdate};

/// Async front for recording player progress.
#[derive(Clone)]
pub struct ProgressTracker {
    db: Arc<Database>,
}

impl ProgressTracker {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Apply a player report to the record for `key`, creating it on first use.
    ///
    /// Fails with `CourseNotFound` if the course is unknown. Re-delivering the
    /// same report leaves coverage and `total_watch_time` unchanged.
    pub async fn track_progress(
        &self,
        key: ProgressKey,
        update: ProgressUpdate,
    ) -> Result<VideoProgress> {
        run_blocking(&self.db, move |db| {
            db.require_course(&key.course_id)?;

            let now = storage_precision(Utc::now());
            let record = db.update_video_progress(&key, now, |record| {
                apply_update(record, &update, now);
                Ok(())
            })?;

            tracing::debug!(
                key = %key,
                segments = record.watched_segments.len(),
                total_watch_time = record.total_watch_time,
                completed = record.completed,
                "Tracked video progress"
            );
            Ok(record)
        })
        .await
    }

    /// Current record for `key`, if it was ever tracked.
    pub async fn get_progress(&self, key: ProgressKey) -> Result<Option<VideoProgress>> {
        run_blocking(&self.db, move |db| db.get_video_progress(&key)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::types::{Course, WatchedSegment};

    fn tracker() -> ProgressTracker {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        db.upsert_course(&Course {
            id: "c1".to_string(),
            title: "Rust 101".to_string(),
            created_at: Utc::now(),
        })
        .unwrap();
        ProgressTracker::new(Arc::new(db))
    }

    fn key() -> ProgressKey {
        ProgressKey::new("u1", "c1", "v1").unwrap()
    }

    fn seg(start: f64, end: f64) -> WatchedSegment {
        WatchedSegment::new(start, end).unwrap()
    }

    #[tokio::test]
    async fn test_track_creates_record_lazily() {
        let tracker = tracker();
        assert!(tracker.get_progress(key()).await.unwrap().is_none());

        let update = ProgressUpdate::new(25.0, 120.0)
            .unwrap()
            .with_segments(vec![seg(0.0, 10.0), seg(5.0, 15.0), seg(20.0, 25.0)]);
        let record = tracker.track_progress(key(), update).await.unwrap();

        assert_eq!(record.watched_segments, vec![seg(0.0, 15.0), seg(20.0, 25.0)]);
        assert_eq!(record.total_watch_time, 20.0);
        assert_eq!(record.last_position, 25.0);

        let stored = tracker.get_progress(key()).await.unwrap().unwrap();
        assert_eq!(stored, record);
    }

    #[tokio::test]
    async fn test_unknown_course_is_not_found() {
        let tracker = tracker();
        let key = ProgressKey::new("u1", "nope", "v1").unwrap();
        let err = tracker
            .track_progress(key, ProgressUpdate::new(0.0, 10.0).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::CourseNotFound(_)));
    }

    #[tokio::test]
    async fn test_completion_timestamp_is_stable() {
        let tracker = tracker();
        let done = ProgressUpdate::new(120.0, 120.0).unwrap().completed();

        let first = tracker.track_progress(key(), done.clone()).await.unwrap();
        let second = tracker.track_progress(key(), done).await.unwrap();
        let third = tracker
            .track_progress(key(), ProgressUpdate::new(3.0, 120.0).unwrap())
            .await
            .unwrap();

        assert!(first.completed_at.is_some());
        assert_eq!(second.completed_at, first.completed_at);

        // The returned value is exactly what a later read sees
        let stored = tracker.get_progress(key()).await.unwrap().unwrap();
        assert_eq!(stored.completed_at, first.completed_at);
        assert_eq!(first.completed_at.unwrap().timestamp_subsec_nanos() % 1_000, 0);
        assert!(third.completed);
        assert_eq!(third.completed_at, first.completed_at);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_updates_converge_to_union() {
        let tracker = tracker();
        let reports = 24;

        let handles: Vec<_> = (0..reports)
            .map(|i| {
                let tracker = tracker.clone();
                // Disjoint, non-touching segments: [10i, 10i + 5]
                let start = (i * 10) as f64;
                let update = ProgressUpdate::new(start + 5.0, 1000.0)
                    .unwrap()
                    .with_segments(vec![seg(start, start + 5.0)]);
                tokio::spawn(async move { tracker.track_progress(key(), update).await })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let record = tracker.get_progress(key()).await.unwrap().unwrap();
        assert_eq!(record.watched_segments.len(), reports);
        assert_eq!(record.total_watch_time, 5.0 * reports as f64);
        for (i, segment) in record.watched_segments.iter().enumerate() {
            assert_eq!(*segment, seg((i * 10) as f64, (i * 10) as f64 + 5.0));
        }
    }
}
