//! Append-only activity log.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::db::{run_blocking, storage_precision, Database};
use crate::error::{Error, Result};
use crate::types::{Activity, ActivityKind};

/// Activity body as sent by a client (`POST activity/{course}`).
///
/// ```json
/// {"type": "content_interaction", "contentId": "v1", "action": "play"}
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct ActivityReport {
    #[serde(flatten)]
    pub kind: ActivityKind,
    pub action: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Records activity events. Events are never updated or deleted.
#[derive(Clone)]
pub struct ActivityLog {
    db: Arc<Database>,
}

impl ActivityLog {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Append one event, stamped now unless `timestamp` is given.
    pub async fn record(
        &self,
        user_id: &str,
        course_id: &str,
        kind: ActivityKind,
        action: &str,
        timestamp: Option<DateTime<Utc>>,
    ) -> Result<Activity> {
        if user_id.trim().is_empty() {
            return Err(Error::validation("user must not be empty"));
        }
        if action.trim().is_empty() {
            return Err(Error::validation("action must not be empty"));
        }
        if kind.target_id().is_some_and(|id| id.trim().is_empty()) {
            return Err(Error::validation(format!("{kind} activity needs a target id")));
        }

        let activity = Activity {
            id: Uuid::new_v4().to_string(),
            user: user_id.to_string(),
            course: course_id.to_string(),
            kind,
            action: action.to_string(),
            timestamp: storage_precision(timestamp.unwrap_or_else(Utc::now)),
        };

        run_blocking(&self.db, move |db| {
            db.require_course(&activity.course)?;
            db.insert_activity(&activity)?;
            tracing::debug!(
                id = %activity.id,
                user = %activity.user,
                course = %activity.course,
                kind = %activity.kind,
                "Recorded activity"
            );
            Ok(activity)
        })
        .await
    }

    /// Append a client-reported event.
    pub async fn record_report(
        &self,
        user_id: &str,
        course_id: &str,
        report: ActivityReport,
    ) -> Result<Activity> {
        self.record(user_id, course_id, report.kind, &report.action, report.timestamp)
            .await
    }
}
