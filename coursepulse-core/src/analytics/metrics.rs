//! Metrics orchestration.
//!
//! [`MetricsService`] answers the dashboard queries by combining storage
//! reads with the pure helpers in [`super::distribution`],
//! [`super::timeseries`] and [`crate::progress::completion`]. Each query is
//! a read-only snapshot; a failure of any part fails the whole response.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;

use crate::config::AnalyticsConfig;
use crate::db::{run_blocking, ActivityFilter, Database};
use crate::error::Result;
use crate::progress::completion::{
    completion_percentage, course_completion_rate, rounded_mean, StudentCompletion,
};
use crate::types::{Activity, AchievementKind, SkillTrend};

use super::distribution::{bucketize, BracketDistribution};
use super::timeseries::{aggregate, daily_counts, Granularity, SeriesPoint, TimeWindow};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementMetrics {
    pub total_students: u64,
    pub active_students: u64,
    pub completion_rate: f64,
    pub daily_engagement: Vec<SeriesPoint>,
    pub weekly_engagement: Vec<SeriesPoint>,
    pub monthly_engagement: Vec<SeriesPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassMetrics {
    pub enrolled_students: u64,
    pub completion_stats: ClassCompletionStats,
    pub skill_metrics: Vec<SkillMetric>,
    pub trends: Vec<TrendPoint>,
}

/// Completion across the enrolled roster. Students without any progress
/// count toward `total_students` but not toward `completed_count`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassCompletionStats {
    pub total_students: u64,
    /// Students with at least one completed video
    pub completed_count: u64,
    /// Mean completed-video count over students with progress
    pub average_completion: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillMetric {
    pub skill: String,
    pub average_level: f64,
    pub distribution: BracketDistribution,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub activity_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoAnalytics {
    pub total_views: u64,
    pub completions: u64,
    pub average_watch_time: f64,
    pub drop_off_points: Vec<DropOffPoint>,
}

/// Number of unfinished views whose playhead stopped at `time` (whole seconds).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DropOffPoint {
    pub time: u64,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionStats {
    pub total_students: u64,
    pub total_content: u64,
    pub completion_rates: BracketDistribution,
    pub average_completion: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentProgress {
    pub overall_progress: f64,
    pub completed_content: u64,
    pub total_content: u64,
    pub achievements: Vec<AchievementView>,
    pub skills: Vec<SkillView>,
    pub recent_activities: Vec<RecentActivity>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementView {
    pub title: String,
    #[serde(rename = "type")]
    pub kind: AchievementKind,
    pub progress: f64,
    pub achieved: bool,
    pub achieved_at: Option<DateTime<Utc>>,
    pub icon: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkillView {
    pub name: String,
    pub category: String,
    pub level: f64,
    pub trend: SkillTrend,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentActivity {
    #[serde(rename = "type")]
    pub kind: String,
    pub action: String,
    pub timestamp: DateTime<Utc>,
}

impl From<Activity> for RecentActivity {
    fn from(activity: Activity) -> Self {
        Self {
            kind: activity.kind.as_str().to_string(),
            action: activity.action,
            timestamp: activity.timestamp,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivitySummary {
    pub recent_activities: Vec<Activity>,
    pub summary: ActivityCounts,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityCounts {
    pub course_access: u64,
    pub content_interactions: u64,
    pub assessment_attempts: u64,
    pub discussion_posts: u64,
}

/// Async query service over the progress and activity stores.
#[derive(Clone)]
pub struct MetricsService {
    db: Arc<Database>,
    config: AnalyticsConfig,
}

impl MetricsService {
    pub fn new(db: Arc<Database>, config: AnalyticsConfig) -> Self {
        Self { db, config }
    }

    /// Engagement overview, platform-wide or for one course.
    pub async fn engagement(&self, course_id: Option<&str>) -> Result<EngagementMetrics> {
        self.engagement_at(course_id, Utc::now()).await
    }

    pub async fn engagement_at(
        &self,
        course_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<EngagementMetrics> {
        let course_id = course_id.map(String::from);
        if let Some(course) = course_id.clone() {
            run_blocking(&self.db, move |db| db.require_course(&course)).await?;
        }

        let active_since = now - Duration::days(i64::from(self.config.active_window_days));
        let (totals, daily, weekly, monthly) = tokio::try_join!(
            self.student_totals(course_id.clone(), active_since),
            self.series(course_id.as_deref(), Granularity::Daily, now),
            self.series(course_id.as_deref(), Granularity::Weekly, now),
            self.series(course_id.as_deref(), Granularity::Monthly, now),
        )?;
        let (total_students, active_students, completion_rate) = totals;

        tracing::debug!(
            course = course_id.as_deref().unwrap_or("*"),
            total_students,
            active_students,
            "Computed engagement"
        );

        Ok(EngagementMetrics {
            total_students,
            active_students,
            completion_rate,
            daily_engagement: daily,
            weekly_engagement: weekly,
            monthly_engagement: monthly,
        })
    }

    async fn student_totals(
        &self,
        course_id: Option<String>,
        active_since: DateTime<Utc>,
    ) -> Result<(u64, u64, f64)> {
        run_blocking(&self.db, move |db| {
            let course = course_id.as_deref();
            let total = db.count_students(course)?;
            let active = db
                .count_distinct_active_users(&ActivityFilter::course(course).since(active_since))?;
            let rate = match course {
                Some(course) => course_completion_rate(&enrolled_completions(db, course)?),
                None => 0.0,
            };
            Ok((total, active, rate))
        })
        .await
    }

    async fn series(
        &self,
        course_id: Option<&str>,
        granularity: Granularity,
        now: DateTime<Utc>,
    ) -> Result<Vec<SeriesPoint>> {
        let window = granularity.window(now);
        let filter = ActivityFilter::course(course_id).between(window.start, window.end);
        let timestamps = run_blocking(&self.db, move |db| db.list_activity_timestamps(&filter)).await?;
        Ok(aggregate(&timestamps, &window, granularity))
    }

    /// Instructor view of one course.
    pub async fn class_metrics(&self, course_id: &str) -> Result<ClassMetrics> {
        self.class_metrics_at(course_id, Utc::now()).await
    }

    pub async fn class_metrics_at(&self, course_id: &str, now: DateTime<Utc>) -> Result<ClassMetrics> {
        let course_id = course_id.to_string();
        let window = TimeWindow::trailing(now, i64::from(self.config.trend_window_days));

        run_blocking(&self.db, move |db| {
            db.require_course(&course_id)?;

            let enrolled_students = db.count_students(Some(&course_id))?;

            let counts = db.progress_completion_counts(&course_id)?;
            let completion_stats = ClassCompletionStats {
                total_students: enrolled_students,
                completed_count: counts.iter().filter(|c| c.completed_videos > 0).count() as u64,
                average_completion: rounded_mean(counts.iter().map(|c| c.completed_videos as f64)),
            };

            let skill_metrics = db
                .course_skill_levels(&course_id)?
                .into_iter()
                .map(|(skill, levels)| SkillMetric {
                    skill,
                    average_level: rounded_mean(levels.iter().copied()),
                    distribution: bucketize(levels),
                })
                .collect();

            let filter = ActivityFilter::course(Some(&course_id)).between(window.start, window.end);
            let timestamps = db.list_activity_timestamps(&filter)?;
            let trends = daily_counts(&timestamps, &window)
                .into_iter()
                .map(|(date, activity_count)| TrendPoint {
                    date,
                    activity_count,
                })
                .collect();

            Ok(ClassMetrics {
                enrolled_students,
                completion_stats,
                skill_metrics,
                trends,
            })
        })
        .await
    }

    /// Viewing statistics for one video.
    pub async fn video_analytics(&self, course_id: &str, video_id: &str) -> Result<VideoAnalytics> {
        let course_id = course_id.to_string();
        let video_id = video_id.to_string();

        run_blocking(&self.db, move |db| {
            db.require_course(&course_id)?;
            let records = db.list_video_progress(&course_id, &video_id)?;

            let mut drop_offs: BTreeMap<u64, u64> = BTreeMap::new();
            for record in records.iter().filter(|r| !r.completed) {
                *drop_offs.entry(record.last_position.floor() as u64).or_insert(0) += 1;
            }

            Ok(VideoAnalytics {
                total_views: records.len() as u64,
                completions: records.iter().filter(|r| r.completed).count() as u64,
                average_watch_time: rounded_mean(records.iter().map(|r| r.total_watch_time)),
                drop_off_points: drop_offs
                    .into_iter()
                    .map(|(time, count)| DropOffPoint { time, count })
                    .collect(),
            })
        })
        .await
    }

    /// Distribution of per-student completion across the enrolled roster.
    pub async fn completion_stats(&self, course_id: &str) -> Result<CompletionStats> {
        let course_id = course_id.to_string();

        run_blocking(&self.db, move |db| {
            db.require_course(&course_id)?;
            let total_content = db.count_course_content(&course_id)?;
            let students = enrolled_completions(db, &course_id)?;

            Ok(CompletionStats {
                total_students: students.len() as u64,
                total_content,
                completion_rates: bucketize(students.iter().map(|s| s.percentage)),
                average_completion: rounded_mean(students.iter().map(|s| s.percentage)),
            })
        })
        .await
    }

    /// One student's progress through a course.
    pub async fn student_progress(&self, course_id: &str, user_id: &str) -> Result<StudentProgress> {
        let course_id = course_id.to_string();
        let user_id = user_id.to_string();
        let limit = self.config.recent_activity_limit;

        run_blocking(&self.db, move |db| {
            db.require_course(&course_id)?;
            let total_content = db.count_course_content(&course_id)?;
            let completed_content = db.count_completed_videos(&user_id, &course_id)?;

            let achievements = db
                .list_achievements(&user_id, &course_id)?
                .into_iter()
                .map(|a| AchievementView {
                    title: a.title,
                    kind: a.kind,
                    progress: a.progress,
                    achieved: a.achieved,
                    achieved_at: a.achieved_at,
                    icon: a.icon,
                })
                .collect();

            let skills = db
                .list_skill_progress(&user_id, &course_id)?
                .into_iter()
                .map(|s| SkillView {
                    name: s.skill,
                    category: s.category,
                    level: s.level,
                    trend: s.trend,
                })
                .collect();

            let filter = ActivityFilter::course(Some(&course_id)).user(Some(&user_id));
            let recent_activities = db
                .list_recent_activities(&filter, limit)?
                .into_iter()
                .map(RecentActivity::from)
                .collect();

            Ok(StudentProgress {
                overall_progress: completion_percentage(completed_content, total_content),
                completed_content,
                total_content,
                achievements,
                skills,
                recent_activities,
            })
        })
        .await
    }

    /// Recent activities and per-kind counts, optionally narrowed to a
    /// course and/or user.
    pub async fn activity_summary(
        &self,
        course_id: Option<&str>,
        user_id: Option<&str>,
    ) -> Result<ActivitySummary> {
        let filter = ActivityFilter::course(course_id).user(user_id);
        let limit = self.config.recent_activity_limit;

        run_blocking(&self.db, move |db| {
            if let Some(course) = &filter.course_id {
                db.require_course(course)?;
            }
            let recent_activities = db.list_recent_activities(&filter, limit)?;
            let by_kind = db.count_activities_by_kind(&filter)?;
            let count = |kind: &str| by_kind.get(kind).copied().unwrap_or(0);

            Ok(ActivitySummary {
                recent_activities,
                summary: ActivityCounts {
                    course_access: count("course_access"),
                    content_interactions: count("content_interaction"),
                    assessment_attempts: count("assessment"),
                    discussion_posts: count("discussion"),
                },
            })
        })
        .await
    }
}

/// Per-student completion for every enrolled student of a course.
fn enrolled_completions(db: &Database, course_id: &str) -> Result<Vec<StudentCompletion>> {
    let total_content = db.count_course_content(course_id)?;
    Ok(db
        .enrolled_completion_counts(course_id)?
        .into_iter()
        .map(|c| StudentCompletion::new(c.user_id, c.completed_videos, total_content))
        .collect())
}
