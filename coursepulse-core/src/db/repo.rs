//! Database repository layer
//!
//! Provides query and insert operations for all entity types.

use crate::error::{Error, Result};
use crate::types::*;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Filter for activity log queries. `None` fields match everything.
#[derive(Debug, Clone, Default)]
pub struct ActivityFilter {
    /// Only activities in this course
    pub course_id: Option<String>,
    /// Only activities by this user
    pub user_id: Option<String>,
    /// Inclusive lower bound on the timestamp
    pub since: Option<DateTime<Utc>>,
    /// Inclusive upper bound on the timestamp
    pub until: Option<DateTime<Utc>>,
}

impl ActivityFilter {
    pub fn course(course_id: Option<&str>) -> Self {
        Self {
            course_id: course_id.map(String::from),
            ..Default::default()
        }
    }

    pub fn between(mut self, since: DateTime<Utc>, until: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self.until = Some(until);
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn user(mut self, user_id: Option<&str>) -> Self {
        self.user_id = user_id.map(String::from);
        self
    }
}

/// Completed-video count for one student in one course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserCompletionCount {
    pub user_id: String,
    pub completed_videos: u64,
}

/// Formats a timestamp for storage.
///
/// Fixed precision keeps stored values lexically ordered, so range filters
/// can compare the text directly.
pub(crate) fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Truncates a timestamp to the precision [`format_ts`] keeps.
///
/// Values handed back to callers must compare equal to what a later read
/// returns.
pub(crate) fn storage_precision(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.trunc_subsecs(6)
}

fn parse_ts(idx: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn ts_column(row: &Row, name: &str) -> rusqlite::Result<DateTime<Utc>> {
    let idx = row.as_ref().column_index(name)?;
    let value: String = row.get(idx)?;
    parse_ts(idx, &value)
}

fn opt_ts_column(row: &Row, name: &str) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let idx = row.as_ref().column_index(name)?;
    let value: Option<String> = row.get(idx)?;
    value.map(|v| parse_ts(idx, &v)).transpose()
}

fn json_column<T: DeserializeOwned>(row: &Row, name: &str) -> rusqlite::Result<T> {
    let idx = row.as_ref().column_index(name)?;
    let value: String = row.get(idx)?;
    serde_json::from_str(&value)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parsed_column<T>(row: &Row, name: &str) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = String>,
{
    let idx = row.as_ref().column_index(name)?;
    let value: String = row.get(idx)?;
    value
        .parse()
        .map_err(|e: String| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.into()))
}

/// Database handle with connection pooling (single connection for now)
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create a database at the given path
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA busy_timeout = 5000;
            ",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run migrations on this database
    pub fn migrate(&self) -> Result<()> {
        let conn = self.lock();
        super::schema::run_migrations(&conn)
    }

    /// Get the underlying connection (for advanced use)
    pub fn connection(&self) -> MutexGuard<'_, Connection> {
        self.lock()
    }

    // Poisoning is ignored: multi-statement writes run inside a transaction.
    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ============================================
    // Course operations
    // ============================================

    /// Insert or update a course
    pub fn upsert_course(&self, course: &Course) -> Result<()> {
        let conn = self.lock();
        conn.execute(
            r#"
            INSERT INTO courses (id, title, created_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(id) DO UPDATE SET title = excluded.title
            "#,
            params![course.id, course.title, format_ts(&course.created_at)],
        )?;
        Ok(())
    }

    /// Get a course by ID
    pub fn get_course(&self, id: &str) -> Result<Option<Course>> {
        let conn = self.lock();
        conn.query_row("SELECT * FROM courses WHERE id = ?", [id], Self::row_to_course)
            .optional()
            .map_err(Error::from)
    }

    /// Get a course by ID, failing with `CourseNotFound` when absent
    pub fn require_course(&self, id: &str) -> Result<Course> {
        self.get_course(id)?
            .ok_or_else(|| Error::CourseNotFound(id.to_string()))
    }

    fn row_to_course(row: &Row) -> rusqlite::Result<Course> {
        Ok(Course {
            id: row.get("id")?,
            title: row.get("title")?,
            created_at: ts_column(row, "created_at")?,
        })
    }

    /// Insert or update a content item of a course
    pub fn upsert_course_content(&self, content: &CourseContent) -> Result<()> {
        let conn = self.lock();
        conn.execute(
            r#"
            INSERT INTO course_content (course_id, content_id, content_type, position)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(course_id, content_id) DO UPDATE SET
                content_type = excluded.content_type,
                position = excluded.position
            "#,
            params![
                content.course_id,
                content.content_id,
                content.content_type,
                content.position
            ],
        )?;
        Ok(())
    }

    /// Number of content items in a course
    pub fn count_course_content(&self, course_id: &str) -> Result<u64> {
        let conn = self.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM course_content WHERE course_id = ?",
            [course_id],
            |r| r.get(0),
        )?;
        Ok(count as u64)
    }

    /// Content items of a course, in position order
    pub fn list_course_content(&self, course_id: &str) -> Result<Vec<CourseContent>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT * FROM course_content WHERE course_id = ? ORDER BY position, content_id",
        )?;
        let rows = stmt.query_map([course_id], |row| {
            Ok(CourseContent {
                course_id: row.get("course_id")?,
                content_id: row.get("content_id")?,
                content_type: row.get("content_type")?,
                position: row.get("position")?,
            })
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(Error::from)
    }

    // ============================================
    // User / enrollment operations
    // ============================================

    /// Insert or update a user
    pub fn upsert_user(&self, user: &User) -> Result<()> {
        let conn = self.lock();
        conn.execute(
            r#"
            INSERT INTO users (id, display_name, role)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(id) DO UPDATE SET
                display_name = excluded.display_name,
                role = excluded.role
            "#,
            params![user.id, user.display_name, user.role.as_str()],
        )?;
        Ok(())
    }

    /// Get a user by ID
    pub fn get_user(&self, id: &str) -> Result<Option<User>> {
        let conn = self.lock();
        conn.query_row("SELECT * FROM users WHERE id = ?", [id], |row| {
            Ok(User {
                id: row.get("id")?,
                display_name: row.get("display_name")?,
                role: parsed_column(row, "role")?,
            })
        })
        .optional()
        .map_err(Error::from)
    }

    /// Enroll a user in a course (no-op if already enrolled)
    pub fn enroll(&self, enrollment: &Enrollment) -> Result<()> {
        let conn = self.lock();
        conn.execute(
            r#"
            INSERT INTO enrollments (user_id, course_id, enrolled_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(user_id, course_id) DO NOTHING
            "#,
            params![
                enrollment.user_id,
                enrollment.course_id,
                format_ts(&enrollment.enrolled_at)
            ],
        )?;
        Ok(())
    }

    /// Count students, optionally restricted to those enrolled in a course
    pub fn count_students(&self, course_id: Option<&str>) -> Result<u64> {
        let conn = self.lock();
        let count: i64 = match course_id {
            Some(course_id) => conn.query_row(
                r#"
                SELECT COUNT(*)
                FROM enrollments e
                JOIN users u ON u.id = e.user_id
                WHERE e.course_id = ?1 AND u.role = 'student'
                "#,
                [course_id],
                |r| r.get(0),
            )?,
            None => conn.query_row(
                "SELECT COUNT(*) FROM users WHERE role = 'student'",
                [],
                |r| r.get(0),
            )?,
        };
        Ok(count as u64)
    }

    /// Completed-video counts for every enrolled student of a course,
    /// including students with no progress at all (count 0).
    pub fn enrolled_completion_counts(&self, course_id: &str) -> Result<Vec<UserCompletionCount>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            r#"
            SELECT e.user_id, COALESCE(SUM(vp.completed), 0) AS completed_videos
            FROM enrollments e
            JOIN users u ON u.id = e.user_id
            LEFT JOIN video_progress vp
                ON vp.user_id = e.user_id AND vp.course_id = e.course_id
            WHERE e.course_id = ?1 AND u.role = 'student'
            GROUP BY e.user_id
            ORDER BY e.user_id
            "#,
        )?;
        let rows = stmt.query_map([course_id], Self::row_to_completion_count)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(Error::from)
    }

    /// Completed-video counts for every user with at least one progress
    /// record in the course.
    pub fn progress_completion_counts(&self, course_id: &str) -> Result<Vec<UserCompletionCount>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            r#"
            SELECT user_id, SUM(completed) AS completed_videos
            FROM video_progress
            WHERE course_id = ?1
            GROUP BY user_id
            ORDER BY user_id
            "#,
        )?;
        let rows = stmt.query_map([course_id], Self::row_to_completion_count)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(Error::from)
    }

    /// Completed-video count for one user in one course
    pub fn count_completed_videos(&self, user_id: &str, course_id: &str) -> Result<u64> {
        let conn = self.lock();
        let count: i64 = conn.query_row(
            r#"
            SELECT COUNT(*) FROM video_progress
            WHERE user_id = ?1 AND course_id = ?2 AND completed = 1
            "#,
            params![user_id, course_id],
            |r| r.get(0),
        )?;
        Ok(count as u64)
    }

    fn row_to_completion_count(row: &Row) -> rusqlite::Result<UserCompletionCount> {
        let completed: i64 = row.get("completed_videos")?;
        Ok(UserCompletionCount {
            user_id: row.get("user_id")?,
            completed_videos: completed.max(0) as u64,
        })
    }

    // ============================================
    // Video progress operations
    // ============================================

    /// Get the progress record for a key
    pub fn get_video_progress(&self, key: &ProgressKey) -> Result<Option<VideoProgress>> {
        let conn = self.lock();
        Self::query_video_progress(&conn, key)
    }

    /// Atomically read, modify and write one progress record.
    ///
    /// The record is loaded (or created with [`VideoProgress::new`]) and
    /// handed to `apply` inside an immediate transaction while the
    /// connection lock is held, so concurrent updates of the same key are
    /// applied one after another onto the latest stored state. If `apply`
    /// fails nothing is written.
    pub fn update_video_progress<F>(
        &self,
        key: &ProgressKey,
        now: DateTime<Utc>,
        apply: F,
    ) -> Result<VideoProgress>
    where
        F: FnOnce(&mut VideoProgress) -> Result<()>,
    {
        let mut conn = self.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut record =
            Self::query_video_progress(&tx, key)?.unwrap_or_else(|| VideoProgress::new(key, now));
        apply(&mut record)?;

        tx.execute(
            r#"
            INSERT INTO video_progress (
                user_id, course_id, video_id, watched_segments, last_position, duration,
                playback_rates, completed, completed_at, total_watch_time, last_updated, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            ON CONFLICT(user_id, course_id, video_id) DO UPDATE SET
                watched_segments = excluded.watched_segments,
                last_position = excluded.last_position,
                duration = excluded.duration,
                playback_rates = excluded.playback_rates,
                completed = excluded.completed,
                completed_at = excluded.completed_at,
                total_watch_time = excluded.total_watch_time,
                last_updated = excluded.last_updated
            "#,
            params![
                record.user_id,
                record.course_id,
                record.video_id,
                serde_json::to_string(&record.watched_segments)?,
                record.last_position,
                record.duration,
                serde_json::to_string(&record.playback_rates)?,
                record.completed,
                record.completed_at.as_ref().map(format_ts),
                record.total_watch_time,
                format_ts(&record.last_updated),
                format_ts(&record.created_at),
            ],
        )?;
        tx.commit()?;

        Ok(record)
    }

    /// All progress records for one video of a course
    pub fn list_video_progress(&self, course_id: &str, video_id: &str) -> Result<Vec<VideoProgress>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            r#"
            SELECT * FROM video_progress
            WHERE course_id = ?1 AND video_id = ?2
            ORDER BY user_id
            "#,
        )?;
        let rows = stmt.query_map(params![course_id, video_id], Self::row_to_video_progress)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(Error::from)
    }

    fn query_video_progress(conn: &Connection, key: &ProgressKey) -> Result<Option<VideoProgress>> {
        conn.query_row(
            r#"
            SELECT * FROM video_progress
            WHERE user_id = ?1 AND course_id = ?2 AND video_id = ?3
            "#,
            params![key.user_id, key.course_id, key.video_id],
            Self::row_to_video_progress,
        )
        .optional()
        .map_err(Error::from)
    }

    fn row_to_video_progress(row: &Row) -> rusqlite::Result<VideoProgress> {
        Ok(VideoProgress {
            user_id: row.get("user_id")?,
            course_id: row.get("course_id")?,
            video_id: row.get("video_id")?,
            watched_segments: json_column(row, "watched_segments")?,
            last_position: row.get("last_position")?,
            duration: row.get("duration")?,
            playback_rates: json_column(row, "playback_rates")?,
            completed: row.get("completed")?,
            completed_at: opt_ts_column(row, "completed_at")?,
            total_watch_time: row.get("total_watch_time")?,
            last_updated: ts_column(row, "last_updated")?,
            created_at: ts_column(row, "created_at")?,
        })
    }

    // ============================================
    // Activity log operations
    // ============================================

    /// Append an activity to the log
    pub fn insert_activity(&self, activity: &Activity) -> Result<()> {
        let conn = self.lock();
        conn.execute(
            r#"
            INSERT INTO activities (id, user_id, course_id, kind, action, target_id, target_type, ts)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                activity.id,
                activity.user,
                activity.course,
                activity.kind.as_str(),
                activity.action,
                activity.kind.target_id(),
                activity.kind.target_type(),
                format_ts(&activity.timestamp),
            ],
        )?;
        Ok(())
    }

    /// Timestamps of matching activities, oldest first
    pub fn list_activity_timestamps(&self, filter: &ActivityFilter) -> Result<Vec<DateTime<Utc>>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT ts FROM activities WHERE {} ORDER BY ts",
            Self::ACTIVITY_WHERE
        ))?;
        let p = Self::activity_params(filter);
        let rows = stmt.query_map(&p.as_slice_params(), |row| {
            let value: String = row.get(0)?;
            parse_ts(0, &value)
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(Error::from)
    }

    /// Number of distinct users with at least one matching activity
    pub fn count_distinct_active_users(&self, filter: &ActivityFilter) -> Result<u64> {
        let conn = self.lock();
        let count: i64 = conn.query_row(
            &format!(
                "SELECT COUNT(DISTINCT user_id) FROM activities WHERE {}",
                Self::ACTIVITY_WHERE
            ),
            &Self::activity_params(filter).as_slice_params(),
            |r| r.get(0),
        )?;
        Ok(count as u64)
    }

    /// Most recent matching activities, newest first
    pub fn list_recent_activities(&self, filter: &ActivityFilter, limit: usize) -> Result<Vec<Activity>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT * FROM activities WHERE {} ORDER BY ts DESC, id LIMIT ?5",
            Self::ACTIVITY_WHERE
        ))?;
        let p = Self::activity_params(filter);
        let rows = stmt.query_map(
            params![p.0, p.1, p.2, p.3, limit as i64],
            Self::row_to_activity,
        )?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(Error::from)
    }

    /// Matching activity counts keyed by stored kind (`course_access`, ...)
    pub fn count_activities_by_kind(&self, filter: &ActivityFilter) -> Result<HashMap<String, u64>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT kind, COUNT(*) FROM activities WHERE {} GROUP BY kind",
            Self::ACTIVITY_WHERE
        ))?;
        let p = Self::activity_params(filter);
        let rows = stmt.query_map(&p.as_slice_params(), |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut counts = HashMap::new();
        for row in rows {
            let (kind, count) = row?;
            counts.insert(kind, count.max(0) as u64);
        }
        Ok(counts)
    }

    const ACTIVITY_WHERE: &'static str = r#"
        (?1 IS NULL OR course_id = ?1)
        AND (?2 IS NULL OR user_id = ?2)
        AND (?3 IS NULL OR ts >= ?3)
        AND (?4 IS NULL OR ts <= ?4)
    "#;

    fn activity_params(filter: &ActivityFilter) -> ActivityParams {
        ActivityParams(
            filter.course_id.clone(),
            filter.user_id.clone(),
            filter.since.as_ref().map(format_ts),
            filter.until.as_ref().map(format_ts),
        )
    }

    fn row_to_activity(row: &Row) -> rusqlite::Result<Activity> {
        let kind_idx = row.as_ref().column_index("kind")?;
        let kind: String = row.get(kind_idx)?;
        let kind = ActivityKind::from_parts(&kind, row.get("target_id")?, row.get("target_type")?)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(kind_idx, Type::Text, e.into()))?;

        Ok(Activity {
            id: row.get("id")?,
            user: row.get("user_id")?,
            course: row.get("course_id")?,
            kind,
            action: row.get("action")?,
            timestamp: ts_column(row, "ts")?,
        })
    }

    // ============================================
    // Achievements and skills (collaborator-owned)
    // ============================================

    /// Insert or update an achievement (keyed by user, course, title)
    pub fn upsert_achievement(&self, achievement: &Achievement) -> Result<()> {
        let conn = self.lock();
        conn.execute(
            r#"
            INSERT INTO achievements (
                user_id, course_id, kind, title, description, progress,
                achieved, achieved_at, icon, sort_order
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ON CONFLICT(user_id, course_id, title) DO UPDATE SET
                kind = excluded.kind,
                description = excluded.description,
                progress = excluded.progress,
                achieved = excluded.achieved,
                achieved_at = excluded.achieved_at,
                icon = excluded.icon,
                sort_order = excluded.sort_order
            "#,
            params![
                achievement.user_id,
                achievement.course_id,
                achievement.kind.as_str(),
                achievement.title,
                achievement.description,
                achievement.progress,
                achievement.achieved,
                achievement.achieved_at.as_ref().map(format_ts),
                achievement.icon,
                achievement.order,
            ],
        )?;
        Ok(())
    }

    /// Achievements of a user in a course, in display order
    pub fn list_achievements(&self, user_id: &str, course_id: &str) -> Result<Vec<Achievement>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            r#"
            SELECT * FROM achievements
            WHERE user_id = ?1 AND course_id = ?2
            ORDER BY sort_order, title
            "#,
        )?;
        let rows = stmt.query_map(params![user_id, course_id], |row| {
            Ok(Achievement {
                user_id: row.get("user_id")?,
                course_id: row.get("course_id")?,
                kind: parsed_column(row, "kind")?,
                title: row.get("title")?,
                description: row.get("description")?,
                progress: row.get("progress")?,
                achieved: row.get("achieved")?,
                achieved_at: opt_ts_column(row, "achieved_at")?,
                icon: row.get("icon")?,
                order: row.get("sort_order")?,
            })
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(Error::from)
    }

    /// Insert or update a skill level
    pub fn upsert_skill_progress(&self, skill: &SkillProgress) -> Result<()> {
        let conn = self.lock();
        conn.execute(
            r#"
            INSERT INTO skill_progress (user_id, course_id, skill, category, level, trend, last_assessed)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(user_id, course_id, skill) DO UPDATE SET
                category = excluded.category,
                level = excluded.level,
                trend = excluded.trend,
                last_assessed = excluded.last_assessed
            "#,
            params![
                skill.user_id,
                skill.course_id,
                skill.skill,
                skill.category,
                skill.level,
                skill.trend.as_str(),
                skill.last_assessed.as_ref().map(format_ts),
            ],
        )?;
        Ok(())
    }

    /// Skill levels of a user in a course
    pub fn list_skill_progress(&self, user_id: &str, course_id: &str) -> Result<Vec<SkillProgress>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            r#"
            SELECT * FROM skill_progress
            WHERE user_id = ?1 AND course_id = ?2
            ORDER BY skill
            "#,
        )?;
        let rows = stmt.query_map(params![user_id, course_id], |row| {
            Ok(SkillProgress {
                user_id: row.get("user_id")?,
                course_id: row.get("course_id")?,
                skill: row.get("skill")?,
                category: row.get("category")?,
                level: row.get("level")?,
                trend: parsed_column(row, "trend")?,
                last_assessed: opt_ts_column(row, "last_assessed")?,
            })
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(Error::from)
    }

    /// All students' levels per skill in a course, skills in name order
    pub fn course_skill_levels(&self, course_id: &str) -> Result<BTreeMap<String, Vec<f64>>> {
        let conn = self.lock();
        let mut stmt =
            conn.prepare("SELECT skill, level FROM skill_progress WHERE course_id = ?1")?;
        let rows = stmt.query_map([course_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
        })?;

        let mut levels: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for row in rows {
            let (skill, level) = row?;
            levels.entry(skill).or_default().push(level);
        }
        Ok(levels)
    }
}

/// Bound parameters for [`Database::ACTIVITY_WHERE`]
struct ActivityParams(Option<String>, Option<String>, Option<String>, Option<String>);

impl ActivityParams {
    fn as_slice_params(&self) -> [&dyn rusqlite::ToSql; 4] {
        [&self.0, &self.1, &self.2, &self.3]
    }
}
