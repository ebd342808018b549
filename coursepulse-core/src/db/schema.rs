//! Database schema and migrations
//!
//! Uses SQLite with embedded migrations managed via PRAGMA user_version.

use rusqlite::Connection;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 2;

/// SQL migrations, indexed by version number
const MIGRATIONS: &[&str] = &[
    // Version 1: catalog, progress and activity log
    r#"
    -- ============================================
    -- Catalog (written by course/enrollment collaborators)
    -- ============================================

    CREATE TABLE IF NOT EXISTS courses (
        id               TEXT PRIMARY KEY,
        title            TEXT NOT NULL,
        created_at       DATETIME NOT NULL
    );

    CREATE TABLE IF NOT EXISTS course_content (
        course_id        TEXT NOT NULL REFERENCES courses(id) ON DELETE CASCADE,
        content_id       TEXT NOT NULL,
        content_type     TEXT NOT NULL,      -- 'video', 'document', 'quiz', ...
        position         INTEGER NOT NULL DEFAULT 0,

        PRIMARY KEY (course_id, content_id)
    );

    CREATE TABLE IF NOT EXISTS users (
        id               TEXT PRIMARY KEY,
        display_name     TEXT,
        role             TEXT NOT NULL       -- 'student', 'instructor', 'admin'
    );

    CREATE TABLE IF NOT EXISTS enrollments (
        user_id          TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        course_id        TEXT NOT NULL REFERENCES courses(id) ON DELETE CASCADE,
        enrolled_at      DATETIME NOT NULL,

        PRIMARY KEY (user_id, course_id)
    );

    CREATE INDEX IF NOT EXISTS idx_enrollments_course ON enrollments(course_id);

    -- ============================================
    -- Progress (owned by the progress tracker)
    -- ============================================

    CREATE TABLE IF NOT EXISTS video_progress (
        user_id          TEXT NOT NULL,
        course_id        TEXT NOT NULL REFERENCES courses(id) ON DELETE CASCADE,
        video_id         TEXT NOT NULL,

        watched_segments JSON NOT NULL,      -- disjoint, sorted [{start, end}]
        last_position    REAL NOT NULL DEFAULT 0,
        duration         REAL NOT NULL DEFAULT 0,
        playback_rates   JSON NOT NULL,      -- append-only [{timestamp, rate}]
        completed        INTEGER NOT NULL DEFAULT 0,
        completed_at     DATETIME,
        total_watch_time REAL NOT NULL DEFAULT 0,
        last_updated     DATETIME NOT NULL,
        created_at       DATETIME NOT NULL,

        PRIMARY KEY (user_id, course_id, video_id)
    );

    CREATE INDEX IF NOT EXISTS idx_video_progress_video
        ON video_progress(course_id, video_id, completed);

    -- ============================================
    -- Activity log (append-only)
    -- ============================================

    CREATE TABLE IF NOT EXISTS activities (
        id               TEXT PRIMARY KEY,
        user_id          TEXT NOT NULL,
        course_id        TEXT NOT NULL,
        kind             TEXT NOT NULL,      -- 'course_access', 'content_interaction', 'assessment', 'discussion'
        action           TEXT NOT NULL,
        target_id        TEXT,               -- content/assessment/discussion id
        target_type      TEXT,               -- 'video', 'quiz', ...
        ts               DATETIME NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_activities_user_course ON activities(user_id, course_id, ts DESC);
    CREATE INDEX IF NOT EXISTS idx_activities_course_ts ON activities(course_id, ts);
    CREATE INDEX IF NOT EXISTS idx_activities_ts ON activities(ts);
    "#,
    // Version 2: summaries written by grading/engagement collaborators
    r#"
    CREATE TABLE IF NOT EXISTS achievements (
        user_id          TEXT NOT NULL,
        course_id        TEXT NOT NULL REFERENCES courses(id) ON DELETE CASCADE,
        kind             TEXT NOT NULL,      -- 'completion', 'engagement', 'performance', 'contribution'
        title            TEXT NOT NULL,
        description      TEXT,
        progress         REAL NOT NULL DEFAULT 0,
        achieved         INTEGER NOT NULL DEFAULT 0,
        achieved_at      DATETIME,
        icon             TEXT,
        sort_order       INTEGER NOT NULL DEFAULT 0,

        UNIQUE(user_id, course_id, title)
    );

    CREATE INDEX IF NOT EXISTS idx_achievements_user_course ON achievements(user_id, course_id, kind);

    CREATE TABLE IF NOT EXISTS skill_progress (
        user_id          TEXT NOT NULL,
        course_id        TEXT NOT NULL REFERENCES courses(id) ON DELETE CASCADE,
        skill            TEXT NOT NULL,
        category         TEXT NOT NULL,
        level            REAL NOT NULL DEFAULT 0,
        trend            TEXT NOT NULL DEFAULT 'stable',
        last_assessed    DATETIME,

        PRIMARY KEY (user_id, course_id, skill)
    );

    CREATE INDEX IF NOT EXISTS idx_skill_progress_course ON skill_progress(course_id, skill);
    "#,
];

/// Run all pending migrations
pub fn run_migrations(conn: &Connection) -> crate::error::Result<()> {
    let current_version: i32 = conn
        .query_row("PRAGMA user_version", [], |r| r.get(0))
        .unwrap_or(0);

    tracing::info!(
        current_version,
        target_version = SCHEMA_VERSION,
        "Checking database migrations"
    );

    for (i, migration) in MIGRATIONS.iter().enumerate() {
        let version = (i + 1) as i32;
        if version > current_version {
            tracing::info!(version, "Running migration");
            conn.execute_batch(migration)?;
            conn.execute(&format!("PRAGMA user_version = {}", version), [])?;
        }
    }

    if current_version < SCHEMA_VERSION {
        tracing::info!(
            from = current_version,
            to = SCHEMA_VERSION,
            "Migrations complete"
        );
    }

    Ok(())
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> crate::error::Result<i32> {
    let version: i32 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
    Ok(version)
}
