//! coursepulse - learning progress tracking and course analytics CLI
//!
//! Registers courses, users and enrollments, records player progress and
//! activity, and prints every analytics query as JSON.
//!
//! Uses XDG Base Directory specification for file locations:
//! - Database: $XDG_DATA_HOME/coursepulse/progress.db (~/.local/share/coursepulse/progress.db)
//! - Config: $XDG_CONFIG_HOME/coursepulse/config.toml (~/.config/coursepulse/config.toml)
//! - Logs: $XDG_STATE_HOME/coursepulse/ (~/.local/state/coursepulse/)

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use coursepulse_core::{
    ActivityKind, ActivityLog, Api, Config, Course, CourseContent, Database, Enrollment,
    MetricsService, ProgressKey, ProgressTracker, ProgressUpdate, Request, Role, User,
    WatchedSegment,
};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "coursepulse")]
#[command(about = "Track learning progress and query course analytics")]
#[command(version)]
struct Args {
    /// Print compact JSON instead of pretty-printed
    #[arg(long, global = true)]
    compact: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Register or rename a course
    AddCourse {
        id: String,
        #[arg(short, long)]
        title: String,
    },

    /// Add a content item to a course
    AddContent {
        course: String,
        content: String,
        /// Content type (video, quiz, reading, ...)
        #[arg(short = 't', long = "type", default_value = "video")]
        content_type: String,
        /// Position within the course
        #[arg(short, long, default_value_t = 0)]
        position: i64,
    },

    /// Register a user
    AddUser {
        id: String,
        /// student, instructor or admin
        #[arg(short, long, default_value = "student")]
        role: Role,
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Enroll a user in a course
    Enroll { user: String, course: String },

    /// Record a player progress report
    Track {
        user: String,
        course: String,
        video: String,
        /// Current playhead in seconds
        #[arg(long)]
        current_time: f64,
        /// Video duration in seconds
        #[arg(long)]
        duration: f64,
        /// Watched span as START:END seconds (repeatable)
        #[arg(short, long = "segment", value_parser = parse_segment)]
        segments: Vec<WatchedSegment>,
        /// Playback rate in effect
        #[arg(long)]
        rate: Option<f64>,
        /// Mark the video as completed
        #[arg(long)]
        completed: bool,
    },

    /// Record an activity event
    Activity {
        user: String,
        course: String,
        /// course_access, content_interaction, assessment or discussion
        #[arg(short = 't', long = "type", default_value = "course_access")]
        kind: String,
        /// Content, assessment or discussion id
        #[arg(long)]
        target: Option<String>,
        /// Content or assessment sub-type
        #[arg(long)]
        target_type: Option<String>,
        #[arg(short, long, default_value = "view")]
        action: String,
        /// Event time (RFC 3339); defaults to now
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },

    /// Viewing statistics for one video
    VideoAnalytics { course: String, video: String },

    /// Completion distribution for a course
    CompletionStats { course: String },

    /// Engagement overview, platform-wide or for one course
    Engagement { course: Option<String> },

    /// Instructor metrics for a course
    ClassMetrics { course: String },

    /// One student's progress through a course
    StudentProgress { course: String, user: String },

    /// Recent activity and per-type counts
    ActivitySummary {
        #[arg(short, long)]
        course: Option<String>,
        #[arg(short, long)]
        user: Option<String>,
    },

    /// Dispatch a raw boundary request, e.g. `request GET engagement/c1`
    Request {
        method: coursepulse_core::Method,
        path: String,
        /// JSON body
        #[arg(short, long)]
        body: Option<String>,
        /// Acting user
        #[arg(short, long)]
        user: Option<String>,
    },
}

fn parse_segment(value: &str) -> std::result::Result<WatchedSegment, String> {
    let (start, end) = value
        .split_once(':')
        .ok_or_else(|| format!("expected START:END, got '{value}'"))?;
    let start: f64 = start.trim().parse().map_err(|e| format!("bad start: {e}"))?;
    let end: f64 = end.trim().parse().map_err(|e| format!("bad end: {e}"))?;
    WatchedSegment::new(start, end).map_err(|e| e.to_string())
}

fn main() -> Result<()> {
    let args = Args::parse();

    Config::ensure_xdg_env();

    // Load configuration
    let config = Config::load().context("failed to load configuration")?;

    // Initialize logging
    let _log_guard =
        coursepulse_core::logging::init(&config.logging).context("failed to initialize logging")?;

    tracing::info!("coursepulse starting");

    // Open database
    let db_path = config.database_path();
    tracing::info!(path = %db_path.display(), "Opening database");
    let db = Database::open(&db_path)
        .with_context(|| format!("failed to open database at {}", db_path.display()))?;
    db.migrate().context("failed to run database migrations")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    runtime.block_on(run(args, config, Arc::new(db)))
}

async fn run(args: Args, config: Config, db: Arc<Database>) -> Result<()> {
    let compact = args.compact;
    let metrics = MetricsService::new(db.clone(), config.analytics.clone());

    match args.command {
        Command::AddCourse { id, title } => {
            let course = Course {
                id,
                title,
                created_at: Utc::now(),
            };
            db.upsert_course(&course)?;
            print_json(&course, compact)
        }
        Command::AddContent {
            course,
            content,
            content_type,
            position,
        } => {
            db.require_course(&course)?;
            let item = CourseContent {
                course_id: course,
                content_id: content,
                content_type,
                position,
            };
            db.upsert_course_content(&item)?;
            print_json(&item, compact)
        }
        Command::AddUser { id, role, name } => {
            let user = User {
                id,
                display_name: name,
                role,
            };
            db.upsert_user(&user)?;
            print_json(&user, compact)
        }
        Command::Enroll { user, course } => {
            db.require_course(&course)?;
            if db.get_user(&user)?.is_none() {
                anyhow::bail!("unknown user '{}'; add it with `coursepulse add-user`", user);
            }
            let enrollment = Enrollment {
                user_id: user,
                course_id: course,
                enrolled_at: Utc::now(),
            };
            db.enroll(&enrollment)?;
            print_json(&enrollment, compact)
        }
        Command::Track {
            user,
            course,
            video,
            current_time,
            duration,
            segments,
            rate,
            completed,
        } => {
            let mut update = ProgressUpdate::new(current_time, duration)?.with_segments(segments);
            if let Some(rate) = rate {
                update = update.with_playback_rate(rate)?;
            }
            if completed {
                update = update.completed();
            }
            let key = ProgressKey::new(user, course, video)?;
            let record = ProgressTracker::new(db)
                .track_progress(key, update)
                .await
                .context("failed to track progress")?;
            print_json(&record, compact)
        }
        Command::Activity {
            user,
            course,
            kind,
            target,
            target_type,
            action,
            at,
        } => {
            let kind = ActivityKind::from_parts(&kind, target, target_type).map_err(anyhow::Error::msg)?;
            let activity = ActivityLog::new(db)
                .record(&user, &course, kind, &action, at)
                .await
                .context("failed to record activity")?;
            print_json(&activity, compact)
        }
        Command::VideoAnalytics { course, video } => {
            print_json(&metrics.video_analytics(&course, &video).await?, compact)
        }
        Command::CompletionStats { course } => {
            print_json(&metrics.completion_stats(&course).await?, compact)
        }
        Command::Engagement { course } => {
            print_json(&metrics.engagement(course.as_deref()).await?, compact)
        }
        Command::ClassMetrics { course } => {
            print_json(&metrics.class_metrics(&course).await?, compact)
        }
        Command::StudentProgress { course, user } => {
            print_json(&metrics.student_progress(&course, &user).await?, compact)
        }
        Command::ActivitySummary { course, user } => print_json(
            &metrics
                .activity_summary(course.as_deref(), user.as_deref())
                .await?,
            compact,
        ),
        Command::Request {
            method,
            path,
            body,
            user,
        } => {
            let request = Request {
                method,
                path,
                caller: user,
                body,
            };
            let (method, path) = (request.method, request.path.clone());
            let response = Api::new(db, &config).handle(request).await;
            print_json(&response.body, compact)?;
            if !response.is_success() {
                tracing::warn!(
                    %method,
                    path = %path,
                    status = response.status,
                    "Request failed"
                );
                anyhow::bail!("request failed with status {}", response.status);
            }
            Ok(())
        }
    }
}

fn print_json<T: Serialize>(value: &T, compact: bool) -> Result<()> {
    let rendered = if compact {
        serde_json::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    };
    println!("{}", rendered);
    Ok(())
}
