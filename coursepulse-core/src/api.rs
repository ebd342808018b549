//! Request boundary.
//!
//! Maps `(method, path, caller, body)` requests onto the progress, activity
//! and metrics services and turns results into `(status, JSON)` responses.
//! Transport and authorization live outside this crate; `caller` is the
//! already-authenticated acting user.
//!
//! | Method | Path                                   |
//! |--------|----------------------------------------|
//! | POST   | `progress/{course}/{video}`            |
//! | POST   | `video-progress/{course}/{video}`      |
//! | POST   | `activity/{course}`                    |
//! | GET    | `video-analytics/{course}/{video}`     |
//! | GET    | `completion-stats/{course}`            |
//! | GET    | `engagement[/{course}]`                |
//! | GET    | `class-metrics/{course}`               |
//! | GET    | `student-progress/{course}[/{student}]`|
//! | GET    | `activity[/{course}]`                  |

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

use crate::activity::{ActivityLog, ActivityReport};
use crate::analytics::MetricsService;
use crate::config::Config;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::progress::{ProgressReport, ProgressTracker, ProgressUpdate};
use crate::types::ProgressKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            other => Err(format!("unsupported method: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub path: String,
    /// Acting user id
    pub caller: Option<String>,
    /// Raw JSON body
    pub body: Option<String>,
}

impl Request {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            caller: None,
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            caller: None,
            body: Some(body.into()),
        }
    }

    pub fn with_caller(mut self, caller: impl Into<String>) -> Self {
        self.caller = Some(caller.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub body: Value,
}

impl Response {
    fn ok<T: Serialize>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(body) => Self { status: 200, body },
            Err(e) => Self::from_error(&Error::from(e)),
        }
    }

    fn message(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            body: json!({ "message": message.into() }),
        }
    }

    fn from_error(err: &Error) -> Self {
        let status = err.status_code();
        if status >= 500 {
            tracing::error!(error = %err, "Request failed");
        } else {
            tracing::debug!(error = %err, status, "Request rejected");
        }
        Self::message(status, err.public_message())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A recognised route with its path parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Route {
    TrackProgress { course: String, video: String },
    RecordActivity { course: String },
    VideoAnalytics { course: String, video: String },
    CompletionStats { course: String },
    Engagement { course: Option<String> },
    ClassMetrics { course: String },
    StudentProgress { course: String, student: Option<String> },
    ActivitySummary { course: Option<String> },
}

#[derive(Debug, PartialEq, Eq)]
enum RouteError {
    NotFound,
    MethodNotAllowed,
}

impl Route {
    fn resolve(method: Method, path: &str) -> std::result::Result<Route, RouteError> {
        let trimmed = path.trim_matches('/');
        let trimmed = trimmed.strip_prefix("api/").unwrap_or(trimmed);
        let segments: Vec<&str> = trimmed.split('/').collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(RouteError::NotFound);
        }

        let (route, expected) = match segments.as_slice() {
            ["progress" | "video-progress", course, video] => (
                Route::TrackProgress {
                    course: course.to_string(),
                    video: video.to_string(),
                },
                Method::Post,
            ),
            ["activity", course] if method == Method::Post => (
                Route::RecordActivity {
                    course: course.to_string(),
                },
                Method::Post,
            ),
            ["activity"] => (Route::ActivitySummary { course: None }, Method::Get),
            ["activity", course] => (
                Route::ActivitySummary {
                    course: Some(course.to_string()),
                },
                Method::Get,
            ),
            ["video-analytics", course, video] => (
                Route::VideoAnalytics {
                    course: course.to_string(),
                    video: video.to_string(),
                },
                Method::Get,
            ),
            ["completion-stats", course] => (
                Route::CompletionStats {
                    course: course.to_string(),
                },
                Method::Get,
            ),
            ["engagement"] => (Route::Engagement { course: None }, Method::Get),
            ["engagement", course] => (
                Route::Engagement {
                    course: Some(course.to_string()),
                },
                Method::Get,
            ),
            ["class-metrics", course] => (
                Route::ClassMetrics {
                    course: course.to_string(),
                },
                Method::Get,
            ),
            ["student-progress", course] => (
                Route::StudentProgress {
                    course: course.to_string(),
                    student: None,
                },
                Method::Get,
            ),
            ["student-progress", course, student] => (
                Route::StudentProgress {
                    course: course.to_string(),
                    student: Some(student.to_string()),
                },
                Method::Get,
            ),
            _ => return Err(RouteError::NotFound),
        };

        if method != expected {
            return Err(RouteError::MethodNotAllowed);
        }
        Ok(route)
    }
}

/// Services behind the boundary.
#[derive(Clone)]
pub struct Api {
    tracker: ProgressTracker,
    activity: ActivityLog,
    metrics: MetricsService,
}

impl Api {
    pub fn new(db: Arc<Database>, config: &Config) -> Self {
        Self {
            tracker: ProgressTracker::new(db.clone()),
            activity: ActivityLog::new(db.clone()),
            metrics: MetricsService::new(db, config.analytics.clone()),
        }
    }

    /// Handle one request. Never fails; errors become non-2xx responses.
    pub async fn handle(&self, request: Request) -> Response {
        let route = match Route::resolve(request.method, &request.path) {
            Ok(route) => route,
            Err(RouteError::NotFound) => {
                return Response::message(404, format!("no route for {}", request.path))
            }
            Err(RouteError::MethodNotAllowed) => {
                return Response::message(
                    405,
                    format!("{} not allowed on {}", request.method, request.path),
                )
            }
        };

        tracing::debug!(method = %request.method, path = %request.path, ?route, "Dispatching");

        match self.route(route, &request).await {
            Ok(response) => response,
            Err(err) => Response::from_error(&err),
        }
    }

    async fn route(&self, route: Route, request: &Request) -> Result<Response> {
        match route {
            Route::TrackProgress { course, video } => {
                let user = require_caller(request)?;
                let report: ProgressReport = parse_body(request)?;
                let update = ProgressUpdate::try_from(report)?;
                let key = ProgressKey::new(user, course, video)?;
                let record = self.tracker.track_progress(key, update).await?;
                Ok(Response::ok(&record))
            }
            Route::RecordActivity { course } => {
                let user = require_caller(request)?;
                let report: ActivityReport = parse_body(request)?;
                let activity = self.activity.record_report(user, &course, report).await?;
                Ok(Response::ok(&activity))
            }
            Route::VideoAnalytics { course, video } => {
                Ok(Response::ok(&self.metrics.video_analytics(&course, &video).await?))
            }
            Route::CompletionStats { course } => {
                Ok(Response::ok(&self.metrics.completion_stats(&course).await?))
            }
            Route::Engagement { course } => {
                Ok(Response::ok(&self.metrics.engagement(course.as_deref()).await?))
            }
            Route::ClassMetrics { course } => {
                Ok(Response::ok(&self.metrics.class_metrics(&course).await?))
            }
            Route::StudentProgress { course, student } => {
                let student = match student.as_deref() {
                    Some(student) => student,
                    None => require_caller(request)?,
                };
                Ok(Response::ok(
                    &self.metrics.student_progress(&course, student).await?,
                ))
            }
            Route::ActivitySummary { course } => {
                let summary = self
                    .metrics
                    .activity_summary(course.as_deref(), request.caller.as_deref())
                    .await?;
                Ok(Response::ok(&summary))
            }
        }
    }
}

/// One-shot dispatch without keeping an [`Api`] around.
pub async fn dispatch(db: Arc<Database>, config: &Config, request: Request) -> Response {
    Api::new(db, config).handle(request).await
}

fn require_caller(request: &Request) -> Result<&str> {
    request
        .caller
        .as_deref()
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| Error::validation("caller is required for this route"))
}

fn parse_body<T: DeserializeOwned>(request: &Request) -> Result<T> {
    let body = request
        .body
        .as_deref()
        .ok_or_else(|| Error::validation("request body is required"))?;
    serde_json::from_str(body).map_err(|e| Error::validation(format!("malformed body: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Course, CourseContent};
    use chrono::Utc;

    fn api() -> Api {
        crate::logging::init_test();
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        db.upsert_course(&Course {
            id: "c1".to_string(),
            title: "Rust 101".to_string(),
            created_at: Utc::now(),
        })
        .unwrap();
        db.upsert_course_content(&CourseContent {
            course_id: "c1".to_string(),
            content_id: "v1".to_string(),
            content_type: "video".to_string(),
            position: 0,
        })
        .unwrap();
        Api::new(Arc::new(db), &Config::default())
    }

    #[test]
    fn test_route_resolution() {
        assert_eq!(
            Route::resolve(Method::Post, "/api/video-progress/c1/v1"),
            Ok(Route::TrackProgress {
                course: "c1".to_string(),
                video: "v1".to_string()
            })
        );
        assert_eq!(
            Route::resolve(Method::Get, "engagement"),
            Ok(Route::Engagement { course: None })
        );
        assert_eq!(
            Route::resolve(Method::Post, "activity/c1"),
            Ok(Route::RecordActivity {
                course: "c1".to_string()
            })
        );
        assert_eq!(
            Route::resolve(Method::Get, "activity/c1"),
            Ok(Route::ActivitySummary {
                course: Some("c1".to_string())
            })
        );
        assert_eq!(
            Route::resolve(Method::Get, "progress/c1/v1"),
            Err(RouteError::MethodNotAllowed)
        );
        assert_eq!(
            Route::resolve(Method::Post, "engagement"),
            Err(RouteError::MethodNotAllowed)
        );
        assert_eq!(Route::resolve(Method::Get, "nope"), Err(RouteError::NotFound));
        assert_eq!(
            Route::resolve(Method::Get, "class-metrics//x"),
            Err(RouteError::NotFound)
        );
    }

    #[tokio::test]
    async fn test_track_progress_response() {
        let api = api();
        let body = r#"{"currentTime": 15, "duration": 60,
            "watchedSegments": [{"start": 0, "end": 10}, {"start": 5, "end": 15}]}"#;
        let response = api
            .handle(Request::post("progress/c1/v1", body).with_caller("s1"))
            .await;

        assert_eq!(response.status, 200);
        assert_eq!(response.body["totalWatchTime"], 15.0);
        assert_eq!(response.body["lastPosition"], 15.0);
        assert_eq!(response.body["watchedSegments"].as_array().unwrap().len(), 1);
        assert_eq!(response.body["user"], "s1");
    }

    #[tokio::test]
    async fn test_error_statuses() {
        let api = api();

        let response = api
            .handle(Request::post("progress/c1/v1", "{not json").with_caller("s1"))
            .await;
        assert_eq!(response.status, 400);

        let response = api
            .handle(Request::post("progress/c1/v1", r#"{"currentTime": 1, "duration": 2}"#))
            .await;
        assert_eq!(response.status, 400);

        let bad_segment = r#"{"currentTime": 1, "duration": 2, "watchedSegments": [{"start": 9, "end": 1}]}"#;
        let response = api
            .handle(Request::post("progress/c1/v1", bad_segment).with_caller("s1"))
            .await;
        assert_eq!(response.status, 400);

        let response = api
            .handle(Request::post("progress/missing/v1", r#"{"currentTime": 1, "duration": 2}"#).with_caller("s1"))
            .await;
        assert_eq!(response.status, 404);
        assert!(response.body["message"].as_str().unwrap().contains("missing"));

        assert_eq!(api.handle(Request::get("unknown/route")).await.status, 404);
        assert_eq!(api.handle(Request::get("progress/c1/v1")).await.status, 405);
    }

    #[tokio::test]
    async fn test_activity_then_summary() {
        let api = api();
        let body = r#"{"type": "discussion", "discussionId": "d1", "action": "post"}"#;
        let response = api
            .handle(Request::post("activity/c1", body).with_caller("s1"))
            .await;
        assert_eq!(response.status, 200);
        assert_eq!(response.body["type"], "discussion");
        assert_eq!(response.body["discussionId"], "d1");

        let response = api
            .handle(Request::get("activity/c1").with_caller("s1"))
            .await;
        assert_eq!(response.status, 200);
        assert_eq!(response.body["summary"]["discussionPosts"], 1);
        assert_eq!(response.body["recentActivities"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_student_progress_defaults_to_caller() {
        let api = api();
        api.handle(
            Request::post("progress/c1/v1", r#"{"currentTime": 60, "duration": 60, "completed": true}"#)
                .with_caller("s1"),
        )
        .await;

        let own = api
            .handle(Request::get("student-progress/c1").with_caller("s1"))
            .await;
        assert_eq!(own.status, 200);
        assert_eq!(own.body["overallProgress"], 100.0);

        let other = api.handle(Request::get("student-progress/c1/s2")).await;
        assert_eq!(other.body["overallProgress"], 0.0);

        let anonymous = api.handle(Request::get("student-progress/c1")).await;
        assert_eq!(anonymous.status, 400);
    }
}
