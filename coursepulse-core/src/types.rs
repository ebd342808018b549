//! Core domain types for coursepulse
//!
//! These types are the canonical, validated records that every other layer
//! works with. Anything arriving from a client goes through a constructor
//! here once; after that the values are trusted.
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Course** | A unit of enrollment with an ordered list of content items |
//! | **Content** | A video, document or quiz inside a course |
//! | **Watched segment** | A continuous interval of a video reported as viewed |
//! | **Coverage** | The merged, disjoint union of all watched segments for one video/user |
//! | **Activity** | An immutable audit event (access, interaction, assessment, discussion) |
//! | **Bracket** | One of five 20-point-wide buckets used to summarize a distribution |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ============================================
// Video progress
// ============================================

/// A continuous span of video, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WatchedSegment {
    pub start: f64,
    pub end: f64,
}

impl WatchedSegment {
    /// Build a segment, enforcing `end >= start >= 0`.
    pub fn new(start: f64, end: f64) -> Result<Self> {
        if !start.is_finite() || !end.is_finite() {
            return Err(Error::validation(format!(
                "watched segment bounds must be finite numbers (start={start}, end={end})"
            )));
        }
        if start < 0.0 {
            return Err(Error::validation(format!(
                "watched segment start must be >= 0 (start={start})"
            )));
        }
        if end < start {
            return Err(Error::validation(format!(
                "watched segment end must be >= start (start={start}, end={end})"
            )));
        }
        Ok(Self { start, end })
    }

    /// Length of the segment in seconds.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// One entry of the append-only playback rate history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaybackRate {
    pub timestamp: DateTime<Utc>,
    pub rate: f64,
}

/// Unique key of a [`VideoProgress`] record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProgressKey {
    pub user_id: String,
    pub course_id: String,
    pub video_id: String,
}

impl ProgressKey {
    pub fn new(
        user_id: impl Into<String>,
        course_id: impl Into<String>,
        video_id: impl Into<String>,
    ) -> Result<Self> {
        let key = Self {
            user_id: user_id.into(),
            course_id: course_id.into(),
            video_id: video_id.into(),
        };
        for (field, value) in [
            ("user id", &key.user_id),
            ("course id", &key.course_id),
            ("video id", &key.video_id),
        ] {
            if value.trim().is_empty() {
                return Err(Error::validation(format!("{field} is required")));
            }
        }
        Ok(key)
    }
}

impl std::fmt::Display for ProgressKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.user_id, self.course_id, self.video_id)
    }
}

/// Per-(user, course, video) viewing state.
///
/// `watched_segments` is always disjoint and sorted by start, and
/// `total_watch_time` is always the sum of their durations. Both are only
/// changed together through [`crate::progress::apply_update`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoProgress {
    #[serde(rename = "user")]
    pub user_id: String,
    #[serde(rename = "course")]
    pub course_id: String,
    #[serde(rename = "video")]
    pub video_id: String,
    pub watched_segments: Vec<WatchedSegment>,
    pub last_position: f64,
    /// Content duration as last reported by the player
    pub duration: f64,
    pub playback_rates: Vec<PlaybackRate>,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub total_watch_time: f64,
    pub last_updated: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl VideoProgress {
    /// Fresh record for a key that has never been tracked.
    pub fn new(key: &ProgressKey, now: DateTime<Utc>) -> Self {
        Self {
            user_id: key.user_id.clone(),
            course_id: key.course_id.clone(),
            video_id: key.video_id.clone(),
            watched_segments: Vec::new(),
            last_position: 0.0,
            duration: 0.0,
            playback_rates: Vec::new(),
            completed: false,
            completed_at: None,
            total_watch_time: 0.0,
            last_updated: now,
            created_at: now,
        }
    }

    pub fn key(&self) -> ProgressKey {
        ProgressKey {
            user_id: self.user_id.clone(),
            course_id: self.course_id.clone(),
            video_id: self.video_id.clone(),
        }
    }
}

// ============================================
// Activity
// ============================================

/// What an activity event is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActivityKind {
    CourseAccess,
    #[serde(rename_all = "camelCase")]
    ContentInteraction {
        content_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content_type: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Assessment {
        assessment_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        assessment_type: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Discussion { discussion_id: String },
}

impl ActivityKind {
    /// Returns the identifier used in database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::CourseAccess => "course_access",
            ActivityKind::ContentInteraction { .. } => "content_interaction",
            ActivityKind::Assessment { .. } => "assessment",
            ActivityKind::Discussion { .. } => "discussion",
        }
    }

    /// Rebuild a kind from its stored columns.
    pub fn from_parts(
        kind: &str,
        target_id: Option<String>,
        target_type: Option<String>,
    ) -> std::result::Result<Self, String> {
        let require = |id: Option<String>| {
            id.filter(|s| !s.is_empty())
                .ok_or_else(|| format!("{kind} activity is missing its target id"))
        };
        match kind {
            "course_access" => Ok(ActivityKind::CourseAccess),
            "content_interaction" => Ok(ActivityKind::ContentInteraction {
                content_id: require(target_id)?,
                content_type: target_type,
            }),
            "assessment" => Ok(ActivityKind::Assessment {
                assessment_id: require(target_id)?,
                assessment_type: target_type,
            }),
            "discussion" => Ok(ActivityKind::Discussion {
                discussion_id: require(target_id)?,
            }),
            _ => Err(format!("unknown activity type: {}", kind)),
        }
    }

    /// The referenced content/assessment/discussion id, if any.
    pub fn target_id(&self) -> Option<&str> {
        match self {
            ActivityKind::CourseAccess => None,
            ActivityKind::ContentInteraction { content_id, .. } => Some(content_id),
            ActivityKind::Assessment { assessment_id, .. } => Some(assessment_id),
            ActivityKind::Discussion { discussion_id } => Some(discussion_id),
        }
    }

    /// Sub-type of the target (`video`, `quiz`, ...), if reported.
    pub fn target_type(&self) -> Option<&str> {
        match self {
            ActivityKind::ContentInteraction { content_type, .. } => content_type.as_deref(),
            ActivityKind::Assessment {
                assessment_type, ..
            } => assessment_type.as_deref(),
            _ => None,
        }
    }
}

impl std::fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An immutable audit event. Created once, never updated or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub id: String,
    pub user: String,
    pub course: String,
    #[serde(flatten)]
    pub kind: ActivityKind,
    pub action: String,
    pub timestamp: DateTime<Utc>,
}

// ============================================
// Catalog (owned by collaborators)
// ============================================

/// A course as registered by the course collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

/// One content item of a course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseContent {
    pub course_id: String,
    pub content_id: String,
    pub content_type: String,
    pub position: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Student,
    Instructor,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Instructor => "instructor",
            Role::Admin => "admin",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "student" => Ok(Role::Student),
            "instructor" => Ok(Role::Instructor),
            "admin" => Ok(Role::Admin),
            _ => Err(format!("unknown role: {}", s)),
        }
    }
}

/// A platform user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub display_name: Option<String>,
    pub role: Role,
}

/// Enrollment of a user in a course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub user_id: String,
    pub course_id: String,
    pub enrolled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementKind {
    Completion,
    Engagement,
    Performance,
    Contribution,
}

impl AchievementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AchievementKind::Completion => "completion",
            AchievementKind::Engagement => "engagement",
            AchievementKind::Performance => "performance",
            AchievementKind::Contribution => "contribution",
        }
    }
}

impl std::str::FromStr for AchievementKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "completion" => Ok(AchievementKind::Completion),
            "engagement" => Ok(AchievementKind::Engagement),
            "performance" => Ok(AchievementKind::Performance),
            "contribution" => Ok(AchievementKind::Contribution),
            _ => Err(format!("unknown achievement type: {}", s)),
        }
    }
}

/// Achievement summary written by the grading/engagement collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    pub user_id: String,
    pub course_id: String,
    #[serde(rename = "type")]
    pub kind: AchievementKind,
    pub title: String,
    pub description: Option<String>,
    /// 0..=100
    pub progress: f64,
    pub achieved: bool,
    pub achieved_at: Option<DateTime<Utc>>,
    pub icon: Option<String>,
    pub order: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillTrend {
    Improving,
    #[default]
    Stable,
    Declining,
}

impl SkillTrend {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkillTrend::Improving => "improving",
            SkillTrend::Stable => "stable",
            SkillTrend::Declining => "declining",
        }
    }
}

impl std::str::FromStr for SkillTrend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "improving" => Ok(SkillTrend::Improving),
            "stable" => Ok(SkillTrend::Stable),
            "declining" => Ok(SkillTrend::Declining),
            _ => Err(format!("unknown skill trend: {}", s)),
        }
    }
}

/// Per-skill level written by the grading collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillProgress {
    pub user_id: String,
    pub course_id: String,
    pub skill: String,
    pub category: String,
    /// 0..=100
    pub level: f64,
    pub trend: SkillTrend,
    pub last_assessed: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_validation() {
        assert!(WatchedSegment::new(0.0, 0.0).is_ok());
        assert!(WatchedSegment::new(5.0, 10.0).is_ok());
        assert!(matches!(
            WatchedSegment::new(10.0, 5.0),
            Err(Error::Validation(_))
        ));
        assert!(WatchedSegment::new(-1.0, 5.0).is_err());
        assert!(WatchedSegment::new(0.0, f64::NAN).is_err());
    }

    #[test]
    fn test_progress_key_requires_ids() {
        assert!(ProgressKey::new("u1", "c1", "v1").is_ok());
        assert!(ProgressKey::new("u1", " ", "v1").is_err());
    }

    #[test]
    fn test_activity_kind_roundtrip_parts() {
        let kind = ActivityKind::Assessment {
            assessment_id: "quiz-1".into(),
            assessment_type: Some("quiz".into()),
        };
        let rebuilt = ActivityKind::from_parts(
            kind.as_str(),
            kind.target_id().map(String::from),
            kind.target_type().map(String::from),
        )
        .unwrap();
        assert_eq!(rebuilt, kind);

        assert!(ActivityKind::from_parts("discussion", None, None).is_err());
        assert!(ActivityKind::from_parts("login", None, None).is_err());
    }

    #[test]
    fn test_activity_wire_shape() {
        let activity = Activity {
            id: "a1".into(),
            user: "u1".into(),
            course: "c1".into(),
            kind: ActivityKind::ContentInteraction {
                content_id: "v1".into(),
                content_type: Some("video".into()),
            },
            action: "play".into(),
            timestamp: "2024-01-01T10:00:00Z".parse().unwrap(),
        };
        let json = serde_json::to_value(&activity).unwrap();
        assert_eq!(json["type"], "content_interaction");
        assert_eq!(json["contentId"], "v1");
        assert_eq!(json["contentType"], "video");
        assert_eq!(json["action"], "play");
    }

    #[test]
    fn test_video_progress_wire_names() {
        let key = ProgressKey::new("u1", "c1", "v1").unwrap();
        let record = VideoProgress::new(&key, Utc::now());
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["user"], "u1");
        assert!(json.get("watchedSegments").is_some());
        assert!(json.get("totalWatchTime").is_some());
        assert!(json["completedAt"].is_null());
    }
}
