use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::coursemodel::{Course, CourseId};

pub const COMPLETE_PERCENT: f64 = 100.0;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "enrollment_status", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum EnrollmentStatus {
    InProgress,
    Completed,
}

impl EnrollmentStatus {
    pub fn to_str(&self) -> &str {
        match self {
            EnrollmentStatus::InProgress => "in-progress",
            EnrollmentStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone, PartialEq)]
pub struct EnrolledCourse {
    #[serde(rename = "courseId")]
    pub course_id: CourseId,
    pub title: String,
    pub progress: f64,
    pub status: EnrollmentStatus,
    // Seconds.
    #[serde(rename = "watchedDuration")]
    pub watched_duration: f64,
    #[serde(rename = "lastAccessed")]
    pub last_accessed: DateTime<Utc>,
    #[serde(rename = "videoUrl")]
    pub video_url: Option<String>,
    #[serde(rename = "youtubeId")]
    pub youtube_id: Option<String>,
    #[serde(rename = "enrolledAt")]
    pub enrolled_at: DateTime<Utc>,
}

/// One observation of playback state for a course, as sent to durable storage.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ProgressUpdate {
    #[serde(rename = "courseId")]
    pub course_id: CourseId,
    pub progress: f64,
    #[serde(rename = "watchedDuration")]
    pub watched_duration: f64,
    #[serde(rename = "lastAccessed")]
    pub last_accessed: DateTime<Utc>,
}

/// Clamp to `0..=100`; NaN counts as no progress.
pub fn clamp_percent(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, COMPLETE_PERCENT)
}

/// Percentage watched from a player position, rounded to two decimals.
pub fn percent_watched(position_secs: f64, duration_secs: f64) -> f64 {
    if !(duration_secs > 0.0) || position_secs.is_nan() {
        return 0.0;
    }
    let raw = position_secs / duration_secs * 100.0;
    clamp_percent((raw * 100.0).round() / 100.0)
}

impl ProgressUpdate {
    /// Non-finite or negative readings from a player become zero, progress is
    /// clamped to `0..=100`.
    pub fn sanitized(&self) -> Self {
        let watched = if self.watched_duration.is_finite() {
            self.watched_duration.max(0.0)
        } else {
            0.0
        };
        ProgressUpdate {
            course_id: self.course_id.clone(),
            progress: clamp_percent(self.progress),
            watched_duration: watched,
            last_accessed: self.last_accessed,
        }
    }
}

impl EnrolledCourse {
    pub fn new(course: &Course, now: DateTime<Utc>) -> Self {
        EnrolledCourse {
            course_id: course.id.clone(),
            title: course.title.clone(),
            progress: 0.0,
            status: EnrollmentStatus::InProgress,
            watched_duration: 0.0,
            last_accessed: now,
            video_url: course.video_url.clone(),
            youtube_id: course.youtube_id.clone(),
            enrolled_at: now,
        }
    }

    /// Monotonic merge: progress and watched time only grow, `last_accessed`
    /// is last-writer-wins on its timestamp, and a completed course stays
    /// completed.
    pub fn merge_progress(&mut self, update: &ProgressUpdate) {
        let update = update.sanitized();
        self.progress = self.progress.max(update.progress);
        self.watched_duration = self.watched_duration.max(update.watched_duration);
        if update.last_accessed > self.last_accessed {
            self.last_accessed = update.last_accessed;
        }
        if self.progress >= COMPLETE_PERCENT {
            self.status = EnrollmentStatus::Completed;
        }
    }
}

#[cfg(test)]
pub(crate) fn test_enrollment(course_id: &str) -> EnrolledCourse {
    let now = Utc::now();
    EnrolledCourse {
        course_id: CourseId::new(course_id),
        title: format!("Course {course_id}"),
        progress: 0.0,
        status: EnrollmentStatus::InProgress,
        watched_duration: 0.0,
        last_accessed: now,
        video_url: None,
        youtube_id: Some("dQw4w9WgXcQ".to_string()),
        enrolled_at: now,
    }
}
