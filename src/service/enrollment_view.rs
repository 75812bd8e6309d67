use std::collections::BTreeMap;

use serde::Serialize;
use tokio::sync::watch;

use crate::models::{
    coursemodel::CourseId,
    enrollmentmodel::{EnrolledCourse, EnrollmentStatus, ProgressUpdate},
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewEntry {
    #[serde(flatten)]
    pub course: EnrolledCourse,
    /// Local state is ahead of what storage has confirmed.
    pub unsynced: bool,
}

pub type ViewState = BTreeMap<CourseId, ViewEntry>;

/// A user's enrolled courses as the player sees them.
///
/// Updates are two-phase: `apply_local` shows new progress immediately,
/// `reconcile` folds in what storage confirmed. Both merge monotonically, so
/// a failed or late write can never pull the view backwards; on failure the
/// entry simply stays `unsynced` until a later write lands.
#[derive(Debug)]
pub struct EnrollmentView {
    tx: watch::Sender<ViewState>,
}

impl EnrollmentView {
    pub fn new(courses: Vec<EnrolledCourse>) -> Self {
        let state = courses
            .into_iter()
            .map(|course| {
                (
                    course.course_id.clone(),
                    ViewEntry {
                        course,
                        unsynced: false,
                    },
                )
            })
            .collect();
        let (tx, _rx) = watch::channel(state);
        Self { tx }
    }

    pub fn get(&self, course_id: &CourseId) -> Option<ViewEntry> {
        self.tx.borrow().get(course_id).cloned()
    }

    /// Courses in enrollment order.
    pub fn snapshot(&self) -> Vec<EnrolledCourse> {
        let mut courses: Vec<EnrolledCourse> =
            self.tx.borrow().values().map(|e| e.course.clone()).collect();
        courses.sort_by(|a, b| {
            a.enrolled_at
                .cmp(&b.enrolled_at)
                .then_with(|| a.course_id.cmp(&b.course_id))
        });
        courses
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.tx.subscribe()
    }

    /// Phase one. Returns the merged entry, or `None` for a course the user
    /// is not enrolled in.
    pub fn apply_local(&self, update: &ProgressUpdate) -> Option<EnrolledCourse> {
        let mut merged = None;
        self.tx.send_if_modified(|state| {
            let Some(entry) = state.get_mut(&update.course_id) else {
                return false;
            };
            let before = entry.course.clone();
            entry.course.merge_progress(update);
            if entry.course.progress != before.progress
                || entry.course.watched_duration != before.watched_duration
            {
                entry.unsynced = true;
            }
            merged = Some(entry.course.clone());
            entry.course != before
        });
        merged
    }

    /// Phase two: fold in the row storage returned after a write.
    pub fn reconcile(&self, confirmed: &EnrolledCourse) {
        self.tx.send_modify(|state| {
            let entry = state
                .entry(confirmed.course_id.clone())
                .or_insert_with(|| ViewEntry {
                    course: confirmed.clone(),
                    unsynced: false,
                });

            entry.course.merge_progress(&ProgressUpdate {
                course_id: confirmed.course_id.clone(),
                progress: confirmed.progress,
                watched_duration: confirmed.watched_duration,
                last_accessed: confirmed.last_accessed,
            });
            if confirmed.status == EnrollmentStatus::Completed {
                entry.course.status = EnrollmentStatus::Completed;
            }

            entry.unsynced = entry.course.progress > confirmed.progress
                || entry.course.watched_duration > confirmed.watched_duration;
        });
    }

    /// Adds or refreshes a course after enrollment without touching progress.
    pub fn upsert(&self, course: EnrolledCourse) {
        self.tx.send_modify(|state| {
            state
                .entry(course.course_id.clone())
                .or_insert(ViewEntry {
                    course,
                    unsynced: false,
                });
        });
    }
}
