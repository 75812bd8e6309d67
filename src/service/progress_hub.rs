use std::{collections::HashMap, sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};
use tokio::{sync::Mutex, time::Instant};
use uuid::Uuid;

use crate::{
    db::enrollmentdb::EnrollmentExt,
    models::{
        coursemodel::CourseId,
        enrollmentmodel::{EnrolledCourse, ProgressUpdate},
    },
    service::{
        enrollment_view::{EnrollmentView, ViewEntry},
        error::ServiceError,
        progress_sync::{PlaybackSample, ProgressSession, ReportedClock, SyncTiming},
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerEvent {
    Playing,
    Paused,
    Closed,
}

struct LiveSession<S> {
    session: ProgressSession<S>,
    clock: Arc<ReportedClock>,
    last_seen: Instant,
}

/// Server side of remote players. Each (user, course) pair gets one
/// [`ProgressSession`] fed by heartbeats; each user gets one shared
/// [`EnrollmentView`] while any of their sessions is live.
pub struct ProgressHub<S> {
    store: Arc<S>,
    timing: SyncTiming,
    idle_after: Duration,
    sessions: Mutex<HashMap<(Uuid, CourseId), LiveSession<S>>>,
    views: Mutex<HashMap<Uuid, Arc<EnrollmentView>>>,
}

impl<S> ProgressHub<S>
where
    S: EnrollmentExt + Send + Sync + 'static,
{
    pub fn new(store: Arc<S>, timing: SyncTiming, idle_after: Duration) -> Self {
        Self {
            store,
            timing,
            idle_after,
            sessions: Mutex::new(HashMap::new()),
            views: Mutex::new(HashMap::new()),
        }
    }

    async fn view_for(&self, user_id: Uuid) -> Result<Arc<EnrollmentView>, ServiceError> {
        let mut views = self.views.lock().await;
        if let Some(view) = views.get(&user_id) {
            return Ok(Arc::clone(view));
        }
        let courses = self.store.get_enrollments(user_id).await?;
        let view = Arc::new(EnrollmentView::new(courses));
        views.insert(user_id, Arc::clone(&view));
        Ok(view)
    }

    pub async fn heartbeat(
        &self,
        user_id: Uuid,
        course_id: &CourseId,
        sample: PlaybackSample,
        event: PlayerEvent,
    ) -> Result<ViewEntry, ServiceError> {
        let view = self.view_for(user_id).await?;
        let baseline = view
            .get(course_id)
            .ok_or_else(|| ServiceError::CourseNotFound(course_id.clone()))?;

        let key = (user_id, course_id.clone());
        let mut sessions = self.sessions.lock().await;
        // Re-register under the sessions lock so a concurrent sweep cannot
        // orphan the view this session is about to share.
        let view = Arc::clone(self.views.lock().await.entry(user_id).or_insert(view));

        if event == PlayerEvent::Closed {
            let removed = sessions.remove(&key);
            drop(sessions);
            if let Some(mut live) = removed {
                live.clock.report(sample);
                // A failed flush is already logged and the local view keeps the state.
                let _ = live.session.stop().await;
            }
            return view
                .get(course_id)
                .ok_or_else(|| ServiceError::CourseNotFound(course_id.clone()));
        }

        let live = sessions.entry(key).or_insert_with(|| {
            let clock = Arc::new(ReportedClock::new());
            LiveSession {
                session: ProgressSession::new(
                    user_id,
                    &baseline.course,
                    Arc::clone(&self.store),
                    Arc::clone(&view),
                    clock.clone(),
                    self.timing,
                ),
                clock,
                last_seen: Instant::now(),
            }
        });
        live.clock.report(sample);
        live.last_seen = Instant::now();

        match event {
            PlayerEvent::Playing => {
                live.session.play().await?;
                live.session.sample_now().await;
            }
            PlayerEvent::Paused => live.session.pause().await,
            PlayerEvent::Closed => {}
        }
        drop(sessions);

        view.get(course_id)
            .ok_or_else(|| ServiceError::CourseNotFound(course_id.clone()))
    }

    /// Direct merge for players that compute progress themselves.
    pub async fn record(
        &self,
        user_id: Uuid,
        update: &ProgressUpdate,
    ) -> Result<EnrolledCourse, ServiceError> {
        let confirmed = match self.store.merge_progress(user_id, update).await {
            Ok(Some(confirmed)) => confirmed,
            Ok(None) => return Err(ServiceError::CourseNotFound(update.course_id.clone())),
            Err(e) => {
                tracing::warn!(
                    "Progress write for user {} course {} failed: {}",
                    user_id,
                    update.course_id,
                    e
                );
                return Err(ServiceError::PersistenceWriteFailed("your progress".to_string()));
            }
        };

        if let Some(view) = self.views.lock().await.get(&user_id) {
            view.reconcile(&confirmed);
        }
        Ok(confirmed)
    }

    /// Live view if the user has a player open, storage otherwise.
    pub async fn enrollments(&self, user_id: Uuid) -> Result<Vec<EnrolledCourse>, ServiceError> {
        if let Some(view) = self.views.lock().await.get(&user_id) {
            return Ok(view.snapshot());
        }
        Ok(self.store.get_enrollments(user_id).await?)
    }

    /// Makes a fresh enrollment visible to a user whose view is already loaded.
    pub async fn enrolled(&self, user_id: Uuid, course_id: &CourseId) -> Result<(), ServiceError> {
        let Some(view) = self.views.lock().await.get(&user_id).cloned() else {
            return Ok(());
        };
        let stored = self.store.get_enrollments(user_id).await?;
        if let Some(course) = stored.into_iter().find(|c| &c.course_id == course_id) {
            view.upsert(course);
        }
        Ok(())
    }

    /// Closes sessions whose player went quiet without saying goodbye.
    pub async fn sweep_idle(&self, now: Instant) -> usize {
        let stale: Vec<LiveSession<S>> = {
            let mut sessions = self.sessions.lock().await;
            let keys: Vec<(Uuid, CourseId)> = sessions
                .iter()
                .filter(|(_, live)| {
                    now.saturating_duration_since(live.last_seen) >= self.idle_after
                })
                .map(|(key, _)| key.clone())
                .collect();
            keys.iter().filter_map(|key| sessions.remove(key)).collect()
        };

        let closed = stale.len();
        for mut live in stale {
            let _ = live.session.stop().await;
        }
        self.drop_unused_views().await;
        closed
    }

    /// Flushes every live session. Used on shutdown.
    pub async fn close_all(&self) {
        let live: Vec<LiveSession<S>> = self
            .sessions
            .lock()
            .await
            .drain()
            .map(|(_, live)| live)
            .collect();
        for mut session in live {
            let _ = session.session.stop().await;
        }
        self.views.lock().await.clear();
    }

    pub async fn live_sessions(&self) -> usize {
        self.sessions.lock().await.len()
    }

    async fn drop_unused_views(&self) {
        let sessions = self.sessions.lock().await;
        self.views
            .lock()
            .await
            .retain(|user_id, _| sessions.keys().any(|(owner, _)| owner == user_id));
    }
}
