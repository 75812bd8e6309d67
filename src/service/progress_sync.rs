use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use tokio::{
    sync::{watch, Mutex},
    task::JoinHandle,
    time::{interval, interval_at, Instant, MissedTickBehavior},
};
use uuid::Uuid;

use crate::{
    db::enrollmentdb::EnrollmentExt,
    models::{
        enrollmentmodel::{percent_watched, EnrolledCourse, ProgressUpdate},
    },
    service::{enrollment_view::EnrollmentView, error::ServiceError},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Playing,
    Paused,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackSample {
    pub position_secs: f64,
    pub duration_secs: f64,
}

/// Source of the current player position.
pub trait PlaybackClock: Send + Sync + 'static {
    fn sample(&self) -> Option<PlaybackSample>;
}

/// Clock fed by heartbeats from a remote player.
#[derive(Debug)]
pub struct ReportedClock {
    latest: watch::Sender<Option<PlaybackSample>>,
}

impl ReportedClock {
    pub fn new() -> Self {
        let (latest, _rx) = watch::channel(None);
        Self { latest }
    }

    pub fn report(&self, sample: PlaybackSample) {
        self.latest.send_replace(Some(sample));
    }
}

impl Default for ReportedClock {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackClock for ReportedClock {
    fn sample(&self) -> Option<PlaybackSample> {
        *self.latest.borrow()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncTiming {
    pub sample_every: Duration,
    pub flush_every: Duration,
}

impl SyncTiming {
    pub fn from_secs(sample_secs: u64, flush_secs: u64) -> Self {
        Self {
            sample_every: Duration::from_secs(sample_secs.max(1)),
            flush_every: Duration::from_secs(flush_secs.max(1)),
        }
    }
}

impl Default for SyncTiming {
    fn default() -> Self {
        Self::from_secs(1, 5)
    }
}

/// Playback bookkeeping for one course, free of timers and I/O.
///
/// Samples only count while playing. Durable writes are throttled to one per
/// `flush_every` and only issued when there is something new to persist;
/// `stop` hands back whatever is still unwritten.
#[derive(Debug)]
pub struct ProgressTracker {
    state: PlaybackState,
    latest: ProgressUpdate,
    persisted: ProgressUpdate,
    last_write_at: Option<Instant>,
    flush_every: Duration,
}

impl ProgressTracker {
    pub fn new(baseline: &EnrolledCourse, flush_every: Duration) -> Self {
        let snapshot = ProgressUpdate {
            course_id: baseline.course_id.clone(),
            progress: baseline.progress,
            watched_duration: baseline.watched_duration,
            last_accessed: baseline.last_accessed,
        };
        Self {
            state: PlaybackState::Idle,
            latest: snapshot.clone(),
            persisted: snapshot,
            last_write_at: None,
            flush_every,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn play(&mut self) -> Result<(), ServiceError> {
        if self.state == PlaybackState::Stopped {
            return Err(ServiceError::Validation(
                "Playback session has already been closed".to_string(),
            ));
        }
        self.state = PlaybackState::Playing;
        Ok(())
    }

    pub fn pause(&mut self) {
        if self.state == PlaybackState::Playing {
            self.state = PlaybackState::Paused;
        }
    }

    /// Folds a player reading into the local state. Returns the update to
    /// show, or `None` when not playing or the reading is unusable.
    pub fn record_sample(
        &mut self,
        sample: PlaybackSample,
        at: DateTime<Utc>,
    ) -> Option<ProgressUpdate> {
        if self.state != PlaybackState::Playing || !(sample.duration_secs > 0.0) {
            return None;
        }

        let progress = percent_watched(sample.position_secs, sample.duration_secs);
        let watched = if sample.position_secs.is_finite() {
            sample.position_secs.max(0.0)
        } else {
            0.0
        };

        self.latest.progress = self.latest.progress.max(progress);
        self.latest.watched_duration = self.latest.watched_duration.max(watched);
        if at > self.latest.last_accessed {
            self.latest.last_accessed = at;
        }
        Some(self.latest.clone())
    }

    pub fn is_dirty(&self) -> bool {
        self.latest.progress > self.persisted.progress
            || self.latest.watched_duration > self.persisted.watched_duration
            || self.latest.last_accessed > self.persisted.last_accessed
    }

    /// Throttle decision for the periodic writer.
    pub fn due_write(&mut self, now: Instant) -> Option<ProgressUpdate> {
        if self.state != PlaybackState::Playing || !self.is_dirty() {
            return None;
        }
        if let Some(last) = self.last_write_at {
            if now.saturating_duration_since(last) < self.flush_every {
                return None;
            }
        }
        self.last_write_at = Some(now);
        Some(self.latest.clone())
    }

    /// Unwritten state, ignoring the throttle.
    pub fn flush_snapshot(&self) -> Option<ProgressUpdate> {
        self.is_dirty().then(|| self.latest.clone())
    }

    pub fn acknowledge(&mut self, confirmed: &EnrolledCourse) {
        self.persisted.progress = self.persisted.progress.max(confirmed.progress);
        self.persisted.watched_duration = self
            .persisted
            .watched_duration
            .max(confirmed.watched_duration);
        if confirmed.last_accessed > self.persisted.last_accessed {
            self.persisted.last_accessed = confirmed.last_accessed;
        }
        // Storage may already be ahead, e.g. another tab finished the course.
        self.latest.progress = self.latest.progress.max(confirmed.progress);
        self.latest.watched_duration = self
            .latest
            .watched_duration
            .max(confirmed.watched_duration);
    }

    pub fn stop(&mut self) -> Option<ProgressUpdate> {
        self.state = PlaybackState::Stopped;
        self.flush_snapshot()
    }
}

struct SessionShared<S> {
    user_id: Uuid,
    store: Arc<S>,
    view: Arc<EnrollmentView>,
    clock: Arc<dyn PlaybackClock>,
    tracker: Mutex<ProgressTracker>,
}

impl<S> SessionShared<S>
where
    S: EnrollmentExt + Send + Sync + 'static,
{
    async fn sample_now(&self) {
        let Some(sample) = self.clock.sample() else {
            return;
        };
        let local = self.tracker.lock().await.record_sample(sample, Utc::now());
        if let Some(update) = local {
            self.view.apply_local(&update);
        }
    }

    async fn write(&self, update: ProgressUpdate) -> Result<Option<EnrolledCourse>, ServiceError> {
        match self.store.merge_progress(self.user_id, &update).await {
            Ok(Some(confirmed)) => {
                self.tracker.lock().await.acknowledge(&confirmed);
                self.view.reconcile(&confirmed);
                Ok(Some(confirmed))
            }
            Ok(None) => {
                tracing::warn!(
                    "Dropped progress for course {}: user {} is not enrolled",
                    update.course_id,
                    self.user_id
                );
                Ok(None)
            }
            Err(e) => {
                tracing::warn!(
                    "Progress write for user {} course {} failed: {}",
                    self.user_id,
                    update.course_id,
                    e
                );
                Err(ServiceError::PersistenceWriteFailed("your progress".to_string()))
            }
        }
    }
}

/// Drives a [`ProgressTracker`] for one player: a sampling task and a
/// throttled writer task while playing, one final write on `stop`.
///
/// The two tasks are independent and both are aborted on pause, stop and drop.
pub struct ProgressSession<S> {
    shared: Arc<SessionShared<S>>,
    timing: SyncTiming,
    sampler: Option<JoinHandle<()>>,
    flusher: Option<JoinHandle<()>>,
}

impl<S> ProgressSession<S>
where
    S: EnrollmentExt + Send + Sync + 'static,
{
    pub fn new(
        user_id: Uuid,
        baseline: &EnrolledCourse,
        store: Arc<S>,
        view: Arc<EnrollmentView>,
        clock: Arc<dyn PlaybackClock>,
        timing: SyncTiming,
    ) -> Self {
        let tracker = ProgressTracker::new(baseline, timing.flush_every);
        Self {
            shared: Arc::new(SessionShared {
                user_id,
                store,
                view,
                clock,
                tracker: Mutex::new(tracker),
            }),
            timing,
            sampler: None,
            flusher: None,
        }
    }

    pub async fn state(&self) -> PlaybackState {
        self.shared.tracker.lock().await.state()
    }

    pub async fn play(&mut self) -> Result<(), ServiceError> {
        self.shared.tracker.lock().await.play()?;
        self.spawn_timers();
        Ok(())
    }

    pub async fn pause(&mut self) {
        self.cancel_timers();
        self.shared.sample_now().await;
        self.shared.tracker.lock().await.pause();
    }

    /// Takes a reading right away instead of waiting for the next tick.
    pub async fn sample_now(&self) {
        self.shared.sample_now().await;
    }

    /// Writes the latest state now, bypassing the throttle.
    pub async fn flush(&self) -> Result<Option<EnrolledCourse>, ServiceError> {
        let pending = self.shared.tracker.lock().await.flush_snapshot();
        match pending {
            Some(update) => self.shared.write(update).await,
            None => Ok(None),
        }
    }

    /// Cancels both timers and persists the final position before returning.
    pub async fn stop(&mut self) -> Result<Option<EnrolledCourse>, ServiceError> {
        self.cancel_timers();
        self.shared.sample_now().await;
        let pending = self.shared.tracker.lock().await.stop();
        let Some(update) = pending else {
            return Ok(None);
        };

        tracing::info!(
            "Flushing progress {} for user {} course {} on close",
            update.progress,
            self.shared.user_id,
            update.course_id
        );
        self.shared.write(update).await
    }

    fn spawn_timers(&mut self) {
        if self.sampler.is_none() {
            let shared = Arc::clone(&self.shared);
            let mut ticker = interval(self.timing.sample_every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            self.sampler = Some(tokio::spawn(async move {
                loop {
                    ticker.tick().await;
                    shared.sample_now().await;
                }
            }));
        }

        if self.flusher.is_none() {
            let shared = Arc::clone(&self.shared);
            let every = self.timing.flush_every;
            let mut ticker = interval_at(Instant::now() + every, every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            self.flusher = Some(tokio::spawn(async move {
                loop {
                    let at = ticker.tick().await;
                    let due = shared.tracker.lock().await.due_write(at);
                    if let Some(update) = due {
                        // Logged inside; the next tick retries with fresher data.
                        let _ = shared.write(update).await;
                    }
                }
            }));
        }
    }

    fn cancel_timers(&mut self) {
        for handle in [self.sampler.take(), self.flusher.take()].into_iter().flatten() {
            handle.abort();
        }
    }
}

impl<S> Drop for ProgressSession<S> {
    fn drop(&mut self) {
        for handle in [self.sampler.take(), self.flusher.take()].into_iter().flatten() {
            handle.abort();
        }
    }
}
