use std::sync::Arc;

use tokio::time::{interval, Duration, Instant};

use crate::AppState;

/// Closes playback sessions whose player stopped sending heartbeats, e.g. a
/// tab that was killed before it could report `closed`.
pub async fn start_idle_session_sweeper(app_state: Arc<AppState>) {
    let every = Duration::from_secs(app_state.env.progress_idle_secs.max(1));
    let mut interval = interval(every);

    loop {
        interval.tick().await;

        let closed = app_state.progress_hub.sweep_idle(Instant::now()).await;
        if closed > 0 {
            tracing::info!("Idle session sweep flushed and closed {} sessions", closed);
        }
    }
}
