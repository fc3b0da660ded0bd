//! Sharing driver
//!
//! Owns the tick loop. While sharing is on, a background task ticks the
//! session once per interval; toggling off cancels the task through its
//! token. The token is cancelled while the session lock is held and the task
//! re-checks it under that lock, so no tick lands after a toggle-off.

use crate::state::SessionStore;
use chrono::Utc;
use obd_core::session::{SessionError, TickEvent};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Reference cadence: one reading per second
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Clone)]
pub struct Driver {
    store: SessionStore,
    interval: Duration,

    /// Cancellation token for the running tick loop
    cancel: Arc<RwLock<Option<CancellationToken>>>,
}

impl Driver {
    pub fn new(store: SessionStore, interval: Duration) -> Self {
        Self {
            store,
            interval,
            cancel: Arc::new(RwLock::new(None)),
        }
    }

    /// Start or pause sharing, returning the new sharing flag
    ///
    /// Starting against an empty source fails with
    /// [`SessionError::EmptySource`] and nothing is scheduled.
    pub async fn toggle_sharing(&self) -> Result<bool, SessionError> {
        let mut session = self.store.write().await;
        let sharing = session.toggle_sharing(self.store.source())?;

        let mut cancel = self.cancel.write().await;
        if let Some(token) = cancel.take() {
            token.cancel();
        }

        if sharing {
            let token = CancellationToken::new();
            *cancel = Some(token.clone());
            self.spawn_tick_loop(token);
            info!(
                "Sharing started from {} at index {:?}",
                self.store.source().name(),
                session.current_index()
            );
        } else {
            info!(
                "Sharing paused at index {:?} ({:.4} earned)",
                session.current_index(),
                session.cumulative_earnings()
            );
        }

        Ok(sharing)
    }

    /// Whether a tick loop is currently scheduled
    pub async fn is_running(&self) -> bool {
        self.cancel
            .read()
            .await
            .as_ref()
            .map(|t| !t.is_cancelled())
            .unwrap_or(false)
    }

    /// Perform one tick immediately, outside the timer
    ///
    /// Returns `Ok(None)` when sharing is paused.
    pub async fn tick_now(&self) -> Result<Option<TickEvent>, SessionError> {
        let mut rng = StdRng::from_entropy();
        let mut session = self.store.write().await;
        let event = session.tick(self.store.source(), &mut rng, Utc::now())?;

        // Published under the lock so subscribers see ticks in cursor order
        if let Some(event) = &event {
            self.store.publish(event.clone());
        }
        Ok(event)
    }

    /// Cancel the tick loop without touching the sharing flag
    pub async fn shutdown(&self) {
        if let Some(token) = self.cancel.write().await.take() {
            token.cancel();
            info!("Tick loop shut down");
        }
    }

    fn spawn_tick_loop(&self, cancel_token: CancellationToken) {
        let store = self.store.clone();
        let period = self.interval;

        tokio::spawn(async move {
            debug!("Tick loop started ({:?} interval)", period);
            let mut rng = StdRng::from_entropy();
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = cancel_token.cancelled() => break,
                    _ = ticker.tick() => {},
                }

                let mut session = store.write().await;
                if cancel_token.is_cancelled() {
                    break;
                }

                match session.tick(store.source(), &mut rng, Utc::now()) {
                    Ok(Some(event)) => {
                        debug!(
                            "Tick index={} reward={:.4} total={:.4}",
                            event.index, event.reward, event.cumulative_earnings
                        );
                        store.publish(event);
                    }
                    Ok(None) => {}
                    Err(e) => {
                        error!("Tick failed: {}", e);
                    }
                }
            }

            debug!("Tick loop ended");
        });
    }
}
