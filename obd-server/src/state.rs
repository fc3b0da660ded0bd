//! Application state management

use obd_core::{
    session::{Session, SessionSnapshot, TickEvent},
    source::ReadingSource,
};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::info;

use crate::driver::Driver;

/// Owner of the sharing session
///
/// Every mutation (ticks, toggles, resets) goes through the one write lock,
/// so a reset can never interleave with a half-applied tick.
#[derive(Clone)]
pub struct SessionStore {
    /// The replayed readings, shared read-only
    source: Arc<dyn ReadingSource>,

    session: Arc<RwLock<Session>>,

    /// Broadcast channel for tick events
    /// Multiple consumers can subscribe to receive ticks
    tick_tx: broadcast::Sender<TickEvent>,
}

impl SessionStore {
    pub fn new(source: Arc<dyn ReadingSource>) -> Self {
        // Create broadcast channel with capacity for 100 ticks
        let (tick_tx, _) = broadcast::channel(100);

        Self {
            source,
            session: Arc::new(RwLock::new(Session::new())),
            tick_tx,
        }
    }

    pub fn source(&self) -> &dyn ReadingSource {
        self.source.as_ref()
    }

    /// Shared read access for display surfaces
    pub async fn read(&self) -> RwLockReadGuard<'_, Session> {
        self.session.read().await
    }

    /// Exclusive access; only the driver and the reset command take this
    pub(crate) async fn write(&self) -> RwLockWriteGuard<'_, Session> {
        self.session.write().await
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.session.read().await.snapshot()
    }

    /// Zero the balance and clear history; sharing, cursor and codes stay
    pub async fn reset_earnings(&self) {
        let mut session = self.write().await;
        let cleared = session.earnings_history().len();
        session.reset_earnings();
        info!("Earnings reset ({} entries cleared)", cleared);
    }

    /// Subscribe to tick events
    pub fn subscribe(&self) -> broadcast::Receiver<TickEvent> {
        self.tick_tx.subscribe()
    }

    pub(crate) fn publish(&self, event: TickEvent) {
        // Ignore error if no receivers (they'll get the next tick)
        let _ = self.tick_tx.send(event);
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: SessionStore,

    /// Drives ticks while sharing is on
    pub driver: Driver,

    /// Points in the earnings chart
    pub chart_window: usize,
}

impl AppState {
    pub fn new(store: SessionStore, driver: Driver, chart_window: usize) -> Self {
        Self {
            store,
            driver,
            chart_window,
        }
    }
}
