//! Process lifecycle management
//!
//! Binds PLC connection-handle ownership to process start and stop rather
//! than to individual requests. Both hooks are callable directly in tests
//! without standing up a server.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use crate::{
    config::Config,
    error::Result,
    plc::{PlcHandle, PlcProbe, PlcSlot},
};

/// Process lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    Starting,
    Running,
    Stopping,
    Stopped,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "uninitialized"),
            Self::Starting => write!(f, "starting"),
            Self::Running => write!(f, "running"),
            Self::Stopping => write!(f, "stopping"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// Owns the PLC connection handle across the process lifetime
pub struct LifecycleManager {
    config: Arc<Config>,
    state: Mutex<LifecycleState>,
    slot: PlcSlot,
}

impl LifecycleManager {
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            config,
            state: Mutex::new(LifecycleState::Uninitialized),
            slot: PlcSlot::new(),
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> LifecycleState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn transition(&self, to: LifecycleState) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        tracing::debug!(from = %state, to = %to, "Lifecycle transition");
        *state = to;
    }

    /// Install the handle produced by the external PLC driver
    ///
    /// Acquisition may happen lazily at any point while running; the
    /// manager only enforces that a single handle exists.
    pub async fn install_plc(&self, handle: PlcHandle) -> Result<()> {
        self.slot.install(handle).await
    }

    /// Read-only connectivity probe for request handlers
    pub fn plc(&self) -> PlcProbe {
        self.slot.probe()
    }

    /// Process startup hook
    ///
    /// Logs the service start, the active environment, and the configured
    /// PLC address. Does not open the PLC connection; the external driver
    /// does that on its own schedule.
    pub async fn on_start(&self) {
        if self.state() != LifecycleState::Uninitialized {
            tracing::warn!(state = %self.state(), "Ignoring duplicate startup signal");
            return;
        }
        self.transition(LifecycleState::Starting);

        tracing::info!("Starting {} server", self.config.service.name);
        tracing::info!("Environment: {}", self.config.service.environment);
        match self.config.plc_address() {
            Some(address) => tracing::info!("PLC address: {address}"),
            None => tracing::info!("PLC address: not configured"),
        }

        self.transition(LifecycleState::Running);
    }

    /// Process shutdown hook
    ///
    /// Releases the PLC handle if one was ever installed. Never fails:
    /// a release error is logged and swallowed so shutdown always
    /// completes. Safe to call regardless of how far startup got.
    pub async fn on_stop(&self) {
        match self.state() {
            LifecycleState::Stopping | LifecycleState::Stopped => {
                tracing::warn!(state = %self.state(), "Ignoring duplicate shutdown signal");
                return;
            }
            _ => {}
        }
        self.transition(LifecycleState::Stopping);

        tracing::info!("Shutting down {} server", self.config.service.name);

        if let Some(handle) = self.slot.take().await {
            let was_connected = handle.is_connected();
            match handle.release().await {
                Ok(()) => tracing::info!(was_connected, "PLC connection closed"),
                Err(err) => tracing::error!("Error during PLC cleanup: {err}"),
            }
        }

        self.transition(LifecycleState::Stopped);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::plc::PlcTransport;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingTransport {
        disconnects: Arc<AtomicUsize>,
        fail_disconnect: bool,
    }

    #[async_trait]
    impl PlcTransport for CountingTransport {
        fn is_connected(&self) -> bool {
            true
        }

        async fn disconnect(&mut self) -> Result<()> {
            self.disconnects.fetch_add(1, Ordering::SeqCst);
            if self.fail_disconnect {
                return Err(Error::Plc("transport refused to close".to_string()));
            }
            Ok(())
        }
    }

    fn manager() -> LifecycleManager {
        LifecycleManager::new(Arc::new(Config::default()))
    }

    #[tokio::test]
    async fn start_reaches_running() {
        let lifecycle = manager();
        assert_eq!(lifecycle.state(), LifecycleState::Uninitialized);

        lifecycle.on_start().await;
        assert_eq!(lifecycle.state(), LifecycleState::Running);
    }

    #[tokio::test]
    async fn duplicate_start_is_ignored() {
        let lifecycle = manager();
        lifecycle.on_start().await;
        lifecycle.on_start().await;
        assert_eq!(lifecycle.state(), LifecycleState::Running);
    }

    #[tokio::test]
    async fn stop_without_handle_completes() {
        let lifecycle = manager();
        lifecycle.on_start().await;
        lifecycle.on_stop().await;
        assert_eq!(lifecycle.state(), LifecycleState::Stopped);
    }

    #[tokio::test]
    async fn stop_releases_handle_exactly_once() {
        let lifecycle = manager();
        lifecycle.on_start().await;

        let disconnects = Arc::new(AtomicUsize::new(0));
        lifecycle
            .install_plc(PlcHandle::new(Box::new(CountingTransport {
                disconnects: Arc::clone(&disconnects),
                fail_disconnect: false,
            })))
            .await
            .expect("install succeeds");

        lifecycle.on_stop().await;
        assert_eq!(disconnects.load(Ordering::SeqCst), 1);
        assert_eq!(lifecycle.state(), LifecycleState::Stopped);

        // A second shutdown signal must not release again.
        lifecycle.on_stop().await;
        assert_eq!(disconnects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn release_failure_does_not_block_shutdown() {
        let lifecycle = manager();
        lifecycle.on_start().await;

        let disconnects = Arc::new(AtomicUsize::new(0));
        lifecycle
            .install_plc(PlcHandle::new(Box::new(CountingTransport {
                disconnects: Arc::clone(&disconnects),
                fail_disconnect: true,
            })))
            .await
            .expect("install succeeds");

        lifecycle.on_stop().await;
        assert_eq!(disconnects.load(Ordering::SeqCst), 1);
        assert_eq!(lifecycle.state(), LifecycleState::Stopped);
    }

    #[tokio::test]
    async fn stop_before_start_still_completes() {
        let lifecycle = manager();
        lifecycle.on_stop().await;
        assert_eq!(lifecycle.state(), LifecycleState::Stopped);
    }

    #[tokio::test]
    async fn probe_tracks_handle_across_lifecycle() {
        let lifecycle = manager();
        let probe = lifecycle.plc();
        lifecycle.on_start().await;
        assert!(!probe.is_connected().await);

        let disconnects = Arc::new(AtomicUsize::new(0));
        lifecycle
            .install_plc(PlcHandle::new(Box::new(CountingTransport {
                disconnects,
                fail_disconnect: false,
            })))
            .await
            .expect("install succeeds");
        assert!(probe.is_connected().await);

        lifecycle.on_stop().await;
        assert!(!probe.is_connected().await);
    }
}
