//! Application state shared across handlers

use std::sync::Arc;

use crate::{
    config::Config, health::HealthReporter, lifecycle::LifecycleManager, plc::PlcProbe,
};

/// Application state shared across handlers
///
/// Cheap to clone; everything behind it is reference-counted.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    lifecycle: Arc<LifecycleManager>,
    health: Arc<HealthReporter>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);
        let lifecycle = Arc::new(LifecycleManager::new(Arc::clone(&config)));
        let health = Arc::new(HealthReporter::new(
            Arc::clone(&config),
            Arc::clone(&lifecycle),
        ));
        Self {
            config,
            lifecycle,
            health,
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the lifecycle manager
    pub fn lifecycle(&self) -> &LifecycleManager {
        &self.lifecycle
    }

    /// Get the health reporter
    pub fn health(&self) -> &HealthReporter {
        &self.health
    }

    /// Read-only PLC connectivity probe for handlers
    pub fn plc(&self) -> PlcProbe {
        self.lifecycle.plc()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::LifecycleState;

    #[tokio::test]
    async fn clones_share_one_lifecycle() {
        let state = AppState::new(Config::default());
        let clone = state.clone();

        state.lifecycle().on_start().await;
        assert_eq!(clone.lifecycle().state(), LifecycleState::Running);
    }
}
