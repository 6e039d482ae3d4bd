//! Health check handlers

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{
    config::Config,
    error::{Error, Result},
    lifecycle::{LifecycleManager, LifecycleState},
    state::AppState,
};

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// "healthy" or "unhealthy"
    pub status: String,

    /// When the check ran
    pub timestamp: DateTime<Utc>,

    /// Service name
    pub service: String,

    /// Connectivity of the PLC handle, when the check could read it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plc_connected: Option<bool>,

    /// Failure detail on the unhealthy path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Synthesizes liveness from internal state
pub struct HealthReporter {
    config: Arc<Config>,
    lifecycle: Arc<LifecycleManager>,
}

impl HealthReporter {
    pub fn new(config: Arc<Config>, lifecycle: Arc<LifecycleManager>) -> Self {
        Self { config, lifecycle }
    }

    /// Run the internal checks and build a healthy report
    ///
    /// Fails when the service cannot answer for its own state, e.g. while
    /// a shutdown is in progress.
    pub async fn check(&self) -> Result<HealthResponse> {
        let state = self.lifecycle.state();
        if state != LifecycleState::Running {
            return Err(Error::Unavailable(format!("service is {state}")));
        }

        let plc_connected = self.lifecycle.plc().is_connected().await;

        Ok(HealthResponse {
            status: "healthy".to_string(),
            timestamp: Utc::now(),
            service: self.config.service.name.clone(),
            plc_connected: Some(plc_connected),
            error: None,
        })
    }

    fn unhealthy(&self, err: &Error) -> HealthResponse {
        HealthResponse {
            status: "unhealthy".to_string(),
            timestamp: Utc::now(),
            service: self.config.service.name.clone(),
            plc_connected: None,
            error: Some(err.to_string()),
        }
    }
}

/// Liveness probe
///
/// Owns its failure status: a check failure is caught here and answered
/// with 503 instead of flowing on to the error normalizer.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    match state.health().check().await {
        Ok(report) => (StatusCode::OK, Json(report)),
        Err(err) => {
            tracing::error!("Health check failed: {err}");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(state.health().unhealthy(&err)),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn healthy_while_running() {
        let state = AppState::new(Config::default());
        state.lifecycle().on_start().await;

        let report = state.health().check().await.expect("healthy");
        assert_eq!(report.status, "healthy");
        assert_eq!(report.service, "chamber-gateway");
        assert_eq!(report.plc_connected, Some(false));
        assert!(report.error.is_none());
    }

    #[tokio::test]
    async fn unhealthy_before_start_and_after_stop() {
        let state = AppState::new(Config::default());
        assert!(state.health().check().await.is_err());

        state.lifecycle().on_start().await;
        assert!(state.health().check().await.is_ok());

        state.lifecycle().on_stop().await;
        let err = state.health().check().await.expect_err("unhealthy");
        assert_eq!(err.kind(), "unavailable");
    }

    #[tokio::test]
    async fn handler_degrades_to_503() {
        let state = AppState::new(Config::default());
        state.lifecycle().on_start().await;
        state.lifecycle().on_stop().await;

        let response = health(State(state)).await.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
