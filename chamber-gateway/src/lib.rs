//! # chamber-gateway
//!
//! HTTP gateway fronting the PLC that drives a hyperbaric chamber.
//!
//! The gateway owns the request pipeline (compression, CORS, correlated
//! logging and timing), normalizes every uncaught failure into a uniform
//! JSON envelope, binds the PLC connection handle to the process lifecycle,
//! and reports liveness. Endpoint-group handlers (auth, control, pressure,
//! sensors, ...) are external collaborators mounted through an opaque
//! router boundary.
//!
//! ## Example
//!
//! ```rust,no_run
//! use chamber_gateway::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     // Load configuration
//!     let config = Config::load()?;
//!
//!     // Initialize tracing
//!     init_tracing(&config)?;
//!
//!     // Build application state
//!     let state = AppState::new(config);
//!
//!     // Endpoint-group routers are mounted here as they come online
//!     let api = ApiRouter::new();
//!
//!     // Run server
//!     Server::new(state).serve(api).await
//! }
//! ```

pub mod config;
pub mod error;
pub mod health;
pub mod lifecycle;
pub mod middleware;
pub mod observability;
pub mod plc;
pub mod routes;
pub mod server;
pub mod state;

pub use error::{Error, Result};

pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{Error, ErrorDetail, ErrorEnvelope, Result};
    pub use crate::health::{health, HealthReporter, HealthResponse};
    pub use crate::lifecycle::{LifecycleManager, LifecycleState};
    pub use crate::middleware::{
        request_id_layer, request_id_propagation_layer, sensitive_headers_layer, track_requests,
        PROCESS_TIME_HEADER, SENSITIVE_HEADERS,
    };
    pub use crate::observability::init_tracing;
    pub use crate::plc::{PlcHandle, PlcProbe, PlcSlot, PlcTransport};
    pub use crate::routes::{
        endpoint_group, service_descriptor, ApiRouter, EndpointGroup, ServiceDescriptor,
        ENDPOINT_GROUPS,
    };
    pub use crate::server::Server;
    pub use crate::state::AppState;
}
