//! Core HTTP surface and the external router boundary

use axum::{routing::get, Json, Router};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{health, state::AppState};

/// A logical endpoint group served behind the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointGroup {
    /// Descriptor key, e.g. `authentication`
    pub name: &'static str,

    /// Mount prefix, e.g. `/api/auth`
    pub prefix: &'static str,
}

/// The endpoint groups the gateway fronts
///
/// Their handlers live outside the core; the gateway mounts them opaquely
/// and advertises the prefixes in the service descriptor.
pub const ENDPOINT_GROUPS: &[EndpointGroup] = &[
    EndpointGroup { name: "authentication", prefix: "/api/auth" },
    EndpointGroup { name: "language", prefix: "/api/language" },
    EndpointGroup { name: "control", prefix: "/api/control" },
    EndpointGroup { name: "pressure", prefix: "/api/pressure" },
    EndpointGroup { name: "session", prefix: "/api/session" },
    EndpointGroup { name: "modes", prefix: "/api/modes" },
    EndpointGroup { name: "ac", prefix: "/api/ac" },
    EndpointGroup { name: "sensors", prefix: "/api/sensors" },
    EndpointGroup { name: "calibration", prefix: "/api/calibration" },
    EndpointGroup { name: "manual", prefix: "/api/manual" },
    EndpointGroup { name: "status", prefix: "/api/status" },
    EndpointGroup { name: "websockets", prefix: "/ws" },
];

/// Look up an endpoint group by its descriptor key
pub fn endpoint_group(name: &str) -> Option<&'static EndpointGroup> {
    ENDPOINT_GROUPS.iter().find(|group| group.name == name)
}

/// Service descriptor returned from `GET /`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    pub message: String,
    pub version: String,
    pub status: String,
    pub docs: String,
    pub redoc: String,
    pub endpoints: BTreeMap<String, String>,
}

static DESCRIPTOR: Lazy<ServiceDescriptor> = Lazy::new(|| ServiceDescriptor {
    message: "Chamber Gateway API".to_string(),
    version: env!("CARGO_PKG_VERSION").to_string(),
    status: "operational".to_string(),
    docs: "/docs".to_string(),
    redoc: "/redoc".to_string(),
    endpoints: ENDPOINT_GROUPS
        .iter()
        .map(|group| (group.name.to_string(), format!("{}/*", group.prefix)))
        .collect(),
});

/// Root endpoint with API information
pub async fn service_descriptor() -> Json<ServiceDescriptor> {
    Json(DESCRIPTOR.clone())
}

/// Routes owned by the gateway core
pub fn core_router() -> Router<AppState> {
    Router::new()
        .route("/", get(service_descriptor))
        .route("/health", get(health::health))
}

/// Builder mounting externally-owned endpoint-group routers
///
/// The core never inspects the mounted routers; they are the opaque next
/// stage of the request pipeline.
#[derive(Default)]
pub struct ApiRouter {
    inner: Router<AppState>,
}

impl ApiRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount `routes` at the group's prefix
    pub fn mount(mut self, group: &EndpointGroup, routes: Router<AppState>) -> Self {
        self.inner = self.inner.nest(group.prefix, routes);
        self
    }

    pub fn into_router(self) -> Router<AppState> {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_covers_every_group() {
        assert_eq!(ENDPOINT_GROUPS.len(), 12);
        assert_eq!(DESCRIPTOR.endpoints.len(), 12);

        for group in ENDPOINT_GROUPS {
            let advertised = DESCRIPTOR
                .endpoints
                .get(group.name)
                .expect("group advertised");
            assert_eq!(advertised, &format!("{}/*", group.prefix));
        }
    }

    #[test]
    fn descriptor_prefixes_match_original_layout() {
        assert_eq!(DESCRIPTOR.endpoints["authentication"], "/api/auth/*");
        assert_eq!(DESCRIPTOR.endpoints["websockets"], "/ws/*");
        assert_eq!(DESCRIPTOR.status, "operational");
        assert_eq!(DESCRIPTOR.docs, "/docs");
        assert_eq!(DESCRIPTOR.redoc, "/redoc");
    }

    #[test]
    fn group_lookup() {
        let group = endpoint_group("pressure").expect("pressure group exists");
        assert_eq!(group.prefix, "/api/pressure");
        assert!(endpoint_group("nonexistent").is_none());
    }
}
