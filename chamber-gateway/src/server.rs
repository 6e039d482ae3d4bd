//! HTTP server: middleware pipeline assembly and graceful shutdown

use std::any::Any;
use std::net::SocketAddr;

use axum::{
    extract::{Request, State},
    http::{HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Json, Router,
};
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::{
    catch_panic::CatchPanicLayer,
    compression::{predicate::SizeAbove, CompressionLayer},
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
};

use crate::{
    error::{ErrorDetail, ErrorEnvelope, Result},
    middleware::{
        request_id_layer, request_id_propagation_layer, sensitive_headers_layer, track_requests,
    },
    routes::{self, ApiRouter},
    state::AppState,
};

/// Server instance
pub struct Server {
    state: AppState,
}

impl Server {
    /// Create a new server around the shared application state
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Run the server, mounting `api` behind the core routes
    ///
    /// The lifecycle hooks bracket the accept loop: `on_start` completes
    /// before the listener opens, and `on_stop` runs after it closes,
    /// regardless of how serving ended.
    pub async fn serve(self, api: ApiRouter) -> Result<()> {
        let addr = self.state.config().bind_addr()?;

        self.log_middleware_config();

        let app = self.build_app(api);

        self.state.lifecycle().on_start().await;

        let listener = TcpListener::bind(&addr).await?;
        tracing::info!("Server listening on {}", addr);

        let served = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await;

        self.state.lifecycle().on_stop().await;
        tracing::info!("Server shutdown complete");

        served.map_err(Into::into)
    }

    /// Compose the core routes with `api` and apply the middleware stack
    ///
    /// Exposed so tests can drive the exact production pipeline without
    /// binding a socket.
    pub fn build_app(&self, api: ApiRouter) -> Router {
        let router = routes::core_router().merge(api.into_router());
        self.apply_middleware(router).with_state(self.state.clone())
    }

    /// The fixed pipeline order, outermost first: compression, CORS,
    /// sensitive-header masking, request ID set/propagate, logging/timing,
    /// error normalization, panic recovery, router dispatch.
    fn apply_middleware(&self, router: Router<AppState>) -> Router<AppState> {
        let middleware_config = &self.state.config().middleware;
        let compression = CompressionLayer::new()
            .compress_when(SizeAbove::new(middleware_config.compression_min_bytes));
        let cors = self.build_cors_layer();

        // The last layer added is the first to see the request.
        router
            .layer(CatchPanicLayer::custom(handle_panic))
            .layer(middleware::from_fn_with_state(
                self.state.clone(),
                normalize_errors,
            ))
            .layer(middleware::from_fn(track_requests))
            .layer(request_id_propagation_layer())
            .layer(request_id_layer())
            .layer(sensitive_headers_layer())
            .layer(cors)
            .layer(compression)
    }

    /// Build the CORS layer from configuration
    fn build_cors_layer(&self) -> CorsLayer {
        let middleware_config = &self.state.config().middleware;
        match middleware_config.cors_mode.as_str() {
            "permissive" => CorsLayer::very_permissive(),
            "restrictive" => CorsLayer::new(),
            "origins" => {
                let origins = middleware_config
                    .allowed_origins
                    .iter()
                    .filter_map(|origin| origin.parse::<HeaderValue>().ok())
                    .collect::<Vec<_>>();
                CorsLayer::new()
                    .allow_origin(AllowOrigin::list(origins))
                    .allow_methods(AllowMethods::mirror_request())
                    .allow_headers(AllowHeaders::mirror_request())
                    .allow_credentials(true)
            }
            mode => {
                tracing::warn!("Unknown CORS mode: {mode}, defaulting to permissive");
                CorsLayer::very_permissive()
            }
        }
    }

    /// Log middleware configuration for debugging
    fn log_middleware_config(&self) {
        let config = self.state.config();
        tracing::info!("Middleware configuration:");
        tracing::info!("  - Panic recovery: enabled");
        tracing::info!(
            "  - Error normalization: enabled (expose details: {})",
            config.service.debug
        );
        tracing::info!("  - Request ID tracking: enabled");
        tracing::info!("  - Sensitive header masking: enabled");
        tracing::info!(
            "  - Compression: enabled above {} bytes",
            config.middleware.compression_min_bytes
        );
        tracing::info!("  - CORS mode: {}", config.middleware.cors_mode);
    }
}

/// Global error normalizer wrapping the router dispatch
///
/// Any failure that escaped the handlers arrives here as a response marked
/// with [`ErrorDetail`]. The marker is logged with request context and the
/// body replaced by the uniform envelope; nothing propagates past this
/// stage.
async fn normalize_errors(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();

    let mut response = next.run(request).await;

    if let Some(failure) = response.extensions_mut().remove::<ErrorDetail>() {
        tracing::error!(
            kind = failure.kind,
            "Unhandled failure in {method} {path}: {}",
            failure.detail
        );

        let envelope = if state.config().service.debug {
            ErrorEnvelope::with_detail(failure.detail)
        } else {
            ErrorEnvelope::redacted()
        };
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(envelope)).into_response();
    }

    response
}

/// Convert a handler panic into a marked 500 for the normalizer
fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(message) = err.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = err.downcast_ref::<&str>() {
        (*message).to_string()
    } else {
        "request handler panicked".to_string()
    };

    let mut response =
        (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorEnvelope::redacted())).into_response();
    response.extensions_mut().insert(ErrorDetail {
        kind: "panic",
        detail,
    });
    response
}

/// Wait for a shutdown signal (SIGTERM or SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl+C), starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn panic_detail_is_extracted() {
        let response = handle_panic(Box::new("worker died".to_string()));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let failure = response
            .extensions()
            .get::<ErrorDetail>()
            .expect("detail extension");
        assert_eq!(failure.kind, "panic");
        assert_eq!(failure.detail, "worker died");
    }

    #[test]
    fn opaque_panic_payload_gets_placeholder() {
        let response = handle_panic(Box::new(42_u32));
        let failure = response
            .extensions()
            .get::<ErrorDetail>()
            .expect("detail extension");
        assert_eq!(failure.detail, "request handler panicked");
    }

    #[test]
    fn server_builds_app_for_any_cors_mode() {
        for mode in ["permissive", "restrictive", "origins", "bogus"] {
            let mut config = Config::default();
            config.middleware.cors_mode = mode.to_string();
            config.middleware.allowed_origins = vec!["https://operator.example".to_string()];

            let server = Server::new(AppState::new(config));
            let _ = server.build_app(ApiRouter::new());
        }
    }
}
