//! Request correlation and timing
//!
//! Every request runs inside a span carrying its correlation fields
//! (operation, method, path, client, request id). The span is entered
//! before the router dispatch and closed on every exit path, including
//! panic unwinds and cancellation, so concurrently executing requests
//! never observe each other's fields.

use std::net::SocketAddr;
use std::time::Instant;

use axum::{
    extract::{ConnectInfo, Request},
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    sensitive_headers::SetSensitiveRequestHeadersLayer,
};
use tracing::Instrument;

/// Response header carrying the elapsed wall-clock seconds
pub const PROCESS_TIME_HEADER: &str = "x-process-time";

/// Request headers masked in trace output
pub const SENSITIVE_HEADERS: &[&str] = &["authorization", "cookie", "set-cookie", "x-api-key"];

/// Request ID layer generating a UUID per request
pub fn request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::x_request_id(MakeRequestUuid)
}

/// Copy the request ID onto the response
pub fn request_id_propagation_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::x_request_id()
}

/// Mask sensitive request headers in trace output
pub fn sensitive_headers_layer() -> SetSensitiveRequestHeadersLayer {
    let headers = SENSITIVE_HEADERS
        .iter()
        .map(|h| h.parse().expect("valid header name"))
        .collect::<Vec<_>>();

    SetSensitiveRequestHeadersLayer::new(headers)
}

/// Per-request logging and timing instrumentation
///
/// Opens the request's correlation scope, times the dispatch, emits one
/// summary log line and stamps the elapsed seconds onto the response.
/// Failures normalized further down arrive here as ordinary responses, so
/// the summary line covers them too.
pub async fn track_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let client = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_owned());
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown")
        .to_owned();

    let span = tracing::info_span!(
        "http_request",
        operation = "HTTP_REQUEST",
        method = %method,
        path = %path,
        client = %client,
        request_id = %request_id,
    );

    let start = Instant::now();
    async move {
        let mut response = next.run(request).await;

        let elapsed = start.elapsed().as_secs_f64();
        let status = response.status().as_u16();
        tracing::info!("{method} {path} - {status} - {elapsed:.3}s");

        if let Ok(value) = HeaderValue::from_str(&elapsed.to_string()) {
            response
                .headers_mut()
                .insert(HeaderName::from_static(PROCESS_TIME_HEADER), value);
        }

        response
    }
    .instrument(span)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode, middleware, routing::get, Router};
    use tower::ServiceExt;

    #[test]
    fn sensitive_headers_parse() {
        // Panics inside the constructor if any entry is not a header name.
        let _ = sensitive_headers_layer();
    }

    #[tokio::test]
    async fn stamps_elapsed_time() {
        let app = Router::new()
            .route("/probe", get(|| async { "ok" }))
            .layer(middleware::from_fn(track_requests));

        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/probe")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("request succeeds");

        assert_eq!(response.status(), StatusCode::OK);
        let header = response
            .headers()
            .get(PROCESS_TIME_HEADER)
            .expect("timing header present");
        let elapsed: f64 = header
            .to_str()
            .expect("header is a string")
            .parse()
            .expect("header is numeric");
        assert!(elapsed >= 0.0);
    }
}
