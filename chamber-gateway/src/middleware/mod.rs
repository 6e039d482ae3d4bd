//! Request pipeline middleware

pub mod request_tracking;

pub use request_tracking::{
    request_id_layer, request_id_propagation_layer, sensitive_headers_layer, track_requests,
    PROCESS_TIME_HEADER, SENSITIVE_HEADERS,
};
