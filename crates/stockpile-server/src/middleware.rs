use std::time::Instant;

use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Method, Request, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use stockpile_api::ApiError;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

// Request ID middleware: propagate an incoming x-request-id or generate one.
pub async fn request_id(mut req: Request<Body>, next: Next) -> Response {
    let header_name = HeaderName::from_static(REQUEST_ID_HEADER);

    let req_id_value = match req.headers().get(&header_name) {
        Some(v) => v.clone(),
        None => generated_request_id(),
    };

    // Downstream layers (the trace span) read it from extensions.
    req.extensions_mut().insert(req_id_value.clone());

    let mut res = next.run(req).await;
    res.headers_mut().insert(header_name, req_id_value);
    res
}

fn generated_request_id() -> HeaderValue {
    // A hyphenated UUID is always a valid header value.
    HeaderValue::from_str(&Uuid::new_v4().to_string())
        .unwrap_or_else(|_| HeaderValue::from_static("unknown"))
}

// Content type check: POST/PUT bodies must be JSON.
pub async fn json_content_type(req: Request<Body>, next: Next) -> Response {
    let method = req.method();
    let needs_body_type = method == Method::POST || method == Method::PUT;

    if needs_body_type && !is_json_content_type(req.headers().get(header::CONTENT_TYPE)) {
        return ApiError::unsupported_media_type("Content-Type must be application/json")
            .into_response();
    }

    next.run(req).await
}

fn is_json_content_type(value: Option<&HeaderValue>) -> bool {
    value
        .and_then(|v| v.to_str().ok())
        .map(|s| {
            let mime = s.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
            mime == "application/json" || (mime.starts_with("application/") && mime.ends_with("+json"))
        })
        .unwrap_or(false)
}

// Records http_requests_total and http_request_duration_seconds.
pub async fn http_metrics(req: Request<Body>, next: Next) -> Response {
    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let started = Instant::now();

    let res = next.run(req).await;

    crate::metrics::record_http_request(&method, &path, res.status().as_u16(), started.elapsed());
    res
}
