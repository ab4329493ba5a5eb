use axum::http::{HeaderValue, Method, Request, header};
use axum::middleware::Next;
use axum::response::Response;
use metrics::{counter, histogram};
use tracing::info;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// A per-request trace identifier, echoed in responses and problem documents.
#[derive(Debug, Clone)]
pub struct TraceId(pub String);

impl TraceId {
    /// Owned copy for `problem(..)` calls.
    pub fn value(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

/// Reuses the caller's `x-request-id` or assigns a new one, and echoes it back.
pub async fn trace_id_middleware(mut req: Request<axum::body::Body>, next: Next) -> Response {
    // Step 1: Reuse a client-provided id or generate a new one.
    let trace_id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty() && v.len() <= 128)
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let trace_id = TraceId(trace_id);
    req.extensions_mut().insert(trace_id.clone());

    // Step 2: Run the request and echo the id.
    let mut response = next.run(req).await;
    if let Ok(value) = HeaderValue::from_str(&trace_id.0) {
        response
            .headers_mut()
            .insert(header::HeaderName::from_static(REQUEST_ID_HEADER), value);
    }

    response
}

/// Emits one `http_request` log line and the request metrics.
pub async fn request_log_middleware(req: Request<axum::body::Body>, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let trace_id = req.extensions().get::<TraceId>().map(|t| t.0.clone());
    let start = std::time::Instant::now();

    let response = next.run(req).await;

    let latency_ms = start.elapsed().as_millis() as u64;
    let method_label = method_label(&method);
    let status_code = response.status().as_u16();
    let status_label = status_class(status_code);
    counter!("http_requests_total", "method" => method_label, "status" => status_label)
        .increment(1);
    histogram!(
        "http_request_duration_ms",
        "method" => method_label,
        "status" => status_label
    )
    .record(latency_ms as f64);
    info!(
        trace_id = trace_id.as_deref().unwrap_or(""),
        method = %method,
        path = %path,
        status = status_code,
        latency_ms,
        "http_request"
    );

    response
}

fn method_label(method: &Method) -> &'static str {
    match *method {
        Method::GET => "GET",
        Method::POST => "POST",
        Method::PUT => "PUT",
        Method::PATCH => "PATCH",
        Method::DELETE => "DELETE",
        _ => "OTHER",
    }
}

fn status_class(status: u16) -> &'static str {
    match status {
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        500..=599 => "5xx",
        _ => "other",
    }
}
