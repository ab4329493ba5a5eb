use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// RFC 7807 Problem Details payload.
#[derive(Debug, Serialize)]
pub struct ProblemDetails {
    /// A URI reference that identifies the problem type.
    #[serde(rename = "type")]
    pub r#type: String,
    /// A short, human-readable summary of the problem type.
    pub title: String,
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// A URI reference that identifies this specific occurrence.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    /// A stable, machine-readable application error code (WHR_...).
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

/// Build a Problem Details response with the correct content-type.
pub fn problem(
    status: StatusCode,
    code: &str,
    detail: Option<String>,
    instance: Option<String>,
    trace_id: Option<String>,
) -> Response {
    // Step 1: Build the problem payload.
    let payload = ProblemDetails {
        r#type: "about:blank".to_string(),
        title: status.canonical_reason().unwrap_or("Error").to_string(),
        status: status.as_u16(),
        detail,
        instance,
        code: code.to_string(),
        trace_id,
    };

    // Step 2: Convert to an HTTP response with JSON body.
    let mut response = (status, Json(payload)).into_response();

    // Step 3: Ensure RFC 7807 content type.
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/problem+json"),
    );

    response
}

/// Shorthand for the 503 every handler returns when storage fails.
pub fn storage_unavailable(trace_id: Option<String>) -> Response {
    problem(
        StatusCode::SERVICE_UNAVAILABLE,
        WHR_STORAGE_UNAVAILABLE,
        Some("storage unavailable".to_string()),
        None,
        trace_id,
    )
}

pub const WHR_REQUEST_MALFORMED: &str = "WHR_REQUEST_MALFORMED";
pub const WHR_AUTH_MISSING_OWNER: &str = "WHR_AUTH_MISSING_OWNER";
pub const WHR_AUTH_FORBIDDEN: &str = "WHR_AUTH_FORBIDDEN";
pub const WHR_VALIDATION_FAILED: &str = "WHR_VALIDATION_FAILED";
pub const WHR_ENDPOINT_URL_REJECTED: &str = "WHR_ENDPOINT_URL_REJECTED";
pub const WHR_ENDPOINT_NOT_FOUND: &str = "WHR_ENDPOINT_NOT_FOUND";
pub const WHR_DELIVERY_NOT_FOUND: &str = "WHR_DELIVERY_NOT_FOUND";
pub const WHR_DELIVERY_CONFLICT: &str = "WHR_DELIVERY_CONFLICT";
pub const WHR_STORAGE_UNAVAILABLE: &str = "WHR_STORAGE_UNAVAILABLE";
