use crate::domain::value_objects::ids::OwnerId;
use crate::interface::http::problem::{WHR_AUTH_MISSING_OWNER, problem};
use crate::interface::http::trace::TraceId;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::Response;

/// Header carrying the caller identity, set by the trusted gateway in front of this service.
pub const OWNER_HEADER: &str = "x-owner-id";

const PUBLIC_PATHS: [&str; 4] = ["/health", "/ready", "/metrics", "/event-types"];

/// Resolves the `X-Owner-Id` header into an `OwnerId` request extension.
///
/// Probes and the event-type catalogue are public.
pub async fn owner_middleware(mut req: Request<Body>, next: Next) -> Result<Response, Response> {
    let trace_id = req.extensions().get::<TraceId>().map(|t| t.0.clone());
    // Step 1: allow public endpoints through.
    let path = req.uri().path().to_string();
    if PUBLIC_PATHS.contains(&path.as_str()) {
        return Ok(next.run(req).await);
    }

    // Step 2: parse the owner id.
    let owner = req
        .headers()
        .get(OWNER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    let Some(raw) = owner else {
        return Err(problem(
            StatusCode::UNAUTHORIZED,
            WHR_AUTH_MISSING_OWNER,
            Some("missing X-Owner-Id header".to_string()),
            Some(path),
            trace_id,
        ));
    };
    let Ok(owner_id) = uuid::Uuid::parse_str(raw) else {
        return Err(problem(
            StatusCode::UNAUTHORIZED,
            WHR_AUTH_MISSING_OWNER,
            Some("X-Owner-Id must be a uuid".to_string()),
            Some(path),
            trace_id,
        ));
    };

    // Step 3: attach the owner for handlers.
    req.extensions_mut().insert(OwnerId(owner_id));
    Ok(next.run(req).await)
}
