//! Slack signature check for the webhook routes.
//!
//! The body is buffered once, verified against the signature headers, and the
//! same bytes are put back into the request for the handler. Nothing between
//! the socket and the HMAC re-encodes the payload.

use axum::{
    Router,
    body::{self, Body},
    extract::State,
    http::Request,
    middleware::{self, Next},
    response::Response,
};

use crate::error::AppError;
use crate::middleware::http::MAX_BODY_BYTES;
use crate::state::AppState;

/// Require a valid Slack signature on every route of `router`.
pub fn apply(router: Router<AppState>, state: AppState) -> Router<AppState> {
    router.route_layer(middleware::from_fn_with_state(state, verify_signature))
}

async fn verify_signature(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let (parts, body) = req.into_parts();

    let raw = body::to_bytes(body, MAX_BODY_BYTES).await.map_err(|err| {
        tracing::warn!(error = %err, "failed to read webhook body");
        AppError::bad_request("INVALID_BODY", "could not read request body")
    })?;

    let now = chrono::Utc::now().timestamp();
    if !state.verifier.verify(&parts.headers, &raw, now) {
        return Err(AppError::InvalidSignature);
    }

    let req = Request::from_parts(parts, Body::from(raw));
    Ok(next.run(req).await)
}
