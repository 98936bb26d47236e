//! Slack request signature verification (signing secret, `v0` scheme).
//!
//! This module is "core-only": it does not know about Axum extractors or the
//! request body stream. The middleware captures the raw bytes and the clock
//! reading, then calls `verify`.
//!
//! Every failure is reported to the caller as `false`. The reason is only
//! logged locally so a remote sender cannot probe which check failed.

use axum::http::HeaderMap;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::{debug, error, warn};

use crate::config::Secret;

pub const TIMESTAMP_HEADER: &str = "x-slack-request-timestamp";
pub const SIGNATURE_HEADER: &str = "x-slack-signature";

/// Signature scheme version, used both in the base string and the header value.
pub const SIGNATURE_VERSION: &str = "v0";

/// Maximum allowed distance between the request timestamp and our clock.
pub const MAX_CLOCK_SKEW_SECS: u64 = 60 * 5;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("missing timestamp header")]
    MissingTimestamp,
    #[error("timestamp is not an integer")]
    InvalidTimestamp,
    #[error("timestamp outside replay window (skew {skew_secs}s)")]
    Stale { skew_secs: u64 },
    #[error("missing signature header")]
    MissingSignature,
    #[error("signing secret is not configured")]
    SecretNotConfigured,
    #[error("signature mismatch")]
    Mismatch,
}

/// Verify a Slack webhook request.
///
/// - `raw_body` must be the bytes exactly as received.
/// - `now` is seconds since epoch, injected so the check is deterministic.
/// - `bypass` comes from startup configuration only.
pub fn verify(
    headers: &HeaderMap,
    raw_body: &[u8],
    now: i64,
    secret: &Secret,
    bypass: bool,
) -> bool {
    if bypass {
        warn!("DEVELOPMENT_MODE is enabled: accepting webhook without signature verification");
        return true;
    }

    match check(headers, raw_body, now, secret) {
        Ok(()) => true,
        Err(SignatureError::SecretNotConfigured) => {
            error!("rejecting webhook: signing secret is not configured");
            false
        }
        Err(err) => {
            warn!(error = %err, "rejecting webhook: signature verification failed");
            false
        }
    }
}

/// Same checks as `verify`, but returns the reason for a rejection.
pub fn check(
    headers: &HeaderMap,
    raw_body: &[u8],
    now: i64,
    secret: &Secret,
) -> Result<(), SignatureError> {
    let timestamp =
        header_str(headers, TIMESTAMP_HEADER).ok_or(SignatureError::MissingTimestamp)?;
    let ts: i64 = timestamp
        .parse()
        .map_err(|_| SignatureError::InvalidTimestamp)?;

    let skew_secs = now.abs_diff(ts);
    if skew_secs > MAX_CLOCK_SKEW_SECS {
        return Err(SignatureError::Stale { skew_secs });
    }

    let provided =
        header_str(headers, SIGNATURE_HEADER).ok_or(SignatureError::MissingSignature)?;

    if secret.is_empty() {
        return Err(SignatureError::SecretNotConfigured);
    }

    let expected = sign(secret.expose().as_bytes(), timestamp, raw_body);
    debug!(timestamp, "comparing webhook signature");

    if bool::from(expected.as_bytes().ct_eq(provided.as_bytes())) {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

/// Compute `v0=<hex(HMAC-SHA256(key, "v0:<timestamp>:<body>"))>`.
///
/// `timestamp` is the literal header text, not a re-formatted integer.
pub fn sign(key: &[u8], timestamp: &str, raw_body: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(key)
        .unwrap_or_else(|_| unreachable!("HMAC-SHA256 accepts any key length"));
    mac.update(SIGNATURE_VERSION.as_bytes());
    mac.update(b":");
    mac.update(timestamp.as_bytes());
    mac.update(b":");
    mac.update(raw_body);
    let digest = mac.finalize().into_bytes();
    format!("{}={}", SIGNATURE_VERSION, hex::encode(digest))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Process-wide verifier built once from `Config`.
#[derive(Clone, Debug)]
pub struct SignatureVerifier {
    secret: Secret,
    bypass: bool,
}

impl SignatureVerifier {
    pub fn new(secret: Secret, bypass: bool) -> Self {
        Self { secret, bypass }
    }

    pub fn is_bypassed(&self) -> bool {
        self.bypass
    }

    pub fn verify(&self, headers: &HeaderMap, raw_body: &[u8], now: i64) -> bool {
        verify(headers, raw_body, now, &self.secret, self.bypass)
    }
}
