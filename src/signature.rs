//! Webhook signature verification.
//!
//! Plane signs each delivery with HMAC-SHA256 over the raw request body
//! and sends the lowercase hex digest in `X-Plane-Signature`. The digest
//! must be computed over the bytes exactly as received: re-serialized
//! JSON is not byte-stable.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::{AppError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the hex-encoded body signature.
pub const SIGNATURE_HEADER: &str = "x-plane-signature";

/// Verify `received` as the hex HMAC-SHA256 of `body` under `secret`.
///
/// The comparison runs in constant time via [`Mac::verify_slice`].
///
/// # Errors
///
/// Returns `AppError::Config` if `secret` is empty, and
/// `AppError::Unauthorized` if the signature is empty, not valid hex,
/// or does not match.
pub fn verify(body: &[u8], received: &str, secret: &str) -> Result<()> {
    if secret.is_empty() {
        return Err(AppError::Config("webhook secret is not configured".into()));
    }

    let received = received.trim();
    if received.is_empty() {
        return Err(AppError::Unauthorized("empty signature".into()));
    }

    let tag = hex::decode(received)
        .map_err(|err| AppError::Unauthorized(format!("malformed signature: {err}")))?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|err| AppError::Config(format!("invalid webhook secret: {err}")))?;
    mac.update(body);
    mac.verify_slice(&tag)
        .map_err(|_| AppError::Unauthorized("signature mismatch".into()))
}

/// Boolean form of [`verify`].
#[must_use]
pub fn is_authentic(body: &[u8], received: &str, secret: &str) -> bool {
    verify(body, received, secret).is_ok()
}

/// Hex HMAC-SHA256 of `body` under `secret`, as Plane would send it.
///
/// # Errors
///
/// Returns `AppError::Config` if `secret` is empty.
pub fn sign(body: &[u8], secret: &str) -> Result<String> {
    if secret.is_empty() {
        return Err(AppError::Config("webhook secret is not configured".into()));
    }
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|err| AppError::Config(format!("invalid webhook secret: {err}")))?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}
