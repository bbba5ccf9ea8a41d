//! Webhook authentication for both payment providers.
//!
//! Stripe signs `"{timestamp}.{body}"` with HMAC-SHA256 and sends
//! `t=<ts>,v1=<hex>[,v1=<hex>...]`. Asaas sends a static token chosen when
//! the webhook was registered.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::app_error::{AppError, AppResult};

type HmacSha256 = Hmac<Sha256>;

/// Maximum allowed distance between the signed timestamp and now.
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

fn compute_signature(secret: &str, timestamp: &str, body: &[u8]) -> AppResult<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| AppError::Internal("HMAC error".into()))?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Builds a signature header the way the card provider does.
pub fn sign_payload(secret: &str, timestamp: i64, body: &[u8]) -> AppResult<String> {
    let signature = compute_signature(secret, &timestamp.to_string(), body)?;
    Ok(format!("t={},v1={}", timestamp, signature))
}

/// Verifies a `t=..,v1=..` header against the raw body.
pub fn verify_signature_header(
    body: &[u8],
    header: &str,
    secret: &str,
    now_unix: i64,
    tolerance_secs: i64,
) -> AppResult<()> {
    let mut timestamp: Option<&str> = None;
    let mut signatures: Vec<&str> = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = Some(value),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(AppError::InvalidSignature)?;
    if signatures.is_empty() {
        return Err(AppError::InvalidSignature);
    }
    let ts: i64 = timestamp.parse().map_err(|_| AppError::InvalidSignature)?;

    // The timestamp is only trusted once a signature matches.
    let expected = compute_signature(secret, timestamp, body)?;
    if !signatures
        .iter()
        .any(|sig| constant_time_compare(sig, &expected))
    {
        return Err(AppError::InvalidSignature);
    }

    if now_unix.abs_diff(ts) > tolerance_secs.unsigned_abs() {
        tracing::warn!(timestamp = ts, "Webhook signature timestamp outside tolerance");
        return Err(AppError::InvalidSignature);
    }
    Ok(())
}

/// Verifies a static shared token header.
pub fn verify_shared_token(presented: &str, expected: &str) -> AppResult<()> {
    if !expected.is_empty() && constant_time_compare(presented, expected) {
        Ok(())
    } else {
        Err(AppError::InvalidSignature)
    }
}

pub fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}
