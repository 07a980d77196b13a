//! Webhook signature verification.
//!
//! Shopify signs the raw body with HMAC-SHA256 and sends it base64-encoded in
//! `X-Shopify-Hmac-Sha256`. Stripe sends `Stripe-Signature: t=<unix>,v1=<hex>`
//! where the MAC covers `"{t}.{body}"`.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::CommerceError;

type HmacSha256 = Hmac<Sha256>;

/// Stripe's default replay window.
pub const STRIPE_TOLERANCE_SECS: i64 = 300;

fn mac(secret: &str) -> Result<HmacSha256, CommerceError> {
    HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| CommerceError::Signature(format!("bad secret: {}", e)))
}

/// Base64 HMAC-SHA256 of `body`, as Shopify computes it.
pub fn shopify_hmac(body: &[u8], secret: &str) -> Result<String, CommerceError> {
    let mut mac = mac(secret)?;
    mac.update(body);
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Check an `X-Shopify-Hmac-Sha256` header against the raw body.
pub fn verify_shopify_hmac(body: &[u8], header: &str, secret: &str) -> Result<(), CommerceError> {
    let expected = STANDARD
        .decode(header.trim())
        .map_err(|_| CommerceError::Signature("HMAC header is not base64".to_string()))?;

    let mut mac = mac(secret)?;
    mac.update(body);
    mac.verify_slice(&expected)
        .map_err(|_| CommerceError::Signature("HMAC mismatch".to_string()))
}

/// Parsed `Stripe-Signature` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StripeSignature {
    pub timestamp: i64,
    pub v1: Vec<String>,
}

/// Parse `t=...,v1=...[,v1=...]`. Unknown schemes (e.g. `v0`) are ignored.
pub fn parse_stripe_signature(header: &str) -> Result<StripeSignature, CommerceError> {
    let mut timestamp = None;
    let mut v1 = Vec::new();

    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => {
                timestamp = Some(value.parse::<i64>().map_err(|_| {
                    CommerceError::Signature("timestamp is not an integer".to_string())
                })?)
            }
            "v1" => v1.push(value.to_string()),
            _ => {}
        }
    }

    let timestamp =
        timestamp.ok_or_else(|| CommerceError::Signature("missing timestamp".to_string()))?;
    if v1.is_empty() {
        return Err(CommerceError::Signature("no v1 signature".to_string()));
    }

    Ok(StripeSignature { timestamp, v1 })
}

/// Hex HMAC-SHA256 over `"{timestamp}.{payload}"`.
pub fn stripe_signature(payload: &[u8], timestamp: i64, secret: &str) -> Result<String, CommerceError> {
    let mut mac = mac(secret)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Verify a `Stripe-Signature` header. `now` is the current unix time.
pub fn verify_stripe_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    now: i64,
    tolerance_secs: i64,
) -> Result<(), CommerceError> {
    let parsed = parse_stripe_signature(header)?;

    let within_tolerance = now
        .checked_sub(parsed.timestamp)
        .map(i64::unsigned_abs)
        .is_some_and(|age| age <= tolerance_secs.unsigned_abs());
    if !within_tolerance {
        return Err(CommerceError::Signature(
            "timestamp outside the tolerance zone".to_string(),
        ));
    }

    for candidate in &parsed.v1 {
        let Ok(bytes) = hex::decode(candidate) else {
            continue;
        };
        let mut mac = mac(secret)?;
        mac.update(parsed.timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        if mac.verify_slice(&bytes).is_ok() {
            return Ok(());
        }
    }

    Err(CommerceError::Signature(
        "no signatures found matching the expected signature for payload".to_string(),
    ))
}
