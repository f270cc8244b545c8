// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Signed OAuth `state` parameter.
//!
//! Format before encoding: `nonce|timestamp_hex|signature_hex`, where the
//! signature is HMAC-SHA256 over `nonce|timestamp_hex`. The whole string is
//! base64url encoded for the URL.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

// Type alias for HMAC-SHA256
type HmacSha256 = Hmac<Sha256>;

/// How long a login attempt may take between redirect and callback.
pub const STATE_MAX_AGE_MS: i64 = 10 * 60 * 1000;

/// Create a signed state value for a login started at `now_ms`.
pub fn sign_state(secret: &[u8], now_ms: i64) -> anyhow::Result<String> {
    let nonce = uuid::Uuid::new_v4().simple().to_string();
    let payload = format!("{}|{:x}", nonce, now_ms);

    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| anyhow::anyhow!("HMAC init failed: {}", e))?;
    mac.update(payload.as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());

    Ok(URL_SAFE_NO_PAD.encode(format!("{}|{}", payload, signature)))
}

/// Verify signature and age. Returns `false` for anything malformed.
pub fn verify_state(state: &str, secret: &[u8], now_ms: i64) -> bool {
    let Some(bytes) = URL_SAFE_NO_PAD.decode(state).ok() else {
        return false;
    };
    let Ok(state_str) = String::from_utf8(bytes) else {
        return false;
    };

    let parts: Vec<&str> = state_str.splitn(3, '|').collect();
    let [nonce, timestamp_hex, signature_hex] = parts.as_slice() else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(format!("{}|{}", nonce, timestamp_hex).as_bytes());
    let expected = hex::encode(mac.finalize().into_bytes());

    if !bool::from(expected.as_bytes().ct_eq(signature_hex.as_bytes())) {
        tracing::error!("OAuth state signature mismatch! Potential tampering.");
        return false;
    }

    let Ok(issued_ms) = i64::from_str_radix(timestamp_hex, 16) else {
        return false;
    };
    let age = now_ms - issued_ms;
    (0..=STATE_MAX_AGE_MS).contains(&age)
}
