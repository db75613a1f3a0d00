//! Facebook webhook verification and event extraction.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::{json, Value};
use sha2::Sha256;

use crate::validation::FACEBOOK_PROVIDER;
use crate::{Error, Result};

/// Header carrying the HMAC-SHA256 of the raw request body.
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

/// Query parameters Facebook sends when verifying a webhook subscription.
#[derive(Debug, Default, Deserialize)]
pub struct SubscriptionQuery {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

/// Answer a subscription handshake, returning the challenge to echo back.
pub fn verify_subscription(query: &SubscriptionQuery, verification_token: &str) -> Result<String> {
    if query.mode.as_deref() != Some("subscribe") {
        return Err(Error::Signature("hub.mode is not subscribe".to_string()));
    }
    if query.verify_token.as_deref() != Some(verification_token) {
        return Err(Error::Signature("hub.verify_token mismatch".to_string()));
    }
    query
        .challenge
        .clone()
        .ok_or_else(|| Error::Validation("hub.challenge not provided.".to_string()))
}

/// Check a `sha256=<hex>` signature header against the raw body.
pub fn verify_signature(payload: &[u8], signature_header: &str, app_secret: &str) -> Result<()> {
    let digest_hex = signature_header
        .strip_prefix("sha256=")
        .ok_or_else(|| Error::Signature("signature must use sha256=<hex> format".to_string()))?;
    let signature_bytes = hex::decode(digest_hex.trim())
        .map_err(|e| Error::Signature(format!("invalid signature hex: {}", e)))?;

    let mut mac = Hmac::<Sha256>::new_from_slice(app_secret.as_bytes())
        .map_err(|e| Error::Signature(format!("failed to initialize hmac verifier: {}", e)))?;
    mac.update(payload);
    mac.verify_slice(&signature_bytes)
        .map_err(|_| Error::Signature("signature verification failed".to_string()))
}

/// Split a page webhook delivery into one pipeline parameter object per messaging event.
///
/// Each object has the `{facebook, provider}` shape the normalize action takes.
pub fn messaging_events(body: &Value) -> Result<Vec<Value>> {
    if body.get("object").and_then(Value::as_str) != Some("page") {
        return Err(Error::Validation(
            "Webhook object is not a page subscription.".to_string(),
        ));
    }

    let events = body
        .get("entry")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|entry| entry.get("messaging").and_then(Value::as_array))
        .flatten()
        .map(|event| json!({ "facebook": event, "provider": FACEBOOK_PROVIDER }))
        .collect();

    Ok(events)
}
