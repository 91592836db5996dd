//! Taskboard WASM Module
//!
//! Browser bindings for the client session rules: the verification merge,
//! the display-only claims hint and registration pre-validation. Values
//! cross the boundary as JSON strings.

use taskboard_shared::session::decode_claims_hint;
use taskboard_shared::{merge_identity, PublicUser, RegisterRequest};
use wasm_bindgen::prelude::*;

fn merge_json(cached: &str, server: &str) -> Result<String, String> {
    let cached: PublicUser = serde_json::from_str(cached).map_err(|e| e.to_string())?;
    let server: PublicUser = serde_json::from_str(server).map_err(|e| e.to_string())?;
    serde_json::to_string(&merge_identity(&cached, &server)).map_err(|e| e.to_string())
}

fn claims_hint_json(token: &str) -> Result<String, String> {
    let hint = decode_claims_hint(token).map_err(|e| e.to_string())?;
    serde_json::to_string(&hint).map_err(|e| e.to_string())
}

fn registration_errors_json(body: &str) -> Result<String, String> {
    let request: RegisterRequest = serde_json::from_str(body).map_err(|e| e.to_string())?;
    let errors = request.normalized().validate().err().unwrap_or_default();
    serde_json::to_string(&errors).map_err(|e| e.to_string())
}

/// Merge a verification response into the cached user.
///
/// Empty server fields keep the cached value.
#[wasm_bindgen(js_name = mergeIdentity)]
pub fn merge_identity_js(cached: &str, server: &str) -> Result<String, JsValue> {
    merge_json(cached, server).map_err(|e| JsValue::from_str(&e))
}

/// Unverified token claims for display. Never use for access decisions.
#[wasm_bindgen(js_name = decodeClaimsHint)]
pub fn decode_claims_hint_js(token: &str) -> Result<String, JsValue> {
    claims_hint_json(token).map_err(|e| JsValue::from_str(&e))
}

/// Whether the token's unverified expiry has passed
#[wasm_bindgen(js_name = claimsLookExpired)]
pub fn claims_look_expired(token: &str, now_secs: f64) -> bool {
    decode_claims_hint(token)
        .map(|hint| hint.looks_expired(now_secs as i64))
        .unwrap_or(true)
}

/// Field errors for a registration form, as a JSON array (empty when valid)
#[wasm_bindgen(js_name = validateRegistration)]
pub fn validate_registration(body: &str) -> Result<String, JsValue> {
    registration_errors_json(body).map_err(|e| JsValue::from_str(&e))
}

#[wasm_bindgen(js_name = defaultAvatarUrl)]
pub fn default_avatar_url(name: &str) -> String {
    taskboard_shared::default_avatar_url(name)
}
