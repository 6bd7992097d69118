//! Caller identity for protected routes.
//!
//! Tokens are verified by the gateway in front of this server. The gateway
//! forwards the caller's bearer token untouched and adds the verified user id
//! (and, when known, the subscription tier) as headers; this module only reads
//! them back.

use std::hash::{Hash, Hasher};

use axum::http::HeaderMap;
use repsync_core::sync::AUTHENTICATED_USER_HEADER;

use crate::error::AppError;

pub const SUBSCRIPTION_HEADER: &str = "x-subscription";

#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub subscription: Option<String>,
}

impl AuthenticatedUser {
    /// Identity for a request that passed the gateway.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, AppError> {
        extract_bearer_token(headers)?;

        let user_id = header_text(headers, AUTHENTICATED_USER_HEADER)?
            .ok_or_else(|| AppError::unauthorized("Request was not authenticated by the gateway"))?;
        let subscription = header_text(headers, SUBSCRIPTION_HEADER)?;

        Ok(Self {
            user_id,
            subscription,
        })
    }

    pub fn fingerprint(&self) -> u64 {
        user_fingerprint(&self.user_id)
    }
}

pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let header = headers
        .get("authorization")
        .ok_or_else(|| AppError::unauthorized("Missing Authorization header"))?
        .to_str()
        .map_err(|_| AppError::unauthorized("Authorization header is not valid UTF-8"))?;

    let (scheme, token) = header
        .split_once(' ')
        .ok_or_else(|| AppError::unauthorized("Authorization header must be `Bearer <token>`"))?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AppError::unauthorized(
            "Authorization scheme must be `Bearer`",
        ));
    }
    let token = token.trim();
    if token.is_empty() {
        return Err(AppError::unauthorized("Bearer token is empty"));
    }

    Ok(token)
}

/// Stable hash used in logs instead of the raw user id.
pub fn user_fingerprint(user_id: &str) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    user_id.hash(&mut hasher);
    hasher.finish()
}

fn header_text(headers: &HeaderMap, name: &str) -> Result<Option<String>, AppError> {
    let Some(value) = headers.get(name) else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|_| AppError::unauthorized(format!("{name} header is not valid UTF-8")))?
        .trim();
    Ok((!value.is_empty()).then(|| value.to_string()))
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn gateway_headers(user: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            "authorization",
            HeaderValue::from_static("Bearer abc.def.ghi"),
        );
        headers.insert("x-authenticated-user", HeaderValue::from_static(user));
        headers
    }

    #[test]
    fn bearer_token_extractor_accepts_standard_header() {
        let headers = gateway_headers("user-a");
        assert_eq!(extract_bearer_token(&headers).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn bearer_token_extractor_rejects_wrong_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Basic abc"));
        assert!(extract_bearer_token(&headers).is_err());
    }

    #[test]
    fn gateway_identity_is_read_from_headers() {
        let mut headers = gateway_headers("user-a");
        headers.insert(SUBSCRIPTION_HEADER, HeaderValue::from_static("premium"));

        let user = AuthenticatedUser::from_headers(&headers).unwrap();
        assert_eq!(user.user_id, "user-a");
        assert_eq!(user.subscription.as_deref(), Some("premium"));
    }

    #[test]
    fn token_without_gateway_identity_is_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer token"));
        assert!(matches!(
            AuthenticatedUser::from_headers(&headers),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn blank_gateway_identity_is_rejected() {
        assert!(AuthenticatedUser::from_headers(&gateway_headers(" ")).is_err());
    }

    #[test]
    fn fingerprint_is_stable_and_hides_id() {
        assert_eq!(user_fingerprint("user-a"), user_fingerprint("user-a"));
        assert_ne!(user_fingerprint("user-a"), user_fingerprint("user-b"));
    }
}
