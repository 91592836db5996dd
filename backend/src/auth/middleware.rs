//! Authentication gate
//!
//! Every protected call re-verifies its token and resolves the subject
//! against the credential store. Nothing is cached between requests.
//!
//! The authorization value may carry a scheme (`Bearer <token>`) or be the
//! bare token.

use crate::error::ApiError;
use crate::repositories::UserRepository;
use crate::state::AppState;
use axum::{
    extract::{FromRef, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};
use uuid::Uuid;

use super::jwt::TokenError;

/// Identity attached to a request once the gate has passed.
///
/// This is the only trusted identity for the rest of the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
}

/// Pull the token out of the authorization header
pub fn extract_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Err(ApiError::MissingToken);
    };
    let value = value.to_str().map_err(|_| ApiError::InvalidToken)?.trim();
    if value.is_empty() {
        return Err(ApiError::MissingToken);
    }

    let mut parts = value.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(token), None, None) => Ok(token),
        (Some(_scheme), Some(token), None) => Ok(token),
        _ => Err(ApiError::InvalidToken),
    }
}

/// Verify the request's token and resolve its subject
pub async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<AuthUser, ApiError> {
    let token = extract_token(headers)?;

    let claims = state.jwt().verify(token).map_err(|e| {
        match &e {
            TokenError::Expired => debug!("Rejected expired token"),
            TokenError::Malformed(reason) => warn!("Rejected token: {}", reason),
        }
        ApiError::InvalidToken
    })?;

    let user_id = claims.subject_id().map_err(|_| {
        warn!("Token subject is not a valid id");
        ApiError::InvalidToken
    })?;

    let record = UserRepository::find_by_id(state.db(), user_id)
        .await
        .map_err(ApiError::Internal)?
        .ok_or_else(|| {
            debug!(%user_id, "Token subject no longer exists");
            ApiError::UnknownSubject
        })?;

    Ok(AuthUser {
        user_id: record.id,
        username: record.username,
        email: record.email,
    })
}

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // Already resolved by `require_auth` on this route group
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }

        let app_state = AppState::from_ref(state);
        authenticate(&app_state, &parts.headers).await
    }
}

/// Route layer that rejects unauthenticated calls before the handler runs
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = authenticate(&state, request.headers()).await?;
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use rstest::rstest;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[rstest]
    #[case("Bearer abc.def.ghi", "abc.def.ghi")]
    #[case("abc.def.ghi", "abc.def.ghi")]
    #[case("  Bearer   abc.def.ghi  ", "abc.def.ghi")]
    #[case("bearer abc.def.ghi", "abc.def.ghi")]
    fn test_extract_token_accepts_prefixed_and_bare(#[case] value: &str, #[case] expected: &str) {
        let headers = headers(value);
        assert_eq!(extract_token(&headers).unwrap(), expected);
    }

    #[test]
    fn test_missing_header_is_missing_token() {
        assert!(matches!(
            extract_token(&HeaderMap::new()),
            Err(ApiError::MissingToken)
        ));
    }

    #[test]
    fn test_blank_header_is_missing_token() {
        assert!(matches!(
            extract_token(&headers("   ")),
            Err(ApiError::MissingToken)
        ));
    }

    #[test]
    fn test_extra_segments_are_invalid() {
        assert!(matches!(
            extract_token(&headers("Bearer a b")),
            Err(ApiError::InvalidToken)
        ));
    }
}
