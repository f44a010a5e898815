// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractor for authenticated users.
//!
//! ```rust,ignore
//! async fn my_handler(Auth(user): Auth) -> impl IntoResponse {
//!     // user is AuthenticatedUser
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use jsonwebtoken::{decode, decode_header, Validation};

use super::claims::TokenClaims;
use super::{AuthenticatedUser, AuthError, JwksManager};
use crate::state::{AppState, AuthConfig};

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

/// Longest accepted user id.
const MAX_USER_ID_LEN: usize = 255;

/// Extractor for authenticated users.
///
/// ## Authentication Modes
///
/// - **Production mode** (`AUTH_JWKS_URL` set): full JWT verification against the JWKS
/// - **Development mode** (no JWKS): structure and expiry only, no signature check
pub struct Auth(pub AuthenticatedUser);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(AuthError::MissingAuthHeader)?
            .to_str()
            .map_err(|_| AuthError::InvalidAuthHeader)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::InvalidAuthHeader)?;

        let user = verify_jwt(token, &state.auth_config).await?;
        Ok(Auth(user))
    }
}

/// Verify a bearer token and extract the user.
pub async fn verify_jwt(token: &str, auth_config: &AuthConfig) -> Result<AuthenticatedUser, AuthError> {
    let claims = match auth_config.jwks {
        Some(ref jwks) => verify_jwt_production(token, jwks, auth_config).await?,
        None => verify_jwt_development(token)?,
    };

    // User ids are used as storage index keys; reject anything that could
    // collide with the key separators.
    if claims.sub.is_empty()
        || claims.sub.len() > MAX_USER_ID_LEN
        || claims.sub.chars().any(char::is_control)
    {
        return Err(AuthError::MalformedToken);
    }

    Ok(AuthenticatedUser::from_claims(claims))
}

async fn verify_jwt_production(
    token: &str,
    jwks: &JwksManager,
    auth_config: &AuthConfig,
) -> Result<TokenClaims, AuthError> {
    let header = decode_header(token).map_err(|_| AuthError::MalformedToken)?;

    let (decoding_key, algorithm) = match &header.kid {
        Some(kid) => jwks.get_decoding_key(kid).await?,
        None => jwks.get_any_decoding_key().await?,
    };

    let mut validation = Validation::new(algorithm);
    validation.leeway = CLOCK_SKEW_LEEWAY;
    if let Some(ref issuer) = auth_config.issuer {
        validation.set_issuer(&[issuer]);
    }
    match auth_config.audience {
        Some(ref audience) => validation.set_audience(&[audience]),
        None => validation.validate_aud = false,
    }

    let token_data = decode::<TokenClaims>(token, &decoding_key, &validation).map_err(|e| {
        match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            jsonwebtoken::errors::ErrorKind::InvalidSignature => AuthError::InvalidSignature,
            jsonwebtoken::errors::ErrorKind::InvalidIssuer => AuthError::InvalidIssuer,
            jsonwebtoken::errors::ErrorKind::InvalidAudience => AuthError::InvalidAudience,
            jsonwebtoken::errors::ErrorKind::ImmatureSignature => AuthError::TokenNotYetValid,
            _ => AuthError::MalformedToken,
        }
    })?;

    Ok(token_data.claims)
}

/// Development verification (no signature check).
///
/// WARNING: only reachable when no JWKS URL is configured.
fn verify_jwt_development(token: &str) -> Result<TokenClaims, AuthError> {
    let token_data = jsonwebtoken::dangerous::insecure_decode::<TokenClaims>(token)
        .map_err(|_| AuthError::MalformedToken)?;
    let claims = token_data.claims;

    let now = chrono::Utc::now().timestamp();
    if claims.exp > 0 && claims.exp < now - CLOCK_SKEW_LEEWAY as i64 {
        return Err(AuthError::TokenExpired);
    }

    Ok(claims)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use axum::http::Request;

    /// Unsigned test JWT; accepted only in development mode.
    pub(crate) fn create_test_jwt(user_id: &str) -> String {
        create_test_jwt_with_exp(user_id, 9_999_999_999)
    }

    fn create_test_jwt_with_exp(user_id: &str, exp: i64) -> String {
        use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

        let header = r#"{"alg":"RS256","typ":"JWT"}"#;
        let claims = serde_json::json!({
            "sub": user_id,
            "iat": 1609459200,
            "exp": exp,
            "iss": "test",
        })
        .to_string();

        format!(
            "{}.{}.fake_signature",
            URL_SAFE_NO_PAD.encode(header.as_bytes()),
            URL_SAFE_NO_PAD.encode(claims.as_bytes())
        )
    }

    fn parts_with(auth: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/test");
        if let Some(value) = auth {
            builder = builder.header("Authorization", value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn auth_extractor_requires_auth_header() {
        let state = AppState::for_tests();
        let mut parts = parts_with(None);
        let result = Auth::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::MissingAuthHeader)));
    }

    #[tokio::test]
    async fn auth_extractor_rejects_non_bearer() {
        let state = AppState::for_tests();
        let mut parts = parts_with(Some("Basic dXNlcjpwYXNz"));
        let result = Auth::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::InvalidAuthHeader)));
    }

    #[tokio::test]
    async fn auth_extractor_succeeds_with_jwt() {
        let state = AppState::for_tests();
        let token = create_test_jwt("user_123");
        let mut parts = parts_with(Some(&format!("Bearer {token}")));
        let Auth(user) = Auth::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(user.user_id, "user_123");
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let state = AppState::for_tests();
        let token = create_test_jwt_with_exp("user_123", 1_000);
        let mut parts = parts_with(Some(&format!("Bearer {token}")));
        let result = Auth::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::TokenExpired)));
    }

    #[tokio::test]
    async fn garbage_token_is_malformed() {
        let state = AppState::for_tests();
        let mut parts = parts_with(Some("Bearer not-a-jwt"));
        let result = Auth::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::MalformedToken)));
    }

    #[tokio::test]
    async fn control_characters_in_subject_are_rejected() {
        let state = AppState::for_tests();
        let token = create_test_jwt("user\u{0}admin");
        let mut parts = parts_with(Some(&format!("Bearer {token}")));
        let result = Auth::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::MalformedToken)));
    }

    #[tokio::test]
    async fn only_the_bearer_token_authenticates() {
        let state = AppState::for_tests();
        let mut parts = parts_with(None);
        parts.extensions.insert(AuthenticatedUser {
            user_id: "user_injected".to_string(),
        });

        let result = Auth::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::MissingAuthHeader)));
    }
}
