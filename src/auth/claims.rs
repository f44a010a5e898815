// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWT claims and authenticated user representation.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Claims read from an identity provider token. Issuer and audience are
/// checked by `jsonwebtoken` against the raw claims and are not kept here.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenClaims {
    /// Subject: the canonical user id
    pub sub: String,

    /// Expiration timestamp; 0 when absent
    #[serde(default)]
    pub exp: i64,
}

/// The verified caller of a request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct AuthenticatedUser {
    /// Canonical user ID (`sub` claim)
    pub user_id: String,
}

impl AuthenticatedUser {
    pub fn from_claims(claims: TokenClaims) -> Self {
        Self {
            user_id: claims.sub,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_claims_extracts_subject() {
        let claims: TokenClaims = serde_json::from_value(serde_json::json!({
            "sub": "user_123",
            "exp": 1700003600,
            "iss": "https://id.example.com",
            "aud": ["files"],
            "email": "a@example.com"
        }))
        .unwrap();
        assert_eq!(claims.exp, 1700003600);
        let user = AuthenticatedUser::from_claims(claims);
        assert_eq!(user.user_id, "user_123");
    }

    #[test]
    fn missing_exp_defaults_to_zero() {
        let claims: TokenClaims =
            serde_json::from_value(serde_json::json!({ "sub": "user_1" })).unwrap();
        assert_eq!(claims.exp, 0);
    }
}
