// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! ## Auth Flow
//!
//! 1. The client authenticates with the identity provider
//! 2. The client sends `Authorization: Bearer <JWT>`
//! 3. The server:
//!    - Fetches the provider JWKS via HTTPS
//!    - Verifies JWT signature, expiry, issuer, audience
//!    - Extracts `sub` as the canonical `user_id`
//!
//! Share targets are named by email and resolved to user ids through a
//! [`UserDirectory`].
//!
//! ## Security
//!
//! - All file endpoints require authentication
//! - JWKS is cached with TTL
//! - Clock skew tolerance is 60 seconds

pub mod claims;
pub mod directory;
pub mod error;
pub mod extractor;
pub mod jwks;

pub use claims::AuthenticatedUser;
pub use directory::{
    normalize_email, DirectoryError, HttpUserDirectory, StaticUserDirectory, UserDirectory,
};
pub use error::AuthError;
pub use extractor::Auth;
pub use jwks::JwksManager;
