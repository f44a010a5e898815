// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Key Management
//!
//! Boundary to the key service that owns the master keys.
//!
//! ## Envelope Flow
//!
//! 1. Upload asks the service for a fresh data key under the configured
//!    master key alias and receives it twice: as plaintext (used once to
//!    encrypt the file, then dropped) and wrapped (stored with the record).
//! 2. Decrypt hands the wrapped key back to the service and receives the
//!    plaintext data key again.
//!
//! The server never holds master key material. A copy of the record store
//! (ciphertext + wrapped key) is useless without the key service.
//!
//! ## Implementations
//!
//! - [`HttpKms`]: remote key service over HTTPS
//! - [`LocalKms`]: in-process key service for development and tests

pub mod adapter;
pub mod http;
pub mod local;

pub use adapter::{KeyUnavailable, KeyWrapper};
pub use http::HttpKms;
pub use local::LocalKms;

use async_trait::async_trait;

use crate::crypto::DataKey;

/// Errors reported by a key service.
#[derive(Debug, thiserror::Error)]
pub enum KmsError {
    /// The service could not be reached or answered with a server error.
    #[error("key service unreachable: {0}")]
    Unreachable(String),

    /// The service refused the request (unknown alias, disabled key,
    /// missing permission, or a wrapped key it does not recognise).
    #[error("key service denied the request: {0}")]
    Denied(String),

    /// The service answered with something we cannot use.
    #[error("invalid key service response: {0}")]
    InvalidResponse(String),
}

/// A freshly generated data key in both forms.
#[derive(Debug)]
pub struct GeneratedDataKey {
    /// Plaintext key for immediate local use. Never persisted.
    pub plaintext: DataKey,
    /// Provider-opaque wrapped form, safe to store.
    pub wrapped: Vec<u8>,
}

/// A key service able to mint and unwrap data keys.
///
/// The alias used at generation time is bound into the wrapped blob by the
/// provider, so `decrypt` takes only the blob.
#[async_trait]
pub trait KeyManagementService: Send + Sync {
    /// Generate a new 256-bit data key under the master key `alias`.
    async fn generate_data_key(&self, alias: &str) -> Result<GeneratedDataKey, KmsError>;

    /// Unwrap a blob previously returned by `generate_data_key`.
    async fn decrypt(&self, wrapped: &[u8]) -> Result<DataKey, KmsError>;
}
