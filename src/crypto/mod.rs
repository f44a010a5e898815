// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Envelope Crypto Engine
//!
//! Per-file authenticated encryption with a one-time data key.
//!
//! ## Primitives
//!
//! - **Cipher**: AES-256-GCM (`ring::aead`)
//! - **Nonce**: 96-bit, drawn from `SystemRandom` for every encryption
//! - **Tag**: 128-bit, stored detached from the ciphertext
//! - **Key**: 256-bit [`DataKey`], zeroised on drop
//!
//! This module and `kms::local` are the only places that touch `ring::aead`.
//! The data key exists only in memory for the duration of one call; nothing
//! in here logs, stores or returns it.

pub mod envelope;

pub use envelope::{decrypt, encrypt, SealedPayload};

use zeroize::Zeroize;

/// Size of a data key in bytes (256 bits).
pub const KEY_LEN: usize = 32;

/// Size of the GCM nonce in bytes (96 bits).
pub const NONCE_LEN: usize = 12;

/// Size of the GCM authentication tag in bytes (128 bits).
pub const TAG_LEN: usize = 16;

/// Errors raised by the envelope crypto engine.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CryptoError {
    #[error("data key must be {expected} bytes, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("system randomness unavailable")]
    Randomness,

    #[error("encryption failed")]
    Encryption,

    /// Tag verification failed: the ciphertext, nonce or tag was altered, or
    /// the wrong key was supplied. No plaintext is released.
    #[error("authentication tag mismatch, content may have been tampered with")]
    Integrity,
}

/// A plaintext 256-bit data key.
///
/// Not `Clone`; the bytes are overwritten when the key is dropped and the
/// `Debug` output never includes them.
pub struct DataKey {
    bytes: [u8; KEY_LEN],
}

impl DataKey {
    /// Build a key from raw bytes, rejecting anything that is not 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let bytes: [u8; KEY_LEN] = bytes.try_into().map_err(|_| CryptoError::InvalidKeyLength {
            expected: KEY_LEN,
            actual: bytes.len(),
        })?;
        Ok(Self { bytes })
    }

    /// Generate a fresh random key.
    pub fn generate() -> Result<Self, CryptoError> {
        let rng = ring::rand::SystemRandom::new();
        let mut bytes = [0u8; KEY_LEN];
        ring::rand::SecureRandom::fill(&rng, &mut bytes).map_err(|_| CryptoError::Randomness)?;
        Ok(Self { bytes })
    }

    pub(crate) fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }
}

impl Drop for DataKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for DataKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DataKey([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_key_rejects_wrong_length() {
        let err = DataKey::from_slice(&[0u8; 16]).unwrap_err();
        assert_eq!(
            err,
            CryptoError::InvalidKeyLength {
                expected: 32,
                actual: 16
            }
        );
    }

    #[test]
    fn data_key_debug_is_redacted() {
        let key = DataKey::from_slice(&[0xAB; KEY_LEN]).unwrap();
        let printed = format!("{key:?}");
        assert!(!printed.contains("171"));
        assert!(printed.contains("REDACTED"));
    }

    #[test]
    fn generated_keys_differ() {
        let a = DataKey::generate().unwrap();
        let b = DataKey::generate().unwrap();
        assert_ne!(a.as_bytes(), b.as_bytes());
    }
}
