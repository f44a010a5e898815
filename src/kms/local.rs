// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-process key service.
//!
//! Stands in for the external key service in development and tests. Master
//! keys live only in this process; data keys are wrapped with AES-256-GCM
//! under the master key, with the alias bound as associated data.
//!
//! ## Wrapped Key Layout
//!
//! ```text
//! [ version (1) ][ alias_len (1) ][ alias ][ nonce (12) ][ wrapped key + tag (48) ]
//! ```

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM};
use ring::rand::{SecureRandom, SystemRandom};

use super::{GeneratedDataKey, KeyManagementService, KmsError};
use crate::crypto::{CryptoError, DataKey, KEY_LEN, NONCE_LEN};

const BLOB_VERSION: u8 = 1;

struct MasterKey {
    key: DataKey,
    enabled: bool,
}

/// Key service holding named master keys in memory.
#[derive(Default)]
pub struct LocalKms {
    keys: RwLock<HashMap<String, MasterKey>>,
}

impl LocalKms {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a service with a single master key under `alias`.
    pub fn with_master_key(alias: impl Into<String>, key: DataKey) -> Self {
        let kms = Self::new();
        kms.add_master_key(alias, key);
        kms
    }

    /// Create a service with a single freshly generated master key.
    ///
    /// Data wrapped under a random master key is unreadable after restart.
    pub fn with_random_key(alias: impl Into<String>) -> Result<Self, CryptoError> {
        Ok(Self::with_master_key(alias, DataKey::generate()?))
    }

    pub fn add_master_key(&self, alias: impl Into<String>, key: DataKey) {
        let mut keys = self.keys.write().unwrap_or_else(|e| e.into_inner());
        keys.insert(alias.into(), MasterKey { key, enabled: true });
    }

    /// Disable a master key. Later generate/decrypt calls under it are denied.
    pub fn disable(&self, alias: &str) {
        let mut keys = self.keys.write().unwrap_or_else(|e| e.into_inner());
        if let Some(entry) = keys.get_mut(alias) {
            entry.enabled = false;
        }
    }

    fn with_master<T>(
        &self,
        alias: &str,
        f: impl FnOnce(&LessSafeKey) -> Result<T, KmsError>,
    ) -> Result<T, KmsError> {
        let keys = self.keys.read().unwrap_or_else(|e| e.into_inner());
        let entry = keys
            .get(alias)
            .ok_or_else(|| KmsError::Denied(format!("unknown master key {alias}")))?;
        if !entry.enabled {
            return Err(KmsError::Denied(format!("master key {alias} is disabled")));
        }
        let unbound = UnboundKey::new(&AES_256_GCM, entry.key.as_bytes())
            .map_err(|_| KmsError::Unreachable("invalid master key".to_string()))?;
        f(&LessSafeKey::new(unbound))
    }
}

fn random_bytes<const N: usize>() -> Result<[u8; N], KmsError> {
    let mut buf = [0u8; N];
    SystemRandom::new()
        .fill(&mut buf)
        .map_err(|_| KmsError::Unreachable("randomness unavailable".to_string()))?;
    Ok(buf)
}

/// Split a wrapped blob into `(alias, nonce, sealed_key)`.
fn parse_blob(blob: &[u8]) -> Result<(&str, [u8; NONCE_LEN], &[u8]), KmsError> {
    let malformed = || KmsError::Denied("malformed wrapped key".to_string());

    let (&version, rest) = blob.split_first().ok_or_else(malformed)?;
    if version != BLOB_VERSION {
        return Err(malformed());
    }
    let (&alias_len, rest) = rest.split_first().ok_or_else(malformed)?;
    let alias_len = alias_len as usize;
    if rest.len() < alias_len + NONCE_LEN {
        return Err(malformed());
    }
    let (alias, rest) = rest.split_at(alias_len);
    let alias = std::str::from_utf8(alias).map_err(|_| malformed())?;
    let (nonce, sealed) = rest.split_at(NONCE_LEN);
    let nonce: [u8; NONCE_LEN] = nonce.try_into().map_err(|_| malformed())?;
    Ok((alias, nonce, sealed))
}

#[async_trait]
impl KeyManagementService for LocalKms {
    async fn generate_data_key(&self, alias: &str) -> Result<GeneratedDataKey, KmsError> {
        let alias_len = u8::try_from(alias.len())
            .map_err(|_| KmsError::Denied("alias too long".to_string()))?;

        let plaintext = DataKey::generate()
            .map_err(|_| KmsError::Unreachable("randomness unavailable".to_string()))?;
        let nonce = random_bytes::<NONCE_LEN>()?;

        let mut sealed = plaintext.as_bytes().to_vec();
        self.with_master(alias, |master| {
            master
                .seal_in_place_append_tag(
                    Nonce::assume_unique_for_key(nonce),
                    Aad::from(alias.as_bytes()),
                    &mut sealed,
                )
                .map_err(|_| KmsError::Unreachable("wrap failed".to_string()))
        })?;

        let mut wrapped = Vec::with_capacity(2 + alias.len() + NONCE_LEN + sealed.len());
        wrapped.push(BLOB_VERSION);
        wrapped.push(alias_len);
        wrapped.extend_from_slice(alias.as_bytes());
        wrapped.extend_from_slice(&nonce);
        wrapped.extend_from_slice(&sealed);

        Ok(GeneratedDataKey { plaintext, wrapped })
    }

    async fn decrypt(&self, wrapped: &[u8]) -> Result<DataKey, KmsError> {
        let (alias, nonce, sealed) = parse_blob(wrapped)?;
        let mut buf = sealed.to_vec();

        let key = self.with_master(alias, |master| {
            let opened = master
                .open_in_place(
                    Nonce::assume_unique_for_key(nonce),
                    Aad::from(alias.as_bytes()),
                    &mut buf,
                )
                .map_err(|_| KmsError::Denied("wrapped key failed authentication".to_string()))?;
            DataKey::from_slice(opened)
                .map_err(|_| KmsError::InvalidResponse(format!("expected {KEY_LEN}-byte key")))
        });

        zeroize::Zeroize::zeroize(&mut buf);
        key
    }
}
