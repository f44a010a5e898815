// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Key wrapping adapter: bounded, logged calls into a [`KeyManagementService`].

use std::sync::Arc;
use std::time::Duration;

use super::{GeneratedDataKey, KeyManagementService, KmsError};
use crate::crypto::DataKey;

/// Default bound on a single key service call.
pub const DEFAULT_KMS_TIMEOUT: Duration = Duration::from_secs(5);

/// The key service could not produce a key for the in-flight operation.
///
/// Callers may retry with backoff; the adapter itself never retries and
/// never falls back to local decryption.
#[derive(Debug, thiserror::Error)]
pub enum KeyUnavailable {
    #[error("key service call timed out after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Service(#[from] KmsError),
}

/// Adapter between the file service and the external key service.
///
/// Holds no key material of its own, only the handle, the master key alias
/// new files are wrapped under, and the call timeout.
#[derive(Clone)]
pub struct KeyWrapper {
    kms: Arc<dyn KeyManagementService>,
    alias: String,
    timeout: Duration,
}

impl KeyWrapper {
    pub fn new(kms: Arc<dyn KeyManagementService>, alias: impl Into<String>) -> Self {
        Self {
            kms,
            alias: alias.into(),
            timeout: DEFAULT_KMS_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The master key alias new data keys are generated under.
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Request a new data key (plaintext + wrapped) under the configured alias.
    pub async fn generate_data_key(&self) -> Result<GeneratedDataKey, KeyUnavailable> {
        let result = tokio::time::timeout(self.timeout, self.kms.generate_data_key(&self.alias))
            .await
            .map_err(|_| KeyUnavailable::Timeout(self.timeout))
            .and_then(|r| r.map_err(KeyUnavailable::from));

        match result {
            Ok(key) if key.wrapped.is_empty() => {
                tracing::error!(alias = %self.alias, "Key service returned an empty wrapped key");
                Err(KmsError::InvalidResponse("empty wrapped key".to_string()).into())
            }
            Ok(key) => Ok(key),
            Err(e) => {
                tracing::error!(alias = %self.alias, error = %e, "Data key generation failed");
                Err(e)
            }
        }
    }

    /// Unwrap a stored data key.
    pub async fn unwrap(&self, wrapped: &[u8]) -> Result<DataKey, KeyUnavailable> {
        let result = tokio::time::timeout(self.timeout, self.kms.decrypt(wrapped))
            .await
            .map_err(|_| KeyUnavailable::Timeout(self.timeout))
            .and_then(|r| r.map_err(KeyUnavailable::from));

        result.inspect_err(|e| {
            tracing::error!(
                wrapped_len = wrapped.len(),
                error = %e,
                "Data key unwrap failed"
            );
        })
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::kms::LocalKms;

    struct HangingKms;

    #[async_trait]
    impl KeyManagementService for HangingKms {
        async fn generate_data_key(&self, _alias: &str) -> Result<GeneratedDataKey, KmsError> {
            std::future::pending().await
        }

        async fn decrypt(&self, _wrapped: &[u8]) -> Result<DataKey, KmsError> {
            std::future::pending().await
        }
    }

    struct EmptyBlobKms;

    #[async_trait]
    impl KeyManagementService for EmptyBlobKms {
        async fn generate_data_key(&self, _alias: &str) -> Result<GeneratedDataKey, KmsError> {
            Ok(GeneratedDataKey {
                plaintext: DataKey::from_slice(&[1u8; 32]).unwrap(),
                wrapped: Vec::new(),
            })
        }

        async fn decrypt(&self, _wrapped: &[u8]) -> Result<DataKey, KmsError> {
            Err(KmsError::Denied("no".to_string()))
        }
    }

    #[tokio::test]
    async fn generate_and_unwrap_through_local_kms() {
        let wrapper = KeyWrapper::new(Arc::new(LocalKms::with_random_key("alias/test").unwrap()), "alias/test");
        let generated = wrapper.generate_data_key().await.unwrap();
        let unwrapped = wrapper.unwrap(&generated.wrapped).await.unwrap();
        assert_eq!(unwrapped.as_bytes(), generated.plaintext.as_bytes());
    }

    #[tokio::test]
    async fn hanging_service_times_out() {
        let wrapper = KeyWrapper::new(Arc::new(HangingKms), "alias/test")
            .with_timeout(Duration::from_millis(20));

        let gen_err = wrapper.generate_data_key().await.unwrap_err();
        assert!(matches!(gen_err, KeyUnavailable::Timeout(_)));

        let unwrap_err = wrapper.unwrap(b"blob").await.unwrap_err();
        assert!(matches!(unwrap_err, KeyUnavailable::Timeout(_)));
    }

    #[tokio::test]
    async fn empty_wrapped_key_is_rejected() {
        let wrapper = KeyWrapper::new(Arc::new(EmptyBlobKms), "alias/test");
        let err = wrapper.generate_data_key().await.unwrap_err();
        assert!(matches!(
            err,
            KeyUnavailable::Service(KmsError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn denied_unwrap_maps_to_key_unavailable() {
        let wrapper = KeyWrapper::new(Arc::new(EmptyBlobKms), "alias/test");
        let err = wrapper.unwrap(b"anything").await.unwrap_err();
        assert!(matches!(err, KeyUnavailable::Service(KmsError::Denied(_))));
    }
}
