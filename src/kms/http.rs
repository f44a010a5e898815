// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Remote key service client over HTTPS.
//!
//! ## Endpoints
//!
//! - `POST {base}/v1/keys/{alias}/data-key` → `{ plaintext, ciphertext_blob }`
//! - `POST {base}/v1/decrypt` with `{ ciphertext_blob }` → `{ plaintext }`
//!
//! All binary fields are standard base64. Requests carry
//! `Authorization: Bearer <token>` when a token is configured.

use std::time::Duration;

use async_trait::async_trait;
use base64ct::{Base64, Encoding};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use url::Url;
use zeroize::Zeroize;

use super::{GeneratedDataKey, KeyManagementService, KmsError};
use crate::crypto::DataKey;

/// Transport-level timeout. The adapter applies its own, usually tighter, bound.
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Deserialize)]
struct DataKeyResponse {
    plaintext: String,
    ciphertext_blob: String,
}

#[derive(Serialize)]
struct DecryptRequest<'a> {
    ciphertext_blob: &'a str,
}

#[derive(Deserialize)]
struct DecryptResponse {
    plaintext: String,
}

/// HTTP client for a remote key service.
#[derive(Clone)]
pub struct HttpKms {
    base_url: Url,
    api_token: Option<String>,
    client: reqwest::Client,
}

impl HttpKms {
    pub fn new(base_url: Url, api_token: Option<String>) -> Result<Self, KmsError> {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| KmsError::Unreachable(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            base_url,
            api_token,
            client,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, KmsError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| KmsError::Unreachable("key service URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn post<B: Serialize + ?Sized, R: for<'de> Deserialize<'de>>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<R, KmsError> {
        let mut request = self.client.post(url).json(body);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| KmsError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status));
        }

        response
            .json::<R>()
            .await
            .map_err(|e| KmsError::InvalidResponse(e.to_string()))
    }
}

fn status_error(status: StatusCode) -> KmsError {
    match status {
        StatusCode::BAD_REQUEST
        | StatusCode::UNAUTHORIZED
        | StatusCode::FORBIDDEN
        | StatusCode::NOT_FOUND
        | StatusCode::CONFLICT => KmsError::Denied(format!("HTTP {status}")),
        _ => KmsError::Unreachable(format!("HTTP {status}")),
    }
}

fn decode_key(encoded: &str) -> Result<DataKey, KmsError> {
    let mut bytes = Base64::decode_vec(encoded)
        .map_err(|_| KmsError::InvalidResponse("plaintext is not base64".to_string()))?;
    let key = DataKey::from_slice(&bytes).map_err(|e| KmsError::InvalidResponse(e.to_string()));
    bytes.zeroize();
    key
}

#[async_trait]
impl KeyManagementService for HttpKms {
    async fn generate_data_key(&self, alias: &str) -> Result<GeneratedDataKey, KmsError> {
        let url = self.endpoint(&["v1", "keys", alias, "data-key"])?;
        let mut response: DataKeyResponse = self.post(url, &serde_json::json!({})).await?;

        let plaintext = decode_key(&response.plaintext);
        response.plaintext.zeroize();

        let wrapped = Base64::decode_vec(&response.ciphertext_blob)
            .map_err(|_| KmsError::InvalidResponse("ciphertext_blob is not base64".to_string()))?;

        Ok(GeneratedDataKey {
            plaintext: plaintext?,
            wrapped,
        })
    }

    async fn decrypt(&self, wrapped: &[u8]) -> Result<DataKey, KmsError> {
        let url = self.endpoint(&["v1", "decrypt"])?;
        let blob = Base64::encode_string(wrapped);
        let mut response: DecryptResponse = self
            .post(url, &DecryptRequest {
                ciphertext_blob: &blob,
            })
            .await?;

        let key = decode_key(&response.plaintext);
        response.plaintext.zeroize();
        key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kms(base: &str) -> HttpKms {
        HttpKms::new(Url::parse(base).unwrap(), None).unwrap()
    }

    #[test]
    fn endpoint_escapes_alias_slashes() {
        let url = kms("https://kms.example.com/")
            .endpoint(&["v1", "keys", "alias/files", "data-key"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://kms.example.com/v1/keys/alias%2Ffiles/data-key"
        );
    }

    #[test]
    fn endpoint_keeps_base_path() {
        let url = kms("https://example.com/kms").endpoint(&["v1", "decrypt"]).unwrap();
        assert_eq!(url.as_str(), "https://example.com/kms/v1/decrypt");
    }

    #[test]
    fn client_errors_are_denials() {
        assert!(matches!(status_error(StatusCode::FORBIDDEN), KmsError::Denied(_)));
        assert!(matches!(status_error(StatusCode::NOT_FOUND), KmsError::Denied(_)));
        assert!(matches!(
            status_error(StatusCode::SERVICE_UNAVAILABLE),
            KmsError::Unreachable(_)
        ));
    }

    #[test]
    fn decode_key_validates_length() {
        assert!(decode_key(&Base64::encode_string(&[1u8; 32])).is_ok());
        assert!(matches!(
            decode_key(&Base64::encode_string(&[1u8; 16])),
            Err(KmsError::InvalidResponse(_))
        ));
        assert!(matches!(decode_key("%%%"), Err(KmsError::InvalidResponse(_))));
    }
}
