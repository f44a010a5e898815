// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! File record schema.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::SealedPayload;

/// The encrypted content of a file together with everything needed to open it.
///
/// These four fields are produced by one encryption and are only valid as a
/// unit, so they travel as one value and are never updated individually.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SealedContent {
    /// AES-256-GCM ciphertext of the file bytes.
    #[serde(with = "b64")]
    pub ciphertext: Vec<u8>,
    /// Data key wrapped under the key service master key.
    #[serde(with = "b64")]
    pub wrapped_key: Vec<u8>,
    /// 96-bit GCM nonce used for this file.
    #[serde(with = "b64")]
    pub nonce: Vec<u8>,
    /// 128-bit GCM authentication tag.
    #[serde(with = "b64")]
    pub auth_tag: Vec<u8>,
}

impl SealedContent {
    /// Combine a fresh encryption with the wrapped form of the key that produced it.
    pub fn new(payload: SealedPayload, wrapped_key: Vec<u8>) -> Self {
        Self {
            ciphertext: payload.ciphertext,
            wrapped_key,
            nonce: payload.nonce.to_vec(),
            auth_tag: payload.auth_tag.to_vec(),
        }
    }
}

/// One uploaded file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileRecord {
    /// Record identifier (UUID v4).
    pub id: String,
    /// User who uploaded the file.
    pub owner_id: String,
    /// Name, unique within the owner's files.
    pub file_name: String,
    /// MIME type supplied at upload.
    pub file_type: String,
    #[serde(flatten)]
    pub sealed: SealedContent,
    /// Users granted read access, in grant order, without duplicates.
    #[serde(default)]
    pub shared_with: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl FileRecord {
    /// Build a new record with an empty share list.
    pub fn new(
        owner_id: impl Into<String>,
        file_name: impl Into<String>,
        file_type: impl Into<String>,
        sealed: SealedContent,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id: owner_id.into(),
            file_name: file_name.into(),
            file_type: file_type.into(),
            sealed,
            shared_with: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn is_shared_with(&self, user_id: &str) -> bool {
        self.shared_with.iter().any(|id| id == user_id)
    }
}

impl super::OwnedResource for FileRecord {
    fn owner_user_id(&self) -> &str {
        &self.owner_id
    }
}

/// Name/type pair returned by the list queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSummary {
    pub file_name: String,
    pub file_type: String,
    /// Owner of the file; for shared entries this is not the requester.
    pub owner_id: String,
}

impl From<&FileRecord> for FileSummary {
    fn from(record: &FileRecord) -> Self {
        Self {
            file_name: record.file_name.clone(),
            file_type: record.file_type.clone(),
            owner_id: record.owner_id.clone(),
        }
    }
}

/// Base64 (standard alphabet) serde adapter for binary fields.
mod b64 {
    use base64ct::{Base64, Encoding};
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&Base64::encode_string(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        Base64::decode_vec(&encoded).map_err(D::Error::custom)
    }
}
