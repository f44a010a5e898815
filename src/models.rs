// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response bodies for the file endpoints. All types derive
//! `ToSchema` for the OpenAPI document.
//!
//! Request fields also accept the camelCase names used by older clients
//! (`fileName`, `filePath`).

use base64ct::{Base64, Encoding};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::service::{DecryptedFile, FileListing};
use crate::storage::ShareOutcome;

/// MIME type used when an upload does not name one.
pub const DEFAULT_FILE_TYPE: &str = "application/octet-stream";

// =============================================================================
// Upload
// =============================================================================

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UploadFileRequest {
    /// Name the file is stored under, unique among the caller's files.
    #[serde(alias = "fileName")]
    pub file_name: String,
    /// File contents as base64, or a `data:<mime>;base64,<payload>` URL.
    pub file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UploadFileResponse {
    pub message: String,
    pub file_name: String,
    pub file_type: String,
}

/// Bytes and MIME type decoded from an upload's `file` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFile {
    pub file_type: String,
    pub contents: Vec<u8>,
}

/// Decode an upload payload.
///
/// Accepts plain base64 or a data URL. Only base64 data URLs are supported;
/// the MIME type of a data URL becomes the file type.
pub fn decode_file_payload(file: &str) -> Result<DecodedFile, String> {
    let file = file.trim();

    let (file_type, encoded) = match file.strip_prefix("data:") {
        Some(rest) => {
            let (meta, payload) = rest
                .split_once(',')
                .ok_or_else(|| "data URL is missing ','".to_string())?;
            let mime = meta
                .strip_suffix(";base64")
                .ok_or_else(|| "only base64 data URLs are supported".to_string())?;
            let mime = mime.split(';').next().unwrap_or_default().trim();
            let file_type = if mime.is_empty() {
                DEFAULT_FILE_TYPE.to_string()
            } else {
                mime.to_ascii_lowercase()
            };
            (file_type, payload)
        }
        None => (DEFAULT_FILE_TYPE.to_string(), file),
    };

    let contents =
        Base64::decode_vec(encoded).map_err(|_| "file is not valid base64".to_string())?;
    Ok(DecodedFile {
        file_type,
        contents,
    })
}

// =============================================================================
// Decrypt
// =============================================================================

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct DecryptFileRequest {
    /// Name of a file the caller owns or has been granted.
    #[serde(alias = "fileName", alias = "filePath")]
    pub file_name: String,
    /// Owner of a shared file, as listed by `GET /v1/files/shared`. Picks
    /// between same-named files shared by different users.
    #[serde(default, alias = "ownerId")]
    pub owner_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DecryptFileResponse {
    pub message: String,
    pub file_name: String,
    pub file_type: String,
    /// Decrypted contents, base64.
    pub file: String,
}

impl From<DecryptedFile> for DecryptFileResponse {
    fn from(file: DecryptedFile) -> Self {
        Self {
            message: "File decrypted successfully".to_string(),
            file: Base64::encode_string(&file.contents),
            file_name: file.file_name,
            file_type: file.file_type,
        }
    }
}

// =============================================================================
// Share
// =============================================================================

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ShareFileRequest {
    #[serde(alias = "fileName")]
    pub file_name: String,
    /// Email address of the user to share with.
    pub email: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ShareResult {
    /// The grantee was added.
    Shared,
    /// The grantee already had access; nothing changed.
    AlreadyShared,
}

impl From<ShareOutcome> for ShareResult {
    fn from(outcome: ShareOutcome) -> Self {
        match outcome {
            ShareOutcome::Added => ShareResult::Shared,
            ShareOutcome::AlreadyShared => ShareResult::AlreadyShared,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ShareFileResponse {
    pub message: String,
    pub file_name: String,
    pub outcome: ShareResult,
}

impl ShareFileResponse {
    pub fn new(file_name: String, outcome: ShareOutcome) -> Self {
        let message = match outcome {
            ShareOutcome::Added => "File shared successfully",
            ShareOutcome::AlreadyShared => "File already shared with this user",
        };
        Self {
            message: message.to_string(),
            file_name,
            outcome: outcome.into(),
        }
    }
}

// =============================================================================
// Listing
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct FileEntry {
    pub file_name: String,
    /// Name for display; shared files end in ` (shared)`.
    pub display_name: String,
    pub file_type: String,
    /// User who uploaded the file.
    pub owner_id: String,
    pub shared: bool,
}

impl From<FileListing> for FileEntry {
    fn from(listing: FileListing) -> Self {
        Self {
            file_name: listing.file_name,
            display_name: listing.display_name,
            file_type: listing.file_type,
            owner_id: listing.owner_id,
            shared: listing.shared,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ListFilesResponse {
    pub files: Vec<FileEntry>,
}

impl FromIterator<FileListing> for ListFilesResponse {
    fn from_iter<I: IntoIterator<Item = FileListing>>(iter: I) -> Self {
        Self {
            files: iter.into_iter().map(FileEntry::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_base64_defaults_to_octet_stream() {
        let decoded = decode_file_payload("aGVsbG8=").unwrap();
        assert_eq!(decoded.contents, b"hello");
        assert_eq!(decoded.file_type, DEFAULT_FILE_TYPE);
    }

    #[test]
    fn data_url_supplies_mime_type() {
        let decoded = decode_file_payload("data:text/plain;base64,aGVsbG8=").unwrap();
        assert_eq!(decoded.contents, b"hello");
        assert_eq!(decoded.file_type, "text/plain");

        let with_params =
            decode_file_payload("data:Text/Plain;charset=utf-8;base64,aGVsbG8=").unwrap();
        assert_eq!(with_params.file_type, "text/plain");

        let no_mime = decode_file_payload("data:;base64,aGVsbG8=").unwrap();
        assert_eq!(no_mime.file_type, DEFAULT_FILE_TYPE);
    }

    #[test]
    fn bad_payloads_are_rejected() {
        assert!(decode_file_payload("not base64!").is_err());
        assert!(decode_file_payload("data:text/plain,hello").is_err());
        assert!(decode_file_payload("data:text/plain;base64").is_err());
    }

    #[test]
    fn requests_accept_legacy_field_names() {
        let upload: UploadFileRequest =
            serde_json::from_str(r#"{"fileName":"a.txt","file":"aGk="}"#).unwrap();
        assert_eq!(upload.file_name, "a.txt");

        let decrypt: DecryptFileRequest =
            serde_json::from_str(r#"{"filePath":"a.txt"}"#).unwrap();
        assert_eq!(decrypt.file_name, "a.txt");
        assert!(decrypt.owner_id.is_none());

        let scoped: DecryptFileRequest =
            serde_json::from_str(r#"{"fileName":"a.txt","ownerId":"user_z"}"#).unwrap();
        assert_eq!(scoped.owner_id.as_deref(), Some("user_z"));

        let share: ShareFileRequest =
            serde_json::from_str(r#"{"fileName":"a.txt","email":"b@example.com"}"#).unwrap();
        assert_eq!(share.file_name, "a.txt");
    }

    #[test]
    fn share_outcome_serializes_snake_case() {
        let response =
            ShareFileResponse::new("a.txt".to_string(), ShareOutcome::AlreadyShared);
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["outcome"], "already_shared");
    }

    #[test]
    fn decrypt_response_is_base64() {
        let response = DecryptFileResponse::from(DecryptedFile {
            file_name: "a.txt".to_string(),
            file_type: "text/plain".to_string(),
            contents: b"hello".to_vec(),
        });
        assert_eq!(response.file, "aGVsbG8=");
    }
}
