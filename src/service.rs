// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! File operations: upload, decrypt, share and the two listings.
//!
//! Each operation validates its input, consults the [`AccessResolver`] where
//! access matters, and only then touches the key service or the cipher.

use std::sync::Arc;

use crate::auth::{normalize_email, DirectoryError, UserDirectory};
use crate::crypto::{self, CryptoError};
use crate::kms::{KeyUnavailable, KeyWrapper};
use crate::storage::{
    AccessResolver, FileRecord, FileRecordStore, FileSummary, SealedContent, ShareDenied,
    ShareOutcome, StoreError,
};

/// Largest accepted file, after base64 decoding.
pub const MAX_FILE_BYTES: usize = 7 * 1024 * 1024;

/// Longest accepted file name, in bytes.
pub const MAX_FILE_NAME_LEN: usize = 255;

/// Longest accepted email address, in bytes.
pub const MAX_EMAIL_LEN: usize = 254;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("you do not have access to this file")]
    Forbidden,

    #[error("file not found")]
    NotFound,

    #[error("no user with that email address")]
    UserNotFound,

    #[error("a file with this name already exists")]
    AlreadyExists,

    #[error("encryption key unavailable: {0}")]
    KeyUnavailable(#[from] KeyUnavailable),

    #[error("file failed integrity verification")]
    Integrity,

    #[error("user directory unavailable: {0}")]
    DirectoryUnavailable(String),

    #[error("storage error: {0}")]
    Storage(StoreError),

    #[error("crypto error: {0}")]
    Crypto(CryptoError),
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::AlreadyExists(_) => ServiceError::AlreadyExists,
            StoreError::NotFound(_) => ServiceError::NotFound,
            other => ServiceError::Storage(other),
        }
    }
}

impl From<CryptoError> for ServiceError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::Integrity => ServiceError::Integrity,
            other => ServiceError::Crypto(other),
        }
    }
}

impl From<DirectoryError> for ServiceError {
    fn from(e: DirectoryError) -> Self {
        match e {
            DirectoryError::UserNotFound => ServiceError::UserNotFound,
            DirectoryError::Unavailable(msg) => ServiceError::DirectoryUnavailable(msg),
        }
    }
}

/// Plaintext returned by [`FileService::decrypt`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptedFile {
    pub file_name: String,
    pub file_type: String,
    pub contents: Vec<u8>,
}

/// One entry of a file listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileListing {
    pub file_name: String,
    /// Name as shown to the user; shared entries carry a ` (shared)` suffix.
    pub display_name: String,
    pub file_type: String,
    /// Uploader; tells apart same-named files shared by different owners.
    pub owner_id: String,
    pub shared: bool,
}

impl FileListing {
    fn owned(summary: FileSummary) -> Self {
        Self {
            display_name: summary.file_name.clone(),
            file_name: summary.file_name,
            file_type: summary.file_type,
            owner_id: summary.owner_id,
            shared: false,
        }
    }

    fn shared(summary: FileSummary) -> Self {
        Self {
            display_name: format!("{} (shared)", summary.file_name),
            file_name: summary.file_name,
            file_type: summary.file_type,
            owner_id: summary.owner_id,
            shared: true,
        }
    }
}

// =============================================================================
// Validation
// =============================================================================

pub fn validate_file_name(file_name: &str) -> Result<(), ServiceError> {
    if file_name.is_empty() {
        return Err(ServiceError::InvalidRequest("file_name is required".to_string()));
    }
    if file_name.len() > MAX_FILE_NAME_LEN {
        return Err(ServiceError::InvalidRequest(format!(
            "file_name must be at most {MAX_FILE_NAME_LEN} bytes"
        )));
    }
    if file_name.chars().any(char::is_control) {
        return Err(ServiceError::InvalidRequest(
            "file_name must not contain control characters".to_string(),
        ));
    }
    if file_name == "." || file_name == ".." {
        return Err(ServiceError::InvalidRequest("file_name is not a valid name".to_string()));
    }
    Ok(())
}

pub fn validate_contents(contents: &[u8]) -> Result<(), ServiceError> {
    if contents.len() > MAX_FILE_BYTES {
        return Err(ServiceError::InvalidRequest(format!(
            "file must be at most {MAX_FILE_BYTES} bytes"
        )));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), ServiceError> {
    let invalid = || ServiceError::InvalidRequest("email is not a valid address".to_string());
    let email = email.trim();
    if email.len() > MAX_EMAIL_LEN || email.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(invalid());
    }
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => {
            Ok(())
        }
        _ => Err(invalid()),
    }
}

// =============================================================================
// Service
// =============================================================================

/// Orchestrates the record store, the key service and the user directory.
#[derive(Clone)]
pub struct FileService {
    store: Arc<dyn FileRecordStore>,
    keys: KeyWrapper,
    directory: Arc<dyn UserDirectory>,
}

impl FileService {
    pub fn new(
        store: Arc<dyn FileRecordStore>,
        keys: KeyWrapper,
        directory: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            store,
            keys,
            directory,
        }
    }

    fn resolver(&self) -> AccessResolver<'_> {
        AccessResolver::new(self.store.as_ref())
    }

    /// Encrypt `contents` under a fresh data key and store it as `file_name`.
    ///
    /// The record is written only after key generation and encryption both
    /// succeed, so a failure leaves nothing behind.
    pub async fn upload(
        &self,
        owner_id: &str,
        file_name: &str,
        file_type: &str,
        contents: &[u8],
    ) -> Result<FileRecord, ServiceError> {
        validate_file_name(file_name)?;
        validate_contents(contents)?;

        if self.store.find_owned(owner_id, file_name)?.is_some() {
            return Err(ServiceError::AlreadyExists);
        }

        let data_key = self.keys.generate_data_key().await?;
        let payload = crypto::encrypt(contents, &data_key.plaintext).inspect_err(|e| {
            tracing::error!(error = %e, "File encryption failed");
        })?;
        drop(data_key.plaintext);

        let record = FileRecord::new(
            owner_id,
            file_name,
            file_type,
            SealedContent::new(payload, data_key.wrapped),
        );
        let record_id = self.store.create(&record)?;

        tracing::info!(
            record_id = %record_id,
            owner_id = %owner_id,
            size = contents.len(),
            "File uploaded"
        );
        Ok(record)
    }

    /// Decrypt a file the requester owns or has been granted.
    ///
    /// With `owner_id` the file is addressed as `(owner_id, file_name)` and
    /// the requester must be that owner or a grantee. Without it the
    /// requester's own file wins, then the first file shared under that name.
    pub async fn decrypt(
        &self,
        requester_id: &str,
        file_name: &str,
        owner_id: Option<&str>,
    ) -> Result<DecryptedFile, ServiceError> {
        validate_file_name(file_name)?;

        let resolver = self.resolver();
        let access = match owner_id {
            Some(owner_id) => resolver.resolve_from(requester_id, owner_id, file_name)?,
            None => resolver.resolve(requester_id, file_name)?,
        };
        let level = access.level();
        let record = access.into_readable().ok_or(ServiceError::Forbidden)?;

        let data_key = self.keys.unwrap(&record.sealed.wrapped_key).await?;
        let contents = crypto::decrypt(
            &record.sealed.ciphertext,
            &data_key,
            &record.sealed.nonce,
            &record.sealed.auth_tag,
        )
        .inspect_err(|e| {
            tracing::error!(
                record_id = %record.id,
                error = %e,
                "File failed to decrypt"
            );
        })?;

        tracing::debug!(record_id = %record.id, access = %level, "File decrypted");
        Ok(DecryptedFile {
            file_name: record.file_name,
            file_type: record.file_type,
            contents,
        })
    }

    /// Grant the user behind `grantee_email` read access to one of the
    /// requester's own files.
    pub async fn share(
        &self,
        requester_id: &str,
        file_name: &str,
        grantee_email: &str,
    ) -> Result<ShareOutcome, ServiceError> {
        validate_file_name(file_name)?;
        validate_email(grantee_email)?;

        let grantee_id = self
            .directory
            .lookup_email(&normalize_email(grantee_email))
            .await?;

        let record = match self.resolver().authorize_share(requester_id, file_name)? {
            Ok(record) => record,
            Err(ShareDenied::NotOwner) => return Err(ServiceError::Forbidden),
            Err(ShareDenied::NoSuchFile) => return Err(ServiceError::NotFound),
        };

        if grantee_id == record.owner_id {
            return Err(ServiceError::InvalidRequest(
                "a file cannot be shared with its owner".to_string(),
            ));
        }

        let outcome = self.store.append_share(&record.id, &grantee_id)?;
        tracing::info!(
            record_id = %record.id,
            grantee_id = %grantee_id,
            outcome = ?outcome,
            "File share processed"
        );
        Ok(outcome)
    }

    pub fn list_files(&self, owner_id: &str) -> Result<Vec<FileListing>, ServiceError> {
        Ok(self
            .store
            .list_owned(owner_id)?
            .into_iter()
            .map(FileListing::owned)
            .collect())
    }

    pub fn list_shared_files(&self, grantee_id: &str) -> Result<Vec<FileListing>, ServiceError> {
        Ok(self
            .store
            .list_shared(grantee_id)?
            .into_iter()
            .map(FileListing::shared)
            .collect())
    }
}
