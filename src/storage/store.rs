// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Record store contract shared by the in-memory and redb backends.

use super::record::{FileRecord, FileSummary};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A record with this `(owner_id, file_name)` already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("store lock poisoned")]
    Poisoned,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Result of adding a grantee to a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareOutcome {
    /// The grantee was added.
    Added,
    /// The grantee was already present; nothing changed.
    AlreadyShared,
}

/// Persistence for file records.
///
/// Implementations must make `create` and `append_share` atomic: a record is
/// either fully written or not at all, and the membership check plus append
/// in `append_share` happen inside one exclusive write so concurrent grants
/// cannot overwrite each other.
pub trait FileRecordStore: Send + Sync {
    /// Insert a new record and return its id.
    fn create(&self, record: &FileRecord) -> StoreResult<String>;

    /// The record `owner_id` uploaded under `file_name`, if any.
    fn find_owned(&self, owner_id: &str, file_name: &str) -> StoreResult<Option<FileRecord>>;

    /// A record named `file_name` that has been shared with `grantee_id`.
    ///
    /// If several owners shared same-named files with the grantee, the one
    /// whose owner id sorts first is returned.
    fn find_shared(&self, grantee_id: &str, file_name: &str) -> StoreResult<Option<FileRecord>>;

    /// Files uploaded by `owner_id`, ordered by name.
    fn list_owned(&self, owner_id: &str) -> StoreResult<Vec<FileSummary>>;

    /// Files shared with `grantee_id`, ordered by name then owner.
    fn list_shared(&self, grantee_id: &str) -> StoreResult<Vec<FileSummary>>;

    /// Add `grantee_id` to the record's share list if not already present.
    fn append_share(&self, record_id: &str, grantee_id: &str) -> StoreResult<ShareOutcome>;
}
