// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory record store for tests and development.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use super::record::{FileRecord, FileSummary};
use super::store::{FileRecordStore, ShareOutcome, StoreError, StoreResult};

#[derive(Default)]
struct Inner {
    records: HashMap<String, FileRecord>,
    /// (owner_id, file_name) → record id
    owner_index: BTreeMap<(String, String), String>,
    /// (grantee_id, file_name, owner_id) → record id
    share_index: BTreeMap<(String, String, String), String>,
}

/// Record store backed by process memory. Contents are lost on restart.
#[derive(Default)]
pub struct MemoryFileStore {
    inner: Mutex<Inner>,
}

impl MemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Inner>> {
        self.inner.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.lock().map(|inner| inner.records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fetch a record by id.
    pub fn get(&self, record_id: &str) -> StoreResult<Option<FileRecord>> {
        Ok(self.lock()?.records.get(record_id).cloned())
    }

    /// Overwrite a stored record wholesale. Test hook for simulating
    /// at-rest tampering.
    #[cfg(test)]
    pub(crate) fn replace(&self, record: FileRecord) {
        if let Ok(mut inner) = self.lock() {
            inner.records.insert(record.id.clone(), record);
        }
    }
}

impl FileRecordStore for MemoryFileStore {
    fn create(&self, record: &FileRecord) -> StoreResult<String> {
        let mut inner = self.lock()?;
        let key = (record.owner_id.clone(), record.file_name.clone());
        if inner.owner_index.contains_key(&key) {
            return Err(StoreError::AlreadyExists(format!(
                "File {} for owner {}",
                record.file_name, record.owner_id
            )));
        }
        if inner.records.contains_key(&record.id) {
            return Err(StoreError::AlreadyExists(format!("Record {}", record.id)));
        }

        for grantee in &record.shared_with {
            inner.share_index.insert(
                (grantee.clone(), record.file_name.clone(), record.owner_id.clone()),
                record.id.clone(),
            );
        }
        inner.owner_index.insert(key, record.id.clone());
        inner.records.insert(record.id.clone(), record.clone());
        Ok(record.id.clone())
    }

    fn find_owned(&self, owner_id: &str, file_name: &str) -> StoreResult<Option<FileRecord>> {
        let inner = self.lock()?;
        Ok(inner
            .owner_index
            .get(&(owner_id.to_string(), file_name.to_string()))
            .and_then(|id| inner.records.get(id))
            .cloned())
    }

    fn find_shared(&self, grantee_id: &str, file_name: &str) -> StoreResult<Option<FileRecord>> {
        let inner = self.lock()?;
        let start = (grantee_id.to_string(), file_name.to_string(), String::new());
        Ok(inner
            .share_index
            .range(start..)
            .take_while(|((grantee, name, _), _)| grantee == grantee_id && name == file_name)
            .next()
            .and_then(|(_, id)| inner.records.get(id))
            .cloned())
    }

    fn list_owned(&self, owner_id: &str) -> StoreResult<Vec<FileSummary>> {
        let inner = self.lock()?;
        let start = (owner_id.to_string(), String::new());
        Ok(inner
            .owner_index
            .range(start..)
            .take_while(|((owner, _), _)| owner == owner_id)
            .filter_map(|(_, id)| inner.records.get(id))
            .map(FileSummary::from)
            .collect())
    }

    fn list_shared(&self, grantee_id: &str) -> StoreResult<Vec<FileSummary>> {
        let inner = self.lock()?;
        let start = (grantee_id.to_string(), String::new(), String::new());
        Ok(inner
            .share_index
            .range(start..)
            .take_while(|((grantee, _, _), _)| grantee == grantee_id)
            .filter_map(|(_, id)| inner.records.get(id))
            .map(FileSummary::from)
            .collect())
    }

    fn append_share(&self, record_id: &str, grantee_id: &str) -> StoreResult<ShareOutcome> {
        let mut inner = self.lock()?;
        let record = inner
            .records
            .get_mut(record_id)
            .ok_or_else(|| StoreError::NotFound(format!("Record {record_id}")))?;

        if record.is_shared_with(grantee_id) {
            return Ok(ShareOutcome::AlreadyShared);
        }
        record.shared_with.push(grantee_id.to_string());

        let key = (
            grantee_id.to_string(),
            record.file_name.clone(),
            record.owner_id.clone(),
        );
        inner.share_index.insert(key, record_id.to_string());
        Ok(ShareOutcome::Added)
    }
}
