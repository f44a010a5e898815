// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded file record database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `files`: record_id → serialized FileRecord (JSON bytes)
//! - `owner_index`: `owner_id \0 file_name` → record_id
//! - `share_index`: `grantee_id \0 file_name \0 owner_id` → record_id
//!
//! User ids and file names never contain NUL (enforced at the API boundary),
//! so `\0` is a safe separator and `\x01` bounds a prefix range.
//!
//! redb serializes write transactions, so uniqueness checks in `create` and
//! the membership check in `append_share` cannot race with other writers.

use std::path::Path;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

use super::record::{FileRecord, FileSummary};
use super::store::{FileRecordStore, ShareOutcome, StoreError, StoreResult};

// =============================================================================
// Table Definitions
// =============================================================================

/// Primary table: record_id → serialized FileRecord (JSON bytes).
const FILES: TableDefinition<&str, &[u8]> = TableDefinition::new("files");

/// Index: `owner_id \0 file_name` → record_id. Also enforces per-owner name uniqueness.
const OWNER_INDEX: TableDefinition<&[u8], &str> = TableDefinition::new("owner_index");

/// Index: `grantee_id \0 file_name \0 owner_id` → record_id.
const SHARE_INDEX: TableDefinition<&[u8], &str> = TableDefinition::new("share_index");

// =============================================================================
// Index Key Helpers
// =============================================================================

fn make_key(parts: &[&str]) -> Vec<u8> {
    let mut key = Vec::with_capacity(parts.iter().map(|p| p.len() + 1).sum());
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            key.push(0);
        }
        key.extend_from_slice(part.as_bytes());
    }
    key
}

/// `[start, end)` covering every key that begins with `parts` followed by `\0`.
fn prefix_range(parts: &[&str]) -> (Vec<u8>, Vec<u8>) {
    let mut start = make_key(parts);
    let mut end = start.clone();
    start.push(0);
    end.push(1);
    (start, end)
}

// =============================================================================
// FileDatabase
// =============================================================================

/// Durable record store.
pub struct FileDatabase {
    db: Database,
}

impl FileDatabase {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(FILES)?;
            let _ = write_txn.open_table(OWNER_INDEX)?;
            let _ = write_txn.open_table(SHARE_INDEX)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Look up a single record by id.
    pub fn get(&self, record_id: &str) -> StoreResult<Option<FileRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(FILES)?;
        match table.get(record_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Resolve every record id in an index range to its summary.
    fn summaries_in_range(
        &self,
        index: TableDefinition<'static, &'static [u8], &'static str>,
        start: &[u8],
        end: &[u8],
    ) -> StoreResult<Vec<FileSummary>> {
        let read_txn = self.db.begin_read()?;
        let idx_table = read_txn.open_table(index)?;
        let files = read_txn.open_table(FILES)?;

        let mut summaries = Vec::new();
        for entry in idx_table.range(start..end)? {
            let (_, record_id) = entry?;
            match files.get(record_id.value())? {
                Some(value) => {
                    let record: FileRecord = serde_json::from_slice(value.value())?;
                    summaries.push(FileSummary::from(&record));
                }
                None => {
                    tracing::warn!(
                        record_id = record_id.value(),
                        "Index entry points at a missing record"
                    );
                }
            }
        }
        Ok(summaries)
    }
}

impl FileRecordStore for FileDatabase {
    fn create(&self, record: &FileRecord) -> StoreResult<String> {
        let json = serde_json::to_vec(record)?;
        let owner_key = make_key(&[&record.owner_id, &record.file_name]);

        let write_txn = self.db.begin_write()?;
        {
            let mut owner_index = write_txn.open_table(OWNER_INDEX)?;
            if owner_index.get(owner_key.as_slice())?.is_some() {
                return Err(StoreError::AlreadyExists(format!(
                    "File {} for owner {}",
                    record.file_name, record.owner_id
                )));
            }

            let mut files = write_txn.open_table(FILES)?;
            if files.get(record.id.as_str())?.is_some() {
                return Err(StoreError::AlreadyExists(format!("Record {}", record.id)));
            }
            files.insert(record.id.as_str(), json.as_slice())?;
            owner_index.insert(owner_key.as_slice(), record.id.as_str())?;

            let mut share_index = write_txn.open_table(SHARE_INDEX)?;
            for grantee in &record.shared_with {
                let key = make_key(&[grantee, &record.file_name, &record.owner_id]);
                share_index.insert(key.as_slice(), record.id.as_str())?;
            }
        }
        write_txn.commit()?;
        Ok(record.id.clone())
    }

    fn find_owned(&self, owner_id: &str, file_name: &str) -> StoreResult<Option<FileRecord>> {
        let record_id = {
            let read_txn = self.db.begin_read()?;
            let table = read_txn.open_table(OWNER_INDEX)?;
            match table.get(make_key(&[owner_id, file_name]).as_slice())? {
                Some(v) => v.value().to_string(),
                None => return Ok(None),
            }
        };
        self.get(&record_id)
    }

    fn find_shared(&self, grantee_id: &str, file_name: &str) -> StoreResult<Option<FileRecord>> {
        let (start, end) = prefix_range(&[grantee_id, file_name]);
        let record_id = {
            let read_txn = self.db.begin_read()?;
            let table = read_txn.open_table(SHARE_INDEX)?;
            let mut range = table.range(start.as_slice()..end.as_slice())?;
            match range.next() {
                Some(entry) => entry?.1.value().to_string(),
                None => return Ok(None),
            }
        };
        self.get(&record_id)
    }

    fn list_owned(&self, owner_id: &str) -> StoreResult<Vec<FileSummary>> {
        let (start, end) = prefix_range(&[owner_id]);
        self.summaries_in_range(OWNER_INDEX, &start, &end)
    }

    fn list_shared(&self, grantee_id: &str) -> StoreResult<Vec<FileSummary>> {
        let (start, end) = prefix_range(&[grantee_id]);
        self.summaries_in_range(SHARE_INDEX, &start, &end)
    }

    fn append_share(&self, record_id: &str, grantee_id: &str) -> StoreResult<ShareOutcome> {
        let write_txn = self.db.begin_write()?;
        let outcome = {
            let mut files = write_txn.open_table(FILES)?;

            // Read existing value and deserialize before mutating
            let existing_bytes = {
                let existing = files
                    .get(record_id)?
                    .ok_or_else(|| StoreError::NotFound(format!("Record {record_id}")))?;
                existing.value().to_vec()
            };
            let mut record: FileRecord = serde_json::from_slice(&existing_bytes)?;

            if record.is_shared_with(grantee_id) {
                ShareOutcome::AlreadyShared
            } else {
                record.shared_with.push(grantee_id.to_string());
                let json = serde_json::to_vec(&record)?;
                files.insert(record_id, json.as_slice())?;

                let mut share_index = write_txn.open_table(SHARE_INDEX)?;
                let key = make_key(&[grantee_id, &record.file_name, &record.owner_id]);
                share_index.insert(key.as_slice(), record_id)?;
                ShareOutcome::Added
            }
        };

        match outcome {
            ShareOutcome::Added => write_txn.commit()?,
            ShareOutcome::AlreadyShared => write_txn.abort()?,
        }
        Ok(outcome)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::storage::record::SealedContent;

    fn temp_db() -> (FileDatabase, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = FileDatabase::open(&dir.path().join("files.redb")).unwrap();
        (db, dir)
    }

    fn record(owner: &str, name: &str) -> FileRecord {
        FileRecord::new(
            owner,
            name,
            "application/pdf",
            SealedContent {
                ciphertext: vec![0xde, 0xad],
                wrapped_key: vec![0xbe, 0xef],
                nonce: vec![1; 12],
                auth_tag: vec![2; 16],
            },
        )
    }

    #[test]
    fn create_and_find_owned() {
        let (db, _dir) = temp_db();
        let rec = record("alice", "report.pdf");
        db.create(&rec).unwrap();

        assert_eq!(db.find_owned("alice", "report.pdf").unwrap(), Some(rec.clone()));
        assert_eq!(db.get(&rec.id).unwrap(), Some(rec));
        assert!(db.find_owned("alice", "other.pdf").unwrap().is_none());
        assert!(db.find_owned("bob", "report.pdf").unwrap().is_none());
    }

    #[test]
    fn duplicate_owner_name_writes_nothing() {
        let (db, _dir) = temp_db();
        db.create(&record("alice", "report.pdf")).unwrap();
        let dup = record("alice", "report.pdf");
        assert!(matches!(db.create(&dup), Err(StoreError::AlreadyExists(_))));
        assert!(db.get(&dup.id).unwrap().is_none());
    }

    #[test]
    fn prefix_scans_do_not_bleed_between_users() {
        let (db, _dir) = temp_db();
        // "ali" is a byte prefix of "alice"; the separator keeps them apart.
        db.create(&record("ali", "x.txt")).unwrap();
        db.create(&record("alice", "y.txt")).unwrap();

        let names: Vec<_> = db
            .list_owned("ali")
            .unwrap()
            .into_iter()
            .map(|s| s.file_name)
            .collect();
        assert_eq!(names, vec!["x.txt"]);
    }

    #[test]
    fn share_then_find_and_list() {
        let (db, _dir) = temp_db();
        let rec = record("alice", "report.pdf");
        db.create(&rec).unwrap();

        assert_eq!(db.append_share(&rec.id, "bob").unwrap(), ShareOutcome::Added);
        assert_eq!(
            db.append_share(&rec.id, "bob").unwrap(),
            ShareOutcome::AlreadyShared
        );

        let stored = db.get(&rec.id).unwrap().unwrap();
        assert_eq!(stored.shared_with, vec!["bob".to_string()]);

        let shared = db.find_shared("bob", "report.pdf").unwrap().unwrap();
        assert_eq!(shared.id, rec.id);
        assert!(db.find_shared("carol", "report.pdf").unwrap().is_none());
        assert!(db.find_shared("bob", "report").unwrap().is_none());

        let listed = db.list_shared("bob").unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].owner_id, "alice");
        assert_eq!(listed[0].file_type, "application/pdf");
    }

    #[test]
    fn same_name_shared_by_two_owners_resolves_by_owner_order() {
        let (db, _dir) = temp_db();
        let from_zed = record("zed", "notes.txt");
        let from_amy = record("amy", "notes.txt");
        db.create(&from_zed).unwrap();
        db.create(&from_amy).unwrap();
        db.append_share(&from_zed.id, "bob").unwrap();
        db.append_share(&from_amy.id, "bob").unwrap();

        let found = db.find_shared("bob", "notes.txt").unwrap().unwrap();
        assert_eq!(found.owner_id, "amy");
        assert_eq!(db.list_shared("bob").unwrap().len(), 2);
    }

    #[test]
    fn append_share_unknown_record() {
        let (db, _dir) = temp_db();
        assert!(matches!(
            db.append_share("nope", "bob"),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn concurrent_shares_are_not_lost() {
        let (db, _dir) = temp_db();
        let db = Arc::new(db);
        let rec = record("alice", "report.pdf");
        db.create(&rec).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let db = Arc::clone(&db);
                let id = rec.id.clone();
                std::thread::spawn(move || db.append_share(&id, &format!("user_{i}")).unwrap())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(db.get(&rec.id).unwrap().unwrap().shared_with.len(), 8);
    }

    #[test]
    fn open_creates_missing_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("files.redb");
        FileDatabase::open(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn open_reports_unusable_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"file").unwrap();

        let result = FileDatabase::open(&blocker.join("files.redb"));
        assert!(matches!(result, Err(StoreError::Io(_))));
    }

    #[test]
    fn records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("files.redb");
        let rec = record("alice", "report.pdf");
        {
            let db = FileDatabase::open(&path).unwrap();
            db.create(&rec).unwrap();
            db.append_share(&rec.id, "bob").unwrap();
        }
        let db = FileDatabase::open(&path).unwrap();
        let loaded = db.find_owned("alice", "report.pdf").unwrap().unwrap();
        assert_eq!(loaded.sealed, rec.sealed);
        assert_eq!(loaded.shared_with, vec!["bob".to_string()]);
    }
}
