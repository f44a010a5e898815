// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Access control for file records.
//!
//! Every read or share goes through [`AccessResolver`], which scopes lookups
//! by the requester: first the requester's own namespace, then files shared
//! with them. A record is never looked up by name alone.

use super::record::FileRecord;
use super::store::{FileRecordStore, StoreResult};

/// Trait for resources that have an owner.
pub trait OwnedResource {
    /// Get the owner's user ID.
    fn owner_user_id(&self) -> &str;

    /// Whether `user_id` owns this resource.
    fn is_owned_by(&self, user_id: &str) -> bool {
        self.owner_user_id() == user_id
    }
}

/// Level of access a requester holds on a named file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessLevel {
    /// Uploaded the file: may decrypt and share.
    Owner,
    /// Listed in the file's share list: may decrypt only.
    Grantee,
    Denied,
}

impl std::fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccessLevel::Owner => write!(f, "OWNER"),
            AccessLevel::Grantee => write!(f, "GRANTEE"),
            AccessLevel::Denied => write!(f, "DENIED"),
        }
    }
}

/// Resolution result, carrying the record when access is granted.
#[derive(Debug, Clone)]
pub enum Access {
    Owner(FileRecord),
    Grantee(FileRecord),
    Denied,
}

impl Access {
    pub fn level(&self) -> AccessLevel {
        match self {
            Access::Owner(_) => AccessLevel::Owner,
            Access::Grantee(_) => AccessLevel::Grantee,
            Access::Denied => AccessLevel::Denied,
        }
    }

    /// The record, if the requester may read it.
    pub fn into_readable(self) -> Option<FileRecord> {
        match self {
            Access::Owner(record) | Access::Grantee(record) => Some(record),
            Access::Denied => None,
        }
    }
}

/// Why a share grant was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShareDenied {
    /// The requester can read the file but does not own it.
    NotOwner,
    /// The requester has no file by that name.
    NoSuchFile,
}

/// Resolves a requester's rights on a named file.
pub struct AccessResolver<'a> {
    store: &'a dyn FileRecordStore,
}

impl<'a> AccessResolver<'a> {
    pub fn new(store: &'a dyn FileRecordStore) -> Self {
        Self { store }
    }

    /// Owner lookup first, then grantee lookup. An owner who also appears in
    /// their own share list resolves as owner.
    pub fn resolve(&self, requester_id: &str, file_name: &str) -> StoreResult<Access> {
        if let Some(record) = self.store.find_owned(requester_id, file_name)? {
            return Ok(Access::Owner(record));
        }
        if let Some(record) = self.store.find_shared(requester_id, file_name)? {
            return Ok(Access::Grantee(record));
        }
        Ok(Access::Denied)
    }

    /// Resolve a file addressed by its owner as well as its name, so a
    /// grantee can reach any of several same-named files shared with them.
    pub fn resolve_from(
        &self,
        requester_id: &str,
        owner_id: &str,
        file_name: &str,
    ) -> StoreResult<Access> {
        Ok(match self.store.find_owned(owner_id, file_name)? {
            Some(record) if record.is_owned_by(requester_id) => Access::Owner(record),
            Some(record) if record.is_shared_with(requester_id) => Access::Grantee(record),
            _ => Access::Denied,
        })
    }

    /// Only the owner may grant access; grantees cannot re-share.
    pub fn authorize_share(
        &self,
        requester_id: &str,
        file_name: &str,
    ) -> StoreResult<Result<FileRecord, ShareDenied>> {
        Ok(match self.resolve(requester_id, file_name)? {
            Access::Owner(record) if record.is_owned_by(requester_id) => Ok(record),
            Access::Owner(_) | Access::Grantee(_) => Err(ShareDenied::NotOwner),
            Access::Denied => Err(ShareDenied::NoSuchFile),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::record::SealedContent;
    use crate::storage::MemoryFileStore;

    fn record(owner: &str, name: &str) -> FileRecord {
        FileRecord::new(
            owner,
            name,
            "text/plain",
            SealedContent {
                ciphertext: vec![1],
                wrapped_key: vec![2],
                nonce: vec![0; 12],
                auth_tag: vec![0; 16],
            },
        )
    }

    fn setup() -> (MemoryFileStore, FileRecord) {
        let store = MemoryFileStore::new();
        let rec = record("alice", "notes.txt");
        store.create(&rec).unwrap();
        store.append_share(&rec.id, "bob").unwrap();
        (store, rec)
    }

    #[test]
    fn owner_resolves_owner() {
        let (store, rec) = setup();
        let access = AccessResolver::new(&store).resolve("alice", "notes.txt").unwrap();
        assert_eq!(access.level(), AccessLevel::Owner);
        assert_eq!(access.into_readable().unwrap().id, rec.id);
    }

    #[test]
    fn grantee_resolves_grantee() {
        let (store, rec) = setup();
        let access = AccessResolver::new(&store).resolve("bob", "notes.txt").unwrap();
        assert_eq!(access.level(), AccessLevel::Grantee);
        assert_eq!(access.into_readable().unwrap().id, rec.id);
    }

    #[test]
    fn stranger_is_denied() {
        let (store, _) = setup();
        let access = AccessResolver::new(&store).resolve("carol", "notes.txt").unwrap();
        assert_eq!(access.level(), AccessLevel::Denied);
        assert!(access.into_readable().is_none());
    }

    #[test]
    fn owner_listed_as_own_grantee_is_still_owner() {
        let (store, rec) = setup();
        store.append_share(&rec.id, "alice").unwrap();
        let access = AccessResolver::new(&store).resolve("alice", "notes.txt").unwrap();
        assert_eq!(access.level(), AccessLevel::Owner);
    }

    #[test]
    fn own_file_shadows_shared_file_of_same_name() {
        let (store, _) = setup();
        let bobs = record("bob", "notes.txt");
        store.create(&bobs).unwrap();
        let access = AccessResolver::new(&store).resolve("bob", "notes.txt").unwrap();
        match access {
            Access::Owner(found) => assert_eq!(found.id, bobs.id),
            other => panic!("expected owner access, got {:?}", other.level()),
        }
    }

    #[test]
    fn owner_scoped_lookup_checks_membership() {
        let (store, rec) = setup();
        let other = record("zed", "notes.txt");
        store.create(&other).unwrap();
        store.append_share(&other.id, "bob").unwrap();
        let resolver = AccessResolver::new(&store);

        match resolver.resolve_from("bob", "zed", "notes.txt").unwrap() {
            Access::Grantee(found) => assert_eq!(found.id, other.id),
            other => panic!("expected grantee access, got {:?}", other.level()),
        }
        match resolver.resolve_from("bob", "alice", "notes.txt").unwrap() {
            Access::Grantee(found) => assert_eq!(found.id, rec.id),
            other => panic!("expected grantee access, got {:?}", other.level()),
        }
        assert_eq!(
            resolver.resolve_from("alice", "alice", "notes.txt").unwrap().level(),
            AccessLevel::Owner
        );
        assert_eq!(
            resolver.resolve_from("carol", "zed", "notes.txt").unwrap().level(),
            AccessLevel::Denied
        );
        assert_eq!(
            resolver.resolve_from("bob", "zed", "missing.txt").unwrap().level(),
            AccessLevel::Denied
        );
    }

    #[test]
    fn only_owner_may_share() {
        let (store, rec) = setup();
        let resolver = AccessResolver::new(&store);

        assert_eq!(
            resolver.authorize_share("alice", "notes.txt").unwrap().unwrap().id,
            rec.id
        );
        assert_eq!(
            resolver.authorize_share("bob", "notes.txt").unwrap().unwrap_err(),
            ShareDenied::NotOwner
        );
        assert_eq!(
            resolver.authorize_share("carol", "notes.txt").unwrap().unwrap_err(),
            ShareDenied::NoSuchFile
        );
    }

    #[test]
    fn is_owned_by_compares_ids() {
        let rec = record("alice", "x");
        assert!(rec.is_owned_by("alice"));
        assert!(!rec.is_owned_by("bob"));
    }
}
