// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # File Record Storage
//!
//! Persistence for encrypted files and their share lists.
//!
//! ## Security Model
//!
//! - Records hold only ciphertext and the *wrapped* data key
//! - Plaintext data keys and file contents are never written here
//! - A full copy of the store is unreadable without the key service
//!
//! ## Backends
//!
//! - [`FileDatabase`]: embedded redb database under `DATA_DIR`
//! - [`MemoryFileStore`]: process memory, for tests and local runs
//!
//! ## Lookup Rules
//!
//! Records are addressed by `(owner_id, file_name)` or by grantee membership,
//! never by file name alone. [`AccessResolver`] wraps the two lookups.

pub mod access;
pub mod database;
pub mod memory;
pub mod record;
pub mod store;

pub use access::{Access, AccessLevel, AccessResolver, OwnedResource, ShareDenied};
pub use database::FileDatabase;
pub use memory::MemoryFileStore;
pub use record::{FileRecord, FileSummary, SealedContent};
pub use store::{FileRecordStore, ShareOutcome, StoreError, StoreResult};
