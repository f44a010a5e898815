// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Sealed Share - envelope-encrypted file storage and sharing.
//!
//! Every uploaded file is encrypted with its own AES-256-GCM data key. The
//! data key is wrapped by a master key that never leaves the external key
//! service, and only the wrapped form is stored next to the ciphertext.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - JWT authentication and email lookup
//! - `crypto` - AES-256-GCM envelope encryption
//! - `kms` - Key service boundary (data key generation and unwrap)
//! - `service` - File operations
//! - `storage` - File records, access resolution, redb persistence

pub mod api;
pub mod auth;
pub mod config;
pub mod crypto;
pub mod error;
pub mod kms;
pub mod models;
pub mod service;
pub mod state;
pub mod storage;
pub mod telemetry;
pub mod tls;
