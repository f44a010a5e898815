// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::path::PathBuf;
use std::sync::Arc;

use crate::auth::JwksManager;
use crate::service::FileService;

/// Token verification settings.
///
/// Without a JWKS manager the server runs in development mode and accepts
/// unsigned tokens.
#[derive(Clone, Default)]
pub struct AuthConfig {
    pub jwks: Option<JwksManager>,
    pub issuer: Option<String>,
    pub audience: Option<String>,
}

impl AuthConfig {
    pub fn development() -> Self {
        Self::default()
    }

    pub fn production(jwks: JwksManager, issuer: Option<String>, audience: Option<String>) -> Self {
        Self {
            jwks: Some(jwks),
            issuer,
            audience,
        }
    }

    pub fn is_production(&self) -> bool {
        self.jwks.is_some()
    }
}

#[derive(Clone)]
pub struct AppState {
    pub files: Arc<FileService>,
    pub auth_config: AuthConfig,
    /// Directory holding the record database, reported by the readiness probe.
    pub data_dir: Option<PathBuf>,
}

impl AppState {
    pub fn new(files: FileService, auth_config: AuthConfig) -> Self {
        Self {
            files: Arc::new(files),
            auth_config,
            data_dir: None,
        }
    }

    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(data_dir.into());
        self
    }

    /// In-memory state in development auth mode.
    #[cfg(test)]
    pub(crate) fn for_tests() -> Self {
        Self::new(
            crate::service::tests::test_service(),
            AuthConfig::development(),
        )
    }
}
