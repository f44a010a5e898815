// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::future::Future;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use base64ct::{Base64, Encoding};
use zeroize::Zeroize;

use sealed_share::{
    api::router,
    auth::{AuthError, DirectoryError, HttpUserDirectory, JwksManager, StaticUserDirectory, UserDirectory},
    config::{ConfigError, DirectoryConfig, KmsConfig, ServerConfig},
    crypto::{CryptoError, DataKey},
    kms::{HttpKms, KeyManagementService, KeyWrapper, KmsError, LocalKms},
    service::FileService,
    state::{AppState, AuthConfig},
    storage::{FileDatabase, StoreError},
    telemetry::init_tracing,
    tls::{self, TlsError},
};

/// Time allowed for in-flight requests after a shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Tls(#[from] TlsError),

    #[error("failed to prepare data directory: {0}")]
    DataDir(std::io::Error),

    #[error("failed to open record database: {0}")]
    Store(#[from] StoreError),

    #[error("key service setup failed: {0}")]
    Kms(#[from] KmsError),

    #[error("invalid local master key: {0}")]
    MasterKey(String),

    #[error("user directory setup failed: {0}")]
    Directory(String),

    #[error("auth setup failed: {0}")]
    Auth(#[from] AuthError),

    #[error("HTTPS server failed: {0}")]
    Serve(std::io::Error),
}

impl From<CryptoError> for StartupError {
    fn from(e: CryptoError) -> Self {
        StartupError::MasterKey(e.to_string())
    }
}

impl From<DirectoryError> for StartupError {
    fn from(e: DirectoryError) -> Self {
        StartupError::Directory(e.to_string())
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    init_tracing(config.log_format);

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Server terminated");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: ServerConfig) -> Result<(), StartupError> {
    // Install the ring crypto provider for rustls before any TLS operation.
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        tracing::debug!("rustls crypto provider already installed");
    }

    let tls_config = RustlsConfig::from_config(tls::server_config(
        &config.tls_cert_path,
        &config.tls_key_path,
    )?);

    std::fs::create_dir_all(&config.data_dir).map_err(StartupError::DataDir)?;
    let store = Arc::new(FileDatabase::open(&config.database_path())?);
    tracing::info!(path = %config.database_path().display(), "Record database opened");

    let kms = build_kms(&config)?;
    let keys = KeyWrapper::new(kms, config.kms_key_alias.clone()).with_timeout(config.kms_timeout);

    let directory = build_directory(&config)?;
    let auth_config = build_auth(&config)?;

    let state = AppState::new(FileService::new(store, keys, directory), auth_config)
        .with_data_dir(config.data_dir.clone());
    let app = router(state);

    let handle: Handle<SocketAddr> = Handle::new();
    tokio::spawn(shutdown_on(tokio::signal::ctrl_c(), handle.clone()));

    tracing::info!(addr = %config.bind_addr, "Sealed Share listening on https (docs at /docs)");

    // TLS is mandatory; there is no plain HTTP listener.
    axum_server::bind_rustls(config.bind_addr, tls_config)
        .handle(handle)
        .serve(app.into_make_service())
        .await
        .map_err(StartupError::Serve)
}

fn build_kms(config: &ServerConfig) -> Result<Arc<dyn KeyManagementService>, StartupError> {
    match &config.kms {
        KmsConfig::Remote { url, api_token } => {
            tracing::info!(url = %url, alias = %config.kms_key_alias, "Using remote key service");
            Ok(Arc::new(HttpKms::new(url.clone(), api_token.clone())?))
        }
        KmsConfig::Local {
            master_key: Some(encoded),
        } => {
            let mut bytes = Base64::decode_vec(encoded)
                .map_err(|_| StartupError::MasterKey("not valid base64".to_string()))?;
            let key = DataKey::from_slice(&bytes);
            bytes.zeroize();
            tracing::info!(alias = %config.kms_key_alias, "Using local key service");
            Ok(Arc::new(LocalKms::with_master_key(
                config.kms_key_alias.clone(),
                key?,
            )))
        }
        KmsConfig::Local { master_key: None } => {
            tracing::warn!(
                alias = %config.kms_key_alias,
                "No key service configured; using a random local master key. \
                 Files uploaded now will be unreadable after restart"
            );
            Ok(Arc::new(LocalKms::with_random_key(config.kms_key_alias.clone())?))
        }
    }
}

fn build_directory(config: &ServerConfig) -> Result<Arc<dyn UserDirectory>, StartupError> {
    match &config.directory {
        DirectoryConfig::Remote { url, api_key } => {
            tracing::info!(url = %url, "Using remote user directory");
            Ok(Arc::new(HttpUserDirectory::new(url.clone(), api_key.clone())?))
        }
        DirectoryConfig::Static { seed } => {
            let directory = StaticUserDirectory::from_seed(seed).map_err(StartupError::Directory)?;
            tracing::info!(users = directory.len(), "Using static user directory");
            Ok(Arc::new(directory))
        }
    }
}

fn build_auth(config: &ServerConfig) -> Result<AuthConfig, StartupError> {
    match &config.jwks_url {
        Some(url) => {
            tracing::info!(jwks_url = %url, "JWT verification enabled");
            Ok(AuthConfig::production(
                JwksManager::new(url.as_str())?,
                config.auth_issuer.clone(),
                config.auth_audience.clone(),
            ))
        }
        None => {
            tracing::warn!(
                "AUTH_JWKS_URL not set; accepting unsigned tokens (development mode)"
            );
            Ok(AuthConfig::development())
        }
    }
}

/// Wait for `signal`, then drain connections on `handle`.
async fn shutdown_on<F>(signal: F, handle: Handle<SocketAddr>)
where
    F: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = signal.await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received, draining connections");
    handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn shutdown_returns_once_signalled() {
        let handle: Handle<SocketAddr> = Handle::new();
        tokio::time::timeout(
            Duration::from_secs(1),
            shutdown_on(std::future::ready(Ok(())), handle),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn failed_signal_listener_returns() {
        let handle: Handle<SocketAddr> = Handle::new();
        let failed = std::future::ready(Err(std::io::Error::other("no signal")));
        tokio::time::timeout(Duration::from_secs(1), shutdown_on(failed, handle))
            .await
            .unwrap();
    }

    #[test]
    fn startup_errors_wrap_component_failures() {
        let err = StartupError::from(DirectoryError::UserNotFound);
        assert!(matches!(err, StartupError::Directory(_)));
        let err = StartupError::from(CryptoError::InvalidKeyLength {
            expected: 32,
            actual: 3,
        });
        assert!(err.to_string().starts_with("invalid local master key"));
    }
}
