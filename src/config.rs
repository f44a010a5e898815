// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is read from the environment once at startup into a
//! [`ServerConfig`].
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8443` |
//! | `DATA_DIR` | Directory for the record database | `./data` |
//! | `TLS_CERT_PATH` | PEM certificate chain | Required |
//! | `TLS_KEY_PATH` | PEM private key | Required |
//! | `AUTH_JWKS_URL` | JWKS endpoint for JWT verification | Unset = development mode |
//! | `AUTH_ISSUER` | Expected JWT issuer claim | Optional |
//! | `AUTH_AUDIENCE` | Expected JWT audience claim | Optional |
//! | `IDENTITY_API_URL` | User directory base URL | Unset = static directory |
//! | `IDENTITY_API_KEY` | Bearer secret for the user directory | Optional |
//! | `DIRECTORY_SEED` | Static directory entries, `email=user_id,...` | Empty |
//! | `KMS_URL` | Remote key service base URL | Unset = local key service |
//! | `KMS_API_TOKEN` | Bearer token for the key service | Optional |
//! | `KMS_KEY_ALIAS` | Master key alias for new files | `alias/file-share` |
//! | `KMS_TIMEOUT_MS` | Bound on a single key service call | `5000` |
//! | `LOCAL_KMS_MASTER_KEY` | Base64 32-byte master key for the local key service | Random |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::telemetry::LogFormat;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";

/// Environment variable name for the data directory path.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";

pub const AUTH_JWKS_URL_ENV: &str = "AUTH_JWKS_URL";
pub const AUTH_ISSUER_ENV: &str = "AUTH_ISSUER";
pub const AUTH_AUDIENCE_ENV: &str = "AUTH_AUDIENCE";

pub const IDENTITY_API_URL_ENV: &str = "IDENTITY_API_URL";
pub const IDENTITY_API_KEY_ENV: &str = "IDENTITY_API_KEY";
pub const DIRECTORY_SEED_ENV: &str = "DIRECTORY_SEED";

pub const KMS_URL_ENV: &str = "KMS_URL";
pub const KMS_API_TOKEN_ENV: &str = "KMS_API_TOKEN";
pub const KMS_KEY_ALIAS_ENV: &str = "KMS_KEY_ALIAS";
pub const KMS_TIMEOUT_MS_ENV: &str = "KMS_TIMEOUT_MS";
pub const LOCAL_KMS_MASTER_KEY_ENV: &str = "LOCAL_KMS_MASTER_KEY";

pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8443;
pub const DEFAULT_DATA_DIR: &str = "./data";
pub const DEFAULT_KMS_KEY_ALIAS: &str = "alias/file-share";

/// Largest accepted request body (10 MiB).
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// File name of the record database inside `DATA_DIR`.
pub const DATABASE_FILE: &str = "files.redb";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} is required")]
    Missing { name: &'static str },

    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Where data keys come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KmsConfig {
    Remote { url: Url, api_token: Option<String> },
    /// In-process key service. `master_key` is base64; `None` means a random key.
    Local { master_key: Option<String> },
}

/// How share targets are resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryConfig {
    Remote { url: Url, api_key: Option<String> },
    Static { seed: String },
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub data_dir: PathBuf,
    pub tls_cert_path: PathBuf,
    pub tls_key_path: PathBuf,
    pub jwks_url: Option<Url>,
    pub auth_issuer: Option<String>,
    pub auth_audience: Option<String>,
    pub directory: DirectoryConfig,
    pub kms: KmsConfig,
    pub kms_key_alias: String,
    pub kms_timeout: Duration,
    pub log_format: LogFormat,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    /// Empty values are treated as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let host = get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match get(PORT_ENV) {
            Some(p) => p.parse::<u16>().map_err(|e| ConfigError::Invalid {
                name: PORT_ENV,
                reason: e.to_string(),
            })?,
            None => DEFAULT_PORT,
        };
        let bind_addr: SocketAddr =
            format!("{host}:{port}")
                .parse()
                .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                    name: HOST_ENV,
                    reason: e.to_string(),
                })?;

        let tls_cert_path = get(TLS_CERT_PATH_ENV)
            .map(PathBuf::from)
            .ok_or(ConfigError::Missing {
                name: TLS_CERT_PATH_ENV,
            })?;
        let tls_key_path = get(TLS_KEY_PATH_ENV)
            .map(PathBuf::from)
            .ok_or(ConfigError::Missing {
                name: TLS_KEY_PATH_ENV,
            })?;

        let jwks_url = get(AUTH_JWKS_URL_ENV)
            .map(|v| parse_url(AUTH_JWKS_URL_ENV, &v))
            .transpose()?;

        let directory = match get(IDENTITY_API_URL_ENV) {
            Some(v) => DirectoryConfig::Remote {
                url: parse_url(IDENTITY_API_URL_ENV, &v)?,
                api_key: get(IDENTITY_API_KEY_ENV),
            },
            None => DirectoryConfig::Static {
                seed: get(DIRECTORY_SEED_ENV).unwrap_or_default(),
            },
        };

        let kms = match get(KMS_URL_ENV) {
            Some(v) => KmsConfig::Remote {
                url: parse_url(KMS_URL_ENV, &v)?,
                api_token: get(KMS_API_TOKEN_ENV),
            },
            None => KmsConfig::Local {
                master_key: get(LOCAL_KMS_MASTER_KEY_ENV),
            },
        };

        let kms_timeout = match get(KMS_TIMEOUT_MS_ENV) {
            Some(v) => {
                let ms = v.parse::<u64>().map_err(|e| ConfigError::Invalid {
                    name: KMS_TIMEOUT_MS_ENV,
                    reason: e.to_string(),
                })?;
                if ms == 0 {
                    return Err(ConfigError::Invalid {
                        name: KMS_TIMEOUT_MS_ENV,
                        reason: "must be greater than zero".to_string(),
                    });
                }
                Duration::from_millis(ms)
            }
            None => crate::kms::adapter::DEFAULT_KMS_TIMEOUT,
        };

        let log_format = match get(LOG_FORMAT_ENV) {
            Some(v) => v.parse::<LogFormat>().map_err(|reason| ConfigError::Invalid {
                name: LOG_FORMAT_ENV,
                reason,
            })?,
            None => LogFormat::default(),
        };

        Ok(Self {
            bind_addr,
            data_dir: get(DATA_DIR_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
            tls_cert_path,
            tls_key_path,
            jwks_url,
            auth_issuer: get(AUTH_ISSUER_ENV),
            auth_audience: get(AUTH_AUDIENCE_ENV),
            directory,
            kms,
            kms_key_alias: get(KMS_KEY_ALIAS_ENV)
                .unwrap_or_else(|| DEFAULT_KMS_KEY_ALIAS.to_string()),
            kms_timeout,
            log_format,
        })
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE)
    }
}

/// Parse an http(s) URL.
fn parse_url(name: &'static str, value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value).map_err(|e| ConfigError::Invalid {
        name,
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "https" | "http" if url.has_host() => Ok(url),
        _ => Err(ConfigError::Invalid {
            name,
            reason: "expected an http(s) URL".to_string(),
        }),
    }
}
