// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Email to user id resolution.
//!
//! Sharing names the grantee by email address, while records are keyed by the
//! identity provider's canonical user id. A [`UserDirectory`] bridges the two.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("no user with that email address")]
    UserNotFound,

    #[error("user directory unavailable: {0}")]
    Unavailable(String),
}

/// Lookup of canonical user ids by email.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn lookup_email(&self, email: &str) -> Result<String, DirectoryError>;
}

/// Lowercased, trimmed form used for every directory lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

// =============================================================================
// HTTP directory
// =============================================================================

#[derive(Deserialize)]
struct DirectoryUser {
    id: String,
}

/// Identity provider user listing, queried as
/// `GET {base}/v1/users?email_address=<email>`.
#[derive(Clone)]
pub struct HttpUserDirectory {
    base_url: Url,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl HttpUserDirectory {
    pub fn new(base_url: Url, api_key: Option<String>) -> Result<Self, DirectoryError> {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| DirectoryError::Unavailable(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            base_url,
            api_key,
            client,
        })
    }

    fn users_url(&self, email: &str) -> Result<Url, DirectoryError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| DirectoryError::Unavailable("directory URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(["v1", "users"]);
        url.query_pairs_mut().append_pair("email_address", email);
        Ok(url)
    }
}

#[async_trait]
impl UserDirectory for HttpUserDirectory {
    async fn lookup_email(&self, email: &str) -> Result<String, DirectoryError> {
        let url = self.users_url(&normalize_email(email))?;
        let mut request = self.client.get(url);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| DirectoryError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(DirectoryError::UserNotFound);
        }
        if !status.is_success() {
            return Err(DirectoryError::Unavailable(format!("HTTP {status}")));
        }

        let users: Vec<DirectoryUser> = response
            .json()
            .await
            .map_err(|e| DirectoryError::Unavailable(e.to_string()))?;

        users
            .into_iter()
            .map(|u| u.id)
            .find(|id| !id.is_empty())
            .ok_or(DirectoryError::UserNotFound)
    }
}

// =============================================================================
// Static directory
// =============================================================================

/// Fixed email table, for development and tests.
#[derive(Debug, Default, Clone)]
pub struct StaticUserDirectory {
    users: HashMap<String, String>,
}

impl StaticUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, email: &str, user_id: impl Into<String>) -> Self {
        self.users.insert(normalize_email(email), user_id.into());
        self
    }

    /// Parse `email=user_id` pairs separated by commas.
    pub fn from_seed(seed: &str) -> Result<Self, String> {
        let mut directory = Self::new();
        for entry in seed.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (email, user_id) = entry
                .split_once('=')
                .ok_or_else(|| format!("directory entry '{entry}' is not email=user_id"))?;
            let (email, user_id) = (email.trim(), user_id.trim());
            if email.is_empty() || user_id.is_empty() {
                return Err(format!("directory entry '{entry}' has an empty side"));
            }
            directory = directory.with_user(email, user_id);
        }
        Ok(directory)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl UserDirectory for StaticUserDirectory {
    async fn lookup_email(&self, email: &str) -> Result<String, DirectoryError> {
        self.users
            .get(&normalize_email(email))
            .cloned()
            .ok_or(DirectoryError::UserNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_case_and_whitespace() {
        assert_eq!(normalize_email("  Bob@Example.COM "), "bob@example.com");
    }

    #[tokio::test]
    async fn static_lookup_is_case_insensitive() {
        let directory = StaticUserDirectory::new().with_user("Bob@example.com", "user_b");
        assert_eq!(directory.lookup_email("bob@EXAMPLE.com").await.unwrap(), "user_b");
        assert!(matches!(
            directory.lookup_email("carol@example.com").await,
            Err(DirectoryError::UserNotFound)
        ));
    }

    #[tokio::test]
    async fn seed_parsing() {
        let directory =
            StaticUserDirectory::from_seed("alice@example.com=user_a, bob@example.com = user_b,")
                .unwrap();
        assert_eq!(directory.len(), 2);
        assert_eq!(directory.lookup_email("bob@example.com").await.unwrap(), "user_b");

        assert!(StaticUserDirectory::from_seed("nonsense").is_err());
        assert!(StaticUserDirectory::from_seed("a@b.c=").is_err());
        assert!(StaticUserDirectory::from_seed("").unwrap().is_empty());
    }

    #[test]
    fn users_url_encodes_email() {
        let directory =
            HttpUserDirectory::new(Url::parse("https://id.example.com/").unwrap(), None).unwrap();
        let url = directory.users_url("a+b@example.com").unwrap();
        assert_eq!(
            url.as_str(),
            "https://id.example.com/v1/users?email_address=a%2Bb%40example.com"
        );
    }

    #[tokio::test]
    async fn unreachable_directory_is_unavailable() {
        let directory =
            HttpUserDirectory::new(Url::parse("http://127.0.0.1:9/").unwrap(), None).unwrap();
        assert!(matches!(
            directory.lookup_email("a@example.com").await,
            Err(DirectoryError::Unavailable(_))
        ));
    }
}
