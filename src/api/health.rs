// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

/// Readiness response with individual component status.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReadyResponse {
    /// Overall status ("ok" or "degraded").
    pub status: String,
    pub checks: HealthChecks,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthChecks {
    pub service: String,
    /// Data directory availability, when one is configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,
    /// JWKS status. Only present in production auth mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwks: Option<String>,
}

/// Liveness response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

fn check_data_dir(state: &AppState) -> Option<String> {
    state.data_dir.as_ref().map(|dir| {
        if dir.is_dir() { "ok" } else { "missing" }.to_string()
    })
}

async fn check_jwks(state: &AppState) -> Option<String> {
    let jwks = state.auth_config.jwks.as_ref()?;
    if jwks.is_cached().await {
        return Some("ok".to_string());
    }
    match jwks.refresh().await {
        Ok(()) => Some("ok".to_string()),
        Err(e) => {
            tracing::warn!(error = %e, "JWKS unavailable during readiness check");
            Some("unavailable".to_string())
        }
    }
}

/// Liveness probe. Always 200 while the process runs.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is alive", body = HealthResponse)
    )
)]
pub async fn liveness() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Readiness probe.
///
/// Returns 200 only if the data directory and, in production mode, the
/// JWKS endpoint are available.
#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Service is ready", body = ReadyResponse),
        (status = 503, description = "Service is not ready", body = ReadyResponse)
    )
)]
pub async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let data_dir = check_data_dir(&state);
    let jwks = check_jwks(&state).await;

    let all_ok = [&data_dir, &jwks]
        .iter()
        .all(|check| check.as_deref().is_none_or(|s| s == "ok"));

    let response = ReadyResponse {
        status: if all_ok { "ok" } else { "degraded" }.to_string(),
        checks: HealthChecks {
            service: "ok".to_string(),
            data_dir,
            jwks,
        },
    };

    let status = if all_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(response))
}
