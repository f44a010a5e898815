// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderName,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::AuthenticatedUser,
    config::MAX_BODY_BYTES,
    models::{
        DecryptFileRequest, DecryptFileResponse, FileEntry, ListFilesResponse, ShareFileRequest,
        ShareFileResponse, ShareResult, UploadFileRequest, UploadFileResponse,
    },
    state::AppState,
};

pub mod files;
pub mod health;

const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/files", get(files::list_files).post(files::upload_file))
        .route("/files/decrypt", post(files::decrypt_file))
        .route("/files/share", post(files::share_file))
        .route("/files/shared", get(files::list_shared_files));

    // Paths used by the original web client.
    let legacy_routes = Router::new()
        .route("/upload", post(files::upload_file))
        .route("/decrypt", post(files::decrypt_file))
        .route("/share", post(files::share_file))
        .route("/files", get(files::list_files))
        .route("/sharedWithMe", get(files::list_shared_files));

    let health_routes = Router::new()
        .route("/health", get(health::liveness))
        .route("/health/ready", get(health::readiness));

    Router::new()
        .nest("/v1", v1_routes)
        .merge(legacy_routes)
        .merge(health_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(PropagateRequestIdLayer::new(REQUEST_ID_HEADER))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(REQUEST_ID_HEADER, MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        files::upload_file,
        files::decrypt_file,
        files::share_file,
        files::list_files,
        files::list_shared_files,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            UploadFileRequest,
            UploadFileResponse,
            DecryptFileRequest,
            DecryptFileResponse,
            ShareFileRequest,
            ShareFileResponse,
            ShareResult,
            FileEntry,
            ListFilesResponse,
            AuthenticatedUser,
            health::HealthResponse,
            health::ReadyResponse,
            health::HealthChecks
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Files", description = "Encrypted file upload, decryption and sharing"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;
