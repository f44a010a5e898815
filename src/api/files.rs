// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! File API endpoints.
//!
//! All endpoints require authentication. A caller sees only files they own
//! or that were shared with them.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};

use crate::{
    auth::Auth,
    error::ApiError,
    models::{
        decode_file_payload, DecryptFileRequest, DecryptFileResponse, ListFilesResponse,
        ShareFileRequest, ShareFileResponse, UploadFileRequest, UploadFileResponse,
    },
    state::AppState,
};

/// Upload and encrypt a file.
///
/// The file is sealed under a fresh data key which is itself wrapped by the
/// key service. Only the ciphertext and wrapped key are stored.
#[utoipa::path(
    post,
    path = "/v1/files",
    tag = "Files",
    security(("bearer_auth" = [])),
    request_body = UploadFileRequest,
    responses(
        (status = 201, description = "File uploaded and encrypted", body = UploadFileResponse),
        (status = 400, description = "Invalid file name or payload"),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "A file with this name already exists"),
        (status = 413, description = "Request body too large"),
        (status = 503, description = "Key service unavailable")
    )
)]
pub async fn upload_file(
    Auth(user): Auth,
    State(state): State<AppState>,
    payload: Result<Json<UploadFileRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UploadFileResponse>), ApiError> {
    let Json(request) = payload?;
    let decoded = decode_file_payload(&request.file).map_err(ApiError::bad_request)?;

    let record = state
        .files
        .upload(
            &user.user_id,
            &request.file_name,
            &decoded.file_type,
            &decoded.contents,
        )
        .await?;

    let response = UploadFileResponse {
        message: "File uploaded and encrypted successfully".to_string(),
        file_name: record.file_name,
        file_type: record.file_type,
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// Decrypt a file the caller owns or that was shared with them.
///
/// Pass `owner_id` from the shared listing to pick one of several
/// same-named files shared by different users.
#[utoipa::path(
    post,
    path = "/v1/files/decrypt",
    tag = "Files",
    security(("bearer_auth" = [])),
    request_body = DecryptFileRequest,
    responses(
        (status = 200, description = "Decrypted file contents", body = DecryptFileResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No access to a file with this name"),
        (status = 422, description = "File failed integrity verification"),
        (status = 503, description = "Key service unavailable")
    )
)]
pub async fn decrypt_file(
    Auth(user): Auth,
    State(state): State<AppState>,
    payload: Result<Json<DecryptFileRequest>, JsonRejection>,
) -> Result<Json<DecryptFileResponse>, ApiError> {
    let Json(request) = payload?;
    let file = state
        .files
        .decrypt(
            &user.user_id,
            &request.file_name,
            request.owner_id.as_deref(),
        )
        .await?;
    Ok(Json(file.into()))
}

/// Share one of the caller's files with another user, by email.
///
/// Sharing is idempotent: repeating a share answers 200 with
/// `outcome = already_shared`.
#[utoipa::path(
    post,
    path = "/v1/files/share",
    tag = "Files",
    security(("bearer_auth" = [])),
    request_body = ShareFileRequest,
    responses(
        (status = 200, description = "File shared, or already shared", body = ShareFileResponse),
        (status = 400, description = "Invalid file name or email"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller does not own the file"),
        (status = 404, description = "File or user not found")
    )
)]
pub async fn share_file(
    Auth(user): Auth,
    State(state): State<AppState>,
    payload: Result<Json<ShareFileRequest>, JsonRejection>,
) -> Result<Json<ShareFileResponse>, ApiError> {
    let Json(request) = payload?;
    let outcome = state
        .files
        .share(&user.user_id, &request.file_name, &request.email)
        .await?;
    Ok(Json(ShareFileResponse::new(request.file_name, outcome)))
}

/// List the caller's own files.
#[utoipa::path(
    get,
    path = "/v1/files",
    tag = "Files",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Files owned by the caller", body = ListFilesResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn list_files(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<ListFilesResponse>, ApiError> {
    let files = state.files.list_files(&user.user_id)?;
    Ok(Json(files.into_iter().collect()))
}

/// List files other users shared with the caller.
#[utoipa::path(
    get,
    path = "/v1/files/shared",
    tag = "Files",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Files shared with the caller", body = ListFilesResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn list_shared_files(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<ListFilesResponse>, ApiError> {
    let files = state.files.list_shared_files(&user.user_id)?;
    Ok(Json(files.into_iter().collect()))
}
