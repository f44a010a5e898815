// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::service::ServiceError;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub error_code: &'static str,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    error_code: &'static str,
}

impl ApiError {
    pub fn new(status: StatusCode, error_code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            error_code,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "invalid_request", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "forbidden", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, "already_exists", message)
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, "integrity_error", message)
    }

    pub fn unavailable(error_code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, error_code, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
    }
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::InvalidRequest(msg) => ApiError::bad_request(msg),
            ServiceError::Forbidden => ApiError::forbidden(e.to_string()),
            ServiceError::NotFound => ApiError::not_found(e.to_string()),
            ServiceError::UserNotFound => {
                ApiError::new(StatusCode::NOT_FOUND, "user_not_found", e.to_string())
            }
            ServiceError::AlreadyExists => ApiError::conflict(e.to_string()),
            ServiceError::KeyUnavailable(_) => {
                ApiError::unavailable("key_unavailable", "Encryption key service unavailable")
            }
            ServiceError::DirectoryUnavailable(_) => {
                ApiError::unavailable("directory_unavailable", "User directory unavailable")
            }
            ServiceError::Integrity => ApiError::unprocessable(
                "Decryption failed, the file may have been tampered with",
            ),
            ServiceError::Storage(ref err) => {
                tracing::error!(error = %err, "Storage failure");
                ApiError::internal("Storage error")
            }
            ServiceError::Crypto(ref err) => {
                tracing::error!(error = %err, "Crypto failure");
                ApiError::internal("Encryption error")
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return ApiError::new(
                StatusCode::PAYLOAD_TOO_LARGE,
                "payload_too_large",
                rejection.body_text(),
            );
        }
        ApiError::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
            error_code: self.error_code,
        });
        (self.status, body).into_response()
    }
}
