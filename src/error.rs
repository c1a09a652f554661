//! Error taxonomy shared by every route, rendered as `{ "kind", "detail" }`.

use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::{FormRejection, JsonRejection, QueryRejection};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Which unique key a registration collided with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityField {
    Username,
    Email,
}

impl std::fmt::Display for IdentityField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdentityField::Username => f.write_str("Username"),
            IdentityField::Email => f.write_str("Email"),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0} already registered")]
    DuplicateIdentity(IdentityField),

    #[error("Incorrect username or password")]
    InvalidCredentials,

    #[error("Could not validate credentials")]
    Unauthenticated,

    #[error("File hash mismatch: declared {declared}, computed {computed}")]
    IntegrityMismatch { declared: String, computed: String },

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Stable machine-readable kind, part of the wire contract.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::DuplicateIdentity(_) => "DuplicateIdentity",
            Self::InvalidCredentials => "InvalidCredentials",
            Self::Unauthenticated => "Unauthenticated",
            Self::IntegrityMismatch { .. } => "IntegrityMismatch",
            Self::InvalidImage(_) => "InvalidImage",
            Self::ModelUnavailable(_) => "ModelUnavailable",
            Self::BadRequest(_) => "BadRequest",
            Self::Internal(_) => "Internal",
        }
    }

    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::DuplicateIdentity(_)
            | Self::IntegrityMismatch { .. }
            | Self::InvalidImage(_)
            | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::InvalidCredentials | Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::ModelUnavailable(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    kind: &'static str,
    detail: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let detail = match &self {
            // Never leak internals to the caller.
            Self::Internal(e) => {
                error!(error = ?e, "internal error");
                "Internal server error".to_string()
            }
            Self::ModelUnavailable(reason) => {
                error!(reason = %reason, "analysis refused, model unavailable");
                "Model unavailable".to_string()
            }
            other => other.to_string(),
        };

        let mut res = (
            status,
            Json(ErrorBody {
                kind: self.kind(),
                detail,
            }),
        )
            .into_response();

        if status == StatusCode::UNAUTHORIZED {
            res.headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        res
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Internal(e.into())
    }
}

// Extractor rejections are client errors; keep them in the `{kind, detail}` shape.
impl From<JsonRejection> for AppError {
    fn from(e: JsonRejection) -> Self {
        AppError::BadRequest(e.body_text())
    }
}

impl From<FormRejection> for AppError {
    fn from(e: FormRejection) -> Self {
        AppError::BadRequest(e.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(e: QueryRejection) -> Self {
        AppError::BadRequest(e.body_text())
    }
}

impl From<MultipartRejection> for AppError {
    fn from(e: MultipartRejection) -> Self {
        AppError::BadRequest(e.body_text())
    }
}
