use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection}, DefaultBodyLimit, Multipart,
        State,
    },
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use tracing::instrument;

use crate::{auth::extractors::AuthUser, error::AppError, state::AppState};

use super::dto::{AnalysisResponse, Upload};
use super::services::analyze;

pub const FILE_HASH_HEADER: &str = "x-file-hash";

pub fn analysis_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/analyze", post(analyze_upload))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}

/// POST /analyze (multipart, field `file`), optional `X-File-Hash`.
#[instrument(skip(state, headers, mp))]
pub async fn analyze_upload(
    State(state): State<AppState>,
    AuthUser(username): AuthUser,
    headers: HeaderMap,
    mp: Result<Multipart, MultipartRejection>,
) -> Result<Json<AnalysisResponse>, AppError> {
    let mut mp = mp?;
    let limit = state.config.max_upload_bytes;
    let declared_hash = match headers.get(FILE_HASH_HEADER) {
        None => None,
        Some(v) => Some(
            v.to_str()
                .map_err(|_| AppError::BadRequest("X-File-Hash must be ASCII hex".into()))?
                .to_owned(),
        ),
    };

    let mut body = None;
    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit, "malformed multipart body"))?
    {
        if field.name() == Some("file") {
            let data = field
                .bytes()
                .await
                .map_err(|e| multipart_error(e, limit, "could not read file"))?;
            body = Some(data);
            break;
        }
    }
    let body = body.ok_or_else(|| AppError::BadRequest("file is required".into()))?;

    let res = analyze(
        &state,
        &username,
        Upload {
            body,
            declared_hash,
        },
    )
    .await?;
    Ok(Json(res))
}

fn multipart_error(e: MultipartError, limit: usize, context: &str) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::BadRequest(format!("upload exceeds the {limit} byte limit"))
    } else {
        AppError::BadRequest(format!("{context}: {e}"))
    }
}
