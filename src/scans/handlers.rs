use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};

use crate::{
    auth::{extractors::AuthUser, services::current_user},
    error::AppError,
    state::AppState,
};

use super::dto::{CreateScanRequest, Pagination, MAX_PAGE_SIZE};
use super::repo_types::{NewScan, Scan};

pub fn scan_routes() -> Router<AppState> {
    Router::new().route("/scans", get(list_scans).post(create_scan))
}

#[instrument(skip(state, body))]
pub async fn create_scan(
    State(state): State<AppState>,
    AuthUser(username): AuthUser,
    body: Result<Json<CreateScanRequest>, JsonRejection>,
) -> Result<Json<Scan>, AppError> {
    let Json(body) = body?;
    body.validate()?;
    let user = current_user(state.users.as_ref(), &username).await?;

    let scan = state
        .scans
        .append(NewScan {
            user_id: user.id,
            image_hash: body.image_hash.trim().to_ascii_lowercase(),
            disease_name: body.disease_name,
            confidence: body.confidence,
            recommendation: body.recommendation.unwrap_or_default(),
        })
        .await?;

    info!(user_id = user.id, scan_id = scan.id, "scan recorded");
    Ok(Json(scan))
}

#[instrument(skip(state, p))]
pub async fn list_scans(
    State(state): State<AppState>,
    AuthUser(username): AuthUser,
    p: Result<Query<Pagination>, QueryRejection>,
) -> Result<Json<Vec<Scan>>, AppError> {
    let Query(p) = p?;
    let user = current_user(state.users.as_ref(), &username).await?;
    let limit = p.limit.min(MAX_PAGE_SIZE);
    let scans = state
        .scans
        .list_by_user(user.id, i64::from(p.skip), i64::from(limit))
        .await?;
    Ok(Json(scans))
}
