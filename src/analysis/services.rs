use tracing::{info, warn};

use crate::{
    auth::services::current_user,
    error::AppError,
    inference::decode_image,
    integrity,
    recommend::recommend,
    scans::repo_types::NewScan,
    state::AppState,
};

use super::dto::{AnalysisResponse, Upload};

/// Runs one analysis end to end. Every step is terminal on failure and the
/// ledger is only written once all earlier steps succeeded, so a failed or
/// abandoned request leaves no scan behind.
pub async fn analyze(
    st: &AppState,
    username: &str,
    upload: Upload,
) -> Result<AnalysisResponse, AppError> {
    // 1. authenticate
    let user = current_user(st.users.as_ref(), username).await?;

    // 2. integrity
    let image_hash = integrity::hash(&upload.body);
    if let Some(declared) = upload.declared_hash.as_deref() {
        if !integrity::matches_digest(declared, &image_hash) {
            warn!(user_id = user.id, declared = %declared, computed = %image_hash, "upload hash mismatch");
            return Err(AppError::IntegrityMismatch {
                declared: declared.trim().to_owned(),
                computed: image_hash,
            });
        }
    }

    // 3. decode
    let body = upload.body;
    let image = tokio::task::spawn_blocking(move || decode_image(&body))
        .await
        .map_err(anyhow::Error::from)??;

    // 4. infer
    let prediction = st.model.adapter()?.predict(image).await?;

    // 5. recommend
    let recommendation = recommend(&prediction.label);

    // 6. persist
    let scan = st
        .scans
        .append(NewScan {
            user_id: user.id,
            image_hash,
            disease_name: prediction.label,
            confidence: prediction.confidence,
            recommendation: recommendation.to_owned(),
        })
        .await?;

    info!(
        user_id = user.id,
        scan_id = scan.id,
        label = %scan.disease_name,
        confidence = scan.confidence,
        "analysis recorded"
    );

    // 7. respond
    Ok(scan.into())
}
