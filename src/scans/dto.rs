use serde::Deserialize;

use crate::error::AppError;

/// Direct ledger write, bypassing inference.
#[derive(Debug, Deserialize)]
pub struct CreateScanRequest {
    pub image_hash: String,
    pub disease_name: String,
    pub confidence: f64,
    #[serde(default)]
    pub recommendation: Option<String>,
}

impl CreateScanRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.image_hash.trim().is_empty() {
            return Err(AppError::BadRequest("image_hash is required".into()));
        }
        if self.disease_name.trim().is_empty() {
            return Err(AppError::BadRequest("disease_name is required".into()));
        }
        if !self.confidence.is_finite() || !(0.0..=1.0).contains(&self.confidence) {
            return Err(AppError::BadRequest(
                "confidence must be between 0 and 1".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub skip: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}
fn default_limit() -> u32 { 10 }

pub const MAX_PAGE_SIZE: u32 = 100;
