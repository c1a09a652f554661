use bytes::Bytes;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::scans::repo_types::Scan;

/// One uploaded image plus the digest the client says it sent.
pub struct Upload {
    pub body: Bytes,
    pub declared_hash: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub id: i64,
    pub disease_name: String,
    pub confidence: f64,
    pub recommendation: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub image_hash: String,
}

impl From<Scan> for AnalysisResponse {
    fn from(s: Scan) -> Self {
        Self {
            id: s.id,
            disease_name: s.disease_name,
            confidence: s.confidence,
            recommendation: s.recommendation,
            timestamp: s.timestamp,
            image_hash: s.image_hash,
        }
    }
}
