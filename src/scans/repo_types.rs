use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

/// One completed analysis. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Scan {
    pub id: i64,
    pub user_id: i64,
    pub image_hash: String,
    pub disease_name: String,
    pub confidence: f64,
    pub recommendation: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewScan {
    pub user_id: i64,
    pub image_hash: String,
    pub disease_name: String,
    pub confidence: f64,
    pub recommendation: String,
}
