use async_trait::async_trait;
use sqlx::PgPool;

use crate::scans::repo_types::{NewScan, Scan};

/// Append-only scan history. There is deliberately no update or delete.
#[async_trait]
pub trait ScanLedger: Send + Sync {
    /// Writes one record; the timestamp is assigned here, never by the caller.
    async fn append(&self, scan: NewScan) -> anyhow::Result<Scan>;

    /// The owner's scans, newest first.
    async fn list_by_user(&self, user_id: i64, offset: i64, limit: i64)
        -> anyhow::Result<Vec<Scan>>;
}

#[derive(Clone)]
pub struct PgScanLedger {
    db: PgPool,
}

impl PgScanLedger {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ScanLedger for PgScanLedger {
    async fn append(&self, scan: NewScan) -> anyhow::Result<Scan> {
        let row = sqlx::query_as::<_, Scan>(
            r#"
            INSERT INTO scans (user_id, image_hash, disease_name, confidence, recommendation)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, image_hash, disease_name, confidence, recommendation, timestamp
            "#,
        )
        .bind(scan.user_id)
        .bind(&scan.image_hash)
        .bind(&scan.disease_name)
        .bind(scan.confidence)
        .bind(&scan.recommendation)
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }

    async fn list_by_user(
        &self,
        user_id: i64,
        offset: i64,
        limit: i64,
    ) -> anyhow::Result<Vec<Scan>> {
        let rows = sqlx::query_as::<_, Scan>(
            r#"
            SELECT id, user_id, image_hash, disease_name, confidence, recommendation, timestamp
            FROM scans
            WHERE user_id = $1
            ORDER BY timestamp DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }
}
