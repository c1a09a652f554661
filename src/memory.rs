//! In-process stores with the same contracts as the Postgres ones. Back
//! `AppState::fake()` and the tests.

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Mutex;

use crate::auth::repo::CredentialStore;
use crate::auth::repo_types::{NewUser, User};
use crate::error::{AppError, IdentityField};
use crate::scans::repo::ScanLedger;
use crate::scans::repo_types::{NewScan, Scan};

#[derive(Default)]
pub struct MemoryCredentialStore {
    users: Mutex<Vec<User>>,
}

impl MemoryCredentialStore {
    pub async fn len(&self) -> usize {
        self.users.lock().await.len()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn insert(&self, user: NewUser) -> Result<User, AppError> {
        // check and insert under one lock, like a unique index
        let mut users = self.users.lock().await;
        if users.iter().any(|u| u.username == user.username) {
            return Err(AppError::DuplicateIdentity(IdentityField::Username));
        }
        if users.iter().any(|u| u.email == user.email) {
            return Err(AppError::DuplicateIdentity(IdentityField::Email));
        }
        let created = User {
            id: users.len() as i64 + 1,
            email: user.email,
            username: user.username,
            full_name: user.full_name,
            farm_location: user.farm_location,
            password_hash: user.password_hash,
            created_at: OffsetDateTime::now_utc(),
        };
        users.push(created.clone());
        Ok(created)
    }

    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        let users = self.users.lock().await;
        Ok(users.iter().find(|u| u.username == username).cloned())
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let users = self.users.lock().await;
        Ok(users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<User>> {
        let users = self.users.lock().await;
        Ok(users.iter().find(|u| u.id == id).cloned())
    }
}

#[derive(Default)]
pub struct MemoryScanLedger {
    scans: Mutex<Vec<Scan>>,
}

#[async_trait]
impl ScanLedger for MemoryScanLedger {
    async fn append(&self, scan: NewScan) -> anyhow::Result<Scan> {
        let mut scans = self.scans.lock().await;
        let row = Scan {
            id: scans.len() as i64 + 1,
            user_id: scan.user_id,
            image_hash: scan.image_hash,
            disease_name: scan.disease_name,
            confidence: scan.confidence,
            recommendation: scan.recommendation,
            timestamp: OffsetDateTime::now_utc(),
        };
        scans.push(row.clone());
        Ok(row)
    }

    async fn list_by_user(
        &self,
        user_id: i64,
        offset: i64,
        limit: i64,
    ) -> anyhow::Result<Vec<Scan>> {
        let scans = self.scans.lock().await;
        let mut own: Vec<Scan> = scans.iter().filter(|s| s.user_id == user_id).cloned().collect();
        own.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        Ok(own
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }
}
