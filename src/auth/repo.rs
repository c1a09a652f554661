use async_trait::async_trait;
use sqlx::PgPool;

use crate::auth::repo_types::{NewUser, User};
use crate::error::{AppError, IdentityField};

/// Durable user records, unique by id, username and email.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Fails with [`AppError::DuplicateIdentity`] when the username or email
    /// is taken. Implementations must enforce this atomically.
    async fn insert(&self, user: NewUser) -> Result<User, AppError>;
    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<User>>;
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<User>>;
}

#[derive(Clone)]
pub struct PgCredentialStore {
    db: PgPool,
}

impl PgCredentialStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

const USER_COLUMNS: &str =
    "id, email, username, full_name, farm_location, password_hash, created_at";

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn insert(&self, user: NewUser) -> Result<User, AppError> {
        let sql = format!(
            r#"
            INSERT INTO users (email, username, full_name, farm_location, password_hash)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(&user.email)
            .bind(&user.username)
            .bind(&user.full_name)
            .bind(&user.farm_location)
            .bind(&user.password_hash)
            .fetch_one(&self.db)
            .await
            .map_err(|e| match unique_violation(&e) {
                Some(field) => AppError::DuplicateIdentity(field),
                None => e.into(),
            })
    }

    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }
}

/// Maps a Postgres unique violation (23505) to the colliding field.
fn unique_violation(e: &sqlx::Error) -> Option<IdentityField> {
    let db = e.as_database_error()?;
    if db.code().as_deref() != Some("23505") {
        return None;
    }
    field_for_constraint(db.constraint())
}

fn field_for_constraint(constraint: Option<&str>) -> Option<IdentityField> {
    match constraint {
        Some("users_username_key") => Some(IdentityField::Username),
        Some("users_email_key") => Some(IdentityField::Email),
        // Unknown constraint on users: still a uniqueness conflict.
        _ => Some(IdentityField::Username),
    }
}
