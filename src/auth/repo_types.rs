use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,                       // assigned by the store
    pub email: String,                 // unique, lowercased
    pub username: String,              // unique
    pub full_name: Option<String>,
    pub farm_location: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,         // Argon2 PHC string, not exposed in JSON
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,    // server-assigned
}

/// Everything needed to create a user; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub full_name: Option<String>,
    pub farm_location: Option<String>,
    pub password_hash: String,
}
