use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use crate::auth::{
    dto::RegisterRequest,
    jwt::JwtKeys,
    password::{hash_password, verify_dummy, verify_password},
    repo::CredentialStore,
    repo_types::{NewUser, User},
};
use crate::error::{AppError, IdentityField};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Creates a user. The lookups below are a fast path only; the store's
/// uniqueness constraint decides races.
pub async fn register(
    users: &dyn CredentialStore,
    mut payload: RegisterRequest,
) -> Result<User, AppError> {
    payload.email = payload.email.trim().to_lowercase();
    payload.username = payload.username.trim().to_owned();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(AppError::BadRequest("Invalid email".into()));
    }
    if payload.username.is_empty() {
        return Err(AppError::BadRequest("Username is required".into()));
    }
    if payload.password.is_empty() {
        return Err(AppError::BadRequest("Password is required".into()));
    }

    if users.find_by_username(&payload.username).await?.is_some() {
        warn!(username = %payload.username, "username already registered");
        return Err(AppError::DuplicateIdentity(IdentityField::Username));
    }
    if users.find_by_email(&payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(AppError::DuplicateIdentity(IdentityField::Email));
    }

    let password = std::mem::take(&mut payload.password);
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(anyhow::Error::from)??;

    let user = users
        .insert(NewUser {
            email: payload.email,
            username: payload.username,
            full_name: non_blank(payload.full_name),
            farm_location: non_blank(payload.farm_location),
            password_hash,
        })
        .await?;

    info!(user_id = user.id, username = %user.username, "user registered");
    Ok(user)
}

/// Checks a username/password pair and issues a bearer token. Unknown users
/// and wrong passwords are indistinguishable to the caller.
pub async fn authenticate(
    users: &dyn CredentialStore,
    keys: &JwtKeys,
    username: &str,
    password: &str,
) -> Result<String, AppError> {
    let user = users.find_by_username(username.trim()).await?;
    let password = password.to_owned();

    let (user, ok) = tokio::task::spawn_blocking(move || match user {
        Some(u) => {
            let ok = verify_password(&password, &u.password_hash)?;
            Ok::<_, anyhow::Error>((Some(u), ok))
        }
        None => Ok((None, verify_dummy(&password))),
    })
    .await
    .map_err(anyhow::Error::from)??;

    let user = match (user, ok) {
        (Some(u), true) => u,
        (Some(u), false) => {
            warn!(user_id = u.id, "login invalid password");
            return Err(AppError::InvalidCredentials);
        }
        (None, _) => {
            warn!(username = %username, "login unknown username");
            return Err(AppError::InvalidCredentials);
        }
    };

    let token = keys.sign(&user.username)?;
    info!(user_id = user.id, username = %user.username, "user logged in");
    Ok(token)
}

/// Resolves a validated token subject to its user.
pub async fn current_user(users: &dyn CredentialStore, username: &str) -> Result<User, AppError> {
    users.find_by_username(username).await?.ok_or_else(|| {
        warn!(username = %username, "token subject has no user");
        AppError::Unauthenticated
    })
}

fn non_blank(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_owned()).filter(|s| !s.is_empty())
}
