use std::time::Duration;

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, warn};

use crate::auth::claims::Claims;
use crate::config::JwtConfig;
use crate::error::AppError;

/// Signing and verification keys plus the token policy.
#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub issuer: String,
    pub audience: String,
    pub ttl: Duration,
}

impl JwtKeys {
    pub fn from_config(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            ttl: Duration::from_secs((cfg.ttl_minutes.max(0) as u64) * 60),
        }
    }

    pub fn sign(&self, username: &str) -> anyhow::Result<String> {
        self.sign_at(username, OffsetDateTime::now_utc())
    }

    pub fn sign_at(&self, username: &str, now: OffsetDateTime) -> anyhow::Result<String> {
        let exp = now + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let claims = Claims {
            sub: username.to_owned(),
            iat: now.unix_timestamp(),
            exp: exp.unix_timestamp(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(username = %username, "jwt signed");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        self.verify_at(token, OffsetDateTime::now_utc())
    }

    /// Valid for `iat <= now < exp`; expiry is checked here rather than by
    /// `jsonwebtoken` so there is no leeway.
    pub fn verify_at(&self, token: &str, now: OffsetDateTime) -> Result<Claims, AppError> {
        let mut validation = Validation::default();
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "sub", "iss", "aud"]);
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));

        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            warn!(error = %e, "jwt rejected");
            AppError::Unauthenticated
        })?;

        let now = now.unix_timestamp();
        if now < data.claims.iat {
            warn!(username = %data.claims.sub, "jwt issued in the future");
            return Err(AppError::Unauthenticated);
        }
        if now >= data.claims.exp {
            warn!(username = %data.claims.sub, "jwt expired");
            return Err(AppError::Unauthenticated);
        }
        if data.claims.sub.is_empty() {
            return Err(AppError::Unauthenticated);
        }
        debug!(username = %data.claims.sub, "jwt verified");
        Ok(data.claims)
    }
}
