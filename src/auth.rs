//! Admin credentials and bearer tokens.
//!
//! Passwords are stored as Argon2 PHC strings. Tokens are HS256 JWTs carrying
//! the admin id (`sub`) and username.

use anyhow::Context;
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};
use uuid::Uuid;

use crate::{app_error::AppError, config::AuthConfig};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdminClaims {
    pub sub: String,
    pub username: String,
    pub iat: i64,
    pub exp: i64,
}

impl AdminClaims {
    pub fn admin_id(&self) -> Result<Uuid, AppError> {
        Uuid::parse_str(&self.sub).map_err(|_| AppError::Unauthorized("Invalid token".into()))
    }
}

pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenKeys {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            ttl: Duration::minutes(config.token_ttl_minutes),
        }
    }

    pub fn issue(&self, admin_id: Uuid, username: &str) -> Result<String, AppError> {
        self.issue_at(admin_id, username, Utc::now())
    }

    pub fn issue_at(
        &self,
        admin_id: Uuid,
        username: &str,
        issued_at: DateTime<Utc>,
    ) -> Result<String, AppError> {
        let claims = AdminClaims {
            sub: admin_id.to_string(),
            username: username.to_string(),
            iat: issued_at.timestamp(),
            exp: (issued_at + self.ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|err| AppError::Other(anyhow::anyhow!("Failed to sign token: {}", err)))
    }

    /// Checks signature and expiry.
    pub fn verify(&self, token: &str) -> Result<AdminClaims, jsonwebtoken::errors::Error> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<AdminClaims>(token, &self.decoding, &validation).map(|data| data.claims)
    }
}

#[instrument(name = "auth::hash_password", skip(password), err(Display))]
pub fn hash_password(password: &str) -> Result<String, AppError> {
    if password.is_empty() {
        return Err(AppError::BadRequest("Password cannot be empty".into()));
    }

    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| {
            error!(error = %err, "Argon2 password hashing failed");
            AppError::Other(anyhow::anyhow!("Password hashing failed: {}", err))
        })
}

/// Returns `Ok(false)` on a mismatch; errors only for a malformed stored hash.
#[instrument(name = "auth::verify_password", skip_all, err(Display))]
pub fn verify_password(stored_hash: &str, password: &str) -> Result<bool, AppError> {
    let parsed = PasswordHash::new(stored_hash).map_err(|err| {
        error!(error = %err, "Stored password hash is malformed");
        AppError::Other(anyhow::anyhow!("Invalid stored password hash: {}", err))
    })?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => {
            debug!("Password mismatch");
            Ok(false)
        }
        Err(err) => Err(AppError::Other(anyhow::anyhow!(
            "Password verification failed: {}",
            err
        ))),
    }
}

/// [`hash_password`] on the blocking pool, off the async workers.
pub async fn hash_password_blocking(password: String) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .context("Password hashing task panicked")?
}

/// [`verify_password`] on the blocking pool, off the async workers.
pub async fn verify_password_blocking(
    stored_hash: String,
    password: String,
) -> Result<bool, AppError> {
    tokio::task::spawn_blocking(move || verify_password(&stored_hash, &password))
        .await
        .context("Password verification task panicked")?
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(secret: &str) -> TokenKeys {
        TokenKeys::new(&AuthConfig {
            jwt_secret: secret.into(),
            token_ttl_minutes: 60,
        })
    }

    #[test]
    fn issued_token_verifies_with_same_secret() {
        let keys = keys("test-secret");
        let admin_id = Uuid::new_v4();
        let token = keys.issue(admin_id, "admin").unwrap();

        let claims = keys.verify(&token).unwrap();
        assert_eq!(claims.sub, admin_id.to_string());
        assert_eq!(claims.username, "admin");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = keys("one").issue(Uuid::new_v4(), "admin").unwrap();
        assert!(keys("two").verify(&token).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let keys = keys("test-secret");
        let token = keys
            .issue_at(Uuid::new_v4(), "admin", Utc::now() - Duration::hours(3))
            .unwrap();
        assert!(keys.verify(&token).is_err());
    }

    #[test]
    fn password_hash_round_trips() {
        let hash = hash_password("secret123").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password(&hash, "secret123").unwrap());
        assert!(!verify_password(&hash, "wrong-password").unwrap());
    }

    #[tokio::test]
    async fn blocking_wrappers_hash_and_verify() {
        let hash = hash_password_blocking("secret123".into()).await.unwrap();

        assert!(verify_password_blocking(hash.clone(), "secret123".into()).await.unwrap());
        assert!(!verify_password_blocking(hash, "secret124".into()).await.unwrap());
    }

    #[test]
    fn empty_password_is_rejected() {
        assert!(matches!(hash_password(""), Err(AppError::BadRequest(_))));
    }
}
