use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::ServiceError;
use crate::config::AdminConfig;
use crate::utils::{verify_password, Password, PasswordHashString};

pub const ADMIN_ROLE: &str = "admin";

/// Checks admin login credentials.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn verify(&self, username: &str, password: &Password) -> Result<bool, ServiceError>;
}

/// The single operator account from configuration.
pub struct ConfiguredAdmin {
    username: String,
    password_hash: PasswordHashString,
}

impl ConfiguredAdmin {
    pub fn new(username: String, password_hash: String) -> Self {
        Self {
            username,
            password_hash: PasswordHashString::new(password_hash),
        }
    }
}

#[async_trait]
impl CredentialVerifier for ConfiguredAdmin {
    async fn verify(&self, username: &str, password: &Password) -> Result<bool, ServiceError> {
        let hash = self.password_hash.clone();
        let password = password.clone();

        // Hash even for an unknown username so timing does not leak which part was wrong.
        let password_ok = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| ServiceError::Internal(anyhow::anyhow!("Password check failed: {}", e)))??;

        Ok(password_ok && username == self.username)
    }
}

/// Claims carried by an admin session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminClaims {
    /// Subject (admin username)
    pub sub: String,
    pub role: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    pub jti: String,
}

impl AdminClaims {
    pub fn is_admin(&self) -> bool {
        self.role == ADMIN_ROLE
    }
}

/// HS256 session tokens for the admin API.
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    session_hours: i64,
}

impl JwtService {
    pub fn new(config: &AdminConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            session_hours: config.session_hours,
        }
    }

    /// Issue a session token. Returns the token and its lifetime in seconds.
    pub fn issue(&self, username: &str) -> Result<(String, i64), anyhow::Error> {
        self.issue_with_role(username, ADMIN_ROLE)
    }

    pub fn issue_with_role(&self, username: &str, role: &str) -> Result<(String, i64), anyhow::Error> {
        let now = Utc::now();
        let lifetime = Duration::hours(self.session_hours);

        let claims = AdminClaims {
            sub: username.to_string(),
            role: role.to_string(),
            exp: (now + lifetime).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| anyhow::anyhow!("Failed to encode session token: {}", e))?;

        Ok((token, lifetime.num_seconds()))
    }

    pub fn validate(&self, token: &str) -> Result<AdminClaims, jsonwebtoken::errors::Error> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        decode::<AdminClaims>(token, &self.decoding_key, &validation).map(|data| data.claims)
    }
}
