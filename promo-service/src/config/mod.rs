use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::str::FromStr;

use crate::services::notifier::DEFAULT_ACTIVITY_CAPACITY;
use crate::utils::{hash_password, Password};

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Prod,
}

impl FromStr for Environment {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" | "development" => Ok(Environment::Dev),
            "prod" | "production" => Ok(Environment::Prod),
            other => Err(AppError::ConfigError(anyhow::anyhow!(
                "Invalid ENVIRONMENT '{}': expected dev or prod",
                other
            ))),
        }
    }
}

/// Where promo codes, tokens and events are persisted.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    MongoDb,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mongodb" | "mongo" => Ok(StorageBackend::MongoDb),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(AppError::ConfigError(anyhow::anyhow!(
                "Invalid STORAGE_BACKEND '{}': expected mongodb or memory",
                other
            ))),
        }
    }
}

/// Which code applier the redemption engine calls.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ApplierMode {
    Mock,
    Http,
}

impl FromStr for ApplierMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mock" => Ok(ApplierMode::Mock),
            "http" => Ok(ApplierMode::Http),
            other => Err(AppError::ConfigError(anyhow::anyhow!(
                "Invalid APPLIER_MODE '{}': expected mock or http",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PromoConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub environment: Environment,
    pub service_name: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub storage: StorageConfig,
    pub admin: AdminConfig,
    pub tokens: TokenConfig,
    pub applier: ApplierConfig,
    pub cache: CacheConfig,
    pub activity: ActivityConfig,
    pub rate_limit: RateLimitConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub mongodb: MongoConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdminConfig {
    pub username: String,
    /// Argon2 PHC string of the admin password.
    pub password_hash: String,
    pub jwt_secret: String,
    pub session_hours: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenConfig {
    /// Length of generated token strings.
    pub length: usize,
    /// Expiry applied when a token is generated without an explicit one.
    pub default_expiry_days: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApplierConfig {
    pub mode: ApplierMode,
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    pub ttl_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActivityConfig {
    /// Number of events kept in the in-memory recent activity feed.
    pub capacity: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub redeem_attempts: u32,
    pub redeem_window_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    pub allowed_origins: Vec<String>,
}

const DEV_ADMIN_PASSWORD: &str = "admin";

impl PromoConfig {
    pub fn load() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;
        let environment: Environment = env::var("ENVIRONMENT")
            .unwrap_or_else(|_| "dev".to_string())
            .parse()?;
        let is_prod = environment == Environment::Prod;

        let password_hash = match env::var("ADMIN_PASSWORD_HASH") {
            Ok(hash) => hash,
            Err(_) if !is_prod => {
                tracing::warn!("ADMIN_PASSWORD_HASH not set, using the development admin password");
                hash_password(&Password::new(DEV_ADMIN_PASSWORD.to_string()))
                    .map_err(AppError::ConfigError)?
                    .into_string()
            }
            Err(_) => {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "ADMIN_PASSWORD_HASH is required in production but not set"
                )))
            }
        };

        let config = PromoConfig {
            common: common_config,
            environment,
            service_name: get_env("SERVICE_NAME", Some("promo-service"), false)?,
            log_level: get_env("LOG_LEVEL", Some("info"), false)?,
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|s| !s.is_empty()),
            storage: StorageConfig {
                backend: get_env("STORAGE_BACKEND", Some("mongodb"), false)?.parse()?,
                mongodb: MongoConfig {
                    uri: get_env("MONGODB_URI", Some("mongodb://localhost:27017"), is_prod)?,
                    database: get_env("MONGODB_DATABASE", Some("promo_db"), is_prod)?,
                },
            },
            admin: AdminConfig {
                username: get_env("ADMIN_USERNAME", Some("admin"), is_prod)?,
                password_hash,
                jwt_secret: get_env(
                    "ADMIN_JWT_SECRET",
                    Some("dev-only-admin-jwt-secret-change-me"),
                    is_prod,
                )?,
                session_hours: parse_env("ADMIN_SESSION_HOURS", 24)?,
            },
            tokens: TokenConfig {
                length: parse_env("TOKEN_LENGTH", 8)?,
                default_expiry_days: parse_env("TOKEN_DEFAULT_EXPIRY_DAYS", 7)?,
            },
            applier: ApplierConfig {
                mode: get_env("APPLIER_MODE", Some("mock"), is_prod)?.parse()?,
                endpoint: env::var("APPLIER_ENDPOINT").ok().filter(|s| !s.is_empty()),
                api_key: env::var("APPLIER_API_KEY").ok().filter(|s| !s.is_empty()),
            },
            cache: CacheConfig {
                ttl_seconds: parse_env("CACHE_TTL_SECONDS", 300)?,
            },
            activity: ActivityConfig {
                capacity: parse_env("ACTIVITY_CAPACITY", DEFAULT_ACTIVITY_CAPACITY)?,
            },
            rate_limit: RateLimitConfig {
                redeem_attempts: parse_env("RATE_LIMIT_REDEEM_ATTEMPTS", 10)?,
                redeem_window_seconds: parse_env("RATE_LIMIT_REDEEM_WINDOW_SECONDS", 60)?,
            },
            security: SecurityConfig {
                allowed_origins: get_env(
                    "ALLOWED_ORIGINS",
                    Some("http://localhost:3000"),
                    is_prod,
                )?
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.tokens.length == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "TOKEN_LENGTH must be greater than zero"
            )));
        }
        if self.tokens.default_expiry_days <= 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "TOKEN_DEFAULT_EXPIRY_DAYS must be positive"
            )));
        }
        if self.admin.session_hours <= 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "ADMIN_SESSION_HOURS must be positive"
            )));
        }
        if self.activity.capacity == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "ACTIVITY_CAPACITY must be greater than zero"
            )));
        }
        if self.applier.mode == ApplierMode::Http && self.applier.endpoint.is_none() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "APPLIER_ENDPOINT is required when APPLIER_MODE=http"
            )));
        }

        if self.environment == Environment::Prod {
            if self.applier.mode == ApplierMode::Mock {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "The mock code applier cannot be used in production"
                )));
            }
            if self.storage.backend == StorageBackend::Memory {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "In-memory storage cannot be used in production"
                )));
            }
            if self.admin.jwt_secret.len() < 32 {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "ADMIN_JWT_SECRET must be at least 32 characters in production"
                )));
            }
            if self.security.allowed_origins.iter().any(|o| o == "*") {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "Wildcard CORS origin is not allowed in production"
                )));
            }
        }

        Ok(())
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

fn parse_env<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(val) => val.trim().parse().map_err(|e: T::Err| {
            AppError::ConfigError(anyhow::anyhow!("{} has an invalid value '{}': {}", key, val, e))
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PromoConfig {
        PromoConfig {
            common: core_config::Config::default(),
            environment: Environment::Dev,
            service_name: "promo-service".to_string(),
            log_level: "info".to_string(),
            otlp_endpoint: None,
            storage: StorageConfig {
                backend: StorageBackend::Memory,
                mongodb: MongoConfig {
                    uri: "mongodb://localhost:27017".to_string(),
                    database: "promo_db".to_string(),
                },
            },
            admin: AdminConfig {
                username: "admin".to_string(),
                password_hash: "unused".to_string(),
                jwt_secret: "short".to_string(),
                session_hours: 24,
            },
            tokens: TokenConfig {
                length: 8,
                default_expiry_days: 7,
            },
            applier: ApplierConfig {
                mode: ApplierMode::Mock,
                endpoint: None,
                api_key: None,
            },
            cache: CacheConfig { ttl_seconds: 300 },
            activity: ActivityConfig {
                capacity: DEFAULT_ACTIVITY_CAPACITY,
            },
            rate_limit: RateLimitConfig {
                redeem_attempts: 10,
                redeem_window_seconds: 60,
            },
            security: SecurityConfig {
                allowed_origins: vec!["http://localhost:3000".to_string()],
            },
        }
    }

    #[test]
    fn test_dev_config_is_valid() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn test_zero_token_length_rejected() {
        let mut config = sample();
        config.tokens.length = 0;
        assert!(config.validate().is_err());
    }

    fn production() -> PromoConfig {
        let mut config = sample();
        config.environment = Environment::Prod;
        config.admin.jwt_secret = "x".repeat(40);
        config.storage.backend = StorageBackend::MongoDb;
        config.applier.mode = ApplierMode::Http;
        config.applier.endpoint = Some("http://applier:9000/apply".to_string());
        config
    }

    #[test]
    fn test_production_config_is_valid() {
        assert!(production().validate().is_ok());
    }

    #[test]
    fn test_prod_rejects_mock_applier() {
        let mut config = production();
        config.applier.mode = ApplierMode::Mock;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_prod_rejects_memory_storage() {
        let mut config = production();
        config.storage.backend = StorageBackend::Memory;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_prod_rejects_wildcard_origin() {
        let mut config = production();
        config.security.allowed_origins = vec!["*".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_enums() {
        assert_eq!("PROD".parse::<Environment>().unwrap(), Environment::Prod);
        assert_eq!("memory".parse::<StorageBackend>().unwrap(), StorageBackend::Memory);
        assert_eq!("http".parse::<ApplierMode>().unwrap(), ApplierMode::Http);
        assert!("sqlite".parse::<StorageBackend>().is_err());
    }
}
