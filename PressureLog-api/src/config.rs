//! Server configuration read from the environment
//!
//! Every setting has a development default. Production requires a JWT
//! secret and refuses the mock fallback.

use std::env;
use std::fmt;

use thiserror::Error;

use pressure_log_data::database::DatabaseConfig;
use pressure_log_domain::auth::token::{DEFAULT_EXPIRATION_MINUTES, DEFAULT_ISSUER};

/// Secret used to sign tokens outside production when none is configured
const DEV_JWT_SECRET: &str = "pressure-log-development-secret";

/// Longest accepted token lifetime, one year in minutes
const MAX_TOKEN_EXPIRATION_MINUTES: i64 = 60 * 24 * 365;

/// Configuration errors, reported at startup
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable is set to something that cannot be parsed
    #[error("Invalid value '{value}' for {key}")]
    InvalidValue { key: &'static str, value: String },

    /// JWT_SECRET is required in production
    #[error("JWT_SECRET must be set in production")]
    MissingSecret,

    /// MOCK_FALLBACK must never serve fake data in production
    #[error("MOCK_FALLBACK cannot be enabled in production")]
    MockFallbackInProduction,
}

/// Deployment environment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storage adapter selected at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    Sqlite,
}

/// Application configuration
#[derive(Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Listen port
    pub port: u16,
    /// Prefix for every API route, e.g. `/api/v1`
    pub api_prefix: String,
    pub environment: Environment,
    pub storage_backend: StorageBackend,
    pub database: DatabaseConfig,
    /// Serve flagged mock payloads when the store fails (development only)
    pub mock_fallback: bool,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub token_expiration_minutes: i64,
    /// External identities granted the admin role at login
    pub admin_open_ids: Vec<String>,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("api_prefix", &self.api_prefix)
            .field("environment", &self.environment)
            .field("storage_backend", &self.storage_backend)
            .field("database", &self.database)
            .field("mock_fallback", &self.mock_fallback)
            .field("jwt_secret", &"<redacted>")
            .field("jwt_issuer", &self.jwt_issuer)
            .field("token_expiration_minutes", &self.token_expiration_minutes)
            .field("admin_open_ids", &self.admin_open_ids.len())
            .finish()
    }
}

impl Default for AppConfig {
    /// Development configuration with in-memory storage
    fn default() -> Self {
        Self {
            port: 3000,
            api_prefix: "/api/v1".to_string(),
            environment: Environment::Development,
            storage_backend: StorageBackend::Memory,
            database: DatabaseConfig::default(),
            mock_fallback: true,
            jwt_secret: DEV_JWT_SECRET.to_string(),
            jwt_issuer: DEFAULT_ISSUER.to_string(),
            token_expiration_minutes: DEFAULT_EXPIRATION_MINUTES,
            admin_open_ids: Vec::new(),
        }
    }
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        }),
    }
}

fn parse_number<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    })
}

impl AppConfig {
    /// Load the configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load the configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let environment = match lookup("APP_ENV").as_deref().map(str::trim) {
            None | Some("") | Some("development") | Some("dev") => Environment::Development,
            Some("production") | Some("prod") => Environment::Production,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    key: "APP_ENV",
                    value: other.to_string(),
                })
            }
        };
        let production = environment == Environment::Production;

        let port = match lookup("PORT") {
            Some(value) => parse_number::<u16>("PORT", &value)?,
            None => defaults.port,
        };

        let api_prefix = match lookup("API_PREFIX") {
            Some(value) => {
                let prefix = value.trim().trim_end_matches('/').to_string();
                if !prefix.starts_with('/') || prefix.len() < 2 {
                    return Err(ConfigError::InvalidValue {
                        key: "API_PREFIX",
                        value,
                    });
                }
                prefix
            }
            None => defaults.api_prefix,
        };

        let storage_backend = match lookup("STORAGE_BACKEND").as_deref().map(str::trim) {
            None | Some("") if production => StorageBackend::Sqlite,
            None | Some("") => StorageBackend::Memory,
            Some("memory") => StorageBackend::Memory,
            Some("sqlite") => StorageBackend::Sqlite,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    key: "STORAGE_BACKEND",
                    value: other.to_string(),
                })
            }
        };

        let mock_fallback = match lookup("MOCK_FALLBACK") {
            Some(value) => parse_bool("MOCK_FALLBACK", &value)?,
            None => !production,
        };
        if production && mock_fallback {
            return Err(ConfigError::MockFallbackInProduction);
        }

        let jwt_secret = match lookup("JWT_SECRET").filter(|s| !s.trim().is_empty()) {
            Some(secret) => secret,
            None if production => return Err(ConfigError::MissingSecret),
            None => defaults.jwt_secret,
        };

        let jwt_issuer = lookup("JWT_ISSUER")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(defaults.jwt_issuer);

        let token_expiration_minutes = match lookup("ACCESS_TOKEN_EXPIRATION_MINUTES") {
            Some(value) => {
                let minutes = parse_number::<i64>("ACCESS_TOKEN_EXPIRATION_MINUTES", &value)?;
                if !(1..=MAX_TOKEN_EXPIRATION_MINUTES).contains(&minutes) {
                    return Err(ConfigError::InvalidValue {
                        key: "ACCESS_TOKEN_EXPIRATION_MINUTES",
                        value,
                    });
                }
                minutes
            }
            None => defaults.token_expiration_minutes,
        };

        let admin_open_ids = lookup("ADMIN_OPEN_IDS")
            .map(|ids| {
                ids.split(',')
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            port,
            api_prefix,
            environment,
            storage_backend,
            database: DatabaseConfig::from_lookup(&lookup),
            mock_fallback,
            jwt_secret,
            jwt_issuer,
            token_expiration_minutes,
            admin_open_ids,
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    /// Whether storage failures should be answered with mock payloads
    pub fn mock_fallback_enabled(&self) -> bool {
        self.mock_fallback && !self.is_production()
    }

    /// Whether error responses may carry the underlying error text
    pub fn expose_error_details(&self) -> bool {
        !self.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_development_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.port, 3000);
        assert_eq!(config.api_prefix, "/api/v1");
        assert_eq!(config.storage_backend, StorageBackend::Memory);
        assert!(config.mock_fallback_enabled());
        assert!(config.expose_error_details());
    }

    #[test]
    fn test_production_defaults() {
        let config = load(&[("APP_ENV", "production"), ("JWT_SECRET", "s3cret")]).unwrap();
        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.storage_backend, StorageBackend::Sqlite);
        assert!(!config.mock_fallback);
        assert!(!config.expose_error_details());
        assert_eq!(config.jwt_secret, "s3cret");
    }

    #[test]
    fn test_production_requires_secret() {
        assert_eq!(load(&[("APP_ENV", "production")]), Err(ConfigError::MissingSecret));
        assert_eq!(
            load(&[("APP_ENV", "production"), ("JWT_SECRET", "  ")]),
            Err(ConfigError::MissingSecret)
        );
    }

    #[test]
    fn test_production_rejects_mock_fallback() {
        let result = load(&[
            ("APP_ENV", "production"),
            ("JWT_SECRET", "s3cret"),
            ("MOCK_FALLBACK", "true"),
        ]);
        assert_eq!(result, Err(ConfigError::MockFallbackInProduction));
    }

    #[test]
    fn test_explicit_values() {
        let config = load(&[
            ("PORT", "8080"),
            ("API_PREFIX", "/api/v2/"),
            ("STORAGE_BACKEND", "sqlite"),
            ("DB_SQLITE_PATH", "/tmp/bp.db"),
            ("MOCK_FALLBACK", "off"),
            ("JWT_ISSUER", "clinic"),
            ("ACCESS_TOKEN_EXPIRATION_MINUTES", "60"),
            ("ADMIN_OPEN_IDS", "wx-a, wx-b,,"),
        ])
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.api_prefix, "/api/v2");
        assert_eq!(config.storage_backend, StorageBackend::Sqlite);
        assert_eq!(config.database.sqlite_path, "/tmp/bp.db");
        assert!(!config.mock_fallback_enabled());
        assert_eq!(config.jwt_issuer, "clinic");
        assert_eq!(config.token_expiration_minutes, 60);
        assert_eq!(config.admin_open_ids, vec!["wx-a".to_string(), "wx-b".to_string()]);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(load(&[("PORT", "eighty")]), Err(ConfigError::InvalidValue { key: "PORT", .. })));
        assert!(matches!(
            load(&[("API_PREFIX", "api")]),
            Err(ConfigError::InvalidValue { key: "API_PREFIX", .. })
        ));
        assert!(matches!(
            load(&[("STORAGE_BACKEND", "mongo")]),
            Err(ConfigError::InvalidValue { key: "STORAGE_BACKEND", .. })
        ));
        assert!(matches!(
            load(&[("ACCESS_TOKEN_EXPIRATION_MINUTES", "0")]),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            load(&[("ACCESS_TOKEN_EXPIRATION_MINUTES", "9223372036854775807")]),
            Err(ConfigError::InvalidValue { key: "ACCESS_TOKEN_EXPIRATION_MINUTES", .. })
        ));
        assert_eq!(
            load(&[("ACCESS_TOKEN_EXPIRATION_MINUTES", "525600")])
                .unwrap()
                .token_expiration_minutes,
            MAX_TOKEN_EXPIRATION_MINUTES
        );
        assert!(matches!(load(&[("APP_ENV", "staging")]), Err(ConfigError::InvalidValue { key: "APP_ENV", .. })));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = load(&[("JWT_SECRET", "very-private")]).unwrap();
        assert!(!format!("{:?}", config).contains("very-private"));
    }
}
