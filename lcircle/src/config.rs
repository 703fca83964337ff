//! Application configuration.
//!
//! Loaded from a YAML file merged with `LCIRCLE_*` environment variables
//! (double underscore for nesting, e.g. `LCIRCLE_AUTH__TOKEN_EXPIRY=12h`).
//! Every field has a default so a bare `Config::default()` is a runnable
//! development configuration; `validate` enforces the production
//! requirements before the server starts.

use clap::Parser;
use figment::{
    providers::{Env, Format, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::auth::password::Argon2Params;
use crate::errors::Error;

/// Fallback signing secret used only when none is configured. `validate`
/// rejects it, so it can never survive into a validated deployment.
const DEV_SECRET_KEY: &str = "lcircle-dev-secret-do-not-use-in-production";

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "LCIRCLE_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    #[arg(long)]
    pub validate: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// PostgreSQL connection string. May also arrive via DATABASE_URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,
    /// Secret key for JWT signing (required for production)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<String>,
    /// Authentication and password policy
    pub auth: AuthConfig,
    /// CORS configuration for the browser frontend
    pub cors: CorsConfig,
    /// Request size limits
    pub limits: LimitsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            database_url: None,
            secret_key: None,
            auth: AuthConfig::default(),
            cors: CorsConfig::default(),
            limits: LimitsConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration: YAML file first, `LCIRCLE_*` env vars win.
    pub fn load(path: &str) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Yaml::file(path))
            .merge(Env::prefixed("LCIRCLE_").split("__"))
            .extract()
    }

    /// The JWT signing secret. Falls back to a development-only value that
    /// `validate` refuses, so production always runs with a real key.
    pub fn secret_key(&self) -> &str {
        self.secret_key.as_deref().unwrap_or(DEV_SECRET_KEY)
    }

    pub fn database_url(&self) -> Option<&str> {
        self.database_url.as_deref()
    }

    /// Reject configurations that must not reach production.
    pub fn validate(&self) -> Result<(), Error> {
        if self.secret_key.as_deref().map_or(true, str::is_empty) {
            return Err(Error::BadRequest {
                message: "secret_key must be set (LCIRCLE_SECRET_KEY or config file)".to_string(),
            });
        }
        if self.auth.password.min_length < 6 {
            return Err(Error::BadRequest {
                message: "auth.password.min_length must be at least 6".to_string(),
            });
        }
        if self.auth.token_expiry < Duration::from_secs(60) {
            return Err(Error::BadRequest {
                message: "auth.token_expiry must be at least 1 minute".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    /// JWT token validity window
    #[serde(with = "humantime_serde")]
    pub token_expiry: Duration,
    /// Password validation and hashing parameters
    pub password: PasswordConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_expiry: Duration::from_secs(24 * 60 * 60),
            password: PasswordConfig::default(),
        }
    }
}

/// Password validation rules and argon2 cost parameters.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PasswordConfig {
    /// Minimum password length for regular accounts
    pub min_length: usize,
    /// Minimum password length for admin accounts
    pub admin_min_length: usize,
    /// Maximum password length
    pub max_length: usize,
    /// Argon2 memory cost in KiB (default: 19456 KiB = 19 MB)
    pub argon2_memory_kib: u32,
    /// Argon2 iterations
    pub argon2_iterations: u32,
    /// Argon2 parallelism
    pub argon2_parallelism: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        let params = Argon2Params::default();
        Self {
            min_length: 6,
            admin_min_length: 8,
            max_length: 128,
            argon2_memory_kib: params.memory_kib,
            argon2_iterations: params.iterations,
            argon2_parallelism: params.parallelism,
        }
    }
}

impl PasswordConfig {
    pub fn argon2_params(&self) -> Argon2Params {
        Argon2Params {
            memory_kib: self.argon2_memory_kib,
            iterations: self.argon2_iterations,
            parallelism: self.argon2_parallelism,
        }
    }
}

/// CORS configuration. The API serves exactly one browser frontend.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    /// Allowed browser origin
    pub frontend_origin: String,
    /// Allow credentials (cookies, Authorization header) in CORS requests
    pub allow_credentials: bool,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            frontend_origin: "http://localhost:3000".to_string(),
            allow_credentials: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitsConfig {
    /// Maximum accepted request body size in bytes (default: 10 MB)
    pub max_body_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 10 * 1024 * 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_defaults_are_runnable_but_not_valid() {
        let config = Config::default();
        assert_eq!(config.port, 5000);
        assert_eq!(config.secret_key(), DEV_SECRET_KEY);
        // The dev fallback never validates
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides_yaml() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.yaml",
                r#"
port: 8080
secret_key: from-yaml
auth:
  token_expiry: 12h
"#,
            )?;
            jail.set_env("LCIRCLE_SECRET_KEY", "from-env");

            let config = Config::load("config.yaml").expect("config should load");
            assert_eq!(config.port, 8080);
            assert_eq!(config.secret_key(), "from-env");
            assert_eq!(config.auth.token_expiry, Duration::from_secs(12 * 60 * 60));
            assert!(config.validate().is_ok());
            Ok(())
        });
    }

    #[test]
    fn test_validate_rejects_weak_policy() {
        let mut config = Config {
            secret_key: Some("a-real-secret".to_string()),
            ..Config::default()
        };
        assert!(config.validate().is_ok());

        config.auth.password.min_length = 3;
        assert!(config.validate().is_err());

        config.auth.password.min_length = 6;
        config.auth.token_expiry = Duration::from_secs(10);
        assert!(config.validate().is_err());
    }
}
