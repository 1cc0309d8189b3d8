use std::{env, fmt::Display, net::SocketAddr, str::FromStr, time::Duration};

use tracing::{info, warn};

use crate::error::ConfigError;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub login_limit: LoginLimitConfig,
}

/// Quota applied to login attempts, per client address.
#[derive(Debug, Clone, PartialEq)]
pub struct LoginLimitConfig {
    pub max_requests: u32,
    pub window: Duration,
}

impl Default for LoginLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 5,
            window: Duration::from_secs(60),
        }
    }
}

impl Config {
    /// Loads `.env` (if any) and reads settings from the environment.
    pub fn load() -> Result<Self, ConfigError> {
        if dotenv::dotenv().is_err() {
            info!("No .env file found, reading configuration from the environment");
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let max_requests: u32 = try_load(&lookup, "LOGIN_RATE_LIMIT_MAX", "5")?;
        let window_secs: u64 = try_load(&lookup, "LOGIN_RATE_LIMIT_WINDOW_SECS", "60")?;

        if max_requests == 0 {
            return Err(ConfigError::Invalid {
                key: "LOGIN_RATE_LIMIT_MAX",
                reason: "must be greater than zero".into(),
            });
        }
        if window_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "LOGIN_RATE_LIMIT_WINDOW_SECS",
                reason: "must be greater than zero".into(),
            });
        }

        let cors_origins: String = try_load(&lookup, "CORS_ORIGINS", "http://localhost:3000")?;

        Ok(Self {
            database_url: try_load(&lookup, "DATABASE_URL", "sqlite://notes.db")?,
            database_max_connections: try_load(&lookup, "DATABASE_MAX_CONNECTIONS", "10")?,
            host: try_load(&lookup, "HOST", "127.0.0.1")?,
            port: try_load(&lookup, "PORT", "3500")?,
            cors_origins: cors_origins
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(String::from)
                .collect(),
            login_limit: LoginLimitConfig {
                max_requests,
                window: Duration::from_secs(window_secs),
            },
        })
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                key: "HOST",
                reason: e.to_string(),
            })
    }
}

fn try_load<F, T>(lookup: &F, key: &'static str, default: &str) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    let raw = lookup(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.trim().parse().map_err(|e: T::Err| {
        warn!("Invalid {key} value: {e}");
        ConfigError::Invalid {
            key,
            reason: e.to_string(),
        }
    })
}
