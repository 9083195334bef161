use serde::Serialize;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Minimum accepted length of the token signing secret, in bytes.
pub const MIN_JWT_SECRET_BYTES: usize = 32;

/// Longest accepted token lifetime, in hours (one year).
pub const MAX_JWT_EXPIRY_HOURS: u64 = 24 * 365;

/// Startup configuration errors. Any of these aborts the process before
/// requests are served or migrations run.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing configuration: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },

    #[error("JWT_SECRET must be at least {min} bytes (got {actual})")]
    WeakJwtSecret { min: usize, actual: usize },
}

#[derive(Debug, Clone, Serialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Clone, Serialize)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub max_connections: u32,
    pub connect_timeout_secs: u64,
    pub statement_timeout_secs: u64,
}

impl DatabaseConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn statement_timeout(&self) -> Duration {
        Duration::from_secs(self.statement_timeout_secs)
    }
}

// Hand-written so the password never reaches logs.
impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("name", &self.name)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("max_connections", &self.max_connections)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("statement_timeout_secs", &self.statement_timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ApiConfig {
    pub port: u16,
    pub enable_request_logging: bool,
    pub max_request_size_bytes: usize,
}

#[derive(Clone, Serialize)]
pub struct SecurityConfig {
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub enable_cors: bool,
}

impl fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityConfig")
            .field("jwt_secret", &"<redacted>")
            .field("jwt_expiry_hours", &self.jwt_expiry_hours)
            .field("enable_cors", &self.enable_cors)
            .finish()
    }
}

impl AppConfig {
    /// Build the configuration from the process environment.
    ///
    /// Call once at startup and pass the result by reference; nothing in the
    /// crate reads the environment after this.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = match lookup("APP_ENV").as_deref() {
            Some("production") | Some("prod") => Environment::Production,
            Some("staging") | Some("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Presets first, then the required connection and secret values,
        // then optional overrides.
        let preset = match environment {
            Environment::Production => Preset::production(),
            Environment::Staging => Preset::staging(),
            Environment::Development => Preset::development(),
        };

        let jwt_secret = lookup("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;
        if jwt_secret.len() < MIN_JWT_SECRET_BYTES {
            return Err(ConfigError::WeakJwtSecret {
                min: MIN_JWT_SECRET_BYTES,
                actual: jwt_secret.len(),
            });
        }

        let mut config = Self {
            environment,
            database: DatabaseConfig {
                host: required(&lookup, "DB_SERVER")?,
                port: parsed(&lookup, "DB_PORT")?.unwrap_or(5432),
                name: required(&lookup, "DB_NAME")?,
                user: required(&lookup, "DB_USER")?,
                password: lookup("DB_PASS").unwrap_or_default(),
                max_connections: preset.max_connections,
                connect_timeout_secs: preset.connect_timeout_secs,
                statement_timeout_secs: preset.statement_timeout_secs,
            },
            api: ApiConfig {
                port: 5001,
                enable_request_logging: preset.enable_request_logging,
                max_request_size_bytes: preset.max_request_size_bytes,
            },
            security: SecurityConfig {
                jwt_secret,
                jwt_expiry_hours: preset.jwt_expiry_hours,
                enable_cors: true,
            },
        };

        config.apply_overrides(&lookup)?;
        Ok(config)
    }

    fn apply_overrides<F>(&mut self, lookup: &F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Database overrides
        if let Some(v) = parsed(lookup, "DB_MAX_CONNECTIONS")? {
            self.database.max_connections = v;
        }
        if let Some(v) = parsed(lookup, "DB_CONNECT_TIMEOUT_SECS")? {
            self.database.connect_timeout_secs = v;
        }
        if let Some(v) = parsed(lookup, "DB_STATEMENT_TIMEOUT_SECS")? {
            self.database.statement_timeout_secs = v;
        }

        // API overrides
        if let Some(v) = parsed(lookup, "PORT")? {
            self.api.port = v;
        }
        if let Some(v) = parsed(lookup, "API_ENABLE_REQUEST_LOGGING")? {
            self.api.enable_request_logging = v;
        }
        if let Some(v) = parsed(lookup, "API_MAX_REQUEST_SIZE_BYTES")? {
            self.api.max_request_size_bytes = v;
        }

        // Security overrides
        if let Some(v) = parsed::<_, u64>(lookup, "SECURITY_JWT_EXPIRY_HOURS")? {
            if v == 0 || v > MAX_JWT_EXPIRY_HOURS {
                return Err(ConfigError::Invalid {
                    name: "SECURITY_JWT_EXPIRY_HOURS",
                    value: v.to_string(),
                });
            }
            self.security.jwt_expiry_hours = v;
        }
        if let Some(v) = parsed(lookup, "SECURITY_ENABLE_CORS")? {
            self.security.enable_cors = v;
        }

        Ok(())
    }

    pub fn jwt_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.security.jwt_expiry_hours.min(MAX_JWT_EXPIRY_HOURS) as i64)
    }
}

struct Preset {
    max_connections: u32,
    connect_timeout_secs: u64,
    statement_timeout_secs: u64,
    enable_request_logging: bool,
    max_request_size_bytes: usize,
    jwt_expiry_hours: u64,
}

impl Preset {
    fn development() -> Self {
        Self {
            max_connections: 5,
            connect_timeout_secs: 30,
            statement_timeout_secs: 30,
            enable_request_logging: true,
            max_request_size_bytes: 1024 * 1024, // 1MB
            jwt_expiry_hours: 24 * 7,
        }
    }

    fn staging() -> Self {
        Self {
            max_connections: 10,
            connect_timeout_secs: 10,
            statement_timeout_secs: 15,
            enable_request_logging: true,
            max_request_size_bytes: 512 * 1024,
            jwt_expiry_hours: 24,
        }
    }

    fn production() -> Self {
        Self {
            max_connections: 20,
            connect_timeout_secs: 5,
            statement_timeout_secs: 10,
            enable_request_logging: false,
            max_request_size_bytes: 256 * 1024,
            jwt_expiry_hours: 4,
        }
    }
}

fn required<F>(lookup: &F, name: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::Missing(name)),
    }
}

fn parsed<F, T>(lookup: &F, name: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        None => Ok(None),
        Some(v) => v
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { name, value: v }),
    }
}
