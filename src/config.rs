use std::env;
use std::time::Duration;
use thiserror::Error;

/// Role created by the migrations. Scoped transactions switch to it so
/// row-level security applies whatever the connecting user is.
pub const DEFAULT_APP_ROLE: &str = "dockpulse_app";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{0} has an invalid value: {1}")]
    Invalid(&'static str, String),
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub jwt_secret: String,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    pub rate_limit_window: Duration,
    pub rate_limit_max: u32,
    pub auth_rate_limit_window: Duration,
    pub auth_rate_limit_max: u32,
    pub trust_proxy: bool,
    pub production: bool,
    pub public_domain: String,
    pub db_max_connections: u32,
    pub db_statement_timeout: Duration,
    pub db_app_role: Option<String>,
    pub platform_admin_key: Option<String>,
}

impl Config {
    /// Defaults for everything except the two required settings.
    pub fn new(database_url: String, jwt_secret: String) -> Self {
        Self {
            database_url,
            port: 3000,
            jwt_secret,
            access_token_ttl: Duration::from_secs(15 * 60),
            refresh_token_ttl: Duration::from_secs(7 * 24 * 60 * 60),
            rate_limit_window: Duration::from_secs(60),
            rate_limit_max: 300,
            auth_rate_limit_window: Duration::from_secs(15 * 60),
            auth_rate_limit_max: 10,
            trust_proxy: false,
            production: false,
            public_domain: "dockpulse.pl".to_string(),
            db_max_connections: 10,
            db_statement_timeout: Duration::from_millis(5000),
            db_app_role: Some(DEFAULT_APP_ROLE.to_string()),
            platform_admin_key: None,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let jwt_secret = required("JWT_SECRET")?;
        if jwt_secret.len() < 32 {
            return Err(ConfigError::Invalid("JWT_SECRET", "must be at least 32 bytes".into()));
        }
        let d = Self::new(required("DATABASE_URL")?, jwt_secret);

        Ok(Self {
            port: parsed("PORT", d.port)?,
            access_token_ttl: secs("ACCESS_TOKEN_TTL_SECS", d.access_token_ttl)?,
            refresh_token_ttl: secs("REFRESH_TOKEN_TTL_SECS", d.refresh_token_ttl)?,
            rate_limit_window: secs("RATE_LIMIT_WINDOW_SECS", d.rate_limit_window)?,
            rate_limit_max: parsed("RATE_LIMIT_MAX", d.rate_limit_max)?,
            auth_rate_limit_window: secs("AUTH_RATE_LIMIT_WINDOW_SECS", d.auth_rate_limit_window)?,
            auth_rate_limit_max: parsed("AUTH_RATE_LIMIT_MAX", d.auth_rate_limit_max)?,
            trust_proxy: env::var("TRUST_PROXY").map(|v| v == "true" || v == "1").unwrap_or(false),
            production: env::var("APP_ENV").map(|v| v == "production").unwrap_or(false),
            public_domain: optional("PUBLIC_DOMAIN").map(|v| v.to_lowercase()).unwrap_or(d.public_domain.clone()),
            db_max_connections: parsed("DB_MAX_CONNECTIONS", d.db_max_connections)?,
            db_statement_timeout: Duration::from_millis(parsed("DB_STATEMENT_TIMEOUT_MS", d.db_statement_timeout.as_millis() as u64)?),
            db_app_role: app_role(d.db_app_role.clone()),
            platform_admin_key: optional("PLATFORM_ADMIN_KEY"),
            ..d
        })
    }
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::Missing(key))
}

fn optional(key: &'static str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Unset keeps the default role; an explicit empty value disables the switch.
fn app_role(default: Option<String>) -> Option<String> {
    match env::var("DATABASE_APP_ROLE") {
        Ok(v) if v.trim().is_empty() => None,
        Ok(v) => Some(v.trim().to_string()),
        Err(_) => default,
    }
}

fn secs(key: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    parsed(key, default.as_secs()).map(Duration::from_secs)
}

fn parsed<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::Invalid(key, raw)),
        Err(_) => Ok(default),
    }
}
