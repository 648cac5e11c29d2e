use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use chrono_tz::Tz;
use rand::distributions::Alphanumeric;
use rand::Rng;
use tracing::{info, warn};

const DEFAULT_DATABASE_URL: &str = "sqlite:data/agile.db?mode=rwc";
const DEFAULT_TIMEZONE: &str = "America/Bahia";
const MIN_SECRET_LEN: usize = 16;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },

    #[error("SECRET_KEY must be at least {MIN_SECRET_LEN} bytes")]
    WeakSecret,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    pub totvs_database_url: Option<String>,
    pub secret_key: String,
    pub access_token_hours: i64,
    pub refresh_token_days: i64,
    pub timezone: Tz,
    pub debug: bool,
    pub super_user_password: String,
    pub scheduler_active: bool,
    pub storage_dir: PathBuf,
    pub allowed_origins: Vec<String>,
    pub host: String,
    pub port: u16,
}

impl Config {
    /// Defaults for a given database, without reading the environment.
    pub fn new(database_url: String) -> Self {
        Self {
            database_url,
            max_connections: 5,
            totvs_database_url: None,
            secret_key: random_secret(),
            access_token_hours: 8,
            refresh_token_days: 2,
            timezone: chrono_tz::America::Bahia,
            debug: false,
            super_user_password: "agile_admin".to_string(),
            scheduler_active: false,
            storage_dir: PathBuf::from("storage"),
            allowed_origins: vec!["*".to_string()],
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let debug: bool = try_load("DEBUG", "false")?;
        let default_storage = if debug { "storage" } else { "/storage" };

        let secret_key = load_secret(var("SECRET_KEY"))?;

        let timezone_name: String = try_load("TIMEZONE", DEFAULT_TIMEZONE)?;
        let timezone = timezone_name.parse::<Tz>().map_err(|e| ConfigError::Invalid {
            key: "TIMEZONE",
            message: e.to_string(),
        })?;

        let origins: String = try_load("ALLOWED_ORIGINS", "*")?;

        Ok(Self {
            database_url: try_load("DATABASE_URL", DEFAULT_DATABASE_URL)?,
            max_connections: try_load("DATABASE_MAX_CONNECTIONS", "5")?,
            totvs_database_url: var("TOTVS_DATABASE_URL"),
            secret_key,
            access_token_hours: try_load("ACCESS_TOKEN_EXPIRE_HOURS", "8")?,
            refresh_token_days: try_load("REFRESH_TOKEN_EXPIRE_DAYS", "2")?,
            timezone,
            debug,
            super_user_password: try_load("PASSWORD_SUPER_USER", "agile_admin")?,
            scheduler_active: try_load("SCHEDULER_ACTIVE", "false")?,
            storage_dir: PathBuf::from(try_load::<String>("STORAGE_DIR", default_storage)?),
            allowed_origins: origins
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect(),
            host: try_load("HOST", "0.0.0.0")?,
            port: try_load("PORT", "8000")?,
        })
    }

    /// Directory for a kind of uploaded file.
    pub fn storage_path(&self, sub: &str) -> PathBuf {
        self.storage_dir.join(sub)
    }

    /// Whether the periodic ERP sync should be scheduled.
    pub fn sync_enabled(&self) -> bool {
        self.scheduler_active && self.totvs_database_url.is_some()
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn try_load<T: FromStr>(key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e: T::Err| {
            warn!("Invalid {key} value: {e}");
            ConfigError::Invalid {
                key,
                message: e.to_string(),
            }
        })
}

/// A configured signing key must be long enough; a missing one is generated.
fn load_secret(value: Option<String>) -> Result<String, ConfigError> {
    match value {
        Some(key) if key.len() < MIN_SECRET_LEN => Err(ConfigError::WeakSecret),
        Some(key) => Ok(key),
        None => {
            warn!("SECRET_KEY not set, tokens will not survive a restart");
            Ok(random_secret())
        }
    }
}

fn random_secret() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::new("sqlite::memory:".to_string());
        assert_eq!(config.port, 8000);
        assert_eq!(config.access_token_hours, 8);
        assert_eq!(config.refresh_token_days, 2);
        assert_eq!(config.secret_key.len(), 64);
        assert!(!config.sync_enabled());
    }

    #[test]
    fn test_sync_requires_url_and_flag() {
        let mut config = Config::new("sqlite::memory:".to_string());
        config.scheduler_active = true;
        assert!(!config.sync_enabled());
        config.totvs_database_url = Some("mysql://erp/CorporeRM".to_string());
        assert!(config.sync_enabled());
    }

    #[test]
    fn test_short_secret_is_rejected() {
        assert!(matches!(
            load_secret(Some("too-short".to_string())),
            Err(ConfigError::WeakSecret)
        ));
        let key = "k".repeat(MIN_SECRET_LEN);
        assert_eq!(load_secret(Some(key.clone())).unwrap(), key);
        assert_eq!(load_secret(None).unwrap().len(), 64);
    }

    #[test]
    fn test_from_env_rejects_short_secret() {
        env::set_var("SECRET_KEY", "abc");
        let result = Config::from_env();
        env::remove_var("SECRET_KEY");
        assert!(matches!(result, Err(ConfigError::WeakSecret)));
    }

    #[test]
    fn test_storage_path() {
        let mut config = Config::new("sqlite::memory:".to_string());
        config.storage_dir = PathBuf::from("/storage");
        assert_eq!(config.storage_path("invoices"), PathBuf::from("/storage/invoices"));
    }
}
