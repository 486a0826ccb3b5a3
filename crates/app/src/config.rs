//! Server configuration
//!
//! Read from `$PLAYZONE_CONFIG`, else `config.toml` in the platform config
//! dir. A missing file means defaults. `PORT`, `PLAYZONE_DATABASE` and
//! `ALLOWED_ORIGINS` override the file.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use playzone_core::auth::SESSION_HOURS;
use playzone_core::workflow::DEFAULT_RETENTION_DAYS;
use playzone_net::{ApiSettings, DEFAULT_PORT};
use serde::Deserialize;

const CONFIG_ENV: &str = "PLAYZONE_CONFIG";
const CONFIG_FILE: &str = "config.toml";
const DATABASE_FILE: &str = "playzone.db";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Invalid value for {key}: {value}")]
    InvalidEnv { key: &'static str, value: String },
    #[error("Could not determine platform directories")]
    NoProjectDirs,
}

/// Account created or promoted to admin at startup
#[derive(Debug, Clone, Deserialize)]
pub struct AdminConfig {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bind: IpAddr,
    pub port: u16,
    /// Defaults to the platform data dir
    pub database: Option<PathBuf>,
    /// Empty allows any origin
    pub allowed_origins: Vec<String>,
    pub session_hours: i64,
    pub booking_retention_days: i64,
    pub cleanup_interval_hours: u64,
    pub expose_reset_codes: bool,
    pub admin: Option<AdminConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            database: None,
            allowed_origins: Vec::new(),
            session_hours: SESSION_HOURS,
            booking_retention_days: DEFAULT_RETENTION_DAYS,
            cleanup_interval_hours: 24,
            expose_reset_codes: false,
            admin: None,
        }
    }
}

impl Config {
    /// Load from the default location and apply environment overrides
    pub fn load() -> Result<Self, ConfigError> {
        let path = match std::env::var_os(CONFIG_ENV) {
            Some(path) => PathBuf::from(path),
            None => project_dirs()?.config_dir().join(CONFIG_FILE),
        };

        let mut config = if path.exists() {
            tracing::info!(path = %path.display(), "Loading config");
            Self::from_file(&path)?
        } else {
            tracing::info!(path = %path.display(), "No config file, using defaults");
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Apply overrides from `lookup`, which is `std::env::var` outside tests
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            self.port = port.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                key: "PORT",
                value: port,
            })?;
        }
        if let Some(database) = lookup("PLAYZONE_DATABASE") {
            self.database = Some(PathBuf::from(database));
        }
        if let Some(origins) = lookup("ALLOWED_ORIGINS") {
            self.allowed_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(String::from)
                .collect();
        }
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    /// Database path, falling back to the platform data dir
    pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.database {
            Some(path) => Ok(path.clone()),
            None => Ok(project_dirs()?.data_dir().join(DATABASE_FILE)),
        }
    }

    pub fn api_settings(&self) -> ApiSettings {
        ApiSettings {
            session_hours: self.session_hours,
            expose_reset_codes: self.expose_reset_codes,
            booking_retention_days: self.booking_retention_days,
        }
    }
}

fn project_dirs() -> Result<ProjectDirs, ConfigError> {
    ProjectDirs::from("mn", "playzone", "playzone").ok_or(ConfigError::NoProjectDirs)
}
