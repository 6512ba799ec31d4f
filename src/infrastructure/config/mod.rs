use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use validator::Validate;

use crate::domain::error::{AppError, Result};

pub const CONFIG_FILE: &str = "Lookup.toml";
pub const ENV_PREFIX: &str = "LOOKUP_";

/// Which column answers point lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyColumn {
    /// Column by label; normalized before use.
    Named(String),
    /// Column by 0-based position in the header row.
    Position { position: usize },
}

impl Default for KeyColumn {
    fn default() -> Self {
        KeyColumn::Named("filiaalnummer".to_string())
    }
}

impl fmt::Display for KeyColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyColumn::Named(name) => write!(f, "{}", name),
            KeyColumn::Position { position } => write!(f, "column #{}", position),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AppConfig {
    /// Tabular file served by the lookup
    #[validate(length(min = 1, message = "data_path must not be empty"))]
    pub data_path: String,

    /// Worksheet name; the first sheet when unset
    #[serde(default)]
    pub sheet: Option<String>,

    #[serde(default)]
    pub key_column: KeyColumn,

    #[validate(length(min = 1, message = "host must not be empty"))]
    pub host: String,

    #[validate(range(min = 1, message = "port must be at least 1"))]
    pub port: u16,

    /// tracing-subscriber filter directive
    pub log_filter: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_path: "klantenlijst.xlsx".to_string(),
            sheet: None,
            key_column: KeyColumn::default(),
            host: "127.0.0.1".to_string(),
            port: 3001,
            log_filter: "info".to_string(),
        }
    }
}

impl AppConfig {
    pub fn data_path(&self) -> PathBuf {
        PathBuf::from(&self.data_path)
    }
}

pub struct ConfigService {
    figment: Figment,
}

impl ConfigService {
    /// Defaults, then `Lookup.toml`, then `LOOKUP_*` environment variables.
    pub fn new() -> Self {
        let _ = dotenvy::dotenv();
        Self::from_file(CONFIG_FILE)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Self {
        let figment = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX));
        Self { figment }
    }

    pub fn load(&self) -> Result<AppConfig> {
        let config: AppConfig = self
            .figment
            .extract()
            .map_err(|e| AppError::ConfigError(e.to_string()))?;

        config
            .validate()
            .map_err(|e| AppError::ConfigError(e.to_string()))?;

        Ok(config)
    }
}

impl Default for ConfigService {
    fn default() -> Self {
        Self::new()
    }
}
