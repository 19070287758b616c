//! Engine configuration loaded from a JSON file.
//!
//! Every field except `database_path` has a default, so a minimal file is
//! `{ "database_path": "/var/lib/exclusivity.db" }`.

use crate::keys::{KeyEncoder, OverrideError};
use crate::logging::default_log_level;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const DEFAULT_AUDIT_QUEUE_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub database_path: PathBuf,
    #[serde(default = "default_level")]
    pub log_level: String,
    /// Absolute directory for rotating log files; file logging is off when unset.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
    #[serde(default = "default_audit_queue_capacity")]
    pub audit_queue_capacity: usize,
    #[serde(default = "default_csv_delimiter")]
    pub csv_delimiter: char,
    /// Extra brand overrides, brand name to attribute token.
    #[serde(default)]
    pub brand_overrides: BTreeMap<String, String>,
}

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse(serde_json::Error),
    Invalid(String),
    Override(OverrideError),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "cannot read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config json: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
            Self::Override(err) => write!(f, "invalid config: {err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Override(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

impl From<OverrideError> for ConfigError {
    fn from(value: OverrideError) -> Self {
        Self::Override(value)
    }
}

impl EngineConfig {
    /// Config with defaults for everything but the database path.
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: database_path.into(),
            log_level: default_level(),
            log_dir: None,
            audit_queue_capacity: DEFAULT_AUDIT_QUEUE_CAPACITY,
            csv_delimiter: default_csv_delimiter(),
            brand_overrides: BTreeMap::new(),
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges and the override table.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("`database_path` cannot be empty".to_string()));
        }
        if self.audit_queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "`audit_queue_capacity` must be at least 1".to_string(),
            ));
        }
        let delimiter = self.csv_delimiter;
        if !delimiter.is_ascii()
            || delimiter.is_ascii_alphanumeric()
            || matches!(delimiter, '"' | '\n' | '\r')
        {
            return Err(ConfigError::Invalid(format!(
                "`csv_delimiter` must be an ASCII punctuation, space or tab character other than the quote, got {delimiter:?}"
            )));
        }
        if let Some(dir) = &self.log_dir {
            if !dir.is_absolute() {
                return Err(ConfigError::Invalid(format!(
                    "`log_dir` must be an absolute path, got `{}`",
                    dir.display()
                )));
            }
        }
        self.key_encoder()?;
        Ok(())
    }

    /// Encoder with the built-in overrides plus `brand_overrides`.
    pub fn key_encoder(&self) -> Result<KeyEncoder, OverrideError> {
        KeyEncoder::with_overrides(
            self.brand_overrides
                .iter()
                .map(|(key, target)| (key.as_str(), target.as_str())),
        )
    }

    /// Delimiter as the byte the CSV reader expects. Validated ASCII.
    pub fn csv_delimiter_byte(&self) -> u8 {
        u8::try_from(self.csv_delimiter).unwrap_or(b',')
    }
}

fn default_level() -> String {
    default_log_level().to_string()
}

fn default_audit_queue_capacity() -> usize {
    DEFAULT_AUDIT_QUEUE_CAPACITY
}

fn default_csv_delimiter() -> char {
    ','
}
