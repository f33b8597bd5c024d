use crate::domain::ADMIN_USER;
use crate::paths;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Read-only view of the settings the core consults while executing strategies.
pub trait SettingsReader: Send + Sync {
    /// Identity used as the actor of locally issued strategies.
    fn username(&self) -> String;
    fn fullname(&self) -> String;
    /// Work seconds for newly added intervals.
    fn default_work_duration(&self) -> u32;
    /// Rest seconds for newly added intervals.
    fn default_rest_duration(&self) -> u32;
    /// Grace period in seconds before reconciliation seals an expired interval.
    fn auto_seal_after(&self) -> u32;
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LedgerConfig {
    #[serde(default = "default_username")]
    pub username: String,
    #[serde(default = "default_fullname")]
    pub fullname: String,
    #[serde(default)]
    pub pomodoro: PomodoroConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub encryption: EncryptionConfig,
}

fn default_username() -> String {
    "user@local.host".to_string()
}

fn default_fullname() -> String {
    "Local User".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PomodoroConfig {
    #[serde(default = "default_work_duration")]
    pub work_duration: u32,
    #[serde(default = "default_rest_duration")]
    pub rest_duration: u32,
    #[serde(default = "default_auto_seal_after")]
    pub auto_seal_after: u32,
}

impl Default for PomodoroConfig {
    fn default() -> Self {
        Self {
            work_duration: default_work_duration(),
            rest_duration: default_rest_duration(),
            auto_seal_after: default_auto_seal_after(),
        }
    }
}

fn default_work_duration() -> u32 {
    1500
}

fn default_rest_duration() -> u32 {
    300
}

fn default_auto_seal_after() -> u32 {
    5
}

/// Where strategies are persisted.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Default)]
pub struct SourceConfig {
    /// Strategy log file. Default: `~/.focus-ledger/ledger.txt`
    #[serde(default)]
    pub data_file: Option<PathBuf>,
    /// Record every event to a JSONL journal next to the home directory.
    #[serde(default)]
    pub journal: bool,
}

/// Line encryption toggle for the strategy log.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Default)]
pub struct EncryptionConfig {
    #[serde(default)]
    pub enabled: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self::default_config()
    }
}

impl LedgerConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file as YAML: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path` if given, else `~/.focus-ledger/config.yaml` if present, else defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }
        let default_path = paths::default_config_path()?;
        if default_path.exists() {
            Self::load(&default_path)
        } else {
            Ok(Self::default_config())
        }
    }

    pub fn default_config() -> Self {
        const DEFAULT_LEDGER_YAML: &str = include_str!("../ledger.yaml");

        serde_yaml::from_str(DEFAULT_LEDGER_YAML)
            .expect("Failed to parse embedded ledger.yaml - this is a bug in the ledger.yaml file")
    }

    fn validate(&self) -> Result<()> {
        if self.username.is_empty()
            || self
                .username
                .chars()
                .any(|c| c.is_whitespace() || c == ':' || c == ',')
        {
            anyhow::bail!(
                "Username '{}' must be non-empty without spaces, ':' or ','",
                self.username
            );
        }
        if self.username == ADMIN_USER {
            anyhow::bail!("Username '{}' is reserved for the system user", ADMIN_USER);
        }
        if self.pomodoro.work_duration == 0 || self.pomodoro.rest_duration == 0 {
            anyhow::bail!("Pomodoro work and rest durations must be positive");
        }
        Ok(())
    }

    /// Resolved strategy log location.
    pub fn data_file_path(&self) -> Result<PathBuf> {
        match &self.source.data_file {
            Some(path) => Ok(path.clone()),
            None => paths::default_data_path(),
        }
    }
}

impl SettingsReader for LedgerConfig {
    fn username(&self) -> String {
        self.username.clone()
    }

    fn fullname(&self) -> String {
        self.fullname.clone()
    }

    fn default_work_duration(&self) -> u32 {
        self.pomodoro.work_duration
    }

    fn default_rest_duration(&self) -> u32 {
        self.pomodoro.rest_duration
    }

    fn auto_seal_after(&self) -> u32 {
        self.pomodoro.auto_seal_after
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
