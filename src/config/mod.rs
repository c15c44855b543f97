// ABOUTME: Configuration types and parsing for capstan.yml.
// ABOUTME: Handles YAML parsing, validation, and destination merging.

mod init;

pub use init::init_config;

use crate::deploy::{DeployTarget, Ownership};
use crate::error::{Error, Result};
use crate::types::AppName;
use chrono::format::{Item, StrftimeItems};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "capstan.yml";
pub const CONFIG_FILENAME_ALT: &str = "capstan.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".capstan/config.yml";

/// Hooks directory used when the config doesn't name one.
pub const DEFAULT_HOOKS_DIR: &str = ".capstan/hooks";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(deserialize_with = "deserialize_app_name")]
    pub app: AppName,

    pub deploy_dir: PathBuf,

    #[serde(default)]
    pub owner: Option<String>,

    #[serde(default)]
    pub group: Option<String>,

    #[serde(default)]
    pub scratch_dir: Option<PathBuf>,

    #[serde(default)]
    pub hooks_dir: Option<PathBuf>,

    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    #[serde(default = "default_timestamp_format")]
    pub timestamp_format: String,

    #[serde(default)]
    pub destinations: HashMap<String, Destination>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Destination {
    #[serde(default)]
    pub deploy_dir: Option<PathBuf>,

    #[serde(default)]
    pub owner: Option<String>,

    #[serde(default)]
    pub group: Option<String>,

    #[serde(default)]
    pub scratch_dir: Option<PathBuf>,
}

fn default_timeout() -> Duration {
    Duration::from_secs(600)
}

fn default_timestamp_format() -> String {
    "%Y%m%d%H%M%S".to_string()
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    pub fn for_destination(&self, name: &str) -> Result<Config> {
        let dest = self
            .destinations
            .get(name)
            .ok_or_else(|| Error::UnknownDestination(name.to_string()))?;

        let mut merged = self.clone();

        if let Some(ref deploy_dir) = dest.deploy_dir {
            merged.deploy_dir = deploy_dir.clone();
        }

        if dest.owner.is_some() {
            merged.owner = dest.owner.clone();
        }

        if dest.group.is_some() {
            merged.group = dest.group.clone();
        }

        if dest.scratch_dir.is_some() {
            merged.scratch_dir = dest.scratch_dir.clone();
        }

        merged.validate()?;
        Ok(merged)
    }

    fn validate(&self) -> Result<()> {
        if !self.deploy_dir.is_absolute() {
            return Err(Error::InvalidConfig(format!(
                "deploy_dir is not absolute path: {}",
                self.deploy_dir.display()
            )));
        }

        if StrftimeItems::new(&self.timestamp_format).any(|item| matches!(item, Item::Error)) {
            return Err(Error::InvalidConfig(format!(
                "invalid timestamp_format: {}",
                self.timestamp_format
            )));
        }

        Ok(())
    }

    /// The deploy target this config describes.
    pub fn target(&self) -> Result<DeployTarget> {
        Ok(DeployTarget::new(self.app.clone(), &self.deploy_dir)?)
    }

    pub fn ownership(&self) -> Ownership {
        Ownership::new(self.owner.clone(), self.group.clone())
    }

    /// Hooks directory, resolved against the project directory.
    pub fn hooks_dir(&self, project_dir: &Path) -> PathBuf {
        match &self.hooks_dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => project_dir.join(dir),
            None => project_dir.join(DEFAULT_HOOKS_DIR),
        }
    }

    /// Current local time rendered with `timestamp_format`.
    pub fn timestamp_now(&self) -> String {
        chrono::Local::now()
            .format(&self.timestamp_format)
            .to_string()
    }

    pub fn template() -> Self {
        Config {
            app: AppName::new("my-app").unwrap(),
            deploy_dir: PathBuf::from("/srv/apps"),
            owner: None,
            group: None,
            scratch_dir: None,
            hooks_dir: None,
            timeout: default_timeout(),
            timestamp_format: default_timestamp_format(),
            destinations: HashMap::new(),
        }
    }
}

// Custom deserializers

fn deserialize_app_name<'de, D>(deserializer: D) -> std::result::Result<AppName, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    AppName::new(&s).map_err(serde::de::Error::custom)
}
