use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::core::repo::ProviderId;
use crate::utils::error::{PdlError, PdlResult};

pub const DEFAULT_THREADS: usize = 10;

/// Persisted user choices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Settings {
    pub source: ProviderId,
    pub save_path: PathBuf,
    pub threads: usize,
    /// per-project branch preference
    pub branches: BTreeMap<String, String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            source: "gitee".to_string(),
            save_path: home::home_dir().unwrap_or_default().join("debug"),
            threads: DEFAULT_THREADS,
            branches: BTreeMap::new(),
        }
    }
}

/// Load and save [`Settings`].
pub trait ConfigStore: Send {
    fn load(&self) -> PdlResult<Settings>;

    fn save(&self, settings: &Settings) -> PdlResult;
}

/// [`ConfigStore`] writing a toml file.
#[derive(Debug, Clone)]
pub struct TomlConfigStore {
    path: PathBuf,
}

impl TomlConfigStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// `~/.pdl/settings.toml`
    pub fn default_path() -> PathBuf {
        home::home_dir()
            .unwrap_or_default()
            .join(".pdl")
            .join("settings.toml")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for TomlConfigStore {
    fn default() -> Self {
        Self::new(Self::default_path())
    }
}

impl ConfigStore for TomlConfigStore {
    fn load(&self) -> PdlResult<Settings> {
        if !self.path.is_file() {
            return Ok(Settings::default());
        }

        let content = std::fs::read_to_string(&self.path)
            .with_context(|| PdlError::ConfigLoadFailed(self.path.display().to_string()))?;
        let settings = toml::from_str(&content)
            .with_context(|| PdlError::ConfigLoadFailed(self.path.display().to_string()))?;
        Ok(settings)
    }

    fn save(&self, settings: &Settings) -> PdlResult {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create directory {} failed", parent.display()))?;
        }
        let content = toml::to_string(settings)?;
        std::fs::write(&self.path, content)
            .with_context(|| format!("write {} failed", self.path.display()))?;
        log::debug!("settings saved to {}", self.path.display());
        Ok(())
    }
}
