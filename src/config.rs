use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::error::InstallError;

pub const DEFAULT_CONFIG_FILE: &str = "sw-installer.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub paths: PathsSection,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct PathsSection {
    #[serde(default)]
    pub workshop_content: String,
}

impl Settings {
    pub fn workshop_dir(&self) -> &str {
        &self.paths.workshop_content
    }

    pub fn set_workshop_dir(&mut self, path: impl Into<String>) {
        self.paths.workshop_content = path.into();
    }
}

/// Location of the settings file; reads on startup, rewrites on every path change.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    path: Utf8PathBuf,
}

impl ConfigLoader {
    pub fn new(path: Option<&str>) -> Self {
        let path = match path {
            Some(path) => Utf8PathBuf::from(path),
            None => Utf8PathBuf::from(DEFAULT_CONFIG_FILE),
        };
        Self { path }
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Returns `Ok(None)` when no settings file exists yet.
    pub fn load(&self) -> Result<Option<Settings>, InstallError> {
        if !self.path.as_std_path().exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(self.path.as_std_path())
            .map_err(|_| InstallError::ConfigRead(self.path.clone()))?;
        let settings: Settings = serde_json::from_str(&content)
            .map_err(|err| InstallError::ConfigParse(err.to_string()))?;
        tracing::debug!(path = %self.path, "settings loaded");
        Ok(Some(settings))
    }

    pub fn save(&self, settings: &Settings) -> Result<(), InstallError> {
        let write_err = |message: String| InstallError::ConfigWrite {
            path: self.path.clone(),
            message,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_str().is_empty()) {
            fs::create_dir_all(parent.as_std_path()).map_err(|err| write_err(err.to_string()))?;
        }
        let json =
            serde_json::to_string_pretty(settings).map_err(|err| write_err(err.to_string()))?;
        fs::write(self.path.as_std_path(), json).map_err(|err| write_err(err.to_string()))?;
        tracing::info!(path = %self.path, "settings saved");
        Ok(())
    }
}
