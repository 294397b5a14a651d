use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::settings::AppSettings;

const APP_DIR_NAME: &str = "mini_os_helper";
const SETTINGS_FILE: &str = "settings.json";
const NOTES_FILE: &str = "notes.txt";

/// Per-user locations of the persisted documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    pub dir: PathBuf,
}

impl AppPaths {
    /// `<config_dir>/mini_os_helper`, falling back to `~/.config` when the
    /// platform reports no config directory.
    pub fn user() -> Self {
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .unwrap_or_else(|| PathBuf::from(".config"));
        Self::in_dir(base.join(APP_DIR_NAME))
    }

    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn settings_file(&self) -> PathBuf {
        self.dir.join(SETTINGS_FILE)
    }

    pub fn notes_file(&self) -> PathBuf {
        self.dir.join(NOTES_FILE)
    }
}

pub struct SettingsStore {
    path: PathBuf,
    defaults: AppSettings,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Self {
        Self::with_defaults(path, AppSettings::default())
    }

    pub fn with_defaults(path: PathBuf, defaults: AppSettings) -> Self {
        Self { path, defaults }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Never fails: a missing, unreadable or malformed file yields defaults.
    pub fn load(&self) -> AppSettings {
        if !self.path.exists() {
            debug!(event = "settings.load_defaults", path = %self.path.display());
            return self.defaults.clone();
        }

        match self.read_document() {
            Ok(document) => AppSettings::overlay(self.defaults.clone(), &document),
            Err(error) => {
                warn!(
                    event = "settings.load_failed",
                    path = %self.path.display(),
                    error = %format!("{error:#}"),
                    "falling back to default settings"
                );
                self.defaults.clone()
            }
        }
    }

    fn read_document(&self) -> Result<serde_json::Value> {
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("failed reading settings file {}", self.path.display()))?;
        serde_json::from_str(&raw).context("failed parsing settings json")
    }

    pub fn save(&self, settings: &AppSettings) -> Result<()> {
        ensure_parent(&self.path)?;
        let content = serde_json::to_string_pretty(&settings.validated())?;
        fs::write(&self.path, content)
            .with_context(|| format!("failed writing settings file {}", self.path.display()))?;
        debug!(event = "settings.saved", path = %self.path.display());
        Ok(())
    }
}

pub struct NotesStore {
    path: PathBuf,
}

impl NotesStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Missing or unreadable notes read as an empty string.
    pub fn load(&self) -> String {
        if !self.path.exists() {
            return String::new();
        }
        fs::read_to_string(&self.path).unwrap_or_else(|error| {
            warn!(
                event = "notes.load_failed",
                path = %self.path.display(),
                error = %error
            );
            String::new()
        })
    }

    pub fn save(&self, content: &str) -> Result<()> {
        ensure_parent(&self.path)?;
        fs::write(&self.path, content)
            .with_context(|| format!("failed writing notes file {}", self.path.display()))?;
        debug!(event = "notes.saved", path = %self.path.display(), bytes = content.len());
        Ok(())
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    let Some(parent) = path.parent() else {
        anyhow::bail!("{} has no parent directory", path.display())
    };
    fs::create_dir_all(parent)
        .with_context(|| format!("failed creating directory {}", parent.display()))?;
    Ok(())
}
