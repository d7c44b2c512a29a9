use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};

pub mod settings;

pub use settings::{AutoSaveSettings, SettingsHandle, SettingsSource};

const APP_DOMAIN: &str = "io";
const APP_ORG: &str = "NoteSync";
const APP_NAME: &str = "notesync";

const DEFAULT_AUTOSAVE_DELAY: Duration = Duration::from_secs(5);

pub struct ConfigLoader {
    paths: ConfigPaths,
}

impl ConfigLoader {
    pub fn discover() -> Result<Self> {
        let paths = ConfigPaths::discover()?;
        Ok(Self { paths })
    }

    pub fn from_paths(paths: ConfigPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &ConfigPaths {
        &self.paths
    }

    pub fn load_or_init(&self) -> Result<AppConfig> {
        self.paths.ensure_directories()?;
        if !self.paths.config_file.exists() {
            let mut default_cfg = AppConfig::default();
            default_cfg.post_load(&self.paths);
            self.save(&default_cfg)?;
            return Ok(default_cfg);
        }

        self.load()
    }

    pub fn load(&self) -> Result<AppConfig> {
        let raw = fs::read_to_string(&self.paths.config_file)
            .with_context(|| format!("reading config {}", self.paths.config_file.display()))?;
        let mut cfg: AppConfig = toml::from_str(&raw).context("parsing config toml")?;
        cfg.post_load(&self.paths);
        Ok(cfg)
    }

    /// Writes `cfg` through a temporary file so a crash never leaves a torn config.
    pub fn save(&self, cfg: &AppConfig) -> Result<()> {
        let toml = toml::to_string_pretty(cfg).context("serializing config")?;
        let path = &self.paths.config_file;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
        }
        let tmp_path = path.with_extension("toml.tmp");
        fs::write(&tmp_path, toml.as_bytes())
            .with_context(|| format!("writing temporary config {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path)
            .with_context(|| format!("persisting config {}", path.display()))?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub config_dir: PathBuf,
    pub config_file: PathBuf,
    pub data_dir: PathBuf,
    pub database_path: PathBuf,
}

impl ConfigPaths {
    pub fn discover() -> Result<Self> {
        let override_config = env::var("NOTESYNC_CONFIG").ok().map(PathBuf::from);
        let override_data = env::var("NOTESYNC_DATA").ok().map(PathBuf::from);

        let project_dirs = ProjectDirs::from(APP_DOMAIN, APP_ORG, APP_NAME)
            .context("resolving XDG project directories")?;

        let config_dir = override_config
            .clone()
            .map(|p| {
                if p.is_dir() {
                    p
                } else {
                    p.parent().map(Path::to_path_buf).unwrap_or(p)
                }
            })
            .unwrap_or_else(|| project_dirs.config_dir().to_path_buf());

        let config_file = override_config
            .filter(|p| p.is_file() || p.extension().is_some())
            .unwrap_or_else(|| config_dir.join("config.toml"));

        let data_dir = override_data.unwrap_or_else(|| project_dirs.data_dir().to_path_buf());
        Ok(Self::rooted(config_dir, config_file, data_dir))
    }

    /// Paths for a config file and data directory chosen by the caller.
    pub fn rooted(config_dir: PathBuf, config_file: PathBuf, data_dir: PathBuf) -> Self {
        let database_path = data_dir.join("notes.db");
        Self {
            config_dir,
            config_file,
            data_dir,
            database_path,
        }
    }

    pub fn ensure_directories(&self) -> Result<()> {
        for dir in [&self.config_dir, &self.data_dir] {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating application directory {}", dir.display()))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub auto_save: AutoSaveConfig,
    pub editor: EditorOptions,
    pub session: SessionOptions,
    pub storage: StorageOptions,
}

impl AppConfig {
    fn post_load(&mut self, paths: &ConfigPaths) {
        self.storage.resolve(paths);
        self.auto_save.sanitize();
    }
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoSaveConfig {
    pub enabled: bool,
    #[serde(rename = "delay_seconds")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub delay: Duration,
}

impl Default for AutoSaveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            delay: DEFAULT_AUTOSAVE_DELAY,
        }
    }
}

impl AutoSaveConfig {
    pub fn settings(&self) -> AutoSaveSettings {
        AutoSaveSettings {
            enabled: self.enabled,
            delay: self.delay,
        }
    }

    fn sanitize(&mut self) {
        if self.delay.is_zero() {
            tracing::warn!("autosave delay must be positive, falling back to default");
            self.delay = DEFAULT_AUTOSAVE_DELAY;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorOptions {
    /// Show the save status ("Saving...", "Saved 12s ago") next to the draft.
    pub show_save_status: bool,
}

impl Default for EditorOptions {
    fn default() -> Self {
        Self {
            show_save_status: true,
        }
    }
}

/// What to do with unsaved edits when another note is opened or a new one started.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SwitchPolicy {
    #[default]
    Discard,
    SaveFirst,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionOptions {
    pub switch_policy: SwitchPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageOptions {
    #[serde(skip)]
    pub database_path: PathBuf,
    /// How long a store call may wait on a locked database before failing.
    pub busy_timeout_ms: u64,
    pub wal_autocheckpoint: u32,
}

impl Default for StorageOptions {
    fn default() -> Self {
        Self {
            database_path: PathBuf::new(),
            busy_timeout_ms: 10_000,
            wal_autocheckpoint: 1000,
        }
    }
}

impl StorageOptions {
    fn resolve(&mut self, paths: &ConfigPaths) {
        if self.database_path.as_os_str().is_empty() {
            self.database_path = paths.database_path.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_paths(root: &TempDir) -> ConfigPaths {
        let config_dir = root.path().join("config");
        ConfigPaths::rooted(
            config_dir.clone(),
            config_dir.join("config.toml"),
            root.path().join("data"),
        )
    }

    #[test]
    fn first_run_writes_default_config() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let loader = ConfigLoader::from_paths(temp_paths(&temp));
        let cfg = loader.load_or_init()?;

        assert!(loader.paths().config_file.exists());
        assert!(cfg.auto_save.enabled);
        assert_eq!(cfg.auto_save.delay, Duration::from_secs(5));
        assert_eq!(cfg.session.switch_policy, SwitchPolicy::Discard);
        assert!(cfg.editor.show_save_status);
        assert_eq!(cfg.storage.database_path, loader.paths().database_path);
        Ok(())
    }

    #[test]
    fn parses_partial_config_and_sanitizes_zero_delay() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let loader = ConfigLoader::from_paths(temp_paths(&temp));
        loader.paths().ensure_directories()?;
        fs::write(
            &loader.paths().config_file,
            "[auto_save]\ndelay_seconds = 0\n\n[editor]\nshow_save_status = false\n\n\
             [session]\nswitch_policy = \"save-first\"\n",
        )?;

        let cfg = loader.load()?;
        assert!(cfg.auto_save.enabled);
        assert_eq!(cfg.auto_save.delay, DEFAULT_AUTOSAVE_DELAY);
        assert_eq!(cfg.session.switch_policy, SwitchPolicy::SaveFirst);
        assert!(!cfg.editor.show_save_status);
        assert_eq!(cfg.storage.busy_timeout_ms, 10_000);
        Ok(())
    }

    #[test]
    fn saved_settings_survive_reload() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let loader = ConfigLoader::from_paths(temp_paths(&temp));
        let mut cfg = loader.load_or_init()?;
        cfg.auto_save.enabled = false;
        cfg.auto_save.delay = Duration::from_secs(30);
        loader.save(&cfg)?;

        let reloaded = loader.load()?;
        assert_eq!(reloaded.auto_save, cfg.auto_save);
        Ok(())
    }
}
