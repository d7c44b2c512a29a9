use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

use super::AutoSaveConfig;

/// Autosave settings as seen at one decision point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoSaveSettings {
    pub enabled: bool,
    pub delay: Duration,
}

/// Read-only view of the autosave settings. The engine asks for a fresh
/// snapshot on every draft mutation and never caches it.
pub trait SettingsSource: Send + Sync {
    fn auto_save(&self) -> AutoSaveSettings;
}

impl SettingsSource for AutoSaveSettings {
    fn auto_save(&self) -> AutoSaveSettings {
        *self
    }
}

/// Shared autosave settings that a settings collaborator may change while a
/// session is running.
#[derive(Debug, Clone, Default)]
pub struct SettingsHandle {
    inner: Arc<RwLock<AutoSaveConfig>>,
}

impl SettingsHandle {
    pub fn new(config: AutoSaveConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
        }
    }

    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut AutoSaveConfig),
    {
        let mut config = self.inner.write();
        f(&mut config);
        config.sanitize();
    }
}

impl SettingsSource for SettingsHandle {
    fn auto_save(&self) -> AutoSaveSettings {
        self.inner.read().settings()
    }
}
