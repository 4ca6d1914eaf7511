//! App-level settings store: recent-workspaces list and the default
//! auto-lock duration for newly opened workspaces.
//!
//! Grounded on the desktop-pack convention of a small `toml`-backed
//! settings file (`uniclipboard-desktop`, `vfs-desktop`) rather than a
//! dedicated config-framework crate.

use serde::{Deserialize, Serialize};

use crate::session::AutoLockDuration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceSettings {
    #[serde(default)]
    pub recent_workspaces: Vec<String>,
    #[serde(default = "default_auto_lock")]
    pub default_auto_lock: AutoLockDuration,
}

fn default_auto_lock() -> AutoLockDuration {
    AutoLockDuration::FifteenMinutes
}

impl Default for WorkspaceSettings {
    fn default() -> Self {
        Self {
            recent_workspaces: Vec::new(),
            default_auto_lock: default_auto_lock(),
        }
    }
}

impl WorkspaceSettings {
    pub fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Moves `path` to the front of the recent list, capped at 10 entries.
    pub fn touch_recent(&mut self, path: String) {
        self.recent_workspaces.retain(|p| p != &path);
        self.recent_workspaces.insert(0, path);
        self.recent_workspaces.truncate(10);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_serialize_and_parse() {
        let settings = WorkspaceSettings::default();
        let toml = settings.to_toml().unwrap();
        let back = WorkspaceSettings::from_toml(&toml).unwrap();
        assert_eq!(back.default_auto_lock, AutoLockDuration::FifteenMinutes);
    }

    #[test]
    fn touch_recent_deduplicates_and_caps() {
        let mut settings = WorkspaceSettings::default();
        for i in 0..12 {
            settings.touch_recent(format!("/workspaces/{i}"));
        }
        assert_eq!(settings.recent_workspaces.len(), 10);
        assert_eq!(settings.recent_workspaces[0], "/workspaces/11");
    }
}
