//! Local UI preferences: read once at boot, written on change, never
//! reconciled with the server.

use std::{fs, path::Path};

use anyhow::Context;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutMode {
    #[default]
    List,
    Board,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub theme: Theme,
    pub show_filters: bool,
    pub layout: LayoutMode,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            theme: Theme::Light,
            show_filters: true,
            layout: LayoutMode::List,
        }
    }
}

impl Preferences {
    /// Missing or unreadable files fall back to defaults.
    pub fn load(path: &Path) -> Self {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Self::default(),
            Err(err) => {
                tracing::warn!(path = %path.display(), "failed to read preferences: {err}");
                return Self::default();
            }
        };

        serde_json::from_str(&raw).unwrap_or_else(|err| {
            tracing::warn!(path = %path.display(), "ignoring malformed preferences: {err}");
            Self::default()
        })
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create preferences directory '{}'", parent.display())
            })?;
        }
        let body = serde_json::to_string_pretty(self)?;
        fs::write(path, body)
            .with_context(|| format!("failed to write preferences '{}'", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let prefs = Preferences::load(&dir.path().join("absent.json"));
        assert_eq!(prefs, Preferences::default());
    }

    #[test]
    fn save_then_load_preserves_choices() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("prefs.json");
        let prefs = Preferences {
            theme: Theme::Dark,
            show_filters: false,
            layout: LayoutMode::Board,
        };
        prefs.save(&path).expect("save");
        assert_eq!(Preferences::load(&path), prefs);
    }

    #[test]
    fn malformed_file_falls_back_and_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("prefs.json");

        fs::write(&path, "{not json").expect("write");
        assert_eq!(Preferences::load(&path), Preferences::default());

        fs::write(&path, r#"{"theme":"dark"}"#).expect("write");
        let prefs = Preferences::load(&path);
        assert_eq!(prefs.theme, Theme::Dark);
        assert!(prefs.show_filters);
    }
}
