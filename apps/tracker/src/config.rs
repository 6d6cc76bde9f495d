use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use serde::Deserialize;
use url::Url;

pub const DEFAULT_CONFIG_FILE: &str = "tracker.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_url: String,
    pub api_token: Option<String>,
    pub request_timeout_ms: u64,
    pub search_debounce_ms: u64,
    pub preferences_path: PathBuf,
    pub command_queue_capacity: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8080".into(),
            api_token: None,
            request_timeout_ms: 10_000,
            search_debounce_ms: 300,
            preferences_path: default_preferences_path(),
            command_queue_capacity: 64,
        }
    }
}

impl Settings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let url = Url::parse(&self.server_url)
            .with_context(|| format!("invalid server_url '{}'", self.server_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            anyhow::bail!("server_url must use http or https, got '{}'", url.scheme());
        }
        if self.request_timeout_ms == 0 {
            anyhow::bail!("request_timeout_ms must be positive");
        }
        if self.command_queue_capacity == 0 {
            anyhow::bail!("command_queue_capacity must be positive");
        }
        Ok(())
    }
}

/// Keys accepted in `tracker.toml`. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileSettings {
    server_url: Option<String>,
    api_token: Option<String>,
    request_timeout_ms: Option<u64>,
    search_debounce_ms: Option<u64>,
    preferences_path: Option<PathBuf>,
    command_queue_capacity: Option<usize>,
}

fn default_preferences_path() -> PathBuf {
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(".task_tracker").join("preferences.json"),
        None => PathBuf::from("preferences.json"),
    }
}

pub fn load_settings(config_path: Option<&Path>) -> anyhow::Result<Settings> {
    load_settings_with(config_path, |key| std::env::var(key).ok())
}

/// Defaults, then the config file, then `APP__*` variables from `env`.
/// A missing default config file is fine; a missing explicit one is not.
pub fn load_settings_with(
    config_path: Option<&Path>,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    let (path, required) = match config_path {
        Some(path) => (path.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
    };
    match fs::read_to_string(&path) {
        Ok(raw) => {
            let file_cfg: FileSettings = toml::from_str(&raw)
                .with_context(|| format!("failed to parse {}", path.display()))?;
            apply_file(&mut settings, file_cfg);
        }
        Err(err) if !required && err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read {}", path.display()));
        }
    }

    if let Some(v) = env("APP__SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = env("APP__API_TOKEN") {
        settings.api_token = Some(v);
    }
    if let Some(v) = env("APP__REQUEST_TIMEOUT_MS") {
        settings.request_timeout_ms = v
            .parse()
            .with_context(|| format!("APP__REQUEST_TIMEOUT_MS is not a number: {v}"))?;
    }
    if let Some(v) = env("APP__SEARCH_DEBOUNCE_MS") {
        settings.search_debounce_ms = v
            .parse()
            .with_context(|| format!("APP__SEARCH_DEBOUNCE_MS is not a number: {v}"))?;
    }
    if let Some(v) = env("APP__PREFERENCES_PATH") {
        settings.preferences_path = PathBuf::from(v);
    }
    if let Some(v) = env("APP__COMMAND_QUEUE_CAPACITY") {
        settings.command_queue_capacity = v
            .parse()
            .with_context(|| format!("APP__COMMAND_QUEUE_CAPACITY is not a number: {v}"))?;
    }

    Ok(settings)
}

fn apply_file(settings: &mut Settings, file_cfg: FileSettings) {
    if let Some(v) = file_cfg.server_url {
        settings.server_url = v;
    }
    if let Some(v) = file_cfg.api_token {
        settings.api_token = Some(v);
    }
    if let Some(v) = file_cfg.request_timeout_ms {
        settings.request_timeout_ms = v;
    }
    if let Some(v) = file_cfg.search_debounce_ms {
        settings.search_debounce_ms = v;
    }
    if let Some(v) = file_cfg.preferences_path {
        settings.preferences_path = v;
    }
    if let Some(v) = file_cfg.command_queue_capacity {
        settings.command_queue_capacity = v;
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
