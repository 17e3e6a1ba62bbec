use std::{fs, path::Path, time::Duration};

use anyhow::Context;
use serde::Deserialize;
use url::Url;

use crate::grouping::DEFAULT_BUCKET_SECS;

pub const DEFAULT_CONFIG_FILE: &str = "companion.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api_base_url: String,
    pub api_token: Option<String>,
    pub request_timeout_secs: u64,
    pub notice_ttl_ms: u64,
    pub group_bucket_secs: i64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:8080/api".into(),
            api_token: None,
            request_timeout_secs: 15,
            notice_ttl_ms: 3_000,
            group_bucket_secs: DEFAULT_BUCKET_SECS,
        }
    }
}

impl Settings {
    pub fn from_toml_str(raw: &str) -> anyhow::Result<Self> {
        toml::from_str(raw).context("invalid companion config")
    }

    /// `APP__*` names win over the plain aliases.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let first = |names: &[&str]| names.iter().find_map(|name| lookup(name));

        if let Some(v) = first(&["APP__API_BASE_URL", "COMPANION_API_URL"]) {
            self.api_base_url = v;
        }
        if let Some(v) = first(&["APP__API_TOKEN", "COMPANION_API_TOKEN"]) {
            self.api_token = Some(v);
        }
        if let Some(v) = first(&["APP__REQUEST_TIMEOUT_SECS"]) {
            if let Ok(parsed) = v.parse() {
                self.request_timeout_secs = parsed;
            }
        }
        if let Some(v) = first(&["APP__NOTICE_TTL_MS"]) {
            if let Ok(parsed) = v.parse() {
                self.notice_ttl_ms = parsed;
            }
        }
        if let Some(v) = first(&["APP__GROUP_BUCKET_SECS"]) {
            if let Ok(parsed) = v.parse::<i64>() {
                if parsed > 0 {
                    self.group_bucket_secs = parsed;
                }
            }
        }
    }

    pub fn api_url(&self) -> anyhow::Result<Url> {
        let url = Url::parse(self.api_base_url.trim())
            .with_context(|| format!("invalid api_base_url '{}'", self.api_base_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            anyhow::bail!("api_base_url must start with http:// or https://");
        }
        Ok(url)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn notice_ttl(&self) -> Duration {
        Duration::from_millis(self.notice_ttl_ms)
    }
}

/// Defaults, then the config file (if present), then the environment.
pub fn load_settings(path: Option<&Path>) -> anyhow::Result<Settings> {
    let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
    let mut settings = match fs::read_to_string(path) {
        Ok(raw) => Settings::from_toml_str(&raw)
            .with_context(|| format!("failed to parse {}", path.display()))?,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Settings::default(),
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read {}", path.display()));
        }
    };
    settings.apply_env_overrides(|name| std::env::var(name).ok());
    Ok(settings)
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
