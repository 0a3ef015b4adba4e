use crate::error::{MemoError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

const CONFIG_FILENAME: &str = "config.json";
const DEFAULT_TABLE: &str = "memos";

/// Configuration for memopad, stored in `config.json` in the config directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MemoConfig {
    /// Base URL of the backend (e.g. "https://xyz.supabase.co")
    #[serde(default)]
    pub url: Option<String>,

    /// Public (anon) API key sent with every request
    #[serde(default)]
    pub anon_key: Option<String>,

    /// Table holding the notes
    #[serde(default = "default_table")]
    pub table: String,
}

fn default_table() -> String {
    DEFAULT_TABLE.to_string()
}

impl Default for MemoConfig {
    fn default() -> Self {
        Self {
            url: None,
            anon_key: None,
            table: default_table(),
        }
    }
}

/// Validated connection settings for a remote gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub url: String,
    pub anon_key: String,
}

impl Endpoint {
    pub fn new(url: impl AsRef<str>, anon_key: impl Into<String>) -> Self {
        Self {
            url: url.as_ref().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
        }
    }
}

impl MemoConfig {
    /// Load config from the given directory, or return defaults if not found
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join(CONFIG_FILENAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path)?;
        let config: MemoConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save config to the given directory
    pub fn save<P: AsRef<Path>>(&self, config_dir: P) -> Result<()> {
        let config_dir = config_dir.as_ref();

        if !config_dir.exists() {
            fs::create_dir_all(config_dir)?;
        }

        let config_path = config_dir.join(CONFIG_FILENAME);
        let content = serde_json::to_string_pretty(self)?;
        fs::write(config_path, content)?;
        Ok(())
    }

    /// Apply `MEMOPAD_*` environment overrides, falling back to the
    /// conventional `SUPABASE_*` names for url and key.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| env::var(key).ok())
    }

    fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = non_empty("MEMOPAD_URL").or_else(|| non_empty("SUPABASE_URL")) {
            self.url = Some(url);
        }
        if let Some(key) = non_empty("MEMOPAD_ANON_KEY").or_else(|| non_empty("SUPABASE_ANON_KEY"))
        {
            self.anon_key = Some(key);
        }
        if let Some(table) = non_empty("MEMOPAD_TABLE") {
            self.table = table;
        }
        self
    }

    /// Connection settings, failing when url or key is missing.
    pub fn endpoint(&self) -> Result<Endpoint> {
        let url = self
            .url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| {
                MemoError::Config(
                    "No backend url configured. Run `memopad config url <URL>` or set MEMOPAD_URL."
                        .to_string(),
                )
            })?;
        let anon_key = self
            .anon_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                MemoError::Config(
                    "No API key configured. Run `memopad config anon-key <KEY>` or set MEMOPAD_ANON_KEY."
                        .to_string(),
                )
            })?;

        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(MemoError::Config(format!(
                "Backend url must start with http:// or https://: {}",
                url
            )));
        }

        Ok(Endpoint::new(url, anon_key))
    }

    /// Set a value by its CLI key name.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "url" => self.url = Some(value.trim().to_string()),
            "anon-key" => self.anon_key = Some(value.trim().to_string()),
            "table" => {
                if value.trim().is_empty() {
                    return Err(MemoError::Config("Table name cannot be empty".to_string()));
                }
                self.table = value.trim().to_string();
            }
            other => return Err(MemoError::Config(format!("Unknown config key: {}", other))),
        }
        Ok(())
    }

    /// Get a value by its CLI key name. The key is masked.
    pub fn get(&self, key: &str) -> Result<String> {
        match key {
            "url" => Ok(self.url.clone().unwrap_or_default()),
            "anon-key" => Ok(self.anon_key.as_deref().map(mask).unwrap_or_default()),
            "table" => Ok(self.table.clone()),
            other => Err(MemoError::Config(format!("Unknown config key: {}", other))),
        }
    }

    pub const KEYS: [&'static str; 3] = ["url", "anon-key", "table"];
}

fn mask(secret: &str) -> String {
    let visible: String = secret.chars().take(6).collect();
    if secret.chars().count() <= 6 {
        "*".repeat(secret.chars().count())
    } else {
        format!("{}…", visible)
    }
}
