use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

pub const DEFAULT_DB_URL: &str = "sqlite://pathway.sqlite3";

/// Runtime settings for the `pathway` binary.
///
/// Values come from an optional TOML file and are then overridden by
/// environment variables and flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database_url: String,
    /// Offset used to decide which calendar day an activity falls on.
    pub utc_offset_minutes: i32,
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DB_URL.to_string(),
            utc_offset_minutes: 0,
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a file, or defaults when no file is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(content)?;
        Ok(config)
    }

    /// Apply environment and flag overrides, then normalise the database URL.
    #[must_use]
    pub fn with_overrides(
        mut self,
        database_url: Option<String>,
        utc_offset_minutes: Option<i32>,
        verbose: bool,
    ) -> Self {
        if let Some(url) = database_url.filter(|url| !url.trim().is_empty()) {
            self.database_url = url;
        }
        if let Some(minutes) = utc_offset_minutes {
            self.utc_offset_minutes = minutes;
        }
        if verbose {
            self.log_level = "debug".to_string();
        }
        self.database_url = normalize_sqlite_url(&self.database_url);
        self
    }
}

/// Turn bare paths and `sqlite:` paths into absolute `sqlite://` URLs.
///
/// In-memory URLs are left alone.
#[must_use]
pub fn normalize_sqlite_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if is_in_memory(trimmed) || trimmed.starts_with("sqlite://") {
        return trimmed.to_string();
    }

    let path_str = trimmed.strip_prefix("sqlite:").unwrap_or(trimmed);
    let path = Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn is_in_memory(url: &str) -> bool {
    url == "sqlite::memory:" || (url.starts_with("sqlite:file:") && url.contains("mode=memory"))
}

/// Create the database file and its parent directory if they are missing.
pub fn prepare_sqlite_file(db_url: &str) -> Result<()> {
    if is_in_memory(db_url) {
        return Ok(());
    }

    let Some(path) = db_url.strip_prefix("sqlite://") else {
        bail!("invalid database url: {db_url}");
    };
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        bail!("invalid database url: {db_url}");
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
    }
    Ok(())
}
