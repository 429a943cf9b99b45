//! Configuration management

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::warn;

use crate::classifier::Classifier;
use crate::source::FetchConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Playlist URL or path used when none is given on the command line
    #[serde(default)]
    pub playlist_source: String,
    /// XMLTV URL or path; empty means "use the playlist's x-tvg-url"
    #[serde(default)]
    pub epg_source: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
    // Classifier extensions
    #[serde(default)]
    pub extra_movie_keywords: Vec<String>,
    #[serde(default)]
    pub extra_series_keywords: Vec<String>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_user_agent() -> String { FetchConfig::default().user_agent }
fn default_connect_timeout() -> u64 { 30 }
fn default_read_timeout() -> u64 { 120 }
fn default_max_retries() -> u32 { 3 }
fn default_retry_delay() -> u64 { 2000 }
fn default_log_level() -> String { "warn".to_string() }

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            playlist_source: String::new(),
            epg_source: String::new(),
            user_agent: default_user_agent(),
            connect_timeout_secs: default_connect_timeout(),
            read_timeout_secs: default_read_timeout(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay(),
            extra_movie_keywords: Vec::new(),
            extra_series_keywords: Vec::new(),
            log_level: default_log_level(),
        }
    }
}

impl AppConfig {
    pub fn config_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push("iptv_guide");
        path.push("config.json");
        path
    }

    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Read a config file, falling back to defaults when it is missing or corrupt
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!("Ignoring invalid config {}: {}", path.display(), e);
                Self::default()
            }),
            Err(e) => {
                warn!("Could not read config {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn save(&self) -> io::Result<PathBuf> {
        let path = Self::config_path();
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)
    }

    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            user_agent: self.user_agent.clone(),
            connect_timeout_secs: self.connect_timeout_secs,
            read_timeout_secs: self.read_timeout_secs,
            max_retries: self.max_retries.max(1),
            retry_delay_ms: self.retry_delay_ms,
        }
    }

    pub fn classifier(&self) -> Classifier {
        Classifier::with_extra_keywords(&self.extra_movie_keywords, &self.extra_series_keywords)
    }
}
