//! Configuration management for Tricast

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub telegram: TelegramConfig,
    pub twitter: TwitterConfig,
    pub farcaster: FarcasterConfig,
    pub imgur: ImgurConfig,
    pub bluesky: BlueskyConfig,
    #[serde(default)]
    pub relay: RelayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: String,
    /// User ids allowed to post through the relay. Empty or absent means
    /// every user is accepted.
    #[serde(default)]
    pub allowed_user_ids: Vec<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwitterConfig {
    pub bearer_token: String,
    #[serde(default = "default_twitter_api_base")]
    pub api_base: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FarcasterConfig {
    /// Full value of the Authorization header expected by the cast endpoint.
    pub auth_header: String,
    #[serde(default = "default_farcaster_api_base")]
    pub api_base: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImgurConfig {
    pub client_id: String,
    #[serde(default = "default_imgur_api_base")]
    pub api_base: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlueskyConfig {
    pub handle: String,
    pub app_password: String,
    #[serde(default = "default_bluesky_service")]
    pub service: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// How long to wait for a trailing image before a text-only publish.
    #[serde(default = "default_debounce_secs")]
    pub debounce_secs: u64,
    /// Attempt budget per platform for rate-limited calls.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            debounce_secs: default_debounce_secs(),
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_twitter_api_base() -> String {
    "https://api.twitter.com".to_string()
}

fn default_farcaster_api_base() -> String {
    "https://api.warpcast.com".to_string()
}

fn default_imgur_api_base() -> String {
    "https://api.imgur.com".to_string()
}

fn default_bluesky_service() -> String {
    "https://bsky.social".to_string()
}

fn default_debounce_secs() -> u64 {
    36
}

fn default_max_attempts() -> u32 {
    3
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        let config_path = resolve_config_path()?;
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Read)?;
        let config: Config = toml::from_str(&content).map_err(ConfigError::Parse)?;
        Ok(config)
    }
}

/// Resolve the configuration file path following XDG Base Directory spec
pub fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("TRICAST_CONFIG") {
        return Ok(PathBuf::from(shellexpand::tilde(&path).to_string()));
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("tricast").join("config.toml"))
}
