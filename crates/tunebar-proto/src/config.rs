use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::platform;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub account: AccountConfig,
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub scrobble: ScrobbleConfig,
    #[serde(default)]
    pub player: PlayerConfig,
}

/// Radio-service credentials.  Missing values are prompted for at startup.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AccountConfig {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Base URL of the radio service, without scheme.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Log in over https.  When false every request uses plain http.
    #[serde(default = "default_secure_login")]
    pub secure_login: bool,
    /// Optional proxy for control traffic, e.g. `proxy.example:3128`.
    #[serde(default)]
    pub proxy: Option<String>,
    #[serde(default)]
    pub proxy_type: ProxyType,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProxyType {
    #[default]
    Http,
    Socks5,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrobbleConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub api_secret: String,
    /// Minimum share of a track (in percent) that must be heard before it is scrobbled.
    #[serde(default = "default_scrobble_percent")]
    pub scrobble_percent: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Explicit mpv binary; searched on PATH when unset.
    #[serde(default)]
    pub mpv_path: Option<PathBuf>,
    #[serde(default = "default_volume")]
    pub volume: f32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            secure_login: default_secure_login(),
            proxy: None,
            proxy_type: ProxyType::default(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl Default for ScrobbleConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            username: String::new(),
            password: String::new(),
            api_key: String::new(),
            api_secret: String::new(),
            scrobble_percent: default_scrobble_percent(),
        }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            mpv_path: None,
            volume: default_volume(),
        }
    }
}

impl ServiceConfig {
    /// URL prefix for login requests.
    pub fn login_url(&self) -> String {
        let scheme = if self.secure_login { "https" } else { "http" };
        format!("{}://{}", scheme, self.base_url.trim_end_matches('/'))
    }

    /// URL prefix for everything after login.
    pub fn api_url(&self) -> String {
        format!("http://{}", self.base_url.trim_end_matches('/'))
    }
}

fn default_base_url() -> String {
    "radio.tunebar.example/api/v1".to_string()
}

fn default_secure_login() -> bool {
    true
}

fn default_connect_timeout_secs() -> u64 {
    60
}

fn default_scrobble_percent() -> u32 {
    50
}

fn default_volume() -> f32 {
    1.0
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Read `path`, writing defaults there first when it does not exist yet.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }

    /// Scrobbling needs both the switch and a Last.fm account.
    pub fn scrobbling_enabled(&self) -> bool {
        self.scrobble.enabled && !self.scrobble.username.is_empty()
    }
}
