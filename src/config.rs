use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;

use directories::ProjectDirs;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::host::{BridgeOptions, Device};
use crate::normalize::{Normalizer, DEFAULT_RUNTIME_SRC};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "SITE_PREVIEW_CONFIG";

const DEFAULT_API_BASE: &str = "http://localhost:3001";
const DEFAULT_SESSION_COOKIE: &str = "better-auth.session_token";
const DEFAULT_LISTEN: &str = "127.0.0.1:4173";
const CONFIG_FILE: &str = "config.yaml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid listen address: {0}")]
    InvalidListen(String),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    api_base: Option<String>,
    runtime_src: Option<String>,
    show_editor_panel: Option<bool>,
    device: Option<Device>,
    session_cookie: Option<String>,
    listen: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PreviewConfig {
    pub api_base: Url,
    pub runtime_src: String,
    pub show_editor_panel: bool,
    pub device: Device,
    pub session_cookie: String,
    pub listen: SocketAddr,
}

impl PreviewConfig {
    /// Load from `config_path` if it exists, defaults otherwise.
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let raw = match config_path {
            Some(path) if path.exists() => {
                let contents = fs::read_to_string(path)?;
                serde_yaml::from_str::<Option<RawConfig>>(&contents)?.unwrap_or_default()
            }
            _ => RawConfig::default(),
        };
        Self::from_raw(raw)
    }

    /// `$SITE_PREVIEW_CONFIG`, else the per-user config file.
    pub fn from_env() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_ENV)
            .ok()
            .map(PathBuf::from)
            .or_else(default_config_path);
        Self::load(path)
    }

    fn from_raw(raw: RawConfig) -> Result<Self, ConfigError> {
        let api_base = Url::parse(raw.api_base.as_deref().unwrap_or(DEFAULT_API_BASE))?;
        let runtime_src = raw
            .runtime_src
            .unwrap_or_else(|| DEFAULT_RUNTIME_SRC.to_string());
        Url::parse(&runtime_src)?;
        let listen_raw = raw.listen.unwrap_or_else(|| DEFAULT_LISTEN.to_string());
        let listen = listen_raw
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidListen(listen_raw.clone()))?;

        Ok(Self {
            api_base,
            runtime_src,
            show_editor_panel: raw.show_editor_panel.unwrap_or(true),
            device: raw.device.unwrap_or_default(),
            session_cookie: raw
                .session_cookie
                .unwrap_or_else(|| DEFAULT_SESSION_COOKIE.to_string()),
            listen,
        })
    }

    pub fn normalizer(&self) -> Normalizer {
        Normalizer::new(self.runtime_src.clone())
    }

    pub fn bridge_options(&self) -> BridgeOptions {
        BridgeOptions {
            show_editor_panel: self.show_editor_panel,
            device: self.device,
            normalizer: self.normalizer(),
        }
    }
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            api_base: Url::parse(DEFAULT_API_BASE).expect("default api base"),
            runtime_src: DEFAULT_RUNTIME_SRC.to_string(),
            show_editor_panel: true,
            device: Device::Desktop,
            session_cookie: DEFAULT_SESSION_COOKIE.to_string(),
            listen: DEFAULT_LISTEN.parse().expect("default listen address"),
        }
    }
}

fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("dev", "site-preview", "site-preview")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE))
}
