use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::AppError;

const DEFAULT_CONFIG_PATH: &str = "/etc/packet-sniffer.conf";
const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 256 * 1024 * 1024;
const DEFAULT_LOG_LEVEL: &str = "info";

/// Interface used for live capture when none is configured.
pub const DEFAULT_INTERFACE: &str = "eth0";

/// Environment variable naming the live capture interface.
pub const INTERFACE_ENV: &str = "NETWORK_INTERFACE";

/// Which browser origins may open a live capture stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OriginPolicy {
    AllowAny,
    AllowList(Vec<String>),
}

impl OriginPolicy {
    /// Parse a comma-separated origin list; `*` or an empty value allows any.
    pub fn parse(value: &str) -> Self {
        let origins: Vec<String> = value
            .split(',')
            .map(|o| o.trim().trim_end_matches('/').to_string())
            .filter(|o| !o.is_empty())
            .collect();

        if origins.is_empty() || origins.iter().any(|o| o == "*") {
            OriginPolicy::AllowAny
        } else {
            OriginPolicy::AllowList(origins)
        }
    }

    /// Requests without an Origin header come from non-browser clients and
    /// are always allowed.
    pub fn allows(&self, origin: Option<&str>) -> bool {
        match (self, origin) {
            (OriginPolicy::AllowAny, _) | (_, None) => true,
            (OriginPolicy::AllowList(list), Some(origin)) => {
                let origin = origin.trim_end_matches('/');
                list.iter().any(|allowed| allowed.eq_ignore_ascii_case(origin))
            }
        }
    }

    /// Value for `Access-Control-Allow-Origin`, if the origin may see responses.
    pub fn allow_origin_header(&self, origin: Option<&str>) -> Option<String> {
        match self {
            OriginPolicy::AllowAny => Some("*".to_string()),
            OriginPolicy::AllowList(_) => origin
                .filter(|o| self.allows(Some(*o)))
                .map(str::to_string),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Raw interface setting; `None` when unset or empty.
    pub interface: Option<String>,
    pub bind_address: IpAddr,
    pub port: u16,
    pub origin_policy: OriginPolicy,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub log_level: String,
}

impl Config {
    pub fn load() -> Result<Self, AppError> {
        let config_path =
            std::env::var("SNIFFER_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        let content = if Path::new(&config_path).exists() {
            Some(std::fs::read_to_string(&config_path)?)
        } else {
            None
        };

        Self::from_sources(content.as_deref(), |key| std::env::var(key).ok())
    }

    /// Build a config from optional `key = value` file content, then apply
    /// overrides from `env`.
    pub fn from_sources<F>(content: Option<&str>, env: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut interface = None;
        let mut bind_address = DEFAULT_BIND_ADDRESS.to_string();
        let mut port = DEFAULT_PORT.to_string();
        let mut allowed_origins = "*".to_string();
        let mut upload_dir = std::env::temp_dir();
        let mut max_upload_bytes = DEFAULT_MAX_UPLOAD_BYTES.to_string();
        let mut log_level = DEFAULT_LOG_LEVEL.to_string();

        for line in content.unwrap_or_default().lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                let value = value.trim().to_string();
                match key.trim() {
                    "interface" => interface = Some(value),
                    "bind_address" => bind_address = value,
                    "port" => port = value,
                    "allowed_origins" => allowed_origins = value,
                    "upload_dir" => upload_dir = PathBuf::from(value),
                    "max_upload_bytes" => max_upload_bytes = value,
                    "log_level" => log_level = value,
                    other => tracing::warn!("Ignoring unknown config key: {}", other),
                }
            }
        }

        // Allow environment variable overrides
        if let Some(val) = env(INTERFACE_ENV) {
            interface = Some(val);
        }
        if let Some(val) = env("SNIFFER_BIND_ADDRESS") {
            bind_address = val;
        }
        if let Some(val) = env("SNIFFER_PORT") {
            port = val;
        }
        if let Some(val) = env("SNIFFER_ALLOWED_ORIGINS") {
            allowed_origins = val;
        }
        if let Some(val) = env("SNIFFER_UPLOAD_DIR") {
            upload_dir = PathBuf::from(val);
        }
        if let Some(val) = env("SNIFFER_MAX_UPLOAD_BYTES") {
            max_upload_bytes = val;
        }
        if let Some(val) = env("SNIFFER_LOG_LEVEL") {
            log_level = val;
        }

        Ok(Config {
            interface: interface.filter(|i| !i.trim().is_empty()),
            bind_address: bind_address
                .parse()
                .map_err(|_| AppError::Config(format!("Invalid bind address: {}", bind_address)))?,
            port: port
                .parse()
                .map_err(|_| AppError::Config(format!("Invalid port: {}", port)))?,
            origin_policy: OriginPolicy::parse(&allowed_origins),
            upload_dir,
            max_upload_bytes: max_upload_bytes.parse().map_err(|_| {
                AppError::Config(format!("Invalid max_upload_bytes: {}", max_upload_bytes))
            })?,
            log_level,
        })
    }

    /// Interface for live capture, falling back to `eth0`.
    pub fn capture_interface(&self) -> &str {
        self.interface.as_deref().unwrap_or(DEFAULT_INTERFACE)
    }

    pub fn tracing_filter(&self) -> String {
        format!("packet_sniffer={}", self.log_level)
    }
}

/// Shared, read-only application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}
