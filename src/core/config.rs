use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable that overrides `api.api_key`
pub const API_KEY_ENV: &str = "PORTAL_API_KEY";

/// Environment variable that overrides `server.port`
pub const PORT_ENV: &str = "PORT";

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub avatar: AvatarConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_dist_dir")]
    pub dist_dir: PathBuf,
    #[serde(default = "default_num_threads")]
    pub num_threads: usize,
    /// Cache lifetime for hashed assets, in seconds
    #[serde(default = "default_static_max_age")]
    pub static_max_age: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Shared secret sent as `X-API-Key` on privileged routes
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_hash_window")]
    pub hash_window: usize,
    #[serde(default = "default_friends_refresh")]
    pub friends_refresh_secs: u64,
    #[serde(default = "default_status_refresh")]
    pub status_refresh_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AvatarConfig {
    #[serde(default = "default_avatar_edge")]
    pub max_width: u32,
    #[serde(default = "default_avatar_edge")]
    pub max_height: u32,
    #[serde(default = "default_quality")]
    pub quality: u8,
    #[serde(default = "default_max_size_kb")]
    pub max_size_kb: u64,
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default = "default_console")]
    pub console: bool,
}

// Default value functions
fn default_port() -> u16 {
    3000
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_dist_dir() -> PathBuf {
    PathBuf::from("dist")
}

fn default_num_threads() -> usize {
    num_cpus::get()
}

fn default_static_max_age() -> u64 {
    3600 // 1 hour
}

fn default_base_url() -> String {
    "https://api.booleanclient.online".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

fn default_poll_interval_ms() -> u64 {
    5000
}

fn default_hash_window() -> usize {
    1000
}

fn default_friends_refresh() -> u64 {
    30
}

fn default_status_refresh() -> u64 {
    60
}

fn default_avatar_edge() -> u32 {
    512
}

fn default_quality() -> u8 {
    85
}

fn default_max_size_kb() -> u64 {
    200
}

fn default_max_upload_mb() -> u64 {
    15
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_console() -> bool {
    false
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: default_bind(),
            dist_dir: default_dist_dir(),
            num_threads: default_num_threads(),
            static_max_age: default_static_max_age(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            hash_window: default_hash_window(),
            friends_refresh_secs: default_friends_refresh(),
            status_refresh_secs: default_status_refresh(),
        }
    }
}

impl Default for AvatarConfig {
    fn default() -> Self {
        Self {
            max_width: default_avatar_edge(),
            max_height: default_avatar_edge(),
            quality: default_quality(),
            max_size_kb: default_max_size_kb(),
            max_upload_mb: default_max_upload_mb(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            console: default_console(),
        }
    }
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl SyncConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn friends_refresh(&self) -> Duration {
        Duration::from_secs(self.friends_refresh_secs)
    }

    pub fn status_refresh(&self) -> Duration {
        Duration::from_secs(self.status_refresh_secs)
    }
}

impl Config {
    /// Load configuration from a TOML file, then apply environment overrides
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .context("Failed to parse config file")?;

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .context("Failed to parse config file")?;

        config.validate()?;

        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.is_empty() {
                self.api.api_key = Some(key);
            }
        }

        if let Ok(port) = std::env::var(PORT_ENV) {
            self.server.port = port
                .parse()
                .context(format!("{} must be a port number, got '{}'", PORT_ENV, port))?;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        // Validate server config
        if self.server.port == 0 {
            bail!("Server port must be greater than 0");
        }

        if self.server.num_threads == 0 {
            bail!("num_threads must be greater than 0");
        }

        if self.server.dist_dir.as_os_str().is_empty() {
            bail!("dist_dir must not be empty");
        }

        // Validate api config
        if !self.api.base_url.starts_with("http://") && !self.api.base_url.starts_with("https://") {
            bail!("api.base_url must be an http(s) URL, got '{}'", self.api.base_url);
        }

        if self.api.request_timeout_secs == 0 {
            bail!("request_timeout_secs must be greater than 0");
        }

        // Validate sync config
        if self.sync.poll_interval_ms == 0 {
            bail!("poll_interval_ms must be greater than 0");
        }

        if self.sync.hash_window == 0 {
            bail!("hash_window must be greater than 0");
        }

        if self.sync.friends_refresh_secs == 0 || self.sync.status_refresh_secs == 0 {
            bail!("friends_refresh_secs and status_refresh_secs must be greater than 0");
        }

        // Validate avatar config
        if self.avatar.max_width == 0 || self.avatar.max_height == 0 {
            bail!("avatar max_width and max_height must be greater than 0");
        }

        if self.avatar.quality == 0 || self.avatar.quality > 100 {
            bail!("avatar quality must be between 1 and 100, got {}", self.avatar.quality);
        }

        if self.avatar.max_size_kb == 0 {
            bail!("avatar max_size_kb must be greater than 0");
        }

        // Validate logging config
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            bail!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                self.logging.level
            );
        }

        let valid_formats = ["json", "console"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            bail!(
                "Invalid log format '{}'. Must be one of: json, console",
                self.logging.format
            );
        }

        Ok(())
    }
}
