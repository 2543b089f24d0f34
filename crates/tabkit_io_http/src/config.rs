// Configuration module
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tabkit_io_fs::{C_CONTENT_TYPE_DOWNLOAD, N_SIZE_CHUNK_DEFAULT, SpecDownloadOptions};

/// Main server configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub download: DownloadSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_workers")]
    pub workers: usize,
}

/// Download settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadSettings {
    /// Directory every `fileName` is resolved against
    #[serde(default = "default_root_dir")]
    pub root_dir: String,
    /// Copy buffer size in bytes
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_content_type")]
    pub content_type: String,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Per-target level overrides, e.g. `tabkit_io_fs = "debug"`
    #[serde(default)]
    pub targets: BTreeMap<String, String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: default_workers(),
        }
    }
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            root_dir: default_root_dir(),
            chunk_size: default_chunk_size(),
            content_type: default_content_type(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            targets: BTreeMap::new(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

fn default_root_dir() -> String {
    "./files".to_string()
}

fn default_chunk_size() -> usize {
    N_SIZE_CHUNK_DEFAULT
}

fn default_content_type() -> String {
    C_CONTENT_TYPE_DOWNLOAD.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl ServerConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| anyhow::anyhow!("Failed to read config file: {}", e))?;
        Self::from_toml_str(&content)
    }

    /// Parse, apply environment overrides and validate
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let mut config: ServerConfig = toml::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config file: {}", e))?;

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - TABKIT_HOST: Override server.host
    /// - TABKIT_PORT: Override server.port
    /// - TABKIT_DOWNLOAD_ROOT: Override download.root_dir
    pub fn apply_env_overrides(&mut self) -> anyhow::Result<()> {
        use std::env;

        if let Ok(host) = env::var("TABKIT_HOST") {
            self.server.host = host;
        }

        if let Ok(port_str) = env::var("TABKIT_PORT") {
            self.server.port = port_str
                .parse()
                .map_err(|_| anyhow::anyhow!("Invalid TABKIT_PORT value: {}", port_str))?;
        }

        if let Ok(root_dir) = env::var("TABKIT_DOWNLOAD_ROOT") {
            self.download.root_dir = root_dir;
        }

        Ok(())
    }

    /// Validate configuration settings
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port cannot be 0"));
        }
        if self.server.workers == 0 {
            return Err(anyhow::anyhow!("server.workers must be >= 1"));
        }
        if self.download.chunk_size == 0 {
            return Err(anyhow::anyhow!("download.chunk_size must be >= 1"));
        }
        if self.download.content_type.trim().is_empty() {
            return Err(anyhow::anyhow!("download.content_type cannot be empty"));
        }
        if self.download.root_dir.trim().is_empty() {
            return Err(anyhow::anyhow!("download.root_dir cannot be empty"));
        }
        Ok(())
    }

    /// Options handed to the download handlers
    pub fn to_download_options(&self) -> SpecDownloadOptions {
        SpecDownloadOptions {
            path_dir_root: PathBuf::from(&self.download.root_dir),
            size_chunk: self.download.chunk_size,
            content_type: self.download.content_type.clone(),
        }
    }
}
