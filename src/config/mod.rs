//! Configuration management
//!
//! This module provides YAML-based configuration management with support for:
//! - Environment variable overrides
//! - Multiple configuration file locations
//! - Default values for all settings
//! - Membership timestamp conventions and export presentation

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub backend: BackendConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub membership: MembershipConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

/// Membership backend connection configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    pub url: String,
    /// Timeout in seconds (supports both timeout_secs and timeout field names)
    #[serde(default = "default_timeout", alias = "timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_ssl_verify")]
    pub ssl_verify: bool,
    /// Bearer credential issued by the external auth service
    #[serde(default)]
    pub token: Option<String>,
}

fn default_backend_url() -> String {
    "http://127.0.0.1:3000".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_ssl_verify() -> bool {
    true
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: default_backend_url(),
            timeout_secs: default_timeout(),
            ssl_verify: default_ssl_verify(),
            token: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    /// Log output target (console or file)
    #[serde(default = "default_log_target")]
    pub target: LogTarget,
    /// Directory for log files (used when target is "file")
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    /// Log file name prefix (default: "quota-console")
    #[serde(default = "default_log_prefix")]
    pub log_prefix: String,
    /// Enable daily log rotation
    #[serde(default = "default_log_rotation")]
    pub daily_rotation: bool,
}

/// Log output target
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogTarget {
    /// Log to stderr
    #[default]
    Console,
    /// Log to file with optional rotation
    File,
    /// Log to both console and file
    Both,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

fn default_log_target() -> LogTarget {
    LogTarget::Console
}

fn default_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|p| p.join("quota-console/logs"))
        .unwrap_or_else(|| PathBuf::from("logs"))
}

fn default_log_prefix() -> String {
    "quota-console".to_string()
}

fn default_log_rotation() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            target: default_log_target(),
            log_dir: default_log_dir(),
            log_prefix: default_log_prefix(),
            daily_rotation: default_log_rotation(),
        }
    }
}

/// Membership mutation conventions
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MembershipConfig {
    /// Hours added to effective/expire times before they are sent
    ///
    /// The backend expects inputs pre-shifted into its zone. Set to 0 to send
    /// instants unchanged.
    #[serde(default = "default_timestamp_shift_hours")]
    pub timestamp_shift_hours: i64,
    /// UTC offset attached to date-times typed without one
    #[serde(default = "default_local_utc_offset_hours")]
    pub local_utc_offset_hours: i32,
    /// Reject windows whose effective time is not before the expire time
    #[serde(default)]
    pub enforce_window_order: bool,
}

fn default_timestamp_shift_hours() -> i64 {
    8
}

fn default_local_utc_offset_hours() -> i32 {
    8
}

impl Default for MembershipConfig {
    fn default() -> Self {
        Self {
            timestamp_shift_hours: default_timestamp_shift_hours(),
            local_utc_offset_hours: default_local_utc_offset_hours(),
            enforce_window_order: false,
        }
    }
}

/// Spreadsheet export configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExportConfig {
    /// Directory the workbook is written to
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// UTC offset used to render event timestamps, daily dates and the file date
    #[serde(default = "default_export_utc_offset_hours")]
    pub utc_offset_hours: i32,
    /// Divisor applied to stored usage figures
    #[serde(default = "default_usage_divisor")]
    pub usage_divisor: f64,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_export_utc_offset_hours() -> i32 {
    8
}

fn default_usage_divisor() -> f64 {
    10.0
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            utc_offset_hours: default_export_utc_offset_hours(),
            usage_divisor: default_usage_divisor(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            logging: LoggingConfig::default(),
            membership: MembershipConfig::default(),
            export: ExportConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values
    /// 2. Configuration file (YAML), `explicit_path` first when given
    /// 3. Environment variables (prefixed with QUOTA_CONSOLE_)
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        // Try to load .env file if it exists
        let _ = dotenvy::dotenv();

        let config_path = explicit_path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var("QUOTA_CONSOLE_CONFIG").map(PathBuf::from).ok())
            .or_else(Self::find_config_file);

        let mut config = match config_path {
            Some(ref path) if path.exists() => Self::load_file(path)?,
            Some(ref path) => {
                anyhow::bail!("Config file not found: {:?}", path);
            }
            None => AppConfig::default(),
        };

        // Apply environment variable overrides
        config.apply_env_overrides();

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Parse a single YAML file without env overrides
    pub fn load_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        serde_norway::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Find the configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let paths = [
            // Current directory
            PathBuf::from("quota-console.yaml"),
            PathBuf::from("config/quota-console.yaml"),
            // System config directory
            PathBuf::from("/etc/quota-console/config.yaml"),
            // User config directory
            dirs::config_dir()
                .map(|p| p.join("quota-console/config.yaml"))
                .unwrap_or_default(),
        ];

        paths.into_iter().find(|p| p.exists())
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // Backend overrides
        if let Ok(url) = std::env::var("QUOTA_CONSOLE_API_URL") {
            self.backend.url = url;
        }
        if let Ok(token) = std::env::var("QUOTA_CONSOLE_TOKEN") {
            if !token.trim().is_empty() {
                self.backend.token = Some(token);
            }
        }
        if let Ok(timeout) = std::env::var("QUOTA_CONSOLE_TIMEOUT") {
            if let Ok(t) = timeout.parse() {
                self.backend.timeout_secs = t;
            }
        }

        // Logging overrides
        if let Ok(level) = std::env::var("RUST_LOG") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("QUOTA_CONSOLE_LOG_FORMAT") {
            self.logging.format = match format.to_lowercase().as_str() {
                "json" => LogFormat::Json,
                "compact" => LogFormat::Compact,
                _ => LogFormat::Pretty,
            };
        }

        // Export overrides
        if let Ok(dir) = std::env::var("QUOTA_CONSOLE_EXPORT_DIR") {
            self.export.output_dir = PathBuf::from(dir);
        }

        // Membership overrides
        if let Ok(hours) = std::env::var("QUOTA_CONSOLE_TIMESTAMP_SHIFT_HOURS") {
            if let Ok(h) = hours.parse() {
                self.membership.timestamp_shift_hours = h;
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let url = self.backend.url.trim();
        if url.is_empty() {
            anyhow::bail!("backend.url must be set");
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            anyhow::bail!("backend.url must start with http:// or https://: {}", url);
        }

        if self.backend.timeout_secs == 0 {
            anyhow::bail!("backend.timeout_secs must be greater than 0");
        }

        if self.membership.timestamp_shift_hours.abs() > 24 {
            anyhow::bail!("membership.timestamp_shift_hours must be within ±24");
        }
        if self.membership.local_utc_offset_hours.abs() > 14 {
            anyhow::bail!("membership.local_utc_offset_hours must be within ±14");
        }
        if self.export.utc_offset_hours.abs() > 14 {
            anyhow::bail!("export.utc_offset_hours must be within ±14");
        }

        if !(self.export.usage_divisor > 0.0) {
            anyhow::bail!("export.usage_divisor must be positive");
        }

        Ok(())
    }
}
