//! # Configuration Management Module
//!
//! TOML configuration for the USSD service: where to listen, how dialogs behave,
//! how PINs are derived, where data lives and which CRM to talk to.
//!
//! ## Configuration Structure
//!
//! - [`ServerConfig`] - HTTP listener and gateway callback path
//! - [`UssdConfig`] - dialog behaviour (phone normalization, login attempts)
//! - [`PinOptions`] - key-derivation parameters (`[pin]`)
//! - [`StorageConfig`] - data directory for the file store
//! - [`CrmConfig`] - marketing CRM endpoint
//! - [`LoggingConfig`] - log level and log files
//!
//! ## Usage
//!
//! ```rust,no_run
//! use bewell_ussd::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     println!("Listening on {}", config.server.bind_address);
//!
//!     Config::create_default("config.toml").await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration File Format
//!
//! ```toml
//! [server]
//! bind_address = "0.0.0.0:8080"
//! callback_path = "/ussd"
//! request_timeout_seconds = 10
//!
//! [ussd]
//! default_country_code = "254"
//! max_login_attempts = 3
//!
//! [pin]
//! salt_len = 256
//! iterations = 10000
//! key_len = 512
//! hash = "sha512"
//! ```
//!
//! Every section except `[server]`, `[storage]` and `[logging]` may be omitted and
//! falls back to its defaults.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

pub use crate::pin::PinOptions;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_address: String,
    /// Path the gateway POSTs callbacks to
    #[serde(default = "default_callback_path")]
    pub callback_path: String,
    /// Upper bound on one callback, engine included
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

fn default_callback_path() -> String {
    "/ussd".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UssdConfig {
    /// Country calling code prepended to national-format numbers, without `+`
    #[serde(default = "default_country_code")]
    pub default_country_code: String,
    /// Wrong login PINs tolerated per session before it is ended. 0 disables.
    #[serde(default = "default_max_login_attempts")]
    pub max_login_attempts: u32,
}

fn default_country_code() -> String {
    "254".to_string()
}

fn default_max_login_attempts() -> u32 {
    3
}

impl Default for UssdConfig {
    fn default() -> Self {
        Self {
            default_country_code: default_country_code(),
            max_login_attempts: default_max_login_attempts(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrmConfig {
    /// Base URL of the CRM REST API. When unset, opt-outs are kept in the data directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default = "default_crm_timeout")]
    pub timeout_seconds: u64,
}

fn default_crm_timeout() -> u64 {
    5
}

impl Default for CrmConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_seconds: default_crm_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
    /// Separate file for `security` target events (lockouts, resets)
    #[serde(default)]
    pub security_file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub ussd: UssdConfig,
    #[serde(default)]
    pub pin: PinOptions,
    pub storage: StorageConfig,
    #[serde(default)]
    pub crm: CrmConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        config.validate()?;
        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.server
            .bind_address
            .parse::<std::net::SocketAddr>()
            .map_err(|e| anyhow!("Invalid server.bind_address '{}': {}", self.server.bind_address, e))?;
        if !self.server.callback_path.starts_with('/') {
            return Err(anyhow!("server.callback_path must start with '/'"));
        }
        if self.server.request_timeout_seconds == 0 {
            return Err(anyhow!("server.request_timeout_seconds must be greater than zero"));
        }
        let cc = &self.ussd.default_country_code;
        if cc.is_empty() || cc.len() > 3 || !cc.chars().all(|c| c.is_ascii_digit()) {
            return Err(anyhow!("ussd.default_country_code must be 1-3 digits, got '{}'", cc));
        }
        self.pin.validate().map_err(|e| anyhow!("Invalid [pin] section: {}", e))?;
        if self.storage.data_dir.trim().is_empty() {
            return Err(anyhow!("storage.data_dir must not be empty"));
        }
        if let Some(url) = &self.crm.base_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(anyhow!("crm.base_url must be an http(s) URL"));
            }
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                bind_address: "0.0.0.0:8080".to_string(),
                callback_path: default_callback_path(),
                request_timeout_seconds: default_request_timeout(),
            },
            ussd: UssdConfig::default(),
            pin: PinOptions::default(),
            storage: StorageConfig {
                data_dir: "./data".to_string(),
            },
            crm: CrmConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                file: Some("bewell-ussd.log".to_string()),
                security_file: Some("bewell-ussd-security.log".to_string()),
            },
        }
    }
}
