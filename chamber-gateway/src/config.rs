//! Configuration management using Figment
//!
//! Configuration is loaded from multiple sources with the following precedence
//! (highest to lowest):
//! 1. Environment variables (`HOST`, `PORT`, `DEBUG`, `ENVIRONMENT`,
//!    `LOG_LEVEL`, `PLC_IP`, `PLC_PORT`)
//! 2. Current working directory: ./config.toml
//! 3. Default values

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};

use crate::error::{Error, Result};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Service configuration
    pub service: ServiceConfig,

    /// Middleware configuration
    #[serde(default)]
    pub middleware: MiddlewareConfig,

    /// PLC endpoint configuration (consumed by the external driver; the
    /// gateway itself only logs it)
    #[serde(default)]
    pub plc: PlcConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service name
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Address to listen on
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Environment (development, staging, production)
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Expose raw failure detail in error envelopes
    #[serde(default = "default_false")]
    pub debug: bool,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Middleware configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiddlewareConfig {
    /// CORS mode: permissive, restrictive, or origins (explicit list)
    #[serde(default = "default_cors_mode")]
    pub cors_mode: String,

    /// Origins allowed when `cors_mode` is "origins"
    #[serde(default)]
    pub allowed_origins: Vec<String>,

    /// Minimum response body size eligible for compression
    #[serde(default = "default_compression_min_bytes")]
    pub compression_min_bytes: u16,
}

/// PLC endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlcConfig {
    /// PLC IP address; the service runs without one configured
    #[serde(default)]
    pub ip: Option<String>,

    /// PLC port
    #[serde(default = "default_plc_port")]
    pub port: u16,
}

fn default_service_name() -> String {
    "chamber-gateway".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_false() -> bool {
    false
}

fn default_cors_mode() -> String {
    "permissive".to_string()
}

fn default_compression_min_bytes() -> u16 {
    1000
}

fn default_plc_port() -> u16 {
    102
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            host: default_host(),
            port: default_port(),
            environment: default_environment(),
            debug: false,
            log_level: default_log_level(),
        }
    }
}

impl Default for MiddlewareConfig {
    fn default() -> Self {
        Self {
            cors_mode: default_cors_mode(),
            allowed_origins: Vec::new(),
            compression_min_bytes: default_compression_min_bytes(),
        }
    }
}

impl Default for PlcConfig {
    fn default() -> Self {
        Self {
            ip: None,
            port: default_plc_port(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig::default(),
            middleware: MiddlewareConfig::default(),
            plc: PlcConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from defaults, `./config.toml`, and the
    /// environment
    pub fn load() -> Result<Self> {
        Self::figment(Toml::file("config.toml")).extract().map_err(Into::into)
    }

    /// Load configuration from a specific file
    ///
    /// Bypasses the working-directory convention; useful for tests and
    /// non-standard deployments.
    pub fn load_from(path: &str) -> Result<Self> {
        Self::figment(Toml::file(path)).extract().map_err(Into::into)
    }

    fn figment(file: figment::providers::Data<figment::providers::Toml>) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(file)
            .merge(
                Env::raw()
                    .only(&["HOST", "PORT", "DEBUG", "ENVIRONMENT", "LOG_LEVEL"])
                    .map(|key| format!("service.{}", key.as_str().to_ascii_lowercase()).into())
                    .split("."),
            )
            .merge(
                Env::raw()
                    .only(&["PLC_IP", "PLC_PORT"])
                    .map(|key| {
                        key.as_str()
                            .to_ascii_lowercase()
                            .replacen("plc_", "plc.", 1)
                            .into()
                    })
                    .split("."),
            )
    }

    /// Socket address the server binds, from `service.host` and
    /// `service.port`
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        let host: IpAddr = self
            .service
            .host
            .parse()
            .map_err(|_| Error::Other(format!("invalid listen host: {}", self.service.host)))?;
        Ok(SocketAddr::new(host, self.service.port))
    }

    /// Human-readable PLC endpoint, if one is configured
    pub fn plc_address(&self) -> Option<String> {
        self.plc.ip.as_ref().map(|ip| format!("{}:{}", ip, self.plc.port))
    }
}
