//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

/// Which verification backend the service talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayMode {
    /// Canned identity, always-successful OTP, simulated PIN registration.
    Demo,
    /// Real backend over HTTP.
    Http,
}

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub mode: GatewayMode,
    /// Base URL of the verification backend (required in HTTP mode).
    pub base_url: Option<String>,
    /// Upper bound on any single gateway call.
    pub timeout: Duration,
    /// Simulated latency of `register_pin` in demo mode.
    pub demo_pin_delay: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            mode: GatewayMode::Demo,
            base_url: None,
            timeout: Duration::from_secs(30),
            demo_pin_delay: Duration::from_millis(1500),
        }
    }
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub gateway: GatewayConfig,
    /// HTTP/WS listen port.
    pub port: u16,
    /// Broadcast buffer for onboarding events.
    pub event_capacity: usize,
    /// Directory for rolling log files; stderr only when unset.
    pub log_dir: Option<PathBuf>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            port: 8080,
            event_capacity: 64,
            log_dir: None,
        }
    }
}

impl ServiceConfig {
    /// Load configuration from `KYC_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let mode = match lookup("KYC_GATEWAY_MODE")
            .map(|v| v.trim().to_ascii_lowercase())
            .as_deref()
        {
            None | Some("") | Some("demo") => GatewayMode::Demo,
            Some("http") => GatewayMode::Http,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    key: "KYC_GATEWAY_MODE".to_string(),
                    message: format!("expected 'demo' or 'http', got '{other}'"),
                });
            }
        };

        let base_url = lookup("KYC_GATEWAY_URL").filter(|v| !v.trim().is_empty());
        if mode == GatewayMode::Http && base_url.is_none() {
            return Err(ConfigError::MissingRequired {
                key: "KYC_GATEWAY_URL".to_string(),
                hint: "Set it to the verification backend base URL, or use KYC_GATEWAY_MODE=demo"
                    .to_string(),
            });
        }

        let timeout = match parse_var::<u64, _>(&lookup, "KYC_GATEWAY_TIMEOUT_SECS")? {
            Some(0) => {
                return Err(ConfigError::InvalidValue {
                    key: "KYC_GATEWAY_TIMEOUT_SECS".to_string(),
                    message: "must be greater than zero".to_string(),
                });
            }
            Some(secs) => Duration::from_secs(secs),
            None => defaults.gateway.timeout,
        };

        let demo_pin_delay = parse_var::<u64, _>(&lookup, "KYC_DEMO_PIN_DELAY_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.gateway.demo_pin_delay);

        let port = parse_var::<u16, _>(&lookup, "KYC_PORT")?.unwrap_or(defaults.port);

        let event_capacity = match parse_var::<usize, _>(&lookup, "KYC_EVENT_CAPACITY")? {
            Some(0) => {
                return Err(ConfigError::InvalidValue {
                    key: "KYC_EVENT_CAPACITY".to_string(),
                    message: "must be greater than zero".to_string(),
                });
            }
            Some(n) => n,
            None => defaults.event_capacity,
        };

        let log_dir = lookup("KYC_LOG_DIR")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            gateway: GatewayConfig {
                mode,
                base_url,
                timeout,
                demo_pin_delay,
            },
            port,
            event_capacity,
            log_dir,
        })
    }
}

impl ServiceConfig {
    /// Create the log directory, if one is configured.
    pub fn prepare_log_dir(&self) -> Result<(), ConfigError> {
        if let Some(dir) = &self.log_dir {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            }),
    }
}
