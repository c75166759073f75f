use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::ValueEnum;

use crate::runtime::RuntimeConfig;

pub const ARTIFACTS_DIR_ENV: &str = "MENU_PROFIT_ARTIFACTS";
pub const ADDR_ENV: &str = "MENU_PROFIT_ADDR";
pub const VALIDATION_ENV: &str = "MENU_PROFIT_VALIDATION";
pub const MISSING_FREQUENCY_ENV: &str = "MENU_PROFIT_MISSING_FREQUENCY";
pub const TIMEOUT_ENV: &str = "MENU_PROFIT_TIMEOUT_MS";

const DEFAULT_PORT: u16 = 8501;
const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// Whether empty form fields block a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ValidationMode {
    /// Every field must be non-empty before inference is attempted
    #[default]
    Strict,
    /// Only the price is coerced; empty text fields go straight to the model
    Lenient,
}

/// What to do when the optional menu-item frequency table is not on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum MissingFrequencyPolicy {
    /// Feed a constant zero frequency for every menu item
    #[default]
    Zero,
    /// Treat the table as required and refuse to serve predictions
    Fail,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Process-wide settings, resolved once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub artifacts_dir: PathBuf,
    pub addr: SocketAddr,
    pub validation: ValidationMode,
    pub missing_frequency: MissingFrequencyPolicy,
    /// `None` disables the bound on a single inference call
    pub inference_timeout: Option<Duration>,
    pub runtime: RuntimeConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            artifacts_dir: PathBuf::from("."),
            addr: SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)),
            validation: ValidationMode::default(),
            missing_frequency: MissingFrequencyPolicy::default(),
            inference_timeout: Some(Duration::from_millis(DEFAULT_TIMEOUT_MS)),
            runtime: RuntimeConfig::default(),
        }
    }
}

impl AppConfig {
    /// Builds the configuration from defaults overridden by `MENU_PROFIT_*`
    /// environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(dir) = env::var(ARTIFACTS_DIR_ENV) {
            config.artifacts_dir = PathBuf::from(dir);
        }
        if let Ok(addr) = env::var(ADDR_ENV) {
            config.addr = addr.parse().map_err(|e: std::net::AddrParseError| ConfigError::InvalidValue {
                key: ADDR_ENV,
                value: addr.clone(),
                reason: e.to_string(),
            })?;
        }
        if let Ok(mode) = env::var(VALIDATION_ENV) {
            config.validation = parse_enum(VALIDATION_ENV, &mode)?;
        }
        if let Ok(policy) = env::var(MISSING_FREQUENCY_ENV) {
            config.missing_frequency = parse_enum(MISSING_FREQUENCY_ENV, &policy)?;
        }
        if let Ok(ms) = env::var(TIMEOUT_ENV) {
            let ms: u64 = ms.trim().parse().map_err(|e: std::num::ParseIntError| ConfigError::InvalidValue {
                key: TIMEOUT_ENV,
                value: ms.clone(),
                reason: e.to_string(),
            })?;
            config.inference_timeout = timeout_from_millis(ms);
        }

        Ok(config)
    }
}

/// `0` means no timeout.
pub fn timeout_from_millis(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

fn parse_enum<T: ValueEnum>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    T::from_str(value.trim(), true).map_err(|reason| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
        reason,
    })
}
