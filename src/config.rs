//! Configuration types, built from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default receive-domain suffix.
pub const DEFAULT_RECEIVE_DOMAIN: &str = "@kindle.vangel.io";

/// Default `From` address stamped on every outbound message.
pub const DEFAULT_SENDER: &str = "conversion@noreply.kindle.vangel.io";

/// Raw size limit of the downstream transport (10 MiB).
pub const DEFAULT_TRANSPORT_LIMIT: u64 = 10_485_760;

/// Default wall-clock cap on one conversion.
const DEFAULT_CONVERT_TIMEOUT_SECS: u64 = 600;

/// Byte budget per outbound message at the default transport limit.
pub const DEFAULT_MAX_MESSAGE_SIZE: u64 = DEFAULT_TRANSPORT_LIMIT * 6 / 10;

/// Base64 adds roughly a third to attachment size; the remainder absorbs headers.
pub fn max_message_size(transport_limit: u64) -> Result<u64, ConfigError> {
    transport_limit
        .checked_mul(6)
        .map(|scaled| scaled / 10)
        .ok_or_else(|| ConfigError::InvalidValue {
            key: "GATEWAY_TRANSPORT_LIMIT".into(),
            message: format!("{transport_limit} is too large"),
        })
}

/// Outbound SMTP relay settings.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
}

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Suffix identifying addresses this gateway is authoritative for.
    pub receive_domain: String,
    /// `From` / envelope source of outbound mail.
    pub sender: String,
    /// Byte budget per outbound message.
    pub max_message_size: u64,
    /// Root under which per-event scratch directories are created.
    pub scratch_dir: PathBuf,
    /// Conversion tool binary.
    pub converter: String,
    pub convert_timeout: Duration,
    /// Drop attachments that fail conversion instead of failing the event.
    pub skip_failed_conversions: bool,
    pub policy_db: PathBuf,
    pub object_root: PathBuf,
    pub listen_port: u16,
    /// `None` when `SMTP_HOST` is unset.
    pub smtp: Option<SmtpConfig>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            receive_domain: DEFAULT_RECEIVE_DOMAIN.to_string(),
            sender: DEFAULT_SENDER.to_string(),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            scratch_dir: PathBuf::from("/tmp"),
            converter: "ebook-convert".to_string(),
            convert_timeout: Duration::from_secs(DEFAULT_CONVERT_TIMEOUT_SECS),
            skip_failed_conversions: false,
            policy_db: PathBuf::from("./data/policies.db"),
            object_root: PathBuf::from("./data/objects"),
            listen_port: 8080,
            smtp: None,
        }
    }
}

impl GatewayConfig {
    /// Build config from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let transport_limit = parse_var("GATEWAY_TRANSPORT_LIMIT", DEFAULT_TRANSPORT_LIMIT)?;
        if transport_limit == 0 {
            return Err(ConfigError::InvalidValue {
                key: "GATEWAY_TRANSPORT_LIMIT".into(),
                message: "must be greater than zero".into(),
            });
        }

        let smtp = match std::env::var("SMTP_HOST") {
            Ok(host) if !host.trim().is_empty() => Some(SmtpConfig {
                host,
                port: parse_var("SMTP_PORT", 587)?,
                username: std::env::var("SMTP_USERNAME").unwrap_or_default(),
                password: SecretString::from(std::env::var("SMTP_PASSWORD").unwrap_or_default()),
            }),
            _ => None,
        };

        Ok(Self {
            receive_domain: std::env::var("GATEWAY_RECEIVE_DOMAIN")
                .unwrap_or(defaults.receive_domain),
            sender: std::env::var("GATEWAY_SENDER").unwrap_or(defaults.sender),
            max_message_size: max_message_size(transport_limit)?,
            scratch_dir: std::env::var("GATEWAY_SCRATCH_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.scratch_dir),
            converter: std::env::var("GATEWAY_CONVERTER").unwrap_or(defaults.converter),
            convert_timeout: Duration::from_secs(parse_var(
                "GATEWAY_CONVERT_TIMEOUT_SECS",
                DEFAULT_CONVERT_TIMEOUT_SECS,
            )?),
            skip_failed_conversions: parse_bool_var("GATEWAY_SKIP_FAILED_CONVERSIONS")?,
            policy_db: std::env::var("GATEWAY_POLICY_DB")
                .map(PathBuf::from)
                .unwrap_or(defaults.policy_db),
            object_root: std::env::var("GATEWAY_OBJECT_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.object_root),
            listen_port: parse_var("GATEWAY_LISTEN_PORT", defaults.listen_port)?,
            smtp,
        })
    }

    /// The SMTP settings, or an error naming the missing variable.
    pub fn require_smtp(&self) -> Result<&SmtpConfig, ConfigError> {
        self.smtp
            .as_ref()
            .ok_or_else(|| ConfigError::MissingEnvVar("SMTP_HOST".into()))
    }
}

fn parse_var<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

fn parse_bool_var(key: &str) -> Result<bool, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" | "" => Ok(false),
            other => Err(ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("expected a boolean, got {other:?}"),
            }),
        },
        Err(_) => Ok(false),
    }
}
