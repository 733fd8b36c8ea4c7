//! Configuration types.

use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

/// Service configuration, built from `VET_WIZARD_*` environment variables.
#[derive(Debug, Clone)]
pub struct WizardConfig {
    /// Port the REST/WS server binds to.
    pub port: u16,
    /// Artificial "typing" delay before the simulator answers.
    pub typing_delay: Duration,
    /// Simulated latency of an API-key check.
    pub credential_check_delay: Duration,
    /// Simulated latency of a sponsor-code check.
    pub sponsor_check_delay: Duration,
    /// Keys shorter than this are rejected by the stub validator.
    pub min_api_key_len: usize,
    /// Capacity of the wizard event broadcast channel.
    pub event_capacity: usize,
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            typing_delay: Duration::from_millis(1500),
            credential_check_delay: Duration::from_millis(1000),
            sponsor_check_delay: Duration::from_millis(1500),
            min_api_key_len: 11,
            event_capacity: 256,
        }
    }
}

impl WizardConfig {
    /// Build config from environment variables, falling back to defaults
    /// for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            port: env_or("VET_WIZARD_PORT", defaults.port)?,
            typing_delay: env_millis("VET_WIZARD_TYPING_DELAY_MS", defaults.typing_delay)?,
            credential_check_delay: env_millis(
                "VET_WIZARD_CREDENTIAL_DELAY_MS",
                defaults.credential_check_delay,
            )?,
            sponsor_check_delay: env_millis(
                "VET_WIZARD_SPONSOR_DELAY_MS",
                defaults.sponsor_check_delay,
            )?,
            min_api_key_len: env_or("VET_WIZARD_MIN_API_KEY_LEN", defaults.min_api_key_len)?,
            event_capacity: env_or("VET_WIZARD_EVENT_CAPACITY", defaults.event_capacity)?,
        })
    }

    /// Config with every artificial delay removed (tests, demos).
    pub fn without_delays() -> Self {
        Self {
            typing_delay: Duration::ZERO,
            credential_check_delay: Duration::ZERO,
            sponsor_check_delay: Duration::ZERO,
            ..Self::default()
        }
    }
}

fn env_or<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => parse_value(key, &raw),
        Err(_) => Ok(default),
    }
}

fn env_millis(key: &str, default: Duration) -> Result<Duration, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => parse_value::<u64>(key, &raw).map(Duration::from_millis),
        Err(_) => Ok(default),
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("{raw:?}: {e}"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_simulated_latencies() {
        let config = WizardConfig::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.typing_delay, Duration::from_millis(1500));
        assert_eq!(config.credential_check_delay, Duration::from_millis(1000));
        assert_eq!(config.sponsor_check_delay, Duration::from_millis(1500));
        assert_eq!(config.min_api_key_len, 11);
    }

    #[test]
    fn without_delays_zeroes_waits() {
        let config = WizardConfig::without_delays();
        assert!(config.typing_delay.is_zero());
        assert!(config.credential_check_delay.is_zero());
        assert!(config.sponsor_check_delay.is_zero());
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn parse_value_reports_key() {
        let err = parse_value::<u16>("VET_WIZARD_PORT", "not-a-port").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("VET_WIZARD_PORT"));
        assert!(msg.contains("not-a-port"));
    }

    #[test]
    fn parse_value_trims() {
        let port: u16 = parse_value("VET_WIZARD_PORT", " 9090 ").unwrap();
        assert_eq!(port, 9090);
    }
}
