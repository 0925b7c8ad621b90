use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{invalid_input_error, Error};

/// Reconnect delays: full jitter over `base * 2^attempt`, capped at `cap`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BackoffConfig {
    pub base: Duration,
    pub cap: Duration,
}

impl BackoffConfig {
    /// Rejects a zero base and a cap below the base.
    pub fn new(base: Duration, cap: Duration) -> Result<Self, Error> {
        if base.is_zero() {
            return Err(invalid_input_error("backoff base must be positive"));
        }

        if cap < base {
            return Err(invalid_input_error(format!(
                "backoff cap {:?} is below base {:?}",
                cap, base
            )));
        }

        Ok(Self { base, cap })
    }
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(1),
            cap: Duration::from_secs(30),
        }
    }
}

#[derive(Clone, Debug)]
pub struct FeedConfig {
    pub gateway_url: String,
    pub poll_interval: Duration,
    pub backoff: BackoffConfig,
    pub listen_addr: SocketAddr,
}

impl FeedConfig {
    /// Reads `JOURNEY_*` variables. Only the gateway url is required.
    pub fn from_env() -> Result<Self, Error> {
        let gateway_url = env::var("JOURNEY_GATEWAY_URL")?;
        let defaults = BackoffConfig::default();

        let poll_interval_ms: u64 = parse_var("JOURNEY_POLL_INTERVAL_MS", 1000)?;
        if poll_interval_ms == 0 {
            return Err(invalid_input_error("JOURNEY_POLL_INTERVAL_MS must be positive"));
        }

        Ok(Self {
            gateway_url,
            poll_interval: Duration::from_millis(poll_interval_ms),
            backoff: BackoffConfig::new(
                Duration::from_millis(parse_var(
                    "JOURNEY_BACKOFF_BASE_MS",
                    defaults.base.as_millis() as u64,
                )?),
                Duration::from_millis(parse_var(
                    "JOURNEY_BACKOFF_CAP_MS",
                    defaults.cap.as_millis() as u64,
                )?),
            )?,
            listen_addr: parse_var("JOURNEY_LISTEN_ADDR", SocketAddr::from(([127, 0, 0, 1], 3000)))?,
        })
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T, Error> {
    match env::var(name) {
        Ok(value) => value
            .parse()
            .map_err(|_| invalid_input_error(format!("{} has an invalid value: {}", name, value))),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    // each test uses its own variable names, the process environment is shared
    #[test]
    fn missing_variable_falls_back_to_default() {
        assert_eq!(parse_var("JOURNEY_TEST_UNSET_MS", 250u64).unwrap(), 250);
    }

    #[test]
    fn present_variable_is_parsed() {
        env::set_var("JOURNEY_TEST_PRESENT_MS", "1500");

        assert_eq!(parse_var("JOURNEY_TEST_PRESENT_MS", 0u64).unwrap(), 1500);
    }

    #[test]
    fn garbage_is_invalid_input() {
        env::set_var("JOURNEY_TEST_GARBAGE_MS", "soon");

        let err = parse_var("JOURNEY_TEST_GARBAGE_MS", 0u64).unwrap_err();

        assert_eq!(err.kind, ErrorKind::InvalidInput);
    }

    #[test]
    fn default_backoff_is_one_to_thirty_seconds() {
        let backoff = BackoffConfig::default();

        assert_eq!(backoff.base, Duration::from_secs(1));
        assert_eq!(backoff.cap, Duration::from_secs(30));
    }

    #[test]
    fn zero_base_or_low_cap_is_rejected() {
        let zero = BackoffConfig::new(Duration::ZERO, Duration::from_secs(1)).unwrap_err();
        let low = BackoffConfig::new(Duration::from_secs(2), Duration::from_secs(1)).unwrap_err();

        assert_eq!(zero.kind, ErrorKind::InvalidInput);
        assert_eq!(low.kind, ErrorKind::InvalidInput);
        assert!(BackoffConfig::new(Duration::from_millis(1), Duration::from_millis(1)).is_ok());
    }
}
