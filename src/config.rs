use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;

use crate::algorithms::Quota;
use crate::error::{Result, ThrottleError};

/// Process configuration, read from flags or the environment
#[derive(Debug, Clone, Parser)]
#[command(name = "ipthrottle", version, about = "Per-client HTTP request throttling")]
pub struct Config {
    /// Server bind address
    #[arg(long, env = "BIND_ADDR", default_value = "127.0.0.1:3000")]
    pub bind_addr: SocketAddr,

    /// Tokens added to each client's bucket per second
    #[arg(long, env = "REFILL_RATE", default_value_t = 1.0)]
    pub refill_rate: f64,

    /// Maximum burst of requests a client may send at once
    #[arg(long, env = "BURST", default_value_t = 3)]
    pub burst: u32,

    /// Seconds without requests after which a client is forgotten
    #[arg(long, env = "IDLE_TIMEOUT_SECS", default_value_t = 180)]
    pub idle_timeout_secs: u64,

    /// Seconds between two sweeps of idle clients
    #[arg(long, env = "SWEEP_INTERVAL_SECS", default_value_t = 60)]
    pub sweep_interval_secs: u64,

    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        let throttle = ThrottleConfig::default();
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            refill_rate: throttle.quota.refill_rate,
            burst: throttle.quota.burst,
            idle_timeout_secs: throttle.idle_timeout.as_secs(),
            sweep_interval_secs: throttle.sweep_interval.as_secs(),
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Registry settings, validated
    pub fn throttle(&self) -> Result<ThrottleConfig> {
        let config = ThrottleConfig {
            quota: Quota::new(self.refill_rate, self.burst),
            idle_timeout: Duration::from_secs(self.idle_timeout_secs),
            sweep_interval: Duration::from_secs(self.sweep_interval_secs),
        };
        config.validate()?;
        Ok(config)
    }
}

/// Settings of a client registry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThrottleConfig {
    pub quota: Quota,
    /// Clients idle for longer than this are evicted by the next sweep
    pub idle_timeout: Duration,
    pub sweep_interval: Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            quota: Quota::default(),
            idle_timeout: Duration::from_secs(3 * 60),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

impl ThrottleConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.quota.refill_rate.is_finite() || self.quota.refill_rate <= 0.0 {
            return Err(ThrottleError::Config(
                "Refill rate must be a positive number".to_string(),
            ));
        }

        if self.quota.burst == 0 {
            return Err(ThrottleError::Config(
                "Burst capacity must be greater than 0".to_string(),
            ));
        }

        if self.idle_timeout.is_zero() {
            return Err(ThrottleError::Config(
                "Idle timeout must be greater than 0".to_string(),
            ));
        }

        if self.sweep_interval.is_zero() {
            return Err(ThrottleError::Config(
                "Sweep interval must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
