//! Startup configuration.
//!
//! All values are fixed at build time (see `build.rs`) and gathered into one
//! immutable [`BlinkConfig`] that is validated once before the loop starts.

use embassy_time::Duration;

use crate::indicator::{Color, StatusPattern};

pub mod build_env {
    include!(concat!(env!("OUT_DIR"), "/consts.rs"));
}

/// Longest `https://<host><path>` the fetcher can address.
pub const MAX_URL_LEN: usize = 128;

#[derive(Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    EmptyRange { min_ms: u32, max_ms: u32 },
    ZeroInterval,
    DefaultOutOfRange(u32),
    ZeroPollInterval,
    ZeroAttempts,
    InvalidUnit,
    HostMissing,
    PathNotAbsolute,
    UrlTooLong,
}

/// Unit of the `delay` value on the wire.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WireUnit {
    Seconds,
    Milliseconds,
}

impl WireUnit {
    pub fn parse(tag: &str) -> Result<Self, ConfigError> {
        match tag {
            "s" => Ok(WireUnit::Seconds),
            "ms" => Ok(WireUnit::Milliseconds),
            _ => Err(ConfigError::InvalidUnit),
        }
    }

    /// Converts a raw wire value into milliseconds, saturating at the `i64` range.
    pub fn to_millis(self, raw: i64) -> i64 {
        match self {
            WireUnit::Seconds => raw.saturating_mul(1000),
            WireUnit::Milliseconds => raw,
        }
    }
}

/// Valid blink-interval domain, in milliseconds.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IntervalConfig {
    pub min_ms: u32,
    pub max_ms: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct BackendConfig {
    pub host: &'static str,
    pub path: &'static str,
    pub unit: WireUnit,
    pub timeout: Duration,
    /// Whether the TLS session must authenticate the server. Transports that
    /// cannot do so refuse to start instead of ignoring the flag.
    pub verify_server_identity: bool,
}

impl BackendConfig {
    pub fn url(&self) -> Result<heapless::String<MAX_URL_LEN>, ConfigError> {
        heapless::format!(MAX_URL_LEN; "https://{}{}", self.host, self.path).map_err(|_| ConfigError::UrlTooLong)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LinkConfig {
    pub ssid: &'static str,
    pub password: &'static str,
    /// Spacing between two link status checks while connecting.
    pub check_period: Duration,
    /// Failed checks tolerated before the device restarts.
    pub max_attempts: u16,
}

#[derive(Debug, Clone, Copy)]
pub struct StatusPatterns {
    pub connected: StatusPattern,
    pub failure: StatusPattern,
}

impl Default for StatusPatterns {
    fn default() -> Self {
        Self {
            connected: StatusPattern {
                color: Color::CONNECTED,
                flashes: 2,
                on: Duration::from_millis(200),
                off: Duration::from_millis(200),
            },
            failure: StatusPattern {
                color: Color::FAILURE,
                flashes: 3,
                on: Duration::from_millis(150),
                off: Duration::from_millis(150),
            },
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BlinkConfig {
    pub interval: IntervalConfig,
    pub default_interval_ms: u32,
    pub poll_interval: Duration,
    /// Sleep between two scheduler ticks in [`crate::scheduler::Runner::run`].
    pub tick_period: Duration,
    pub backend: BackendConfig,
    pub link: LinkConfig,
    pub status: StatusPatterns,
}

impl BlinkConfig {
    pub fn from_build_env() -> Self {
        use build_env::*;
        Self {
            interval: IntervalConfig {
                min_ms: MIN_INTERVAL_MS,
                max_ms: MAX_INTERVAL_MS,
            },
            default_interval_ms: DEFAULT_INTERVAL_MS,
            poll_interval: Duration::from_millis(POLL_INTERVAL_MS as u64),
            tick_period: Duration::from_millis(10),
            backend: BackendConfig {
                host: BACKEND_HOST,
                path: BACKEND_PATH,
                unit: DELAY_UNIT,
                timeout: Duration::from_millis(FETCH_TIMEOUT_MS as u64),
                verify_server_identity: VERIFY_SERVER_IDENTITY,
            },
            link: LinkConfig {
                ssid: WIFI_SSID,
                password: WIFI_PASSWORD,
                check_period: Duration::from_millis(500),
                max_attempts: 60,
            },
            status: StatusPatterns::default(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let IntervalConfig { min_ms, max_ms } = self.interval;
        if min_ms == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        if min_ms > max_ms {
            return Err(ConfigError::EmptyRange { min_ms, max_ms });
        }
        if !(min_ms..=max_ms).contains(&self.default_interval_ms) {
            return Err(ConfigError::DefaultOutOfRange(self.default_interval_ms));
        }
        if self.poll_interval.as_ticks() == 0 {
            return Err(ConfigError::ZeroPollInterval);
        }
        if self.link.max_attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }
        if self.backend.host.is_empty() {
            return Err(ConfigError::HostMissing);
        }
        if !self.backend.path.starts_with('/') {
            return Err(ConfigError::PathNotAbsolute);
        }
        self.backend.url().map(|_| ())
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    fn config() -> BlinkConfig {
        BlinkConfig::from_build_env()
    }

    #[test]
    fn build_env_defaults_are_valid() {
        assert_eq!(config().validate(), Ok(()));
    }

    #[test]
    fn url_is_composed_from_host_and_path() {
        let mut config = config();
        config.backend.host = "example.org";
        config.backend.path = "/api/delay";
        assert_eq!(config.backend.url().unwrap().as_str(), "https://example.org/api/delay");
    }

    #[test]
    fn inverted_range_is_rejected() {
        let mut config = config();
        config.interval = IntervalConfig { min_ms: 5000, max_ms: 500 };
        assert_eq!(config.validate(), Err(ConfigError::EmptyRange { min_ms: 5000, max_ms: 500 }));
    }

    #[test]
    fn zero_minimum_is_rejected() {
        let mut config = config();
        config.interval.min_ms = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroInterval));
    }

    #[test]
    fn default_must_lie_inside_range() {
        let mut config = config();
        config.interval = IntervalConfig { min_ms: 500, max_ms: 5000 };
        config.default_interval_ms = 6000;
        assert_eq!(config.validate(), Err(ConfigError::DefaultOutOfRange(6000)));
    }

    #[test]
    fn backend_path_must_be_absolute() {
        let mut config = config();
        config.backend.path = "api/delay";
        assert_eq!(config.validate(), Err(ConfigError::PathNotAbsolute));
        config.backend.path = "/api/delay";
        config.backend.host = "";
        assert_eq!(config.validate(), Err(ConfigError::HostMissing));
    }

    #[test]
    fn overlong_url_is_rejected() {
        let mut config = config();
        config.backend.path = "/aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
        assert_eq!(config.validate(), Err(ConfigError::UrlTooLong));
    }

    #[test]
    fn wire_unit_conversion() {
        assert_eq!(WireUnit::parse("s"), Ok(WireUnit::Seconds));
        assert_eq!(WireUnit::parse("ms"), Ok(WireUnit::Milliseconds));
        assert_eq!(WireUnit::parse("minutes"), Err(ConfigError::InvalidUnit));
        assert_eq!(WireUnit::Seconds.to_millis(7), 7000);
        assert_eq!(WireUnit::Milliseconds.to_millis(-3), -3);
        assert_eq!(WireUnit::Seconds.to_millis(i64::MAX), i64::MAX);
        assert_eq!(WireUnit::Seconds.to_millis(i64::MIN), i64::MIN);
    }
}
