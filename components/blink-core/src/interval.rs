use crate::config::{ConfigError, IntervalConfig};

/// Gate every candidate interval has to pass before it is accepted.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IntervalPolicy {
    min_ms: u32,
    max_ms: u32,
}

impl IntervalPolicy {
    pub fn new(config: IntervalConfig) -> Result<Self, ConfigError> {
        let IntervalConfig { min_ms, max_ms } = config;
        if min_ms == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        if min_ms > max_ms {
            return Err(ConfigError::EmptyRange { min_ms, max_ms });
        }
        Ok(Self { min_ms, max_ms })
    }

    pub fn min_ms(&self) -> u32 {
        self.min_ms
    }

    pub fn max_ms(&self) -> u32 {
        self.max_ms
    }

    pub fn contains(&self, value_ms: i64) -> bool {
        (i64::from(self.min_ms)..=i64::from(self.max_ms)).contains(&value_ms)
    }

    /// Returns `raw_ms` unchanged when it lies in `[min, max]`, otherwise the nearest bound.
    pub fn clamp(&self, raw_ms: i64) -> u32 {
        if raw_ms <= i64::from(self.min_ms) {
            self.min_ms
        } else if raw_ms >= i64::from(self.max_ms) {
            self.max_ms
        } else {
            // strictly between two u32 values
            raw_ms as u32
        }
    }
}
