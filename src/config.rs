use std::time::Duration;

/// Timing knobs for the command executor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Ceiling for a reply to a waited command
    pub response_timeout: Duration,
    /// How long the first command waits for the power-up announcement
    pub startup_timeout: Duration,
    /// Sleep slice between status polls
    pub poll_interval: Duration,
}

impl Config {
    pub const SERIAL_TIMEOUT: Duration = Duration::from_millis(1000);
    pub const POLL_INTERVAL: Duration = Duration::from_millis(10);

    pub fn response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    pub fn startup_timeout(mut self, timeout: Duration) -> Self {
        self.startup_timeout = timeout;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Number of poll slices that fit in `timeout`, at least one.
    pub(crate) fn slices(&self, timeout: Duration) -> u32 {
        let interval = self.poll_interval.as_micros().max(1);
        (timeout.as_micros() / interval).clamp(1, u32::MAX as u128) as u32
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            response_timeout: Self::SERIAL_TIMEOUT,
            startup_timeout: Self::SERIAL_TIMEOUT,
            poll_interval: Self::POLL_INTERVAL,
        }
    }
}
