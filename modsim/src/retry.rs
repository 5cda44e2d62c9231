use std::time::Duration;

/// Controls how long the RTU server waits before reopening its serial port
pub trait RetryStrategy: Send {
    /// Called when the port opened successfully
    fn reset(&mut self);
    /// Delay before the next attempt after the port failed to open
    fn after_failed_open(&mut self) -> Duration;
    /// Delay before reopening a port that failed while in use
    fn after_port_closed(&mut self) -> Duration;
}

/// Default [`RetryStrategy`]: start at 1 second, double up to 1 minute
pub fn default_retry_strategy() -> Box<dyn RetryStrategy> {
    doubling_retry_strategy(Duration::from_secs(1), Duration::from_secs(60))
}

/// [`RetryStrategy`] that doubles the delay after every failed open, up to `max`
pub fn doubling_retry_strategy(min: Duration, max: Duration) -> Box<dyn RetryStrategy> {
    Box::new(Doubling {
        min,
        max,
        current: min,
    })
}

struct Doubling {
    min: Duration,
    max: Duration,
    current: Duration,
}

impl RetryStrategy for Doubling {
    fn reset(&mut self) {
        self.current = self.min;
    }

    fn after_failed_open(&mut self) -> Duration {
        let ret = self.current;
        self.current = std::cmp::min(2 * self.current, self.max);
        ret
    }

    fn after_port_closed(&mut self) -> Duration {
        self.min
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_until_the_maximum_then_resets() {
        let mut retry = doubling_retry_strategy(Duration::from_millis(100), Duration::from_millis(300));
        assert_eq!(retry.after_failed_open(), Duration::from_millis(100));
        assert_eq!(retry.after_failed_open(), Duration::from_millis(200));
        assert_eq!(retry.after_failed_open(), Duration::from_millis(300));
        assert_eq!(retry.after_failed_open(), Duration::from_millis(300));
        retry.reset();
        assert_eq!(retry.after_failed_open(), Duration::from_millis(100));
        assert_eq!(retry.after_port_closed(), Duration::from_millis(100));
    }
}
