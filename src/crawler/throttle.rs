//! Crawl delay between secondary page requests

use std::time::Duration;

/// Longest pause a throttle will take
pub const MAX_DELAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Fixed pause taken before every secondary page fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Throttle {
    delay: Duration,
}

impl Throttle {
    /// Builds a throttle from a delay in seconds
    ///
    /// Zero, negative or non-finite delays disable throttling. Delays
    /// beyond [`MAX_DELAY`] are capped.
    pub fn from_seconds(seconds: f64) -> Self {
        let delay = if seconds.is_finite() && seconds > 0.0 {
            Duration::try_from_secs_f64(seconds)
                .map_or(MAX_DELAY, |delay| delay.min(MAX_DELAY))
        } else {
            Duration::ZERO
        };
        Self { delay }
    }

    /// A throttle that never waits
    pub fn disabled() -> Self {
        Self {
            delay: Duration::ZERO,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn is_enabled(&self) -> bool {
        !self.delay.is_zero()
    }

    /// Sleeps for the configured delay
    pub async fn wait(&self) {
        if self.is_enabled() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_from_seconds() {
        assert_eq!(
            Throttle::from_seconds(10.0).delay(),
            Duration::from_secs(10)
        );
        assert_eq!(
            Throttle::from_seconds(0.25).delay(),
            Duration::from_millis(250)
        );
        assert!(!Throttle::from_seconds(0.0).is_enabled());
        assert!(!Throttle::from_seconds(-1.0).is_enabled());
        assert!(!Throttle::from_seconds(f64::NAN).is_enabled());
    }

    #[test]
    fn test_huge_delay_is_capped() {
        assert_eq!(Throttle::from_seconds(1e300).delay(), MAX_DELAY);
        assert_eq!(Throttle::from_seconds(1e6).delay(), MAX_DELAY);
    }

    #[tokio::test]
    async fn test_wait_sleeps() {
        let throttle = Throttle::from_seconds(0.05);
        let start = Instant::now();
        throttle.wait().await;
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_disabled_returns_immediately() {
        let start = Instant::now();
        Throttle::disabled().wait().await;
        assert!(start.elapsed() < Duration::from_millis(50));
    }
}
