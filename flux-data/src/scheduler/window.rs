use chrono::{DateTime, Utc};
use derive_more::Constructor;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

/// Half-open interval `[start, start + step)` in seconds since epoch, aligned to a
/// multiple of `step`.
#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Deserialize, Serialize, Constructor,
)]
pub struct Window {
    pub start: i64,
    pub step: i64,
}

impl Window {
    /// Window containing `epoch_secs`, ie/ starting at `floor(epoch_secs / step) * step`.
    pub fn align(epoch_secs: i64, step: i64) -> Self {
        let step = step.max(1);
        Self {
            start: epoch_secs.div_euclid(step) * step,
            step,
        }
    }

    pub fn end(&self) -> i64 {
        self.start + self.step
    }

    pub fn next(&self) -> Self {
        Self {
            start: self.end(),
            step: self.step,
        }
    }

    pub fn contains(&self, epoch_secs: i64) -> bool {
        (self.start..self.end()).contains(&epoch_secs)
    }
}

/// Wall clock anchored to the tokio clock.
///
/// Epoch time is read once at construction, after which it advances with
/// [`tokio::time::Instant`], so pausing tokio time also pauses the wall clock.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct WallClock {
    origin_epoch_ms: i64,
    origin: Instant,
}

impl WallClock {
    pub fn system() -> Self {
        Self::starting_at_ms(Utc::now().timestamp_millis())
    }

    /// Clock whose current time is `epoch_secs`.
    pub fn starting_at(epoch_secs: i64) -> Self {
        Self::starting_at_ms(epoch_secs.saturating_mul(1000))
    }

    pub fn starting_at_ms(epoch_ms: i64) -> Self {
        Self {
            origin_epoch_ms: epoch_ms,
            origin: Instant::now(),
        }
    }

    /// Milliseconds since epoch.
    pub fn now_ms(&self) -> i64 {
        let elapsed = i64::try_from(self.origin.elapsed().as_millis()).unwrap_or(i64::MAX);
        self.origin_epoch_ms.saturating_add(elapsed)
    }

    /// [`Instant`] at which the clock reads `epoch_ms`, never earlier than the origin.
    pub fn instant_at_ms(&self, epoch_ms: i64) -> Instant {
        let offset = epoch_ms.saturating_sub(self.origin_epoch_ms).max(0);
        self.origin + Duration::from_millis(offset.unsigned_abs())
    }
}

impl Default for WallClock {
    fn default() -> Self {
        Self::system()
    }
}

/// When a pipeline stops capturing.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Deserialize, Serialize)]
pub enum Horizon {
    #[default]
    Never,
    /// Relative to the moment the scheduler starts.
    For(Duration),
    Until(DateTime<Utc>),
}

impl Horizon {
    /// Interpret `secs` as an absolute epoch timestamp if it lies after `now`, otherwise
    /// as a relative number of seconds. Zero or negative values never stop.
    pub fn from_secs(secs: i64, now: DateTime<Utc>) -> Self {
        if secs <= 0 {
            Self::Never
        } else if secs > now.timestamp() {
            DateTime::from_timestamp(secs, 0).map_or(Self::Never, Self::Until)
        } else {
            Self::For(Duration::from_secs(secs.unsigned_abs()))
        }
    }

    /// Epoch milliseconds at which the horizon is reached for a scheduler started at
    /// `start_ms`.
    pub fn deadline_ms(&self, start_ms: i64) -> Option<i64> {
        match self {
            Self::Never => None,
            Self::For(duration) => Some(
                start_ms.saturating_add(i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)),
            ),
            Self::Until(until) => Some(until.timestamp_millis()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_align() {
        struct TestCase {
            input: (i64, i64),
            expected: Window,
        }

        let tests = vec![
            TestCase {
                // TC0: already aligned
                input: (120, 60),
                expected: Window::new(120, 60),
            },
            TestCase {
                // TC1: mid window
                input: (1_700_000_059, 60),
                expected: Window::new(1_699_999_980, 60),
            },
            TestCase {
                // TC2: step clamped to one second
                input: (17, 0),
                expected: Window::new(17, 1),
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let (epoch_secs, step) = test.input;
            assert_eq!(Window::align(epoch_secs, step), test.expected, "TC{} failed", index);
        }
    }

    #[test]
    fn test_window_next_contains() {
        let window = Window::new(60, 60);
        assert_eq!(window.end(), 120);
        assert_eq!(window.next(), Window::new(120, 60));
        assert!(window.contains(60));
        assert!(window.contains(119));
        assert!(!window.contains(120));
    }

    #[test]
    fn test_horizon_from_secs() {
        struct TestCase {
            input: i64,
            expected: Horizon,
        }

        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();

        let tests = vec![
            TestCase {
                // TC0: relative duration
                input: 3600,
                expected: Horizon::For(Duration::from_secs(3600)),
            },
            TestCase {
                // TC1: absolute timestamp in the future
                input: 1_700_000_600,
                expected: Horizon::Until(DateTime::from_timestamp(1_700_000_600, 0).unwrap()),
            },
            TestCase {
                // TC2: zero never stops
                input: 0,
                expected: Horizon::Never,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            assert_eq!(Horizon::from_secs(test.input, now), test.expected, "TC{} failed", index);
        }
    }

    #[test]
    fn test_horizon_deadline() {
        let until = DateTime::from_timestamp(1_000, 0).unwrap();
        assert_eq!(Horizon::Never.deadline_ms(5_000), None);
        assert_eq!(
            Horizon::For(Duration::from_secs(60)).deadline_ms(5_000),
            Some(65_000)
        );
        assert_eq!(Horizon::Until(until).deadline_ms(5_000), Some(1_000_000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wall_clock_follows_tokio_time() {
        let clock = WallClock::starting_at(100);
        assert_eq!(clock.now_ms(), 100_000);

        tokio::time::sleep(Duration::from_millis(1_500)).await;
        assert_eq!(clock.now_ms(), 101_500);
        assert_eq!(
            clock.instant_at_ms(160_000) - Instant::now(),
            Duration::from_millis(58_500)
        );
        assert!(clock.instant_at_ms(0) <= Instant::now());
    }
}
