//! Sources of "now" for everything time-dependent in the service.
//!
//! Both the expiry of [`AdSpot`](crate::AdSpot)s and the refill of the rate limiter buckets
//! read time only through [`Clock`], so tests can drive them with synthetic time.
use std::{fmt, sync::Arc, time::Instant};

use chrono::{DateTime, Utc};

#[cfg(any(test, feature = "test-util"))]
pub use mock::MockClock;

pub trait Clock: Send + Sync + fmt::Debug {
    /// Wall-clock time, used for `createdAt`, `deactivatedAt` and expiry.
    fn now(&self) -> DateTime<Utc>;

    /// Monotonic time, used for measuring elapsed durations.
    fn instant(&self) -> Instant;
}

/// The real clock of the process.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn instant(&self) -> Instant {
        Instant::now()
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }

    fn instant(&self) -> Instant {
        (**self).instant()
    }
}

#[cfg(any(test, feature = "test-util"))]
mod mock {
    use std::{
        sync::atomic::{AtomicI64, Ordering},
        time::{Duration, Instant},
    };

    use chrono::{DateTime, TimeZone, Utc};

    use super::Clock;

    /// A clock that only moves when told to.
    ///
    /// Both readings ([`Clock::now`] and [`Clock::instant`]) move together by the same offset.
    #[derive(Debug)]
    pub struct MockClock {
        start: DateTime<Utc>,
        origin: Instant,
        /// Nanoseconds relative to `start`, negative after a [`MockClock::rewind`].
        offset: AtomicI64,
    }

    impl MockClock {
        pub fn new(start: DateTime<Utc>) -> Self {
            Self {
                start,
                origin: Instant::now(),
                offset: AtomicI64::new(0),
            }
        }

        pub fn advance(&self, by: Duration) {
            self.offset.fetch_add(to_nanos(by), Ordering::SeqCst);
        }

        /// Moves the clock backwards, simulating a clock regression.
        pub fn rewind(&self, by: Duration) {
            self.offset.fetch_sub(to_nanos(by), Ordering::SeqCst);
        }
    }

    impl Default for MockClock {
        /// Starts at `2024-01-01T00:00:00+0000`.
        fn default() -> Self {
            let start = Utc
                .timestamp_opt(1_704_067_200, 0)
                .single()
                .expect("Valid timestamp");

            Self::new(start)
        }
    }

    impl Clock for MockClock {
        fn now(&self) -> DateTime<Utc> {
            self.start + chrono::Duration::nanoseconds(self.offset.load(Ordering::SeqCst))
        }

        fn instant(&self) -> Instant {
            let offset = self.offset.load(Ordering::SeqCst);
            let delta = Duration::from_nanos(offset.unsigned_abs());

            if offset >= 0 {
                self.origin + delta
            } else {
                self.origin.checked_sub(delta).unwrap_or(self.origin)
            }
        }
    }

    fn to_nanos(duration: Duration) -> i64 {
        i64::try_from(duration.as_nanos()).unwrap_or(i64::MAX)
    }
}
