//! Per-client token bucket rate limiting.
//!
//! Every client (identified by its IP address, see [`crate::middleware::rate_limit`])
//! gets its own [`TokenBucket`], created on the first request.
//! Buckets which haven't been refilled for a whole `cleanup_interval`
//! are dropped by the [`Reclaimer`] and a later request starts with a full bucket again.
use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock, Weak},
    time::Duration,
};

use primitives::{config::RateLimit, Clock};
use slog::{debug, Logger};
use tokio::{sync::oneshot, task::JoinHandle, time::interval_at};

pub use bucket::{Decision, TokenBucket};

mod bucket;

pub const DEFAULT_REQUESTS_PER_SECOND: u32 = 10;
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimiterConfig {
    /// The refill rate of each bucket.
    /// Defaults to [`DEFAULT_REQUESTS_PER_SECOND`]
    pub requests_per_second: u32,
    /// The capacity of each bucket.
    /// Defaults to twice the `requests_per_second`
    pub burst_size: u32,
    /// Defaults to [`DEFAULT_CLEANUP_INTERVAL`]
    pub cleanup_interval: Duration,
}

impl RateLimiterConfig {
    /// Replaces the zero values with the defaults.
    pub fn with_defaults(self) -> Self {
        let requests_per_second = match self.requests_per_second {
            0 => DEFAULT_REQUESTS_PER_SECOND,
            rps => rps,
        };

        let burst_size = match self.burst_size {
            0 => requests_per_second.saturating_mul(2),
            burst_size => burst_size,
        };

        let cleanup_interval = if self.cleanup_interval.is_zero() {
            DEFAULT_CLEANUP_INTERVAL
        } else {
            self.cleanup_interval
        };

        Self {
            requests_per_second,
            burst_size,
            cleanup_interval,
        }
    }
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 0,
            burst_size: 0,
            cleanup_interval: Duration::ZERO,
        }
        .with_defaults()
    }
}

impl From<RateLimit> for RateLimiterConfig {
    fn from(rate_limit: RateLimit) -> Self {
        Self {
            requests_per_second: rate_limit.requests_per_second,
            burst_size: rate_limit.burst_size,
            cleanup_interval: rate_limit.cleanup_interval,
        }
    }
}

/// The registry of all client [`TokenBucket`]s.
#[derive(Debug)]
pub struct RateLimiter {
    buckets: RwLock<HashMap<String, Arc<TokenBucket>>>,
    config: RateLimiterConfig,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(config: RateLimiterConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            buckets: RwLock::new(HashMap::new()),
            config: config.with_defaults(),
            clock,
        }
    }

    pub fn allow(&self, client_id: &str) -> bool {
        self.bucket(client_id).allow()
    }

    pub fn acquire(&self, client_id: &str) -> Decision {
        self.bucket(client_id).acquire()
    }

    /// Gets the client's bucket or creates a full one.
    ///
    /// Concurrent first requests of the same client always end up with the same bucket.
    pub fn bucket(&self, client_id: &str) -> Arc<TokenBucket> {
        if let Some(bucket) = self.read_buckets().get(client_id) {
            return bucket.clone();
        }

        let mut buckets = self.buckets.write().unwrap_or_else(PoisonError::into_inner);

        // another request might have created it while we were waiting for the write lock
        buckets
            .entry(client_id.to_string())
            .or_insert_with(|| {
                Arc::new(TokenBucket::new(
                    self.config.burst_size,
                    self.config.requests_per_second,
                    self.clock.clone(),
                ))
            })
            .clone()
    }

    /// The value of the `X-RateLimit-Limit` header.
    pub fn limit(&self) -> u32 {
        self.config.requests_per_second
    }

    /// Number of clients currently tracked.
    pub fn len(&self) -> usize {
        self.read_buckets().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Evicts the buckets which were last refilled more than `cleanup_interval` ago.
    ///
    /// Returns the number of evicted buckets.
    pub fn reclaim(&self) -> usize {
        let threshold = match self
            .clock
            .instant()
            .checked_sub(self.config.cleanup_interval)
        {
            Some(threshold) => threshold,
            // nothing can be older than the monotonic clock's origin
            None => return 0,
        };

        let mut buckets = self.buckets.write().unwrap_or_else(PoisonError::into_inner);
        let before = buckets.len();

        buckets.retain(|_, bucket| bucket.last_refill() >= threshold);

        before - buckets.len()
    }

    /// Runs [`RateLimiter::reclaim`] every `cleanup_interval` until the returned
    /// [`Reclaimer`] is stopped or dropped, or the limiter itself is dropped.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn_reclaimer(self: &Arc<Self>, logger: Logger) -> Reclaimer {
        let limiter = Arc::downgrade(self);
        let period = self.config.cleanup_interval;
        let (shutdown, mut shutdown_rx) = oneshot::channel();

        let handle = tokio::spawn(async move {
            let mut interval = interval_at(tokio::time::Instant::now() + period, period);

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = interval.tick() => {
                        if !reclaim_pass(&limiter, &logger) {
                            break;
                        }
                    }
                }
            }

            debug!(&logger, "Rate limit reclaimer stopped"; "module" => "limiter");
        });

        Reclaimer {
            shutdown: Some(shutdown),
            handle: Some(handle),
        }
    }

    fn read_buckets(
        &self,
    ) -> std::sync::RwLockReadGuard<'_, HashMap<String, Arc<TokenBucket>>> {
        self.buckets.read().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Returns `false` once the limiter is gone.
fn reclaim_pass(limiter: &Weak<RateLimiter>, logger: &Logger) -> bool {
    match limiter.upgrade() {
        Some(limiter) => {
            let evicted = limiter.reclaim();

            debug!(
                logger,
                "Reclaimed idle rate limit buckets";
                "module" => "limiter",
                "evicted" => evicted,
                "tracked" => limiter.len(),
            );

            true
        }
        None => false,
    }
}

/// The handle of the background task started by [`RateLimiter::spawn_reclaimer`].
///
/// Dropping it aborts the task.
#[derive(Debug)]
pub struct Reclaimer {
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Reclaimer {
    /// Signals the task to stop and waits for it.
    pub async fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            // the task might have already exited
            let _ = shutdown.send(());
        }

        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle
            .as_ref()
            .map(JoinHandle::is_finished)
            .unwrap_or(true)
    }
}

impl Drop for Reclaimer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
