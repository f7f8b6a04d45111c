use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Instant,
};

use primitives::Clock;

/// The outcome of [`TokenBucket::acquire`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    /// Tokens left in the bucket after this request.
    pub remaining: u32,
}

/// The rate limit state of a single client.
pub struct TokenBucket {
    capacity: u32,
    /// Tokens per second
    refill_rate: u32,
    clock: Arc<dyn Clock>,
    state: Mutex<State>,
}

#[derive(Debug, Clone, Copy)]
struct State {
    tokens: u32,
    last_refill: Instant,
}

impl State {
    /// Adds the whole tokens earned since `last_refill`.
    ///
    /// `last_refill` only moves when at least one token is added,
    /// so the fractional part keeps accumulating across quick successive calls.
    fn refill(&mut self, now: Instant, capacity: u32, refill_rate: u32) {
        // a clock regression counts as no time passing
        let elapsed = now.saturating_duration_since(self.last_refill);
        let to_add = (elapsed.as_secs_f64() * f64::from(refill_rate)).floor() as u64;

        if to_add > 0 {
            let tokens = (u64::from(self.tokens) + to_add).min(u64::from(capacity));
            self.tokens = u32::try_from(tokens).unwrap_or(capacity);
            self.last_refill = now;
        }
    }
}

impl TokenBucket {
    /// A new bucket starts full.
    pub fn new(capacity: u32, refill_rate: u32, clock: Arc<dyn Clock>) -> Self {
        let last_refill = clock.instant();

        Self {
            capacity,
            refill_rate,
            clock,
            state: Mutex::new(State {
                tokens: capacity,
                last_refill,
            }),
        }
    }

    /// Refills, then takes a token if there is one.
    ///
    /// The whole operation happens under the bucket lock.
    pub fn acquire(&self) -> Decision {
        let mut state = self.lock();
        let now = self.clock.instant();

        state.refill(now, self.capacity, self.refill_rate);

        let allowed = state.tokens > 0;
        if allowed {
            state.tokens -= 1;
        }

        Decision {
            allowed,
            remaining: state.tokens,
        }
    }

    pub fn allow(&self) -> bool {
        self.acquire().allowed
    }

    /// The current token count, without refilling.
    pub fn tokens(&self) -> u32 {
        self.lock().tokens
    }

    pub fn last_refill(&self) -> Instant {
        self.lock().last_refill
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// A panic while holding the lock can't leave the [`State`] half-updated,
    /// so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for TokenBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = *self.lock();

        f.debug_struct("TokenBucket")
            .field("capacity", &self.capacity)
            .field("refill_rate", &self.refill_rate)
            .field("tokens", &state.tokens)
            .field("last_refill", &state.last_refill)
            .finish()
    }
}
