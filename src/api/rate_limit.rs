// src/api/rate_limit.rs
//! Minimum-interval pacing per external call class.
//!
//! The limiter is shared through an `Arc` by every client of a run. Each
//! [`ServiceKey`] owns one slot; a caller holds that slot's lock while it
//! sleeps, so two callers of the same key can never be let through closer
//! together than the configured interval.

use async_trait::async_trait;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Classes of calls that are paced independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceKey {
    /// One step of the outer campaign loop.
    Organization,
    /// One contact lookup while resolving an organization's people.
    PersonLookup,
    /// Any CRM HTTP call.
    Crm,
    /// Any mail provider call.
    Mail,
}

impl ServiceKey {
    pub const ALL: [ServiceKey; 4] = [
        ServiceKey::Organization,
        ServiceKey::PersonLookup,
        ServiceKey::Crm,
        ServiceKey::Mail,
    ];

    fn slot(self) -> usize {
        match self {
            Self::Organization => 0,
            Self::PersonLookup => 1,
            Self::Crm => 2,
            Self::Mail => 3,
        }
    }
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Organization => "organization",
            Self::PersonLookup => "person-lookup",
            Self::Crm => "crm",
            Self::Mail => "mail",
        };
        write!(f, "{}", name)
    }
}

/// Source of time for the limiter.
///
/// # Laws
///
/// - `now()` never goes backwards.
/// - After `sleep(d)` returns, `now()` is at least `d` later than before the call.
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
    async fn sleep(&self, duration: Duration);
}

/// Wall-clock time through the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Virtual time that moves only when slept on or advanced by hand.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    elapsed_nanos: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            elapsed_nanos: AtomicU64::new(0),
        }
    }

    pub fn advance(&self, duration: Duration) {
        let nanos = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
        self.elapsed_nanos.fetch_add(nanos, Ordering::SeqCst);
    }

    /// Virtual time elapsed since the clock was created.
    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.elapsed_nanos.load(Ordering::SeqCst))
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }

    async fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}

#[derive(Default)]
struct Slot {
    min_interval: Duration,
    last_permit: Mutex<Option<Instant>>,
}

/// Enforces a minimum interval between permitted calls, per [`ServiceKey`].
pub struct RateLimiter {
    clock: Arc<dyn Clock>,
    slots: [Slot; 4],
}

impl RateLimiter {
    /// A limiter with every interval at zero.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            slots: Default::default(),
        }
    }

    /// A limiter that never waits, on the real clock.
    pub fn unpaced() -> Self {
        Self::new(Arc::new(TokioClock))
    }

    pub fn with_interval(mut self, key: ServiceKey, interval: Duration) -> Self {
        self.slots[key.slot()].min_interval = interval;
        self
    }

    pub fn min_interval(&self, key: ServiceKey) -> Duration {
        self.slots[key.slot()].min_interval
    }

    /// Suspends until `key`'s interval has passed since its last permit,
    /// then records a new permit.
    pub async fn wait(&self, key: ServiceKey) {
        let slot = &self.slots[key.slot()];
        let mut last_permit = slot.last_permit.lock().await;

        if let Some(previous) = *last_permit {
            let due = previous + slot.min_interval;
            let now = self.clock.now();
            if due > now {
                let delay = due - now;
                log::trace!("pacing {}: waiting {:?}", key, delay);
                self.clock.sleep(delay).await;
            }
        }

        *last_permit = Some(self.clock.now());
    }
}

impl fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for key in ServiceKey::ALL {
            map.entry(&key, &self.min_interval(key));
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(clock: &Arc<ManualClock>) -> RateLimiter {
        RateLimiter::new(clock.clone())
            .with_interval(ServiceKey::PersonLookup, Duration::from_millis(133))
            .with_interval(ServiceKey::Organization, Duration::from_millis(1_000))
    }

    #[tokio::test]
    async fn first_call_is_not_delayed() {
        let clock = Arc::new(ManualClock::new());
        let limiter = limiter(&clock);

        limiter.wait(ServiceKey::PersonLookup).await;

        assert_eq!(clock.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn consecutive_calls_are_spaced_by_the_interval() {
        let clock = Arc::new(ManualClock::new());
        let limiter = limiter(&clock);

        limiter.wait(ServiceKey::PersonLookup).await;
        let first = clock.now();
        limiter.wait(ServiceKey::PersonLookup).await;
        let second = clock.now();

        assert!(second - first >= Duration::from_millis(133));
    }

    #[tokio::test]
    async fn time_already_spent_counts_toward_the_interval() {
        let clock = Arc::new(ManualClock::new());
        let limiter = limiter(&clock);

        limiter.wait(ServiceKey::Organization).await;
        clock.advance(Duration::from_millis(600));
        limiter.wait(ServiceKey::Organization).await;

        assert_eq!(clock.elapsed(), Duration::from_millis(1_000));
    }

    #[tokio::test]
    async fn keys_are_paced_independently() {
        let clock = Arc::new(ManualClock::new());
        let limiter = limiter(&clock);

        limiter.wait(ServiceKey::Organization).await;
        limiter.wait(ServiceKey::PersonLookup).await;
        limiter.wait(ServiceKey::Crm).await;
        limiter.wait(ServiceKey::Crm).await;

        assert_eq!(clock.elapsed(), Duration::ZERO);
    }

    #[test]
    fn unset_intervals_are_zero() {
        let limiter = RateLimiter::unpaced();
        for key in ServiceKey::ALL {
            assert_eq!(limiter.min_interval(key), Duration::ZERO);
        }
    }
}
