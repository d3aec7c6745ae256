use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};
use tracing::trace;

/// Global singleton limiter instance
static PROCESS_LIMITER: OnceLock<RateLimiter> = OnceLock::new();

/// Fixed-rate slot reservation shared by every caller in the process.
///
/// Each `acquire` books the next free slot and sleeps until it arrives, so
/// outbound calls are spaced by at least `interval` no matter how many agents
/// are active. Waiters are not woken in FIFO order.
#[derive(Clone)]
pub struct RateLimiter {
    next_slot: Arc<Mutex<Option<Instant>>>,
    interval: Duration,
    granted: Arc<AtomicU64>,
}

impl RateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            next_slot: Arc::new(Mutex::new(None)),
            interval,
            granted: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Get or create the limiter shared by every gateway in this process.
    /// The interval of the first caller wins.
    pub fn process_wide(interval: Duration) -> Self {
        PROCESS_LIMITER.get_or_init(|| Self::new(interval)).clone()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn granted(&self) -> u64 {
        self.granted.load(Ordering::Relaxed)
    }

    pub async fn acquire(&self) {
        let slot = {
            let mut next = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = match *next {
                Some(reserved) if reserved > now => reserved,
                _ => now,
            };
            *next = Some(slot + self.interval);
            slot
        };

        let count = self.granted.fetch_add(1, Ordering::Relaxed) + 1;
        if slot > Instant::now() {
            trace!("🌐 request #{} waiting {:?} for its slot", count, slot - Instant::now());
        }
        sleep_until(slot).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn consecutive_calls_are_spaced_by_interval() {
        let limiter = RateLimiter::new(Duration::from_millis(500));
        let start = Instant::now();

        limiter.acquire().await;
        limiter.acquire().await;
        limiter.acquire().await;

        assert!(start.elapsed() >= Duration::from_millis(1000));
        assert_eq!(limiter.granted(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn clones_share_one_schedule() {
        let limiter = RateLimiter::new(Duration::from_secs(1));
        let other = limiter.clone();
        let start = Instant::now();

        let a = tokio::spawn({
            let limiter = limiter.clone();
            async move { limiter.acquire().await }
        });
        let b = tokio::spawn(async move { other.acquire().await });
        a.await.unwrap();
        b.await.unwrap();
        limiter.acquire().await;

        assert!(start.elapsed() >= Duration::from_secs(2));
    }
}
