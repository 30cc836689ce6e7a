//! Per-provider request budgets with a process-wide concurrency cap.
//!
//! A grant requires, in order: a global slot, room in the provider's hour
//! and minute windows, a burst slot and the provider cooldown to have
//! elapsed. The final window re-check and the timestamp recording happen
//! under one lock so concurrent callers can never overshoot a window.

pub mod window;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;
use tracing::{debug, trace};

pub use window::SlidingWindow;

use crate::config::{RateLimitConfig, RateLimitSettings};

const MINUTE: Duration = Duration::from_secs(60);
const HOUR: Duration = Duration::from_secs(3_600);

/// Errors raised while acquiring a provider permit.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RateLimitError {
    /// The supplied budget cannot be enforced
    #[error("Invalid rate limit for provider '{provider_id}': {reason}")]
    InvalidConfig {
        /// Provider the budget was supplied for
        provider_id: String,
        /// Validation failure
        reason: String,
    },
    /// A semaphore was closed while waiting
    #[error("Rate limiter closed while acquiring permit for '{provider_id}'")]
    Closed {
        /// Provider the permit was requested for
        provider_id: String,
    },
}

/// Snapshot of a provider's budget usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitStatus {
    /// No further grant possible right now
    pub is_rate_limited: bool,
    /// Grants left before the tighter of the two windows fills up
    pub remaining_requests: u32,
    /// Milliseconds until the next window slot frees up
    pub reset_time_ms: u64,
    /// Permits currently held
    pub current_burst: u32,
}

/// Proof of one granted provider request.
///
/// Holds a global slot and a provider burst slot; both return to their
/// pools when the permit is dropped or passed to
/// [`RateLimiter::release_permit`].
#[derive(Debug)]
pub struct RateLimitPermit {
    provider_id: String,
    granted_at: Instant,
    _burst: OwnedSemaphorePermit,
    _global: OwnedSemaphorePermit,
}

impl RateLimitPermit {
    pub fn provider_id(&self) -> &str {
        &self.provider_id
    }

    /// Time the request was recorded in the provider windows.
    pub fn granted_at(&self) -> Instant {
        self.granted_at
    }
}

impl Drop for RateLimitPermit {
    fn drop(&mut self) {
        trace!(provider_id = %self.provider_id, "Rate limit permit released");
    }
}

#[derive(Debug)]
struct ProviderWindows {
    minute: SlidingWindow,
    hour: SlidingWindow,
    last_grant: Option<Instant>,
    config: RateLimitConfig,
}

impl ProviderWindows {
    fn new(config: RateLimitConfig) -> Self {
        Self {
            minute: SlidingWindow::new(MINUTE),
            hour: SlidingWindow::new(HOUR),
            last_grant: None,
            config,
        }
    }

    fn window_wait(&mut self, now: Instant, config: &RateLimitConfig) -> Option<Duration> {
        self.hour
            .wait_time(now, config.requests_per_hour as usize)
            .or_else(|| self.minute.wait_time(now, config.requests_per_minute as usize))
    }

    fn cooldown_wait(&self, now: Instant, config: &RateLimitConfig) -> Option<Duration> {
        let last = self.last_grant?;
        let ready_at = last + config.cooldown();
        (ready_at > now).then(|| ready_at - now)
    }

    /// Records a grant at `now` unless a window or the cooldown blocks it.
    fn try_record(&mut self, now: Instant, config: &RateLimitConfig) -> Result<(), Duration> {
        if let Some(wait) = self.window_wait(now, config).or_else(|| self.cooldown_wait(now, config)) {
            return Err(wait);
        }
        self.minute.record(now);
        self.hour.record(now);
        self.last_grant = Some(now);
        self.config = *config;
        Ok(())
    }
}

#[derive(Debug)]
struct ProviderState {
    burst: Arc<Semaphore>,
    burst_size: u32,
    windows: Mutex<ProviderWindows>,
}

/// Admission control for outbound provider requests.
///
/// Provider state is created on first use; the burst pool is sized from the
/// budget supplied on that first call.
#[derive(Debug)]
pub struct RateLimiter {
    global: Arc<Semaphore>,
    global_capacity: usize,
    providers: Mutex<HashMap<String, Arc<ProviderState>>>,
}

impl RateLimiter {
    /// Creates a limiter allowing `global_capacity` requests in flight.
    ///
    /// A capacity of zero is raised to one.
    pub fn new(global_capacity: usize) -> Self {
        let global_capacity = global_capacity.max(1);
        Self {
            global: Arc::new(Semaphore::new(global_capacity)),
            global_capacity,
            providers: Mutex::new(HashMap::new()),
        }
    }

    /// Creates a limiter from process-wide settings.
    pub fn from_settings(settings: &RateLimitSettings) -> Self {
        Self::new(settings.global_concurrency)
    }

    /// Waits until `provider_id` may issue one request under `config`.
    ///
    /// Cancel-safe: dropping the future before it resolves returns every
    /// slot it held and records nothing.
    ///
    /// # Errors
    /// - `RateLimitError::InvalidConfig` - A zero rate or burst size
    /// - `RateLimitError::Closed` - The limiter was torn down while waiting
    pub async fn acquire_permit(
        &self,
        provider_id: &str,
        config: &RateLimitConfig,
    ) -> Result<RateLimitPermit, RateLimitError> {
        let global = Arc::clone(&self.global)
            .acquire_owned()
            .await
            .map_err(|_| RateLimitError::Closed {
                provider_id: provider_id.to_string(),
            })?;

        // Returning early drops `global` and hands the slot back.
        config
            .validate()
            .map_err(|error| RateLimitError::InvalidConfig {
                provider_id: provider_id.to_string(),
                reason: error.to_string(),
            })?;

        let state = self.provider_state(provider_id, config);

        loop {
            let wait = state.windows.lock().window_wait(Instant::now(), config);
            match wait {
                Some(wait) => {
                    debug!(provider_id, wait_ms = wait.as_millis() as u64, "Provider window full, waiting");
                    tokio::time::sleep(wait).await;
                }
                None => break,
            }
        }

        let burst = Arc::clone(&state.burst)
            .acquire_owned()
            .await
            .map_err(|_| RateLimitError::Closed {
                provider_id: provider_id.to_string(),
            })?;

        let granted_at = loop {
            let now = Instant::now();
            let outcome = state.windows.lock().try_record(now, config);
            match outcome {
                Ok(()) => break now,
                Err(wait) => {
                    trace!(provider_id, wait_ms = wait.as_millis() as u64, "Cooldown or window pending");
                    tokio::time::sleep(wait).await;
                }
            }
        };

        debug!(provider_id, "Rate limit permit granted");
        Ok(RateLimitPermit {
            provider_id: provider_id.to_string(),
            granted_at,
            _burst: burst,
            _global: global,
        })
    }

    /// Returns the permit's burst and global slots.
    ///
    /// Timestamps stay in the windows until they age out.
    pub fn release_permit(&self, permit: RateLimitPermit) {
        drop(permit);
    }

    /// Current usage for `provider_id`, or `None` if it never requested a
    /// permit.
    pub fn rate_limit_status(&self, provider_id: &str) -> Option<RateLimitStatus> {
        let state = self.providers.lock().get(provider_id).cloned()?;
        let now = Instant::now();
        let mut windows = state.windows.lock();
        let config = windows.config;

        let minute_used = windows.minute.count(now) as u32;
        let hour_used = windows.hour.count(now) as u32;
        let remaining_requests = config
            .requests_per_minute
            .saturating_sub(minute_used)
            .min(config.requests_per_hour.saturating_sub(hour_used));

        let reset = match windows.window_wait(now, &config) {
            Some(wait) => Some(wait),
            None => windows.minute.oldest_expiry(now),
        };

        let available = state.burst.available_permits() as u32;
        Some(RateLimitStatus {
            is_rate_limited: remaining_requests == 0,
            remaining_requests,
            reset_time_ms: reset.map_or(0, |wait| wait.as_millis() as u64),
            current_burst: state.burst_size.saturating_sub(available),
        })
    }

    /// Free global slots.
    pub fn global_available(&self) -> usize {
        self.global.available_permits()
    }

    pub fn global_capacity(&self) -> usize {
        self.global_capacity
    }

    fn provider_state(&self, provider_id: &str, config: &RateLimitConfig) -> Arc<ProviderState> {
        let mut providers = self.providers.lock();
        let state = providers.entry(provider_id.to_string()).or_insert_with(|| {
            debug!(provider_id, burst_size = config.burst_size, "Tracking new provider");
            Arc::new(ProviderState {
                burst: Arc::new(Semaphore::new(config.burst_size as usize)),
                burst_size: config.burst_size,
                windows: Mutex::new(ProviderWindows::new(*config)),
            })
        });
        Arc::clone(state)
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::from_settings(&RateLimitSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn budget(per_minute: u32, burst: u32, cooldown_ms: u64) -> RateLimitConfig {
        RateLimitConfig {
            requests_per_minute: per_minute,
            requests_per_hour: 1_000,
            burst_size: burst,
            cooldown_delay_ms: cooldown_ms,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_minute_window_delays_excess_request() {
        let limiter = RateLimiter::new(4);
        let config = budget(3, 5, 0);
        let start = Instant::now();

        for _ in 0..3 {
            let permit = limiter.acquire_permit("alpha", &config).await.unwrap();
            limiter.release_permit(permit);
        }
        assert!(start.elapsed() < Duration::from_secs(1));

        let _fourth = limiter.acquire_permit("alpha", &config).await.unwrap();
        assert!(start.elapsed() >= MINUTE);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_spaces_grants() {
        let limiter = RateLimiter::new(4);
        let config = budget(30, 5, 500);

        let first = limiter.acquire_permit("alpha", &config).await.unwrap();
        let second = limiter.acquire_permit("alpha", &config).await.unwrap();

        assert!(second.granted_at() - first.granted_at() >= Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_limits_concurrent_permits() {
        let limiter = Arc::new(RateLimiter::new(4));
        let config = budget(30, 1, 0);

        let held = limiter.acquire_permit("alpha", &config).await.unwrap();
        let waiter = {
            let limiter = Arc::clone(&limiter);
            tokio::spawn(async move { limiter.acquire_permit("alpha", &config).await })
        };

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(!waiter.is_finished());
        assert_eq!(limiter.rate_limit_status("alpha").unwrap().current_burst, 1);

        limiter.release_permit(held);
        let permit = waiter.await.unwrap().unwrap();
        assert_eq!(permit.provider_id(), "alpha");
    }

    #[tokio::test(start_paused = true)]
    async fn test_global_cap_spans_providers() {
        let limiter = Arc::new(RateLimiter::new(1));
        let config = budget(30, 5, 0);

        let held = limiter.acquire_permit("alpha", &config).await.unwrap();
        assert_eq!(limiter.global_available(), 0);

        let waiter = {
            let limiter = Arc::clone(&limiter);
            tokio::spawn(async move { limiter.acquire_permit("beta", &config).await })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!waiter.is_finished());

        drop(held);
        let permit = waiter.await.unwrap().unwrap();
        assert_eq!(limiter.global_available(), 0);
        drop(permit);
        assert_eq!(limiter.global_available(), 1);
    }

    #[tokio::test]
    async fn test_invalid_config_returns_global_slot() {
        let limiter = RateLimiter::new(2);
        let config = budget(30, 0, 0);

        let err = tokio_test::assert_err!(limiter.acquire_permit("alpha", &config).await);

        assert!(matches!(err, RateLimitError::InvalidConfig { .. }));
        assert_eq!(limiter.global_available(), 2);
        assert!(limiter.rate_limit_status("alpha").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_acquisition_releases_slots() {
        let limiter = Arc::new(RateLimiter::new(2));
        let config = budget(1, 5, 0);

        drop(limiter.acquire_permit("alpha", &config).await.unwrap());

        let waiter = {
            let limiter = Arc::clone(&limiter);
            tokio::spawn(async move { limiter.acquire_permit("alpha", &config).await })
        };
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(limiter.global_available(), 1);

        waiter.abort();
        let _ = waiter.await;
        assert_eq!(limiter.global_available(), 2);
        assert_eq!(limiter.rate_limit_status("alpha").unwrap().remaining_requests, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_reports_remaining_budget() {
        let limiter = RateLimiter::new(4);
        let config = budget(3, 5, 0);

        let first = limiter.acquire_permit("alpha", &config).await.unwrap();
        let _second = limiter.acquire_permit("alpha", &config).await.unwrap();

        let status = limiter.rate_limit_status("alpha").unwrap();
        assert!(!status.is_rate_limited);
        assert_eq!(status.remaining_requests, 1);
        assert_eq!(status.current_burst, 2);
        assert!(status.reset_time_ms <= 60_000);

        drop(first);
        let _third = limiter.acquire_permit("alpha", &config).await.unwrap();
        let status = limiter.rate_limit_status("alpha").unwrap();
        assert!(status.is_rate_limited);
        assert_eq!(status.remaining_requests, 0);
        assert!(status.reset_time_ms > 0);
        assert_eq!(status.current_burst, 2);
    }
}
