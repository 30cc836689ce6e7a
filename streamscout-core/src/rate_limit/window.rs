//! Timestamp-based sliding window counter.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::Instant;

/// Counts events inside a trailing time window.
///
/// Stores raw timestamps; every read or write first evicts entries older
/// than the window size. Cost is linear in the number of retained entries,
/// which the configured rate bounds.
#[derive(Debug, Clone)]
pub struct SlidingWindow {
    size: Duration,
    timestamps: VecDeque<Instant>,
}

impl SlidingWindow {
    pub fn new(size: Duration) -> Self {
        Self {
            size,
            timestamps: VecDeque::new(),
        }
    }

    pub fn size(&self) -> Duration {
        self.size
    }

    /// Events still inside the window at `now`.
    pub fn count(&mut self, now: Instant) -> usize {
        self.evict(now);
        self.timestamps.len()
    }

    /// Records an event at `now`.
    ///
    /// Timestamps only move forward; an older `now` is clamped to the
    /// newest recorded entry.
    pub fn record(&mut self, now: Instant) {
        self.evict(now);
        let at = match self.timestamps.back() {
            Some(&newest) if newest > now => newest,
            _ => now,
        };
        self.timestamps.push_back(at);
    }

    /// Time until the window holds fewer than `limit` events, or `None`
    /// when there is room already.
    pub fn wait_time(&mut self, now: Instant, limit: usize) -> Option<Duration> {
        self.evict(now);
        if self.timestamps.len() < limit {
            return None;
        }
        // The entry that must expire to bring the count to `limit - 1`.
        let blocking = self.timestamps.len() - limit.max(1);
        self.timestamps
            .get(blocking)
            .map(|&at| self.size.saturating_sub(now.saturating_duration_since(at)))
    }

    /// Time until the oldest retained event leaves the window.
    pub fn oldest_expiry(&mut self, now: Instant) -> Option<Duration> {
        self.evict(now);
        self.timestamps
            .front()
            .map(|&at| self.size.saturating_sub(now.saturating_duration_since(at)))
    }

    fn evict(&mut self, now: Instant) {
        while let Some(&oldest) = self.timestamps.front() {
            if now.saturating_duration_since(oldest) >= self.size {
                self.timestamps.pop_front();
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_entries_expire_after_window() {
        let start = Instant::now();
        let mut window = SlidingWindow::new(Duration::from_secs(60));

        window.record(start);
        window.record(start + Duration::from_secs(10));
        assert_eq!(window.count(start + Duration::from_secs(30)), 2);
        assert_eq!(window.count(start + Duration::from_secs(60)), 1);
        assert_eq!(window.count(start + Duration::from_secs(70)), 0);
    }

    #[test]
    fn test_wait_time_points_at_blocking_entry() {
        let start = Instant::now();
        let mut window = SlidingWindow::new(Duration::from_secs(60));

        window.record(start);
        window.record(start + Duration::from_secs(20));
        let now = start + Duration::from_secs(30);

        assert_eq!(window.wait_time(now, 3), None);
        assert_eq!(window.wait_time(now, 2), Some(Duration::from_secs(30)));
        assert_eq!(window.wait_time(now, 1), Some(Duration::from_secs(50)));
        assert_eq!(window.oldest_expiry(now), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_record_never_moves_backwards() {
        let start = Instant::now();
        let mut window = SlidingWindow::new(Duration::from_secs(60));

        window.record(start + Duration::from_secs(5));
        window.record(start);
        assert_eq!(window.oldest_expiry(start + Duration::from_secs(5)), Some(Duration::from_secs(60)));
    }

    proptest! {
        #[test]
        fn grants_never_exceed_limit_in_any_window(
            mut offsets in prop::collection::vec(0u64..600_000, 1..200),
            limit in 1usize..20,
        ) {
            offsets.sort_unstable();
            let start = Instant::now();
            let size = Duration::from_secs(60);
            let mut window = SlidingWindow::new(size);
            let mut granted = Vec::new();

            for offset in offsets {
                let now = start + Duration::from_millis(offset);
                if window.wait_time(now, limit).is_none() {
                    window.record(now);
                    granted.push(offset);
                }
            }

            for (index, &first) in granted.iter().enumerate() {
                let inside = granted[index..]
                    .iter()
                    .take_while(|&&later| later < first + size.as_millis() as u64)
                    .count();
                prop_assert!(inside <= limit);
            }
        }
    }
}
