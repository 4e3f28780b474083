//! Sliding-window access event tracker
//!
//! - One log per kind (authorized / unauthorized)
//! - Entries older than the window (default 5 min) are pruned on every call
//! - Same device timestamp as the last recorded entry = same physical event

use std::collections::VecDeque;
use chrono::{DateTime, Duration, Utc};
use tracing::debug;
use crate::{EVENT_WINDOW_SECS, MAX_EVENTS_PER_KIND};
use crate::types::{AccessKind, AccessObservation, SecurityEvent};

#[derive(Debug, Default)]
struct KindLog {
    events: VecDeque<SecurityEvent>,
    /// Survives pruning so an expired event still on the store is not re-counted
    last_device_timestamp: Option<String>,
}

/// Time-bounded event logs
#[derive(Debug)]
pub struct EventTracker {
    authorized: KindLog,
    unauthorized: KindLog,
    window: Duration,
    capacity: usize,
}

impl Default for EventTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl EventTracker {
    /// Create tracker with default window (5 min) and capacity
    pub fn new() -> Self {
        Self::with_window(EVENT_WINDOW_SECS, MAX_EVENTS_PER_KIND)
    }

    /// Create tracker with custom window and per-kind capacity
    pub fn with_window(secs: u64, capacity: usize) -> Self {
        Self {
            authorized: KindLog::default(),
            unauthorized: KindLog::default(),
            window: Duration::seconds(secs as i64),
            capacity: capacity.max(1),
        }
    }

    /// Prune, log the observation if it is new, return the count for `kind`
    pub fn record_and_count(
        &mut self,
        kind: AccessKind,
        observation: Option<AccessObservation>,
        now: DateTime<Utc>,
    ) -> usize {
        self.prune(now);

        let capacity = self.capacity;
        let log = self.log_mut(kind);

        if let Some(obs) = observation.filter(|o| o.kind == kind) {
            if log.last_device_timestamp.as_deref() != Some(obs.device_timestamp.as_str()) {
                debug!(kind = %kind, card = %obs.card_id, device_ts = %obs.device_timestamp, "access event recorded");
                log.last_device_timestamp = Some(obs.device_timestamp.clone());
                log.events.push_back(SecurityEvent::from_observation(obs, now));
                while log.events.len() > capacity {
                    log.events.pop_front();
                }
            }
        }

        log.events.len()
    }

    /// Drop entries older than the window from both logs
    fn prune(&mut self, now: DateTime<Utc>) {
        let window = self.window;
        for log in [&mut self.authorized, &mut self.unauthorized] {
            log.events.retain(|e| now - e.received_at <= window);
        }
    }

    fn log(&self, kind: AccessKind) -> &KindLog {
        match kind {
            AccessKind::Authorized => &self.authorized,
            AccessKind::Unauthorized => &self.unauthorized,
        }
    }

    fn log_mut(&mut self, kind: AccessKind) -> &mut KindLog {
        match kind {
            AccessKind::Authorized => &mut self.authorized,
            AccessKind::Unauthorized => &mut self.unauthorized,
        }
    }

    /// Entries currently held for `kind` (as of the last prune)
    pub fn count(&self, kind: AccessKind) -> usize {
        self.log(kind).events.len()
    }

    /// Up to `n` entries for `kind`, newest first
    pub fn recent(&self, kind: AccessKind, n: usize) -> Vec<SecurityEvent> {
        self.log(kind).events.iter().rev().take(n).cloned().collect()
    }

    pub fn window_secs(&self) -> i64 {
        self.window.num_seconds()
    }

    /// Forget everything, including dedup markers
    pub fn clear(&mut self) {
        self.authorized = KindLog::default();
        self.unauthorized = KindLog::default();
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(ts: &str, kind: AccessKind) -> Option<AccessObservation> {
        Some(AccessObservation {
            device_timestamp: ts.to_string(),
            card_id: "CARD".to_string(),
            kind,
        })
    }

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-06-01T12:00:00Z").unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_repoll_same_event_counts_once() {
        let mut tracker = EventTracker::new();
        let now = t0();
        assert_eq!(tracker.record_and_count(AccessKind::Unauthorized, obs("100", AccessKind::Unauthorized), now), 1);
        assert_eq!(
            tracker.record_and_count(AccessKind::Unauthorized, obs("100", AccessKind::Unauthorized), now + Duration::seconds(1)),
            1
        );
    }

    #[test]
    fn test_distinct_events_accumulate() {
        let mut tracker = EventTracker::new();
        for i in 0..5 {
            let n = tracker.record_and_count(
                AccessKind::Unauthorized,
                obs(&i.to_string(), AccessKind::Unauthorized),
                t0() + Duration::seconds(i),
            );
            assert_eq!(n, i as usize + 1);
        }
    }

    #[test]
    fn test_dedup_only_against_latest() {
        let mut tracker = EventTracker::new();
        let k = AccessKind::Authorized;
        tracker.record_and_count(k, obs("a", k), t0());
        tracker.record_and_count(k, obs("b", k), t0());
        // "a" again differs from the latest ("b"), so it is a new entry
        assert_eq!(tracker.record_and_count(k, obs("a", k), t0()), 3);
    }

    #[test]
    fn test_window_expiry() {
        let mut tracker = EventTracker::with_window(60, 100);
        let k = AccessKind::Unauthorized;
        tracker.record_and_count(k, obs("1", k), t0());
        tracker.record_and_count(k, obs("2", k), t0() + Duration::seconds(30));
        assert_eq!(tracker.record_and_count(k, None, t0() + Duration::seconds(60)), 2);
        assert_eq!(tracker.record_and_count(k, None, t0() + Duration::seconds(61)), 1);
        assert_eq!(tracker.record_and_count(k, None, t0() + Duration::seconds(200)), 0);
    }

    #[test]
    fn test_expired_event_not_recounted() {
        let mut tracker = EventTracker::with_window(60, 100);
        let k = AccessKind::Unauthorized;
        tracker.record_and_count(k, obs("1", k), t0());
        // Store still reports the same event long after it expired
        assert_eq!(tracker.record_and_count(k, obs("1", k), t0() + Duration::seconds(120)), 0);
    }

    #[test]
    fn test_wrong_kind_observation_ignored() {
        let mut tracker = EventTracker::new();
        let n = tracker.record_and_count(AccessKind::Authorized, obs("1", AccessKind::Unauthorized), t0());
        assert_eq!(n, 0);
    }

    #[test]
    fn test_capacity_bound() {
        let mut tracker = EventTracker::with_window(300, 3);
        let k = AccessKind::Authorized;
        for i in 0..5 {
            tracker.record_and_count(k, obs(&i.to_string(), k), t0());
        }
        assert_eq!(tracker.count(k), 3);
        let recent: Vec<_> = tracker.recent(k, 10).into_iter().map(|e| e.device_timestamp).collect();
        assert_eq!(recent, vec!["4", "3", "2"]);
    }

    #[test]
    fn test_recent_newest_first_capped() {
        let mut tracker = EventTracker::new();
        let k = AccessKind::Unauthorized;
        for i in 0..4 {
            tracker.record_and_count(k, obs(&i.to_string(), k), t0() + Duration::seconds(i));
        }
        let recent = tracker.recent(k, 2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].device_timestamp, "3");
        assert_eq!(recent[1].device_timestamp, "2");
        assert!(tracker.recent(AccessKind::Authorized, 5).is_empty());
    }

    #[test]
    fn test_clear() {
        let mut tracker = EventTracker::new();
        let k = AccessKind::Unauthorized;
        tracker.record_and_count(k, obs("1", k), t0());
        tracker.clear();
        assert_eq!(tracker.count(k), 0);
        assert_eq!(tracker.record_and_count(k, obs("1", k), t0()), 1);
    }
}
