//! Hub activity counters

use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide hub counters
///
/// Updated by the hub loop, readable from any task via
/// [`HubHandle::stats`](crate::HubHandle::stats). Counters are monotonic
/// except for the active-connections gauge.
#[derive(Debug, Default)]
pub struct HubStats {
    total_connections: AtomicU64,
    active_connections: AtomicU64,
    messages_broadcast: AtomicU64,
    messages_delivered: AtomicU64,
    slow_evictions: AtomicU64,
}

impl HubStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connections ever registered
    pub fn total_connections(&self) -> u64 {
        self.total_connections.load(Ordering::Relaxed)
    }

    /// Currently registered connections
    pub fn active_connections(&self) -> u64 {
        self.active_connections.load(Ordering::Relaxed)
    }

    /// Broadcast events processed by the hub loop
    pub fn messages_broadcast(&self) -> u64 {
        self.messages_broadcast.load(Ordering::Relaxed)
    }

    /// Successful enqueues onto per-connection outbound queues
    pub fn messages_delivered(&self) -> u64 {
        self.messages_delivered.load(Ordering::Relaxed)
    }

    /// Connections evicted for not draining their outbound queue
    pub fn slow_evictions(&self) -> u64 {
        self.slow_evictions.load(Ordering::Relaxed)
    }

    /// Point-in-time copy of all counters
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            total_connections: self.total_connections(),
            active_connections: self.active_connections(),
            messages_broadcast: self.messages_broadcast(),
            messages_delivered: self.messages_delivered(),
            slow_evictions: self.slow_evictions(),
        }
    }

    pub(crate) fn record_registered(&self) {
        self.total_connections.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_unregistered(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub(crate) fn record_eviction(&self) {
        self.slow_evictions.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub(crate) fn record_broadcast(&self) {
        self.messages_broadcast.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_delivery(&self) {
        self.messages_delivered.fetch_add(1, Ordering::Relaxed);
    }
}

/// Plain copy of [`HubStats`] counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub total_connections: u64,
    pub active_connections: u64,
    pub messages_broadcast: u64,
    pub messages_delivered: u64,
    pub slow_evictions: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_stats_are_zero() {
        let stats = HubStats::new();

        assert_eq!(stats.total_connections(), 0);
        assert_eq!(stats.active_connections(), 0);
        assert_eq!(stats.messages_broadcast(), 0);
        assert_eq!(stats.messages_delivered(), 0);
        assert_eq!(stats.slow_evictions(), 0);
    }

    #[test]
    fn test_register_unregister_gauge() {
        let stats = HubStats::new();

        stats.record_registered();
        stats.record_registered();
        stats.record_unregistered();

        assert_eq!(stats.total_connections(), 2);
        assert_eq!(stats.active_connections(), 1);
    }

    #[test]
    fn test_eviction_counts_and_decrements() {
        let stats = HubStats::new();

        stats.record_registered();
        stats.record_eviction();

        assert_eq!(stats.slow_evictions(), 1);
        assert_eq!(stats.active_connections(), 0);
    }

    #[test]
    fn test_snapshot_copies_counters() {
        let stats = HubStats::new();

        stats.record_registered();
        stats.record_broadcast();
        stats.record_delivery();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.total_connections, 1);
        assert_eq!(snapshot.messages_broadcast, 1);
        assert_eq!(snapshot.messages_delivered, 1);
        assert_eq!(snapshot, stats.snapshot());
    }
}
