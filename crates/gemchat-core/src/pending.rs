//! In-flight request tracking

use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Opaque identifier for one dispatched request
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How many requests may be outstanding at once
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConcurrencyMode {
    /// One request at a time; sending is disabled while it runs
    #[default]
    Single,
    /// Any number of concurrent requests
    Multiple,
}

impl ConcurrencyMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConcurrencyMode::Single => "single",
            ConcurrencyMode::Multiple => "multiple",
        }
    }
}

/// Set of requests that have been dispatched but not yet resolved.
///
/// Each id moves `idle -> in flight -> idle` exactly once.
#[derive(Debug)]
pub struct PendingRequests {
    mode: ConcurrencyMode,
    next_id: u64,
    in_flight: BTreeMap<RequestId, Instant>,
}

impl PendingRequests {
    pub fn new(mode: ConcurrencyMode) -> Self {
        Self {
            mode,
            next_id: 1,
            in_flight: BTreeMap::new(),
        }
    }

    pub fn mode(&self) -> ConcurrencyMode {
        self.mode
    }

    /// Hand out a fresh id. Ids are never reused within a session.
    pub fn allocate(&mut self) -> RequestId {
        let id = RequestId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn mark_pending(&mut self, id: RequestId) {
        self.in_flight.insert(id, Instant::now());
    }

    /// Returns how long the request was in flight, or `None` if `id` was not
    /// pending (already cleared or never marked).
    pub fn clear(&mut self, id: RequestId) -> Option<Duration> {
        self.in_flight.remove(&id).map(|started| started.elapsed())
    }

    pub fn is_pending(&self, id: RequestId) -> bool {
        self.in_flight.contains_key(&id)
    }

    pub fn is_any_pending(&self) -> bool {
        !self.in_flight.is_empty()
    }

    /// Whether a new request may be dispatched right now
    pub fn can_dispatch(&self) -> bool {
        match self.mode {
            ConcurrencyMode::Single => !self.is_any_pending(),
            ConcurrencyMode::Multiple => true,
        }
    }

    /// Pending ids, oldest first
    pub fn in_flight(&self) -> impl Iterator<Item = RequestId> + '_ {
        self.in_flight.keys().copied()
    }

    /// Number of requests in flight
    pub fn count(&self) -> usize {
        self.in_flight.len()
    }
}

impl Default for PendingRequests {
    fn default() -> Self {
        Self::new(ConcurrencyMode::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_mode_blocks_while_pending() {
        let mut pending = PendingRequests::new(ConcurrencyMode::Single);
        assert!(pending.can_dispatch());

        let id = pending.allocate();
        pending.mark_pending(id);
        assert!(pending.is_any_pending());
        assert!(!pending.can_dispatch());

        assert!(pending.clear(id).is_some());
        assert!(pending.can_dispatch());
    }

    #[test]
    fn test_multiple_mode_tracks_each_id() {
        let mut pending = PendingRequests::new(ConcurrencyMode::Multiple);
        let first = pending.allocate();
        let second = pending.allocate();
        pending.mark_pending(first);
        pending.mark_pending(second);

        assert!(pending.can_dispatch());
        assert_eq!(pending.in_flight().collect::<Vec<_>>(), vec![first, second]);

        pending.clear(first);
        assert!(!pending.is_pending(first));
        assert!(pending.is_pending(second));
        assert!(pending.is_any_pending());
    }

    #[test]
    fn test_clear_is_only_effective_once() {
        let mut pending = PendingRequests::default();
        let id = pending.allocate();
        pending.mark_pending(id);

        assert!(pending.clear(id).is_some());
        assert!(pending.clear(id).is_none());
    }

    #[test]
    fn test_ids_are_unique() {
        let mut pending = PendingRequests::default();
        let a = pending.allocate();
        let b = pending.allocate();
        assert_ne!(a, b);
        assert_eq!(a.to_string(), "#1");
    }

    #[test]
    fn test_mode_names_match_config_values() {
        let mode: ConcurrencyMode = serde_json::from_str("\"multiple\"").unwrap();
        assert_eq!(mode, ConcurrencyMode::Multiple);
        assert_eq!(ConcurrencyMode::Single.as_str(), "single");
        assert!(serde_json::from_str::<ConcurrencyMode>("\"bogus\"").is_err());
    }
}
