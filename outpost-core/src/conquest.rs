//! Per-player conquest cooldowns.
//!
//! Each player has one store entry, `{ "conquests": { "<villageId>": <ms> } }`,
//! recording when they last conquered each village. Nothing is kept in
//! memory between calls.
//!
//! Per (player, village) the lifecycle is
//! `Unconquered → OnCooldown → Ready → OnCooldown → …`: every recorded
//! conquest restarts the cooldown, and the pair becomes ready again once
//! the configured time has passed.
//!
//! Reads fail open. A missing, corrupt or unreadable record counts as "never
//! conquered", so a storage fault can never lock a player out of rewards.
//! The next recorded conquest overwrites a corrupt entry with valid JSON.
//! An entry the store could not read at all is left alone: recording over
//! it would erase the player's other cooldowns, so that conquest is dropped.
//!
//! Checking and recording are separate calls with no transaction between
//! them. Two conquest attempts that both check before either records will
//! both see `Ready`.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::config::ConquestConfig;
use crate::keys::KeyNamespace;
use crate::store::PersistentStore;

/// Rendered by [`ConquestTracker::formatted_cooldown`] when no wait remains.
pub const READY_LABEL: &str = "Ready";

#[derive(Debug, Default, Serialize, Deserialize)]
struct ConquestRecord {
    #[serde(default)]
    conquests: BTreeMap<String, i64>,
}

/// Where a (player, village) pair sits in the cooldown cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownState {
    /// No conquest on record.
    Unconquered,
    /// Conquered recently; rewards are blocked for `remaining_ms` more.
    OnCooldown {
        /// Milliseconds until the pair becomes ready.
        remaining_ms: u64,
    },
    /// Conquered before, and the cooldown has fully elapsed.
    Ready,
}

impl CooldownState {
    /// Whether a new rewarded conquest is allowed.
    #[must_use]
    pub fn can_conquer(self) -> bool {
        !matches!(self, Self::OnCooldown { .. })
    }

    /// Milliseconds left on the cooldown, zero when not cooling down.
    #[must_use]
    pub fn remaining_ms(self) -> u64 {
        match self {
            Self::OnCooldown { remaining_ms } => remaining_ms,
            Self::Unconquered | Self::Ready => 0,
        }
    }
}

/// Tracks when each player last conquered each village.
///
/// Sole writer of every `player_{id}_conquests` store entry.
pub struct ConquestTracker {
    store: Arc<dyn PersistentStore>,
    clock: Arc<dyn Clock>,
    keys: KeyNamespace,
    cooldown_ms: u64,
}

impl std::fmt::Debug for ConquestTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConquestTracker")
            .field("keys", &self.keys)
            .field("cooldown_ms", &self.cooldown_ms)
            .finish_non_exhaustive()
    }
}

impl ConquestTracker {
    /// Create a tracker over `store`.
    #[must_use]
    pub fn new(
        store: Arc<dyn PersistentStore>,
        clock: Arc<dyn Clock>,
        keys: KeyNamespace,
        config: &ConquestConfig,
    ) -> Self {
        Self {
            store,
            clock,
            keys,
            cooldown_ms: config.cooldown_ms,
        }
    }

    /// The configured cooldown.
    #[must_use]
    pub fn cooldown_ms(&self) -> u64 {
        self.cooldown_ms
    }

    /// Stamp `village_id` as conquered by `player_id` now.
    pub fn record_conquest(&self, player_id: &str, village_id: &str) {
        let key = self.keys.player_conquests(player_id);
        let Some(mut record) = self.load(&key) else {
            warn!(player = player_id, village = village_id, "Conquest not recorded, store unreadable");
            return;
        };
        let now = self.clock.now_ms();
        record.conquests.insert(village_id.to_string(), now);

        let json = match serde_json::to_string(&record) {
            Ok(json) => json,
            Err(e) => {
                warn!(player = player_id, error = %e, "Failed to encode conquest record");
                return;
            }
        };
        match self.store.set(&key, &json) {
            Ok(()) => debug!(player = player_id, village = village_id, at = now, "Conquest recorded"),
            Err(e) => warn!(player = player_id, error = %e, "Failed to persist conquest record"),
        }
    }

    /// Current position of the pair in the cooldown cycle.
    pub fn cooldown_state(&self, player_id: &str, village_id: &str) -> CooldownState {
        let record = self
            .load(&self.keys.player_conquests(player_id))
            .unwrap_or_default();
        let Some(&last) = record.conquests.get(village_id) else {
            return CooldownState::Unconquered;
        };

        // A timestamp from the future counts as "just now".
        let elapsed = u64::try_from(self.clock.now_ms().saturating_sub(last)).unwrap_or(0);
        if elapsed >= self.cooldown_ms {
            CooldownState::Ready
        } else {
            CooldownState::OnCooldown {
                remaining_ms: self.cooldown_ms - elapsed,
            }
        }
    }

    /// Whether `player_id` may be rewarded for conquering `village_id` now.
    pub fn can_conquer(&self, player_id: &str, village_id: &str) -> bool {
        self.cooldown_state(player_id, village_id).can_conquer()
    }

    /// Milliseconds until `player_id` may conquer `village_id` again.
    pub fn remaining_cooldown(&self, player_id: &str, village_id: &str) -> u64 {
        self.cooldown_state(player_id, village_id).remaining_ms()
    }

    /// `"Ready"` or the remaining wait as `"{minutes}m {seconds}s"`.
    pub fn formatted_cooldown(&self, player_id: &str, village_id: &str) -> String {
        format_remaining(self.remaining_cooldown(player_id, village_id))
    }

    /// Village ids `player_id` has ever conquered, sorted.
    pub fn conquered_villages(&self, player_id: &str) -> Vec<String> {
        self.load(&self.keys.player_conquests(player_id))
            .unwrap_or_default()
            .conquests
            .into_keys()
            .collect()
    }

    /// `None` when the store failed; absent and malformed entries read as empty.
    fn load(&self, key: &str) -> Option<ConquestRecord> {
        match self.store.get(key) {
            Ok(Some(raw)) => Some(serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(key, error = %e, "Malformed conquest record, treating as empty");
                ConquestRecord::default()
            })),
            Ok(None) => Some(ConquestRecord::default()),
            Err(e) => {
                warn!(key, error = %e, "Conquest record unreadable");
                None
            }
        }
    }
}

/// Render a remaining cooldown. Minutes and seconds are floored.
#[must_use]
pub fn format_remaining(remaining_ms: u64) -> String {
    if remaining_ms == 0 {
        return READY_LABEL.to_string();
    }
    let minutes = remaining_ms / 60_000;
    let seconds = (remaining_ms % 60_000) / 1_000;
    format!("{minutes}m {seconds}s")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    use crate::clock::ManualClock;
    use crate::error::{OutpostError, Result};
    use crate::store::MemoryStore;

    const COOLDOWN: u64 = 600_000;

    fn tracker() -> (ConquestTracker, Arc<MemoryStore>, Arc<ManualClock>) {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(10_000_000));
        let tracker = ConquestTracker::new(
            store.clone(),
            clock.clone(),
            KeyNamespace::default(),
            &ConquestConfig {
                cooldown_ms: COOLDOWN,
            },
        );
        (tracker, store, clock)
    }

    #[test]
    fn format_examples() {
        assert_eq!(format_remaining(0), "Ready");
        assert_eq!(format_remaining(330_000), "5m 30s");
        assert_eq!(format_remaining(59_999), "0m 59s");
        assert_eq!(format_remaining(999), "0m 0s");
        assert_eq!(format_remaining(3_600_000), "60m 0s");
    }

    #[test]
    fn cooldown_cycle() {
        let (tracker, _, clock) = tracker();
        assert_eq!(tracker.cooldown_state("p1", "v"), CooldownState::Unconquered);
        assert!(tracker.can_conquer("p1", "v"));

        tracker.record_conquest("p1", "v");
        assert!(!tracker.can_conquer("p1", "v"));
        assert_eq!(tracker.remaining_cooldown("p1", "v"), COOLDOWN);

        clock.advance(270_000);
        assert_eq!(tracker.remaining_cooldown("p1", "v"), 330_000);
        assert_eq!(tracker.formatted_cooldown("p1", "v"), "5m 30s");

        clock.advance(330_000);
        assert_eq!(tracker.cooldown_state("p1", "v"), CooldownState::Ready);
        assert!(tracker.can_conquer("p1", "v"));
        assert_eq!(tracker.formatted_cooldown("p1", "v"), "Ready");

        tracker.record_conquest("p1", "v");
        assert!(!tracker.can_conquer("p1", "v"));
    }

    #[test]
    fn cooldowns_are_per_player_and_village() {
        let (tracker, _, _) = tracker();
        tracker.record_conquest("p1", "a");
        assert!(!tracker.can_conquer("p1", "a"));
        assert!(tracker.can_conquer("p1", "b"));
        assert!(tracker.can_conquer("p2", "a"));
        assert_eq!(tracker.remaining_cooldown("p2", "a"), 0);
    }

    #[test]
    fn unconquered_reports_ready() {
        let (tracker, store, _) = tracker();
        assert_eq!(tracker.formatted_cooldown("p1", "v"), "Ready");
        assert!(store.is_empty(), "queries must not write");
    }

    #[test]
    fn persisted_shape() {
        let (tracker, store, _) = tracker();
        tracker.record_conquest("p1", "village_100_200");
        let raw = store
            .get("outpost:player_p1_conquests")
            .expect("get")
            .expect("written");
        let json: serde_json::Value = serde_json::from_str(&raw).expect("json");
        assert_eq!(json["conquests"]["village_100_200"], 10_000_000);
    }

    #[test]
    fn malformed_record_fails_open_and_is_repaired() {
        let (tracker, store, _) = tracker();
        store
            .set("outpost:player_p1_conquests", "[[[")
            .expect("seed");

        assert!(tracker.can_conquer("p1", "v"));
        assert_eq!(tracker.remaining_cooldown("p1", "v"), 0);
        assert_eq!(tracker.formatted_cooldown("p1", "v"), "Ready");

        tracker.record_conquest("p1", "v");
        let raw = store
            .get("outpost:player_p1_conquests")
            .expect("get")
            .expect("written");
        assert!(serde_json::from_str::<serde_json::Value>(&raw).is_ok());
        assert!(!tracker.can_conquer("p1", "v"));
    }

    #[test]
    fn wrong_shape_fails_open() {
        let (tracker, store, _) = tracker();
        store
            .set("outpost:player_p1_conquests", r#"{"conquests":{"v":"yesterday"}}"#)
            .expect("seed");
        assert!(tracker.can_conquer("p1", "v"));
    }

    #[test]
    fn record_keeps_other_villages() {
        let (tracker, _, clock) = tracker();
        tracker.record_conquest("p1", "a");
        clock.advance(1_000);
        tracker.record_conquest("p1", "b");
        assert_eq!(tracker.conquered_villages("p1"), ["a", "b"]);
        assert_eq!(tracker.remaining_cooldown("p1", "a"), COOLDOWN - 1_000);
    }

    #[test]
    fn future_timestamp_caps_at_full_cooldown() {
        let (tracker, store, _) = tracker();
        store
            .set("outpost:player_p1_conquests", r#"{"conquests":{"v":99999999999}}"#)
            .expect("seed");
        assert_eq!(tracker.remaining_cooldown("p1", "v"), COOLDOWN);
    }

    #[test]
    fn check_then_record_is_not_atomic() {
        let (tracker, _, _) = tracker();
        // Two attempts in the same tick both pass the check before either records.
        let first = tracker.can_conquer("p1", "v");
        let second = tracker.can_conquer("p1", "v");
        tracker.record_conquest("p1", "v");
        tracker.record_conquest("p1", "v");
        assert!(first && second);
        assert!(!tracker.can_conquer("p1", "v"));
    }

    #[test]
    fn zero_cooldown_is_always_ready() {
        let store = Arc::new(MemoryStore::new());
        let tracker = ConquestTracker::new(
            store,
            Arc::new(ManualClock::new(0)),
            KeyNamespace::default(),
            &ConquestConfig { cooldown_ms: 0 },
        );
        tracker.record_conquest("p1", "v");
        assert_eq!(tracker.cooldown_state("p1", "v"), CooldownState::Ready);
    }

    struct FailingStore;

    impl PersistentStore for FailingStore {
        fn get(&self, _key: &str) -> Result<Option<String>> {
            Err(OutpostError::Store("offline".into()))
        }
        fn set(&self, _key: &str, _value: &str) -> Result<()> {
            Err(OutpostError::Store("offline".into()))
        }
    }

    #[test]
    fn unreadable_store_fails_open() {
        let tracker = ConquestTracker::new(
            Arc::new(FailingStore),
            Arc::new(ManualClock::new(0)),
            KeyNamespace::default(),
            &ConquestConfig::default(),
        );
        tracker.record_conquest("p1", "v");
        assert!(tracker.can_conquer("p1", "v"));
        assert!(tracker.conquered_villages("p1").is_empty());
    }

    /// Fails the next `failing_reads` reads, then behaves like `inner`.
    struct FlakyStore {
        inner: MemoryStore,
        failing_reads: AtomicU32,
    }

    impl PersistentStore for FlakyStore {
        fn get(&self, key: &str) -> Result<Option<String>> {
            let failing = self
                .failing_reads
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if failing {
                return Err(OutpostError::Store("database is locked".into()));
            }
            self.inner.get(key)
        }
        fn set(&self, key: &str, value: &str) -> Result<()> {
            self.inner.set(key, value)
        }
    }

    #[test]
    fn unreadable_record_is_not_overwritten() {
        let store = Arc::new(FlakyStore {
            inner: MemoryStore::new(),
            failing_reads: AtomicU32::new(0),
        });
        let clock = Arc::new(ManualClock::new(10_000_000));
        let tracker = ConquestTracker::new(
            store.clone(),
            clock.clone(),
            KeyNamespace::default(),
            &ConquestConfig {
                cooldown_ms: COOLDOWN,
            },
        );
        tracker.record_conquest("p1", "a");
        tracker.record_conquest("p1", "b");

        store.failing_reads.store(1, Ordering::SeqCst);
        clock.advance(1_000);
        tracker.record_conquest("p1", "c");

        assert_eq!(tracker.conquered_villages("p1"), ["a", "b"]);
        assert_eq!(tracker.remaining_cooldown("p1", "a"), COOLDOWN - 1_000);

        tracker.record_conquest("p1", "c");
        assert_eq!(tracker.conquered_villages("p1"), ["a", "b", "c"]);
    }
}
