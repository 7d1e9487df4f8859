//! Conquest gating: the check gameplay code makes before paying out a
//! village reward.
//!
//! A successful attempt stamps the player's cooldown and credits the
//! village in the cache. The check and the stamp are two separate store
//! round-trips, so two attempts by one player for one village inside a
//! single tick could both succeed. The host drives one attempt per player
//! action, which keeps that window closed in practice.

use outpost_core::conquest::ConquestTracker;
use outpost_core::types::Location;
use outpost_core::village::VillageCache;
use tracing::{debug, info};

/// Result of a conquest attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConquestOutcome {
    /// The reward may be granted; the conquest has been recorded.
    Conquered {
        /// Key of the conquered village.
        village_key: String,
        /// Total conquests of the village, when the cache knows it.
        conquest_count: Option<u32>,
    },
    /// The player conquered this village too recently.
    OnCooldown {
        /// Key of the village.
        village_key: String,
        /// Milliseconds until the next rewarded conquest.
        remaining_ms: u64,
        /// The wait rendered as `"{m}m {s}s"`.
        formatted: String,
    },
    /// No known village is close enough to the player.
    NoVillage,
}

impl ConquestOutcome {
    /// Whether the reward should be granted.
    #[must_use]
    pub fn granted(&self) -> bool {
        matches!(self, Self::Conquered { .. })
    }
}

/// Attempt a conquest of `village_key` by `player_id`.
///
/// The cooldown is keyed by village id alone, so this works even for a
/// village the cache has not recorded; the cache credit is then skipped.
pub fn conquer(
    villages: &mut VillageCache,
    tracker: &ConquestTracker,
    player_id: &str,
    village_key: &str,
) -> ConquestOutcome {
    if !tracker.can_conquer(player_id, village_key) {
        let remaining_ms = tracker.remaining_cooldown(player_id, village_key);
        debug!(player = player_id, village = village_key, remaining_ms, "Conquest on cooldown");
        return ConquestOutcome::OnCooldown {
            village_key: village_key.to_string(),
            remaining_ms,
            formatted: outpost_core::conquest::format_remaining(remaining_ms),
        };
    }

    tracker.record_conquest(player_id, village_key);
    villages.record_conquest(village_key, player_id);
    let conquest_count = villages.get(village_key).map(|v| v.conquest_count);

    info!(player = player_id, village = village_key, ?conquest_count, "Conquest granted");
    ConquestOutcome::Conquered {
        village_key: village_key.to_string(),
        conquest_count,
    }
}

/// Attempt a conquest of whichever known village the player stands in.
pub fn conquer_at(
    villages: &mut VillageCache,
    tracker: &ConquestTracker,
    player_id: &str,
    location: &Location,
) -> ConquestOutcome {
    let Some(key) = villages.nearest(location).map(|v| v.key.clone()) else {
        debug!(player = player_id, at = %location, "No village to conquer here");
        return ConquestOutcome::NoVillage;
    };
    conquer(villages, tracker, player_id, &key)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use outpost_core::clock::ManualClock;
    use outpost_core::config::{ConquestConfig, VillageConfig};
    use outpost_core::keys::KeyNamespace;
    use outpost_core::store::MemoryStore;
    use outpost_core::types::DiscoveryMethod;

    fn setup() -> (VillageCache, ConquestTracker, Arc<ManualClock>) {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(0));
        let villages = VillageCache::new(
            store.clone(),
            clock.clone(),
            &KeyNamespace::default(),
            &VillageConfig::default(),
        );
        let tracker = ConquestTracker::new(
            store,
            clock.clone(),
            KeyNamespace::default(),
            &ConquestConfig {
                cooldown_ms: 330_000,
            },
        );
        (villages, tracker, clock)
    }

    #[test]
    fn grant_then_block_then_grant() {
        let (mut villages, tracker, clock) = setup();
        villages.add_village(Location::new(100.0, 64.0, 200.0), DiscoveryMethod::Entity);
        let player_pos = Location::new(120.0, 70.0, 180.0);

        let first = conquer_at(&mut villages, &tracker, "p1", &player_pos);
        assert_eq!(
            first,
            ConquestOutcome::Conquered {
                village_key: "village_100_200".into(),
                conquest_count: Some(1),
            }
        );

        let second = conquer_at(&mut villages, &tracker, "p1", &player_pos);
        assert!(!second.granted());
        assert_eq!(
            second,
            ConquestOutcome::OnCooldown {
                village_key: "village_100_200".into(),
                remaining_ms: 330_000,
                formatted: "5m 30s".into(),
            }
        );

        // Another player is not affected by p1's cooldown.
        assert!(conquer_at(&mut villages, &tracker, "p2", &player_pos).granted());

        clock.advance(330_000);
        let third = conquer_at(&mut villages, &tracker, "p1", &player_pos);
        assert!(third.granted());
        let village = villages.get("village_100_200").expect("village");
        assert_eq!(village.conquest_count, 3);
        assert_eq!(village.last_conquered_by.as_deref(), Some("p1"));
    }

    #[test]
    fn no_village_nearby() {
        let (mut villages, tracker, _) = setup();
        villages.add_village(Location::new(0.0, 64.0, 0.0), DiscoveryMethod::Entity);
        let outcome = conquer_at(&mut villages, &tracker, "p1", &Location::new(500.0, 64.0, 0.0));
        assert_eq!(outcome, ConquestOutcome::NoVillage);
        assert!(tracker.conquered_villages("p1").is_empty());
    }

    #[test]
    fn unknown_village_still_starts_cooldown() {
        let (mut villages, tracker, _) = setup();
        let outcome = conquer(&mut villages, &tracker, "p1", "village_7_7");
        assert_eq!(
            outcome,
            ConquestOutcome::Conquered {
                village_key: "village_7_7".into(),
                conquest_count: None,
            }
        );
        assert!(villages.is_empty());
        assert!(!tracker.can_conquer("p1", "village_7_7"));
    }
}
