//! Integration Tests — End-to-End Village Flows
//!
//! These tests drive the public API the way the host does: discover a
//! village, conquer it, wait out the cooldown, and restart the session
//! against the same store.

use std::sync::Arc;

use outpost_core::clock::ManualClock;
use outpost_core::config::{ConquestConfig, OutpostConfig, PersistenceConfig, VillageConfig};
use outpost_core::conquest::ConquestTracker;
use outpost_core::keys::KeyNamespace;
use outpost_core::store::{MemoryStore, PersistentStore, SqliteStore};
use outpost_core::tally::{Counter, Tally};
use outpost_core::types::{DiscoveryMethod, Location};
use outpost_core::village::VillageCache;

const COOLDOWN: u64 = 1_800_000;

struct World {
    store: Arc<dyn PersistentStore>,
    clock: Arc<ManualClock>,
}

impl World {
    fn new(store: Arc<dyn PersistentStore>) -> Self {
        Self {
            store,
            clock: Arc::new(ManualClock::new(1_700_000_000_000)),
        }
    }

    fn villages(&self) -> VillageCache {
        VillageCache::new(
            self.store.clone(),
            self.clock.clone(),
            &KeyNamespace::default(),
            &VillageConfig::default(),
        )
    }

    fn tracker(&self) -> ConquestTracker {
        ConquestTracker::new(
            self.store.clone(),
            self.clock.clone(),
            KeyNamespace::default(),
            &ConquestConfig {
                cooldown_ms: COOLDOWN,
            },
        )
    }
}

// ---------------------------------------------------------------------------
// Discover → conquer → cooldown → ready
// ---------------------------------------------------------------------------

#[test]
fn discover_conquer_and_wait() {
    let world = World::new(Arc::new(MemoryStore::new()));
    let mut villages = world.villages();
    let tracker = world.tracker();

    // 1. Discovery via villagers
    let village = villages.add_village(Location::new(100.0, 64.0, 200.0), DiscoveryMethod::Entity);
    assert_eq!(village.key, "village_100_200");
    assert_eq!(villages.len(), 1);
    let stored = &villages.list_villages()[0];
    assert_eq!(stored.discovery_method, DiscoveryMethod::Entity);
    assert_eq!(stored.conquest_count, 0);

    // 2. Conquest by p1
    assert!(tracker.can_conquer("p1", &village.key));
    tracker.record_conquest("p1", &village.key);
    villages.record_conquest(&village.key, "p1");

    let stored = villages.get("village_100_200").expect("village");
    assert_eq!(stored.conquest_count, 1);
    assert_eq!(stored.last_conquered_by.as_deref(), Some("p1"));

    // 3. Immediately blocked
    assert!(!tracker.can_conquer("p1", "village_100_200"));
    assert_eq!(tracker.formatted_cooldown("p1", "village_100_200"), "30m 0s");

    // 4. Ready once the cooldown has elapsed
    world.clock.advance(i64::try_from(COOLDOWN).expect("fits"));
    assert!(tracker.can_conquer("p1", "village_100_200"));
    assert_eq!(tracker.formatted_cooldown("p1", "village_100_200"), "Ready");
}

#[test]
fn repeated_sightings_store_one_village() {
    let world = World::new(Arc::new(MemoryStore::new()));
    let mut villages = world.villages();

    let first = villages.add_village(Location::new(0.0, 64.0, 0.0), DiscoveryMethod::Entity);
    for i in 0..20 {
        world.clock.advance(50);
        let offset = f64::from(i) * 3.0;
        let again = villages.add_village(Location::new(offset, 64.0, -offset), DiscoveryMethod::Entity);
        assert_eq!(again.key, first.key);
        assert_eq!(again.discovered_at, first.discovered_at);
    }
    assert_eq!(villages.len(), 1);
}

// ---------------------------------------------------------------------------
// Persistence across sessions
// ---------------------------------------------------------------------------

#[test]
fn sqlite_backed_world_survives_restart() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("world.db");
    let config = PersistenceConfig::default();

    {
        let world = World::new(Arc::new(SqliteStore::open(&path, &config).expect("open")));
        let mut villages = world.villages();
        villages.add_village(Location::new(-250.0, 70.0, 400.0), DiscoveryMethod::Entity);
        villages.record_conquest("village_-250_400", "alex");
        world.tracker().record_conquest("alex", "village_-250_400");
    }

    let world = World::new(Arc::new(SqliteStore::open(&path, &config).expect("reopen")));
    let mut villages = world.villages();
    assert!(villages.has_discovered(&Location::new(-200.0, 0.0, 420.0)));
    assert_eq!(
        villages.get("village_-250_400").expect("village").conquest_count,
        1
    );
    assert!(!world.tracker().can_conquer("alex", "village_-250_400"));
}

#[test]
fn corrupt_world_state_is_repaired_on_write() {
    let store = Arc::new(MemoryStore::new());
    store.set("outpost:discovered_villages", "\u{0}garbage").expect("seed");
    store.set("outpost:player_p1_conquests", "{\"conquests\": 7}").expect("seed");

    let world = World::new(store.clone());
    let mut villages = world.villages();
    let tracker = world.tracker();

    assert!(villages.is_empty());
    assert!(tracker.can_conquer("p1", "village_0_0"));

    villages.add_village(Location::new(0.0, 64.0, 0.0), DiscoveryMethod::Entity);
    tracker.record_conquest("p1", "village_0_0");

    let raw_villages = store.get("outpost:discovered_villages").expect("get").expect("some");
    let raw_conquests = store.get("outpost:player_p1_conquests").expect("get").expect("some");
    assert!(serde_json::from_str::<serde_json::Value>(&raw_villages).is_ok());
    let conquests: serde_json::Value = serde_json::from_str(&raw_conquests).expect("valid");
    assert!(conquests["conquests"]["village_0_0"].is_i64());
}

#[test]
fn all_categories_share_one_store_without_clashing() {
    let world = World::new(Arc::new(MemoryStore::new()));
    let tally = Tally::new(world.store.clone(), KeyNamespace::default());
    let mut villages = world.villages();
    let tracker = world.tracker();

    // Same raw identifier in every category.
    let id = "discovered_villages";
    tally.add(Counter::WolfKills(id), 3);
    tally.add(Counter::Pocketed(id), 2);
    tally.add(Counter::Emeralds(id), 1);
    tracker.record_conquest(id, "village_5_5");
    villages.add_village(Location::new(5.0, 0.0, 5.0), DiscoveryMethod::Command);

    assert_eq!(tally.get(Counter::WolfKills(id)), 3);
    assert_eq!(tally.get(Counter::Pocketed(id)), 2);
    assert_eq!(tally.get(Counter::Emeralds(id)), 1);
    assert!(!tracker.can_conquer(id, "village_5_5"));
    assert_eq!(villages.len(), 1);
}

#[test]
fn config_drives_components() {
    let config = OutpostConfig::from_toml(
        r#"
        [keys]
        prefix = "custom"

        [villages]
        cluster_radius = 10.0

        [conquest]
        cooldown_ms = 1000
        "#,
    )
    .expect("config");

    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(0));
    let keys = config.keys.namespace();
    let mut villages = VillageCache::new(store.clone(), clock.clone(), &keys, &config.villages);
    let tracker = ConquestTracker::new(store.clone(), clock.clone(), keys, &config.conquest);

    villages.add_village(Location::new(0.0, 0.0, 0.0), DiscoveryMethod::Entity);
    villages.add_village(Location::new(20.0, 0.0, 0.0), DiscoveryMethod::Entity);
    assert_eq!(villages.len(), 2);
    assert!(store.get("custom:discovered_villages").expect("get").is_some());

    tracker.record_conquest("p1", "village_0_0");
    clock.advance(999);
    assert_eq!(tracker.formatted_cooldown("p1", "village_0_0"), "0m 0s");
    clock.advance(1);
    assert!(tracker.can_conquer("p1", "village_0_0"));
}
