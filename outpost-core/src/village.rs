//! Discovered-village cache with spatial deduplication.
//!
//! Detection strategies report raw sightings, often many per settlement
//! (one per villager). The cache folds every sighting that lands within the
//! clustering radius of a known village into that village, so a settlement
//! is stored exactly once no matter how often it is seen.
//!
//! ## Persistence
//!
//! The whole set lives in a single store entry (see
//! [`KeyNamespace::village_cache`]) as a JSON array. It is read lazily on
//! first access and written back after every mutation. Unreadable data
//! never reaches the caller: a missing entry, a payload that is not an
//! array, or individual records that fail to decode all degrade to "not
//! cached", and the next write repairs the entry.
//!
//! A store that fails to answer is different from a corrupt entry. Until a
//! read succeeds the cache works from memory alone and writes nothing, so
//! the persisted set is never replaced by a partial view. Each access
//! retries the read; once it succeeds the stored villages take precedence
//! and any sightings made in the meantime are folded in.
//!
//! ## Clustering
//!
//! Distance is 2D Euclidean on the X/Z plane. The boundary is inclusive: a
//! sighting exactly `cluster_radius` away still merges.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::VillageConfig;
use crate::keys::KeyNamespace;
use crate::store::PersistentStore;
use crate::types::{DiscoveryMethod, Location};

/// One known village cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedVillage {
    /// Stable identity, `village_{round(x)}_{round(z)}` of the first sighting.
    pub key: String,
    /// Where the village was first seen.
    pub location: Location,
    /// Epoch milliseconds of the first sighting.
    pub discovered_at: i64,
    /// Strategy that produced the first sighting.
    pub discovery_method: DiscoveryMethod,
    /// Most recent conqueror, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_conquered_by: Option<String>,
    /// Conquests by any player. Never decreases.
    #[serde(default)]
    pub conquest_count: u32,
}

impl CachedVillage {
    fn new(location: Location, method: DiscoveryMethod, now_ms: i64) -> Self {
        Self {
            key: location.village_key(),
            location,
            discovered_at: now_ms,
            discovery_method: method,
            last_conquered_by: None,
            conquest_count: 0,
        }
    }
}

/// The world's set of discovered villages.
///
/// Sole owner and writer of the village-cache store entry.
pub struct VillageCache {
    store: Arc<dyn PersistentStore>,
    clock: Arc<dyn Clock>,
    storage_key: String,
    cluster_radius: f64,
    villages: Option<Vec<CachedVillage>>,
    synced: bool,
}

impl std::fmt::Debug for VillageCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VillageCache")
            .field("storage_key", &self.storage_key)
            .field("cluster_radius", &self.cluster_radius)
            .field("loaded", &self.villages.as_ref().map(Vec::len))
            .field("synced", &self.synced)
            .finish_non_exhaustive()
    }
}

impl VillageCache {
    /// Create a cache over `store`. Nothing is read until first use.
    #[must_use]
    pub fn new(
        store: Arc<dyn PersistentStore>,
        clock: Arc<dyn Clock>,
        keys: &KeyNamespace,
        config: &VillageConfig,
    ) -> Self {
        Self {
            store,
            clock,
            storage_key: keys.village_cache(),
            cluster_radius: config.cluster_radius,
            villages: None,
            synced: false,
        }
    }

    /// The clustering radius in blocks.
    #[must_use]
    pub fn cluster_radius(&self) -> f64 {
        self.cluster_radius
    }

    /// Whether a known village lies within the clustering radius of `location`.
    pub fn has_discovered(&mut self, location: &Location) -> bool {
        self.nearest(location).is_some()
    }

    /// The closest known village within the clustering radius, if any.
    pub fn nearest(&mut self, location: &Location) -> Option<&CachedVillage> {
        let radius = self.cluster_radius;
        closest(self.loaded(), location, radius)
    }

    /// Record a sighting.
    ///
    /// If a known village lies within the clustering radius, the closest one
    /// is returned untouched. Otherwise a new village is stored and returned.
    /// Repeating the call for the same settlement therefore never creates a
    /// second record.
    ///
    /// A location with non-finite coordinates cannot be persisted; it is
    /// logged and returned as a record that is not stored.
    pub fn add_village(&mut self, location: Location, method: DiscoveryMethod) -> CachedVillage {
        if let Some(existing) = self.nearest(&location) {
            debug!(key = %existing.key, at = %location, "Sighting merged into known village");
            return existing.clone();
        }

        let village = CachedVillage::new(location, method, self.clock.now_ms());
        if !(location.x.is_finite() && location.y.is_finite() && location.z.is_finite()) {
            warn!(at = %location, "Ignoring village sighting with non-finite coordinates");
            return village;
        }

        self.loaded().push(village.clone());
        self.flush();

        info!(
            key = %village.key,
            at = %location,
            method = %method,
            "Discovered new village"
        );
        village
    }

    /// Credit `player_id` with a conquest of `village_key`.
    ///
    /// Unknown keys are ignored: detection and conquest run independently
    /// and the village may simply not be cached yet. Returns whether a
    /// village was updated.
    pub fn record_conquest(&mut self, village_key: &str, player_id: &str) -> bool {
        let Some(village) = self.loaded().iter_mut().find(|v| v.key == village_key) else {
            debug!(key = village_key, player = player_id, "Conquest for unknown village ignored");
            return false;
        };

        village.conquest_count = village.conquest_count.saturating_add(1);
        village.last_conquered_by = Some(player_id.to_string());
        let count = village.conquest_count;
        self.flush();

        info!(key = village_key, player = player_id, count, "Village conquered");
        true
    }

    /// Look up a village by key.
    pub fn get(&mut self, village_key: &str) -> Option<&CachedVillage> {
        self.loaded().iter().find(|v| v.key == village_key)
    }

    /// All known villages in insertion order.
    pub fn list_villages(&mut self) -> &[CachedVillage] {
        self.loaded()
    }

    /// All known villages, oldest discovery first.
    pub fn list_by_discovery(&mut self) -> Vec<CachedVillage> {
        let mut villages = self.loaded().clone();
        villages.sort_by_key(|v| v.discovered_at);
        villages
    }

    /// Number of known villages.
    pub fn len(&mut self) -> usize {
        self.loaded().len()
    }

    /// Whether no village is known.
    pub fn is_empty(&mut self) -> bool {
        self.loaded().is_empty()
    }

    /// Drop the in-memory snapshot so the next access re-reads the store.
    pub fn reload(&mut self) {
        self.villages = None;
        self.synced = false;
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    fn loaded(&mut self) -> &mut Vec<CachedVillage> {
        if !self.synced {
            self.sync();
        }
        self.villages.get_or_insert_with(Vec::new)
    }

    /// Replace the snapshot with the stored set, keeping unsaved sightings
    /// that no stored village covers.
    fn sync(&mut self) {
        let Some(persisted) = self.hydrate() else {
            return;
        };
        let pending = self.villages.replace(persisted).unwrap_or_default();
        self.synced = true;
        if pending.is_empty() {
            return;
        }

        let radius = self.cluster_radius;
        let villages = self.villages.get_or_insert_with(Vec::new);
        let mut folded = 0_usize;
        for village in pending {
            if closest(villages, &village.location, radius).is_none() {
                villages.push(village);
                folded += 1;
            }
        }
        if folded > 0 {
            info!(key = %self.storage_key, folded, "Saved sightings made while the store was unreadable");
            self.flush();
        }
    }

    /// `None` when the store failed to answer.
    fn hydrate(&self) -> Option<Vec<CachedVillage>> {
        let raw = match self.store.get(&self.storage_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Some(Vec::new()),
            Err(e) => {
                warn!(key = %self.storage_key, error = %e, "Village cache unreadable, working from memory");
                return None;
            }
        };

        let entries: Vec<serde_json::Value> = match serde_json::from_str(&raw) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(key = %self.storage_key, error = %e, "Malformed village cache, starting empty");
                return Some(Vec::new());
            }
        };

        let total = entries.len();
        let villages: Vec<CachedVillage> = entries
            .into_iter()
            .filter_map(|entry| serde_json::from_value(entry).ok())
            .collect();

        if villages.len() < total {
            warn!(
                key = %self.storage_key,
                dropped = total - villages.len(),
                "Skipped malformed village records"
            );
        }
        debug!(key = %self.storage_key, villages = villages.len(), "Village cache loaded");
        Some(villages)
    }

    fn flush(&self) {
        if !self.synced {
            warn!(key = %self.storage_key, "Village cache not loaded from store, change kept in memory");
            return;
        }
        let Some(villages) = &self.villages else {
            return;
        };
        let json = match serde_json::to_string(villages) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "Failed to encode village cache");
                return;
            }
        };
        if let Err(e) = self.store.set(&self.storage_key, &json) {
            warn!(key = %self.storage_key, error = %e, "Failed to persist village cache");
        }
    }
}

fn closest<'a>(
    villages: &'a [CachedVillage],
    location: &Location,
    radius: f64,
) -> Option<&'a CachedVillage> {
    villages
        .iter()
        .map(|v| (v.location.horizontal_distance(location), v))
        .filter(|(d, _)| *d <= radius)
        .min_by(|(a, _), (b, _)| a.total_cmp(b))
        .map(|(_, v)| v)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
