//! The assembled add-on: one value the host keeps for the lifetime of a
//! world and calls into from its tick loop.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use outpost_core::clock::Clock;
use outpost_core::config::OutpostConfig;
use outpost_core::conquest::ConquestTracker;
use outpost_core::detection::{EntityQuery, Observer};
use outpost_core::store::{PersistentStore, SqliteStore};
use outpost_core::tally::Tally;
use outpost_core::types::Location;
use outpost_core::village::VillageCache;
use tracing::info;

use crate::gate::{self, ConquestOutcome};
use crate::scanner::{detector_for, DiscoveryScanner, ScanReport};

/// Load `outpost.toml`, falling back to defaults when the file is absent.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_config(path: &Path) -> Result<OutpostConfig> {
    if !path.exists() {
        info!(path = %path.display(), "No config file, using defaults");
        return Ok(OutpostConfig::default());
    }
    OutpostConfig::from_file(path).with_context(|| format!("loading {}", path.display()))
}

/// Open the SQLite store named in the config.
///
/// # Errors
///
/// Returns an error if the database cannot be opened.
pub fn open_store(config: &OutpostConfig) -> Result<Arc<dyn PersistentStore>> {
    let store = SqliteStore::open(&config.persistence.db_path, &config.persistence)
        .with_context(|| format!("opening store {}", config.persistence.db_path))?;
    Ok(Arc::new(store))
}

/// Village discovery, conquest and counters for one world.
#[derive(Debug)]
pub struct Outpost {
    /// Discovered villages.
    pub villages: VillageCache,
    /// Per-player conquest cooldowns.
    pub conquests: ConquestTracker,
    /// Wolf kill, pocketed unit and emerald counters.
    pub tally: Tally,
    scanner: DiscoveryScanner,
    enabled: bool,
}

impl Outpost {
    /// Wire every component to `store` and `clock` as described by `config`.
    #[must_use]
    pub fn new<Q: EntityQuery + 'static>(
        config: &OutpostConfig,
        store: Arc<dyn PersistentStore>,
        clock: Arc<dyn Clock>,
        entity_query: Q,
    ) -> Self {
        let keys = config.keys.namespace();
        let villages = VillageCache::new(store.clone(), clock.clone(), &keys, &config.villages);
        let conquests = ConquestTracker::new(store.clone(), clock, keys.clone(), &config.conquest);
        let tally = Tally::new(store, keys);
        let scanner = DiscoveryScanner::new(
            detector_for(config.detection.method, entity_query),
            &config.detection,
        );

        info!(
            prefix = %config.keys.prefix,
            method = %config.detection.method,
            cooldown_ms = config.conquest.cooldown_ms,
            enabled = config.general.enabled,
            "Outpost initialised"
        );

        Self {
            villages,
            conquests,
            tally,
            scanner,
            enabled: config.general.enabled,
        }
    }

    /// Whether the add-on is switched on.
    #[must_use]
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Look for villages around `observer`. A disabled add-on scans nothing.
    pub async fn scan(&mut self, observer: &Observer) -> ScanReport {
        if !self.enabled {
            return ScanReport::default();
        }
        self.scanner.scan(observer, &mut self.villages).await
    }

    /// Attempt a rewarded conquest of `village_key`.
    pub fn conquer(&mut self, player_id: &str, village_key: &str) -> ConquestOutcome {
        gate::conquer(&mut self.villages, &self.conquests, player_id, village_key)
    }

    /// Attempt a rewarded conquest of the village at `location`.
    pub fn conquer_at(&mut self, player_id: &str, location: &Location) -> ConquestOutcome {
        gate::conquer_at(&mut self.villages, &self.conquests, player_id, location)
    }
}
