//! Configuration for Outpost.
//!
//! Maps directly to `outpost.toml`. Every field has a default, so an empty
//! file (or no file at all) yields a working setup.

use serde::{Deserialize, Serialize};

use crate::keys::{KeyNamespace, DEFAULT_PREFIX};
use crate::types::DiscoveryMethod;

/// Top-level Outpost configuration, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutpostConfig {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Persistence key layout.
    #[serde(default)]
    pub keys: KeysConfig,
    /// Village clustering.
    #[serde(default)]
    pub villages: VillageConfig,
    /// Conquest cooldowns.
    #[serde(default)]
    pub conquest: ConquestConfig,
    /// Detection strategy selection and limits.
    #[serde(default)]
    pub detection: DetectionConfig,
    /// SQLite-backed store settings.
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

impl OutpostConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `OutpostError::Config` if the TOML is invalid.
    pub fn from_toml(toml_str: &str) -> crate::error::Result<Self> {
        toml::from_str(toml_str).map_err(|e| crate::OutpostError::Config(e.to_string()))
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// General system settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Whether the add-on is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_level: "info".to_string(),
        }
    }
}

/// Persistence key layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeysConfig {
    /// Global prefix shared by every stored key.
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

impl KeysConfig {
    /// Build the key namespace described by this section.
    #[must_use]
    pub fn namespace(&self) -> KeyNamespace {
        KeyNamespace::new(self.prefix.clone())
    }
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
        }
    }
}

/// Village clustering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VillageConfig {
    /// Two sightings within this horizontal distance are the same village.
    #[serde(default = "default_cluster_radius")]
    pub cluster_radius: f64,
}

impl Default for VillageConfig {
    fn default() -> Self {
        Self {
            cluster_radius: 100.0,
        }
    }
}

/// Conquest cooldown settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConquestConfig {
    /// Minimum time between rewarded conquests of one village by one player.
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,
}

impl Default for ConquestConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: 1_800_000,
        }
    }
}

/// Detection strategy settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Which strategy to run.
    #[serde(default = "default_method")]
    pub method: DiscoveryMethod,
    /// Entity type tag that marks a settlement.
    #[serde(default = "default_entity_type")]
    pub entity_type: String,
    /// How far around the observer to look.
    #[serde(default = "default_search_radius")]
    pub search_radius: f64,
    /// Per-call budget; a slower detection counts as finding nothing.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            method: DiscoveryMethod::Entity,
            entity_type: "minecraft:villager_v2".to_string(),
            search_radius: 128.0,
            timeout_ms: 5000,
        }
    }
}

/// Persistence settings for the SQLite-backed store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Database file used when the host has no native property store.
    #[serde(default = "default_db_path")]
    pub db_path: String,
    /// Use WAL journal mode.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            db_path: "outpost.db".to_string(),
            wal_mode: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions for serde
// ---------------------------------------------------------------------------

fn default_true() -> bool {
    true
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_prefix() -> String {
    DEFAULT_PREFIX.to_string()
}
fn default_cluster_radius() -> f64 {
    100.0
}
fn default_cooldown_ms() -> u64 {
    1_800_000
}
fn default_method() -> DiscoveryMethod {
    DiscoveryMethod::Entity
}
fn default_entity_type() -> String {
    "minecraft:villager_v2".to_string()
}
fn default_search_radius() -> f64 {
    128.0
}
fn default_timeout_ms() -> u64 {
    5000
}
fn default_db_path() -> String {
    "outpost.db".to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
