//! # Outpost Core Library
//!
//! Host-agnostic logic for a village-conquest add-on:
//!
//! - **Keys** — collision-free, namespaced persistence keys
//! - **Store** — the host key/value capability, plus in-memory and SQLite backends
//! - **Villages** — discovered-village cache with spatial deduplication
//! - **Conquest** — per-player, per-village reward cooldowns
//! - **Tally** — plain counters (wolf kills, pocketed units, emeralds)
//! - **Detection** — pluggable village detection strategies
//!
//! Nothing here reaches for ambient host state. The store and the clock are
//! injected, so every component runs unchanged against an in-memory fake.
//!
//! ## Availability Contract
//!
//! A world's persisted state must never become unreadable. Every gameplay
//! operation is total: corrupt or missing data reads as empty, unknown
//! village keys are ignored, and cooldown checks fail open.

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod clock;
pub mod config;
pub mod conquest;
pub mod detection;
pub mod error;
pub mod keys;
pub mod store;
pub mod tally;
pub mod types;
pub mod village;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::OutpostConfig;
pub use conquest::{ConquestTracker, CooldownState};
pub use detection::{CommandDetector, EntityDetector, EntityQuery, Observer, SearchContext, VillageDetectionService};
pub use error::OutpostError;
pub use keys::KeyNamespace;
pub use store::{MemoryStore, PersistentStore, SqliteStore};
pub use tally::{Counter, Tally};
pub use types::*;
pub use village::{CachedVillage, VillageCache};
