//! Plain integer counters kept under the remaining key categories:
//! wolf kills, pocketed units and emerald balances.
//!
//! Values are stored as decimal text. Anything that does not parse reads
//! as zero, matching how the village and conquest records degrade. A
//! counter the store could not read is never incremented, since writing
//! over it would lose the stored value.

use std::sync::Arc;

use tracing::warn;

use crate::keys::KeyNamespace;
use crate::store::PersistentStore;

/// Which counter a [`Tally`] call addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter<'a> {
    /// Kills scored by a tamed wolf, by entity id.
    WolfKills(&'a str),
    /// Units a player has pocketed, by player name.
    Pocketed(&'a str),
    /// A player's emerald balance, by player name.
    Emeralds(&'a str),
}

/// Reads and writes counters through the host store.
pub struct Tally {
    store: Arc<dyn PersistentStore>,
    keys: KeyNamespace,
}

impl std::fmt::Debug for Tally {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tally")
            .field("keys", &self.keys)
            .finish_non_exhaustive()
    }
}

impl Tally {
    /// Create a tally over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn PersistentStore>, keys: KeyNamespace) -> Self {
        Self { store, keys }
    }

    fn key(&self, counter: Counter<'_>) -> String {
        match counter {
            Counter::WolfKills(id) => self.keys.wolf_kill_count(id),
            Counter::Pocketed(name) => self.keys.pocketed_units(name),
            Counter::Emeralds(name) => self.keys.player_emeralds(name),
        }
    }

    /// Current value, zero if unset or unreadable.
    #[must_use]
    pub fn get(&self, counter: Counter<'_>) -> u64 {
        self.read(&self.key(counter)).unwrap_or(0)
    }

    fn read(&self, key: &str) -> Option<u64> {
        match self.store.get(key) {
            Ok(Some(raw)) => Some(raw.trim().parse().unwrap_or_else(|_| {
                warn!(key, value = %raw, "Malformed counter, reading as zero");
                0
            })),
            Ok(None) => Some(0),
            Err(e) => {
                warn!(key, error = %e, "Counter unreadable");
                None
            }
        }
    }

    /// Overwrite the counter.
    pub fn set(&self, counter: Counter<'_>, value: u64) {
        let key = self.key(counter);
        if let Err(e) = self.store.set(&key, &value.to_string()) {
            warn!(key = %key, error = %e, "Failed to persist counter");
        }
    }

    /// Add `delta` (saturating) and return the new value.
    ///
    /// If the current value cannot be read nothing is written and zero is
    /// returned.
    pub fn add(&self, counter: Counter<'_>, delta: u64) -> u64 {
        let key = self.key(counter);
        let Some(current) = self.read(&key) else {
            warn!(key = %key, delta, "Counter not updated, store unreadable");
            return 0;
        };
        let value = current.saturating_add(delta);
        self.set(counter, value);
        value
    }
}
