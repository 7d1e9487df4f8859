//! Namespaced persistence keys.
//!
//! Every value Outpost writes to the host store lives under one global
//! prefix, and every data category carries its own infix (`wolf_`,
//! `pocketed_`, `emeralds_`, `player_`, `discovered_villages`). No infix is a
//! prefix of another, so two categories can never produce the same key,
//! whatever identifier strings they are given.
//!
//! ```
//! use outpost_core::keys::KeyNamespace;
//!
//! let keys = KeyNamespace::default();
//! assert_eq!(keys.player_conquests("p1"), "outpost:player_p1_conquests");
//! assert_eq!(keys.village_cache(), "outpost:discovered_villages");
//! ```

/// Prefix used when the configuration does not override it.
pub const DEFAULT_PREFIX: &str = "outpost";

/// Derives storage keys from semantic identifiers.
///
/// Immutable once built; every method is a pure function of the prefix and
/// its argument. Empty identifiers are accepted and yield well-formed keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyNamespace {
    prefix: String,
}

impl KeyNamespace {
    /// Create a namespace rooted at `prefix`.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// The global prefix every key starts with.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Kill counter for a tamed wolf entity.
    #[must_use]
    pub fn wolf_kill_count(&self, entity_id: &str) -> String {
        format!("{}:wolf_{entity_id}_kills", self.prefix)
    }

    /// Units a player has pocketed.
    #[must_use]
    pub fn pocketed_units(&self, player_name: &str) -> String {
        format!("{}:pocketed_{player_name}", self.prefix)
    }

    /// A player's emerald balance.
    #[must_use]
    pub fn player_emeralds(&self, player_name: &str) -> String {
        format!("{}:emeralds_{player_name}", self.prefix)
    }

    /// A player's conquest record.
    #[must_use]
    pub fn player_conquests(&self, player_id: &str) -> String {
        format!("{}:player_{player_id}_conquests", self.prefix)
    }

    /// The single entry holding the discovered-village set.
    #[must_use]
    pub fn village_cache(&self) -> String {
        format!("{}:discovered_villages", self.prefix)
    }
}

impl Default for KeyNamespace {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}
