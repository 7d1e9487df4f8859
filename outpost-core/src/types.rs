//! Core type definitions shared by the village cache, the conquest tracker
//! and the detection strategies.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Spatial
// ---------------------------------------------------------------------------

/// A 3D position in the game world.
///
/// `y` is stored for display and teleport purposes but never takes part in
/// clustering: villages are compared on the horizontal plane only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate (height).
    pub y: f64,
    /// Z coordinate.
    pub z: f64,
}

impl Location {
    /// Construct a location from its three coordinates.
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance on the X/Z plane, ignoring height.
    #[must_use]
    pub fn horizontal_distance(&self, other: &Self) -> f64 {
        let dx = self.x - other.x;
        let dz = self.z - other.z;
        (dx * dx + dz * dz).sqrt()
    }

    /// Stable cache key for the village cluster anchored at this location.
    ///
    /// Coordinates are rounded with [`f64::round`] (half away from zero), so
    /// every point inside the same unit cell maps to the same key.
    #[must_use]
    pub fn village_key(&self) -> String {
        village_key(self.x, self.z)
    }
}

impl Default for Location {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.1}, {:.1}, {:.1})", self.x, self.y, self.z)
    }
}

/// Derive the village key `village_{round(x)}_{round(z)}`.
#[must_use]
pub fn village_key(x: f64, z: f64) -> String {
    format!("village_{}_{}", round_coord(x), round_coord(z))
}

// `as` saturates out-of-range values and maps -0.0 to 0.
#[allow(clippy::cast_possible_truncation)]
fn round_coord(v: f64) -> i64 {
    v.round() as i64
}

// ---------------------------------------------------------------------------
// Provenance
// ---------------------------------------------------------------------------

/// Which detection strategy produced a village sighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscoveryMethod {
    /// Parsed from host command output.
    Command,
    /// Inferred from nearby villager entities.
    Entity,
}

impl DiscoveryMethod {
    /// Lowercase tag as persisted.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Command => "command",
            Self::Entity => "entity",
        }
    }
}

impl fmt::Display for DiscoveryMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DiscoveryMethod {
    type Err = crate::OutpostError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "command" => Ok(Self::Command),
            "entity" => Ok(Self::Entity),
            other => Err(crate::OutpostError::Config(format!(
                "unknown discovery method: {other}"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
