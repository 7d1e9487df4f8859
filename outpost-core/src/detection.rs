//! Village detection strategies.
//!
//! Callers hold a `Box<dyn VillageDetectionService>` and never care which
//! strategy is behind it. Two exist:
//!
//! - [`EntityDetector`] looks for settlement-marking entities (villagers)
//!   around the observer through a host-provided [`EntityQuery`].
//! - [`CommandDetector`] is reserved for locating villages from host command
//!   output. The host does not hand back command output today, so it always
//!   reports nothing. Finding no villages is a normal result, not a failure.
//!
//! Detection may suspend while the host answers; candidates are raw
//! sightings and are deduplicated later by the village cache.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::DetectionConfig;
use crate::error::Result;
use crate::types::{DiscoveryMethod, Location};

/// The player (or other vantage point) a search is centred on.
#[derive(Debug, Clone, PartialEq)]
pub struct Observer {
    /// Host identifier of the observing player.
    pub player_id: String,
    /// Where the observer stands.
    pub location: Location,
    /// Dimension the observer is in.
    pub dimension: String,
}

/// Parameters of one search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchContext {
    /// Horizontal search radius around the observer.
    pub radius: f64,
    /// Entity type tag that marks a settlement.
    pub entity_type: String,
}

impl SearchContext {
    /// Build a context from the detection section of the config.
    #[must_use]
    pub fn from_config(config: &DetectionConfig) -> Self {
        Self {
            radius: config.search_radius,
            entity_type: config.entity_type.clone(),
        }
    }
}

/// A strategy that turns an observer into candidate village locations.
#[async_trait]
pub trait VillageDetectionService: Send + Sync {
    /// Provenance tag recorded on villages this strategy discovers.
    fn method(&self) -> DiscoveryMethod;

    /// Look for villages around `observer`. Always returns a finite,
    /// possibly empty list; never fails.
    async fn detect_villages(&self, observer: &Observer, context: &SearchContext) -> Vec<Location>;
}

/// Host capability: find entities of a type near a point.
#[async_trait]
pub trait EntityQuery: Send + Sync {
    /// Locations of entities tagged `entity_type` within `radius` of `center`.
    ///
    /// # Errors
    ///
    /// Returns an error if the host query failed.
    async fn entities_near(
        &self,
        dimension: &str,
        center: &Location,
        radius: f64,
        entity_type: &str,
    ) -> Result<Vec<Location>>;
}

// ---------------------------------------------------------------------------
// Entity-based detection
// ---------------------------------------------------------------------------

/// Reports the location of every settlement-marking entity near the observer.
#[derive(Debug)]
pub struct EntityDetector<Q> {
    query: Q,
}

impl<Q: EntityQuery> EntityDetector<Q> {
    /// Wrap a host entity query.
    #[must_use]
    pub fn new(query: Q) -> Self {
        Self { query }
    }
}

#[async_trait]
impl<Q: EntityQuery> VillageDetectionService for EntityDetector<Q> {
    fn method(&self) -> DiscoveryMethod {
        DiscoveryMethod::Entity
    }

    async fn detect_villages(&self, observer: &Observer, context: &SearchContext) -> Vec<Location> {
        let found = match self
            .query
            .entities_near(
                &observer.dimension,
                &observer.location,
                context.radius,
                &context.entity_type,
            )
            .await
        {
            Ok(found) => found,
            Err(e) => {
                warn!(
                    player = %observer.player_id,
                    entity_type = %context.entity_type,
                    error = %e,
                    "Entity query failed, reporting no villages"
                );
                return Vec::new();
            }
        };

        let total = found.len();
        let candidates: Vec<Location> = found
            .into_iter()
            .filter(|l| l.x.is_finite() && l.y.is_finite() && l.z.is_finite())
            .filter(|l| l.horizontal_distance(&observer.location) <= context.radius)
            .collect();

        debug!(
            player = %observer.player_id,
            reported = total,
            candidates = candidates.len(),
            "Entity detection finished"
        );
        candidates
    }
}

// ---------------------------------------------------------------------------
// Command-based detection
// ---------------------------------------------------------------------------

/// Placeholder for locating villages from host command output.
///
/// The host runs commands but does not return their output text, so there
/// is nothing to parse yet. Until it does, every search comes back empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandDetector;

#[async_trait]
impl VillageDetectionService for CommandDetector {
    fn method(&self) -> DiscoveryMethod {
        DiscoveryMethod::Command
    }

    async fn detect_villages(&self, observer: &Observer, _context: &SearchContext) -> Vec<Location> {
        debug!(player = %observer.player_id, "Command detection unavailable on this host");
        Vec::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
