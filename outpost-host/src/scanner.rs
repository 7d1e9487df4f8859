//! Discovery scanning: run a detection strategy and fold its sightings into
//! the village cache.
//!
//! Detection is the only step that may suspend. It runs under the
//! configured per-call timeout; a strategy that overruns is treated as
//! having found nothing, and the cache is left untouched. Cache updates
//! happen afterwards, synchronously, in candidate order.

use std::time::Duration;

use outpost_core::config::DetectionConfig;
use outpost_core::detection::{
    CommandDetector, EntityDetector, EntityQuery, Observer, SearchContext, VillageDetectionService,
};
use outpost_core::types::DiscoveryMethod;
use outpost_core::village::{CachedVillage, VillageCache};
use tracing::{debug, info, warn};

/// Build the strategy selected by `method`.
///
/// The entity query is only used by the entity strategy.
#[must_use]
pub fn detector_for<Q: EntityQuery + 'static>(
    method: DiscoveryMethod,
    query: Q,
) -> Box<dyn VillageDetectionService> {
    match method {
        DiscoveryMethod::Entity => Box::new(EntityDetector::new(query)),
        DiscoveryMethod::Command => Box::new(CommandDetector),
    }
}

/// What one scan produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanReport {
    /// Raw sightings reported by the strategy.
    pub candidates: usize,
    /// Villages seen for the first time during this scan.
    pub discovered: Vec<CachedVillage>,
    /// Keys of already-known villages that were sighted again, deduplicated.
    pub revisited: Vec<String>,
    /// The strategy overran its time budget.
    pub timed_out: bool,
}

/// Runs detection for an observer and records the results.
pub struct DiscoveryScanner {
    detector: Box<dyn VillageDetectionService>,
    context: SearchContext,
    timeout: Duration,
}

impl std::fmt::Debug for DiscoveryScanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscoveryScanner")
            .field("method", &self.detector.method())
            .field("context", &self.context)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl DiscoveryScanner {
    /// Wrap `detector` with the search parameters from `config`.
    #[must_use]
    pub fn new(detector: Box<dyn VillageDetectionService>, config: &DetectionConfig) -> Self {
        Self {
            detector,
            context: SearchContext::from_config(config),
            timeout: Duration::from_millis(config.timeout_ms),
        }
    }

    /// Provenance tag of the wrapped strategy.
    #[must_use]
    pub fn method(&self) -> DiscoveryMethod {
        self.detector.method()
    }

    /// Search around `observer` and merge every sighting into `cache`.
    pub async fn scan(&self, observer: &Observer, cache: &mut VillageCache) -> ScanReport {
        let mut report = ScanReport::default();

        let candidates = match tokio::time::timeout(
            self.timeout,
            self.detector.detect_villages(observer, &self.context),
        )
        .await
        {
            Ok(candidates) => candidates,
            Err(_) => {
                warn!(
                    player = %observer.player_id,
                    method = %self.detector.method(),
                    timeout_ms = self.timeout.as_millis(),
                    "Village detection timed out"
                );
                report.timed_out = true;
                return report;
            }
        };
        report.candidates = candidates.len();

        let method = self.detector.method();
        for candidate in candidates {
            if !(candidate.x.is_finite() && candidate.z.is_finite()) {
                debug!(at = %candidate, "Skipping non-finite sighting");
                continue;
            }
            if let Some(known) = cache.nearest(&candidate) {
                if !report.revisited.contains(&known.key) {
                    report.revisited.push(known.key.clone());
                }
                continue;
            }
            report.discovered.push(cache.add_village(candidate, method));
        }

        if !report.discovered.is_empty() {
            info!(
                player = %observer.player_id,
                new = report.discovered.len(),
                candidates = report.candidates,
                "Scan discovered villages"
            );
        }
        report
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
