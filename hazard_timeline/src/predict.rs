//! Forecast synthesis: turn hotspots into predicted hazard events.

use std::collections::HashSet;
use std::f64::consts::TAU;

use rand::Rng;
use tracing::debug;

use crate::catalog::HazardCatalog;
use crate::geo::{bearing_rad, displace};
use crate::hotspot::{detect, Hotspot};
use crate::{BearingPolicy, EngineParams, HazardCategory, HazardEvent, HzError, Origin};

/// One predicted event per hotspot, at most `params.max_predictions`, in
/// hotspot order. Occurrence ticks are native (seed + lead); the projector
/// rescales them into the forecast window.
///
/// Fails only when `params` is invalid.
pub fn synthesize<R: Rng + ?Sized>(
    hotspots: &[Hotspot],
    params: &EngineParams,
    rng: &mut R,
) -> Result<Vec<HazardEvent>, HzError> {
    params.validate()?;
    let mut predictions = Vec::with_capacity(hotspots.len().min(params.max_predictions));
    for hotspot in hotspots.iter().take(params.max_predictions) {
        let seed = &hotspot.seed;
        let bearing = match params.bearing {
            BearingPolicy::Random => rng.gen_range(0.0..TAU),
            BearingPolicy::AwayFromCentroid => {
                match bearing_rad(hotspot.neighbor_centroid, seed.position) {
                    Some(bearing) => bearing,
                    None => rng.gen_range(0.0..TAU),
                }
            }
        };
        let duration_ticks =
            rng.gen_range(params.min_predicted_duration..=params.max_predicted_duration);
        predictions.push(HazardEvent {
            id: format!("pred-{}-{}", seed.id, predictions.len()),
            position: displace(seed.position, params.prediction_offset_km, bearing),
            category: seed.category,
            severity: seed.severity,
            occurs_at: seed.occurs_at + params.prediction_lead_ticks,
            duration_ticks,
            origin: Origin::Predicted,
            title: format!("Predicted: {}", seed.category.name()),
            description: "High probability based on hotspot detection.".to_string(),
        });
    }
    debug!(
        hotspots = hotspots.len(),
        predictions = predictions.len(),
        "predictions synthesized"
    );
    Ok(predictions)
}

/// Detect hotspots among reports known at `boundary` and synthesize
/// predictions from them.
pub fn forecast<R: Rng + ?Sized>(
    catalog: &HazardCatalog,
    boundary: f64,
    categories: &HashSet<HazardCategory>,
    params: &EngineParams,
    rng: &mut R,
) -> Result<Vec<HazardEvent>, HzError> {
    params.validate()?;
    let known = catalog.filtered(categories, boundary);
    let hotspots = detect(&known, params.hotspot_radius_km);
    synthesize(&hotspots, params, rng)
}
