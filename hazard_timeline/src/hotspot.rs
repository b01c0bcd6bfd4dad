//! Same-category report clusters that seed forecasts.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::geo::{centroid, haversine_km};
use crate::{HazardEvent, LatLng};

/// A report with at least one same-category neighbor inside the hotspot radius.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Hotspot {
    pub seed: HazardEvent,
    pub neighbor_count: usize,
    /// Mean position of the matching neighbors, seed excluded.
    pub neighbor_centroid: LatLng,
}

/// Find seed-rooted clusters among `reports`.
///
/// The caller truncates `reports` to the cutoff; no time filtering happens
/// here. Quadratic in `reports.len()`. Output follows input order.
pub fn detect(reports: &[HazardEvent], radius_km: f64) -> Vec<Hotspot> {
    let mut hotspots = Vec::new();
    for report in reports {
        let neighbors: Vec<LatLng> = reports
            .iter()
            .filter(|other| {
                other.id != report.id
                    && other.category == report.category
                    && haversine_km(report.position, other.position) < radius_km
            })
            .map(|other| other.position)
            .collect();
        if let Some(neighbor_centroid) = centroid(&neighbors) {
            hotspots.push(Hotspot {
                seed: report.clone(),
                neighbor_count: neighbors.len(),
                neighbor_centroid,
            });
        }
    }
    debug!(
        reports = reports.len(),
        hotspots = hotspots.len(),
        radius_km,
        "hotspot detection"
    );
    hotspots
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::displace;
    use crate::{HazardCategory, Origin};

    const KOCHI: LatLng = LatLng::new(9.9312, 76.2673);

    fn report(id: &str, position: LatLng, category: HazardCategory) -> HazardEvent {
        HazardEvent {
            id: id.to_string(),
            position,
            category,
            severity: 3,
            occurs_at: 0.0,
            duration_ticks: 15,
            origin: Origin::Reported,
            title: String::new(),
            description: String::new(),
        }
    }

    #[test]
    fn test_pair_five_km_apart_yields_two_hotspots() {
        let a = report("a", KOCHI, HazardCategory::HighWave);
        let b = report("b", displace(KOCHI, 5.0, 0.0), HazardCategory::HighWave);
        let hotspots = detect(&[a, b], 25.0);
        assert_eq!(hotspots.len(), 2);
        assert_eq!(hotspots[0].seed.id, "a");
        assert_eq!(hotspots[1].seed.id, "b");
        assert!(hotspots.iter().all(|h| h.neighbor_count == 1));
        // Each seed's centroid is the other report.
        assert!((hotspots[0].neighbor_centroid.lat - hotspots[1].seed.position.lat).abs() < 1e-12);
    }

    #[test]
    fn test_other_categories_and_far_reports_are_ignored() {
        let reports = vec![
            report("a", KOCHI, HazardCategory::HighWave),
            report("b", displace(KOCHI, 3.0, 1.0), HazardCategory::OilSpill),
            report("c", displace(KOCHI, 40.0, 2.0), HazardCategory::HighWave),
        ];
        assert!(detect(&reports, 25.0).is_empty());
    }

    #[test]
    fn test_radius_is_strict() {
        let a = report("a", KOCHI, HazardCategory::Pollution);
        let b = report("b", displace(KOCHI, 10.0, 0.5), HazardCategory::Pollution);
        let dist = haversine_km(a.position, b.position);
        assert!(detect(&[a.clone(), b.clone()], dist).is_empty());
        assert_eq!(detect(&[a, b], dist + 1e-6).len(), 2);
    }

    #[test]
    fn test_counts_every_neighbor_and_never_zero() {
        let mut reports = vec![report("seed", KOCHI, HazardCategory::Tsunami)];
        for i in 0..4 {
            reports.push(report(
                &format!("n{i}"),
                displace(KOCHI, 2.0 + i as f64, i as f64),
                HazardCategory::Tsunami,
            ));
        }
        reports.push(report(
            "lonely",
            displace(KOCHI, 300.0, 0.0),
            HazardCategory::Tsunami,
        ));
        let hotspots = detect(&reports, 25.0);
        assert_eq!(hotspots.len(), 5);
        assert_eq!(hotspots[0].neighbor_count, 4);
        assert!(hotspots.iter().all(|h| h.neighbor_count >= 1));
        assert!(hotspots.iter().all(|h| h.seed.id != "lonely"));
    }

    #[test]
    fn test_empty_input() {
        assert!(detect(&[], 25.0).is_empty());
    }
}
