//! Ground-truth hazard reports, ordered by occurrence tick.

use std::collections::HashSet;

use ordered_float::OrderedFloat;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::geo::lerp;
use crate::{HazardCategory, HazardEvent, HzError, LatLng, Origin};

/// Recipe for the synthetic demo catalog.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSpec {
    pub total_events: usize,
    /// Polyline the reports are scattered along.
    pub coastline: Vec<LatLng>,
    pub min_duration: u32,
    pub max_duration: u32,
}

impl Default for CatalogSpec {
    fn default() -> Self {
        Self {
            total_events: 150,
            coastline: vec![
                LatLng::new(23.0225, 69.6714),
                LatLng::new(18.9220, 72.8347),
                LatLng::new(15.4909, 73.8278),
                LatLng::new(9.9312, 76.2673),
                LatLng::new(8.0883, 77.5385),
                LatLng::new(13.0827, 80.2707),
                LatLng::new(17.6868, 83.2185),
                LatLng::new(21.6947, 88.0283),
            ],
            min_duration: 15,
            max_duration: 29,
        }
    }
}

// Oil spills west of this meridian drift further west, the rest further east.
const OFFSHORE_SPLIT_LNG: f64 = 78.0;
const COASTAL_JITTER_DEG: f64 = 0.05;
const OFFSHORE_LAT_JITTER_DEG: f64 = 0.2;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct HazardCatalog {
    events: Vec<HazardEvent>,
}

impl HazardCatalog {
    /// Validate and order reports. Ordering is stable for equal ticks.
    pub fn new(mut events: Vec<HazardEvent>) -> Result<Self, HzError> {
        let mut seen = HashSet::with_capacity(events.len());
        for event in &events {
            event.validate()?;
            if event.origin != Origin::Reported {
                return Err(HzError::InvalidEvent(format!(
                    "{}: catalog only holds reported events",
                    event.id
                )));
            }
            if !seen.insert(event.id.as_str()) {
                return Err(HzError::DuplicateId(event.id.clone()));
            }
        }
        events.sort_by_key(|e| OrderedFloat(e.occurs_at));
        debug!(events = events.len(), "hazard catalog built");
        Ok(Self { events })
    }

    /// Scatter `spec.total_events` reports along the coastline polyline.
    pub fn generate<R: Rng + ?Sized>(spec: &CatalogSpec, rng: &mut R) -> Result<Self, HzError> {
        if spec.coastline.len() < 2 {
            return Err(HzError::InvalidParameter(
                "coastline needs at least two points".into(),
            ));
        }
        if spec.total_events == 0 {
            return Err(HzError::InvalidParameter("total_events must be > 0".into()));
        }
        if spec.min_duration == 0 || spec.max_duration < spec.min_duration {
            return Err(HzError::InvalidParameter(format!(
                "duration range {}..={} is invalid",
                spec.min_duration, spec.max_duration
            )));
        }

        let mut events = Vec::with_capacity(spec.total_events);
        for i in 0..spec.total_events {
            let segment = rng.gen_range(0..spec.coastline.len() - 1);
            let on_coast = lerp(
                spec.coastline[segment],
                spec.coastline[segment + 1],
                rng.gen::<f64>(),
            );
            let category = HazardCategory::ALL[rng.gen_range(0..HazardCategory::ALL.len())];
            let position = if category == HazardCategory::OilSpill {
                let offshore = 0.5 + rng.gen::<f64>();
                let lng = if on_coast.lng < OFFSHORE_SPLIT_LNG {
                    on_coast.lng - offshore
                } else {
                    on_coast.lng + offshore
                };
                let lat = on_coast.lat + (rng.gen::<f64>() - 0.5) * OFFSHORE_LAT_JITTER_DEG;
                LatLng::new(lat, lng)
            } else {
                let offset = (rng.gen::<f64>() - 0.5) * COASTAL_JITTER_DEG;
                LatLng::new(
                    on_coast.lat + offset,
                    on_coast.lng + offset / on_coast.lat.to_radians().cos(),
                )
            };
            events.push(HazardEvent {
                id: format!("rep-{i}"),
                position,
                category,
                severity: rng.gen_range(1..=5),
                occurs_at: i as f64,
                duration_ticks: rng.gen_range(spec.min_duration..=spec.max_duration),
                origin: Origin::Reported,
                title: category.name().to_string(),
                description: "Verified report.".to_string(),
            });
        }
        Self::new(events)
    }

    pub fn from_json(text: &str) -> Result<Self, HzError> {
        let events: Vec<HazardEvent> =
            serde_json::from_str(text).map_err(|e| HzError::Catalog(e.to_string()))?;
        Self::new(events)
    }

    pub fn to_json_pretty(&self) -> Result<String, HzError> {
        serde_json::to_string_pretty(&self.events).map_err(|e| HzError::Catalog(e.to_string()))
    }

    pub fn all_reported(&self) -> &[HazardEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&HazardEvent> {
        self.events.iter().find(|e| e.id == id)
    }

    /// Reports with `occurs_at <= cutoff`, in catalog order.
    pub fn up_to(&self, cutoff: f64) -> &[HazardEvent] {
        let end = self.events.partition_point(|e| e.occurs_at <= cutoff);
        &self.events[..end]
    }

    pub fn filtered(&self, categories: &HashSet<HazardCategory>, cutoff: f64) -> Vec<HazardEvent> {
        self.up_to(cutoff)
            .iter()
            .filter(|e| categories.contains(&e.category))
            .cloned()
            .collect()
    }

    /// Reports still active at `cutoff`, newest first.
    pub fn feed(
        &self,
        cutoff: f64,
        categories: &HashSet<HazardCategory>,
        limit: usize,
    ) -> Vec<&HazardEvent> {
        let mut active: Vec<&HazardEvent> = self
            .up_to(cutoff)
            .iter()
            .filter(|e| categories.contains(&e.category) && e.resolved_at() > cutoff)
            .collect();
        active.sort_by_key(|e| std::cmp::Reverse(OrderedFloat(e.occurs_at)));
        active.truncate(limit);
        active
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn report(id: &str, occurs_at: f64, duration: u32) -> HazardEvent {
        HazardEvent {
            id: id.to_string(),
            position: LatLng::new(10.0, 76.0),
            category: HazardCategory::Tsunami,
            severity: 2,
            occurs_at,
            duration_ticks: duration,
            origin: Origin::Reported,
            title: String::new(),
            description: String::new(),
        }
    }

    fn all_categories() -> HashSet<HazardCategory> {
        HazardCategory::ALL.into_iter().collect()
    }

    #[test]
    fn test_new_sorts_by_occurrence() {
        let catalog = HazardCatalog::new(vec![
            report("c", 9.0, 5),
            report("a", 1.0, 5),
            report("b", 4.0, 5),
        ])
        .unwrap();
        let ids: Vec<_> = catalog.all_reported().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
        assert_eq!(catalog.get("b").map(|e| e.occurs_at), Some(4.0));
    }

    #[test]
    fn test_new_rejects_duplicates_and_predictions() {
        let dup = HazardCatalog::new(vec![report("a", 1.0, 5), report("a", 2.0, 5)]);
        assert_eq!(dup, Err(HzError::DuplicateId("a".into())));

        let mut predicted = report("p", 1.0, 5);
        predicted.origin = Origin::Predicted;
        assert!(matches!(
            HazardCatalog::new(vec![predicted]),
            Err(HzError::InvalidEvent(_))
        ));

        assert!(HazardCatalog::new(vec![report("z", 0.0, 0)]).is_err());
    }

    #[test]
    fn test_up_to_is_inclusive() {
        let catalog = HazardCatalog::new(vec![
            report("a", 0.0, 5),
            report("b", 3.0, 5),
            report("c", 3.0, 5),
            report("d", 7.0, 5),
        ])
        .unwrap();
        assert_eq!(catalog.up_to(-1.0).len(), 0);
        assert_eq!(catalog.up_to(2.9).len(), 1);
        assert_eq!(catalog.up_to(3.0).len(), 3);
        assert_eq!(catalog.up_to(100.0).len(), 4);
    }

    #[test]
    fn test_filtered_respects_categories() {
        let mut spill = report("spill", 2.0, 5);
        spill.category = HazardCategory::OilSpill;
        let catalog = HazardCatalog::new(vec![report("a", 1.0, 5), spill]).unwrap();
        let only_spills: HashSet<_> = [HazardCategory::OilSpill].into_iter().collect();
        let picked = catalog.filtered(&only_spills, 10.0);
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].id, "spill");
        assert!(catalog.filtered(&only_spills, 1.5).is_empty());
    }

    #[test]
    fn test_feed_newest_first_and_limited() {
        let catalog = HazardCatalog::new(vec![
            report("old", 0.0, 2),
            report("a", 1.0, 20),
            report("b", 2.0, 20),
            report("c", 3.0, 20),
            report("future", 50.0, 20),
        ])
        .unwrap();
        let feed = catalog.feed(5.0, &all_categories(), 2);
        let ids: Vec<_> = feed.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["c", "b"]);

        // "old" resolved at tick 2 and must not appear.
        let feed = catalog.feed(5.0, &all_categories(), 10);
        assert!(feed.iter().all(|e| e.id != "old" && e.id != "future"));
    }

    #[test]
    fn test_generate_is_deterministic_and_valid() {
        let spec = CatalogSpec::default();
        let first = HazardCatalog::generate(&spec, &mut ChaCha8Rng::seed_from_u64(7)).unwrap();
        let second = HazardCatalog::generate(&spec, &mut ChaCha8Rng::seed_from_u64(7)).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 150);

        for (i, event) in first.all_reported().iter().enumerate() {
            assert_eq!(event.occurs_at, i as f64);
            assert_eq!(event.id, format!("rep-{i}"));
            assert!((15..=29).contains(&event.duration_ticks));
            assert!((1..=5).contains(&event.severity));
            assert_eq!(event.title, event.category.name());
            assert!(event.position.is_valid());
        }
    }

    #[test]
    fn test_generate_rejects_degenerate_coastline() {
        let spec = CatalogSpec {
            coastline: vec![LatLng::new(10.0, 76.0)],
            ..CatalogSpec::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(matches!(
            HazardCatalog::generate(&spec, &mut rng),
            Err(HzError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_from_json_reads_event_array() {
        let text = r#"[
            {"id": "r2", "position": {"lat": 9.9, "lng": 76.2}, "category": "high_wave",
             "severity": 4, "occurs_at": 12.0, "duration_ticks": 18, "origin": "reported"},
            {"id": "r1", "position": {"lat": 9.8, "lng": 76.3}, "category": "pollution",
             "severity": 1, "occurs_at": 3.0, "duration_ticks": 15, "origin": "reported",
             "title": "Pollution Event", "description": "Verified report."}
        ]"#;
        let catalog = HazardCatalog::from_json(text).unwrap();
        assert_eq!(catalog.all_reported()[0].id, "r1");
        assert_eq!(catalog.all_reported()[1].category, HazardCategory::HighWave);
        assert!(matches!(
            HazardCatalog::from_json("{not json"),
            Err(HzError::Catalog(_))
        ));
    }
}
