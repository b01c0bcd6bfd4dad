//! Hazard timeline engine: lifecycle derivation, hotspot detection and
//! forecast synthesis over a catalog of coastal hazard reports.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod catalog;
pub mod credibility;
pub mod geo;
pub mod hotspot;
pub mod predict;
pub mod timeline;

pub use catalog::{CatalogSpec, HazardCatalog};
pub use credibility::{
    is_credible, score_submission, CredibilityParams, CredibilityScore, ReportSubmission,
    ScoreBreakdown,
};
pub use geo::haversine_km;
pub use hotspot::{detect, Hotspot};
pub use predict::{forecast, synthesize};
pub use timeline::{
    lifecycle_status, project, rescale_predictions, ProjectedHazard, ProjectionQuery, Timeline,
    TimelineQuery, TimelineWindow,
};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum HzError {
    #[error("invalid hazard event: {0}")]
    InvalidEvent(String),
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("duplicate event id: {0}")]
    DuplicateId(String),
    #[error("failed to read catalog: {0}")]
    Catalog(String),
}

/// A point on the globe in decimal degrees.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum HazardCategory {
    Tsunami,
    StormSurge,
    HighWave,
    SwellSurge,
    CoastalCurrent,
    Pollution,
    OilSpill,
}

impl HazardCategory {
    pub const ALL: [HazardCategory; 7] = [
        HazardCategory::Tsunami,
        HazardCategory::StormSurge,
        HazardCategory::HighWave,
        HazardCategory::SwellSurge,
        HazardCategory::CoastalCurrent,
        HazardCategory::Pollution,
        HazardCategory::OilSpill,
    ];

    /// Display title used for generated and predicted events.
    pub fn name(self) -> &'static str {
        match self {
            HazardCategory::Tsunami => "Tsunami Warning",
            HazardCategory::StormSurge => "Storm Surge",
            HazardCategory::HighWave => "High Waves",
            HazardCategory::SwellSurge => "Swell Surge",
            HazardCategory::CoastalCurrent => "Strong Currents",
            HazardCategory::Pollution => "Pollution Event",
            HazardCategory::OilSpill => "Oil Spill",
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            HazardCategory::Tsunami => "tsunami",
            HazardCategory::StormSurge => "storm_surge",
            HazardCategory::HighWave => "high_wave",
            HazardCategory::SwellSurge => "swell_surge",
            HazardCategory::CoastalCurrent => "coastal_current",
            HazardCategory::Pollution => "pollution",
            HazardCategory::OilSpill => "oil_spill",
        }
    }

    /// Marker radius in meters for a severity-zero event of this kind.
    pub fn base_radius_m(self) -> f64 {
        match self {
            HazardCategory::Tsunami => 50_000.0,
            HazardCategory::StormSurge => 40_000.0,
            HazardCategory::HighWave => 15_000.0,
            HazardCategory::SwellSurge => 10_000.0,
            HazardCategory::CoastalCurrent => 3_000.0,
            HazardCategory::Pollution => 2_000.0,
            HazardCategory::OilSpill => 5_000.0,
        }
    }
}

impl fmt::Display for HazardCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for HazardCategory {
    type Err = HzError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        HazardCategory::ALL
            .into_iter()
            .find(|c| c.key() == normalized || c.key().replace('_', "") == normalized)
            .ok_or_else(|| HzError::InvalidParameter(format!("unknown hazard category '{s}'")))
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    Reported,
    Predicted,
}

impl Origin {
    pub fn key(self) -> &'static str {
        match self {
            Origin::Reported => "reported",
            Origin::Predicted => "predicted",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct HazardEvent {
    pub id: String,
    pub position: LatLng,
    pub category: HazardCategory,
    pub severity: u8,
    pub occurs_at: f64,
    pub duration_ticks: u32,
    pub origin: Origin,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

impl HazardEvent {
    /// Tick at which the event stops being active.
    pub fn resolved_at(&self) -> f64 {
        self.occurs_at + f64::from(self.duration_ticks)
    }

    pub fn display_radius_m(&self) -> f64 {
        let base = self.category.base_radius_m();
        base + f64::from(self.severity) * (base / 10.0)
    }

    pub fn validate(&self) -> Result<(), HzError> {
        if self.id.is_empty() {
            return Err(HzError::InvalidEvent("event id must not be empty".into()));
        }
        if !self.position.is_valid() {
            return Err(HzError::InvalidEvent(format!(
                "{}: position ({}, {}) out of range",
                self.id, self.position.lat, self.position.lng
            )));
        }
        if !(1..=5).contains(&self.severity) {
            return Err(HzError::InvalidEvent(format!(
                "{}: severity {} outside 1..=5",
                self.id, self.severity
            )));
        }
        if !self.occurs_at.is_finite() || self.occurs_at < 0.0 {
            return Err(HzError::InvalidEvent(format!(
                "{}: occurs_at {} must be a finite tick >= 0",
                self.id, self.occurs_at
            )));
        }
        if self.duration_ticks == 0 {
            return Err(HzError::InvalidEvent(format!(
                "{}: duration_ticks must be > 0",
                self.id
            )));
        }
        Ok(())
    }
}

/// Status of an event relative to a cursor tick. Never stored on the event.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleStatus {
    Reported,
    Predicted,
    /// Ended entirely inside known history; dropped from projections.
    Resolved,
    ForecastResolved,
}

impl LifecycleStatus {
    pub fn key(self) -> &'static str {
        match self {
            LifecycleStatus::Reported => "reported",
            LifecycleStatus::Predicted => "predicted",
            LifecycleStatus::Resolved => "resolved",
            LifecycleStatus::ForecastResolved => "forecast_resolved",
        }
    }

    pub fn is_active(self) -> bool {
        matches!(self, LifecycleStatus::Reported | LifecycleStatus::Predicted)
    }
}

impl fmt::Display for LifecycleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StatusClass {
    Active,
    Resolved,
}

impl FromStr for StatusClass {
    type Err = HzError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(StatusClass::Active),
            "resolved" => Ok(StatusClass::Resolved),
            other => Err(HzError::InvalidParameter(format!(
                "unknown status class '{other}'"
            ))),
        }
    }
}

/// Which status classes a projection keeps.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusFilter {
    pub active: bool,
    pub resolved: bool,
}

impl Default for StatusFilter {
    fn default() -> Self {
        Self {
            active: true,
            resolved: true,
        }
    }
}

impl StatusFilter {
    pub fn none() -> Self {
        Self {
            active: false,
            resolved: false,
        }
    }

    pub fn with(mut self, class: StatusClass) -> Self {
        match class {
            StatusClass::Active => self.active = true,
            StatusClass::Resolved => self.resolved = true,
        }
        self
    }

    pub fn admits(&self, status: LifecycleStatus) -> bool {
        (self.active && status.is_active())
            || (self.resolved && status == LifecycleStatus::ForecastResolved)
    }
}

impl FromIterator<StatusClass> for StatusFilter {
    fn from_iter<I: IntoIterator<Item = StatusClass>>(iter: I) -> Self {
        iter.into_iter().fold(StatusFilter::none(), StatusFilter::with)
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BearingPolicy {
    /// Uniform bearing drawn from the injected RNG.
    Random,
    /// Extrapolate outward along the centroid -> seed direction.
    AwayFromCentroid,
}

impl Default for BearingPolicy {
    fn default() -> Self {
        BearingPolicy::Random
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineParams {
    pub hotspot_radius_km: f64,
    pub prediction_offset_km: f64,
    pub max_predictions: usize,
    pub prediction_lead_ticks: f64,
    pub min_predicted_duration: u32,
    pub max_predicted_duration: u32,
    pub bearing: BearingPolicy,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            hotspot_radius_km: 25.0,
            prediction_offset_km: 20.0,
            max_predictions: 20,
            prediction_lead_ticks: 5.0,
            min_predicted_duration: 10,
            max_predicted_duration: 19,
            bearing: BearingPolicy::Random,
        }
    }
}

impl EngineParams {
    pub fn validate(&self) -> Result<(), HzError> {
        if !self.hotspot_radius_km.is_finite() || self.hotspot_radius_km <= 0.0 {
            return Err(HzError::InvalidParameter(format!(
                "hotspot_radius_km must be > 0 (got {})",
                self.hotspot_radius_km
            )));
        }
        if !self.prediction_offset_km.is_finite() || self.prediction_offset_km <= 0.0 {
            return Err(HzError::InvalidParameter(format!(
                "prediction_offset_km must be > 0 (got {})",
                self.prediction_offset_km
            )));
        }
        if !self.prediction_lead_ticks.is_finite() || self.prediction_lead_ticks <= 0.0 {
            return Err(HzError::InvalidParameter(format!(
                "prediction_lead_ticks must be > 0 (got {})",
                self.prediction_lead_ticks
            )));
        }
        if self.min_predicted_duration == 0 {
            return Err(HzError::InvalidParameter(
                "min_predicted_duration must be > 0".into(),
            ));
        }
        if self.max_predicted_duration < self.min_predicted_duration {
            return Err(HzError::InvalidParameter(format!(
                "predicted duration range {}..={} is empty",
                self.min_predicted_duration, self.max_predicted_duration
            )));
        }
        Ok(())
    }

    pub fn from_json(text: &str) -> Result<Self, HzError> {
        let params: EngineParams = serde_json::from_str(text)
            .map_err(|e| HzError::InvalidParameter(format!("params JSON: {e}")))?;
        params.validate()?;
        Ok(params)
    }
}
