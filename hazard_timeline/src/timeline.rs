//! Cursor projection: which hazards are visible at a tick, and in what state.
//!
//! Ticks are abstract. `TimelineWindow` is the only place they meet wall-clock
//! time; everything else is a pure function of the cursor, the prediction
//! boundary and the caller's filters.

use std::collections::HashSet;

use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::HazardCatalog;
use crate::predict::forecast;
use crate::{
    EngineParams, HazardCategory, HazardEvent, HzError, LifecycleStatus, Origin, StatusFilter,
};

/// Map between ticks `0..=total_ticks` and a wall-clock span.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TimelineWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// "Now": the edge between known history and forecast.
    pub observed_at: DateTime<Utc>,
    pub total_ticks: f64,
}

impl TimelineWindow {
    pub fn new(
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        observed_at: DateTime<Utc>,
        total_ticks: f64,
    ) -> Result<Self, HzError> {
        if end <= start {
            return Err(HzError::InvalidParameter(format!(
                "timeline end {end} is not after start {start}"
            )));
        }
        if !total_ticks.is_finite() || total_ticks <= 0.0 {
            return Err(HzError::InvalidParameter(format!(
                "total_ticks must be > 0 (got {total_ticks})"
            )));
        }
        Ok(Self {
            start,
            end,
            observed_at,
            total_ticks,
        })
    }

    /// Window starting at UTC midnight `days_before` days before
    /// `observed_at` and spanning `span_days` days.
    pub fn around(
        observed_at: DateTime<Utc>,
        days_before: i64,
        span_days: i64,
        total_ticks: f64,
    ) -> Result<Self, HzError> {
        let midnight = observed_at
            .date_naive()
            .checked_sub_signed(Duration::days(days_before))
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .ok_or_else(|| HzError::InvalidParameter("timeline start out of range".into()))?;
        let start = Utc.from_utc_datetime(&midnight);
        let end = start
            .checked_add_signed(Duration::days(span_days))
            .ok_or_else(|| HzError::InvalidParameter("timeline end out of range".into()))?;
        Self::new(start, end, observed_at, total_ticks)
    }

    fn span_ms(&self) -> f64 {
        (self.end - self.start).num_milliseconds() as f64
    }

    /// Tick of `observed_at`, clamped into the window.
    pub fn prediction_boundary(&self) -> f64 {
        self.tick_at(self.observed_at)
    }

    pub fn tick_at(&self, at: DateTime<Utc>) -> f64 {
        let frac = (at - self.start).num_milliseconds() as f64 / self.span_ms();
        frac.clamp(0.0, 1.0) * self.total_ticks
    }

    pub fn datetime_at(&self, tick: f64) -> DateTime<Utc> {
        let frac = tick.clamp(0.0, self.total_ticks) / self.total_ticks;
        self.start + Duration::milliseconds((self.span_ms() * frac).round() as i64)
    }
}

/// One row of projector output.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ProjectedHazard {
    pub event: HazardEvent,
    pub status: LifecycleStatus,
}

/// Derive an event's status at `cutoff`. `None` while the event is unborn.
///
/// Reported events that end at or before `boundary` are `Resolved` once over;
/// reported events reaching past the boundary turn `Predicted` when the
/// cursor is in the forecast regime and `ForecastResolved` once over.
pub fn lifecycle_status(
    event: &HazardEvent,
    cutoff: f64,
    boundary: f64,
) -> Option<LifecycleStatus> {
    if event.occurs_at > cutoff {
        return None;
    }
    let resolved_at = event.resolved_at();
    let status = match event.origin {
        Origin::Reported if resolved_at <= boundary => {
            if cutoff < resolved_at {
                LifecycleStatus::Reported
            } else {
                LifecycleStatus::Resolved
            }
        }
        Origin::Reported => {
            if cutoff >= resolved_at {
                LifecycleStatus::ForecastResolved
            } else if cutoff > boundary {
                LifecycleStatus::Predicted
            } else {
                LifecycleStatus::Reported
            }
        }
        Origin::Predicted => {
            if resolved_at <= cutoff {
                LifecycleStatus::ForecastResolved
            } else {
                LifecycleStatus::Predicted
            }
        }
    };
    Some(status)
}

/// Spread predictions across `(boundary, total_ticks)` by rank.
///
/// Prediction `i` of `n` lands at `boundary + (i + 1) / (n + 1) * span`, so
/// every rescaled prediction sits strictly after the boundary.
pub fn rescale_predictions(
    predicted: &[HazardEvent],
    boundary: f64,
    total_ticks: f64,
) -> Vec<HazardEvent> {
    let span = (total_ticks - boundary).max(0.0);
    let slots = (predicted.len() + 1) as f64;
    predicted
        .iter()
        .enumerate()
        .map(|(rank, p)| {
            let mut p = p.clone();
            p.occurs_at = boundary + (rank + 1) as f64 / slots * span;
            p
        })
        .collect()
}

#[derive(Clone, Copy, Debug)]
pub struct ProjectionQuery<'a> {
    pub cutoff_tick: f64,
    pub prediction_cutoff_tick: f64,
    pub total_ticks: f64,
    pub categories: &'a HashSet<HazardCategory>,
    pub statuses: StatusFilter,
    pub show_predictions: bool,
}

/// Displayable hazards at `query.cutoff_tick`: reported events first (catalog
/// order), then rescaled predictions (rank order).
pub fn project(
    query: &ProjectionQuery<'_>,
    reported: &[HazardEvent],
    predicted: &[HazardEvent],
) -> Vec<ProjectedHazard> {
    let cutoff = query.cutoff_tick;
    let boundary = query.prediction_cutoff_tick;
    let mut out = Vec::new();

    for event in reported {
        if !query.categories.contains(&event.category) {
            continue;
        }
        match lifecycle_status(event, cutoff, boundary) {
            None | Some(LifecycleStatus::Resolved) => {}
            Some(status) => out.push(ProjectedHazard {
                event: event.clone(),
                status,
            }),
        }
    }

    if query.show_predictions && cutoff > boundary {
        for event in rescale_predictions(predicted, boundary, query.total_ticks) {
            if !query.categories.contains(&event.category) {
                continue;
            }
            if let Some(status) = lifecycle_status(&event, cutoff, boundary) {
                out.push(ProjectedHazard { event, status });
            }
        }
    }

    out.retain(|p| query.statuses.admits(p.status));
    out
}

/// Per-call view settings supplied by the presentation layer.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TimelineQuery {
    pub cutoff_tick: f64,
    pub categories: HashSet<HazardCategory>,
    pub statuses: StatusFilter,
    pub show_predictions: bool,
}

impl TimelineQuery {
    pub fn at(cutoff_tick: f64) -> Self {
        Self {
            cutoff_tick,
            categories: HazardCategory::ALL.into_iter().collect(),
            statuses: StatusFilter::default(),
            show_predictions: true,
        }
    }
}

/// Catalog, tunables and prediction boundary bundled for repeated projection.
#[derive(Clone, Debug)]
pub struct Timeline<'a> {
    catalog: &'a HazardCatalog,
    params: &'a EngineParams,
    prediction_boundary: f64,
    total_ticks: f64,
}

impl<'a> Timeline<'a> {
    pub fn new(
        catalog: &'a HazardCatalog,
        params: &'a EngineParams,
        window: &TimelineWindow,
    ) -> Result<Self, HzError> {
        Self::with_boundary(
            catalog,
            params,
            window.prediction_boundary(),
            window.total_ticks,
        )
    }

    pub fn with_boundary(
        catalog: &'a HazardCatalog,
        params: &'a EngineParams,
        prediction_boundary: f64,
        total_ticks: f64,
    ) -> Result<Self, HzError> {
        params.validate()?;
        if !total_ticks.is_finite() || total_ticks <= 0.0 {
            return Err(HzError::InvalidParameter(format!(
                "total_ticks must be > 0 (got {total_ticks})"
            )));
        }
        if !prediction_boundary.is_finite() || !(0.0..=total_ticks).contains(&prediction_boundary)
        {
            return Err(HzError::InvalidParameter(format!(
                "prediction boundary {prediction_boundary} outside 0..={total_ticks}"
            )));
        }
        Ok(Self {
            catalog,
            params,
            prediction_boundary,
            total_ticks,
        })
    }

    pub fn prediction_boundary(&self) -> f64 {
        self.prediction_boundary
    }

    pub fn total_ticks(&self) -> f64 {
        self.total_ticks
    }

    pub fn catalog(&self) -> &HazardCatalog {
        self.catalog
    }

    /// Predictions (native ticks) from the reports known at the boundary.
    pub fn forecast<R: Rng + ?Sized>(
        &self,
        categories: &HashSet<HazardCategory>,
        rng: &mut R,
    ) -> Result<Vec<HazardEvent>, HzError> {
        forecast(
            self.catalog,
            self.prediction_boundary,
            categories,
            self.params,
            rng,
        )
    }

    pub fn project(
        &self,
        query: &TimelineQuery,
        predicted: &[HazardEvent],
    ) -> Vec<ProjectedHazard> {
        let projection = ProjectionQuery {
            cutoff_tick: query.cutoff_tick,
            prediction_cutoff_tick: self.prediction_boundary,
            total_ticks: self.total_ticks,
            categories: &query.categories,
            statuses: query.statuses,
            show_predictions: query.show_predictions,
        };
        let out = project(&projection, self.catalog.all_reported(), predicted);
        debug!(
            cutoff = query.cutoff_tick,
            visible = out.len(),
            "timeline projected"
        );
        out
    }
}
