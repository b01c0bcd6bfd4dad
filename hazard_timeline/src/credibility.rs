//! Credibility scoring for incoming citizen reports.
//!
//! A submission's score blends classifier confidence, agreement from other
//! users nearby, a per-user spam penalty, keyword legitimacy and staleness.
//! Reports scoring at or above the threshold are eligible for the catalog.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::haversine_km;
use crate::{HazardCategory, LatLng};

pub const HAZARD_KEYWORDS: &[&str] = &[
    "flood",
    "waterlogging",
    "overflow",
    "submerged",
    "tsunami",
    "seismic wave",
    "high waves",
    "tidal waves",
    "swells",
    "storm surge",
    "cyclone surge",
    "erosion",
    "damage",
    "sea wall break",
    "fire",
    "burning",
    "wildfire",
    "earthquake",
    "tremor",
    "quake",
];

pub const TRIVIAL_KEYWORDS: &[&str] = &[
    "stone", "rock", "stick", "leaf", "plastic", "garbage", "branch",
];

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CredibilityParams {
    pub score_threshold: f64,
    pub consensus_radius_km: f64,
    /// Distinct reporters needed for full consensus.
    pub consensus_target: usize,
    /// Reports a user may file before the spam penalty starts.
    pub spam_free_reports: usize,
    /// Extra reports over which the penalty ramps to 1.
    pub spam_ramp_reports: f64,
    pub stale_after_hours: f64,
}

impl Default for CredibilityParams {
    fn default() -> Self {
        Self {
            score_threshold: 0.0,
            consensus_radius_km: 5.0,
            consensus_target: 5,
            spam_free_reports: 3,
            spam_ramp_reports: 10.0,
            stale_after_hours: 24.0,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ReportSubmission {
    pub id: String,
    pub user_id: String,
    pub text: String,
    pub category: HazardCategory,
    pub position: LatLng,
    /// Classifier confidence in `category`, 0..=1.
    pub ml_confidence: f64,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ScoreBreakdown {
    pub ml_confidence: f64,
    pub consensus: f64,
    pub spam_penalty: f64,
    pub keyword_score: f64,
    pub time_decay: f64,
    /// Trivial keywords matched; the report is not scored.
    pub ignored: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CredibilityScore {
    pub score: f64,
    pub breakdown: ScoreBreakdown,
}

fn mentions_any(text: &str, words: &[&str]) -> bool {
    words.iter().any(|w| text.contains(w))
}

/// Score `new` against every other submission in `history`.
///
/// `history` may or may not contain `new` itself; entries sharing its id are
/// skipped for consensus and counted once for the spam penalty.
pub fn score_submission(
    new: &ReportSubmission,
    history: &[ReportSubmission],
    now: DateTime<Utc>,
    params: &CredibilityParams,
) -> CredibilityScore {
    let text = new.text.to_lowercase();
    if mentions_any(&text, TRIVIAL_KEYWORDS) {
        return CredibilityScore {
            score: 0.0,
            breakdown: ScoreBreakdown {
                ignored: true,
                ..ScoreBreakdown::default()
            },
        };
    }

    let ml_confidence = if new.ml_confidence.is_finite() {
        new.ml_confidence.clamp(0.0, 1.0)
    } else {
        0.0
    };

    let mut reporters: HashSet<&str> = history
        .iter()
        .filter(|r| {
            r.id != new.id
                && r.category == new.category
                && haversine_km(new.position, r.position) <= params.consensus_radius_km
        })
        .map(|r| r.user_id.as_str())
        .collect();
    reporters.insert(new.user_id.as_str());
    let consensus = (reporters.len() as f64 / params.consensus_target.max(1) as f64).min(1.0);

    let user_reports = history
        .iter()
        .filter(|r| r.id != new.id && r.user_id == new.user_id)
        .count()
        + 1;
    let spam_penalty = if user_reports <= params.spam_free_reports {
        0.0
    } else {
        ((user_reports - params.spam_free_reports) as f64 / params.spam_ramp_reports).min(1.0)
    };

    let keyword_score = if mentions_any(&text, HAZARD_KEYWORDS) {
        0.2
    } else {
        -0.1
    };

    let hours_old = (now - new.submitted_at).num_seconds() as f64 / 3600.0;
    let time_decay = if hours_old > params.stale_after_hours {
        -0.2
    } else {
        0.0
    };

    let score = (0.5 * ml_confidence + 0.3 * consensus - 0.2 * spam_penalty
        + keyword_score
        + time_decay)
        .clamp(0.0, 1.0);

    CredibilityScore {
        score,
        breakdown: ScoreBreakdown {
            ml_confidence,
            consensus,
            spam_penalty,
            keyword_score,
            time_decay,
            ignored: false,
        },
    }
}

pub fn is_credible(score: &CredibilityScore, params: &CredibilityParams) -> bool {
    !score.breakdown.ignored && score.score >= params.score_threshold
}
