//! Feature derivation: raw player signals → predicted score.
//!
//! The score is a fixed weighted sum, not a trained model. Two weightings
//! have been used over the life of the app and both ship as presets:
//!
//! | preset          | formula                                                  | weight sum |
//! |-----------------|----------------------------------------------------------|------------|
//! | `blended`       | `0.6·ep_next + 0.3·form + 0.1·(ict / max_ict)·10`         | 1.0        |
//! | `form_weighted` | `0.5·form + 0.3·points_per_game + 0.02·ict`               | 0.82       |
//!
//! Scores are clamped at zero so the optimizer never sees negative value.

use serde::Deserialize;
use tracing::{debug, info};

use crate::types::Player;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Named weightings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScorePreset {
    /// Expected points next round, form, and pool-normalized ICT.
    #[default]
    Blended,
    /// Form, points per game, and raw ICT.
    FormWeighted,
}

/// Linear weights over the raw signals.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ScoreWeights {
    pub expected_points_next: f64,
    pub form: f64,
    pub points_per_game: f64,
    pub ict_index: f64,
    /// Multiplier applied to the ICT term after (optional) normalization.
    pub ict_scale: f64,
    /// Divide ICT by the pool-wide maximum before weighting.
    pub normalize_ict: bool,
}

impl ScoreWeights {
    pub fn blended() -> Self {
        Self {
            expected_points_next: 0.6,
            form: 0.3,
            points_per_game: 0.0,
            ict_index: 0.1,
            ict_scale: 10.0,
            normalize_ict: true,
        }
    }

    pub fn form_weighted() -> Self {
        Self {
            expected_points_next: 0.0,
            form: 0.5,
            points_per_game: 0.3,
            ict_index: 0.02,
            ict_scale: 1.0,
            normalize_ict: false,
        }
    }

    /// Sum of the signal weights (the ICT scale is a unit conversion, not a weight).
    pub fn total_weight(&self) -> f64 {
        self.expected_points_next + self.form + self.points_per_game + self.ict_index
    }
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self::blended()
    }
}

impl From<ScorePreset> for ScoreWeights {
    fn from(preset: ScorePreset) -> Self {
        match preset {
            ScorePreset::Blended => ScoreWeights::blended(),
            ScorePreset::FormWeighted => ScoreWeights::form_weighted(),
        }
    }
}

// ---------------------------------------------------------------------------
// Deriver
// ---------------------------------------------------------------------------

/// Turns an availability-flagged pool into a scored, available-only pool.
pub struct FeatureDeriver {
    weights: ScoreWeights,
}

impl FeatureDeriver {
    pub fn new(weights: ScoreWeights) -> Self {
        Self { weights }
    }

    /// Score every available player; unavailable players are dropped.
    ///
    /// Pure: input is untouched and the same pool always yields the same
    /// scores. An empty pool (or one with nobody available) yields an empty
    /// result; reporting that is the caller's job.
    pub fn derive_scores(&self, players: &[Player]) -> Vec<Player> {
        let available: Vec<&Player> = players.iter().filter(|p| p.available).collect();
        let dropped = players.len() - available.len();

        let max_ict = available
            .iter()
            .map(|p| sanitize(p.signals.ict_index))
            .fold(0.0_f64, f64::max);

        let scored: Vec<Player> = available
            .into_iter()
            .map(|p| {
                let mut scored = p.clone();
                scored.predicted_score = self.score(p, max_ict);
                scored
            })
            .collect();

        info!(
            pool = players.len(),
            scored = scored.len(),
            dropped_unavailable = dropped,
            max_ict,
            "Predicted scores derived"
        );

        scored
    }

    /// Score one player given the pool-wide ICT maximum.
    fn score(&self, player: &Player, max_ict: f64) -> f64 {
        let w = &self.weights;
        let s = &player.signals;

        let ict = sanitize(s.ict_index);
        let ict_term = if w.normalize_ict {
            if max_ict > 0.0 {
                ict / max_ict
            } else {
                0.0
            }
        } else {
            ict
        };

        let raw = w.expected_points_next * sanitize(s.expected_points_next)
            + w.form * sanitize(s.form)
            + w.points_per_game * sanitize(s.points_per_game)
            + w.ict_index * ict_term * w.ict_scale;

        let score = raw.max(0.0);
        debug!(player_id = player.id, raw, score, "Player scored");
        score
    }
}

/// Non-finite signals count as neutral.
fn sanitize(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
