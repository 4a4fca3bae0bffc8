//! Selection engine: feature derivation, squad optimization, lineup picking.

pub mod features;
pub mod lineup;
pub mod squad;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::types::{
    cost_to_decimal, format_cost, ClubDirectory, Lineup, Player, PlayerPool, Position,
    SelectionError, Squad,
};
use features::FeatureDeriver;
use lineup::LineupSelector;
use squad::SquadOptimizer;

// ---------------------------------------------------------------------------
// Recommendation
// ---------------------------------------------------------------------------

/// Output of one pipeline run.
#[derive(Debug, Clone)]
pub struct Recommendation {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub gameweek: u32,
    /// Every scored (available) player, for callers that want to show the pool.
    pub scored_pool: Vec<Player>,
    pub squad: Squad,
    pub lineup: Lineup,
}

impl Recommendation {
    pub fn total_cost(&self) -> u32 {
        self.squad.total_cost()
    }

    pub fn predicted_points(&self) -> f64 {
        self.squad.total_score()
    }

    /// Flatten into the presentation contract.
    pub fn to_response(&self, clubs: &ClubDirectory) -> SquadResponse {
        let mut players: Vec<&Player> = self.squad.players().iter().collect();
        players.sort_by(|a, b| {
            a.position
                .cmp(&b.position)
                .then(b.predicted_score.total_cmp(&a.predicted_score))
        });

        SquadResponse {
            run_id: self.run_id,
            generated_at: self.generated_at,
            gameweek: self.gameweek,
            predicted_points: round2(self.predicted_points()),
            starting_points: round2(self.lineup.starting_score(&self.squad)),
            total_cost: format_cost(self.total_cost()),
            formation: self.lineup.formation(),
            optimal_squad: players
                .into_iter()
                .map(|p| PlayerView {
                    id: p.id,
                    name: p.name.clone(),
                    position: p.position,
                    club: clubs.name(p.club).to_string(),
                    cost: cost_to_decimal(p.cost),
                    predicted_score: round2(p.predicted_score),
                    is_starter: self.lineup.is_starter(p.id),
                })
                .collect(),
        }
    }
}

/// Squad as handed to the presentation layer.
#[derive(Debug, Clone, Serialize)]
pub struct SquadResponse {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub gameweek: u32,
    pub predicted_points: f64,
    pub starting_points: f64,
    /// e.g. `"£99.5m"`.
    pub total_cost: String,
    pub formation: String,
    pub optimal_squad: Vec<PlayerView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerView {
    pub id: u32,
    pub name: String,
    pub position: Position,
    pub club: String,
    /// Currency units, one decimal.
    pub cost: Decimal,
    pub predicted_score: f64,
    pub is_starter: bool,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Chains derive → optimize → lineup.
///
/// Stateless between runs; every call works from the pool it is given.
pub struct SelectionPipeline {
    deriver: FeatureDeriver,
    optimizer: SquadOptimizer,
    lineup: LineupSelector,
}

impl SelectionPipeline {
    pub fn new(deriver: FeatureDeriver, optimizer: SquadOptimizer, lineup: LineupSelector) -> Self {
        Self {
            deriver,
            optimizer,
            lineup,
        }
    }

    /// Run the full selection for one pool.
    ///
    /// Steps:
    /// 1. Score available players (unavailable ones are dropped).
    /// 2. Solve for the best squad under budget/quota/club cap.
    /// 3. Split the squad into starters and bench.
    pub fn run(&self, pool: &PlayerPool) -> Result<Recommendation, SelectionError> {
        if pool.is_empty() {
            warn!("Player pool is empty");
            return Err(SelectionError::EmptyPool);
        }

        let scored = self.deriver.derive_scores(&pool.players);
        if scored.is_empty() {
            warn!(pool = pool.players.len(), "No available players to select from");
            return Err(SelectionError::EmptyPool);
        }

        let squad = self.optimizer.optimize(&scored)?;
        let lineup = self.lineup.select_lineup(&squad)?;

        let recommendation = Recommendation {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            gameweek: pool.gameweek,
            scored_pool: scored,
            squad,
            lineup,
        };

        info!(
            run_id = %recommendation.run_id,
            gameweek = recommendation.gameweek,
            predicted_points = format!("{:.2}", recommendation.predicted_points()),
            total_cost = %format_cost(recommendation.total_cost()),
            formation = %recommendation.lineup.formation(),
            "Selection complete"
        );

        Ok(recommendation)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
