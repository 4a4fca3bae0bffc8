//! Shared types for the squad optimizer.
//!
//! Plain value records: players, the pool handed over by the data
//! collaborator, the selected squad and its lineup view. Lookup tables
//! (club id → name) are built once per run and passed alongside.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// Playing position. Declaration order is the presentation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Position {
    #[serde(rename = "GKP")]
    Goalkeeper,
    #[serde(rename = "DEF")]
    Defender,
    #[serde(rename = "MID")]
    Midfielder,
    #[serde(rename = "FWD")]
    Forward,
}

impl Position {
    /// All positions, goalkeeper first.
    pub const ALL: [Position; 4] = [
        Position::Goalkeeper,
        Position::Defender,
        Position::Midfielder,
        Position::Forward,
    ];

    /// Short code used by the FPL API (`element_types[].singular_name_short`).
    pub fn code(&self) -> &'static str {
        match self {
            Position::Goalkeeper => "GKP",
            Position::Defender => "DEF",
            Position::Midfielder => "MID",
            Position::Forward => "FWD",
        }
    }

    /// Map an FPL `element_type` id (1–4) to a position.
    pub fn from_element_type(id: u32) -> Option<Self> {
        match id {
            1 => Some(Position::Goalkeeper),
            2 => Some(Position::Defender),
            3 => Some(Position::Midfielder),
            4 => Some(Position::Forward),
            _ => None,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Parse a position code (case-insensitive). Accepts both `GKP` and `GK`.
impl std::str::FromStr for Position {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "GKP" | "GK" | "GOALKEEPER" => Ok(Position::Goalkeeper),
            "DEF" | "DEFENDER" => Ok(Position::Defender),
            "MID" | "MIDFIELDER" => Ok(Position::Midfielder),
            "FWD" | "FORWARD" => Ok(Position::Forward),
            other => anyhow::bail!("Unknown position code: {other}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Per-position counts
// ---------------------------------------------------------------------------

/// A count per position. Used for squad quotas, formation floors and
/// ceilings, and for tallying an actual selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PositionCounts {
    pub goalkeepers: usize,
    pub defenders: usize,
    pub midfielders: usize,
    pub forwards: usize,
}

impl PositionCounts {
    pub const fn new(goalkeepers: usize, defenders: usize, midfielders: usize, forwards: usize) -> Self {
        Self {
            goalkeepers,
            defenders,
            midfielders,
            forwards,
        }
    }

    pub fn get(&self, position: Position) -> usize {
        match position {
            Position::Goalkeeper => self.goalkeepers,
            Position::Defender => self.defenders,
            Position::Midfielder => self.midfielders,
            Position::Forward => self.forwards,
        }
    }

    pub fn increment(&mut self, position: Position) {
        match position {
            Position::Goalkeeper => self.goalkeepers += 1,
            Position::Defender => self.defenders += 1,
            Position::Midfielder => self.midfielders += 1,
            Position::Forward => self.forwards += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.goalkeepers + self.defenders + self.midfielders + self.forwards
    }

    /// Tally positions over a set of players.
    pub fn tally<'a>(players: impl IntoIterator<Item = &'a Player>) -> Self {
        let mut counts = Self::default();
        for p in players {
            counts.increment(p.position);
        }
        counts
    }
}

impl fmt::Display for PositionCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "GKP {} / DEF {} / MID {} / FWD {}",
            self.goalkeepers, self.defenders, self.midfielders, self.forwards
        )
    }
}

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

/// Raw numeric signals from the data source. Anything that failed to parse
/// upstream is already 0.0 here.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PlayerSignals {
    /// Short-term form.
    pub form: f64,
    /// Influence/creativity/threat composite.
    pub ict_index: f64,
    pub points_per_game: f64,
    /// Source-provided expected points for the next round.
    pub expected_points_next: f64,
}

/// One eligible (or ineligible) player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: u32,
    pub name: String,
    pub club: u32,
    pub position: Position,
    /// Cost in tenths of a currency unit (`55` = £5.5m).
    pub cost: u32,
    pub available: bool,
    pub signals: PlayerSignals,
    /// Derived per run by the feature deriver, never taken from upstream.
    #[serde(default)]
    pub predicted_score: f64,
}

impl Player {
    /// An available player with zeroed signals and no score yet.
    pub fn new(id: u32, name: impl Into<String>, club: u32, position: Position, cost: u32) -> Self {
        Self {
            id,
            name: name.into(),
            club,
            position,
            cost,
            available: true,
            signals: PlayerSignals::default(),
            predicted_score: 0.0,
        }
    }

    pub fn with_signals(mut self, signals: PlayerSignals) -> Self {
        self.signals = signals;
        self
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.predicted_score = score;
        self
    }

    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    pub fn cost_decimal(&self) -> Decimal {
        cost_to_decimal(self.cost)
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {} ({}, club {}, £{}m, xP {:.2})",
            self.id,
            self.name,
            self.position,
            self.club,
            self.cost_decimal(),
            self.predicted_score
        )
    }
}

/// Convert tenths of a currency unit into a one-decimal amount.
pub fn cost_to_decimal(tenths: u32) -> Decimal {
    Decimal::new(i64::from(tenths), 1)
}

/// Render tenths as the familiar `£99.5m` label.
pub fn format_cost(tenths: u32) -> String {
    format!("£{}m", cost_to_decimal(tenths))
}

// ---------------------------------------------------------------------------
// Pool
// ---------------------------------------------------------------------------

/// Club id → club name lookup, built once per fetch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClubDirectory {
    names: BTreeMap<u32, String>,
}

impl ClubDirectory {
    /// Club name, or `"Unknown"` for ids the source never listed.
    pub fn name(&self, id: u32) -> &str {
        self.names.get(&id).map(String::as_str).unwrap_or("Unknown")
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl FromIterator<(u32, String)> for ClubDirectory {
    fn from_iter<T: IntoIterator<Item = (u32, String)>>(iter: T) -> Self {
        Self {
            names: iter.into_iter().collect(),
        }
    }
}

/// Everything the data collaborator hands to the selection pipeline.
#[derive(Debug, Clone, Default)]
pub struct PlayerPool {
    pub players: Vec<Player>,
    pub clubs: ClubDirectory,
    /// Current gameweek, 0 when the season has no current round.
    pub gameweek: u32,
}

impl PlayerPool {
    pub fn new(players: Vec<Player>, clubs: ClubDirectory, gameweek: u32) -> Self {
        Self {
            players,
            clubs,
            gameweek,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Squad & lineup
// ---------------------------------------------------------------------------

/// A selected squad. Built fresh per optimization call and never mutated;
/// the lineup only labels its players.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Squad {
    players: Vec<Player>,
}

impl Squad {
    /// Wrap a set of players. Composition is not checked here; the
    /// optimizer verifies its own output and the lineup selector rejects
    /// squads it cannot field.
    pub fn new(players: Vec<Player>) -> Self {
        Self { players }
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn get(&self, id: u32) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn ids(&self) -> BTreeSet<u32> {
        self.players.iter().map(|p| p.id).collect()
    }

    /// Total cost in tenths.
    pub fn total_cost(&self) -> u32 {
        self.players
            .iter()
            .fold(0u32, |acc, p| acc.saturating_add(p.cost))
    }

    pub fn total_score(&self) -> f64 {
        self.players.iter().map(|p| p.predicted_score).sum()
    }

    pub fn position_counts(&self) -> PositionCounts {
        PositionCounts::tally(&self.players)
    }

    pub fn club_counts(&self) -> BTreeMap<u32, usize> {
        let mut counts = BTreeMap::new();
        for p in &self.players {
            *counts.entry(p.club).or_insert(0) += 1;
        }
        counts
    }
}

/// Starting eleven and bench as player ids over a [`Squad`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Lineup {
    /// Ordered by position, then descending score.
    pub starters: Vec<u32>,
    /// Ordered by position, then descending score.
    pub bench: Vec<u32>,
    pub counts: PositionCounts,
}

impl Lineup {
    pub fn is_starter(&self, id: u32) -> bool {
        self.starters.contains(&id)
    }

    /// Formation label from outfield starter counts, e.g. `"3-5-2"`.
    pub fn formation(&self) -> String {
        format!(
            "{}-{}-{}",
            self.counts.defenders, self.counts.midfielders, self.counts.forwards
        )
    }

    /// Resolve starter ids against the squad.
    pub fn starters<'a>(&self, squad: &'a Squad) -> Vec<&'a Player> {
        self.starters.iter().filter_map(|id| squad.get(*id)).collect()
    }

    pub fn bench<'a>(&self, squad: &'a Squad) -> Vec<&'a Player> {
        self.bench.iter().filter_map(|id| squad.get(*id)).collect()
    }

    /// Total predicted score of the starting eleven.
    pub fn starting_score(&self, squad: &Squad) -> f64 {
        self.starters(squad).iter().map(|p| p.predicted_score).sum()
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Why no squad satisfies the hard constraints.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InfeasibleReason {
    #[error("squad size {squad_size} does not match quota total {quota_total}")]
    QuotaMismatch { squad_size: usize, quota_total: usize },

    #[error("need {needed} {position} players, pool has {available}")]
    ShortPosition {
        position: Position,
        needed: usize,
        available: usize,
    },

    #[error("club cap {club_cap} allows at most {reachable} {scope} players, need {needed}")]
    ClubCapacity {
        scope: String,
        club_cap: usize,
        reachable: usize,
        needed: usize,
    },

    #[error("cheapest squad costs {}, budget is {}", format_cost(*.minimum_cost), format_cost(*.budget))]
    BudgetTooLow { budget: u32, minimum_cost: u32 },

    #[error("no combination satisfies budget, quota and club cap together")]
    NoFeasibleCombination,
}

/// Domain errors for scoring, squad optimization and lineup selection.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SelectionError {
    #[error("No player data: the pool is empty after filtering")]
    EmptyPool,

    #[error("Infeasible squad: {0}")]
    Infeasible(InfeasibleReason),

    #[error("Solver error: {0}")]
    Solver(String),

    #[error("Degenerate lineup: assembled {starters} starters ({counts}), expected {expected}")]
    DegenerateLineup {
        starters: usize,
        expected: usize,
        counts: PositionCounts,
    },
}

impl SelectionError {
    pub fn is_infeasible(&self) -> bool {
        matches!(self, SelectionError::Infeasible(_))
    }

    /// A one-line hint for whoever triggered the run.
    pub fn suggestion(&self) -> &'static str {
        match self {
            SelectionError::EmptyPool => "Check the data source; no available players were returned",
            SelectionError::Infeasible(InfeasibleReason::QuotaMismatch { .. }) => {
                "Make the position quota add up to the squad size"
            }
            SelectionError::Infeasible(InfeasibleReason::BudgetTooLow { .. }) => {
                "Raise the budget"
            }
            SelectionError::Infeasible(_) => "Relax the budget, position quota or club cap",
            SelectionError::Solver(_) => "Retry; if it persists the solver backend is misbehaving",
            SelectionError::DegenerateLineup { .. } => {
                "The squad cannot field a legal formation; check its position counts"
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
