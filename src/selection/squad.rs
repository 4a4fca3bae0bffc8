//! Squad optimizer.
//!
//! Picks the squad that maximizes total predicted score under a budget,
//! an exact per-position quota and a per-club cap. Formulated as a binary
//! ILP (one 0/1 variable per player) and solved exactly with `good_lp`
//! on the pure-Rust `microlp` backend.
//!
//! Cheap necessary conditions are checked before the solver runs so the
//! common infeasible inputs come back with a specific reason instead of a
//! generic solver verdict.

use good_lp::{
    constraint, microlp, variable, Expression, ProblemVariables, ResolutionError, Solution,
    SolverModel, Variable,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::types::{
    format_cost, InfeasibleReason, Player, Position, PositionCounts, SelectionError, Squad,
};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Squad composition rules.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct SquadConfig {
    /// Maximum total cost in tenths, inclusive.
    pub budget: u32,
    /// Total players to select. Must equal the quota total.
    pub squad_size: usize,
    /// Maximum players from any one club.
    pub club_cap: usize,
    /// Exact number of players required per position.
    pub quota: PositionCounts,
}

impl Default for SquadConfig {
    fn default() -> Self {
        Self {
            budget: 1000,     // £100.0m
            squad_size: 15,
            club_cap: 3,
            quota: PositionCounts::new(2, 5, 5, 3),
        }
    }
}

// ---------------------------------------------------------------------------
// Optimizer
// ---------------------------------------------------------------------------

pub struct SquadOptimizer {
    config: SquadConfig,
}

impl SquadOptimizer {
    pub fn new(config: SquadConfig) -> Self {
        Self { config }
    }

    /// Select the highest-scoring feasible squad from a scored pool.
    ///
    /// Returns `SelectionError::Infeasible` when no combination satisfies
    /// every constraint; a partial squad is never returned.
    ///
    /// Variables are created in ascending player-id order, so for a given
    /// pool the solver explores the same problem and returns the same
    /// optimum on every run, including among equal-score ties.
    pub fn optimize(&self, players: &[Player]) -> Result<Squad, SelectionError> {
        let mut candidates: Vec<&Player> = players.iter().collect();
        candidates.sort_by_key(|p| p.id);
        let before = candidates.len();
        candidates.dedup_by_key(|p| p.id);
        if candidates.len() != before {
            warn!(
                duplicates = before - candidates.len(),
                "Duplicate player ids in pool; keeping first occurrence"
            );
        }

        self.precheck(&candidates).map_err(|reason| {
            warn!(reason = %reason, "Squad infeasible before solving");
            SelectionError::Infeasible(reason)
        })?;

        let started = Instant::now();
        let selected = self.solve(&candidates)?;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let squad = Squad::new(selected.into_iter().cloned().collect());
        self.verify(&squad)?;

        info!(
            candidates = candidates.len(),
            selected = squad.len(),
            total_cost = %format_cost(squad.total_cost()),
            total_score = format!("{:.2}", squad.total_score()),
            elapsed_ms,
            "Squad optimized"
        );

        Ok(squad)
    }

    /// Necessary conditions that can be checked without solving.
    fn precheck(&self, candidates: &[&Player]) -> Result<(), InfeasibleReason> {
        let cfg = &self.config;

        if cfg.quota.total() != cfg.squad_size {
            return Err(InfeasibleReason::QuotaMismatch {
                squad_size: cfg.squad_size,
                quota_total: cfg.quota.total(),
            });
        }

        let available = PositionCounts::tally(candidates.iter().copied());
        for pos in Position::ALL {
            if available.get(pos) < cfg.quota.get(pos) {
                return Err(InfeasibleReason::ShortPosition {
                    position: pos,
                    needed: cfg.quota.get(pos),
                    available: available.get(pos),
                });
            }
        }

        // Players per (club, position) and per club.
        let mut by_club: BTreeMap<u32, PositionCounts> = BTreeMap::new();
        for p in candidates {
            by_club.entry(p.club).or_default().increment(p.position);
        }

        for pos in Position::ALL {
            let reachable: usize = by_club
                .values()
                .map(|c| c.get(pos).min(cfg.club_cap))
                .sum();
            if reachable < cfg.quota.get(pos) {
                return Err(InfeasibleReason::ClubCapacity {
                    scope: pos.code().to_string(),
                    club_cap: cfg.club_cap,
                    reachable,
                    needed: cfg.quota.get(pos),
                });
            }
        }

        let reachable: usize = by_club
            .values()
            .map(|c| c.total().min(cfg.club_cap))
            .sum();
        if reachable < cfg.squad_size {
            return Err(InfeasibleReason::ClubCapacity {
                scope: "squad".to_string(),
                club_cap: cfg.club_cap,
                reachable,
                needed: cfg.squad_size,
            });
        }

        // Cheapest quota per position, ignoring the club cap: a lower bound
        // on any feasible squad's cost.
        let minimum_cost: u32 = Position::ALL
            .iter()
            .map(|&pos| {
                let mut costs: Vec<u32> = candidates
                    .iter()
                    .filter(|p| p.position == pos)
                    .map(|p| p.cost)
                    .collect();
                costs.sort_unstable();
                costs
                    .iter()
                    .take(cfg.quota.get(pos))
                    .fold(0u32, |acc, &c| acc.saturating_add(c))
            })
            .fold(0u32, |acc, c| acc.saturating_add(c));
        if minimum_cost > cfg.budget {
            return Err(InfeasibleReason::BudgetTooLow {
                budget: cfg.budget,
                minimum_cost,
            });
        }

        Ok(())
    }

    /// Build and solve the binary program. `candidates` must be id-sorted.
    fn solve<'a>(&self, candidates: &[&'a Player]) -> Result<Vec<&'a Player>, SelectionError> {
        let cfg = &self.config;

        let mut problem = ProblemVariables::new();
        let picks: Vec<Variable> = candidates
            .iter()
            .map(|_| problem.add(variable().binary()))
            .collect();

        let objective: Expression = candidates
            .iter()
            .zip(&picks)
            .map(|(p, &x)| p.predicted_score * x)
            .sum();

        let mut model = problem.maximise(objective).using(microlp);

        // 1. Budget.
        let cost: Expression = candidates
            .iter()
            .zip(&picks)
            .map(|(p, &x)| f64::from(p.cost) * x)
            .sum();
        model = model.with(constraint!(cost <= f64::from(cfg.budget)));

        // 2. Squad size.
        let selected: Expression = picks.iter().map(|&x| Expression::from(x)).sum();
        model = model.with(constraint!(selected == cfg.squad_size as f64));

        // 3. Exact quota per position.
        for pos in Position::ALL {
            let in_position: Expression = candidates
                .iter()
                .zip(&picks)
                .filter(|(p, _)| p.position == pos)
                .map(|(_, &x)| Expression::from(x))
                .sum();
            model = model.with(constraint!(in_position == cfg.quota.get(pos) as f64));
        }

        // 4. Club cap, for every club present in the pool.
        let mut by_club: BTreeMap<u32, Vec<Variable>> = BTreeMap::new();
        for (p, &x) in candidates.iter().zip(&picks) {
            by_club.entry(p.club).or_default().push(x);
        }
        for vars in by_club.values() {
            let from_club: Expression = vars.iter().map(|&x| Expression::from(x)).sum();
            model = model.with(constraint!(from_club <= cfg.club_cap as f64));
        }

        debug!(
            variables = picks.len(),
            clubs = by_club.len(),
            budget = cfg.budget,
            "Solving squad ILP"
        );

        let solution = match model.solve() {
            Ok(solution) => solution,
            Err(ResolutionError::Infeasible) => {
                warn!("Solver found no feasible squad");
                return Err(SelectionError::Infeasible(
                    InfeasibleReason::NoFeasibleCombination,
                ));
            }
            Err(e) => return Err(SelectionError::Solver(e.to_string())),
        };

        Ok(candidates
            .iter()
            .zip(&picks)
            .filter(|&(_, &x)| solution.value(x) > 0.5)
            .map(|(p, _)| *p)
            .collect())
    }

    /// Fail closed if the solver output breaks any hard constraint.
    fn verify(&self, squad: &Squad) -> Result<(), SelectionError> {
        let cfg = &self.config;

        if squad.len() != cfg.squad_size {
            return Err(SelectionError::Solver(format!(
                "solver selected {} players, expected {}",
                squad.len(),
                cfg.squad_size
            )));
        }
        if squad.position_counts() != cfg.quota {
            return Err(SelectionError::Solver(format!(
                "solver selection {} breaks quota {}",
                squad.position_counts(),
                cfg.quota
            )));
        }
        if squad.total_cost() > cfg.budget {
            return Err(SelectionError::Solver(format!(
                "solver selection costs {}, over budget {}",
                format_cost(squad.total_cost()),
                format_cost(cfg.budget)
            )));
        }
        if let Some((club, n)) = squad
            .club_counts()
            .into_iter()
            .find(|(_, n)| *n > cfg.club_cap)
        {
            return Err(SelectionError::Solver(format!(
                "solver selected {n} players from club {club}, cap is {}",
                cfg.club_cap
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
