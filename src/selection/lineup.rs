//! Starting-eleven selection.
//!
//! Greedy: seed each position's formation floor with its best players,
//! then walk the rest in descending score order and take anyone whose
//! position still has room under its ceiling. A player skipped for a full
//! position is not reconsidered.
//!
//! Known limitation: this is not globally optimal. An early seed can fill
//! a ceiling and force a higher-scoring player of that position onto the
//! bench where an exact assignment would have made a different trade.

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::types::{Lineup, Player, Position, PositionCounts, SelectionError, Squad};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Formation rules for the starting eleven.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct LineupConfig {
    pub starters: usize,
    /// Minimum starters per position.
    pub floor: PositionCounts,
    /// Maximum starters per position.
    pub ceiling: PositionCounts,
}

impl Default for LineupConfig {
    fn default() -> Self {
        Self {
            starters: 11,
            floor: PositionCounts::new(1, 3, 2, 1),
            ceiling: PositionCounts::new(1, 5, 5, 3),
        }
    }
}

// ---------------------------------------------------------------------------
// Selector
// ---------------------------------------------------------------------------

/// Where the greedy pass is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Seeding,
    Filling,
    Done,
}

pub struct LineupSelector {
    config: LineupConfig,
}

impl LineupSelector {
    pub fn new(config: LineupConfig) -> Self {
        Self { config }
    }

    /// Split a squad into starters and bench.
    ///
    /// Errors with `DegenerateLineup` if the pass cannot field a full,
    /// formation-legal eleven; a short lineup is never returned.
    pub fn select_lineup(&self, squad: &Squad) -> Result<Lineup, SelectionError> {
        let cfg = &self.config;
        if squad.is_empty() {
            return Err(SelectionError::DegenerateLineup {
                starters: 0,
                expected: cfg.starters,
                counts: PositionCounts::default(),
            });
        }
        let players = squad.players();

        // Stable sort keeps input order among equal scores.
        let mut order: Vec<usize> = (0..players.len()).collect();
        order.sort_by(|&a, &b| {
            players[b]
                .predicted_score
                .total_cmp(&players[a].predicted_score)
        });

        let mut taken = vec![false; players.len()];
        let mut starters: Vec<usize> = Vec::with_capacity(cfg.starters);
        let mut counts = PositionCounts::default();
        let mut phase = Phase::Seeding;
        // Cursor into `order` for the filling phase. Each step advances it,
        // so the pass ends after at most `players.len()` steps.
        let mut cursor = 0;

        while phase != Phase::Done {
            match phase {
                Phase::Seeding => {
                    for pos in Position::ALL {
                        let floor = cfg.floor.get(pos).min(cfg.ceiling.get(pos));
                        for &i in order.iter().filter(|&&i| players[i].position == pos).take(floor) {
                            taken[i] = true;
                            starters.push(i);
                            counts.increment(pos);
                        }
                    }
                    debug!(seeded = starters.len(), counts = %counts, "Lineup floors seeded");
                    phase = Phase::Filling;
                }
                Phase::Filling => {
                    if starters.len() >= cfg.starters || cursor >= order.len() {
                        phase = Phase::Done;
                        continue;
                    }
                    let i = order[cursor];
                    cursor += 1;
                    if taken[i] {
                        continue;
                    }
                    let pos = players[i].position;
                    if counts.get(pos) < cfg.ceiling.get(pos) {
                        taken[i] = true;
                        starters.push(i);
                        counts.increment(pos);
                    } else {
                        debug!(player_id = players[i].id, position = %pos, "Position full, skipped");
                    }
                }
                Phase::Done => {}
            }
        }

        let within_formation = Position::ALL
            .iter()
            .all(|&pos| counts.get(pos) >= cfg.floor.get(pos) && counts.get(pos) <= cfg.ceiling.get(pos));
        if starters.len() != cfg.starters || !within_formation {
            warn!(
                starters = starters.len(),
                expected = cfg.starters,
                counts = %counts,
                "Could not assemble a legal starting eleven"
            );
            return Err(SelectionError::DegenerateLineup {
                starters: starters.len(),
                expected: cfg.starters,
                counts,
            });
        }

        let bench: Vec<usize> = (0..players.len()).filter(|&i| !taken[i]).collect();

        let lineup = Lineup {
            starters: presentation_order(players, starters),
            bench: presentation_order(players, bench),
            counts,
        };

        info!(
            formation = %lineup.formation(),
            starting_score = format!("{:.2}", lineup.starting_score(squad)),
            bench = lineup.bench.len(),
            "Lineup selected"
        );

        Ok(lineup)
    }
}

/// Position first, then descending score; returns player ids.
fn presentation_order(players: &[Player], mut indices: Vec<usize>) -> Vec<u32> {
    indices.sort_by(|&a, &b| {
        players[a].position.cmp(&players[b].position).then(
            players[b]
                .predicted_score
                .total_cmp(&players[a].predicted_score),
        )
    });
    indices.into_iter().map(|i| players[i].id).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
