//! Optimizer and lineup properties over generated pools, plus the
//! 21-player reference scenario.

use std::collections::BTreeSet;

use fpl_squad::selection::features::{FeatureDeriver, ScoreWeights};
use fpl_squad::selection::lineup::{LineupConfig, LineupSelector};
use fpl_squad::selection::squad::{SquadConfig, SquadOptimizer};
use fpl_squad::types::*;

/// Small deterministic generator so pools are varied but reproducible.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    fn range(&mut self, lo: u32, hi: u32) -> u32 {
        lo + (self.next() % u64::from(hi - lo + 1)) as u32
    }

    fn score(&mut self) -> f64 {
        (self.next() % 1000) as f64 / 100.0
    }
}

/// 4 GK / 10 DEF / 10 MID / 7 FWD over 10 clubs. The first quota-many
/// players of each position sit at the position's minimum cost, so a
/// 670-cost squad within the club cap always exists.
fn generated_pool(seed: u64) -> Vec<Player> {
    let mut rng = Lcg(seed);
    let mut players = Vec::new();
    let quota = SquadConfig::default().quota;
    for (pos, n, lo, hi) in [
        (Position::Goalkeeper, 4, 40, 55),
        (Position::Defender, 10, 40, 60),
        (Position::Midfielder, 10, 45, 90),
        (Position::Forward, 7, 55, 110),
    ] {
        for i in 0..n {
            let idx = players.len() as u32;
            let cost = if i < quota.get(pos) { lo } else { rng.range(lo, hi) };
            let score = rng.score();
            players.push(Player::new(idx + 1, format!("G{idx}"), idx % 10, pos, cost).with_score(score));
        }
    }
    players
}

fn assert_valid_squad(squad: &Squad, cfg: &SquadConfig) {
    assert_eq!(squad.len(), cfg.squad_size);
    assert_eq!(squad.ids().len(), cfg.squad_size, "duplicate players in squad");
    assert_eq!(squad.position_counts(), cfg.quota);
    assert!(squad.total_cost() <= cfg.budget);
    assert!(squad.club_counts().values().all(|&n| n <= cfg.club_cap));
}

#[test]
fn test_optimize_satisfies_all_constraints() {
    let cfg = SquadConfig::default();
    let opt = SquadOptimizer::new(cfg);
    for seed in 1..=8 {
        let squad = opt.optimize(&generated_pool(seed)).unwrap();
        assert_valid_squad(&squad, &cfg);
    }
}

#[test]
fn test_optimize_is_deterministic() {
    let opt = SquadOptimizer::new(SquadConfig::default());
    for seed in [3, 11, 42] {
        let pool = generated_pool(seed);
        let first = opt.optimize(&pool).unwrap().ids();
        for _ in 0..3 {
            assert_eq!(opt.optimize(&pool).unwrap().ids(), first);
        }
    }
}

#[test]
fn test_larger_budget_never_scores_lower() {
    for seed in [5, 17] {
        let pool = generated_pool(seed);
        let mut previous = 0.0;
        for budget in [670, 720, 800, 900, 1000, 1200] {
            let cfg = SquadConfig {
                budget,
                ..Default::default()
            };
            let score = SquadOptimizer::new(cfg).optimize(&pool).unwrap().total_score();
            assert!(
                score + 1e-6 >= previous,
                "budget {budget}: {score} < {previous}"
            );
            previous = score;
        }
    }
}

#[test]
fn test_fewer_than_two_goalkeepers_is_infeasible() {
    let mut pool = generated_pool(9);
    let mut kept_gk = false;
    pool.retain(|p| {
        if p.position != Position::Goalkeeper {
            return true;
        }
        let keep = !kept_gk;
        kept_gk = true;
        keep
    });

    let err = SquadOptimizer::new(SquadConfig::default())
        .optimize(&pool)
        .unwrap_err();
    assert!(err.is_infeasible());
    assert!(matches!(
        err,
        SelectionError::Infeasible(InfeasibleReason::ShortPosition {
            position: Position::Goalkeeper,
            ..
        })
    ));
}

#[test]
fn test_lineup_partitions_every_optimized_squad() {
    let opt = SquadOptimizer::new(SquadConfig::default());
    let selector = LineupSelector::new(LineupConfig::default());

    for seed in 1..=8 {
        let squad = opt.optimize(&generated_pool(seed)).unwrap();
        let lineup = selector.select_lineup(&squad).unwrap();

        assert_eq!(lineup.starters.len(), 11);
        assert_eq!(lineup.bench.len(), 4);

        let starters: BTreeSet<u32> = lineup.starters.iter().copied().collect();
        let bench: BTreeSet<u32> = lineup.bench.iter().copied().collect();
        assert!(starters.is_disjoint(&bench));
        let all: BTreeSet<u32> = starters.union(&bench).copied().collect();
        assert_eq!(all, squad.ids());

        let c = lineup.counts;
        assert_eq!(c.goalkeepers, 1);
        assert!((3..=5).contains(&c.defenders));
        assert!((2..=5).contains(&c.midfielders));
        assert!((1..=3).contains(&c.forwards));
        assert_eq!(c, PositionCounts::tally(lineup.starters(&squad)));
    }
}

// ---------------------------------------------------------------------------
// Reference scenario
// ---------------------------------------------------------------------------

/// 4 GK (40–55), 8 DEF (40–60), 6 MID (45–90), 3 FWD (55–140); no club
/// holds more than three players.
fn scenario_pool() -> Vec<Player> {
    let spec: [(Position, &[(u32, f64)]); 4] = [
        (Position::Goalkeeper, &[(40, 3.1), (45, 3.5), (50, 4.0), (55, 4.4)]),
        (
            Position::Defender,
            &[(40, 2.0), (42, 2.4), (45, 3.0), (48, 3.3), (50, 3.9), (55, 4.2), (58, 4.8), (60, 5.1)],
        ),
        (
            Position::Midfielder,
            &[(45, 3.0), (55, 4.1), (62, 4.9), (70, 5.6), (80, 6.8), (90, 8.0)],
        ),
        (Position::Forward, &[(55, 3.8), (95, 6.9), (140, 9.5)]),
    ];

    let mut players = Vec::new();
    for (pos, entries) in spec {
        for &(cost, score) in entries {
            let id = players.len() as u32 + 1;
            // 21 players over 7 clubs, three each.
            players.push(Player::new(id, format!("S{id}"), (id - 1) % 7 + 1, pos, cost).with_score(score));
        }
    }
    players
}

#[test]
fn test_scenario_feasible_at_full_budget() {
    let cfg = SquadConfig::default();
    let pool = scenario_pool();
    let clubs = {
        let squad = Squad::new(pool.clone());
        squad.club_counts()
    };
    assert!(clubs.values().all(|&n| n <= 3));

    let squad = SquadOptimizer::new(cfg).optimize(&pool).unwrap();
    assert_valid_squad(&squad, &cfg);
    // All three forwards are required by the quota.
    assert!(squad
        .players()
        .iter()
        .filter(|p| p.position == Position::Forward)
        .count()
        == 3);
}

#[test]
fn test_scenario_infeasible_at_thirty_million() {
    let cfg = SquadConfig {
        budget: 300,
        ..Default::default()
    };
    let err = SquadOptimizer::new(cfg).optimize(&scenario_pool()).unwrap_err();
    assert!(err.is_infeasible());
    match err {
        SelectionError::Infeasible(InfeasibleReason::BudgetTooLow { budget, minimum_cost }) => {
            assert_eq!(budget, 300);
            assert!(minimum_cost > 300);
        }
        other => panic!("expected budget infeasibility, got {other:?}"),
    }
}

#[test]
fn test_derive_twice_gives_identical_scores() {
    let deriver = FeatureDeriver::new(ScoreWeights::blended());
    let pool: Vec<Player> = generated_pool(21)
        .into_iter()
        .enumerate()
        .map(|(i, p)| {
            p.with_signals(PlayerSignals {
                form: (i % 7) as f64,
                ict_index: (i * 13 % 50) as f64,
                points_per_game: (i % 5) as f64,
                expected_points_next: (i % 9) as f64 * 0.5,
            })
        })
        .collect();

    let a = deriver.derive_scores(&pool);
    let b = deriver.derive_scores(&pool);
    let scores_a: Vec<f64> = a.iter().map(|p| p.predicted_score).collect();
    let scores_b: Vec<f64> = b.iter().map(|p| p.predicted_score).collect();
    assert_eq!(scores_a, scores_b);
    assert!(scores_a.iter().all(|&s| s >= 0.0));
}
