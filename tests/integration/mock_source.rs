//! Mock player source for integration testing.
//!
//! A deterministic `PlayerSource` that serves a fixed pool from memory,
//! counts fetches, and can be told to fail.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use fpl_squad::data::PlayerSource;
use fpl_squad::types::*;

pub struct MockSource {
    pool: PlayerPool,
    fetches: Arc<Mutex<usize>>,
    /// If set, every fetch returns this error.
    force_error: Arc<Mutex<Option<String>>>,
}

impl MockSource {
    pub fn new(pool: PlayerPool) -> Self {
        Self {
            pool,
            fetches: Arc::new(Mutex::new(0)),
            force_error: Arc::new(Mutex::new(None)),
        }
    }

    /// A realistic-looking 40-player pool over 10 clubs.
    pub fn with_default_pool() -> Self {
        Self::new(default_pool())
    }

    pub fn set_error(&self, msg: &str) {
        *self.force_error.lock().unwrap() = Some(msg.to_string());
    }

    pub fn clear_error(&self) {
        *self.force_error.lock().unwrap() = None;
    }

    pub fn fetch_count(&self) -> usize {
        *self.fetches.lock().unwrap()
    }
}

#[async_trait]
impl PlayerSource for MockSource {
    async fn fetch_pool(&self) -> Result<PlayerPool> {
        *self.fetches.lock().unwrap() += 1;
        if let Some(msg) = self.force_error.lock().unwrap().clone() {
            return Err(anyhow!(msg));
        }
        Ok(self.pool.clone())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// 4 GK, 14 DEF, 14 MID, 8 FWD; club = index % 10. Every 7th player is
/// flagged unavailable.
pub fn default_pool() -> PlayerPool {
    let mut players = Vec::new();
    let mut id = 100;
    for (pos, n, base_cost) in [
        (Position::Goalkeeper, 4, 40),
        (Position::Defender, 14, 40),
        (Position::Midfielder, 14, 45),
        (Position::Forward, 8, 55),
    ] {
        for i in 0..n {
            let idx = players.len() as u32;
            let signals = PlayerSignals {
                form: 1.0 + (i % 5) as f64 * 1.5,
                ict_index: 10.0 + (i * 7 % 13) as f64 * 6.0,
                points_per_game: 2.0 + (i % 4) as f64,
                expected_points_next: 1.5 + (i % 6) as f64 * 0.8,
            };
            let mut p = Player::new(id, format!("Player {id}"), idx % 10 + 1, pos, base_cost + (i as u32 % 6) * 8)
                .with_signals(signals);
            if idx % 7 == 6 {
                p = p.unavailable();
            }
            players.push(p);
            id += 1;
        }
    }
    let clubs = (1..=10).map(|c| (c, format!("Club {c}"))).collect();
    PlayerPool::new(players, clubs, 12)
}
