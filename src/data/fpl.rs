//! Fantasy Premier League bootstrap feed.
//!
//! One request to `/bootstrap-static/` returns every player (`elements`),
//! club (`teams`), position (`element_types`) and round (`events`).
//!
//! API: `https://fantasy.premierleague.com/api/bootstrap-static/`
//! Auth: none.
//!
//! Several numeric fields (`form`, `ict_index`, `ep_next`, ...) arrive as
//! strings and may be null; they are parsed leniently and anything that
//! does not parse becomes 0.0.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::PlayerSource;
use crate::config::DataSourceConfig;
use crate::types::{ClubDirectory, Player, PlayerPool, PlayerSignals, Position};

const SOURCE_NAME: &str = "fpl";

/// Status code the API uses for fully available players.
const STATUS_AVAILABLE: &str = "a";

// ---------------------------------------------------------------------------
// API response types (bootstrap-static JSON → Rust)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct Bootstrap {
    #[serde(default)]
    elements: Vec<Element>,
    #[serde(default)]
    teams: Vec<Team>,
    #[serde(default)]
    element_types: Vec<ElementType>,
    #[serde(default)]
    events: Vec<Event>,
}

#[derive(Debug, Deserialize)]
struct Element {
    id: u32,
    #[serde(default)]
    web_name: String,
    team: u32,
    element_type: u32,
    /// Tenths of £m.
    #[serde(default)]
    now_cost: u32,
    #[serde(default)]
    status: String,
    #[serde(default)]
    minutes: u32,
    #[serde(default, deserialize_with = "lenient_f64")]
    form: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    ict_index: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    points_per_game: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    ep_next: f64,
}

#[derive(Debug, Deserialize)]
struct Team {
    id: u32,
    name: String,
}

#[derive(Debug, Deserialize)]
struct ElementType {
    id: u32,
    #[serde(default)]
    singular_name_short: String,
}

#[derive(Debug, Deserialize)]
struct Event {
    id: u32,
    #[serde(default)]
    is_current: bool,
}

/// Accept a number, a numeric string, or null. Anything else is 0.0.
fn lenient_f64<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let parsed = match &value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(parsed.filter(|v| v.is_finite()).unwrap_or(0.0))
}

impl Bootstrap {
    /// Build the pool: lookup tables first, then one record per element.
    pub(crate) fn into_pool(self) -> PlayerPool {
        let clubs: ClubDirectory = self.teams.into_iter().map(|t| (t.id, t.name)).collect();

        let positions: HashMap<u32, Position> = self
            .element_types
            .iter()
            .filter_map(|et| {
                let pos = et
                    .singular_name_short
                    .parse::<Position>()
                    .ok()
                    .or_else(|| Position::from_element_type(et.id))?;
                Some((et.id, pos))
            })
            .collect();

        let gameweek = self
            .events
            .iter()
            .find(|e| e.is_current)
            .map(|e| e.id)
            .unwrap_or(0);

        let mut skipped = 0;
        let players: Vec<Player> = self
            .elements
            .into_iter()
            .filter_map(|el| {
                let position = positions
                    .get(&el.element_type)
                    .copied()
                    .or_else(|| Position::from_element_type(el.element_type));
                let Some(position) = position else {
                    skipped += 1;
                    debug!(player_id = el.id, element_type = el.element_type, "Unknown position, skipped");
                    return None;
                };
                let available = el.status == STATUS_AVAILABLE && el.minutes > 0;
                Some(Player {
                    id: el.id,
                    name: el.web_name,
                    club: el.team,
                    position,
                    cost: el.now_cost,
                    available,
                    signals: PlayerSignals {
                        form: el.form,
                        ict_index: el.ict_index,
                        points_per_game: el.points_per_game,
                        expected_points_next: el.ep_next,
                    },
                    predicted_score: 0.0,
                })
            })
            .collect();

        if skipped > 0 {
            warn!(skipped, "Players with unknown positions dropped");
        }

        PlayerPool::new(players, clubs, gameweek)
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Live FPL client.
pub struct FplClient {
    http: Client,
    base_url: String,
}

impl FplClient {
    pub fn new(config: &DataSourceConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent("fpl-squad/0.1.0")
            .build()
            .context("Failed to build FPL HTTP client")?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn bootstrap_url(&self) -> String {
        format!("{}/bootstrap-static/", self.base_url)
    }
}

#[async_trait]
impl PlayerSource for FplClient {
    async fn fetch_pool(&self) -> Result<PlayerPool> {
        let url = self.bootstrap_url();
        debug!(url = %url, "Fetching FPL bootstrap");

        let bootstrap: Bootstrap = self
            .http
            .get(&url)
            .send()
            .await
            .context("FPL bootstrap request failed")?
            .error_for_status()
            .context("FPL bootstrap returned an error status")?
            .json()
            .await
            .context("Failed to parse FPL bootstrap JSON")?;

        let pool = bootstrap.into_pool();
        if pool.clubs.is_empty() {
            warn!("Bootstrap listed no clubs; club names will show as Unknown");
        }
        info!(
            players = pool.players.len(),
            available = pool.players.iter().filter(|p| p.available).count(),
            clubs = pool.clubs.len(),
            gameweek = pool.gameweek,
            "FPL pool fetched"
        );
        Ok(pool)
    }

    fn name(&self) -> &'static str {
        SOURCE_NAME
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
