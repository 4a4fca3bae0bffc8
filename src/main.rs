//! FPL squad optimizer entry point.
//!
//! Loads configuration, initialises structured logging, builds the
//! selection pipeline, then either serves the webhook or runs a single
//! selection and prints the squad as JSON.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use fpl_squad::config::AppConfig;
use fpl_squad::data::fpl::FplClient;
use fpl_squad::data::PlayerSource;
use fpl_squad::selection::features::FeatureDeriver;
use fpl_squad::selection::lineup::LineupSelector;
use fpl_squad::selection::squad::SquadOptimizer;
use fpl_squad::selection::SelectionPipeline;
use fpl_squad::server::{self, ServerState};
use fpl_squad::types::format_cost;

const DEFAULT_CONFIG: &str = "config.toml";

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    init_logging();

    let config_path = std::env::var("FPL_SQUAD_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG.to_string());
    let cfg = if Path::new(&config_path).exists() {
        AppConfig::load(&config_path)?
    } else {
        warn!(path = %config_path, "Config file not found, using defaults");
        AppConfig::default()
    };

    let weights = cfg.scoring.resolve();
    info!(
        name = %cfg.app.name,
        preset = ?cfg.scoring.preset,
        budget = %format_cost(cfg.squad.budget),
        club_cap = cfg.squad.club_cap,
        quota = %cfg.squad.quota,
        "Starting up"
    );

    let pipeline = Arc::new(SelectionPipeline::new(
        FeatureDeriver::new(weights),
        SquadOptimizer::new(cfg.squad),
        LineupSelector::new(cfg.lineup),
    ));
    let source: Arc<dyn PlayerSource> = Arc::new(FplClient::new(&cfg.data_source)?);

    if cfg.server.enabled {
        let state = Arc::new(ServerState::new(
            source,
            pipeline,
            Duration::from_secs(cfg.server.solve_timeout_secs),
        ));
        return server::serve(state, cfg.server.port).await;
    }

    run_once(source.as_ref(), &pipeline).await
}

/// Fetch, select, print.
async fn run_once(source: &dyn PlayerSource, pipeline: &SelectionPipeline) -> Result<()> {
    let pool = source
        .fetch_pool()
        .await
        .with_context(|| format!("Could not retrieve player data from {}", source.name()))?;

    match pipeline.run(&pool) {
        Ok(rec) => {
            let response = rec.to_response(&pool.clubs);
            for p in rec.lineup.starters(&rec.squad) {
                info!(player = %p, club = pool.clubs.name(p.club), "Starter");
            }
            for p in rec.lineup.bench(&rec.squad) {
                info!(player = %p, club = pool.clubs.name(p.club), "Bench");
            }
            println!(
                "{}",
                serde_json::to_string_pretty(&response).context("Failed to serialise squad")?
            );
            Ok(())
        }
        Err(e) => {
            error!(error = %e, suggestion = e.suggestion(), "Selection failed");
            eprintln!("{e}");
            eprintln!("Suggestion: {}", e.suggestion());
            std::process::exit(if e.is_infeasible() { 2 } else { 1 });
        }
    }
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("fpl_squad=info"));

    let json_logging = std::env::var("FPL_SQUAD_LOG_JSON").is_ok();

    // Logs go to stderr so stdout carries only the squad JSON.
    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    }
}
