//! Configuration loading from TOML.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs. Every
//! section has defaults matching the standard FPL rules, so a partial file
//! (or an empty one) still yields a usable configuration.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;

use crate::selection::features::{ScorePreset, ScoreWeights};
use crate::selection::lineup::LineupConfig;
use crate::selection::squad::SquadConfig;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub data_source: DataSourceConfig,
    pub scoring: ScoringConfig,
    pub squad: SquadConfig,
    pub lineup: LineupConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AppSection {
    pub name: String,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: "fpl-squad".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DataSourceConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for DataSourceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://fantasy.premierleague.com/api".to_string(),
            timeout_secs: 20,
        }
    }
}

/// Which score formula to use. Explicit `weights` override the preset.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ScoringConfig {
    pub preset: ScorePreset,
    pub weights: Option<ScoreWeights>,
}

impl ScoringConfig {
    pub fn resolve(&self) -> ScoreWeights {
        self.weights.unwrap_or_else(|| self.preset.into())
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    /// Serve the webhook; otherwise run once and exit.
    pub enabled: bool,
    pub port: u16,
    /// Upper bound on one selection run, enforced by the server.
    pub solve_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: 5001,
            solve_timeout_secs: 10,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::parse(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    /// Parse configuration from TOML text.
    pub fn parse(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        Ok(config)
    }
}
