//! Player data sources.
//!
//! Defines the `PlayerSource` trait and the live FPL implementation.

pub mod fpl;

use anyhow::Result;
use async_trait::async_trait;

use crate::types::PlayerPool;

/// Abstraction over wherever the raw player pool comes from.
///
/// Implementations set each player's `available` flag; filtering on it is
/// left to the feature deriver.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PlayerSource: Send + Sync {
    /// Fetch the full player pool with club names and the current gameweek.
    async fn fetch_pool(&self) -> Result<PlayerPool>;

    /// Source name for logging.
    fn name(&self) -> &'static str;
}
