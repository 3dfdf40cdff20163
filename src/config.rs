//! Engine construction parameters.

use serde::{Deserialize, Serialize};

use crate::core::rng::SeedMode;
use crate::error::{Error, Result};

/// Construction-time settings of a [`Simulation`](crate::core::Simulation).
///
/// `grid_fineness` is the number of broad-phase cells across the unit
/// width: cells are squares of side `1 / grid_fineness`. Bodies whose
/// diameter exceeds a cell widen the searched neighbourhood, so a fineness
/// around `1 / (2 · typical radius)` keeps queries near the 3×3 block.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    #[serde(default = "default_grid_fineness")]
    pub grid_fineness: u32,
    #[serde(default)]
    pub seed: SeedMode,
}

fn default_grid_fineness() -> u32 {
    10
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            grid_fineness: default_grid_fineness(),
            seed: SeedMode::default(),
        }
    }
}

impl EngineConfig {
    /// Settings with the given fineness and seed; checked by [`validate`](Self::validate).
    pub fn new(grid_fineness: u32, seed: SeedMode) -> Self {
        Self {
            grid_fineness,
            seed,
        }
    }

    /// Errors:
    /// - `Error::InvalidParam` if `grid_fineness` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.grid_fineness == 0 {
            return Err(Error::InvalidParam("grid_fineness must be >= 1".into()));
        }
        Ok(())
    }

    /// Width of one grid cell.
    pub fn cell_width(&self) -> f64 {
        1.0 / f64::from(self.grid_fineness)
    }
}
