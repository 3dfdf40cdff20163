//! Event-driven 2D hard-body collision engine.
//!
//! Bodies are rigid clusters of circles moving freely in the plane; vertical
//! barriers at fixed x positions in the unit width reflect them and may
//! reset, redraw or scale their energy. [`Simulation::run`] advances the
//! clock by an interval, resolving every contact exactly at its time of
//! impact, in a deterministic order for a fixed seed.
//!
//! ```
//! use nocs::{Simulation, SeedMode};
//!
//! let mut sim = Simulation::new(10, SeedMode::Fixed(42))?;
//! sim.add_basic_xline(0.8)?;
//! sim.add_sphere(0.2, 0.5, 0.05, 1.0, 1.0, 0.0, true)?;
//! sim.run(0.65)?;
//! assert_eq!(sim.snapshot()[0].vx, -1.0);
//! # Ok::<(), nocs::error::Error>(())
//! ```

pub mod config;
pub mod core;
pub mod error;

pub use crate::config::EngineConfig;
pub use crate::core::{
    Body, BodySpec, EventTag, IntegratorState, Policy, RunStats, SeedMode, Simulation, SnapshotRow,
    SubSphere, TrackingRecord,
};
pub use crate::error::{Error, Result};
