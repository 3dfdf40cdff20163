//! Engine core: geometry, broad phase, bodies, barriers and the event-driven integrator.

pub mod body;
pub mod boundary;
pub mod event;
pub mod geometry;
pub mod grid;
pub mod rng;
pub mod sim;
pub mod snapshot;
pub mod tracking;

pub use body::{Body, BodySpec, SubSphere};
pub use boundary::{BoundaryRegistry, Policy, XLine};
pub use event::{Event, EventKind};
pub use geometry::{Side, Vec2};
pub use grid::SpatialGrid;
pub use rng::{EngineRng, SeedMode};
pub use sim::{IntegratorState, RunStats, Simulation};
pub use snapshot::{SnapshotRow, SnapshotTuple};
pub use tracking::{EventTag, TrackingLog, TrackingRecord, TrackingTuple};
