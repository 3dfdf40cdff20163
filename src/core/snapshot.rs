//! Checkpoint rows: one (time, mass, radius, energy, x, y, vx, vy) per body.
//!
//! Composite bodies report their first sub-sphere's mass and radius, so only
//! single-sphere bodies survive an export/import cycle unchanged. Tracking
//! flags are not part of a row.

use serde::{Deserialize, Serialize};

use crate::core::body::BodySpec;
use crate::error::{Error, Result};

/// (time, mass, radius, energy, x, y, vx, vy)
pub type SnapshotTuple = (f64, f64, f64, f64, f64, f64, f64, f64);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRow {
    pub time: f64,
    pub mass: f64,
    pub radius: f64,
    pub energy: f64,
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
}

impl SnapshotRow {
    /// Fields in row order.
    pub fn to_tuple(&self) -> SnapshotTuple {
        (
            self.time,
            self.mass,
            self.radius,
            self.energy,
            self.x,
            self.y,
            self.vx,
            self.vy,
        )
    }

    /// Single-sphere body described by this row. `energy` is derived state
    /// and is not consulted.
    pub fn to_spec(&self, tracked: bool) -> BodySpec {
        BodySpec::sphere(self.x, self.y, self.radius, self.mass)
            .with_velocity(self.vx, self.vy)
            .tracked(tracked)
    }
}

impl From<SnapshotTuple> for SnapshotRow {
    fn from((time, mass, radius, energy, x, y, vx, vy): SnapshotTuple) -> Self {
        Self {
            time,
            mass,
            radius,
            energy,
            x,
            y,
            vx,
            vy,
        }
    }
}

/// Clock value shared by every row; 0 for an empty snapshot.
///
/// Errors:
/// - `Error::InvalidParam` if rows disagree on time or the time is not a
///   finite non-negative number.
pub fn snapshot_time(rows: &[SnapshotRow]) -> Result<f64> {
    let Some(first) = rows.first() else {
        return Ok(0.0);
    };
    let t = first.time;
    if !t.is_finite() || t < 0.0 {
        return Err(Error::InvalidParam(
            "snapshot time must be finite and >= 0".into(),
        ));
    }
    if let Some(bad) = rows.iter().find(|r| r.time.to_bits() != t.to_bits()) {
        return Err(Error::InvalidParam(format!(
            "snapshot rows disagree on time ({} vs {})",
            t, bad.time
        )));
    }
    Ok(t)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(time: f64) -> SnapshotRow {
        SnapshotRow::from((time, 1.0, 0.05, 0.5, 0.2, 0.5, 1.0, 0.0))
    }

    #[test]
    fn tuple_field_order() {
        let r = row(2.0);
        assert_eq!(r.mass, 1.0);
        assert_eq!(r.radius, 0.05);
        assert_eq!(r.to_tuple(), (2.0, 1.0, 0.05, 0.5, 0.2, 0.5, 1.0, 0.0));
    }

    #[test]
    fn spec_from_row_is_single_sphere() {
        let spec = row(0.0).to_spec(true);
        assert_eq!(spec.spheres.len(), 1);
        assert_eq!(spec.velocity, [1.0, 0.0]);
        assert!(spec.tracked);
    }

    #[test]
    fn shared_time_is_checked() -> Result<()> {
        assert_eq!(snapshot_time(&[])?, 0.0);
        assert_eq!(snapshot_time(&[row(1.5), row(1.5)])?, 1.5);
        let err = snapshot_time(&[row(1.5), row(2.0)]).unwrap_err();
        assert!(err.to_string().contains("disagree"));
        Ok(())
    }
}
