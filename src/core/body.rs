use serde::{Deserialize, Serialize};

use crate::core::geometry::{add, angular_cross, cross, dot, norm, rotate, scale, SphereMotion, Vec2};
use crate::core::snapshot::SnapshotRow;
use crate::error::{Error, Result};

/// A circle rigidly attached to a body.
///
/// `offset` is expressed in the body frame (orientation θ = 0) relative to
/// the body's centre of mass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SubSphere {
    pub offset: Vec2,
    pub radius: f64,
    pub mass: f64,
}

impl SubSphere {
    /// Create a sub-sphere after validating invariants.
    ///
    /// Errors:
    /// - `Error::InvalidParam` if `radius` is negative, `mass` is non-positive,
    ///   or any component is NaN/inf.
    pub fn new(offset: Vec2, radius: f64, mass: f64) -> Result<Self> {
        if !radius.is_finite() || radius < 0.0 {
            return Err(Error::InvalidParam("radius must be finite and >= 0".into()));
        }
        if !mass.is_finite() || mass <= 0.0 {
            return Err(Error::InvalidParam("mass must be finite and > 0".into()));
        }
        if !offset.iter().all(|x| x.is_finite()) {
            return Err(Error::InvalidParam("sub-sphere offset must be finite".into()));
        }
        Ok(Self {
            offset,
            radius,
            mass,
        })
    }

    /// A sub-sphere sitting on the centre of mass.
    pub fn centered(radius: f64, mass: f64) -> Result<Self> {
        Self::new([0.0, 0.0], radius, mass)
    }
}

/// Everything needed to create a body; the engine assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct BodySpec {
    pub center: Vec2,
    pub velocity: Vec2,
    pub theta: f64,
    pub omega: f64,
    pub spheres: Vec<SubSphere>,
    pub tracked: bool,
}

impl BodySpec {
    /// Composite body at rest with the given sub-spheres.
    pub fn composite(x: f64, y: f64, spheres: Vec<SubSphere>) -> Self {
        Self {
            center: [x, y],
            velocity: [0.0, 0.0],
            theta: 0.0,
            omega: 0.0,
            spheres,
            tracked: false,
        }
    }

    /// Single round body at rest. Invalid radius/mass is reported when the
    /// spec is turned into a body.
    pub fn sphere(x: f64, y: f64, radius: f64, mass: f64) -> Self {
        Self::composite(
            x,
            y,
            vec![SubSphere {
                offset: [0.0, 0.0],
                radius,
                mass,
            }],
        )
    }

    /// Centre-of-mass velocity.
    pub fn with_velocity(mut self, vx: f64, vy: f64) -> Self {
        self.velocity = [vx, vy];
        self
    }

    /// Orientation angle and angular velocity.
    pub fn with_rotation(mut self, theta: f64, omega: f64) -> Self {
        self.theta = theta;
        self.omega = omega;
        self
    }

    /// Whether the body's collisions are logged.
    pub fn tracked(mut self, tracked: bool) -> Self {
        self.tracked = tracked;
        self
    }
}

/// A rigid body made of one or more sub-spheres.
///
/// Fields are private: the engine owns every body and is the only writer.
#[derive(Debug, Clone)]
pub struct Body {
    id: u64,
    center: Vec2,
    velocity: Vec2,
    theta: f64,
    omega: f64,
    spheres: Vec<SubSphere>,
    tracked: bool,
    mass: f64,
    inertia: f64,
    extent: f64,
    collision_count: u64,
}

impl Body {
    /// Validate a spec and build the body.
    ///
    /// Offsets are shifted so their mass-weighted sum is zero; the centre is
    /// moved by the same amount so no sub-sphere changes place in the world.
    ///
    /// Errors:
    /// - `Error::InvalidParam` on an empty sub-sphere list, an invalid
    ///   sub-sphere, any non-finite kinematic value, or a centre of mass
    ///   outside the unit width 0 <= x <= 1.
    pub fn from_spec(id: u64, spec: BodySpec) -> Result<Self> {
        let BodySpec {
            center,
            velocity,
            theta,
            omega,
            spheres,
            tracked,
        } = spec;

        if spheres.is_empty() {
            return Err(Error::InvalidParam(
                "a body needs at least one sub-sphere".into(),
            ));
        }
        let mut spheres = spheres
            .into_iter()
            .map(|s| SubSphere::new(s.offset, s.radius, s.mass))
            .collect::<Result<Vec<_>>>()?;
        if !center.iter().all(|x| x.is_finite()) {
            return Err(Error::InvalidParam("position must be finite".into()));
        }
        if !velocity.iter().all(|x| x.is_finite()) {
            return Err(Error::InvalidParam("velocity must be finite".into()));
        }
        if !theta.is_finite() || !omega.is_finite() {
            return Err(Error::InvalidParam(
                "orientation and angular velocity must be finite".into(),
            ));
        }

        let mass: f64 = spheres.iter().map(|s| s.mass).sum();
        let mut first_moment = [0.0_f64; 2];
        for s in &spheres {
            first_moment = add(&first_moment, &scale(&s.offset, s.mass));
        }
        let shift = scale(&first_moment, 1.0 / mass);
        for s in &mut spheres {
            s.offset = [s.offset[0] - shift[0], s.offset[1] - shift[1]];
        }
        let center = add(&center, &rotate(&shift, theta));
        if !(0.0..=1.0).contains(&center[0]) {
            return Err(Error::InvalidParam(format!(
                "position x = {} must lie in [0, 1]",
                center[0]
            )));
        }

        let inertia = spheres
            .iter()
            .map(|s| s.mass * (dot(&s.offset, &s.offset) + 0.5 * s.radius * s.radius))
            .sum();
        let extent = spheres
            .iter()
            .map(|s| norm(&s.offset) + s.radius)
            .fold(0.0_f64, f64::max);

        Ok(Self {
            id,
            center,
            velocity,
            theta,
            omega,
            spheres,
            tracked,
            mass,
            inertia,
            extent,
            collision_count: 0,
        })
    }

    /// Engine-assigned id, equal to the creation index.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Centre of mass.
    pub fn center(&self) -> Vec2 {
        self.center
    }

    /// Centre-of-mass velocity.
    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    /// Orientation angle.
    pub fn theta(&self) -> f64 {
        self.theta
    }

    /// Angular velocity.
    pub fn omega(&self) -> f64 {
        self.omega
    }

    /// Sub-spheres with offsets relative to the centre of mass.
    pub fn spheres(&self) -> &[SubSphere] {
        &self.spheres
    }

    /// Whether collisions of this body are logged.
    pub fn is_tracked(&self) -> bool {
        self.tracked
    }

    /// Total mass (sum of sub-sphere masses).
    pub fn mass(&self) -> f64 {
        self.mass
    }

    /// Moment of inertia about the centre of mass.
    pub fn inertia(&self) -> f64 {
        self.inertia
    }

    /// Largest distance from the centre of mass to any sub-sphere surface.
    pub fn extent(&self) -> f64 {
        self.extent
    }

    /// Number of collisions this body has taken part in.
    pub fn collision_count(&self) -> u64 {
        self.collision_count
    }

    #[inline]
    pub(crate) fn bump_collision_count(&mut self) {
        self.collision_count = self.collision_count.saturating_add(1);
    }

    /// 1/2 M |v|^2.
    #[inline]
    pub fn translational_energy(&self) -> f64 {
        0.5 * self.mass * dot(&self.velocity, &self.velocity)
    }

    /// Translational plus rotational kinetic energy.
    #[inline]
    pub fn kinetic_energy(&self) -> f64 {
        self.translational_energy() + 0.5 * self.inertia * self.omega * self.omega
    }

    /// M v.
    pub fn momentum(&self) -> Vec2 {
        scale(&self.velocity, self.mass)
    }

    /// Sub-sphere `k`'s offset rotated into the world frame.
    pub fn arm(&self, k: usize) -> Vec2 {
        rotate(&self.spheres[k].offset, self.theta)
    }

    /// World position of sub-sphere `k`'s centre.
    pub fn sphere_center(&self, k: usize) -> Vec2 {
        add(&self.center, &self.arm(k))
    }

    /// Velocity of the material point at world-frame `arm` from the centre.
    pub fn point_velocity(&self, arm: &Vec2) -> Vec2 {
        add(&self.velocity, &angular_cross(self.omega, arm))
    }

    /// Trajectories of all sub-spheres starting from the current state.
    pub fn motions(&self) -> Vec<SphereMotion> {
        self.spheres
            .iter()
            .enumerate()
            .map(|(k, s)| SphereMotion {
                com: self.center,
                com_velocity: self.velocity,
                omega: self.omega,
                arm: self.arm(k),
                radius: s.radius,
            })
            .collect()
    }

    /// Upper bound on how fast any sub-sphere centre can move.
    pub fn speed_bound(&self) -> f64 {
        let reach = self
            .spheres
            .iter()
            .map(|s| norm(&s.offset))
            .fold(0.0_f64, f64::max);
        norm(&self.velocity) + self.omega.abs() * reach
    }

    /// 1 / M.
    #[inline]
    pub fn inverse_mass(&self) -> f64 {
        1.0 / self.mass
    }

    /// 1 / I, or 0 for a body with no rotational inertia.
    #[inline]
    pub fn inverse_inertia(&self) -> f64 {
        if self.inertia > 0.0 {
            1.0 / self.inertia
        } else {
            0.0
        }
    }

    /// Move linearly (and rotate) for `dt`.
    pub(crate) fn drift(&mut self, dt: f64) {
        self.center[0] += self.velocity[0] * dt;
        self.center[1] += self.velocity[1] * dt;
        self.theta += self.omega * dt;
    }

    pub(crate) fn translate(&mut self, delta: &Vec2) {
        self.center = add(&self.center, delta);
    }

    /// Apply `impulse` at world-frame `arm` from the centre of mass.
    pub(crate) fn apply_impulse(&mut self, impulse: &Vec2, arm: &Vec2) {
        let inv_m = self.inverse_mass();
        self.velocity[0] += impulse[0] * inv_m;
        self.velocity[1] += impulse[1] * inv_m;
        self.omega += cross(arm, impulse) * self.inverse_inertia();
    }

    pub(crate) fn set_velocity(&mut self, velocity: Vec2) {
        self.velocity = velocity;
    }

    /// Rescale the centre-of-mass velocity so that 1/2 M |v|^2 = `energy`,
    /// keeping its direction. A body at rest keeps zero velocity.
    pub(crate) fn set_translational_energy(&mut self, energy: f64) {
        let speed = norm(&self.velocity);
        if speed == 0.0 {
            return;
        }
        let target = (2.0 * energy.max(0.0) / self.mass).sqrt();
        self.velocity = scale(&self.velocity, target / speed);
    }

    /// The 8-field state tuple at clock `time`. `mass` and `radius` are the
    /// first sub-sphere's values.
    pub fn state(&self, time: f64) -> SnapshotRow {
        let first = &self.spheres[0];
        SnapshotRow {
            time,
            mass: first.mass,
            radius: first.radius,
            energy: self.kinetic_energy(),
            x: self.center[0],
            y: self.center[1],
            vx: self.velocity[0],
            vy: self.velocity[1],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_body_ok() -> Result<()> {
        let b = Body::from_spec(
            1,
            BodySpec::sphere(0.5, 1.0, 0.5, 2.0).with_velocity(2.0, -3.0),
        )?;
        assert_eq!(b.id(), 1);
        assert_eq!(b.center(), [0.5, 1.0]);
        assert_eq!(b.velocity(), [2.0, -3.0]);
        assert_eq!(b.mass(), 2.0);
        assert_eq!(b.collision_count(), 0);
        assert!(!b.is_tracked());
        Ok(())
    }

    #[test]
    fn empty_sphere_list_rejected() {
        let err = Body::from_spec(0, BodySpec::composite(0.5, 0.0, vec![])).unwrap_err();
        assert!(err.to_string().contains("sub-sphere"));
    }

    #[test]
    fn invalid_radius_rejected() {
        let err = Body::from_spec(0, BodySpec::sphere(0.5, 0.0, -0.1, 1.0)).unwrap_err();
        assert!(err.to_string().contains("radius"));
    }

    #[test]
    fn invalid_mass_rejected() {
        let err = Body::from_spec(0, BodySpec::sphere(0.5, 0.0, 0.1, 0.0)).unwrap_err();
        assert!(err.to_string().contains("mass"));
    }

    #[test]
    fn nan_velocity_rejected() {
        let spec = BodySpec::sphere(0.5, 0.0, 0.1, 1.0).with_velocity(f64::NAN, 0.0);
        let err = Body::from_spec(0, spec).unwrap_err();
        assert!(err.to_string().contains("velocity"));
    }

    #[test]
    fn position_outside_unit_width_rejected() -> Result<()> {
        for x in [5.0, -0.01, 1.0 + 1e-12] {
            let err = Body::from_spec(0, BodySpec::sphere(x, 0.0, 0.05, 1.0)).unwrap_err();
            assert!(matches!(err, Error::InvalidParam(_)), "x = {x}");
            assert!(err.to_string().contains("position"));
        }
        // Edges are inside; y is unbounded.
        Body::from_spec(0, BodySpec::sphere(0.0, -40.0, 0.05, 1.0))?;
        Body::from_spec(0, BodySpec::sphere(1.0, 1e6, 0.05, 1.0))?;
        Ok(())
    }

    #[test]
    fn composite_checked_at_centre_of_mass() -> Result<()> {
        // Given centre is outside, the mass-weighted centre is inside.
        let spheres = vec![
            SubSphere::new([0.0, 0.0], 0.01, 1.0)?,
            SubSphere::new([0.4, 0.0], 0.01, 1.0)?,
        ];
        let b = Body::from_spec(0, BodySpec::composite(-0.1, 0.0, spheres))?;
        assert!((b.center()[0] - 0.1).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn kinetic_energy_computed() -> Result<()> {
        // v = (3,4), |v|^2 = 25; KE = 0.5 * m * 25
        let b = Body::from_spec(7, BodySpec::sphere(0.5, 0.0, 0.1, 2.0).with_velocity(3.0, 4.0))?;
        assert!((b.kinetic_energy() - 25.0).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn offsets_recentred_on_mass() -> Result<()> {
        // Dumbbell with unequal masses: com sits at 1/3 of the way to the heavy end.
        let spheres = vec![
            SubSphere::new([0.0, 0.0], 0.01, 2.0)?,
            SubSphere::new([0.3, 0.0], 0.01, 1.0)?,
        ];
        let b = Body::from_spec(0, BodySpec::composite(0.4, 0.0, spheres))?;
        assert!((b.center()[0] - 0.5).abs() < 1e-12);
        assert!((b.sphere_center(0)[0] - 0.4).abs() < 1e-12);
        assert!((b.sphere_center(1)[0] - 0.7).abs() < 1e-12);
        let m = b.spheres()[0].mass * b.spheres()[0].offset[0]
            + b.spheres()[1].mass * b.spheres()[1].offset[0];
        assert!(m.abs() < 1e-12);
        assert!((b.extent() - 0.21).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn rotational_energy_counted() -> Result<()> {
        let spheres = vec![
            SubSphere::new([-0.1, 0.0], 0.0, 1.0)?,
            SubSphere::new([0.1, 0.0], 0.0, 1.0)?,
        ];
        let b = Body::from_spec(0, BodySpec::composite(0.5, 0.0, spheres).with_rotation(0.0, 2.0))?;
        // I = 2 * 0.01 = 0.02; E = 0.5 * 0.02 * 4
        assert!((b.inertia() - 0.02).abs() < 1e-15);
        assert!((b.kinetic_energy() - 0.04).abs() < 1e-15);
        Ok(())
    }

    #[test]
    fn off_center_impulse_spins_body() -> Result<()> {
        let spheres = vec![
            SubSphere::new([-0.1, 0.0], 0.0, 1.0)?,
            SubSphere::new([0.1, 0.0], 0.0, 1.0)?,
        ];
        let mut b = Body::from_spec(0, BodySpec::composite(0.5, 0.0, spheres))?;
        b.apply_impulse(&[0.0, 1.0], &[0.1, 0.0]);
        assert!((b.velocity()[1] - 0.5).abs() < 1e-15);
        assert!((b.omega() - 5.0).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn rescale_keeps_direction() -> Result<()> {
        let mut b =
            Body::from_spec(0, BodySpec::sphere(0.5, 0.0, 0.1, 2.0).with_velocity(3.0, 4.0))?;
        b.set_translational_energy(1.0);
        assert!((b.translational_energy() - 1.0).abs() < 1e-12);
        let v = b.velocity();
        assert!((v[1] / v[0] - 4.0 / 3.0).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn bump_collision_count() -> Result<()> {
        let mut b = Body::from_spec(1, BodySpec::sphere(0.5, 0.0, 0.1, 1.0))?;
        b.bump_collision_count();
        assert_eq!(b.collision_count(), 1);
        Ok(())
    }
}
