use serde::{Deserialize, Serialize};

use crate::core::body::Body;
use crate::core::geometry::{cross, dot, scale, Side};
use crate::core::rng::EngineRng;
use crate::core::tracking::EventTag;
use crate::error::{Error, Result};

/// Collision response of a vertical barrier.
///
/// Every policy first reflects the body specularly off the line; the
/// non-elastic ones then reshape the centre-of-mass speed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Policy {
    /// Pure reflection; energy unchanged.
    Elastic,
    /// Translational energy reset to `temperature`.
    Fixed { temperature: f64 },
    /// Translational energy redrawn from an exponential distribution with
    /// mean `temperature`.
    Random { temperature: f64 },
    /// Speed multiplied by `elasticity`.
    Multiplicative { elasticity: f64 },
}

impl Policy {
    /// Errors:
    /// - `Error::InvalidParam` for a negative or non-finite temperature or elasticity.
    pub fn validate(&self) -> Result<()> {
        match *self {
            Policy::Elastic => Ok(()),
            Policy::Fixed { temperature } | Policy::Random { temperature } => {
                if !temperature.is_finite() || temperature < 0.0 {
                    return Err(Error::InvalidParam(
                        "temperature must be finite and >= 0".into(),
                    ));
                }
                Ok(())
            }
            Policy::Multiplicative { elasticity } => {
                if !elasticity.is_finite() || elasticity < 0.0 {
                    return Err(Error::InvalidParam(
                        "elasticity must be finite and >= 0".into(),
                    ));
                }
                Ok(())
            }
        }
    }

    /// Tag written to the tracking log for hits on a barrier with this policy.
    pub fn tag(&self) -> EventTag {
        match self {
            Policy::Elastic => EventTag::Elastic,
            Policy::Fixed { .. } => EventTag::Fixed,
            Policy::Random { .. } => EventTag::Random,
            Policy::Multiplicative { .. } => EventTag::Multiplicative,
        }
    }
}

/// A vertical barrier at `x = position`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct XLine {
    pub position: f64,
    pub policy: Policy,
}

/// Relative slack used when a struck sub-sphere is moved back off a barrier.
const SNAP_PAD: f64 = 4.0 * f64::EPSILON;

/// Barriers in registration order.
#[derive(Debug, Clone, Default)]
pub struct BoundaryRegistry {
    lines: Vec<XLine>,
}

impl BoundaryRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a barrier; returns its index.
    ///
    /// Errors:
    /// - `Error::InvalidParam` if `position` is outside [0, 1] or the policy
    ///   parameters are invalid.
    pub fn register(&mut self, position: f64, policy: Policy) -> Result<usize> {
        Self::check_position(position)?;
        policy.validate()?;
        self.lines.push(XLine { position, policy });
        Ok(self.lines.len() - 1)
    }

    /// Errors:
    /// - `Error::InvalidParam` unless `position` is a finite value in [0, 1].
    pub fn check_position(position: f64) -> Result<()> {
        if !position.is_finite() || !(0.0..=1.0).contains(&position) {
            return Err(Error::InvalidParam(format!(
                "barrier position {position} must lie in [0, 1]"
            )));
        }
        Ok(())
    }

    /// Number of registered barriers.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// True when no barrier is registered.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Barrier `index` in registration order.
    pub fn get(&self, index: usize) -> Option<&XLine> {
        self.lines.get(index)
    }

    /// Barriers in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &XLine> {
        self.lines.iter()
    }

    /// Barrier x positions in registration order.
    pub fn positions(&self) -> Vec<f64> {
        self.lines.iter().map(|l| l.position).collect()
    }

    /// Resolve a hit of `body`'s sub-sphere `sub`, arriving from `side`, on
    /// barrier `index` and return the body's kinetic energy afterwards.
    ///
    /// Errors:
    /// - `Error::InvalidParam` if `index` does not name a barrier.
    pub fn apply(
        &self,
        index: usize,
        body: &mut Body,
        sub: usize,
        side: Side,
        rng: &mut EngineRng,
    ) -> Result<f64> {
        let line = self
            .lines
            .get(index)
            .ok_or_else(|| Error::InvalidParam(format!("no barrier with index {index}")))?;

        reflect(body, sub, line.position, side);
        match line.policy {
            Policy::Elastic => {}
            Policy::Fixed { temperature } => body.set_translational_energy(temperature),
            Policy::Random { temperature } => {
                let energy = rng.exponential(temperature);
                body.set_translational_energy(energy);
            }
            Policy::Multiplicative { elasticity } => {
                body.set_velocity(scale(&body.velocity(), elasticity));
            }
        }
        Ok(body.kinetic_energy())
    }
}

/// Specular reflection of the whole body off `x = line_x`, struck by
/// sub-sphere `sub` coming from `side`.
///
/// The struck sub-sphere is first put back on `side` of the line if the
/// drift to contact rounded it past. When the contact normal passes through
/// the centre of mass only the normal velocity component flips. Otherwise an
/// impulse against the immovable line reverses the contact point's normal
/// velocity and also changes the spin; kinetic energy is conserved either way.
fn reflect(body: &mut Body, sub: usize, line_x: f64, side: Side) {
    let sign = side.sign();
    let radius = body.spheres()[sub].radius;
    let overshoot = sign * (body.sphere_center(sub)[0] - (line_x - sign * radius));
    if overshoot > 0.0 {
        // Pad by a few ulps so the recomputed centre cannot round back across.
        let pad = SNAP_PAD * (line_x.abs() + radius).max(1.0);
        body.translate(&[-sign * (overshoot + pad), 0.0]);
    }

    let n = side.normal();
    // The contact point lies on the line through the sub-sphere centre along
    // n, so the sphere arm gives the same normal velocity and torque.
    let arm = body.arm(sub);

    let u_n = dot(&body.point_velocity(&arm), &n);
    if u_n <= 0.0 {
        return; // Not closing on the line
    }
    let lever = cross(&arm, &n);
    let k_rot = lever * lever * body.inverse_inertia();
    if k_rot == 0.0 {
        let v = body.velocity();
        body.set_velocity([-v[0], v[1]]);
    } else {
        let j = -2.0 * u_n / (body.inverse_mass() + k_rot);
        body.apply_impulse(&scale(&n, j), &arm);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::body::{BodySpec, SubSphere};
    use crate::core::rng::SeedMode;

    fn mover(vx: f64, vy: f64) -> Result<Body> {
        Body::from_spec(0, BodySpec::sphere(0.75, 0.5, 0.05, 1.0).with_velocity(vx, vy))
    }

    #[test]
    fn register_rejects_out_of_domain() {
        let mut reg = BoundaryRegistry::new();
        assert!(reg.register(1.2, Policy::Elastic).is_err());
        assert!(reg.register(f64::NAN, Policy::Elastic).is_err());
        assert!(reg
            .register(0.5, Policy::Fixed { temperature: -1.0 })
            .is_err());
        assert!(reg.is_empty());
    }

    #[test]
    fn positions_keep_registration_order() -> Result<()> {
        let mut reg = BoundaryRegistry::new();
        reg.register(0.9, Policy::Elastic)?;
        reg.register(0.1, Policy::Multiplicative { elasticity: 0.5 })?;
        assert_eq!(reg.positions(), vec![0.9, 0.1]);
        Ok(())
    }

    #[test]
    fn elastic_negates_normal_component() -> Result<()> {
        let mut reg = BoundaryRegistry::new();
        reg.register(0.8, Policy::Elastic)?;
        let mut rng = EngineRng::new(SeedMode::Fixed(1));
        let mut b = mover(1.0, 0.25)?;
        let e0 = b.kinetic_energy();
        let e1 = reg.apply(0, &mut b, 0, Side::Left, &mut rng)?;
        assert_eq!(b.velocity(), [-1.0, 0.25]);
        assert_eq!(e0, e1);
        Ok(())
    }

    #[test]
    fn fixed_resets_energy_and_keeps_direction() -> Result<()> {
        let mut reg = BoundaryRegistry::new();
        reg.register(0.8, Policy::Fixed { temperature: 2.0 })?;
        let mut rng = EngineRng::new(SeedMode::Fixed(1));
        let mut b = mover(3.0, 4.0)?;
        let e = reg.apply(0, &mut b, 0, Side::Left, &mut rng)?;
        assert!((e - 2.0).abs() < 1e-12);
        let v = b.velocity();
        assert!(v[0] < 0.0 && v[1] > 0.0);
        assert!((v[1] / v[0] + 4.0 / 3.0).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn multiplicative_scales_speed() -> Result<()> {
        let mut reg = BoundaryRegistry::new();
        reg.register(0.8, Policy::Multiplicative { elasticity: 0.5 })?;
        let mut rng = EngineRng::new(SeedMode::Fixed(1));
        let mut b = mover(1.0, 0.0)?;
        let e = reg.apply(0, &mut b, 0, Side::Left, &mut rng)?;
        assert_eq!(b.velocity(), [-0.5, 0.0]);
        assert!((e - 0.125).abs() < 1e-15);
        Ok(())
    }

    #[test]
    fn random_draw_is_seeded() -> Result<()> {
        let mut reg = BoundaryRegistry::new();
        reg.register(0.8, Policy::Random { temperature: 1.0 })?;
        let mut r1 = EngineRng::new(SeedMode::Fixed(99));
        let mut r2 = EngineRng::new(SeedMode::Fixed(99));
        let mut a = mover(1.0, 1.0)?;
        let mut b = mover(1.0, 1.0)?;
        let ea = reg.apply(0, &mut a, 0, Side::Left, &mut r1)?;
        let eb = reg.apply(0, &mut b, 0, Side::Left, &mut r2)?;
        assert_eq!(ea.to_bits(), eb.to_bits());
        assert!(a.velocity()[0] < 0.0);
        Ok(())
    }

    #[test]
    fn off_center_hit_conserves_energy() -> Result<()> {
        // Dumbbell tilted so the struck sphere's normal misses the centre of mass.
        let spheres = vec![
            SubSphere::new([-0.05, 0.0], 0.01, 1.0)?,
            SubSphere::new([0.05, 0.0], 0.01, 1.0)?,
        ];
        let spec = BodySpec::composite(0.5, 0.5, spheres)
            .with_velocity(1.0, 0.0)
            .with_rotation(0.7, 0.0);
        let mut b = Body::from_spec(0, spec)?;
        let mut reg = BoundaryRegistry::new();
        let hit_x = b.sphere_center(1)[0] + 0.01;
        reg.register(hit_x, Policy::Elastic)?;
        let e0 = b.kinetic_energy();
        let mut rng = EngineRng::new(SeedMode::Fixed(0));
        let e1 = reg.apply(0, &mut b, 1, Side::Left, &mut rng)?;
        assert!((e1 - e0).abs() < 1e-12);
        assert!(b.omega() != 0.0);
        // Contact point now leaves the line
        let arm = b.arm(1);
        let contact = [arm[0] + 0.01, arm[1]];
        assert!(b.point_velocity(&contact)[0] < 0.0);
        Ok(())
    }

    #[test]
    fn point_body_past_line_is_moved_back_and_reflected() -> Result<()> {
        // Zero-radius body one step past the line it reached from the left.
        let line = 0.9;
        let x = 0.9 + 4.0 * f64::EPSILON;
        let spec = BodySpec::sphere(x, 0.0, 0.0, 1.0).with_velocity(0.5, 0.1);
        let mut b = Body::from_spec(0, spec)?;
        let mut reg = BoundaryRegistry::new();
        reg.register(line, Policy::Elastic)?;
        let mut rng = EngineRng::new(SeedMode::Fixed(0));
        reg.apply(0, &mut b, 0, Side::Left, &mut rng)?;
        assert!(b.center()[0] < line);
        assert!((b.center()[0] - line).abs() < 1e-14);
        assert_eq!(b.velocity(), [-0.5, 0.1]);
        Ok(())
    }

    #[test]
    fn side_decides_reflection_direction() -> Result<()> {
        // Touching from the right: moving left must turn into moving right.
        let spec = BodySpec::sphere(0.85, 0.0, 0.05, 1.0).with_velocity(-1.0, 0.0);
        let mut b = Body::from_spec(0, spec)?;
        let mut reg = BoundaryRegistry::new();
        reg.register(0.8, Policy::Multiplicative { elasticity: 0.5 })?;
        let mut rng = EngineRng::new(SeedMode::Fixed(0));
        reg.apply(0, &mut b, 0, Side::Right, &mut rng)?;
        assert_eq!(b.velocity(), [0.5, 0.0]);
        Ok(())
    }
}
