//! Time-of-contact solvers for moving circles and stationary vertical lines.
//!
//! All times returned here are relative to "now" (Δt ≥ 0). A contact that is
//! already touching and still closing is reported as `Some(0.0)` so the
//! integrator resolves it immediately instead of re-detecting it forever.

/// Fixed spatial dimension (2D).
pub const DIM: usize = 2;

/// Plain 2-vector.
pub type Vec2 = [f64; DIM];

/// Two times closer than this are considered simultaneous.
pub const EPS_TIME: f64 = 1e-12;

/// Gap below which two surfaces count as touching during conservative advancement.
pub const CONTACT_TOL: f64 = 1e-10;

/// Iteration cap for conservative advancement along a rotating trajectory.
const MAX_ADVANCE_STEPS: usize = 10_000;

/// A circle moving linearly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub center: Vec2,
    pub velocity: Vec2,
    pub radius: f64,
}

/// Exact trajectory of one sub-sphere of a rigid body over a short horizon.
///
/// Position at Δt is `com + com_velocity·Δt + R(omega·Δt)·arm`, where `arm`
/// is the world-frame offset of the sub-sphere centre at Δt = 0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphereMotion {
    pub com: Vec2,
    pub com_velocity: Vec2,
    pub omega: f64,
    pub arm: Vec2,
    pub radius: f64,
}

impl SphereMotion {
    /// True when the sub-sphere centre sweeps an arc rather than a line.
    #[inline]
    pub fn is_rotating(&self) -> bool {
        self.omega != 0.0 && norm(&self.arm) > 0.0
    }

    /// Sub-sphere centre at Δt.
    pub fn position_at(&self, dt: f64) -> Vec2 {
        let arm = rotate(&self.arm, self.omega * dt);
        [
            self.com[0] + self.com_velocity[0] * dt + arm[0],
            self.com[1] + self.com_velocity[1] * dt + arm[1],
        ]
    }

    /// Sub-sphere centre velocity at Δt.
    pub fn velocity_at(&self, dt: f64) -> Vec2 {
        let arm = rotate(&self.arm, self.omega * dt);
        add(&self.com_velocity, &angular_cross(self.omega, &arm))
    }

    /// Upper bound on the speed of any point of the sub-sphere centre path.
    #[inline]
    pub fn speed_bound(&self) -> f64 {
        norm(&self.com_velocity) + self.omega.abs() * norm(&self.arm)
    }

    /// Linear approximation at Δt = 0; exact when `!is_rotating()`.
    pub fn as_circle(&self) -> Circle {
        Circle {
            center: add(&self.com, &self.arm),
            velocity: self.com_velocity,
            radius: self.radius,
        }
    }
}

/// Earliest contact between two bodies: which sub-spheres touch and when.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairContact {
    pub dt: f64,
    pub sub_a: usize,
    pub sub_b: usize,
}

/// Side of a vertical line a sub-sphere approaches from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// Centre at smaller x, closing in +x.
    Left,
    /// Centre at larger x, closing in -x.
    Right,
}

impl Side {
    /// +1 for `Left`, -1 for `Right`.
    #[inline]
    pub fn sign(self) -> f64 {
        match self {
            Side::Left => 1.0,
            Side::Right => -1.0,
        }
    }

    /// Unit normal pointing from the sub-sphere towards the line.
    #[inline]
    pub fn normal(self) -> Vec2 {
        [self.sign(), 0.0]
    }

    /// Side of `line_x` that `x` lies on; `None` exactly on the line.
    pub fn of(x: f64, line_x: f64) -> Option<Self> {
        if x < line_x {
            Some(Side::Left)
        } else if x > line_x {
            Some(Side::Right)
        } else {
            None
        }
    }
}

/// Earliest contact between a body and a vertical line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineContact {
    pub dt: f64,
    pub sub: usize,
    /// Side the sub-sphere was on when the contact was found.
    pub side: Side,
}

/// Smallest Δt ≥ 0 at which two linearly moving circles touch while approaching.
///
/// Solves |d + u·Δt| = r₁ + r₂ with d = c₂ − c₁, u = v₂ − v₁. Separating,
/// parallel and grazing (zero discriminant) configurations report no contact.
pub fn circle_circle_toi(a: &Circle, b: &Circle) -> Option<f64> {
    let d = sub(&b.center, &a.center);
    let u = sub(&b.velocity, &a.velocity);
    let qa = dot(&u, &u);
    if qa <= f64::MIN_POSITIVE {
        return None; // No relative motion
    }
    let qb = 2.0 * dot(&d, &u);
    if qb >= 0.0 {
        return None; // Separating or tangential
    }
    let r_sum = a.radius + b.radius;
    let qc = dot(&d, &d) - r_sum * r_sum;
    if qc <= 0.0 {
        // Touching (or numerically overlapping) and closing
        return Some(0.0);
    }
    let disc = qb * qb - 4.0 * qa * qc;
    if disc <= 0.0 {
        return None;
    }
    // Smaller root in the cancellation-free form 2c / (-b + sqrt(disc)).
    let t = 2.0 * qc / (-qb + disc.sqrt());
    if !t.is_finite() {
        return None;
    }
    Some(t.max(0.0))
}

/// Smallest Δt ≥ 0 at which a linearly moving circle touches the line x = `line_x`,
/// with the side it approaches from.
///
/// The approach side is the side the centre is currently on; a circle whose
/// centre sits exactly on the line has no defined side and reports no contact.
pub fn circle_line_toi(c: &Circle, line_x: f64) -> Option<(f64, Side)> {
    let x = c.center[0];
    let side = Side::of(x, line_x)?;
    // Velocity towards the line
    let closing = side.sign() * c.velocity[0];
    if closing <= 0.0 {
        return None;
    }
    let t = ((line_x - side.sign() * c.radius) - x) / c.velocity[0];
    if !t.is_finite() {
        return None;
    }
    Some((t.max(0.0), side))
}

/// Contact time for two sub-sphere trajectories, searching no further than `horizon`
/// when either one rotates.
pub fn sphere_sphere_toi(a: &SphereMotion, b: &SphereMotion, horizon: f64) -> Option<f64> {
    if !a.is_rotating() && !b.is_rotating() {
        return circle_circle_toi(&a.as_circle(), &b.as_circle());
    }

    let bound = norm(&sub(&b.com_velocity, &a.com_velocity))
        + a.omega.abs() * norm(&a.arm)
        + b.omega.abs() * norm(&b.arm);
    let r_sum = a.radius + b.radius;
    advance_until_contact(bound, horizon, |t| {
        let d = sub(&b.position_at(t), &a.position_at(t));
        let dist = norm(&d);
        if dist <= 0.0 {
            return (-r_sum, -1.0);
        }
        let u = sub(&b.velocity_at(t), &a.velocity_at(t));
        (dist - r_sum, dot(&u, &d) / dist)
    })
}

/// Contact time and approach side for a sub-sphere trajectory and the line
/// x = `line_x`.
///
/// A rotating sub-sphere cannot pass the line without first touching it, so
/// the side is the one its centre is on now.
pub fn sphere_line_toi(s: &SphereMotion, line_x: f64, horizon: f64) -> Option<(f64, Side)> {
    if !s.is_rotating() {
        return circle_line_toi(&s.as_circle(), line_x);
    }
    let side = Side::of(s.position_at(0.0)[0], line_x)?;

    let bound = s.com_velocity[0].abs() + s.omega.abs() * norm(&s.arm);
    advance_until_contact(bound, horizon, |t| {
        let offset = s.position_at(t)[0] - line_x;
        if offset == 0.0 {
            return (-s.radius, 0.0);
        }
        let sign = offset.signum();
        (offset.abs() - s.radius, sign * s.velocity_at(t)[0])
    })
    .map(|t| (t, side))
}

/// Earliest contact over every sub-sphere pair of two bodies. Ties keep the
/// lowest (sub_a, sub_b).
pub fn earliest_pair_contact(
    a: &[SphereMotion],
    b: &[SphereMotion],
    horizon: f64,
) -> Option<PairContact> {
    let mut best: Option<PairContact> = None;
    for (ia, sa) in a.iter().enumerate() {
        for (ib, sb) in b.iter().enumerate() {
            if let Some(dt) = sphere_sphere_toi(sa, sb, horizon) {
                if best.map_or(true, |c| dt < c.dt) {
                    best = Some(PairContact {
                        dt,
                        sub_a: ia,
                        sub_b: ib,
                    });
                }
            }
        }
    }
    best
}

/// Earliest contact of any sub-sphere of a body with the line x = `line_x`.
pub fn earliest_line_contact(
    spheres: &[SphereMotion],
    line_x: f64,
    horizon: f64,
) -> Option<LineContact> {
    let mut best: Option<LineContact> = None;
    for (k, s) in spheres.iter().enumerate() {
        if let Some((dt, side)) = sphere_line_toi(s, line_x, horizon) {
            if best.map_or(true, |c| dt < c.dt) {
                best = Some(LineContact { dt, sub: k, side });
            }
        }
    }
    best
}

/// Conservative advancement: step by gap / bound until the surfaces touch
/// while closing. `measure(t)` returns (gap, separation rate) at Δt = t.
fn advance_until_contact<F>(bound: f64, horizon: f64, measure: F) -> Option<f64>
where
    F: Fn(f64) -> (f64, f64),
{
    if !bound.is_finite() || bound <= 0.0 {
        return None;
    }
    let mut t = 0.0_f64;
    let mut escape = CONTACT_TOL / bound;
    for _ in 0..MAX_ADVANCE_STEPS {
        let (gap, rate) = measure(t);
        if gap <= CONTACT_TOL {
            if rate < 0.0 {
                return Some(t);
            }
            // Touching but separating: nudge forward until out of tolerance.
            t += escape;
            escape *= 2.0;
        } else {
            t += gap / bound;
            escape = CONTACT_TOL / bound;
        }
        if t > horizon {
            return None;
        }
    }
    None
}

// ============ Vector helpers ============

/// a · b.
#[inline]
pub fn dot(a: &Vec2, b: &Vec2) -> f64 {
    a[0] * b[0] + a[1] * b[1]
}

/// a + b.
#[inline]
pub fn add(a: &Vec2, b: &Vec2) -> Vec2 {
    [a[0] + b[0], a[1] + b[1]]
}

/// a − b.
#[inline]
pub fn sub(a: &Vec2, b: &Vec2) -> Vec2 {
    [a[0] - b[0], a[1] - b[1]]
}

/// s a.
#[inline]
pub fn scale(a: &Vec2, s: f64) -> Vec2 {
    [a[0] * s, a[1] * s]
}

/// |a|.
#[inline]
pub fn norm(a: &Vec2) -> f64 {
    dot(a, a).sqrt()
}

/// Scalar z-component of the 2D cross product a × b.
#[inline]
pub fn cross(a: &Vec2, b: &Vec2) -> f64 {
    a[0] * b[1] - a[1] * b[0]
}

/// ω ẑ × r.
#[inline]
pub fn angular_cross(omega: f64, r: &Vec2) -> Vec2 {
    [-omega * r[1], omega * r[0]]
}

/// `v` rotated counter-clockwise by `angle` radians.
pub fn rotate(v: &Vec2, angle: f64) -> Vec2 {
    if angle == 0.0 {
        return *v;
    }
    let (s, c) = angle.sin_cos();
    [c * v[0] - s * v[1], s * v[0] + c * v[1]]
}
