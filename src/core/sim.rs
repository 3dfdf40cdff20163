use crate::config::EngineConfig;
use crate::core::body::{Body, BodySpec, SubSphere};
use crate::core::boundary::{BoundaryRegistry, Policy};
use crate::core::event::{Event, EventKind};
use crate::core::geometry::{
    add, cross, dot, earliest_line_contact, earliest_pair_contact, norm, scale, sub, SphereMotion,
    Vec2, EPS_TIME,
};
use crate::core::grid::SpatialGrid;
use crate::core::rng::{EngineRng, SeedMode};
use crate::core::snapshot::{snapshot_time, SnapshotRow, SnapshotTuple};
use crate::core::tracking::{EventTag, TrackingLog, TrackingRecord, TrackingTuple};
use crate::error::{Error, Result};
use log::{debug, info, trace};

/// Slack allowed when checking new geometry against existing geometry.
const OVERLAP_SLACK: f64 = 1e-9;

/// Whether a `run` call is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IntegratorState {
    #[default]
    Idle,
    Advancing,
}

/// Cumulative event counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunStats {
    pub pair_collisions: u64,
    pub barrier_collisions: u64,
    /// Steps that ended because bodies could have left their searched neighbourhood.
    pub rescans: u64,
}

/// 2D hard-body engine: bodies, vertical barriers, clock and tracking log.
///
/// Time advances only through [`Simulation::run`], which resolves every
/// collision up to the deadline one event at a time.
#[derive(Debug)]
pub struct Simulation {
    time_now: f64,
    bodies: Vec<Body>,
    boundaries: BoundaryRegistry,
    grid: SpatialGrid,
    tracking: TrackingLog,
    rng: EngineRng,
    state: IntegratorState,
    stats: RunStats,
}

impl Simulation {
    /// Create an empty engine with `grid_fineness` broad-phase cells across
    /// the unit width.
    pub fn new(grid_fineness: u32, seed: SeedMode) -> Result<Self> {
        Self::from_config(&EngineConfig::new(grid_fineness, seed))
    }

    /// Create an empty engine from validated settings.
    ///
    /// Errors:
    /// - `Error::InvalidParam` if `config.grid_fineness` is zero.
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        config.validate()?;
        let grid = SpatialGrid::new(config.grid_fineness)?;
        let rng = EngineRng::new(config.seed);
        info!(
            "engine created: grid fineness {}, cell width {}, seed {}",
            config.grid_fineness,
            grid.cell_width(),
            rng.seed()
        );
        Ok(Self {
            time_now: 0.0,
            bodies: Vec::new(),
            boundaries: BoundaryRegistry::new(),
            grid,
            tracking: TrackingLog::new(),
            rng,
            state: IntegratorState::Idle,
            stats: RunStats::default(),
        })
    }

    /// Rebuild an engine from snapshot rows, starting the clock at the rows' time.
    ///
    /// Tracking flags are not stored in a snapshot; `tracked(index, row)`
    /// supplies them again.
    pub fn from_snapshot<F>(config: &EngineConfig, rows: &[SnapshotRow], tracked: F) -> Result<Self>
    where
        F: FnMut(usize, &SnapshotRow) -> bool,
    {
        let time = snapshot_time(rows)?;
        let mut sim = Self::from_config(config)?;
        sim.time_now = time;
        sim.load_snapshot(rows, tracked)?;
        Ok(sim)
    }

    /// Returns current simulation time.
    pub fn time(&self) -> f64 {
        self.time_now
    }

    /// `Advancing` only while a `run` call is in progress.
    pub fn state(&self) -> IntegratorState {
        self.state
    }

    /// Event counters accumulated over every `run` call.
    pub fn stats(&self) -> RunStats {
        self.stats
    }

    /// Seed of the random stream (the drawn one for `SeedMode::Random`).
    pub fn seed(&self) -> u64 {
        self.rng.seed()
    }

    /// Broad-phase grid, filed at the current body positions.
    pub fn grid(&self) -> &SpatialGrid {
        &self.grid
    }

    /// Registered barriers with their policies.
    pub fn boundaries(&self) -> &BoundaryRegistry {
        &self.boundaries
    }

    /// Number of bodies.
    pub fn num_bodies(&self) -> usize {
        self.bodies.len()
    }

    /// Bodies in ascending id order.
    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    /// Body with the given id.
    ///
    /// Errors:
    /// - `Error::UnknownBody` if no body was created with `id`.
    pub fn body(&self, id: u64) -> Result<&Body> {
        usize::try_from(id)
            .ok()
            .and_then(|slot| self.bodies.get(slot))
            .ok_or(Error::UnknownBody(id))
    }

    /// Compute total kinetic energy (diagnostic).
    pub fn kinetic_energy(&self) -> f64 {
        self.bodies.iter().map(Body::kinetic_energy).sum()
    }

    /// Total linear momentum.
    pub fn momentum(&self) -> Vec2 {
        self.bodies
            .iter()
            .fold([0.0, 0.0], |acc, b| add(&acc, &b.momentum()))
    }

    // ============ Barriers ============

    /// Register a barrier at `x = position`.
    ///
    /// Errors:
    /// - `Error::InvalidParam` for a position outside [0, 1] or bad policy parameters.
    /// - `Error::Overlap` if the line would cut through an existing body.
    pub fn add_xline(&mut self, position: f64, policy: Policy) -> Result<()> {
        BoundaryRegistry::check_position(position)?;
        policy.validate()?;
        for body in &self.bodies {
            if crosses_line(body, position) {
                return Err(Error::Overlap(format!(
                    "barrier at x = {position} cuts through body {}",
                    body.id()
                )));
            }
        }
        let index = self.boundaries.register(position, policy)?;
        debug!("barrier {index} at x = {position}: {policy:?}");
        Ok(())
    }

    /// Elastic barrier.
    pub fn add_basic_xline(&mut self, position: f64) -> Result<()> {
        self.add_xline(position, Policy::Elastic)
    }

    /// Barrier resetting the energy of colliding bodies to `temperature`.
    pub fn add_fixed_xline(&mut self, position: f64, temperature: f64) -> Result<()> {
        self.add_xline(position, Policy::Fixed { temperature })
    }

    /// Barrier redrawing the energy of colliding bodies with mean `temperature`.
    pub fn add_random_xline(&mut self, position: f64, temperature: f64) -> Result<()> {
        self.add_xline(position, Policy::Random { temperature })
    }

    /// Barrier multiplying the speed of colliding bodies by `elasticity`.
    pub fn add_multiplicative_xline(&mut self, position: f64, elasticity: f64) -> Result<()> {
        self.add_xline(position, Policy::Multiplicative { elasticity })
    }

    /// Barrier positions in registration order.
    pub fn xline_positions(&self) -> Vec<f64> {
        self.boundaries.positions()
    }

    // ============ Bodies ============

    /// Validate and add a body; returns its id.
    ///
    /// Errors:
    /// - `Error::InvalidParam` for invalid geometry or kinematics.
    /// - `Error::Overlap` if the body would interpenetrate a body or barrier.
    pub fn add_body(&mut self, spec: BodySpec) -> Result<u64> {
        let slot = self.bodies.len();
        let id = slot as u64;
        let body = Body::from_spec(id, spec)?;

        for j in self.grid.neighbors_for_extent(&body.center(), body.extent()) {
            let other = &self.bodies[j];
            if bodies_overlap(&body, other) {
                return Err(Error::Overlap(format!(
                    "new body at ({}, {}) overlaps body {}",
                    body.center()[0],
                    body.center()[1],
                    other.id()
                )));
            }
        }
        if let Some(line) = self.boundaries.iter().find(|l| crosses_line(&body, l.position)) {
            return Err(Error::Overlap(format!(
                "new body straddles the barrier at x = {}",
                line.position
            )));
        }

        self.grid.ensure_extent(body.extent());
        self.grid.insert(slot, &body.center());
        trace!(
            "body {id}: {} sub-sphere(s), mass {}, tracked {}",
            body.spheres().len(),
            body.mass(),
            body.is_tracked()
        );
        self.bodies.push(body);
        Ok(id)
    }

    /// Add a composite body from parallel sub-sphere arrays.
    #[allow(clippy::too_many_arguments)]
    pub fn add_molecule(
        &mut self,
        x: f64,
        y: f64,
        dx: &[f64],
        dy: &[f64],
        radii: &[f64],
        masses: &[f64],
        vx: f64,
        vy: f64,
        theta: f64,
        omega: f64,
        tracked: bool,
    ) -> Result<u64> {
        let n = dx.len();
        if dy.len() != n || radii.len() != n || masses.len() != n {
            return Err(Error::InvalidParam(format!(
                "sub-sphere arrays differ in length (dx {}, dy {}, radii {}, masses {})",
                n,
                dy.len(),
                radii.len(),
                masses.len()
            )));
        }
        let spheres = (0..n)
            .map(|k| SubSphere::new([dx[k], dy[k]], radii[k], masses[k]))
            .collect::<Result<Vec<_>>>()?;
        self.add_body(
            BodySpec::composite(x, y, spheres)
                .with_velocity(vx, vy)
                .with_rotation(theta, omega)
                .tracked(tracked),
        )
    }

    /// Add a single round body.
    #[allow(clippy::too_many_arguments)]
    pub fn add_sphere(
        &mut self,
        x: f64,
        y: f64,
        radius: f64,
        mass: f64,
        vx: f64,
        vy: f64,
        tracked: bool,
    ) -> Result<u64> {
        self.add_body(
            BodySpec::sphere(x, y, radius, mass)
                .with_velocity(vx, vy)
                .tracked(tracked),
        )
    }

    // ============ Snapshot / tracking export ============

    /// One row per body, in id order, at the current clock.
    pub fn snapshot(&self) -> Vec<SnapshotRow> {
        self.bodies.iter().map(|b| b.state(self.time_now)).collect()
    }

    /// [`snapshot`](Self::snapshot) as plain 8-tuples.
    pub fn snapshot_tuples(&self) -> Vec<SnapshotTuple> {
        self.bodies
            .iter()
            .map(|b| b.state(self.time_now).to_tuple())
            .collect()
    }

    /// Add single-sphere bodies described by `rows` without touching the clock.
    /// Returns the new ids in row order.
    pub fn load_snapshot<F>(&mut self, rows: &[SnapshotRow], mut tracked: F) -> Result<Vec<u64>>
    where
        F: FnMut(usize, &SnapshotRow) -> bool,
    {
        rows.iter()
            .enumerate()
            .map(|(i, row)| self.add_body(row.to_spec(tracked(i, row))))
            .collect()
    }

    /// Collision history of tracked bodies.
    pub fn tracking_log(&self) -> &TrackingLog {
        &self.tracking
    }

    /// Tracking records in time order.
    pub fn tracking_data(&self) -> &[TrackingRecord] {
        self.tracking.records()
    }

    /// Tracking records as plain 9-tuples.
    pub fn tracking_tuples(&self) -> Vec<TrackingTuple> {
        self.tracking.to_tuples()
    }

    // ============ Integration ============

    /// Advance the simulation by `interval`, resolving every collision on the way.
    ///
    /// The clock ends at exactly `time() + interval`.
    ///
    /// Errors:
    /// - `Error::InvalidParam` if `interval` is negative or not finite.
    pub fn run(&mut self, interval: f64) -> Result<()> {
        if !interval.is_finite() || interval < 0.0 {
            return Err(Error::InvalidParam(
                "interval must be finite and >= 0".into(),
            ));
        }
        let deadline = self.time_now + interval;
        let before = self.stats;

        self.state = IntegratorState::Advancing;
        let outcome = self.advance_to(deadline);
        self.state = IntegratorState::Idle;
        outcome?;

        debug!(
            "run to t = {}: {} pair, {} barrier collisions, {} rescans",
            self.time_now,
            self.stats.pair_collisions - before.pair_collisions,
            self.stats.barrier_collisions - before.barrier_collisions,
            self.stats.rescans - before.rescans
        );
        Ok(())
    }

    fn advance_to(&mut self, deadline: f64) -> Result<()> {
        loop {
            let remaining = deadline - self.time_now;
            let safe = self.safe_horizon();
            let window = remaining.min(safe);

            match self.next_event(window)? {
                Some(ev) => {
                    self.drift_all(ev.dt_f64(), deadline);
                    self.resolve(ev)?;
                }
                None if safe < remaining => {
                    // Bodies may now reach pairs the grid did not offer; re-file and rescan.
                    self.drift_all(safe, deadline);
                    self.stats.rescans += 1;
                }
                None => {
                    self.drift_all(remaining, deadline);
                    self.time_now = deadline;
                    return Ok(());
                }
            }
        }
    }

    /// Longest step during which no pair outside the grid neighbourhood can touch.
    fn safe_horizon(&self) -> f64 {
        if self.bodies.len() < 2 {
            return f64::INFINITY;
        }
        let v_max = self
            .bodies
            .iter()
            .map(Body::speed_bound)
            .fold(0.0_f64, f64::max);
        if v_max <= 0.0 {
            return f64::INFINITY;
        }
        self.grid.margin() / (2.0 * v_max)
    }

    /// Earliest barrier or pair event no later than `window` from now.
    fn next_event(&self, window: f64) -> Result<Option<Event>> {
        let motions: Vec<Vec<SphereMotion>> = self.bodies.iter().map(Body::motions).collect();
        let mut best: Option<Event> = None;

        for (slot, spheres) in motions.iter().enumerate() {
            for (line, xl) in self.boundaries.iter().enumerate() {
                if let Some(c) = earliest_line_contact(spheres, xl.position, window) {
                    if c.dt <= window {
                        let kind = EventKind::Barrier {
                            body: slot,
                            line,
                            sub: c.sub,
                            side: c.side,
                        };
                        keep_earliest(&mut best, Event::new(c.dt, kind)?);
                    }
                }
            }
        }

        for (i, j) in self.grid.candidate_pairs() {
            if let Some(c) = earliest_pair_contact(&motions[i], &motions[j], window) {
                if c.dt <= window {
                    let kind = EventKind::Pair {
                        i,
                        j,
                        sub_i: c.sub_a,
                        sub_j: c.sub_b,
                    };
                    keep_earliest(&mut best, Event::new(c.dt, kind)?);
                }
            }
        }

        Ok(best)
    }

    /// Move every body for `dt` and re-file it in the grid. The clock never
    /// passes `deadline`.
    fn drift_all(&mut self, dt: f64, deadline: f64) {
        if dt <= 0.0 {
            return;
        }
        for b in &mut self.bodies {
            b.drift(dt);
        }
        self.time_now = (self.time_now + dt).min(deadline);
        self.grid.rebuild(self.bodies.iter().map(Body::center));
    }

    fn resolve(&mut self, ev: Event) -> Result<()> {
        match ev.kind {
            EventKind::Barrier {
                body,
                line,
                sub,
                side,
            } => {
                let tag = self
                    .boundaries
                    .get(line)
                    .map(|l| l.policy.tag())
                    .ok_or_else(|| Error::InvalidParam(format!("no barrier with index {line}")))?;
                let energy =
                    self.boundaries
                        .apply(line, &mut self.bodies[body], sub, side, &mut self.rng)?;
                self.bodies[body].bump_collision_count();
                self.stats.barrier_collisions += 1;
                trace!(
                    "t = {}: body {} hit barrier {} ({:?}), E = {}",
                    self.time_now,
                    body,
                    line,
                    tag,
                    energy
                );
                self.record(body, tag);
            }
            EventKind::Pair { i, j, sub_i, sub_j } => {
                self.resolve_pair(i, j, sub_i, sub_j)?;
                self.bodies[i].bump_collision_count();
                self.bodies[j].bump_collision_count();
                self.stats.pair_collisions += 1;
                trace!("t = {}: bodies {} and {} collided", self.time_now, i, j);
                self.record(i, EventTag::Body);
                self.record(j, EventTag::Body);
            }
        }
        Ok(())
    }

    /// Elastic collision between sub-sphere `sub_i` of body `i` and `sub_j` of body `j`.
    ///
    /// Only the velocity component along the contact normal changes. If
    /// neither contact normal has a lever arm about its centre of mass the
    /// classic 1D exchange formula is used; otherwise a restitution-1 impulse
    /// at the contact point also updates both spins.
    fn resolve_pair(&mut self, i: usize, j: usize, sub_i: usize, sub_j: usize) -> Result<()> {
        let (a, b) = pair_mut(&mut self.bodies, i, j);

        // Unit normal at contact from a -> b
        let arm_a = a.arm(sub_i);
        let arm_b = b.arm(sub_j);
        let d = sub(&add(&b.center(), &arm_b), &add(&a.center(), &arm_a));
        let dist = norm(&d);
        if dist <= EPS_TIME {
            return Err(Error::MathError(
                "degenerate contact normal in body-body collision".into(),
            ));
        }
        let n = [d[0] / dist, d[1] / dist];

        let u = sub(&b.point_velocity(&arm_b), &a.point_velocity(&arm_a));
        let u_n = dot(&u, &n);
        if u_n >= 0.0 {
            return Ok(()); // Already separating
        }

        let lever_a = cross(&arm_a, &n);
        let lever_b = cross(&arm_b, &n);
        let k_rot =
            lever_a * lever_a * a.inverse_inertia() + lever_b * lever_b * b.inverse_inertia();
        if k_rot == 0.0 {
            let (mi, mj) = (a.mass(), b.mass());
            let fi = (2.0 * mj / (mi + mj)) * u_n;
            let fj = (2.0 * mi / (mi + mj)) * u_n;
            let (va, vb) = (a.velocity(), b.velocity());
            a.set_velocity([va[0] + fi * n[0], va[1] + fi * n[1]]);
            b.set_velocity([vb[0] - fj * n[0], vb[1] - fj * n[1]]);
        } else {
            let jn = -2.0 * u_n / (a.inverse_mass() + b.inverse_mass() + k_rot);
            a.apply_impulse(&scale(&n, -jn), &arm_a);
            b.apply_impulse(&scale(&n, jn), &arm_b);
        }
        Ok(())
    }

    fn record(&mut self, slot: usize, tag: EventTag) {
        let b = &self.bodies[slot];
        if !b.is_tracked() {
            return;
        }
        let (c, v) = (b.center(), b.velocity());
        self.tracking.push(TrackingRecord {
            id: b.id(),
            tag,
            time: self.time_now,
            mass: b.mass(),
            energy: b.kinetic_energy(),
            x: c[0],
            y: c[1],
            vx: v[0],
            vy: v[1],
        });
    }
}

// ============ Utility helpers ============

fn keep_earliest(best: &mut Option<Event>, candidate: Event) {
    if best.map_or(true, |b| candidate.precedes(&b, EPS_TIME)) {
        *best = Some(candidate);
    }
}

/// Mutable borrows of two distinct bodies, `i < j`.
fn pair_mut(bodies: &mut [Body], i: usize, j: usize) -> (&mut Body, &mut Body) {
    debug_assert!(i < j);
    let (lo, hi) = bodies.split_at_mut(j);
    (&mut lo[i], &mut hi[0])
}

fn bodies_overlap(a: &Body, b: &Body) -> bool {
    for ka in 0..a.spheres().len() {
        let pa = a.sphere_center(ka);
        let ra = a.spheres()[ka].radius;
        for kb in 0..b.spheres().len() {
            let pb = b.sphere_center(kb);
            let rb = b.spheres()[kb].radius;
            if norm(&sub(&pb, &pa)) < ra + rb - OVERLAP_SLACK {
                return true;
            }
        }
    }
    false
}

/// True if a sub-sphere cuts the line or its centre sits exactly on it.
fn crosses_line(body: &Body, line_x: f64) -> bool {
    (0..body.spheres().len()).any(|k| {
        let x = body.sphere_center(k)[0];
        x == line_x || (x - line_x).abs() < body.spheres()[k].radius - OVERLAP_SLACK
    })
}
