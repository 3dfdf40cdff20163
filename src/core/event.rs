use crate::core::geometry::Side;
use crate::error::{Error, Result};
use ordered_float::NotNan;
use std::cmp::Ordering;

/// Kinds of events the integrator resolves. Indices are body slots, which
/// follow ascending body id.
///
/// Among simultaneous events `Barrier` comes before `Pair`, then ascending
/// body slot (see [`Event::precedes`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Sub-sphere `sub` of body `body` reaches barrier `line` from `side`.
    Barrier {
        body: usize,
        line: usize,
        sub: usize,
        side: Side,
    },
    /// Sub-spheres `sub_i` of body `i` and `sub_j` of body `j` touch (i < j).
    Pair {
        i: usize,
        j: usize,
        sub_i: usize,
        sub_j: usize,
    },
}

impl EventKind {
    #[inline]
    fn order_key(&self) -> (u8, usize, usize, usize, usize) {
        match *self {
            EventKind::Barrier { body, line, sub, .. } => (0, body, line, sub, 0),
            EventKind::Pair { i, j, sub_i, sub_j } => (1, i, j, sub_i, sub_j),
        }
    }
}

/// A candidate event, `dt` after the current clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub dt: NotNan<f64>,
    pub kind: EventKind,
}

impl Event {
    /// Create a new event, validating that `dt` is finite and non-negative.
    pub fn new(dt: f64, kind: EventKind) -> Result<Self> {
        if !dt.is_finite() {
            return Err(Error::MathError(format!("event time {dt} is not finite")));
        }
        if dt < 0.0 {
            return Err(Error::MathError("event time cannot be negative".into()));
        }
        let dt = NotNan::new(dt).map_err(|_| Error::MathError("event time cannot be NaN".into()))?;
        Ok(Self { dt, kind })
    }

    /// Returns the raw f64 delay.
    #[inline]
    pub fn dt_f64(&self) -> f64 {
        self.dt.into_inner()
    }

    /// Whether `self` should be resolved before `other`. Delays within `tol`
    /// of each other count as simultaneous and fall back to the kind order.
    pub fn precedes(&self, other: &Self, tol: f64) -> bool {
        let (a, b) = (self.dt_f64(), other.dt_f64());
        if (a - b).abs() <= tol {
            return self
                .kind
                .order_key()
                .cmp(&other.kind.order_key())
                .then_with(|| self.dt.cmp(&other.dt))
                == Ordering::Less;
        }
        a < b
    }
}

/// Exact order: earlier delay first, kind order only on equal delays.
impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        self.dt
            .cmp(&other.dt)
            .then_with(|| self.kind.order_key().cmp(&other.kind.order_key()))
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use EventKind::Pair;

    fn barrier(body: usize, line: usize) -> EventKind {
        EventKind::Barrier {
            body,
            line,
            sub: 0,
            side: Side::Left,
        }
    }

    const PAIR: EventKind = Pair {
        i: 0,
        j: 1,
        sub_i: 0,
        sub_j: 0,
    };

    #[test]
    fn new_event_rejects_bad_time() {
        assert!(Event::new(f64::NAN, PAIR).is_err());
        assert!(Event::new(-1.0, PAIR).is_err());
        assert!(Event::new(f64::INFINITY, PAIR).is_err());
    }

    #[test]
    fn earlier_event_precedes() -> Result<()> {
        let e1 = Event::new(1.0, PAIR)?;
        let e2 = Event::new(2.0, barrier(0, 0))?;
        assert!(e1.precedes(&e2, 1e-12));
        assert!(!e2.precedes(&e1, 1e-12));
        Ok(())
    }

    #[test]
    fn tie_breaker_prefers_barrier_over_pair() -> Result<()> {
        let a = Event::new(5.0, PAIR)?;
        let b = Event::new(5.0 + 1e-14, barrier(3, 1))?;
        assert!(b.precedes(&a, 1e-12));
        assert!(!a.precedes(&b, 1e-12));
        Ok(())
    }

    #[test]
    fn tie_breaker_orders_by_body() -> Result<()> {
        let a = Event::new(1.0, barrier(2, 0))?;
        let b = Event::new(1.0, barrier(1, 5))?;
        assert!(b.precedes(&a, 1e-12));
        Ok(())
    }

    #[test]
    fn exact_order_puts_earlier_delay_first() -> Result<()> {
        let pair = Event::new(1.0, PAIR)?;
        let late_barrier = Event::new(3.0, barrier(0, 0))?;
        assert!(pair < late_barrier);

        let mut events = vec![late_barrier, pair, Event::new(1.0, barrier(4, 0))?];
        events.sort();
        assert_eq!(events[0].kind, barrier(4, 0));
        assert_eq!(events[1].kind, PAIR);
        assert_eq!(events[2], late_barrier);
        Ok(())
    }
}
