use serde::{Deserialize, Serialize};

/// What kind of collision produced a tracking record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventTag {
    /// Collision with another body.
    Body,
    /// Barrier hits, by barrier policy.
    Elastic,
    Fixed,
    Random,
    Multiplicative,
}

impl EventTag {
    /// Stable numeric code used in the exported 9-tuple.
    pub fn code(self) -> u8 {
        match self {
            EventTag::Body => 0,
            EventTag::Elastic => 1,
            EventTag::Fixed => 2,
            EventTag::Random => 3,
            EventTag::Multiplicative => 4,
        }
    }

    /// Inverse of [`code`](Self::code).
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(EventTag::Body),
            1 => Some(EventTag::Elastic),
            2 => Some(EventTag::Fixed),
            3 => Some(EventTag::Random),
            4 => Some(EventTag::Multiplicative),
            _ => None,
        }
    }
}

/// State of one tracked body right after one of its collisions.
///
/// `mass` is the body's total mass; `energy` includes rotation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackingRecord {
    pub id: u64,
    pub tag: EventTag,
    pub time: f64,
    pub mass: f64,
    pub energy: f64,
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
}

/// (id, event type code, time, mass, energy, x, y, vx, vy)
pub type TrackingTuple = (u64, u8, f64, f64, f64, f64, f64, f64, f64);

impl TrackingRecord {
    /// Record as a 9-tuple with the tag as its numeric code.
    pub fn to_tuple(&self) -> TrackingTuple {
        (
            self.id,
            self.tag.code(),
            self.time,
            self.mass,
            self.energy,
            self.x,
            self.y,
            self.vx,
            self.vy,
        )
    }
}

/// Append-only history of tracked-body collisions, in simulated-time order.
#[derive(Debug, Clone, Default)]
pub struct TrackingLog {
    records: Vec<TrackingRecord>,
}

impl TrackingLog {
    /// Empty log.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, record: TrackingRecord) {
        debug_assert!(
            self.records.last().map_or(true, |r| r.time <= record.time),
            "tracking records must arrive in time order"
        );
        self.records.push(record);
    }

    /// All records in time order.
    pub fn records(&self) -> &[TrackingRecord] {
        &self.records
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True before the first tracked collision.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in time order.
    pub fn iter(&self) -> impl Iterator<Item = &TrackingRecord> {
        self.records.iter()
    }

    /// Records of a single body.
    pub fn for_body(&self, id: u64) -> impl Iterator<Item = &TrackingRecord> {
        self.records.iter().filter(move |r| r.id == id)
    }

    /// All records as 9-tuples.
    pub fn to_tuples(&self) -> Vec<TrackingTuple> {
        self.records.iter().map(TrackingRecord::to_tuple).collect()
    }
}
