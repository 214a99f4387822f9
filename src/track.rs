//! Track struct for entities maintained by the track store.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Session-local track identifier.
pub type TrackId = u64;

/// Global ID counter for unique IDs across all stores in the process.
static GLOBAL_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Get the next global ID (unique across all stores).
/// Uses Relaxed ordering since we only need uniqueness, not memory ordering.
#[inline]
pub fn get_next_global_id() -> u64 {
    GLOBAL_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Allocates track ids for one store.
///
/// Session ids start at 1 and increase by one per track, so two runs over
/// the same input produce the same ids. Every track also receives a global
/// id that is unique for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct TrackIdFactory {
    next_id: TrackId,
}

impl TrackIdFactory {
    /// Create a new factory whose first id is 1.
    pub fn new() -> Self {
        Self { next_id: 1 }
    }

    /// Allocate the next pair of ids.
    ///
    /// Returns (id, global_id).
    pub fn next_ids(&mut self) -> (TrackId, u64) {
        let id = self.next_id;
        self.next_id += 1;
        (id, get_next_global_id())
    }

    /// Number of session ids issued so far.
    pub fn issued(&self) -> u64 {
        self.next_id - 1
    }
}

impl Default for TrackIdFactory {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether a track has already produced its crossing event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossingState {
    #[default]
    NotCrossed,
    Crossed,
}

/// Direction of a line crossing. "Up" is towards smaller y.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tracked entity maintained by the store.
///
/// Fields are private so the lifecycle invariants hold: the history only
/// grows by appending, the age is only reset by a match, and the crossing
/// state moves to `Crossed` at most once.
#[derive(Debug, Clone)]
pub struct Track {
    id: TrackId,
    global_id: u64,
    position: Point2<i32>,
    history: Vec<Point2<i32>>,
    age: u32,
    max_age: u32,
    crossing_state: CrossingState,
    direction: Option<Direction>,
}

impl Track {
    pub(crate) fn new(id: TrackId, global_id: u64, position: Point2<i32>, max_age: u32) -> Self {
        Self {
            id,
            global_id,
            position,
            history: Vec::new(),
            age: 0,
            max_age,
            crossing_state: CrossingState::NotCrossed,
            direction: None,
        }
    }

    /// Session-local id.
    pub fn id(&self) -> TrackId {
        self.id
    }

    /// Process-wide id.
    pub fn global_id(&self) -> u64 {
        self.global_id
    }

    /// Current position.
    pub fn position(&self) -> Point2<i32> {
        self.position
    }

    pub fn x(&self) -> i32 {
        self.position.x
    }

    pub fn y(&self) -> i32 {
        self.position.y
    }

    /// Past positions, oldest first. Does not include the current position.
    pub fn history(&self) -> &[Point2<i32>] {
        &self.history
    }

    /// History followed by the current position.
    pub fn trajectory(&self) -> impl Iterator<Item = Point2<i32>> + '_ {
        self.history.iter().copied().chain(std::iter::once(self.position))
    }

    /// The last `n` recorded positions, oldest first, ending with the current
    /// position. Always yields at least the current position.
    pub fn recent(&self, n: usize) -> impl Iterator<Item = Point2<i32>> + '_ {
        let start = self.history.len().saturating_sub(n.saturating_sub(1));
        self.history[start..]
            .iter()
            .copied()
            .chain(std::iter::once(self.position))
    }

    /// Number of positions ever recorded for this track.
    pub fn trajectory_len(&self) -> usize {
        self.history.len() + 1
    }

    /// The last two recorded positions as (previous, current).
    ///
    /// `None` until the track has been matched at least once.
    pub fn last_step(&self) -> Option<(Point2<i32>, Point2<i32>)> {
        self.history.last().map(|&prev| (prev, self.position))
    }

    /// Frames since the last successful match.
    pub fn age(&self) -> u32 {
        self.age
    }

    pub fn max_age(&self) -> u32 {
        self.max_age
    }

    /// Whether the track has gone unmatched for longer than `max_age`.
    pub fn is_timed_out(&self) -> bool {
        self.age > self.max_age
    }

    pub fn crossing_state(&self) -> CrossingState {
        self.crossing_state
    }

    pub fn has_crossed(&self) -> bool {
        self.crossing_state == CrossingState::Crossed
    }

    /// Direction of the crossing, if the track has crossed.
    pub fn direction(&self) -> Option<Direction> {
        self.direction
    }

    /// Move to a newly matched position.
    pub(crate) fn update_position(&mut self, position: Point2<i32>) {
        self.history.push(self.position);
        self.position = position;
        self.age = 0;
    }

    pub(crate) fn increment_age(&mut self) {
        self.age += 1;
    }

    /// Record the one-shot crossing. Returns false if the track had already crossed.
    pub(crate) fn mark_crossed(&mut self, direction: Direction) -> bool {
        if self.has_crossed() {
            return false;
        }
        self.crossing_state = CrossingState::Crossed;
        self.direction = Some(direction);
        true
    }
}
