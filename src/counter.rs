//! Cumulative directional crossing counts.

use serde::{Deserialize, Serialize};

use crate::crossing::CrossingEvent;
use crate::track::Direction;

/// Read-only view of the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CountsSnapshot {
    pub up_count: u64,
    pub down_count: u64,
}

impl CountsSnapshot {
    pub fn total(&self) -> u64 {
        self.up_count + self.down_count
    }
}

/// Session-cumulative crossing counter. Counts only ever increase.
#[derive(Debug, Clone, Default)]
pub struct Counter {
    up_count: u64,
    down_count: u64,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one crossing event.
    pub fn record(&mut self, event: &CrossingEvent) {
        match event.direction {
            Direction::Up => self.up_count += 1,
            Direction::Down => self.down_count += 1,
        }
    }

    pub fn up_count(&self) -> u64 {
        self.up_count
    }

    pub fn down_count(&self) -> u64 {
        self.down_count
    }

    pub fn total(&self) -> u64 {
        self.up_count + self.down_count
    }

    pub fn snapshot(&self) -> CountsSnapshot {
        CountsSnapshot {
            up_count: self.up_count,
            down_count: self.down_count,
        }
    }
}
