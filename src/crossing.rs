//! Directional line-crossing detection.
//!
//! Two horizontal lines split the frame: `upper` (smaller y) and `lower`
//! (larger y). A track crosses "up" when it moves from at-or-below the
//! lower line to strictly above it, and "down" when it moves from
//! at-or-above the upper line to strictly below it. Each track crosses at
//! most once.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::track::{Direction, Track, TrackId};
use crate::{Error, Result};

/// Pair of horizontal counting lines, as y-coordinates in frame pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossingLines {
    /// Line crossed by tracks moving down.
    pub upper: i32,

    /// Line crossed by tracks moving up.
    pub lower: i32,
}

impl CrossingLines {
    pub fn new(upper: i32, lower: i32) -> Result<Self> {
        let lines = Self { upper, lower };
        lines.validate()?;
        Ok(lines)
    }

    /// Place both lines at fractions of the frame height.
    ///
    /// `from_fractions(480, 2.0 / 5.0, 3.0 / 5.0)` gives lines at y = 192 and y = 288.
    pub fn from_fractions(frame_height: u32, upper: f64, lower: f64) -> Result<Self> {
        let h = f64::from(frame_height);
        Self::new((h * upper) as i32, (h * lower) as i32)
    }

    pub fn validate(&self) -> Result<()> {
        if self.upper >= self.lower {
            return Err(Error::InvalidConfig(format!(
                "upper line ({}) must be above lower line ({})",
                self.upper, self.lower
            )));
        }
        Ok(())
    }

    /// Classify a single step from `prev_y` to `curr_y`.
    ///
    /// Up is tested before down.
    pub fn classify(&self, prev_y: i32, curr_y: i32) -> Option<Direction> {
        if prev_y >= self.lower && curr_y < self.lower {
            Some(Direction::Up)
        } else if prev_y <= self.upper && curr_y > self.upper {
            Some(Direction::Down)
        } else {
            None
        }
    }
}

/// One-shot crossing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossingEvent {
    pub track_id: TrackId,
    pub direction: Direction,
}

/// Evaluates tracks against the counting lines.
#[derive(Debug, Clone)]
pub struct CrossingDetector {
    lines: CrossingLines,
}

impl CrossingDetector {
    pub fn new(lines: CrossingLines) -> Result<Self> {
        lines.validate()?;
        Ok(Self { lines })
    }

    pub fn lines(&self) -> &CrossingLines {
        &self.lines
    }

    /// Evaluate the latest step of a track.
    ///
    /// Eligibility is judged on the trajectory (history followed by the
    /// current position): one history entry plus the current position is
    /// enough. Tracks with fewer than two recorded positions and tracks that
    /// have already crossed never produce an event.
    pub fn evaluate(&self, track: &mut Track) -> Option<CrossingEvent> {
        if track.has_crossed() {
            return None;
        }

        let (prev, curr) = track.last_step()?;
        let direction = self.lines.classify(prev.y, curr.y)?;

        if !track.mark_crossed(direction) {
            return None;
        }

        debug!(
            track_id = track.id(),
            from = prev.y,
            to = curr.y,
            %direction,
            "track crossed counting line"
        );

        Some(CrossingEvent {
            track_id: track.id(),
            direction,
        })
    }
}
