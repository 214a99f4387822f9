//! Detection-to-track matching.
//!
//! Matching is greedy and order-dependent: each detection takes the first
//! free track (in creation order) whose position lies inside the match
//! window around the detection centroid.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::track::TrackId;
use crate::{Detection, Error, Result, Track};

/// Default fixed window half-size in pixels.
pub const DEFAULT_WINDOW: i32 = 15;

/// Strategy for the spatial proximity window used in matching.
///
/// A track matches a detection when `|dx| <= tx` and `|dy| <= ty`, where
/// `(dx, dy)` is the offset between the track position and the detection
/// centroid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum MatchWindow {
    /// Constant tolerance in pixels.
    Fixed { x: i32, y: i32 },

    /// Tolerance taken from the detection's own bounding box (`tx = w`, `ty = h`).
    BoundingBox,
}

impl MatchWindow {
    /// Get a strategy by name.
    ///
    /// Supported names:
    /// - "fixed" - constant `x`/`y` tolerance
    /// - "bbox", "bounding_box" - tolerance from the detection bounding box
    pub fn from_name(name: &str, x: i32, y: i32) -> Result<Self> {
        match name {
            "fixed" => Ok(Self::Fixed { x, y }),
            "bbox" | "bounding_box" => Ok(Self::BoundingBox),
            _ => Err(Error::InvalidConfig(format!(
                "unknown match window strategy: {}",
                name
            ))),
        }
    }

    /// Check the strategy parameters.
    pub fn validate(&self) -> Result<()> {
        match *self {
            Self::Fixed { x, y } if x < 0 || y < 0 => Err(Error::InvalidConfig(format!(
                "match window must be non-negative, got {}x{}",
                x, y
            ))),
            _ => Ok(()),
        }
    }

    /// Tolerances `(tx, ty)` to use for a given detection.
    #[inline]
    pub fn tolerance(&self, detection: &Detection) -> (i32, i32) {
        match *self {
            Self::Fixed { x, y } => (x, y),
            Self::BoundingBox => (detection.w, detection.h),
        }
    }

    /// Whether `position` lies inside the window around `detection`.
    pub fn contains(&self, position: Point2<i32>, detection: &Detection) -> bool {
        let (tx, ty) = self.tolerance(detection);
        let offset = (position.cast::<i64>() - detection.centroid().cast::<i64>()).abs();
        offset.x <= i64::from(tx) && offset.y <= i64::from(ty)
    }
}

impl Default for MatchWindow {
    fn default() -> Self {
        Self::Fixed {
            x: DEFAULT_WINDOW,
            y: DEFAULT_WINDOW,
        }
    }
}

/// Find the first eligible track inside the window of `detection`.
///
/// # Arguments
/// * `tracks` - Candidate tracks in creation order
/// * `detection` - Detection to match
/// * `window` - Proximity strategy
/// * `is_free` - Whether a track may still be matched this frame
///
/// # Returns
/// Id of the first matching track, if any.
pub fn find_first_match<'a, I, F>(
    tracks: I,
    detection: &Detection,
    window: &MatchWindow,
    mut is_free: F,
) -> Option<TrackId>
where
    I: IntoIterator<Item = &'a Track>,
    F: FnMut(&Track) -> bool,
{
    tracks
        .into_iter()
        .find(|track| is_free(*track) && window.contains(track.position(), detection))
        .map(Track::id)
}
