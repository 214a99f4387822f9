//! Detection struct for input to the tracker.

use crate::{Error, Result};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// A single blob candidate produced by the detector for one frame.
///
/// Detections carry no identity. They are consumed by the track store's
/// assignment step and discarded at the end of the frame tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Centroid x in frame pixels.
    pub cx: i32,

    /// Centroid y in frame pixels.
    pub cy: i32,

    /// Bounding box width.
    pub w: i32,

    /// Bounding box height.
    pub h: i32,

    /// Blob area (contour area, in square pixels).
    pub area: f64,
}

impl Detection {
    /// Create a new detection.
    ///
    /// # Arguments
    /// * `cx`, `cy` - Centroid in frame pixels
    /// * `w`, `h` - Bounding box size
    /// * `area` - Blob area
    pub fn new(cx: i32, cy: i32, w: i32, h: i32, area: f64) -> Self {
        Self { cx, cy, w, h, area }
    }

    /// Create a detection from image moments of a contour.
    ///
    /// The centroid is `(m10 / m00, m01 / m00)` truncated to whole pixels and
    /// the area is `m00`. Degenerate moments (`m00 == 0`) cannot produce a
    /// centroid and are rejected.
    pub fn from_moments(m00: f64, m10: f64, m01: f64, w: i32, h: i32) -> Result<Self> {
        if m00 == 0.0 || !m00.is_finite() {
            return Err(Error::InvalidDetection(format!(
                "degenerate moments: m00 = {}",
                m00
            )));
        }

        let cx = (m10 / m00) as i32;
        let cy = (m01 / m00) as i32;
        let detection = Self::new(cx, cy, w, h, m00);
        detection.validate()?;
        Ok(detection)
    }

    /// Centroid as a point.
    #[inline]
    pub fn centroid(&self) -> Point2<i32> {
        Point2::new(self.cx, self.cy)
    }

    /// Check that the detection describes a real blob.
    ///
    /// Rejects non-finite or non-positive areas and negative box sides.
    pub fn validate(&self) -> Result<()> {
        if !self.area.is_finite() || self.area <= 0.0 {
            return Err(Error::InvalidDetection(format!(
                "non-positive area {} at ({}, {})",
                self.area, self.cx, self.cy
            )));
        }

        if self.w < 0 || self.h < 0 {
            return Err(Error::InvalidDetection(format!(
                "negative bounding box {}x{} at ({}, {})",
                self.w, self.h, self.cx, self.cy
            )));
        }

        Ok(())
    }

    /// Whether this detection passes validation.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_detection_new() {
        let det = Detection::new(10, 20, 4, 8, 32.0);

        assert_eq!(det.cx, 10);
        assert_eq!(det.cy, 20);
        assert_eq!(det.centroid(), Point2::new(10, 20));
        assert!(det.is_valid());
    }

    #[test]
    fn test_detection_from_moments() {
        // m10 / m00 = 12.75 -> 12, m01 / m00 = 30.5 -> 30
        let det = Detection::from_moments(4.0, 51.0, 122.0, 2, 2).unwrap();

        assert_eq!(det.cx, 12);
        assert_eq!(det.cy, 30);
        assert_relative_eq!(det.area, 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_detection_from_degenerate_moments() {
        let result = Detection::from_moments(0.0, 10.0, 10.0, 5, 5);
        assert!(matches!(result, Err(Error::InvalidDetection(_))));
    }

    // ===== Validation =====

    #[test]
    fn test_detection_rejects_non_positive_area() {
        assert!(Detection::new(0, 0, 1, 1, 0.0).validate().is_err());
        assert!(Detection::new(0, 0, 1, 1, -3.0).validate().is_err());
        assert!(Detection::new(0, 0, 1, 1, f64::NAN).validate().is_err());
        assert!(Detection::new(0, 0, 1, 1, f64::INFINITY).validate().is_err());
    }

    #[test]
    fn test_detection_rejects_negative_box() {
        let det = Detection::new(5, 5, -1, 4, 10.0);
        assert!(matches!(det.validate(), Err(Error::InvalidDetection(_))));
    }

    #[test]
    fn test_detection_serde() {
        let det: Detection =
            serde_json::from_str(r#"{"cx": 1, "cy": 2, "w": 3, "h": 4, "area": 5.5}"#).unwrap();
        assert_eq!(det, Detection::new(1, 2, 3, 4, 5.5));
    }
}
