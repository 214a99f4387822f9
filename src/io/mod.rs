//! Recorded-detection input and track-log output.
//!
//! This module provides:
//! - `DetectionFileParser` - Replay detections recorded as CSV
//! - `TrackLogFile` - Write per-frame track rows as CSV

mod detection_file;
mod track_log;

pub use detection_file::DetectionFileParser;
pub use track_log::TrackLogFile;
