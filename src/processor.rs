//! Per-frame orchestration.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::counter::{Counter, CountsSnapshot};
use crate::crossing::{CrossingDetector, CrossingEvent, CrossingLines};
use crate::matching::MatchWindow;
use crate::store::{TrackStore, DEFAULT_MAX_AGE};
use crate::track::{CrossingState, Direction, Track, TrackId};
use crate::{Detection, Error, Result};

/// Divisor applied to the frame area to get the default minimum blob area.
pub const AREA_DIVISOR: f64 = 250.0;

/// Most recent positions carried in each `TrackSnapshot::trail`.
pub const SNAPSHOT_TRAIL_LEN: usize = 16;

/// Configuration for the frame processor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    /// Minimum blob area. Smaller detections are discarded before assignment.
    pub area_threshold: f64,

    /// Counting lines.
    pub lines: CrossingLines,

    /// Proximity strategy for matching detections to tracks.
    pub match_window: MatchWindow,

    /// Frames a track may go unmatched before it is evicted.
    pub max_age: u32,
}

impl ProcessorConfig {
    /// Create a configuration with explicit lines and area threshold.
    ///
    /// # Arguments
    /// * `lines` - Counting lines
    /// * `area_threshold` - Minimum blob area
    pub fn new(lines: CrossingLines, area_threshold: f64) -> Self {
        Self {
            area_threshold,
            lines,
            match_window: MatchWindow::default(),
            max_age: DEFAULT_MAX_AGE,
        }
    }

    /// Defaults derived from the frame size.
    ///
    /// The area threshold is `width * height / 250` and the lines sit at
    /// 2/5 and 3/5 of the frame height.
    pub fn for_frame(width: u32, height: u32) -> Self {
        let area_threshold = f64::from(width) * f64::from(height) / AREA_DIVISOR;
        let h = i64::from(height);
        let row = |v: i64| i32::try_from(v).unwrap_or(i32::MAX);
        let lines = CrossingLines {
            upper: row(2 * h / 5),
            lower: row(3 * h / 5),
        };
        Self::new(lines, area_threshold)
    }

    /// Load a configuration from a JSON file. Missing fields take defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            Error::IoError(std::io::Error::new(
                e.kind(),
                format!("failed to read config '{}': {}", path.display(), e),
            ))
        })?;

        let config: Self = serde_json::from_str(&content).map_err(|e| {
            Error::ParseError(format!("invalid config '{}': {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.area_threshold.is_finite() || self.area_threshold < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "area_threshold must be a non-negative number, got {}",
                self.area_threshold
            )));
        }
        self.lines.validate()?;
        self.match_window.validate()?;
        Ok(())
    }
}

impl Default for ProcessorConfig {
    /// Defaults for a 640x480 frame.
    fn default() -> Self {
        Self::for_frame(640, 480)
    }
}

/// Renderer-facing view of one track.
///
/// The snapshot stays the same size however long the track lives. The full
/// trajectory is available through `FrameProcessor::store`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackSnapshot {
    pub id: TrackId,
    /// Process-wide id, unique across every processor.
    pub global_id: u64,
    pub x: i32,
    pub y: i32,
    pub crossing_state: CrossingState,
    pub direction: Option<Direction>,
    pub age: u32,
    /// Number of positions recorded over the track's life.
    pub trajectory_len: usize,
    /// Up to `SNAPSHOT_TRAIL_LEN` latest positions, oldest first, ending with
    /// the current position.
    pub trail: Vec<(i32, i32)>,
}

impl From<&Track> for TrackSnapshot {
    fn from(track: &Track) -> Self {
        Self {
            id: track.id(),
            global_id: track.global_id(),
            x: track.x(),
            y: track.y(),
            crossing_state: track.crossing_state(),
            direction: track.direction(),
            age: track.age(),
            trajectory_len: track.trajectory_len(),
            trail: track.recent(SNAPSHOT_TRAIL_LEN).map(|p| (p.x, p.y)).collect(),
        }
    }
}

/// Result of processing one frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSnapshot {
    /// Zero-based index of the frame.
    pub frame_index: u64,

    /// Live tracks in creation order.
    pub tracks: Vec<TrackSnapshot>,

    /// Counts after this frame.
    pub counts: CountsSnapshot,

    /// Crossings emitted during this frame.
    pub events: Vec<CrossingEvent>,
}

/// Drives the tracker one frame at a time.
///
/// `process` is the only entry point that mutates tracking state. It must
/// be called once per frame, in frame order.
#[derive(Debug, Clone)]
pub struct FrameProcessor {
    config: ProcessorConfig,
    store: TrackStore,
    detector: CrossingDetector,
    counter: Counter,
    frames_processed: u64,
}

impl FrameProcessor {
    /// Create a new processor with the given configuration.
    pub fn new(config: ProcessorConfig) -> Result<Self> {
        config.validate()?;

        let store = TrackStore::new(config.match_window, config.max_age)?;
        let detector = CrossingDetector::new(config.lines)?;

        Ok(Self {
            config,
            store,
            detector,
            counter: Counter::new(),
            frames_processed: 0,
        })
    }

    /// Process one frame of detections.
    ///
    /// # Arguments
    /// * `detections` - Detections in detector order
    ///
    /// # Returns
    /// Snapshot of the live tracks and counts after this frame.
    pub fn process<I>(&mut self, detections: I) -> Result<FrameSnapshot>
    where
        I: IntoIterator<Item = Detection>,
    {
        let frame_index = self.frames_processed;
        let accepted = self.filter_detections(frame_index, detections);

        let assignment = self.store.assign(&accepted)?;

        let mut events = Vec::new();
        for id in assignment.touched() {
            let track = self.store.get_mut(id).ok_or_else(|| {
                Error::TrackInvariantViolation(format!("touched track {} is not live", id))
            })?;

            if let Some(event) = self.detector.evaluate(track) {
                self.counter.record(&event);
                info!(
                    frame = frame_index,
                    track_id = event.track_id,
                    direction = %event.direction,
                    up = self.counter.up_count(),
                    down = self.counter.down_count(),
                    "crossing counted"
                );
                events.push(event);
            }
        }

        self.frames_processed += 1;

        trace!(
            frame = frame_index,
            live = self.store.len(),
            events = events.len(),
            "frame processed"
        );

        Ok(FrameSnapshot {
            frame_index,
            tracks: self.store.iter().map(TrackSnapshot::from).collect(),
            counts: self.counter.snapshot(),
            events,
        })
    }

    // Internal: drop invalid and undersized detections, keeping order
    fn filter_detections<I>(&self, frame_index: u64, detections: I) -> Vec<Detection>
    where
        I: IntoIterator<Item = Detection>,
    {
        detections
            .into_iter()
            .filter(|detection| {
                if let Err(err) = detection.validate() {
                    debug!(frame = frame_index, error = %err, "discarded detection");
                    return false;
                }
                if detection.area < self.config.area_threshold {
                    trace!(
                        frame = frame_index,
                        area = detection.area,
                        threshold = self.config.area_threshold,
                        "discarded detection below area threshold"
                    );
                    return false;
                }
                true
            })
            .collect()
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    pub fn store(&self) -> &TrackStore {
        &self.store
    }

    /// Current counts.
    pub fn counts(&self) -> CountsSnapshot {
        self.counter.snapshot()
    }

    /// Number of frames processed so far.
    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    /// Total number of tracks created in this session.
    pub fn total_track_count(&self) -> u64 {
        self.store.total_track_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn config() -> ProcessorConfig {
        ProcessorConfig::new(CrossingLines::new(20, 60).unwrap(), 10.0)
    }

    fn det(cx: i32, cy: i32) -> Detection {
        Detection::new(cx, cy, 8, 8, 64.0)
    }

    // ===== Configuration =====

    #[test]
    fn test_config_for_frame() {
        let config = ProcessorConfig::for_frame(640, 480);

        assert_relative_eq!(config.area_threshold, 640.0 * 480.0 / 250.0, epsilon = 1e-9);
        assert_eq!(config.lines, CrossingLines { upper: 192, lower: 288 });
        assert_eq!(config.match_window, MatchWindow::Fixed { x: 15, y: 15 });
        assert_eq!(config.max_age, 5);
    }

    #[test]
    fn test_config_for_huge_frame() {
        let config = ProcessorConfig::for_frame(640, u32::MAX);

        assert_eq!(config.lines.upper, 1_717_986_918);
        assert_eq!(config.lines.lower, i32::MAX);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_rejects_bad_values() {
        let mut config = config();
        config.area_threshold = -1.0;
        assert!(FrameProcessor::new(config).is_err());

        let mut config = self::config();
        config.lines = CrossingLines { upper: 60, lower: 20 };
        assert!(FrameProcessor::new(config).is_err());

        let mut config = self::config();
        config.match_window = MatchWindow::Fixed { x: 0, y: -1 };
        assert!(FrameProcessor::new(config).is_err());
    }

    #[test]
    fn test_config_partial_json_uses_defaults() {
        let config: ProcessorConfig =
            serde_json::from_str(r#"{"max_age": 9, "lines": {"upper": 10, "lower": 90}}"#).unwrap();

        assert_eq!(config.max_age, 9);
        assert_eq!(config.lines, CrossingLines { upper: 10, lower: 90 });
        assert_eq!(config.match_window, MatchWindow::default());
        assert_relative_eq!(config.area_threshold, ProcessorConfig::default().area_threshold);
    }

    #[test]
    fn test_config_from_json_file() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"area_threshold": 50.0, "match_window": {{"strategy": "bounding_box"}}}}"#
        )
        .unwrap();

        let config = ProcessorConfig::from_json_file(file.path()).unwrap();
        assert_relative_eq!(config.area_threshold, 50.0);
        assert_eq!(config.match_window, MatchWindow::BoundingBox);
    }

    #[test]
    fn test_config_from_invalid_json_file() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();

        let result = ProcessorConfig::from_json_file(file.path());
        assert!(matches!(result, Err(Error::ParseError(_))));
    }

    // ===== Filtering =====

    #[test]
    fn test_small_and_invalid_detections_discarded() {
        let mut processor = FrameProcessor::new(config()).unwrap();

        let snapshot = processor
            .process(vec![
                Detection::new(10, 10, 2, 2, 4.0),   // below threshold
                Detection::new(50, 50, 2, 2, 0.0),   // degenerate
                Detection::new(90, 90, 4, 4, 10.0),  // exactly at threshold
            ])
            .unwrap();

        assert_eq!(snapshot.tracks.len(), 1);
        assert_eq!((snapshot.tracks[0].x, snapshot.tracks[0].y), (90, 90));
    }

    // ===== Processing =====

    #[test]
    fn test_process_counts_up_crossing() {
        let mut processor = FrameProcessor::new(config()).unwrap();

        let first = processor.process(vec![det(100, 70)]).unwrap();
        assert!(first.events.is_empty());
        assert_eq!(first.frame_index, 0);

        let second = processor.process(vec![det(100, 58)]).unwrap();
        assert_eq!(
            second.events,
            vec![CrossingEvent {
                track_id: 1,
                direction: Direction::Up
            }]
        );
        assert_eq!(second.counts, CountsSnapshot { up_count: 1, down_count: 0 });
        assert_eq!(second.tracks[0].direction, Some(Direction::Up));
        assert_eq!(second.tracks[0].trail, vec![(100, 70), (100, 58)]);
        assert_eq!(second.tracks[0].trajectory_len, 2);
    }

    #[test]
    fn test_process_counts_down_crossing() {
        let mut processor = FrameProcessor::new(config()).unwrap();

        processor.process(vec![det(40, 15)]).unwrap();
        let snapshot = processor.process(vec![det(40, 27)]).unwrap();

        assert_eq!(snapshot.counts, CountsSnapshot { up_count: 0, down_count: 1 });
        assert_eq!(snapshot.tracks[0].crossing_state, CrossingState::Crossed);
    }

    #[test]
    fn test_frame_counter_advances_on_empty_frames() {
        let mut processor = FrameProcessor::new(config()).unwrap();

        processor.process(Vec::new()).unwrap();
        let snapshot = processor.process(Vec::new()).unwrap();

        assert_eq!(snapshot.frame_index, 1);
        assert_eq!(processor.frames_processed(), 2);
        assert!(snapshot.tracks.is_empty());
    }

    #[test]
    fn test_snapshot_serializes() {
        let mut processor = FrameProcessor::new(config()).unwrap();
        let snapshot = processor.process(vec![det(5, 5)]).unwrap();

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["tracks"][0]["id"], 1);
        assert_eq!(json["tracks"][0]["global_id"], snapshot.tracks[0].global_id);
        assert_eq!(json["tracks"][0]["direction"], serde_json::Value::Null);
        assert_eq!(json["counts"]["up_count"], 0);
    }

    #[test]
    fn test_snapshot_trail_is_bounded() {
        let mut processor = FrameProcessor::new(config()).unwrap();

        let mut snapshot = processor.process(vec![det(100, 100)]).unwrap();
        for _ in 1..1_000 {
            snapshot = processor.process(vec![det(100, 100)]).unwrap();
        }

        let track = &snapshot.tracks[0];
        assert_eq!(track.trajectory_len, 1_000);
        assert_eq!(track.trail.len(), SNAPSHOT_TRAIL_LEN);
        assert_eq!(track.trail.last(), Some(&(100, 100)));

        // The full path is still reachable from the store
        let live = processor.store().get(track.id).unwrap();
        assert_eq!(live.trajectory().count(), 1_000);
    }

    #[test]
    fn test_snapshot_global_ids_differ_between_processors() {
        let mut first = FrameProcessor::new(config()).unwrap();
        let mut second = FrameProcessor::new(config()).unwrap();

        let a = first.process(vec![det(5, 5)]).unwrap();
        let b = second.process(vec![det(5, 5)]).unwrap();

        assert_eq!(a.tracks[0].id, b.tracks[0].id);
        assert_ne!(a.tracks[0].global_id, b.tracks[0].global_id);
    }
}
