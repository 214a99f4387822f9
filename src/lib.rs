//! # Footfall - Line-Crossing Counter
//!
//! Frame-to-frame blob tracking and directional line-crossing counting for
//! stationary-camera footfall and occupancy counting.
//!
//! ## Features
//!
//! - Greedy, deterministic detection-to-track assignment with a pluggable
//!   match window (fixed pixels or detection bounding box)
//! - Frame-count timeout and eviction of stale tracks
//! - One-shot up/down crossing events against two configurable lines
//! - Session loop over pluggable detection sources and renderers
//! - CSV replay of recorded detections and CSV track logs
//!
//! ## Example
//!
//! ```rust
//! use footfall_rs::{Detection, FrameProcessor, ProcessorConfig};
//!
//! let config = ProcessorConfig::for_frame(640, 480);
//! let mut processor = FrameProcessor::new(config).unwrap();
//!
//! processor.process(vec![Detection::new(320, 300, 40, 90, 3600.0)]).unwrap();
//! let snapshot = processor.process(vec![Detection::new(320, 286, 40, 90, 3600.0)]).unwrap();
//!
//! assert_eq!(snapshot.counts.up_count, 1);
//! ```

// Public modules
pub mod detection;
pub mod track;
pub mod matching;
pub mod store;
pub mod crossing;
pub mod counter;
pub mod processor;
pub mod session;
pub mod io;

// Re-exports for convenience
pub use detection::Detection;
pub use track::{CrossingState, Direction, Track, TrackId};
pub use matching::MatchWindow;
pub use store::{AssignmentResult, TrackStore};
pub use crossing::{CrossingDetector, CrossingEvent, CrossingLines};
pub use counter::{Counter, CountsSnapshot};
pub use processor::{FrameProcessor, FrameSnapshot, ProcessorConfig, TrackSnapshot};
pub use session::{run_session, DetectionSource, Renderer, SessionSummary};

// Error types
pub use crate::error::{Error, Result};

mod error {
    use thiserror::Error;

    /// Errors that can occur while tracking and counting.
    #[derive(Error, Debug)]
    pub enum Error {
        #[error("Invalid configuration: {0}")]
        InvalidConfig(String),

        /// A detection that cannot describe a blob. Filtered out before
        /// assignment, never fatal.
        #[error("Invalid detection: {0}")]
        InvalidDetection(String),

        /// Internal defect in track bookkeeping. Processing must stop.
        #[error("Track invariant violation: {0}")]
        TrackInvariantViolation(String),

        #[error("Parse error: {0}")]
        ParseError(String),

        #[error("IO error: {0}")]
        IoError(#[from] std::io::Error),
    }

    impl Error {
        /// Whether the error indicates a defect that must stop processing.
        pub fn is_fatal(&self) -> bool {
            matches!(self, Error::TrackInvariantViolation(_))
        }
    }

    /// Result type for footfall operations
    pub type Result<T> = std::result::Result<T, Error>;

}
