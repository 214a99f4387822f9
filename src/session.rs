//! Frame loop connecting a detection source, the processor and a renderer.

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::counter::CountsSnapshot;
use crate::processor::{FrameProcessor, FrameSnapshot};
use crate::{Detection, Error, Result};

/// Upstream producer of per-frame detections.
///
/// Returns `None` once the source is exhausted.
pub trait DetectionSource {
    fn next_frame(&mut self) -> Option<Vec<Detection>>;
}

impl<I> DetectionSource for I
where
    I: Iterator<Item = Vec<Detection>>,
{
    fn next_frame(&mut self) -> Option<Vec<Detection>> {
        self.next()
    }
}

/// Downstream consumer of frame snapshots (overlay drawing, encoding, logging).
pub trait Renderer {
    fn render(&mut self, snapshot: &FrameSnapshot) -> Result<()>;
}

/// Renderer that discards every snapshot.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn render(&mut self, _snapshot: &FrameSnapshot) -> Result<()> {
        Ok(())
    }
}

/// Renderer that keeps every snapshot in memory.
#[derive(Debug, Default, Clone)]
pub struct CollectingRenderer {
    pub snapshots: Vec<FrameSnapshot>,
}

impl Renderer for CollectingRenderer {
    fn render(&mut self, snapshot: &FrameSnapshot) -> Result<()> {
        self.snapshots.push(snapshot.clone());
        Ok(())
    }
}

impl<R: Renderer + ?Sized> Renderer for &mut R {
    fn render(&mut self, snapshot: &FrameSnapshot) -> Result<()> {
        (**self).render(snapshot)
    }
}

/// Totals for a finished session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub frames: u64,
    pub counts: CountsSnapshot,
    pub tracks_created: u64,
}

/// Run frames from `source` through `processor` until the source ends.
///
/// Each snapshot is handed to `renderer` before the next frame is pulled.
/// Any error stops the loop and is returned. Fatal errors are logged at
/// error level, others at warn level.
pub fn run_session<S, R>(
    source: &mut S,
    processor: &mut FrameProcessor,
    renderer: &mut R,
) -> Result<SessionSummary>
where
    S: DetectionSource + ?Sized,
    R: Renderer + ?Sized,
{
    while let Some(detections) = source.next_frame() {
        let frame = processor.frames_processed();
        let snapshot = processor
            .process(detections)
            .map_err(|e| stopped(frame, e))?;
        renderer
            .render(&snapshot)
            .map_err(|e| stopped(frame, e))?;
    }

    let summary = SessionSummary {
        frames: processor.frames_processed(),
        counts: processor.counts(),
        tracks_created: processor.total_track_count(),
    };

    info!(
        frames = summary.frames,
        up = summary.counts.up_count,
        down = summary.counts.down_count,
        tracks = summary.tracks_created,
        "session finished"
    );

    Ok(summary)
}

fn stopped(frame: u64, err: Error) -> Error {
    if err.is_fatal() {
        error!(frame, error = %err, "tracking state is inconsistent, stopping session");
    } else {
        warn!(frame, error = %err, "stopping session");
    }
    err
}
