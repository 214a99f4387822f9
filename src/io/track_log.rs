//! CSV writer for per-frame track state.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::processor::FrameSnapshot;
use crate::session::Renderer;
use crate::track::CrossingState;
use crate::{Error, Result};

/// Writer for per-frame track rows.
///
/// The output format is CSV with columns:
/// `frame,id,x,y,state,direction`
///
/// Frame numbers are 1-indexed. `state` is `0` before the crossing and
/// `1` after; `direction` is `up`, `down` or empty. `finish` appends a
/// `#counts,<up>,<down>` line.
pub struct TrackLogFile<W: Write = BufWriter<File>> {
    writer: W,
    last_counts: Option<(u64, u64)>,
}

impl TrackLogFile {
    /// Create a track log at `path`, creating parent directories as needed.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                Error::IoError(std::io::Error::new(
                    e.kind(),
                    format!("failed to create log folder: {}", e),
                ))
            })?;
        }

        let file = File::create(path).map_err(|e| {
            Error::IoError(std::io::Error::new(
                e.kind(),
                format!("failed to create track log '{}': {}", path.display(), e),
            ))
        })?;

        Ok(Self::from_writer(BufWriter::new(file)))
    }
}

impl<W: Write> TrackLogFile<W> {
    /// Wrap an arbitrary writer.
    pub fn from_writer(writer: W) -> Self {
        Self {
            writer,
            last_counts: None,
        }
    }

    /// Write every live track of a frame.
    pub fn update(&mut self, snapshot: &FrameSnapshot) -> Result<()> {
        let frame = snapshot.frame_index + 1;

        for track in &snapshot.tracks {
            let state = match track.crossing_state {
                CrossingState::NotCrossed => 0,
                CrossingState::Crossed => 1,
            };
            let direction = track.direction.map(|d| d.as_str()).unwrap_or("");

            writeln!(
                self.writer,
                "{},{},{},{},{},{}",
                frame, track.id, track.x, track.y, state, direction
            )?;
        }

        self.last_counts = Some((snapshot.counts.up_count, snapshot.counts.down_count));
        Ok(())
    }

    /// Append the final counts line and flush.
    pub fn finish(&mut self) -> Result<()> {
        let (up, down) = self.last_counts.unwrap_or((0, 0));
        writeln!(self.writer, "#counts,{},{}", up, down)?;
        self.flush()
    }

    /// Flush the writer.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush().map_err(Error::IoError)
    }
}

impl<W: Write> Renderer for TrackLogFile<W> {
    fn render(&mut self, snapshot: &FrameSnapshot) -> Result<()> {
        self.update(snapshot)
    }
}

impl<W: Write> Drop for TrackLogFile<W> {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}
