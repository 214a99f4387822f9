//! Parser for recorded detection files.

use crate::{Detection, Error, Result};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::debug;

/// Largest frame number accepted when the frame count comes from the file.
pub const MAX_FRAME_NUMBER: usize = 100_000_000;

/// Parser for CSV detection recordings.
///
/// Reads lines in the format:
/// `frame,cx,cy,w,h,area`
///
/// Frame numbers are 1-indexed. Blank lines, `#` comments, a header row and
/// malformed rows are skipped. Frames with no rows replay as empty frames,
/// and rows within a frame keep their file order. Only frames that have rows
/// are stored.
pub struct DetectionFileParser {
    detections: BTreeMap<usize, Vec<Detection>>,
    num_frames: usize,
    current_frame: usize,
}

impl DetectionFileParser {
    /// Open a detection file. The frame count is the largest frame number found.
    pub fn new<P: AsRef<Path>>(file_path: P) -> Result<Self> {
        Self::open(file_path, None)
    }

    /// Open a detection file with a fixed frame count.
    ///
    /// Rows for frames beyond `num_frames` are ignored, and trailing frames
    /// without rows replay as empty frames.
    pub fn with_frame_count<P: AsRef<Path>>(file_path: P, num_frames: usize) -> Result<Self> {
        Self::open(file_path, Some(num_frames))
    }

    fn open<P: AsRef<Path>>(file_path: P, num_frames: Option<usize>) -> Result<Self> {
        let file = File::open(&file_path).map_err(|e| {
            Error::IoError(std::io::Error::new(
                e.kind(),
                format!(
                    "failed to open detection file '{}': {}",
                    file_path.as_ref().display(),
                    e
                ),
            ))
        })?;

        Self::from_reader(BufReader::new(file), num_frames)
    }

    /// Parse detections from any buffered reader.
    pub fn from_reader<R: BufRead>(reader: R, num_frames: Option<usize>) -> Result<Self> {
        let mut rows: Vec<(usize, Detection)> = Vec::new();

        for (line_idx, line_result) in reader.lines().enumerate() {
            let line = line_result.map_err(Error::IoError)?;
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            match parse_row(line) {
                Some((frame, detection)) => rows.push((frame, detection)),
                None => debug!(line = line_idx + 1, "skipping malformed detection row"),
            }
        }

        let frame_count = match num_frames {
            Some(n) => n,
            None => {
                let last = rows.iter().map(|&(frame, _)| frame).max().unwrap_or(0);
                if last > MAX_FRAME_NUMBER {
                    return Err(Error::ParseError(format!(
                        "frame number {} exceeds the limit of {}",
                        last, MAX_FRAME_NUMBER
                    )));
                }
                last
            }
        };

        let mut detections: BTreeMap<usize, Vec<Detection>> = BTreeMap::new();
        for (frame, detection) in rows {
            if frame == 0 || frame > frame_count {
                continue;
            }
            detections.entry(frame).or_default().push(detection);
        }

        Ok(Self {
            detections,
            num_frames: frame_count,
            current_frame: 0,
        })
    }

    /// Get detections for a specific frame (0-indexed).
    pub fn get_detections(&self, frame: usize) -> Option<&[Detection]> {
        if frame >= self.num_frames {
            return None;
        }
        Some(self.detections.get(&(frame + 1)).map_or(&[][..], Vec::as_slice))
    }

    /// Get the number of frames.
    pub fn num_frames(&self) -> usize {
        self.num_frames
    }
}

// Internal: parse `frame,cx,cy,w,h,area`
fn parse_row(line: &str) -> Option<(usize, Detection)> {
    let parts: Vec<&str> = line.split(',').map(str::trim).collect();
    if parts.len() < 6 {
        return None;
    }

    let frame: usize = parts[0].parse().ok()?;
    let cx: i32 = parts[1].parse().ok()?;
    let cy: i32 = parts[2].parse().ok()?;
    let w: i32 = parts[3].parse().ok()?;
    let h: i32 = parts[4].parse().ok()?;
    let area: f64 = parts[5].parse().ok()?;

    Some((frame, Detection::new(cx, cy, w, h, area)))
}

impl Iterator for DetectionFileParser {
    type Item = Vec<Detection>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_frame >= self.num_frames {
            return None;
        }

        self.current_frame += 1;
        Some(self.detections.remove(&self.current_frame).unwrap_or_default())
    }
}
