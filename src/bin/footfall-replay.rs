//! Replay recorded detections through the footfall counter.
//!
//! Usage:
//!     footfall-replay detections.csv --width 640 --height 480
//!
//! Example:
//!     RUST_LOG=debug footfall-replay walk.csv --height 480 --lines 96,384 \
//!         --window bbox --log tracks.csv

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use footfall_rs::io::{DetectionFileParser, TrackLogFile};
use footfall_rs::session::NullRenderer;
use footfall_rs::{run_session, CrossingLines, FrameProcessor, MatchWindow, ProcessorConfig};

#[derive(Debug, Parser)]
#[command(name = "footfall-replay", about = "Count line crossings in recorded detections")]
struct Args {
    /// CSV file with rows `frame,cx,cy,w,h,area`
    detections: PathBuf,

    /// Number of frames to replay; frames past the last row replay as empty
    #[arg(long)]
    frames: Option<usize>,

    /// Frame width in pixels (used for the default area threshold)
    #[arg(long, default_value_t = 640)]
    width: u32,

    /// Frame height in pixels (used for default lines and area threshold)
    #[arg(long, default_value_t = 480)]
    height: u32,

    /// JSON configuration file; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Counting lines as `upper,lower` pixel rows
    #[arg(long, value_parser = parse_lines)]
    lines: Option<(i32, i32)>,

    /// Minimum blob area
    #[arg(long)]
    area_threshold: Option<f64>,

    /// Match window strategy: `fixed` or `bbox`
    #[arg(long)]
    window: Option<String>,

    /// Fixed window size in pixels (x and y)
    #[arg(long, default_value_t = 15)]
    window_size: i32,

    /// Frames a track may go unmatched before it is dropped
    #[arg(long)]
    max_age: Option<u32>,

    /// Write per-frame track rows to this CSV file
    #[arg(long)]
    log: Option<PathBuf>,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,
}

fn parse_lines(value: &str) -> std::result::Result<(i32, i32), String> {
    let (upper, lower) = value
        .split_once(',')
        .ok_or_else(|| format!("expected `upper,lower`, got `{}`", value))?;
    let upper = upper.trim().parse().map_err(|e| format!("bad upper line: {}", e))?;
    let lower = lower.trim().parse().map_err(|e| format!("bad lower line: {}", e))?;
    Ok((upper, lower))
}

fn build_config(args: &Args) -> Result<ProcessorConfig> {
    let mut config = match &args.config {
        Some(path) => ProcessorConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ProcessorConfig::for_frame(args.width, args.height),
    };

    if let Some((upper, lower)) = args.lines {
        config.lines = CrossingLines::new(upper, lower)?;
    }
    if let Some(area) = args.area_threshold {
        config.area_threshold = area;
    }
    if let Some(name) = &args.window {
        config.match_window = MatchWindow::from_name(name, args.window_size, args.window_size)?;
    }
    if let Some(max_age) = args.max_age {
        config.max_age = max_age;
    }

    config.validate()?;
    Ok(config)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = Args::parse();
    if args.width == 0 || args.height == 0 {
        bail!("frame size must be non-zero, got {}x{}", args.width, args.height);
    }

    let config = build_config(&args)?;
    tracing::info!(
        area_threshold = config.area_threshold,
        upper = config.lines.upper,
        lower = config.lines.lower,
        max_age = config.max_age,
        "configuration loaded"
    );

    let source = match args.frames {
        Some(frames) => DetectionFileParser::with_frame_count(&args.detections, frames),
        None => DetectionFileParser::new(&args.detections),
    };
    let mut source = source
        .with_context(|| format!("reading detections {}", args.detections.display()))?;
    let mut processor = FrameProcessor::new(config)?;

    let summary = match &args.log {
        Some(path) => {
            let mut log = TrackLogFile::create(path)
                .with_context(|| format!("creating track log {}", path.display()))?;
            let summary = run_session(&mut source, &mut processor, &mut log)?;
            log.finish()?;
            summary
        }
        None => run_session(&mut source, &mut processor, &mut NullRenderer)?,
    };

    if args.json {
        println!("{}", serde_json::to_string(&summary)?);
    } else {
        println!("frames: {}", summary.frames);
        println!("tracks: {}", summary.tracks_created);
        println!("UP: {}", summary.counts.up_count);
        println!("DOWN: {}", summary.counts.down_count);
    }

    Ok(())
}
