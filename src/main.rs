// Example runner for the `coin_vision` library: feeds a directory of still frames
// through a `CoinPipeline` and prints the final coin count.

use anyhow::{Context, Result, bail};
use clap::Parser;
use coin_vision::core_modules::annotation::draw_annotations;
use coin_vision::core_modules::pixel_buffer::PixelBuffer;
use coin_vision::{CoinPipeline, PipelineConfig};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const FRAME_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

#[derive(Parser, Debug)]
#[command(name = "coin_vision", about = "Count coins in a sequence of video frames")]
struct Args {
    /// Directory of frames, processed in lexical file-name order.
    #[arg(long, value_name = "DIR")]
    frames: PathBuf,
    /// Optional TOML file overriding the default thresholds.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Optional directory for annotated copies of every frame.
    #[arg(long, value_name = "DIR")]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_target(false).init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    let mut pipeline = CoinPipeline::new(config).context("building pipeline")?;

    let frames = list_frames(&args.frames)?;
    if frames.is_empty() {
        bail!("no frames found in {}", args.frames.display());
    }
    if let Some(dir) = &args.output {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    let settings = pipeline.config();
    info!(
        frames = frames.len(),
        dir = %args.frames.display(),
        min_area = settings.filter.min_area,
        dwell_frames = settings.tracker.dwell_frames,
        "starting"
    );

    for (i, path) in frames.iter().enumerate() {
        let frame_index = i as u64 + 1;
        let mut frame = match load_frame(path) {
            Ok(frame) => frame,
            Err(err) => {
                warn!(frame = frame_index, error = %format!("{err:#}"), "unreadable frame skipped");
                continue;
            }
        };

        // A bad frame is skipped; the pipeline has already logged why.
        let Ok(report) = pipeline.process_frame(&frame, frame_index) else {
            continue;
        };

        if let Some(dir) = &args.output {
            draw_annotations(&mut frame, &report.annotations);
            let Some(name) = path.file_name() else {
                warn!(path = %path.display(), "frame has no file name, not written");
                continue;
            };
            let target = dir.join(name).with_extension("png");
            frame
                .to_rgb_image()?
                .save(&target)
                .with_context(|| format!("writing {}", target.display()))?;
        }
    }

    let counts = pipeline.counts();
    for line in counts.to_string().lines() {
        info!("{line}");
    }
    info!(
        total = counts.total(),
        value_cents = counts.value_cents(),
        "finished"
    );
    Ok(())
}

fn load_frame(path: &Path) -> Result<PixelBuffer> {
    let image = image::open(path)
        .with_context(|| format!("reading {}", path.display()))?
        .to_rgb8();
    Ok(PixelBuffer::from_rgb_image(&image)?)
}

fn list_frames(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut frames = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("listing {}", dir.display()))? {
        let path = entry?.path();
        let is_frame = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| FRAME_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));
        if is_frame {
            frames.push(path);
        }
    }
    frames.sort();
    Ok(frames)
}
