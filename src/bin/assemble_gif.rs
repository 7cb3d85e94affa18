use anyhow::{Context, Result, anyhow};
use clap::Parser;
use photo_diary::animation::{AnimationRequest, LoopCount, assemble};
use photo_diary::config::setup_logging;
use photo_diary::constants::{
    ANIMATION_FILE_NAME, DEFAULT_FRAME_DURATION_SECS, DEFAULT_FRAME_WIDTH, DEFAULT_MAX_UPLOADS,
};
use photo_diary::ingest::{UploadedFile, ingest_uploads};
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

/// Stitch photos on disk into a looping GIF, the same way the album page does.
///
/// Minimal UX:
///   assemble_gif first.jpg second.png third.jpg
#[derive(Parser, Debug)]
#[command(name = "assemble_gif")]
#[command(about = "Build the class animation GIF from photos on disk")]
struct Args {
    /// Photos in playback order (jpg, jpeg or png)
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Frame width in pixels; heights keep each photo's aspect ratio
    #[arg(long, default_value_t = DEFAULT_FRAME_WIDTH)]
    width: u32,

    /// Seconds each photo stays on screen
    #[arg(long, default_value_t = DEFAULT_FRAME_DURATION_SECS)]
    duration: f32,

    /// How many times the animation plays; 0 loops forever
    #[arg(long, default_value_t = 0)]
    loop_count: u16,

    /// Maximum number of photos to read
    #[arg(long, default_value_t = DEFAULT_MAX_UPLOADS)]
    max_files: usize,

    /// Where to write the GIF
    #[arg(long, short, default_value = ANIMATION_FILE_NAME)]
    output: PathBuf,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

fn read_inputs(paths: &[PathBuf]) -> Result<Vec<UploadedFile>> {
    paths
        .iter()
        .map(|path| {
            let bytes =
                fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
            let file_name = path
                .file_name()
                .and_then(|name| name.to_str())
                .ok_or_else(|| anyhow!("Can't use {} as a file name", path.display()))?;
            Ok(UploadedFile::new(file_name, bytes))
        })
        .collect()
}

fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging(args.debug).map_err(|err| anyhow!("Failed to set up logging: {err}"))?;

    let files = read_inputs(&args.inputs)?;
    let outcome = ingest_uploads(files, args.max_files);
    for rejected in &outcome.rejected {
        warn!("Skipping {}", rejected);
    }
    if outcome.sequence.is_empty() {
        return Err(anyhow!("None of the inputs could be used as a frame"));
    }

    let request = AnimationRequest::new(
        outcome.sequence,
        args.width,
        args.duration,
        LoopCount(args.loop_count),
    )
    .context("Invalid animation settings")?;
    let artifact = assemble(&request).context("Failed to build the animation")?;

    fs::write(&args.output, &artifact.bytes)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    info!(
        "Saved {} frames ({}x{}) to {}",
        artifact.frame_count(),
        artifact.canvas_size.0,
        artifact.canvas_size.1,
        args.output.display()
    );
    Ok(())
}
