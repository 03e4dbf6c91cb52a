//! Batch CLI for the cell segmentation + annotation pipeline.
//!
//! Runs the two-stage pipeline over every sample sub-directory of the
//! input root and writes one output bundle per sample. Individual sample
//! failures are reported in the final summary without failing the
//! process; only a missing input root exits non-zero.
//!
//! # Usage
//!
//! ```bash
//! codex-cell dataset/ results/ \
//!     --segmenter /opt/models/run-cellseg \
//!     --annotator /opt/models/run-celltypes
//! ```

use clap::Parser;
use codex_cell::core::init_tracing;
use codex_cell::models::{CommandAnnotator, CommandSegmenter};
use codex_cell::pipeline::{BatchPipeline, PipelineOptions};
use codex_cell::utils::TiffVolumeReader;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

/// Command-line arguments for the batch pipeline.
#[derive(Parser)]
#[command(name = "codex-cell")]
#[command(about = "Cell segmentation + annotation over a dataset of sample directories")]
struct Args {
    /// Dataset root containing one sub-directory per sample.
    input_root: PathBuf,

    /// Directory to receive one output bundle per sample.
    output_root: PathBuf,

    /// Segmentation model command.
    #[arg(long, default_value = "cellseg-segment")]
    segmenter: String,

    /// Annotation model command.
    #[arg(long, default_value = "cellseg-annotate")]
    annotator: String,

    /// Process samples in parallel across a worker pool.
    #[arg(long)]
    parallel: bool,
}

fn main() -> ExitCode {
    init_tracing();
    let args = Args::parse();

    if !args.input_root.is_dir() {
        error!(input_root = %args.input_root.display(), "input root does not exist");
        return ExitCode::FAILURE;
    }

    let pipeline = BatchPipeline::new(
        TiffVolumeReader::new(),
        CommandSegmenter::new(args.segmenter),
        CommandAnnotator::new(args.annotator),
    )
    .with_options(PipelineOptions {
        parallel: args.parallel,
    });

    match pipeline.run_batch(&args.input_root, &args.output_root) {
        Ok(summary) => {
            info!(
                total = summary.total,
                succeeded = summary.succeeded,
                failed = summary.failed.len(),
                "batch complete"
            );
            print!("{summary}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, "batch aborted");
            ExitCode::FAILURE
        }
    }
}
