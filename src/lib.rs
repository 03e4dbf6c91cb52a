//! # codex-cell
//!
//! A Rust library for preparing multiplexed microscopy images for a
//! cell-segmentation model and driving a two-stage (segment → annotate)
//! pipeline across many independent samples.
//!
//! ## Features
//!
//! - Channel-axis resolution for volumes of unknown dimensionality (2D to
//!   5D, channel-first or channel-second layouts)
//! - Single-plane extraction with explicit edge-case policy
//! - 3-band composite assembly for model consumption
//! - Batch orchestration with per-sample fault isolation and a final
//!   partial-failure report
//! - Multi-page OME-TIFF volume loading and 16-bit mask output
//!
//! The segmentation and annotation models themselves are external
//! collaborators consumed through the traits in [`core::traits`].
//!
//! ## Modules
//!
//! * [`core`] - Error handling, configuration, and collaborator traits
//! * [`domain`] - Domain types: volumes, masks, sample records
//! * [`models`] - Adapters connecting the collaborator traits to model runtimes
//! * [`processors`] - Channel geometry resolution and composite assembly
//! * [`pipeline`] - Batch orchestration, output tables, and run summary
//! * [`utils`] - TIFF IO and preview rendering
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use codex_cell::pipeline::{BatchPipeline, PipelineOptions};
//! use codex_cell::utils::TiffVolumeReader;
//! use std::path::Path;
//!
//! # use codex_cell::core::{CellAnnotator, CellSegmenter, PipelineResult};
//! # use codex_cell::domain::{CellMask, ImageVolume};
//! # use codex_cell::processors::CompositeImage;
//! # struct MySegmenter;
//! # impl CellSegmenter for MySegmenter {
//! #     fn segment(&self, _: &CompositeImage, _: bool) -> PipelineResult<CellMask> {
//! #         unimplemented!()
//! #     }
//! # }
//! # struct MyAnnotator;
//! # impl CellAnnotator for MyAnnotator {
//! #     fn annotate(
//! #         &self,
//! #         _: &ImageVolume,
//! #         _: &CellMask,
//! #         _: &[String],
//! #         _: f64,
//! #     ) -> PipelineResult<Vec<String>> {
//! #         unimplemented!()
//! #     }
//! # }
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline = BatchPipeline::new(TiffVolumeReader::new(), MySegmenter, MyAnnotator);
//! let summary = pipeline.run_batch(Path::new("dataset"), Path::new("results"))?;
//! print!("{summary}");
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod domain;
pub mod models;
pub mod pipeline;
pub mod processors;
pub mod utils;

/// Prelude module for convenient imports.
///
/// Bring the essentials into scope with a single use statement:
///
/// ```rust
/// use codex_cell::prelude::*;
/// ```
pub mod prelude {
    // Batch pipeline (essential)
    pub use crate::pipeline::{BatchPipeline, PipelineOptions, PipelineRunSummary};

    // Collaborator seams
    pub use crate::core::{CellAnnotator, CellSegmenter, VolumeReader};

    // Error handling (essential)
    pub use crate::core::{PipelineError, PipelineResult};

    // Geometry resolution
    pub use crate::processors::{build_composite, resolve_channel_axis, select_channel_planes};

    // Volume IO (minimal)
    pub use crate::utils::TiffVolumeReader;
}
