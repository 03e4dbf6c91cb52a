//! Command-backed model adapters.
//!
//! The segmentation and annotation models run out of process: each adapter
//! materialises its inputs as TIFF files in a scratch directory, invokes a
//! configured command, and reads the result back. A non-zero exit status
//! becomes a collaborator error carrying the command's stderr verbatim.
//!
//! Command contracts:
//!
//! - Segmenter: `<program> <composite.tiff> <mask.tiff> [--use-wsi]`.
//!   The composite is a single-page float RGB TIFF; the command writes the
//!   integer cell-id mask to the second path.
//! - Annotator: `<program> <image.tiff> <mask.tiff> --mpp <value>
//!   [--markers <a,b,c>]`. The command prints one cell-type label per
//!   line to stdout, ordered by ascending cell id starting at 1.

use crate::core::errors::{CollaboratorStage, PipelineError, PipelineResult};
use crate::core::traits::{CellAnnotator, CellSegmenter};
use crate::domain::{CellMask, ImageVolume};
use crate::processors::CompositeImage;
use crate::utils::{read_mask_tiff, write_composite_tiff, write_mask_tiff, write_volume_tiff};
use std::process::Command;
use tracing::debug;

/// Runs a configured command and returns its stdout, mapping launch
/// failures and non-zero exits to collaborator errors.
fn run_command(
    stage: CollaboratorStage,
    program: &str,
    command: &mut Command,
) -> PipelineResult<Vec<u8>> {
    let output = command.output().map_err(|e| {
        PipelineError::collaborator(stage, format!("failed to launch {}: {}", program, e))
    })?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(PipelineError::collaborator(
            stage,
            if stderr.is_empty() {
                format!("{} exited with {}", program, output.status)
            } else {
                stderr
            },
        ));
    }
    Ok(output.stdout)
}

/// Segmentation model adapter invoking an external command.
#[derive(Debug, Clone)]
pub struct CommandSegmenter {
    program: String,
}

impl CommandSegmenter {
    /// Creates an adapter for the given segmentation command.
    ///
    /// # Arguments
    ///
    /// * `program` - Path or name of the segmentation executable.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl CellSegmenter for CommandSegmenter {
    fn segment(&self, composite: &CompositeImage, use_wsi: bool) -> PipelineResult<CellMask> {
        let workdir = tempfile::tempdir()?;
        let composite_path = workdir.path().join("composite.tiff");
        let mask_path = workdir.path().join("mask.tiff");
        write_composite_tiff(composite, &composite_path)?;

        let mut command = Command::new(&self.program);
        command.arg(&composite_path).arg(&mask_path);
        if use_wsi {
            command.arg("--use-wsi");
        }
        debug!(program = %self.program, use_wsi, "invoking segmentation command");
        run_command(CollaboratorStage::Segmentation, &self.program, &mut command)?;

        read_mask_tiff(&mask_path)
    }
}

/// Annotation model adapter invoking an external command.
#[derive(Debug, Clone)]
pub struct CommandAnnotator {
    program: String,
}

impl CommandAnnotator {
    /// Creates an adapter for the given annotation command.
    ///
    /// # Arguments
    ///
    /// * `program` - Path or name of the annotation executable.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl CellAnnotator for CommandAnnotator {
    fn annotate(
        &self,
        volume: &ImageVolume,
        mask: &CellMask,
        markers: &[String],
        mpp: f64,
    ) -> PipelineResult<Vec<String>> {
        let workdir = tempfile::tempdir()?;
        let image_path = workdir.path().join("image.tiff");
        let mask_path = workdir.path().join("mask.tiff");
        write_volume_tiff(volume, &image_path)?;
        write_mask_tiff(mask, &mask_path)?;

        let mut command = Command::new(&self.program);
        command
            .arg(&image_path)
            .arg(&mask_path)
            .arg("--mpp")
            .arg(mpp.to_string());
        if !markers.is_empty() {
            command.arg("--markers").arg(markers.join(","));
        }
        debug!(program = %self.program, mpp, "invoking annotation command");
        let stdout = run_command(CollaboratorStage::Annotation, &self.program, &mut command)?;

        let labels: Vec<String> = String::from_utf8_lossy(&stdout)
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        Ok(labels)
    }
}
