//! Per-sample processing records.
//!
//! A [`SampleRecord`] tracks one sample directory through the two-stage
//! pipeline as an explicit state machine. The success path is
//! `Pending -> Segmented -> Annotated`; any stage may instead transition the
//! record to the terminal `Failed` state with a captured error message.
//! Records are never shared across samples.

use std::path::PathBuf;

/// Processing status of a sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SampleStatus {
    /// The sample has been discovered but not yet processed.
    Pending,
    /// Segmentation completed and the mask was written.
    Segmented,
    /// Annotation completed and the output tables were written. Terminal.
    Annotated,
    /// A stage failed; the record's error carries the captured message.
    /// Terminal. Files written before the failure stay on disk but must not
    /// be trusted as complete.
    Failed,
}

impl std::fmt::Display for SampleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SampleStatus::Pending => write!(f, "pending"),
            SampleStatus::Segmented => write!(f, "segmented"),
            SampleStatus::Annotated => write!(f, "annotated"),
            SampleStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Record of one sample's trip through the pipeline.
#[derive(Debug, Clone)]
pub struct SampleRecord {
    /// Sample identifier, taken from the sample directory name.
    pub sample_id: String,
    /// The sample's input directory.
    pub input_dir: PathBuf,
    /// The per-sample output directory.
    pub output_dir: PathBuf,
    /// Current processing status.
    pub status: SampleStatus,
    /// Captured error message; present only in the `Failed` state.
    pub error: Option<String>,
}

impl SampleRecord {
    /// Creates a pending record for a discovered sample directory.
    ///
    /// # Arguments
    ///
    /// * `sample_id` - The sample identifier.
    /// * `input_dir` - The sample's input directory.
    /// * `output_dir` - The per-sample output directory.
    pub fn pending(
        sample_id: impl Into<String>,
        input_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            sample_id: sample_id.into(),
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            status: SampleStatus::Pending,
            error: None,
        }
    }

    /// Marks segmentation as complete.
    pub fn mark_segmented(&mut self) {
        self.status = SampleStatus::Segmented;
    }

    /// Marks annotation as complete. Terminal success state.
    pub fn mark_annotated(&mut self) {
        self.status = SampleStatus::Annotated;
    }

    /// Transitions the record to the terminal failed state, capturing the
    /// error message.
    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.status = SampleStatus::Failed;
        self.error = Some(error.into());
    }

    /// Returns true if the record reached the success terminal state.
    pub fn succeeded(&self) -> bool {
        self.status == SampleStatus::Annotated
    }
}
