//! Error types for the cell pipeline.
//!
//! This module defines the error taxonomy used throughout the pipeline:
//! configuration errors, geometry errors raised while resolving channel
//! layout, shape mismatches between selected channel planes, and failures
//! reported by the segmentation/annotation collaborators. It also provides
//! utility functions for creating these errors with appropriate context.

use std::path::PathBuf;
use thiserror::Error;

/// Enum identifying which external collaborator raised an error.
///
/// This enum is used to identify which model call a `Collaborator` error
/// originated from when it is reported at the sample boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollaboratorStage {
    /// Error occurred in the segmentation model call.
    Segmentation,
    /// Error occurred in the annotation model call.
    Annotation,
}

impl std::fmt::Display for CollaboratorStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollaboratorStage::Segmentation => write!(f, "segmentation"),
            CollaboratorStage::Annotation => write!(f, "annotation"),
        }
    }
}

/// Enum representing the errors that can occur while processing a sample.
///
/// All variants except `Io` on the batch summary path are fatal for the
/// sample that raised them and are caught at the sample boundary by the
/// orchestrator; none of them abort the batch.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Error indicating a missing, ambiguous, or malformed sample configuration.
    #[error("configuration: {message}")]
    Configuration {
        /// A message describing the configuration problem.
        message: String,
    },

    /// Error raised while resolving image geometry.
    #[error("geometry: {message}")]
    Geometry {
        /// A message describing why geometry resolution failed.
        message: String,
    },

    /// Error indicating that two channel planes differ in spatial size.
    #[error("shape mismatch: {a:?} vs {b:?}")]
    ShapeMismatch {
        /// Shape of the first plane.
        a: Vec<usize>,
        /// Shape of the second plane.
        b: Vec<usize>,
    },

    /// Error reported by the segmentation or annotation collaborator.
    #[error("{stage} collaborator: {message}")]
    Collaborator {
        /// The model call where the error occurred.
        stage: CollaboratorStage,
        /// The collaborator's error message, captured verbatim.
        message: String,
    },

    /// Error occurred while reading or decoding an image volume.
    #[error("volume read {path}: {message}")]
    VolumeRead {
        /// Path of the volume that failed to load.
        path: PathBuf,
        /// A message describing the decode failure.
        message: String,
    },

    /// Error occurred while encoding or writing an output TIFF.
    #[error("tiff write {path}: {message}")]
    TiffWrite {
        /// Path the file was being written to.
        path: PathBuf,
        /// A message describing the encode failure.
        message: String,
    },

    /// Error from the image crate.
    #[error("image")]
    Image(#[from] image::ImageError),

    /// IO error.
    #[error("io")]
    Io(#[from] std::io::Error),

    /// CSV serialization error.
    #[error("csv")]
    Csv(#[from] csv::Error),
}

/// Implementation of PipelineError with utility functions for creating errors.
impl PipelineError {
    /// Creates a PipelineError for configuration problems.
    ///
    /// # Arguments
    ///
    /// * `message` - A message describing the configuration problem.
    ///
    /// # Returns
    ///
    /// A PipelineError instance.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a PipelineError for geometry resolution failures.
    ///
    /// # Arguments
    ///
    /// * `message` - A message describing why geometry resolution failed.
    ///
    /// # Returns
    ///
    /// A PipelineError instance.
    pub fn geometry(message: impl Into<String>) -> Self {
        Self::Geometry {
            message: message.into(),
        }
    }

    /// Creates a PipelineError for a channel index outside the resolved axis.
    ///
    /// # Arguments
    ///
    /// * `index` - The requested channel index.
    /// * `axis` - The resolved channel axis.
    /// * `axis_length` - The size of the resolved channel axis.
    ///
    /// # Returns
    ///
    /// A PipelineError instance.
    pub fn channel_out_of_bounds(index: usize, axis: usize, axis_length: usize) -> Self {
        Self::Geometry {
            message: format!(
                "channel index {} out of bounds for axis {} with size {}",
                index, axis, axis_length
            ),
        }
    }

    /// Creates a PipelineError for a plane shape mismatch.
    ///
    /// # Arguments
    ///
    /// * `a` - Shape of the first plane.
    /// * `b` - Shape of the second plane.
    ///
    /// # Returns
    ///
    /// A PipelineError instance.
    pub fn shape_mismatch(a: &[usize], b: &[usize]) -> Self {
        Self::ShapeMismatch {
            a: a.to_vec(),
            b: b.to_vec(),
        }
    }

    /// Creates a PipelineError for a collaborator failure, capturing the
    /// collaborator's message verbatim.
    ///
    /// # Arguments
    ///
    /// * `stage` - The model call where the error occurred.
    /// * `message` - The collaborator's error message.
    ///
    /// # Returns
    ///
    /// A PipelineError instance.
    pub fn collaborator(stage: CollaboratorStage, message: impl Into<String>) -> Self {
        Self::Collaborator {
            stage,
            message: message.into(),
        }
    }

    /// Creates a PipelineError for a volume that failed to load or decode.
    ///
    /// # Arguments
    ///
    /// * `path` - Path of the volume.
    /// * `message` - A message describing the decode failure.
    ///
    /// # Returns
    ///
    /// A PipelineError instance.
    pub fn volume_read(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::VolumeRead {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a PipelineError for a TIFF that failed to encode or write.
    ///
    /// # Arguments
    ///
    /// * `path` - Path the file was being written to.
    /// * `message` - A message describing the encode failure.
    ///
    /// # Returns
    ///
    /// A PipelineError instance.
    pub fn tiff_write(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::TiffWrite {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Implementation of From<crate::core::config::ConfigError> for PipelineError.
///
/// This allows config-loading errors to be automatically converted to the
/// crate-wide error type at the sample boundary.
impl From<crate::core::config::ConfigError> for PipelineError {
    fn from(error: crate::core::config::ConfigError) -> Self {
        Self::Configuration {
            message: error.to_string(),
        }
    }
}

/// A Result type alias using PipelineError.
pub type PipelineResult<T> = Result<T, PipelineError>;
