//! Collaborator trait seams.
//!
//! The pipeline treats volume decoding and the two model calls as external
//! collaborators behind narrow traits. The orchestrator is generic over
//! these traits, which is also what makes its failure-isolation behaviour
//! testable without any model runtime.

use crate::core::errors::PipelineResult;
use crate::domain::{CellMask, ImageVolume};
use crate::processors::CompositeImage;
use std::path::Path;

/// Trait for reading image volumes from disk.
///
/// The default implementation is [`crate::utils::TiffVolumeReader`]; other
/// container formats can be plugged in per deployment.
pub trait VolumeReader {
    /// Reads a volume from the given path.
    ///
    /// # Arguments
    ///
    /// * `path` - Path of the volume file.
    ///
    /// # Returns
    ///
    /// The decoded volume, or an error if the file cannot be read or does
    /// not decode to a supported layout.
    fn read_volume(&self, path: &Path) -> PipelineResult<ImageVolume>;
}

/// Trait for the cell segmentation model call.
///
/// The model itself is an opaque external system; implementations adapt it
/// to this contract.
pub trait CellSegmenter {
    /// Segments a composite image into a cell mask.
    ///
    /// # Arguments
    ///
    /// * `composite` - The 3-band model input image.
    /// * `use_wsi` - Whether to run in whole-slide mode.
    ///
    /// # Returns
    ///
    /// A mask with the same height and width as the composite, containing
    /// integer cell ids with background 0.
    fn segment(&self, composite: &CompositeImage, use_wsi: bool) -> PipelineResult<CellMask>;
}

/// Trait for the cell-type annotation model call.
pub trait CellAnnotator {
    /// Annotates every cell in a mask with a predicted cell type.
    ///
    /// # Arguments
    ///
    /// * `volume` - The original image volume.
    /// * `mask` - The segmentation mask produced for the volume.
    /// * `markers` - Configured marker names.
    /// * `mpp` - Microns per pixel of the image.
    ///
    /// # Returns
    ///
    /// One label per cell id, ordered by ascending id starting at 1.
    fn annotate(
        &self,
        volume: &ImageVolume,
        mask: &CellMask,
        markers: &[String],
        mpp: f64,
    ) -> PipelineResult<Vec<String>>;
}
