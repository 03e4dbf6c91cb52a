//! Composite image assembly for the segmentation model.

use crate::core::errors::{PipelineError, PipelineResult};
use ndarray::{s, Array2, Array3};

/// The 3-band, channel-last image consumed by the segmentation collaborator.
///
/// Band 0 is a zero-filled placeholder; bands 1 and 2 hold the nuclear and
/// membrane planes respectively, cast to `f32`. No normalisation is applied
/// here; if a deployment wants one it happens before or after this step.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeImage {
    data: Array3<f32>,
}

impl CompositeImage {
    /// Returns the (height, width) of the composite.
    pub fn dimensions(&self) -> (usize, usize) {
        let shape = self.data.shape();
        (shape[0], shape[1])
    }

    /// Returns the underlying `(height, width, 3)` array.
    pub fn data(&self) -> &Array3<f32> {
        &self.data
    }
}

/// Builds a composite image from the two selected channel planes.
///
/// # Arguments
///
/// * `plane_a` - The primary (nuclear) channel plane.
/// * `plane_b` - The secondary (membrane) channel plane.
///
/// # Returns
///
/// The `(height, width, 3)` composite, or a shape-mismatch error if the
/// planes differ in spatial size. Mismatched planes are never cropped or
/// resized: silently resizing would corrupt the pixel-to-cell
/// correspondence downstream.
pub fn build_composite(
    plane_a: &Array2<f32>,
    plane_b: &Array2<f32>,
) -> PipelineResult<CompositeImage> {
    if plane_a.shape() != plane_b.shape() {
        return Err(PipelineError::shape_mismatch(
            plane_a.shape(),
            plane_b.shape(),
        ));
    }

    let (height, width) = plane_a.dim();
    let mut data = Array3::<f32>::zeros((height, width, 3));
    data.slice_mut(s![.., .., 1]).assign(plane_a);
    data.slice_mut(s![.., .., 2]).assign(plane_b);

    Ok(CompositeImage { data })
}
