//! Utility functions for the cell pipeline.
//!
//! This module provides TIFF volume IO and the side-by-side channel
//! preview written next to each sample's outputs as a sanity check on the
//! geometry resolution.

pub mod tiff;

pub use tiff::{
    read_mask_tiff, write_composite_tiff, write_mask_tiff, write_volume_tiff, TiffVolumeReader,
};

use crate::core::errors::PipelineResult;
use image::GrayImage;
use ndarray::Array2;
use std::path::Path;

/// Renders the two selected channel planes side by side as an 8-bit
/// grayscale PNG.
///
/// Each plane is scaled independently by its own maximum so that dim
/// channels stay visible; the scaling is display-only and never feeds back
/// into the pipeline.
///
/// # Arguments
///
/// * `plane_a` - The primary channel plane.
/// * `plane_b` - The secondary channel plane.
/// * `path` - Destination path for the PNG.
///
/// # Returns
///
/// Ok on success, or an error if the planes differ in shape or the image
/// cannot be written.
pub fn write_channel_preview(
    plane_a: &Array2<f32>,
    plane_b: &Array2<f32>,
    path: &Path,
) -> PipelineResult<()> {
    if plane_a.shape() != plane_b.shape() {
        return Err(crate::core::errors::PipelineError::shape_mismatch(
            plane_a.shape(),
            plane_b.shape(),
        ));
    }

    let (height, width) = plane_a.dim();
    let mut preview = GrayImage::new((width * 2) as u32, height as u32);

    for (offset, plane) in [(0usize, plane_a), (width, plane_b)] {
        let max = plane.iter().copied().fold(0.0f32, f32::max);
        let scale = if max > 0.0 { 255.0 / max } else { 0.0 };
        for ((y, x), &value) in plane.indexed_iter() {
            let pixel = (value * scale).round().clamp(0.0, 255.0) as u8;
            preview.put_pixel((offset + x) as u32, y as u32, image::Luma([pixel]));
        }
    }

    preview.save(path)?;
    Ok(())
}
