//! Channel-axis resolution and 2D plane extraction.
//!
//! Multiplexed microscopy volumes arrive with inconsistent dimensionality
//! (2D to 5D) and no reliable channel-axis position: channel-first,
//! channel-second, and singleton-padded layouts all occur in the wild.
//! This module locates the channel axis heuristically and slices out a
//! single 2D (Y, X) plane per requested channel, so that downstream code
//! only ever deals in comparable 2D planes.

use crate::core::errors::{PipelineError, PipelineResult};
use crate::domain::ImageVolume;
use ndarray::{Array2, ArrayViewD, SliceInfoElem};
use tracing::{debug, warn};

/// Which dimension of a volume holds the channels.
///
/// Derived per image and never persisted; the same volume is re-resolved on
/// every run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelAxisResolution {
    /// Index of the channel axis in the volume's shape.
    pub axis: usize,
    /// Size of that axis.
    pub axis_length: usize,
}

/// Locates the channel axis of a volume shape.
///
/// Scans dimensions in original order and returns the first axis whose size
/// strictly exceeds `required_max_index`. This is a heuristic, not a
/// semantic guarantee: it assumes channel counts are large relative to
/// Z-stack depth or tile counts. When several axes qualify, the earliest
/// wins; in particular a spatial axis larger than the requested index will
/// shadow a later true channel axis.
///
/// # Arguments
///
/// * `shape` - The ordered dimension sizes of the volume.
/// * `required_max_index` - The largest channel index requested by
///   configuration.
///
/// # Returns
///
/// The resolved channel axis, or a geometry error if no axis can hold the
/// requested index. That error is fatal for the sample and never retried:
/// it indicates a shape/configuration mismatch a retry cannot fix.
pub fn resolve_channel_axis(
    shape: &[usize],
    required_max_index: usize,
) -> PipelineResult<ChannelAxisResolution> {
    for (axis, &axis_length) in shape.iter().enumerate() {
        if axis_length > required_max_index {
            debug!(axis, axis_length, "resolved channel axis");
            return Ok(ChannelAxisResolution { axis, axis_length });
        }
    }
    Err(PipelineError::geometry(format!(
        "cannot locate channel axis: no axis in shape {:?} can hold channel index {}",
        shape, required_max_index
    )))
}

/// Extracts a single 2D (Y, X) plane for one channel of a volume.
///
/// The selector fixes `channel_axis` to `channel_index`. Every other axis
/// that is not one of the trailing two (treated as the spatial Y/X plane)
/// and has size greater than 1 is fixed to index 0: extra Z-slices or
/// timepoints are truncated to the first plane, not averaged or projected.
/// Remaining size-1 axes are squeezed away. If the result is somehow still
/// higher than 2D, it is force-reshaped to the final two axis sizes in
/// row-major order; that path is a last-resort normalisation, drops data,
/// and logs a warning.
///
/// A volume that is already 2D is returned whole, ignoring the channel
/// selection: with no channel axis to resolve there is exactly one plane,
/// and every requested channel maps to it.
///
/// # Arguments
///
/// * `volume` - The source volume.
/// * `channel_axis` - The resolved channel axis.
/// * `channel_index` - The 0-based channel to select.
///
/// # Returns
///
/// A 2D plane whose shape equals the volume's trailing two axis sizes, or
/// a geometry error if the channel index is out of bounds.
pub fn extract_plane(
    volume: &ImageVolume,
    channel_axis: usize,
    channel_index: usize,
) -> PipelineResult<Array2<f32>> {
    let data = volume.data();
    let shape = data.shape();
    let ndim = data.ndim();

    if ndim == 2 {
        return Ok(data
            .view()
            .into_dimensionality::<ndarray::Ix2>()
            .expect("2-dimensional volume")
            .to_owned());
    }

    if channel_index >= shape[channel_axis] {
        return Err(PipelineError::channel_out_of_bounds(
            channel_index,
            channel_axis,
            shape[channel_axis],
        ));
    }

    let full = SliceInfoElem::Slice {
        start: 0,
        end: None,
        step: 1,
    };
    let mut selector: Vec<SliceInfoElem> = Vec::with_capacity(ndim);
    for axis in 0..ndim {
        if axis == channel_axis {
            selector.push(SliceInfoElem::Index(channel_index as isize));
        } else if axis >= ndim - 2 || shape[axis] == 1 {
            selector.push(full);
        } else {
            // Extra depth/time axis: take the first plane.
            selector.push(SliceInfoElem::Index(0));
        }
    }

    let sliced = data.slice(selector.as_slice());
    Ok(squeeze_to_plane(sliced))
}

/// Squeezes size-1 axes from a sliced view and materialises a 2D plane,
/// force-reshaping as a lossy last resort if extra non-singleton axes
/// survive.
fn squeeze_to_plane(view: ArrayViewD<'_, f32>) -> Array2<f32> {
    let mut plane = view.to_owned();
    while plane.ndim() > 2 {
        if let Some(axis) = plane.shape().iter().position(|&s| s == 1) {
            plane = plane.index_axis_move(ndarray::Axis(axis), 0);
            continue;
        }

        let shape = plane.shape().to_vec();
        let height = shape[shape.len() - 2];
        let width = shape[shape.len() - 1];
        warn!(
            ?shape,
            height, width, "plane still above 2 dimensions after squeeze; truncating to final two axes"
        );
        let truncated: Vec<f32> = plane.iter().copied().take(height * width).collect();
        return Array2::from_shape_vec((height, width), truncated)
            .expect("truncated buffer matches target shape");
    }
    plane
        .into_dimensionality::<ndarray::Ix2>()
        .expect("squeezed plane is 2-dimensional")
}

/// Extracts the 2D planes for a set of requested channel indices.
///
/// For volumes with more than two dimensions this resolves the channel axis
/// once and slices each requested channel. For 2D volumes, channel
/// resolution is skipped entirely and the same plane is returned for every
/// requested channel (degenerate case, not an error).
///
/// # Arguments
///
/// * `volume` - The source volume.
/// * `channel_indices` - The 0-based channels to select.
///
/// # Returns
///
/// One plane per requested channel, in request order.
pub fn select_channel_planes(
    volume: &ImageVolume,
    channel_indices: &[usize],
) -> PipelineResult<Vec<Array2<f32>>> {
    if volume.ndim() == 2 {
        debug!("volume is already 2D; reusing the single plane for every channel");
        let plane = extract_plane(volume, 0, 0)?;
        return Ok(vec![plane; channel_indices.len()]);
    }

    let required_max_index = channel_indices.iter().copied().max().unwrap_or(0);
    let resolution = resolve_channel_axis(volume.shape(), required_max_index)?;

    channel_indices
        .iter()
        .map(|&index| extract_plane(volume, resolution.axis, index))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{ArrayD, IxDyn};

    fn volume(shape: &[usize]) -> ImageVolume {
        let len: usize = shape.iter().product();
        let data = (0..len).map(|v| v as f32).collect();
        ImageVolume::new(ArrayD::from_shape_vec(IxDyn(shape), data).unwrap()).unwrap()
    }

    #[test]
    fn resolve_picks_lowest_qualifying_axis() {
        let resolved = resolve_channel_axis(&[4, 1, 512, 512], 2).unwrap();
        assert_eq!(
            resolved,
            ChannelAxisResolution {
                axis: 0,
                axis_length: 4
            }
        );
    }

    #[test]
    fn resolve_skips_axes_that_cannot_hold_the_index() {
        // Channel-second layout: axis 0 is a 3-deep Z stack, axis 1 holds 8 channels.
        let resolved = resolve_channel_axis(&[3, 8, 64, 64], 5).unwrap();
        assert_eq!(resolved.axis, 1);
        assert_eq!(resolved.axis_length, 8);
    }

    #[test]
    fn resolve_ties_break_toward_earlier_axis() {
        let resolved = resolve_channel_axis(&[8, 8, 64, 64], 5).unwrap();
        assert_eq!(resolved.axis, 0);
    }

    #[test]
    fn resolve_fails_when_no_axis_qualifies() {
        let err = resolve_channel_axis(&[2, 3, 4], 9).unwrap_err();
        assert!(err.to_string().contains("cannot locate channel axis"));
    }

    #[test]
    fn extract_returns_trailing_two_sizes() {
        let vol = volume(&[6, 1, 256, 256]);
        let plane = extract_plane(&vol, 0, 3).unwrap();
        assert_eq!(plane.shape(), &[256, 256]);
    }

    #[test]
    fn extract_selects_the_requested_channel() {
        // Shape (3, 2, 2): channel axis 0, planes of 4 elements each.
        let vol = volume(&[3, 2, 2]);
        let plane = extract_plane(&vol, 0, 2).unwrap();
        assert_eq!(plane.as_slice().unwrap(), &[8.0, 9.0, 10.0, 11.0]);
    }

    #[test]
    fn extract_truncates_depth_to_first_plane() {
        // (C, Z, Y, X) with Z = 4: the first Z slice is taken, never averaged.
        let vol = volume(&[2, 4, 2, 2]);
        let plane = extract_plane(&vol, 0, 1).unwrap();
        // Channel 1 starts at element 16; its first Z plane is elements 16..20.
        assert_eq!(plane.as_slice().unwrap(), &[16.0, 17.0, 18.0, 19.0]);
    }

    #[test]
    fn extract_rejects_out_of_bounds_channel() {
        let vol = volume(&[4, 8, 8]);
        let err = extract_plane(&vol, 0, 4).unwrap_err();
        assert!(matches!(err, PipelineError::Geometry { .. }));
        assert!(err.to_string().contains("out of bounds"));
    }

    #[test]
    fn extract_channel_second_layout() {
        // (Z, C, Y, X): axis 1 is the channel axis, Z is truncated to 0.
        let vol = volume(&[2, 5, 3, 3]);
        let plane = extract_plane(&vol, 1, 4).unwrap();
        assert_eq!(plane.shape(), &[3, 3]);
        // Z=0, C=4 begins at element 4 * 9 = 36.
        assert_eq!(plane[[0, 0]], 36.0);
    }

    #[test]
    fn two_dimensional_volume_reuses_the_whole_plane() {
        let vol = volume(&[4, 4]);
        let planes = select_channel_planes(&vol, &[0, 9]).unwrap();
        assert_eq!(planes.len(), 2);
        assert_eq!(planes[0], planes[1]);
        assert_eq!(planes[0].shape(), &[4, 4]);
    }

    #[test]
    fn select_resolves_once_and_extracts_each_channel() {
        let vol = volume(&[4, 1, 8, 8]);
        let planes = select_channel_planes(&vol, &[0, 3]).unwrap();
        assert_eq!(planes.len(), 2);
        assert_eq!(planes[0].shape(), &[8, 8]);
        assert_ne!(planes[0], planes[1]);
    }

    #[test]
    fn select_propagates_resolution_failure() {
        let vol = volume(&[2, 8, 8]);
        let err = select_channel_planes(&vol, &[0, 9]).unwrap_err();
        assert!(matches!(err, PipelineError::Geometry { .. }));
    }

    #[test]
    fn five_dimensional_volume_squeezes_to_a_plane() {
        let vol = volume(&[1, 3, 1, 4, 4]);
        let planes = select_channel_planes(&vol, &[2]).unwrap();
        assert_eq!(planes[0].shape(), &[4, 4]);
    }
}
