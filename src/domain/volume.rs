//! N-dimensional image volumes.

use ndarray::ArrayD;

/// An N-dimensional microscopy image volume (2 to 5 dimensions).
///
/// Samples are widened to `f32` when the volume is loaded; 8- and 16-bit
/// unsigned sources are exactly representable. The axis ordering is
/// whatever the source file produced, with no assumed channel position:
/// locating the channel axis is the job of
/// [`crate::processors::resolve_channel_axis`].
#[derive(Debug, Clone)]
pub struct ImageVolume {
    data: ArrayD<f32>,
}

impl ImageVolume {
    /// Wraps an array as an image volume.
    ///
    /// # Arguments
    ///
    /// * `data` - The raw sample array, 2 to 5 dimensions.
    ///
    /// # Returns
    ///
    /// Some(volume) if the dimensionality is in range, None otherwise.
    pub fn new(data: ArrayD<f32>) -> Option<Self> {
        if (2..=5).contains(&data.ndim()) {
            Some(Self { data })
        } else {
            None
        }
    }

    /// Returns the ordered shape of the volume.
    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    /// Returns the number of dimensions.
    pub fn ndim(&self) -> usize {
        self.data.ndim()
    }

    /// Returns the underlying sample array.
    pub fn data(&self) -> &ArrayD<f32> {
        &self.data
    }
}
