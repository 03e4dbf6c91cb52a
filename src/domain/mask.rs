//! Segmentation mask type.

use ndarray::Array2;

/// A cell segmentation mask.
///
/// Each element is an integer cell id; background pixels are 0. Cell ids
/// are contiguous from 1 as produced by the segmentation collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct CellMask {
    labels: Array2<u32>,
}

impl CellMask {
    /// Wraps a label array as a mask.
    pub fn new(labels: Array2<u32>) -> Self {
        Self { labels }
    }

    /// Returns the (height, width) of the mask.
    pub fn dimensions(&self) -> (usize, usize) {
        let shape = self.labels.shape();
        (shape[0], shape[1])
    }

    /// Returns the number of cells in the mask, i.e. the largest label.
    pub fn cell_count(&self) -> u32 {
        self.labels.iter().copied().max().unwrap_or(0)
    }

    /// Returns the underlying label array.
    pub fn labels(&self) -> &Array2<u32> {
        &self.labels
    }
}
