//! Domain types for the cell pipeline.
//!
//! This module groups the value types that flow between the geometry
//! resolver, the collaborators, and the orchestrator: image volumes,
//! segmentation masks, and per-sample processing records.

pub mod mask;
pub mod record;
pub mod volume;

pub use mask::CellMask;
pub use record::{SampleRecord, SampleStatus};
pub use volume::ImageVolume;
