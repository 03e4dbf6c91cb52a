//! Image processing for the cell pipeline.
//!
//! This module contains the geometry resolver that locates the channel axis
//! of an arbitrary-dimensional volume and extracts comparable 2D planes,
//! and the composite builder that assembles the 3-band model input.

pub mod composite;
pub mod geometry;

pub use composite::{build_composite, CompositeImage};
pub use geometry::{
    extract_plane, resolve_channel_axis, select_channel_planes, ChannelAxisResolution,
};
