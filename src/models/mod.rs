//! Model adapters.
//!
//! Adapters that connect the pipeline's collaborator traits to actual
//! model runtimes. The shipped adapters invoke external commands; other
//! runtimes can be integrated by implementing
//! [`crate::core::traits::CellSegmenter`] and
//! [`crate::core::traits::CellAnnotator`] directly.

pub mod command;

pub use command::{CommandAnnotator, CommandSegmenter};
