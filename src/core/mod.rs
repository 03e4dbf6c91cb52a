//! The core module of the cell pipeline.
//!
//! This module contains the fundamental components shared by the geometry
//! resolver and the orchestrator:
//! - Error handling
//! - Per-sample configuration loading and discovery
//! - Collaborator trait seams
//!
//! It also provides re-exports of commonly used types and the tracing
//! initialisation helper.

pub mod config;
pub mod errors;
pub mod traits;

pub use config::{find_config_file, ChannelSpec, ConfigError, SampleConfig};
pub use errors::{CollaboratorStage, PipelineError, PipelineResult};
pub use traits::{CellAnnotator, CellSegmenter, VolumeReader};

/// Initializes the tracing subscriber for logging.
///
/// This function sets up the tracing subscriber with environment filter and
/// formatting layer. It's typically called at the start of an application
/// to enable logging.
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();
}
