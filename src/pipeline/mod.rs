//! Batch pipeline orchestration.
//!
//! This module contains the orchestrator that drives the two-stage
//! pipeline over every sample directory, the per-sample output tables, and
//! the aggregate run summary.

pub mod orchestrator;
pub mod summary;
pub mod tables;

pub use orchestrator::{discover_samples, BatchPipeline, PipelineOptions};
pub use summary::{PipelineRunSummary, SampleFailure};
pub use tables::{population_summary, write_cell_type_table, write_population_table, PopulationRow};
