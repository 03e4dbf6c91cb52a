//! Output tables for annotated samples.
//!
//! Two CSV tables are written per sample: the per-cell label table
//! (`Cell_ID`, `Cell_Name`) and the population summary (`Cell_type`,
//! `Cell_Count`, `Percentages`). Both are fully determined by the
//! annotator's label sequence, so re-running an unchanged sample yields
//! byte-identical files.

use crate::core::errors::PipelineResult;
use std::path::Path;

/// One row of the population summary table.
#[derive(Debug, Clone, PartialEq)]
pub struct PopulationRow {
    /// The predicted cell type.
    pub cell_type: String,
    /// Number of cells with this type.
    pub count: usize,
    /// Share of all labelled cells, in percent, rounded to 4 decimals.
    pub percentage: f64,
}

/// Builds the population summary from the per-cell label sequence.
///
/// Rows are sorted by descending count; ties keep the order in which each
/// cell type was first encountered. Percentages are computed against the
/// number of labelled cells, so the rows always sum to 100% for a
/// non-empty input.
///
/// # Arguments
///
/// * `labels` - One label per cell id, ascending from 1.
///
/// # Returns
///
/// The summary rows, most numerous cell type first.
pub fn population_summary(labels: &[String]) -> Vec<PopulationRow> {
    let mut order: Vec<&str> = Vec::new();
    let mut counts: std::collections::HashMap<&str, usize> = std::collections::HashMap::new();
    for label in labels {
        let entry = counts.entry(label.as_str()).or_insert(0);
        if *entry == 0 {
            order.push(label.as_str());
        }
        *entry += 1;
    }

    let total = labels.len();
    let mut rows: Vec<PopulationRow> = order
        .into_iter()
        .map(|cell_type| {
            let count = counts[cell_type];
            let percentage = 100.0 * count as f64 / total as f64;
            PopulationRow {
                cell_type: cell_type.to_string(),
                count,
                percentage: (percentage * 10_000.0).round() / 10_000.0,
            }
        })
        .collect();

    // Stable sort keeps first-encounter order among equal counts.
    rows.sort_by(|a, b| b.count.cmp(&a.count));
    rows
}

/// Writes the per-cell label table.
///
/// # Arguments
///
/// * `labels` - One label per cell id, ascending from 1.
/// * `path` - Destination CSV path.
pub fn write_cell_type_table(labels: &[String], path: &Path) -> PipelineResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["Cell_ID", "Cell_Name"])?;
    for (index, label) in labels.iter().enumerate() {
        writer.write_record([(index + 1).to_string(), label.clone()])?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes the population summary table.
///
/// # Arguments
///
/// * `rows` - Summary rows from [`population_summary`].
/// * `path` - Destination CSV path.
pub fn write_population_table(rows: &[PopulationRow], path: &Path) -> PipelineResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["Cell_type", "Cell_Count", "Percentages"])?;
    for row in rows {
        writer.write_record([
            row.cell_type.clone(),
            row.count.to_string(),
            row.percentage.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}
