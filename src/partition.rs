//! Splitting the record table into one file per distinct value.

use std::collections::HashMap;
use std::fs::create_dir_all;
use std::path::Path;

use tracing::{debug, info};

use crate::error::Result;
use crate::file_writer::write_table;
use crate::metrics::RunMetrics;
use crate::models::{Notice, PartitionFile, Table};
use crate::validation::InputValidator;

/// Files written and notices raised while partitioning
#[derive(Debug, Default)]
pub struct PartitionOutcome {
    /// Successfully written files, grouped by column in selection order
    pub files: Vec<PartitionFile>,
    /// Inline warnings and per-file errors
    pub notices: Vec<Notice>,
}

/// Distinct non-missing values of a column with the rows holding each, in first-appearance order
#[must_use]
pub fn distinct_values(table: &Table, col: usize) -> Vec<(String, Vec<usize>)> {
    let mut order: Vec<(String, Vec<usize>)> = Vec::new();
    let mut seen: HashMap<String, usize> = HashMap::new();

    for row in 0..table.len() {
        let cell = table.cell(row, col);
        if cell.is_missing() {
            continue;
        }
        let value = cell.display();
        if let Some(&slot) = seen.get(&value) {
            order[slot].1.push(row);
        } else {
            seen.insert(value.clone(), order.len());
            order.push((value, vec![row]));
        }
    }

    order
}

/// Write `<root>/<column>/<sanitized value>.xlsx` for every selected column and distinct value.
///
/// Only a failure to create `root` itself is returned as an error; everything else is
/// reported as a notice and skipped.
pub fn partition_records(records: &Table, columns: &[String], root: &Path, metrics: &RunMetrics) -> Result<PartitionOutcome> {
    create_dir_all(root)?;
    let mut outcome = PartitionOutcome::default();

    for column in columns {
        let Some(col) = records.column_index(column) else {
            outcome
                .notices
                .push(Notice::warning(format!("Column '{column}' not found in input file; skipped")));
            continue;
        };

        let folder = root.join(column);
        if let Err(e) = create_dir_all(&folder) {
            outcome
                .notices
                .push(Notice::error(format!("Error creating folder {column}: {e}")));
            continue;
        }

        // Stems already written in this folder
        let mut used: HashMap<String, String> = HashMap::new();
        let values = distinct_values(records, col);
        info!(column = %column, values = values.len(), "Splitting records");

        for (value, row_indices) in values {
            let stem = InputValidator::sanitize_file_stem(&value);
            if stem.is_empty() {
                metrics.record_partition_file(column, 0, false);
                outcome.notices.push(Notice::error(format!(
                    "Error saving file for value '{value}' in {column}: no usable characters for a file name"
                )));
                continue;
            }

            let file_name = format!("{stem}.xlsx");
            if let Some(previous) = used.get(&stem) {
                metrics.record_partition_file(column, 0, false);
                outcome.notices.push(Notice::error(format!(
                    "Error saving file {file_name}: value '{value}' collides with '{previous}' in {column}"
                )));
                continue;
            }

            let subset = records.select_rows(&row_indices);
            let path = folder.join(&file_name);

            match write_table(&subset, &path) {
                Ok(()) => {
                    debug!(path = %path.display(), rows = subset.len(), "Wrote partition file");
                    metrics.record_partition_file(column, subset.len(), true);
                    used.insert(stem.clone(), value.clone());
                    outcome.files.push(PartitionFile {
                        column: column.clone(),
                        value,
                        stem,
                        path,
                        rows: subset.len(),
                    });
                }
                Err(e) => {
                    metrics.record_partition_file(column, 0, false);
                    outcome
                        .notices
                        .push(Notice::error(format!("Error saving file {file_name}: {e}")));
                }
            }
        }
    }

    Ok(outcome)
}
