// src/flatten/mod.rs
pub mod finalize;
pub mod merge;
pub mod universe;

pub use finalize::{finalize, FinalizeStats};
pub use merge::MergePlan;
pub use universe::collect_questions;

use crate::config::LanguageSource;
use crate::extract::{extract_cell, QaPairs};
use crate::table::Table;
use tracing::debug;

/// The pair-mappings of one language source, one entry per table row.
#[derive(Debug, Clone)]
pub struct SourcePairs {
    pub source: LanguageSource,
    pub rows: Vec<QaPairs>,
}

impl SourcePairs {
    /// Run the extractor over every cell of `source.column`.
    ///
    /// Returns `None` when the table has no such column.
    pub fn extract(table: &Table, source: &LanguageSource) -> Option<Self> {
        let cells = table.column(&source.column)?;
        let rows: Vec<QaPairs> = cells.map(extract_cell).collect();
        debug!(
            column = %source.column,
            rows = rows.len(),
            empty = rows.iter().filter(|p| p.is_empty()).count(),
            "extracted source column"
        );
        Some(Self {
            source: source.clone(),
            rows,
        })
    }

    /// Rows whose cell produced no pairs at all.
    pub fn empty_rows(&self) -> usize {
        self.rows.iter().filter(|p| p.is_empty()).count()
    }
}
