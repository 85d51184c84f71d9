// src/pipeline/mod.rs
use thiserror::Error;
use tracing::{info, info_span};

use crate::config::PipelineConfig;
use crate::flatten::{collect_questions, finalize, MergePlan, SourcePairs};
use crate::table::{Table, TableError};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("question {0:?} collides with an existing column")]
    ColumnCollision(String),
    #[error(transparent)]
    Table(#[from] TableError),
}

/// Counters from one run, for logs and the CLI summary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineReport {
    pub rows: usize,
    /// Languages whose source column was present, in processing order.
    pub sources: Vec<String>,
    pub cells_parsed: usize,
    /// Source cells that gave no pairs (blank, non-text or unparseable).
    pub cells_without_pairs: usize,
    pub questions: usize,
    pub answers_written: usize,
    pub answers_overridden: usize,
    pub collisions: usize,
    pub columns_dropped: usize,
    pub columns_swept: usize,
}

/// Two-pass flattening of embedded definition lists into question columns.
///
/// Holds only configuration; every call works on its own table and plan.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Extract, collect, merge and finalize. The input table is not modified.
    #[tracing::instrument(level = "info", skip_all, fields(rows = table.num_rows(), cols = table.num_columns()))]
    pub fn run(&self, table: &Table) -> Result<(Table, PipelineReport), PipelineError> {
        let mut report = PipelineReport {
            rows: table.num_rows(),
            ..Default::default()
        };

        // ─── 1) extract pair-mappings per present source ─────────────────
        let sources: Vec<SourcePairs> = {
            let _span = info_span!("extract").entered();
            self.config
                .sources
                .iter()
                .filter_map(|src| SourcePairs::extract(table, src))
                .collect()
        };
        for s in &sources {
            report.sources.push(s.source.language.clone());
            report.cells_parsed += s.rows.len();
            report.cells_without_pairs += s.empty_rows();
        }

        // ─── 2) question universe ────────────────────────────────────────
        let questions = collect_questions(&sources);
        report.questions = questions.len();

        // ─── 3) merge plan, later source wins ────────────────────────────
        let plan = MergePlan::build(questions, &sources, table.num_rows());
        report.answers_written = plan.written();
        report.answers_overridden = plan.overridden();

        // ─── 4) final table ──────────────────────────────────────────────
        let (out, stats) = finalize(table, &plan, &self.config)?;
        report.collisions = stats.collisions;
        report.columns_dropped = stats.dropped;
        report.columns_swept = stats.swept;

        info!(
            sources = ?report.sources,
            questions = report.questions,
            written = report.answers_written,
            overridden = report.answers_overridden,
            without_pairs = report.cells_without_pairs,
            "flattened"
        );
        Ok((out, report))
    }
}
