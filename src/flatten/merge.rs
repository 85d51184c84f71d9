use std::collections::HashMap;

use tracing::trace;

use super::SourcePairs;

/// Output columns for every question, computed before the table is touched.
///
/// Sources are applied in the order given; a later source overwrites what an
/// earlier one wrote for the same row and question ("later source wins").
#[derive(Debug, Clone, PartialEq)]
pub struct MergePlan {
    questions: Vec<String>,
    /// `columns[q][row]`, `None` until some source answers it.
    columns: Vec<Vec<Option<String>>>,
    written: usize,
    overridden: usize,
}

impl MergePlan {
    pub fn build(questions: Vec<String>, sources: &[SourcePairs], num_rows: usize) -> Self {
        let index: HashMap<&str, usize> = questions
            .iter()
            .enumerate()
            .map(|(i, q)| (q.as_str(), i))
            .collect();
        let mut columns = vec![vec![None; num_rows]; questions.len()];
        let mut written = 0;
        let mut overridden = 0;

        for src in sources {
            for (row, pairs) in src.rows.iter().enumerate().take(num_rows) {
                for (question, answer) in pairs.iter() {
                    let Some(&q) = index.get(question) else {
                        continue;
                    };
                    let slot = &mut columns[q][row];
                    if let Some(prev) = slot.replace(answer.to_string()) {
                        trace!(
                            row,
                            question,
                            language = %src.source.language,
                            previous = %prev,
                            "answer overridden by later source"
                        );
                        overridden += 1;
                    }
                    written += 1;
                }
            }
        }

        Self {
            questions,
            columns,
            written,
            overridden,
        }
    }

    pub fn questions(&self) -> &[String] {
        &self.questions
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Answers written, counting overrides.
    pub fn written(&self) -> usize {
        self.written
    }

    /// Answers replaced by a later source.
    pub fn overridden(&self) -> usize {
        self.overridden
    }

    /// Cell value for `row` of question column `q`; unanswered cells are empty strings.
    pub fn value(&self, q: usize, row: usize) -> &str {
        self.columns[q][row].as_deref().unwrap_or("")
    }

    /// Question name with its full column of values.
    pub fn columns(&self) -> impl Iterator<Item = (&str, Vec<&str>)> {
        self.questions.iter().enumerate().map(move |(q, name)| {
            let values = (0..self.columns[q].len()).map(|r| self.value(q, r)).collect();
            (name.as_str(), values)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LanguageSource;
    use crate::extract::QaPairs;
    use crate::flatten::collect_questions;

    fn source(lang: &str, rows: Vec<Vec<(&str, &str)>>) -> SourcePairs {
        SourcePairs {
            source: LanguageSource::new(lang),
            rows: rows
                .into_iter()
                .map(|r| r.into_iter().collect::<QaPairs>())
                .collect(),
        }
    }

    #[test]
    fn test_later_source_wins() {
        let en = source("en", vec![vec![("Age", "30")]]);
        let fr = source("fr", vec![vec![("Age", "trente")]]);
        let sources = [en, fr];
        let plan = MergePlan::build(collect_questions(&sources), &sources, 1);
        assert_eq!(plan.value(0, 0), "trente");
        assert_eq!(plan.written(), 2);
        assert_eq!(plan.overridden(), 1);

        // reversed processing order reverses the winner
        let reversed = [sources[1].clone(), sources[0].clone()];
        let plan = MergePlan::build(collect_questions(&reversed), &reversed, 1);
        assert_eq!(plan.value(0, 0), "30");
    }

    #[test]
    fn test_language_specific_questions_stay_apart() {
        let en = source("en", vec![vec![("Name", "Alice")]]);
        let fr = source("fr", vec![vec![("Nom", "Alice")]]);
        let sources = [en, fr];
        let plan = MergePlan::build(collect_questions(&sources), &sources, 1);
        let cols: Vec<_> = plan.columns().collect();
        assert_eq!(cols, vec![("Name", vec!["Alice"]), ("Nom", vec!["Alice"])]);
        assert_eq!(plan.overridden(), 0);
    }

    #[test]
    fn test_unanswered_cells_default_to_empty() {
        let en = source(
            "en",
            vec![vec![("Q1", "a")], vec![], vec![("Q2", "c"), ("Q1", "b")]],
        );
        let sources = [en];
        let plan = MergePlan::build(collect_questions(&sources), &sources, 3);
        let cols: Vec<_> = plan.columns().collect();
        assert_eq!(
            cols,
            vec![("Q1", vec!["a", "", "b"]), ("Q2", vec!["", "", "c"])]
        );
    }

    #[test]
    fn test_empty_answer_from_later_source_still_overrides() {
        let en = source("en", vec![vec![("Q", "kept?")]]);
        let fr = source("fr", vec![vec![("Q", "")]]);
        let sources = [en, fr];
        let plan = MergePlan::build(collect_questions(&sources), &sources, 1);
        assert_eq!(plan.value(0, 0), "");
    }

    #[test]
    fn test_unknown_questions_are_ignored() {
        let en = source("en", vec![vec![("Known", "1"), ("Unknown", "2")]]);
        let sources = [en];
        let plan = MergePlan::build(vec!["Known".to_string()], &sources, 1);
        assert_eq!(plan.questions(), &["Known".to_string()]);
        assert_eq!(plan.written(), 1);
    }
}
