use std::collections::HashSet;

use tracing::{debug, warn};

use super::MergePlan;
use crate::config::{CollisionPolicy, PipelineConfig};
use crate::markup::{clean_markup, contains_markup};
use crate::pipeline::PipelineError;
use crate::table::{Cell, Table};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FinalizeStats {
    /// Source and mapping columns removed.
    pub dropped: usize,
    /// Questions that matched an existing column name.
    pub collisions: usize,
    /// Columns re-cleaned because a cell still carried markup.
    pub swept: usize,
}

/// Build the final table: original columns minus sources, then one column per question.
///
/// Absent source columns are ignored. After placement every column is checked
/// for markup residue and, if any cell has some, all text cells of that column
/// are cleaned.
pub fn finalize(
    table: &Table,
    plan: &MergePlan,
    config: &PipelineConfig,
) -> Result<(Table, FinalizeStats), PipelineError> {
    let mut stats = FinalizeStats::default();

    // 1) drop raw source + mapping columns, keep original order otherwise
    let dropped: HashSet<&str> = config.source_columns().collect();
    let keep: Vec<usize> = table
        .headers()
        .iter()
        .enumerate()
        .filter(|(_, h)| !dropped.contains(h.as_str()))
        .map(|(i, _)| i)
        .collect();
    stats.dropped = table.num_columns() - keep.len();

    let mut headers: Vec<String> = keep.iter().map(|&i| table.headers()[i].clone()).collect();
    let mut rows: Vec<Vec<Cell>> = table
        .rows()
        .iter()
        .map(|r| keep.iter().map(|&i| r[i].clone()).collect())
        .collect();

    // 2) place question columns
    for (name, values) in plan.columns() {
        let target = match headers.iter().position(|h| h == name) {
            None => None,
            Some(idx) => {
                stats.collisions += 1;
                match config.collision_policy {
                    CollisionPolicy::Overwrite => {
                        warn!(column = %name, "question overwrites existing column");
                        Some(idx)
                    }
                    CollisionPolicy::Rename => None,
                    CollisionPolicy::Error => {
                        return Err(PipelineError::ColumnCollision(name.to_string()));
                    }
                }
            }
        };

        match target {
            Some(idx) => {
                for (row, value) in rows.iter_mut().zip(values) {
                    row[idx] = Cell::Text(value.to_string());
                }
            }
            None => {
                let header = unique_name(&headers, name);
                if header != name {
                    warn!(question = %name, column = %header, "question column renamed");
                }
                headers.push(header);
                for (row, value) in rows.iter_mut().zip(values) {
                    row.push(Cell::Text(value.to_string()));
                }
            }
        }
    }

    // 3) final sweep for leftover markup
    for (col, header) in headers.iter().enumerate() {
        let dirty = rows
            .iter()
            .any(|r| r[col].as_text().is_some_and(contains_markup));
        if !dirty {
            continue;
        }
        debug!(column = %header, "markup residue found, re-cleaning column");
        stats.swept += 1;
        for row in rows.iter_mut() {
            if let Cell::Text(s) = &mut row[col] {
                *s = clean_markup(s);
            }
        }
    }

    let out = Table::new(headers, rows)?;
    Ok((out, stats))
}

/// `name`, or `name (n)` with the smallest free `n >= 2`.
fn unique_name(headers: &[String], name: &str) -> String {
    if !headers.iter().any(|h| h == name) {
        return name.to_string();
    }
    (2..)
        .map(|n| format!("{} ({})", name, n))
        .find(|candidate| !headers.iter().any(|h| h == candidate))
        .unwrap_or_else(|| name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LanguageSource;
    use crate::extract::QaPairs;
    use crate::flatten::{collect_questions, SourcePairs};

    fn plan_for(rows: Vec<Vec<(&str, &str)>>) -> MergePlan {
        let n = rows.len();
        let sources = [SourcePairs {
            source: LanguageSource::new("en"),
            rows: rows
                .into_iter()
                .map(|r| r.into_iter().collect::<QaPairs>())
                .collect(),
        }];
        MergePlan::build(collect_questions(&sources), &sources, n)
    }

    fn text(s: &str) -> Cell {
        Cell::from(s)
    }

    #[test]
    fn test_drops_sources_and_appends_questions() {
        let table = Table::new(
            vec![
                "id".into(),
                "body/en".into(),
                "parsed_xml_en".into(),
                "title".into(),
            ],
            vec![vec![Cell::Int(1), text("raw"), text("{}"), text("T")]],
        )
        .unwrap();
        let plan = plan_for(vec![vec![("B", "2"), ("A", "1")]]);
        let (out, stats) = finalize(&table, &plan, &PipelineConfig::default()).unwrap();

        assert_eq!(out.headers(), &["id", "title", "A", "B"]);
        assert_eq!(
            out.rows()[0],
            vec![Cell::Int(1), text("T"), text("1"), text("2")]
        );
        assert_eq!(stats.dropped, 2);
        assert_eq!(stats.collisions, 0);
    }

    #[test]
    fn test_collision_overwrite_keeps_position() {
        let table = Table::new(
            vec!["Name".into(), "id".into()],
            vec![vec![text("old"), Cell::Int(1)], vec![text("old2"), Cell::Int(2)]],
        )
        .unwrap();
        let plan = plan_for(vec![vec![("Name", "Alice")], vec![]]);
        let (out, stats) = finalize(&table, &plan, &PipelineConfig::default()).unwrap();

        assert_eq!(out.headers(), &["Name", "id"]);
        assert_eq!(out.cell(0, "Name"), Some(&text("Alice")));
        assert_eq!(out.cell(1, "Name"), Some(&text("")));
        assert_eq!(stats.collisions, 1);
    }

    #[test]
    fn test_collision_rename() {
        let table = Table::new(
            vec!["Name".into(), "Name (2)".into()],
            vec![vec![text("old"), text("older")]],
        )
        .unwrap();
        let plan = plan_for(vec![vec![("Name", "Alice")]]);
        let config = PipelineConfig {
            collision_policy: CollisionPolicy::Rename,
            ..PipelineConfig::default()
        };
        let (out, _) = finalize(&table, &plan, &config).unwrap();
        assert_eq!(out.headers(), &["Name", "Name (2)", "Name (3)"]);
        assert_eq!(out.cell(0, "Name"), Some(&text("old")));
        assert_eq!(out.cell(0, "Name (3)"), Some(&text("Alice")));
    }

    #[test]
    fn test_collision_error() {
        let table = Table::new(vec!["Name".into()], vec![vec![text("old")]]).unwrap();
        let plan = plan_for(vec![vec![("Name", "Alice")]]);
        let config = PipelineConfig {
            collision_policy: CollisionPolicy::Error,
            ..PipelineConfig::default()
        };
        let err = finalize(&table, &plan, &config).unwrap_err();
        assert!(matches!(err, PipelineError::ColumnCollision(ref n) if n == "Name"));
    }

    #[test]
    fn test_sweep_cleans_leftover_markup_only_in_dirty_columns() {
        let table = Table::new(
            vec!["notes".into(), "clean".into(), "n".into()],
            vec![
                vec![text("<b>bold</b>  note"), text("a  b"), Cell::Float(1.5)],
                vec![text("plain"), text("c"), Cell::Empty],
            ],
        )
        .unwrap();
        let plan = plan_for(vec![vec![], vec![]]);
        let (out, stats) = finalize(&table, &plan, &PipelineConfig::default()).unwrap();

        assert_eq!(out.cell(0, "notes"), Some(&text("bold note")));
        assert_eq!(out.cell(1, "notes"), Some(&text("plain")));
        // untouched: no markup in the column
        assert_eq!(out.cell(0, "clean"), Some(&text("a  b")));
        assert_eq!(out.cell(0, "n"), Some(&Cell::Float(1.5)));
        assert_eq!(stats.swept, 1);
        for row in out.rows() {
            for cell in row {
                assert!(!cell.as_text().is_some_and(contains_markup));
            }
        }
    }

    #[test]
    fn test_no_sources_no_questions_is_identity() {
        let table = Table::new(
            vec!["a".into(), "b".into()],
            vec![vec![text("x"), Cell::Int(2)]],
        )
        .unwrap();
        let plan = plan_for(vec![vec![]]);
        let (out, stats) = finalize(&table, &plan, &PipelineConfig::default()).unwrap();
        assert_eq!(out, table);
        assert_eq!(stats, FinalizeStats::default());
    }

    #[test]
    fn test_unique_name() {
        let headers = vec!["a".to_string(), "a (2)".to_string()];
        assert_eq!(unique_name(&headers, "b"), "b");
        assert_eq!(unique_name(&headers, "a"), "a (3)");
    }
}
