// src/table/mod.rs
use std::fmt;

use thiserror::Error;

/// One spreadsheet cell as handed over by the workbook reader.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl Cell {
    /// The text payload, if this cell holds a string.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::Text(s)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(s) => f.write_str(s),
            Cell::Int(i) => write!(f, "{}", i),
            Cell::Float(v) => write!(f, "{}", v),
            Cell::Bool(b) => write!(f, "{}", b),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum TableError {
    #[error("row {row} has {found} cells but the header has {expected} columns")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("header at index {0} is empty after trimming")]
    EmptyHeader(usize),
}

/// A rectangular table: named columns in insertion order, one cell per column per row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Build a table, rejecting anything that is not rectangular.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Result<Self, TableError> {
        if let Some(idx) = headers.iter().position(|h| h.trim().is_empty()) {
            return Err(TableError::EmptyHeader(idx));
        }
        for (row, cells) in rows.iter().enumerate() {
            if cells.len() != headers.len() {
                return Err(TableError::RaggedRow {
                    row,
                    expected: headers.len(),
                    found: cells.len(),
                });
            }
        }
        Ok(Self { headers, rows })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_columns(&self) -> usize {
        self.headers.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// All cells of column `name`, top to bottom.
    pub fn column(&self, name: &str) -> Option<impl Iterator<Item = &Cell> + '_> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(move |r| &r[idx]))
    }

    pub fn cell(&self, row: usize, name: &str) -> Option<&Cell> {
        let idx = self.column_index(name)?;
        self.rows.get(row).map(|r| &r[idx])
    }

    /// Split into the raw parts, e.g. for handing to a writer.
    pub fn into_parts(self) -> (Vec<String>, Vec<Vec<Cell>>) {
        (self.headers, self.rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::new(
            vec!["id".into(), "body/en".into()],
            vec![
                vec![Cell::Int(1), "<dt>Name</dt><dd>Alice</dd>".into()],
                vec![Cell::Int(2), Cell::Empty],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_lookup() {
        let t = sample();
        assert_eq!(t.num_rows(), 2);
        assert_eq!(t.num_columns(), 2);
        assert_eq!(t.column_index("body/en"), Some(1));
        assert!(!t.has_column("body/fr"));
        assert_eq!(t.cell(1, "id"), Some(&Cell::Int(2)));
        assert_eq!(t.cell(5, "id"), None);

        let ids: Vec<String> = t.column("id").unwrap().map(|c| c.to_string()).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[test]
    fn test_rejects_ragged_rows() {
        let err = Table::new(vec!["a".into(), "b".into()], vec![vec![Cell::Empty]]).unwrap_err();
        assert_eq!(
            err,
            TableError::RaggedRow {
                row: 0,
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn test_rejects_blank_header() {
        let err = Table::new(vec!["a".into(), "  ".into()], vec![]).unwrap_err();
        assert_eq!(err, TableError::EmptyHeader(1));
    }

    #[test]
    fn test_cell_display() {
        assert_eq!(Cell::Empty.to_string(), "");
        assert_eq!(Cell::Float(2.5).to_string(), "2.5");
        assert_eq!(Cell::Bool(true).to_string(), "true");
        assert_eq!(Cell::from("x").as_text(), Some("x"));
        assert_eq!(Cell::Int(3).as_text(), None);
    }
}
