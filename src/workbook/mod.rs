// src/workbook/mod.rs
use anyhow::{anyhow, Context, Result};
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::NaiveDateTime;
use rust_xlsxwriter::{Format, Workbook};
use std::io::Cursor;
use tracing::{debug, info};

use crate::pipeline::{Pipeline, PipelineReport};
use crate::table::{Cell, Table};

const MAX_ROWS: usize = 1_048_576;
const MAX_COLS: usize = 16_384;

/// Read the first worksheet of an xlsx/xls/ods document; the first row is the header.
pub fn read_table(bytes: &[u8]) -> Result<Table> {
    let mut sheets =
        open_workbook_auto_from_rs(Cursor::new(bytes)).context("opening spreadsheet")?;
    let range = sheets
        .worksheet_range_at(0)
        .ok_or_else(|| anyhow!("spreadsheet has no worksheets"))?
        .context("reading first worksheet")?;

    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        debug!("empty worksheet");
        return Ok(Table::default());
    };

    let headers: Vec<String> = header_row
        .iter()
        .enumerate()
        .map(|(i, d)| match data_to_cell(d) {
            Cell::Empty => format!("Unnamed: {}", i),
            c => {
                let name = c.to_string();
                if name.trim().is_empty() {
                    format!("Unnamed: {}", i)
                } else {
                    name
                }
            }
        })
        .collect();
    let body: Vec<Vec<Cell>> = rows
        .map(|r| r.iter().map(data_to_cell).collect())
        .collect();

    debug!(cols = headers.len(), rows = body.len(), "read worksheet");
    Table::new(headers, body).context("worksheet is not rectangular")
}

fn data_to_cell(d: &Data) -> Cell {
    match d {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Int(i) => Cell::Int(*i),
        Data::Float(f) => Cell::Float(*f),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(ndt) => Cell::Text(format_datetime(&ndt)),
            None => Cell::Float(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Error(e) => Cell::Text(e.to_string()),
    }
}

fn format_datetime(ndt: &NaiveDateTime) -> String {
    ndt.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Render `table` as a single-sheet xlsx document, header row first, no index column.
pub fn write_table(table: &Table, sheet_name: &str) -> Result<Vec<u8>> {
    if table.num_rows() + 1 > MAX_ROWS {
        return Err(anyhow!("{} rows exceed the xlsx row limit", table.num_rows()));
    }
    if table.num_columns() > MAX_COLS {
        return Err(anyhow!(
            "{} columns exceed the xlsx column limit",
            table.num_columns()
        ));
    }

    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    sheet
        .set_name(sheet_name)
        .with_context(|| format!("invalid sheet name {:?}", sheet_name))?;

    for (c, name) in table.headers().iter().enumerate() {
        sheet.write_string_with_format(0, c as u16, name, &header_format)?;
    }
    for (r, row) in table.rows().iter().enumerate() {
        let r = (r + 1) as u32;
        for (c, cell) in row.iter().enumerate() {
            let c = c as u16;
            match cell {
                Cell::Empty => {}
                Cell::Text(s) => {
                    sheet.write_string(r, c, s)?;
                }
                Cell::Int(i) => {
                    sheet.write_number(r, c, *i as f64)?;
                }
                Cell::Float(f) => {
                    sheet.write_number(r, c, *f)?;
                }
                Cell::Bool(b) => {
                    sheet.write_boolean(r, c, *b)?;
                }
            }
        }
    }

    workbook
        .save_to_buffer()
        .context("serializing xlsx workbook")
}

/// Upload bytes in, download bytes out. Any failure aborts without output.
#[tracing::instrument(level = "info", skip_all, fields(bytes = input.len()))]
pub fn convert_bytes(input: &[u8], pipeline: &Pipeline) -> Result<(Vec<u8>, PipelineReport)> {
    let table = read_table(input)?;
    let (out, report) = pipeline.run(&table).context("flattening worksheet")?;
    let bytes = write_table(&out, &pipeline.config().output.sheet_name)?;
    info!(
        rows = report.rows,
        questions = report.questions,
        out_bytes = bytes.len(),
        "converted workbook"
    );
    Ok((bytes, report))
}
