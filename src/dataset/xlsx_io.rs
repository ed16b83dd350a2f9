use super::Cell;
use crate::core::error::{AppError, Result};

use calamine::{open_workbook_auto, Data, Reader};
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use std::path::Path;

fn convert(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::text(s.clone()),
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) => Cell::DateTime(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::text(s.clone()),
        Data::Error(e) => Cell::text(e.to_string()),
    }
}

/// First worksheet: header row, then data rows.
pub(super) fn read(path: &Path) -> Result<(Vec<String>, Vec<Vec<Cell>>)> {
    let mut workbook = open_workbook_auto(path).map_err(|e| {
        AppError::Spreadsheet(format!("Failed to open {}: {}", path.display(), e))
    })?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| AppError::Spreadsheet(format!("{} contains no sheets", path.display())))?;
    let range = workbook.worksheet_range(&sheet_name).map_err(|e| {
        AppError::Spreadsheet(format!("Failed to read sheet '{}': {}", sheet_name, e))
    })?;
    tracing::debug!(target: "dataset", "Reading sheet '{}' ({:?})", sheet_name, range.get_size());

    let mut rows_iter = range.rows();
    let headers: Vec<String> = rows_iter
        .next()
        .map(|r| r.iter().map(|d| convert(d).to_string()).collect())
        .unwrap_or_default();
    let rows = rows_iter
        .map(|r| r.iter().map(convert).collect::<Vec<Cell>>())
        .filter(|r| r.iter().any(|c| !c.is_blank()))
        .collect();

    Ok((headers, rows))
}

fn xlsx_err(e: XlsxError) -> AppError {
    AppError::Spreadsheet(e.to_string())
}

fn col_num(col: usize) -> Result<u16> {
    u16::try_from(col).map_err(|_| AppError::Spreadsheet(format!("Too many columns ({})", col)))
}

pub(super) fn write(path: &Path, headers: &[String], rows: &[Vec<Cell>]) -> Result<()> {
    let date_format = Format::new().set_num_format("yyyy-mm-dd");
    let datetime_format = Format::new().set_num_format("yyyy-mm-dd hh:mm:ss");

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();

    for (col, header) in headers.iter().enumerate() {
        sheet
            .write_string(0, col_num(col)?, header)
            .map_err(xlsx_err)?;
    }

    for (idx, row) in rows.iter().enumerate() {
        let row_num = u32::try_from(idx + 1)
            .map_err(|_| AppError::Spreadsheet(format!("Too many rows ({})", idx + 1)))?;
        for (col, cell) in row.iter().enumerate() {
            let col = col_num(col)?;
            match cell {
                Cell::Empty => {}
                Cell::Text(s) => {
                    sheet.write_string(row_num, col, s).map_err(xlsx_err)?;
                }
                Cell::Number(n) => {
                    sheet.write_number(row_num, col, *n).map_err(xlsx_err)?;
                }
                Cell::Bool(b) => {
                    sheet.write_boolean(row_num, col, *b).map_err(xlsx_err)?;
                }
                Cell::DateTime(serial) => {
                    let format = if serial.fract() == 0.0 {
                        &date_format
                    } else {
                        &datetime_format
                    };
                    sheet
                        .write_number_with_format(row_num, col, *serial, format)
                        .map_err(xlsx_err)?;
                }
            }
        }
    }

    workbook.save(path).map_err(xlsx_err)?;
    Ok(())
}
