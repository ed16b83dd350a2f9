use super::Cell;
use crate::core::error::{AppError, Result};

use std::path::Path;

pub(super) fn read(path: &Path) -> Result<(Vec<String>, Vec<Vec<Cell>>)> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(i, h)| {
            // Excel-exported CSVs often start with a byte order mark.
            if i == 0 {
                h.trim_start_matches('\u{feff}').to_string()
            } else {
                h.to_string()
            }
        })
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(Cell::text).collect());
    }
    Ok((headers, rows))
}

pub(super) fn write(path: &Path, headers: &[String], rows: &[Vec<Cell>]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_path(path)?;
    writer.write_record(headers)?;
    for row in rows {
        writer.write_record(row.iter().map(|c| c.to_string()))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::io(path.display().to_string(), e))?;
    Ok(())
}
