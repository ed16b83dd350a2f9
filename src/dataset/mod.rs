//! Contact datasets: loading, writing back and change reports.
//!
//! A dataset is a header row plus data rows of [`Cell`]s. Only the email
//! column is ever modified; everything else is written back as it was read.

mod csv_io;
mod xlsx_io;

use crate::core::error::{AppError, Result};
use crate::core::models::{ChangeRecord, Contact};

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

pub const FIRST_NAME_COLUMN: &str = "contact_first_name";
pub const LAST_NAME_COLUMN: &str = "contact_last_name";
pub const EMAIL_COLUMN: &str = "contact_email";
pub const WEBSITE_COLUMN: &str = "account_website";
pub const COMPANY_COLUMN: &str = "account_name";

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    /// Spreadsheet date or time as its serial day number.
    DateTime(f64),
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(value)
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Trimmed display value, `None` when blank.
    pub fn as_value(&self) -> Option<String> {
        if self.is_blank() {
            None
        } else {
            Some(self.to_string().trim().to_string())
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(s) => f.write_str(s),
            Cell::Number(n) | Cell::DateTime(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            Cell::Number(n) | Cell::DateTime(n) => write!(f, "{}", n),
            Cell::Bool(true) => f.write_str("TRUE"),
            Cell::Bool(false) => f.write_str("FALSE"),
        }
    }
}

/// File formats recognised by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    Csv,
    Xlsx,
    /// `.xls`, `.xlsm`, `.ods`: readable, written back as `.xlsx`.
    LegacySpreadsheet,
}

impl DataFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "csv" => Ok(DataFormat::Csv),
            "xlsx" => Ok(DataFormat::Xlsx),
            "xls" | "xlsm" | "ods" => Ok(DataFormat::LegacySpreadsheet),
            _ => Err(AppError::UnsupportedFormat(path.display().to_string())),
        }
    }

    /// Extension used for files derived from an input of this format.
    pub fn output_extension(self) -> &'static str {
        match self {
            DataFormat::Csv => "csv",
            DataFormat::Xlsx | DataFormat::LegacySpreadsheet => "xlsx",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ColumnMap {
    first_name: usize,
    last_name: usize,
    email: usize,
    website: usize,
    company: Option<usize>,
}

impl ColumnMap {
    fn resolve(headers: &[String], source: &str) -> Result<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        let require = |name: &str| {
            find(name).ok_or_else(|| AppError::MissingColumn {
                column: name.to_string(),
                path: source.to_string(),
            })
        };
        Ok(Self {
            first_name: require(FIRST_NAME_COLUMN)?,
            last_name: require(LAST_NAME_COLUMN)?,
            email: require(EMAIL_COLUMN)?,
            website: require(WEBSITE_COLUMN)?,
            company: find(COMPANY_COLUMN),
        })
    }
}

#[derive(Debug, Clone)]
pub struct Dataset {
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
    columns: ColumnMap,
}

impl Dataset {
    /// Builds a dataset, padding short rows. `source` names the origin in errors.
    pub fn from_parts(headers: Vec<String>, rows: Vec<Vec<Cell>>, source: &str) -> Result<Self> {
        let columns = ColumnMap::resolve(&headers, source)?;
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                if row.len() < width {
                    row.resize(width, Cell::Empty);
                }
                row
            })
            .collect();
        Ok(Self {
            headers,
            rows,
            columns,
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let format = DataFormat::from_path(path)?;
        let source = path.display().to_string();
        tracing::info!(target: "dataset", "Loading {}", source);

        let (headers, rows) = match format {
            DataFormat::Csv => csv_io::read(path)?,
            DataFormat::Xlsx | DataFormat::LegacySpreadsheet => xlsx_io::read(path)?,
        };
        let dataset = Self::from_parts(headers, rows, &source)?;
        tracing::info!(target: "dataset", "Loaded {} rows, {} columns", dataset.len(), dataset.headers.len());
        Ok(dataset)
    }

    /// Writes to a sibling temporary file, then renames it over `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        let format = DataFormat::from_path(path)?;
        let tmp = temp_sibling(path);

        let written = match format {
            DataFormat::Csv => csv_io::write(&tmp, &self.headers, &self.rows),
            DataFormat::Xlsx => xlsx_io::write(&tmp, &self.headers, &self.rows),
            DataFormat::LegacySpreadsheet => {
                Err(AppError::UnsupportedFormat(format!(
                    "{} (only .csv and .xlsx can be written)",
                    path.display()
                )))
            }
        };
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }

        fs::rename(&tmp, path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            AppError::io(path.display().to_string(), e)
        })?;
        tracing::info!(target: "dataset", "Wrote {} rows to {}", self.len(), path.display());
        Ok(())
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn email(&self, row: usize) -> Option<String> {
        self.rows.get(row).and_then(|r| r[self.columns.email].as_value())
    }

    /// One [`Contact`] per data row, in order.
    pub fn contacts(&self) -> Vec<Contact> {
        let c = self.columns;
        self.rows
            .iter()
            .enumerate()
            .map(|(row, cells)| Contact {
                row,
                first_name: cells[c.first_name].as_value().unwrap_or_default(),
                last_name: cells[c.last_name].as_value().unwrap_or_default(),
                email: cells[c.email].as_value(),
                website: cells[c.website].as_value(),
                company_name: c.company.and_then(|i| cells[i].as_value()),
            })
            .collect()
    }

    /// Writes the new email values into the email column.
    pub fn apply_changes(&mut self, changes: &[ChangeRecord]) {
        let col = self.columns.email;
        for change in changes {
            match self.rows.get_mut(change.row) {
                Some(row) => row[col] = Cell::text(change.new_value.clone()),
                None => {
                    tracing::warn!(target: "dataset", "Change for unknown row {} ignored", change.row)
                }
            }
        }
    }

    /// Same columns, only the given rows (in the given order).
    pub fn subset(&self, rows: &[usize]) -> Dataset {
        Dataset {
            headers: self.headers.clone(),
            rows: rows
                .iter()
                .filter_map(|&r| self.rows.get(r).cloned())
                .collect(),
            columns: self.columns,
        }
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    path.with_file_name(format!(".{}.{}.tmp", name, std::process::id()))
}

fn derived_path(input: &Path, suffix: &str) -> Result<PathBuf> {
    let format = DataFormat::from_path(input)?;
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "contacts".to_string());
    Ok(input.with_file_name(format!(
        "{}_{}.{}",
        stem,
        suffix,
        format.output_extension()
    )))
}

/// `<stem>_enriched.<ext>` next to the input.
pub fn default_output_path(input: &Path) -> Result<PathBuf> {
    derived_path(input, "enriched")
}

/// `<stem>_changes.<ext>` next to the input.
pub fn default_changes_path(input: &Path) -> Result<PathBuf> {
    derived_path(input, "changes")
}
