//! Raw sheet readers: spreadsheets through calamine, CSV through csv
//!
//! Both produce a [`Sheet`]: a grid of JSON cell values with no header
//! interpretation. Spreadsheet date cells become `YYYY-MM-DD` strings.

use calamine::{open_workbook_auto, Data, Reader, Sheets};
use csv::ReaderBuilder;
use serde_json::Value;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::core::collection::Collection;
use crate::core::dates;
use crate::core::error::{ImsError, ImsResult};

/// One sheet of raw cells
#[derive(Debug, Clone)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<Value>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Csv,
    Workbook,
}

impl SourceKind {
    pub fn from_path(path: &Path) -> ImsResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "csv" => Ok(SourceKind::Csv),
            "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => Ok(SourceKind::Workbook),
            _ => Err(ImsError::Import(format!(
                "unsupported file type '{}': use .xlsx, .xlsm, .xls, .xlsb, .ods or .csv",
                ext
            ))),
        }
    }
}

/// Convert one calamine cell to JSON
pub fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty | Data::Error(_) => Value::Null,
        Data::String(s) => Value::from(s.as_str()),
        Data::Int(n) => Value::from(*n),
        Data::Float(f) => serde_json::Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Data::Bool(b) => Value::Bool(*b),
        Data::DateTime(dt) => match dates::from_excel_serial(dt.as_f64()) {
            Some(d) => Value::from(dates::format_date(d)),
            None => Value::from(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => Value::from(s.as_str()),
    }
}

/// Read a whole CSV file; the sheet takes the file stem as its name
pub fn read_csv(path: &Path) -> ImsResult<Sheet> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|e| ImsError::Import(format!("cannot read {}: {}", path.display(), e)))?;

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record.map_err(|e| ImsError::Import(format!("CSV row {}: {}", i + 1, e)))?;
        let row = record
            .iter()
            .enumerate()
            .map(|(col, s)| {
                // Excel writes a BOM in front of the first header
                let s = if i == 0 && col == 0 {
                    s.trim_start_matches('\u{feff}')
                } else {
                    s
                };
                if s.trim().is_empty() {
                    Value::Null
                } else {
                    Value::from(s)
                }
            })
            .collect();
        rows.push(row);
    }

    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    tracing::debug!(path = %path.display(), rows = rows.len(), "read CSV");
    Ok(Sheet { name, rows })
}

/// An open spreadsheet workbook
pub struct Workbook {
    sheets: Sheets<BufReader<File>>,
    names: Vec<String>,
}

impl Workbook {
    pub fn open(path: &Path) -> ImsResult<Self> {
        let sheets: Sheets<_> = open_workbook_auto(path)
            .map_err(|e| ImsError::Import(format!("cannot open {}: {}", path.display(), e)))?;
        let names = sheets.sheet_names().to_vec();
        tracing::debug!(path = %path.display(), sheets = names.len(), "opened workbook");
        Ok(Self { sheets, names })
    }

    pub fn sheet_names(&self) -> &[String] {
        &self.names
    }

    pub fn has_sheet(&self, name: &str) -> bool {
        self.names.iter().any(|n| n.trim() == name.trim())
    }

    /// Sheet to import for a collection: the requested one, else the
    /// collection's usual sheet, else the first sheet
    pub fn pick_sheet(&self, requested: Option<&str>, collection: Collection) -> ImsResult<String> {
        if let Some(name) = requested {
            return self
                .names
                .iter()
                .find(|n| n.trim() == name.trim())
                .cloned()
                .ok_or_else(|| {
                    ImsError::Import(format!(
                        "sheet '{}' not found (available: {})",
                        name,
                        self.names.join(", ")
                    ))
                });
        }
        if let Some(name) = self.names.iter().find(|n| n.trim() == collection.default_sheet()) {
            return Ok(name.clone());
        }
        self.names
            .first()
            .cloned()
            .ok_or_else(|| ImsError::Import("workbook has no sheets".into()))
    }

    pub fn read_sheet(&mut self, name: &str) -> ImsResult<Sheet> {
        let range = self
            .sheets
            .worksheet_range(name)
            .map_err(|e| ImsError::Import(format!("cannot read sheet '{}': {}", name, e)))?;
        let rows: Vec<Vec<Value>> = range
            .rows()
            .map(|r| r.iter().map(cell_value).collect())
            .collect();
        tracing::debug!(sheet = name, rows = rows.len(), "read sheet");
        Ok(Sheet {
            name: name.to_string(),
            rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_source_kind() {
        assert_eq!(SourceKind::from_path(Path::new("a.CSV")).unwrap(), SourceKind::Csv);
        assert_eq!(SourceKind::from_path(Path::new("b.xlsx")).unwrap(), SourceKind::Workbook);
        assert!(SourceKind::from_path(Path::new("c.txt")).is_err());
    }

    #[test]
    fn test_cell_value() {
        assert_eq!(cell_value(&Data::Empty), Value::Null);
        assert_eq!(cell_value(&Data::Int(3)), Value::from(3));
        assert_eq!(cell_value(&Data::Float(2.5)), Value::from(2.5));
        assert_eq!(cell_value(&Data::String("ACME".into())), Value::from("ACME"));
        assert_eq!(
            cell_value(&Data::DateTimeIso("2024-01-05T00:00:00".into())),
            Value::from("2024-01-05T00:00:00")
        );
    }

    #[test]
    fn test_read_csv_strips_bom_and_blanks() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("suppliers.csv");
        let mut f = File::create(&path).unwrap();
        write!(f, "\u{feff}供应商名称,联系人\nACME,\nGlobex,Ann\n").unwrap();

        let sheet = read_csv(&path).unwrap();
        assert_eq!(sheet.name, "suppliers");
        assert_eq!(sheet.rows.len(), 3);
        assert_eq!(sheet.rows[0][0], Value::from("供应商名称"));
        assert_eq!(sheet.rows[1][1], Value::Null);
    }
}
