//! Export report rows to CSV, XLSX, or JSON files

use std::path::Path;

use rust_xlsxwriter::{Format, Workbook};
use serde_json::Value;

use crate::core::error::{ImsError, ImsResult};
use crate::core::fields;
use crate::core::store::Document;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Xlsx,
    Json,
}

impl ExportFormat {
    /// Pick the format from a file extension
    pub fn from_path(path: &Path) -> ImsResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "xlsx" => Ok(ExportFormat::Xlsx),
            "json" => Ok(ExportFormat::Json),
            _ => Err(ImsError::validation(format!(
                "unsupported export extension '{}': use .csv, .xlsx or .json",
                ext
            ))),
        }
    }
}

/// Columns in first-seen order across all rows
pub fn infer_columns(rows: &[Document]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for row in rows {
        for key in row.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
    }
    columns
}

fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(v @ (Value::Array(_) | Value::Object(_))) => v.to_string(),
        Some(v) => fields::text_of(v).unwrap_or_default(),
    }
}

/// Write rows to `path`; an empty column list means "every key seen".
/// Returns the number of rows written.
pub fn export_rows(path: &Path, columns: &[String], rows: &[Document]) -> ImsResult<usize> {
    let columns = if columns.is_empty() {
        infer_columns(rows)
    } else {
        columns.to_vec()
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    match ExportFormat::from_path(path)? {
        ExportFormat::Csv => write_csv(path, &columns, rows)?,
        ExportFormat::Xlsx => write_xlsx(path, &columns, rows)?,
        ExportFormat::Json => {
            let json = serde_json::to_string_pretty(rows)?;
            std::fs::write(path, json)?;
        }
    }
    tracing::info!(path = %path.display(), rows = rows.len(), "exported rows");
    Ok(rows.len())
}

fn write_csv(path: &Path, columns: &[String], rows: &[Document]) -> ImsResult<()> {
    let mut wtr = csv::Writer::from_path(path).map_err(csv_error)?;
    wtr.write_record(columns).map_err(csv_error)?;
    for row in rows {
        let record: Vec<String> = columns.iter().map(|c| cell_text(row.get(c))).collect();
        wtr.write_record(&record).map_err(csv_error)?;
    }
    wtr.flush()?;
    Ok(())
}

fn csv_error(e: csv::Error) -> ImsError {
    ImsError::Other(format!("CSV write failed: {}", e))
}

fn xlsx_error(e: rust_xlsxwriter::XlsxError) -> ImsError {
    ImsError::Other(format!("XLSX write failed: {}", e))
}

fn write_xlsx(path: &Path, columns: &[String], rows: &[Document]) -> ImsResult<()> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Report").map_err(xlsx_error)?;

    for (col, name) in columns.iter().enumerate() {
        worksheet
            .write_string_with_format(0, col as u16, name, &header)
            .map_err(xlsx_error)?;
    }
    for (r, row) in rows.iter().enumerate() {
        let r = (r + 1) as u32;
        for (col, name) in columns.iter().enumerate() {
            let col = col as u16;
            match row.get(name) {
                Some(Value::Number(n)) => {
                    if let Some(f) = n.as_f64() {
                        worksheet.write_number(r, col, f).map_err(xlsx_error)?;
                    }
                }
                Some(Value::Bool(b)) => {
                    worksheet.write_boolean(r, col, *b).map_err(xlsx_error)?;
                }
                other => {
                    let text = cell_text(other);
                    if !text.is_empty() {
                        worksheet.write_string(r, col, &text).map_err(xlsx_error)?;
                    }
                }
            }
        }
    }
    workbook.save(path).map_err(xlsx_error)?;
    Ok(())
}
