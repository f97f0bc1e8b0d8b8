//! Sheet-to-document conversion shared by CSV and workbook imports

use serde::Serialize;
use serde_json::Value;

use super::workbook::Sheet;
use crate::core::collection::Collection;
use crate::core::crud::coerce_field;
use crate::core::error::{ImsError, ImsResult};
use crate::core::fields::{self, FieldType};
use crate::core::store::{Document, DocumentStore, WriteOutcome};
use crate::entities::material::Material;
use crate::entities::DocExt;

/// Import options passed down from the clap arguments
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    pub dry_run: bool,
    pub skip_errors: bool,
    pub replace: bool,
    /// 1-based header row; auto-detected when absent
    pub header_row: Option<usize>,
}

/// Import statistics for one collection
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportStats {
    pub collection: String,
    pub sheet: String,
    pub header_row: usize,
    pub rows_processed: usize,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub errors: usize,
    pub materials_matched: usize,
    pub mapping_issues: Vec<String>,
    pub date_issues: Vec<String>,
    pub error_messages: Vec<String>,
}

impl ImportStats {
    pub fn new(collection: Collection, sheet: &str) -> Self {
        Self {
            collection: collection.as_str().to_string(),
            sheet: sheet.to_string(),
            ..Self::default()
        }
    }

    pub fn imported(&self) -> usize {
        self.created + self.updated
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// First row with at least two non-empty cells (0-based). Source sheets
/// often carry a one-cell title row above the real header.
pub fn detect_header_row(rows: &[Vec<Value>]) -> Option<usize> {
    rows.iter()
        .position(|r| r.iter().filter(|c| !is_blank(c)).count() >= 2)
}

/// Map header cells to field names as (column index, field) pairs.
/// Unknown headers are kept as snake_case keys and reported.
pub fn map_headers(header: &[Value]) -> (Vec<(usize, String)>, Vec<String>) {
    let mut columns: Vec<(usize, String)> = Vec::new();
    let mut issues = Vec::new();
    for (idx, cell) in header.iter().enumerate() {
        let text = fields::text_of(cell).unwrap_or_default();
        if fields::is_blank_header(&text) {
            continue;
        }
        let field = match fields::map_header(&text) {
            Some(f) => f.to_string(),
            None => {
                let key = fields::to_snake_case(&text);
                if key.is_empty() {
                    issues.push(format!(
                        "column {}: header '{}' has no usable name",
                        idx + 1,
                        text
                    ));
                    continue;
                }
                issues.push(format!("'{}' is not a known field, kept as '{}'", text, key));
                key
            }
        };
        if columns.iter().any(|(_, f)| *f == field) {
            issues.push(format!("'{}' duplicates field '{}', ignored", text, field));
            continue;
        }
        columns.push((idx, field));
    }
    (columns, issues)
}

/// Turn sheet rows into keyed documents. Lines without a record number
/// column get a stable key from the file hash and the sheet row.
pub fn build_documents(
    collection: Collection,
    sheet: &Sheet,
    options: &ImportOptions,
    key_prefix: &str,
    stats: &mut ImportStats,
) -> ImsResult<Vec<(String, Document)>> {
    let header_idx = match options.header_row {
        Some(n) => n.saturating_sub(1),
        None => detect_header_row(&sheet.rows)
            .ok_or_else(|| ImsError::Import(format!("sheet '{}' has no header row", sheet.name)))?,
    };
    let header = sheet.rows.get(header_idx).ok_or_else(|| {
        ImsError::Import(format!(
            "header row {} is past the end of sheet '{}' ({} rows)",
            header_idx + 1,
            sheet.name,
            sheet.rows.len()
        ))
    })?;
    stats.header_row = header_idx + 1;

    let (columns, issues) = map_headers(header);
    stats.mapping_issues.extend(issues);

    let key_field = collection.key_field();
    let has_key_column = columns.iter().any(|(_, f)| f == key_field);
    if !has_key_column && !collection.is_line() {
        return Err(ImsError::Import(format!(
            "sheet '{}' has no '{}' column in header row {}",
            sheet.name,
            key_field,
            header_idx + 1
        )));
    }

    let mut out = Vec::new();
    for (offset, row) in sheet.rows.iter().enumerate().skip(header_idx + 1) {
        let row_no = offset + 1;
        if row.iter().all(is_blank) {
            continue;
        }
        stats.rows_processed += 1;

        let mut doc = Document::new();
        let mut row_errors = Vec::new();
        for (idx, field) in &columns {
            let raw = row.get(*idx).cloned().unwrap_or(Value::Null);
            match coerce_field(field, &raw) {
                Ok(Value::Null) => {}
                Ok(v) => {
                    doc.insert(field.clone(), v);
                }
                Err(e) if fields::field_type(field) == FieldType::Date => {
                    stats.date_issues.push(format!("row {}: {}", row_no, e));
                }
                Err(e) => row_errors.push(e),
            }
        }

        let key = match doc.text(key_field) {
            Some(k) if !fields::is_placeholder_key(&k) => k,
            _ if has_key_column => {
                stats.skipped += 1;
                continue;
            }
            _ => {
                // Keyless line: a total row has no real counterparty
                let party_ok = collection
                    .party_field()
                    .and_then(|p| doc.text(p))
                    .is_some_and(|p| !fields::is_placeholder_key(&p));
                if !party_ok {
                    stats.skipped += 1;
                    continue;
                }
                format!("{}-{:05}", key_prefix, row_no)
            }
        };

        if !row_errors.is_empty() {
            stats.errors += 1;
            stats
                .error_messages
                .push(format!("row {}: {}", row_no, row_errors.join("; ")));
            continue;
        }
        out.push((key, doc));
    }
    Ok(out)
}

/// Fill `material_code` on purchase lines from name + specification
pub fn match_materials(store: &DocumentStore, docs: &mut [(String, Document)]) -> ImsResult<usize> {
    let materials: Vec<Material> = store
        .all(Collection::Materials)?
        .iter()
        .filter_map(Material::from_doc)
        .collect();
    if materials.is_empty() {
        return Ok(0);
    }
    let mut matched = 0;
    for (_, doc) in docs.iter_mut() {
        if doc.text("material_code").is_some() {
            continue;
        }
        let Some(name) = doc.text("material_name") else {
            continue;
        };
        let spec = doc.text("specification");
        if let Some(m) = materials.iter().find(|m| m.matches_name(&name, spec.as_deref())) {
            doc.insert("material_code".into(), Value::from(m.material_code.as_str()));
            matched += 1;
        }
    }
    Ok(matched)
}

/// Write documents in one transaction, clearing the collection first when
/// replacing
pub fn write_documents(
    store: &DocumentStore,
    collection: Collection,
    docs: Vec<(String, Document)>,
    replace: bool,
    stats: &mut ImportStats,
) -> ImsResult<()> {
    let (created, updated) = store.transaction(|s| {
        if replace {
            let removed = s.clear(collection)?;
            tracing::info!(collection = %collection, removed, "cleared collection before import");
        }
        let mut created = 0;
        let mut updated = 0;
        for (key, doc) in docs {
            match s.upsert(collection, &key, doc)? {
                WriteOutcome::Created => created += 1,
                WriteOutcome::Updated => updated += 1,
            }
        }
        Ok((created, updated))
    })?;
    stats.created = created;
    stats.updated = updated;
    Ok(())
}

/// Header line for a CSV template of a collection
pub fn template_headers(collection: Collection) -> Vec<&'static str> {
    fields::fields_for(collection).iter().map(|f| f.name).collect()
}
