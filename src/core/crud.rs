//! Management service: validated CRUD over the document store
//!
//! Field values are checked against the field dictionary before they are
//! written: number fields must be numeric (numeric strings are coerced),
//! date fields are normalized to `YYYY-MM-DD`, and the collection's key field
//! is required on create.

use serde::Serialize;
use serde_json::{Number, Value};
use tracing::{debug, info, warn};

use crate::core::collection::Collection;
use crate::core::dates;
use crate::core::error::{ImsError, ImsResult};
use crate::core::fields::{self, FieldType};
use crate::core::paginate::{PageInfo, Paginator};
use crate::core::store::{Document, DocumentStore, Filter};
use crate::entities::material::MaterialCode;
use crate::entities::party::{normalize_supplier_code, plan_supplier_codes, MAX_SUPPLIER_CODE};
use crate::entities::DocExt;

/// Keys never stored in a document body
const RESERVED_KEYS: &[&str] = &["_id", "created_at", "updated_at"];

/// Coerce one field value to its dictionary type
pub fn coerce_field(field: &str, value: &Value) -> Result<Value, String> {
    match (fields::field_type(field), value) {
        (_, Value::Null) => Ok(Value::Null),
        (FieldType::Number, Value::Number(_)) => Ok(value.clone()),
        (FieldType::Number, Value::String(s)) if s.trim().is_empty() => Ok(Value::Null),
        (FieldType::Number, other) => fields::number_of(other)
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| format!("{}: expected a number, got {}", field, other)),
        (FieldType::Date, Value::String(s)) if dates::is_special_value(s) => Ok(Value::Null),
        (FieldType::Date, other) => dates::parse_date_value(other)
            .map(|d| Value::from(dates::format_date(d)))
            .ok_or_else(|| format!("{}: unrecognised date {}", field, other)),
        (FieldType::Text, Value::String(s)) => Ok(Value::from(s.trim())),
        (FieldType::Text, Value::Number(_) | Value::Bool(_)) => {
            Ok(fields::text_of(value).map(Value::from).unwrap_or(Value::Null))
        }
        (FieldType::Text, other) => Ok(other.clone()),
    }
}

/// Clean every field of a document. `keep_nulls` preserves nulls so a
/// patch can remove keys.
pub fn clean_document(doc: &Document, keep_nulls: bool) -> ImsResult<Document> {
    let mut out = Document::new();
    let mut errors = Vec::new();
    for (k, v) in doc {
        if RESERVED_KEYS.contains(&k.as_str()) {
            continue;
        }
        match coerce_field(k, v) {
            Ok(Value::Null) if !keep_nulls => {}
            Ok(clean) => {
                out.insert(k.clone(), clean);
            }
            Err(e) => errors.push(e),
        }
    }
    if errors.is_empty() {
        Ok(out)
    } else {
        Err(ImsError::Validation { errors })
    }
}

/// Page of documents matching a filter
pub fn list(
    store: &DocumentStore,
    collection: Collection,
    filter: &Filter,
    paginator: Paginator,
) -> ImsResult<(Vec<Document>, PageInfo)> {
    let docs = store.find(collection, filter)?;
    Ok(paginator.paginate(docs))
}

pub fn get(store: &DocumentStore, collection: Collection, key: &str) -> ImsResult<Document> {
    store
        .get(collection, key)?
        .ok_or_else(|| ImsError::not_found(collection.as_str(), key))
}

/// Create a document; line collections get a generated key when none is
/// given. Returns the key used.
pub fn create(
    store: &DocumentStore,
    collection: Collection,
    doc: &Document,
) -> ImsResult<(String, Document)> {
    let clean = clean_document(doc, false)?;
    let key_field = collection.key_field();
    let key = match clean.text(key_field) {
        Some(k) if !fields::is_placeholder_key(&k) => k,
        _ if collection.is_line() => ulid::Ulid::new().to_string(),
        _ => {
            return Err(ImsError::validation(format!("{} is required", key_field)));
        }
    };
    store.insert(collection, &key, clean)?;
    info!(collection = %collection, key = %key, "created document");
    let saved = get(store, collection, &key)?;
    Ok((key, saved))
}

/// Apply a patch; the key field and reserved keys are stripped
pub fn update(
    store: &DocumentStore,
    collection: Collection,
    key: &str,
    patch: &Document,
) -> ImsResult<Document> {
    let mut clean = clean_document(patch, true)?;
    if let Some(v) = clean.remove(collection.key_field()) {
        if v.as_str() != Some(key) {
            warn!(collection = %collection, key, "ignoring attempt to change key field");
        }
    }
    if clean.is_empty() {
        return Err(ImsError::validation("nothing to update"));
    }
    let doc = store.update(collection, key, &clean)?;
    info!(collection = %collection, key, fields = clean.len(), "updated document");
    Ok(doc)
}

pub fn delete(store: &DocumentStore, collection: Collection, key: &str) -> ImsResult<()> {
    if !store.delete(collection, key)? {
        return Err(ImsError::not_found(collection.as_str(), key));
    }
    info!(collection = %collection, key, "deleted document");
    Ok(())
}

/// Outcome of assigning supplier codes
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SupplierCodeAssignment {
    pub assigned: Vec<(String, String)>,
    /// Suppliers beyond the 99th that received no code
    pub skipped: Vec<String>,
}

/// Sort suppliers by name and assign `01`..`99`
pub fn assign_supplier_codes(store: &DocumentStore) -> ImsResult<SupplierCodeAssignment> {
    let mut names: Vec<String> = store
        .all(Collection::Suppliers)?
        .iter()
        .filter_map(|d| d.text("supplier_name"))
        .collect();
    names.sort();
    let skipped: Vec<String> = names.iter().skip(MAX_SUPPLIER_CODE).cloned().collect();
    if !skipped.is_empty() {
        warn!(
            total = names.len(),
            skipped = skipped.len(),
            "more than {} suppliers, only the first {} get codes",
            MAX_SUPPLIER_CODE,
            MAX_SUPPLIER_CODE
        );
    }

    let plan = plan_supplier_codes(names);
    store.transaction(|s| {
        for (name, code) in &plan {
            let mut patch = Document::new();
            patch.insert("supplier_code".into(), Value::from(code.as_str()));
            s.update(Collection::Suppliers, name, &patch)?;
        }
        Ok(())
    })?;
    debug!(count = plan.len(), "assigned supplier codes");

    Ok(SupplierCodeAssignment {
        assigned: plan,
        skipped,
    })
}

/// Next free material code for the given classification
pub fn generate_material_code(
    store: &DocumentStore,
    platform: &str,
    type1: &str,
    type2: &str,
    supplier_code: &str,
) -> ImsResult<MaterialCode> {
    let existing: Vec<String> = store
        .all(Collection::Materials)?
        .iter()
        .filter_map(|d| d.text("material_code"))
        .collect();
    MaterialCode::new(platform, type1, type2, supplier_code)?
        .next_after(existing.iter().map(String::as_str))
}

/// Add a material with a generated code. The supplier code is taken from
/// the named supplier when not given explicitly.
pub fn add_material(store: &DocumentStore, info: &Document) -> ImsResult<Document> {
    let mut doc = clean_document(info, false)?;
    let platform = doc.text("platform").unwrap_or_else(|| "P".into());
    let type1 = doc.text("type1").unwrap_or_else(|| "0".into());
    let type2 = doc.text("type2").unwrap_or_else(|| "0".into());

    let mut supplier_code = doc.text("supplier_code");
    if let Some(name) = doc.text("supplier_name") {
        match store.get(Collection::Suppliers, &name)? {
            Some(supplier) => {
                if supplier_code.is_none() {
                    supplier_code = supplier.text("supplier_code");
                }
            }
            None => warn!(supplier = %name, "supplier not on file"),
        }
    }
    let supplier_code = supplier_code.ok_or_else(|| {
        ImsError::validation("supplier_code is required (or a supplier with an assigned code)")
    })?;

    let code = generate_material_code(store, &platform, &type1, &type2, &supplier_code)?;
    doc.insert("platform".into(), Value::from(code.platform.to_string()));
    doc.insert("type1".into(), Value::from(type1));
    doc.insert("type2".into(), Value::from(type2));
    doc.insert(
        "supplier_code".into(),
        Value::from(normalize_supplier_code(&supplier_code)),
    );
    doc.insert("sequence".into(), Value::from(code.sequence));
    doc.insert("material_code".into(), Value::from(code.to_string()));

    let (_, saved) = create(store, Collection::Materials, &doc)?;
    Ok(saved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(v: Value) -> Document {
        v.as_object().unwrap().clone()
    }

    #[test]
    fn test_coerce_field_types() {
        assert_eq!(coerce_field("amount", &json!("1,500")).unwrap(), json!(1500.0));
        assert!(coerce_field("amount", &json!("lots")).is_err());
        assert_eq!(
            coerce_field("payment_date", &json!("2024年2月3日")).unwrap(),
            json!("2024-02-03")
        );
        assert_eq!(coerce_field("invoice_date", &json!("未开票")).unwrap(), Value::Null);
        assert_eq!(coerce_field("supplier_code", &json!(5)).unwrap(), json!("5"));
    }

    #[test]
    fn test_create_requires_key() {
        let store = DocumentStore::open_in_memory().unwrap();
        let err = create(&store, Collection::Suppliers, &doc(json!({"phone": "1"}))).unwrap_err();
        assert_eq!(err.code(), "VALIDATION_FAILED");
    }

    #[test]
    fn test_create_line_generates_key() {
        let store = DocumentStore::open_in_memory().unwrap();
        let (key, saved) = create(
            &store,
            Collection::SalesOutbound,
            &doc(json!({"customer_name": "Bob", "amount": "10"})),
        )
        .unwrap();
        assert_eq!(key.len(), 26);
        assert_eq!(saved["amount"], json!(10.0));
        assert_eq!(saved["record_no"], json!(key));
    }

    #[test]
    fn test_create_rejects_duplicate_and_bad_types() {
        let store = DocumentStore::open_in_memory().unwrap();
        let d = doc(json!({"customer_name": "Bob"}));
        create(&store, Collection::Customers, &d).unwrap();
        assert!(create(&store, Collection::Customers, &d).is_err());

        let bad = doc(json!({"customer_name": "Eve", "credit_limit": "big"}));
        match create(&store, Collection::Customers, &bad).unwrap_err() {
            ImsError::Validation { errors } => assert!(errors[0].contains("credit_limit")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_update_strips_key_and_reserved() {
        let store = DocumentStore::open_in_memory().unwrap();
        create(&store, Collection::Customers, &doc(json!({"customer_name": "Bob"}))).unwrap();
        let updated = update(
            &store,
            Collection::Customers,
            "Bob",
            &doc(json!({"customer_name": "Robert", "_id": "x", "phone": 555})),
        )
        .unwrap();
        assert_eq!(updated["customer_name"], json!("Bob"));
        assert_eq!(updated["phone"], json!("555"));
        assert!(!updated.contains_key("_id"));
    }

    #[test]
    fn test_delete_missing_is_not_found() {
        let store = DocumentStore::open_in_memory().unwrap();
        let err = delete(&store, Collection::Materials, "nope").unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[test]
    fn test_assign_supplier_codes() {
        let store = DocumentStore::open_in_memory().unwrap();
        for name in ["Zeta", "Alpha", "Mid"] {
            create(&store, Collection::Suppliers, &doc(json!({"supplier_name": name}))).unwrap();
        }
        let result = assign_supplier_codes(&store).unwrap();
        assert_eq!(result.assigned[0], ("Alpha".to_string(), "01".to_string()));
        assert!(result.skipped.is_empty());
        let zeta = get(&store, Collection::Suppliers, "Zeta").unwrap();
        assert_eq!(zeta["supplier_code"], json!("03"));
    }

    #[test]
    fn test_add_material_resolves_supplier_code() {
        let store = DocumentStore::open_in_memory().unwrap();
        create(
            &store,
            Collection::Suppliers,
            &doc(json!({"supplier_name": "ACME", "supplier_code": "05"})),
        )
        .unwrap();
        let info = doc(json!({
            "supplier_name": "ACME",
            "type1": "1",
            "type2": "3",
            "material_name": "IPC"
        }));
        let first = add_material(&store, &info).unwrap();
        assert_eq!(first["material_code"], json!("P-13-05-0000-001"));
        let second = add_material(&store, &info).unwrap();
        assert_eq!(second["material_code"], json!("P-13-05-0000-002"));
        assert_eq!(second["sequence"], json!(2));
    }

    #[test]
    fn test_add_material_without_supplier_code_fails() {
        let store = DocumentStore::open_in_memory().unwrap();
        let err = add_material(&store, &doc(json!({"material_name": "X"}))).unwrap_err();
        assert_eq!(err.code(), "VALIDATION_FAILED");
    }
}
