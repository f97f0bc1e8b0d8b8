//! Filtered queries over a collection
//!
//! Text fields match case-insensitively on substrings; number and date
//! fields match exactly after normalization.

use serde_json::Value;

use super::{Document, DocumentStore};
use crate::core::collection::Collection;
use crate::core::dates;
use crate::core::error::ImsResult;
use crate::core::fields::{self, FieldType};

/// Field conditions plus an optional free-text search across all fields
#[derive(Debug, Default, Clone)]
pub struct Filter {
    pub conditions: Vec<(String, String)>,
    pub search: Option<String>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field condition; empty needles are ignored
    pub fn with(mut self, field: impl Into<String>, needle: impl Into<String>) -> Self {
        let needle = needle.into();
        if !needle.trim().is_empty() {
            self.conditions.push((field.into(), needle.trim().to_string()));
        }
        self
    }

    pub fn with_opt(self, field: &str, needle: Option<&str>) -> Self {
        match needle {
            Some(n) => self.with(field, n),
            None => self,
        }
    }

    pub fn search(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        if !text.trim().is_empty() {
            self.search = Some(text.trim().to_string());
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty() && self.search.is_none()
    }

    pub fn matches(&self, doc: &Document) -> bool {
        let conditions_hold = self.conditions.iter().all(|(field, needle)| {
            doc.get(field)
                .is_some_and(|value| field_matches(field, value, needle))
        });
        if !conditions_hold {
            return false;
        }
        match &self.search {
            None => true,
            Some(text) => {
                let text = text.to_lowercase();
                doc.values()
                    .filter_map(fields::text_of)
                    .any(|v| v.to_lowercase().contains(&text))
            }
        }
    }
}

fn field_matches(field: &str, value: &Value, needle: &str) -> bool {
    match fields::field_type(field) {
        FieldType::Number => match (fields::number_of(value), fields::parse_number(needle)) {
            (Some(a), Some(b)) => (a - b).abs() < 1e-9,
            _ => false,
        },
        FieldType::Date => {
            match (dates::parse_date_value(value), dates::parse_date(needle)) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            }
        }
        FieldType::Text => fields::text_of(value)
            .is_some_and(|v| v.to_lowercase().contains(&needle.to_lowercase())),
    }
}

impl DocumentStore {
    /// Documents in a collection that satisfy the filter, ordered by key
    pub fn find(&self, collection: Collection, filter: &Filter) -> ImsResult<Vec<Document>> {
        let docs = self.all(collection)?;
        if filter.is_empty() {
            return Ok(docs);
        }
        Ok(docs.into_iter().filter(|d| filter.matches(d)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(v: Value) -> Document {
        v.as_object().unwrap().clone()
    }

    #[test]
    fn test_text_is_case_insensitive_substring() {
        let d = doc(json!({"supplier_name": "Acme Trading"}));
        assert!(Filter::new().with("supplier_name", "acme").matches(&d));
        assert!(!Filter::new().with("supplier_name", "globex").matches(&d));
    }

    #[test]
    fn test_numbers_and_dates_exact() {
        let d = doc(json!({"amount": 100.0, "inbound_date": "2024-01-05"}));
        assert!(Filter::new().with("amount", "100").matches(&d));
        assert!(!Filter::new().with("amount", "10").matches(&d));
        assert!(Filter::new().with("inbound_date", "2024/1/5").matches(&d));
    }

    #[test]
    fn test_missing_field_does_not_match() {
        let d = doc(json!({"a": "x"}));
        assert!(!Filter::new().with("supplier_name", "x").matches(&d));
    }

    #[test]
    fn test_search_across_fields() {
        let d = doc(json!({"material_name": "Steel Bolt", "quantity": 5}));
        assert!(Filter::new().search("bolt").matches(&d));
        assert!(!Filter::new().search("nut").matches(&d));
    }

    #[test]
    fn test_find_in_store() {
        let store = DocumentStore::open_in_memory().unwrap();
        let c = Collection::Customers;
        store.upsert(c, "Alpha Co", Document::new()).unwrap();
        store.upsert(c, "Beta Co", Document::new()).unwrap();
        let found = store
            .find(c, &Filter::new().with("customer_name", "beta"))
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(store.find(c, &Filter::new()).unwrap().len(), 2);
    }
}
