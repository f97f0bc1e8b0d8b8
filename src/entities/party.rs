//! Supplier and customer entities

use serde::Serialize;

use super::DocExt;
use crate::core::store::Document;

/// Highest assignable two-digit supplier code
pub const MAX_SUPPLIER_CODE: usize = 99;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Supplier {
    pub supplier_name: String,
    pub supplier_code: Option<String>,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub credit_code: Option<String>,
}

impl Supplier {
    pub fn from_doc(doc: &Document) -> Option<Self> {
        Some(Self {
            supplier_name: doc.text("supplier_name")?,
            supplier_code: doc.text("supplier_code").map(|c| normalize_supplier_code(&c)),
            contact_person: doc.text("contact_person"),
            phone: doc.text("phone"),
            address: doc.text("address"),
            credit_code: doc.text("credit_code"),
        })
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Customer {
    pub customer_name: String,
    pub customer_code: Option<String>,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub credit_limit: Option<f64>,
}

impl Customer {
    pub fn from_doc(doc: &Document) -> Option<Self> {
        Some(Self {
            customer_name: doc.text("customer_name")?,
            customer_code: doc.text("customer_code"),
            contact_person: doc.text("contact_person"),
            phone: doc.text("phone"),
            address: doc.text("address"),
            credit_limit: doc.number("credit_limit"),
        })
    }
}

/// Pad numeric codes to two digits ("5" -> "05"); other text is kept
pub fn normalize_supplier_code(raw: &str) -> String {
    match raw.trim().parse::<u32>() {
        Ok(n) => format!("{:02}", n),
        Err(_) => raw.trim().to_string(),
    }
}

/// Codes for suppliers sorted by name: the first 99 get `01`..`99`
pub fn plan_supplier_codes(mut names: Vec<String>) -> Vec<(String, String)> {
    names.sort();
    names.dedup();
    names
        .into_iter()
        .take(MAX_SUPPLIER_CODE)
        .enumerate()
        .map(|(i, name)| (name, format!("{:02}", i + 1)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_supplier_from_doc() {
        let doc = json!({"supplier_name": "ACME", "supplier_code": 7, "phone": "123"});
        let s = Supplier::from_doc(doc.as_object().unwrap()).unwrap();
        assert_eq!(s.supplier_code.as_deref(), Some("07"));
        assert_eq!(s.phone.as_deref(), Some("123"));

        let missing = json!({"phone": "1"});
        assert!(Supplier::from_doc(missing.as_object().unwrap()).is_none());
    }

    #[test]
    fn test_plan_codes_sorted_by_name() {
        let plan = plan_supplier_codes(vec!["b".into(), "a".into(), "c".into()]);
        assert_eq!(
            plan,
            vec![
                ("a".to_string(), "01".to_string()),
                ("b".to_string(), "02".to_string()),
                ("c".to_string(), "03".to_string()),
            ]
        );
    }

    #[test]
    fn test_plan_codes_caps_at_99() {
        let names: Vec<String> = (0..120).map(|i| format!("S{:03}", i)).collect();
        let plan = plan_supplier_codes(names);
        assert_eq!(plan.len(), 99);
        assert_eq!(plan.last().unwrap().1, "99");
    }
}
