//! Entity type definitions
//!
//! Documents in the store are schema-less; these types are the typed views
//! reports and analysis work with:
//!
//! **Parties:**
//! - [`Supplier`] - vendors, optionally carrying a two-digit supplier code
//! - [`Customer`] - buyers with contact details and credit limit
//!
//! **Catalog & stock:**
//! - [`Material`] - purchasable items keyed by material code
//! - [`InventoryItem`] - current stock snapshot per material
//!
//! **Transactions:**
//! - [`TradeLine`] - purchase inbound and sales outbound lines
//! - [`CashFlow`] - supplier payments and customer receipts

pub mod cashflow;
pub mod inventory;
pub mod line;
pub mod material;
pub mod party;

pub use cashflow::CashFlow;
pub use inventory::{InventoryItem, StockStatus};
pub use line::TradeLine;
pub use material::{Material, MaterialCode};
pub use party::{Customer, Supplier};

use chrono::NaiveDate;
use serde_json::{Map, Value};

use crate::core::{dates, fields};

/// Typed field access on a JSON document
pub trait DocExt {
    /// Trimmed, non-empty text; numbers are rendered as text
    fn text(&self, field: &str) -> Option<String>;

    /// Numeric value; numeric strings are parsed
    fn number(&self, field: &str) -> Option<f64>;

    /// Date in any supported format
    fn date(&self, field: &str) -> Option<NaiveDate>;

    /// Text or empty string
    fn text_or_default(&self, field: &str) -> String {
        self.text(field).unwrap_or_default()
    }
}

impl DocExt for Map<String, Value> {
    fn text(&self, field: &str) -> Option<String> {
        self.get(field).and_then(fields::text_of)
    }

    fn number(&self, field: &str) -> Option<f64> {
        self.get(field).and_then(fields::number_of)
    }

    fn date(&self, field: &str) -> Option<NaiveDate> {
        self.get(field).and_then(dates::parse_date_value)
    }
}

/// Round to 2 decimal places for money output
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_doc_ext_accessors() {
        let doc = json!({"name": " ACME ", "qty": "1,200", "when": "2024.3.1", "blank": ""});
        let doc = doc.as_object().unwrap();
        assert_eq!(doc.text("name").as_deref(), Some("ACME"));
        assert_eq!(doc.number("qty"), Some(1200.0));
        assert_eq!(doc.date("when"), NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(doc.text("blank"), None);
        assert_eq!(doc.text_or_default("missing"), "");
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(10.0 / 3.0), 3.33);
        assert_eq!(round2(2.345_6), 2.35);
    }
}
