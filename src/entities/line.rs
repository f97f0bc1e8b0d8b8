//! Purchase inbound and sales outbound lines

use chrono::NaiveDate;
use serde::Serialize;

use super::DocExt;
use crate::core::collection::Collection;
use crate::core::store::Document;

/// One goods movement: a purchase from a supplier or a sale to a customer
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TradeLine {
    pub record_no: String,
    pub date: Option<NaiveDate>,
    /// Supplier for purchases, customer for sales
    pub party: String,
    pub material_code: Option<String>,
    pub material_name: Option<String>,
    pub specification: Option<String>,
    pub quantity: f64,
    pub unit_price: Option<f64>,
    pub amount: f64,
}

impl TradeLine {
    /// Read a line from a purchase or sales document. Lines without a party
    /// are attributed to an empty name rather than dropped.
    pub fn from_doc(collection: Collection, doc: &Document) -> Self {
        let quantity = doc.number("quantity").unwrap_or(0.0);
        let unit_price = doc.number("unit_price");
        Self {
            record_no: doc.text_or_default(collection.key_field()),
            date: collection.date_field().and_then(|f| doc.date(f)),
            party: collection
                .party_field()
                .and_then(|f| doc.text(f))
                .unwrap_or_default(),
            material_code: doc.text("material_code"),
            material_name: doc.text("material_name"),
            specification: doc.text("specification"),
            quantity,
            unit_price,
            amount: line_amount(doc),
        }
    }

    /// Material label for grouping: code, else name, else placeholder
    pub fn material_label(&self) -> String {
        self.material_code
            .clone()
            .or_else(|| self.material_name.clone())
            .unwrap_or_else(|| "(unknown)".to_string())
    }

    /// Effective unit price: stored, else amount / quantity
    pub fn effective_price(&self) -> Option<f64> {
        self.unit_price
            .or_else(|| (self.quantity != 0.0).then(|| self.amount / self.quantity))
    }
}

/// Stored amount, else quantity * unit price, else 0
pub fn line_amount(doc: &Document) -> f64 {
    doc.number("amount")
        .or_else(|| Some(doc.number("quantity")? * doc.number("unit_price")?))
        .unwrap_or(0.0)
}
