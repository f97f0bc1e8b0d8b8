//! Payments to suppliers and receipts from customers

use chrono::NaiveDate;
use serde::Serialize;

use super::DocExt;
use crate::core::collection::Collection;
use crate::core::store::Document;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CashFlow {
    pub record_no: String,
    pub date: Option<NaiveDate>,
    pub party: String,
    pub amount: f64,
    pub payment_method: Option<String>,
}

impl CashFlow {
    pub fn from_doc(collection: Collection, doc: &Document) -> Self {
        Self {
            record_no: doc.text_or_default(collection.key_field()),
            date: collection.date_field().and_then(|f| doc.date(f)),
            party: collection
                .party_field()
                .and_then(|f| doc.text(f))
                .unwrap_or_default(),
            amount: doc.number("amount").unwrap_or(0.0),
            payment_method: doc.text("payment_method"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_receipt_from_doc() {
        let doc = json!({
            "record_no": "S-1",
            "customer_name": "Bob",
            "amount": "¥1,000",
            "receipt_date": "2024/5/6"
        });
        let r = CashFlow::from_doc(Collection::ReceiptDetails, doc.as_object().unwrap());
        assert_eq!(r.party, "Bob");
        assert_eq!(r.amount, 1000.0);
        assert_eq!(r.date, NaiveDate::from_ymd_opt(2024, 5, 6));
    }

    #[test]
    fn test_missing_amount_is_zero() {
        let doc = json!({"supplier_name": "ACME"});
        let p = CashFlow::from_doc(Collection::PaymentDetails, doc.as_object().unwrap());
        assert_eq!(p.amount, 0.0);
        assert_eq!(p.date, None);
    }
}
