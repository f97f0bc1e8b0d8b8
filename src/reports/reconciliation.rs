//! Supplier and customer reconciliation
//!
//! A ledger pairs goods lines with cash flows for one kind of counterparty:
//! purchases against payments for suppliers, sales against receipts for
//! customers. `balance = lines - cash`; a negative balance is `overpaid`.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde_json::{json, Map, Value};

use super::{
    load_cashflows, load_lines, load_party_names, name_matches, ReportOutput, ReportQuery,
};
use crate::core::collection::Collection;
use crate::core::dates;
use crate::core::error::ImsResult;
use crate::core::store::DocumentStore;
use crate::entities::round2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ledger {
    Suppliers,
    Customers,
}

impl Ledger {
    pub fn party_collection(self) -> Collection {
        match self {
            Ledger::Suppliers => Collection::Suppliers,
            Ledger::Customers => Collection::Customers,
        }
    }

    pub fn line_collection(self) -> Collection {
        match self {
            Ledger::Suppliers => Collection::PurchaseInbound,
            Ledger::Customers => Collection::SalesOutbound,
        }
    }

    pub fn cash_collection(self) -> Collection {
        match self {
            Ledger::Suppliers => Collection::PaymentDetails,
            Ledger::Customers => Collection::ReceiptDetails,
        }
    }

    pub fn party_field(self) -> &'static str {
        match self {
            Ledger::Suppliers => "supplier_name",
            Ledger::Customers => "customer_name",
        }
    }

    /// Prefix for line columns: `purchase` or `sales`
    pub fn line_label(self) -> &'static str {
        match self {
            Ledger::Suppliers => "purchase",
            Ledger::Customers => "sales",
        }
    }

    /// Prefix for cash columns: `payment` or `receipt`
    pub fn cash_label(self) -> &'static str {
        match self {
            Ledger::Suppliers => "payment",
            Ledger::Customers => "receipt",
        }
    }
}

/// Line and cash totals for one counterparty
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartyBalance {
    pub party: String,
    pub line_amount: f64,
    pub line_count: usize,
    pub latest_line: Option<NaiveDate>,
    pub cash_amount: f64,
    pub cash_count: usize,
    pub latest_cash: Option<NaiveDate>,
}

impl PartyBalance {
    pub fn balance(&self) -> f64 {
        round2(self.line_amount - self.cash_amount)
    }

    pub fn status(&self) -> &'static str {
        if self.balance() >= 0.0 {
            "normal"
        } else {
            "overpaid"
        }
    }
}

fn latest(current: Option<NaiveDate>, date: Option<NaiveDate>) -> Option<NaiveDate> {
    match (current, date) {
        (Some(c), Some(d)) => Some(c.max(d)),
        (c, d) => c.or(d),
    }
}

fn entry<'a>(
    acc: &'a mut BTreeMap<String, PartyBalance>,
    name: &str,
    filter: Option<&str>,
) -> Option<&'a mut PartyBalance> {
    if name.is_empty() || !name_matches(name, filter) {
        return None;
    }
    Some(acc.entry(name.to_string()).or_insert_with(|| PartyBalance {
        party: name.to_string(),
        ..PartyBalance::default()
    }))
}

/// Balances per counterparty, ordered by name. Parties come from the
/// master list plus every name seen in lines or cash flows.
pub fn balances(
    store: &DocumentStore,
    ledger: Ledger,
    query: &ReportQuery,
) -> ImsResult<Vec<PartyBalance>> {
    let filter = query.party.as_deref();
    let mut acc: BTreeMap<String, PartyBalance> = BTreeMap::new();

    for name in load_party_names(store, ledger.party_collection())? {
        entry(&mut acc, &name, filter);
    }
    for line in load_lines(store, ledger.line_collection(), &query.range)? {
        if let Some(b) = entry(&mut acc, &line.party, filter) {
            b.line_amount += line.amount;
            b.line_count += 1;
            b.latest_line = latest(b.latest_line, line.date);
        }
    }
    for cash in load_cashflows(store, ledger.cash_collection(), &query.range)? {
        if let Some(b) = entry(&mut acc, &cash.party, filter) {
            b.cash_amount += cash.amount;
            b.cash_count += 1;
            b.latest_cash = latest(b.latest_cash, cash.date);
        }
    }
    Ok(acc.into_values().collect())
}

fn row(ledger: Ledger, b: &PartyBalance) -> Map<String, Value> {
    let (l, c) = (ledger.line_label(), ledger.cash_label());
    let mut row = Map::new();
    row.insert(ledger.party_field().into(), json!(b.party));
    row.insert(format!("{}_amount", l), json!(round2(b.line_amount)));
    row.insert(format!("{}_count", l), json!(b.line_count));
    row.insert(format!("latest_{}_date", l), json!(b.latest_line.map(dates::format_date)));
    row.insert(format!("{}_amount", c), json!(round2(b.cash_amount)));
    row.insert(format!("{}_count", c), json!(b.cash_count));
    row.insert(format!("latest_{}_date", c), json!(b.latest_cash.map(dates::format_date)));
    row.insert("balance".into(), json!(b.balance()));
    row.insert("status".into(), json!(b.status()));
    row
}

const SUPPLIER_COLUMNS: &[&str] = &[
    "supplier_name",
    "purchase_amount",
    "payment_amount",
    "balance",
    "status",
    "latest_purchase_date",
    "latest_payment_date",
];

const CUSTOMER_COLUMNS: &[&str] = &[
    "customer_name",
    "sales_amount",
    "receipt_amount",
    "balance",
    "status",
    "latest_sales_date",
    "latest_receipt_date",
];

pub fn reconciliation_report(
    store: &DocumentStore,
    ledger: Ledger,
    query: &ReportQuery,
) -> ImsResult<ReportOutput> {
    let balances = balances(store, ledger, query)?;
    let rows: Vec<Map<String, Value>> = balances.iter().map(|b| row(ledger, b)).collect();

    let (l, c) = (ledger.line_label(), ledger.cash_label());
    let line_total: f64 = balances.iter().map(|b| b.line_amount).sum();
    let cash_total: f64 = balances.iter().map(|b| b.cash_amount).sum();
    let mut summary = Map::new();
    summary.insert("period".into(), query.range.to_value());
    summary.insert("party_count".into(), json!(balances.len()));
    summary.insert(format!("total_{}_amount", l), json!(round2(line_total)));
    summary.insert(format!("total_{}_amount", c), json!(round2(cash_total)));
    summary.insert("total_balance".into(), json!(round2(line_total - cash_total)));
    summary.insert(
        "overpaid_count".into(),
        json!(balances.iter().filter(|b| b.status() == "overpaid").count()),
    );

    let (title, columns) = match ledger {
        Ledger::Suppliers => ("Supplier reconciliation", SUPPLIER_COLUMNS),
        Ledger::Customers => ("Customer reconciliation", CUSTOMER_COLUMNS),
    };
    ReportOutput::new(title, columns, &rows, Value::Object(summary))
}

pub fn supplier_reconciliation(
    store: &DocumentStore,
    query: &ReportQuery,
) -> ImsResult<ReportOutput> {
    reconciliation_report(store, Ledger::Suppliers, query)
}

pub fn customer_reconciliation(
    store: &DocumentStore,
    query: &ReportQuery,
) -> ImsResult<ReportOutput> {
    reconciliation_report(store, Ledger::Customers, query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::fixtures;

    #[test]
    fn test_supplier_balances() {
        let store = fixtures::store();
        let out = supplier_reconciliation(&store, &ReportQuery::default()).unwrap();
        assert_eq!(out.rows.len(), 2);
        let acme = &out.rows[0];
        assert_eq!(acme["supplier_name"], json!("ACME"));
        assert_eq!(acme["purchase_amount"], json!(325.0));
        assert_eq!(acme["payment_amount"], json!(200.0));
        assert_eq!(acme["balance"], json!(125.0));
        assert_eq!(acme["status"], json!("normal"));
        assert_eq!(acme["latest_purchase_date"], json!("2024-02-10"));
        assert_eq!(out.summary["total_balance"], json!(95.0));
    }

    #[test]
    fn test_customer_overpaid_and_master_only() {
        let store = fixtures::store();
        let out = customer_reconciliation(&store, &ReportQuery::default()).unwrap();
        // Bob, Carol, Dormant (on file, no activity)
        assert_eq!(out.rows.len(), 3);
        let carol = out.rows.iter().find(|r| r["customer_name"] == json!("Carol")).unwrap();
        assert_eq!(carol["balance"], json!(-10.0));
        assert_eq!(carol["status"], json!("overpaid"));
        let dormant = out.rows.iter().find(|r| r["customer_name"] == json!("Dormant")).unwrap();
        assert_eq!(dormant["balance"], json!(0.0));
        assert_eq!(dormant["latest_sales_date"], Value::Null);
        assert_eq!(out.summary["overpaid_count"], json!(1));
    }

    #[test]
    fn test_names_seen_only_in_lines_are_included() {
        let store = fixtures::store();
        let doc = json!({"supplier_name": "Initech", "quantity": 1, "unit_price": 9});
        store
            .upsert(Collection::PurchaseInbound, "P9", doc.as_object().unwrap().clone())
            .unwrap();
        let rows = balances(&store, Ledger::Suppliers, &ReportQuery::default()).unwrap();
        assert!(rows.iter().any(|b| b.party == "Initech" && b.balance() == 9.0));
    }

    #[test]
    fn test_party_filter() {
        let store = fixtures::store();
        let query = ReportQuery {
            party: Some("glob".into()),
            ..ReportQuery::default()
        };
        let rows = balances(&store, Ledger::Suppliers, &query).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].balance(), -30.0);
    }
}
