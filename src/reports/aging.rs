//! Payables and receivables aging
//!
//! Builds on reconciliation balances. Age runs from the latest goods line
//! to `as_of`; lines with no date age as 0 days.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{json, Map, Value};

use super::reconciliation::{balances, Ledger, PartyBalance};
use super::{percent, ReportOutput, ReportQuery};
use crate::core::dates;
use crate::core::error::ImsResult;
use crate::core::store::DocumentStore;
use crate::entities::round2;

/// Days past which a balance counts as overdue
pub const OVERDUE_DAYS: i64 = 30;

/// Bucket labels in display order
pub const AGE_RANGES: &[&str] = &["0-30", "31-60", "61-90", "91-180", "180+"];

pub fn age_range(days: i64) -> &'static str {
    match days {
        d if d <= 30 => "0-30",
        d if d <= 60 => "31-60",
        d if d <= 90 => "61-90",
        d if d <= 180 => "91-180",
        _ => "180+",
    }
}

/// How soon a supplier should be paid
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    None,
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn assess(balance: f64, age_days: i64) -> Self {
        if balance <= 0.0 {
            Priority::None
        } else if age_days > 90 {
            Priority::Urgent
        } else if age_days > 60 {
            Priority::High
        } else if age_days > 30 {
            Priority::Medium
        } else {
            Priority::Low
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::None => "none",
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }
}

/// Collection risk for a customer balance
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Risk {
    None,
    Low,
    Medium,
    High,
}

impl Risk {
    pub fn assess(balance: f64, age_days: i64) -> Self {
        if balance <= 0.0 {
            Risk::None
        } else if age_days <= 30 {
            Risk::Low
        } else if age_days <= 90 {
            Risk::Medium
        } else {
            Risk::High
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Risk::None => "none",
            Risk::Low => "low",
            Risk::Medium => "medium",
            Risk::High => "high",
        }
    }
}

/// One aged balance
#[derive(Debug, Clone)]
pub struct AgedBalance {
    pub balance: PartyBalance,
    pub age_days: i64,
    /// `priority_level` for payables, `risk_level` for receivables
    pub level: &'static str,
}

impl AgedBalance {
    fn amount(&self) -> f64 {
        self.balance.balance()
    }

    fn age_range(&self) -> &'static str {
        age_range(self.age_days)
    }

    fn is_overdue(&self) -> bool {
        self.age_days > OVERDUE_DAYS && self.amount() > 0.0
    }

    fn to_row(&self, ledger: Ledger) -> Map<String, Value> {
        let b = &self.balance;
        let (party, line, cash, bal, level, date) = match ledger {
            Ledger::Suppliers => (
                "supplier_name",
                "purchase_amount",
                "payment_amount",
                "payable_balance",
                "priority_level",
                "latest_purchase_date",
            ),
            Ledger::Customers => (
                "customer_name",
                "sales_amount",
                "receipt_amount",
                "receivable_balance",
                "risk_level",
                "latest_sales_date",
            ),
        };
        let mut row = Map::new();
        row.insert(party.into(), json!(b.party));
        row.insert(line.into(), json!(round2(b.line_amount)));
        row.insert(cash.into(), json!(round2(b.cash_amount)));
        row.insert(bal.into(), json!(self.amount()));
        row.insert(date.into(), json!(b.latest_line.map(dates::format_date)));
        row.insert("age_days".into(), json!(self.age_days));
        row.insert("age_range".into(), json!(self.age_range()));
        row.insert(level.into(), json!(self.level));
        row
    }
}

/// Aged balances, largest balance first
pub fn aged_balances(
    store: &DocumentStore,
    ledger: Ledger,
    query: &ReportQuery,
) -> ImsResult<Vec<AgedBalance>> {
    let mut aged: Vec<AgedBalance> = balances(store, ledger, query)?
        .into_iter()
        .map(|b| {
            let age_days = b.latest_line.map_or(0, |d| dates::age_days(d, query.as_of));
            let level = match ledger {
                Ledger::Suppliers => Priority::assess(b.balance(), age_days).as_str(),
                Ledger::Customers => Risk::assess(b.balance(), age_days).as_str(),
            };
            AgedBalance {
                balance: b,
                age_days,
                level,
            }
        })
        .collect();
    aged.sort_by(|a, b| {
        b.amount()
            .total_cmp(&a.amount())
            .then_with(|| a.balance.party.cmp(&b.balance.party))
    });
    Ok(aged)
}

fn summarize(ledger: Ledger, aged: &[AgedBalance], query: &ReportQuery) -> Value {
    let positive: Vec<&AgedBalance> = aged.iter().filter(|a| a.amount() > 0.0).collect();
    let total: f64 = positive.iter().map(|a| a.amount()).sum();
    let overdue: Vec<&&AgedBalance> = positive.iter().filter(|a| a.is_overdue()).collect();
    let overdue_amount: f64 = overdue.iter().map(|a| a.amount()).sum();

    let mut age_distribution: BTreeMap<&str, f64> = BTreeMap::new();
    let mut level_distribution: BTreeMap<&str, f64> = BTreeMap::new();
    for a in &positive {
        *age_distribution.entry(a.age_range()).or_default() += a.amount();
        *level_distribution.entry(a.level).or_default() += a.amount();
    }
    let age_distribution: Map<String, Value> = AGE_RANGES
        .iter()
        .filter_map(|r| age_distribution.get(r).map(|v| (r.to_string(), json!(round2(*v)))))
        .collect();
    let level_distribution: Map<String, Value> = level_distribution
        .into_iter()
        .map(|(k, v)| (k.to_string(), json!(round2(v))))
        .collect();

    let top: Vec<Value> = positive
        .iter()
        .take(query.top_n)
        .map(|a| Value::Object(a.to_row(ledger)))
        .collect();

    let (total_key, count_key, level_key, top_key) = match ledger {
        Ledger::Suppliers => (
            "total_payables",
            "supplier_count",
            "priority_distribution",
            "top_payables",
        ),
        Ledger::Customers => (
            "total_receivables",
            "customer_count",
            "risk_distribution",
            "top_receivables",
        ),
    };
    let mut summary = Map::new();
    summary.insert("period".into(), query.range.to_value());
    summary.insert("as_of".into(), json!(dates::format_date(query.as_of)));
    summary.insert(total_key.into(), json!(round2(total)));
    summary.insert(count_key.into(), json!(positive.len()));
    summary.insert("overdue_amount".into(), json!(round2(overdue_amount)));
    summary.insert("overdue_count".into(), json!(overdue.len()));
    summary.insert("overdue_rate".into(), json!(percent(overdue_amount, total)));
    summary.insert("age_distribution".into(), Value::Object(age_distribution));
    summary.insert(level_key.into(), Value::Object(level_distribution));
    summary.insert(top_key.into(), Value::Array(top));
    Value::Object(summary)
}

const PAYABLE_COLUMNS: &[&str] = &[
    "supplier_name",
    "purchase_amount",
    "payment_amount",
    "payable_balance",
    "latest_purchase_date",
    "age_days",
    "age_range",
    "priority_level",
];

const RECEIVABLE_COLUMNS: &[&str] = &[
    "customer_name",
    "sales_amount",
    "receipt_amount",
    "receivable_balance",
    "latest_sales_date",
    "age_days",
    "age_range",
    "risk_level",
];

pub fn aging_report(
    store: &DocumentStore,
    ledger: Ledger,
    query: &ReportQuery,
) -> ImsResult<ReportOutput> {
    let aged = aged_balances(store, ledger, query)?;
    let rows: Vec<Map<String, Value>> = aged.iter().map(|a| a.to_row(ledger)).collect();
    let summary = summarize(ledger, &aged, query);
    tracing::debug!(parties = rows.len(), "aged balances computed");
    match ledger {
        Ledger::Suppliers => ReportOutput::new("Payables", PAYABLE_COLUMNS, &rows, summary),
        Ledger::Customers => ReportOutput::new("Receivables", RECEIVABLE_COLUMNS, &rows, summary),
    }
}

pub fn payables_report(store: &DocumentStore, query: &ReportQuery) -> ImsResult<ReportOutput> {
    aging_report(store, Ledger::Suppliers, query)
}

pub fn receivables_report(store: &DocumentStore, query: &ReportQuery) -> ImsResult<ReportOutput> {
    aging_report(store, Ledger::Customers, query)
}

pub fn payables_summary(store: &DocumentStore, query: &ReportQuery) -> ImsResult<Value> {
    let aged = aged_balances(store, Ledger::Suppliers, query)?;
    Ok(summarize(Ledger::Suppliers, &aged, query))
}

pub fn receivables_summary(store: &DocumentStore, query: &ReportQuery) -> ImsResult<Value> {
    let aged = aged_balances(store, Ledger::Customers, query)?;
    Ok(summarize(Ledger::Customers, &aged, query))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::fixtures;
    use chrono::NaiveDate;

    #[test]
    fn test_age_range_boundaries() {
        assert_eq!(age_range(0), "0-30");
        assert_eq!(age_range(30), "0-30");
        assert_eq!(age_range(31), "31-60");
        assert_eq!(age_range(60), "31-60");
        assert_eq!(age_range(61), "61-90");
        assert_eq!(age_range(90), "61-90");
        assert_eq!(age_range(91), "91-180");
        assert_eq!(age_range(180), "91-180");
        assert_eq!(age_range(181), "180+");
    }

    #[test]
    fn test_priority_boundaries() {
        assert_eq!(Priority::assess(0.0, 400), Priority::None);
        assert_eq!(Priority::assess(-5.0, 10), Priority::None);
        assert_eq!(Priority::assess(1.0, 30), Priority::Low);
        assert_eq!(Priority::assess(1.0, 31), Priority::Medium);
        assert_eq!(Priority::assess(1.0, 60), Priority::Medium);
        assert_eq!(Priority::assess(1.0, 61), Priority::High);
        assert_eq!(Priority::assess(1.0, 90), Priority::High);
        assert_eq!(Priority::assess(1.0, 91), Priority::Urgent);
    }

    #[test]
    fn test_risk_boundaries() {
        assert_eq!(Risk::assess(0.0, 200), Risk::None);
        assert_eq!(Risk::assess(1.0, 30), Risk::Low);
        assert_eq!(Risk::assess(1.0, 31), Risk::Medium);
        assert_eq!(Risk::assess(1.0, 90), Risk::Medium);
        assert_eq!(Risk::assess(1.0, 91), Risk::High);
    }

    fn as_of(y: i32, m: u32, d: u32) -> ReportQuery {
        ReportQuery {
            as_of: NaiveDate::from_ymd_opt(y, m, d).unwrap(),
            ..ReportQuery::default()
        }
    }

    #[test]
    fn test_payables_rows() {
        let store = fixtures::store();
        // ACME last purchase 2024-02-10, 50 days before 2024-03-31
        let out = payables_report(&store, &as_of(2024, 3, 31)).unwrap();
        assert_eq!(out.rows.len(), 2);
        let acme = &out.rows[0];
        assert_eq!(acme["supplier_name"], json!("ACME"));
        assert_eq!(acme["payable_balance"], json!(125.0));
        assert_eq!(acme["age_days"], json!(50));
        assert_eq!(acme["age_range"], json!("31-60"));
        assert_eq!(acme["priority_level"], json!("medium"));
        // Globex is overpaid
        assert_eq!(out.rows[1]["priority_level"], json!("none"));
    }

    #[test]
    fn test_payables_summary() {
        let store = fixtures::store();
        let summary = payables_summary(&store, &as_of(2024, 3, 31)).unwrap();
        assert_eq!(summary["total_payables"], json!(125.0));
        assert_eq!(summary["supplier_count"], json!(1));
        assert_eq!(summary["overdue_amount"], json!(125.0));
        assert_eq!(summary["overdue_count"], json!(1));
        assert_eq!(summary["overdue_rate"], json!(100.0));
        assert_eq!(summary["age_distribution"]["31-60"], json!(125.0));
        assert_eq!(summary["priority_distribution"]["medium"], json!(125.0));
        assert_eq!(summary["top_payables"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_receivables_nothing_outstanding() {
        let store = fixtures::store();
        let summary = receivables_summary(&store, &as_of(2024, 6, 1)).unwrap();
        // Bob paid in full, Carol overpaid
        assert_eq!(summary["total_receivables"], json!(0.0));
        assert_eq!(summary["customer_count"], json!(0));
        assert_eq!(summary["overdue_rate"], json!(0.0));
        assert!(summary["age_distribution"].as_object().unwrap().is_empty());
    }

    #[test]
    fn test_receivables_risk() {
        let store = fixtures::store();
        let doc = json!({"customer_name": "Bob", "amount": 500, "outbound_date": "2024-01-01"});
        store
            .upsert(
                crate::core::collection::Collection::SalesOutbound,
                "S9",
                doc.as_object().unwrap().clone(),
            )
            .unwrap();
        let out = receivables_report(&store, &as_of(2024, 6, 1)).unwrap();
        let bob = &out.rows[0];
        assert_eq!(bob["customer_name"], json!("Bob"));
        assert_eq!(bob["receivable_balance"], json!(500.0));
        // Latest sale 2024-02-20, 102 days earlier
        assert_eq!(bob["age_days"], json!(102));
        assert_eq!(bob["risk_level"], json!("high"));
    }
}
