//! Sales and purchase reports and summaries
//!
//! Both sides share one shape: lines are grouped by (counterparty, material)
//! and the summary carries totals, top lists and a monthly trend. Purchases
//! add a per-material unit price analysis.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{json, Map, Value};

use super::{load_lines, name_matches, ReportOutput, ReportQuery};
use crate::core::collection::Collection;
use crate::core::dates;
use crate::core::error::ImsResult;
use crate::core::store::DocumentStore;
use crate::entities::{round2, TradeLine};

/// Which side of the trade a report covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeSide {
    Sales,
    Purchases,
}

impl TradeSide {
    pub fn collection(self) -> Collection {
        match self {
            TradeSide::Sales => Collection::SalesOutbound,
            TradeSide::Purchases => Collection::PurchaseInbound,
        }
    }

    /// Name of the counterparty column in rows
    pub fn party_field(self) -> &'static str {
        match self {
            TradeSide::Sales => "customer_name",
            TradeSide::Purchases => "supplier_name",
        }
    }

    fn party_plural(self) -> &'static str {
        match self {
            TradeSide::Sales => "customers",
            TradeSide::Purchases => "suppliers",
        }
    }

    fn title(self) -> &'static str {
        match self {
            TradeSide::Sales => "Sales",
            TradeSide::Purchases => "Purchases",
        }
    }

    fn columns(self) -> &'static [&'static str] {
        match self {
            TradeSide::Sales => SALES_COLUMNS,
            TradeSide::Purchases => PURCHASE_COLUMNS,
        }
    }
}

const SALES_COLUMNS: &[&str] = &[
    "customer_name",
    "material_code",
    "material_name",
    "total_quantity",
    "total_amount",
    "line_count",
    "avg_unit_price",
    "first_date",
    "last_date",
];

const PURCHASE_COLUMNS: &[&str] = &[
    "supplier_name",
    "material_code",
    "material_name",
    "total_quantity",
    "total_amount",
    "line_count",
    "avg_unit_price",
    "first_date",
    "last_date",
];

/// Lines of one side in the query's range, filtered by party and material
pub fn filtered_lines(
    store: &DocumentStore,
    side: TradeSide,
    query: &ReportQuery,
) -> ImsResult<Vec<TradeLine>> {
    Ok(load_lines(store, side.collection(), &query.range)?
        .into_iter()
        .filter(|l| name_matches(&l.party, query.party.as_deref()))
        .filter(|l| {
            query.material.as_deref().map_or(true, |m| {
                name_matches(&l.material_label(), Some(m))
                    || l.material_name.as_deref().is_some_and(|n| name_matches(n, Some(m)))
            })
        })
        .collect())
}

#[derive(Default)]
struct Group {
    material_name: Option<String>,
    quantity: f64,
    amount: f64,
    count: usize,
    first: Option<NaiveDate>,
    last: Option<NaiveDate>,
}

impl Group {
    fn add(&mut self, line: &TradeLine) {
        if self.material_name.is_none() {
            self.material_name = line.material_name.clone();
        }
        self.quantity += line.quantity;
        self.amount += line.amount;
        self.count += 1;
        if let Some(d) = line.date {
            self.first = Some(self.first.map_or(d, |f| f.min(d)));
            self.last = Some(self.last.map_or(d, |l| l.max(d)));
        }
    }
}

/// One row per (party, material), largest amount first
pub fn group_lines(side: TradeSide, lines: &[TradeLine]) -> Vec<Map<String, Value>> {
    let mut groups: BTreeMap<(String, String), Group> = BTreeMap::new();
    for line in lines {
        groups
            .entry((line.party.clone(), line.material_label()))
            .or_default()
            .add(line);
    }

    let mut rows: Vec<(f64, Map<String, Value>)> = groups
        .into_iter()
        .map(|((party, material), g)| {
            let avg_price = if g.quantity != 0.0 {
                round2(g.amount / g.quantity)
            } else {
                0.0
            };
            let mut row = Map::new();
            row.insert(side.party_field().into(), json!(party));
            row.insert("material_code".into(), json!(material));
            row.insert("material_name".into(), json!(g.material_name));
            row.insert("total_quantity".into(), json!(round2(g.quantity)));
            row.insert("total_amount".into(), json!(round2(g.amount)));
            row.insert("line_count".into(), json!(g.count));
            row.insert("avg_unit_price".into(), json!(avg_price));
            row.insert("first_date".into(), json!(g.first.map(dates::format_date)));
            row.insert("last_date".into(), json!(g.last.map(dates::format_date)));
            (g.amount, row)
        })
        .collect();
    rows.sort_by(|a, b| b.0.total_cmp(&a.0));
    rows.into_iter().map(|(_, row)| row).collect()
}

/// Amount, quantity and line count per `YYYY-MM`, oldest first.
/// Undated lines are left out.
pub fn monthly_trend(lines: &[TradeLine]) -> Vec<Value> {
    let mut months: BTreeMap<String, (f64, f64, usize)> = BTreeMap::new();
    for line in lines {
        if let Some(d) = line.date {
            let e = months.entry(dates::month_key(d)).or_default();
            e.0 += line.amount;
            e.1 += line.quantity;
            e.2 += 1;
        }
    }
    months
        .into_iter()
        .map(|(month, (amount, quantity, count))| {
            json!({
                "period": month,
                "amount": round2(amount),
                "quantity": round2(quantity),
                "count": count,
            })
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct Ranked {
    pub name: String,
    pub amount: f64,
    pub quantity: f64,
    pub count: usize,
    /// Share of the total amount, percent
    pub share: f64,
}

/// Top `n` names by amount, keyed by `key`
pub fn top_by<F>(lines: &[TradeLine], n: usize, key: F) -> Vec<Ranked>
where
    F: Fn(&TradeLine) -> String,
{
    let total: f64 = lines.iter().map(|l| l.amount).sum();
    let mut acc: BTreeMap<String, (f64, f64, usize)> = BTreeMap::new();
    for line in lines {
        let e = acc.entry(key(line)).or_default();
        e.0 += line.amount;
        e.1 += line.quantity;
        e.2 += 1;
    }
    let mut ranked: Vec<Ranked> = acc
        .into_iter()
        .map(|(name, (amount, quantity, count))| Ranked {
            name,
            amount: round2(amount),
            quantity: round2(quantity),
            count,
            share: super::percent(amount, total),
        })
        .collect();
    ranked.sort_by(|a, b| b.amount.total_cmp(&a.amount).then_with(|| a.name.cmp(&b.name)));
    ranked.truncate(n);
    ranked
}

fn distinct<F: Fn(&TradeLine) -> String>(lines: &[TradeLine], key: F) -> usize {
    lines
        .iter()
        .map(key)
        .collect::<std::collections::BTreeSet<_>>()
        .len()
}

/// Unit price spread per material across purchase lines
pub fn price_analysis(lines: &[TradeLine]) -> Vec<Value> {
    let mut prices: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for line in lines {
        if let Some(p) = line.effective_price() {
            prices.entry(line.material_label()).or_default().push(p);
        }
    }
    prices
        .into_iter()
        .map(|(material, ps)| {
            let min = ps.iter().copied().fold(f64::INFINITY, f64::min);
            let max = ps.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let avg = ps.iter().sum::<f64>() / ps.len() as f64;
            let spread = if min > 0.0 { (max - min) / min * 100.0 } else { 0.0 };
            json!({
                "material_code": material,
                "min_price": round2(min),
                "max_price": round2(max),
                "avg_price": round2(avg),
                "price_spread_pct": round2(spread),
                "samples": ps.len(),
            })
        })
        .collect()
}

fn summarize(side: TradeSide, lines: &[TradeLine], query: &ReportQuery) -> Value {
    let total_amount: f64 = lines.iter().map(|l| l.amount).sum();
    let total_quantity: f64 = lines.iter().map(|l| l.quantity).sum();
    let order_count = lines.len();
    let avg_order = if order_count > 0 {
        round2(total_amount / order_count as f64)
    } else {
        0.0
    };

    let mut summary = Map::new();
    summary.insert("period".into(), query.range.to_value());
    summary.insert("total_amount".into(), json!(round2(total_amount)));
    summary.insert("total_quantity".into(), json!(round2(total_quantity)));
    summary.insert("order_count".into(), json!(order_count));
    summary.insert(
        format!("{}_count", side.party_field().trim_end_matches("_name")),
        json!(distinct(lines, |l| l.party.clone())),
    );
    summary.insert("product_count".into(), json!(distinct(lines, TradeLine::material_label)));
    summary.insert("avg_order_value".into(), json!(avg_order));
    summary.insert(
        format!("top_{}", side.party_plural()),
        json!(top_by(lines, query.top_n, |l| l.party.clone())),
    );
    summary.insert(
        "top_products".into(),
        json!(top_by(lines, query.top_n, TradeLine::material_label)),
    );
    summary.insert("monthly_trend".into(), json!(monthly_trend(lines)));
    if side == TradeSide::Purchases {
        summary.insert("price_analysis".into(), json!(price_analysis(lines)));
    }
    Value::Object(summary)
}

/// Grouped rows plus summary for one side
pub fn trade_report(
    store: &DocumentStore,
    side: TradeSide,
    query: &ReportQuery,
) -> ImsResult<ReportOutput> {
    let lines = filtered_lines(store, side, query)?;
    tracing::debug!(side = side.title(), lines = lines.len(), "building trade report");
    let rows = group_lines(side, &lines);
    ReportOutput::new(side.title(), side.columns(), &rows, summarize(side, &lines, query))
}

/// Summary block alone
pub fn trade_summary(
    store: &DocumentStore,
    side: TradeSide,
    query: &ReportQuery,
) -> ImsResult<Value> {
    let lines = filtered_lines(store, side, query)?;
    Ok(summarize(side, &lines, query))
}

pub fn sales_report(store: &DocumentStore, query: &ReportQuery) -> ImsResult<ReportOutput> {
    trade_report(store, TradeSide::Sales, query)
}

pub fn purchase_report(store: &DocumentStore, query: &ReportQuery) -> ImsResult<ReportOutput> {
    trade_report(store, TradeSide::Purchases, query)
}

pub fn sales_summary(store: &DocumentStore, query: &ReportQuery) -> ImsResult<Value> {
    trade_summary(store, TradeSide::Sales, query)
}

pub fn purchase_summary(store: &DocumentStore, query: &ReportQuery) -> ImsResult<Value> {
    trade_summary(store, TradeSide::Purchases, query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::{fixtures, DateRange};

    #[test]
    fn test_sales_groups() {
        let store = fixtures::store();
        let out = sales_report(&store, &ReportQuery::default()).unwrap();
        // Bob/M1, Bob/M2, Carol/M1
        assert_eq!(out.rows.len(), 3);
        let first = &out.rows[0];
        assert_eq!(first["customer_name"], json!("Carol"));
        assert_eq!(first["total_amount"], json!(90.0));
        assert_eq!(first["avg_unit_price"], json!(4.5));
    }

    #[test]
    fn test_sales_summary_totals() {
        let store = fixtures::store();
        let summary = sales_summary(&store, &ReportQuery::default()).unwrap();
        assert_eq!(summary["total_amount"], json!(152.0));
        assert_eq!(summary["order_count"], json!(3));
        assert_eq!(summary["customer_count"], json!(2));
        assert_eq!(summary["product_count"], json!(2));
        assert_eq!(summary["top_customers"][0]["name"], json!("Carol"));
        let trend = summary["monthly_trend"].as_array().unwrap();
        assert_eq!(trend.len(), 3);
        assert_eq!(trend[0]["period"], json!("2024-01"));
    }

    #[test]
    fn test_purchase_price_analysis() {
        let store = fixtures::store();
        let summary = purchase_summary(&store, &ReportQuery::default()).unwrap();
        assert_eq!(summary["supplier_count"], json!(2));
        let prices = summary["price_analysis"].as_array().unwrap();
        let m1 = prices.iter().find(|p| p["material_code"] == json!("M1")).unwrap();
        assert_eq!(m1["min_price"], json!(2.0));
        assert_eq!(m1["max_price"], json!(2.5));
        assert_eq!(m1["price_spread_pct"], json!(25.0));
    }

    #[test]
    fn test_filters_and_range() {
        let store = fixtures::store();
        let query = ReportQuery {
            party: Some("acme".into()),
            range: DateRange {
                start: NaiveDate::from_ymd_opt(2024, 2, 1),
                end: None,
            },
            ..ReportQuery::default()
        };
        let out = purchase_report(&store, &query).unwrap();
        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.rows[0]["total_amount"], json!(125.0));
        assert_eq!(out.rows[0]["first_date"], json!("2024-02-10"));
    }

    #[test]
    fn test_top_by_truncates() {
        let store = fixtures::store();
        let query = ReportQuery {
            top_n: 1,
            ..ReportQuery::default()
        };
        let summary = sales_summary(&store, &query).unwrap();
        assert_eq!(summary["top_products"].as_array().unwrap().len(), 1);
        assert_eq!(summary["top_products"][0]["name"], json!("M1"));
    }
}
