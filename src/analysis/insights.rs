//! Cross-collection analyses: dashboard KPIs, sales trends, customer
//! value, inventory turnover and sales-vs-purchase comparison

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::core::collection::Collection;
use crate::core::dates;
use crate::core::error::ImsResult;
use crate::core::store::DocumentStore;
use crate::entities::{round2, InventoryItem, StockStatus, TradeLine};
use crate::reports::aging::{payables_summary, receivables_summary};
use crate::reports::inventory::inventory_report;
use crate::reports::trade::{filtered_lines, monthly_trend, top_by, trade_summary, TradeSide};
use crate::reports::{load_inventory, load_lines, load_party_names, percent, ReportQuery};

fn number(summary: &Value, key: &str) -> f64 {
    summary.get(key).and_then(Value::as_f64).unwrap_or(0.0)
}

/// KPIs across every collection for the query's date range
pub fn dashboard_summary(store: &DocumentStore, query: &ReportQuery) -> ImsResult<Value> {
    let sales = trade_summary(store, TradeSide::Sales, query)?;
    let purchases = trade_summary(store, TradeSide::Purchases, query)?;
    let inventory = inventory_report(store, query)?.summary;
    let receivables = receivables_summary(store, query)?;
    let payables = payables_summary(store, query)?;

    let total_sales = number(&sales, "total_amount");
    let total_purchases = number(&purchases, "total_amount");
    let inventory_value = number(&inventory, "total_value");
    let turnover_estimate = if inventory_value > 0.0 {
        round2(total_purchases / inventory_value)
    } else {
        0.0
    };
    // Only customers on file count as active, so the rate stays within 100
    let on_file: BTreeSet<String> = load_party_names(store, Collection::Customers)?
        .into_iter()
        .collect();
    let buyers: BTreeSet<String> = filtered_lines(store, TradeSide::Sales, query)?
        .into_iter()
        .map(|l| l.party)
        .collect();
    let active_on_file = buyers.intersection(&on_file).count();

    Ok(json!({
        "sales": {
            "total_sales": total_sales,
            "total_sales_count": sales["order_count"],
            "active_customers": sales["customer_count"],
            "avg_order_value": sales["avg_order_value"],
        },
        "purchases": {
            "total_purchases": total_purchases,
            "total_purchase_count": purchases["order_count"],
            "active_suppliers": purchases["supplier_count"],
            "avg_purchase_value": purchases["avg_order_value"],
        },
        "inventory": {
            "total_inventory_value": inventory_value,
            "total_inventory_items": inventory["total_items"],
            "low_stock_items": inventory["low_stock_count"],
            "out_of_stock_items": inventory["out_of_stock_count"],
        },
        "financial": {
            "total_receivables": receivables["total_receivables"],
            "overdue_receivables": receivables["overdue_amount"],
            "total_payables": payables["total_payables"],
            "overdue_payables": payables["overdue_amount"],
        },
        "kpis": {
            "gross_margin": round2(total_sales - total_purchases),
            "inventory_turnover_estimate": turnover_estimate,
            "customer_activity_rate": percent(active_on_file as f64, on_file.len() as f64),
        },
        "period": query.range.to_value(),
    }))
}

/// Sales by month, quarter, product or customer
pub fn sales_trend(
    store: &DocumentStore,
    dimension: &str,
    query: &ReportQuery,
) -> ImsResult<Value> {
    let lines = load_lines(store, Collection::SalesOutbound, &query.range)?;
    let series = match dimension {
        "quarter" => fold_quarters(&monthly_trend(&lines)),
        "product" => json!(top_by(&lines, query.top_n, TradeLine::material_label)),
        "customer" => json!(top_by(&lines, query.top_n, |l| l.party.clone())),
        _ => json!(monthly_trend(&lines)),
    };
    Ok(json!({
        "dimension": dimension,
        "series": series,
        "period": query.range.to_value(),
    }))
}

/// Sum monthly points into `YYYY-Qn` buckets
fn fold_quarters(months: &[Value]) -> Value {
    let mut quarters: BTreeMap<String, (f64, f64, u64)> = BTreeMap::new();
    for point in months {
        let Some(q) = point["period"].as_str().and_then(dates::quarter_of_month_key) else {
            continue;
        };
        let e = quarters.entry(q).or_default();
        e.0 += point["amount"].as_f64().unwrap_or(0.0);
        e.1 += point["quantity"].as_f64().unwrap_or(0.0);
        e.2 += point["count"].as_u64().unwrap_or(0);
    }
    Value::Array(
        quarters
            .into_iter()
            .map(|(period, (amount, quantity, count))| {
                json!({
                    "period": period,
                    "amount": round2(amount),
                    "quantity": round2(quantity),
                    "count": count,
                })
            })
            .collect(),
    )
}

/// RFM scores and segment for one customer
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CustomerValue {
    pub customer_name: String,
    pub days_since_last_sale: Option<i64>,
    pub order_count: usize,
    pub total_amount: f64,
    pub recency: u8,
    pub frequency: u8,
    pub monetary: u8,
    pub rfm_score: u8,
    pub customer_segment: &'static str,
}

pub fn recency_score(days: Option<i64>) -> u8 {
    match days {
        Some(d) if d <= 30 => 5,
        Some(d) if d <= 90 => 3,
        _ => 1,
    }
}

pub fn frequency_score(orders: usize) -> u8 {
    if orders >= 10 {
        5
    } else if orders >= 3 {
        3
    } else {
        1
    }
}

pub fn monetary_score(amount: f64) -> u8 {
    if amount > 50_000.0 {
        5
    } else if amount > 10_000.0 {
        3
    } else {
        1
    }
}

pub fn segment(score: u8) -> &'static str {
    match score {
        s if s >= 12 => "champion",
        s if s >= 9 => "loyal",
        s if s >= 6 => "potential",
        _ => "at_risk",
    }
}

fn rfm(lines: &[TradeLine], as_of: NaiveDate) -> Vec<CustomerValue> {
    let mut acc: BTreeMap<&str, (Option<NaiveDate>, usize, f64)> = BTreeMap::new();
    for line in lines.iter().filter(|l| !l.party.is_empty()) {
        let e = acc.entry(line.party.as_str()).or_default();
        e.0 = match (e.0, line.date) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        e.1 += 1;
        e.2 += line.amount;
    }
    let mut out: Vec<CustomerValue> = acc
        .into_iter()
        .map(|(name, (last, count, amount))| {
            let days = last.map(|d| dates::age_days(d, as_of));
            let (r, f, m) = (recency_score(days), frequency_score(count), monetary_score(amount));
            CustomerValue {
                customer_name: name.to_string(),
                days_since_last_sale: days,
                order_count: count,
                total_amount: round2(amount),
                recency: r,
                frequency: f,
                monetary: m,
                rfm_score: r + f + m,
                customer_segment: segment(r + f + m),
            }
        })
        .collect();
    out.sort_by(|a, b| {
        b.rfm_score
            .cmp(&a.rfm_score)
            .then_with(|| b.total_amount.total_cmp(&a.total_amount))
    });
    out
}

/// RFM segmentation, or a plain ranking by sales amount
pub fn customer_value(
    store: &DocumentStore,
    analysis_type: &str,
    query: &ReportQuery,
) -> ImsResult<Value> {
    let lines = load_lines(store, Collection::SalesOutbound, &query.range)?;
    if analysis_type == "ranking" {
        return Ok(json!({
            "analysis_type": "ranking",
            "customers": top_by(&lines, query.top_n, |l| l.party.clone()),
        }));
    }

    let customers = rfm(&lines, query.as_of);
    let mut distribution: BTreeMap<&str, usize> = BTreeMap::new();
    for c in &customers {
        *distribution.entry(c.customer_segment).or_default() += 1;
    }
    Ok(json!({
        "analysis_type": "rfm",
        "as_of": dates::format_date(query.as_of),
        "customers": customers,
        "segment_distribution": distribution,
    }))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnoverCategory {
    FastMoving,
    Normal,
    SlowMoving,
}

impl TurnoverCategory {
    pub fn classify(rate: f64) -> Self {
        if rate > 2.0 {
            TurnoverCategory::FastMoving
        } else if rate < 0.5 {
            TurnoverCategory::SlowMoving
        } else {
            TurnoverCategory::Normal
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct ItemTurnover<'a> {
    material_code: &'a str,
    material_name: Option<&'a str>,
    current_stock: f64,
    stock_value: f64,
    sales_amount: f64,
    turnover_rate: f64,
    stock_status: StockStatus,
    category: TurnoverCategory,
}

fn ratio(num: f64, den: f64) -> f64 {
    if den > 0.0 {
        round2(num / den)
    } else {
        0.0
    }
}

/// Sales against stock value per item and overall
pub fn inventory_turnover(store: &DocumentStore, query: &ReportQuery) -> ImsResult<Value> {
    let items: Vec<InventoryItem> = load_inventory(store, query.low_stock_threshold)?;
    let lines = load_lines(store, Collection::SalesOutbound, &query.range)?;

    let mut sales_by_material: BTreeMap<String, f64> = BTreeMap::new();
    for line in &lines {
        *sales_by_material.entry(line.material_label()).or_default() += line.amount;
    }

    let analysis: Vec<ItemTurnover> = items
        .iter()
        .map(|item| {
            let sales = sales_by_material.get(&item.material_code).copied().unwrap_or(0.0);
            let rate = ratio(sales, item.stock_value);
            ItemTurnover {
                material_code: &item.material_code,
                material_name: item.material_name.as_deref(),
                current_stock: item.current_stock,
                stock_value: item.stock_value,
                sales_amount: round2(sales),
                turnover_rate: rate,
                stock_status: item.stock_status,
                category: TurnoverCategory::classify(rate),
            }
        })
        .collect();

    let total_value: f64 = items.iter().map(|i| i.stock_value).sum();
    let total_sales: f64 = lines.iter().map(|l| l.amount).sum();
    let count = |c: TurnoverCategory| analysis.iter().filter(|a| a.category == c).count();
    let dead: Vec<&InventoryItem> = items
        .iter()
        .filter(|i| i.stock_status == StockStatus::OutOfStock)
        .collect();

    Ok(json!({
        "overall_turnover_rate": ratio(total_sales, total_value),
        "fast_moving_items": count(TurnoverCategory::FastMoving),
        "slow_moving_items": count(TurnoverCategory::SlowMoving),
        "dead_stock_count": dead.len(),
        "total_inventory_value": round2(total_value),
        "total_sales": round2(total_sales),
        "turnover_analysis": analysis,
        "dead_stock_items": dead.into_iter().take(10).collect::<Vec<_>>(),
        "period": query.range.to_value(),
    }))
}

fn wants(list: &[String], name: &str) -> bool {
    list.iter().any(|m| m == name)
}

/// Side-by-side sales and purchase series per requested dimension
pub fn comparison(
    store: &DocumentStore,
    metrics: &[String],
    dimensions: &[String],
    query: &ReportQuery,
) -> ImsResult<Value> {
    let want_sales = wants(metrics, "total_sales") || wants(metrics, "sales_count");
    let want_purchases = wants(metrics, "total_purchases") || wants(metrics, "purchase_count");
    let sales = if want_sales {
        trade_summary(store, TradeSide::Sales, query)?
    } else {
        json!({})
    };
    let purchases = if want_purchases {
        trade_summary(store, TradeSide::Purchases, query)?
    } else {
        json!({})
    };

    let mut data = Map::new();
    let mut section = |name: &str,
                       sales_key: &str,
                       from_sales: &str,
                       purchase_key: &str,
                       from_purchases: &str| {
        let mut s = Map::new();
        if want_sales && !from_sales.is_empty() {
            s.insert(sales_key.into(), sales[from_sales].clone());
        }
        if want_purchases && !from_purchases.is_empty() {
            s.insert(purchase_key.into(), purchases[from_purchases].clone());
        }
        data.insert(name.into(), Value::Object(s));
    };
    if wants(dimensions, "month") {
        section("monthly", "sales_trend", "monthly_trend", "purchase_trend", "monthly_trend");
    }
    if wants(dimensions, "product") {
        section(
            "products",
            "top_selling_products",
            "top_products",
            "top_purchased_products",
            "top_products",
        );
    }
    if wants(dimensions, "customer") {
        section("customers", "top_customers", "top_customers", "", "");
    }
    if wants(dimensions, "supplier") {
        section("suppliers", "", "", "top_suppliers", "top_suppliers");
    }

    let total_sales = number(&sales, "total_amount");
    let total_purchases = number(&purchases, "total_amount");
    let mut summary = Map::new();
    if wants(metrics, "total_sales") {
        summary.insert("total_sales".into(), json!(total_sales));
    }
    if wants(metrics, "sales_count") {
        summary.insert("sales_count".into(), json!(number(&sales, "order_count") as u64));
    }
    if wants(metrics, "total_purchases") {
        summary.insert("total_purchases".into(), json!(total_purchases));
    }
    if wants(metrics, "purchase_count") {
        summary.insert("purchase_count".into(), json!(number(&purchases, "order_count") as u64));
    }
    summary.insert(
        "sales_vs_purchases_ratio".into(),
        json!(round2(total_sales / total_purchases.max(1.0))),
    );
    summary.insert("profit_margin".into(), json!(round2(total_sales - total_purchases)));

    Ok(json!({
        "metrics": metrics,
        "dimensions": dimensions,
        "data": data,
        "summary": summary,
        "period": query.range.to_value(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::fixtures;

    fn query_as_of(y: i32, m: u32, d: u32) -> ReportQuery {
        ReportQuery {
            as_of: NaiveDate::from_ymd_opt(y, m, d).unwrap(),
            ..ReportQuery::default()
        }
    }

    #[test]
    fn test_dashboard_kpis() {
        let store = fixtures::store();
        let data = dashboard_summary(&store, &query_as_of(2024, 3, 31)).unwrap();
        assert_eq!(data["sales"]["total_sales"], json!(152.0));
        assert_eq!(data["purchases"]["total_purchases"], json!(345.0));
        assert_eq!(data["kpis"]["gross_margin"], json!(-193.0));
        assert_eq!(data["kpis"]["inventory_turnover_estimate"], json!(1.68));
        // Two of three customers on file bought something
        assert_eq!(data["kpis"]["customer_activity_rate"], json!(66.67));
        assert_eq!(data["financial"]["total_payables"], json!(125.0));
        assert_eq!(data["inventory"]["out_of_stock_items"], json!(1));
    }

    #[test]
    fn test_activity_rate_ignores_buyers_not_on_file() {
        let store = fixtures::store();
        for (key, customer) in [("S8", "Walk-in"), ("S9", "Mallory")] {
            let line = json!({
                "customer_name": customer,
                "amount": 10,
                "outbound_date": "2024-03-20"
            });
            store
                .upsert(Collection::SalesOutbound, key, line.as_object().unwrap().clone())
                .unwrap();
        }
        let data = dashboard_summary(&store, &query_as_of(2024, 3, 31)).unwrap();
        assert_eq!(data["sales"]["active_customers"], json!(4));
        assert_eq!(data["kpis"]["customer_activity_rate"], json!(66.67));
    }

    #[test]
    fn test_dashboard_empty_store() {
        let store = DocumentStore::open_in_memory().unwrap();
        let data = dashboard_summary(&store, &ReportQuery::default()).unwrap();
        assert_eq!(data["kpis"]["inventory_turnover_estimate"], json!(0.0));
        assert_eq!(data["kpis"]["customer_activity_rate"], json!(0.0));
    }

    #[test]
    fn test_sales_trend_quarter_folds_months() {
        let store = fixtures::store();
        let data = sales_trend(&store, "quarter", &ReportQuery::default()).unwrap();
        let series = data["series"].as_array().unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0]["period"], json!("2024-Q1"));
        assert_eq!(series[0]["amount"], json!(152.0));
        assert_eq!(series[0]["count"], json!(3));

        let data = sales_trend(&store, "customer", &ReportQuery::default()).unwrap();
        assert_eq!(data["series"][0]["name"], json!("Carol"));
    }

    #[test]
    fn test_rfm_scores() {
        assert_eq!(recency_score(Some(30)), 5);
        assert_eq!(recency_score(Some(31)), 3);
        assert_eq!(recency_score(Some(91)), 1);
        assert_eq!(recency_score(None), 1);
        assert_eq!(frequency_score(10), 5);
        assert_eq!(frequency_score(3), 3);
        assert_eq!(frequency_score(2), 1);
        assert_eq!(monetary_score(50_000.0), 3);
        assert_eq!(monetary_score(50_000.01), 5);
        assert_eq!(monetary_score(10_000.0), 1);
        assert_eq!(segment(15), "champion");
        assert_eq!(segment(9), "loyal");
        assert_eq!(segment(6), "potential");
        assert_eq!(segment(5), "at_risk");
    }

    #[test]
    fn test_customer_value_rfm() {
        let store = fixtures::store();
        let data = customer_value(&store, "rfm", &query_as_of(2024, 3, 31)).unwrap();
        let customers = data["customers"].as_array().unwrap();
        assert_eq!(customers.len(), 2);
        // Carol: 21 days, one order, 90 -> 5 + 1 + 1
        assert_eq!(customers[0]["customer_name"], json!("Carol"));
        assert_eq!(customers[0]["rfm_score"], json!(7));
        assert_eq!(customers[0]["customer_segment"], json!("potential"));
        // Bob: 40 days, two orders, 62 -> 3 + 1 + 1
        assert_eq!(customers[1]["rfm_score"], json!(5));
        assert_eq!(data["segment_distribution"]["at_risk"], json!(1));
    }

    #[test]
    fn test_inventory_turnover() {
        let store = fixtures::store();
        let data = inventory_turnover(&store, &ReportQuery::default()).unwrap();
        let items = data["turnover_analysis"].as_array().unwrap();
        let m1 = items.iter().find(|i| i["material_code"] == json!("M1")).unwrap();
        assert_eq!(m1["turnover_rate"], json!(0.7));
        assert_eq!(m1["category"], json!("normal"));
        let m2 = items.iter().find(|i| i["material_code"] == json!("M2")).unwrap();
        assert_eq!(m2["category"], json!("fast_moving"));
        assert_eq!(data["overall_turnover_rate"], json!(0.74));
        assert_eq!(data["dead_stock_count"], json!(1));
        assert_eq!(data["dead_stock_items"][0]["material_code"], json!("M3"));
    }

    #[test]
    fn test_comparison() {
        let store = fixtures::store();
        let metrics = vec!["total_sales".to_string(), "total_purchases".to_string()];
        let dims = vec!["month".to_string(), "supplier".to_string()];
        let data = comparison(&store, &metrics, &dims, &ReportQuery::default()).unwrap();
        assert_eq!(data["summary"]["total_sales"], json!(152.0));
        assert_eq!(data["summary"]["sales_vs_purchases_ratio"], json!(0.44));
        assert_eq!(data["summary"]["profit_margin"], json!(-193.0));
        assert!(data["data"]["monthly"]["sales_trend"].is_array());
        assert_eq!(data["data"]["suppliers"]["top_suppliers"][0]["name"], json!("ACME"));
        assert!(data["data"].get("products").is_none());
    }

    #[test]
    fn test_comparison_ratio_floor() {
        let store = fixtures::store();
        let metrics = vec!["total_sales".to_string()];
        let data = comparison(&store, &metrics, &[], &ReportQuery::default()).unwrap();
        // No purchases requested: divide by 1
        assert_eq!(data["summary"]["sales_vs_purchases_ratio"], json!(152.0));
    }
}
