//! Business reports computed on demand from the document store
//!
//! Every report reads validated parameters (see [`crate::core::params`]),
//! loads the collections it needs, and returns a [`ReportOutput`]: typed
//! rows serialized to JSON objects plus a summary block. Money is rounded
//! to two decimals on the way out.

pub mod aging;
pub mod inventory;
pub mod reconciliation;
pub mod trade;

use chrono::{Local, NaiveDate};
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::core::collection::Collection;
use crate::core::dates;
use crate::core::error::{ImsError, ImsResult};
use crate::core::paginate::{PageInfo, Paginator};
use crate::core::store::DocumentStore;
use crate::entities::{CashFlow, DocExt, InventoryItem, StockStatus, TradeLine};

/// Inclusive date range; open ends match everything
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn contains(&self, date: Option<NaiveDate>) -> bool {
        dates::in_range(date, self.start, self.end)
    }

    pub fn to_value(self) -> Value {
        json!({
            "start_date": self.start.map(dates::format_date),
            "end_date": self.end.map(dates::format_date),
        })
    }
}

/// Report inputs read from a validated parameter map
#[derive(Debug, Clone)]
pub struct ReportQuery {
    pub range: DateRange,
    /// Counterparty name filter (customer or supplier)
    pub party: Option<String>,
    pub material: Option<String>,
    pub product_name: Option<String>,
    pub stock_status: Option<StockStatus>,
    pub low_stock_threshold: f64,
    pub top_n: usize,
    pub as_of: NaiveDate,
    pub paginator: Paginator,
}

impl Default for ReportQuery {
    fn default() -> Self {
        Self {
            range: DateRange::default(),
            party: None,
            material: None,
            product_name: None,
            stock_status: None,
            low_stock_threshold: 10.0,
            top_n: 10,
            as_of: Local::now().date_naive(),
            paginator: Paginator::default(),
        }
    }
}

fn param_str<'a>(params: &'a Map<String, Value>, name: &str) -> Option<&'a str> {
    params
        .get(name)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn param_date(params: &Map<String, Value>, name: &str) -> Option<NaiveDate> {
    param_str(params, name).and_then(dates::parse_date)
}

impl ReportQuery {
    pub fn from_params(params: &Map<String, Value>) -> Self {
        let defaults = Self::default();
        let page = params.get("page").and_then(Value::as_i64).unwrap_or(1);
        let page_size = params
            .get("page_size")
            .and_then(Value::as_i64)
            .unwrap_or(crate::core::paginate::DEFAULT_PAGE_SIZE as i64);
        Self {
            range: DateRange {
                start: param_date(params, "start_date"),
                end: param_date(params, "end_date"),
            },
            party: param_str(params, "customer_name")
                .or_else(|| param_str(params, "supplier_name"))
                .map(str::to_string),
            material: param_str(params, "material_code").map(str::to_string),
            product_name: param_str(params, "product_name").map(str::to_string),
            stock_status: param_str(params, "stock_status").and_then(|s| s.parse().ok()),
            low_stock_threshold: params
                .get("low_stock_threshold")
                .and_then(Value::as_f64)
                .unwrap_or(defaults.low_stock_threshold),
            top_n: params
                .get("top_n")
                .and_then(Value::as_u64)
                .map(|n| n as usize)
                .unwrap_or(defaults.top_n),
            as_of: param_date(params, "as_of").unwrap_or(defaults.as_of),
            paginator: Paginator::new(page, page_size),
        }
    }
}

/// Rows plus summary for one report
#[derive(Debug, Clone)]
pub struct ReportOutput {
    pub title: &'static str,
    /// Columns shown by table output, in order
    pub columns: &'static [&'static str],
    pub rows: Vec<Map<String, Value>>,
    pub summary: Value,
}

impl ReportOutput {
    pub fn new<R: Serialize>(
        title: &'static str,
        columns: &'static [&'static str],
        rows: &[R],
        summary: Value,
    ) -> ImsResult<Self> {
        let rows = rows
            .iter()
            .map(|r| match serde_json::to_value(r)? {
                Value::Object(map) => Ok(map),
                other => Err(ImsError::Other(format!("report row is not an object: {}", other))),
            })
            .collect::<ImsResult<Vec<_>>>()?;
        Ok(Self {
            title,
            columns,
            rows,
            summary,
        })
    }

    /// Envelope payload for one page: `{"rows": [...], "summary": {...}}`
    pub fn into_page(self, paginator: Paginator) -> (Value, PageInfo) {
        let (rows, info) = paginator.paginate(self.rows);
        (json!({ "rows": rows, "summary": self.summary }), info)
    }
}

/// Trade lines in a date range
pub fn load_lines(
    store: &DocumentStore,
    collection: Collection,
    range: &DateRange,
) -> ImsResult<Vec<TradeLine>> {
    Ok(store
        .all(collection)?
        .iter()
        .map(|d| TradeLine::from_doc(collection, d))
        .filter(|l| range.contains(l.date))
        .collect())
}

/// Payments or receipts in a date range
pub fn load_cashflows(
    store: &DocumentStore,
    collection: Collection,
    range: &DateRange,
) -> ImsResult<Vec<CashFlow>> {
    Ok(store
        .all(collection)?
        .iter()
        .map(|d| CashFlow::from_doc(collection, d))
        .filter(|c| range.contains(c.date))
        .collect())
}

pub fn load_inventory(store: &DocumentStore, threshold: f64) -> ImsResult<Vec<InventoryItem>> {
    Ok(store
        .all(Collection::InventoryStats)?
        .iter()
        .filter_map(|d| InventoryItem::from_doc(d, threshold))
        .collect())
}

/// Names on file in a party master collection
pub fn load_party_names(store: &DocumentStore, collection: Collection) -> ImsResult<Vec<String>> {
    Ok(store
        .all(collection)?
        .iter()
        .filter_map(|d| d.text(collection.key_field()))
        .collect())
}

/// Case-insensitive substring filter; `None` matches everything
pub fn name_matches(name: &str, needle: Option<&str>) -> bool {
    needle.map_or(true, |n| name.to_lowercase().contains(&n.to_lowercase()))
}

/// Percentage with a zero-safe denominator
pub fn percent(part: f64, whole: f64) -> f64 {
    if whole == 0.0 {
        0.0
    } else {
        crate::entities::round2(part / whole * 100.0)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_from_params() {
        let params = json!({
            "start_date": "2024-01-01",
            "supplier_name": " ACME ",
            "stock_status": "low_stock",
            "top_n": 3,
            "page": 2,
            "page_size": 5,
        });
        let q = ReportQuery::from_params(params.as_object().unwrap());
        assert_eq!(q.range.start, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(q.range.end, None);
        assert_eq!(q.party.as_deref(), Some("ACME"));
        assert_eq!(q.stock_status, Some(StockStatus::LowStock));
        assert_eq!(q.top_n, 3);
        assert_eq!(q.paginator.page(), 2);
    }

    #[test]
    fn test_load_lines_respects_range() {
        let store = fixtures::store();
        let range = DateRange {
            start: NaiveDate::from_ymd_opt(2024, 2, 1),
            end: NaiveDate::from_ymd_opt(2024, 2, 29),
        };
        let lines = load_lines(&store, Collection::PurchaseInbound, &range).unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].amount, 125.0);
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent(1.0, 3.0), 33.33);
        assert_eq!(percent(5.0, 0.0), 0.0);
    }

    #[test]
    fn test_into_page() {
        #[derive(Serialize)]
        struct Row {
            n: usize,
        }
        let rows: Vec<Row> = (0..7).map(|n| Row { n }).collect();
        let out = ReportOutput::new("t", &["n"], &rows, json!({"count": 7})).unwrap();
        let (data, info) = out.into_page(Paginator::new(2, 5));
        assert_eq!(data["rows"].as_array().unwrap().len(), 2);
        assert_eq!(data["summary"]["count"], json!(7));
        assert_eq!(info.total_count, 7);
    }
}
