//! Parameter validation for analysis and report methods
//!
//! Every callable method has a fixed table describing the parameters it
//! accepts. Raw JSON parameters go through [`ParamTable::validate`], which
//! drops unknown keys, fills defaults, coerces types, clamps numbers into
//! range, and rejects anything that cannot be made valid. The result is a
//! clean JSON object the method implementations can read without further
//! checks.

use chrono::{Local, NaiveDate};
use miette::Diagnostic;
use serde_json::{Map, Number, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::core::dates;
use crate::core::error::{ImsError, ImsResult};
use crate::core::fields;

/// A parameter that could not be coerced into its declared shape
#[derive(Debug, Clone, PartialEq, Error, Diagnostic)]
#[error("invalid parameter '{field}': {reason}")]
#[diagnostic(
    code(ims::params),
    help("run `ims params --list` to see accepted parameters")
)]
pub struct ParamError {
    pub field: String,
    pub value: Value,
    pub reason: String,
}

impl ParamError {
    fn new(field: &str, value: &Value, reason: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            value: value.clone(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Whole number; floats are truncated
    Int,
    Number,
    Text,
    /// Any supported date format, emitted as `YYYY-MM-DD`
    Date,
    /// List of text values; accepts arrays or comma-separated strings
    List,
}

impl std::fmt::Display for ParamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamKind::Int => write!(f, "int"),
            ParamKind::Number => write!(f, "number"),
            ParamKind::Text => write!(f, "text"),
            ParamKind::Date => write!(f, "date"),
            ParamKind::List => write!(f, "list"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamDefault {
    None,
    Int(i64),
    Number(f64),
    Text(&'static str),
    List(&'static [&'static str]),
    /// Today's local date
    Today,
}

impl ParamDefault {
    fn to_value(self, today: NaiveDate) -> Option<Value> {
        match self {
            ParamDefault::None => None,
            ParamDefault::Int(i) => Some(Value::from(i)),
            ParamDefault::Number(n) => Number::from_f64(n).map(Value::Number),
            ParamDefault::Text(s) => Some(Value::from(s)),
            ParamDefault::List(items) => Some(Value::from(items.to_vec())),
            ParamDefault::Today => Some(Value::from(dates::format_date(today))),
        }
    }
}

/// One row of a method's parameter table
#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub allowed: &'static [&'static str],
    pub default: ParamDefault,
    pub help: &'static str,
}

impl ParamSpec {
    const fn new(name: &'static str, kind: ParamKind, help: &'static str) -> Self {
        Self {
            name,
            kind,
            min: None,
            max: None,
            allowed: &[],
            default: ParamDefault::None,
            help,
        }
    }

    const fn range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    const fn one_of(mut self, allowed: &'static [&'static str]) -> Self {
        self.allowed = allowed;
        self
    }

    const fn default(mut self, default: ParamDefault) -> Self {
        self.default = default;
        self
    }
}

/// Parameter table for one method
#[derive(Debug)]
pub struct ParamTable {
    pub method: &'static str,
    pub description: &'static str,
    pub params: &'static [ParamSpec],
}

// Shared rows

const START_DATE: ParamSpec =
    ParamSpec::new("start_date", ParamKind::Date, "first day of the range (inclusive)");
const END_DATE: ParamSpec =
    ParamSpec::new("end_date", ParamKind::Date, "last day of the range (inclusive)");
const PAGE: ParamSpec = ParamSpec::new("page", ParamKind::Int, "page number")
    .range(Some(1.0), None)
    .default(ParamDefault::Int(1));
const PAGE_SIZE: ParamSpec = ParamSpec::new("page_size", ParamKind::Int, "rows per page")
    .range(Some(1.0), Some(500.0))
    .default(ParamDefault::Int(50));
const TOP_N: ParamSpec = ParamSpec::new("top_n", ParamKind::Int, "length of ranked lists")
    .range(Some(1.0), Some(100.0))
    .default(ParamDefault::Int(10));
const LOW_STOCK_THRESHOLD: ParamSpec = ParamSpec::new(
    "low_stock_threshold",
    ParamKind::Number,
    "stock at or below this is low",
)
.range(Some(0.0), Some(1_000_000.0))
.default(ParamDefault::Number(10.0));
const AS_OF: ParamSpec = ParamSpec::new("as_of", ParamKind::Date, "reference date for aging")
    .default(ParamDefault::Today);
const CUSTOMER_NAME: ParamSpec =
    ParamSpec::new("customer_name", ParamKind::Text, "customer name contains");
const SUPPLIER_NAME: ParamSpec =
    ParamSpec::new("supplier_name", ParamKind::Text, "supplier name contains");
const MATERIAL_CODE: ParamSpec =
    ParamSpec::new("material_code", ParamKind::Text, "material code contains");

const DIMENSION: ParamSpec = ParamSpec::new("dimension", ParamKind::Text, "trend grouping")
    .one_of(&["month", "quarter", "product", "customer"])
    .default(ParamDefault::Text("month"));
const ANALYSIS_TYPE: ParamSpec =
    ParamSpec::new("analysis_type", ParamKind::Text, "customer value model")
        .one_of(&["rfm", "ranking"])
        .default(ParamDefault::Text("rfm"));
const METRICS: ParamSpec = ParamSpec::new("metrics", ParamKind::List, "series to compare")
    .one_of(&["total_sales", "sales_count", "total_purchases", "purchase_count"])
    .default(ParamDefault::List(&["total_sales", "total_purchases"]));
const DIMENSIONS: ParamSpec =
    ParamSpec::new("dimensions", ParamKind::List, "groupings to compare by")
        .one_of(&["month", "product", "customer", "supplier"])
        .default(ParamDefault::List(&["month", "product"]));
const PRODUCT_NAME: ParamSpec =
    ParamSpec::new("product_name", ParamKind::Text, "material name or code contains");
const STOCK_STATUS: ParamSpec = ParamSpec::new("stock_status", ParamKind::Text, "stock status")
    .one_of(&["normal", "low_stock", "out_of_stock"]);

/// Every callable method and its parameters
pub static METHODS: &[ParamTable] = &[
    ParamTable {
        method: "get_dashboard_summary",
        description: "Sales, purchase, inventory, receivable and payable KPIs",
        params: &[START_DATE, END_DATE],
    },
    ParamTable {
        method: "analyze_sales_trend",
        description: "Sales over time or ranked by product/customer",
        params: &[DIMENSION, START_DATE, END_DATE, TOP_N],
    },
    ParamTable {
        method: "analyze_customer_value",
        description: "RFM segmentation or sales ranking of customers",
        params: &[ANALYSIS_TYPE, AS_OF, START_DATE, END_DATE, TOP_N],
    },
    ParamTable {
        method: "analyze_inventory_turnover",
        description: "Per-item and overall stock turnover",
        params: &[START_DATE, END_DATE, LOW_STOCK_THRESHOLD],
    },
    ParamTable {
        method: "generate_comparison_analysis",
        description: "Sales against purchases across dimensions",
        params: &[METRICS, DIMENSIONS, START_DATE, END_DATE],
    },
    ParamTable {
        method: "inventory_report",
        description: "Stock levels, values and status",
        params: &[PRODUCT_NAME, STOCK_STATUS, LOW_STOCK_THRESHOLD, PAGE, PAGE_SIZE],
    },
    ParamTable {
        method: "sales_report",
        description: "Sales grouped by customer and material",
        params: &[START_DATE, END_DATE, CUSTOMER_NAME, MATERIAL_CODE, PAGE, PAGE_SIZE],
    },
    ParamTable {
        method: "purchase_report",
        description: "Purchases grouped by supplier and material",
        params: &[START_DATE, END_DATE, SUPPLIER_NAME, MATERIAL_CODE, PAGE, PAGE_SIZE],
    },
    ParamTable {
        method: "receivables_report",
        description: "Customer balances with aging and risk",
        params: &[START_DATE, END_DATE, CUSTOMER_NAME, AS_OF, PAGE, PAGE_SIZE],
    },
    ParamTable {
        method: "payables_report",
        description: "Supplier balances with aging and priority",
        params: &[START_DATE, END_DATE, SUPPLIER_NAME, AS_OF, PAGE, PAGE_SIZE],
    },
    ParamTable {
        method: "supplier_reconciliation",
        description: "Purchases against payments per supplier",
        params: &[START_DATE, END_DATE, SUPPLIER_NAME, PAGE, PAGE_SIZE],
    },
    ParamTable {
        method: "customer_reconciliation",
        description: "Sales against receipts per customer",
        params: &[START_DATE, END_DATE, CUSTOMER_NAME, PAGE, PAGE_SIZE],
    },
    ParamTable {
        method: "sales_summary",
        description: "Sales totals, top lists and monthly trend",
        params: &[START_DATE, END_DATE, TOP_N],
    },
    ParamTable {
        method: "purchase_summary",
        description: "Purchase totals, top lists and price analysis",
        params: &[START_DATE, END_DATE, TOP_N],
    },
    ParamTable {
        method: "receivables_summary",
        description: "Receivable totals and aging distribution",
        params: &[START_DATE, END_DATE, TOP_N, AS_OF],
    },
    ParamTable {
        method: "payables_summary",
        description: "Payable totals and aging distribution",
        params: &[START_DATE, END_DATE, TOP_N, AS_OF],
    },
];

impl ParamTable {
    /// Look up the table for a method
    pub fn for_method(name: &str) -> Option<&'static ParamTable> {
        METHODS.iter().find(|t| t.method == name)
    }

    pub fn spec(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Validate raw parameters against this table using today's date
    pub fn validate(&self, raw: &Value) -> Result<Map<String, Value>, ParamError> {
        self.validate_at(raw, Local::now().date_naive())
    }

    /// Validate raw parameters; `today` feeds date defaults
    pub fn validate_at(
        &self,
        raw: &Value,
        today: NaiveDate,
    ) -> Result<Map<String, Value>, ParamError> {
        let empty = Map::new();
        let input = match raw {
            Value::Null => &empty,
            Value::Object(map) => map,
            other => {
                return Err(ParamError::new(
                    "params",
                    other,
                    "expected a JSON object of parameters",
                ))
            }
        };

        for key in input.keys() {
            if self.spec(key).is_none() {
                warn!(method = self.method, param = %key, "dropping unknown parameter");
            }
        }

        let mut out = Map::new();
        for spec in self.params {
            let provided = input.get(spec.name).filter(|v| !is_missing(v));
            let value = match provided {
                Some(v) => Some(coerce(spec, v)?),
                None => None,
            };
            let value = value
                .filter(|v| !is_missing(v))
                .or_else(|| spec.default.to_value(today));
            if let Some(v) = value {
                out.insert(spec.name.to_string(), v);
            }
        }

        check_date_order(&out)?;
        Ok(out)
    }
}

/// Validate parameters for a named method
pub fn validate_method_params(method: &str, raw: &Value) -> ImsResult<Map<String, Value>> {
    let table =
        ParamTable::for_method(method).ok_or_else(|| ImsError::UnknownMethod(method.to_string()))?;
    Ok(table.validate(raw)?)
}

/// Null, blank text, or an empty list: treated as not given
pub fn is_missing(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(a) => a.is_empty(),
        _ => false,
    }
}

fn coerce(spec: &ParamSpec, value: &Value) -> Result<Value, ParamError> {
    match spec.kind {
        ParamKind::Int => {
            let n = coerce_number(spec, value)?.trunc();
            Ok(Value::from(clamp(spec, n) as i64))
        }
        ParamKind::Number => {
            let n = clamp(spec, coerce_number(spec, value)?);
            Number::from_f64(n)
                .map(Value::Number)
                .ok_or_else(|| ParamError::new(spec.name, value, "must be a finite number"))
        }
        ParamKind::Date => {
            let d = dates::parse_date_value(value)
                .ok_or_else(|| ParamError::new(spec.name, value, "unrecognised date"))?;
            Ok(Value::from(dates::format_date(d)))
        }
        ParamKind::Text => {
            let text = match value {
                Value::Array(_) | Value::Object(_) => {
                    return Err(ParamError::new(spec.name, value, "expected text"))
                }
                other => fields::text_of(other).unwrap_or_default(),
            };
            if text.is_empty() {
                return Ok(Value::Null);
            }
            canonical(spec, &text, value).map(Value::from)
        }
        ParamKind::List => {
            let items: Vec<String> = match value {
                Value::String(s) => s
                    .split(',')
                    .map(|p| p.trim().to_string())
                    .filter(|p| !p.is_empty())
                    .collect(),
                Value::Array(items) => {
                    let mut out = Vec::new();
                    for item in items {
                        match item {
                            Value::Array(_) | Value::Object(_) => {
                                return Err(ParamError::new(
                                    spec.name,
                                    value,
                                    "list items must be text",
                                ))
                            }
                            other => out.extend(fields::text_of(other)),
                        }
                    }
                    out
                }
                other => fields::text_of(other).into_iter().collect(),
            };
            let mut cleaned: Vec<String> = Vec::new();
            for item in items {
                let c = canonical(spec, &item, value)?;
                if !cleaned.contains(&c) {
                    cleaned.push(c);
                }
            }
            Ok(Value::from(cleaned))
        }
    }
}

fn coerce_number(spec: &ParamSpec, value: &Value) -> Result<f64, ParamError> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => fields::parse_number(s),
        _ => None,
    };
    n.ok_or_else(|| ParamError::new(spec.name, value, format!("expected {}", spec.kind)))
}

fn clamp(spec: &ParamSpec, n: f64) -> f64 {
    let mut out = n;
    if let Some(min) = spec.min {
        out = out.max(min);
    }
    if let Some(max) = spec.max {
        out = out.min(max);
    }
    if out != n {
        debug!(param = spec.name, from = n, to = out, "clamped parameter");
    }
    out
}

/// Match against the allowed set case-insensitively, returning the canonical
/// spelling
fn canonical(spec: &ParamSpec, text: &str, original: &Value) -> Result<String, ParamError> {
    if spec.allowed.is_empty() {
        return Ok(text.to_string());
    }
    spec.allowed
        .iter()
        .find(|a| a.eq_ignore_ascii_case(text))
        .map(|a| a.to_string())
        .ok_or_else(|| {
            ParamError::new(
                spec.name,
                original,
                format!("must be one of: {}", spec.allowed.join(", ")),
            )
        })
}

fn check_date_order(params: &Map<String, Value>) -> Result<(), ParamError> {
    let start = params.get("start_date").and_then(Value::as_str);
    let end = params.get("end_date").and_then(Value::as_str);
    if let (Some(s), Some(e)) = (start, end) {
        // Both are normalized YYYY-MM-DD, so string order is date order
        if s > e {
            return Err(ParamError::new(
                "start_date",
                &Value::from(s),
                format!("must not be after end_date ({})", e),
            ));
        }
    }
    Ok(())
}
