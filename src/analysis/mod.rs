//! Unified method dispatcher
//!
//! `call` validates parameters for a named method, runs it against the
//! store, and wraps whatever comes back in an [`Envelope`]. It never
//! returns a Rust error: every failure becomes an error envelope.

pub mod insights;

use serde_json::{Map, Value};
use tracing::{debug, info_span};

use crate::core::config::Config;
use crate::core::envelope::Envelope;
use crate::core::error::{ImsError, ImsResult};
use crate::core::paginate::{PageInfo, Paginator};
use crate::core::params::{is_missing, validate_method_params, ParamTable};
use crate::core::store::DocumentStore;
use crate::reports::{aging, inventory, reconciliation, trade, ReportOutput, ReportQuery};

/// Map a legacy `--analysis-type` value to its method
pub fn legacy_method(analysis_type: &str) -> ImsResult<&'static str> {
    match analysis_type.trim().to_lowercase().as_str() {
        "overview" => Ok("get_dashboard_summary"),
        "sales_trend" => Ok("analyze_sales_trend"),
        "customer_value" => Ok("analyze_customer_value"),
        "inventory_turnover" => Ok("analyze_inventory_turnover"),
        "comparison" => Ok("generate_comparison_analysis"),
        other => Err(ImsError::UnknownMethod(format!("analysis type '{}'", other))),
    }
}

/// Fill config-driven defaults the caller left out
fn with_config_defaults(config: &Config, table: &ParamTable, raw: &Value) -> Value {
    let mut map = match raw {
        Value::Object(m) => m.clone(),
        Value::Null => Map::new(),
        other => return other.clone(),
    };
    let absent = |map: &Map<String, Value>, name: &str| {
        table.spec(name).is_some() && map.get(name).map_or(true, is_missing)
    };
    if absent(&map, "page_size") {
        map.insert("page_size".into(), config.default_page_size().into());
    }
    if absent(&map, "low_stock_threshold") {
        map.insert("low_stock_threshold".into(), config.low_stock_threshold().into());
    }
    Value::Object(map)
}

/// Validate, run, and wrap one method call
pub fn call(store: &DocumentStore, config: &Config, method: &str, raw: &Value) -> Envelope {
    let _span = info_span!("call", method).entered();
    let raw = match ParamTable::for_method(method) {
        Some(table) => with_config_defaults(config, table, raw),
        None => raw.clone(),
    };
    let params = match validate_method_params(method, &raw) {
        Ok(p) => p,
        Err(e) => return Envelope::from_error(Some(method), &e),
    };
    debug!(params = %serde_json::Value::Object(params.clone()), "validated parameters");

    let mut query = ReportQuery::from_params(&params);
    if !params.contains_key("low_stock_threshold") {
        query.low_stock_threshold = config.low_stock_threshold();
    }
    query.paginator = Paginator::with_max(
        query.paginator.page() as i64,
        query.paginator.page_size() as i64,
        config.max_page_size(),
    );

    match run(store, method, &params, &query) {
        Ok((data, Some(info))) => Envelope::success(method, data).with_pagination(info),
        Ok((data, None)) => Envelope::success(method, data),
        Err(e) => {
            tracing::warn!(error = %e, "method failed");
            Envelope::from_error(Some(method), &e)
        }
    }
}

fn text_param<'a>(params: &'a Map<String, Value>, name: &str, default: &'a str) -> &'a str {
    params.get(name).and_then(Value::as_str).unwrap_or(default)
}

fn list_param(params: &Map<String, Value>, name: &str) -> Vec<String> {
    params
        .get(name)
        .and_then(Value::as_array)
        .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_default()
}

fn paged(out: ReportOutput, query: &ReportQuery) -> (Value, Option<PageInfo>) {
    let (data, info) = out.into_page(query.paginator);
    (data, Some(info))
}

/// Run a method with already-validated parameters
pub fn run(
    store: &DocumentStore,
    method: &str,
    params: &Map<String, Value>,
    query: &ReportQuery,
) -> ImsResult<(Value, Option<PageInfo>)> {
    let unpaged = |v: Value| -> (Value, Option<PageInfo>) { (v, None) };
    Ok(match method {
        "get_dashboard_summary" => unpaged(insights::dashboard_summary(store, query)?),
        "analyze_sales_trend" => unpaged(insights::sales_trend(
            store,
            text_param(params, "dimension", "month"),
            query,
        )?),
        "analyze_customer_value" => unpaged(insights::customer_value(
            store,
            text_param(params, "analysis_type", "rfm"),
            query,
        )?),
        "analyze_inventory_turnover" => unpaged(insights::inventory_turnover(store, query)?),
        "generate_comparison_analysis" => unpaged(insights::comparison(
            store,
            &list_param(params, "metrics"),
            &list_param(params, "dimensions"),
            query,
        )?),
        "inventory_report" => paged(inventory::inventory_report(store, query)?, query),
        "sales_report" => paged(trade::sales_report(store, query)?, query),
        "purchase_report" => paged(trade::purchase_report(store, query)?, query),
        "receivables_report" => paged(aging::receivables_report(store, query)?, query),
        "payables_report" => paged(aging::payables_report(store, query)?, query),
        "supplier_reconciliation" => {
            paged(reconciliation::supplier_reconciliation(store, query)?, query)
        }
        "customer_reconciliation" => {
            paged(reconciliation::customer_reconciliation(store, query)?, query)
        }
        "sales_summary" => unpaged(trade::sales_summary(store, query)?),
        "purchase_summary" => unpaged(trade::purchase_summary(store, query)?),
        "receivables_summary" => unpaged(aging::receivables_summary(store, query)?),
        "payables_summary" => unpaged(aging::payables_summary(store, query)?),
        other => return Err(ImsError::UnknownMethod(other.to_string())),
    })
}

/// Full report output for table rendering, by report method name
pub fn report_output(
    store: &DocumentStore,
    method: &str,
    query: &ReportQuery,
) -> ImsResult<ReportOutput> {
    match method {
        "inventory_report" => inventory::inventory_report(store, query),
        "sales_report" => trade::sales_report(store, query),
        "purchase_report" => trade::purchase_report(store, query),
        "receivables_report" => aging::receivables_report(store, query),
        "payables_report" => aging::payables_report(store, query),
        "supplier_reconciliation" => reconciliation::supplier_reconciliation(store, query),
        "customer_reconciliation" => reconciliation::customer_reconciliation(store, query),
        other => Err(ImsError::UnknownMethod(other.to_string())),
    }
}
