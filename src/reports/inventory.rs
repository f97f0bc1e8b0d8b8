//! Inventory report

use serde_json::json;

use super::{load_inventory, name_matches, ReportOutput, ReportQuery};
use crate::core::error::ImsResult;
use crate::core::store::DocumentStore;
use crate::entities::{round2, InventoryItem, StockStatus};

pub const COLUMNS: &[&str] = &[
    "material_code",
    "material_name",
    "specification",
    "current_stock",
    "unit_price",
    "stock_value",
    "stock_status",
];

fn item_matches(item: &InventoryItem, query: &ReportQuery) -> bool {
    let product = query.product_name.as_deref();
    let name_hit = name_matches(&item.material_code, product)
        || item
            .material_name
            .as_deref()
            .is_some_and(|n| name_matches(n, product));
    name_hit && query.stock_status.map_or(true, |s| s == item.stock_status)
}

/// Current stock per material with value and status
pub fn inventory_report(store: &DocumentStore, query: &ReportQuery) -> ImsResult<ReportOutput> {
    let items: Vec<InventoryItem> = load_inventory(store, query.low_stock_threshold)?
        .into_iter()
        .filter(|i| item_matches(i, query))
        .collect();

    let count = |status: StockStatus| items.iter().filter(|i| i.stock_status == status).count();
    let summary = json!({
        "total_items": items.len(),
        "total_value": round2(items.iter().map(|i| i.stock_value).sum()),
        "normal_count": count(StockStatus::Normal),
        "low_stock_count": count(StockStatus::LowStock),
        "out_of_stock_count": count(StockStatus::OutOfStock),
        "low_stock_threshold": query.low_stock_threshold,
    });
    ReportOutput::new("Inventory", COLUMNS, &items, summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::fixtures;

    #[test]
    fn test_inventory_statistics() {
        let store = fixtures::store();
        let out = inventory_report(&store, &ReportQuery::default()).unwrap();
        assert_eq!(out.summary["total_items"], json!(3));
        assert_eq!(out.summary["total_value"], json!(205.0));
        assert_eq!(out.summary["normal_count"], json!(1));
        assert_eq!(out.summary["low_stock_count"], json!(1));
        assert_eq!(out.summary["out_of_stock_count"], json!(1));
    }

    #[test]
    fn test_inventory_filters() {
        let store = fixtures::store();
        let query = ReportQuery {
            product_name: Some("bol".into()),
            ..ReportQuery::default()
        };
        let out = inventory_report(&store, &query).unwrap();
        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.rows[0]["material_code"], json!("M1"));

        let query = ReportQuery {
            stock_status: Some(StockStatus::OutOfStock),
            ..ReportQuery::default()
        };
        let out = inventory_report(&store, &query).unwrap();
        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.rows[0]["stock_status"], json!("out_of_stock"));
    }
}
