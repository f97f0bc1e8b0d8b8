//! Inventory snapshot entity

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{round2, DocExt};
use crate::core::store::Document;

/// Stock status derived from current stock and the low-stock threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    Normal,
    LowStock,
    OutOfStock,
}

impl StockStatus {
    pub fn classify(stock: f64, threshold: f64) -> Self {
        if stock <= 0.0 {
            StockStatus::OutOfStock
        } else if stock <= threshold {
            StockStatus::LowStock
        } else {
            StockStatus::Normal
        }
    }
}

impl std::fmt::Display for StockStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StockStatus::Normal => write!(f, "normal"),
            StockStatus::LowStock => write!(f, "low_stock"),
            StockStatus::OutOfStock => write!(f, "out_of_stock"),
        }
    }
}

impl std::str::FromStr for StockStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "normal" => Ok(StockStatus::Normal),
            "low_stock" | "low" => Ok(StockStatus::LowStock),
            "out_of_stock" | "out" => Ok(StockStatus::OutOfStock),
            _ => Err(format!(
                "Invalid stock status: {}. Use normal, low_stock, or out_of_stock",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct InventoryItem {
    pub material_code: String,
    pub material_name: Option<String>,
    pub specification: Option<String>,
    pub unit: Option<String>,
    pub current_stock: f64,
    pub unit_price: f64,
    pub stock_value: f64,
    pub stock_status: StockStatus,
    pub warehouse: Option<String>,
    pub last_update_date: Option<NaiveDate>,
}

impl InventoryItem {
    pub fn from_doc(doc: &Document, low_stock_threshold: f64) -> Option<Self> {
        let current_stock = doc.number("current_stock").unwrap_or(0.0);
        let unit_price = doc.number("unit_price").unwrap_or(0.0);
        Some(Self {
            material_code: doc.text("material_code")?,
            material_name: doc.text("material_name"),
            specification: doc.text("specification"),
            unit: doc.text("unit"),
            current_stock,
            unit_price,
            stock_value: round2(current_stock * unit_price),
            stock_status: StockStatus::classify(current_stock, low_stock_threshold),
            warehouse: doc.text("warehouse"),
            last_update_date: doc.date("last_update_date"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify_boundaries() {
        assert_eq!(StockStatus::classify(-1.0, 10.0), StockStatus::OutOfStock);
        assert_eq!(StockStatus::classify(0.0, 10.0), StockStatus::OutOfStock);
        assert_eq!(StockStatus::classify(10.0, 10.0), StockStatus::LowStock);
        assert_eq!(StockStatus::classify(10.5, 10.0), StockStatus::Normal);
    }

    #[test]
    fn test_item_value() {
        let doc = json!({"material_code": "M1", "current_stock": "12", "unit_price": 2.5});
        let item = InventoryItem::from_doc(doc.as_object().unwrap(), 10.0).unwrap();
        assert_eq!(item.stock_value, 30.0);
        assert_eq!(item.stock_status, StockStatus::Normal);
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("LOW".parse::<StockStatus>().unwrap(), StockStatus::LowStock);
        assert!("meh".parse::<StockStatus>().is_err());
        assert_eq!(StockStatus::OutOfStock.to_string(), "out_of_stock");
    }
}
