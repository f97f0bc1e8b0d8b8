//! Collection catalog - the eight kinds of business records
//!
//! Each collection knows its storage name, the worksheet it is imported from
//! by default, the field that uniquely keys a document, and the date field
//! reports filter on.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Suppliers,
    Customers,
    Materials,
    PurchaseInbound,
    SalesOutbound,
    PaymentDetails,
    ReceiptDetails,
    InventoryStats,
}

impl Collection {
    /// All collections in workbook order
    pub const ALL: [Collection; 8] = [
        Collection::Suppliers,
        Collection::Customers,
        Collection::Materials,
        Collection::PurchaseInbound,
        Collection::SalesOutbound,
        Collection::PaymentDetails,
        Collection::ReceiptDetails,
        Collection::InventoryStats,
    ];

    /// Storage name used in the `documents` table
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Suppliers => "suppliers",
            Collection::Customers => "customers",
            Collection::Materials => "materials",
            Collection::PurchaseInbound => "purchase_inbound",
            Collection::SalesOutbound => "sales_outbound",
            Collection::PaymentDetails => "payment_details",
            Collection::ReceiptDetails => "receipt_details",
            Collection::InventoryStats => "inventory_stats",
        }
    }

    /// Human label for tables and summaries
    pub fn label(&self) -> &'static str {
        match self {
            Collection::Suppliers => "Suppliers",
            Collection::Customers => "Customers",
            Collection::Materials => "Materials",
            Collection::PurchaseInbound => "Purchase Inbound",
            Collection::SalesOutbound => "Sales Outbound",
            Collection::PaymentDetails => "Payments",
            Collection::ReceiptDetails => "Receipts",
            Collection::InventoryStats => "Inventory",
        }
    }

    /// Worksheet name in the source workbook
    pub fn default_sheet(&self) -> &'static str {
        match self {
            Collection::Suppliers => "供应商信息表",
            Collection::Customers => "客户信息表",
            Collection::Materials => "进货参数表",
            Collection::PurchaseInbound => "进货入库明细表",
            Collection::SalesOutbound => "销售出库明细表",
            Collection::PaymentDetails => "付款明细表",
            Collection::ReceiptDetails => "收款明细表",
            Collection::InventoryStats => "库存统计表",
        }
    }

    /// Field holding the unique business key
    pub fn key_field(&self) -> &'static str {
        match self {
            Collection::Suppliers => "supplier_name",
            Collection::Customers => "customer_name",
            Collection::Materials | Collection::InventoryStats => "material_code",
            Collection::PurchaseInbound
            | Collection::SalesOutbound
            | Collection::PaymentDetails
            | Collection::ReceiptDetails => "record_no",
        }
    }

    /// Transaction lines may be keyed by a generated ULID when the sheet
    /// carries no record number
    pub fn is_line(&self) -> bool {
        matches!(
            self,
            Collection::PurchaseInbound
                | Collection::SalesOutbound
                | Collection::PaymentDetails
                | Collection::ReceiptDetails
        )
    }

    /// Date field used for range filtering
    pub fn date_field(&self) -> Option<&'static str> {
        match self {
            Collection::PurchaseInbound => Some("inbound_date"),
            Collection::SalesOutbound => Some("outbound_date"),
            Collection::PaymentDetails => Some("payment_date"),
            Collection::ReceiptDetails => Some("receipt_date"),
            Collection::InventoryStats => Some("last_update_date"),
            _ => None,
        }
    }

    /// Party field naming the counterparty of a line, if any
    pub fn party_field(&self) -> Option<&'static str> {
        match self {
            Collection::PurchaseInbound | Collection::PaymentDetails => Some("supplier_name"),
            Collection::SalesOutbound | Collection::ReceiptDetails => Some("customer_name"),
            _ => None,
        }
    }

    /// Columns shown by list views, key first
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            Collection::Suppliers => &[
                "supplier_name",
                "supplier_code",
                "contact_person",
                "phone",
                "address",
            ],
            Collection::Customers => &[
                "customer_name",
                "customer_code",
                "contact_person",
                "phone",
                "credit_limit",
            ],
            Collection::Materials => &[
                "material_code",
                "material_name",
                "specification",
                "unit",
                "supplier_name",
                "unit_price",
            ],
            Collection::PurchaseInbound => &[
                "record_no",
                "inbound_date",
                "supplier_name",
                "material_name",
                "quantity",
                "unit_price",
                "amount",
            ],
            Collection::SalesOutbound => &[
                "record_no",
                "outbound_date",
                "customer_name",
                "material_name",
                "quantity",
                "unit_price",
                "amount",
            ],
            Collection::PaymentDetails => &[
                "record_no",
                "payment_date",
                "supplier_name",
                "amount",
                "payment_method",
            ],
            Collection::ReceiptDetails => &[
                "record_no",
                "receipt_date",
                "customer_name",
                "amount",
                "payment_method",
            ],
            Collection::InventoryStats => &[
                "material_code",
                "material_name",
                "current_stock",
                "unit_price",
                "warehouse",
            ],
        }
    }

    /// Match a worksheet name back to its collection
    pub fn from_sheet_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL.into_iter().find(|c| c.default_sheet() == name)
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Collection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "suppliers" | "supplier" | "sup" => Ok(Collection::Suppliers),
            "customers" | "customer" | "cust" => Ok(Collection::Customers),
            "materials" | "material" | "mat" => Ok(Collection::Materials),
            "purchase_inbound" | "purchases" | "purchase" | "inbound" => {
                Ok(Collection::PurchaseInbound)
            }
            "sales_outbound" | "sales" | "outbound" => Ok(Collection::SalesOutbound),
            "payment_details" | "payments" | "payment" => Ok(Collection::PaymentDetails),
            "receipt_details" | "receipts" | "receipt" => Ok(Collection::ReceiptDetails),
            "inventory_stats" | "inventory" | "stock" => Ok(Collection::InventoryStats),
            other => Collection::from_sheet_name(other).ok_or_else(|| {
                format!(
                    "Invalid collection: {}. Use suppliers, customers, materials, \
                     purchase_inbound, sales_outbound, payment_details, receipt_details, \
                     or inventory_stats",
                    s
                )
            }),
        }
    }
}
