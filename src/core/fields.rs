//! Field dictionary - canonical field names, types, and header aliases
//!
//! Source workbooks use Chinese column headers (sometimes with unit suffixes
//! such as `金额(元)`), while documents are stored under snake_case English
//! names. Every header goes through [`map_header`] on import.

use serde_json::Value;

use crate::core::collection::Collection;

/// Storage type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Text,
    Number,
    Date,
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldType::Text => write!(f, "text"),
            FieldType::Number => write!(f, "number"),
            FieldType::Date => write!(f, "date"),
        }
    }
}

/// One canonical field
#[derive(Debug)]
pub struct FieldDef {
    pub name: &'static str,
    pub kind: FieldType,
    pub aliases: &'static [&'static str],
}

const fn text(name: &'static str, aliases: &'static [&'static str]) -> FieldDef {
    FieldDef {
        name,
        kind: FieldType::Text,
        aliases,
    }
}

const fn number(name: &'static str, aliases: &'static [&'static str]) -> FieldDef {
    FieldDef {
        name,
        kind: FieldType::Number,
        aliases,
    }
}

const fn date(name: &'static str, aliases: &'static [&'static str]) -> FieldDef {
    FieldDef {
        name,
        kind: FieldType::Date,
        aliases,
    }
}

pub static FIELDS: &[FieldDef] = &[
    // Parties
    text("supplier_name", &["供应商名称", "供应商", "供应商全称", "supplier"]),
    text("supplier_code", &["供应商编码", "供应商代码", "供应商编号"]),
    text("customer_name", &["客户名称", "客户", "客户全称", "customer"]),
    text("customer_code", &["客户编码", "客户编号", "客户代码"]),
    text("credit_code", &["统一社会信用代码", "信用代码", "税号"]),
    text("contact_person", &["联系人", "联系人姓名", "contact"]),
    text("phone", &["电话", "联系电话", "手机", "手机号"]),
    text("address", &["地址", "联系地址", "公司地址"]),
    text("email", &["邮箱", "电子邮箱", "e-mail"]),
    text("bank_name", &["开户行", "开户银行"]),
    text("bank_account", &["银行账号", "账号"]),
    number("credit_limit", &["信用额度"]),
    // Materials
    text("material_code", &["物料编码", "物料编号", "物料代码", "商品编码", "产品编码"]),
    text("material_name", &["物料名称", "商品名称", "产品名称", "品名", "进货名称"]),
    text("specification", &["规格型号", "规格", "型号", "material_model"]),
    text("unit", &["单位", "计量单位"]),
    text("platform", &["平台"]),
    text("type1", &["类型1", "一级分类", "大类"]),
    text("type2", &["类型2", "二级分类", "小类"]),
    // Quantities and money
    number("quantity", &["数量", "入库数量", "出库数量", "进货数量", "销售数量"]),
    number("unit_price", &["单价", "含税单价", "进货单价", "销售单价", "price"]),
    number("amount", &["金额", "含税金额", "总金额", "入库金额", "出库金额", "付款金额", "收款金额"]),
    number("current_stock", &["当前库存", "库存数量", "库存", "结存数量"]),
    number("min_stock", &["最低库存", "安全库存"]),
    number("max_stock", &["最高库存"]),
    // Dates
    date("inbound_date", &["入库日期", "进货日期"]),
    date("outbound_date", &["出库日期", "销售日期"]),
    date("payment_date", &["付款日期"]),
    date("receipt_date", &["收款日期"]),
    date("invoice_date", &["开票日期"]),
    date("last_update_date", &["最后更新日期", "更新日期"]),
    // Bookkeeping
    text("record_no", &["记录编号", "单据编号", "单据号", "单号", "流水号"]),
    text("order_no", &["订单号", "订单编号"]),
    text("row_no", &["序号"]),
    text("payment_method", &["付款方式", "收款方式", "结算方式"]),
    text("warehouse", &["仓库", "仓库名称"]),
    text("remarks", &["备注", "说明"]),
];

/// Key values that mark a summary or filler row rather than a record
const PLACEHOLDER_KEYS: &[&str] = &["nan", "none", "null", "-", "无", "合计", "总计"];

/// Look up a canonical field by name
pub fn lookup(name: &str) -> Option<&'static FieldDef> {
    FIELDS.iter().find(|f| f.name == name)
}

/// Type of a field; unknown fields are text
pub fn field_type(name: &str) -> FieldType {
    lookup(name).map(|f| f.kind).unwrap_or(FieldType::Text)
}

/// Fields listed for a collection, in display order
pub fn fields_for(collection: Collection) -> Vec<&'static FieldDef> {
    collection.columns().iter().filter_map(|n| lookup(n)).collect()
}

/// Strip whitespace and a trailing unit in brackets, then lowercase
fn normalize_header(header: &str) -> String {
    let mut s: String = header.chars().filter(|c| !c.is_whitespace()).collect();
    for open in ['(', '（'] {
        if let Some(idx) = s.find(open) {
            if idx > 0 {
                s.truncate(idx);
            }
        }
    }
    s.to_lowercase()
}

/// Map a spreadsheet header to its canonical field name
pub fn map_header(header: &str) -> Option<&'static str> {
    let wanted = normalize_header(header);
    if wanted.is_empty() {
        return None;
    }
    let snake = to_snake_case(header);
    FIELDS
        .iter()
        .find(|f| {
            f.name == snake
                || f.aliases
                    .iter()
                    .any(|a| normalize_header(a) == wanted)
        })
        .map(|f| f.name)
}

/// Convert an arbitrary header to a snake_case key
pub fn to_snake_case(header: &str) -> String {
    let mut out = String::new();
    let mut prev_lower = false;
    for ch in header.trim().chars() {
        if ch.is_alphanumeric() {
            if ch.is_uppercase() && prev_lower {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
            prev_lower = ch.is_lowercase() || ch.is_ascii_digit();
        } else {
            if !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
            prev_lower = false;
        }
    }
    out.trim_end_matches('_').to_string()
}

/// True for headers pandas-style exports emit for blank columns
pub fn is_blank_header(header: &str) -> bool {
    let h = header.trim();
    h.is_empty() || h.starts_with("Unnamed")
}

/// True when a key cell holds a placeholder instead of a real identifier
pub fn is_placeholder_key(value: &str) -> bool {
    let v = value.trim();
    v.is_empty() || PLACEHOLDER_KEYS.iter().any(|p| p.eq_ignore_ascii_case(v))
}

/// Parse a money or quantity string: strips currency symbols, thousands
/// separators, and a trailing 元
pub fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .trim_end_matches('元')
        .chars()
        .filter(|c| !matches!(c, ',' | '，' | '¥' | '￥' | ' '))
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Numeric view of a JSON value (numbers and numeric strings)
pub fn number_of(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_number(s),
        _ => None,
    }
}

/// Text view of a JSON value; numbers are rendered without a trailing `.0`
pub fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let t = s.trim();
            (!t.is_empty()).then(|| t.to_string())
        }
        Value::Number(n) => Some(match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        }),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_chinese_headers() {
        assert_eq!(map_header("供应商名称"), Some("supplier_name"));
        assert_eq!(map_header(" 金额(元) "), Some("amount"));
        assert_eq!(map_header("含税单价（元）"), Some("unit_price"));
        assert_eq!(map_header("入库日期"), Some("inbound_date"));
    }

    #[test]
    fn test_map_english_headers() {
        assert_eq!(map_header("Material Code"), Some("material_code"));
        assert_eq!(map_header("unit_price"), Some("unit_price"));
        assert_eq!(map_header("Customer"), Some("customer_name"));
        assert_eq!(map_header("mystery column"), None);
    }

    #[test]
    fn test_snake_case() {
        assert_eq!(to_snake_case("Delivery Address"), "delivery_address");
        assert_eq!(to_snake_case("orderNo"), "order_no");
        assert_eq!(to_snake_case("  Tax-Rate (%) "), "tax_rate");
    }

    #[test]
    fn test_blank_headers() {
        assert!(is_blank_header(""));
        assert!(is_blank_header("Unnamed: 3"));
        assert!(!is_blank_header("备注"));
    }

    #[test]
    fn test_placeholder_keys() {
        assert!(is_placeholder_key("合计"));
        assert!(is_placeholder_key("NaN"));
        assert!(is_placeholder_key("  "));
        assert!(!is_placeholder_key("ACME"));
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("¥1,234.50"), Some(1234.5));
        assert_eq!(parse_number("88元"), Some(88.0));
        assert_eq!(parse_number("abc"), None);
        assert_eq!(parse_number(""), None);
    }

    #[test]
    fn test_text_of_integral_numbers() {
        assert_eq!(text_of(&serde_json::json!(42.0)).as_deref(), Some("42"));
        assert_eq!(text_of(&serde_json::json!(1.5)).as_deref(), Some("1.5"));
        assert_eq!(text_of(&serde_json::json!("  ")), None);
    }

    #[test]
    fn test_field_types() {
        assert_eq!(field_type("amount"), FieldType::Number);
        assert_eq!(field_type("payment_date"), FieldType::Date);
        assert_eq!(field_type("whatever"), FieldType::Text);
    }
}
