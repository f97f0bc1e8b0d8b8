//! Date parsing for spreadsheet cells
//!
//! Workbooks mix ISO dates, dotted and slashed dates, Chinese `年月日` dates,
//! compact `YYYYMMDD`, Excel serial numbers, and placeholder words such as
//! `未开票`. Everything normalizes to [`NaiveDate`] or `None`.

use chrono::{Datelike, Duration, NaiveDate};
use serde_json::Value;

/// Placeholder cell values meaning "no date yet"
const SPECIAL_VALUES: &[&str] = &[
    "未开票", "待开票", "未确定", "待定", "无", "空", "null", "n/a", "暂无", "未知", "nan", "none",
];

/// Date-only formats tried in order after any time part is cut off
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y.%m.%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%Y年%m月%d日",
    "%Y%m%d",
];

/// Excel serial numbers in this range are accepted (1927..2173)
const SERIAL_RANGE: std::ops::RangeInclusive<f64> = 10_000.0..=100_000.0;

/// True when the value is a placeholder that deliberately carries no date
pub fn is_special_value(raw: &str) -> bool {
    let v = raw.trim();
    v.is_empty() || SPECIAL_VALUES.iter().any(|s| s.eq_ignore_ascii_case(v))
}

/// Parse a date string in any supported format
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if is_special_value(raw) {
        return None;
    }

    // Drop a time component: "2024-01-05 10:00:00", "2024-01-05T10:00:00"
    let date_part = raw
        .split(|c: char| c == ' ' || c == 'T')
        .next()
        .unwrap_or(raw);

    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(date_part, fmt) {
            return Some(d);
        }
    }

    // Bare number in a cell formatted as text
    if date_part.chars().all(|c| c.is_ascii_digit() || c == '.') {
        if let Ok(serial) = date_part.parse::<f64>() {
            return from_excel_serial(serial);
        }
    }

    None
}

/// Convert an Excel serial day number (1900 date system) to a date
pub fn from_excel_serial(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || !SERIAL_RANGE.contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::days(serial.trunc() as i64))
}

/// Parse a JSON cell: strings through [`parse_date`], numbers as serials
pub fn parse_date_value(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::String(s) => parse_date(s),
        Value::Number(n) => n.as_f64().and_then(from_excel_serial),
        _ => None,
    }
}

/// Normalize to `YYYY-MM-DD`
pub fn normalize_date(raw: &str) -> Option<String> {
    parse_date(raw).map(format_date)
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// `YYYY-MM` bucket for monthly trends
pub fn month_key(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

/// Fold a date into its `YYYY-Qn` quarter
pub fn quarter_key(date: NaiveDate) -> String {
    format!("{}-Q{}", date.year(), (date.month() - 1) / 3 + 1)
}

/// Fold a `YYYY-MM` month key into `YYYY-Qn`
pub fn quarter_of_month_key(month: &str) -> Option<String> {
    let (year, m) = month.split_once('-')?;
    let m: u32 = m.parse().ok()?;
    if !(1..=12).contains(&m) || year.len() != 4 {
        return None;
    }
    Some(format!("{}-Q{}", year, (m - 1) / 3 + 1))
}

/// Whole days from `from` to `to`, never negative
pub fn age_days(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days().max(0)
}

/// Inclusive date range check; open ends always match
pub fn in_range(date: Option<NaiveDate>, start: Option<NaiveDate>, end: Option<NaiveDate>) -> bool {
    if start.is_none() && end.is_none() {
        return true;
    }
    let Some(d) = date else {
        return false;
    };
    start.map_or(true, |s| d >= s) && end.map_or(true, |e| d <= e)
}
