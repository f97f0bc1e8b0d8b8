//! Response envelopes
//!
//! Every machine-readable answer is one of two shapes:
//!
//! ```json
//! {"success": true, "method": "...", "data": ..., "pagination": {...}, "generated_at": "..."}
//! {"success": false, "method": "...", "error": {...}, "generated_at": "..."}
//! ```
//!
//! where `error` is `{"code": "...", "message": "...", "details": ...}`.
//!
//! [`normalize`] repairs the assorted legacy shapes report generators used
//! to emit into one of these.

use chrono::Utc;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::core::error::ImsError;
use crate::core::paginate::{PageInfo, Paginator};

/// Code for legacy failures that carry no field errors
pub const OPERATION_FAILED: &str = "OPERATION_FAILED";

/// Keys that belong to the envelope itself rather than the payload
const ENVELOPE_KEYS: &[&str] = &[
    "success",
    "method",
    "data",
    "pagination",
    "generated_at",
    "error",
    "errors",
    "message",
    "total",
    "page",
    "page_size",
];

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(default)]
    pub details: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    Success {
        method: String,
        data: Value,
        pagination: Option<PageInfo>,
        generated_at: String,
    },
    Failure {
        method: Option<String>,
        error: ErrorBody,
        generated_at: String,
    },
}

fn now() -> String {
    Utc::now().to_rfc3339()
}

impl Envelope {
    pub fn success(method: impl Into<String>, data: Value) -> Self {
        Envelope::Success {
            method: method.into(),
            data,
            pagination: None,
            generated_at: now(),
        }
    }

    /// Attach page metadata; no effect on failures
    pub fn with_pagination(mut self, info: PageInfo) -> Self {
        if let Envelope::Success { pagination, .. } = &mut self {
            *pagination = Some(info);
        }
        self
    }

    pub fn failure(
        method: Option<&str>,
        code: impl Into<String>,
        message: impl Into<String>,
        details: Value,
    ) -> Self {
        Envelope::Failure {
            method: method.map(str::to_string),
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
                details,
            },
            generated_at: now(),
        }
    }

    pub fn from_error(method: Option<&str>, err: &ImsError) -> Self {
        Self::failure(method, err.code(), err.to_string(), err.details())
    }

    /// Build from a method result
    pub fn from_result(method: &str, result: Result<Value, ImsError>) -> Self {
        match result {
            Ok(data) => Self::success(method, data),
            Err(e) => Self::from_error(Some(method), &e),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Envelope::Success { .. })
    }

    /// Process exit code for this envelope
    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            0
        } else {
            1
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }

    fn set_generated_at(&mut self, stamp: String) {
        match self {
            Envelope::Success { generated_at, .. } | Envelope::Failure { generated_at, .. } => {
                *generated_at = stamp
            }
        }
    }
}

impl Serialize for Envelope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Envelope::Success {
                method,
                data,
                pagination,
                generated_at,
            } => {
                let len = if pagination.is_some() { 5 } else { 4 };
                let mut map = serializer.serialize_map(Some(len))?;
                map.serialize_entry("success", &true)?;
                map.serialize_entry("method", method)?;
                map.serialize_entry("data", data)?;
                if let Some(p) = pagination {
                    map.serialize_entry("pagination", p)?;
                }
                map.serialize_entry("generated_at", generated_at)?;
                map.end()
            }
            Envelope::Failure {
                method,
                error,
                generated_at,
            } => {
                let mut map = serializer.serialize_map(None)?;
                map.serialize_entry("success", &false)?;
                if let Some(m) = method {
                    map.serialize_entry("method", m)?;
                }
                map.serialize_entry(
                    "error",
                    &serde_json::json!({
                        "code": error.code,
                        "message": error.message,
                        "details": error.details,
                    }),
                )?;
                map.serialize_entry("generated_at", generated_at)?;
                map.end()
            }
        }
    }
}

/// Coerce any result shape into one of the two envelopes
pub fn normalize(method: Option<&str>, value: Value) -> Envelope {
    let obj = match value {
        Value::Null => return Envelope::success(method.unwrap_or("unknown"), Value::Array(vec![])),
        Value::Object(obj) => obj,
        other => return Envelope::success(method.unwrap_or("unknown"), other),
    };

    let method_name = method
        .map(str::to_string)
        .or_else(|| obj.get("method").and_then(Value::as_str).map(str::to_string));
    let stamp = obj
        .get("generated_at")
        .and_then(Value::as_str)
        .map(str::to_string);

    let mut envelope = match obj.get("success").and_then(Value::as_bool) {
        Some(true) => normalize_success(method_name, obj),
        Some(false) => normalize_failure(method_name, &obj),
        None if obj.get("error").is_some_and(|e| !e.is_null()) => {
            normalize_failure(method_name, &obj)
        }
        None => Envelope::success(
            method_name.unwrap_or_else(|| "unknown".to_string()),
            Value::Object(obj),
        ),
    };

    if let Some(stamp) = stamp {
        envelope.set_generated_at(stamp);
    }
    envelope
}

fn normalize_success(method: Option<String>, mut obj: Map<String, Value>) -> Envelope {
    let pagination = obj
        .get("pagination")
        .and_then(|p| serde_json::from_value::<PageInfo>(p.clone()).ok())
        .or_else(|| legacy_pagination(&obj));

    let stray: Map<String, Value> = obj
        .iter()
        .filter(|(k, _)| !ENVELOPE_KEYS.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    let data = match obj.remove("data") {
        None if stray.is_empty() => Value::Array(vec![]),
        None => Value::Object(stray),
        Some(Value::Null) if stray.is_empty() => Value::Array(vec![]),
        Some(data) if stray.is_empty() => data,
        Some(Value::Object(mut inner)) => {
            for (k, v) in stray {
                inner.entry(k).or_insert(v);
            }
            Value::Object(inner)
        }
        Some(other) => {
            let mut wrapped = stray;
            wrapped.insert("items".to_string(), other);
            Value::Object(wrapped)
        }
    };

    let mut env = Envelope::success(method.unwrap_or_else(|| "unknown".to_string()), data);
    if let Some(info) = pagination {
        env = env.with_pagination(info);
    }
    env
}

fn legacy_pagination(obj: &Map<String, Value>) -> Option<PageInfo> {
    let total = obj.get("total").and_then(Value::as_u64)?;
    let page = obj.get("page").and_then(Value::as_i64).unwrap_or(1);
    let page_size = obj
        .get("page_size")
        .and_then(Value::as_i64)
        .unwrap_or(crate::core::paginate::DEFAULT_PAGE_SIZE as i64);
    Some(Paginator::new(page, page_size).page_info(total as usize))
}

fn normalize_failure(method: Option<String>, obj: &Map<String, Value>) -> Envelope {
    let errors = obj
        .get("errors")
        .filter(|e| match e {
            Value::Array(a) => !a.is_empty(),
            Value::Object(o) => !o.is_empty(),
            Value::Null => false,
            _ => true,
        })
        .cloned();

    let fallback_code = if errors.is_some() {
        "VALIDATION_FAILED"
    } else {
        OPERATION_FAILED
    };

    let top_message = obj.get("message").and_then(Value::as_str);

    let (code, message, details) = match obj.get("error") {
        Some(Value::Object(e)) => (
            e.get("code").and_then(Value::as_str).unwrap_or(fallback_code),
            e.get("message")
                .and_then(Value::as_str)
                .or(top_message)
                .unwrap_or("operation failed")
                .to_string(),
            e.get("details")
                .filter(|d| !d.is_null())
                .cloned()
                .or(errors)
                .unwrap_or(Value::Null),
        ),
        Some(Value::String(text)) => (
            if obj.contains_key("success") {
                fallback_code
            } else {
                "EXECUTION_FAILED"
            },
            text.clone(),
            errors.unwrap_or(Value::Null),
        ),
        _ => (
            fallback_code,
            top_message.unwrap_or("operation failed").to_string(),
            errors.unwrap_or(Value::Null),
        ),
    };

    Envelope::failure(method.as_deref(), code, message, details)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn is_one_of_two_shapes(v: &Value) -> bool {
        let obj = v.as_object().unwrap();
        match obj["success"].as_bool() {
            Some(true) => {
                obj.contains_key("data")
                    && obj.contains_key("method")
                    && !obj.contains_key("error")
            }
            Some(false) => {
                let e = &obj["error"];
                e["code"].is_string() && e["message"].is_string() && !obj.contains_key("data")
            }
            None => false,
        }
    }

    #[test]
    fn test_success_serialization() {
        let env = Envelope::success("sales_report", json!([1, 2]));
        let v = env.to_value();
        assert_eq!(v["success"], json!(true));
        assert_eq!(v["data"], json!([1, 2]));
        assert!(v.get("pagination").is_none());
        assert!(v["generated_at"].is_string());
        assert_eq!(env.exit_code(), 0);
    }

    #[test]
    fn test_failure_from_error() {
        let env = Envelope::from_error(Some("m"), &ImsError::not_found("suppliers", "X"));
        let v = env.to_value();
        assert_eq!(v["success"], json!(false));
        assert_eq!(v["error"]["code"], json!("NOT_FOUND"));
        assert_eq!(v["error"]["details"]["key"], json!("X"));
        assert_eq!(env.exit_code(), 1);
    }

    #[test]
    fn test_normalize_null_is_empty_list() {
        let v = normalize(Some("m"), Value::Null).to_value();
        assert_eq!(v["data"], json!([]));
    }

    #[test]
    fn test_normalize_bare_values() {
        for raw in [json!([1]), json!("text"), json!(3.5), json!({"rows": []})] {
            let v = normalize(Some("m"), raw.clone()).to_value();
            assert!(is_one_of_two_shapes(&v));
            assert_eq!(v["data"], raw);
        }
    }

    #[test]
    fn test_normalize_legacy_failure_with_errors() {
        let raw = json!({"success": false, "message": "bad input", "errors": ["name required"]});
        let v = normalize(None, raw).to_value();
        assert_eq!(v["error"]["code"], json!("VALIDATION_FAILED"));
        assert_eq!(v["error"]["message"], json!("bad input"));
        assert_eq!(v["error"]["details"], json!(["name required"]));
    }

    #[test]
    fn test_normalize_legacy_failure_without_errors() {
        let raw = json!({"success": false, "message": "db down"});
        let v = normalize(Some("x"), raw).to_value();
        assert_eq!(v["error"]["code"], json!(OPERATION_FAILED));
        assert_eq!(v["method"], json!("x"));
    }

    #[test]
    fn test_normalize_legacy_paged_success() {
        let raw = json!({
            "success": true,
            "data": [1, 2],
            "total": 120,
            "page": 2,
            "page_size": 50
        });
        let v = normalize(Some("list"), raw).to_value();
        assert_eq!(v["data"], json!([1, 2]));
        assert_eq!(v["pagination"]["total_pages"], json!(3));
        assert_eq!(v["pagination"]["current_page"], json!(2));
        assert!(v.get("total").is_none());
    }

    #[test]
    fn test_normalize_bare_error() {
        let v = normalize(None, json!({"error": "script crashed"})).to_value();
        assert_eq!(v["success"], json!(false));
        assert_eq!(v["error"]["code"], json!("EXECUTION_FAILED"));
        assert_eq!(v["error"]["message"], json!("script crashed"));

        let v = normalize(None, json!({"error": {"code": "IO_ERROR", "message": "disk"}}))
            .to_value();
        assert_eq!(v["error"]["code"], json!("IO_ERROR"));
    }

    #[test]
    fn test_normalize_stray_keys_folded() {
        let raw = json!({"success": true, "data": {"rows": []}, "summary": {"total": 1}});
        let v = normalize(Some("r"), raw).to_value();
        assert_eq!(v["data"]["summary"]["total"], json!(1));
        assert!(v.get("summary").is_none());

        let raw = json!({"success": true, "data": [1], "summary": {"n": 1}});
        let v = normalize(Some("r"), raw).to_value();
        assert_eq!(v["data"]["items"], json!([1]));
        assert_eq!(v["data"]["summary"]["n"], json!(1));
    }

    #[test]
    fn test_normalize_keeps_generated_at_and_is_idempotent() {
        let first = Envelope::success("m", json!({"a": 1})).with_pagination(
            Paginator::new(1, 10).page_info(3),
        );
        let v1 = first.to_value();
        let v2 = normalize(None, v1.clone()).to_value();
        assert_eq!(v1, v2);
    }
}
