//! Query-string assembly for provider URLs.
//!
//! Parameters are appended to whatever query the base URL already carries.
//! Scalar values are percent-encoded the way `encodeURIComponent` does it,
//! structured values are serialized to JSON first, and parameters without a
//! value are dropped.

use serde_json::Value;

/// A single query parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    Str(String),
    Num(f64),
    Bool(bool),
    /// Serialized to JSON before encoding.
    Json(Value),
}

impl QueryValue {
    fn encoded(&self) -> String {
        match self {
            QueryValue::Str(s) => encode_component(s),
            QueryValue::Num(n) => encode_component(&format_number(*n)),
            QueryValue::Bool(b) => b.to_string(),
            QueryValue::Json(v) => encode_component(&v.to_string()),
        }
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        QueryValue::Str(value.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        QueryValue::Str(value)
    }
}

impl From<f64> for QueryValue {
    fn from(value: f64) -> Self {
        QueryValue::Num(value)
    }
}

impl From<i64> for QueryValue {
    fn from(value: i64) -> Self {
        QueryValue::Num(value as f64)
    }
}

impl From<u32> for QueryValue {
    fn from(value: u32) -> Self {
        QueryValue::Num(f64::from(value))
    }
}

impl From<bool> for QueryValue {
    fn from(value: bool) -> Self {
        QueryValue::Bool(value)
    }
}

impl From<Value> for QueryValue {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => QueryValue::Str(s),
            Value::Bool(b) => QueryValue::Bool(b),
            Value::Number(n) => match n.as_f64() {
                Some(f) => QueryValue::Num(f),
                None => QueryValue::Str(n.to_string()),
            },
            other => QueryValue::Json(other),
        }
    }
}

/// Ordered parameter list. Later entries with the same name replace earlier ones
/// in place, so caller overrides keep the position of the default.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams {
    entries: Vec<(String, Option<QueryValue>)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `name` to `value`.
    pub fn set(mut self, name: &str, value: impl Into<QueryValue>) -> Self {
        self.insert(name, Some(value.into()));
        self
    }

    /// Set `name` if `value` is present; `None` records the parameter as absent.
    pub fn set_opt<V: Into<QueryValue>>(mut self, name: &str, value: Option<V>) -> Self {
        self.insert(name, value.map(Into::into));
        self
    }

    /// Merge `other` on top of `self`.
    pub fn extend(mut self, other: QueryParams) -> Self {
        for (name, value) in other.entries {
            self.insert(&name, value);
        }
        self
    }

    fn insert(&mut self, name: &str, value: Option<QueryValue>) {
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((name.to_string(), value)),
        }
    }
}

/// Append `params` to `url`, keeping any query the URL already has.
pub fn query_string(params: &QueryParams, url: &str) -> String {
    let mut pieces = url.split(['?', '&']);
    let base = pieces.next().unwrap_or_default();

    let mut parts: Vec<String> = pieces
        .filter_map(|piece| {
            let (name, value) = piece.split_once('=').unwrap_or((piece, ""));
            if name.is_empty() {
                None
            } else if value.is_empty() {
                Some(name.to_string())
            } else {
                Some(format!("{name}={value}"))
            }
        })
        .collect();

    for (name, value) in &params.entries {
        if let Some(value) = value {
            parts.push(format!("{name}={}", value.encoded()));
        }
    }

    if parts.is_empty() {
        base.to_string()
    } else {
        format!("{base}?{}", parts.join("&"))
    }
}

/// Raw (still encoded) value of `name` in the query part of `url`.
pub fn query_param(name: &str, url: &str) -> Option<String> {
    let (_, query) = url.split_once('?')?;
    let query = query.split('#').next().unwrap_or_default();
    query.split('&').find_map(|piece| {
        let (n, v) = piece.split_once('=').unwrap_or((piece, ""));
        (n == name).then(|| v.to_string())
    })
}

/// Percent-encode everything outside `A-Z a-z 0-9 - _ . ! ~ * ' ( )`.
pub fn encode_component(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'-'
            | b'_'
            | b'.'
            | b'!'
            | b'~'
            | b'*'
            | b'\''
            | b'('
            | b')' => out.push(byte as char),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}
