//! Typed representation of an uploaded row whose shape is not known ahead of time.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// A single cell from an uploaded row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum RawValue {
    Text(String),
    Number(Number),
    Boolean(bool),
    Empty,
}

/// Returned when a cell cannot be read as the requested type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoerceError;

impl RawValue {
    /// Types a CSV cell: blanks become `Empty`, `true`/`false` become booleans,
    /// and numeric literals become numbers only when the number renders back
    /// to the same text. Anything else (`007`, `1.50`, `+254…`, `1e3`) stays
    /// text so the cell survives unchanged.
    #[must_use]
    pub fn infer(cell: &str) -> Self {
        let trimmed = cell.trim();
        if trimmed.is_empty() {
            return RawValue::Empty;
        }
        if trimmed.eq_ignore_ascii_case("true") {
            return RawValue::Boolean(true);
        }
        if trimmed.eq_ignore_ascii_case("false") {
            return RawValue::Boolean(false);
        }

        let number = match trimmed.parse::<i64>() {
            Ok(n) => Some(Number::from(n)),
            Err(_) => trimmed.parse::<f64>().ok().and_then(Number::from_f64),
        };
        match number {
            Some(n) if n.to_string() == trimmed => RawValue::Number(n),
            _ => RawValue::Text(cell.to_string()),
        }
    }

    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            RawValue::Empty => true,
            RawValue::Text(s) => s.trim().is_empty(),
            RawValue::Number(_) | RawValue::Boolean(_) => false,
        }
    }

    /// Display form of the value, trimmed. `None` when blank.
    #[must_use]
    pub fn as_text(&self) -> Option<String> {
        match self {
            RawValue::Empty => None,
            RawValue::Text(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            RawValue::Number(n) => Some(n.to_string()),
            RawValue::Boolean(b) => Some(b.to_string()),
        }
    }

    /// Reads the value as a finite float. Blank cells read as `None`.
    pub fn as_f64(&self) -> Result<Option<f64>, CoerceError> {
        match self {
            RawValue::Empty => Ok(None),
            RawValue::Number(n) => n.as_f64().map(Some).ok_or(CoerceError),
            RawValue::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Ok(None);
                }
                match trimmed.parse::<f64>() {
                    Ok(v) if v.is_finite() && looks_numeric(trimmed) => Ok(Some(v)),
                    _ => Err(CoerceError),
                }
            }
            RawValue::Boolean(_) => Err(CoerceError),
        }
    }

    /// Reads the value as a whole number. `3.0` is accepted, `3.5` is not.
    pub fn as_i64(&self) -> Result<Option<i64>, CoerceError> {
        match self {
            RawValue::Empty => Ok(None),
            RawValue::Number(n) => match n.as_i64() {
                Some(v) => Ok(Some(v)),
                None => n.as_f64().and_then(integral).map(Some).ok_or(CoerceError),
            },
            RawValue::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Ok(None);
                }
                if let Ok(v) = trimmed.parse::<i64>() {
                    return Ok(Some(v));
                }
                trimmed
                    .parse::<f64>()
                    .ok()
                    .filter(|_| looks_numeric(trimmed))
                    .and_then(integral)
                    .map(Some)
                    .ok_or(CoerceError)
            }
            RawValue::Boolean(_) => Err(CoerceError),
        }
    }
}

// Rust's float parser accepts "inf" and "NaN"; uploads should not.
fn looks_numeric(s: &str) -> bool {
    s.bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'-' | b'+' | b'e' | b'E'))
}

fn integral(v: f64) -> Option<i64> {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < i64::MAX as f64 {
        Some(v as i64)
    } else {
        None
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Text(s.to_string())
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        RawValue::Text(s)
    }
}

impl From<Value> for RawValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => RawValue::Empty,
            Value::Bool(b) => RawValue::Boolean(b),
            Value::Number(n) => RawValue::Number(n),
            Value::String(s) => RawValue::Text(s),
            other => RawValue::Text(other.to_string()),
        }
    }
}

impl From<RawValue> for Value {
    fn from(value: RawValue) -> Self {
        match value {
            RawValue::Empty => Value::Null,
            RawValue::Boolean(b) => Value::Bool(b),
            RawValue::Number(n) => Value::Number(n),
            RawValue::Text(s) => Value::String(s),
        }
    }
}

/// An uploaded row: column names mapped to cells, in source column order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct RawRow {
    fields: Vec<(String, RawValue)>,
}

impl RawRow {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a column, replacing any existing value for the same name.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<RawValue>) {
        let column = column.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == column) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((column, value)),
        }
    }

    #[must_use]
    pub fn get(&self, column: &str) -> Option<&RawValue> {
        self.fields
            .iter()
            .find_map(|(k, v)| (k == column).then_some(v))
    }

    /// True when the column exists and holds something other than a blank.
    #[must_use]
    pub fn has_value(&self, column: &str) -> bool {
        self.get(column).is_some_and(|v| !v.is_blank())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RawValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Every column not named in `reserved`, as an insertion-ordered JSON map.
    #[must_use]
    pub fn without(&self, reserved: &[&str]) -> Map<String, Value> {
        self.fields
            .iter()
            .filter(|(k, _)| !reserved.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), Value::from(v.clone())))
            .collect()
    }
}

impl<K: Into<String>, V: Into<RawValue>> FromIterator<(K, V)> for RawRow {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = RawRow::new();
        for (k, v) in iter {
            row.insert(k, v);
        }
        row
    }
}

impl From<Map<String, Value>> for RawRow {
    fn from(map: Map<String, Value>) -> Self {
        map.into_iter().collect()
    }
}

impl From<RawRow> for Map<String, Value> {
    fn from(row: RawRow) -> Self {
        row.fields
            .into_iter()
            .map(|(k, v)| (k, Value::from(v)))
            .collect()
    }
}
