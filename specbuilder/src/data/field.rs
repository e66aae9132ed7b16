use serde_json::{Number, Value};

use crate::error::EditError;

/// Value shapes a form field accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Free text.
    Text,
    /// Integer or floating-point number.
    Number,
    /// Checkbox.
    Boolean,
    /// One of a fixed set of variants.
    Choice(&'static [&'static str]),
    /// List of strings.
    TextList,
}

/// A scalar field declared by a node kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    /// Key in the fragment.
    pub name: &'static str,
    /// Label shown next to the widget.
    pub label: &'static str,
    pub kind: FieldKind,
    /// Help text, may be empty.
    pub description: &'static str,
}

impl FieldDef {
    pub const fn new(name: &'static str, label: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            label,
            kind,
            description: "",
        }
    }

    pub const fn describe(self, description: &'static str) -> Self {
        Self {
            description,
            ..self
        }
    }
}

impl FieldKind {
    /// Convert widget input into the JSON stored for this field.
    ///
    /// Number fields also take numeric text, boolean fields take `"true"` and
    /// `"false"`, and text lists take a comma-separated string.
    pub fn coerce(&self, value: &Value, path: &str) -> Result<Value, EditError> {
        let mismatch = |expected: &str| EditError::TypeMismatch {
            path: path.to_string(),
            expected: expected.to_string(),
            actual: format!("{}", value),
        };

        match self {
            FieldKind::Text => match value {
                Value::String(_) => Ok(value.clone()),
                Value::Number(n) => Ok(Value::String(n.to_string())),
                _ => Err(mismatch("string")),
            },
            FieldKind::Number => match value {
                Value::Number(_) => Ok(value.clone()),
                Value::String(s) => parse_number(s.trim()).ok_or_else(|| mismatch("number")),
                _ => Err(mismatch("number")),
            },
            FieldKind::Boolean => match value {
                Value::Bool(_) => Ok(value.clone()),
                Value::String(s) => s
                    .trim()
                    .parse::<bool>()
                    .map(Value::Bool)
                    .map_err(|_| mismatch("boolean")),
                _ => Err(mismatch("boolean")),
            },
            FieldKind::Choice(variants) => {
                let expected = format!("one of: {:?}", variants);
                match value {
                    Value::String(s) => variants
                        .iter()
                        .find(|v| v.eq_ignore_ascii_case(s.trim()))
                        .map(|v| Value::String(v.to_string()))
                        .ok_or_else(|| mismatch(&expected)),
                    _ => Err(mismatch(&expected)),
                }
            }
            FieldKind::TextList => match value {
                Value::Array(items) => {
                    let mut values = Vec::with_capacity(items.len());
                    for item in items {
                        match item {
                            Value::String(s) => values.push(Value::String(s.clone())),
                            Value::Number(n) => values.push(Value::String(n.to_string())),
                            Value::Bool(b) => values.push(Value::String(b.to_string())),
                            _ => return Err(mismatch("string, number, or boolean items")),
                        }
                    }
                    Ok(Value::Array(values))
                }
                Value::String(s) => Ok(Value::Array(
                    s.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(|s| Value::String(s.to_string()))
                        .collect(),
                )),
                _ => Err(mismatch("array")),
            },
        }
    }
}

fn parse_number(s: &str) -> Option<Value> {
    if let Ok(i) = s.parse::<i64>() {
        return Some(Value::Number(Number::from(i)));
    }
    s.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
}
