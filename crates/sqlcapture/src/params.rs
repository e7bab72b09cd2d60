use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tokio_postgres::types::ToSql;

/// Values bound to a captured statement.
///
/// The shape is resolved once when the statement is captured; formatting code
/// only ever matches on the variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Parameters {
    /// `$1, $2, ...` / `?` style values, in bind order.
    Positional(Vec<Value>),
    /// `:name` style values.
    Named(BTreeMap<String, Value>),
    /// A single opaque value.
    Scalar(Value),
}

impl Default for Parameters {
    fn default() -> Self {
        Self::none()
    }
}

impl Parameters {
    /// No bound values.
    pub fn none() -> Self {
        Self::Positional(Vec::new())
    }

    /// Render tokio-postgres parameters through their `Debug` text.
    pub fn from_sql_params(params: &[&(dyn ToSql + Sync)]) -> Self {
        Self::Positional(
            params
                .iter()
                .map(|p| Value::String(format!("{p:?}")))
                .collect(),
        )
    }

    /// Resolve a JSON value into its parameter shape: arrays are positional,
    /// objects are named, anything else is a scalar.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Array(values) => Self::Positional(values),
            Value::Object(map) => Self::Named(map.into_iter().collect()),
            other => Self::Scalar(other),
        }
    }

    /// Bound values in display order (named values are ordered by name).
    pub fn values(&self) -> Vec<&Value> {
        match self {
            Self::Positional(values) => values.iter().collect(),
            Self::Named(map) => map.values().collect(),
            Self::Scalar(value) => vec![value],
        }
    }

    /// Number of bound values.
    pub fn len(&self) -> usize {
        match self {
            Self::Positional(values) => values.len(),
            Self::Named(map) => map.len(),
            Self::Scalar(_) => 1,
        }
    }

    /// Whether no value is bound. A scalar always counts as one value.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Values joined with `+`, strings unquoted (`joe+Joe Jones+2`).
    pub fn joined(&self) -> String {
        self.values()
            .into_iter()
            .map(display_value)
            .collect::<Vec<_>>()
            .join("+")
    }

    /// JSON rendering keeping the shape (array, object or bare value).
    pub fn to_json(&self) -> Value {
        match self {
            Self::Positional(values) => Value::Array(values.clone()),
            Self::Named(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            ),
            Self::Scalar(value) => value.clone(),
        }
    }
}

impl From<Vec<Value>> for Parameters {
    fn from(values: Vec<Value>) -> Self {
        Self::Positional(values)
    }
}

impl From<BTreeMap<String, Value>> for Parameters {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self::Named(map)
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "NULL".to_string(),
        other => other.to_string(),
    }
}
