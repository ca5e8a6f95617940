use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use serde_json::{Number, Value};

/// Ordered field -> value mapping produced for an object schema.
pub type Record = IndexMap<String, GeneratedValue>;

/// A generated value tree, mirroring the shape of the effective schema.
#[derive(Debug, Clone, PartialEq)]
pub enum GeneratedValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Uuid(String),
    Timestamp(DateTime<Utc>),
    List(Vec<GeneratedValue>),
    Record(Record),
}

impl GeneratedValue {
    pub fn is_null(&self) -> bool {
        matches!(self, GeneratedValue::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            GeneratedValue::Int(value) => Some(*value as f64),
            GeneratedValue::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            GeneratedValue::Text(value) | GeneratedValue::Uuid(value) => Some(value),
            _ => None,
        }
    }

    /// Text rendering used when a value is concatenated or coerced to a string.
    pub fn render(&self) -> String {
        match self {
            GeneratedValue::Null => "null".to_string(),
            GeneratedValue::Bool(value) => value.to_string(),
            GeneratedValue::Int(value) => value.to_string(),
            GeneratedValue::Float(value) => value.to_string(),
            GeneratedValue::Text(value) | GeneratedValue::Uuid(value) => value.clone(),
            GeneratedValue::Timestamp(value) => format_timestamp(value),
            GeneratedValue::List(_) | GeneratedValue::Record(_) => self.to_json().to_string(),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            GeneratedValue::Null => Value::Null,
            GeneratedValue::Bool(value) => Value::Bool(*value),
            GeneratedValue::Int(value) => Value::from(*value),
            GeneratedValue::Float(value) => Number::from_f64(*value)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            GeneratedValue::Text(value) | GeneratedValue::Uuid(value) => {
                Value::String(value.clone())
            }
            GeneratedValue::Timestamp(value) => Value::String(format_timestamp(value)),
            GeneratedValue::List(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            GeneratedValue::Record(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(name, value)| (name.clone(), value.to_json()))
                    .collect(),
            ),
        }
    }

    /// Converts literal schema data (`const`, `default`, extension values).
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => GeneratedValue::Null,
            Value::Bool(value) => GeneratedValue::Bool(*value),
            Value::Number(number) => match number.as_i64() {
                Some(value) => GeneratedValue::Int(value),
                None => GeneratedValue::Float(number.as_f64().unwrap_or_default()),
            },
            Value::String(value) => GeneratedValue::Text(value.clone()),
            Value::Array(items) => GeneratedValue::List(items.iter().map(Self::from_json).collect()),
            Value::Object(fields) => GeneratedValue::Record(
                fields
                    .iter()
                    .map(|(name, value)| (name.clone(), Self::from_json(value)))
                    .collect(),
            ),
        }
    }
}

impl Serialize for GeneratedValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl From<GeneratedValue> for Value {
    fn from(value: GeneratedValue) -> Self {
        value.to_json()
    }
}

/// RFC 3339 with millisecond precision and a `Z` suffix.
pub fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}
