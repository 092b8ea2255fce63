use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Number, Value};

use crate::Result;

/// Numeric kind of a parameter; only changes the input step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    Float,
    Int,
    #[serde(other)]
    Other,
}

/// One configurable numeric input belonging to an operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub label: String,
    #[serde(
        rename = "type",
        default,
        deserialize_with = "lenient_kind",
        skip_serializing_if = "Option::is_none"
    )]
    pub kind: Option<ParamKind>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub default: Option<Number>,
}

impl Parameter {
    pub fn int(name: &str, label: &str, default: i64) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            kind: Some(ParamKind::Int),
            default: Some(default.into()),
        }
    }

    pub fn float(name: &str, label: &str, default: f64) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            kind: Some(ParamKind::Float),
            default: Number::from_f64(default),
        }
    }

    pub fn is_float(&self) -> bool {
        self.kind == Some(ParamKind::Float)
    }
}

/// A named action with an ordered parameter schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: String,
    #[serde(
        default,
        deserialize_with = "lenient_label",
        skip_serializing_if = "Option::is_none"
    )]
    pub label: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub params: Vec<Parameter>,
}

impl Operation {
    pub fn new(name: &str, label: &str) -> Self {
        Self {
            name: name.to_string(),
            label: Some(label.to_string()),
            params: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_param(mut self, param: Parameter) -> Self {
        self.params.push(param);
        self
    }

    /// Text shown in the operation dropdown
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }
}

// A malformed field degrades to its default instead of failing the whole
// catalog; only a payload that is not a JSON array is rejected.

fn text(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn lenient_text<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<String, D::Error> {
    Ok(text(Value::deserialize(d)?).unwrap_or_default())
}

fn lenient_label<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<String>, D::Error> {
    Ok(text(Value::deserialize(d)?))
}

fn lenient_kind<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<ParamKind>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Null => None,
        v => Some(serde_json::from_value(v).unwrap_or(ParamKind::Other)),
    })
}

/// Numbers pass through; numeric strings such as `"1.5"` are converted
fn lenient_number<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<Number>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Number(n) => Some(n),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .map(Number::from)
                .or_else(|| s.parse::<f64>().ok().and_then(Number::from_f64))
        }
        _ => None,
    })
}

/// Array entries that are not objects are dropped
fn lenient_list<'de, D, T>(d: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    Ok(match Value::deserialize(d)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|v| serde_json::from_value(v).ok())
            .collect(),
        _ => Vec::new(),
    })
}

/// Read-only list of operations loaded once at startup
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperationSet {
    operations: Vec<Operation>,
}

impl OperationSet {
    pub fn new(operations: Vec<Operation>) -> Self {
        Self { operations }
    }

    /// Parse the text content of the embedded data element.
    ///
    /// Empty text is read as `[]`. Anything else must be a JSON array of
    /// operations.
    pub fn parse(text: &str) -> Result<Self> {
        let text = if text.is_empty() { "[]" } else { text };
        let items: Vec<Value> = serde_json::from_str(text)?;
        let operations = items
            .into_iter()
            .filter_map(|v| serde_json::from_value(v).ok())
            .collect();
        Ok(Self { operations })
    }

    /// Load from an optional embedded payload; a missing element is an empty set
    pub fn from_embedded(text: Option<&str>) -> Result<Self> {
        text.map_or_else(|| Ok(Self::default()), Self::parse)
    }

    /// First operation with the given name
    pub fn find(&self, name: &str) -> Option<&Operation> {
        self.operations.iter().find(|op| op.name == name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Operation> {
        self.operations.iter()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.operations).unwrap_or_else(|_| "[]".to_string())
    }
}

impl From<Vec<Operation>> for OperationSet {
    fn from(operations: Vec<Operation>) -> Self {
        Self::new(operations)
    }
}

impl<'a> IntoIterator for &'a OperationSet {
    type Item = &'a Operation;
    type IntoIter = std::slice::Iter<'a, Operation>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
