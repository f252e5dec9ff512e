// Sample: one unit of training data
//
// A sample is a small named record: a few tensors ("data", "seg", ...) next to
// scalar metadata such as an identifier or a label. Fields are kept in a
// BTreeMap so iteration order (and therefore collation order) is stable.

use std::collections::BTreeMap;
use std::fmt;

use sluice_core::{Error, Result, Tensor};

/// A single field value inside a [`Sample`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Tensor(Tensor),
    Text(String),
    Int(i64),
    Float(f64),
}

impl Value {
    pub fn as_tensor(&self) -> Option<&Tensor> {
        match self {
            Value::Tensor(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Identifier view of this value. Only text and integers qualify.
    pub fn as_id(&self) -> Option<SampleId> {
        match self {
            Value::Text(s) => Some(SampleId::Text(s.clone())),
            Value::Int(v) => Some(SampleId::Int(*v)),
            _ => None,
        }
    }
}

impl From<Tensor> for Value {
    fn from(t: Tensor) -> Self {
        Value::Tensor(t)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

/// Hashable sample identifier, read from a sample's ID field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SampleId {
    Text(String),
    Int(i64),
}

impl fmt::Display for SampleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleId::Text(s) => write!(f, "{s}"),
            SampleId::Int(v) => write!(f, "{v}"),
        }
    }
}

impl From<&str> for SampleId {
    fn from(s: &str) -> Self {
        SampleId::Text(s.to_string())
    }
}

impl From<String> for SampleId {
    fn from(s: String) -> Self {
        SampleId::Text(s)
    }
}

impl From<i64> for SampleId {
    fn from(v: i64) -> Self {
        SampleId::Int(v)
    }
}

/// A named mapping of field values.
///
/// # Example
/// ```
/// use sluice_core::Tensor;
/// use sluice_data::Sample;
///
/// let sample = Sample::new()
///     .with("id", "case_001")
///     .with("data", Tensor::from_vec(vec![0.0; 4], [1, 2, 2]).unwrap());
/// assert_eq!(sample.id("id").unwrap().to_string(), "case_001");
/// assert_eq!(sample.tensor("data").unwrap().dims(), &[1, 2, 2]);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sample {
    fields: BTreeMap<String, Value>,
}

impl Sample {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert a field, returning the previous value if any.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.fields.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn field(&self, key: &str) -> Result<&Value> {
        self.fields.get(key).ok_or_else(|| Error::missing_field(key))
    }

    /// The tensor stored under `key`.
    pub fn tensor(&self, key: &str) -> Result<&Tensor> {
        self.field(key)?.as_tensor().ok_or_else(|| Error::FieldType {
            key: key.to_string(),
            expected: "a tensor",
        })
    }

    /// The identifier stored under `key`.
    pub fn id(&self, key: &str) -> Result<SampleId> {
        self.field(key)?.as_id().ok_or_else(|| Error::FieldType {
            key: key.to_string(),
            expected: "a text or integer identifier",
        })
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Sample {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Sample {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}
