//! Core data model: typed fields, schemas, rows and datasets.
//!
//! Fields are addressed by [`FieldId`] handles rather than by name. A transform resolves the
//! names it cares about once, at setup, and only touches rows through the resulting handles.

use std::fmt;
use std::ops::{Index, IndexMut};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TransformError;

/// Logical data type for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DataType {
    /// 64-bit signed integer.
    Int64,
    /// 64-bit floating point number (`double` in configuration).
    Float64,
    /// Boolean.
    Bool,
    /// UTF-8 string.
    #[default]
    Utf8,
}

impl FromStr for DataType {
    type Err = TransformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "double" | "float64" | "float" | "decimal" | "single" => Ok(Self::Float64),
            "int" | "int32" | "int64" | "long" | "integer" => Ok(Self::Int64),
            "bool" | "boolean" => Ok(Self::Bool),
            "" | "string" | "utf8" => Ok(Self::Utf8),
            other => Err(TransformError::configuration(format!(
                "unsupported field type '{other}'"
            ))),
        }
    }
}

impl TryFrom<String> for DataType {
    type Error = TransformError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DataType> for String {
    fn from(value: DataType) -> Self {
        value.to_string()
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Int64 => "int64",
            Self::Float64 => "double",
            Self::Bool => "bool",
            Self::Utf8 => "string",
        };
        f.write_str(name)
    }
}

/// Whether a field is read from the source or produced by a transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldRole {
    /// Supplied by the source.
    #[default]
    Input,
    /// Produced by a transform.
    Calculated,
}

/// A single named, typed field in a [`Schema`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Field name.
    pub name: String,
    /// Declared data type.
    #[serde(rename = "type", default)]
    pub data_type: DataType,
    /// Declared maximum length (strings only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<usize>,
    /// Input or calculated.
    #[serde(default)]
    pub role: FieldRole,
}

impl Field {
    /// Create a new input field.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            length: None,
            role: FieldRole::Input,
        }
    }

    /// Set the declared length.
    pub fn with_length(mut self, length: usize) -> Self {
        self.length = Some(length);
        self
    }

    /// Mark the field as calculated.
    pub fn calculated(mut self) -> Self {
        self.role = FieldRole::Calculated;
        self
    }
}

/// Handle of a field within its [`Schema`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId(usize);

impl FieldId {
    /// Position of the field in the schema (and of its value in a row).
    pub fn index(self) -> usize {
        self.0
    }
}

/// An ordered list of fields describing the shape of rows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Schema {
    /// Ordered list of fields.
    pub fields: Vec<Field>,
}

impl Schema {
    /// Create a new schema from fields.
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Append `fields` as calculated fields, skipping names that already exist.
    pub fn with_calculated(mut self, fields: impl IntoIterator<Item = Field>) -> Self {
        for field in fields {
            if self.field_id(&field.name).is_none() {
                self.fields.push(field.calculated());
            }
        }
        self
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the schema has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the handle of the first field named `name`, if present.
    pub fn field_id(&self, name: &str) -> Option<FieldId> {
        self.fields.iter().position(|f| f.name == name).map(FieldId)
    }

    /// Returns every handle whose field is named `name`.
    pub fn field_ids(&self, name: &str) -> Vec<FieldId> {
        self.fields
            .iter()
            .enumerate()
            .filter(|(_, f)| f.name == name)
            .map(|(i, _)| FieldId(i))
            .collect()
    }

    /// Field metadata for a handle.
    pub fn field(&self, id: FieldId) -> Option<&Field> {
        self.fields.get(id.0)
    }

    /// Iterate `(handle, field)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (FieldId, &Field)> {
        self.fields.iter().enumerate().map(|(i, f)| (FieldId(i), f))
    }

    /// Create an empty (all-null) row shaped like this schema.
    pub fn new_row(&self) -> Row {
        Row::new(self.fields.len())
    }
}

/// A single typed value in a [`Row`].
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Missing/empty value.
    #[default]
    Null,
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit float.
    Float64(f64),
    /// Boolean.
    Bool(bool),
    /// UTF-8 string.
    Utf8(String),
}

impl Value {
    /// Whether the value is [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The string payload, if this is a [`Value::Utf8`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Utf8(s) => Some(s),
            _ => None,
        }
    }

    /// The numeric payload as `f64`, if numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float64(v) => Some(*v),
            Self::Int64(v) => Some(*v as f64),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Int64(v) => write!(f, "{v}"),
            Self::Float64(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Utf8(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Utf8(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Utf8(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float64(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// One record flowing through the pipeline, addressed by [`FieldId`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    values: Vec<Value>,
}

impl Row {
    /// Create a row of `len` null values.
    pub fn new(len: usize) -> Self {
        Self {
            values: vec![Value::Null; len],
        }
    }

    /// Create a row from values laid out in schema order.
    pub fn from_values(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// Value for a field, if the row is wide enough.
    pub fn get(&self, field: FieldId) -> Option<&Value> {
        self.values.get(field.0)
    }

    /// Replace the value for a field. Handles outside the row are ignored.
    pub fn set(&mut self, field: FieldId, value: impl Into<Value>) {
        if let Some(slot) = self.values.get_mut(field.0) {
            *slot = value.into();
        }
    }

    /// Values in schema order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Number of values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the row holds no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Index<FieldId> for Row {
    type Output = Value;

    fn index(&self, field: FieldId) -> &Self::Output {
        &self.values[field.0]
    }
}

impl IndexMut<FieldId> for Row {
    fn index_mut(&mut self, field: FieldId) -> &mut Self::Output {
        &mut self.values[field.0]
    }
}

/// In-memory tabular dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSet {
    /// Schema describing row shape.
    pub schema: Schema,
    /// Rows in schema order.
    pub rows: Vec<Row>,
}

impl DataSet {
    /// Create a dataset from schema and rows.
    pub fn new(schema: Schema, rows: Vec<Row>) -> Self {
        Self { schema, rows }
    }

    /// Number of rows in the dataset.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}
