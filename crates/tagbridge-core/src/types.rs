// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Core data types for tagbridge.
//!
//! Two record models meet here: the flat, string-valued [`TagRecord`] of the
//! relational tag source and the typed, namespaced [`Metric`] of the
//! publish/subscribe side. Conversion between them lives in
//! [`crate::adapter`]; this module only defines the shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TransformError;

/// Property key carrying the source quality code on every derived metric.
pub const QUALITY_PROPERTY: &str = "Quality";

// =============================================================================
// Type Systems
// =============================================================================

/// Primitive types understood by the tag source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceDataType {
    /// 64-bit floating point
    Double,
    /// Boolean
    Boolean,
    /// UTF-8 string
    String,
    /// 32-bit signed integer
    Integer,
}

impl SourceDataType {
    /// All source types, in table order.
    pub const ALL: [SourceDataType; 4] = [
        SourceDataType::Double,
        SourceDataType::Boolean,
        SourceDataType::String,
        SourceDataType::Integer,
    ];

    /// Returns the canonical name of this type.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceDataType::Double => "Double",
            SourceDataType::Boolean => "Boolean",
            SourceDataType::String => "String",
            SourceDataType::Integer => "Integer",
        }
    }
}

impl fmt::Display for SourceDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceDataType {
    type Err = TransformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "double" => Ok(SourceDataType::Double),
            "boolean" | "bool" => Ok(SourceDataType::Boolean),
            "string" => Ok(SourceDataType::String),
            "integer" | "int" => Ok(SourceDataType::Integer),
            _ => Err(TransformError::unsupported_type(s)),
        }
    }
}

/// Typed-value kinds of the metric namespace.
///
/// Numeric codes follow the Sparkplug B data type table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricDataType {
    /// Type not known to the publisher.
    Unknown,
    /// 32-bit signed integer
    Int32,
    /// 64-bit signed integer
    Int64,
    /// 64-bit unsigned integer
    UInt64,
    /// 32-bit floating point
    Float,
    /// 64-bit floating point
    Double,
    /// Boolean
    Boolean,
    /// UTF-8 string
    String,
}

impl MetricDataType {
    /// Returns the numeric type code.
    pub fn code(&self) -> u32 {
        match self {
            MetricDataType::Unknown => 0,
            MetricDataType::Int32 => 3,
            MetricDataType::Int64 => 4,
            MetricDataType::UInt64 => 8,
            MetricDataType::Float => 9,
            MetricDataType::Double => 10,
            MetricDataType::Boolean => 11,
            MetricDataType::String => 12,
        }
    }

    /// Decodes a numeric type code. Codes outside the supported subset yield `None`.
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(MetricDataType::Unknown),
            3 => Some(MetricDataType::Int32),
            4 => Some(MetricDataType::Int64),
            8 => Some(MetricDataType::UInt64),
            9 => Some(MetricDataType::Float),
            10 => Some(MetricDataType::Double),
            11 => Some(MetricDataType::Boolean),
            12 => Some(MetricDataType::String),
            _ => None,
        }
    }

    /// Returns the canonical name of this type.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricDataType::Unknown => "Unknown",
            MetricDataType::Int32 => "Int32",
            MetricDataType::Int64 => "Int64",
            MetricDataType::UInt64 => "UInt64",
            MetricDataType::Float => "Float",
            MetricDataType::Double => "Double",
            MetricDataType::Boolean => "Boolean",
            MetricDataType::String => "String",
        }
    }
}

impl Default for MetricDataType {
    fn default() -> Self {
        Self::Unknown
    }
}

impl fmt::Display for MetricDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Metric Values
// =============================================================================

/// A typed metric value.
///
/// Equality is strict: `Double(1.0)` and `Float(1.0)` are different values.
///
/// # Examples
///
/// ```
/// use tagbridge_core::types::{MetricDataType, MetricValue};
///
/// let v = MetricValue::Double(25.5);
/// assert_eq!(v.data_type(), MetricDataType::Double);
/// assert_eq!(v.to_string(), "25.5");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum MetricValue {
    /// Boolean value
    Boolean(bool),
    /// 32-bit signed integer
    Int32(i32),
    /// 64-bit signed integer
    Int64(i64),
    /// 64-bit unsigned integer
    UInt64(u64),
    /// 32-bit float
    Float(f32),
    /// 64-bit float
    Double(f64),
    /// UTF-8 string
    String(String),
    /// No value
    Null,
}

impl MetricValue {
    /// Returns the metric type matching this value.
    pub fn data_type(&self) -> MetricDataType {
        match self {
            MetricValue::Boolean(_) => MetricDataType::Boolean,
            MetricValue::Int32(_) => MetricDataType::Int32,
            MetricValue::Int64(_) => MetricDataType::Int64,
            MetricValue::UInt64(_) => MetricDataType::UInt64,
            MetricValue::Float(_) => MetricDataType::Float,
            MetricValue::Double(_) => MetricDataType::Double,
            MetricValue::String(_) => MetricDataType::String,
            MetricValue::Null => MetricDataType::Unknown,
        }
    }

    /// Returns `true` if this is a null value.
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, MetricValue::Null)
    }

    /// Attempts to read this value as a boolean.
    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            MetricValue::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    /// Attempts to read this value as an i64.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            MetricValue::Int32(v) => Some(i64::from(*v)),
            MetricValue::Int64(v) => Some(*v),
            MetricValue::UInt64(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Attempts to read this value as an f64.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetricValue::Int32(v) => Some(f64::from(*v)),
            MetricValue::Int64(v) => Some(*v as f64),
            MetricValue::UInt64(v) => Some(*v as f64),
            MetricValue::Float(v) => Some(f64::from(*v)),
            MetricValue::Double(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Boolean(v) => write!(f, "{}", v),
            MetricValue::Int32(v) => write!(f, "{}", v),
            MetricValue::Int64(v) => write!(f, "{}", v),
            MetricValue::UInt64(v) => write!(f, "{}", v),
            MetricValue::Float(v) => write!(f, "{}", v),
            MetricValue::Double(v) => write!(f, "{}", v),
            MetricValue::String(v) => f.write_str(v),
            MetricValue::Null => Ok(()),
        }
    }
}

macro_rules! impl_from_for_metric_value {
    ($variant:ident, $type:ty) => {
        impl From<$type> for MetricValue {
            fn from(v: $type) -> Self {
                MetricValue::$variant(v)
            }
        }
    };
}

impl_from_for_metric_value!(Boolean, bool);
impl_from_for_metric_value!(Int32, i32);
impl_from_for_metric_value!(Int64, i64);
impl_from_for_metric_value!(UInt64, u64);
impl_from_for_metric_value!(Float, f32);
impl_from_for_metric_value!(Double, f64);
impl_from_for_metric_value!(String, String);

impl From<&str> for MetricValue {
    fn from(v: &str) -> Self {
        MetricValue::String(v.to_string())
    }
}

// =============================================================================
// Properties
// =============================================================================

/// Ordered key to typed-value side properties of a metric.
///
/// Keys are unique; inserting an existing key replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertySet(Vec<(String, MetricValue)>);

impl PropertySet {
    /// Creates an empty property set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a property.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<MetricValue>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.0.push((key, value)),
        }
    }

    /// Returns the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&MetricValue> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Iterates properties in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetricValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns the number of properties.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no properties.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// =============================================================================
// Records
// =============================================================================

/// A named, typed process value as read from the tag source.
///
/// `id` identifies the tag within one source session only; the source may
/// reassign ids across its own restarts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagRecord {
    /// Source-assigned numeric id.
    pub id: i64,
    /// Dot-delimited hierarchical path.
    pub name: String,
    /// String-encoded value.
    pub value: String,
    /// Source type.
    pub data_type: SourceDataType,
    /// Source quality code.
    #[serde(default)]
    pub quality: i32,
    /// Last update time reported by the source.
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl TagRecord {
    /// Creates a record with zero quality and the current time.
    pub fn new(
        id: i64,
        name: impl Into<String>,
        value: impl Into<String>,
        data_type: SourceDataType,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            value: value.into(),
            data_type,
            quality: 0,
            updated_at: Utc::now(),
        }
    }

    /// Sets the quality code.
    pub fn with_quality(mut self, quality: i32) -> Self {
        self.quality = quality;
        self
    }

    /// Sets the update timestamp.
    pub fn with_updated_at(mut self, updated_at: DateTime<Utc>) -> Self {
        self.updated_at = updated_at;
        self
    }
}

/// A named, typed value in the metric namespace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metric {
    /// Slash-delimited, namespace-prefixed name.
    pub name: String,
    /// Declared type.
    pub data_type: MetricDataType,
    /// Current value.
    pub value: MetricValue,
    /// Observation time.
    pub timestamp: DateTime<Utc>,
    /// Side properties such as quality.
    #[serde(default, skip_serializing_if = "PropertySet::is_empty")]
    pub properties: PropertySet,
}

impl Metric {
    /// Creates a metric whose declared type follows its value.
    pub fn new(name: impl Into<String>, value: impl Into<MetricValue>) -> Self {
        let value = value.into();
        Self {
            name: name.into(),
            data_type: value.data_type(),
            value,
            timestamp: Utc::now(),
            properties: PropertySet::new(),
        }
    }

    /// Overrides the declared type.
    pub fn with_data_type(mut self, data_type: MetricDataType) -> Self {
        self.data_type = data_type;
        self
    }

    /// Adds or replaces a property.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<MetricValue>) -> Self {
        self.properties.insert(key, value);
        self
    }

    /// Sets the observation time.
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Returns the quality property, if present and integral.
    pub fn quality(&self) -> Option<i32> {
        match self.properties.get(QUALITY_PROPERTY)? {
            MetricValue::Int32(q) => Some(*q),
            other => other.as_i64().and_then(|q| i32::try_from(q).ok()),
        }
    }
}

/// An outgoing value headed back into the tag source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagWrite {
    /// Dot-delimited tag path.
    pub name: String,
    /// String-encoded value.
    pub value: String,
    /// Source type the value is encoded as.
    pub data_type: SourceDataType,
    /// Quality code to write, if the metric carried one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<i32>,
}
