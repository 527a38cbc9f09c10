// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Type and value adaptation between the tag source and the metric namespace.
//!
//! # Type tables
//!
//! | source    | metric  |   | metric  | source  | lossy |
//! |-----------|---------|---|---------|---------|-------|
//! | Double    | Double  |   | Double  | Double  |       |
//! | Boolean   | Boolean |   | Float   | Double  |       |
//! | String    | String  |   | Boolean | Boolean |       |
//! | Integer   | Int32   |   | String  | String  |       |
//! |           |         |   | Int32   | Integer |       |
//! |           |         |   | Int64   | Double  | yes   |
//! |           |         |   | UInt64  | Double  | yes   |
//! |           |         |   | Unknown | String  |       |
//!
//! Every source type survives `source -> metric -> source` unchanged.
//!
//! # Value normalization
//!
//! Boolean source values `"0"` and `"1"` are read as `false` and `true` before
//! the generic parse. Everything else is parsed according to the resolved
//! target type, with surrounding whitespace ignored. `NaN` is not a valid
//! Double since it never compares equal to the stored value.

use crate::error::{TransformError, TransformResult};
use crate::naming::NameTransformer;
use crate::types::{
    Metric, MetricDataType, MetricValue, PropertySet, SourceDataType, TagRecord, TagWrite,
    QUALITY_PROPERTY,
};

// =============================================================================
// Type Codes
// =============================================================================

/// A type from either side of the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeCode {
    /// A tag source type.
    Source(SourceDataType),
    /// A metric type.
    Metric(MetricDataType),
}

/// Conversion direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Tag source to metric namespace.
    SourceToMetric,
    /// Metric namespace to tag source.
    MetricToSource,
}

/// Result of mapping a metric type onto the source type system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeMapping {
    /// The resolved source type.
    pub source: SourceDataType,
    /// `true` when the source type cannot represent every value of the metric type.
    pub lossy: bool,
}

/// Bidirectional type table.
#[derive(Debug, Clone, Copy, Default)]
pub struct TypeAdapter;

impl TypeAdapter {
    /// Creates an adapter.
    pub fn new() -> Self {
        Self
    }

    /// Maps a source type onto its metric type.
    pub fn source_to_metric(&self, ty: SourceDataType) -> MetricDataType {
        match ty {
            SourceDataType::Double => MetricDataType::Double,
            SourceDataType::Boolean => MetricDataType::Boolean,
            SourceDataType::String => MetricDataType::String,
            SourceDataType::Integer => MetricDataType::Int32,
        }
    }

    /// Maps a metric type onto the nearest source type.
    pub fn metric_to_source(&self, ty: MetricDataType) -> TypeMapping {
        let (source, lossy) = match ty {
            MetricDataType::Double | MetricDataType::Float => (SourceDataType::Double, false),
            MetricDataType::Boolean => (SourceDataType::Boolean, false),
            MetricDataType::String | MetricDataType::Unknown => (SourceDataType::String, false),
            MetricDataType::Int32 => (SourceDataType::Integer, false),
            MetricDataType::Int64 | MetricDataType::UInt64 => (SourceDataType::Double, true),
        };
        TypeMapping { source, lossy }
    }

    /// Adapts a type code in the given direction.
    ///
    /// A code from the wrong side of the table for `direction` has no entry and
    /// fails with [`TransformError::UnsupportedType`].
    pub fn adapt(&self, code: TypeCode, direction: Direction) -> TransformResult<TypeCode> {
        match (code, direction) {
            (TypeCode::Source(ty), Direction::SourceToMetric) => {
                Ok(TypeCode::Metric(self.source_to_metric(ty)))
            }
            (TypeCode::Metric(ty), Direction::MetricToSource) => {
                Ok(TypeCode::Source(self.metric_to_source(ty).source))
            }
            (TypeCode::Source(ty), Direction::MetricToSource) => Err(
                TransformError::unsupported_type(format!("source type {} as metric type", ty)),
            ),
            (TypeCode::Metric(ty), Direction::SourceToMetric) => Err(
                TransformError::unsupported_type(format!("metric type {} as source type", ty)),
            ),
        }
    }

    // =========================================================================
    // Values
    // =========================================================================

    /// Parses a string-encoded source value into a typed metric value.
    pub fn parse_source_value(
        &self,
        name: &str,
        raw: &str,
        ty: SourceDataType,
    ) -> TransformResult<MetricValue> {
        let invalid = || TransformError::invalid_value(name, raw, ty.as_str());
        let trimmed = raw.trim();

        match ty {
            SourceDataType::Boolean => {
                let normalized = match trimmed {
                    "0" => "false",
                    "1" => "true",
                    other => other,
                };
                if normalized.eq_ignore_ascii_case("true") {
                    Ok(MetricValue::Boolean(true))
                } else if normalized.eq_ignore_ascii_case("false") {
                    Ok(MetricValue::Boolean(false))
                } else {
                    Err(invalid())
                }
            }
            SourceDataType::Integer => trimmed
                .parse::<i32>()
                .map(MetricValue::Int32)
                .map_err(|_| invalid()),
            SourceDataType::Double => match trimmed.parse::<f64>() {
                Ok(v) if !v.is_nan() => Ok(MetricValue::Double(v)),
                _ => Err(invalid()),
            },
            SourceDataType::String => Ok(MetricValue::String(raw.to_string())),
        }
    }

    /// Renders a metric value as the string encoding of `target`.
    pub fn render_value(
        &self,
        name: &str,
        value: &MetricValue,
        target: SourceDataType,
    ) -> TransformResult<String> {
        if value.is_null() {
            return Err(TransformError::invalid_value(name, "null", target.as_str()));
        }

        let rendered = match (target, value) {
            (SourceDataType::Double, MetricValue::Int64(_) | MetricValue::UInt64(_)) => value
                .as_f64()
                .map(|v| v.to_string())
                .unwrap_or_else(|| value.to_string()),
            _ => value.to_string(),
        };

        // The rendered text must read back as the target type.
        self.parse_source_value(name, &rendered, target)?;
        Ok(rendered)
    }

    // =========================================================================
    // Records
    // =========================================================================

    /// Converts a source tag into its namespaced metric.
    ///
    /// The tag quality travels as the `Quality` property.
    pub fn tag_to_metric(&self, tag: &TagRecord, names: &NameTransformer) -> TransformResult<Metric> {
        let name = names.to_namespaced_name(&tag.name)?;
        let value = self.parse_source_value(&tag.name, &tag.value, tag.data_type)?;

        let mut properties = PropertySet::new();
        properties.insert(QUALITY_PROPERTY, MetricValue::Int32(tag.quality));

        Ok(Metric {
            name,
            data_type: self.source_to_metric(tag.data_type),
            value,
            timestamp: tag.updated_at,
            properties,
        })
    }

    /// Converts an outgoing metric into a write that creates a new tag.
    ///
    /// The tag path comes from [`NameTransformer::to_flat_name`] and must map
    /// back onto the metric name, so the new tag is later discovered under the
    /// name it was written with. The tag type follows the metric type.
    pub fn metric_to_tag_write(
        &self,
        metric: &Metric,
        names: &NameTransformer,
    ) -> TransformResult<OutgoingTag> {
        if !names.is_namespaced(&metric.name) {
            return Err(TransformError::malformed_name(
                &metric.name,
                format!("metric does not carry node marker _{}", names.node_id()),
            ));
        }
        let name = names.to_flat_name(&metric.name);
        if name.trim().is_empty() {
            return Err(TransformError::malformed_name(
                &metric.name,
                "no tag path left after removing the node marker",
            ));
        }
        if names.to_namespaced_name(&name)? != metric.name {
            return Err(TransformError::malformed_name(
                &metric.name,
                format!("tag path '{}' does not map back onto the metric name", name),
            ));
        }

        let mapping = self.metric_to_source(metric.data_type);
        self.outgoing(metric, name, mapping.source, mapping.lossy)
    }

    /// Converts an outgoing metric into an update of an existing tag.
    ///
    /// The value is converted to the tag's own type; a value that does not
    /// read back as that type is rejected.
    pub fn metric_to_tag_update(
        &self,
        metric: &Metric,
        tag: &TagRecord,
    ) -> TransformResult<OutgoingTag> {
        let mapping = self.metric_to_source(metric.data_type);
        let lossy = mapping.lossy && tag.data_type == SourceDataType::Double;
        self.outgoing(metric, tag.name.clone(), tag.data_type, lossy)
    }

    fn outgoing(
        &self,
        metric: &Metric,
        name: String,
        target: SourceDataType,
        lossy: bool,
    ) -> TransformResult<OutgoingTag> {
        let value = self.render_value(&metric.name, &metric.value, target)?;
        let stored = Metric {
            name: metric.name.clone(),
            data_type: self.source_to_metric(target),
            value: self.parse_source_value(&metric.name, &value, target)?,
            timestamp: metric.timestamp,
            properties: metric.properties.clone(),
        };

        Ok(OutgoingTag {
            write: TagWrite {
                name,
                value,
                data_type: target,
                quality: metric.quality(),
            },
            stored,
            lossy,
        })
    }
}

/// A converted outgoing record.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingTag {
    /// The record to write.
    pub write: TagWrite,
    /// The metric as the next pull will report it once the write landed.
    pub stored: Metric,
    /// `true` when the metric type was narrowed onto a lossy source type.
    pub lossy: bool,
}
