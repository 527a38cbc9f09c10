// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Flat tag path to namespaced metric name conversion.
//!
//! Source tags use dotted paths (`Ent.Site.Area.Unit.Line.Cell.Var`). Metric
//! names embed the publishing node marker `_<nodeId>` and, for paths deep
//! enough to carry an ISA-95 hierarchy, a backslash-joined structural prefix:
//!
//! | flat name                       | namespaced name (node `N1`)        |
//! |---------------------------------|------------------------------------|
//! | `Foo`                           | `_N1/Foo`                          |
//! | `Line1.Speed`                   | `Line1/_N1/Speed`                  |
//! | `Ent.Site.Area.X.Line.Cell.Var` | `Ent\Site\Area\Line\Cell/_N1\Var`  |
//!
//! The fourth ISA-95 segment is reserved and skipped. The forward transform is
//! not idempotent, so it must be applied exactly once to each raw name.

use crate::error::{TransformError, TransformResult};

/// Namespace separator.
pub const SEPARATOR: char = '/';

/// Separator inside the ISA-95 structural prefix and the variable path.
pub const STRUCTURE_SEPARATOR: char = '\\';

/// Legacy separator used by the tag source.
pub const LEGACY_SEPARATOR: char = '.';

/// Minimum segment count for the ISA-95 layout.
const ISA95_MIN_SEGMENTS: usize = 6;

/// Converts names between the tag source and the metric namespace for one node.
///
/// # Examples
///
/// ```
/// use tagbridge_core::naming::NameTransformer;
///
/// let names = NameTransformer::new("N1").unwrap();
/// assert_eq!(names.to_namespaced_name("Foo").unwrap(), "_N1/Foo");
/// assert_eq!(names.to_flat_name("_N1/Foo"), "Foo");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameTransformer {
    node_id: String,
    marker: String,
}

impl NameTransformer {
    /// Creates a transformer for `node_id`.
    ///
    /// The node id must be non-empty and free of separators, otherwise the
    /// marker segment could not be located again on the reverse path.
    pub fn new(node_id: impl Into<String>) -> TransformResult<Self> {
        let node_id = node_id.into();
        if node_id.trim().is_empty() {
            return Err(TransformError::malformed_name(node_id, "node id is empty"));
        }
        if node_id.contains([SEPARATOR, STRUCTURE_SEPARATOR, LEGACY_SEPARATOR]) {
            return Err(TransformError::malformed_name(
                node_id,
                "node id must not contain a separator",
            ));
        }
        let marker = format!("_{}", node_id);
        Ok(Self { node_id, marker })
    }

    /// Returns the node id.
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Converts a flat dotted tag path into its namespaced metric name.
    pub fn to_namespaced_name(&self, flat_name: &str) -> TransformResult<String> {
        if flat_name.trim().is_empty() {
            return Err(TransformError::malformed_name(flat_name, "name is empty"));
        }

        let normalized = flat_name.replace(LEGACY_SEPARATOR, "/");
        let segments: Vec<&str> = normalized.split(SEPARATOR).collect();

        if segments.len() >= ISA95_MIN_SEGMENTS {
            return Ok(self.isa95_name(&segments));
        }

        match normalized.rfind(SEPARATOR) {
            Some(idx) => {
                let (prefix, tail) = normalized.split_at(idx);
                Ok(format!("{}{}{}{}", prefix, SEPARATOR, self.marker, tail))
            }
            None => Ok(format!("{}{}{}", self.marker, SEPARATOR, normalized)),
        }
    }

    /// Converts every name in order. A failing name does not stop the others.
    pub fn to_namespaced_names<'a, I>(&self, flat_names: I) -> Vec<TransformResult<String>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        flat_names
            .into_iter()
            .map(|name| self.to_namespaced_name(name))
            .collect()
    }

    /// Converts a namespaced metric name back into a dotted tag path.
    ///
    /// The node marker segment is removed when present and every remaining
    /// separator becomes a dot. Names that never carried a marker are only
    /// re-separated.
    pub fn to_flat_name(&self, namespaced: &str) -> String {
        let segments: Vec<&str> = namespaced
            .split([SEPARATOR, STRUCTURE_SEPARATOR])
            .filter(|segment| *segment != self.marker)
            .collect();
        segments.join(".")
    }

    /// Returns `true` if `name` carries this node's marker segment.
    pub fn is_namespaced(&self, name: &str) -> bool {
        name.split([SEPARATOR, STRUCTURE_SEPARATOR])
            .any(|segment| segment == self.marker)
    }

    fn isa95_name(&self, segments: &[&str]) -> String {
        // Enterprise, Site, Area, (reserved), Line, Cell
        let structure = [segments[0], segments[1], segments[2], segments[4], segments[5]]
            .join("\\");

        let mut variable_path = String::new();
        for segment in &segments[ISA95_MIN_SEGMENTS..] {
            variable_path.push(STRUCTURE_SEPARATOR);
            variable_path.push_str(segment);
        }

        format!("{}{}{}{}", structure, SEPARATOR, self.marker, variable_path)
    }
}
