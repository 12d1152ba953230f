//! Node records for the nxgeom geometry engine.
//!
//! This crate defines the read-only boundary between the hierarchical
//! dataset (a NeXus-style tree of groups and fields) and the transform-chain
//! resolver. Records are plain values: the resolver never mutates them and
//! never holds a file handle.
//!
//! A dataset is reached through the [`NodeAccessor`] trait. [`NexusTree`]
//! is an in-memory accessor that can be round-tripped through JSON.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

pub mod path;
mod tree;

pub use path::TERMINAL;
pub use tree::NexusTree;

/// Recognized kinds of transformation record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformationType {
    /// Rotation about `vector` by `value` (angle units).
    Rotation,
    /// Translation along `vector` by `value` (length units).
    Translation,
    /// Anything else found in the `transformation_type` attribute.
    Unrecognized,
}

impl TransformationType {
    /// Classify a raw `transformation_type` string (case-insensitive).
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "rotation" => Self::Rotation,
            "translation" => Self::Translation,
            _ => Self::Unrecognized,
        }
    }
}

/// One stored transformation: a rotation or translation field with its
/// attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformRecord {
    /// Raw `transformation_type` attribute.
    pub transformation_type: String,
    /// Rotation axis or translation direction; need not be unit length.
    #[serde(default = "default_vector")]
    pub vector: [f64; 3],
    /// Offset applied before the operation.
    #[serde(default)]
    pub offset: [f64; 3],
    /// Length unit of `offset`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset_units: Option<String>,
    /// Angle or length unit of `values`.
    #[serde(default)]
    pub units: String,
    /// Path of the parent node, or [`TERMINAL`].
    #[serde(default = "default_depends_on")]
    pub depends_on: String,
    /// Magnitude per scan point (length 1 for a constant).
    #[serde(deserialize_with = "scalar_or_array")]
    pub values: Vec<f64>,
}

impl TransformRecord {
    /// A rotation record.
    pub fn rotation(vector: [f64; 3], units: &str, values: Vec<f64>, depends_on: &str) -> Self {
        Self {
            transformation_type: "rotation".to_string(),
            vector,
            offset: [0.0; 3],
            offset_units: None,
            units: units.to_string(),
            depends_on: depends_on.to_string(),
            values,
        }
    }

    /// A translation record.
    pub fn translation(vector: [f64; 3], units: &str, values: Vec<f64>, depends_on: &str) -> Self {
        Self {
            transformation_type: "translation".to_string(),
            ..Self::rotation(vector, units, values, depends_on)
        }
    }

    /// Set the offset and its units.
    pub fn with_offset(mut self, offset: [f64; 3], units: &str) -> Self {
        self.offset = offset;
        self.offset_units = Some(units.to_string());
        self
    }

    /// Classified `transformation_type`.
    pub fn kind(&self) -> TransformationType {
        TransformationType::parse(&self.transformation_type)
    }
}

/// A numeric field inside a group, with optional units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Flattened values (row-major for matrices).
    #[serde(deserialize_with = "scalar_or_array")]
    pub values: Vec<f64>,
    /// Unit label, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
}

impl Field {
    /// A field without units.
    pub fn new(values: Vec<f64>) -> Self {
        Self {
            values,
            units: None,
        }
    }

    /// A field with a unit label.
    pub fn with_units(values: Vec<f64>, units: &str) -> Self {
        Self {
            values,
            units: Some(units.to_string()),
        }
    }
}

/// An attribute-only record: a component group (sample, beam, detector
/// module) that may carry a `depends_on` reference and numeric fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupRecord {
    /// `NX_class` attribute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nx_class: Option<String>,
    /// Start of the group's transformation chain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<String>,
    /// Numeric fields by name.
    #[serde(default)]
    pub fields: BTreeMap<String, Field>,
}

impl GroupRecord {
    /// An empty group of the given class.
    pub fn new(nx_class: &str) -> Self {
        Self {
            nx_class: Some(nx_class.to_string()),
            ..Self::default()
        }
    }

    /// Set the `depends_on` reference.
    pub fn with_depends_on(mut self, reference: &str) -> Self {
        self.depends_on = Some(reference.to_string());
        self
    }

    /// Add a field.
    pub fn with_field(mut self, name: &str, field: Field) -> Self {
        self.fields.insert(name.to_string(), field);
        self
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }
}

/// A node in the dataset tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    /// A transformation field.
    Transformation(TransformRecord),
    /// A group carrying attributes and fields.
    Group(GroupRecord),
}

impl Node {
    /// The raw `depends_on` reference, if the node carries one.
    pub fn depends_on(&self) -> Option<&str> {
        match self {
            Node::Transformation(t) => Some(t.depends_on.as_str()),
            Node::Group(g) => g.depends_on.as_deref(),
        }
    }

    /// The transformation record, if this is one.
    pub fn as_transformation(&self) -> Option<&TransformRecord> {
        match self {
            Node::Transformation(t) => Some(t),
            Node::Group(_) => None,
        }
    }

    /// The group record, if this is one.
    pub fn as_group(&self) -> Option<&GroupRecord> {
        match self {
            Node::Group(g) => Some(g),
            Node::Transformation(_) => None,
        }
    }
}

/// Read-only access to the nodes of one open dataset.
///
/// Implementations must return the same record for the same path for the
/// lifetime of the accessor.
pub trait NodeAccessor: Send + Sync {
    /// Node at an absolute path.
    fn node(&self, path: &str) -> Option<&Node>;

    /// Whether a node exists at `path`.
    fn contains(&self, path: &str) -> bool {
        self.node(path).is_some()
    }
}

fn default_vector() -> [f64; 3] {
    [0.0, 0.0, 1.0]
}

fn default_depends_on() -> String {
    TERMINAL.to_string()
}

/// Accept either a scalar or a 1-D array.
fn scalar_or_array<'de, D>(deserializer: D) -> Result<Vec<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Scalar(f64),
        Array(Vec<f64>),
    }

    Ok(match Repr::deserialize(deserializer)? {
        Repr::Scalar(v) => vec![v],
        Repr::Array(v) => v,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_transformation_type() {
        assert_eq!(TransformationType::parse("rotation"), TransformationType::Rotation);
        assert_eq!(TransformationType::parse("Translation"), TransformationType::Translation);
        assert_eq!(TransformationType::parse("shear"), TransformationType::Unrecognized);
        assert_eq!(TransformationType::parse(""), TransformationType::Unrecognized);
    }

    #[test]
    fn scalar_value_becomes_single_element() {
        let json = r#"{"transformation_type":"rotation","vector":[0,0,1],"units":"deg","depends_on":".","values":90}"#;
        let rec: TransformRecord = serde_json::from_str(json).unwrap();
        assert_eq!(rec.values, vec![90.0]);
        assert_eq!(rec.offset, [0.0; 3]);
        assert_eq!(rec.kind(), TransformationType::Rotation);
    }

    #[test]
    fn missing_attributes_take_defaults() {
        let json = r#"{"transformation_type":"translation","values":[1,2,3]}"#;
        let rec: TransformRecord = serde_json::from_str(json).unwrap();
        assert_eq!(rec.depends_on, TERMINAL);
        assert_eq!(rec.vector, [0.0, 0.0, 1.0]);
        assert!(rec.units.is_empty());
        assert_eq!(rec.values.len(), 3);
    }

    #[test]
    fn serde_tagged_node() {
        let node = Node::Group(
            GroupRecord::new("NXsample")
                .with_depends_on("transformations/phi")
                .with_field("unit_cell", Field::new(vec![4.0, 4.0, 4.0, 90.0, 90.0, 90.0])),
        );
        let json = serde_json::to_string(&node).unwrap();
        assert!(json.contains(r#""kind":"group""#));
        let restored: Node = serde_json::from_str(&json).unwrap();
        assert_eq!(node, restored);
        assert_eq!(restored.depends_on(), Some("transformations/phi"));
        assert!(restored.as_transformation().is_none());
    }
}
