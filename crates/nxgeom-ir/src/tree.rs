//! In-memory dataset snapshot.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::path::normalize;
use crate::{GroupRecord, Node, NodeAccessor, TransformRecord};

/// A dataset tree held in memory, keyed by absolute path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NexusTree {
    /// Snapshot format version.
    pub version: String,
    /// All nodes, keyed by normalized absolute path.
    pub nodes: BTreeMap<String, Node>,
}

impl Default for NexusTree {
    fn default() -> Self {
        Self {
            version: "0.1".to_string(),
            nodes: BTreeMap::new(),
        }
    }
}

impl NexusTree {
    /// Create a new empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node, replacing any node already at `path`.
    pub fn insert(&mut self, path: &str, node: Node) {
        self.nodes.insert(normalize(path), node);
    }

    /// Insert a transformation record.
    pub fn insert_transformation(&mut self, path: &str, record: TransformRecord) {
        self.insert(path, Node::Transformation(record));
    }

    /// Insert a group record.
    pub fn insert_group(&mut self, path: &str, record: GroupRecord) {
        self.insert(path, Node::Group(record));
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize from JSON string. Keys are normalized on load.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let raw: NexusTree = serde_json::from_str(json)?;
        Ok(Self {
            version: raw.version,
            nodes: raw
                .nodes
                .into_iter()
                .map(|(k, v)| (normalize(&k), v))
                .collect(),
        })
    }
}

impl NodeAccessor for NexusTree {
    fn node(&self, path: &str) -> Option<&Node> {
        self.nodes
            .get(path)
            .or_else(|| self.nodes.get(&normalize(path)))
    }
}
