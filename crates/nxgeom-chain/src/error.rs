//! Error types for chain resolution.

use thiserror::Error;

/// Errors that can occur while walking, resolving or composing a chain.
///
/// All of these are fatal to the single query that raised them.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChainError {
    /// A `depends_on` reference names a node that does not exist.
    #[error("broken transformation chain: '{path}' (referenced from '{from}') does not exist")]
    BrokenChain {
        /// The missing path.
        path: String,
        /// The node whose reference could not be resolved.
        from: String,
    },

    /// The traversal bound was exceeded, most likely because of a cycle.
    #[error("transformation chain starting at '{start}' exceeds {limit} links")]
    ChainTooLong {
        /// Where the walk started.
        start: String,
        /// The hop bound in force.
        limit: usize,
    },

    /// A per-point value array is neither length 1 nor the scan length.
    #[error("'{path}' has {len} values, expected 1 or {scan_len}")]
    ShapeMismatch {
        /// Offending node.
        path: String,
        /// Length found.
        len: usize,
        /// Scan length in force.
        scan_len: usize,
    },

    /// A scan index past the end of the scan.
    #[error("scan index {index} out of range for scan length {len}")]
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Scan length.
        len: usize,
    },

    /// A chain link that is a group rather than a transformation.
    #[error("'{0}' is not a transformation")]
    NotATransformation(String),
}

/// Result type for chain operations.
pub type Result<T> = std::result::Result<T, ChainError>;
