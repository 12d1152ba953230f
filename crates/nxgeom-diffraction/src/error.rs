//! Error types for geometry queries.

use nxgeom_chain::ChainError;
use thiserror::Error;

/// Errors that can occur while building a geometry model or answering a query.
#[derive(Error, Debug)]
pub enum GeometryError {
    /// Chain walking or resolution failed.
    ///
    /// Scan indices past the end are reported as [`GeometryError::IndexOutOfRange`].
    #[error(transparent)]
    Chain(ChainError),

    /// A scan index, pixel or module index outside the resolved bounds.
    #[error("{what} index {index} out of range (size {len})")]
    IndexOutOfRange {
        /// What was being indexed.
        what: &'static str,
        /// Requested index.
        index: usize,
        /// Number of valid entries.
        len: usize,
    },

    /// The (2π-scaled) UB matrix is not invertible.
    #[error("degenerate lattice: UB determinant {determinant:e} below tolerance")]
    DegenerateLattice {
        /// Determinant of the scaled UB matrix.
        determinant: f64,
    },

    /// The sample rotation at a scan point is not invertible.
    #[error("sample rotation is singular at scan index {0}")]
    SingularRotation(usize),

    /// A position or vector with no direction.
    #[error("zero-length vector: {0}")]
    ZeroLength(String),

    /// No group at a layout path.
    #[error("group not found: {0}")]
    MissingGroup(String),

    /// A required field is absent.
    #[error("field '{field}' missing from '{path}'")]
    MissingField {
        /// Group path.
        path: String,
        /// Field name.
        field: String,
    },

    /// A field has the wrong number of values.
    #[error("field '{field}' in '{path}' has {len} values, expected {expected}")]
    FieldShape {
        /// Group path.
        path: String,
        /// Field name.
        field: String,
        /// Values found.
        len: usize,
        /// Description of the accepted lengths.
        expected: &'static str,
    },

    /// Settings that parse but make no sense.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// Settings file is not valid TOML for the schema.
    #[error("failed to parse settings: {0}")]
    Settings(#[from] toml::de::Error),

    /// I/O error reading a settings file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GeometryError {
    /// Create an index-out-of-range error.
    pub fn out_of_range(what: &'static str, index: usize, len: usize) -> Self {
        Self::IndexOutOfRange { what, index, len }
    }

    /// Create a missing-field error.
    pub fn missing_field(path: impl Into<String>, field: impl Into<String>) -> Self {
        Self::MissingField {
            path: path.into(),
            field: field.into(),
        }
    }
}

impl From<ChainError> for GeometryError {
    fn from(err: ChainError) -> Self {
        match err {
            ChainError::IndexOutOfRange { index, len } => Self::out_of_range("scan", index, len),
            other => Self::Chain(other),
        }
    }
}

/// Result type for geometry operations.
pub type Result<T> = std::result::Result<T, GeometryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_index_error_becomes_geometry_index_error() {
        let err = GeometryError::from(ChainError::IndexOutOfRange { index: 5, len: 3 });
        assert!(matches!(
            err,
            GeometryError::IndexOutOfRange { what: "scan", index: 5, len: 3 }
        ));
        assert_eq!(err.to_string(), "scan index 5 out of range (size 3)");

        let err = GeometryError::from(ChainError::NotATransformation("/g".into()));
        assert!(matches!(err, GeometryError::Chain(ChainError::NotATransformation(_))));
    }
}
