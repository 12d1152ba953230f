//! Single-link resolution: one record at one scan index to one 4×4 matrix.

use nxgeom_ir::{TransformRecord, TransformationType};
use nxgeom_math::{Dir3, Transform, Vec3};
use tracing::warn;

use crate::error::{ChainError, Result};
use crate::units::{angle_scale, length_scale};

/// Axes shorter than this are treated as missing.
const MIN_AXIS_NORM: f64 = 1e-12;

/// One link of a chain with its units already normalized.
///
/// Angles are radians, lengths millimetres.
#[derive(Debug, Clone, PartialEq)]
pub enum TransformOperation {
    /// Rotation about `axis` through the point `offset`.
    Rotation {
        /// Unit rotation axis.
        axis: Dir3,
        /// Offset in mm.
        offset: Vec3,
        /// Angle per scan point in radians.
        angles: Vec<f64>,
    },
    /// Translation along `axis`, preceded by a translation to `offset`.
    Translation {
        /// Unit translation direction.
        axis: Dir3,
        /// Offset in mm.
        offset: Vec3,
        /// Distance per scan point in mm.
        distances: Vec<f64>,
    },
    /// A link that is not understood; resolves to the identity.
    Unrecognized {
        /// The raw `transformation_type`.
        kind: String,
    },
}

impl TransformOperation {
    /// Convert a stored record, normalizing units.
    ///
    /// Unknown kinds and zero-length axes become [`TransformOperation::Unrecognized`]
    /// with a warning rather than an error.
    pub fn from_record(path: &str, record: &TransformRecord) -> Self {
        let kind = record.kind();
        if kind == TransformationType::Unrecognized {
            warn!(
                path,
                transformation_type = %record.transformation_type,
                "unrecognized transformation type, using identity"
            );
            return Self::Unrecognized {
                kind: record.transformation_type.clone(),
            };
        }

        let Some(axis) = Dir3::try_new(Vec3::from(record.vector), MIN_AXIS_NORM) else {
            warn!(path, "transformation vector has zero length, using identity");
            return Self::Unrecognized {
                kind: record.transformation_type.clone(),
            };
        };

        let offset_units = record.offset_units.as_deref().unwrap_or(match kind {
            TransformationType::Translation => record.units.as_str(),
            _ => "mm",
        });
        let offset = if record.offset == [0.0; 3] {
            Vec3::zeros()
        } else {
            Vec3::from(record.offset) * length_scale(path, offset_units)
        };

        match kind {
            TransformationType::Rotation => {
                let scale = angle_scale(path, &record.units);
                Self::Rotation {
                    axis,
                    offset,
                    angles: record.values.iter().map(|v| v * scale).collect(),
                }
            }
            _ => {
                let scale = length_scale(path, &record.units);
                Self::Translation {
                    axis,
                    offset,
                    distances: record.values.iter().map(|v| v * scale).collect(),
                }
            }
        }
    }

    /// Number of stored per-point values (0 for unrecognized links).
    pub fn value_count(&self) -> usize {
        match self {
            Self::Rotation { angles, .. } => angles.len(),
            Self::Translation { distances, .. } => distances.len(),
            Self::Unrecognized { .. } => 0,
        }
    }

    /// Matrix of this link at `index` in a scan of `scan_len` points.
    ///
    /// `path` is only used in error messages.
    pub fn matrix_at(&self, path: &str, index: usize, scan_len: usize) -> Result<Transform> {
        match self {
            Self::Rotation {
                axis,
                offset,
                angles,
            } => {
                let angle = select_value(path, angles, index, scan_len)?;
                // the axis passes through `offset`
                let rotation = Transform::rotation_about_axis(axis, angle);
                Ok(Transform::translation_vec(offset)
                    .then(&rotation)
                    .then(&Transform::translation_vec(&-offset)))
            }
            Self::Translation {
                axis,
                offset,
                distances,
            } => {
                let distance = select_value(path, distances, index, scan_len)?;
                let shift = Transform::translation_along(axis, distance);
                Ok(Transform::translation_vec(offset).then(&shift))
            }
            Self::Unrecognized { .. } => {
                check_index(index, scan_len)?;
                Ok(Transform::identity())
            }
        }
    }
}

/// Resolves records to matrices for a fixed scan length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationResolver {
    scan_len: usize,
}

impl OperationResolver {
    /// Resolver for a scan of `scan_len` points.
    pub fn new(scan_len: usize) -> Self {
        Self { scan_len }
    }

    /// The scan length in force.
    pub fn scan_len(&self) -> usize {
        self.scan_len
    }

    /// Matrix of `record` (stored at `path`) at `scan_index`.
    pub fn resolve(&self, path: &str, record: &TransformRecord, scan_index: usize) -> Result<Transform> {
        TransformOperation::from_record(path, record).matrix_at(path, scan_index, self.scan_len)
    }
}

fn check_index(index: usize, scan_len: usize) -> Result<()> {
    if index >= scan_len {
        return Err(ChainError::IndexOutOfRange {
            index,
            len: scan_len,
        });
    }
    Ok(())
}

/// Value for `index`: a single value is broadcast, a full array is indexed.
///
/// Any other length is a [`ChainError::ShapeMismatch`] naming `path`.
pub fn select_value(path: &str, values: &[f64], index: usize, scan_len: usize) -> Result<f64> {
    check_index(index, scan_len)?;
    match values.len() {
        1 => Ok(values[0]),
        n if n == scan_len => Ok(values[index]),
        n => Err(ChainError::ShapeMismatch {
            path: path.to_string(),
            len: n,
            scan_len,
        }),
    }
}
