//! Sample: unit cell, orientation, UB and the goniometer chain.

use nxgeom_chain::{Chain, ChainWalker};
use nxgeom_ir::{GroupRecord, NodeAccessor};
use nxgeom_math::{Mat3, Vec3};
use tracing::debug;

use crate::error::{GeometryError, Result};
use crate::group_at;
use crate::lattice::UnitCell;
use crate::reciprocal::ReciprocalSpaceCalculator;

/// A crystal sample mounted on a goniometer chain.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Group path.
    pub path: String,
    /// Unit cell, if recorded.
    pub unit_cell: Option<UnitCell>,
    /// Orientation matrix U.
    pub orientation: Mat3,
    /// UB matrix in Å⁻¹, without 2π.
    pub ub: Option<Mat3>,
    /// The sample's `depends_on` chain.
    pub chain: Chain,
}

impl Sample {
    /// Sample with a known UB and no goniometer.
    pub fn with_ub(ub: Mat3) -> Self {
        Self {
            path: String::new(),
            unit_cell: None,
            orientation: Mat3::identity(),
            ub: Some(ub),
            chain: Chain::empty(),
        }
    }

    /// Read a sample group.
    ///
    /// `ub_matrix` wins when present; otherwise UB is built from
    /// `unit_cell` and `orientation_matrix` (identity when absent).
    pub fn from_group<A: NodeAccessor + ?Sized>(walker: &ChainWalker<'_, A>, path: &str) -> Result<Self> {
        let group = group_at(walker.accessor(), path)?;

        let unit_cell = match group.field("unit_cell") {
            Some(field) => Some(UnitCell::from_slice(&field.values).ok_or_else(|| {
                GeometryError::FieldShape {
                    path: path.to_string(),
                    field: "unit_cell".to_string(),
                    len: field.values.len(),
                    expected: "6",
                }
            })?),
            None => None,
        };
        let orientation = read_matrix(path, group, "orientation_matrix")?.unwrap_or_else(Mat3::identity);
        let ub = match read_matrix(path, group, "ub_matrix")? {
            Some(ub) => Some(ub),
            None => unit_cell.map(|cell| cell.ub_matrix(&orientation)).transpose()?,
        };

        let chain = Chain::load(walker, path)?;
        debug!(path, links = chain.len(), has_ub = ub.is_some(), "loaded sample");
        Ok(Self {
            path: path.to_string(),
            unit_cell,
            orientation,
            ub,
            chain,
        })
    }

    /// UB, or a missing-field error.
    pub fn ub(&self) -> Result<Mat3> {
        self.ub
            .ok_or_else(|| GeometryError::missing_field(self.path.clone(), "ub_matrix"))
    }

    /// Rotation part `R` of the composed sample chain at `index`.
    pub fn rotation_at(&self, index: usize, scan_len: usize) -> Result<Mat3> {
        Ok(self.chain.transform_at(index, scan_len)?.rotation_part())
    }

    /// `Q = 2π · R · UB · hkl` at `index` (NeXus frame).
    pub fn hkl_to_q(&self, hkl: &Vec3, index: usize, scan_len: usize) -> Result<Vec3> {
        let r = self.rotation_at(index, scan_len)?;
        Ok(ReciprocalSpaceCalculator::default().hkl_to_q(hkl, &r, &self.ub()?))
    }
}

/// Optional 3×3 field stored row-major.
fn read_matrix(path: &str, group: &GroupRecord, name: &str) -> Result<Option<Mat3>> {
    match group.field(name) {
        None => Ok(None),
        Some(field) if field.values.len() == 9 => Ok(Some(Mat3::from_row_slice(&field.values))),
        Some(field) => Err(GeometryError::FieldShape {
            path: path.to_string(),
            field: name.to_string(),
            len: field.values.len(),
            expected: "9",
        }),
    }
}
