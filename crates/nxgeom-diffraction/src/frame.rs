//! Laboratory frame of reference.
//!
//! Chains resolve into the NeXus (McStas) frame: beam along +z, y vertical.
//! A [`LabFrame`] is an immutable proper rotation applied to every vector the
//! model hands out. It is fixed at model construction and never changed.

use nxgeom_math::{Mat3, Point3, Vec3};

use crate::error::{GeometryError, Result};

/// Orthonormality tolerance for user-supplied bases.
const BASIS_TOLERANCE: f64 = 1e-9;

/// Basis change from the NeXus frame to the frame results are reported in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabFrame {
    basis: Mat3,
}

impl Default for LabFrame {
    fn default() -> Self {
        Self::identity()
    }
}

impl LabFrame {
    /// Report results in the NeXus frame itself.
    pub fn identity() -> Self {
        Self {
            basis: Mat3::identity(),
        }
    }

    /// You (1999) diffractometer frame: beam along +y, z vertical, x to the
    /// right looking downstream.
    pub fn you() -> Self {
        Self {
            basis: Mat3::new(-1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 1.0, 0.0),
        }
    }

    /// Basis from explicit rows. Must be a proper rotation.
    pub fn from_rows(rows: [[f64; 3]; 3]) -> Result<Self> {
        let basis = Mat3::from_row_slice(&rows.concat());
        let ortho = (basis * basis.transpose() - Mat3::identity()).abs().max();
        if ortho > BASIS_TOLERANCE || (basis.determinant() - 1.0).abs() > BASIS_TOLERANCE {
            return Err(GeometryError::InvalidSettings(
                "lab frame must be a proper rotation matrix".into(),
            ));
        }
        Ok(Self { basis })
    }

    /// The basis matrix.
    pub fn basis(&self) -> &Mat3 {
        &self.basis
    }

    /// Express a NeXus-frame vector in this frame.
    pub fn apply_vec(&self, v: &Vec3) -> Vec3 {
        self.basis * v
    }

    /// Express a NeXus-frame point in this frame.
    pub fn apply_point(&self, p: &Point3) -> Point3 {
        Point3::from(self.basis * p.coords)
    }

    /// Rotation `R` (acting on sample-frame vectors) composed into this frame.
    pub fn apply_rotation(&self, r: &Mat3) -> Mat3 {
        self.basis * r
    }
}
