//! Unit cell geometry and the Busing–Levy B matrix.

use nxgeom_math::Mat3;
use serde::{Deserialize, Serialize};

use crate::error::{GeometryError, Result};

/// Direct-space unit cell: lengths in Å, angles in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnitCell {
    /// Length a.
    pub a: f64,
    /// Length b.
    pub b: f64,
    /// Length c.
    pub c: f64,
    /// Angle between b and c.
    pub alpha: f64,
    /// Angle between a and c.
    pub beta: f64,
    /// Angle between a and b.
    pub gamma: f64,
}

impl UnitCell {
    /// Create a cell from six parameters.
    pub fn new(a: f64, b: f64, c: f64, alpha: f64, beta: f64, gamma: f64) -> Self {
        Self {
            a,
            b,
            c,
            alpha,
            beta,
            gamma,
        }
    }

    /// Cubic cell of side `a`.
    pub fn cubic(a: f64) -> Self {
        Self::new(a, a, a, 90.0, 90.0, 90.0)
    }

    /// Cell from a `[a, b, c, alpha, beta, gamma]` slice.
    pub fn from_slice(values: &[f64]) -> Option<Self> {
        match values {
            [a, b, c, alpha, beta, gamma] => Some(Self::new(*a, *b, *c, *alpha, *beta, *gamma)),
            _ => None,
        }
    }

    /// Cell volume in Å³. Zero or NaN for impossible angle combinations.
    pub fn volume(&self) -> f64 {
        let (ca, cb, cg) = (
            self.alpha.to_radians().cos(),
            self.beta.to_radians().cos(),
            self.gamma.to_radians().cos(),
        );
        let root = 1.0 - ca * ca - cb * cb - cg * cg + 2.0 * ca * cb * cg;
        self.a * self.b * self.c * root.max(0.0).sqrt()
    }

    /// Reciprocal cell (lengths in 1/Å without 2π, angles in degrees).
    pub fn reciprocal(&self) -> Result<UnitCell> {
        let v = self.volume();
        if !(v > 0.0) || self.a <= 0.0 || self.b <= 0.0 || self.c <= 0.0 {
            return Err(GeometryError::DegenerateLattice { determinant: v });
        }
        let (sa, sb, sg) = (
            self.alpha.to_radians().sin(),
            self.beta.to_radians().sin(),
            self.gamma.to_radians().sin(),
        );
        let (ca, cb, cg) = (
            self.alpha.to_radians().cos(),
            self.beta.to_radians().cos(),
            self.gamma.to_radians().cos(),
        );
        let angle = |cos: f64| cos.clamp(-1.0, 1.0).acos().to_degrees();
        Ok(UnitCell {
            a: self.b * self.c * sa / v,
            b: self.a * self.c * sb / v,
            c: self.a * self.b * sg / v,
            alpha: angle((cb * cg - ca) / (sb * sg)),
            beta: angle((ca * cg - cb) / (sa * sg)),
            gamma: angle((ca * cb - cg) / (sa * sb)),
        })
    }

    /// Busing–Levy B matrix, without the 2π factor.
    ///
    /// Columns are the reciprocal basis vectors in a Cartesian frame with
    /// a* along x and c along z.
    pub fn b_matrix(&self) -> Result<Mat3> {
        let r = self.reciprocal()?;
        let (ar, br, cr) = (r.a, r.b, r.c);
        let (bs, gs) = (r.beta.to_radians(), r.gamma.to_radians());
        Ok(Mat3::new(
            ar,
            br * gs.cos(),
            cr * bs.cos(),
            0.0,
            br * gs.sin(),
            -cr * bs.sin() * self.alpha.to_radians().cos(),
            0.0,
            0.0,
            1.0 / self.c,
        ))
    }

    /// `UB = U · B` for an orientation matrix `U`.
    pub fn ub_matrix(&self, orientation: &Mat3) -> Result<Mat3> {
        Ok(orientation * self.b_matrix()?)
    }

    /// Interplanar spacing of the (h, k, l) planes in Å.
    pub fn d_spacing(&self, h: f64, k: f64, l: f64) -> Result<f64> {
        let g = self.b_matrix()? * nxgeom_math::Vec3::new(h, k, l);
        let n = g.norm();
        if n == 0.0 {
            return Err(GeometryError::ZeroLength("(0, 0, 0) reflection".to_string()));
        }
        Ok(1.0 / n)
    }
}
