//! Wavevectors, scattering vectors and Miller indices.
//!
//! Wavelengths are Å, so wavevectors and Q are in Å⁻¹ and include the 2π
//! factor. UB matrices are stored without it.

use nxgeom_math::{Mat3, Tolerance, Vec3};
use std::f64::consts::PI;

use crate::error::{GeometryError, Result};

/// `h·c` in keV·Å.
pub const HC_KEV_ANGSTROM: f64 = 12.398_419_843_320_026;

/// Photon wavelength in Å for an energy in keV.
pub fn energy_to_wavelength(energy_kev: f64) -> f64 {
    HC_KEV_ANGSTROM / energy_kev
}

/// Photon energy in keV for a wavelength in Å.
pub fn wavelength_to_energy(wavelength: f64) -> f64 {
    HC_KEV_ANGSTROM / wavelength
}

/// `|k| = 2π/λ`.
pub fn wavevector_magnitude(wavelength: f64) -> f64 {
    2.0 * PI / wavelength
}

/// Computes Q and HKL from wavevectors and the sample orientation.
#[derive(Debug, Clone, Copy)]
pub struct ReciprocalSpaceCalculator {
    tolerance: Tolerance,
}

impl Default for ReciprocalSpaceCalculator {
    fn default() -> Self {
        Self::new(Tolerance::DEFAULT.determinant)
    }
}

impl ReciprocalSpaceCalculator {
    /// Calculator that treats `|det(2π·UB)| < degenerate_epsilon` as singular.
    pub fn new(degenerate_epsilon: f64) -> Self {
        Self {
            tolerance: Tolerance {
                determinant: degenerate_epsilon,
                ..Tolerance::DEFAULT
            },
        }
    }

    /// `Q = k_f − k_i`.
    pub fn scattering_vector(&self, k_i: &Vec3, k_f: &Vec3) -> Vec3 {
        k_f - k_i
    }

    /// `Q = 2π · R · UB · hkl`.
    pub fn hkl_to_q(&self, hkl: &Vec3, rotation: &Mat3, ub: &Mat3) -> Vec3 {
        rotation * (ub * (2.0 * PI)) * hkl
    }

    /// `hkl = (2π·UB)⁻¹ · R⁻¹ · Q`.
    ///
    /// Fails with [`GeometryError::DegenerateLattice`] when the scaled UB is
    /// not invertible; `rotation_index` names the scan point in the error
    /// raised for a singular `R`.
    pub fn hkl(&self, q: &Vec3, rotation: &Mat3, ub: &Mat3, rotation_index: usize) -> Result<Vec3> {
        let ub_scaled = ub * (2.0 * PI);
        let ub_inv = self.invert_ub(&ub_scaled)?;
        let r_inv = rotation
            .try_inverse()
            .ok_or(GeometryError::SingularRotation(rotation_index))?;
        Ok(ub_inv * (r_inv * q))
    }

    /// Angle between incident and scattered wavevectors (2θ), in degrees.
    pub fn scattering_angle(&self, k_i: &Vec3, k_f: &Vec3) -> Result<f64> {
        let denom = k_i.norm() * k_f.norm();
        if denom == 0.0 {
            return Err(GeometryError::ZeroLength("wavevector".to_string()));
        }
        Ok((k_i.dot(k_f) / denom).clamp(-1.0, 1.0).acos().to_degrees())
    }

    /// Lattice spacing `2π/|Q|` in Å.
    pub fn d_spacing(&self, q: &Vec3) -> Result<f64> {
        let n = q.norm();
        if n == 0.0 {
            return Err(GeometryError::ZeroLength("scattering vector".to_string()));
        }
        Ok(2.0 * PI / n)
    }

    fn invert_ub(&self, ub_scaled: &Mat3) -> Result<Mat3> {
        if self.tolerance.is_singular(ub_scaled) {
            return Err(GeometryError::DegenerateLattice {
                determinant: ub_scaled.determinant(),
            });
        }
        ub_scaled
            .try_inverse()
            .ok_or(GeometryError::DegenerateLattice {
                determinant: ub_scaled.determinant(),
            })
    }
}
