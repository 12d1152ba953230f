#![warn(missing_docs)]

//! Diffraction geometry on top of resolved transformation chains.
//!
//! A [`GeometryModel`] reads the beam, sample and detector modules of one
//! dataset through a [`NodeAccessor`], then answers per-scan-point queries:
//! pixel positions, wavevectors, scattering vectors `Q` and Miller indices.
//! Results are reported in a configurable [`LabFrame`].
//!
//! # Example
//!
//! ```
//! use nxgeom_diffraction::{ReciprocalSpaceCalculator, UnitCell};
//! use nxgeom_math::{Mat3, Vec3};
//!
//! let ub = UnitCell::cubic(4.0).ub_matrix(&Mat3::identity()).unwrap();
//! let calc = ReciprocalSpaceCalculator::default();
//! let q = calc.hkl_to_q(&Vec3::new(1.0, 1.0, 0.0), &Mat3::identity(), &ub);
//! let hkl = calc.hkl(&q, &Mat3::identity(), &ub, 0).unwrap();
//! assert!((hkl - Vec3::new(1.0, 1.0, 0.0)).norm() < 1e-9);
//! ```

pub mod beam;
pub mod detector;
pub mod error;
pub mod frame;
pub mod lattice;
pub mod model;
pub mod reciprocal;
pub mod sample;
pub mod settings;

pub use beam::Beam;
pub use detector::DetectorModule;
pub use error::{GeometryError, Result};
pub use frame::LabFrame;
pub use lattice::UnitCell;
pub use model::{ChainKind, GeometryModel};
pub use reciprocal::{energy_to_wavelength, wavelength_to_energy, ReciprocalSpaceCalculator};
pub use sample::Sample;
pub use settings::{GeometryConfig, GeometrySettings, InstrumentLayout, LabFramePreset, LabFrameSpec};

use nxgeom_ir::{GroupRecord, NodeAccessor};

/// The group stored at `path`.
pub(crate) fn group_at<'a, A: NodeAccessor + ?Sized>(accessor: &'a A, path: &str) -> Result<&'a GroupRecord> {
    accessor
        .node(path)
        .and_then(|node| node.as_group())
        .ok_or_else(|| GeometryError::MissingGroup(path.to_string()))
}
