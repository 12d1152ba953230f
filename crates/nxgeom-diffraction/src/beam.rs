//! Incident beam.

use nxgeom_chain::{select_value, units::mm_per_unit, Chain, ChainWalker};
use nxgeom_ir::{Field, GroupRecord, NodeAccessor};
use nxgeom_math::{Dir3, Tolerance, Vec3};
use tracing::{debug, warn};

use crate::error::{GeometryError, Result};
use crate::group_at;
use crate::reciprocal::{energy_to_wavelength, wavevector_magnitude};

/// Incident beam: direction and per-point wavelength.
#[derive(Debug, Clone, PartialEq)]
pub struct Beam {
    /// Group path.
    pub path: String,
    /// Direction before the beam chain is applied (NeXus frame).
    pub direction: Dir3,
    /// Wavelength in Å, length 1 or the scan length.
    pub wavelengths: Vec<f64>,
    /// Field the wavelengths were read from.
    pub wavelength_field: &'static str,
    /// The beam's own `depends_on` chain.
    pub chain: Chain,
}

impl Beam {
    /// Beam along `direction` with a single wavelength.
    pub fn new(direction: Vec3, wavelength: f64) -> Self {
        Self {
            path: String::new(),
            direction: Dir3::new_normalize(direction),
            wavelengths: vec![wavelength],
            wavelength_field: "incident_wavelength",
            chain: Chain::empty(),
        }
    }

    /// Read a beam group.
    ///
    /// Wavelength comes from `incident_wavelength`, or else `incident_energy`.
    /// Direction comes from `incident_beam_direction`, or else `+z` carried
    /// through the group's `depends_on` chain.
    pub fn from_group<A: NodeAccessor + ?Sized>(walker: &ChainWalker<'_, A>, path: &str) -> Result<Self> {
        let group = group_at(walker.accessor(), path)?;
        let (wavelength_field, wavelengths) = read_wavelengths(path, group)?;

        let direction = match group.field("incident_beam_direction") {
            Some(field) => match field.values.as_slice() {
                [x, y, z] => Tolerance::DEFAULT.direction(Vec3::new(*x, *y, *z))
                    .ok_or_else(|| GeometryError::ZeroLength(format!("{}/incident_beam_direction", path)))?,
                _ => {
                    return Err(GeometryError::FieldShape {
                        path: path.to_string(),
                        field: "incident_beam_direction".to_string(),
                        len: field.values.len(),
                        expected: "3",
                    })
                }
            },
            None => Vec3::z_axis(),
        };

        let chain = Chain::load(walker, path)?;
        debug!(path, links = chain.len(), points = wavelengths.len(), "loaded beam");
        Ok(Self {
            path: path.to_string(),
            direction,
            wavelengths,
            wavelength_field,
            chain,
        })
    }

    /// Longest per-point array (wavelength or chain).
    pub fn scan_len_hint(&self) -> usize {
        self.wavelengths.len().max(self.chain.scan_len_hint())
    }

    /// Wavelength at `index`, in Å.
    pub fn wavelength_at(&self, index: usize, scan_len: usize) -> Result<f64> {
        let field = format!("{}/{}", self.path, self.wavelength_field);
        Ok(select_value(&field, &self.wavelengths, index, scan_len)?)
    }

    /// `2π/λ` at `index`, in Å⁻¹.
    pub fn wavevector_magnitude(&self, index: usize, scan_len: usize) -> Result<f64> {
        Ok(wavevector_magnitude(self.wavelength_at(index, scan_len)?))
    }

    /// Unit propagation direction at `index` (NeXus frame).
    pub fn direction_at(&self, index: usize, scan_len: usize) -> Result<Dir3> {
        let m = self.chain.transform_at(index, scan_len)?;
        Tolerance::DEFAULT.direction(m.apply_vec(self.direction.as_ref()))
            .ok_or_else(|| GeometryError::ZeroLength(format!("{} direction", self.path)))
    }

    /// `k_i = |k| · direction` at `index` (NeXus frame).
    pub fn incident_wavevector(&self, index: usize, scan_len: usize) -> Result<Vec3> {
        let k = self.wavevector_magnitude(index, scan_len)?;
        Ok(self.direction_at(index, scan_len)?.as_ref() * k)
    }
}

/// Wavelengths in Å and the field they came from.
fn read_wavelengths(path: &str, group: &GroupRecord) -> Result<(&'static str, Vec<f64>)> {
    const WAVELENGTH: &str = "incident_wavelength";
    const ENERGY: &str = "incident_energy";
    if let Some(field) = group.field(WAVELENGTH) {
        let scale = wavelength_scale(path, field);
        let values = non_empty(path, WAVELENGTH, field.values.iter().map(|v| v * scale).collect())?;
        return Ok((WAVELENGTH, values));
    }
    if let Some(field) = group.field(ENERGY) {
        let scale = energy_scale(path, field);
        let values = non_empty(
            path,
            ENERGY,
            field.values.iter().map(|e| energy_to_wavelength(e * scale)).collect(),
        )?;
        return Ok((ENERGY, values));
    }
    Err(GeometryError::missing_field(path, "incident_wavelength"))
}

fn non_empty(path: &str, field: &str, values: Vec<f64>) -> Result<Vec<f64>> {
    if values.is_empty() {
        return Err(GeometryError::FieldShape {
            path: path.to_string(),
            field: field.to_string(),
            len: 0,
            expected: "at least 1",
        });
    }
    Ok(values)
}

/// Multiplier from the field's units to Å (Å when unlabelled).
fn wavelength_scale(path: &str, field: &Field) -> f64 {
    let Some(units) = field.units.as_deref() else {
        return 1.0;
    };
    match mm_per_unit(units) {
        Some(mm) => mm / 1e-7,
        None => {
            warn!(path, units, "unrecognized wavelength unit, assuming angstrom");
            1.0
        }
    }
}

/// Multiplier from the field's units to keV (keV when unlabelled).
fn energy_scale(path: &str, field: &Field) -> f64 {
    match field.units.as_deref().map(str::trim) {
        None | Some("keV") | Some("kev") => 1.0,
        Some("eV") | Some("ev") => 1e-3,
        Some("MeV") => 1e3,
        Some(units) => {
            warn!(path, units, "unrecognized energy unit, assuming keV");
            1.0
        }
    }
}
