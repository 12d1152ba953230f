//! Unit normalization: angles to radians, lengths to millimetres.

use tracing::warn;

/// Millimetres per unit for every recognized length label.
pub const MM_PER_UNIT: &[(&str, f64)] = &[
    ("m", 1000.0),
    ("meter", 1000.0),
    ("meters", 1000.0),
    ("metre", 1000.0),
    ("metres", 1000.0),
    ("cm", 10.0),
    ("mm", 1.0),
    ("millimeter", 1.0),
    ("millimetre", 1.0),
    ("um", 1e-3),
    ("µm", 1e-3),
    ("micron", 1e-3),
    ("microns", 1e-3),
    ("nm", 1e-6),
    ("pm", 1e-9),
    ("angstrom", 1e-7),
    ("Angstrom", 1e-7),
    ("Å", 1e-7),
    ("A", 1e-7),
];

/// Labels accepted as radians. Everything else is read as degrees.
const RADIAN_LABELS: &[&str] = &["rad", "radian", "radians"];
const DEGREE_LABELS: &[&str] = &["deg", "degree", "degrees"];

/// Millimetres per `unit`, or `None` if the label is not in [`MM_PER_UNIT`].
pub fn mm_per_unit(unit: &str) -> Option<f64> {
    let unit = unit.trim();
    MM_PER_UNIT
        .iter()
        .find(|(label, _)| *label == unit)
        .map(|(_, scale)| *scale)
}

/// Multiplier converting `unit` lengths on `path` to millimetres.
///
/// An unrecognized label is a no-op multiplier and logs a warning.
pub fn length_scale(path: &str, unit: &str) -> f64 {
    match mm_per_unit(unit) {
        Some(scale) => scale,
        None => {
            warn!(path, unit, "unrecognized length unit, using a multiplier of 1");
            1.0
        }
    }
}

/// Multiplier converting `unit` angles on `path` to radians.
///
/// Labels other than a radian token are taken as degrees; labels that are
/// not a degree token either log a warning.
pub fn angle_scale(path: &str, unit: &str) -> f64 {
    let unit = unit.trim();
    if RADIAN_LABELS.contains(&unit) {
        1.0
    } else {
        if !DEGREE_LABELS.contains(&unit) {
            warn!(path, unit, "unrecognized angle unit, assuming degrees");
        }
        std::f64::consts::PI / 180.0
    }
}
