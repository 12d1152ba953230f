//! Detector modules: pixel positions from offset and pixel-direction chains.

use nxgeom_chain::{Chain, ChainWalker};
use nxgeom_ir::path::normalize;
use nxgeom_ir::NodeAccessor;
use nxgeom_math::{Dir3, Point3, Tolerance, Vec3};
use tracing::debug;

use crate::error::{GeometryError, Result};
use crate::group_at;
use crate::reciprocal::wavevector_magnitude;

/// One rectangular detector module.
///
/// `fast_pixel_direction` and `slow_pixel_direction` are translations whose
/// value is the pixel pitch; they normally depend on `module_offset`, which in
/// turn depends on the detector arm.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorModule {
    /// Group path.
    pub path: String,
    /// Pixel grid size as (slow, fast).
    pub data_size: [usize; 2],
    /// Pixel index of the module origin as (slow, fast).
    pub data_origin: [f64; 2],
    /// Chain starting at `module_offset`.
    pub offset: Chain,
    /// Chain starting at `fast_pixel_direction`.
    pub fast: Chain,
    /// Chain starting at `slow_pixel_direction`.
    pub slow: Chain,
}

impl DetectorModule {
    /// Read an `NXdetector_module` group.
    pub fn from_group<A: NodeAccessor + ?Sized>(walker: &ChainWalker<'_, A>, path: &str) -> Result<Self> {
        let group = group_at(walker.accessor(), path)?;

        let data_size = match group.field("data_size").map(|f| f.values.as_slice()) {
            // a leading frame axis may be present
            Some(values @ [.., slow, fast]) if values.len() <= 3 => {
                pixel_count(*slow, *fast).ok_or_else(|| GeometryError::FieldShape {
                    path: path.to_string(),
                    field: "data_size".to_string(),
                    len: values.len(),
                    expected: "non-negative integer sizes",
                })?
            }
            Some(values) => {
                return Err(GeometryError::FieldShape {
                    path: path.to_string(),
                    field: "data_size".to_string(),
                    len: values.len(),
                    expected: "2 or 3",
                })
            }
            None => return Err(GeometryError::missing_field(path, "data_size")),
        };
        let data_origin = match group.field("data_origin").map(|f| f.values.as_slice()) {
            Some([.., slow, fast]) => [*slow, *fast],
            _ => [0.0, 0.0],
        };

        let child = |name: &str| normalize(&format!("{}/{}", path, name));
        let offset_path = child("module_offset");
        let offset = if walker.accessor().contains(&offset_path) {
            Chain::load(walker, &offset_path)?
        } else {
            Chain::empty()
        };
        let fast = load_required(walker, path, "fast_pixel_direction", &child("fast_pixel_direction"))?;
        let slow = load_required(walker, path, "slow_pixel_direction", &child("slow_pixel_direction"))?;

        debug!(path, slow = data_size[0], fast = data_size[1], "loaded detector module");
        Ok(Self {
            path: path.to_string(),
            data_size,
            data_origin,
            offset,
            fast,
            slow,
        })
    }

    /// Longest per-point array over the three chains.
    pub fn scan_len_hint(&self) -> usize {
        self.offset
            .scan_len_hint()
            .max(self.fast.scan_len_hint())
            .max(self.slow.scan_len_hint())
    }

    /// Module origin and the lab-space steps of one slow and one fast pixel.
    pub fn pixel_basis(&self, frame: usize, scan_len: usize) -> Result<(Point3, Vec3, Vec3)> {
        let origin = self.offset.transform_at(frame, scan_len)?.apply_origin();
        let fast = self.fast.transform_at(frame, scan_len)?.apply_origin() - origin;
        let slow = self.slow.transform_at(frame, scan_len)?.apply_origin() - origin;
        Ok((origin, slow, fast))
    }

    /// Position of pixel (`slow`, `fast`) at `frame`, in mm (NeXus frame).
    pub fn pixel_position(&self, frame: usize, slow: usize, fast: usize, scan_len: usize) -> Result<Point3> {
        if slow >= self.data_size[0] {
            return Err(GeometryError::out_of_range("slow pixel", slow, self.data_size[0]));
        }
        if fast >= self.data_size[1] {
            return Err(GeometryError::out_of_range("fast pixel", fast, self.data_size[1]));
        }
        let (origin, slow_dir, fast_dir) = self.pixel_basis(frame, scan_len)?;
        Ok(origin
            + slow_dir * (slow as f64 - self.data_origin[0])
            + fast_dir * (fast as f64 - self.data_origin[1]))
    }

    /// Unit vector from the origin towards pixel (`slow`, `fast`).
    pub fn pixel_direction(&self, frame: usize, slow: usize, fast: usize, scan_len: usize) -> Result<Dir3> {
        let p = self.pixel_position(frame, slow, fast, scan_len)?;
        Tolerance::DEFAULT.direction(p.coords).ok_or_else(|| {
            GeometryError::ZeroLength(format!("{} pixel ({}, {}) is at the origin", self.path, slow, fast))
        })
    }

    /// `k_f = (2π/λ) · direction` for pixel (`slow`, `fast`).
    pub fn pixel_wavevector(
        &self,
        frame: usize,
        slow: usize,
        fast: usize,
        wavelength: f64,
        scan_len: usize,
    ) -> Result<Vec3> {
        let dir = self.pixel_direction(frame, slow, fast, scan_len)?;
        Ok(dir.as_ref() * wavevector_magnitude(wavelength))
    }
}

/// Grid size as (slow, fast), if both are whole, non-negative and their
/// product fits in `usize`.
fn pixel_count(slow: f64, fast: f64) -> Option<[usize; 2]> {
    let whole = |v: f64| (v.is_finite() && v >= 0.0 && v.fract() == 0.0 && v <= u32::MAX as f64).then_some(v as usize);
    let size = [whole(slow)?, whole(fast)?];
    size[0].checked_mul(size[1])?;
    Some(size)
}

fn load_required<A: NodeAccessor + ?Sized>(
    walker: &ChainWalker<'_, A>,
    module: &str,
    name: &str,
    path: &str,
) -> Result<Chain> {
    if !walker.accessor().contains(path) {
        return Err(GeometryError::missing_field(module, name));
    }
    Ok(Chain::load(walker, path)?)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nxgeom_ir::{Field, GroupRecord, NexusTree, TransformRecord};
    use std::f64::consts::PI;

    /// A 10×20 module, 1000 mm downstream on a two-theta arm about -x,
    /// fast pixels along +x and slow pixels along -y, 0.172 mm pitch.
    pub(crate) fn insert_module(tree: &mut NexusTree, two_theta: Vec<f64>) {
        let det = "/entry/instrument/detector";
        tree.insert_transformation(
            &format!("{}/transformations/two_theta", det),
            TransformRecord::rotation([-1.0, 0.0, 0.0], "deg", two_theta, "."),
        );
        tree.insert_transformation(
            &format!("{}/transformations/distance", det),
            TransformRecord::translation([0.0, 0.0, 1.0], "m", vec![1.0], "two_theta"),
        );
        tree.insert_group(
            &format!("{}/module", det),
            GroupRecord::new("NXdetector_module")
                .with_field("data_size", Field::new(vec![10.0, 20.0]))
                .with_field("data_origin", Field::new(vec![0.0, 0.0])),
        );
        tree.insert_transformation(
            &format!("{}/module/module_offset", det),
            TransformRecord::translation([0.0, 0.0, 1.0], "mm", vec![0.0], "../transformations/distance"),
        );
        tree.insert_transformation(
            &format!("{}/module/fast_pixel_direction", det),
            TransformRecord::translation([1.0, 0.0, 0.0], "mm", vec![0.172], "module_offset"),
        );
        tree.insert_transformation(
            &format!("{}/module/slow_pixel_direction", det),
            TransformRecord::translation([0.0, -1.0, 0.0], "mm", vec![0.172], "module_offset"),
        );
    }

    fn module(two_theta: Vec<f64>) -> DetectorModule {
        let mut tree = NexusTree::new();
        insert_module(&mut tree, two_theta);
        DetectorModule::from_group(&ChainWalker::new(&tree), "/entry/instrument/detector/module").unwrap()
    }

    #[test]
    fn pixel_grid_at_zero_two_theta() {
        let m = module(vec![0.0]);
        assert_eq!(m.data_size, [10, 20]);
        assert_eq!(m.offset.len(), 3);
        assert_relative_eq!(m.pixel_position(0, 0, 0, 1).unwrap(), Point3::new(0.0, 0.0, 1000.0), epsilon = 1e-9);
        let p = m.pixel_position(0, 2, 3, 1).unwrap();
        assert_relative_eq!(p, Point3::new(3.0 * 0.172, -2.0 * 0.172, 1000.0), epsilon = 1e-9);
    }

    #[test]
    fn arm_rotation_moves_pixels() {
        let m = module(vec![0.0, 90.0]);
        assert_eq!(m.scan_len_hint(), 2);
        // +90° about -x sends +z to +y
        let p = m.pixel_position(1, 0, 0, 2).unwrap();
        assert_relative_eq!(p, Point3::new(0.0, 1000.0, 0.0), epsilon = 1e-9);
        let (_, slow, fast) = m.pixel_basis(1, 2).unwrap();
        assert_relative_eq!(fast, Vec3::new(0.172, 0.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(slow, Vec3::new(0.0, 0.0, 0.172), epsilon = 1e-12);
    }

    #[test]
    fn data_origin_shifts_indices() {
        let mut tree = NexusTree::new();
        insert_module(&mut tree, vec![0.0]);
        let path = "/entry/instrument/detector/module";
        let mut group = tree.nodes[path].as_group().unwrap().clone();
        group.fields.insert("data_origin".into(), Field::new(vec![5.0, 10.0]));
        tree.insert_group(path, group);
        let m = DetectorModule::from_group(&ChainWalker::new(&tree), path).unwrap();
        assert_relative_eq!(m.pixel_position(0, 5, 10, 1).unwrap(), Point3::new(0.0, 0.0, 1000.0), epsilon = 1e-9);
    }

    #[test]
    fn pixel_wavevector_has_beam_magnitude() {
        let m = module(vec![30.0]);
        let k = m.pixel_wavevector(0, 4, 7, 1.5, 1).unwrap();
        assert_relative_eq!(k.norm(), 2.0 * PI / 1.5, epsilon = 1e-12);
        let dir = m.pixel_direction(0, 4, 7, 1).unwrap();
        assert_relative_eq!(k, dir.as_ref() * (2.0 * PI / 1.5), epsilon = 1e-12);
    }

    #[test]
    fn out_of_range_pixels_and_frames() {
        let m = module(vec![0.0, 1.0]);
        assert!(matches!(
            m.pixel_position(0, 10, 0, 2),
            Err(GeometryError::IndexOutOfRange { what: "slow pixel", .. })
        ));
        assert!(matches!(
            m.pixel_position(0, 0, 20, 2),
            Err(GeometryError::IndexOutOfRange { what: "fast pixel", .. })
        ));
        assert!(matches!(
            m.pixel_position(2, 0, 0, 2),
            Err(GeometryError::IndexOutOfRange { what: "scan", index: 2, len: 2 })
        ));
    }

    #[test]
    fn missing_pixel_direction() {
        let mut tree = NexusTree::new();
        tree.insert_group(
            "/d/module",
            GroupRecord::new("NXdetector_module").with_field("data_size", Field::new(vec![2.0, 2.0])),
        );
        let err = DetectorModule::from_group(&ChainWalker::new(&tree), "/d/module").unwrap_err();
        assert!(matches!(err, GeometryError::MissingField { ref field, .. } if field == "fast_pixel_direction"));
    }

    fn module_with_size(size: Vec<f64>) -> Result<DetectorModule> {
        let mut tree = NexusTree::new();
        insert_module(&mut tree, vec![0.0]);
        let path = "/entry/instrument/detector/module";
        let mut group = tree.nodes[path].as_group().unwrap().clone();
        group.fields.insert("data_size".into(), Field::new(size));
        tree.insert_group(path, group);
        DetectorModule::from_group(&ChainWalker::new(&tree), path)
    }

    #[test]
    fn leading_frame_axis_in_data_size() {
        assert_eq!(module_with_size(vec![7.0, 10.0, 20.0]).unwrap().data_size, [10, 20]);
    }

    #[test]
    fn malformed_data_size_is_rejected() {
        for size in [
            vec![-3.0, 2.0],
            vec![3.0, 2.5],
            vec![f64::NAN, 2.0],
            vec![4.0, f64::INFINITY],
            vec![1e10, 1e10],
            vec![4.0],
            vec![1.0, 1.0, 4.0, 4.0],
        ] {
            let err = module_with_size(size.clone()).unwrap_err();
            assert!(
                matches!(err, GeometryError::FieldShape { ref field, .. } if field == "data_size"),
                "{:?} gave {:?}",
                size,
                err
            );
        }
    }
}
