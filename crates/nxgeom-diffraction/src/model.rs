//! The geometry model: resolved beam, sample and detector chains for one
//! dataset, queried per scan point and pixel.

use nxgeom_chain::ChainWalker;
use nxgeom_ir::NodeAccessor;
use nxgeom_math::{Mat3, Point3, Transform, Vec3};
use rayon::prelude::*;
use tracing::debug;

use crate::beam::Beam;
use crate::detector::DetectorModule;
use crate::error::{GeometryError, Result};
use crate::frame::LabFrame;
use crate::reciprocal::ReciprocalSpaceCalculator;
use crate::sample::Sample;
use crate::settings::{GeometrySettings, InstrumentLayout};

/// Which resolved chain to expose for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainKind {
    /// The beam group's chain.
    Beam,
    /// The sample goniometer chain.
    Sample,
    /// A module's `module_offset` chain.
    ModuleOffset(usize),
    /// A module's `fast_pixel_direction` chain.
    FastPixel(usize),
    /// A module's `slow_pixel_direction` chain.
    SlowPixel(usize),
}

/// Read-only geometry of one scan.
///
/// All queries are pure; the model can be shared across threads.
#[derive(Debug, Clone)]
pub struct GeometryModel {
    beam: Beam,
    sample: Sample,
    modules: Vec<DetectorModule>,
    lab: LabFrame,
    scan_len: usize,
    calculator: ReciprocalSpaceCalculator,
}

impl GeometryModel {
    /// Assemble a model from already-read components.
    pub fn new(
        beam: Beam,
        sample: Sample,
        modules: Vec<DetectorModule>,
        settings: &GeometrySettings,
    ) -> Result<Self> {
        settings.validate()?;
        let scan_len = settings.scan_length.unwrap_or_else(|| {
            modules
                .iter()
                .map(DetectorModule::scan_len_hint)
                .chain([beam.scan_len_hint(), sample.chain.scan_len_hint()])
                .max()
                .unwrap_or(1)
        });
        Ok(Self {
            beam,
            sample,
            modules,
            lab: settings.lab_frame.to_frame()?,
            scan_len,
            calculator: ReciprocalSpaceCalculator::new(settings.degenerate_epsilon),
        })
    }

    /// Read every component named in `layout` through `accessor`.
    pub fn from_accessor<A: NodeAccessor + ?Sized>(
        accessor: &A,
        layout: &InstrumentLayout,
        settings: &GeometrySettings,
    ) -> Result<Self> {
        let walker = ChainWalker::new(accessor).with_max_hops(settings.max_chain_length);
        let beam = Beam::from_group(&walker, &layout.beam)?;
        let sample = Sample::from_group(&walker, &layout.sample)?;
        let modules = layout
            .detector_modules
            .iter()
            .map(|path| DetectorModule::from_group(&walker, path))
            .collect::<Result<Vec<_>>>()?;
        let model = Self::new(beam, sample, modules, settings)?;
        debug!(
            scan_len = model.scan_len,
            modules = model.modules.len(),
            "built geometry model"
        );
        Ok(model)
    }

    /// Number of scan points.
    pub fn scan_len(&self) -> usize {
        self.scan_len
    }

    /// Frame results are reported in.
    pub fn lab_frame(&self) -> &LabFrame {
        &self.lab
    }

    /// The beam.
    pub fn beam(&self) -> &Beam {
        &self.beam
    }

    /// The sample.
    pub fn sample(&self) -> &Sample {
        &self.sample
    }

    /// All detector modules.
    pub fn modules(&self) -> &[DetectorModule] {
        &self.modules
    }

    /// Detector module by index.
    pub fn module(&self, index: usize) -> Result<&DetectorModule> {
        self.modules
            .get(index)
            .ok_or_else(|| GeometryError::out_of_range("module", index, self.modules.len()))
    }

    fn check_frame(&self, frame: usize) -> Result<()> {
        if frame >= self.scan_len {
            return Err(GeometryError::out_of_range("scan", frame, self.scan_len));
        }
        Ok(())
    }

    /// Combined 4×4 transform of one chain at `frame`, in the NeXus frame.
    pub fn combined_transform(&self, chain: ChainKind, frame: usize) -> Result<Transform> {
        self.check_frame(frame)?;
        let chain = match chain {
            ChainKind::Beam => &self.beam.chain,
            ChainKind::Sample => &self.sample.chain,
            ChainKind::ModuleOffset(i) => &self.module(i)?.offset,
            ChainKind::FastPixel(i) => &self.module(i)?.fast,
            ChainKind::SlowPixel(i) => &self.module(i)?.slow,
        };
        Ok(chain.transform_at(frame, self.scan_len)?)
    }

    /// Incident wavelength at `frame`, in Å.
    pub fn wavelength(&self, frame: usize) -> Result<f64> {
        self.check_frame(frame)?;
        self.beam.wavelength_at(frame, self.scan_len)
    }

    /// `k_i` at `frame` (lab frame, Å⁻¹).
    pub fn incident_wavevector(&self, frame: usize) -> Result<Vec3> {
        self.check_frame(frame)?;
        Ok(self.lab.apply_vec(&self.beam.incident_wavevector(frame, self.scan_len)?))
    }

    /// Position of a pixel at `frame` (lab frame, mm).
    pub fn pixel_position(&self, module: usize, frame: usize, slow: usize, fast: usize) -> Result<Point3> {
        self.check_frame(frame)?;
        let p = self.module(module)?.pixel_position(frame, slow, fast, self.scan_len)?;
        Ok(self.lab.apply_point(&p))
    }

    /// Unit vector towards a pixel (lab frame).
    pub fn pixel_direction(&self, module: usize, frame: usize, slow: usize, fast: usize) -> Result<Vec3> {
        self.check_frame(frame)?;
        let d = self.module(module)?.pixel_direction(frame, slow, fast, self.scan_len)?;
        Ok(self.lab.apply_vec(d.as_ref()))
    }

    /// `k_f` for a pixel at `frame` (lab frame, Å⁻¹).
    pub fn pixel_wavevector(&self, module: usize, frame: usize, slow: usize, fast: usize) -> Result<Vec3> {
        let wavelength = self.wavelength(frame)?;
        let k = self
            .module(module)?
            .pixel_wavevector(frame, slow, fast, wavelength, self.scan_len)?;
        Ok(self.lab.apply_vec(&k))
    }

    /// `Q = k_f − k_i` for a pixel at `frame` (lab frame, Å⁻¹).
    pub fn pixel_q(&self, module: usize, frame: usize, slow: usize, fast: usize) -> Result<Vec3> {
        let k_f = self.pixel_wavevector(module, frame, slow, fast)?;
        let k_i = self.incident_wavevector(frame)?;
        Ok(self.calculator.scattering_vector(&k_i, &k_f))
    }

    /// Scattering angle 2θ for a pixel, in degrees.
    pub fn scattering_angle(&self, module: usize, frame: usize, slow: usize, fast: usize) -> Result<f64> {
        let k_f = self.pixel_wavevector(module, frame, slow, fast)?;
        let k_i = self.incident_wavevector(frame)?;
        self.calculator.scattering_angle(&k_i, &k_f)
    }

    /// Lattice spacing `2π/|Q|` seen by a pixel, in Å.
    pub fn d_spacing(&self, module: usize, frame: usize, slow: usize, fast: usize) -> Result<f64> {
        self.calculator.d_spacing(&self.pixel_q(module, frame, slow, fast)?)
    }

    /// Sample rotation `R` at `frame`, expressed in the lab frame.
    pub fn sample_rotation(&self, frame: usize) -> Result<Mat3> {
        self.check_frame(frame)?;
        Ok(self.lab.apply_rotation(&self.sample.rotation_at(frame, self.scan_len)?))
    }

    /// `Q` of a reflection at `frame` (lab frame).
    pub fn hkl_to_q(&self, frame: usize, hkl: &Vec3) -> Result<Vec3> {
        let r = self.sample_rotation(frame)?;
        Ok(self.calculator.hkl_to_q(hkl, &r, &self.sample.ub()?))
    }

    /// Miller indices of a lab-frame `q` at `frame`.
    pub fn q_to_hkl(&self, frame: usize, q: &Vec3) -> Result<Vec3> {
        let r = self.sample_rotation(frame)?;
        self.calculator.hkl(q, &r, &self.sample.ub()?, frame)
    }

    /// Miller indices seen by a pixel at `frame`.
    pub fn pixel_hkl(&self, module: usize, frame: usize, slow: usize, fast: usize) -> Result<Vec3> {
        let q = self.pixel_q(module, frame, slow, fast)?;
        self.q_to_hkl(frame, &q)
    }

    /// Position of one pixel at every scan point.
    ///
    /// Each point succeeds or fails on its own.
    pub fn scan_pixel_positions(&self, module: usize, slow: usize, fast: usize) -> Vec<Result<Point3>> {
        (0..self.scan_len)
            .into_par_iter()
            .map(|frame| self.pixel_position(module, frame, slow, fast))
            .collect()
    }

    /// `k_f` of one pixel at every scan point.
    pub fn scan_pixel_wavevectors(&self, module: usize, slow: usize, fast: usize) -> Vec<Result<Vec3>> {
        (0..self.scan_len)
            .into_par_iter()
            .map(|frame| self.pixel_wavevector(module, frame, slow, fast))
            .collect()
    }

    /// Q of one pixel at every scan point.
    pub fn scan_q(&self, module: usize, slow: usize, fast: usize) -> Vec<Result<Vec3>> {
        (0..self.scan_len)
            .into_par_iter()
            .map(|frame| self.pixel_q(module, frame, slow, fast))
            .collect()
    }

    /// HKL of one pixel at every scan point.
    pub fn scan_hkl(&self, module: usize, slow: usize, fast: usize) -> Vec<Result<Vec3>> {
        (0..self.scan_len)
            .into_par_iter()
            .map(|frame| self.pixel_hkl(module, frame, slow, fast))
            .collect()
    }

    /// Q of every pixel of a module at `frame`, slow-major.
    pub fn module_q_map(&self, module: usize, frame: usize) -> Result<Vec<Result<Vec3>>> {
        let detector = self.module(module)?;
        let [n_slow, n_fast] = detector.data_size;
        self.check_frame(frame)?;
        let pixels = n_slow.checked_mul(n_fast).ok_or_else(|| GeometryError::FieldShape {
            path: detector.path.clone(),
            field: "data_size".to_string(),
            len: 2,
            expected: "a pixel count that fits in memory",
        })?;
        Ok((0..pixels)
            .into_par_iter()
            .map(|i| self.pixel_q(module, frame, i / n_fast, i % n_fast))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::tests::insert_module;
    use crate::settings::{LabFramePreset, LabFrameSpec};
    use approx::assert_relative_eq;
    use nxgeom_ir::{Field, GroupRecord, NexusTree, TransformRecord};
    use std::f64::consts::PI;

    fn instrument() -> NexusTree {
        let mut tree = NexusTree::new();
        tree.insert_group(
            "/entry/instrument/beam",
            GroupRecord::new("NXbeam").with_field("incident_wavelength", Field::with_units(vec![1.0], "angstrom")),
        );
        tree.insert_group(
            "/entry/sample",
            GroupRecord::new("NXsample")
                .with_depends_on("transformations/phi")
                .with_field("unit_cell", Field::new(vec![4.0, 4.0, 4.0, 90.0, 90.0, 90.0])),
        );
        tree.insert_transformation(
            "/entry/sample/transformations/phi",
            TransformRecord::rotation([0.0, 1.0, 0.0], "deg", vec![0.0, 10.0, 20.0], "."),
        );
        insert_module(&mut tree, vec![0.0, 30.0, 60.0]);
        tree
    }

    fn model(settings: &GeometrySettings) -> GeometryModel {
        GeometryModel::from_accessor(&instrument(), &InstrumentLayout::default(), settings).unwrap()
    }

    #[test]
    fn scan_length_is_inferred() {
        let m = model(&GeometrySettings::default());
        assert_eq!(m.scan_len(), 3);
        assert_eq!(m.modules().len(), 1);
    }

    #[test]
    fn bragg_geometry_on_the_arm() {
        let m = model(&GeometrySettings::default());
        let k = 2.0 * PI;
        assert_relative_eq!(m.incident_wavevector(1).unwrap(), Vec3::new(0.0, 0.0, k), epsilon = 1e-12);
        assert_relative_eq!(m.scattering_angle(0, 1, 0, 0).unwrap(), 30.0, epsilon = 1e-9);

        let q = m.pixel_q(0, 2, 0, 0).unwrap();
        let two_theta = 60f64.to_radians();
        assert_relative_eq!(q, Vec3::new(0.0, k * two_theta.sin(), k * (two_theta.cos() - 1.0)), epsilon = 1e-9);
        // λ = 2d·sinθ
        assert_relative_eq!(m.d_spacing(0, 2, 0, 0).unwrap(), 1.0 / (2.0 * 30f64.to_radians().sin()), epsilon = 1e-9);
    }

    #[test]
    fn zero_two_theta_has_no_d_spacing() {
        let m = model(&GeometrySettings::default());
        assert_relative_eq!(m.pixel_q(0, 0, 0, 0).unwrap(), Vec3::zeros(), epsilon = 1e-12);
        assert!(matches!(m.d_spacing(0, 0, 0, 0), Err(GeometryError::ZeroLength(_))));
    }

    #[test]
    fn pixel_hkl_maps_back_to_q() {
        for lab_frame in [
            LabFrameSpec::Preset(LabFramePreset::Identity),
            LabFrameSpec::Preset(LabFramePreset::You),
        ] {
            let m = model(&GeometrySettings {
                lab_frame,
                ..GeometrySettings::default()
            });
            for frame in 0..3 {
                let q = m.pixel_q(0, frame, 3, 7).unwrap();
                let hkl = m.pixel_hkl(0, frame, 3, 7).unwrap();
                assert_relative_eq!(m.hkl_to_q(frame, &hkl).unwrap(), q, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn lab_frame_changes_vectors_not_hkl() {
        let nexus = model(&GeometrySettings::default());
        let you = model(&GeometrySettings {
            lab_frame: LabFrameSpec::Preset(LabFramePreset::You),
            ..GeometrySettings::default()
        });
        let p = nexus.pixel_position(0, 1, 2, 5).unwrap();
        assert_relative_eq!(you.pixel_position(0, 1, 2, 5).unwrap(), Point3::new(-p.x, p.z, p.y), epsilon = 1e-9);
        assert_relative_eq!(
            you.pixel_hkl(0, 1, 2, 5).unwrap(),
            nexus.pixel_hkl(0, 1, 2, 5).unwrap(),
            epsilon = 1e-9
        );
    }

    #[test]
    fn combined_transforms_by_kind() {
        let m = model(&GeometrySettings::default());
        assert!(m.combined_transform(ChainKind::Beam, 0).unwrap().approx_eq(&Transform::identity(), 1e-12));
        let origin = m.combined_transform(ChainKind::ModuleOffset(0), 2).unwrap().apply_origin();
        let two_theta = 60f64.to_radians();
        assert_relative_eq!(
            origin,
            Point3::new(0.0, 1000.0 * two_theta.sin(), 1000.0 * two_theta.cos()),
            epsilon = 1e-9
        );
        assert!(matches!(
            m.combined_transform(ChainKind::FastPixel(1), 0),
            Err(GeometryError::IndexOutOfRange { what: "module", .. })
        ));
        assert!(matches!(
            m.combined_transform(ChainKind::Sample, 3),
            Err(GeometryError::IndexOutOfRange { what: "scan", .. })
        ));
    }

    #[test]
    fn batches_cover_the_scan() {
        let m = model(&GeometrySettings::default());
        let positions = m.scan_pixel_positions(0, 0, 0);
        assert_eq!(positions.len(), 3);
        for (frame, p) in positions.into_iter().enumerate() {
            assert_relative_eq!(p.unwrap(), m.pixel_position(0, frame, 0, 0).unwrap());
        }
        let hkl = m.scan_hkl(0, 4, 4);
        assert!(hkl.iter().all(Result::is_ok));
        assert_eq!(m.scan_q(0, 4, 4).len(), 3);
        assert_eq!(m.scan_pixel_wavevectors(0, 4, 4).len(), 3);

        let map = m.module_q_map(0, 1).unwrap();
        assert_eq!(map.len(), 200);
        assert_relative_eq!(*map[20 * 3 + 7].as_ref().unwrap(), m.pixel_q(0, 1, 3, 7).unwrap());
    }

    #[test]
    fn batch_items_fail_independently() {
        // the detector arm has three points, so points past the third cannot be resolved
        let m = model(&GeometrySettings {
            scan_length: Some(5),
            ..GeometrySettings::default()
        });
        let results = m.scan_q(0, 0, 0);
        assert_eq!(results.len(), 5);
        assert!(results.iter().all(|r| matches!(r, Err(GeometryError::Chain(_)))));

        let m = model(&GeometrySettings {
            scan_length: Some(1),
            ..GeometrySettings::default()
        });
        let results = m.scan_pixel_positions(0, 0, 0);
        assert_eq!(results.len(), 1);
        assert!(results[0].is_err());
        assert!(m.scan_pixel_positions(0, 10, 0).iter().all(Result::is_err));
    }

    #[test]
    fn missing_module_group() {
        let layout = InstrumentLayout {
            detector_modules: vec!["/entry/instrument/nope".into()],
            ..InstrumentLayout::default()
        };
        let err = GeometryModel::from_accessor(&instrument(), &layout, &GeometrySettings::default()).unwrap_err();
        assert!(matches!(err, GeometryError::MissingGroup(_)));
    }

    #[test]
    fn oversized_module_map_is_an_error() {
        let mut m = model(&GeometrySettings::default());
        m.modules[0].data_size = [usize::MAX, 2];
        assert!(matches!(
            m.module_q_map(0, 0),
            Err(GeometryError::FieldShape { ref field, .. }) if field == "data_size"
        ));
    }
}
