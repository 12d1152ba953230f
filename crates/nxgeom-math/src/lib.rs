#![warn(missing_docs)]

//! Math types for nxgeom.
//!
//! Thin wrappers around nalgebra providing the types the transform-chain
//! resolver and the diffraction geometry share: points, vectors, directions,
//! 3×3 matrices, 4×4 homogeneous transforms, and tolerance constants.
//!
//! Lengths are conventionally millimetres, angles radians.

use nalgebra::{Matrix3, Matrix4, Rotation3, Unit, Vector3};

/// Position in the NeXus (McStas) frame.
pub type Point3 = nalgebra::Point3<f64>;

/// Free vector: wavevectors, Q, pixel steps.
pub type Vec3 = Vector3<f64>;

/// Normalized axis or beam direction.
pub type Dir3 = Unit<Vector3<f64>>;

/// Rotation parts, orientation and UB matrices.
pub type Mat3 = Matrix3<f64>;

/// Homogeneous 4×4 matrix of one chain link or a whole chain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// Row-major access through nalgebra; column 3 holds the translation.
    pub matrix: Matrix4<f64>,
}

impl Transform {
    /// The identity.
    pub fn identity() -> Self {
        Self::from_matrix(Matrix4::identity())
    }

    /// Wrap a raw homogeneous matrix.
    pub fn from_matrix(matrix: Matrix4<f64>) -> Self {
        Self { matrix }
    }

    /// Pure shift by `(dx, dy, dz)`.
    pub fn translation(dx: f64, dy: f64, dz: f64) -> Self {
        Self::translation_vec(&Vec3::new(dx, dy, dz))
    }

    /// Pure shift by `v`.
    pub fn translation_vec(v: &Vec3) -> Self {
        Self::from_matrix(Matrix4::new_translation(v))
    }

    /// Shift of `distance` along `axis`.
    pub fn translation_along(axis: &Dir3, distance: f64) -> Self {
        Self::translation_vec(&axis.scale(distance))
    }

    /// Right-handed rotation of `angle` radians about `axis` through the origin.
    pub fn rotation_about_axis(axis: &Dir3, angle: f64) -> Self {
        Self::from_matrix(Rotation3::from_axis_angle(axis, angle).to_homogeneous())
    }

    /// Embed a 3×3 linear map with zero translation.
    pub fn from_linear(m3: &Mat3) -> Self {
        Self::from_matrix(m3.to_homogeneous())
    }

    /// `self · other`: the result applies `other` first.
    pub fn then(&self, other: &Transform) -> Self {
        Self::from_matrix(self.matrix * other.matrix)
    }

    /// Map a position (translation applies).
    pub fn apply_point(&self, p: &Point3) -> Point3 {
        self.matrix.transform_point(p)
    }

    /// Where the origin lands.
    pub fn apply_origin(&self) -> Point3 {
        Point3::from(self.translation_part())
    }

    /// Map a free vector (translation ignored).
    pub fn apply_vec(&self, v: &Vec3) -> Vec3 {
        self.matrix.transform_vector(v)
    }

    /// Upper-left 3×3 block.
    pub fn rotation_part(&self) -> Mat3 {
        self.matrix.fixed_view::<3, 3>(0, 0).into_owned()
    }

    /// Column 3, rows 0..3.
    pub fn translation_part(&self) -> Vec3 {
        self.matrix.fixed_view::<3, 1>(0, 3).into_owned()
    }

    /// Inverse, when the matrix is invertible.
    pub fn inverse(&self) -> Option<Self> {
        self.matrix.try_inverse().map(Self::from_matrix)
    }

    /// Every entry within `eps` of the other's.
    pub fn approx_eq(&self, other: &Transform, eps: f64) -> bool {
        (self.matrix - other.matrix).amax() <= eps
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl std::ops::Mul for Transform {
    type Output = Transform;

    fn mul(self, rhs: Self) -> Self::Output {
        self.then(&rhs)
    }
}

/// Numerical thresholds shared by the chain and diffraction layers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerance {
    /// Vectors shorter than this cannot be normalized.
    pub length: f64,
    /// `|det|` below this is treated as singular.
    pub determinant: f64,
}

impl Tolerance {
    /// 1e-12 for both.
    pub const DEFAULT: Self = Self {
        length: 1e-12,
        determinant: 1e-12,
    };

    /// Normalize `v`, or `None` if it is too short.
    pub fn direction(&self, v: Vec3) -> Option<Dir3> {
        Dir3::try_new(v, self.length)
    }

    /// Whether `m` cannot be inverted reliably.
    pub fn is_singular(&self, m: &Mat3) -> bool {
        m.determinant().abs() < self.determinant
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::DEFAULT
    }
}
