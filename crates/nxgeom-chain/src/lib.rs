#![warn(missing_docs)]

//! Transformation-chain resolution for nxgeom.
//!
//! Turns a chain of stored rotations and translations, linked through
//! `depends_on` references, into 4×4 homogeneous transforms:
//!
//! - [`ChainWalker`] follows references from a start node to the terminal
//!   sentinel, with a hop bound that turns cycles into an error.
//! - [`OperationResolver`] converts one record at one scan index into a
//!   matrix, normalizing angles to radians and lengths to millimetres.
//! - [`ChainComposer`] multiplies the per-link matrices, root leftmost.
//! - [`Chain`] is an owned, accessor-free copy of a walked chain.
//!
//! # Example
//!
//! ```
//! use nxgeom_chain::{ChainComposer, ChainWalker};
//! use nxgeom_ir::{NexusTree, TransformRecord};
//! use nxgeom_math::Point3;
//!
//! let mut tree = NexusTree::new();
//! tree.insert_transformation(
//!     "/entry/sample/phi",
//!     TransformRecord::rotation([0.0, 0.0, 1.0], "deg", vec![90.0], "."),
//! );
//!
//! let paths = ChainWalker::new(&tree).walk("/entry/sample/phi").unwrap();
//! let m = ChainComposer::new(&tree, 1).compose(&paths, 0).unwrap();
//! let p = m.apply_point(&Point3::new(1.0, 0.0, 0.0));
//! assert!((p - Point3::new(0.0, 1.0, 0.0)).norm() < 1e-9);
//! ```

pub mod composer;
pub mod error;
pub mod operation;
pub mod units;
pub mod walker;

pub use composer::{compose_matrices, Chain, ChainComposer};
pub use error::{ChainError, Result};
pub use operation::{select_value, OperationResolver, TransformOperation};
pub use walker::{ChainWalker, DEFAULT_MAX_HOPS};
