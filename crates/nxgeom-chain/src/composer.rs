//! Chain composition.
//!
//! Paths come out of the walker leaf first. The composed matrix is
//! `M_root · … · M_leaf`: the link nearest the terminal sentinel is the
//! leftmost factor, so a point is carried through the leaf's frame first
//! and the root's frame last.

use nxgeom_ir::NodeAccessor;
use nxgeom_math::Transform;

use crate::error::{ChainError, Result};
use crate::operation::{OperationResolver, TransformOperation};
use crate::walker::ChainWalker;

/// Multiply leaf-first matrices into one transform.
///
/// An empty chain is the identity; a single link is returned as is.
pub fn compose_matrices<I>(leaf_first: I) -> Transform
where
    I: IntoIterator<Item = Transform>,
    I::IntoIter: DoubleEndedIterator,
{
    leaf_first
        .into_iter()
        .rev()
        .reduce(|acc, m| acc.then(&m))
        .unwrap_or_default()
}

/// Composes chains read through a [`NodeAccessor`].
#[derive(Debug)]
pub struct ChainComposer<'a, A: NodeAccessor + ?Sized> {
    accessor: &'a A,
    resolver: OperationResolver,
}

impl<A: NodeAccessor + ?Sized> Clone for ChainComposer<'_, A> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<A: NodeAccessor + ?Sized> Copy for ChainComposer<'_, A> {}

impl<'a, A: NodeAccessor + ?Sized> ChainComposer<'a, A> {
    /// Composer for a scan of `scan_len` points.
    pub fn new(accessor: &'a A, scan_len: usize) -> Self {
        Self {
            accessor,
            resolver: OperationResolver::new(scan_len),
        }
    }

    /// Combined transform of `ordered_paths` (leaf first) at `scan_index`.
    pub fn compose(&self, ordered_paths: &[String], scan_index: usize) -> Result<Transform> {
        let matrices = ordered_paths
            .iter()
            .map(|path| {
                let record = self
                    .accessor
                    .node(path)
                    .ok_or_else(|| ChainError::BrokenChain {
                        path: path.clone(),
                        from: path.clone(),
                    })?
                    .as_transformation()
                    .ok_or_else(|| ChainError::NotATransformation(path.clone()))?;
                self.resolver.resolve(path, record, scan_index)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(compose_matrices(matrices))
    }
}

/// A walked chain with its links converted to owned operations.
///
/// Holds no reference to the accessor, so it can be evaluated for any scan
/// index long after the dataset has been released.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Chain {
    /// Transformation paths, leaf first.
    pub paths: Vec<String>,
    /// One operation per path.
    pub operations: Vec<TransformOperation>,
}

impl Chain {
    /// A chain with no links (identity).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Walk from `start` and convert every link.
    pub fn load<A: NodeAccessor + ?Sized>(walker: &ChainWalker<'_, A>, start: &str) -> Result<Self> {
        let paths = walker.walk(start)?;
        let operations = paths
            .iter()
            .map(|path| {
                walker
                    .accessor()
                    .node(path)
                    .and_then(|n| n.as_transformation())
                    .map(|record| TransformOperation::from_record(path, record))
                    .ok_or_else(|| ChainError::NotATransformation(path.clone()))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { paths, operations })
    }

    /// Number of links.
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Whether the chain has no links.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Longest per-point value array among the links (at least 1).
    pub fn scan_len_hint(&self) -> usize {
        self.operations
            .iter()
            .map(TransformOperation::value_count)
            .max()
            .unwrap_or(1)
            .max(1)
    }

    /// Per-link matrices at `index`, leaf first.
    pub fn matrices_at(&self, index: usize, scan_len: usize) -> Result<Vec<Transform>> {
        self.paths
            .iter()
            .zip(&self.operations)
            .map(|(path, op)| op.matrix_at(path, index, scan_len))
            .collect()
    }

    /// Combined transform at `index`.
    pub fn transform_at(&self, index: usize, scan_len: usize) -> Result<Transform> {
        if self.is_empty() && index >= scan_len {
            return Err(ChainError::IndexOutOfRange {
                index,
                len: scan_len,
            });
        }
        Ok(compose_matrices(self.matrices_at(index, scan_len)?))
    }
}
