//! Parent-pointer traversal.

use nxgeom_ir::path::{normalize, parent, resolve_reference};
use nxgeom_ir::{Node, NodeAccessor, TERMINAL};
use tracing::debug;

use crate::error::{ChainError, Result};

/// Default bound on the number of followed `depends_on` references.
pub const DEFAULT_MAX_HOPS: usize = 64;

/// Follows `depends_on` references from a start node to the terminal sentinel.
#[derive(Debug)]
pub struct ChainWalker<'a, A: NodeAccessor + ?Sized> {
    accessor: &'a A,
    max_hops: usize,
}

impl<A: NodeAccessor + ?Sized> Clone for ChainWalker<'_, A> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<A: NodeAccessor + ?Sized> Copy for ChainWalker<'_, A> {}

impl<'a, A: NodeAccessor + ?Sized> ChainWalker<'a, A> {
    /// Walker with the default hop bound.
    pub fn new(accessor: &'a A) -> Self {
        Self {
            accessor,
            max_hops: DEFAULT_MAX_HOPS,
        }
    }

    /// Override the hop bound.
    pub fn with_max_hops(mut self, max_hops: usize) -> Self {
        self.max_hops = max_hops;
        self
    }

    /// The accessor being walked.
    pub fn accessor(&self) -> &'a A {
        self.accessor
    }

    /// The hop bound in force.
    pub fn max_hops(&self) -> usize {
        self.max_hops
    }

    /// Ordered transformation paths from `start` towards the root.
    ///
    /// A transformation start is the first entry. A group start contributes
    /// only its `depends_on` target; groups met mid-chain are passed through.
    pub fn walk(&self, start: &str) -> Result<Vec<String>> {
        let start = normalize(start);
        let mut current = start.clone();
        let mut node = self
            .accessor
            .node(&current)
            .ok_or_else(|| ChainError::BrokenChain {
                path: current.clone(),
                from: start.clone(),
            })?;
        let mut paths = Vec::new();
        let mut hops = 0usize;

        loop {
            // References are relative to the group holding the field.
            let container = match node {
                Node::Transformation(_) => {
                    paths.push(current.clone());
                    parent(&current)
                }
                Node::Group(_) => current.clone(),
            };

            let reference = node.depends_on().unwrap_or(TERMINAL);
            let Some(next) = resolve_reference(&container, reference) else {
                break;
            };

            hops += 1;
            if hops > self.max_hops {
                return Err(ChainError::ChainTooLong {
                    start,
                    limit: self.max_hops,
                });
            }

            node = self
                .accessor
                .node(&next)
                .ok_or_else(|| ChainError::BrokenChain {
                    path: next.clone(),
                    from: current.clone(),
                })?;
            current = next;
        }

        debug!(start = %start, links = paths.len(), "walked transformation chain");
        Ok(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nxgeom_ir::{GroupRecord, NexusTree, TransformRecord};

    fn rot(depends_on: &str) -> TransformRecord {
        TransformRecord::rotation([0.0, 0.0, 1.0], "deg", vec![0.0], depends_on)
    }

    #[test]
    fn walks_group_start_child_to_root() {
        let mut tree = NexusTree::new();
        tree.insert_group("/entry/sample", GroupRecord::new("NXsample").with_depends_on("t/phi"));
        tree.insert_transformation("/entry/sample/t/phi", rot("chi"));
        tree.insert_transformation("/entry/sample/t/chi", rot("/entry/sample/t/eta"));
        tree.insert_transformation("/entry/sample/t/eta", rot("."));

        let paths = ChainWalker::new(&tree).walk("/entry/sample").unwrap();
        assert_eq!(
            paths,
            vec!["/entry/sample/t/phi", "/entry/sample/t/chi", "/entry/sample/t/eta"]
        );
    }

    #[test]
    fn transformation_start_is_included() {
        let mut tree = NexusTree::new();
        tree.insert_transformation("/a/x", rot("."));
        assert_eq!(ChainWalker::new(&tree).walk("/a/x").unwrap(), vec!["/a/x"]);
    }

    #[test]
    fn group_without_reference_is_empty_chain() {
        let mut tree = NexusTree::new();
        tree.insert_group("/entry/beam", GroupRecord::new("NXbeam"));
        assert!(ChainWalker::new(&tree).walk("/entry/beam").unwrap().is_empty());
    }

    #[test]
    fn groups_mid_chain_are_passed_through() {
        let mut tree = NexusTree::new();
        tree.insert_transformation("/d/module/offset", rot("/d/stage"));
        tree.insert_group("/d/stage", GroupRecord::new("NXpositioner").with_depends_on("z"));
        tree.insert_transformation("/d/stage/z", rot("."));
        let paths = ChainWalker::new(&tree).walk("/d/module/offset").unwrap();
        assert_eq!(paths, vec!["/d/module/offset", "/d/stage/z"]);
    }

    #[test]
    fn broken_chain_names_missing_path() {
        let mut tree = NexusTree::new();
        tree.insert_transformation("/t/a", rot("missing"));
        let err = ChainWalker::new(&tree).walk("/t/a").unwrap_err();
        assert_eq!(
            err,
            ChainError::BrokenChain {
                path: "/t/missing".to_string(),
                from: "/t/a".to_string(),
            }
        );
        assert!(err.to_string().contains("/t/missing"));
    }

    #[test]
    fn missing_start_is_broken_chain() {
        let tree = NexusTree::new();
        let err = ChainWalker::new(&tree).walk("/nowhere").unwrap_err();
        assert!(matches!(err, ChainError::BrokenChain { ref path, .. } if path == "/nowhere"));
    }

    #[test]
    fn cycle_hits_bound() {
        let mut tree = NexusTree::new();
        tree.insert_transformation("/t/a", rot("b"));
        tree.insert_transformation("/t/b", rot("a"));
        let err = ChainWalker::new(&tree).with_max_hops(8).walk("/t/a").unwrap_err();
        assert_eq!(
            err,
            ChainError::ChainTooLong {
                start: "/t/a".to_string(),
                limit: 8,
            }
        );
    }

    #[test]
    fn chain_at_bound_is_accepted() {
        let mut tree = NexusTree::new();
        for i in 0..5 {
            let next = if i == 4 { ".".to_string() } else { format!("n{}", i + 1) };
            tree.insert_transformation(&format!("/t/n{}", i), rot(&next));
        }
        // four hops
        assert_eq!(ChainWalker::new(&tree).with_max_hops(4).walk("/t/n0").unwrap().len(), 5);
        assert!(ChainWalker::new(&tree).with_max_hops(3).walk("/t/n0").is_err());
    }

    fn linear_tree(links: usize) -> NexusTree {
        let mut tree = NexusTree::new();
        for i in 0..links {
            let next = if i + 1 == links { ".".to_string() } else { format!("n{}", i + 1) };
            tree.insert_transformation(&format!("/t/n{}", i), rot(&next));
        }
        tree
    }

    #[test]
    fn default_bound_is_64_hops() {
        let walker_tree = linear_tree(DEFAULT_MAX_HOPS + 1);
        let walker = ChainWalker::new(&walker_tree);
        assert_eq!(walker.max_hops(), 64);
        assert_eq!(walker.walk("/t/n0").unwrap().len(), 65);

        let too_long = linear_tree(DEFAULT_MAX_HOPS + 2);
        assert_eq!(
            ChainWalker::new(&too_long).walk("/t/n0").unwrap_err(),
            ChainError::ChainTooLong {
                start: "/t/n0".to_string(),
                limit: 64,
            }
        );
    }

    #[test]
    fn cycle_hits_default_bound() {
        let mut tree = NexusTree::new();
        tree.insert_transformation("/t/a", rot("b"));
        tree.insert_transformation("/t/b", rot("a"));
        assert!(matches!(
            ChainWalker::new(&tree).walk("/t/a"),
            Err(ChainError::ChainTooLong { limit: 64, .. })
        ));
    }
}
