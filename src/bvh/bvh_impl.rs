//! This module defines the [`Bvh`] arena, its accessors and its consistency checks.
//!
//! [`Bvh`]: struct.Bvh.html
//!

use crate::bvh::BvhNode;
use crate::error::BvhError;

/// The [`Bvh`] data structure. Contains the list of [`BvhNode`]s.
///
/// Node `0` is the root. A tree over `n > 0` elements has `2n - 1` nodes, a tree over
/// no elements has no nodes. The topology is immutable after construction.
///
/// [`Bvh`]: struct.Bvh.html
/// [`BvhNode`]: enum.BvhNode.html
///
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Bvh {
    /// The list of nodes of the [`Bvh`].
    ///
    /// [`Bvh`]: struct.Bvh.html
    ///
    pub nodes: Vec<BvhNode>,
}

impl Bvh {
    /// Returns the number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the number of elements (leaves).
    pub fn element_count(&self) -> usize {
        (self.nodes.len() + 1) / 2
    }

    /// Returns true if the tree holds no element.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the node indices in pre-order: every branch before its children, left
    /// subtree before right subtree. Iterating the result backwards visits children
    /// before their parents.
    pub fn preorder(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.nodes.len());
        if self.nodes.is_empty() {
            return order;
        }
        let mut stack = vec![0];
        while let Some(node_index) = stack.pop() {
            order.push(node_index);
            if let Some((child_l, child_r)) = self.nodes[node_index].children() {
                stack.push(child_r);
                stack.push(child_l);
            }
        }
        order
    }

    /// Returns the depth of the deepest leaf. A single leaf has depth `0`.
    pub fn depth(&self) -> usize {
        if self.nodes.is_empty() {
            return 0;
        }
        let mut deepest = 0;
        let mut stack = vec![(0, 0)];
        while let Some((node_index, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            if let Some((child_l, child_r)) = self.nodes[node_index].children() {
                stack.push((child_r, depth + 1));
                stack.push((child_l, depth + 1));
            }
        }
        deepest
    }

    /// Prints the [`Bvh`] in a tree-like visualization.
    ///
    /// [`Bvh`]: struct.Bvh.html
    ///
    pub fn pretty_print(&self) {
        if self.nodes.is_empty() {
            println!("empty bvh");
            return;
        }
        let mut stack = vec![(0, 0)];
        while let Some((node_index, depth)) = stack.pop() {
            let padding = " ".repeat(depth);
            match self.nodes[node_index] {
                BvhNode::Branch {
                    parent_index,
                    child_l_index,
                    child_r_index,
                } => {
                    println!("{padding}node={node_index} parent={parent_index:?}");
                    stack.push((child_r_index, depth + 1));
                    stack.push((child_l_index, depth + 1));
                }
                BvhNode::Leaf {
                    parent_index,
                    element_index,
                } => {
                    println!("{padding}node={node_index} parent={parent_index:?}");
                    println!("{padding}element\t{element_index}");
                }
            }
        }
    }

    /// Verifies the topology of a tree over `element_count` elements.
    ///
    /// Checks that the tree has `2n - 1` nodes, that the root is node `0` and has no
    /// parent, that the children of every branch point back to it, that every node is
    /// reached exactly once from the root and that every element sits in exactly one
    /// leaf. Returns the first violation found.
    ///
    /// # Examples
    /// ```
    /// use mortonbvh::bvh::Bvh;
    /// use mortonbvh::error::BvhError;
    /// use nalgebra::Point3;
    ///
    /// let points = vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 2.0, 3.0)];
    /// let bvh = Bvh::build_morton(&points);
    ///
    /// assert_eq!(bvh.check(2), Ok(()));
    /// assert_eq!(bvh.check(3), Err(BvhError::NodeCountMismatch { nodes: 3, elements: 3 }));
    /// ```
    pub fn check(&self, element_count: usize) -> Result<(), BvhError> {
        let expected_nodes = if element_count == 0 {
            0
        } else {
            2 * element_count - 1
        };
        if self.nodes.len() != expected_nodes {
            return Err(BvhError::NodeCountMismatch {
                nodes: self.nodes.len(),
                elements: element_count,
            });
        }
        if element_count == 0 {
            return Ok(());
        }
        if let Some(parent) = self.nodes[0].parent() {
            return Err(BvhError::ParentMismatch {
                node: 0,
                expected: None,
                found: Some(parent),
            });
        }

        let mut visited = vec![false; self.nodes.len()];
        let mut stored = vec![false; element_count];
        let mut stack = vec![0];
        while let Some(node_index) = stack.pop() {
            if visited[node_index] {
                return Err(BvhError::DetachedNode { node: node_index });
            }
            visited[node_index] = true;
            match self.nodes[node_index] {
                BvhNode::Leaf { element_index, .. } => {
                    if element_index >= element_count {
                        return Err(BvhError::IndexOutOfBounds {
                            index: element_index,
                            len: element_count,
                        });
                    }
                    if stored[element_index] {
                        return Err(BvhError::DuplicateElement {
                            element: element_index,
                        });
                    }
                    stored[element_index] = true;
                }
                BvhNode::Branch {
                    child_l_index,
                    child_r_index,
                    ..
                } => {
                    for child in [child_r_index, child_l_index] {
                        if child >= self.nodes.len() {
                            return Err(BvhError::IndexOutOfBounds {
                                index: child,
                                len: self.nodes.len(),
                            });
                        }
                        let found = self.nodes[child].parent();
                        if found != Some(node_index) {
                            return Err(BvhError::ParentMismatch {
                                node: child,
                                expected: Some(node_index),
                                found,
                            });
                        }
                        stack.push(child);
                    }
                }
            }
        }

        if let Some(node) = visited.iter().position(|&v| !v) {
            return Err(BvhError::DetachedNode { node });
        }
        if let Some(element) = stored.iter().position(|&s| !s) {
            return Err(BvhError::MissingElement { element });
        }
        Ok(())
    }

    /// Checks if all children of a node have the correct parent index, that there is no
    /// detached subtree and that every element is stored exactly once.
    pub fn is_consistent(&self, element_count: usize) -> bool {
        self.check(element_count).is_ok()
    }

    /// Assert version of [`Bvh::is_consistent`].
    ///
    /// [`Bvh::is_consistent`]: struct.Bvh.html#method.is_consistent
    pub fn assert_consistent(&self, element_count: usize) {
        if let Err(err) = self.check(element_count) {
            panic!("inconsistent bvh: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::bvh::{Bvh, BvhNode};
    use crate::error::BvhError;

    /// Root with a leaf on the left and a branch over two leaves on the right.
    fn small_tree() -> Bvh {
        Bvh {
            nodes: vec![
                BvhNode::Branch {
                    parent_index: None,
                    child_l_index: 1,
                    child_r_index: 2,
                },
                BvhNode::Leaf {
                    parent_index: Some(0),
                    element_index: 2,
                },
                BvhNode::Branch {
                    parent_index: Some(0),
                    child_l_index: 3,
                    child_r_index: 4,
                },
                BvhNode::Leaf {
                    parent_index: Some(2),
                    element_index: 0,
                },
                BvhNode::Leaf {
                    parent_index: Some(2),
                    element_index: 1,
                },
            ],
        }
    }

    #[test]
    fn test_check_accepts_valid_tree() {
        let bvh = small_tree();
        bvh.assert_consistent(3);
        assert_eq!(bvh.element_count(), 3);
        assert_eq!(bvh.depth(), 2);
        assert_eq!(bvh.preorder(), vec![0, 1, 2, 3, 4]);
        bvh.pretty_print();
    }

    #[test]
    fn test_check_empty_and_single() {
        let empty = Bvh::default();
        assert_eq!(empty.check(0), Ok(()));
        assert!(empty.is_empty());
        assert_eq!(empty.element_count(), 0);
        assert!(empty.preorder().is_empty());

        let single = Bvh {
            nodes: vec![BvhNode::Leaf {
                parent_index: None,
                element_index: 0,
            }],
        };
        assert_eq!(single.check(1), Ok(()));
        assert_eq!(single.depth(), 0);
        assert_eq!(
            single.check(0),
            Err(BvhError::NodeCountMismatch {
                nodes: 1,
                elements: 0
            })
        );
    }

    #[test]
    fn test_check_wrong_parent() {
        let mut bvh = small_tree();
        bvh.nodes[4] = BvhNode::Leaf {
            parent_index: Some(0),
            element_index: 1,
        };
        assert_eq!(
            bvh.check(3),
            Err(BvhError::ParentMismatch {
                node: 4,
                expected: Some(2),
                found: Some(0),
            })
        );
        assert!(!bvh.is_consistent(3));
    }

    #[test]
    fn test_check_root_with_parent() {
        let mut bvh = small_tree();
        bvh.nodes[0] = BvhNode::Branch {
            parent_index: Some(2),
            child_l_index: 1,
            child_r_index: 2,
        };
        assert!(matches!(
            bvh.check(3),
            Err(BvhError::ParentMismatch { node: 0, .. })
        ));
    }

    #[test]
    fn test_check_duplicate_and_missing_element() {
        let mut bvh = small_tree();
        bvh.nodes[3] = BvhNode::Leaf {
            parent_index: Some(2),
            element_index: 2,
        };
        assert_eq!(bvh.check(3), Err(BvhError::DuplicateElement { element: 2 }));
    }

    #[test]
    fn test_check_detached_node() {
        let mut bvh = small_tree();
        // Both children of the root point at the same subtree.
        bvh.nodes[0] = BvhNode::Branch {
            parent_index: None,
            child_l_index: 2,
            child_r_index: 2,
        };
        bvh.nodes[1] = BvhNode::Leaf {
            parent_index: None,
            element_index: 2,
        };
        assert_eq!(bvh.check(3), Err(BvhError::DetachedNode { node: 2 }));
    }

    #[test]
    #[should_panic]
    fn test_assert_consistent_panics() {
        small_tree().assert_consistent(4);
    }
}
