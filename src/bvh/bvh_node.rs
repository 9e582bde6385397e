/// The [`BvhNode`] enum that describes a node in a [`Bvh`].
/// It's either a leaf node and references an element (by holding its index)
/// or a branch node that has two child nodes.
///
/// Volumes are not stored in the nodes; they live in a separate array parallel to
/// [`Bvh::nodes`], so one topology can carry several volume sets.
///
/// [`Bvh`]: struct.Bvh.html
/// [`Bvh::nodes`]: struct.Bvh.html#structfield.nodes
/// [`BvhNode`]: enum.BvhNode.html
///
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BvhNode {
    /// Leaf node.
    Leaf {
        /// The node's parent, `None` for the root.
        parent_index: Option<usize>,

        /// The element contained in this leaf.
        element_index: usize,
    },
    /// Inner node.
    Branch {
        /// The node's parent, `None` for the root.
        parent_index: Option<usize>,

        /// Index of the left subtree's root node.
        child_l_index: usize,

        /// Index of the right subtree's root node.
        child_r_index: usize,
    },
}

impl BvhNode {
    /// Returns the index of the parent node.
    pub fn parent(&self) -> Option<usize> {
        match *self {
            BvhNode::Branch { parent_index, .. } | BvhNode::Leaf { parent_index, .. } => {
                parent_index
            }
        }
    }

    /// Returns true for leaf nodes.
    pub fn is_leaf(&self) -> bool {
        matches!(self, BvhNode::Leaf { .. })
    }

    /// Returns the indices of the left and right child, or `None` for a leaf.
    pub fn children(&self) -> Option<(usize, usize)> {
        match *self {
            BvhNode::Branch {
                child_l_index,
                child_r_index,
                ..
            } => Some((child_l_index, child_r_index)),
            BvhNode::Leaf { .. } => None,
        }
    }

    /// Returns the index of the left child node.
    pub fn child_l(&self) -> usize {
        match *self {
            BvhNode::Branch { child_l_index, .. } => child_l_index,
            _ => panic!("Tried to get the left child of a leaf node."),
        }
    }

    /// Returns the index of the right child node.
    pub fn child_r(&self) -> usize {
        match *self {
            BvhNode::Branch { child_r_index, .. } => child_r_index,
            _ => panic!("Tried to get the right child of a leaf node."),
        }
    }

    /// Gets the element index for leaf nodes. Returns `None` for branch nodes.
    pub fn element_index(&self) -> Option<usize> {
        match *self {
            BvhNode::Leaf { element_index, .. } => Some(element_index),
            _ => None,
        }
    }

    /// Returns the depth of the node. The root node has depth `0`.
    pub fn depth(&self, nodes: &[BvhNode]) -> usize {
        let mut depth = 0;
        let mut parent = self.parent();
        while let Some(index) = parent {
            depth += 1;
            parent = nodes[index].parent();
        }
        depth
    }
}

#[cfg(test)]
mod tests {
    use super::BvhNode;

    #[test]
    fn test_accessors() {
        let nodes = [
            BvhNode::Branch {
                parent_index: None,
                child_l_index: 1,
                child_r_index: 2,
            },
            BvhNode::Leaf {
                parent_index: Some(0),
                element_index: 1,
            },
            BvhNode::Leaf {
                parent_index: Some(0),
                element_index: 0,
            },
        ];
        assert_eq!(nodes[0].children(), Some((1, 2)));
        assert_eq!(nodes[0].child_l(), 1);
        assert_eq!(nodes[0].child_r(), 2);
        assert_eq!(nodes[0].element_index(), None);
        assert_eq!(nodes[2].element_index(), Some(0));
        assert!(nodes[1].is_leaf());
        assert_eq!(nodes[0].depth(&nodes), 0);
        assert_eq!(nodes[2].depth(&nodes), 1);
    }

    #[test]
    #[should_panic]
    fn test_child_of_leaf_panics() {
        let leaf = BvhNode::Leaf {
            parent_index: None,
            element_index: 0,
        };
        leaf.child_l();
    }
}
