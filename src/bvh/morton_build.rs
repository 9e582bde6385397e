//! Linear BVH construction from sorted Morton codes (binary radix tree).

use nalgebra::Point;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

use crate::bounding_hierarchy::BHValue;
use crate::bvh::{Bvh, BvhNode};
use crate::error::BvhError;
use crate::morton::{determine_range, find_split, MortonIndex};

/// Computes the children of internal node `node`. Internal nodes occupy `[0, n - 1)`,
/// the leaf of sorted position `k` is node `n - 1 + k`.
fn internal_children(codes: &[u32], node: usize) -> (usize, usize) {
    let leaf_offset = codes.len() - 1;
    let (first, last) = determine_range(codes, node);
    debug_assert!(first < last);
    let split = find_split(codes, first, last).unwrap_or(first);
    log::trace!("internal node {node}: leaves [{first}, {last}], split after {split}");

    let child_l = if split == first {
        leaf_offset + split
    } else {
        split
    };
    let child_r = if split + 1 == last {
        leaf_offset + split + 1
    } else {
        split + 1
    };
    (child_l, child_r)
}

impl Bvh {
    /// Builds the LBVH topology over a [`MortonIndex`].
    ///
    /// Internal node `i` covers the leaf range found by [`determine_range`] and splits it
    /// at [`find_split`]. Leaves follow the internal nodes in sorted code order. With the
    /// `rayon` feature the internal nodes are computed in parallel; the result does not
    /// depend on it.
    ///
    /// Fails if the arrays differ in length, the codes are not sorted or `ids` is not a
    /// permutation of `0..n`.
    ///
    /// # Examples
    /// ```
    /// use mortonbvh::bvh::Bvh;
    /// use mortonbvh::morton::MortonIndex;
    /// use nalgebra::Point3;
    ///
    /// let points = vec![
    ///     Point3::new(0.0, 0.0, 0.0),
    ///     Point3::new(1.0, 1.0, 1.0),
    ///     Point3::new(0.1, 0.0, 0.0),
    /// ];
    /// let index = MortonIndex::from_points(&points);
    /// let bvh = Bvh::from_morton_index(&index).unwrap();
    ///
    /// assert_eq!(bvh.nodes.len(), 5);
    /// assert!(bvh.is_consistent(3));
    /// ```
    ///
    /// [`MortonIndex`]: ../morton/struct.MortonIndex.html
    /// [`determine_range`]: ../morton/fn.determine_range.html
    /// [`find_split`]: ../morton/fn.find_split.html
    ///
    pub fn from_morton_index(index: &MortonIndex) -> Result<Bvh, BvhError> {
        if index.codes.len() != index.ids.len() {
            return Err(BvhError::LengthMismatch {
                expected: index.ids.len(),
                found: index.codes.len(),
            });
        }
        if let Some(position) = index.codes.windows(2).position(|w| w[0] > w[1]) {
            return Err(BvhError::UnsortedCodes {
                position: position + 1,
            });
        }
        let n = index.ids.len();
        let mut seen = vec![false; n];
        for &id in &index.ids {
            if id >= n {
                return Err(BvhError::IndexOutOfBounds { index: id, len: n });
            }
            if seen[id] {
                return Err(BvhError::DuplicateElement { element: id });
            }
            seen[id] = true;
        }
        Ok(Self::from_sorted_codes(&index.ids, &index.codes))
    }

    /// Codes `points` against their own bounding box and builds the LBVH over them.
    pub fn build_morton<T: BHValue>(points: &[Point<T, 3>]) -> Bvh {
        let index = MortonIndex::from_points(points);
        Self::from_sorted_codes(&index.ids, &index.codes)
    }

    fn from_sorted_codes(ids: &[usize], codes: &[u32]) -> Bvh {
        let n = codes.len();
        match n {
            0 => return Bvh::default(),
            1 => {
                return Bvh {
                    nodes: vec![BvhNode::Leaf {
                        parent_index: None,
                        element_index: ids[0],
                    }],
                }
            }
            _ => {}
        }

        #[cfg(feature = "rayon")]
        let children: Vec<(usize, usize)> = (0..n - 1)
            .into_par_iter()
            .map(|node| internal_children(codes, node))
            .collect();
        #[cfg(not(feature = "rayon"))]
        let children: Vec<(usize, usize)> = (0..n - 1)
            .map(|node| internal_children(codes, node))
            .collect();

        let mut parents = vec![None; 2 * n - 1];
        for (node, &(child_l, child_r)) in children.iter().enumerate() {
            parents[child_l] = Some(node);
            parents[child_r] = Some(node);
        }

        let mut nodes = Vec::with_capacity(2 * n - 1);
        nodes.extend(
            children
                .iter()
                .zip(&parents)
                .map(|(&(child_l_index, child_r_index), &parent_index)| BvhNode::Branch {
                    parent_index,
                    child_l_index,
                    child_r_index,
                }),
        );
        nodes.extend(
            ids.iter()
                .zip(&parents[n - 1..])
                .map(|(&element_index, &parent_index)| BvhNode::Leaf {
                    parent_index,
                    element_index,
                }),
        );
        log::debug!("built morton bvh over {n} elements ({} nodes)", nodes.len());
        Bvh { nodes }
    }
}

#[cfg(test)]
mod tests {
    use crate::bvh::{Bvh, BvhNode};
    use crate::error::BvhError;
    use crate::morton::MortonIndex;
    use crate::bvh::PointCloud;
    use crate::testbase::{cube_corners, flatten, random_points, TAabb3, TBall3, TPoint3};

    use proptest::prelude::*;

    #[test]
    fn test_empty_and_single() {
        let empty = Bvh::build_morton::<f32>(&[]);
        assert!(empty.is_empty());
        empty.assert_consistent(0);

        let single = Bvh::build_morton(&[TPoint3::new(1.0, 2.0, 3.0)]);
        assert_eq!(
            single.nodes,
            vec![BvhNode::Leaf {
                parent_index: None,
                element_index: 0
            }]
        );
    }

    #[test]
    fn test_random_points_consistent() {
        for (count, seed) in [(2, 1), (3, 2), (17, 3), (1000, 4)] {
            let points = random_points(count, seed);
            let bvh = Bvh::build_morton(&points);
            assert_eq!(bvh.nodes.len(), 2 * count - 1);
            bvh.assert_consistent(count);
        }
    }

    #[test]
    fn test_identical_points_consistent() {
        let points = vec![TPoint3::new(0.25, 0.25, 0.25); 33];
        let bvh = Bvh::build_morton(&points);
        bvh.assert_consistent(33);
        // Duplicate codes keep their original order in the leaves.
        let leaves: Vec<usize> = bvh.nodes[32..]
            .iter()
            .filter_map(|node| node.element_index())
            .collect();
        assert_eq!(leaves, (0..33).collect::<Vec<_>>());
    }

    #[test]
    fn test_cube_corners_consistent() {
        let corners = cube_corners();
        let bvh = Bvh::build_morton(&corners);
        bvh.assert_consistent(8);
        // The corners are perfectly balanced in Morton order.
        assert_eq!(bvh.depth(), 3);
    }

    #[test]
    fn test_rebuild_is_identical() {
        let points = random_points(500, 99);
        let coords = flatten(&points);
        let cloud = PointCloud::new(&coords, 0.01).unwrap();
        let first = Bvh::build_morton(&points);
        let second = Bvh::build_morton(&points);
        assert_eq!(first, second);

        let boxes: Vec<TAabb3> = first.build_volumes(&cloud).unwrap();
        let boxes_again: Vec<TAabb3> = second.build_volumes(&cloud).unwrap();
        assert_eq!(boxes, boxes_again);
        let balls: Vec<TBall3> = first.build_volumes(&cloud).unwrap();
        let balls_again: Vec<TBall3> = second.build_volumes(&cloud).unwrap();
        assert_eq!(balls, balls_again);
    }

    #[test]
    fn test_rejects_malformed_index() {
        let index = MortonIndex {
            ids: vec![0, 1],
            codes: vec![5],
        };
        assert_eq!(
            Bvh::from_morton_index(&index),
            Err(BvhError::LengthMismatch {
                expected: 2,
                found: 1
            })
        );
        let index = MortonIndex {
            ids: vec![0, 1, 2],
            codes: vec![5, 9, 1],
        };
        assert_eq!(
            Bvh::from_morton_index(&index),
            Err(BvhError::UnsortedCodes { position: 2 })
        );
        let index = MortonIndex {
            ids: vec![0, 0, 2],
            codes: vec![1, 5, 9],
        };
        assert_eq!(
            Bvh::from_morton_index(&index),
            Err(BvhError::DuplicateElement { element: 0 })
        );
        let index = MortonIndex {
            ids: vec![0, 3, 1],
            codes: vec![1, 5, 9],
        };
        assert_eq!(
            Bvh::from_morton_index(&index),
            Err(BvhError::IndexOutOfBounds { index: 3, len: 3 })
        );
    }

    proptest! {
        // Arbitrary sorted codes with plenty of duplicates give a valid tree.
        #[test]
        fn test_from_arbitrary_codes(mut codes in prop::collection::vec(0u32..16, 1..300)) {
            codes.sort_unstable();
            let index = MortonIndex { ids: (0..codes.len()).collect(), codes };
            let bvh = Bvh::from_morton_index(&index).unwrap();
            prop_assert_eq!(bvh.check(index.len()), Ok(()));
        }
    }
}
