//! Top-down construction by recursive bisection of an element set, guided by the
//! adjacency between elements.

use nalgebra::Point;

use crate::aabb::Aabb;
use crate::bounding_hierarchy::BHValue;
use crate::bvh::{Bvh, BvhNode};
use crate::error::BvhError;
use crate::utils::cast;

/// Adjacency between elements in compressed row form: the neighbours of element `e` are
/// `neighbors[offsets[e]..offsets[e + 1]]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementAdjacency {
    offsets: Vec<usize>,
    neighbors: Vec<usize>,
}

impl ElementAdjacency {
    /// Creates an adjacency table from row offsets and the concatenated neighbour lists.
    ///
    /// `offsets` holds one entry per element plus a final one; it has to start at zero,
    /// never decrease and end at `neighbors.len()`. Every neighbour must name an element.
    pub fn new(offsets: Vec<usize>, neighbors: Vec<usize>) -> Result<Self, BvhError> {
        if offsets.first() != Some(&0) {
            return Err(BvhError::MalformedAdjacency { element: 0 });
        }
        if let Some(element) = offsets.windows(2).position(|w| w[0] > w[1]) {
            return Err(BvhError::MalformedAdjacency { element });
        }
        let end = offsets[offsets.len() - 1];
        if end != neighbors.len() {
            return Err(BvhError::LengthMismatch {
                expected: neighbors.len(),
                found: end,
            });
        }
        let element_count = offsets.len() - 1;
        if let Some(&index) = neighbors.iter().find(|&&e| e >= element_count) {
            return Err(BvhError::IndexOutOfBounds {
                index,
                len: element_count,
            });
        }
        Ok(ElementAdjacency { offsets, neighbors })
    }

    /// Creates an adjacency table from the fixed-arity "elements surrounding element"
    /// layout: `faces_per_element` slots per element, `None` where a face has no
    /// neighbour.
    ///
    /// # Examples
    /// ```
    /// use mortonbvh::bvh::ElementAdjacency;
    ///
    /// // Three segments in a row.
    /// let surrounding = [None, Some(1), Some(0), Some(2), Some(1), None];
    /// let adjacency = ElementAdjacency::from_surrounding(2, &surrounding).unwrap();
    ///
    /// assert_eq!(adjacency.element_count(), 3);
    /// assert_eq!(adjacency.neighbors(1), &[0, 2]);
    /// assert_eq!(adjacency.neighbors(2), &[1]);
    /// ```
    pub fn from_surrounding(
        faces_per_element: usize,
        surrounding: &[Option<usize>],
    ) -> Result<Self, BvhError> {
        if faces_per_element == 0 || surrounding.len() % faces_per_element != 0 {
            return Err(BvhError::RaggedElements {
                len: surrounding.len(),
                nodes_per_element: faces_per_element,
            });
        }
        let element_count = surrounding.len() / faces_per_element;
        let mut offsets = Vec::with_capacity(element_count + 1);
        let mut neighbors = Vec::with_capacity(surrounding.len());
        offsets.push(0);
        for faces in surrounding.chunks(faces_per_element) {
            neighbors.extend(faces.iter().flatten());
            offsets.push(neighbors.len());
        }
        Self::new(offsets, neighbors)
    }

    /// An adjacency table over `element_count` elements without any neighbours.
    pub fn empty(element_count: usize) -> Self {
        ElementAdjacency {
            offsets: vec![0; element_count + 1],
            neighbors: Vec::new(),
        }
    }

    /// Number of elements described by this table.
    pub fn element_count(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    /// The neighbours of `element`.
    pub fn neighbors(&self, element: usize) -> &[usize] {
        &self.neighbors[self.offsets[element]..self.offsets[element + 1]]
    }
}

/// How the partitioner bisects an element set.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum SplitPolicy {
    /// Grow the left half from the element with the smallest coordinate on the longest
    /// axis of the centers' bounding box, through adjacent elements whose centers lie at
    /// or below the midpoint of that axis. Falls back to [`SplitPolicy::Median`] when the
    /// grown half is very small.
    ///
    /// [`SplitPolicy::Median`]: enum.SplitPolicy.html#variant.Median
    #[default]
    ConnectedLongestAxis,
    /// Sort by the coordinate on the longest axis (ties by element index) and cut the
    /// set in half.
    Median,
}

/// A connected split whose left half holds less than `1 / MIN_CONNECTED_FRACTION` of the
/// segment is replaced by a median split.
const MIN_CONNECTED_FRACTION: usize = 8;

/// Scratch state shared by all splits of one build.
struct Partitioner<'a, T: BHValue, const D: usize> {
    centers: &'a [Point<T, D>],
    adjacency: &'a ElementAdjacency,
    policy: SplitPolicy,
    in_segment: Vec<bool>,
    in_left: Vec<bool>,
    queue: Vec<usize>,
    right: Vec<usize>,
}

impl<'a, T: BHValue, const D: usize> Partitioner<'a, T, D> {
    fn key(&self, element: usize, axis: usize) -> f64 {
        self.centers[element][axis].to_f64().unwrap_or(f64::NAN)
    }

    /// Reorders `segment` (at least two elements) so that the left half comes first and
    /// returns the size of the left half, which is always in `1..segment.len()`.
    fn split(&mut self, segment: &mut [usize]) -> usize {
        let mut bounds = Aabb::empty();
        for &element in segment.iter() {
            bounds.grow_mut(&self.centers[element]);
        }
        let axis = bounds.largest_axis();
        let extent = bounds.max[axis] - bounds.min[axis];
        if !(extent >= T::epsilon()) {
            log::trace!("{} coincident centers, median split", segment.len());
            return self.split_median(segment, axis);
        }

        match self.policy {
            SplitPolicy::Median => self.split_median(segment, axis),
            SplitPolicy::ConnectedLongestAxis => {
                let midpoint = (bounds.min[axis] + bounds.max[axis]) * cast::<T>(0.5);
                let count_l = self.split_connected(segment, axis, midpoint);
                if count_l == segment.len() || count_l * MIN_CONNECTED_FRACTION < segment.len() {
                    log::trace!(
                        "connected split took {count_l} of {} elements, median split",
                        segment.len()
                    );
                    self.split_median(segment, axis)
                } else {
                    count_l
                }
            }
        }
    }

    fn split_median(&self, segment: &mut [usize], axis: usize) -> usize {
        segment.sort_by(|&a, &b| {
            self.key(a, axis)
                .total_cmp(&self.key(b, axis))
                .then(a.cmp(&b))
        });
        segment.len() / 2
    }

    /// Flood fill from the lowest element on `axis` through neighbours inside the segment
    /// at or below `midpoint`. Moves the filled set to the front, keeping the relative
    /// order of both halves.
    fn split_connected(&mut self, segment: &mut [usize], axis: usize, midpoint: T) -> usize {
        let adjacency = self.adjacency;
        let centers = self.centers;

        let mut seed = segment[0];
        for &element in segment.iter() {
            self.in_segment[element] = true;
            if self.key(element, axis).total_cmp(&self.key(seed, axis)).is_lt() {
                seed = element;
            }
        }

        self.in_left[seed] = true;
        self.queue.push(seed);
        let mut count_l = 1;
        while let Some(element) = self.queue.pop() {
            for &neighbor in adjacency.neighbors(element) {
                if self.in_segment[neighbor]
                    && !self.in_left[neighbor]
                    && centers[neighbor][axis] <= midpoint
                {
                    self.in_left[neighbor] = true;
                    count_l += 1;
                    self.queue.push(neighbor);
                }
            }
        }

        if count_l < segment.len() {
            self.right.clear();
            let mut write = 0;
            for read in 0..segment.len() {
                let element = segment[read];
                if self.in_left[element] {
                    segment[write] = element;
                    write += 1;
                } else {
                    self.right.push(element);
                }
            }
            segment[write..].copy_from_slice(&self.right);
        }

        for &element in segment.iter() {
            self.in_segment[element] = false;
            self.in_left[element] = false;
        }
        count_l
    }
}

impl Bvh {
    /// Builds a [`Bvh`] by recursively bisecting the elements.
    ///
    /// `centers` holds one representative point per element and `adjacency` tells which
    /// elements touch. Every split produces two non-empty halves, so the build terminates
    /// and stores every element in exactly one leaf for any adjacency, connected or not.
    /// Nodes are laid out in pre-order: the left child of a branch directly follows it.
    ///
    /// # Examples
    /// ```
    /// use mortonbvh::bvh::{Bvh, ElementAdjacency, SplitPolicy};
    /// use nalgebra::Point3;
    ///
    /// let centers: Vec<_> = (0..4).map(|i| Point3::new(i as f64, 0.0, 0.0)).collect();
    /// let adjacency = ElementAdjacency::new(vec![0, 1, 3, 5, 6], vec![1, 0, 2, 1, 3, 2]).unwrap();
    /// let bvh = Bvh::build_partitioned(&centers, &adjacency, SplitPolicy::default()).unwrap();
    ///
    /// assert!(bvh.is_consistent(4));
    /// assert_eq!(bvh.nodes[0].children(), Some((1, 4)));
    /// ```
    ///
    /// [`Bvh`]: struct.Bvh.html
    ///
    pub fn build_partitioned<T: BHValue, const D: usize>(
        centers: &[Point<T, D>],
        adjacency: &ElementAdjacency,
        policy: SplitPolicy,
    ) -> Result<Bvh, BvhError> {
        let n = centers.len();
        if adjacency.element_count() != n {
            return Err(BvhError::LengthMismatch {
                expected: n,
                found: adjacency.element_count(),
            });
        }
        if n == 0 {
            return Ok(Bvh::default());
        }

        let placeholder = BvhNode::Leaf {
            parent_index: None,
            element_index: 0,
        };
        let mut nodes = vec![placeholder; 2 * n - 1];
        let mut elements: Vec<usize> = (0..n).collect();
        let mut partitioner = Partitioner {
            centers,
            adjacency,
            policy,
            in_segment: vec![false; n],
            in_left: vec![false; n],
            queue: Vec::new(),
            right: Vec::new(),
        };

        // (start, end, node, parent): the elements in `start..end` form the subtree rooted
        // at `node`.
        let mut stack = vec![(0, n, 0, None)];
        while let Some((start, end, node_index, parent_index)) = stack.pop() {
            let segment = &mut elements[start..end];
            if segment.len() == 1 {
                nodes[node_index] = BvhNode::Leaf {
                    parent_index,
                    element_index: segment[0],
                };
                continue;
            }

            let count_l = partitioner.split(segment);
            debug_assert!(count_l > 0 && count_l < segment.len());
            log::trace!(
                "node {node_index}: {} elements split into {count_l} + {}",
                segment.len(),
                segment.len() - count_l
            );

            // The left subtree holds `2 * count_l - 1` nodes.
            let child_l_index = node_index + 1;
            let child_r_index = node_index + 2 * count_l;
            nodes[node_index] = BvhNode::Branch {
                parent_index,
                child_l_index,
                child_r_index,
            };
            stack.push((start + count_l, end, child_r_index, Some(node_index)));
            stack.push((start, start + count_l, child_l_index, Some(node_index)));
        }

        log::debug!("built partitioned bvh over {n} elements ({} nodes)", nodes.len());
        Ok(Bvh { nodes })
    }
}

#[cfg(test)]
mod tests {
    use super::{ElementAdjacency, SplitPolicy};
    use crate::bvh::{Bvh, BvhNode, PointCloud};
    use crate::error::BvhError;
    use crate::testbase::{flatten, random_points, TAabb3, TBall3, TPoint3};

    /// Elements on the x axis, each adjacent to its predecessor and successor.
    fn chain(count: usize) -> (Vec<TPoint3>, ElementAdjacency) {
        let centers = (0..count)
            .map(|i| TPoint3::new(i as f32, 0.0, 0.0))
            .collect();
        let mut surrounding = Vec::with_capacity(2 * count);
        for i in 0..count {
            surrounding.push(i.checked_sub(1));
            surrounding.push(if i + 1 < count { Some(i + 1) } else { None });
        }
        let adjacency = ElementAdjacency::from_surrounding(2, &surrounding).unwrap();
        (centers, adjacency)
    }

    fn elements_below(bvh: &Bvh, node_index: usize) -> Vec<usize> {
        let mut elements = Vec::new();
        let mut stack = vec![node_index];
        while let Some(index) = stack.pop() {
            match bvh.nodes[index] {
                BvhNode::Leaf { element_index, .. } => elements.push(element_index),
                BvhNode::Branch {
                    child_l_index,
                    child_r_index,
                    ..
                } => {
                    stack.push(child_l_index);
                    stack.push(child_r_index);
                }
            }
        }
        elements.sort_unstable();
        elements
    }

    #[test]
    fn test_empty_and_single() {
        let empty = Bvh::build_partitioned::<f32, 3>(
            &[],
            &ElementAdjacency::empty(0),
            SplitPolicy::default(),
        )
        .unwrap();
        assert!(empty.is_empty());

        let single = Bvh::build_partitioned(
            &[TPoint3::new(1.0, 1.0, 1.0)],
            &ElementAdjacency::empty(1),
            SplitPolicy::default(),
        )
        .unwrap();
        single.assert_consistent(1);
    }

    #[test]
    fn test_chain_splits_at_midpoint() {
        let (centers, adjacency) = chain(10);
        let bvh = Bvh::build_partitioned(&centers, &adjacency, SplitPolicy::ConnectedLongestAxis)
            .unwrap();
        bvh.assert_consistent(10);
        let (left, right) = bvh.nodes[0].children().unwrap();
        assert_eq!(left, 1);
        assert_eq!(elements_below(&bvh, left), vec![0, 1, 2, 3, 4]);
        assert_eq!(elements_below(&bvh, right), vec![5, 6, 7, 8, 9]);
    }

    #[test]
    fn test_random_points_both_policies() {
        let points = random_points(300, 5);
        for policy in [SplitPolicy::ConnectedLongestAxis, SplitPolicy::Median] {
            let bvh =
                Bvh::build_partitioned(&points, &ElementAdjacency::empty(300), policy).unwrap();
            bvh.assert_consistent(300);
        }
        let median =
            Bvh::build_partitioned(&points, &ElementAdjacency::empty(300), SplitPolicy::Median)
                .unwrap();
        // Median cuts give a balanced tree.
        assert_eq!(median.depth(), 9);
    }

    #[test]
    fn test_coincident_centers() {
        let points = vec![TPoint3::new(3.0, 3.0, 3.0); 7];
        let (_, adjacency) = chain(7);
        let bvh = Bvh::build_partitioned(&points, &adjacency, SplitPolicy::default()).unwrap();
        bvh.assert_consistent(7);
        assert_eq!(bvh.depth(), 3);
    }

    #[test]
    fn test_sparse_adjacency_stays_shallow() {
        // Without adjacency every flood fill stops at its seed.
        let count = 20_000;
        let points: Vec<TPoint3> = (0..count)
            .map(|i| TPoint3::new(i as f32, 0.0, 0.0))
            .collect();
        let bvh = Bvh::build_partitioned(
            &points,
            &ElementAdjacency::empty(count),
            SplitPolicy::ConnectedLongestAxis,
        )
        .unwrap();
        bvh.assert_consistent(count);
        assert!(bvh.depth() < 32, "depth {}", bvh.depth());
    }

    #[test]
    fn test_rebuild_is_identical() {
        let (centers, adjacency) = chain(64);
        let coords = flatten(&centers);
        let cloud = PointCloud::new(&coords, 0.25).unwrap();
        let a = Bvh::build_partitioned(&centers, &adjacency, SplitPolicy::default()).unwrap();
        let b = Bvh::build_partitioned(&centers, &adjacency, SplitPolicy::default()).unwrap();
        assert_eq!(a, b);

        let boxes: Vec<TAabb3> = a.build_volumes(&cloud).unwrap();
        let boxes_again: Vec<TAabb3> = b.build_volumes(&cloud).unwrap();
        assert_eq!(boxes, boxes_again);
        let balls: Vec<TBall3> = a.build_volumes(&cloud).unwrap();
        let balls_again: Vec<TBall3> = b.build_volumes(&cloud).unwrap();
        assert_eq!(balls, balls_again);
    }

    #[test]
    fn test_adjacency_validation() {
        assert_eq!(
            ElementAdjacency::new(vec![], vec![]),
            Err(BvhError::MalformedAdjacency { element: 0 })
        );
        assert_eq!(
            ElementAdjacency::new(vec![0, 2, 1], vec![1, 0]),
            Err(BvhError::MalformedAdjacency { element: 1 })
        );
        assert_eq!(
            ElementAdjacency::new(vec![0, 1, 1], vec![1, 0]),
            Err(BvhError::LengthMismatch {
                expected: 2,
                found: 1
            })
        );
        assert_eq!(
            ElementAdjacency::new(vec![0, 1, 2], vec![1, 5]),
            Err(BvhError::IndexOutOfBounds { index: 5, len: 2 })
        );
        assert_eq!(
            ElementAdjacency::from_surrounding(3, &[None; 4]),
            Err(BvhError::RaggedElements {
                len: 4,
                nodes_per_element: 3
            })
        );
        assert_eq!(ElementAdjacency::empty(4).element_count(), 4);
    }

    #[test]
    fn test_center_count_must_match_adjacency() {
        let points = random_points(5, 1);
        assert_eq!(
            Bvh::build_partitioned(&points, &ElementAdjacency::empty(4), SplitPolicy::Median),
            Err(BvhError::LengthMismatch {
                expected: 5,
                found: 4
            })
        );
    }
}
