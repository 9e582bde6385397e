//! Read-only queries against a [`Bvh`] and one bounding volume per node.
//!
//! Every query descends from the root with an explicit stack and prunes subtrees whose
//! volume fails the test. Left children are visited before right children, so results
//! come out in the same order as a depth-first recursion would produce them.
//!
//! [`Bvh`]: ../struct.Bvh.html
//!

use core::marker::PhantomData;

use nalgebra::Point;

use crate::bounding_hierarchy::{BHValue, BoundingVolume};
use crate::bvh::{Bvh, BvhNode};
use crate::error::BvhError;
use crate::ray::Ray;
use crate::utils::fast_min;

/// A [`Bvh`] paired with its per-node volumes, ready for queries.
///
/// [`Bvh`]: struct.Bvh.html
///
#[derive(Debug)]
pub struct BvhView<'a, T: BHValue, const D: usize, BV: BoundingVolume<T, D>> {
    bvh: &'a Bvh,
    volumes: &'a [BV],
    _marker: PhantomData<fn() -> T>,
}

impl<'a, T: BHValue, const D: usize, BV: BoundingVolume<T, D>> Clone for BvhView<'a, T, D, BV> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, T: BHValue, const D: usize, BV: BoundingVolume<T, D>> Copy for BvhView<'a, T, D, BV> {}

impl Bvh {
    /// Pairs this [`Bvh`] with its volumes, one per node.
    ///
    /// # Examples
    /// ```
    /// use mortonbvh::aabb::Aabb;
    /// use mortonbvh::bvh::{Bvh, PointCloud};
    /// use mortonbvh::error::BvhError;
    /// use nalgebra::Point3;
    ///
    /// let coords = [0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
    /// let bvh = Bvh::build_morton(&[Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0)]);
    /// let volumes: Vec<Aabb<f64, 3>> = bvh.build_volumes(&PointCloud::new(&coords, 0.0)?)?;
    ///
    /// let view = bvh.with_volumes(&volumes)?;
    /// assert_eq!(view.elements_containing_point(&Point3::new(1.0, 1.0, 1.0)), vec![1]);
    /// assert!(bvh.with_volumes(&volumes[..2]).is_err());
    /// # Ok::<(), BvhError>(())
    /// ```
    ///
    /// [`Bvh`]: struct.Bvh.html
    ///
    pub fn with_volumes<'a, T, const D: usize, BV>(
        &'a self,
        volumes: &'a [BV],
    ) -> Result<BvhView<'a, T, D, BV>, BvhError>
    where
        T: BHValue,
        BV: BoundingVolume<T, D>,
    {
        if volumes.len() != self.nodes.len() {
            return Err(BvhError::VolumeCountMismatch {
                volumes: volumes.len(),
                nodes: self.nodes.len(),
            });
        }
        Ok(BvhView {
            bvh: self,
            volumes,
            _marker: PhantomData,
        })
    }
}

impl<'a, T: BHValue, const D: usize, BV: BoundingVolume<T, D>> BvhView<'a, T, D, BV> {
    /// The underlying tree.
    pub fn bvh(&self) -> &'a Bvh {
        self.bvh
    }

    /// The per-node volumes.
    pub fn volumes(&self) -> &'a [BV] {
        self.volumes
    }

    /// Collects the elements of all leaves reachable through nodes passing `test`.
    fn collect_elements(&self, mut test: impl FnMut(&BV) -> bool) -> Vec<usize> {
        let mut elements = Vec::new();
        if self.bvh.nodes.is_empty() {
            return elements;
        }
        let mut stack = vec![0];
        while let Some(node_index) = stack.pop() {
            if !test(&self.volumes[node_index]) {
                continue;
            }
            match self.bvh.nodes[node_index] {
                BvhNode::Leaf { element_index, .. } => elements.push(element_index),
                BvhNode::Branch {
                    child_l_index,
                    child_r_index,
                    ..
                } => {
                    stack.push(child_r_index);
                    stack.push(child_l_index);
                }
            }
        }
        elements
    }

    /// Returns the elements whose volume contains `point`.
    pub fn elements_containing_point(&self, point: &Point<T, D>) -> Vec<usize> {
        self.collect_elements(|volume| volume.contains_point(point))
    }

    /// Returns the elements whose volume is hit by `ray` (parameter `t >= 0`).
    ///
    /// # Examples
    /// ```
    /// use mortonbvh::aabb::Aabb;
    /// use mortonbvh::bvh::{Bvh, PointCloud};
    /// use mortonbvh::ray::Ray;
    /// use nalgebra::{Point3, Vector3};
    ///
    /// let points: Vec<_> = (0..5).map(|i| Point3::new(i as f32, 0.0, 0.0)).collect();
    /// let coords: Vec<f32> = points.iter().flat_map(|p| [p.x, p.y, p.z]).collect();
    /// let bvh = Bvh::build_morton(&points);
    /// let volumes: Vec<Aabb<f32, 3>> = bvh.build_volumes(&PointCloud::new(&coords, 0.1).unwrap()).unwrap();
    /// let view = bvh.with_volumes(&volumes).unwrap();
    ///
    /// let ray = Ray::new(Point3::new(2.5, 0.0, 0.0), Vector3::new(1.0, 0.0, 0.0));
    /// let mut hits = view.elements_intersecting_ray(&ray);
    /// hits.sort();
    /// assert_eq!(hits, vec![3, 4]);
    /// ```
    pub fn elements_intersecting_ray(&self, ray: &Ray<T, D>) -> Vec<usize> {
        self.collect_elements(|volume| volume.intersects_ray(ray))
    }

    /// Returns the elements whose volume is hit by the infinite line through
    /// `line.origin` along `line.direction`.
    pub fn elements_intersecting_line(&self, line: &Ray<T, D>) -> Vec<usize> {
        self.collect_elements(|volume| volume.intersects_line(line))
    }

    /// Returns the elements whose volume intersects `volume`.
    pub fn elements_intersecting_volume(&self, volume: &BV) -> Vec<usize> {
        self.collect_elements(|node_volume| node_volume.intersects(volume))
    }

    /// Brackets the distance from `point` to the nearest element.
    ///
    /// Returns `(min, max)` with `min <= d <= max` for the true nearest distance `d`
    /// (measured to whatever the leaf volumes enclose), or `None` if the tree is empty.
    /// Subtrees whose lower distance bound exceeds the best upper bound found so far are
    /// skipped.
    ///
    /// # Examples
    /// ```
    /// use mortonbvh::aabb::Aabb;
    /// use mortonbvh::bvh::{Bvh, PointCloud};
    /// use nalgebra::Point3;
    ///
    /// let coords = [0.0, 0.0, 0.0, 5.0, 0.0, 0.0];
    /// let bvh = Bvh::build_morton(&[Point3::new(0.0, 0.0, 0.0), Point3::new(5.0, 0.0, 0.0)]);
    /// let volumes: Vec<Aabb<f64, 3>> = bvh.build_volumes(&PointCloud::new(&coords, 0.0).unwrap()).unwrap();
    /// let view = bvh.with_volumes(&volumes).unwrap();
    ///
    /// assert_eq!(view.nearest_distance_range(&Point3::new(4.0, 0.0, 0.0)), Some((1.0, 1.0)));
    /// ```
    pub fn nearest_distance_range(&self, point: &Point<T, D>) -> Option<(T, T)> {
        if self.bvh.nodes.is_empty() {
            return None;
        }
        let mut best: Option<(T, T)> = None;
        let mut stack = vec![0];
        while let Some(node_index) = stack.pop() {
            let volume = &self.volumes[node_index];
            if volume.is_empty() {
                continue;
            }
            let (min0, max0) = volume.distance_range(point);
            if let Some((_, max)) = best {
                if min0 > max {
                    continue;
                }
            }
            match self.bvh.nodes[node_index] {
                BvhNode::Leaf { .. } => {
                    best = Some(match best {
                        None => (min0, max0),
                        Some((min, max)) => (fast_min(min, min0), fast_min(max, max0)),
                    });
                }
                BvhNode::Branch {
                    child_l_index,
                    child_r_index,
                    ..
                } => {
                    stack.push(child_r_index);
                    stack.push(child_l_index);
                }
            }
        }
        best
    }

    /// Returns the elements whose distance range to `point` overlaps `[min, max]`.
    ///
    /// Fails with [`BvhError::InvalidDistanceRange`] if `min > max` or either bound is NaN.
    ///
    /// [`BvhError::InvalidDistanceRange`]: ../error/enum.BvhError.html#variant.InvalidDistanceRange
    pub fn elements_in_distance_range(
        &self,
        point: &Point<T, D>,
        min: T,
        max: T,
    ) -> Result<Vec<usize>, BvhError> {
        if !(min <= max) {
            return Err(BvhError::InvalidDistanceRange {
                min: min.to_f64().unwrap_or(f64::NAN),
                max: max.to_f64().unwrap_or(f64::NAN),
            });
        }
        Ok(self.collect_elements(|volume| {
            if volume.is_empty() {
                return false;
            }
            let (min0, max0) = volume.distance_range(point);
            !(max0 < min || min0 > max)
        }))
    }

    /// Returns every pair `(a, b)` of an element `a` of this tree and an element `b` of
    /// `other` whose leaf volumes intersect.
    pub fn intersecting_pairs(&self, other: &BvhView<'_, T, D, BV>) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        if self.bvh.nodes.is_empty() || other.bvh.nodes.is_empty() {
            return pairs;
        }
        let mut stack = vec![(0, 0)];
        while let Some((a, b)) = stack.pop() {
            if !self.volumes[a].intersects(&other.volumes[b]) {
                continue;
            }
            match (self.bvh.nodes[a].children(), other.bvh.nodes[b].children()) {
                (None, None) => {
                    if let (Some(ea), Some(eb)) = (
                        self.bvh.nodes[a].element_index(),
                        other.bvh.nodes[b].element_index(),
                    ) {
                        pairs.push((ea, eb));
                    }
                }
                (Some((al, ar)), None) => {
                    stack.push((ar, b));
                    stack.push((al, b));
                }
                (None, Some((bl, br))) => {
                    stack.push((a, br));
                    stack.push((a, bl));
                }
                (Some((al, ar)), Some((bl, br))) => {
                    stack.push((ar, br));
                    stack.push((ar, bl));
                    stack.push((al, br));
                    stack.push((al, bl));
                }
            }
        }
        pairs
    }

    /// Returns every pair `(a, b)`, `a < b`, of distinct elements whose leaf volumes
    /// intersect.
    pub fn self_intersecting_pairs(&self) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        if self.bvh.nodes.is_empty() {
            return pairs;
        }
        let nodes = &self.bvh.nodes;
        let mut stack = vec![(0, 0)];
        while let Some((a, b)) = stack.pop() {
            if a == b {
                // A subtree against itself: both halves, then the halves against each other.
                if let Some((l, r)) = nodes[a].children() {
                    stack.push((l, r));
                    stack.push((r, r));
                    stack.push((l, l));
                }
                continue;
            }
            if !self.volumes[a].intersects(&self.volumes[b]) {
                continue;
            }
            match (nodes[a].children(), nodes[b].children()) {
                (None, None) => {
                    if let (Some(ea), Some(eb)) = (nodes[a].element_index(), nodes[b].element_index())
                    {
                        pairs.push((ea.min(eb), ea.max(eb)));
                    }
                }
                (Some((al, ar)), None) => {
                    stack.push((ar, b));
                    stack.push((al, b));
                }
                (None, Some((bl, br))) => {
                    stack.push((a, br));
                    stack.push((a, bl));
                }
                (Some((al, ar)), Some((bl, br))) => {
                    stack.push((ar, br));
                    stack.push((ar, bl));
                    stack.push((al, br));
                    stack.push((al, bl));
                }
            }
        }
        pairs
    }
}
