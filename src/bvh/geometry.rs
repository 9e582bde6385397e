//! Bounding volume propagation: leaf volumes come from the element geometry, branch
//! volumes are the join of their children.

use core::marker::PhantomData;

use nalgebra::Point;

use crate::bounding_hierarchy::{BHValue, BoundingVolume};
use crate::bvh::{Bvh, BvhNode};
use crate::error::BvhError;
use crate::utils::{cast, flat_point_count, point_at};

/// Margin added around swept triangles when none is given.
pub const DEFAULT_SWEEP_MARGIN: f64 = 1e-10;

/// Describes the volume enclosing each element of a hierarchy.
pub trait LeafGeometry<T: BHValue, const D: usize, BV: BoundingVolume<T, D>> {
    /// Number of elements.
    fn element_count(&self) -> usize;

    /// The volume enclosing `element`.
    fn leaf_volume(&self, element: usize) -> BV;
}

/// Mesh elements with a fixed number of vertices, given as flat `xyz` coordinates and a
/// flat element-to-vertex index array.
#[derive(Debug, Clone, Copy)]
pub struct MeshElements<'a, T: BHValue> {
    coords: &'a [T],
    elements: &'a [usize],
    nodes_per_element: usize,
    margin: T,
}

impl<'a, T: BHValue> MeshElements<'a, T> {
    /// Validates the arrays: `coords` holds whole points, `elements` whole elements and
    /// every vertex index names a point.
    ///
    /// # Examples
    /// ```
    /// use mortonbvh::aabb::Aabb;
    /// use mortonbvh::bvh::{Bvh, MeshElements};
    /// use nalgebra::Point3;
    ///
    /// let coords = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 1.0];
    /// let triangles = [0, 1, 2, 1, 3, 2];
    /// let mesh = MeshElements::new(&coords, &triangles, 3, 0.0).unwrap();
    ///
    /// let centers = vec![Point3::new(0.3, 0.3, 0.0), Point3::new(0.6, 0.6, 0.3)];
    /// let bvh = Bvh::build_morton(&centers);
    /// let volumes: Vec<Aabb<f64, 3>> = bvh.build_volumes(&mesh).unwrap();
    ///
    /// assert_eq!(volumes[0], Aabb::with_bounds(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0)));
    /// ```
    pub fn new(
        coords: &'a [T],
        elements: &'a [usize],
        nodes_per_element: usize,
        margin: T,
    ) -> Result<Self, BvhError> {
        let point_count = flat_point_count(coords)?;
        if nodes_per_element == 0 || elements.len() % nodes_per_element != 0 {
            return Err(BvhError::RaggedElements {
                len: elements.len(),
                nodes_per_element,
            });
        }
        if let Some(&index) = elements.iter().find(|&&v| v >= point_count) {
            return Err(BvhError::IndexOutOfBounds {
                index,
                len: point_count,
            });
        }
        Ok(MeshElements {
            coords,
            elements,
            nodes_per_element,
            margin,
        })
    }
}

impl<'a, T: BHValue, BV: BoundingVolume<T, 3>> LeafGeometry<T, 3, BV> for MeshElements<'a, T> {
    fn element_count(&self) -> usize {
        self.elements.len() / self.nodes_per_element
    }

    fn leaf_volume(&self, element: usize) -> BV {
        let start = element * self.nodes_per_element;
        let mut volume = BV::empty();
        for &vertex in &self.elements[start..start + self.nodes_per_element] {
            volume.grow_with_margin(&point_at(self.coords, vertex), self.margin);
        }
        volume
    }
}

/// A point cloud given as flat `xyz` coordinates; every point is one element.
#[derive(Debug, Clone, Copy)]
pub struct PointCloud<'a, T: BHValue> {
    coords: &'a [T],
    margin: T,
}

impl<'a, T: BHValue> PointCloud<'a, T> {
    /// Validates that `coords` holds whole points.
    pub fn new(coords: &'a [T], margin: T) -> Result<Self, BvhError> {
        flat_point_count(coords)?;
        Ok(PointCloud { coords, margin })
    }
}

impl<'a, T: BHValue, BV: BoundingVolume<T, 3>> LeafGeometry<T, 3, BV> for PointCloud<'a, T> {
    fn element_count(&self) -> usize {
        self.coords.len() / 3
    }

    fn leaf_volume(&self, element: usize) -> BV {
        let mut volume = BV::empty();
        volume.grow_with_margin(&point_at(self.coords, element), self.margin);
        volume
    }
}

/// Triangles moving linearly over a time step: each leaf encloses the triangle at the
/// start positions `x` and at `x + dt * v`.
#[derive(Debug, Clone, Copy)]
pub struct SweptTriangles<'a, T: BHValue> {
    coords: &'a [T],
    velocities: &'a [T],
    triangles: &'a [usize],
    dt: T,
    margin: T,
}

impl<'a, T: BHValue> SweptTriangles<'a, T> {
    /// Validates the arrays. The margin defaults to [`DEFAULT_SWEEP_MARGIN`].
    ///
    /// [`DEFAULT_SWEEP_MARGIN`]: constant.DEFAULT_SWEEP_MARGIN.html
    pub fn new(
        coords: &'a [T],
        velocities: &'a [T],
        triangles: &'a [usize],
        dt: T,
    ) -> Result<Self, BvhError> {
        let point_count = flat_point_count(coords)?;
        if velocities.len() != coords.len() {
            return Err(BvhError::LengthMismatch {
                expected: coords.len(),
                found: velocities.len(),
            });
        }
        if triangles.len() % 3 != 0 {
            return Err(BvhError::RaggedElements {
                len: triangles.len(),
                nodes_per_element: 3,
            });
        }
        if let Some(&index) = triangles.iter().find(|&&v| v >= point_count) {
            return Err(BvhError::IndexOutOfBounds {
                index,
                len: point_count,
            });
        }
        Ok(SweptTriangles {
            coords,
            velocities,
            triangles,
            dt,
            margin: cast(DEFAULT_SWEEP_MARGIN),
        })
    }

    /// Replaces the margin.
    pub fn with_margin(mut self, margin: T) -> Self {
        self.margin = margin;
        self
    }
}

impl<'a, T: BHValue, BV: BoundingVolume<T, 3>> LeafGeometry<T, 3, BV>
    for SweptTriangles<'a, T>
{
    fn element_count(&self) -> usize {
        self.triangles.len() / 3
    }

    fn leaf_volume(&self, element: usize) -> BV {
        let mut volume = BV::empty();
        for &vertex in &self.triangles[element * 3..element * 3 + 3] {
            let start = point_at(self.coords, vertex);
            let velocity = point_at(self.velocities, vertex);
            let end = Point::from(start.coords + velocity.coords * self.dt);
            volume.grow_with_margin(&start, self.margin);
            volume.grow_with_margin(&end, self.margin);
        }
        volume
    }
}

/// Per-element volumes computed by the caller, e.g. spheres around moving rod segments.
#[derive(Debug, Clone, Copy)]
pub struct ElementVolumes<'a, T: BHValue, const D: usize, BV: BoundingVolume<T, D>> {
    volumes: &'a [BV],
    _marker: PhantomData<fn() -> T>,
}

impl<'a, T: BHValue, const D: usize, BV: BoundingVolume<T, D>> ElementVolumes<'a, T, D, BV> {
    /// Wraps one volume per element.
    pub fn new(volumes: &'a [BV]) -> Self {
        ElementVolumes {
            volumes,
            _marker: PhantomData,
        }
    }
}

impl<'a, T: BHValue, const D: usize, BV: BoundingVolume<T, D>> LeafGeometry<T, D, BV>
    for ElementVolumes<'a, T, D, BV>
{
    fn element_count(&self) -> usize {
        self.volumes.len()
    }

    fn leaf_volume(&self, element: usize) -> BV {
        self.volumes[element].clone()
    }
}

impl Bvh {
    /// Computes one bounding volume per node: leaves from `geometry`, branches as the
    /// join of their children.
    ///
    /// Fails if the element count of `geometry` differs from the number of leaves or a
    /// leaf names an element `geometry` does not have.
    pub fn build_volumes<T, const D: usize, BV, G>(&self, geometry: &G) -> Result<Vec<BV>, BvhError>
    where
        T: BHValue,
        BV: BoundingVolume<T, D>,
        G: LeafGeometry<T, D, BV>,
    {
        let element_count = geometry.element_count();
        if self.element_count() != element_count {
            return Err(BvhError::LengthMismatch {
                expected: self.element_count(),
                found: element_count,
            });
        }
        let mut volumes = vec![BV::empty(); self.nodes.len()];
        for (node, volume) in self.nodes.iter().zip(volumes.iter_mut()) {
            if let BvhNode::Leaf { element_index, .. } = *node {
                if element_index >= element_count {
                    return Err(BvhError::IndexOutOfBounds {
                        index: element_index,
                        len: element_count,
                    });
                }
                *volume = geometry.leaf_volume(element_index);
            }
        }
        self.refit_branches::<T, D, BV>(&mut volumes)?;
        log::debug!("propagated {} bounding volumes", volumes.len());
        Ok(volumes)
    }

    /// Recomputes every branch volume as the join of its children, keeping the leaf
    /// volumes. Children are visited before their parents.
    pub fn refit_branches<T, const D: usize, BV>(&self, volumes: &mut [BV]) -> Result<(), BvhError>
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
        for &node_index in self.preorder().iter().rev() {
            if let Some((child_l, child_r)) = self.nodes[node_index].children() {
                volumes[node_index] = volumes[child_l].join(&volumes[child_r]);
            }
        }
        Ok(())
    }

    /// Verifies that every branch volume contains the volumes of both children, up to
    /// `epsilon`.
    pub fn check_volumes<T, const D: usize, BV>(
        &self,
        volumes: &[BV],
        epsilon: T,
    ) -> Result<(), BvhError>
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
        for (parent, node) in self.nodes.iter().enumerate() {
            if let Some((child_l, child_r)) = node.children() {
                for child in [child_l, child_r] {
                    if !volumes[parent].contains_volume(&volumes[child], epsilon) {
                        return Err(BvhError::VolumeNotContained { parent, child });
                    }
                }
            }
        }
        Ok(())
    }
}
