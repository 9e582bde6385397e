//! This module defines the [`BHValue`] scalar bound and the [`BoundingVolume`] trait,
//! the capability set every per-node volume of a [`Bvh`] has to provide.
//!
//! [`Bvh`]: ../bvh/struct.Bvh.html
//!

use core::fmt::{Debug, Display};

use nalgebra::{ClosedAddAssign, ClosedDivAssign, ClosedMulAssign, ClosedSubAssign, Point, Scalar};
use num_traits::{Float, FromPrimitive, ToPrimitive};

use crate::ray::Ray;

/// Encapsulates the required traits for the scalar type used by the crate.
/// Implemented for `f32` and `f64`.
pub trait BHValue:
    Scalar
    + Copy
    + Float
    + FromPrimitive
    + ToPrimitive
    + ClosedAddAssign
    + ClosedSubAssign
    + ClosedMulAssign
    + ClosedDivAssign
    + Display
    + Send
    + Sync
{
}

impl<T> BHValue for T where
    T: Scalar
        + Copy
        + Float
        + FromPrimitive
        + ToPrimitive
        + ClosedAddAssign
        + ClosedSubAssign
        + ClosedMulAssign
        + ClosedDivAssign
        + Display
        + Send
        + Sync
{
}

/// The capability set of a bounding volume stored per node of a [`Bvh`].
///
/// The hierarchy never looks inside a volume, it only calls these methods. Both the
/// propagation pass and every query are therefore generic over the concrete shape;
/// the crate ships [`Aabb`] and [`Ball`].
///
/// An empty volume (see [`BoundingVolume::empty`]) contains nothing, intersects nothing,
/// is the identity of [`BoundingVolume::join_mut`] and reports the distance range
/// `(+inf, +inf)`.
///
/// All predicates are inclusive: a point on the boundary is contained and a ray grazing
/// the boundary intersects.
///
/// [`Bvh`]: ../bvh/struct.Bvh.html
/// [`Aabb`]: ../aabb/struct.Aabb.html
/// [`Ball`]: ../ball/struct.Ball.html
///
pub trait BoundingVolume<T: BHValue, const D: usize>: Clone + Debug {
    /// Creates an empty volume.
    fn empty() -> Self;

    /// Returns true if this volume contains no point at all.
    fn is_empty(&self) -> bool;

    /// Grows this volume so that it contains the ball of radius `margin` around `point`.
    fn grow_with_margin(&mut self, point: &Point<T, D>, margin: T);

    /// Grows this volume so that it contains `other`.
    fn join_mut(&mut self, other: &Self);

    /// Returns true if `point` lies inside or on the boundary of this volume.
    fn contains_point(&self, point: &Point<T, D>) -> bool;

    /// Returns true if `other` lies inside this volume, up to `epsilon`.
    /// Every volume contains an empty `other`.
    fn contains_volume(&self, other: &Self, epsilon: T) -> bool;

    /// Returns true if this volume and `other` share at least one point.
    fn intersects(&self, other: &Self) -> bool;

    /// Returns true if the ray (parameter `t >= 0`) hits this volume.
    fn intersects_ray(&self, ray: &Ray<T, D>) -> bool;

    /// Returns true if the infinite line through `line.origin` along `line.direction`
    /// hits this volume.
    fn intersects_line(&self, line: &Ray<T, D>) -> bool;

    /// Returns `(min, max)`: lower and upper bounds for the distance from `point`
    /// to anything enclosed by this volume.
    fn distance_range(&self, point: &Point<T, D>) -> (T, T);

    /// Returns a new volume containing both this volume and `other`.
    fn join(&self, other: &Self) -> Self {
        let mut joint = self.clone();
        joint.join_mut(other);
        joint
    }
}
