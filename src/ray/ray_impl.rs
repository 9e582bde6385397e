//! This module defines a Ray structure and its intersection with axis aligned bounding boxes,
//! both as a half-line (ray) and as an infinite line.

use nalgebra::{Point, SVector};

use crate::aabb::Aabb;
use crate::bounding_hierarchy::BHValue;
use crate::utils::{fast_max, fast_min};

/// A struct which defines a ray and some of its cached values.
///
/// The same type describes an infinite line for the line queries; only the accepted
/// parameter interval differs (`t >= 0` for rays, any `t` for lines).
#[derive(Debug, Clone, Copy)]
pub struct Ray<T: BHValue, const D: usize> {
    /// The ray origin.
    pub origin: Point<T, D>,

    /// The ray direction. Not normalized; a zero component means the ray is parallel
    /// to that axis.
    pub direction: SVector<T, D>,

    /// Inverse (1/x) ray direction. Cached for use in [`Aabb`] intersections.
    ///
    /// [`Aabb`]: ../aabb/struct.Aabb.html
    ///
    pub inv_direction: SVector<T, D>,
}

impl<T: BHValue, const D: usize> Ray<T, D> {
    /// Creates a new [`Ray`] from an `origin` and a `direction`.
    ///
    /// The direction is kept as given. A zero direction is allowed: such a ray only
    /// intersects volumes containing its origin.
    ///
    /// # Examples
    /// ```
    /// use mortonbvh::ray::Ray;
    /// use nalgebra::{Point3,Vector3};
    ///
    /// let origin = Point3::new(0.0,0.0,0.0);
    /// let direction = Vector3::new(2.0,0.0,0.0);
    /// let ray = Ray::new(origin, direction);
    ///
    /// assert_eq!(ray.origin, origin);
    /// assert_eq!(ray.direction, direction);
    /// assert_eq!(ray.inv_direction.x, 0.5);
    /// ```
    ///
    /// [`Ray`]: struct.Ray.html
    ///
    pub fn new(origin: Point<T, D>, direction: SVector<T, D>) -> Ray<T, D> {
        Ray {
            origin,
            direction,
            inv_direction: direction.map(|x| T::one() / x),
        }
    }

    /// Returns the point `origin + t * direction`.
    pub fn point_at(&self, t: T) -> Point<T, D> {
        Point::from(SVector::from_fn(|i, _| self.origin[i] + self.direction[i] * t))
    }

    /// Returns the (unclamped) parameter of the point on the line closest to `point`.
    /// Zero for a zero direction.
    pub fn closest_parameter(&self, point: &Point<T, D>) -> T {
        let mut along = T::zero();
        let mut length_squared = T::zero();
        for i in 0..D {
            along += (point[i] - self.origin[i]) * self.direction[i];
            length_squared += self.direction[i] * self.direction[i];
        }
        if length_squared > T::zero() {
            along / length_squared
        } else {
            T::zero()
        }
    }

    /// Clips the parameter interval `[t_min, +inf)` against the slabs of `aabb`.
    /// Returns the remaining `(entry, exit)` parameters or `None` if it is empty.
    /// The bounds are inclusive, so grazing contacts count as hits.
    fn clip_to_aabb(&self, aabb: &Aabb<T, D>, t_min: T) -> Option<(T, T)> {
        if aabb.is_empty() {
            return None;
        }
        let mut entry = t_min;
        let mut exit = T::infinity();
        for i in 0..D {
            if self.direction[i] == T::zero() {
                // Parallel to this slab: the origin has to lie between its planes.
                if self.origin[i] < aabb.min[i] || self.origin[i] > aabb.max[i] {
                    return None;
                }
                continue;
            }
            let t0 = (aabb.min[i] - self.origin[i]) * self.inv_direction[i];
            let t1 = (aabb.max[i] - self.origin[i]) * self.inv_direction[i];
            let (near, far) = if t0 <= t1 { (t0, t1) } else { (t1, t0) };
            entry = fast_max(entry, near);
            exit = fast_min(exit, far);
            if entry > exit {
                return None;
            }
        }
        Some((entry, exit))
    }

    /// Tests the intersection of a [`Ray`] with an [`Aabb`] using the slab method.
    ///
    /// # Examples
    /// ```
    /// use mortonbvh::aabb::Aabb;
    /// use mortonbvh::ray::Ray;
    /// use nalgebra::{Point3,Vector3};
    ///
    /// let origin = Point3::new(0.0,0.0,0.0);
    /// let direction = Vector3::new(1.0,0.0,0.0);
    /// let ray = Ray::new(origin, direction);
    ///
    /// let point1 = Point3::new(99.9,-1.0,-1.0);
    /// let point2 = Point3::new(100.1,1.0,1.0);
    /// let aabb = Aabb::with_bounds(point1, point2);
    ///
    /// assert!(ray.intersects_aabb(&aabb));
    /// ```
    ///
    /// [`Ray`]: struct.Ray.html
    /// [`Aabb`]: ../aabb/struct.Aabb.html
    ///
    pub fn intersects_aabb(&self, aabb: &Aabb<T, D>) -> bool {
        self.clip_to_aabb(aabb, T::zero()).is_some()
    }

    /// Tests the intersection of the infinite line through the [`Ray`] with an [`Aabb`].
    ///
    /// # Examples
    /// ```
    /// use mortonbvh::aabb::Aabb;
    /// use mortonbvh::ray::Ray;
    /// use nalgebra::{Point3,Vector3};
    ///
    /// let ray = Ray::new(Point3::new(0.0,0.0,0.0), Vector3::new(1.0,0.0,0.0));
    /// let behind = Aabb::with_bounds(Point3::new(-2.0,-1.0,-1.0), Point3::new(-1.0,1.0,1.0));
    ///
    /// assert!(!ray.intersects_aabb(&behind));
    /// assert!(ray.line_intersects_aabb(&behind));
    /// ```
    ///
    /// [`Ray`]: struct.Ray.html
    /// [`Aabb`]: ../aabb/struct.Aabb.html
    ///
    pub fn line_intersects_aabb(&self, aabb: &Aabb<T, D>) -> bool {
        self.clip_to_aabb(aabb, T::neg_infinity()).is_some()
    }

    /// Intersect [`Aabb`] by [`Ray`].
    /// Returns the ray parameters of the entry and exit points, the entry clamped to zero
    /// when the origin lies inside, or `None` if the ray misses.
    ///
    /// [`Ray`]: struct.Ray.html
    /// [`Aabb`]: ../aabb/struct.Aabb.html
    ///
    pub fn intersection_slice_for_aabb(&self, aabb: &Aabb<T, D>) -> Option<(T, T)> {
        self.clip_to_aabb(aabb, T::zero())
    }
}
