//! Axis Aligned Bounding Boxes.

use core::fmt;

use nalgebra::{Point, SVector};

use crate::bounding_hierarchy::BHValue;
use crate::utils::{cast, fast_max, fast_min};

/// [`Aabb`] struct.
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Aabb<T: BHValue, const D: usize> {
    /// Minimum coordinates
    pub min: Point<T, D>,

    /// Maximum coordinates
    pub max: Point<T, D>,
}

impl<T: BHValue + fmt::Display, const D: usize> fmt::Display for Aabb<T, D> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Min bound: {}; Max bound: {}", self.min, self.max)
    }
}

impl<T: BHValue, const D: usize> Aabb<T, D> {
    /// Creates a new [`Aabb`] with the given bounds.
    ///
    /// # Examples
    /// ```
    /// use mortonbvh::aabb::Aabb;
    /// use nalgebra::Point3;
    ///
    /// let aabb = Aabb::with_bounds(Point3::new(-1.0,-1.0,-1.0), Point3::new(1.0,1.0,1.0));
    /// assert_eq!(aabb.min.x, -1.0);
    /// assert_eq!(aabb.max.z, 1.0);
    /// ```
    ///
    /// [`Aabb`]: struct.Aabb.html
    ///
    pub fn with_bounds(min: Point<T, D>, max: Point<T, D>) -> Self {
        Aabb { min, max }
    }

    /// Creates a new empty [`Aabb`].
    ///
    /// The bounds are `+inf` / `-inf`, so that joining anything into it yields that thing.
    ///
    /// # Examples
    /// ```
    /// use mortonbvh::aabb::Aabb;
    ///
    /// let aabb = Aabb::<f32, 3>::empty();
    /// assert!(aabb.is_empty());
    /// ```
    ///
    /// [`Aabb`]: struct.Aabb.html
    ///
    pub fn empty() -> Self {
        Self {
            min: Point::from([T::infinity(); D]),
            max: Point::from([T::neg_infinity(); D]),
        }
    }

    /// Returns true if the [`Aabb`] is empty, that is if some minimum bound exceeds its
    /// maximum bound. A degenerate box with `min == max` is not empty.
    ///
    /// [`Aabb`]: struct.Aabb.html
    ///
    pub fn is_empty(&self) -> bool {
        (0..D).any(|i| !(self.min[i] <= self.max[i]))
    }

    /// Returns true if the [`Point`] is inside the [`Aabb`] or on its boundary.
    ///
    /// # Examples
    /// ```
    /// use mortonbvh::aabb::Aabb;
    /// use nalgebra::Point3;
    ///
    /// let aabb = Aabb::with_bounds(Point3::new(-1.0,-1.0,-1.0), Point3::new(1.0,1.0,1.0));
    /// assert!(aabb.contains(&Point3::new(0.0, 1.0, -1.0)));
    /// assert!(!aabb.contains(&Point3::new(0.0, 1.1, 0.0)));
    /// ```
    ///
    /// [`Aabb`]: struct.Aabb.html
    /// [`Point`]: nalgebra::Point
    ///
    pub fn contains(&self, p: &Point<T, D>) -> bool {
        (0..D).all(|i| p[i] >= self.min[i] && p[i] <= self.max[i])
    }

    /// Returns true if the [`Point`] is inside the [`Aabb`] or at most `epsilon` outside of
    /// it on every axis. With `epsilon == 0` this is [`Aabb::contains`].
    ///
    /// [`Aabb`]: struct.Aabb.html
    /// [`Aabb::contains`]: struct.Aabb.html#method.contains
    /// [`Point`]: nalgebra::Point
    ///
    pub fn approx_contains_eps(&self, p: &Point<T, D>, epsilon: T) -> bool {
        (0..D).all(|i| (p[i] - self.min[i]) >= -epsilon && (p[i] - self.max[i]) <= epsilon)
    }

    /// Returns true if the `other` [`Aabb`] is approximately inside this [`Aabb`]
    /// with respect to some `epsilon`. An empty `other` is always contained.
    ///
    /// [`Aabb`]: struct.Aabb.html
    ///
    pub fn approx_contains_aabb_eps(&self, other: &Aabb<T, D>, epsilon: T) -> bool {
        other.is_empty()
            || (self.approx_contains_eps(&other.min, epsilon)
                && self.approx_contains_eps(&other.max, epsilon))
    }

    /// Returns a new minimal [`Aabb`] which contains both this [`Aabb`] and `other`.
    ///
    /// # Examples
    /// ```
    /// use mortonbvh::aabb::Aabb;
    /// use nalgebra::Point3;
    ///
    /// let aabb1 = Aabb::with_bounds(Point3::new(-101.0, 0.0, 0.0), Point3::new(-100.0, 1.0, 1.0));
    /// let aabb2 = Aabb::with_bounds(Point3::new(100.0, 0.0, 0.0), Point3::new(101.0, 1.0, 1.0));
    /// let joint = aabb1.join(&aabb2);
    ///
    /// assert_eq!(joint.min, Point3::new(-101.0, 0.0, 0.0));
    /// assert_eq!(joint.max, Point3::new(101.0, 1.0, 1.0));
    /// ```
    ///
    /// [`Aabb`]: struct.Aabb.html
    ///
    pub fn join(&self, other: &Aabb<T, D>) -> Aabb<T, D> {
        let mut joint = *self;
        joint.join_mut(other);
        joint
    }

    /// Mutable version of [`Aabb::join`].
    ///
    /// [`Aabb::join`]: struct.Aabb.html#method.join
    ///
    pub fn join_mut(&mut self, other: &Aabb<T, D>) {
        for i in 0..D {
            self.min[i] = fast_min(self.min[i], other.min[i]);
            self.max[i] = fast_max(self.max[i], other.max[i]);
        }
    }

    /// Returns a new minimal [`Aabb`] which contains both this [`Aabb`] and the [`Point`] `other`.
    ///
    /// [`Aabb`]: struct.Aabb.html
    /// [`Point`]: nalgebra::Point
    ///
    pub fn grow(&self, other: &Point<T, D>) -> Aabb<T, D> {
        let mut grown = *self;
        grown.grow_mut(other);
        grown
    }

    /// Mutable version of [`Aabb::grow`].
    ///
    /// [`Aabb::grow`]: struct.Aabb.html#method.grow
    ///
    pub fn grow_mut(&mut self, other: &Point<T, D>) {
        for i in 0..D {
            self.min[i] = fast_min(self.min[i], other[i]);
            self.max[i] = fast_max(self.max[i], other[i]);
        }
    }

    /// Grows this [`Aabb`] so that it contains the cube of half-width `margin` around `point`.
    /// A negative margin counts as zero.
    ///
    /// [`Aabb`]: struct.Aabb.html
    ///
    pub fn grow_with_margin_mut(&mut self, point: &Point<T, D>, margin: T) {
        let margin = fast_max(margin, T::zero());
        for i in 0..D {
            self.min[i] = fast_min(self.min[i], point[i] - margin);
            self.max[i] = fast_max(self.max[i], point[i] + margin);
        }
    }

    /// Returns the size of this [`Aabb`] in all dimensions.
    ///
    /// [`Aabb`]: struct.Aabb.html
    ///
    pub fn size(&self) -> SVector<T, D> {
        SVector::from_fn(|i, _| self.max[i] - self.min[i])
    }

    /// Returns the center [`Point`] of the [`Aabb`].
    ///
    /// [`Aabb`]: struct.Aabb.html
    /// [`Point`]: nalgebra::Point
    ///
    pub fn center(&self) -> Point<T, D> {
        let half = cast::<T>(0.5);
        Point::from(SVector::from_fn(|i, _| self.min[i] + (self.max[i] - self.min[i]) * half))
    }

    /// Returns the axis along which the [`Aabb`] is stretched the most.
    /// Ties resolve to the lowest axis.
    ///
    /// # Examples
    /// ```
    /// use mortonbvh::aabb::Aabb;
    /// use nalgebra::Point3;
    ///
    /// let aabb = Aabb::with_bounds(Point3::new(-100.0,0.0,0.0), Point3::new(100.0,0.0,0.0));
    /// assert_eq!(aabb.largest_axis(), 0);
    /// ```
    ///
    /// [`Aabb`]: struct.Aabb.html
    ///
    pub fn largest_axis(&self) -> usize {
        let mut axis = 0;
        let mut largest = self.max[0] - self.min[0];
        for i in 1..D {
            let extent = self.max[i] - self.min[i];
            if extent > largest {
                largest = extent;
                axis = i;
            }
        }
        axis
    }

    /// Returns `(min, max)`: the distance from `point` to the closest point of the [`Aabb`]
    /// (zero inside) and to its farthest corner.
    ///
    /// # Examples
    /// ```
    /// use mortonbvh::aabb::Aabb;
    /// use nalgebra::Point3;
    ///
    /// let aabb = Aabb::with_bounds(Point3::new(1.0, 0.0, 0.0), Point3::new(2.0, 0.0, 0.0));
    /// assert_eq!(aabb.distance_range(&Point3::origin()), (1.0, 2.0));
    /// ```
    ///
    /// [`Aabb`]: struct.Aabb.html
    ///
    pub fn distance_range(&self, point: &Point<T, D>) -> (T, T) {
        if self.is_empty() {
            return (T::infinity(), T::infinity());
        }
        let mut near = T::zero();
        let mut far = T::zero();
        for i in 0..D {
            let below = self.min[i] - point[i];
            let above = point[i] - self.max[i];
            let outside = fast_max(fast_max(below, above), T::zero());
            near += outside * outside;
            let farthest = fast_max(below.abs(), above.abs());
            far += farthest * farthest;
        }
        (near.sqrt(), far.sqrt())
    }
}
