//! Balls, including circles and spheres.

use nalgebra::Point;

use crate::bounding_hierarchy::{BHValue, BoundingVolume};
use crate::ray::Ray;
use crate::utils::{cast, distance_squared, fast_max};

/// In 2D, a circle. In 3D, a sphere. Can be used as the per-node volume of a [`Bvh`].
///
/// A ball with a negative radius is empty.
///
/// [`Bvh`]: ../bvh/struct.Bvh.html
///
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Ball<T: BHValue, const D: usize> {
    /// The center of the ball.
    pub center: Point<T, D>,
    /// The radius of the ball.
    pub radius: T,
}

impl<T: BHValue, const D: usize> Ball<T, D> {
    /// Creates a [`Ball`] with the given `center` and `radius`.
    ///
    /// # Panics
    /// Panics, in debug mode, if the radius is negative.
    ///
    /// # Examples
    /// ```
    /// use mortonbvh::ball::Ball;
    /// use nalgebra::Point3;
    ///
    /// let ball = Ball::new(Point3::new(1.0, 1.0, 1.0), 1.0);
    /// assert_eq!(ball.center, Point3::new(1.0, 1.0, 1.0));
    /// assert_eq!(ball.radius, 1.0)
    /// ```
    ///
    /// [`Ball`]: struct.Ball.html
    pub fn new(center: Point<T, D>, radius: T) -> Self {
        debug_assert!(radius >= T::zero());
        Self { center, radius }
    }

    /// Creates an empty [`Ball`], the identity of [`Ball::join`].
    ///
    /// [`Ball`]: struct.Ball.html
    /// [`Ball::join`]: struct.Ball.html#method.join
    pub fn empty() -> Self {
        Self {
            center: Point::origin(),
            radius: -T::one(),
        }
    }

    /// Returns true if this [`Ball`] holds no point.
    pub fn is_empty(&self) -> bool {
        !(self.radius >= T::zero())
    }

    /// Returns true if this [`Ball`] contains the [`Point`].
    ///
    /// # Examples
    /// ```
    /// use mortonbvh::ball::Ball;
    /// use nalgebra::Point3;
    ///
    /// let ball = Ball::new(Point3::new(1.0, 1.0, 1.0), 1.0);
    /// let point = Point3::new(1.25, 1.25, 1.25);
    ///
    /// assert!(ball.contains(&point));
    /// ```
    ///
    /// [`Ball`]: struct.Ball.html
    pub fn contains(&self, point: &Point<T, D>) -> bool {
        if self.is_empty() {
            return false;
        }
        // Squaring the RHS is faster than computing the square root of the LHS.
        distance_squared(point, &self.center) <= self.radius.powi(2)
    }

    /// Returns the smallest [`Ball`] enclosing both `self` and `other`. The radius is rounded
    /// up by a few ulps, so both inputs stay inside under float comparisons.
    ///
    /// # Examples
    /// ```
    /// use mortonbvh::ball::Ball;
    /// use nalgebra::Point3;
    ///
    /// let a = Ball::new(Point3::new(-1.0, 0.0, 0.0), 1.0);
    /// let b = Ball::new(Point3::new(2.0, 0.0, 0.0), 1.0);
    /// let joint = a.join(&b);
    ///
    /// assert_eq!(joint.center, Point3::new(0.5, 0.0, 0.0));
    /// assert!(joint.radius >= 2.5 && joint.radius < 2.5 + 1e-12);
    /// ```
    ///
    /// [`Ball`]: struct.Ball.html
    pub fn join(&self, other: &Ball<T, D>) -> Ball<T, D> {
        let mut joint = *self;
        joint.join_mut(other);
        joint
    }

    /// Mutable version of [`Ball::join`].
    ///
    /// [`Ball::join`]: struct.Ball.html#method.join
    pub fn join_mut(&mut self, other: &Ball<T, D>) {
        if other.is_empty() {
            return;
        }
        if self.is_empty() {
            *self = *other;
            return;
        }
        // Rounding slack, so that everything inside a child stays inside its ancestors.
        let grow = T::one() + T::epsilon() * cast::<T>(16.0);
        let distance = distance_squared(&self.center, &other.center).sqrt();
        if (distance + other.radius) * grow <= self.radius {
            return;
        }
        if (distance + self.radius) * grow <= other.radius {
            *self = *other;
            return;
        }
        let radius = (distance + self.radius + other.radius) / (T::one() + T::one());
        let center = if distance > T::zero() {
            self.center + (other.center - self.center) * ((radius - self.radius) / distance)
        } else {
            self.center
        };
        // The new center is rounded, so measure the reach of both inputs from it again.
        let reach_self = distance_squared(&center, &self.center).sqrt() + self.radius;
        let reach_other = distance_squared(&center, &other.center).sqrt() + other.radius;
        self.center = center;
        self.radius = fast_max(radius, fast_max(reach_self, reach_other)) * grow;
    }
}

impl<T: BHValue, const D: usize> BoundingVolume<T, D> for Ball<T, D> {
    fn empty() -> Self {
        Ball::empty()
    }

    fn is_empty(&self) -> bool {
        Ball::is_empty(self)
    }

    fn grow_with_margin(&mut self, point: &Point<T, D>, margin: T) {
        self.join_mut(&Ball::new(*point, fast_max(margin, T::zero())));
    }

    fn join_mut(&mut self, other: &Self) {
        Ball::join_mut(self, other);
    }

    fn contains_point(&self, point: &Point<T, D>) -> bool {
        self.contains(point)
    }

    fn contains_volume(&self, other: &Self, epsilon: T) -> bool {
        if other.is_empty() {
            return true;
        }
        if self.is_empty() {
            return false;
        }
        distance_squared(&self.center, &other.center).sqrt() + other.radius <= self.radius + epsilon
    }

    fn intersects(&self, other: &Self) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        let reach = self.radius + other.radius;
        distance_squared(&self.center, &other.center) <= reach * reach
    }

    fn intersects_ray(&self, ray: &Ray<T, D>) -> bool {
        let t = fast_max(ray.closest_parameter(&self.center), T::zero());
        self.contains(&ray.point_at(t))
    }

    fn intersects_line(&self, line: &Ray<T, D>) -> bool {
        let t = line.closest_parameter(&self.center);
        self.contains(&line.point_at(t))
    }

    fn distance_range(&self, point: &Point<T, D>) -> (T, T) {
        if self.is_empty() {
            return (T::infinity(), T::infinity());
        }
        let distance = distance_squared(point, &self.center).sqrt();
        (
            fast_max(distance - self.radius, T::zero()),
            distance + self.radius,
        )
    }
}
