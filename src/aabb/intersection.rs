use nalgebra::Point;

use crate::aabb::Aabb;
use crate::bounding_hierarchy::{BHValue, BoundingVolume};
use crate::ray::Ray;

impl<T: BHValue, const D: usize> BoundingVolume<T, D> for Aabb<T, D> {
    fn empty() -> Self {
        Aabb::empty()
    }

    fn is_empty(&self) -> bool {
        Aabb::is_empty(self)
    }

    fn grow_with_margin(&mut self, point: &Point<T, D>, margin: T) {
        self.grow_with_margin_mut(point, margin);
    }

    fn join_mut(&mut self, other: &Self) {
        Aabb::join_mut(self, other);
    }

    fn contains_point(&self, point: &Point<T, D>) -> bool {
        self.contains(point)
    }

    fn contains_volume(&self, other: &Self, epsilon: T) -> bool {
        self.approx_contains_aabb_eps(other, epsilon)
    }

    fn intersects(&self, other: &Self) -> bool {
        for i in 0..D {
            if !(self.max[i] >= other.min[i] && other.max[i] >= self.min[i]) {
                return false;
            }
        }
        true
    }

    fn intersects_ray(&self, ray: &Ray<T, D>) -> bool {
        ray.intersects_aabb(self)
    }

    fn intersects_line(&self, line: &Ray<T, D>) -> bool {
        line.line_intersects_aabb(self)
    }

    fn distance_range(&self, point: &Point<T, D>) -> (T, T) {
        Aabb::distance_range(self, point)
    }
}

#[cfg(test)]
mod tests {
    use crate::bounding_hierarchy::BoundingVolume;
    use crate::testbase::{TAabb3, TPoint3};

    #[test]
    fn test_touching_boxes_intersect() {
        let a = TAabb3::with_bounds(TPoint3::new(0.0, 0.0, 0.0), TPoint3::new(1.0, 1.0, 1.0));
        let b = TAabb3::with_bounds(TPoint3::new(1.0, 0.0, 0.0), TPoint3::new(2.0, 1.0, 1.0));
        let c = TAabb3::with_bounds(TPoint3::new(1.1, 0.0, 0.0), TPoint3::new(2.0, 1.0, 1.0));
        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn test_empty_box_is_inert() {
        let empty = <TAabb3 as BoundingVolume<f32, 3>>::empty();
        let unit = TAabb3::with_bounds(TPoint3::new(0.0, 0.0, 0.0), TPoint3::new(1.0, 1.0, 1.0));
        assert!(!empty.intersects(&unit));
        assert!(!unit.intersects(&empty));
        assert!(unit.contains_volume(&empty, 0.0));
        assert_eq!(BoundingVolume::join(&empty, &unit), unit);
        assert_eq!(
            BoundingVolume::distance_range(&empty, &TPoint3::origin()),
            (f32::INFINITY, f32::INFINITY)
        );
    }
}
