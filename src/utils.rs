//! Utilities module.

use nalgebra::Point;

use crate::aabb::Aabb;
use crate::bounding_hierarchy::BHValue;
use crate::error::BvhError;

/// Fast floating point minimum.  This function matches the semantics of
///
/// ```no_compile
/// if x < y { x } else { y }
/// ```
///
/// which has efficient instruction sequences on many platforms (1 instruction on x86).  For most
/// values, it matches the semantics of `x.min(y)`; the special cases are:
///
/// ```text
/// min(-0.0, +0.0); +0.0
/// min(+0.0, -0.0): -0.0
/// min( NaN,  1.0):  1.0
/// min( 1.0,  NaN):  NaN
/// ```
///
/// Note: This exists because [`std::cmp::min`] requires Ord which floating point types do not satisfy
#[inline(always)]
pub fn fast_min<T: Copy + PartialOrd>(x: T, y: T) -> T {
    if x < y {
        x
    } else {
        y
    }
}

/// Fast floating point maximum.  This function matches the semantics of
///
/// ```no_compile
/// if x > y { x } else { y }
/// ```
///
/// which has efficient instruction sequences on many platforms (1 instruction on x86).  For most
/// values, it matches the semantics of `x.max(y)`; the special cases are:
///
/// ```text
/// max(-0.0, +0.0); +0.0
/// max(+0.0, -0.0): -0.0
/// max( NaN,  1.0):  1.0
/// max( 1.0,  NaN):  NaN
/// ```
///
/// Note: This exists because [`std::cmp::max`] requires Ord which floating point types do not satisfy
#[inline(always)]
pub fn fast_max<T: Copy + PartialOrd>(x: T, y: T) -> T {
    if x > y {
        x
    } else {
        y
    }
}

/// Converts an `f64` constant into `T`.
#[inline(always)]
pub(crate) fn cast<T: BHValue>(value: f64) -> T {
    T::from_f64(value).unwrap_or_else(T::nan)
}

/// Squared euclidean distance between two points.
#[inline]
pub(crate) fn distance_squared<T: BHValue, const D: usize>(a: &Point<T, D>, b: &Point<T, D>) -> T {
    let mut sum = T::zero();
    for i in 0..D {
        let d = a[i] - b[i];
        sum += d * d;
    }
    sum
}

/// Reads point `index` out of a flat `xyz` coordinate array.
///
/// # Panics
///
/// Panics if `coords` has fewer than `3 * index + 3` entries.
#[inline]
pub(crate) fn point_at<T: BHValue>(coords: &[T], index: usize) -> Point<T, 3> {
    Point::from([coords[index * 3], coords[index * 3 + 1], coords[index * 3 + 2]])
}

/// Returns the number of points held by a flat `xyz` coordinate array.
pub(crate) fn flat_point_count<T>(coords: &[T]) -> Result<usize, BvhError> {
    if coords.len() % 3 != 0 {
        return Err(BvhError::RaggedCoordinates {
            len: coords.len(),
            dim: 3,
        });
    }
    Ok(coords.len() / 3)
}

/// Converts a flat `xyz` coordinate array into points.
///
/// # Examples
/// ```
/// use mortonbvh::utils::points_from_flat;
///
/// let points = points_from_flat(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
/// assert_eq!(points.len(), 2);
/// assert_eq!(points[1].z, 5.0);
/// assert!(points_from_flat(&[0.0, 1.0]).is_err());
/// ```
pub fn points_from_flat<T: BHValue>(coords: &[T]) -> Result<Vec<Point<T, 3>>, BvhError> {
    let count = flat_point_count(coords)?;
    Ok((0..count).map(|i| point_at(coords, i)).collect())
}

/// Returns the joint [`Aabb`] of all `points`, empty if there are none.
pub fn joint_aabb_of_points<T: BHValue, const D: usize>(points: &[Point<T, D>]) -> Aabb<T, D> {
    let mut aabb = Aabb::empty();
    for point in points {
        aabb.grow_mut(point);
    }
    aabb
}
