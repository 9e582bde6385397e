//! Morton (Z-order) coding of normalized 3D points, the sorted code index and the
//! longest-common-prefix kernels used by the LBVH builder.
//!
//! A code interleaves three 10-bit quantized coordinates into the low 30 bits of a `u32`,
//! x first: bit `3k + 2` holds bit `k` of x, bit `3k + 1` of y and bit `3k` of z.

use nalgebra::Point;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

use crate::aabb::Aabb;
use crate::bounding_hierarchy::BHValue;
use crate::error::BvhError;
use crate::utils::joint_aabb_of_points;

/// Number of quantization steps per axis.
const RESOLUTION: f64 = 1024.0;

/// Largest quantized coordinate.
const MAX_QUANTIZED: u32 = 1023;

/// Spreads the low 10 bits of `v` so that two zero bits follow every bit.
#[inline]
pub fn expand_bits(v: u32) -> u32 {
    let mut v = v & 0x3ff;
    v = v.wrapping_mul(0x0001_0001) & 0xff00_00ff;
    v = v.wrapping_mul(0x0000_0101) & 0x0f00_f00f;
    v = v.wrapping_mul(0x0000_0011) & 0xc30c_30c3;
    v = v.wrapping_mul(0x0000_0005) & 0x4924_9249;
    v
}

/// Quantizes one coordinate to 10 bits. The flag is false when the input had to be
/// clamped into `[0, 1]`.
#[inline]
fn quantize<T: BHValue>(value: T) -> (u32, bool) {
    let value = value.to_f64().unwrap_or(f64::NAN);
    let in_range = (0.0..=1.0).contains(&value);
    let scaled = value * RESOLUTION;
    let quantized = if scaled >= 0.0 {
        // Saturating cast, 1.0 itself lands on the last cell.
        (scaled as u32).min(MAX_QUANTIZED)
    } else {
        0
    };
    (quantized, in_range)
}

/// Computes the 30-bit Morton code of a point in the unit cube.
///
/// Each coordinate is multiplied by 1024, truncated and clamped into `[0, 1023]`.
/// Coordinates outside `[0, 1]` (and NaN) are clamped with a warning; use
/// [`morton_code_checked`] to reject them instead.
///
/// # Examples
/// ```
/// use mortonbvh::morton::morton_code;
///
/// assert_eq!(morton_code(0.0, 0.0, 0.0), 0);
/// assert_eq!(morton_code(1.0, 1.0, 1.0), 0x3fff_ffff);
/// assert_eq!(morton_code(1.0f64, 0.0, 0.0), 0x2492_4924);
/// ```
///
/// [`morton_code_checked`]: fn.morton_code_checked.html
///
pub fn morton_code<T: BHValue>(x: T, y: T, z: T) -> u32 {
    let (qx, x_ok) = quantize(x);
    let (qy, y_ok) = quantize(y);
    let (qz, z_ok) = quantize(z);
    if !(x_ok && y_ok && z_ok) {
        log::warn!("morton coordinate ({x}, {y}, {z}) lies outside the unit cube and was clamped");
    }
    interleave(qx, qy, qz)
}

/// Computes the Morton code of a point in the unit cube, rejecting coordinates
/// outside `[0, 1]`.
///
/// # Examples
/// ```
/// use mortonbvh::error::BvhError;
/// use mortonbvh::morton::{morton_code, morton_code_checked};
///
/// assert_eq!(morton_code_checked(0.5, 0.25, 1.0), Ok(morton_code(0.5, 0.25, 1.0)));
/// assert_eq!(
///     morton_code_checked(0.5, 1.5, 0.0),
///     Err(BvhError::CoordinateOutOfRange { value: 1.5 })
/// );
/// ```
pub fn morton_code_checked<T: BHValue>(x: T, y: T, z: T) -> Result<u32, BvhError> {
    let mut quantized = [0u32; 3];
    for (slot, value) in quantized.iter_mut().zip([x, y, z]) {
        let (q, in_range) = quantize(value);
        if !in_range {
            return Err(BvhError::CoordinateOutOfRange {
                value: value.to_f64().unwrap_or(f64::NAN),
            });
        }
        *slot = q;
    }
    Ok(interleave(quantized[0], quantized[1], quantized[2]))
}

#[inline]
fn interleave(x: u32, y: u32, z: u32) -> u32 {
    (expand_bits(x) << 2) | (expand_bits(y) << 1) | expand_bits(z)
}

/// Normalizes `point` against `bounds` and codes it. Axes with zero extent map to 0.
fn normalized_code<T: BHValue>(point: &Point<T, 3>, bounds: &Aabb<T, 3>) -> u32 {
    let mut unit = [T::zero(); 3];
    for (axis, slot) in unit.iter_mut().enumerate() {
        let extent = bounds.max[axis] - bounds.min[axis];
        if extent > T::zero() {
            *slot = (point[axis] - bounds.min[axis]) / extent;
        }
    }
    morton_code(unit[0], unit[1], unit[2])
}

/// The sorted code index: element ids ordered by the Morton code of their center.
///
/// `codes` is non-decreasing and `ids[k]` is the original index of the `k`-th smallest
/// code. Equal codes keep the order of their original indices, so the index (and every
/// tree built from it) is reproducible.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MortonIndex {
    /// Original element indices in code order.
    pub ids: Vec<usize>,
    /// Morton codes, sorted.
    pub codes: Vec<u32>,
}

impl MortonIndex {
    /// Codes every point normalized against `bounds` and sorts the result.
    ///
    /// # Examples
    /// ```
    /// use mortonbvh::aabb::Aabb;
    /// use mortonbvh::morton::MortonIndex;
    /// use nalgebra::Point3;
    ///
    /// let points = vec![
    ///     Point3::new(1.0, 1.0, 1.0),
    ///     Point3::new(0.0, 0.0, 0.0),
    ///     Point3::new(0.0, 0.0, 0.0),
    /// ];
    /// let bounds = Aabb::with_bounds(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
    /// let index = MortonIndex::new(&points, &bounds);
    ///
    /// assert_eq!(index.ids, vec![1, 2, 0]);
    /// assert_eq!(index.codes, vec![0, 0, 0x3fff_ffff]);
    /// ```
    pub fn new<T: BHValue>(points: &[Point<T, 3>], bounds: &Aabb<T, 3>) -> MortonIndex {
        #[cfg(feature = "rayon")]
        let mut pairs: Vec<(u32, usize)> = points
            .par_iter()
            .enumerate()
            .map(|(id, point)| (normalized_code(point, bounds), id))
            .collect();
        #[cfg(not(feature = "rayon"))]
        let mut pairs: Vec<(u32, usize)> = points
            .iter()
            .enumerate()
            .map(|(id, point)| (normalized_code(point, bounds), id))
            .collect();

        // Ids are unique, so sorting the pairs is a total order.
        #[cfg(feature = "rayon")]
        pairs.par_sort_unstable();
        #[cfg(not(feature = "rayon"))]
        pairs.sort_unstable();

        let (codes, ids) = pairs.into_iter().unzip();
        MortonIndex { ids, codes }
    }

    /// Like [`MortonIndex::new`], normalizing against the bounding box of `points`.
    ///
    /// [`MortonIndex::new`]: struct.MortonIndex.html#method.new
    pub fn from_points<T: BHValue>(points: &[Point<T, 3>]) -> MortonIndex {
        MortonIndex::new(points, &joint_aabb_of_points(points))
    }

    /// Number of indexed elements.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns true if no element is indexed.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Verifies that this index is the sorted code index of `points` under `bounds`:
    /// the codes are sorted, `ids` is a permutation of the point indices and every
    /// code matches its point.
    pub fn check<T: BHValue>(
        &self,
        points: &[Point<T, 3>],
        bounds: &Aabb<T, 3>,
    ) -> Result<(), BvhError> {
        if self.ids.len() != points.len() {
            return Err(BvhError::LengthMismatch {
                expected: points.len(),
                found: self.ids.len(),
            });
        }
        if self.codes.len() != points.len() {
            return Err(BvhError::LengthMismatch {
                expected: points.len(),
                found: self.codes.len(),
            });
        }
        check_sorted(&self.codes)?;

        let mut seen = vec![false; points.len()];
        for (position, (&id, &code)) in self.ids.iter().zip(&self.codes).enumerate() {
            if id >= points.len() {
                return Err(BvhError::IndexOutOfBounds {
                    index: id,
                    len: points.len(),
                });
            }
            if seen[id] {
                return Err(BvhError::DuplicateElement { element: id });
            }
            seen[id] = true;
            if normalized_code(&points[id], bounds) != code {
                return Err(BvhError::CodeMismatch {
                    position,
                    element: id,
                });
            }
        }
        Ok(())
    }
}

fn check_sorted(codes: &[u32]) -> Result<(), BvhError> {
    match codes.windows(2).position(|pair| pair[0] > pair[1]) {
        Some(position) => Err(BvhError::UnsortedCodes {
            position: position + 1,
        }),
        None => Ok(()),
    }
}

/// Length of the common prefix of the keys at positions `i` and `j`, or -1 if `j`
/// lies outside the array.
///
/// Keys are `(code, position)`, so equal codes still differ: their prefix length is
/// 32 plus the common prefix of the positions.
#[inline]
fn delta(codes: &[u32], i: usize, j: i64) -> i64 {
    if j < 0 || j >= codes.len() as i64 {
        return -1;
    }
    let j = j as usize;
    let (a, b) = (codes[i], codes[j]);
    if a == b {
        32 + ((i ^ j) as u64).leading_zeros() as i64
    } else {
        (a ^ b).leading_zeros() as i64
    }
}

/// Finds the contiguous leaf range `(first, last)` covered by internal node `i` of the
/// binary radix tree over the sorted `codes`.
///
/// Node `i` is always one end of its range. Node 0 covers everything. Duplicate codes
/// are ordered by position, so runs of equal codes split like any other keys.
///
/// # Panics
/// Panics if `i + 1 >= codes.len()`.
///
/// # Examples
/// ```
/// use mortonbvh::morton::determine_range;
///
/// let codes = [0b0001, 0b0010, 0b0100, 0b0101, 0b10011, 0b11000, 0b11001, 0b11110];
/// assert_eq!(determine_range(&codes, 0), (0, 7));
/// assert_eq!(determine_range(&codes, 1), (0, 1));
/// assert_eq!(determine_range(&codes, 3), (0, 3));
/// assert_eq!(determine_range(&codes, 4), (4, 7));
/// ```
pub fn determine_range(codes: &[u32], i: usize) -> (usize, usize) {
    let n = codes.len();
    assert!(i + 1 < n, "internal node {i} out of range for {n} leaves");
    if i == 0 {
        return (0, n - 1);
    }
    let ii = i as i64;

    // Direction of the range: towards the neighbour sharing the longer prefix.
    let d: i64 = if delta(codes, i, ii + 1) > delta(codes, i, ii - 1) {
        1
    } else {
        -1
    };

    // Upper bound for the length of the range.
    let delta_min = delta(codes, i, ii - d);
    let mut l_max: i64 = 2;
    while delta(codes, i, ii + l_max * d) > delta_min {
        l_max *= 2;
    }

    // Binary search for the other end.
    let mut l: i64 = 0;
    let mut t = l_max / 2;
    while t >= 1 {
        if delta(codes, i, ii + (l + t) * d) > delta_min {
            l += t;
        }
        t /= 2;
    }
    let j = (ii + l * d) as usize;
    (i.min(j), i.max(j))
}

/// Finds the split position of the leaf range `[first, last]`: the left child covers
/// `[first, split]`, the right child `[split + 1, last]`.
///
/// Returns `None` for a single-leaf range.
///
/// # Examples
/// ```
/// use mortonbvh::morton::find_split;
///
/// let codes = [0b0001, 0b0010, 0b0100, 0b0101, 0b10011, 0b11000, 0b11001, 0b11110];
/// assert_eq!(find_split(&codes, 0, 7), Some(3));
/// assert_eq!(find_split(&codes, 4, 4), None);
/// ```
pub fn find_split(codes: &[u32], first: usize, last: usize) -> Option<usize> {
    if first >= last {
        return None;
    }
    let common_prefix = delta(codes, first, last as i64);

    // Binary search for the last position sharing more than the common prefix with first.
    let mut split = first;
    let mut step = last - first;
    loop {
        step = (step + 1) / 2;
        let candidate = split + step;
        if candidate < last && delta(codes, first, candidate as i64) > common_prefix {
            split = candidate;
        }
        if step <= 1 {
            break;
        }
    }
    Some(split)
}

/// Verifies the range and split kernels over sorted `codes`: every internal node's
/// range has the node at one end, every split lies inside its range and the ranges of
/// internal children equal the halves their parent's split produces.
pub fn check_range_split(codes: &[u32]) -> Result<(), BvhError> {
    check_sorted(codes)?;
    let n = codes.len();
    for node in 0..n.saturating_sub(1) {
        let (first, last) = determine_range(codes, node);
        let bad_range = BvhError::BadRange { node, first, last };
        if first >= last || (node != first && node != last) {
            return Err(bad_range);
        }
        let split = find_split(codes, first, last).ok_or(bad_range)?;
        if split < first || split >= last {
            return Err(bad_range);
        }
        for (child, child_first, child_last) in [(split, first, split), (split + 1, split + 1, last)]
        {
            if child_first == child_last {
                continue;
            }
            let (f, l) = determine_range(codes, child);
            if (f, l) != (child_first, child_last) {
                return Err(BvhError::BadRange {
                    node: child,
                    first: f,
                    last: l,
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testbase::{random_points, TAabb3, TPoint3};

    use proptest::prelude::*;

    #[test]
    fn test_expand_bits() {
        assert_eq!(expand_bits(0), 0);
        assert_eq!(expand_bits(1), 1);
        assert_eq!(expand_bits(0b11), 0b1001);
        assert_eq!(expand_bits(1023), 0x0924_9249);
        // Only the low 10 bits count.
        assert_eq!(expand_bits(1024), 0);
    }

    #[test]
    fn test_morton_code_axes() {
        assert_eq!(morton_code(1.0f32, 0.0, 0.0), 0x2492_4924);
        assert_eq!(morton_code(0.0f32, 1.0, 0.0), 0x1249_2492);
        assert_eq!(morton_code(0.0f32, 0.0, 1.0), 0x0924_9249);
        // The top cell of every axis is reached before 1.0.
        assert_eq!(morton_code(0.9995f64, 0.9995, 0.9995), 0x3fff_ffff);
        assert_eq!(morton_code(0.5f64, 0.5, 0.5), 0b111 << 27);
    }

    #[test]
    fn test_morton_code_clamps() {
        assert_eq!(morton_code(2.0f32, -1.0, f32::NAN), morton_code(1.0f32, 0.0, 0.0));
        assert_eq!(morton_code(-0.0001f64, 0.0, 0.0), 0);
    }

    #[test]
    fn test_morton_code_checked_rejects() {
        assert_eq!(
            morton_code_checked(-0.5f64, 0.0, 0.0),
            Err(BvhError::CoordinateOutOfRange { value: -0.5 })
        );
        assert!(morton_code_checked(0.0f32, f32::NAN, 0.0).is_err());
        assert_eq!(morton_code_checked(1.0f32, 1.0, 1.0), Ok(0x3fff_ffff));
    }

    #[test]
    fn test_index_ties_keep_original_order() {
        let points = vec![TPoint3::new(0.5, 0.5, 0.5); 6];
        let index = MortonIndex::from_points(&points);
        assert_eq!(index.ids, (0..6).collect::<Vec<_>>());
        assert!(index.codes.iter().all(|&c| c == 0));
        check_range_split(&index.codes).unwrap();
    }

    #[test]
    fn test_index_check() {
        let points = random_points(200, 7);
        let bounds = joint_aabb_of_points(&points);
        let index = MortonIndex::new(&points, &bounds);
        assert_eq!(index.len(), 200);
        index.check(&points, &bounds).unwrap();
        check_range_split(&index.codes).unwrap();

        let mut swapped = index.clone();
        swapped.ids.swap(0, 199);
        assert!(swapped.check(&points, &bounds).is_err());

        let mut duplicated = index.clone();
        duplicated.ids[1] = duplicated.ids[0];
        assert!(matches!(
            duplicated.check(&points, &bounds),
            Err(BvhError::DuplicateElement { .. }) | Err(BvhError::CodeMismatch { .. })
        ));

        let mut unsorted = index;
        unsorted.codes.reverse();
        assert!(matches!(
            unsorted.check(&points, &bounds),
            Err(BvhError::UnsortedCodes { .. })
        ));
    }

    #[test]
    fn test_index_is_reproducible() {
        let points = random_points(500, 11);
        assert_eq!(MortonIndex::from_points(&points), MortonIndex::from_points(&points));
    }

    #[test]
    fn test_flat_axis_normalizes_to_zero() {
        let points = vec![TPoint3::new(0.0, 2.0, 5.0), TPoint3::new(1.0, 2.0, 5.0)];
        let bounds = TAabb3::with_bounds(TPoint3::new(0.0, 2.0, 5.0), TPoint3::new(1.0, 2.0, 5.0));
        let index = MortonIndex::new(&points, &bounds);
        assert_eq!(index.codes, vec![0, 0x2492_4924]);
    }

    #[test]
    fn test_determine_range_all_equal() {
        let codes = vec![42u32; 9];
        for i in 0..8 {
            let (first, last) = determine_range(&codes, i);
            assert!(first <= i && i <= last);
            assert!(first < last);
        }
        check_range_split(&codes).unwrap();
    }

    #[test]
    fn test_find_split_two_leaves() {
        assert_eq!(find_split(&[3, 3], 0, 1), Some(0));
        assert_eq!(find_split(&[1, 8], 0, 1), Some(0));
    }

    #[test]
    fn test_check_range_split_rejects_unsorted() {
        assert_eq!(
            check_range_split(&[4, 2, 9]),
            Err(BvhError::UnsortedCodes { position: 1 })
        );
        check_range_split(&[]).unwrap();
        check_range_split(&[5]).unwrap();
    }

    proptest! {
        // Every internal node's range contains the node and splits consistently,
        // also with many duplicate codes.
        #[test]
        fn test_range_split_random_codes(mut codes in prop::collection::vec(0u32..64, 2..200)) {
            codes.sort_unstable();
            for i in 0..codes.len() - 1 {
                let (first, last) = determine_range(&codes, i);
                prop_assert!(first <= i && i <= last);
            }
            prop_assert_eq!(check_range_split(&codes), Ok(()));
        }

        #[test]
        fn test_range_split_wide_codes(mut codes in prop::collection::vec(0u32..(1 << 30), 2..300)) {
            codes.sort_unstable();
            prop_assert_eq!(check_range_split(&codes), Ok(()));
        }
    }
}
