//! Common utilities shared by unit tests.
#![cfg(test)]

use nalgebra::{Point, SVector};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::aabb::Aabb;
use crate::ball::Ball;
use crate::ray::Ray;
use crate::utils::distance_squared;

/// Point type for testing.
pub type TPoint3 = Point<f32, 3>;

/// Vector type for testing.
pub type TVector3 = SVector<f32, 3>;

/// Aabb type for testing.
pub type TAabb3 = Aabb<f32, 3>;

/// Ball type for testing.
pub type TBall3 = Ball<f32, 3>;

/// Ray type for testing.
pub type TRay3 = Ray<f32, 3>;

/// A vector represented as a tuple
pub type TupleVec = (f32, f32, f32);

/// Generate a `TupleVec` for [`proptest::strategy::Strategy`] from -10e10 to 10e10
/// A small enough range to prevent most fp32 errors from breaking certain tests
pub fn tuplevec_small_strategy() -> impl Strategy<Value = TupleVec> {
    (
        -10e10_f32..10e10_f32,
        -10e10_f32..10e10_f32,
        -10e10_f32..10e10_f32,
    )
}

/// Generate a `TupleVec` inside the cube `[-100, 100]^3`.
pub fn tuplevec_scene_strategy() -> impl Strategy<Value = TupleVec> {
    (-100.0_f32..100.0, -100.0_f32..100.0, -100.0_f32..100.0)
}

/// Convert a `TupleVec` to a [`TPoint3`].
pub fn tuple_to_point(tpl: &TupleVec) -> TPoint3 {
    TPoint3::new(tpl.0, tpl.1, tpl.2)
}

/// Generates `count` points uniformly distributed in `[-10, 10]^3` from a fixed seed.
pub fn random_points(count: usize, seed: u64) -> Vec<TPoint3> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            TPoint3::new(
                rng.random_range(-10.0..10.0),
                rng.random_range(-10.0..10.0),
                rng.random_range(-10.0..10.0),
            )
        })
        .collect()
}

/// Flattens points into an `xyz` coordinate array.
pub fn flatten(points: &[TPoint3]) -> Vec<f32> {
    points.iter().flat_map(|p| [p.x, p.y, p.z]).collect()
}

/// The eight corners of the unit cube, in `x`-fastest order.
pub fn cube_corners() -> Vec<TPoint3> {
    let mut corners = Vec::with_capacity(8);
    for z in 0..2 {
        for y in 0..2 {
            for x in 0..2 {
                corners.push(TPoint3::new(x as f32, y as f32, z as f32));
            }
        }
    }
    corners
}

/// Distance from `query` to the closest of `points`, by brute force.
pub fn brute_force_nearest(points: &[TPoint3], query: &TPoint3) -> f32 {
    points
        .iter()
        .map(|p| distance_squared(p, query))
        .fold(f32::INFINITY, f32::min)
        .sqrt()
}

/// Sorts a query result so it can be compared with a brute force one.
pub fn sorted(mut elements: Vec<usize>) -> Vec<usize> {
    elements.sort_unstable();
    elements
}
