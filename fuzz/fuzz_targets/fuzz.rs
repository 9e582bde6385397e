#![no_main]
use std::fmt::{self, Debug, Formatter};

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use mortonbvh::aabb::Aabb;
use mortonbvh::bounding_hierarchy::BoundingVolume;
use mortonbvh::bvh::{Bvh, BvhView, ElementAdjacency, PointCloud, SplitPolicy};
use mortonbvh::ray::Ray;
use nalgebra::{Point3, Vector3};
use ordered_float::NotNan;

type Float = f32;
const LIMIT: Float = 1_000_000.0;

fuzz_target!(|workload: Workload| {
    workload.fuzz();
});

#[derive(Arbitrary)]
struct ArbitraryPoint {
    coordinates: [NotNan<Float>; 3],
}

impl ArbitraryPoint {
    fn point(&self) -> Point3<Float> {
        Point3::from_slice(&self.coordinates).map(|f| f.into_inner().clamp(-LIMIT, LIMIT))
    }
}

impl Debug for ArbitraryPoint {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        Debug::fmt(&self.point(), f)
    }
}

#[derive(Debug, Arbitrary)]
struct ArbitraryRay {
    origin: ArbitraryPoint,
    destination: ArbitraryPoint,
}

impl ArbitraryRay {
    fn ray(&self) -> Ray<Float, 3> {
        let mut direction = self.destination.point() - self.origin.point();
        // Ensure no degenerate direction.
        if direction.iter().all(|f| *f == 0.0) {
            direction = Vector3::new(1.0, 1.0, 1.0);
        }
        Ray::new(self.origin.point(), direction)
    }
}

#[derive(Debug, Arbitrary)]
struct Workload {
    points: Vec<ArbitraryPoint>,
    ray: ArbitraryRay,
    query: ArbitraryPoint,
    margin: u8,
    median: bool,
}

impl Workload {
    fn fuzz(self) {
        if self.points.len() > 256 {
            return;
        }
        let points: Vec<Point3<Float>> = self.points.iter().map(ArbitraryPoint::point).collect();
        let coords: Vec<Float> = points.iter().flat_map(|p| [p.x, p.y, p.z]).collect();
        let cloud = PointCloud::new(&coords, Float::from(self.margin) / 16.0).unwrap();
        let ray = self.ray.ray();
        let query = self.query.point();

        // Consecutive points are neighbours.
        let surrounding: Vec<Option<usize>> = (0..points.len())
            .flat_map(|i| [i.checked_sub(1), Some(i + 1).filter(|&j| j < points.len())])
            .collect();
        let adjacency = ElementAdjacency::from_surrounding(2, &surrounding).unwrap();
        let policy = if self.median {
            SplitPolicy::Median
        } else {
            SplitPolicy::ConnectedLongestAxis
        };

        let trees = [
            Bvh::build_morton(&points),
            Bvh::build_partitioned(&points, &adjacency, policy).unwrap(),
        ];
        let mut results = Vec::new();
        for bvh in &trees {
            bvh.assert_consistent(points.len());
            let volumes: Vec<Aabb<Float, 3>> = bvh.build_volumes(&cloud).unwrap();
            bvh.check_volumes(&volumes, 0.0).unwrap();
            let view = bvh.with_volumes(&volumes).unwrap();

            let mut hits = view.elements_intersecting_ray(&ray);
            hits.sort_unstable();
            assert_eq!(hits, brute_force(&view, |v| v.intersects_ray(&ray)));

            let mut inside = view.elements_containing_point(&query);
            inside.sort_unstable();
            assert_eq!(inside, brute_force(&view, |v| v.contains_point(&query)));

            if let Some((min, max)) = view.nearest_distance_range(&query) {
                assert!(min <= max, "{min} > {max}");
            }
            results.push((hits, inside));
        }
        assert_eq!(results[0], results[1]);
    }
}

/// Tests every leaf volume directly.
fn brute_force(
    view: &BvhView<'_, Float, 3, Aabb<Float, 3>>,
    test: impl Fn(&Aabb<Float, 3>) -> bool,
) -> Vec<usize> {
    let mut elements: Vec<usize> = view
        .bvh()
        .nodes
        .iter()
        .zip(view.volumes())
        .filter_map(|(node, volume)| node.element_index().filter(|_| test(volume)))
        .collect();
    elements.sort_unstable();
    elements
}
