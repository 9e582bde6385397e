use mortonbvh::aabb::Aabb;
use mortonbvh::ball::Ball;
use mortonbvh::bvh::{Bvh, ElementAdjacency, PointCloud, SplitPolicy};
use mortonbvh::morton::MortonIndex;
use mortonbvh::ray::Ray;
use mortonbvh::utils::points_from_flat;
use nalgebra::{Point3, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub fn main() {
    let mut rng = StdRng::seed_from_u64(7);
    let coords: Vec<f64> = (0..3 * 100_000)
        .map(|_| rng.random_range(-50.0..50.0))
        .collect();
    let points = points_from_flat(&coords).unwrap();
    let cloud = PointCloud::new(&coords, 0.01).unwrap();

    let index = MortonIndex::from_points(&points);
    let lbvh = Bvh::from_morton_index(&index).unwrap();
    lbvh.assert_consistent(points.len());
    println!("lbvh: {} nodes, depth {}", lbvh.node_count(), lbvh.depth());

    let adjacency = ElementAdjacency::empty(points.len());
    let partitioned = Bvh::build_partitioned(&points, &adjacency, SplitPolicy::Median).unwrap();
    partitioned.assert_consistent(points.len());
    println!(
        "partitioned: {} nodes, depth {}",
        partitioned.node_count(),
        partitioned.depth()
    );

    let boxes: Vec<Aabb<f64, 3>> = lbvh.build_volumes(&cloud).unwrap();
    let view = lbvh.with_volumes(&boxes).unwrap();

    let ray = Ray::new(Point3::new(-60.0, 0.0, 0.0), Vector3::new(1.0, 0.0, 0.0));
    let hits = view.elements_intersecting_ray(&ray);
    println!("ray hits {} points", hits.len());

    let query = Point3::new(1.0, 2.0, 3.0);
    if let Some((min, max)) = view.nearest_distance_range(&query) {
        println!("nearest point to {query:?} lies between {min:.4} and {max:.4}");
    }
    let shell = view.elements_in_distance_range(&query, 5.0, 5.5).unwrap();
    println!("{} points between 5 and 5.5 from {query:?}", shell.len());

    let balls: Vec<Ball<f64, 3>> = partitioned.build_volumes(&cloud).unwrap();
    let ball_view = partitioned.with_volumes(&balls).unwrap();
    let probe = Ball::new(Point3::origin(), 2.0);
    let inside = ball_view.elements_intersecting_volume(&probe);
    println!("{} points near the origin", inside.len());
    println!("{} touching pairs", ball_view.self_intersecting_pairs().len());
}
