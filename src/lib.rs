//! A crate which builds binary bounding volume hierarchies over arbitrary elements,
//! propagates bounding volumes through them and answers spatial queries.
//!
//! ## About
//!
//! A [`Bvh`] only stores the tree topology. Bounding volumes live in a separate array with
//! one entry per node, so the same tree can be refitted every time step or carry
//! different volume shapes. Two builders are provided:
//!
//! - [`Bvh::build_morton`] / [`Bvh::from_morton_index`]: a linear BVH over 30-bit Morton
//!   codes of the element centers (binary radix tree, parallel with the `rayon` feature);
//! - [`Bvh::build_partitioned`]: recursive bisection of the element set, guided by the
//!   adjacency between elements of a mesh.
//!
//! Volumes are anything implementing [`BoundingVolume`]; [`Aabb`] and [`Ball`] ship with
//! the crate. Queries (point inclusion, ray and line intersection, nearest distance
//! range, distance window, volume and pair overlap) run on a [`BvhView`].
//!
//! ## Example
//!
//! ```
//! use mortonbvh::aabb::Aabb;
//! use mortonbvh::bvh::{Bvh, PointCloud};
//! use mortonbvh::ray::Ray;
//! use mortonbvh::utils::points_from_flat;
//! use nalgebra::{Point3, Vector3};
//!
//! // A small point cloud as flat xyz coordinates.
//! let coords = vec![
//!     0.0, 0.0, 0.0,
//!     1.0, 0.0, 0.0,
//!     0.0, 1.0, 0.0,
//!     5.0, 5.0, 5.0,
//! ];
//! let points = points_from_flat(&coords).unwrap();
//!
//! let bvh = Bvh::build_morton(&points);
//! assert!(bvh.is_consistent(points.len()));
//!
//! let cloud = PointCloud::new(&coords, 0.05).unwrap();
//! let volumes: Vec<Aabb<f64, 3>> = bvh.build_volumes(&cloud).unwrap();
//! let view = bvh.with_volumes(&volumes).unwrap();
//!
//! let ray = Ray::new(Point3::new(-1.0, 0.0, 0.0), Vector3::new(1.0, 0.0, 0.0));
//! let mut hits = view.elements_intersecting_ray(&ray);
//! hits.sort();
//! assert_eq!(hits, vec![0, 1]);
//!
//! let (min, max) = view.nearest_distance_range(&Point3::new(5.0, 5.0, 4.0)).unwrap();
//! assert!(min <= 1.0 && 1.0 <= max);
//! ```
//!
//! ## Features
//!
//! - `rayon` (default **enabled**) - computes Morton codes and LBVH nodes in parallel
//! - `serde` (default **disabled**) - adds `Serialize` and `Deserialize` implementations for some types
//!
//! [`Bvh`]: bvh/struct.Bvh.html
//! [`Bvh::build_morton`]: bvh/struct.Bvh.html#method.build_morton
//! [`Bvh::from_morton_index`]: bvh/struct.Bvh.html#method.from_morton_index
//! [`Bvh::build_partitioned`]: bvh/struct.Bvh.html#method.build_partitioned
//! [`BvhView`]: bvh/struct.BvhView.html
//! [`BoundingVolume`]: bounding_hierarchy/trait.BoundingVolume.html
//! [`Aabb`]: aabb/struct.Aabb.html
//! [`Ball`]: ball/struct.Ball.html
//!

#![deny(missing_docs)]

pub mod aabb;
pub mod ball;
pub mod bounding_hierarchy;
pub mod bvh;
pub mod error;
pub mod morton;
pub mod ray;
pub mod utils;

#[cfg(test)]
mod testbase;

#[cfg(doctest)]
doc_comment::doctest!("../README.md");
