//! This module defines a [`Bvh`], its two builders, the bounding volume propagation
//! and the queries.
//!
//! [`Bvh`]: struct.Bvh.html
//!

mod bvh_impl;
mod bvh_node;
mod geometry;
mod morton_build;
mod partition_build;
mod traverse;

pub use self::bvh_impl::*;
pub use self::bvh_node::*;
pub use self::geometry::*;
pub use self::partition_build::*;
pub use self::traverse::*;
