//! This module holds the [`Ray`] definition and its intersection with [`Aabb`]s.
//!
//! [`Aabb`]: ../aabb/struct.Aabb.html
//!
mod ray_impl;

pub use self::ray_impl::*;
