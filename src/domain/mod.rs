//! Pure domain types with minimal dependencies
//!
//! Geometry kernel, arrow centerline model, the shape set and its scene JSON.
//! Nothing here touches pixels; rendering lives in [`crate::render`].

pub mod arrow;
pub mod geometry;
pub mod record;
pub mod shape;

pub use arrow::*;
pub use geometry::*;
pub use record::{deserialize_scene, serialize_scene};
pub use shape::*;
