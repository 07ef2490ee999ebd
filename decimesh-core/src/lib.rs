//! Core data structures for decimesh
//!
//! This crate provides the mesh types shared between the decimation engine
//! and its callers: triangle meshes with per-corner UV channels, point and
//! vector aliases, and the common error type.

pub mod point;
pub mod mesh;
pub mod error;

pub use point::*;
pub use mesh::*;
pub use error::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Point2, Point3, Vector2, Vector3, Matrix3, Matrix4};

// Type aliases for easier imports
pub type Mesh = TriangleMesh;
