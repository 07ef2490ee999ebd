//! Working-copy vertex and triangle records for one decimation run.
//!
//! The engine operates on an index-addressed arena: vertices and triangles
//! are tombstoned rather than removed during the collapse loop, so indices
//! stay stable until the final compaction pass.

use decimesh_core::{Error, Point2f, Point3f, Result, TriangleMesh, Vector3d};

use crate::quadric::Quadric;

/// Cached face plane in Hessian normal form (unit normal, offset).
#[derive(Debug, Clone, Copy)]
pub(crate) struct Plane {
    pub normal: Vector3d,
    pub offset: f64,
}

impl Default for Plane {
    fn default() -> Self {
        Self {
            normal: Vector3d::zeros(),
            offset: 0.0,
        }
    }
}

/// Per-vertex record.
#[derive(Debug, Clone)]
pub(crate) struct Vertex {
    pub position: Point3f,
    /// Sum of the face quadrics of the currently live incident triangles.
    pub quadric: Quadric,
    /// Lies on an edge with fewer than two incident triangles.
    pub boundary: bool,
    /// Live incident triangle count.
    pub ref_count: u32,
    /// Bumped whenever position, quadric, or incident set changes; queued
    /// candidates that captured an older value are stale.
    pub generation: u64,
    pub deleted: bool,
}

/// Per-triangle record.
#[derive(Debug, Clone)]
pub(crate) struct Triangle {
    pub vertices: [usize; 3],
    pub plane: Plane,
    pub area: f64,
    /// Plane and area need recompute before the next quadric accumulation.
    pub dirty: bool,
    pub deleted: bool,
}

/// Mutable working mesh for one decimation call.
///
/// All cross-references are integer indices into the parallel arrays; UV
/// corner data is stored channel-major alongside the triangle array.
pub(crate) struct DecimationMesh {
    pub vertices: Vec<Vertex>,
    pub triangles: Vec<Triangle>,
    /// Per channel: one corner triple per triangle, parallel to `triangles`.
    pub uv_channels: Vec<Vec<[Point2f; 3]>>,
    /// Live incident triangles per vertex.
    pub adjacency: Vec<Vec<usize>>,
    pub live_triangles: usize,
}

impl DecimationMesh {
    /// Build the working copy from caller-owned mesh data.
    ///
    /// Rejects empty meshes and out-of-range vertex indices. Triangles with
    /// repeated indices are tombstoned immediately (degenerate input is
    /// recovered, not fatal). UV channels whose corner count does not match
    /// the triangle count are dropped per channel.
    pub fn build(mesh: &TriangleMesh) -> Result<Self> {
        if mesh.is_empty() {
            return Err(Error::InvalidMesh(
                "mesh has no vertices or faces".to_string(),
            ));
        }

        let nv = mesh.vertices.len();
        for (ti, face) in mesh.faces.iter().enumerate() {
            for &vi in face {
                if vi >= nv {
                    return Err(Error::InvalidMesh(format!(
                        "triangle {} references vertex {} but the mesh has {} vertices",
                        ti, vi, nv
                    )));
                }
            }
        }

        let vertices = mesh
            .vertices
            .iter()
            .map(|&position| Vertex {
                position,
                quadric: Quadric::zero(),
                boundary: false,
                ref_count: 0,
                generation: 0,
                deleted: false,
            })
            .collect();

        let triangles: Vec<Triangle> = mesh
            .faces
            .iter()
            .map(|&f| Triangle {
                vertices: f,
                plane: Plane::default(),
                area: 0.0,
                dirty: true,
                deleted: f[0] == f[1] || f[1] == f[2] || f[2] == f[0],
            })
            .collect();

        let uv_channels = mesh
            .uv_channels
            .iter()
            .filter(|c| c.len() == mesh.faces.len())
            .cloned()
            .collect();

        let live_triangles = triangles.iter().filter(|t| !t.deleted).count();

        let mut dm = Self {
            vertices,
            triangles,
            uv_channels,
            adjacency: vec![Vec::new(); nv],
            live_triangles,
        };
        dm.build_topology();
        dm.initialize_quadrics();
        Ok(dm)
    }

    #[inline]
    pub fn is_live_triangle(&self, ti: usize) -> bool {
        !self.triangles[ti].deleted
    }

    #[inline]
    pub fn bump_generation(&mut self, vi: usize) {
        self.vertices[vi].generation += 1;
    }

    /// Overwrite the corner UVs of `vi`, one value per channel, but only at
    /// corners whose current value matches `refs` for that channel. A chart
    /// split elsewhere around the vertex keeps its own coordinates.
    pub fn write_vertex_uvs(&mut self, vi: usize, refs: &[Point2f], uvs: &[Point2f]) {
        debug_assert_eq!(uvs.len(), self.uv_channels.len());
        debug_assert_eq!(refs.len(), uvs.len());
        for &ti in &self.adjacency[vi] {
            for (corner, &v) in self.triangles[ti].vertices.iter().enumerate() {
                if v != vi {
                    continue;
                }
                for (ch, &uv) in uvs.iter().enumerate() {
                    let current = self.uv_channels[ch][ti][corner];
                    if (current - refs[ch]).norm() <= crate::candidate::UV_SEAM_THRESHOLD {
                        self.uv_channels[ch][ti][corner] = uv;
                    }
                }
            }
        }
    }

    /// Mark everything stale and rebuild topology and quadrics from
    /// scratch. Used at epoch boundaries when the `recompute` flag is set.
    pub fn rebuild_all(&mut self) {
        for t in &mut self.triangles {
            if !t.deleted {
                t.dirty = true;
            }
        }
        self.build_topology();
        self.initialize_quadrics();
        for vi in 0..self.vertices.len() {
            if !self.vertices[vi].deleted {
                self.bump_generation(vi);
            }
        }
    }
}
