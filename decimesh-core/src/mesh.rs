//! Mesh data structures and functionality

use crate::point::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-corner texture coordinates for one UV channel: one `[Point2f; 3]`
/// triple per face, in face order.
pub type UvChannel = Vec<[Point2f; 3]>;

/// A triangle mesh with vertices, faces, and optional per-corner UV channels
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriangleMesh {
    pub vertices: Vec<Point3f>,
    pub faces: Vec<[usize; 3]>,
    pub uv_channels: Vec<UvChannel>,
}

impl TriangleMesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            faces: Vec::new(),
            uv_channels: Vec::new(),
        }
    }

    /// Create a mesh from vertices and faces
    pub fn from_vertices_and_faces(vertices: Vec<Point3f>, faces: Vec<[usize; 3]>) -> Self {
        Self {
            vertices,
            faces,
            uv_channels: Vec::new(),
        }
    }

    /// Get the number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Get the number of faces
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Check if the mesh is empty
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.faces.is_empty()
    }

    /// Add a vertex to the mesh
    pub fn add_vertex(&mut self, vertex: Point3f) -> usize {
        let index = self.vertices.len();
        self.vertices.push(vertex);
        index
    }

    /// Add a face to the mesh
    pub fn add_face(&mut self, face: [usize; 3]) {
        self.faces.push(face);
    }

    /// Add a per-corner UV channel. Ignored unless the channel carries
    /// exactly one corner triple per face.
    pub fn add_uv_channel(&mut self, channel: UvChannel) {
        if channel.len() == self.faces.len() {
            self.uv_channels.push(channel);
        }
    }

    /// Unit normal of one face
    pub fn face_normal(&self, face_idx: usize) -> Vector3f {
        let [a, b, c] = self.faces[face_idx];
        let e1 = self.vertices[b] - self.vertices[a];
        let e2 = self.vertices[c] - self.vertices[a];
        e1.cross(&e2).normalize()
    }

    /// Area of one face
    pub fn face_area(&self, face_idx: usize) -> f32 {
        let [a, b, c] = self.faces[face_idx];
        let e1 = self.vertices[b] - self.vertices[a];
        let e2 = self.vertices[c] - self.vertices[a];
        e1.cross(&e2).norm() * 0.5
    }

    /// Total surface area over all faces
    pub fn surface_area(&self) -> f32 {
        (0..self.faces.len()).map(|i| self.face_area(i)).sum()
    }

    /// Weld vertices closer than `epsilon` and drop the faces this
    /// degenerates, keeping UV channels consistent. Returns the number of
    /// vertices removed.
    pub fn merge_coincident_vertices(&mut self, epsilon: f32) -> usize {
        let epsilon = epsilon.max(f32::EPSILON);
        let inv = 1.0 / epsilon;

        let mut buckets: HashMap<(i64, i64, i64), usize> = HashMap::new();
        let mut kept: Vec<Point3f> = Vec::new();
        let mut remap: Vec<usize> = Vec::with_capacity(self.vertices.len());

        for v in &self.vertices {
            let key = (
                (v.x * inv).round() as i64,
                (v.y * inv).round() as i64,
                (v.z * inv).round() as i64,
            );
            let idx = *buckets.entry(key).or_insert_with(|| {
                kept.push(*v);
                kept.len() - 1
            });
            remap.push(idx);
        }

        let removed = self.vertices.len() - kept.len();
        if removed == 0 {
            return 0;
        }

        let mut faces = Vec::with_capacity(self.faces.len());
        let mut uv_channels: Vec<UvChannel> =
            self.uv_channels.iter().map(|_| Vec::new()).collect();

        for (fi, f) in self.faces.iter().enumerate() {
            let g = [remap[f[0]], remap[f[1]], remap[f[2]]];
            if g[0] == g[1] || g[1] == g[2] || g[2] == g[0] {
                continue;
            }
            faces.push(g);
            for (ch, out) in uv_channels.iter_mut().enumerate() {
                out.push(self.uv_channels[ch][fi]);
            }
        }

        self.vertices = kept;
        self.faces = faces;
        self.uv_channels = uv_channels;
        removed
    }

    /// Clear the mesh
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.faces.clear();
        self.uv_channels.clear();
    }
}

impl Default for TriangleMesh {
    fn default() -> Self {
        Self::new()
    }
}
