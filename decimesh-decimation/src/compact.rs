//! Final compaction: squeeze the tombstoned arena into a dense mesh.

use decimesh_core::TriangleMesh;

use crate::attributes::DecimationMesh;

impl DecimationMesh {
    /// Emit the surviving geometry as a fresh mesh. Vertices keep their
    /// original relative order; unreferenced and tombstoned records are
    /// dropped and triangle indices remapped.
    pub(crate) fn compact(&self) -> TriangleMesh {
        let mut remap = vec![usize::MAX; self.vertices.len()];
        let mut out = TriangleMesh::new();

        for (vi, v) in self.vertices.iter().enumerate() {
            if !v.deleted && v.ref_count > 0 {
                remap[vi] = out.add_vertex(v.position);
            }
        }

        let mut live_indices = Vec::with_capacity(self.live_triangles);
        for (ti, t) in self.triangles.iter().enumerate() {
            if t.deleted {
                continue;
            }
            let [a, b, c] = t.vertices;
            out.add_face([remap[a], remap[b], remap[c]]);
            live_indices.push(ti);
        }

        for channel in &self.uv_channels {
            let corners = live_indices.iter().map(|&ti| channel[ti]).collect();
            out.add_uv_channel(corners);
        }

        out
    }
}
