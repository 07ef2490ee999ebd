//! Triangle/vertex adjacency and boundary classification.
//!
//! Adjacency is built once per run and maintained incrementally as
//! collapses retarget and tombstone triangles; a full rebuild only happens
//! when the caller forces the `recompute` cadence.

use std::collections::HashMap;

use itertools::Itertools;

use crate::attributes::DecimationMesh;

/// Canonical undirected edge key.
#[inline]
pub(crate) fn ordered(u: usize, v: usize) -> (usize, usize) {
    if u <= v {
        (u, v)
    } else {
        (v, u)
    }
}

impl DecimationMesh {
    /// Build per-vertex adjacency and classify boundary vertices by
    /// counting live triangles per undirected edge: an edge with exactly
    /// one incident triangle marks both endpoints as boundary.
    pub(crate) fn build_topology(&mut self) {
        for adj in &mut self.adjacency {
            adj.clear();
        }
        for v in &mut self.vertices {
            v.ref_count = 0;
        }

        for ti in 0..self.triangles.len() {
            if self.triangles[ti].deleted {
                continue;
            }
            for &vi in &self.triangles[ti].vertices {
                self.adjacency[vi].push(ti);
                self.vertices[vi].ref_count += 1;
            }
        }

        let mut edge_count: HashMap<(usize, usize), u32> = HashMap::new();
        for t in self.triangles.iter().filter(|t| !t.deleted) {
            let [a, b, c] = t.vertices;
            for (u, v) in [(a, b), (b, c), (c, a)] {
                *edge_count.entry(ordered(u, v)).or_insert(0) += 1;
            }
        }
        for (&(u, v), &count) in &edge_count {
            if count == 1 {
                self.vertices[u].boundary = true;
                self.vertices[v].boundary = true;
            }
        }
    }

    /// All live undirected edges, deduplicated.
    pub(crate) fn live_edges(&self) -> Vec<(usize, usize)> {
        self.triangles
            .iter()
            .filter(|t| !t.deleted)
            .flat_map(|t| {
                let [a, b, c] = t.vertices;
                [ordered(a, b), ordered(b, c), ordered(c, a)]
            })
            .unique()
            .collect()
    }

    #[inline]
    pub(crate) fn triangle_has_vertex(&self, ti: usize, vi: usize) -> bool {
        self.triangles[ti].vertices.contains(&vi)
    }

    /// Live triangles containing both `a` and `b`.
    pub(crate) fn shared_triangles(&self, a: usize, b: usize) -> Vec<usize> {
        self.adjacency[a]
            .iter()
            .copied()
            .filter(|&ti| self.triangle_has_vertex(ti, b))
            .collect()
    }

    /// Number of live triangles incident to the undirected edge.
    pub(crate) fn edge_triangle_count(&self, a: usize, b: usize) -> usize {
        self.shared_triangles(a, b).len()
    }

    /// The edge lies on the open border (exactly one incident triangle).
    pub(crate) fn is_boundary_edge(&self, a: usize, b: usize) -> bool {
        self.edge_triangle_count(a, b) == 1
    }

    /// Distinct live neighbor vertices of `v`.
    pub(crate) fn neighbors(&self, v: usize) -> Vec<usize> {
        self.adjacency[v]
            .iter()
            .flat_map(|&ti| self.triangles[ti].vertices)
            .filter(|&u| u != v)
            .unique()
            .collect()
    }

    /// Tombstone a triangle, updating adjacency and reference counts.
    pub(crate) fn delete_triangle(&mut self, ti: usize) {
        if self.triangles[ti].deleted {
            return;
        }
        self.triangles[ti].deleted = true;
        self.live_triangles -= 1;
        let verts = self.triangles[ti].vertices;
        for vi in verts {
            self.adjacency[vi].retain(|&t| t != ti);
            self.vertices[vi].ref_count = self.vertices[vi].ref_count.saturating_sub(1);
        }
    }

    /// Re-point every live triangle referencing `from` at `to`, moving the
    /// adjacency records along. Triangles containing both endpoints must be
    /// tombstoned before calling this.
    pub(crate) fn retarget_vertex(&mut self, from: usize, to: usize) {
        let moved = std::mem::take(&mut self.adjacency[from]);
        for &ti in &moved {
            debug_assert!(!self.triangle_has_vertex(ti, to));
            for corner in &mut self.triangles[ti].vertices {
                if *corner == from {
                    *corner = to;
                }
            }
            self.triangles[ti].dirty = true;
            self.adjacency[to].push(ti);
            self.vertices[to].ref_count += 1;
        }
        self.vertices[from].ref_count = 0;
    }

    /// Re-check boundary status of `v` and its neighbors after a collapse.
    ///
    /// Removing triangles can only expose new border edges, so the flag is
    /// only ever set here, never cleared; a vertex on the original border
    /// stays constrained for the rest of the run.
    pub(crate) fn reclassify_boundary_around(&mut self, v: usize) {
        let mut verts = self.neighbors(v);
        verts.push(v);
        for vi in verts {
            if self.vertices[vi].boundary {
                continue;
            }
            let exposed = self
                .neighbors(vi)
                .into_iter()
                .any(|u| self.edge_triangle_count(vi, u) == 1);
            if exposed {
                self.vertices[vi].boundary = true;
            }
        }
    }
}
