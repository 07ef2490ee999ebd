//! Collapse candidate evaluation: merged position, cost, and validity.

use std::collections::HashSet;

use decimesh_core::{Point2f, Point3f, Vector3d};
use itertools::Itertools;

use crate::attributes::DecimationMesh;
use crate::quadric::DEGENERATE_AREA_EPSILON;

/// Base dot-product tolerance for the normal-flip check; scaled more
/// permissive by `aggressiveness`.
pub(crate) const NORMAL_FLIP_MIN_DOT: f64 = 0.2;

/// UV distance beyond which two corners of the same vertex disagree,
/// marking the edge as a texture seam.
pub(crate) const UV_SEAM_THRESHOLD: f32 = 1e-4;

/// Base cost multiplier for collapsing across a UV seam.
pub(crate) const UV_SEAM_PENALTY: f64 = 8.0;

/// Effective flip tolerance for a given aggressiveness.
pub(crate) fn normal_flip_min_dot(aggressiveness: f64) -> f64 {
    NORMAL_FLIP_MIN_DOT * 8.0 / (8.0 + aggressiveness)
}

/// Effective seam penalty for a given aggressiveness.
pub(crate) fn uv_seam_penalty(aggressiveness: f64) -> f64 {
    1.0 + (UV_SEAM_PENALTY - 1.0) / (1.0 + aggressiveness * 0.25)
}

/// A fully evaluated, currently valid collapse of `b` into `a`.
#[derive(Debug, Clone)]
pub(crate) struct CollapseCandidate {
    pub a: usize,
    pub b: usize,
    pub position: Point3f,
    pub cost: f64,
    /// Distinct neighbor count of the merged vertex; tie-break key.
    pub merged_degree: usize,
    /// Blended per-channel UV for the merged vertex; empty when the mesh
    /// carries no UVs or the edge is a seam (each side then keeps its own
    /// chart).
    pub merged_uvs: Vec<Point2f>,
    /// Per channel, the corner UVs of `a` and `b` in the collapsing chart.
    /// Write-back only touches corners matching one of these, so a chart
    /// split elsewhere around either endpoint is preserved.
    pub chart_uvs: Vec<(Point2f, Point2f)>,
}

impl DecimationMesh {
    /// Evaluate the collapse of edge `(a, b)`, merging `b` into `a`.
    /// Returns `None` when no valid merge position exists.
    pub(crate) fn evaluate_collapse(
        &self,
        a: usize,
        b: usize,
        aggressiveness: f64,
    ) -> Option<CollapseCandidate> {
        if a == b || self.vertices[a].deleted || self.vertices[b].deleted {
            return None;
        }
        let shared = self.shared_triangles(a, b);
        if shared.is_empty() {
            return None;
        }

        let a_boundary = self.vertices[a].boundary;
        let b_boundary = self.vertices[b].boundary;

        // Two boundary vertices may only merge along the border itself;
        // a chord between two border points would pull the boundary
        // curve inward.
        if a_boundary && b_boundary && !self.is_boundary_edge(a, b) {
            return None;
        }

        if !self.merge_keeps_manifold(a, b, &shared) {
            return None;
        }

        let q = self.vertices[a].quadric + self.vertices[b].quadric;
        let pa = self.vertices[a].position;
        let pb = self.vertices[b].position;

        // Position policy: boundary endpoints pin the merge to an original
        // border point; interior merges try the quadric minimizer first and
        // degrade towards the endpoints.
        let positions: Vec<Point3f> = if a_boundary && b_boundary {
            vec![pa, pb]
        } else if a_boundary {
            vec![pa]
        } else if b_boundary {
            vec![pb]
        } else {
            let mid = nalgebra::center(&pa, &pb);
            match q.minimizer() {
                Some(opt) => vec![opt, mid, pa, pb],
                None => vec![mid, pa, pb],
            }
        };

        let mut scored: Vec<(Point3f, f64)> = positions
            .into_iter()
            .map(|p| {
                let cost = q.evaluate(&p).max(0.0);
                (p, cost)
            })
            .collect();
        scored.sort_by(|x, y| x.1.total_cmp(&y.1));

        let (position, mut cost) = scored
            .into_iter()
            .find(|(p, _)| self.merge_keeps_orientation(a, b, p, &shared, aggressiveness))?;

        let seam = self.is_uv_seam(a, b, &shared);
        if seam {
            cost *= uv_seam_penalty(aggressiveness);
        }
        let (merged_uvs, chart_uvs) = if seam || self.uv_channels.is_empty() {
            (Vec::new(), Vec::new())
        } else {
            (
                self.blended_uvs(a, b, &shared),
                self.chart_reference_uvs(a, b, shared[0]),
            )
        };

        let merged_degree = self
            .neighbors(a)
            .into_iter()
            .chain(self.neighbors(b))
            .filter(|&v| v != a && v != b)
            .unique()
            .count();

        Some(CollapseCandidate {
            a,
            b,
            position,
            cost,
            merged_degree,
            merged_uvs,
            chart_uvs,
        })
    }

    /// Reject merges that would leave an edge with more than two incident
    /// triangles. Every common neighbor of `a` and `b` must account for its
    /// merged edge count through the shared triangles that disappear.
    fn merge_keeps_manifold(&self, a: usize, b: usize, shared: &[usize]) -> bool {
        let nb: HashSet<usize> = self.neighbors(b).into_iter().collect();
        for v in self.neighbors(a) {
            if v == b || !nb.contains(&v) {
                continue;
            }
            let vanishing = shared
                .iter()
                .filter(|&&ti| self.triangle_has_vertex(ti, v))
                .count();
            let after = self.edge_triangle_count(a, v) + self.edge_triangle_count(b, v)
                - 2 * vanishing;
            if after > 2 {
                return false;
            }
        }
        true
    }

    /// Reject merge positions that flip a surviving triangle's winding
    /// beyond the tolerance or squash it to zero area.
    fn merge_keeps_orientation(
        &self,
        a: usize,
        b: usize,
        position: &Point3f,
        shared: &[usize],
        aggressiveness: f64,
    ) -> bool {
        let min_dot = normal_flip_min_dot(aggressiveness);
        for &moving in &[a, b] {
            for &ti in &self.adjacency[moving] {
                if shared.contains(&ti) {
                    continue;
                }
                let mut corners: [Vector3d; 3] = [Vector3d::zeros(); 3];
                let mut old: [Vector3d; 3] = [Vector3d::zeros(); 3];
                for (k, &vi) in self.triangles[ti].vertices.iter().enumerate() {
                    old[k] = self.vertices[vi].position.coords.cast();
                    corners[k] = if vi == moving {
                        position.coords.cast()
                    } else {
                        old[k]
                    };
                }
                let new_cross = (corners[1] - corners[0]).cross(&(corners[2] - corners[0]));
                let new_len = new_cross.norm();
                if 0.5 * new_len < DEGENERATE_AREA_EPSILON {
                    return false;
                }
                let old_cross = (old[1] - old[0]).cross(&(old[2] - old[0]));
                let old_len = old_cross.norm();
                if old_len > 0.0 && old_cross.dot(&new_cross) / (old_len * new_len) < min_dot {
                    return false;
                }
            }
        }
        true
    }

    /// Endpoint corner UVs per channel, sampled from one shared triangle.
    fn chart_reference_uvs(&self, a: usize, b: usize, ti: usize) -> Vec<(Point2f, Point2f)> {
        (0..self.uv_channels.len())
            .map(|ch| {
                (
                    self.corner_uv(ch, ti, a).unwrap_or_else(Point2f::origin),
                    self.corner_uv(ch, ti, b).unwrap_or_else(Point2f::origin),
                )
            })
            .collect()
    }

    /// Per-channel corner UV of vertex `vi` inside triangle `ti`.
    fn corner_uv(&self, channel: usize, ti: usize, vi: usize) -> Option<Point2f> {
        self.triangles[ti]
            .vertices
            .iter()
            .position(|&v| v == vi)
            .map(|corner| self.uv_channels[channel][ti][corner])
    }

    /// A seam is an edge whose incident triangles disagree on texture
    /// coordinates at a shared vertex.
    fn is_uv_seam(&self, a: usize, b: usize, shared: &[usize]) -> bool {
        if self.uv_channels.is_empty() || shared.len() < 2 {
            return false;
        }
        for channel in 0..self.uv_channels.len() {
            for &endpoint in &[a, b] {
                let uvs: Vec<Point2f> = shared
                    .iter()
                    .filter_map(|&ti| self.corner_uv(channel, ti, endpoint))
                    .collect();
                for pair in uvs.windows(2) {
                    if (pair[0] - pair[1]).norm() > UV_SEAM_THRESHOLD {
                        return true;
                    }
                }
            }
        }
        false
    }

    /// Area-weighted average of the corner UVs at `a` and `b` over the
    /// shared triangles, per channel.
    fn blended_uvs(&self, a: usize, b: usize, shared: &[usize]) -> Vec<Point2f> {
        let mut out = Vec::with_capacity(self.uv_channels.len());
        for channel in 0..self.uv_channels.len() {
            let mut accum = nalgebra::Vector2::<f32>::zeros();
            let mut weight = 0.0f32;
            for &ti in shared {
                let w = self.triangles[ti].area as f32;
                if let (Some(ua), Some(ub)) = (
                    self.corner_uv(channel, ti, a),
                    self.corner_uv(channel, ti, b),
                ) {
                    accum += (ua.coords + ub.coords) * 0.5 * w;
                    weight += w;
                }
            }
            if weight > f32::EPSILON {
                out.push(Point2f::from(accum / weight));
            } else {
                // Degenerate shared area: fall back to any corner at `a`
                let fallback = self.adjacency[a]
                    .iter()
                    .find_map(|&ti| self.corner_uv(channel, ti, a))
                    .unwrap_or_else(|| Point2f::new(0.0, 0.0));
                out.push(fallback);
            }
        }
        out
    }
}
