//! Error quadrics and their accumulation from incident face planes.
//!
//! Each face contributes the outer product of its homogeneous plane vector
//! with itself, scaled by the face area so larger faces weigh more. A
//! vertex quadric is the sum over its live incident faces, and the
//! quadratic form `v^T Q v` estimates the squared distance of a point to
//! that set of planes.

use std::ops::{Add, AddAssign};

use decimesh_core::{Point3f, Vector3d};
use nalgebra::{Matrix3, Vector3};
use rayon::prelude::*;

use crate::attributes::{DecimationMesh, Plane};

/// Area below which a triangle is treated as degenerate and excluded from
/// quadric accumulation.
pub(crate) const DEGENERATE_AREA_EPSILON: f64 = 1e-12;

/// Determinant magnitude below which the optimal-position solve is
/// considered singular and the evaluator falls back to the midpoint.
pub(crate) const SOLVER_EPSILON: f64 = 1e-10;

/// Symmetric 4x4 quadratic form stored as its 10 distinct coefficients in
/// row-major upper-triangular order.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct Quadric {
    m: [f64; 10],
}

impl Quadric {
    pub fn zero() -> Self {
        Self::default()
    }

    /// Quadric of a single plane `n . x + d = 0`, weighted by `area`.
    pub fn from_plane(plane: &Plane, area: f64) -> Self {
        let (a, b, c) = (plane.normal.x, plane.normal.y, plane.normal.z);
        let d = plane.offset;
        let w = area;
        Self {
            m: [
                w * a * a,
                w * a * b,
                w * a * c,
                w * a * d,
                w * b * b,
                w * b * c,
                w * b * d,
                w * c * c,
                w * c * d,
                w * d * d,
            ],
        }
    }

    /// Evaluate `v^T Q v` at a point (homogeneous w = 1).
    pub fn evaluate(&self, p: &Point3f) -> f64 {
        let (x, y, z) = (p.x as f64, p.y as f64, p.z as f64);
        let m = &self.m;
        m[0] * x * x
            + 2.0 * m[1] * x * y
            + 2.0 * m[2] * x * z
            + 2.0 * m[3] * x
            + m[4] * y * y
            + 2.0 * m[5] * y * z
            + 2.0 * m[6] * y
            + m[7] * z * z
            + 2.0 * m[8] * z
            + m[9]
    }

    /// Point minimizing the form, solved from the 3x3 upper block; `None`
    /// when the system is singular or produces a non-finite result.
    pub fn minimizer(&self) -> Option<Point3f> {
        let m = &self.m;
        let a = Matrix3::new(m[0], m[1], m[2], m[1], m[4], m[5], m[2], m[5], m[7]);
        if a.determinant().abs() < SOLVER_EPSILON {
            return None;
        }
        let rhs = -Vector3::new(m[3], m[6], m[8]);
        let p = a.try_inverse()? * rhs;
        if p.iter().all(|x| x.is_finite()) {
            Some(Point3f::new(p.x as f32, p.y as f32, p.z as f32))
        } else {
            None
        }
    }
}

impl Add for Quadric {
    type Output = Quadric;

    fn add(mut self, rhs: Quadric) -> Quadric {
        self += rhs;
        self
    }
}

impl AddAssign for Quadric {
    fn add_assign(&mut self, rhs: Quadric) {
        for (a, b) in self.m.iter_mut().zip(rhs.m.iter()) {
            *a += b;
        }
    }
}

impl DecimationMesh {
    /// Plane and area of a triangle from the current vertex positions;
    /// `None` for near-zero-area triangles.
    pub(crate) fn face_plane(&self, ti: usize) -> Option<(Plane, f64)> {
        let [a, b, c] = self.triangles[ti].vertices;
        let p0: Vector3d = self.vertices[a].position.coords.cast();
        let p1: Vector3d = self.vertices[b].position.coords.cast();
        let p2: Vector3d = self.vertices[c].position.coords.cast();

        let cross = (p1 - p0).cross(&(p2 - p0));
        let len = cross.norm();
        let area = 0.5 * len;
        if area < DEGENERATE_AREA_EPSILON {
            return None;
        }
        let normal = cross / len;
        let offset = -normal.dot(&p0);
        Some((Plane { normal, offset }, area))
    }

    /// Refresh the cached plane of a dirty triangle; triangles that have
    /// degenerated to near-zero area are tombstoned.
    pub(crate) fn refresh_plane(&mut self, ti: usize) {
        if self.triangles[ti].deleted || !self.triangles[ti].dirty {
            return;
        }
        match self.face_plane(ti) {
            Some((plane, area)) => {
                let t = &mut self.triangles[ti];
                t.plane = plane;
                t.area = area;
                t.dirty = false;
            }
            None => self.delete_triangle(ti),
        }
    }

    /// Initial accumulation: face planes in parallel, then a serial merge
    /// into the per-vertex quadrics.
    pub(crate) fn initialize_quadrics(&mut self) {
        let planes: Vec<Option<(Plane, f64)>> = {
            let this = &*self;
            (0..this.triangles.len())
                .into_par_iter()
                .map(|ti| {
                    if this.triangles[ti].deleted {
                        None
                    } else {
                        this.face_plane(ti)
                    }
                })
                .collect()
        };

        for (ti, entry) in planes.iter().enumerate() {
            if self.triangles[ti].deleted {
                continue;
            }
            match entry {
                Some((plane, area)) => {
                    let t = &mut self.triangles[ti];
                    t.plane = *plane;
                    t.area = *area;
                    t.dirty = false;
                }
                None => self.delete_triangle(ti),
            }
        }

        for v in &mut self.vertices {
            v.quadric = Quadric::zero();
        }
        for ti in 0..self.triangles.len() {
            if self.triangles[ti].deleted {
                continue;
            }
            let t = &self.triangles[ti];
            let q = Quadric::from_plane(&t.plane, t.area);
            for vi in t.vertices {
                self.vertices[vi].quadric += q;
            }
        }
    }

    /// Re-derive the quadric of one vertex from its live incident
    /// triangles, refreshing dirty planes on the way. Bumps the vertex
    /// generation so stale queued candidates get discarded.
    pub(crate) fn recompute_vertex_quadric(&mut self, vi: usize) {
        let incident: Vec<usize> = self.adjacency[vi].clone();
        for ti in incident {
            self.refresh_plane(ti);
        }
        // The adjacency may have shrunk if a refresh tombstoned a
        // degenerate triangle; re-read it.
        let mut q = Quadric::zero();
        for &ti in &self.adjacency[vi] {
            let t = &self.triangles[ti];
            q += Quadric::from_plane(&t.plane, t.area);
        }
        self.vertices[vi].quadric = q;
        self.bump_generation(vi);
    }
}
