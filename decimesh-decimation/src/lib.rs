//! Mesh decimation through quadric error metrics
//!
//! This crate reduces triangle meshes by greedy edge collapse, choosing at
//! every step the collapse with the least quadric error:
//! - Boundary-aware collapse validity rules
//! - UV seam detection with cost penalties
//! - Lazily invalidated priority scheduling

mod attributes;
mod candidate;
mod compact;
mod quadric;
mod scheduler;
mod topology;

use decimesh_core::{Error, Result, TriangleMesh};

use crate::attributes::DecimationMesh;

/// Reduce a mesh towards a triangle budget.
pub trait MeshDecimator {
    /// Decimate `mesh` until at most `target` triangles remain.
    fn decimate(&self, mesh: &TriangleMesh, target: DecimationTarget) -> Result<TriangleMesh>;
}

/// How many triangles to keep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DecimationTarget {
    /// Absolute number of triangles to keep.
    TriangleCount(usize),
    /// Fraction of the input triangles to keep, in `0.0..=1.0`.
    Ratio(f32),
}

impl DecimationTarget {
    fn resolve(&self, input_triangles: usize) -> Result<usize> {
        match *self {
            DecimationTarget::TriangleCount(n) => Ok(n),
            DecimationTarget::Ratio(r) => {
                if !(0.0..=1.0).contains(&r) || !r.is_finite() {
                    return Err(Error::InvalidConfig(format!(
                        "keep ratio must be in 0.0..=1.0, got {}",
                        r
                    )));
                }
                Ok((input_triangles as f64 * r as f64).ceil() as usize)
            }
        }
    }
}

/// Tuning knobs for one decimation run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecimationConfig {
    /// Trades fidelity for reduction: higher values loosen the normal-flip
    /// tolerance, soften the UV seam penalty, and raise the per-epoch
    /// budget of rejected candidates.
    pub aggressiveness: f64,
    /// Rebuild topology and all quadrics from scratch at every epoch
    /// boundary instead of maintaining them incrementally.
    pub recompute: bool,
    /// Collapses per epoch; the queue is reseeded at each boundary.
    pub update: usize,
}

impl Default for DecimationConfig {
    fn default() -> Self {
        Self {
            aggressiveness: 7.0,
            recompute: false,
            update: 5,
        }
    }
}

impl DecimationConfig {
    fn validate(&self) -> Result<()> {
        if !self.aggressiveness.is_finite() || self.aggressiveness < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "aggressiveness must be finite and non-negative, got {}",
                self.aggressiveness
            )));
        }
        if self.update == 0 {
            return Err(Error::InvalidConfig(
                "update cadence must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Counters describing what one decimation run did.
#[derive(Debug, Clone, Default)]
pub struct DecimationStats {
    pub input_triangles: usize,
    pub target_triangles: usize,
    pub achieved_triangles: usize,
    pub collapses_applied: usize,
    /// Popped candidates that failed re-validation against the live mesh.
    pub candidates_rejected: usize,
    /// Popped entries whose endpoint generations had moved on.
    pub stale_discarded: usize,
    pub max_applied_cost: f64,
    /// Cost of each applied collapse, in application order.
    pub applied_costs: Vec<f64>,
}

/// Quadric error metric decimator.
#[derive(Debug, Clone, Default)]
pub struct QuadricDecimator {
    pub config: DecimationConfig,
}

impl QuadricDecimator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: DecimationConfig) -> Self {
        Self { config }
    }

    /// Decimate and report run statistics alongside the result.
    pub fn decimate_with_stats(
        &self,
        mesh: &TriangleMesh,
        target: DecimationTarget,
    ) -> Result<(TriangleMesh, DecimationStats)> {
        self.config.validate()?;
        if mesh.is_empty() {
            return Err(Error::InvalidMesh(
                "cannot decimate an empty mesh".to_string(),
            ));
        }
        let target_triangles = target.resolve(mesh.face_count())?;

        if target_triangles >= mesh.face_count() {
            // Already at or below budget; hand the input back untouched.
            let stats = DecimationStats {
                input_triangles: mesh.face_count(),
                target_triangles,
                achieved_triangles: mesh.face_count(),
                ..DecimationStats::default()
            };
            return Ok((mesh.clone(), stats));
        }

        let mut working = DecimationMesh::build(mesh)?;
        Ok(scheduler::execute(&mut working, &self.config, target_triangles))
    }
}

impl MeshDecimator for QuadricDecimator {
    fn decimate(&self, mesh: &TriangleMesh, target: DecimationTarget) -> Result<TriangleMesh> {
        self.decimate_with_stats(mesh, target).map(|(m, _)| m)
    }
}

/// Decimate a mesh with default settings.
pub fn decimate_mesh(mesh: &TriangleMesh, target: DecimationTarget) -> Result<TriangleMesh> {
    QuadricDecimator::new().decimate(mesh, target)
}
