//! Collapse scheduling: a lazily invalidated priority queue drives the
//! greedy loop from the initial mesh down to the triangle target.
//!
//! Queued entries capture the generation counters of both endpoints at
//! evaluation time. Any collapse that touches a vertex bumps its counter,
//! so a popped entry whose counters no longer match is re-evaluated
//! against the current mesh before anything is applied.

use std::cmp::Ordering;

use decimesh_core::TriangleMesh;
use priority_queue::PriorityQueue;

use crate::attributes::DecimationMesh;
use crate::topology::ordered;
use crate::{DecimationConfig, DecimationStats};

/// Base number of rejected pops tolerated per epoch before the queue is
/// rebuilt; scaled up with aggressiveness.
const REJECT_BUDGET_BASE: usize = 256;

/// Queue priority for one undirected edge. Ordering is reversed so the
/// max-priority queue pops the cheapest collapse first; ties break towards
/// the smaller merged degree, then the smaller edge key for determinism.
#[derive(Debug, Clone, Copy)]
struct QueuedCost {
    cost: f64,
    merged_degree: usize,
    edge: (usize, usize),
    generations: (u64, u64),
}

impl PartialEq for QueuedCost {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueuedCost {}

impl PartialOrd for QueuedCost {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedCost {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.merged_degree.cmp(&self.merged_degree))
            .then_with(|| other.edge.cmp(&self.edge))
    }
}

type EdgeQueue = PriorityQueue<(usize, usize), QueuedCost>;

/// Run phases of one decimation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Initializing,
    Collapsing,
    Compacting,
    Done,
}

/// Run the collapse loop down to `target_triangles` live triangles, then
/// compact the survivors into a fresh mesh.
pub(crate) fn execute(
    mesh: &mut DecimationMesh,
    config: &DecimationConfig,
    target_triangles: usize,
) -> (TriangleMesh, DecimationStats) {
    let mut stats = DecimationStats {
        input_triangles: mesh.live_triangles,
        target_triangles,
        ..DecimationStats::default()
    };

    let aggr = config.aggressiveness;
    let reject_budget = REJECT_BUDGET_BASE * (1 + aggr.ceil() as usize);

    let mut queue = EdgeQueue::new();
    let mut phase = Phase::Initializing;
    let mut output = TriangleMesh::new();
    while phase != Phase::Done {
        match phase {
            Phase::Initializing => {
                seed_queue(mesh, aggr, &mut queue);
                phase = Phase::Collapsing;
            }
            Phase::Collapsing => {
                collapse_loop(
                    mesh,
                    config,
                    target_triangles,
                    reject_budget,
                    &mut queue,
                    &mut stats,
                );
                phase = Phase::Compacting;
            }
            Phase::Compacting => {
                stats.achieved_triangles = mesh.live_triangles;
                output = mesh.compact();
                phase = Phase::Done;
            }
            Phase::Done => {}
        }
    }

    (output, stats)
}

fn collapse_loop(
    mesh: &mut DecimationMesh,
    config: &DecimationConfig,
    target_triangles: usize,
    reject_budget: usize,
    queue: &mut EdgeQueue,
    stats: &mut DecimationStats,
) {
    let aggr = config.aggressiveness;
    let mut applied_this_epoch = 0usize;
    let mut rejected_this_epoch = 0usize;
    let mut rebuilt_this_epoch = false;

    while mesh.live_triangles > target_triangles {
        let Some((edge, pri)) = queue.pop() else {
            // Drained without reaching the target; one reseed per epoch
            // picks up edges created by earlier collapses.
            if rebuilt_this_epoch {
                break;
            }
            seed_queue(mesh, aggr, queue);
            rebuilt_this_epoch = true;
            if queue.is_empty() {
                break;
            }
            continue;
        };

        if pri.generations != edge_generations(mesh, edge) {
            // Refresh rather than drop, so edges between two updated
            // neighbors are not silently lost.
            stats.stale_discarded += 1;
            if let Some(fresh) = evaluate_edge(mesh, edge, aggr) {
                queue.push(edge, fresh);
            }
            continue;
        }

        let (a, b) = orient(mesh, edge);
        let Some(cand) = mesh.evaluate_collapse(a, b, aggr) else {
            stats.candidates_rejected += 1;
            rejected_this_epoch += 1;
            if rejected_this_epoch > reject_budget {
                if rebuilt_this_epoch {
                    break;
                }
                seed_queue(mesh, aggr, queue);
                rebuilt_this_epoch = true;
                rejected_this_epoch = 0;
            }
            continue;
        };

        apply_collapse(mesh, &cand);

        stats.collapses_applied += 1;
        stats.max_applied_cost = stats.max_applied_cost.max(cand.cost);
        stats.applied_costs.push(cand.cost);

        for v in mesh.neighbors(cand.a) {
            let e = ordered(cand.a, v);
            if let Some(fresh) = evaluate_edge(mesh, e, aggr) {
                queue.push(e, fresh);
            }
        }

        applied_this_epoch += 1;
        if applied_this_epoch >= config.update {
            if config.recompute {
                mesh.rebuild_all();
            }
            queue.clear();
            seed_queue(mesh, aggr, queue);
            applied_this_epoch = 0;
            rejected_this_epoch = 0;
            rebuilt_this_epoch = false;
        }
    }
}

/// Prefer the boundary endpoint as the survivor so border geometry is
/// carried by the vertex that already owns it.
fn orient(mesh: &DecimationMesh, (u, v): (usize, usize)) -> (usize, usize) {
    if mesh.vertices[v].boundary && !mesh.vertices[u].boundary {
        (v, u)
    } else {
        (u, v)
    }
}

fn edge_generations(mesh: &DecimationMesh, (u, v): (usize, usize)) -> (u64, u64) {
    (mesh.vertices[u].generation, mesh.vertices[v].generation)
}

fn evaluate_edge(mesh: &DecimationMesh, edge: (usize, usize), aggr: f64) -> Option<QueuedCost> {
    let (a, b) = orient(mesh, edge);
    let cand = mesh.evaluate_collapse(a, b, aggr)?;
    Some(QueuedCost {
        cost: cand.cost,
        merged_degree: cand.merged_degree,
        edge,
        generations: edge_generations(mesh, edge),
    })
}

fn seed_queue(mesh: &DecimationMesh, aggr: f64, queue: &mut EdgeQueue) {
    for edge in mesh.live_edges() {
        if let Some(pri) = evaluate_edge(mesh, edge, aggr) {
            queue.push(edge, pri);
        }
    }
}

fn apply_collapse(mesh: &mut DecimationMesh, cand: &crate::candidate::CollapseCandidate) {
    let (a, b) = (cand.a, cand.b);

    // UV write-back happens while both endpoints still own their corners.
    if !cand.merged_uvs.is_empty() {
        let refs_a: Vec<_> = cand.chart_uvs.iter().map(|r| r.0).collect();
        let refs_b: Vec<_> = cand.chart_uvs.iter().map(|r| r.1).collect();
        mesh.write_vertex_uvs(a, &refs_a, &cand.merged_uvs);
        mesh.write_vertex_uvs(b, &refs_b, &cand.merged_uvs);
    }

    for ti in mesh.shared_triangles(a, b) {
        mesh.delete_triangle(ti);
    }
    mesh.retarget_vertex(b, a);

    mesh.vertices[a].position = cand.position;
    // Every live triangle around the survivor changed shape, not only the
    // retargeted ones.
    for i in 0..mesh.adjacency[a].len() {
        let ti = mesh.adjacency[a][i];
        mesh.triangles[ti].dirty = true;
    }

    mesh.vertices[b].deleted = true;
    mesh.vertices[a].boundary |= mesh.vertices[b].boundary;
    mesh.bump_generation(b);

    mesh.recompute_vertex_quadric(a);
    for v in mesh.neighbors(a) {
        mesh.recompute_vertex_quadric(v);
    }
    mesh.reclassify_boundary_around(a);
}
