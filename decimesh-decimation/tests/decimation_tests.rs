//! End-to-end decimation scenarios through the public API.

use decimesh_core::TriangleMesh;
use decimesh_decimation::{
    decimate_mesh, DecimationConfig, DecimationTarget, MeshDecimator, QuadricDecimator,
};
use nalgebra::{Point2, Point3};

fn make_cube() -> TriangleMesh {
    let vertices = vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(1.0, 1.0, 0.0),
        Point3::new(0.0, 1.0, 0.0),
        Point3::new(0.0, 0.0, 1.0),
        Point3::new(1.0, 0.0, 1.0),
        Point3::new(1.0, 1.0, 1.0),
        Point3::new(0.0, 1.0, 1.0),
    ];
    let faces = vec![
        [0, 2, 1],
        [0, 3, 2],
        [4, 5, 6],
        [4, 6, 7],
        [0, 1, 5],
        [0, 5, 4],
        [2, 3, 7],
        [2, 7, 6],
        [0, 4, 7],
        [0, 7, 3],
        [1, 2, 6],
        [1, 6, 5],
    ];
    TriangleMesh::from_vertices_and_faces(vertices, faces)
}

fn make_grid(size: usize) -> TriangleMesh {
    let mut vertices = Vec::new();
    for y in 0..size {
        for x in 0..size {
            vertices.push(Point3::new(x as f32, y as f32, 0.0));
        }
    }
    let mut faces = Vec::new();
    for y in 0..(size - 1) {
        for x in 0..(size - 1) {
            let tl = y * size + x;
            let tr = tl + 1;
            let bl = (y + 1) * size + x;
            let br = bl + 1;
            faces.push([tl, bl, tr]);
            faces.push([tr, bl, br]);
        }
    }
    TriangleMesh::from_vertices_and_faces(vertices, faces)
}

/// A grid textured as two charts split down the middle, so every edge on
/// the center column is a UV seam.
fn make_seamed_grid(size: usize) -> TriangleMesh {
    let mut mesh = make_grid(size);
    let half = (size - 1) as f32 / 2.0;
    let mut channel = Vec::new();
    for f in &mesh.faces {
        let center_x: f32 = f.iter().map(|&v| mesh.vertices[v].x).sum::<f32>() / 3.0;
        let left = center_x < half;
        let corner = |v: usize| {
            let p = mesh.vertices[v];
            if left {
                // Left chart occupies u in 0.0..=0.4
                Point2::new(p.x / (size as f32) * 0.4, p.y / size as f32)
            } else {
                // Right chart occupies u in 0.6..=1.0
                Point2::new(0.6 + p.x / (size as f32) * 0.4, p.y / size as f32)
            }
        };
        channel.push([corner(f[0]), corner(f[1]), corner(f[2])]);
    }
    mesh.add_uv_channel(channel);
    mesh
}

#[test]
fn test_cube_decimates_to_two_triangles() {
    let cube = make_cube();
    let decimator = QuadricDecimator::new();
    let (out, stats) = decimator
        .decimate_with_stats(&cube, DecimationTarget::TriangleCount(2))
        .unwrap();
    assert_eq!(out.face_count(), 2);
    assert!(out.vertex_count() >= 3 && out.vertex_count() <= 4);
    assert_eq!(stats.input_triangles, 12);
    assert_eq!(stats.achieved_triangles, 2);
}

#[test]
fn test_grid_half_reduction_keeps_border_on_polyline() {
    let size = 8;
    let grid = make_grid(size);
    let out = decimate_mesh(&grid, DecimationTarget::Ratio(0.5)).unwrap();

    assert!(out.face_count() <= grid.face_count() / 2 + 1);
    assert!(out.face_count() > 0);

    // Border survivors must be original border points: the collapse rules
    // never blend two border positions.
    let max = (size - 1) as f32;
    for v in &out.vertices {
        let on_border = v.x == 0.0 || v.x == max || v.y == 0.0 || v.y == max;
        if on_border {
            assert_eq!(v.x.fract(), 0.0, "border vertex moved off grid: {:?}", v);
            assert_eq!(v.y.fract(), 0.0, "border vertex moved off grid: {:?}", v);
        }
    }
}

#[test]
fn test_decimation_is_idempotent_at_target() {
    let grid = make_grid(6);
    let target = DecimationTarget::TriangleCount(20);
    let once = decimate_mesh(&grid, target).unwrap();
    let twice = decimate_mesh(&once, target).unwrap();
    assert_eq!(once.vertices, twice.vertices);
    assert_eq!(once.faces, twice.faces);
}

#[test]
fn test_seam_survives_moderate_reduction() {
    let mesh = make_seamed_grid(8);
    let decimator = QuadricDecimator::new();
    let (out, _) = decimator
        .decimate_with_stats(&mesh, DecimationTarget::Ratio(0.6))
        .unwrap();

    assert_eq!(out.uv_channels.len(), 1);
    let channel = &out.uv_channels[0];
    assert_eq!(channel.len(), out.face_count());

    // Both charts must still be represented: seam collapses are penalized
    // and never smear one chart's coordinates into the other.
    let mut has_left = false;
    let mut has_right = false;
    for corners in channel {
        for uv in corners {
            assert!(uv.x.is_finite() && uv.y.is_finite());
            assert!(
                uv.x <= 0.45 || uv.x >= 0.55,
                "UV bled across the seam gap: {:?}",
                uv
            );
            has_left |= uv.x <= 0.45;
            has_right |= uv.x >= 0.55;
        }
    }
    assert!(has_left && has_right);
}

#[test]
fn test_applied_costs_accumulate_monotonically() {
    let grid = make_grid(7);
    let decimator = QuadricDecimator::new();
    let (_, stats) = decimator
        .decimate_with_stats(&grid, DecimationTarget::Ratio(0.3))
        .unwrap();

    assert!(stats.collapses_applied > 0);
    let mut running = 0.0f64;
    for &cost in &stats.applied_costs {
        assert!(cost >= 0.0);
        let next = running + cost;
        assert!(next >= running);
        running = next;
    }
    assert!(stats.max_applied_cost <= running.max(stats.max_applied_cost));
}

#[test]
fn test_closed_mesh_stays_closed() {
    let cube = make_cube();
    let out = decimate_mesh(&cube, DecimationTarget::TriangleCount(6)).unwrap();

    // Every edge of a closed result is shared by exactly two faces
    use std::collections::HashMap;
    let mut edge_count: HashMap<(usize, usize), usize> = HashMap::new();
    for f in &out.faces {
        for (u, v) in [(f[0], f[1]), (f[1], f[2]), (f[2], f[0])] {
            let key = if u < v { (u, v) } else { (v, u) };
            *edge_count.entry(key).or_insert(0) += 1;
        }
    }
    for (&edge, &count) in &edge_count {
        assert_eq!(count, 2, "edge {:?} is not manifold-closed", edge);
    }
}

#[test]
fn test_recompute_configuration_reaches_target() {
    let grid = make_grid(6);
    let decimator = QuadricDecimator::with_config(DecimationConfig {
        recompute: true,
        update: 1,
        ..DecimationConfig::default()
    });
    let out = decimator
        .decimate(&grid, DecimationTarget::TriangleCount(15))
        .unwrap();
    assert!(out.face_count() <= 15);
}

#[test]
fn test_aggressiveness_zero_is_conservative() {
    let grid = make_grid(6);
    let gentle = QuadricDecimator::with_config(DecimationConfig {
        aggressiveness: 0.0,
        ..DecimationConfig::default()
    });
    let out = gentle
        .decimate(&grid, DecimationTarget::Ratio(0.5))
        .unwrap();
    assert!(out.face_count() > 0);
}

#[test]
fn test_welded_soup_decimates() {
    // Triangle soup with duplicated border vertices, welded before the run
    // the way an indexed-from-soup pipeline would.
    let mut mesh = TriangleMesh::new();
    let quads = [
        [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)],
        [(1.0, 0.0), (2.0, 0.0), (2.0, 1.0), (1.0, 1.0)],
    ];
    for q in quads {
        let base = mesh.vertex_count();
        for (x, y) in q {
            mesh.add_vertex(Point3::new(x, y, 0.0));
        }
        mesh.add_face([base, base + 1, base + 2]);
        mesh.add_face([base, base + 2, base + 3]);
    }
    let removed = mesh.merge_coincident_vertices(1e-6);
    assert_eq!(removed, 2);

    let out = decimate_mesh(&mesh, DecimationTarget::TriangleCount(2)).unwrap();
    assert!(out.face_count() <= 4);
}
