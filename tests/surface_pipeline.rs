//! End-to-end meshing of wings and bodies

use approx::assert_relative_eq;
use nalgebra::Point3;
use surf2mesh::prelude::*;
use surf2mesh::quality::{is_watertight, QualityController};
use surf2mesh::{GeomNode, Grid2};

/// Structured grid from a node generator taking 1-based `(i, j)`
fn grid(rows: usize, cols: usize, node: impl Fn(usize, usize) -> Point3<f64>) -> Grid2<GeomNode> {
    let mut nodes = Vec::with_capacity(rows * cols);
    for i in 1..=rows {
        for j in 1..=cols {
            let p = node(i, j);
            nodes.push(GeomNode::new(p.x, p.y, p.z, 0.0, 0.0));
        }
    }
    Grid2::from_vec(rows, cols, nodes).unwrap()
}

fn surface(kind: SurfaceKind, config: MeshingConfig, geometry: Grid2<GeomNode>) -> Surface {
    let mut surface = Surface::new("Test", kind, config);
    surface.set_geometry(geometry).unwrap();
    surface
}

/// Unit-spaced flat wing: chordwise x along J, spanwise y along I
fn flat_wing(rows: usize, cols: usize, config: MeshingConfig) -> Surface {
    surface(
        SurfaceKind::Wing,
        config,
        grid(rows, cols, |i, j| Point3::new((j - 1) as f64, (i - 1) as f64, 0.0)),
    )
}

#[test]
fn five_by_four_wing_coarsens_into_rows() {
    let config = MeshingConfig::default()
        .with_agglomeration(AgglomerationConfig::default().with_target_cell_size(6));
    let mut wing = flat_wing(5, 4, config);
    MeshPipeline::new(config).run(&mut wing, 1).unwrap();

    let fine = wing.fine_grid().unwrap();
    assert_eq!(fine.num_elements(), 24);
    assert_relative_eq!(wing.wetted_area(), 12.0, epsilon = 1e-12);

    assert_eq!(wing.num_grid_levels(), 2);
    let coarse = wing.grid(1).unwrap();
    assert_eq!(coarse.num_elements(), 4);
    for (k, cell) in coarse.elements.iter().enumerate() {
        assert_eq!(cell.children, (6 * k..6 * k + 6).collect::<Vec<_>>());
        assert_relative_eq!(cell.area, 3.0, epsilon = 1e-12);
    }
    assert!(coarse.edges.iter().all(|e| e.upwind != Upwind::Unset));
}

#[test]
fn level_lookup_clamps_to_coarsest() {
    let config = MeshingConfig::default()
        .with_max_grid_levels(3)
        .with_agglomeration(AgglomerationConfig::default().with_target_cell_size(4));
    let mut wing = flat_wing(9, 9, config);
    wing.create_mesh(1).unwrap();
    assert_eq!(wing.agglomerate_mesh().unwrap(), 3);

    let clamped = wing.grid(10).unwrap();
    assert_eq!(clamped.level, 2);
    assert!(std::ptr::eq(clamped, wing.grid(2).unwrap()));
}

#[test]
fn pinched_tip_produces_no_empty_triangles() {
    // chords 2, 1, 0 at y = 0, 1, 2: a triangle planform of area 2
    let geometry = grid(3, 3, |i, j| {
        let chord = (3 - i) as f64;
        Point3::new(chord * (j - 1) as f64 / 2.0, (i - 1) as f64, 0.0)
    });
    let mut wing = surface(SurfaceKind::Wing, MeshingConfig::default(), geometry);
    wing.create_mesh(1).unwrap();

    assert!(wing.is_tail_closed());
    assert!(!wing.is_nose_closed());
    let fine = wing.fine_grid().unwrap();
    assert_eq!(fine.num_elements(), 6);
    assert!(fine.elements.iter().all(|e| e.area > 0.0));
    assert_relative_eq!(wing.wetted_area(), 2.0, epsilon = 1e-12);
    assert_eq!(wing.number_of_span_stations(), 2);
    assert_relative_eq!(wing.local_chord(1).unwrap(), 1.5, epsilon = 1e-12);
    assert_relative_eq!(wing.local_chord(2).unwrap(), 0.5, epsilon = 1e-12);
}

#[test]
fn collapsed_interior_station_fans_from_both_sides() {
    // bow tie: chords 2, 1, 0, 1, 2 at y = 0..4, pinched at the middle row
    let geometry = grid(5, 3, |i, j| {
        let chord = (i as f64 - 3.0).abs();
        Point3::new(chord * (j as f64 - 2.0) / 2.0, (i - 1) as f64, 0.0)
    });
    let mut wing = surface(SurfaceKind::Wing, MeshingConfig::default(), geometry);
    wing.create_mesh(1).unwrap();

    let report = wing.degeneracy().unwrap();
    assert_eq!(report.x_sections, vec![false, false, true, false, false]);
    assert!(!wing.is_nose_closed() && !wing.is_tail_closed());

    let fine = wing.fine_grid().unwrap();
    // two full strips, then one fan triangle per quad on each side of the pinch
    assert_eq!(fine.num_elements(), 4 + 2 + 2 + 4);
    assert!(fine.elements.iter().all(|e| e.area > 0.0));
    assert_relative_eq!(wing.wetted_area(), 4.0, epsilon = 1e-12);
}

#[test]
fn collapsed_span_section_fans_into_the_apex() {
    // quarter disc of radius 3 sampled on rays; column 1 sits on the centre
    let rays = 4;
    let step = std::f64::consts::FRAC_PI_2 / (rays - 1) as f64;
    let geometry = grid(rays, 4, |i, j| {
        let (r, theta) = ((j - 1) as f64, step * (i - 1) as f64);
        Point3::new(r * theta.cos(), r * theta.sin(), 0.0)
    });
    let mut wing = surface(SurfaceKind::Wing, MeshingConfig::default(), geometry);
    wing.create_mesh(1).unwrap();

    let report = wing.degeneracy().unwrap();
    assert_eq!(report.span_sections, vec![true, false, false, false]);

    let fine = wing.fine_grid().unwrap();
    assert_eq!(fine.num_elements(), 3 * (1 + 2 + 2));
    assert!(fine.elements.iter().all(|e| e.area > 0.0));
    let reference = (rays - 1) as f64 * 0.5 * 9.0 * step.sin();
    assert_relative_eq!(wing.wetted_area(), reference, epsilon = 1e-12);
}

#[test]
fn pointed_body_is_closed_and_watertight() {
    let (stations, around) = (7, 12);
    let geometry = grid(stations, around + 1, |i, j| {
        let x = (i - 1) as f64;
        let r = (std::f64::consts::PI * x / (stations - 1) as f64).sin();
        let theta = std::f64::consts::TAU * (j - 1) as f64 / around as f64;
        Point3::new(x, r * theta.cos(), r * theta.sin())
    });
    let mut body = surface(SurfaceKind::Body, MeshingConfig::default(), geometry);
    body.set_plate_case(PlateCase::Vertical);
    MeshPipeline::default().run(&mut body, 3).unwrap();

    assert!(body.is_nose_closed() && body.is_tail_closed());
    let fine = body.fine_grid().unwrap();
    assert_eq!(fine.boundary_edges().count(), 0);
    assert_eq!(fine.num_elements(), 2 * around + 2 * around * (stations - 3));

    for level in body.hierarchy().iter() {
        assert!(is_watertight(level), "level {}", level.level);
        let metrics = QualityController::new().validate_level(level);
        assert_eq!(metrics.degenerate_elements, 0);
    }
    assert_eq!(body.grids().num_plate_j(), (around + 2) / 2);
    assert!(body.average_chord() > 0.0);
}

#[test]
fn open_body_is_capped() {
    let around = 8;
    let geometry = grid(4, around + 1, |i, j| {
        let theta = std::f64::consts::TAU * (j - 1) as f64 / around as f64;
        Point3::new(i as f64, theta.cos(), theta.sin())
    });
    let mut body = surface(SurfaceKind::Body, MeshingConfig::default(), geometry.clone());
    body.create_mesh(1).unwrap();
    assert_eq!(body.fine_grid().unwrap().boundary_edges().count(), 0);

    let mut tube = surface(
        SurfaceKind::Body,
        MeshingConfig::default().with_cap_open_ends(false),
        geometry,
    );
    tube.create_mesh(1).unwrap();
    assert_eq!(tube.fine_grid().unwrap().boundary_edges().count(), 2 * around);
}

#[test]
fn copy_then_mutate_leaves_original_alone() {
    let mut original = flat_wing(4, 4, MeshingConfig::default());
    MeshPipeline::default().run(&mut original, 1).unwrap();
    let levels = original.num_grid_levels();
    let fine_nodes = original.fine_grid().unwrap().nodes.clone();

    let mut copy = original.clone();
    for node in copy.geometry_mut().iter_mut() {
        node.xyz.z += 1.0;
    }
    copy.create_mesh(2).unwrap();
    copy.set_cd0(0.02);

    assert!(original.grids().geometry().iter().all(|n| n.xyz.z == 0.0));
    assert_eq!(original.fine_grid().unwrap().nodes, fine_nodes);
    assert_eq!(original.num_grid_levels(), levels);
    assert_eq!(copy.num_grid_levels(), 1);
    assert_eq!(original.cd0(), 0.0);
}

#[test]
fn pipeline_meshes_a_configuration() {
    let wing = SurfaceSamples::from_points(
        "Wing",
        SurfaceKind::Wing,
        3,
        5,
        &(0..15)
            .map(|k| Point3::new((k % 5) as f64 * 0.25, (k / 5) as f64, 0.0))
            .collect::<Vec<_>>(),
    );
    let mut pod = SurfaceSamples::from_points(
        "Pod",
        SurfaceKind::Body,
        4,
        7,
        &(0..28)
            .map(|k| {
                let theta = std::f64::consts::TAU * (k % 7) as f64 / 6.0;
                Point3::new((k / 7) as f64, 0.2 * theta.cos(), 0.2 * theta.sin())
            })
            .collect::<Vec<_>>(),
    );
    pod.plate_case = PlateCase::Horizontal;

    let config = MeshingConfig::default().with_angle_of_attack(5.0);
    let surfaces = MeshPipeline::new(config).process_samples(&[wing, pod]).unwrap();

    assert_eq!(surfaces.len(), 2);
    assert_eq!(surfaces[0].surface_id(), 1);
    assert_eq!(surfaces[1].surface_id(), 2);
    assert_eq!(surfaces[1].fine_grid().unwrap().surface_id, 2);
    assert_relative_eq!(surfaces[0].wetted_area(), 2.0, epsilon = 1e-12);
    for surface in &surfaces {
        assert!(surface.num_grid_levels() >= 2, "{}", surface.name());
        assert_eq!(surface.config().flow.alpha_deg, 5.0);
    }
}

#[test]
fn invalid_grids_are_reported_with_context() {
    let mut surface = Surface::new("Strut", SurfaceKind::Wing, MeshingConfig::default());
    let err = surface.size_geometry_lists(1, 5).unwrap_err();
    assert!(matches!(err, MeshError::InvalidDimensions { num_i: 1, num_j: 5, .. }));

    surface.size_geometry_lists(3, 3).unwrap();
    let err = surface.node(4, 1).unwrap_err();
    assert!(matches!(err, MeshError::IndexOutOfRange { i: 4, j: 1, num_i: 3, num_j: 3, .. }));
    assert!(err.to_string().contains("Strut"));
}
