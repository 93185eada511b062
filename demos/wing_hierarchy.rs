//! Wing and fuselage meshing example
//!
//! Samples a tapered wing with wrapped NACA 0012 sections and a pointed
//! fuselage, meshes both in parallel and prints the multigrid hierarchy.

use nalgebra::Point3;
use surf2mesh::prelude::*;
use surf2mesh::quality::QualityController;

/// Half thickness of a NACA 0012 section (closed trailing edge) at chord fraction `x`
fn naca0012(x: f64) -> f64 {
    0.6 * (0.2969 * x.sqrt() - 0.1260 * x - 0.3516 * x.powi(2) + 0.2843 * x.powi(3) - 0.1036 * x.powi(4))
}

/// Wrapped sections from the trailing edge round the lower surface to the
/// leading edge and back along the upper surface
fn wing_samples(stations: usize, half_points: usize) -> SurfaceSamples {
    let (root, tip, span, sweep) = (2.0, 0.8, 6.0, 0.6);
    let num_j = 2 * half_points - 1;
    let mut points = Vec::with_capacity(stations * num_j);

    for i in 0..stations {
        let eta = i as f64 / (stations - 1) as f64;
        let chord = root + (tip - root) * eta;
        let (x_le, y) = (sweep * eta * span / 2.0, eta * span);
        for j in 0..num_j {
            // cosine spacing, leading edge at the middle index
            let k = j.abs_diff(half_points - 1);
            let x = 0.5 * (1.0 - (std::f64::consts::PI * k as f64 / (half_points - 1) as f64).cos());
            let side = if j < half_points - 1 { -1.0 } else { 1.0 };
            points.push(Point3::new(x_le + chord * x, y, side * chord * naca0012(x)));
        }
    }
    SurfaceSamples::from_points("MainWing", SurfaceKind::Wing, stations, num_j, &points)
}

fn fuselage_samples(stations: usize, around: usize) -> SurfaceSamples {
    let (length, radius) = (10.0, 0.7);
    let mut points = Vec::with_capacity(stations * (around + 1));
    for i in 0..stations {
        let x = length * i as f64 / (stations - 1) as f64;
        let r = radius * (std::f64::consts::PI * x / length).sin().sqrt();
        for j in 0..=around {
            let theta = std::f64::consts::TAU * j as f64 / around as f64;
            points.push(Point3::new(x - 3.0, r * theta.cos(), r * theta.sin()));
        }
    }
    let mut samples =
        SurfaceSamples::from_points("Fuselage", SurfaceKind::Body, stations, around + 1, &points);
    samples.plate_case = PlateCase::Horizontal;
    samples
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    println!("=== Surface Mesh Hierarchy ===");
    println!();

    let config = MeshingConfig::default()
        .with_angle_of_attack(4.0)
        .with_max_grid_levels(6);
    let surfaces = MeshPipeline::new(config)
        .process_samples(&[wing_samples(17, 21), fuselage_samples(25, 24)])?;

    for surface in &surfaces {
        println!("{} ({:?}, id {})", surface.name(), surface.kind(), surface.surface_id());
        println!(
            "  nose {}, tail {}",
            if surface.is_nose_closed() { "closed" } else { "open" },
            if surface.is_tail_closed() { "closed" } else { "open" }
        );
        println!("  wetted area:   {:.4}", surface.wetted_area());
        println!("  average chord: {:.4}", surface.average_chord());
        if let (Some(first), Some(last)) = (
            surface.local_chord(1),
            surface.local_chord(surface.number_of_span_stations()),
        ) {
            println!(
                "  local chord:   {first:.4} .. {last:.4} over {} stations",
                surface.number_of_span_stations()
            );
        }

        for level in surface.hierarchy().iter() {
            let quality = QualityController::new().validate_level(level);
            let upwind = |tag: Upwind| level.edges.iter().filter(|e| e.upwind == tag).count();
            println!(
                "  level {}: {:5} elements {:5} edges, watertight {}, inflow {} outflow {}",
                level.level,
                level.num_elements(),
                level.num_edges(),
                quality.watertight,
                upwind(Upwind::Inflow),
                upwind(Upwind::Outflow)
            );
        }
        println!();
    }

    Ok(())
}
