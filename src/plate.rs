//! Flat-plate representation of a sampled surface
//!
//! Thin-surface aerodynamics works on a collapsed version of the geometry:
//! a wing becomes its camber surface, a body becomes a planar strip through
//! its section centroids. Normals are attached to every plate node.

use crate::grid::{GeomNode, Grid2, PlateNode};
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Plane a body is collapsed onto
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlateCase {
    /// Strip in the x-z plane, normal along y
    Vertical,
    /// Strip in the x-y plane, normal along z
    #[default]
    Horizontal,
}

impl PlateCase {
    fn axis(self) -> Vector3<f64> {
        match self {
            Self::Vertical => Vector3::y(),
            Self::Horizontal => Vector3::z(),
        }
    }
}

/// True when every X-section is a closed loop: the first and last J nodes
/// coincide within `tolerance` on every row.
pub fn seam_closed(geometry: &Grid2<GeomNode>, tolerance: f64) -> bool {
    let cols = geometry.cols();
    cols > 2
        && (1..=geometry.rows()).all(|i| {
            (geometry[(i, 1)].xyz - geometry[(i, cols)].xyz).norm() <= tolerance
        })
}

/// Camber surface of a wing.
///
/// Wrapped airfoil sections (closed seam, odd J count, leading edge at the
/// middle J index) are averaged upper against lower. Anything else is
/// already a sheet and is copied as is.
pub fn wing_plate(geometry: &Grid2<GeomNode>, tolerance: f64) -> Grid2<PlateNode> {
    let (rows, cols) = (geometry.rows(), geometry.cols());

    if cols % 2 == 1 && seam_closed(geometry, tolerance) {
        let m = (cols + 1) / 2;
        let mut positions = Vec::with_capacity(rows * m);
        for i in 1..=rows {
            for k in 1..=m {
                let lower = geometry[(i, m + 1 - k)].xyz;
                let upper = geometry[(i, m + k - 1)].xyz;
                positions.push(nalgebra::center(&lower, &upper));
            }
        }
        return with_normals(rows, m, positions, Vector3::z());
    }

    let positions = geometry.iter().map(|node| node.xyz).collect();
    with_normals(rows, cols, positions, Vector3::z())
}

/// Planar strip through the section centroids of a body
pub fn body_plate(geometry: &Grid2<GeomNode>, case: PlateCase, tolerance: f64) -> Grid2<PlateNode> {
    let (rows, cols) = (geometry.rows(), geometry.cols());
    let m = ((cols + 1) / 2).max(2);
    let distinct = if seam_closed(geometry, tolerance) { cols - 1 } else { cols };

    let mut positions = Vec::with_capacity(rows * m);
    for i in 1..=rows {
        let Some(row) = geometry.row(i) else { continue };
        let section = &row[..distinct];
        let centroid = section
            .iter()
            .fold(Vector3::zeros(), |acc, node| acc + node.xyz.coords)
            / distinct as f64;

        let coordinate = |node: &GeomNode| match case {
            PlateCase::Horizontal => node.xyz.y,
            PlateCase::Vertical => node.xyz.z,
        };
        let lo = section.iter().map(coordinate).fold(f64::INFINITY, f64::min);
        let hi = section.iter().map(coordinate).fold(f64::NEG_INFINITY, f64::max);

        for k in 0..m {
            let s = lo + (hi - lo) * k as f64 / (m - 1) as f64;
            let mut p = Point3::from(centroid);
            match case {
                PlateCase::Horizontal => p.y = s,
                PlateCase::Vertical => p.z = s,
            }
            positions.push(p);
        }
    }

    with_normals(rows, m, positions, case.axis())
}

fn with_normals(
    rows: usize,
    cols: usize,
    positions: Vec<Point3<f64>>,
    fallback: Vector3<f64>,
) -> Grid2<PlateNode> {
    let at = |i: usize, j: usize| positions[(i - 1) * cols + (j - 1)];

    let mut nodes = Vec::with_capacity(positions.len());
    for i in 1..=rows {
        for j in 1..=cols {
            let ti = at((i + 1).min(rows), j) - at(i.saturating_sub(1).max(1), j);
            let tj = at(i, (j + 1).min(cols)) - at(i, j.saturating_sub(1).max(1));
            let normal = ti
                .cross(&tj)
                .try_normalize(f64::EPSILON * ti.norm() * tj.norm())
                .unwrap_or(fallback);
            nodes.push(PlateNode {
                xyz: at(i, j),
                normal,
            });
        }
    }

    // lengths agree by construction
    Grid2::from_vec(rows, cols, nodes).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Symmetric biconvex sections wrapped TE-lower -> LE -> TE-upper
    fn wrapped_wing(rows: usize, half: usize) -> Grid2<GeomNode> {
        let cols = 2 * half + 1;
        let mut nodes = Vec::new();
        for i in 1..=rows {
            let y = (i - 1) as f64;
            for j in 1..=cols {
                let k = j as isize - (half as isize + 1);
                let x = k.unsigned_abs() as f64 / half as f64;
                let z = 0.1 * x * (1.0 - x) * k.signum() as f64;
                nodes.push(GeomNode::new(x, y, z, 0.0, 0.0));
            }
        }
        Grid2::from_vec(rows, cols, nodes).unwrap()
    }

    #[test]
    fn wrapped_wing_collapses_to_camber_line() {
        let geometry = wrapped_wing(3, 4);
        let plate = wing_plate(&geometry, 1e-9);
        assert_eq!((plate.rows(), plate.cols()), (3, 5));
        for node in plate.iter() {
            assert_relative_eq!(node.xyz.z, 0.0, epsilon = 1e-12);
            assert_relative_eq!(node.normal.z.abs(), 1.0, epsilon = 1e-12);
        }
        assert_relative_eq!(plate[(2, 1)].xyz.x, 0.0);
        assert_relative_eq!(plate[(2, 5)].xyz.x, 1.0);
    }

    #[test]
    fn open_sheet_is_copied() {
        let nodes = (0..6)
            .map(|k| GeomNode::new((k % 3) as f64, (k / 3) as f64, 0.0, 0.0, 0.0))
            .collect();
        let geometry = Grid2::from_vec(2, 3, nodes).unwrap();
        let plate = wing_plate(&geometry, 1e-9);
        assert_eq!((plate.rows(), plate.cols()), (2, 3));
        assert_eq!(plate[(2, 3)].xyz, Point3::new(2.0, 1.0, 0.0));
    }

    #[test]
    fn body_plate_spans_section_extent() {
        // square tube of half-width 1 around the x axis, closed seam
        let ring = [(1.0, 1.0), (-1.0, 1.0), (-1.0, -1.0), (1.0, -1.0), (1.0, 1.0)];
        let mut nodes = Vec::new();
        for i in 0..3 {
            for &(y, z) in &ring {
                nodes.push(GeomNode::new(i as f64, y, z + 2.0, 0.0, 0.0));
            }
        }
        let geometry = Grid2::from_vec(3, ring.len(), nodes).unwrap();

        let plate = body_plate(&geometry, PlateCase::Horizontal, 1e-9);
        assert_eq!(plate.cols(), 3);
        assert_relative_eq!(plate[(2, 1)].xyz.y, -1.0);
        assert_relative_eq!(plate[(2, 3)].xyz.y, 1.0);
        assert_relative_eq!(plate[(2, 2)].xyz.z, 2.0);
        assert_relative_eq!(plate[(2, 2)].normal.z.abs(), 1.0, epsilon = 1e-12);

        let plate = body_plate(&geometry, PlateCase::Vertical, 1e-9);
        assert_relative_eq!(plate[(1, 1)].xyz.z, 1.0);
        assert_relative_eq!(plate[(1, 3)].xyz.z, 3.0);
        assert_relative_eq!(plate[(1, 2)].normal.y.abs(), 1.0, epsilon = 1e-12);
    }
}
