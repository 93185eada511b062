//! Upwind edge classification
//!
//! For every edge the freestream is projected onto the local tangent plane
//! and dotted with the edge's outward normal relative to its left element.
//! The sign tells the solver which side of the edge lies upstream.

use crate::mesh::{MeshLevel, Upwind};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Freestream orientation
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FlowConditions {
    /// Angle of attack (degrees)
    pub alpha_deg: f64,
    /// Sideslip angle (degrees)
    pub beta_deg: f64,
}

impl FlowConditions {
    #[must_use]
    pub const fn new(alpha_deg: f64, beta_deg: f64) -> Self {
        Self { alpha_deg, beta_deg }
    }

    /// Unit freestream direction in body axes
    pub fn freestream(&self) -> Vector3<f64> {
        let (alpha, beta) = (self.alpha_deg.to_radians(), self.beta_deg.to_radians());
        Vector3::new(
            alpha.cos() * beta.cos(),
            -beta.sin(),
            alpha.sin() * beta.cos(),
        )
    }
}

/// Tag counts from one classification pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpwindSummary {
    pub left: usize,
    pub right: usize,
    pub parallel: usize,
    pub outflow: usize,
    pub inflow: usize,
}

/// Edge classifier for a fixed freestream direction
#[derive(Debug, Clone, Copy)]
pub struct UpwindClassifier {
    freestream: Vector3<f64>,
}

impl UpwindClassifier {
    pub fn new(flow: FlowConditions) -> Self {
        Self {
            freestream: flow.freestream(),
        }
    }

    /// Classifier for an arbitrary direction; zero falls back to +x
    pub fn with_direction(direction: Vector3<f64>) -> Self {
        Self {
            freestream: direction.try_normalize(0.0).unwrap_or_else(Vector3::x),
        }
    }

    pub fn freestream(&self) -> Vector3<f64> {
        self.freestream
    }

    /// Re-tag every edge of `mesh`. Topology is left untouched.
    pub fn classify(&self, mesh: &mut MeshLevel) -> UpwindSummary {
        let mut summary = UpwindSummary::default();
        let elements = &mesh.elements;
        let nodes = &mesh.nodes;

        for edge in &mut mesh.edges {
            let left = &elements[edge.left];
            let normal = match edge.right {
                Some(r) => (left.normal + elements[r].normal)
                    .try_normalize(0.0)
                    .unwrap_or(left.normal),
                None => left.normal,
            };

            // Outward normal of the edge seen from the left element. It lies in
            // the tangent plane, so the normal component of the freestream
            // drops out of the dot product.
            let outward = edge
                .segments
                .iter()
                .fold(Vector3::zeros(), |acc, &[p, q]| acc + (nodes[q] - nodes[p]).cross(&normal));
            let flux = self.freestream.dot(&outward);
            let tolerance = 1e-12 * edge.length.max(f64::MIN_POSITIVE);

            edge.flux = flux;
            edge.upwind = match (edge.right.is_some(), flux) {
                (_, f) if f.abs() <= tolerance => Upwind::Parallel,
                (true, f) if f > 0.0 => Upwind::Left,
                (true, _) => Upwind::Right,
                (false, f) if f > 0.0 => Upwind::Outflow,
                (false, _) => Upwind::Inflow,
            };

            match edge.upwind {
                Upwind::Left => summary.left += 1,
                Upwind::Right => summary.right += 1,
                Upwind::Parallel => summary.parallel += 1,
                Upwind::Outflow => summary.outflow += 1,
                Upwind::Inflow => summary.inflow += 1,
                Upwind::Unset => {}
            }
        }

        log::debug!(
            "Upwind tags on level {}: {} left, {} right, {} parallel, {} outflow, {} inflow",
            mesh.level,
            summary.left,
            summary.right,
            summary.parallel,
            summary.outflow,
            summary.inflow
        );
        summary
    }
}

impl Default for UpwindClassifier {
    fn default() -> Self {
        Self::new(FlowConditions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Point3;

    /// Two triangles sharing the diagonal x = y of the unit square
    fn square() -> MeshLevel {
        let nodes = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        MeshLevel::from_triangles(0, nodes, &[[0, 1, 2], [0, 2, 3]]).unwrap()
    }

    #[test]
    fn freestream_angles() {
        assert_relative_eq!(FlowConditions::default().freestream(), Vector3::x());
        let v = FlowConditions::new(90.0, 0.0).freestream();
        assert_relative_eq!(v, Vector3::z(), epsilon = 1e-12);
        let v = FlowConditions::new(0.0, 90.0).freestream();
        assert_relative_eq!(v, -Vector3::y(), epsilon = 1e-12);
    }

    #[test]
    fn diagonal_is_tagged_by_flow_direction() {
        // triangle 0 sits below the diagonal, triangle 1 above it
        let mut mesh = square();
        let diagonal = mesh.edges.iter().position(|e| !e.is_boundary()).unwrap();

        UpwindClassifier::with_direction(Vector3::new(0.0, 1.0, 0.0)).classify(&mut mesh);
        assert_eq!(mesh.edges[diagonal].upwind, Upwind::Left);

        UpwindClassifier::with_direction(Vector3::new(0.0, -1.0, 0.0)).classify(&mut mesh);
        assert_eq!(mesh.edges[diagonal].upwind, Upwind::Right);

        UpwindClassifier::with_direction(Vector3::new(1.0, 1.0, 0.0)).classify(&mut mesh);
        assert_eq!(mesh.edges[diagonal].upwind, Upwind::Parallel);
    }

    #[test]
    fn boundary_edges_split_into_inflow_and_outflow() {
        let mut mesh = square();
        let summary = UpwindClassifier::default().classify(&mut mesh);
        // x = 0 side takes flow in, x = 1 side lets it out, y = 0 and y = 1 run parallel
        assert_eq!(summary.inflow, 1);
        assert_eq!(summary.outflow, 1);
        assert_eq!(summary.parallel, 2);
        assert_eq!(summary.left + summary.right, 1);
    }

    #[test]
    fn classification_is_repeatable_and_keeps_topology() {
        let mut mesh = square();
        let classifier = UpwindClassifier::new(FlowConditions::new(5.0, 2.0));
        classifier.classify(&mut mesh);
        let first = mesh.clone();
        classifier.classify(&mut mesh);
        assert_eq!(first, mesh);
        assert!(mesh.edges.iter().all(|e| e.upwind != Upwind::Unset));
    }
}
