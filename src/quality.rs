//! Mesh level validation
//!
//! Checks the structural invariants every level of the hierarchy must keep
//! (each edge shared by at most two distinct elements, element/edge
//! cross-references consistent) and gathers shape statistics so poorly
//! sampled surfaces show up in the logs.

use crate::mesh::MeshLevel;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Mesh quality controller
#[derive(Debug, Clone, Default)]
pub struct QualityController {
    requirements: QualityRequirements,
}

/// Quality thresholds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityRequirements {
    /// Longest over shortest incident edge
    pub max_aspect_ratio: f64,
    /// Elements at or below this area count as degenerate
    pub min_area: f64,
}

impl Default for QualityRequirements {
    fn default() -> Self {
        Self {
            max_aspect_ratio: crate::defaults::DEFAULT_ASPECT_RATIO_LIMIT,
            min_area: 0.0,
        }
    }
}

/// Validation result for one level
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityMetrics {
    pub level: usize,
    pub total_elements: usize,
    pub degenerate_elements: usize,
    /// Share of edges with valid connectivity (0-1)
    pub manifold_score: f64,
    pub watertight: bool,
    pub aspect_ratio: StatisticsSummary,
    pub element_areas: StatisticsSummary,
    pub issues: Vec<QualityIssue>,
}

/// Statistical summary for quality metrics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatisticsSummary {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
    pub percentile_95: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityIssue {
    pub issue_type: QualityIssueType,
    pub severity: IssueSeverity,
    pub affected_elements: Vec<usize>,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QualityIssueType {
    HighAspectRatio,
    DegenerateElement,
    NonManifold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IssueSeverity {
    Warning,
    Error,
}

impl QualityController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn with_requirements(mut self, requirements: QualityRequirements) -> Self {
        self.requirements = requirements;
        self
    }

    /// Validate one mesh level
    pub fn validate_level(&self, mesh: &MeshLevel) -> QualityMetrics {
        let mut issues = Vec::new();

        let aspect_ratios: Vec<f64> = (0..mesh.num_elements())
            .map(|e| aspect_ratio(mesh, e))
            .collect();
        let areas: Vec<f64> = mesh.elements.iter().map(|e| e.area).collect();

        let stretched: Vec<usize> = aspect_ratios
            .iter()
            .enumerate()
            .filter(|(_, &ar)| ar > self.requirements.max_aspect_ratio)
            .map(|(e, _)| e)
            .collect();
        if !stretched.is_empty() {
            issues.push(QualityIssue {
                issue_type: QualityIssueType::HighAspectRatio,
                severity: IssueSeverity::Warning,
                description: format!(
                    "{} elements exceed aspect ratio {}",
                    stretched.len(),
                    self.requirements.max_aspect_ratio
                ),
                affected_elements: stretched,
            });
        }

        let degenerate: Vec<usize> = areas
            .iter()
            .enumerate()
            .filter(|(_, &a)| a <= self.requirements.min_area)
            .map(|(e, _)| e)
            .collect();
        let degenerate_elements = degenerate.len();
        if !degenerate.is_empty() {
            issues.push(QualityIssue {
                issue_type: QualityIssueType::DegenerateElement,
                severity: IssueSeverity::Error,
                description: format!("{degenerate_elements} elements have no area"),
                affected_elements: degenerate,
            });
        }

        let manifold_score = manifold_score(mesh);
        let watertight = is_watertight(mesh);
        if !watertight {
            issues.push(QualityIssue {
                issue_type: QualityIssueType::NonManifold,
                severity: IssueSeverity::Error,
                affected_elements: Vec::new(),
                description: format!("edge connectivity score {manifold_score:.3}"),
            });
        }

        QualityMetrics {
            level: mesh.level,
            total_elements: mesh.num_elements(),
            degenerate_elements,
            manifold_score,
            watertight,
            aspect_ratio: statistics(&aspect_ratios),
            element_areas: statistics(&areas),
            issues,
        }
    }
}

/// Every edge joins one or two distinct elements that list it back, and no
/// node pair of a triangle level is used more than twice.
pub fn is_watertight(mesh: &MeshLevel) -> bool {
    let n = mesh.num_elements();
    let edges_ok = mesh.edges.iter().enumerate().all(|(e, edge)| {
        let lists = |element: usize| element < n && mesh.elements[element].edges.contains(&e);
        !edge.segments.is_empty()
            && lists(edge.left)
            && edge.right.map_or(true, |r| r != edge.left && lists(r))
    });
    edges_ok && pair_uses(mesh).values().all(|&uses| uses <= 2)
}

/// Share of edges with valid connectivity
fn manifold_score(mesh: &MeshLevel) -> f64 {
    if mesh.edges.is_empty() {
        return 0.0;
    }
    let uses = pair_uses(mesh);
    let good = mesh
        .edges
        .iter()
        .filter(|edge| {
            edge.right != Some(edge.left)
                && edge.segments.iter().all(|&[p, q]| {
                    uses.get(&(p.min(q), p.max(q))).map_or(true, |&u| u <= 2)
                })
        })
        .count();
    good as f64 / mesh.num_edges() as f64
}

/// Node-pair usage counts over the triangles of a level-0 mesh
fn pair_uses(mesh: &MeshLevel) -> HashMap<(usize, usize), usize> {
    let mut uses = HashMap::new();
    for [a, b, c] in mesh.triangles() {
        for (p, q) in [(a, b), (b, c), (c, a)] {
            *uses.entry((p.min(q), p.max(q))).or_insert(0) += 1;
        }
    }
    uses
}

fn aspect_ratio(mesh: &MeshLevel, element: usize) -> f64 {
    let (min, max) = mesh.elements[element]
        .edges
        .iter()
        .map(|&e| mesh.edges[e].length)
        .fold((f64::INFINITY, 0.0_f64), |(lo, hi), l| (lo.min(l), hi.max(l)));
    if min > 1e-12 {
        max / min
    } else {
        f64::INFINITY
    }
}

fn statistics(values: &[f64]) -> StatisticsSummary {
    if values.is_empty() {
        return StatisticsSummary::default();
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / values.len() as f64;
    let p95 = ((0.95 * sorted.len() as f64) as usize).min(sorted.len() - 1);

    StatisticsSummary {
        min: sorted[0],
        max: sorted[sorted.len() - 1],
        mean,
        std_dev: variance.sqrt(),
        percentile_95: sorted[p95],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Point3;

    fn strip() -> MeshLevel {
        let nodes = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(4.0, 0.0, 0.0),
            Point3::new(4.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        MeshLevel::from_triangles(0, nodes, &[[0, 1, 2], [0, 2, 3]]).unwrap()
    }

    #[test]
    fn clean_mesh_validates() {
        let metrics = QualityController::new().validate_level(&strip());
        assert!(metrics.watertight);
        assert_relative_eq!(metrics.manifold_score, 1.0);
        assert_eq!(metrics.degenerate_elements, 0);
        assert_relative_eq!(metrics.aspect_ratio.min, 17.0_f64.sqrt());
        assert_relative_eq!(metrics.element_areas.mean, 2.0);
    }

    #[test]
    fn stretched_elements_are_reported() {
        let controller = QualityController::new().with_requirements(QualityRequirements {
            max_aspect_ratio: 2.0,
            min_area: 0.0,
        });
        let metrics = controller.validate_level(&strip());
        assert_eq!(metrics.issues.len(), 1);
        assert_eq!(metrics.issues[0].issue_type, QualityIssueType::HighAspectRatio);
        assert_eq!(metrics.issues[0].affected_elements, vec![0, 1]);
    }

    #[test]
    fn broken_back_reference_is_not_watertight() {
        let mut mesh = strip();
        mesh.elements[1].edges.clear();
        assert!(!is_watertight(&mesh));
        let metrics = QualityController::new().validate_level(&mesh);
        assert!(metrics
            .issues
            .iter()
            .any(|i| i.issue_type == QualityIssueType::NonManifold));
    }

    #[test]
    fn statistics_summary() {
        let s = statistics(&[3.0, 1.0, 2.0]);
        assert_eq!((s.min, s.max), (1.0, 3.0));
        assert_relative_eq!(s.mean, 2.0);
        assert_relative_eq!(s.std_dev, (2.0_f64 / 3.0).sqrt());
        assert_eq!(s.percentile_95, 3.0);
    }
}
