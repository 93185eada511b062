//! Degenerate section detection
//!
//! Sampled surfaces routinely contain sections that have collapsed to a
//! point: the nose of a fuselage, a pointed wing tip, a pinched station in
//! the middle of a pod. These have to be found before triangulation so they
//! can be fanned instead of turned into zero-area triangles.
//!
//! Sizes are judged against the surface's own bounding-box diagonal, so the
//! same relative tolerance works for a winglet and for a fuselage.

use crate::grid::{GeomNode, Grid2};
use crate::plate;
use serde::{Deserialize, Serialize};

/// Degeneracy flags for one geometric grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DegeneracyReport {
    /// Per I (0-based storage for 1-based I): chordwise section collapsed
    pub x_sections: Vec<bool>,
    /// Per J: span section collapsed
    pub span_sections: Vec<bool>,
    /// Section I = 1 collapsed to a point
    pub nose_closed: bool,
    /// Section I = NumI collapsed to a point
    pub tail_closed: bool,
    /// First and last J nodes coincide on every row
    pub seam_closed: bool,
    /// Absolute length below which nodes are considered coincident
    pub length_scale: f64,
}

impl DegeneracyReport {
    /// Whether X-section `i` (1-based) is degenerate
    pub fn is_x_section_degenerate(&self, i: usize) -> bool {
        i.checked_sub(1)
            .and_then(|k| self.x_sections.get(k))
            .copied()
            .unwrap_or(false)
    }

    /// Whether span section `j` (1-based) is degenerate
    pub fn is_span_section_degenerate(&self, j: usize) -> bool {
        j.checked_sub(1)
            .and_then(|k| self.span_sections.get(k))
            .copied()
            .unwrap_or(false)
    }

    pub fn degenerate_x_section_count(&self) -> usize {
        self.x_sections.iter().filter(|&&d| d).count()
    }

    pub fn degenerate_span_section_count(&self) -> usize {
        self.span_sections.iter().filter(|&&d| d).count()
    }
}

/// Scale-relative degeneracy analyzer
#[derive(Debug, Clone, Copy)]
pub struct DegeneracyAnalyzer {
    relative_tolerance: f64,
}

impl DegeneracyAnalyzer {
    #[must_use]
    pub const fn new(relative_tolerance: f64) -> Self {
        Self { relative_tolerance }
    }

    /// Absolute coincidence length for a surface of the given size
    pub fn length_scale(&self, characteristic_length: f64) -> f64 {
        self.relative_tolerance * characteristic_length
    }

    /// Classify every section of `geometry`.
    pub fn analyze(&self, geometry: &Grid2<GeomNode>, characteristic_length: f64) -> DegeneracyReport {
        let eps = self.length_scale(characteristic_length);
        let (rows, cols) = (geometry.rows(), geometry.cols());

        let x_sections: Vec<bool> = (1..=rows)
            .map(|i| geometry.row(i).map_or(false, |row| span(row.iter()) <= eps))
            .collect();
        let span_sections: Vec<bool> = (1..=cols)
            .map(|j| span(geometry.column(j)) <= eps)
            .collect();

        let report = DegeneracyReport {
            nose_closed: x_sections.first().copied().unwrap_or(false),
            tail_closed: x_sections.last().copied().unwrap_or(false),
            seam_closed: plate::seam_closed(geometry, eps),
            x_sections,
            span_sections,
            length_scale: eps,
        };

        log::debug!(
            "Degeneracy: {} of {} X-sections, {} of {} span sections, nose {}, tail {}, seam {}",
            report.degenerate_x_section_count(),
            rows,
            report.degenerate_span_section_count(),
            cols,
            if report.nose_closed { "closed" } else { "open" },
            if report.tail_closed { "closed" } else { "open" },
            if report.seam_closed { "closed" } else { "open" },
        );

        report
    }
}

impl Default for DegeneracyAnalyzer {
    fn default() -> Self {
        Self::new(crate::defaults::DEFAULT_DEGENERACY_TOLERANCE)
    }
}

/// Maximum pairwise separation of a node set
fn span<'a>(nodes: impl Iterator<Item = &'a GeomNode>) -> f64 {
    let points: Vec<_> = nodes.map(|n| n.xyz).collect();
    let mut max = 0.0_f64;
    for (a, p) in points.iter().enumerate() {
        for q in &points[a + 1..] {
            max = max.max((q - p).norm());
        }
    }
    max
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Flat trapezoid whose last row is pinched to a single point
    fn pinched(rows: usize, cols: usize) -> Grid2<GeomNode> {
        let mut nodes = Vec::new();
        for i in 1..=rows {
            let chord = (rows - i) as f64;
            for j in 1..=cols {
                let x = chord * (j - 1) as f64 / (cols - 1) as f64;
                nodes.push(GeomNode::new(x, (i - 1) as f64, 0.0, 0.0, 0.0));
            }
        }
        Grid2::from_vec(rows, cols, nodes).unwrap()
    }

    #[test]
    fn pinched_tail_is_detected() {
        let geometry = pinched(4, 3);
        let report = DegeneracyAnalyzer::default().analyze(&geometry, 5.0);
        assert_eq!(report.x_sections, vec![false, false, false, true]);
        assert!(report.tail_closed);
        assert!(!report.nose_closed);
        assert!(!report.seam_closed);
        assert_eq!(report.degenerate_span_section_count(), 0);
        assert!(report.is_x_section_degenerate(4));
        assert!(!report.is_x_section_degenerate(0));
    }

    #[test]
    fn tolerance_scales_with_surface_size() {
        // Same shape at two scales: a row that is short relative to the
        // surface is degenerate at both scales.
        let analyzer = DegeneracyAnalyzer::new(1e-3);
        for scale in [1e-3, 1e3] {
            let mut geometry = pinched(3, 3);
            for node in geometry.iter_mut() {
                node.xyz *= scale;
            }
            // shrink the middle row to 1e-4 of the surface size
            for j in 1..=3 {
                geometry[(2, j)].xyz.x *= 1e-4;
            }
            let length = 2.0 * scale;
            let report = analyzer.analyze(&geometry, length);
            assert!(report.is_x_section_degenerate(2), "scale {scale}");
            assert!(!report.is_x_section_degenerate(1), "scale {scale}");
        }
    }

    #[test]
    fn collapsed_column_is_a_degenerate_span_section() {
        let mut geometry = pinched(3, 3);
        for i in 1..=3 {
            geometry[(i, 1)].xyz = nalgebra::Point3::new(-1.0, 0.5, 0.0);
        }
        let report = DegeneracyAnalyzer::default().analyze(&geometry, 3.0);
        assert_eq!(report.span_sections, vec![true, false, false]);
    }
}
