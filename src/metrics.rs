//! Scalar surface metrics read by the solver

use crate::grid::{Grid2, PlateNode};
use crate::mesh::MeshLevel;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Chord and area figures of a meshed surface
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SurfaceMetrics {
    /// Chord of each span station (between consecutive plate rows)
    pub local_chord: Vec<f64>,
    /// Span-width weighted mean of `local_chord`
    pub average_chord: f64,
    /// Total area of the level-0 triangles
    pub wetted_area: f64,
}

impl SurfaceMetrics {
    pub fn compute(plate: &Grid2<PlateNode>, finest: &MeshLevel) -> Self {
        let rows: Vec<&[PlateNode]> = (1..=plate.rows()).filter_map(|i| plate.row(i)).collect();
        let chords: Vec<f64> = rows.iter().map(|row| row_chord(row)).collect();
        let centroids: Vec<Vector3<f64>> = rows.iter().map(|row| row_centroid(row)).collect();

        let local_chord: Vec<f64> = chords.windows(2).map(|w| 0.5 * (w[0] + w[1])).collect();
        let widths: Vec<f64> = centroids.windows(2).map(|w| (w[1] - w[0]).norm()).collect();

        let total_width: f64 = widths.iter().sum();
        let average_chord = if local_chord.is_empty() {
            0.0
        } else if total_width > 0.0 {
            local_chord.iter().zip(&widths).map(|(c, w)| c * w).sum::<f64>() / total_width
        } else {
            local_chord.iter().sum::<f64>() / local_chord.len() as f64
        };

        Self {
            local_chord,
            average_chord,
            wetted_area: finest.total_area(),
        }
    }

    pub fn number_of_span_stations(&self) -> usize {
        self.local_chord.len()
    }

    /// Chord of 1-based span station `station`
    pub fn local_chord(&self, station: usize) -> Option<f64> {
        station
            .checked_sub(1)
            .and_then(|k| self.local_chord.get(k))
            .copied()
    }
}

/// Largest node separation within one plate row
pub fn row_chord(row: &[PlateNode]) -> f64 {
    let mut chord = 0.0_f64;
    for (a, p) in row.iter().enumerate() {
        for q in &row[a + 1..] {
            chord = chord.max((q.xyz - p.xyz).norm());
        }
    }
    chord
}

fn row_centroid(row: &[PlateNode]) -> Vector3<f64> {
    if row.is_empty() {
        return Vector3::zeros();
    }
    row.iter().fold(Vector3::zeros(), |acc, n| acc + n.xyz.coords) / row.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Point3;

    /// Plate rows at y = 0, 1, 2, ... spanning x in [0, chord]
    fn plate(chords: &[f64], cols: usize) -> Grid2<PlateNode> {
        let mut nodes = Vec::new();
        for (i, &chord) in chords.iter().enumerate() {
            for j in 0..cols {
                nodes.push(PlateNode {
                    xyz: Point3::new(chord * j as f64 / (cols - 1) as f64, i as f64, 0.0),
                    ..Default::default()
                });
            }
        }
        Grid2::from_vec(chords.len(), cols, nodes).unwrap()
    }

    #[test]
    fn rectangle() {
        let metrics = SurfaceMetrics::compute(&plate(&[3.0; 5], 4), &MeshLevel::default());
        assert_eq!(metrics.number_of_span_stations(), 4);
        assert_relative_eq!(metrics.average_chord, 3.0);
        assert_eq!(metrics.local_chord(1), Some(3.0));
        assert_eq!(metrics.local_chord(0), None);
        assert_eq!(metrics.local_chord(5), None);
    }

    #[test]
    fn tapered_planform() {
        let metrics = SurfaceMetrics::compute(&plate(&[2.0, 1.0, 0.0], 3), &MeshLevel::default());
        assert_eq!(metrics.local_chord, vec![1.5, 0.5]);
        // the centroid of the collapsed tip row sits at x = 0, y = 2
        let w0 = 1.0_f64.hypot(0.5);
        let w1 = 1.0_f64.hypot(0.5);
        assert_relative_eq!(metrics.average_chord, (1.5 * w0 + 0.5 * w1) / (w0 + w1));
    }

    #[test]
    fn coincident_rows_fall_back_to_plain_mean() {
        let mut grid = plate(&[2.0, 6.0], 2);
        // both rows centred on (1, 0)
        grid[(2, 1)].xyz = Point3::new(-2.0, 0.0, 0.0);
        grid[(2, 2)].xyz = Point3::new(4.0, 0.0, 0.0);
        let metrics = SurfaceMetrics::compute(&grid, &MeshLevel::default());
        assert_relative_eq!(metrics.average_chord, 0.5 * (2.0 + 6.0));
    }

    #[test]
    fn wetted_area_comes_from_the_fine_mesh() {
        let nodes = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.0, 2.0, 0.0),
            Point3::new(0.0, 0.0, 3.0),
        ];
        let mesh = MeshLevel::from_triangles(0, nodes, &[[0, 1, 2]]).unwrap();
        let metrics = SurfaceMetrics::compute(&plate(&[1.0, 1.0], 2), &mesh);
        assert_relative_eq!(metrics.wetted_area, 3.0);
    }
}
