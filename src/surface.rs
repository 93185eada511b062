//! A single wing or body surface and its mesh hierarchy
//!
//! `Surface` owns the sampled grids, the degeneracy report of the last
//! meshing run, every level of the multigrid hierarchy and the derived
//! scalar metrics. Stages run in a fixed order: `create_mesh` analyzes,
//! triangulates, classifies and measures level 0; `agglomerate_mesh` then
//! rebuilds the coarser levels. Cloning a surface deep-copies all of it.

use crate::agglomerate::MeshAgglomerator;
use crate::degeneracy::{DegeneracyAnalyzer, DegeneracyReport};
use crate::error::{MeshError, MeshResult};
use crate::grid::{GeomNode, Grid2, PlateNode, StructuredGridStore};
use crate::mesh::{GridHierarchy, MeshLevel};
use crate::metrics::SurfaceMetrics;
use crate::plate::{self, PlateCase};
use crate::quality::QualityController;
use crate::triangulate::{SurfaceTriangulator, Triangulate, TriangulationInput};
use crate::upwind::UpwindClassifier;
use crate::{MeshingConfig, SurfaceKind};
use serde::{Deserialize, Serialize};

/// Identity of a surface in the geometry model that produced it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceOrigin {
    /// Geometry component id
    #[serde(default)]
    pub geom_id: Option<String>,
    #[serde(default)]
    pub component_index: Option<usize>,
    /// Index of the surface within its component
    #[serde(default)]
    pub surface_index: Option<usize>,
}

/// Aerodynamic surface
#[derive(Debug, Clone)]
pub struct Surface {
    surface_id: usize,
    kind: SurfaceKind,
    plate_case: PlateCase,
    flip_normal: bool,
    /// Plate grid supplied by the caller rather than derived
    explicit_plate: bool,
    origin: SurfaceOrigin,
    config: MeshingConfig,
    triangulator: SurfaceTriangulator,
    grids: StructuredGridStore,
    report: Option<DegeneracyReport>,
    hierarchy: GridHierarchy,
    metrics: SurfaceMetrics,
    cd0: f64,
}

impl Surface {
    pub fn new(name: impl Into<String>, kind: SurfaceKind, config: MeshingConfig) -> Self {
        Self {
            surface_id: 0,
            kind,
            plate_case: PlateCase::default(),
            flip_normal: false,
            explicit_plate: false,
            origin: SurfaceOrigin::default(),
            config,
            triangulator: SurfaceTriangulator::for_kind(kind, config.cap_open_ends),
            grids: StructuredGridStore::new(name),
            report: None,
            hierarchy: GridHierarchy::new(),
            metrics: SurfaceMetrics::default(),
            cd0: 0.0,
        }
    }

    pub fn name(&self) -> &str {
        self.grids.name()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.grids.rename(name);
    }

    pub fn surface_id(&self) -> usize {
        self.surface_id
    }

    pub fn kind(&self) -> SurfaceKind {
        self.kind
    }

    pub fn origin(&self) -> &SurfaceOrigin {
        &self.origin
    }

    pub fn set_origin(&mut self, origin: SurfaceOrigin) {
        self.origin = origin;
    }

    pub fn config(&self) -> &MeshingConfig {
        &self.config
    }

    pub fn plate_case(&self) -> PlateCase {
        self.plate_case
    }

    /// Projection used for a body's flat plate
    pub fn set_plate_case(&mut self, case: PlateCase) {
        self.plate_case = case;
    }

    pub fn flip_normal(&self) -> bool {
        self.flip_normal
    }

    pub fn set_flip_normal(&mut self, flip: bool) {
        self.flip_normal = flip;
    }

    pub fn grids(&self) -> &StructuredGridStore {
        &self.grids
    }

    pub fn size_geometry_lists(&mut self, num_i: usize, num_j: usize) -> MeshResult<()> {
        self.grids.size_geometry_lists(num_i, num_j)
    }

    /// Allocate a caller-filled plate grid; it replaces the derived one
    pub fn size_flat_plate_lists(&mut self, num_i: usize, num_j: usize) -> MeshResult<()> {
        self.grids.size_flat_plate_lists(num_i, num_j)?;
        self.explicit_plate = true;
        Ok(())
    }

    pub fn set_geometry(&mut self, geometry: Grid2<GeomNode>) -> MeshResult<()> {
        self.grids.set_geometry(geometry)
    }

    /// Use `plate` instead of deriving the flat plate from the geometry
    pub fn set_plate(&mut self, plate: Grid2<PlateNode>) -> MeshResult<()> {
        self.grids.set_plate(plate)?;
        self.explicit_plate = true;
        Ok(())
    }

    pub fn geometry_mut(&mut self) -> &mut Grid2<GeomNode> {
        self.grids.geometry_mut()
    }

    pub fn node(&self, i: usize, j: usize) -> MeshResult<&GeomNode> {
        self.grids.node(i, j)
    }

    pub fn node_mut(&mut self, i: usize, j: usize) -> MeshResult<&mut GeomNode> {
        self.grids.node_mut(i, j)
    }

    pub fn plate_node(&self, i: usize, j: usize) -> MeshResult<&PlateNode> {
        self.grids.plate_node(i, j)
    }

    pub fn plate_node_mut(&mut self, i: usize, j: usize) -> MeshResult<&mut PlateNode> {
        self.grids.plate_node_mut(i, j)
    }

    /// Build level 0 and the surface metrics from the current geometry.
    ///
    /// Any previous hierarchy is replaced. Nothing is modified on failure.
    pub fn create_mesh(&mut self, surface_id: usize) -> MeshResult<()> {
        let geometry = self.grids.geometry();
        self.grids.check_dimensions(geometry.rows(), geometry.cols())?;

        let analyzer = DegeneracyAnalyzer::new(self.config.degeneracy_tolerance);
        let report = analyzer.analyze(geometry, self.grids.characteristic_length());

        let derived_plate = if self.explicit_plate {
            None
        } else {
            Some(match self.kind {
                SurfaceKind::Wing => plate::wing_plate(geometry, report.length_scale),
                SurfaceKind::Body => plate::body_plate(geometry, self.plate_case, report.length_scale),
            })
        };

        let mut finest = self.triangulator.triangulate(TriangulationInput {
            name: self.grids.name(),
            surface_id,
            geometry,
            report: &report,
            flip_normal: self.flip_normal,
        })?;
        UpwindClassifier::new(self.config.flow).classify(&mut finest);
        if self.config.validate_quality {
            self.check_level(&finest);
        }

        if let Some(plate) = derived_plate {
            self.grids.set_plate(plate)?;
        }
        self.metrics = SurfaceMetrics::compute(self.grids.plate(), &finest);
        self.hierarchy.reset(finest);
        self.report = Some(report);
        self.surface_id = surface_id;

        log::info!(
            "Surface '{}' ({}): wetted area {:.6}, average chord {:.6}, {} span stations",
            self.name(),
            surface_id,
            self.metrics.wetted_area,
            self.metrics.average_chord,
            self.metrics.number_of_span_stations()
        );
        Ok(())
    }

    /// Rebuild the coarse levels from level 0. Returns the level count.
    pub fn agglomerate_mesh(&mut self) -> MeshResult<usize> {
        if self.hierarchy.is_empty() {
            return Err(MeshError::not_meshed(self.name(), "agglomerate_mesh"));
        }

        let agglomerator = MeshAgglomerator::new(self.config.agglomeration);
        let levels = agglomerator.agglomerate(&mut self.hierarchy, self.config.max_grid_levels.max(1));

        let classifier = UpwindClassifier::new(self.config.flow);
        for level in self.hierarchy.iter_mut().skip(1) {
            classifier.classify(level);
        }
        if self.config.validate_quality {
            for level in self.hierarchy.iter().skip(1) {
                self.check_level(level);
            }
        }

        log::info!(
            "Surface '{}': {} grid levels, coarsest has {} elements",
            self.name(),
            levels,
            self.hierarchy.coarsest().map_or(0, MeshLevel::num_elements)
        );
        Ok(levels)
    }

    fn check_level(&self, mesh: &MeshLevel) {
        let metrics = QualityController::new().validate_level(mesh);
        if !metrics.watertight {
            log::warn!(
                "Surface '{}': level {} is not watertight (edge score {:.3})",
                self.name(),
                mesh.level,
                metrics.manifold_score
            );
        }
        if metrics.degenerate_elements > 0 {
            log::warn!(
                "Surface '{}': level {} has {} zero-area elements",
                self.name(),
                mesh.level,
                metrics.degenerate_elements
            );
        }
    }

    /// Mesh level `level`, clamped to the coarsest level available
    pub fn grid(&self, level: usize) -> MeshResult<&MeshLevel> {
        self.hierarchy
            .level(level)
            .ok_or_else(|| MeshError::not_meshed(self.name(), "grid"))
    }

    pub fn fine_grid(&self) -> MeshResult<&MeshLevel> {
        self.grid(0)
    }

    pub fn num_grid_levels(&self) -> usize {
        self.hierarchy.len()
    }

    pub fn hierarchy(&self) -> &GridHierarchy {
        &self.hierarchy
    }

    /// Degeneracy report of the last `create_mesh`
    pub fn degeneracy(&self) -> Option<&DegeneracyReport> {
        self.report.as_ref()
    }

    pub fn is_nose_closed(&self) -> bool {
        self.report.as_ref().is_some_and(|r| r.nose_closed)
    }

    pub fn is_tail_closed(&self) -> bool {
        self.report.as_ref().is_some_and(|r| r.tail_closed)
    }

    pub fn metrics(&self) -> &SurfaceMetrics {
        &self.metrics
    }

    pub fn number_of_span_stations(&self) -> usize {
        self.metrics.number_of_span_stations()
    }

    /// Chord of 1-based span station `station`
    pub fn local_chord(&self, station: usize) -> Option<f64> {
        self.metrics.local_chord(station)
    }

    pub fn average_chord(&self) -> f64 {
        self.metrics.average_chord
    }

    pub fn wetted_area(&self) -> f64 {
        self.metrics.wetted_area
    }

    /// Zero-lift drag coefficient
    pub fn cd0(&self) -> f64 {
        self.cd0
    }

    pub fn set_cd0(&mut self, cd0: f64) {
        self.cd0 = cd0;
    }
}
