//! `surf2mesh` - Surface Meshing for Panel-Method Aerodynamics
//!
//! Turns the structured `(x, y, z, u, v)` grids sampled from wing and body
//! surfaces into triangulated computational meshes, annotates every edge with
//! its upwind direction and builds a hierarchy of agglomerated coarse meshes
//! for multigrid acceleration.
//!
//! # Architecture
//!
//! - **grid**: structured geometric and flat-plate grid storage
//! - **plate**: flat-plate (camber surface / body strip) derivation
//! - **degeneracy**: detection of collapsed sections and closed ends
//! - **triangulate**: wing and body triangulation strategies
//! - **upwind**: freestream-based edge classification
//! - **agglomerate**: multigrid coarsening
//! - **metrics**: chord and wetted-area figures
//! - **quality**: mesh level validation
//! - **surface**: the owning surface aggregate
//! - **import**: sampled-array and JSON entry points
//!
//! # Examples
//!
//! ```rust,no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use surf2mesh::{import::SurfaceImporter, MeshPipeline, MeshingConfig};
//!
//! let mut surfaces = SurfaceImporter::from_json_file("aircraft.json")?;
//!
//! let config = MeshingConfig::default()
//!     .with_max_grid_levels(5)
//!     .with_angle_of_attack(4.0);
//! MeshPipeline::new(config).run_all(&mut surfaces)?;
//!
//! for surface in &surfaces {
//!     println!(
//!         "{}: {} levels, wetted area {:.3}",
//!         surface.name(),
//!         surface.num_grid_levels(),
//!         surface.wetted_area()
//!     );
//! }
//! # Ok(())
//! # }
//! ```

pub mod agglomerate;
pub mod degeneracy;
pub mod error;
pub mod grid;
pub mod import;
pub mod mesh;
pub mod metrics;
pub mod plate;
pub mod quality;
pub mod surface;
pub mod triangulate;
pub mod upwind;

// Re-export commonly used types
pub use agglomerate::{AgglomerationConfig, MeshAgglomerator};
pub use degeneracy::{DegeneracyAnalyzer, DegeneracyReport};
pub use error::{MeshError, MeshResult};
pub use grid::{GeomNode, Grid2, PlateNode, StructuredGridStore};
pub use import::{SurfaceImporter, SurfaceSamples};
pub use mesh::{Edge, Element, GridHierarchy, MeshLevel, Upwind};
pub use plate::PlateCase;
pub use quality::{QualityController, QualityMetrics};
pub use surface::{Surface, SurfaceOrigin};
pub use upwind::{FlowConditions, UpwindClassifier};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default meshing parameters
pub mod defaults {
    /// Coincidence tolerance relative to the bounding-box diagonal
    pub const DEFAULT_DEGENERACY_TOLERANCE: f64 = 1e-6;

    /// Hierarchy depth, level 0 included
    pub const DEFAULT_MAX_GRID_LEVELS: usize = 8;

    /// Fine elements per agglomerated cell
    pub const DEFAULT_TARGET_CELL_SIZE: usize = 4;

    /// Smallest level that is still coarsened
    pub const DEFAULT_MIN_ELEMENTS: usize = 8;

    /// Default aspect ratio limit for mesh quality
    pub const DEFAULT_ASPECT_RATIO_LIMIT: f64 = 10.0;
}

/// Surface category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SurfaceKind {
    /// Lifting surface: wing, tail, fin
    Wing,
    /// Fuselage, nacelle, pod
    Body,
}

/// Configuration for meshing one surface
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeshingConfig {
    /// Degeneracy tolerance relative to the surface size
    pub degeneracy_tolerance: f64,
    /// Maximum number of hierarchy levels, level 0 included
    pub max_grid_levels: usize,
    pub agglomeration: AgglomerationConfig,
    pub flow: FlowConditions,
    /// Cap open body ends whose sections are closed loops
    pub cap_open_ends: bool,
    /// Check every level and warn about broken ones
    pub validate_quality: bool,
}

impl Default for MeshingConfig {
    fn default() -> Self {
        Self {
            degeneracy_tolerance: defaults::DEFAULT_DEGENERACY_TOLERANCE,
            max_grid_levels: defaults::DEFAULT_MAX_GRID_LEVELS,
            agglomeration: AgglomerationConfig::default(),
            flow: FlowConditions::default(),
            cap_open_ends: true,
            validate_quality: true,
        }
    }
}

impl MeshingConfig {
    #[must_use]
    pub const fn with_degeneracy_tolerance(mut self, tolerance: f64) -> Self {
        self.degeneracy_tolerance = tolerance;
        self
    }

    #[must_use]
    pub const fn with_max_grid_levels(mut self, levels: usize) -> Self {
        self.max_grid_levels = levels;
        self
    }

    #[must_use]
    pub const fn with_agglomeration(mut self, agglomeration: AgglomerationConfig) -> Self {
        self.agglomeration = agglomeration;
        self
    }

    #[must_use]
    pub const fn with_flow(mut self, flow: FlowConditions) -> Self {
        self.flow = flow;
        self
    }

    /// Angle of attack in degrees
    #[must_use]
    pub const fn with_angle_of_attack(mut self, alpha_deg: f64) -> Self {
        self.flow.alpha_deg = alpha_deg;
        self
    }

    /// Sideslip angle in degrees
    #[must_use]
    pub const fn with_sideslip(mut self, beta_deg: f64) -> Self {
        self.flow.beta_deg = beta_deg;
        self
    }

    #[must_use]
    pub const fn with_cap_open_ends(mut self, cap: bool) -> Self {
        self.cap_open_ends = cap;
        self
    }

    #[must_use]
    pub const fn with_quality_validation(mut self, validate: bool) -> Self {
        self.validate_quality = validate;
        self
    }
}

/// Meshes every surface of a configuration
#[derive(Debug, Clone, Default)]
pub struct MeshPipeline {
    config: MeshingConfig,
}

impl MeshPipeline {
    #[must_use]
    pub const fn new(config: MeshingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MeshingConfig {
        &self.config
    }

    /// Triangulate and agglomerate one surface
    pub fn run(&self, surface: &mut Surface, surface_id: usize) -> MeshResult<()> {
        surface.create_mesh(surface_id)?;
        surface.agglomerate_mesh()?;
        Ok(())
    }

    /// Mesh independent surfaces in parallel. Surface ids are 1-based
    /// positions in `surfaces`.
    pub fn run_all(&self, surfaces: &mut [Surface]) -> MeshResult<()> {
        surfaces
            .par_iter_mut()
            .enumerate()
            .try_for_each(|(k, surface)| self.run(surface, k + 1))?;

        log::info!(
            "Meshed {} surfaces, {} elements on the finest levels",
            surfaces.len(),
            surfaces
                .iter()
                .filter_map(|s| s.fine_grid().ok())
                .map(MeshLevel::num_elements)
                .sum::<usize>()
        );
        Ok(())
    }

    /// Build surfaces from samples with this pipeline's settings and mesh them
    pub fn process_samples(&self, samples: &[SurfaceSamples]) -> MeshResult<Vec<Surface>> {
        let importer = SurfaceImporter::new(self.config);
        let mut surfaces = samples
            .iter()
            .map(|s| importer.import(s))
            .collect::<MeshResult<Vec<_>>>()?;
        self.run_all(&mut surfaces)?;
        Ok(surfaces)
    }

    /// Import a JSON configuration and mesh every surface in it
    pub fn process_json_file<P: AsRef<std::path::Path>>(&self, path: P) -> MeshResult<Vec<Surface>> {
        let mut surfaces = SurfaceImporter::new(self.config).import_from_file(path)?;
        self.run_all(&mut surfaces)?;
        Ok(surfaces)
    }
}

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        AgglomerationConfig, FlowConditions, GridHierarchy, MeshError, MeshLevel, MeshPipeline,
        MeshResult, MeshingConfig, PlateCase, Surface, SurfaceImporter, SurfaceKind,
        SurfaceSamples, Upwind,
    };

    pub use crate::defaults::*;
}
