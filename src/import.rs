//! Sampled surface import
//!
//! The parametric geometry layer hands over each surface as flattened node
//! arrays in row-major `(i, j)` order. This module validates those arrays
//! against the declared grid size and turns them into [`Surface`]s, either
//! directly or from a JSON description of a whole configuration.

use crate::error::{MeshError, MeshResult};
use crate::grid::{GeomNode, Grid2, PlateNode};
use crate::plate::PlateCase;
use crate::surface::{Surface, SurfaceOrigin};
use crate::{MeshingConfig, SurfaceKind};
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Node arrays of one sampled surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceSamples {
    pub name: String,
    pub kind: SurfaceKind,
    pub num_i: usize,
    pub num_j: usize,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<f64>,
    /// Surface parameters, zero when absent
    #[serde(default)]
    pub u: Vec<f64>,
    #[serde(default)]
    pub v: Vec<f64>,
    #[serde(default)]
    pub flip_normal: bool,
    /// Flat-plate projection, bodies only
    #[serde(default)]
    pub plate_case: PlateCase,
    #[serde(default)]
    pub plate: Option<PlateSamples>,
    /// Source component identity, passed through to the surface
    #[serde(default, flatten)]
    pub origin: SurfaceOrigin,
}

/// Explicit flat-plate grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlateSamples {
    pub num_i: usize,
    pub num_j: usize,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<f64>,
    pub nx: Vec<f64>,
    pub ny: Vec<f64>,
    pub nz: Vec<f64>,
}

impl SurfaceSamples {
    /// Samples of a `num_i x num_j` grid from row-major points
    pub fn from_points(
        name: impl Into<String>,
        kind: SurfaceKind,
        num_i: usize,
        num_j: usize,
        points: &[Point3<f64>],
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            num_i,
            num_j,
            x: points.iter().map(|p| p.x).collect(),
            y: points.iter().map(|p| p.y).collect(),
            z: points.iter().map(|p| p.z).collect(),
            u: Vec::new(),
            v: Vec::new(),
            flip_normal: false,
            plate_case: PlateCase::default(),
            plate: None,
            origin: SurfaceOrigin::default(),
        }
    }

    /// Check every array against the declared dimensions
    pub fn validate(&self) -> MeshResult<()> {
        if self.num_i < 2 || self.num_j < 2 {
            return Err(MeshError::invalid_dimensions(&self.name, self.num_i, self.num_j));
        }
        let expected = self.num_i * self.num_j;
        check_len(&self.name, "x", &self.x, expected, false)?;
        check_len(&self.name, "y", &self.y, expected, false)?;
        check_len(&self.name, "z", &self.z, expected, false)?;
        check_len(&self.name, "u", &self.u, expected, true)?;
        check_len(&self.name, "v", &self.v, expected, true)?;
        if let Some(k) = (0..expected).find(|&k| {
            !(self.x[k].is_finite() && self.y[k].is_finite() && self.z[k].is_finite())
        }) {
            return Err(MeshError::invalid_input(format!(
                "surface '{}': node {} has a non-finite coordinate",
                self.name,
                k + 1
            )));
        }

        if let Some(plate) = &self.plate {
            if plate.num_i < 2 || plate.num_j < 2 {
                return Err(MeshError::invalid_dimensions(&self.name, plate.num_i, plate.num_j));
            }
            let expected = plate.num_i * plate.num_j;
            for (array, values) in [
                ("plate x", &plate.x),
                ("plate y", &plate.y),
                ("plate z", &plate.z),
                ("plate nx", &plate.nx),
                ("plate ny", &plate.ny),
                ("plate nz", &plate.nz),
            ] {
                check_len(&self.name, array, values, expected, false)?;
            }
        }
        Ok(())
    }

    fn geometry(&self) -> MeshResult<Grid2<GeomNode>> {
        let parameter = |values: &[f64], k: usize| values.get(k).copied().unwrap_or(0.0);
        let nodes = (0..self.num_i * self.num_j)
            .map(|k| {
                GeomNode::new(
                    self.x[k],
                    self.y[k],
                    self.z[k],
                    parameter(&self.u, k),
                    parameter(&self.v, k),
                )
            })
            .collect();
        Grid2::from_vec(self.num_i, self.num_j, nodes).ok_or_else(|| {
            MeshError::size_mismatch(&self.name, "geometry", self.num_i * self.num_j, self.x.len())
        })
    }
}

impl PlateSamples {
    fn grid(&self, surface: &str) -> MeshResult<Grid2<PlateNode>> {
        let nodes = (0..self.num_i * self.num_j)
            .map(|k| PlateNode {
                xyz: Point3::new(self.x[k], self.y[k], self.z[k]),
                normal: Vector3::new(self.nx[k], self.ny[k], self.nz[k]),
            })
            .collect();
        Grid2::from_vec(self.num_i, self.num_j, nodes).ok_or_else(|| {
            MeshError::size_mismatch(surface, "plate", self.num_i * self.num_j, self.x.len())
        })
    }
}

fn check_len(surface: &str, array: &str, values: &[f64], expected: usize, optional: bool) -> MeshResult<()> {
    if values.len() == expected || (optional && values.is_empty()) {
        Ok(())
    } else {
        Err(MeshError::size_mismatch(surface, array, expected, values.len()))
    }
}

/// Builds surfaces from sampled node arrays
#[derive(Debug, Clone, Default)]
pub struct SurfaceImporter {
    config: MeshingConfig,
}

impl SurfaceImporter {
    #[must_use]
    pub const fn new(config: MeshingConfig) -> Self {
        Self { config }
    }

    /// Read a lifting surface
    pub fn read_wing_data(&self, samples: &SurfaceSamples) -> MeshResult<Surface> {
        self.build(samples, SurfaceKind::Wing, samples.plate_case)
    }

    /// Read a body, collapsing it onto the plane selected by `case`
    pub fn read_body_data(&self, samples: &SurfaceSamples, case: PlateCase) -> MeshResult<Surface> {
        self.build(samples, SurfaceKind::Body, case)
    }

    /// Read a surface of whatever kind the samples declare
    pub fn import(&self, samples: &SurfaceSamples) -> MeshResult<Surface> {
        match samples.kind {
            SurfaceKind::Wing => self.read_wing_data(samples),
            SurfaceKind::Body => self.read_body_data(samples, samples.plate_case),
        }
    }

    fn build(&self, samples: &SurfaceSamples, kind: SurfaceKind, case: PlateCase) -> MeshResult<Surface> {
        samples.validate()?;

        let mut surface = Surface::new(samples.name.clone(), kind, self.config);
        surface.set_plate_case(case);
        surface.set_flip_normal(samples.flip_normal);
        surface.set_origin(samples.origin.clone());
        surface.set_geometry(samples.geometry()?)?;
        if let Some(plate) = &samples.plate {
            surface.set_plate(plate.grid(&samples.name)?)?;
        }

        log::debug!(
            "Read {:?} surface '{}' with {}x{} nodes",
            kind,
            samples.name,
            samples.num_i,
            samples.num_j
        );
        Ok(surface)
    }

    /// Import every surface of a JSON file with default settings
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> MeshResult<Vec<Surface>> {
        Self::default().import_from_file(path)
    }

    /// Import every surface of a JSON string with default settings
    pub fn from_json_str(json: &str) -> MeshResult<Vec<Surface>> {
        Self::default().import_from_str(json)
    }

    pub fn import_from_file<P: AsRef<Path>>(&self, path: P) -> MeshResult<Vec<Surface>> {
        let json = fs::read_to_string(path)?;
        self.import_from_str(&json)
    }

    /// Import a JSON array of [`SurfaceSamples`]
    pub fn import_from_str(&self, json: &str) -> MeshResult<Vec<Surface>> {
        let samples: Vec<SurfaceSamples> = serde_json::from_str(json)?;
        samples.iter().map(|s| self.import(s)).collect()
    }
}

impl Surface {
    /// Build a surface from sampled node arrays
    pub fn from_samples(samples: &SurfaceSamples, config: MeshingConfig) -> MeshResult<Self> {
        SurfaceImporter::new(config).import(samples)
    }
}
