//! Structured grid storage
//!
//! A surface is sampled on two structured grids that live side by side: the
//! geometric grid as delivered by the patch sampler and the flat-plate grid
//! used by thin-surface approximations. Both sit in [`Grid2`], a contiguous
//! row-major container addressed with 1-based `(i, j)` indices.

use crate::error::{MeshError, MeshResult};
use nalgebra::{Point2, Point3, Vector3};
use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

/// Owned row-major 2-D array with 1-based, bounds-checked addressing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid2<T> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
}

impl<T> Default for Grid2<T> {
    fn default() -> Self {
        Self {
            rows: 0,
            cols: 0,
            data: Vec::new(),
        }
    }
}

impl<T: Clone> Grid2<T> {
    /// Allocate a `rows x cols` grid filled with `value`.
    ///
    /// The buffer is reserved fallibly so an oversized request reports an
    /// error instead of aborting the process.
    pub fn try_filled(rows: usize, cols: usize, value: T) -> Result<Self, String> {
        let len = rows
            .checked_mul(cols)
            .ok_or_else(|| format!("{rows}x{cols} nodes overflow the address space"))?;
        let mut data = Vec::new();
        data.try_reserve_exact(len).map_err(|e| e.to_string())?;
        data.resize(len, value);
        Ok(Self { rows, cols, data })
    }
}

impl<T> Grid2<T> {
    /// Wrap an existing row-major buffer; `None` when the length disagrees.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<T>) -> Option<Self> {
        (rows.checked_mul(cols)? == data.len()).then_some(Self { rows, cols, data })
    }

    /// Number of rows (I direction)
    pub const fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns (J direction)
    pub const fn cols(&self) -> usize {
        self.cols
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn offset(&self, i: usize, j: usize) -> Option<usize> {
        ((1..=self.rows).contains(&i) && (1..=self.cols).contains(&j))
            .then(|| (i - 1) * self.cols + (j - 1))
    }

    /// Node at 1-based `(i, j)`
    pub fn get(&self, i: usize, j: usize) -> Option<&T> {
        self.offset(i, j).map(|k| &self.data[k])
    }

    pub fn get_mut(&mut self, i: usize, j: usize) -> Option<&mut T> {
        self.offset(i, j).map(move |k| &mut self.data[k])
    }

    /// Node at 1-based linear position `k = (i-1)*cols + j`
    pub fn linear(&self, k: usize) -> Option<&T> {
        k.checked_sub(1).and_then(|k| self.data.get(k))
    }

    pub fn linear_mut(&mut self, k: usize) -> Option<&mut T> {
        k.checked_sub(1).and_then(move |k| self.data.get_mut(k))
    }

    /// All nodes of row `i` (1-based)
    pub fn row(&self, i: usize) -> Option<&[T]> {
        (1..=self.rows)
            .contains(&i)
            .then(|| &self.data[(i - 1) * self.cols..i * self.cols])
    }

    /// Nodes of column `j` (1-based), top to bottom
    pub fn column(&self, j: usize) -> impl Iterator<Item = &T> + '_ {
        let cols = self.cols;
        let valid = (1..=cols).contains(&j);
        self.data
            .iter()
            .skip(j.saturating_sub(1))
            .step_by(cols.max(1))
            .take(if valid { self.rows } else { 0 })
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.data.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.data.iter_mut()
    }
}

impl<T> Index<(usize, usize)> for Grid2<T> {
    type Output = T;

    fn index(&self, (i, j): (usize, usize)) -> &T {
        match self.offset(i, j) {
            Some(k) => &self.data[k],
            None => panic!("grid index ({i}, {j}) outside {}x{}", self.rows, self.cols),
        }
    }
}

impl<T> IndexMut<(usize, usize)> for Grid2<T> {
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut T {
        match self.offset(i, j) {
            Some(k) => &mut self.data[k],
            None => panic!("grid index ({i}, {j}) outside {}x{}", self.rows, self.cols),
        }
    }
}

/// Geometric grid node: sampled position and patch parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeomNode {
    pub xyz: Point3<f64>,
    pub uv: Point2<f64>,
}

impl GeomNode {
    pub fn new(x: f64, y: f64, z: f64, u: f64, v: f64) -> Self {
        Self {
            xyz: Point3::new(x, y, z),
            uv: Point2::new(u, v),
        }
    }
}

impl Default for GeomNode {
    fn default() -> Self {
        Self {
            xyz: Point3::origin(),
            uv: Point2::origin(),
        }
    }
}

/// Flat-plate grid node: position and unit surface normal
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlateNode {
    pub xyz: Point3<f64>,
    pub normal: Vector3<f64>,
}

impl Default for PlateNode {
    fn default() -> Self {
        Self {
            xyz: Point3::origin(),
            normal: Vector3::z(),
        }
    }
}

/// Geometric and flat-plate grids of one surface
#[derive(Debug, Clone, Default)]
pub struct StructuredGridStore {
    name: String,
    geometry: Grid2<GeomNode>,
    plate: Grid2<PlateNode>,
}

impl StructuredGridStore {
    /// Create an empty store labelled with the owning surface's name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Reallocate the geometric grid. The old grid survives any failure.
    pub fn size_geometry_lists(&mut self, num_i: usize, num_j: usize) -> MeshResult<()> {
        self.check_dimensions(num_i, num_j)?;
        self.geometry = self.allocate(num_i, num_j, GeomNode::default())?;
        Ok(())
    }

    /// Reallocate the flat-plate grid. The old grid survives any failure.
    pub fn size_flat_plate_lists(&mut self, num_i: usize, num_j: usize) -> MeshResult<()> {
        self.check_dimensions(num_i, num_j)?;
        self.plate = self.allocate(num_i, num_j, PlateNode::default())?;
        Ok(())
    }

    /// Replace the geometric grid wholesale
    pub fn set_geometry(&mut self, geometry: Grid2<GeomNode>) -> MeshResult<()> {
        self.check_dimensions(geometry.rows(), geometry.cols())?;
        self.geometry = geometry;
        Ok(())
    }

    /// Replace the flat-plate grid wholesale
    pub fn set_plate(&mut self, plate: Grid2<PlateNode>) -> MeshResult<()> {
        self.check_dimensions(plate.rows(), plate.cols())?;
        self.plate = plate;
        Ok(())
    }

    fn allocate<T: Clone>(&self, num_i: usize, num_j: usize, value: T) -> MeshResult<Grid2<T>> {
        Grid2::try_filled(num_i, num_j, value).map_err(|message| MeshError::Memory {
            surface: self.name.clone(),
            num_i,
            num_j,
            message,
        })
    }

    pub(crate) fn check_dimensions(&self, num_i: usize, num_j: usize) -> MeshResult<()> {
        if num_i < 2 || num_j < 2 {
            return Err(MeshError::invalid_dimensions(&self.name, num_i, num_j));
        }
        Ok(())
    }

    pub fn geometry(&self) -> &Grid2<GeomNode> {
        &self.geometry
    }

    pub fn geometry_mut(&mut self) -> &mut Grid2<GeomNode> {
        &mut self.geometry
    }

    pub fn plate(&self) -> &Grid2<PlateNode> {
        &self.plate
    }

    pub fn plate_mut(&mut self) -> &mut Grid2<PlateNode> {
        &mut self.plate
    }

    pub fn num_i(&self) -> usize {
        self.geometry.rows()
    }

    pub fn num_j(&self) -> usize {
        self.geometry.cols()
    }

    pub fn num_plate_i(&self) -> usize {
        self.plate.rows()
    }

    pub fn num_plate_j(&self) -> usize {
        self.plate.cols()
    }

    /// Geometric node at 1-based `(i, j)`
    pub fn node(&self, i: usize, j: usize) -> MeshResult<&GeomNode> {
        let (num_i, num_j) = (self.num_i(), self.num_j());
        self.geometry
            .get(i, j)
            .ok_or_else(|| self.out_of_range(i, j, num_i, num_j))
    }

    pub fn node_mut(&mut self, i: usize, j: usize) -> MeshResult<&mut GeomNode> {
        let (num_i, num_j) = (self.num_i(), self.num_j());
        if self.geometry.get(i, j).is_none() {
            return Err(self.out_of_range(i, j, num_i, num_j));
        }
        Ok(&mut self.geometry[(i, j)])
    }

    /// Flat-plate node at 1-based `(i, j)`
    pub fn plate_node(&self, i: usize, j: usize) -> MeshResult<&PlateNode> {
        let (num_i, num_j) = (self.num_plate_i(), self.num_plate_j());
        self.plate
            .get(i, j)
            .ok_or_else(|| self.out_of_range(i, j, num_i, num_j))
    }

    pub fn plate_node_mut(&mut self, i: usize, j: usize) -> MeshResult<&mut PlateNode> {
        let (num_i, num_j) = (self.num_plate_i(), self.num_plate_j());
        if self.plate.get(i, j).is_none() {
            return Err(self.out_of_range(i, j, num_i, num_j));
        }
        Ok(&mut self.plate[(i, j)])
    }

    fn out_of_range(&self, i: usize, j: usize, num_i: usize, num_j: usize) -> MeshError {
        MeshError::IndexOutOfRange {
            surface: self.name.clone(),
            i,
            j,
            num_i,
            num_j,
        }
    }

    /// Diagonal of the geometric grid's bounding box
    pub fn characteristic_length(&self) -> f64 {
        let mut nodes = self.geometry.iter();
        let Some(first) = nodes.next() else {
            return 0.0;
        };
        let (mut min, mut max) = (first.xyz, first.xyz);
        for node in nodes {
            min = min.inf(&node.xyz);
            max = max.sup(&node.xyz);
        }
        (max - min).norm()
    }
}
