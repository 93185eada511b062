//! Structured grid to triangle mesh conversion
//!
//! Each quad cell of the structured grid is split into two triangles along
//! the `(i, j) -> (i+1, j+1)` diagonal. Degenerate sections are first
//! collapsed onto a single node, so quads touching them lose a corner and
//! turn into one triangle fanning into the singular point. Wings and bodies
//! differ only in how an open end of the grid is treated.

use crate::degeneracy::DegeneracyReport;
use crate::error::{MeshError, MeshResult};
use crate::grid::{GeomNode, Grid2};
use crate::mesh::MeshLevel;
use crate::SurfaceKind;
use nalgebra::{Point3, Vector3};

/// End of the structured grid in the I direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridEnd {
    /// Section I = 1
    Nose,
    /// Section I = NumI
    Tail,
}

/// Everything the triangulator reads from a surface
#[derive(Debug, Clone, Copy)]
pub struct TriangulationInput<'a> {
    pub name: &'a str,
    pub surface_id: usize,
    pub geometry: &'a Grid2<GeomNode>,
    pub report: &'a DegeneracyReport,
    pub flip_normal: bool,
}

/// Triangulation capability of a surface category
pub trait Triangulate {
    fn kind(&self) -> SurfaceKind;

    /// Triangles closing an open grid end whose section nodes are `ring`.
    ///
    /// Called only for ends that are not collapsed to a point. New nodes may
    /// be appended to `nodes`.
    fn close_end(
        &self,
        _end: GridEnd,
        _ring: &[usize],
        _report: &DegeneracyReport,
        _nodes: &mut Vec<Point3<f64>>,
    ) -> Vec<[usize; 3]> {
        Vec::new()
    }

    /// Build the level-0 mesh
    fn triangulate(&self, input: TriangulationInput<'_>) -> MeshResult<MeshLevel> {
        let geometry = input.geometry;
        let (rows, cols) = (geometry.rows(), geometry.cols());
        if rows < 2 || cols < 2 {
            return Err(MeshError::invalid_dimensions(input.name, rows, cols));
        }

        let merged = merge_nodes(geometry, input.report);
        let id = |i: usize, j: usize| merged.ids[(i - 1) * cols + (j - 1)];
        let mut nodes = merged.nodes;

        let mut triangles = Vec::with_capacity(2 * (rows - 1) * (cols - 1));
        for i in 1..rows {
            for j in 1..cols {
                split_quad([id(i, j), id(i + 1, j), id(i + 1, j + 1), id(i, j + 1)], &mut triangles);
            }
        }

        for (end, i, closed) in [
            (GridEnd::Nose, 1, input.report.nose_closed),
            (GridEnd::Tail, rows, input.report.tail_closed),
        ] {
            if closed {
                continue;
            }
            let ring = dedup_cyclic((1..=cols).map(|j| id(i, j)));
            triangles.extend(self.close_end(end, &ring, input.report, &mut nodes));
        }

        let eps = input.report.length_scale;
        let before = triangles.len();
        triangles.retain(|&t| !is_sliver(&nodes, t, eps));
        if triangles.len() < before {
            log::warn!(
                "Surface '{}': dropped {} sliver triangles",
                input.name,
                before - triangles.len()
            );
        }

        if triangles.is_empty() {
            return Err(MeshError::mesh_generation(
                input.name,
                format!("{rows}x{cols} grid collapses to no triangles"),
            ));
        }
        let nodes = drop_unused_nodes(nodes, &mut triangles);

        if input.flip_normal {
            for t in &mut triangles {
                t.swap(1, 2);
            }
        }

        let mesh = MeshLevel::from_triangles(input.surface_id, nodes, &triangles)
            .map_err(|e| e.in_surface(input.name))?;
        log::info!(
            "Triangulated {:?} surface '{}': {}x{} grid -> {} nodes, {} triangles, {} edges",
            self.kind(),
            input.name,
            rows,
            cols,
            mesh.num_nodes(),
            mesh.num_elements(),
            mesh.num_edges()
        );
        Ok(mesh)
    }
}

/// Lifting surface: open ends stay open
#[derive(Debug, Clone, Copy, Default)]
pub struct WingTriangulator;

impl Triangulate for WingTriangulator {
    fn kind(&self) -> SurfaceKind {
        SurfaceKind::Wing
    }
}

/// Fuselage-like surface: open ends with closed sections get a capping disk
#[derive(Debug, Clone, Copy)]
pub struct BodyTriangulator {
    pub cap_open_ends: bool,
}

impl Default for BodyTriangulator {
    fn default() -> Self {
        Self { cap_open_ends: true }
    }
}

impl Triangulate for BodyTriangulator {
    fn kind(&self) -> SurfaceKind {
        SurfaceKind::Body
    }

    fn close_end(
        &self,
        end: GridEnd,
        ring: &[usize],
        report: &DegeneracyReport,
        nodes: &mut Vec<Point3<f64>>,
    ) -> Vec<[usize; 3]> {
        if !self.cap_open_ends || !report.seam_closed || ring.len() < 3 {
            return Vec::new();
        }

        let center = ring
            .iter()
            .fold(Vector3::zeros(), |acc, &n| acc + nodes[n].coords)
            / ring.len() as f64;
        let c = nodes.len();
        nodes.push(Point3::from(center));

        (0..ring.len())
            .map(|k| {
                let (a, b) = (ring[k], ring[(k + 1) % ring.len()]);
                match end {
                    GridEnd::Nose => [c, a, b],
                    GridEnd::Tail => [c, b, a],
                }
            })
            .collect()
    }
}

/// Triangulator chosen once per surface
#[derive(Debug, Clone, Copy)]
pub enum SurfaceTriangulator {
    Wing(WingTriangulator),
    Body(BodyTriangulator),
}

impl SurfaceTriangulator {
    pub fn for_kind(kind: SurfaceKind, cap_open_ends: bool) -> Self {
        match kind {
            SurfaceKind::Wing => Self::Wing(WingTriangulator),
            SurfaceKind::Body => Self::Body(BodyTriangulator { cap_open_ends }),
        }
    }
}

impl Triangulate for SurfaceTriangulator {
    fn kind(&self) -> SurfaceKind {
        match self {
            Self::Wing(t) => t.kind(),
            Self::Body(t) => t.kind(),
        }
    }

    fn close_end(
        &self,
        end: GridEnd,
        ring: &[usize],
        report: &DegeneracyReport,
        nodes: &mut Vec<Point3<f64>>,
    ) -> Vec<[usize; 3]> {
        match self {
            Self::Wing(t) => t.close_end(end, ring, report, nodes),
            Self::Body(t) => t.close_end(end, ring, report, nodes),
        }
    }
}

/// Grid nodes after collapsing degenerate sections and coincident neighbours
struct MergedNodes {
    nodes: Vec<Point3<f64>>,
    /// Row-major grid position -> node index
    ids: Vec<usize>,
}

fn merge_nodes(geometry: &Grid2<GeomNode>, report: &DegeneracyReport) -> MergedNodes {
    let (rows, cols) = (geometry.rows(), geometry.cols());
    let at = |i: usize, j: usize| (i - 1) * cols + (j - 1);
    let mut sets = DisjointSets::new(rows * cols);

    for i in 1..=rows {
        if report.is_x_section_degenerate(i) {
            for j in 2..=cols {
                sets.union(at(i, 1), at(i, j));
            }
        }
    }
    for j in 1..=cols {
        if report.is_span_section_degenerate(j) {
            for i in 2..=rows {
                sets.union(at(1, j), at(i, j));
            }
        }
    }

    let eps = report.length_scale;
    let close = |a: (usize, usize), b: (usize, usize)| {
        (geometry[a].xyz - geometry[b].xyz).norm() <= eps
    };
    for i in 1..=rows {
        for j in 1..=cols {
            if i < rows && close((i, j), (i + 1, j)) {
                sets.union(at(i, j), at(i + 1, j));
            }
            if j < cols && close((i, j), (i, j + 1)) {
                sets.union(at(i, j), at(i, j + 1));
            }
        }
        if cols > 2 && close((i, 1), (i, cols)) {
            sets.union(at(i, 1), at(i, cols));
        }
    }

    let mut root_id = vec![usize::MAX; rows * cols];
    let mut sums: Vec<(Vector3<f64>, usize)> = Vec::new();
    let mut ids = Vec::with_capacity(rows * cols);
    for (k, node) in geometry.iter().enumerate() {
        let root = sets.find(k);
        if root_id[root] == usize::MAX {
            root_id[root] = sums.len();
            sums.push((Vector3::zeros(), 0));
        }
        let id = root_id[root];
        sums[id].0 += node.xyz.coords;
        sums[id].1 += 1;
        ids.push(id);
    }

    let nodes = sums
        .into_iter()
        .map(|(sum, count)| Point3::from(sum / count as f64))
        .collect();
    MergedNodes { nodes, ids }
}

/// Union-find over grid positions
struct DisjointSets {
    parent: Vec<usize>,
}

impl DisjointSets {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
        }
    }

    fn find(&mut self, mut k: usize) -> usize {
        while self.parent[k] != k {
            self.parent[k] = self.parent[self.parent[k]];
            k = self.parent[k];
        }
        k
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        // smaller root wins so numbering follows grid order
        if ra < rb {
            self.parent[rb] = ra;
        } else if rb < ra {
            self.parent[ra] = rb;
        }
    }
}

/// Drop consecutive repeats, including a repeat across the wrap-around
fn dedup_cyclic(ids: impl Iterator<Item = usize>) -> Vec<usize> {
    let mut out: Vec<usize> = Vec::new();
    for id in ids {
        if out.last() != Some(&id) {
            out.push(id);
        }
    }
    while out.len() > 1 && out.first() == out.last() {
        out.pop();
    }
    out
}

fn split_quad(quad: [usize; 4], triangles: &mut Vec<[usize; 3]>) {
    let c = dedup_cyclic(quad.into_iter());
    match c.len() {
        4 if c[0] != c[2] && c[1] != c[3] => {
            triangles.push([c[0], c[1], c[2]]);
            triangles.push([c[0], c[2], c[3]]);
        }
        3 => triangles.push([c[0], c[1], c[2]]),
        _ => {}
    }
}

/// Renumber `triangles` onto the nodes they use, keeping node order
fn drop_unused_nodes(nodes: Vec<Point3<f64>>, triangles: &mut [[usize; 3]]) -> Vec<Point3<f64>> {
    let mut remap = vec![usize::MAX; nodes.len()];
    for t in triangles.iter() {
        for &n in t {
            remap[n] = 0;
        }
    }
    let mut kept = Vec::with_capacity(nodes.len());
    for (n, p) in nodes.into_iter().enumerate() {
        if remap[n] == 0 {
            remap[n] = kept.len();
            kept.push(p);
        }
    }
    for t in triangles.iter_mut() {
        *t = t.map(|n| remap[n]);
    }
    kept
}

/// A triangle whose height over its longest edge is within `eps`
fn is_sliver(nodes: &[Point3<f64>], [a, b, c]: [usize; 3], eps: f64) -> bool {
    let (pa, pb, pc) = (nodes[a], nodes[b], nodes[c]);
    let longest = (pb - pa).norm().max((pc - pb).norm()).max((pa - pc).norm());
    let twice_area = (pb - pa).cross(&(pc - pa)).norm();
    longest <= eps || twice_area / longest <= eps
}
