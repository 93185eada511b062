//! Unstructured surface mesh levels and the multigrid hierarchy
//!
//! Level 0 of a hierarchy is a triangle mesh. Every coarser level is made
//! of polygonal cells, each listing the indices of the finer elements it
//! absorbed. Edges are stored once per element pair and carry the upwind
//! annotation consumed by the flow solver.

use crate::error::{MeshError, MeshResult};
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Flow direction across an edge relative to its left element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Upwind {
    /// Not classified yet
    #[default]
    Unset,
    /// Flow crosses from the left element into the right one
    Left,
    /// Flow crosses from the right element into the left one
    Right,
    /// Flow runs along the edge
    Parallel,
    /// Boundary edge, flow leaves the surface through it
    Outflow,
    /// Boundary edge, flow enters the surface through it
    Inflow,
}

/// Mesh element: a triangle at level 0, an agglomerated cell above
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    /// Triangle corners in orientation order; sorted node set for cells
    pub nodes: Vec<usize>,
    /// Indices into the next finer level (empty at level 0)
    pub children: Vec<usize>,
    /// Incident edges of this level
    pub edges: Vec<usize>,
    pub area: f64,
    pub centroid: Point3<f64>,
    /// Unit normal, area weighted for cells
    pub normal: Vector3<f64>,
}

/// Interface between two elements, or between an element and the boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// Node pairs, each oriented so `left` is on its left
    pub segments: Vec<[usize; 2]>,
    pub left: usize,
    /// `None` on the surface boundary
    pub right: Option<usize>,
    /// Indices into the next finer level's edges (empty at level 0)
    pub children: Vec<usize>,
    pub length: f64,
    pub upwind: Upwind,
    /// Signed tangential freestream flux, positive from left to right
    pub flux: f64,
}

impl Edge {
    pub fn is_boundary(&self) -> bool {
        self.right.is_none()
    }

    /// Number of fine edges this edge stands for
    pub fn weight(&self) -> usize {
        self.children.len().max(1)
    }

    /// Element across the edge from `element`
    pub fn other(&self, element: usize) -> Option<usize> {
        match self.right {
            Some(right) if self.left == element => Some(right),
            Some(_) if self.right == Some(element) => Some(self.left),
            _ => None,
        }
    }
}

/// One level of the grid hierarchy
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshLevel {
    pub surface_id: usize,
    pub level: usize,
    pub nodes: Vec<Point3<f64>>,
    pub elements: Vec<Element>,
    pub edges: Vec<Edge>,
}

impl MeshLevel {
    /// Build a level-0 mesh from deduplicated nodes and oriented triangles.
    ///
    /// Fails when a triangle references a missing node or when an edge
    /// would be shared by more than two triangles. The error names the
    /// surface by `surface_id`.
    pub fn from_triangles(
        surface_id: usize,
        nodes: Vec<Point3<f64>>,
        triangles: &[[usize; 3]],
    ) -> MeshResult<Self> {
        let mut elements = Vec::with_capacity(triangles.len());
        let mut edges: Vec<Edge> = Vec::with_capacity(triangles.len() * 3 / 2 + 1);
        let mut edge_index: HashMap<(usize, usize), usize> = HashMap::new();

        for (t, tri) in triangles.iter().enumerate() {
            if let Some(&bad) = tri.iter().find(|&&n| n >= nodes.len()) {
                return Err(MeshError::mesh_generation(
                    surface_id.to_string(),
                    format!("triangle {t} references node {bad} of {}", nodes.len()),
                ));
            }
            let [a, b, c] = tri.map(|n| nodes[n]);
            let cross = (b - a).cross(&(c - a));
            let mut element = Element {
                nodes: tri.to_vec(),
                children: Vec::new(),
                edges: Vec::with_capacity(3),
                area: 0.5 * cross.norm(),
                centroid: Point3::from((a.coords + b.coords + c.coords) / 3.0),
                normal: cross.try_normalize(0.0).unwrap_or_else(Vector3::zeros),
            };

            for k in 0..3 {
                let (p, q) = (tri[k], tri[(k + 1) % 3]);
                let key = (p.min(q), p.max(q));
                let e = match edge_index.get(&key) {
                    None => {
                        edge_index.insert(key, edges.len());
                        edges.push(Edge {
                            segments: vec![[p, q]],
                            left: t,
                            right: None,
                            children: Vec::new(),
                            length: (nodes[q] - nodes[p]).norm(),
                            upwind: Upwind::Unset,
                            flux: 0.0,
                        });
                        edges.len() - 1
                    }
                    Some(&e) => {
                        let edge = &mut edges[e];
                        if edge.right.is_some() || edge.left == t {
                            return Err(MeshError::mesh_generation(
                                surface_id.to_string(),
                                format!("edge ({p}, {q}) is used by more than two triangles"),
                            ));
                        }
                        edge.right = Some(t);
                        e
                    }
                };
                element.edges.push(e);
            }
            elements.push(element);
        }

        Ok(Self {
            surface_id,
            level: 0,
            nodes,
            elements,
            edges,
        })
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_elements(&self) -> usize {
        self.elements.len()
    }

    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    /// Triangles of a level-0 mesh; empty for agglomerated levels
    pub fn triangles(&self) -> impl Iterator<Item = [usize; 3]> + '_ {
        self.elements
            .iter()
            .filter(|e| e.children.is_empty())
            .filter_map(|e| <[usize; 3]>::try_from(e.nodes.as_slice()).ok())
    }

    /// Neighbours of `element` with the number of fine edges shared with each
    pub fn neighbors(&self, element: usize) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.elements[element]
            .edges
            .iter()
            .filter_map(move |&e| {
                let edge = &self.edges[e];
                edge.other(element).map(|n| (n, edge.weight()))
            })
    }

    pub fn boundary_edges(&self) -> impl Iterator<Item = &Edge> + '_ {
        self.edges.iter().filter(|e| e.is_boundary())
    }

    /// Sum of element areas
    pub fn total_area(&self) -> f64 {
        self.elements.iter().map(|e| e.area).sum()
    }

    /// Mesh bounds
    pub fn bounds(&self) -> (Point3<f64>, Point3<f64>) {
        let Some(&first) = self.nodes.first() else {
            return (Point3::origin(), Point3::origin());
        };
        self.nodes
            .iter()
            .fold((first, first), |(min, max), p| (min.inf(p), max.sup(p)))
    }
}

/// Ordered mesh levels, finest first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GridHierarchy {
    levels: Vec<MeshLevel>,
}

impl GridHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every level and start again from `finest`
    pub fn reset(&mut self, mut finest: MeshLevel) {
        finest.level = 0;
        self.levels.clear();
        self.levels.push(finest);
    }

    /// Drop every level above the finest
    pub fn truncate_to_finest(&mut self) {
        self.levels.truncate(1);
    }

    pub fn push(&mut self, mut level: MeshLevel) {
        level.level = self.levels.len();
        self.levels.push(level);
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn finest(&self) -> Option<&MeshLevel> {
        self.levels.first()
    }

    pub fn coarsest(&self) -> Option<&MeshLevel> {
        self.levels.last()
    }

    /// Level `index`, or the coarsest level when `index` is past the end
    pub fn level(&self, index: usize) -> Option<&MeshLevel> {
        self.levels.get(index.min(self.levels.len().saturating_sub(1)))
    }

    pub fn level_mut(&mut self, index: usize) -> Option<&mut MeshLevel> {
        let last = self.levels.len().saturating_sub(1);
        self.levels.get_mut(index.min(last))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MeshLevel> {
        self.levels.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, MeshLevel> {
        self.levels.iter_mut()
    }
}
