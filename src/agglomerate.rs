//! Multigrid agglomeration
//!
//! Coarse levels are grown greedily: the lowest-numbered free element seeds
//! a cell, and the cell keeps absorbing the free neighbour it shares the
//! most edge weight with until it reaches the target size. Growth stops
//! once a level is too small to coarsen or coarsening no longer reduces the
//! element count.

use crate::mesh::{Edge, Element, GridHierarchy, MeshLevel, Upwind};
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const FREE: usize = usize::MAX;

/// Agglomeration parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgglomerationConfig {
    /// Fine elements merged into each coarse cell
    pub target_cell_size: usize,
    /// Levels with fewer elements are not coarsened further
    pub min_elements: usize,
}

impl Default for AgglomerationConfig {
    fn default() -> Self {
        Self {
            target_cell_size: crate::defaults::DEFAULT_TARGET_CELL_SIZE,
            min_elements: crate::defaults::DEFAULT_MIN_ELEMENTS,
        }
    }
}

impl AgglomerationConfig {
    #[must_use]
    pub const fn with_target_cell_size(mut self, size: usize) -> Self {
        self.target_cell_size = size;
        self
    }

    #[must_use]
    pub const fn with_min_elements(mut self, count: usize) -> Self {
        self.min_elements = count;
        self
    }
}

/// Builds coarse levels on top of a triangulated level 0
#[derive(Debug, Clone, Copy, Default)]
pub struct MeshAgglomerator {
    config: AgglomerationConfig,
}

impl MeshAgglomerator {
    #[must_use]
    pub const fn new(config: AgglomerationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AgglomerationConfig {
        &self.config
    }

    /// Rebuild every level above the finest, up to `max_levels` in total.
    ///
    /// Returns the resulting number of levels.
    pub fn agglomerate(&self, hierarchy: &mut GridHierarchy, max_levels: usize) -> usize {
        hierarchy.truncate_to_finest();

        while hierarchy.len() < max_levels {
            let Some(fine) = hierarchy.coarsest() else {
                break;
            };
            if fine.num_elements() < self.config.min_elements {
                log::debug!(
                    "Level {} has {} elements (< {}), stopping agglomeration",
                    fine.level,
                    fine.num_elements(),
                    self.config.min_elements
                );
                break;
            }

            let cells = self.partition(fine);
            if cells.len() >= fine.num_elements() {
                log::debug!("Level {} cannot be coarsened further", fine.level);
                break;
            }

            let coarse = coarsen(fine, &cells);
            log::info!(
                "Agglomerated level {} ({} elements) into {} cells with {} edges",
                fine.level,
                fine.num_elements(),
                coarse.num_elements(),
                coarse.num_edges()
            );
            hierarchy.push(coarse);
        }

        hierarchy.len()
    }

    /// Group the elements of `mesh` into cells. Every element lands in
    /// exactly one cell; each cell lists its members in ascending order.
    pub fn partition(&self, mesh: &MeshLevel) -> Vec<Vec<usize>> {
        let target = self.config.target_cell_size.max(1);
        let mut owner = vec![FREE; mesh.num_elements()];
        let mut cells: Vec<Vec<usize>> = Vec::new();

        for seed in 0..mesh.num_elements() {
            if owner[seed] != FREE {
                continue;
            }
            let cell = cells.len();
            let mut members = vec![seed];
            owner[seed] = cell;

            let mut frontier: BTreeMap<usize, usize> = BTreeMap::new();
            absorb_neighbors(mesh, seed, &owner, &mut frontier);

            while members.len() < target {
                // heaviest shared weight, lowest index on ties
                let next = frontier
                    .iter()
                    .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
                    .map(|(&e, _)| e);
                let Some(next) = next else { break };

                frontier.remove(&next);
                owner[next] = cell;
                members.push(next);
                absorb_neighbors(mesh, next, &owner, &mut frontier);
            }
            cells.push(members);
        }

        if target > 1 {
            merge_singletons(mesh, &mut cells, &mut owner);
        }
        for members in &mut cells {
            members.sort_unstable();
        }
        cells
    }
}

fn absorb_neighbors(
    mesh: &MeshLevel,
    element: usize,
    owner: &[usize],
    frontier: &mut BTreeMap<usize, usize>,
) {
    for (neighbor, weight) in mesh.neighbors(element) {
        if owner[neighbor] == FREE {
            *frontier.entry(neighbor).or_insert(0) += weight;
        }
    }
}

/// Fold cells that could not grow past one element into their best neighbour
fn merge_singletons(mesh: &MeshLevel, cells: &mut Vec<Vec<usize>>, owner: &mut [usize]) {
    for cell in 0..cells.len() {
        if cells[cell].len() != 1 {
            continue;
        }
        let element = cells[cell][0];

        let mut shared: BTreeMap<usize, usize> = BTreeMap::new();
        for (neighbor, weight) in mesh.neighbors(element) {
            if owner[neighbor] != cell {
                *shared.entry(owner[neighbor]).or_insert(0) += weight;
            }
        }
        let target = shared
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
            .map(|(&c, _)| c);

        if let Some(target) = target {
            cells[cell].clear();
            cells[target].push(element);
            owner[element] = target;
        }
    }

    cells.retain(|members| !members.is_empty());
    for (cell, members) in cells.iter().enumerate() {
        for &element in members {
            owner[element] = cell;
        }
    }
}

/// Build the coarse level whose cells are `cells` (a partition of `fine`)
pub fn coarsen(fine: &MeshLevel, cells: &[Vec<usize>]) -> MeshLevel {
    let mut owner = vec![FREE; fine.num_elements()];
    for (cell, members) in cells.iter().enumerate() {
        for &element in members {
            owner[element] = cell;
        }
    }

    let mut elements: Vec<Element> = cells
        .iter()
        .map(|members| {
            let area: f64 = members.iter().map(|&e| fine.elements[e].area).sum();
            let weighted = members.iter().fold(Vector3::zeros(), |acc, &e| {
                let child = &fine.elements[e];
                acc + child.centroid.coords * child.area
            });
            let centroid = if area > 0.0 {
                Point3::from(weighted / area)
            } else {
                Point3::from(
                    members
                        .iter()
                        .fold(Vector3::zeros(), |acc, &e| acc + fine.elements[e].centroid.coords)
                        / members.len() as f64,
                )
            };
            let normal = members
                .iter()
                .fold(Vector3::zeros(), |acc, &e| {
                    acc + fine.elements[e].normal * fine.elements[e].area
                })
                .try_normalize(0.0)
                .unwrap_or_else(Vector3::zeros);

            let mut nodes: Vec<usize> = members
                .iter()
                .flat_map(|&e| fine.elements[e].nodes.iter().copied())
                .collect();
            nodes.sort_unstable();
            nodes.dedup();

            Element {
                nodes,
                children: members.clone(),
                edges: Vec::new(),
                area,
                centroid,
                normal,
            }
        })
        .collect();

    // fine edges grouped by the pair of cells they separate
    let mut groups: BTreeMap<(usize, Option<usize>), Vec<usize>> = BTreeMap::new();
    for (e, edge) in fine.edges.iter().enumerate() {
        let left = owner[edge.left];
        let key = match edge.right.map(|r| owner[r]) {
            None => (left, None),
            Some(right) if right == left => continue,
            Some(right) => (left.min(right), Some(left.max(right))),
        };
        groups.entry(key).or_default().push(e);
    }

    let mut edges = Vec::with_capacity(groups.len());
    for ((left, right), children) in groups {
        let mut segments = Vec::new();
        for &e in &children {
            let child = &fine.edges[e];
            let flipped = owner[child.left] != left;
            segments.extend(
                child
                    .segments
                    .iter()
                    .map(|&[p, q]| if flipped { [q, p] } else { [p, q] }),
            );
        }
        let length = children.iter().map(|&e| fine.edges[e].length).sum();

        let index = edges.len();
        elements[left].edges.push(index);
        if let Some(right) = right {
            elements[right].edges.push(index);
        }
        edges.push(Edge {
            segments,
            left,
            right,
            children,
            length,
            upwind: Upwind::Unset,
            flux: 0.0,
        });
    }

    MeshLevel {
        surface_id: fine.surface_id,
        level: fine.level + 1,
        nodes: fine.nodes.clone(),
        elements,
        edges,
    }
}
