//! Structured hexahedral mesh generator
//!
//! Builds a tensor-product grid from three graded axis splittings. Anomaly
//! boxes ([`Stratum`]) contribute their faces as extra grid planes so cell
//! boundaries follow the anomaly, and set μ in the cells they contain.

use super::geometry::{Mesh, MeshGeometry};
use super::types::{Axis, EDGES_PER_ELEMENT, Edge, Node, Point3D, Vector3D};
use crate::error::{FemError, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Graded subdivision of `[start, end]` into `cells` intervals
///
/// Successive interval lengths grow by `ratio`; a ratio of 1 gives a uniform
/// split and a ratio (or cell count) of 0 gives the two end points only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisSplitting {
    pub start: f64,
    pub end: f64,
    pub cells: usize,
    #[serde(default = "default_ratio")]
    pub ratio: f64,
}

fn default_ratio() -> f64 {
    1.0
}

impl AxisSplitting {
    pub fn uniform(start: f64, end: f64, cells: usize) -> Self {
        Self {
            start,
            end,
            cells,
            ratio: 1.0,
        }
    }

    pub fn graded(start: f64, end: f64, cells: usize, ratio: f64) -> Self {
        Self {
            start,
            end,
            cells,
            ratio,
        }
    }

    /// Grid coordinates from `start` to `end`, inclusive
    pub fn coordinates(&self) -> Vec<f64> {
        if self.cells == 0 || self.ratio == 0.0 {
            return vec![self.start, self.end];
        }

        let length = self.end - self.start;
        let n = self.cells;
        let q = self.ratio;
        let mut h = if (q - 1.0).abs() > f64::EPSILON {
            length * (1.0 - q) / (1.0 - q.powi(n as i32))
        } else {
            length / n as f64
        };

        let mut coords = Vec::with_capacity(n + 1);
        coords.push(self.start);
        let mut x = self.start;
        for _ in 0..n {
            x += h;
            coords.push(x);
            h *= q;
        }
        // Pin the last point against round-off drift
        coords[n] = self.end;
        coords
    }
}

/// Axis-aligned anomaly box with its own permeability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stratum {
    pub center: Point3D,
    pub half_extent: Vector3D,
    pub mu: f64,
}

impl Stratum {
    /// Inclusive containment test
    pub fn contains(&self, p: &Point3D) -> bool {
        Axis::ALL.iter().all(|&a| {
            let c = self.center.coord(a);
            let h = self.half_extent.component(a);
            p.coord(a) >= c - h && p.coord(a) <= c + h
        })
    }

    fn planes(&self, axis: Axis) -> [f64; 2] {
        let c = self.center.coord(axis);
        let h = self.half_extent.component(axis);
        [c - h, c + h]
    }
}

/// Builder for structured hexahedral meshes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredMeshBuilder {
    pub x: AxisSplitting,
    pub y: AxisSplitting,
    pub z: AxisSplitting,
    #[serde(default = "default_background_mu")]
    pub background_mu: f64,
    #[serde(default)]
    pub strata: Vec<Stratum>,
}

fn default_background_mu() -> f64 {
    1.0
}

impl StructuredMeshBuilder {
    pub fn new(x: AxisSplitting, y: AxisSplitting, z: AxisSplitting) -> Self {
        Self {
            x,
            y,
            z,
            background_mu: default_background_mu(),
            strata: Vec::new(),
        }
    }

    pub fn background_mu(mut self, mu: f64) -> Self {
        self.background_mu = mu;
        self
    }

    pub fn stratum(mut self, stratum: Stratum) -> Self {
        self.strata.push(stratum);
        self
    }

    /// Grid planes along `axis`, including strata faces strictly inside
    pub fn axis_coordinates(&self, axis: Axis) -> Vec<f64> {
        let splitting = match axis {
            Axis::X => &self.x,
            Axis::Y => &self.y,
            Axis::Z => &self.z,
        };
        let mut coords = splitting.coordinates();
        let lo = coords.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = coords.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        coords.extend(
            self.strata
                .iter()
                .flat_map(|s| s.planes(axis))
                .filter(|&c| c > lo && c < hi),
        );
        coords.sort_by(f64::total_cmp);

        let tol = 1e-12 * (hi - lo).abs().max(1.0);
        coords.dedup_by(|a, b| (*a - *b).abs() <= tol);
        coords
    }

    /// Generate the mesh and assign μ per cell
    pub fn build(&self) -> Result<Mesh> {
        let xs = self.axis_coordinates(Axis::X);
        let ys = self.axis_coordinates(Axis::Y);
        let zs = self.axis_coordinates(Axis::Z);
        for (axis, coords) in [(Axis::X, &xs), (Axis::Y, &ys), (Axis::Z, &zs)] {
            if coords.len() < 2 {
                return Err(FemError::InvalidMeshParameters(format!(
                    "axis {axis:?} needs at least two distinct grid planes"
                )));
            }
        }

        let grid = GridNumbering::new(xs.len(), ys.len(), zs.len());

        let mut nodes = Vec::with_capacity(grid.nx * grid.ny * grid.nz);
        for (k, &z) in zs.iter().enumerate() {
            for (j, &y) in ys.iter().enumerate() {
                for (i, &x) in xs.iter().enumerate() {
                    nodes.push(Node {
                        index: grid.node(i, j, k),
                        position: Point3D::new(x, y, z),
                    });
                }
            }
        }

        let mut edges = Vec::with_capacity(grid.edge_count());
        for k in 0..grid.nz {
            for j in 0..grid.ny {
                for i in 0..grid.nx - 1 {
                    edges.push(Edge {
                        index: grid.x_edge(i, j, k),
                        nodes: [grid.node(i, j, k), grid.node(i + 1, j, k)],
                    });
                }
            }
        }
        for k in 0..grid.nz {
            for j in 0..grid.ny - 1 {
                for i in 0..grid.nx {
                    edges.push(Edge {
                        index: grid.y_edge(i, j, k),
                        nodes: [grid.node(i, j, k), grid.node(i, j + 1, k)],
                    });
                }
            }
        }
        for k in 0..grid.nz - 1 {
            for j in 0..grid.ny {
                for i in 0..grid.nx {
                    edges.push(Edge {
                        index: grid.z_edge(i, j, k),
                        nodes: [grid.node(i, j, k), grid.node(i, j, k + 1)],
                    });
                }
            }
        }

        let mut element_edges = Vec::with_capacity((grid.nx - 1) * (grid.ny - 1) * (grid.nz - 1));
        let mut mu = Vec::with_capacity(element_edges.capacity());
        for k in 0..grid.nz - 1 {
            for j in 0..grid.ny - 1 {
                for i in 0..grid.nx - 1 {
                    element_edges.push(grid.cell_edges(i, j, k));

                    let center = Point3D::new(
                        0.5 * (xs[i] + xs[i + 1]),
                        0.5 * (ys[j] + ys[j + 1]),
                        0.5 * (zs[k] + zs[k + 1]),
                    );
                    let cell_mu = self
                        .strata
                        .iter()
                        .find(|s| s.contains(&center))
                        .map_or(self.background_mu, |s| s.mu);
                    mu.push(cell_mu);
                }
            }
        }

        let geometry = MeshGeometry::new(nodes, edges, element_edges)?;
        log::debug!(
            "Structured mesh: {}x{}x{} cells, {} DOFs",
            grid.nx - 1,
            grid.ny - 1,
            grid.nz - 1,
            geometry.dof_count()
        );
        Mesh::new(Arc::new(geometry), mu)
    }
}

/// Global numbering of a tensor-product grid with `nx × ny × nz` nodes
///
/// Nodes run x fastest, then y, then z. Edges are numbered all X edges
/// first, then Y edges, then Z edges, each block in the same sweep order.
#[derive(Debug, Clone, Copy)]
struct GridNumbering {
    nx: usize,
    ny: usize,
    nz: usize,
}

impl GridNumbering {
    fn new(nx: usize, ny: usize, nz: usize) -> Self {
        Self { nx, ny, nz }
    }

    fn node(&self, i: usize, j: usize, k: usize) -> usize {
        i + self.nx * (j + self.ny * k)
    }

    fn x_edge_count(&self) -> usize {
        (self.nx - 1) * self.ny * self.nz
    }

    fn y_edge_count(&self) -> usize {
        self.nx * (self.ny - 1) * self.nz
    }

    fn edge_count(&self) -> usize {
        self.x_edge_count() + self.y_edge_count() + self.nx * self.ny * (self.nz - 1)
    }

    fn x_edge(&self, i: usize, j: usize, k: usize) -> usize {
        i + (self.nx - 1) * (j + self.ny * k)
    }

    fn y_edge(&self, i: usize, j: usize, k: usize) -> usize {
        self.x_edge_count() + i + self.nx * (j + (self.ny - 1) * k)
    }

    fn z_edge(&self, i: usize, j: usize, k: usize) -> usize {
        self.x_edge_count() + self.y_edge_count() + i + self.nx * (j + self.ny * k)
    }

    /// Edges of cell `(i, j, k)` in canonical local order
    fn cell_edges(&self, i: usize, j: usize, k: usize) -> [usize; EDGES_PER_ELEMENT] {
        std::array::from_fn(|local| {
            let lo = local & 1;
            let hi = (local >> 1) & 1;
            match local / 4 {
                0 => self.x_edge(i, j + lo, k + hi),
                1 => self.y_edge(i + lo, j, k + hi),
                _ => self.z_edge(i + lo, j + hi, k),
            }
        })
    }
}
