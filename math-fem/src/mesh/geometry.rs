//! Shared mesh geometry and per-cell permeability
//!
//! [`MeshGeometry`] owns nodes, edges and elements and never changes after
//! validation. [`Mesh`] pairs an `Arc` of it with a μ value per element, so
//! cloning a mesh to perturb one cell copies a single `Vec<f64>`.

use super::types::{Aabb, Axis, EDGES_PER_ELEMENT, Edge, Element, Node, Point3D};
use crate::error::{FemError, Result};
use std::sync::Arc;

/// Relative tolerance for geometric consistency checks during validation
const GEOMETRY_TOLERANCE: f64 = 1e-9;

/// Validated, immutable mesh topology and geometry
#[derive(Debug, Clone)]
pub struct MeshGeometry {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    elements: Vec<Element>,
    bounds: Aabb,
}

impl MeshGeometry {
    /// Build and validate a mesh geometry
    ///
    /// `element_edges` lists the 12 global edge indices of every element in
    /// canonical local order (see [`Element`]).
    pub fn new(
        nodes: Vec<Node>,
        edges: Vec<Edge>,
        element_edges: Vec<[usize; EDGES_PER_ELEMENT]>,
    ) -> Result<Self> {
        for (i, node) in nodes.iter().enumerate() {
            if node.index != i {
                return Err(FemError::NonDenseIndex {
                    kind: "node",
                    expected: i,
                    got: node.index,
                });
            }
            if !node.position.is_finite() {
                return Err(FemError::InvalidMeshParameters(format!(
                    "node {i} has a non-finite position"
                )));
            }
        }

        let mut edge_axes = Vec::with_capacity(edges.len());
        for (i, edge) in edges.iter().enumerate() {
            if edge.index != i {
                return Err(FemError::NonDenseIndex {
                    kind: "edge",
                    expected: i,
                    got: edge.index,
                });
            }
            for &n in &edge.nodes {
                if n >= nodes.len() {
                    return Err(FemError::NodeOutOfRange {
                        edge: i,
                        node: n,
                        count: nodes.len(),
                    });
                }
            }
            let a = nodes[edge.nodes[0]].position;
            let b = nodes[edge.nodes[1]].position;
            edge_axes.push(edge_axis(&a, &b).ok_or(FemError::MalformedEdge(i))?);
        }

        let mut used = vec![false; edges.len()];
        let mut elements = Vec::with_capacity(element_edges.len());
        for (e, local_edges) in element_edges.into_iter().enumerate() {
            for &g in &local_edges {
                if g >= edges.len() {
                    return Err(FemError::EdgeOutOfRange {
                        element: e,
                        edge: g,
                        count: edges.len(),
                    });
                }
                used[g] = true;
            }

            let corners: Vec<Point3D> = local_edges
                .iter()
                .flat_map(|&g| edges[g].nodes.map(|n| nodes[n].position))
                .collect();
            let bounds = Aabb::from_points(&corners).ok_or(FemError::DegenerateElement {
                element: e,
                volume: 0.0,
            })?;
            let volume = bounds.volume();
            let scale = bounds.extents().into_iter().fold(0.0_f64, f64::max);
            if !(volume > 0.0) || Axis::ALL.iter().any(|&a| bounds.extent(a) <= GEOMETRY_TOLERANCE * scale) {
                return Err(FemError::DegenerateElement { element: e, volume });
            }

            for (local, &g) in local_edges.iter().enumerate() {
                if !is_canonical(&bounds, local, edge_axes[g], &edges[g], &nodes, scale) {
                    return Err(FemError::NonCanonicalElement { element: e, local });
                }
            }

            elements.push(Element {
                edges: local_edges,
                bounds,
                volume,
            });
        }

        if let Some(unused) = used.iter().position(|u| !u) {
            return Err(FemError::UnusedEdge(unused));
        }

        let bounds = Aabb::from_points(nodes.iter().map(|n| &n.position)).ok_or_else(|| {
            FemError::InvalidMeshParameters("mesh has no nodes".to_string())
        })?;

        Ok(Self {
            nodes,
            edges,
            elements,
            bounds,
        })
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn num_elements(&self) -> usize {
        self.elements.len()
    }

    /// Number of global degrees of freedom (one per edge)
    pub fn dof_count(&self) -> usize {
        self.edges.len()
    }

    /// Bounding box of the whole mesh
    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    pub fn edge_endpoints(&self, edge: usize) -> Option<(Point3D, Point3D)> {
        let e = self.edges.get(edge)?;
        Some((
            self.nodes[e.nodes[0]].position,
            self.nodes[e.nodes[1]].position,
        ))
    }
}

/// Axis along which `a → b` runs, if the segment is axis-aligned and non-empty
fn edge_axis(a: &Point3D, b: &Point3D) -> Option<Axis> {
    let d = *b - *a;
    let len = d.norm();
    if !(len > 0.0) {
        return None;
    }
    let mut along = None;
    for axis in Axis::ALL {
        if d.component(axis).abs() > GEOMETRY_TOLERANCE * len {
            if along.is_some() {
                return None;
            }
            along = Some(axis);
        }
    }
    along
}

/// Check that `edge` sits where local edge `local` belongs in `bounds`
fn is_canonical(
    bounds: &Aabb,
    local: usize,
    axis: Axis,
    edge: &Edge,
    nodes: &[Node],
    scale: f64,
) -> bool {
    let expected_axis = Axis::ALL[local / 4];
    if axis != expected_axis {
        return false;
    }
    let tol = GEOMETRY_TOLERANCE * scale;
    let (t1, t2) = axis.transverse();
    let at = |t: Axis, upper: bool| if upper { bounds.upper(t) } else { bounds.lower(t) };
    let want_t1 = at(t1, local & 1 != 0);
    let want_t2 = at(t2, local & 2 != 0);

    let a = nodes[edge.nodes[0]].position;
    let b = nodes[edge.nodes[1]].position;
    let span_lo = a.coord(axis).min(b.coord(axis));
    let span_hi = a.coord(axis).max(b.coord(axis));

    [a, b].iter().all(|p| {
        (p.coord(t1) - want_t1).abs() <= tol && (p.coord(t2) - want_t2).abs() <= tol
    }) && (span_lo - bounds.lower(axis)).abs() <= tol
        && (span_hi - bounds.upper(axis)).abs() <= tol
}

/// Mesh geometry plus the per-element permeability being solved for
#[derive(Debug, Clone)]
pub struct Mesh {
    geometry: Arc<MeshGeometry>,
    mu: Vec<f64>,
}

impl Mesh {
    /// Attach one μ value per element to a shared geometry
    pub fn new(geometry: Arc<MeshGeometry>, mu: Vec<f64>) -> Result<Self> {
        if mu.len() != geometry.num_elements() {
            return Err(FemError::DimensionMismatch {
                context: "mesh permeabilities",
                expected: geometry.num_elements(),
                got: mu.len(),
            });
        }
        Ok(Self { geometry, mu })
    }

    /// Mesh with the same μ in every element
    pub fn uniform(geometry: Arc<MeshGeometry>, mu: f64) -> Self {
        let mu = vec![mu; geometry.num_elements()];
        Self { geometry, mu }
    }

    pub fn geometry(&self) -> &Arc<MeshGeometry> {
        &self.geometry
    }

    pub fn num_elements(&self) -> usize {
        self.geometry.num_elements()
    }

    pub fn num_nodes(&self) -> usize {
        self.geometry.nodes().len()
    }

    pub fn dof_count(&self) -> usize {
        self.geometry.dof_count()
    }

    pub fn elements(&self) -> &[Element] {
        self.geometry.elements()
    }

    pub fn element(&self, index: usize) -> Result<&Element> {
        self.geometry
            .elements()
            .get(index)
            .ok_or(FemError::ElementOutOfRange {
                index,
                count: self.num_elements(),
            })
    }

    pub fn mu(&self, index: usize) -> Result<f64> {
        self.mu.get(index).copied().ok_or(FemError::ElementOutOfRange {
            index,
            count: self.num_elements(),
        })
    }

    pub fn set_mu(&mut self, index: usize, value: f64) -> Result<()> {
        let count = self.num_elements();
        let slot = self
            .mu
            .get_mut(index)
            .ok_or(FemError::ElementOutOfRange { index, count })?;
        *slot = value;
        Ok(())
    }

    pub fn mu_values(&self) -> &[f64] {
        &self.mu
    }

    pub fn set_mu_values(&mut self, values: &[f64]) -> Result<()> {
        if values.len() != self.mu.len() {
            return Err(FemError::DimensionMismatch {
                context: "mesh permeabilities",
                expected: self.mu.len(),
                got: values.len(),
            });
        }
        self.mu.copy_from_slice(values);
        Ok(())
    }

    /// Same geometry, every element set to `mu`
    pub fn with_uniform_mu(&self, mu: f64) -> Mesh {
        Mesh::uniform(Arc::clone(&self.geometry), mu)
    }

    /// Copy with `mu[index] += delta`, leaving `self` untouched
    pub fn with_perturbed_mu(&self, index: usize, delta: f64) -> Result<Mesh> {
        let mut perturbed = self.clone();
        let current = perturbed.mu(index)?;
        perturbed.set_mu(index, current + delta)?;
        Ok(perturbed)
    }

    pub fn bounds(&self) -> &Aabb {
        self.geometry.bounds()
    }

    /// First element whose box contains `point` (inclusive, widened by `eps`)
    pub fn find_element(&self, point: &Point3D, eps: f64) -> Option<usize> {
        self.elements()
            .iter()
            .position(|e| e.bounds.contains(point, eps))
    }

    /// Edges with both endpoints on the outer bounding box
    ///
    /// Each endpoint may sit on a different face; with a single cell along
    /// an axis every edge along that axis qualifies.
    pub fn boundary_edges(&self, eps: f64) -> Vec<usize> {
        let bounds = self.bounds();
        let nodes = self.geometry.nodes();
        self.geometry
            .edges()
            .iter()
            .filter(|e| {
                e.nodes
                    .iter()
                    .all(|&n| bounds.on_boundary(&nodes[n].position, eps))
            })
            .map(|e| e.index)
            .collect()
    }

    /// Neighbour lists: two elements are adjacent when they share an edge
    pub fn adjacency(&self) -> Vec<Vec<usize>> {
        let mut edge_cells: Vec<Vec<usize>> = vec![Vec::new(); self.dof_count()];
        for (e, element) in self.elements().iter().enumerate() {
            for &g in &element.edges {
                edge_cells[g].push(e);
            }
        }

        let mut neighbours: Vec<Vec<usize>> = vec![Vec::new(); self.num_elements()];
        for cells in &edge_cells {
            for &a in cells {
                for &b in cells {
                    if a != b {
                        neighbours[a].push(b);
                    }
                }
            }
        }
        for list in &mut neighbours {
            list.sort_unstable();
            list.dedup();
        }
        neighbours
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{AxisSplitting, StructuredMeshBuilder};

    /// Unit cube as one element, built by hand in canonical order
    fn unit_cube_parts() -> (Vec<Node>, Vec<Edge>, Vec<[usize; 12]>) {
        let nodes: Vec<Node> = (0..8)
            .map(|i| Node {
                index: i,
                position: Point3D::new((i & 1) as f64, ((i >> 1) & 1) as f64, ((i >> 2) & 1) as f64),
            })
            .collect();
        let pairs = [
            // X edges: (y, z) = (0,0), (1,0), (0,1), (1,1)
            [0, 1], [2, 3], [4, 5], [6, 7],
            // Y edges: (x, z)
            [0, 2], [1, 3], [4, 6], [5, 7],
            // Z edges: (x, y)
            [0, 4], [1, 5], [2, 6], [3, 7],
        ];
        let edges = pairs
            .iter()
            .enumerate()
            .map(|(i, &nodes)| Edge { index: i, nodes })
            .collect();
        (nodes, edges, vec![std::array::from_fn(|i| i)])
    }

    #[test]
    fn test_single_cube_geometry() {
        let (nodes, edges, elems) = unit_cube_parts();
        let geometry = MeshGeometry::new(nodes, edges, elems).unwrap();
        assert_eq!(geometry.dof_count(), 12);
        assert_eq!(geometry.num_elements(), 1);
        assert_eq!(geometry.elements()[0].volume, 1.0);
        assert_eq!(geometry.bounds().extents(), [1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_rejects_swapped_local_edges() {
        let (nodes, edges, mut elems) = unit_cube_parts();
        elems[0].swap(0, 1);
        assert!(matches!(
            MeshGeometry::new(nodes, edges, elems),
            Err(FemError::NonCanonicalElement { element: 0, local: 0 })
        ));
    }

    #[test]
    fn test_rejects_degenerate_element() {
        let (mut nodes, edges, elems) = unit_cube_parts();
        // Collapse z: top nodes onto the bottom plane
        for n in nodes.iter_mut().skip(4) {
            n.position.z = 0.0;
        }
        let err = MeshGeometry::new(nodes, edges, elems).unwrap_err();
        assert!(matches!(
            err,
            FemError::MalformedEdge(_) | FemError::DegenerateElement { .. }
        ));
    }

    #[test]
    fn test_rejects_sparse_indices() {
        let (nodes, mut edges, elems) = unit_cube_parts();
        edges[3].index = 40;
        assert!(matches!(
            MeshGeometry::new(nodes, edges, elems),
            Err(FemError::NonDenseIndex { kind: "edge", expected: 3, got: 40 })
        ));
    }

    #[test]
    fn test_clone_shares_geometry() {
        let (nodes, edges, elems) = unit_cube_parts();
        let geometry = Arc::new(MeshGeometry::new(nodes, edges, elems).unwrap());
        let mesh = Mesh::uniform(geometry, 1.0);
        let perturbed = mesh.with_perturbed_mu(0, 0.5).unwrap();

        assert!(Arc::ptr_eq(mesh.geometry(), perturbed.geometry()));
        assert_eq!(mesh.mu(0).unwrap(), 1.0);
        assert_eq!(perturbed.mu(0).unwrap(), 1.5);
        assert!(mesh.with_perturbed_mu(3, 0.1).is_err());
    }

    #[test]
    fn test_adjacency_and_lookup() {
        let axis = AxisSplitting::uniform(0.0, 3.0, 3);
        let mesh = StructuredMeshBuilder::new(axis.clone(), axis.clone(), axis)
            .build()
            .unwrap();
        assert_eq!(mesh.num_elements(), 27);

        let adjacency = mesh.adjacency();
        // Centre cell shares an edge with every cell except the 8 corners
        assert_eq!(adjacency[13].len(), 18);
        // Corner cell: 3 face neighbours and 3 edge neighbours
        assert_eq!(adjacency[0].len(), 6);
        assert!(adjacency.iter().enumerate().all(|(i, n)| !n.contains(&i)));

        assert_eq!(mesh.find_element(&Point3D::new(1.5, 1.5, 1.5), 1e-8), Some(13));
        assert_eq!(mesh.find_element(&Point3D::new(3.5, 1.5, 1.5), 1e-8), None);
    }

    #[test]
    fn test_boundary_edges_of_cube() {
        let axis = AxisSplitting::uniform(0.0, 2.0, 2);
        let mesh = StructuredMeshBuilder::new(axis.clone(), axis.clone(), axis)
            .build()
            .unwrap();
        // 54 edges in total; the 6 edges touching the centre node are interior
        assert_eq!(mesh.dof_count(), 54);
        assert_eq!(mesh.boundary_edges(1e-8).len(), 48);
    }
}
