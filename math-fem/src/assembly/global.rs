//! Global system assembly
//!
//! Element matrices are computed independently and scattered into a dense
//! `dof_count × dof_count` matrix. Two parallel strategies are provided:
//!
//! - [`AssemblyStrategy::PerDofLocks`]: every global row (and its RHS entry)
//!   sits behind its own mutex and elements scatter as soon as they are
//!   computed. Summation order depends on scheduling, so results may differ
//!   in the last bits between runs.
//! - [`AssemblyStrategy::Ordered`]: element systems are computed in parallel,
//!   then scattered sequentially in element order. Bit-reproducible.

use super::element::{LocalMatrix, LocalVector, element_load, element_stiffness};
use crate::basis::CurlScheme;
use crate::error::{FemError, Result};
use crate::mesh::{EDGES_PER_ELEMENT, Mesh};
use crate::quadrature::IntegrationRule;
use crate::source::CurrentSegment;
use math_magneto_solvers::parallel::worker_count;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::time::Instant;

#[cfg(feature = "parallel")]
use rayon::prelude::*;
#[cfg(feature = "parallel")]
use std::sync::{Mutex, PoisonError};

/// Scatter strategy for parallel assembly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssemblyStrategy {
    #[default]
    PerDofLocks,
    Ordered,
}

/// Numerical choices shared by all assembly routines
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssemblyOptions {
    pub rule: IntegrationRule,
    pub curl_scheme: CurlScheme,
    pub strategy: AssemblyStrategy,
    /// Tolerance for deciding which element a source segment falls in
    pub containment_eps: f64,
    /// Run element work on the rayon pool (ignored without the `parallel` feature)
    pub parallel: bool,
}

impl Default for AssemblyOptions {
    fn default() -> Self {
        Self {
            rule: IntegrationRule::default(),
            curl_scheme: CurlScheme::default(),
            strategy: AssemblyStrategy::default(),
            containment_eps: 1e-8,
            parallel: true,
        }
    }
}

/// Assembled dense system `A x = b`
#[derive(Debug, Clone)]
pub struct GlobalSystem {
    pub matrix: Array2<f64>,
    pub rhs: Array1<f64>,
}

impl GlobalSystem {
    pub fn zeros(dim: usize) -> Self {
        Self {
            matrix: Array2::zeros((dim, dim)),
            rhs: Array1::zeros(dim),
        }
    }

    pub fn dim(&self) -> usize {
        self.rhs.len()
    }
}

struct LocalSystem {
    dofs: [usize; EDGES_PER_ELEMENT],
    matrix: LocalMatrix,
    load: LocalVector,
}

fn local_system(
    mesh: &Mesh,
    index: usize,
    segments: &[CurrentSegment],
    options: &AssemblyOptions,
) -> Result<LocalSystem> {
    let element = mesh.element(index)?;
    let mu = mesh.mu(index)?;
    Ok(LocalSystem {
        dofs: element.edges,
        matrix: element_stiffness(index, &element.bounds, mu, options.rule, options.curl_scheme)?,
        load: element_load(&element.bounds, segments, options.containment_eps),
    })
}

fn scatter(system: &mut GlobalSystem, local: &LocalSystem) {
    for (i, &gi) in local.dofs.iter().enumerate() {
        system.rhs[gi] += local.load[i];
        for (j, &gj) in local.dofs.iter().enumerate() {
            system.matrix[[gi, gj]] += local.matrix[i][j];
        }
    }
}

/// Assemble stiffness matrix and load vector for `mesh` driven by `segments`
pub fn assemble_system(
    mesh: &Mesh,
    segments: &[CurrentSegment],
    options: &AssemblyOptions,
) -> Result<GlobalSystem> {
    let start = Instant::now();

    #[cfg(feature = "parallel")]
    let system = if options.parallel {
        match options.strategy {
            AssemblyStrategy::PerDofLocks => assemble_locked(mesh, segments, options)?,
            AssemblyStrategy::Ordered => assemble_ordered(mesh, segments, options)?,
        }
    } else {
        assemble_sequential(mesh, segments, options)?
    };
    #[cfg(not(feature = "parallel"))]
    let system = assemble_sequential(mesh, segments, options)?;

    if system.matrix.iter().chain(system.rhs.iter()).any(|v| !v.is_finite()) {
        return Err(FemError::NonFinite("global assembly"));
    }

    log::debug!(
        "Assembled {} DOFs from {} elements ({:?}, {} workers) in {:.1}ms",
        system.dim(),
        mesh.num_elements(),
        options.strategy,
        if options.parallel { worker_count() } else { 1 },
        start.elapsed().as_secs_f64() * 1000.0
    );
    Ok(system)
}

/// Assemble only the stiffness matrix
pub fn assemble_stiffness(mesh: &Mesh, options: &AssemblyOptions) -> Result<Array2<f64>> {
    assemble_system(mesh, &[], options).map(|s| s.matrix)
}

/// Assemble only the load vector
///
/// Element loads are cheap compared to stiffness, so this runs sequentially.
pub fn assemble_load(
    mesh: &Mesh,
    segments: &[CurrentSegment],
    options: &AssemblyOptions,
) -> Result<Array1<f64>> {
    let mut rhs = Array1::zeros(mesh.dof_count());
    for element in mesh.elements() {
        let load = element_load(&element.bounds, segments, options.containment_eps);
        for (&g, &value) in element.edges.iter().zip(load.iter()) {
            rhs[g] += value;
        }
    }
    if rhs.iter().any(|v: &f64| !v.is_finite()) {
        return Err(FemError::NonFinite("load assembly"));
    }
    Ok(rhs)
}

fn assemble_sequential(
    mesh: &Mesh,
    segments: &[CurrentSegment],
    options: &AssemblyOptions,
) -> Result<GlobalSystem> {
    let mut system = GlobalSystem::zeros(mesh.dof_count());
    for e in 0..mesh.num_elements() {
        let local = local_system(mesh, e, segments, options)?;
        scatter(&mut system, &local);
    }
    Ok(system)
}

#[cfg(feature = "parallel")]
fn assemble_ordered(
    mesh: &Mesh,
    segments: &[CurrentSegment],
    options: &AssemblyOptions,
) -> Result<GlobalSystem> {
    let locals = (0..mesh.num_elements())
        .into_par_iter()
        .map(|e| local_system(mesh, e, segments, options))
        .collect::<Result<Vec<_>>>()?;

    let mut system = GlobalSystem::zeros(mesh.dof_count());
    for local in &locals {
        scatter(&mut system, local);
    }
    Ok(system)
}

#[cfg(feature = "parallel")]
fn assemble_locked(
    mesh: &Mesh,
    segments: &[CurrentSegment],
    options: &AssemblyOptions,
) -> Result<GlobalSystem> {
    let mut system = GlobalSystem::zeros(mesh.dof_count());
    {
        // One lock per global DOF, guarding its matrix row and RHS entry
        let rows: Vec<Mutex<_>> = system
            .matrix
            .rows_mut()
            .into_iter()
            .zip(system.rhs.iter_mut())
            .map(Mutex::new)
            .collect();

        (0..mesh.num_elements())
            .into_par_iter()
            .try_for_each(|e| -> Result<()> {
                let local = local_system(mesh, e, segments, options)?;
                for (i, &gi) in local.dofs.iter().enumerate() {
                    let mut guard = rows[gi].lock().unwrap_or_else(PoisonError::into_inner);
                    let (row, rhs) = &mut *guard;
                    **rhs += local.load[i];
                    for (j, &gj) in local.dofs.iter().enumerate() {
                        row[gj] += local.matrix[i][j];
                    }
                }
                Ok(())
            })?;
    }
    Ok(system)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{AxisSplitting, Point3D, StructuredMeshBuilder, Vector3D};

    fn cube_mesh(cells: usize) -> Mesh {
        let axis = AxisSplitting::uniform(-1.0, 1.0, cells);
        StructuredMeshBuilder::new(axis.clone(), axis.clone(), axis)
            .build()
            .unwrap()
    }

    fn segment_at(center: Point3D) -> CurrentSegment {
        CurrentSegment {
            center,
            direction: Vector3D::new(0.0, 1.0, 0.0),
            current: 1.0,
        }
    }

    #[test]
    fn test_single_element_matches_local_matrix() {
        let mesh = cube_mesh(1);
        let options = AssemblyOptions::default();
        let system = assemble_system(&mesh, &[], &options).unwrap();

        let element = &mesh.elements()[0];
        let local = element_stiffness(0, &element.bounds, 1.0, options.rule, options.curl_scheme).unwrap();
        for i in 0..EDGES_PER_ELEMENT {
            for j in 0..EDGES_PER_ELEMENT {
                let gi = element.edges[i];
                let gj = element.edges[j];
                assert_eq!(system.matrix[[gi, gj]], local[i][j]);
            }
        }
    }

    #[test]
    fn test_strategies_agree() {
        let mesh = cube_mesh(3);
        let segments = [segment_at(Point3D::new(0.1, 0.0, 0.2))];
        let base = AssemblyOptions::default();

        let locked = assemble_system(&mesh, &segments, &base).unwrap();
        let ordered = assemble_system(
            &mesh,
            &segments,
            &AssemblyOptions {
                strategy: AssemblyStrategy::Ordered,
                ..base
            },
        )
        .unwrap();
        let sequential = assemble_system(
            &mesh,
            &segments,
            &AssemblyOptions {
                parallel: false,
                ..base
            },
        )
        .unwrap();

        for (a, b) in locked.matrix.iter().zip(sequential.matrix.iter()) {
            assert!((a - b).abs() <= 1e-12 * (1.0 + b.abs()));
        }
        assert_eq!(ordered.matrix, sequential.matrix);
        assert_eq!(ordered.rhs, sequential.rhs);
    }

    #[test]
    fn test_global_matrix_is_symmetric() {
        let mesh = cube_mesh(2);
        let k = assemble_stiffness(&mesh, &AssemblyOptions::default()).unwrap();
        let n = mesh.dof_count();
        for i in 0..n {
            for j in 0..n {
                assert!((k[[i, j]] - k[[j, i]]).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_load_matches_system_rhs() {
        let mesh = cube_mesh(2);
        // On the shared face x = 0 the segment loads both neighbours
        let segments = [
            segment_at(Point3D::new(0.0, 0.3, -0.4)),
            segment_at(Point3D::new(0.5, -0.5, 0.5)),
        ];
        let options = AssemblyOptions::default();
        let system = assemble_system(&mesh, &segments, &options).unwrap();
        let load = assemble_load(&mesh, &segments, &options).unwrap();
        for (a, b) in system.rhs.iter().zip(load.iter()) {
            assert!((a - b).abs() < 1e-14);
        }
        assert!(load.iter().any(|&v| v != 0.0));
    }

    #[test]
    fn test_invalid_mu_propagates() {
        let mut mesh = cube_mesh(2);
        mesh.set_mu(5, f64::NAN).unwrap();
        assert!(matches!(
            assemble_system(&mesh, &[], &AssemblyOptions::default()),
            Err(FemError::InvalidPermeability { element: 5, .. })
        ));
    }
}
