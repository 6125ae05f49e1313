//! Dirichlet (essential) boundary conditions
//!
//! Implements `q_i = 0` on boundary edges by row/column elimination:
//!
//! - Set `A[i, :] = 0` and `A[:, i] = 0`
//! - Set `A[i, i] = 1`
//! - Set `b[i] = 0`
//!
//! Zeroing the column is consistent with the homogeneous value, so no RHS
//! correction is needed and the matrix stays symmetric. Applying the
//! condition twice leaves the system unchanged.

use crate::assembly::GlobalSystem;
use crate::error::{FemError, Result};
use crate::mesh::Mesh;
use ndarray::{Array1, Array2};

/// Global DOFs pinned by the homogeneous boundary condition
pub fn boundary_dofs(mesh: &Mesh, eps: f64) -> Vec<usize> {
    mesh.boundary_edges(eps)
}

/// Eliminate `dofs` from `matrix` and `rhs`
pub fn apply_dirichlet(matrix: &mut Array2<f64>, rhs: &mut Array1<f64>, dofs: &[usize]) -> Result<()> {
    let n = rhs.len();
    if matrix.nrows() != n || matrix.ncols() != n {
        return Err(FemError::DimensionMismatch {
            context: "boundary conditions",
            expected: n,
            got: if matrix.nrows() != n { matrix.nrows() } else { matrix.ncols() },
        });
    }
    if let Some(&bad) = dofs.iter().find(|&&d| d >= n) {
        return Err(FemError::DimensionMismatch {
            context: "boundary DOF index",
            expected: n,
            got: bad,
        });
    }

    for &d in dofs {
        matrix.row_mut(d).fill(0.0);
        matrix.column_mut(d).fill(0.0);
        matrix[[d, d]] = 1.0;
    }
    apply_dirichlet_rhs(rhs, dofs);
    Ok(())
}

/// Zero the RHS entries of `dofs` (for systems whose matrix is already reduced)
pub fn apply_dirichlet_rhs(rhs: &mut Array1<f64>, dofs: &[usize]) {
    for &d in dofs {
        if let Some(v) = rhs.get_mut(d) {
            *v = 0.0;
        }
    }
}

/// Pin every boundary edge of `mesh` in `system`, returning the pinned DOFs
pub fn apply_homogeneous_dirichlet(system: &mut GlobalSystem, mesh: &Mesh, eps: f64) -> Result<Vec<usize>> {
    let dofs = boundary_dofs(mesh, eps);
    apply_dirichlet(&mut system.matrix, &mut system.rhs, &dofs)?;
    log::debug!("Dirichlet: pinned {} of {} DOFs", dofs.len(), system.dim());
    Ok(dofs)
}
