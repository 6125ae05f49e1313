//! Magnetic field reconstruction from edge DOFs
//!
//! Inside element `e` the field is the curl of the edge expansion:
//!
//! ```text
//! B(p) = Σ_{i=0..11} q[edge_e(i)] (∇×w_i)(p)
//! ```
//!
//! optionally divided by `μ_e` to obtain H.

use crate::basis::{CurlScheme, curls_at};
use crate::error::{FemError, Result};
use crate::mesh::{Mesh, Point3D, Vector3D};
use crate::sensor::{FieldSample, Sensor};
use math_magneto_solvers::parallel::try_parallel_map_indexed;
use ndarray::Array1;

/// Options controlling field evaluation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldOptions {
    pub curl_scheme: CurlScheme,
    pub containment_eps: f64,
    pub normalize_by_mu: bool,
    pub parallel: bool,
}

/// Field at `point` using the expansion of element `element`
pub fn field_in_element(
    mesh: &Mesh,
    dofs: &Array1<f64>,
    element: usize,
    point: &Point3D,
    scheme: CurlScheme,
    normalize_by_mu: bool,
) -> Result<Vector3D> {
    if dofs.len() != mesh.dof_count() {
        return Err(FemError::DimensionMismatch {
            context: "DOF vector",
            expected: mesh.dof_count(),
            got: dofs.len(),
        });
    }
    let cell = mesh.element(element)?;
    let curls = curls_at(&cell.bounds, point, scheme);

    let mut field = cell
        .edges
        .iter()
        .zip(curls.iter())
        .fold(Vector3D::zero(), |acc, (&g, curl)| acc + *curl * dofs[g]);

    if normalize_by_mu {
        let mu = mesh.mu(element)?;
        if mu == 0.0 || !mu.is_finite() {
            return Err(FemError::InvalidPermeability { element, mu });
        }
        field = field * (1.0 / mu);
    }
    Ok(field)
}

/// Containing element of every sensor; fails on the first sensor outside the mesh
pub fn locate_sensors(mesh: &Mesh, sensors: &[Sensor], eps: f64) -> Result<Vec<usize>> {
    sensors
        .iter()
        .enumerate()
        .map(|(index, s)| {
            mesh.find_element(&s.position, eps)
                .ok_or(FemError::SensorOutsideMesh {
                    index,
                    position: s.position,
                })
        })
        .collect()
}

/// Field samples at all sensors
pub fn evaluate_sensors(
    mesh: &Mesh,
    dofs: &Array1<f64>,
    sensors: &[Sensor],
    options: &FieldOptions,
) -> Result<Vec<FieldSample>> {
    let cells = locate_sensors(mesh, sensors, options.containment_eps)?;
    let sample = |i: usize| -> Result<FieldSample> {
        let position = sensors[i].position;
        let field = field_in_element(
            mesh,
            dofs,
            cells[i],
            &position,
            options.curl_scheme,
            options.normalize_by_mu,
        )?;
        Ok(FieldSample::new(position, field))
    };

    if options.parallel {
        try_parallel_map_indexed(sensors.len(), sample)
    } else {
        (0..sensors.len()).map(sample).collect()
    }
}

/// Secondary field: `total − primary`, sample by sample
pub fn subtract_primary(total: &[FieldSample], primary: &[FieldSample]) -> Result<Vec<FieldSample>> {
    if total.len() != primary.len() {
        return Err(FemError::DimensionMismatch {
            context: "primary field",
            expected: total.len(),
            got: primary.len(),
        });
    }
    Ok(total
        .iter()
        .zip(primary.iter())
        .map(|(t, p)| t.secondary(p))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{AxisSplitting, StructuredMeshBuilder};
    use crate::sensor::SensorComponent;
    use approx::assert_abs_diff_eq;

    fn mesh() -> Mesh {
        let axis = AxisSplitting::uniform(0.0, 2.0, 2);
        StructuredMeshBuilder::new(axis.clone(), axis.clone(), axis)
            .background_mu(2.0)
            .build()
            .unwrap()
    }

    #[test]
    fn test_gradient_dofs_give_zero_field() {
        // q = 1 on X edges of unit length represents e_x, whose curl is zero
        let mesh = mesh();
        let mut dofs = Array1::zeros(mesh.dof_count());
        for e in mesh.elements() {
            for &g in &e.edges[..4] {
                dofs[g] = 1.0;
            }
        }
        let options = FieldOptions {
            curl_scheme: CurlScheme::Analytic,
            containment_eps: 1e-8,
            normalize_by_mu: false,
            parallel: true,
        };
        let sensors = [Sensor::new(Point3D::new(0.3, 1.2, 1.7), SensorComponent::Bz)];
        let samples = evaluate_sensors(&mesh, &dofs, &sensors, &options).unwrap();
        assert_abs_diff_eq!(samples[0].magnitude(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_normalize_by_mu() {
        let mesh = mesh();
        let dofs = Array1::from_iter((0..mesh.dof_count()).map(|i| (i as f64 * 0.37).sin()));
        let p = Point3D::new(0.5, 0.5, 0.5);
        let b = field_in_element(&mesh, &dofs, 0, &p, CurlScheme::Analytic, false).unwrap();
        let h = field_in_element(&mesh, &dofs, 0, &p, CurlScheme::Analytic, true).unwrap();
        assert_abs_diff_eq!((b * 0.5 - h).norm(), 0.0, epsilon = 1e-14);
        assert!(b.norm() > 0.0);
    }

    #[test]
    fn test_sensor_outside_mesh_fails() {
        let mesh = mesh();
        let sensors = [
            Sensor::new(Point3D::new(1.0, 1.0, 1.0), SensorComponent::Bz),
            Sensor::new(Point3D::new(1.0, 1.0, 5.0), SensorComponent::Bz),
        ];
        assert!(matches!(
            locate_sensors(&mesh, &sensors, 1e-8),
            Err(FemError::SensorOutsideMesh { index: 1, .. })
        ));
    }

    #[test]
    fn test_wrong_dof_length() {
        let mesh = mesh();
        let dofs = Array1::zeros(3);
        assert!(matches!(
            field_in_element(&mesh, &dofs, 0, &Point3D::origin(), CurlScheme::Analytic, false),
            Err(FemError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_subtract_primary_length_mismatch() {
        let s = FieldSample::new(Point3D::origin(), Vector3D::new(1.0, 2.0, 3.0));
        assert!(subtract_primary(&[s, s], &[s]).is_err());
        let diff = subtract_primary(&[s], &[s]).unwrap();
        assert_eq!(diff[0].magnitude(), 0.0);
    }
}
