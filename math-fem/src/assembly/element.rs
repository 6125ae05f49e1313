//! Element-level curl-curl stiffness and source load
//!
//! ```text
//! K_ij = Σ_q (1/μ) (∇×w_i)(x_q) · (∇×w_j)(x_q) ω_q
//! f_i  = Σ_s I_s d_s · w_i(c_s)     over segments s with c_s inside the element
//! ```

use crate::basis::{CurlScheme, EDGE_BASIS, check_bounds, curls_at};
use crate::error::{FemError, Result};
use crate::mesh::{Aabb, EDGES_PER_ELEMENT};
use crate::quadrature::IntegrationRule;
use crate::source::CurrentSegment;

/// Dense 12×12 element matrix
pub type LocalMatrix = [[f64; EDGES_PER_ELEMENT]; EDGES_PER_ELEMENT];

/// Element load vector
pub type LocalVector = [f64; EDGES_PER_ELEMENT];

/// Local stiffness matrix of one element
///
/// Only the upper triangle is integrated; the lower one is mirrored, so the
/// result is exactly symmetric.
pub fn element_stiffness(
    element: usize,
    bounds: &Aabb,
    mu: f64,
    rule: IntegrationRule,
    scheme: CurlScheme,
) -> Result<LocalMatrix> {
    check_bounds(bounds).map_err(|_| FemError::DegenerateElement {
        element,
        volume: bounds.volume(),
    })?;
    if mu == 0.0 || !mu.is_finite() {
        return Err(FemError::InvalidPermeability { element, mu });
    }
    let nu = 1.0 / mu;

    let mut k = [[0.0; EDGES_PER_ELEMENT]; EDGES_PER_ELEMENT];
    for qp in rule.points(bounds) {
        let curls = curls_at(bounds, &qp.position, scheme);
        let scale = nu * qp.weight;
        for i in 0..EDGES_PER_ELEMENT {
            for j in i..EDGES_PER_ELEMENT {
                k[i][j] += scale * curls[i].dot(&curls[j]);
            }
        }
    }

    for i in 0..EDGES_PER_ELEMENT {
        for j in 0..i {
            k[i][j] = k[j][i];
        }
    }
    Ok(k)
}

/// Local load vector from the segments whose centre lies in the element
///
/// Containment is inclusive and widened by `eps`, so a segment on a shared
/// face loads every element touching it.
pub fn element_load(bounds: &Aabb, segments: &[CurrentSegment], eps: f64) -> LocalVector {
    let mut f = [0.0; EDGES_PER_ELEMENT];
    for segment in segments.iter().filter(|s| bounds.contains(&s.center, eps)) {
        let current = segment.current_vector();
        for (fi, basis) in f.iter_mut().zip(EDGE_BASIS.iter()) {
            *fi += current.dot(&basis.value(bounds, &segment.center));
        }
    }
    f
}
