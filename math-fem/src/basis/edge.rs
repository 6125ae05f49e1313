//! Edge basis functions on axis-aligned hexahedra
//!
//! Local edge `k` (0-based) is tangent to axis `k / 4`. Its basis function is
//!
//! ```text
//! w_k(p) = e_axis · r1(p_t1) · r2(p_t2)
//! ```
//!
//! where `(t1, t2)` are the transverse axes and each ramp is either
//! `minus(a, b, p) = (b - p) / (b - a)` or `plus(a, b, p) = (p - a) / (b - a)`
//! over the element extent `[a, b]`. Bit 0 of `k % 4` selects `plus` for the
//! first ramp, bit 1 for the second, matching the canonical edge order of
//! [`Element`](crate::mesh::Element).

use crate::error::{FemError, Result};
use crate::mesh::{Aabb, Axis, EDGES_PER_ELEMENT, Point3D, Vector3D};
use serde::{Deserialize, Serialize};

/// One-dimensional linear ramp over an interval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ramp {
    /// 1 at the lower bound, 0 at the upper bound
    Minus,
    /// 0 at the lower bound, 1 at the upper bound
    Plus,
}

impl Ramp {
    pub fn eval(self, a: f64, b: f64, p: f64) -> f64 {
        match self {
            Ramp::Minus => (b - p) / (b - a),
            Ramp::Plus => (p - a) / (b - a),
        }
    }

    pub fn slope(self, a: f64, b: f64) -> f64 {
        match self {
            Ramp::Minus => -1.0 / (b - a),
            Ramp::Plus => 1.0 / (b - a),
        }
    }
}

/// Tangent axis and transverse ramps of one local basis function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeBasis {
    pub axis: Axis,
    pub first: Ramp,
    pub second: Ramp,
}

const fn edge(axis: Axis, first: Ramp, second: Ramp) -> EdgeBasis {
    EdgeBasis {
        axis,
        first,
        second,
    }
}

/// Local edge number to basis function
pub const EDGE_BASIS: [EdgeBasis; EDGES_PER_ELEMENT] = {
    use Axis::{X, Y, Z};
    use Ramp::{Minus, Plus};
    [
        edge(X, Minus, Minus),
        edge(X, Plus, Minus),
        edge(X, Minus, Plus),
        edge(X, Plus, Plus),
        edge(Y, Minus, Minus),
        edge(Y, Plus, Minus),
        edge(Y, Minus, Plus),
        edge(Y, Plus, Plus),
        edge(Z, Minus, Minus),
        edge(Z, Plus, Minus),
        edge(Z, Minus, Plus),
        edge(Z, Plus, Plus),
    ]
};

impl EdgeBasis {
    /// Basis function of local edge `local`
    pub fn for_local_edge(local: usize) -> Result<&'static EdgeBasis> {
        EDGE_BASIS
            .get(local)
            .ok_or(FemError::LocalEdgeOutOfRange(local))
    }

    pub fn transverse(&self) -> (Axis, Axis) {
        self.axis.transverse()
    }

    /// Value at `p`; only the `axis` component is non-zero
    pub fn value(&self, bounds: &Aabb, p: &Point3D) -> Vector3D {
        let (t1, t2) = self.transverse();
        let r1 = self.first.eval(bounds.lower(t1), bounds.upper(t1), p.coord(t1));
        let r2 = self.second.eval(bounds.lower(t2), bounds.upper(t2), p.coord(t2));
        Vector3D::unit(self.axis) * (r1 * r2)
    }

    /// Closed-form curl at `p`
    ///
    /// For `w = φ e_a`, `∇ × w = ∇φ × e_a` with `∇φ` living in the
    /// transverse plane.
    pub fn curl(&self, bounds: &Aabb, p: &Point3D) -> Vector3D {
        let (t1, t2) = self.transverse();
        let (a1, b1) = (bounds.lower(t1), bounds.upper(t1));
        let (a2, b2) = (bounds.lower(t2), bounds.upper(t2));
        let r1 = self.first.eval(a1, b1, p.coord(t1));
        let r2 = self.second.eval(a2, b2, p.coord(t2));

        let grad = Vector3D::zero()
            .with_component(t1, self.first.slope(a1, b1) * r2)
            .with_component(t2, r1 * self.second.slope(a2, b2));
        grad.cross(&Vector3D::unit(self.axis))
    }

    /// Midpoint of the hexahedron edge this basis function belongs to
    pub fn edge_midpoint(&self, bounds: &Aabb) -> Point3D {
        let (t1, t2) = self.transverse();
        let side = |ramp: Ramp, t: Axis| match ramp {
            Ramp::Minus => bounds.lower(t),
            Ramp::Plus => bounds.upper(t),
        };
        bounds
            .center()
            .with_coord(t1, side(self.first, t1))
            .with_coord(t2, side(self.second, t2))
    }

    /// Midpoint of the parallel edge diagonally opposite in the element
    pub fn opposite_edge_midpoint(&self, bounds: &Aabb) -> Point3D {
        let flip = |r: Ramp| match r {
            Ramp::Minus => Ramp::Plus,
            Ramp::Plus => Ramp::Minus,
        };
        edge(self.axis, flip(self.first), flip(self.second)).edge_midpoint(bounds)
    }
}

/// How the curl of a basis function is evaluated
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum CurlScheme {
    /// Closed-form derivative of the ramps
    #[default]
    Analytic,
    /// Symmetric difference of the basis values; `step` is relative to the
    /// element extent along the differentiated axis
    CentralDifference { step: f64 },
}

/// Reject boxes on which the ramps would divide by zero
pub fn check_bounds(bounds: &Aabb) -> Result<()> {
    let extent = bounds.extents();
    if extent.iter().all(|&e| e.is_finite() && e > 0.0) {
        Ok(())
    } else {
        Err(FemError::DegenerateBounds { extent })
    }
}

/// Value of local basis function `local` at `p`
pub fn basis_value(bounds: &Aabb, local: usize, p: &Point3D) -> Result<Vector3D> {
    let basis = EdgeBasis::for_local_edge(local)?;
    check_bounds(bounds)?;
    Ok(basis.value(bounds, p))
}

/// Curl of local basis function `local` at `p`
pub fn basis_curl(bounds: &Aabb, local: usize, p: &Point3D, scheme: CurlScheme) -> Result<Vector3D> {
    let basis = EdgeBasis::for_local_edge(local)?;
    check_bounds(bounds)?;
    Ok(curl_with(basis, bounds, p, scheme))
}

/// Curls of all 12 local basis functions at `p`
///
/// Callers are expected to have validated `bounds`.
pub fn curls_at(bounds: &Aabb, p: &Point3D, scheme: CurlScheme) -> [Vector3D; EDGES_PER_ELEMENT] {
    std::array::from_fn(|k| curl_with(&EDGE_BASIS[k], bounds, p, scheme))
}

fn curl_with(basis: &EdgeBasis, bounds: &Aabb, p: &Point3D, scheme: CurlScheme) -> Vector3D {
    match scheme {
        CurlScheme::Analytic => basis.curl(bounds, p),
        CurlScheme::CentralDifference { step } => central_difference_curl(basis, bounds, p, step),
    }
}

fn central_difference_curl(basis: &EdgeBasis, bounds: &Aabb, p: &Point3D, step: f64) -> Vector3D {
    // d[a][b] = ∂w_a / ∂x_b
    let mut d = [[0.0; 3]; 3];
    for axis in Axis::ALL {
        let h = step * bounds.extent(axis);
        let c = p.coord(axis);
        let forward = basis.value(bounds, &p.with_coord(axis, c + h));
        let backward = basis.value(bounds, &p.with_coord(axis, c - h));
        let diff = (forward - backward) * (0.5 / h);
        for component in Axis::ALL {
            d[component.index()][axis.index()] = diff.component(component);
        }
    }
    Vector3D::new(d[2][1] - d[1][2], d[0][2] - d[2][0], d[1][0] - d[0][1])
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn stretched_box() -> Aabb {
        Aabb::new(Point3D::new(-1.0, 2.0, 0.5), Point3D::new(3.0, 2.5, 4.0))
    }

    #[test]
    fn test_single_nonzero_component() {
        let b = stretched_box();
        let p = Point3D::new(0.3, 2.2, 1.1);
        for k in 0..EDGES_PER_ELEMENT {
            let v = basis_value(&b, k, &p).unwrap();
            let axis = EDGE_BASIS[k].axis;
            for other in Axis::ALL.into_iter().filter(|&a| a != axis) {
                assert_eq!(v.component(other), 0.0, "edge {k}");
            }
        }
    }

    #[test]
    fn test_unit_on_own_edge_zero_on_opposite() {
        let b = stretched_box();
        for (k, basis) in EDGE_BASIS.iter().enumerate() {
            let own = basis.value(&b, &basis.edge_midpoint(&b));
            let opposite = basis.value(&b, &basis.opposite_edge_midpoint(&b));
            assert_abs_diff_eq!(own.component(basis.axis), 1.0, epsilon = 1e-9);
            assert_abs_diff_eq!(opposite.component(basis.axis), 0.0, epsilon = 1e-9);
            assert!(own.norm() > 0.0, "edge {k}");
        }
    }

    #[test]
    fn test_vanishes_on_other_parallel_edges() {
        let b = stretched_box();
        for (k, basis) in EDGE_BASIS.iter().enumerate() {
            for (j, other) in EDGE_BASIS.iter().enumerate() {
                if other.axis != basis.axis || j == k {
                    continue;
                }
                let v = basis.value(&b, &other.edge_midpoint(&b));
                assert_abs_diff_eq!(v.norm(), 0.0, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_analytic_curl_matches_central_difference() {
        let b = stretched_box();
        let scheme = CurlScheme::CentralDifference { step: 1e-2 };
        for p in [
            Point3D::new(0.0, 2.1, 1.0),
            Point3D::new(2.9, 2.45, 3.9),
            b.center(),
        ] {
            for k in 0..EDGES_PER_ELEMENT {
                let analytic = basis_curl(&b, k, &p, CurlScheme::Analytic).unwrap();
                let numeric = basis_curl(&b, k, &p, scheme).unwrap();
                assert_abs_diff_eq!((analytic - numeric).norm(), 0.0, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_curl_of_x_edge() {
        // Unit cube, edge 0: w = (1 - y)(1 - z) e_x
        let b = Aabb::new(Point3D::origin(), Point3D::new(1.0, 1.0, 1.0));
        let p = Point3D::new(0.5, 0.25, 0.75);
        let c = basis_curl(&b, 0, &p, CurlScheme::Analytic).unwrap();
        // curl = (0, ∂w_x/∂z, -∂w_x/∂y) = (0, -(1 - y), (1 - z))
        assert_abs_diff_eq!(c.x, 0.0, epsilon = 1e-15);
        assert_abs_diff_eq!(c.y, -0.75, epsilon = 1e-15);
        assert_abs_diff_eq!(c.z, 0.25, epsilon = 1e-15);
    }

    #[test]
    fn test_out_of_range_edge() {
        let b = stretched_box();
        assert!(matches!(
            basis_value(&b, 12, &b.center()),
            Err(FemError::LocalEdgeOutOfRange(12))
        ));
        assert!(basis_curl(&b, 99, &b.center(), CurlScheme::Analytic).is_err());
    }

    #[test]
    fn test_degenerate_bounds() {
        let flat = Aabb::new(Point3D::origin(), Point3D::new(1.0, 1.0, 0.0));
        assert!(matches!(
            basis_value(&flat, 0, &Point3D::origin()),
            Err(FemError::DegenerateBounds { .. })
        ));
    }
}
