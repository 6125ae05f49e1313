//! Eight-point integration rules on axis-aligned hexahedra

use crate::mesh::{Aabb, Axis, Point3D};
use serde::{Deserialize, Serialize};

/// Number of integration points per element
pub const POINTS_PER_ELEMENT: usize = 8;

/// Integration point in physical coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntegrationPoint {
    pub position: Point3D,
    pub weight: f64,
}

/// Placement of the integration points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationRule {
    /// `{min, center}` along each axis
    #[default]
    CornerMidpoint,
    /// Centres of the eight half-size sub-cells: `min + L/4`, `min + 3L/4`
    SubcellMidpoint,
}

impl IntegrationRule {
    /// Offsets along one axis, as fractions of the element extent
    fn fractions(self) -> [f64; 2] {
        match self {
            IntegrationRule::CornerMidpoint => [0.0, 0.5],
            IntegrationRule::SubcellMidpoint => [0.25, 0.75],
        }
    }

    /// Integration points for an element with the given bounds
    pub fn points(self, bounds: &Aabb) -> [IntegrationPoint; POINTS_PER_ELEMENT] {
        let f = self.fractions();
        let weight = bounds.volume() / POINTS_PER_ELEMENT as f64;
        let at = |axis: Axis, bit: usize| bounds.lower(axis) + f[bit] * bounds.extent(axis);

        std::array::from_fn(|q| IntegrationPoint {
            position: Point3D::new(
                at(Axis::X, q & 1),
                at(Axis::Y, (q >> 1) & 1),
                at(Axis::Z, (q >> 2) & 1),
            ),
            weight,
        })
    }
}
