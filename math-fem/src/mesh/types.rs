//! Geometric primitives and topological records for hexahedral meshes
//!
//! Points and vectors are kept as distinct types: a position minus a position
//! is a displacement, and only displacements are scaled or normalized.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Neg, Sub};

/// Cartesian axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Position of the axis in `(x, y, z)` order
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    /// The two axes orthogonal to this one, in ascending order
    pub fn transverse(self) -> (Axis, Axis) {
        match self {
            Axis::X => (Axis::Y, Axis::Z),
            Axis::Y => (Axis::X, Axis::Z),
            Axis::Z => (Axis::X, Axis::Y),
        }
    }
}

/// 3D point in space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3D {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3D {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn origin() -> Self {
        Self::default()
    }

    /// Coordinate along `axis`
    pub fn coord(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    /// Copy of the point with the coordinate along `axis` replaced
    pub fn with_coord(mut self, axis: Axis, value: f64) -> Self {
        match axis {
            Axis::X => self.x = value,
            Axis::Y => self.y = value,
            Axis::Z => self.z = value,
        }
        self
    }

    pub fn distance_to(&self, other: &Point3D) -> f64 {
        (*other - *self).norm()
    }

    pub fn midpoint(&self, other: &Point3D) -> Point3D {
        Point3D::new(
            0.5 * (self.x + other.x),
            0.5 * (self.y + other.y),
            0.5 * (self.z + other.z),
        )
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl fmt::Display for Point3D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

impl From<(f64, f64, f64)> for Point3D {
    fn from(p: (f64, f64, f64)) -> Self {
        Point3D::new(p.0, p.1, p.2)
    }
}

/// Displacement or field vector
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector3D {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3D {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    /// Unit vector along `axis`
    pub fn unit(axis: Axis) -> Self {
        Self::zero().with_component(axis, 1.0)
    }

    pub fn component(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    pub fn with_component(mut self, axis: Axis, value: f64) -> Self {
        match axis {
            Axis::X => self.x = value,
            Axis::Y => self.y = value,
            Axis::Z => self.z = value,
        }
        self
    }

    pub fn dot(&self, other: &Vector3D) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(&self, other: &Vector3D) -> Vector3D {
        Vector3D::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    pub fn norm(&self) -> f64 {
        self.dot(self).sqrt()
    }

    /// Unit vector in the same direction, `None` for a (near) zero vector
    pub fn normalize(&self) -> Option<Vector3D> {
        let len = self.norm();
        if len > 1e-300 && len.is_finite() {
            Some(*self * (1.0 / len))
        } else {
            None
        }
    }

    pub fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

impl Add for Vector3D {
    type Output = Vector3D;
    fn add(self, rhs: Vector3D) -> Vector3D {
        Vector3D::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for Vector3D {
    fn add_assign(&mut self, rhs: Vector3D) {
        self.x += rhs.x;
        self.y += rhs.y;
        self.z += rhs.z;
    }
}

impl Sub for Vector3D {
    type Output = Vector3D;
    fn sub(self, rhs: Vector3D) -> Vector3D {
        Vector3D::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Neg for Vector3D {
    type Output = Vector3D;
    fn neg(self) -> Vector3D {
        Vector3D::new(-self.x, -self.y, -self.z)
    }
}

impl Mul<f64> for Vector3D {
    type Output = Vector3D;
    fn mul(self, s: f64) -> Vector3D {
        Vector3D::new(self.x * s, self.y * s, self.z * s)
    }
}

impl Sub for Point3D {
    type Output = Vector3D;
    fn sub(self, rhs: Point3D) -> Vector3D {
        Vector3D::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Add<Vector3D> for Point3D {
    type Output = Point3D;
    fn add(self, v: Vector3D) -> Point3D {
        Point3D::new(self.x + v.x, self.y + v.y, self.z + v.z)
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Point3D,
    pub max: Point3D,
}

impl Aabb {
    pub fn new(min: Point3D, max: Point3D) -> Self {
        Self { min, max }
    }

    /// Smallest box containing all `points`, `None` if there are none
    pub fn from_points<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Point3D>,
    {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        let mut bounds = Aabb::new(first, first);
        for p in iter {
            bounds.min = Point3D::new(
                bounds.min.x.min(p.x),
                bounds.min.y.min(p.y),
                bounds.min.z.min(p.z),
            );
            bounds.max = Point3D::new(
                bounds.max.x.max(p.x),
                bounds.max.y.max(p.y),
                bounds.max.z.max(p.z),
            );
        }
        Some(bounds)
    }

    pub fn lower(&self, axis: Axis) -> f64 {
        self.min.coord(axis)
    }

    pub fn upper(&self, axis: Axis) -> f64 {
        self.max.coord(axis)
    }

    pub fn extent(&self, axis: Axis) -> f64 {
        self.upper(axis) - self.lower(axis)
    }

    pub fn extents(&self) -> [f64; 3] {
        Axis::ALL.map(|a| self.extent(a))
    }

    pub fn center(&self) -> Point3D {
        self.min.midpoint(&self.max)
    }

    pub fn volume(&self) -> f64 {
        self.extent(Axis::X) * self.extent(Axis::Y) * self.extent(Axis::Z)
    }

    /// Inclusive containment test, widened by `eps` on every face
    pub fn contains(&self, p: &Point3D, eps: f64) -> bool {
        Axis::ALL.iter().all(|&a| {
            let c = p.coord(a);
            c >= self.lower(a) - eps && c <= self.upper(a) + eps
        })
    }

    /// Whether `p` lies on any of the six faces (within `eps`)
    pub fn on_boundary(&self, p: &Point3D, eps: f64) -> bool {
        Axis::ALL.iter().any(|&a| {
            let c = p.coord(a);
            (c - self.lower(a)).abs() <= eps || (c - self.upper(a)).abs() <= eps
        })
    }
}

/// Mesh node: a position with a dense global index
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub index: usize,
    pub position: Point3D,
}

/// Mesh edge; its index is the global degree of freedom
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub index: usize,
    pub nodes: [usize; 2],
}

/// Number of edges of a hexahedron, and local basis functions per element
pub const EDGES_PER_ELEMENT: usize = 12;

/// Axis-aligned hexahedral cell
///
/// `edges` holds global edge indices in canonical local order: four X edges,
/// four Y edges, four Z edges. Within a group, bit 0 of the local position
/// selects the upper bound of the first transverse axis and bit 1 the upper
/// bound of the second.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub edges: [usize; EDGES_PER_ELEMENT],
    pub bounds: Aabb,
    pub volume: f64,
}

impl Element {
    pub fn center(&self) -> Point3D {
        self.bounds.center()
    }

    /// Global degree of freedom of local edge `local`
    pub fn dof(&self, local: usize) -> Option<usize> {
        self.edges.get(local).copied()
    }
}
