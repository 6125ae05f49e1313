//! Current sources and their discretisation into segments
//!
//! The assembler only sees [`CurrentSegment`]s. Line and loop sources are
//! split into equal segments whose midpoints carry the source current.

use crate::error::{FemError, Result};
use crate::mesh::{Point3D, Vector3D};
use serde::{Deserialize, Serialize};

/// Discrete current element: midpoint, unit direction and current
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurrentSegment {
    pub center: Point3D,
    pub direction: Vector3D,
    pub current: f64,
}

impl CurrentSegment {
    /// Current density vector `I · d`
    pub fn current_vector(&self) -> Vector3D {
        self.direction * self.current
    }
}

/// Straight wire from `start` to `end`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineSource {
    pub start: Point3D,
    pub end: Point3D,
    pub current: f64,
    #[serde(default = "default_segments")]
    pub segments: usize,
}

fn default_segments() -> usize {
    1
}

impl LineSource {
    pub fn new(start: Point3D, end: Point3D, current: f64, segments: usize) -> Self {
        Self {
            start,
            end,
            current,
            segments,
        }
    }

    /// Split into `segments` equal pieces, dividing the current between them
    pub fn discretize(&self) -> Result<Vec<CurrentSegment>> {
        if self.segments == 0 {
            return Err(FemError::InvalidSource(
                "line source needs at least one segment".to_string(),
            ));
        }
        let span = self.end - self.start;
        let direction = span.normalize().ok_or_else(|| {
            FemError::InvalidSource(format!(
                "line source from {} to {} has zero length",
                self.start, self.end
            ))
        })?;

        let n = self.segments as f64;
        let step = span * (1.0 / n);
        let current = self.current / n;
        Ok((0..self.segments)
            .map(|i| CurrentSegment {
                center: self.start + step * (i as f64 + 0.5),
                direction,
                current,
            })
            .collect())
    }
}

/// Closed polygonal loop through `vertices`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopSource {
    pub vertices: Vec<Point3D>,
    pub current: f64,
    #[serde(default = "default_segments")]
    pub segments_per_side: usize,
}

impl LoopSource {
    /// Axis-aligned rectangle in the plane `z`, counter-clockwise seen from +z
    pub fn rectangle_xy(min: (f64, f64), max: (f64, f64), z: f64, current: f64, segments_per_side: usize) -> Self {
        Self {
            vertices: vec![
                Point3D::new(min.0, min.1, z),
                Point3D::new(max.0, min.1, z),
                Point3D::new(max.0, max.1, z),
                Point3D::new(min.0, max.1, z),
            ],
            current,
            segments_per_side,
        }
    }

    /// Discretise every side as a line source carrying the loop current
    pub fn discretize(&self) -> Result<Vec<CurrentSegment>> {
        if self.vertices.len() < 3 {
            return Err(FemError::InvalidSource(format!(
                "loop source needs at least 3 vertices, got {}",
                self.vertices.len()
            )));
        }
        let n = self.vertices.len();
        let mut segments = Vec::with_capacity(n * self.segments_per_side);
        for i in 0..n {
            let side = LineSource::new(
                self.vertices[i],
                self.vertices[(i + 1) % n],
                self.current,
                self.segments_per_side,
            );
            segments.extend(side.discretize()?);
        }
        Ok(segments)
    }
}

/// Any supported source geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CurrentSource {
    Line(LineSource),
    Loop(LoopSource),
}

impl CurrentSource {
    pub fn discretize(&self) -> Result<Vec<CurrentSegment>> {
        match self {
            CurrentSource::Line(line) => line.discretize(),
            CurrentSource::Loop(lp) => lp.discretize(),
        }
    }
}

/// Discretise and concatenate several sources
pub fn discretize_all(sources: &[CurrentSource]) -> Result<Vec<CurrentSegment>> {
    let mut segments = Vec::new();
    for source in sources {
        segments.extend(source.discretize()?);
    }
    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_line_source_segments() {
        let line = LineSource::new(Point3D::new(-2.0, 0.0, 0.0), Point3D::new(2.0, 0.0, 0.0), 8.0, 4);
        let segments = line.discretize().unwrap();
        assert_eq!(segments.len(), 4);
        assert_relative_eq!(segments[0].center.x, -1.5);
        assert_relative_eq!(segments[3].center.x, 1.5);
        for s in &segments {
            assert_eq!(s.direction, Vector3D::new(1.0, 0.0, 0.0));
            assert_relative_eq!(s.current, 2.0);
        }
        let total: f64 = segments.iter().map(|s| s.current).sum();
        assert_relative_eq!(total, line.current);
    }

    #[test]
    fn test_zero_length_line_is_rejected() {
        let p = Point3D::new(1.0, 1.0, 1.0);
        assert!(matches!(
            LineSource::new(p, p, 1.0, 3).discretize(),
            Err(FemError::InvalidSource(_))
        ));
        let q = Point3D::new(2.0, 1.0, 1.0);
        assert!(LineSource::new(p, q, 1.0, 0).discretize().is_err());
    }

    #[test]
    fn test_rectangular_loop_closes() {
        let lp = LoopSource::rectangle_xy((-1.0, -1.0), (1.0, 1.0), 0.5, 1.0, 2);
        let segments = lp.discretize().unwrap();
        assert_eq!(segments.len(), 8);

        // Net current vector of a closed loop is zero
        let net = segments
            .iter()
            .fold(Vector3D::zero(), |acc, s| acc + s.current_vector());
        assert_relative_eq!(net.norm(), 0.0, epsilon = 1e-14);
        assert!(segments.iter().all(|s| s.center.z == 0.5));
    }

    #[test]
    fn test_source_json_roundtrip_tags() {
        let json = r#"{"type":"line","start":{"x":0,"y":0,"z":0},"end":{"x":0,"y":1,"z":0},"current":2.0}"#;
        let source: CurrentSource = serde_json::from_str(json).unwrap();
        let segments = source.discretize().unwrap();
        assert_eq!(segments.len(), 1);
        assert_relative_eq!(segments[0].center.y, 0.5);
    }
}
