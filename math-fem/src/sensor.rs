//! Sensors and sampled magnetic field values

use crate::mesh::{Point3D, Vector3D};
use serde::{Deserialize, Serialize};

/// Field component a sensor records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorComponent {
    Bx,
    By,
    #[default]
    Bz,
}

/// Measurement location
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sensor {
    pub position: Point3D,
    #[serde(default)]
    pub component: SensorComponent,
}

impl Sensor {
    pub fn new(position: Point3D, component: SensorComponent) -> Self {
        Self {
            position,
            component,
        }
    }
}

/// Field value at one sensor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldSample {
    pub position: Point3D,
    pub bx: f64,
    pub by: f64,
    pub bz: f64,
}

impl FieldSample {
    pub fn new(position: Point3D, field: Vector3D) -> Self {
        Self {
            position,
            bx: field.x,
            by: field.y,
            bz: field.z,
        }
    }

    pub fn field(&self) -> Vector3D {
        Vector3D::new(self.bx, self.by, self.bz)
    }

    pub fn magnitude(&self) -> f64 {
        self.field().norm()
    }

    pub fn component(&self, component: SensorComponent) -> f64 {
        match component {
            SensorComponent::Bx => self.bx,
            SensorComponent::By => self.by,
            SensorComponent::Bz => self.bz,
        }
    }

    /// Anomaly field: this sample minus the background `primary`
    pub fn secondary(&self, primary: &FieldSample) -> FieldSample {
        FieldSample::new(self.position, self.field() - primary.field())
    }
}

/// Regular grid of sensors on the plane `z = const`
///
/// Sensors are ordered x-major (all y values for the first x, then the
/// next x). An axis with fewer than two points is placed at its range start.
pub fn plane_sensor_grid(
    x_range: (f64, f64),
    y_range: (f64, f64),
    counts: (usize, usize),
    z: f64,
    component: SensorComponent,
) -> Vec<Sensor> {
    let step = |range: (f64, f64), n: usize| {
        if n < 2 {
            0.0
        } else {
            (range.1 - range.0) / (n - 1) as f64
        }
    };
    let dx = step(x_range, counts.0);
    let dy = step(y_range, counts.1);

    let mut sensors = Vec::with_capacity(counts.0 * counts.1);
    for i in 0..counts.0 {
        for j in 0..counts.1 {
            sensors.push(Sensor::new(
                Point3D::new(x_range.0 + i as f64 * dx, y_range.0 + j as f64 * dy, z),
                component,
            ));
        }
    }
    sensors
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_grid_layout() {
        let sensors = plane_sensor_grid((-10.0, 10.0), (-10.0, 10.0), (5, 5), 0.0, SensorComponent::Bz);
        assert_eq!(sensors.len(), 25);
        assert_eq!(sensors[0].position, Point3D::new(-10.0, -10.0, 0.0));
        assert_eq!(sensors[1].position, Point3D::new(-10.0, -5.0, 0.0));
        assert_eq!(sensors[24].position, Point3D::new(10.0, 10.0, 0.0));
    }

    #[test]
    fn test_single_point_axis() {
        let sensors = plane_sensor_grid((1.0, 5.0), (0.0, 2.0), (1, 3), -1.0, SensorComponent::Bx);
        assert_eq!(sensors.len(), 3);
        assert!(sensors.iter().all(|s| s.position.x == 1.0));
        assert!(plane_sensor_grid((0.0, 1.0), (0.0, 1.0), (0, 4), 0.0, SensorComponent::Bz).is_empty());
    }

    #[test]
    fn test_sample_components() {
        let s = FieldSample::new(Point3D::origin(), Vector3D::new(3.0, 0.0, 4.0));
        assert_relative_eq!(s.magnitude(), 5.0);
        assert_eq!(s.component(SensorComponent::Bz), 4.0);

        let background = FieldSample::new(Point3D::origin(), Vector3D::new(1.0, 1.0, 1.0));
        let anomaly = s.secondary(&background);
        assert_eq!(anomaly.field(), Vector3D::new(2.0, -1.0, 3.0));
        assert_eq!(s.secondary(&s).magnitude(), 0.0);
    }
}
