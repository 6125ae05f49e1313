//! Mapping field samples to the data vector the inversion fits

use crate::error::{InverseError, Result};
use math_magneto_fem::{FieldSample, Sensor};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Which numbers of a [`FieldSample`] enter the misfit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseKind {
    /// `|B|` per sensor (`m` rows)
    #[default]
    Magnitude,
    /// `Bx, By, Bz` per sensor, interleaved (`3m` rows)
    Components,
    /// The component each sensor declares (`m` rows)
    SensorComponent,
}

impl ResponseKind {
    pub fn rows_per_sensor(self) -> usize {
        match self {
            ResponseKind::Components => 3,
            ResponseKind::Magnitude | ResponseKind::SensorComponent => 1,
        }
    }

    /// Length of the data vector for `sensors` sensors
    pub fn data_len(self, sensors: usize) -> usize {
        sensors * self.rows_per_sensor()
    }

    pub fn extract(self, samples: &[FieldSample], sensors: &[Sensor]) -> Result<Array1<f64>> {
        if samples.len() != sensors.len() {
            return Err(InverseError::DimensionMismatch {
                context: "field samples",
                expected: sensors.len(),
                got: samples.len(),
            });
        }
        let values: Vec<f64> = match self {
            ResponseKind::Magnitude => samples.iter().map(FieldSample::magnitude).collect(),
            ResponseKind::Components => samples.iter().flat_map(|s| [s.bx, s.by, s.bz]).collect(),
            ResponseKind::SensorComponent => samples
                .iter()
                .zip(sensors)
                .map(|(s, sensor)| s.component(sensor.component))
                .collect(),
        };
        Ok(Array1::from(values))
    }
}

/// Sum of squared residuals `Φ = Σ (observed − model)²`
pub fn misfit(observed: &Array1<f64>, model: &Array1<f64>) -> Result<(Array1<f64>, f64)> {
    if observed.len() != model.len() {
        return Err(InverseError::DimensionMismatch {
            context: "model response",
            expected: observed.len(),
            got: model.len(),
        });
    }
    let residual = observed - model;
    let functional = residual.dot(&residual);
    if !functional.is_finite() {
        return Err(InverseError::NonFinite("misfit functional"));
    }
    Ok((residual, functional))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use math_magneto_fem::{Point3D, SensorComponent, Vector3D};

    fn fixture() -> (Vec<FieldSample>, Vec<Sensor>) {
        let samples = vec![
            FieldSample::new(Point3D::origin(), Vector3D::new(3.0, 0.0, 4.0)),
            FieldSample::new(Point3D::new(1.0, 0.0, 0.0), Vector3D::new(1.0, 2.0, 2.0)),
        ];
        let sensors = vec![
            Sensor::new(Point3D::origin(), SensorComponent::Bx),
            Sensor::new(Point3D::new(1.0, 0.0, 0.0), SensorComponent::By),
        ];
        (samples, sensors)
    }

    #[test]
    fn test_extract_layouts() {
        let (samples, sensors) = fixture();

        let magnitude = ResponseKind::Magnitude.extract(&samples, &sensors).unwrap();
        assert_relative_eq!(magnitude[0], 5.0);
        assert_relative_eq!(magnitude[1], 3.0);

        let components = ResponseKind::Components.extract(&samples, &sensors).unwrap();
        assert_eq!(components.len(), ResponseKind::Components.data_len(2));
        assert_eq!(components.to_vec(), vec![3.0, 0.0, 4.0, 1.0, 2.0, 2.0]);

        let declared = ResponseKind::SensorComponent.extract(&samples, &sensors).unwrap();
        assert_eq!(declared.to_vec(), vec![3.0, 2.0]);
    }

    #[test]
    fn test_extract_length_mismatch() {
        let (samples, sensors) = fixture();
        assert!(ResponseKind::Magnitude.extract(&samples[..1], &sensors).is_err());
    }

    #[test]
    fn test_misfit() {
        let observed = Array1::from(vec![1.0, 2.0, 3.0]);
        let model = Array1::from(vec![1.0, 1.0, 5.0]);
        let (residual, phi) = misfit(&observed, &model).unwrap();
        assert_eq!(residual.to_vec(), vec![0.0, 1.0, -2.0]);
        assert_relative_eq!(phi, 5.0);
        assert!(misfit(&observed, &Array1::zeros(2)).is_err());
    }
}
