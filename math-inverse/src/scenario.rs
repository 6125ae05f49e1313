//! Synthetic inversion scenario read from JSON
//!
//! A scenario describes the grid, the true anomalies, the sources and the
//! sensor layout. Observed data are synthesised by a forward solve on the
//! true model, and the inversion starts from a uniform background on the
//! same grid.

use crate::config::InverseOptions;
use crate::engine::{InversionEngine, InversionReport, IterationObserver};
use crate::error::{InverseError, Result};
use crate::model::ForwardModel;
use math_magneto_fem::{
    CurrentSegment, CurrentSource, ForwardConfig, Mesh, Sensor, SensorComponent, Stratum,
    StructuredMeshBuilder, discretize_all, plane_sensor_grid,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Regular sensor grid on a plane of constant z
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorGrid {
    pub x_range: (f64, f64),
    pub y_range: (f64, f64),
    pub counts: (usize, usize),
    pub z: f64,
    #[serde(default)]
    pub component: SensorComponent,
}

impl SensorGrid {
    pub fn sensors(&self) -> Vec<Sensor> {
        plane_sensor_grid(self.x_range, self.y_range, self.counts, self.z, self.component)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub mesh: StructuredMeshBuilder,
    /// Anomalies present in the true model only
    #[serde(default)]
    pub true_strata: Vec<Stratum>,
    pub sources: Vec<CurrentSource>,
    pub sensors: SensorGrid,
    /// Starting permeability (default: the mesh background)
    #[serde(default)]
    pub initial_mu: Option<f64>,
    #[serde(default)]
    pub forward: ForwardConfig,
    #[serde(default)]
    pub inverse: InverseOptions,
}

impl Scenario {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let scenario: Scenario = serde_json::from_str(&contents)?;
        scenario.inverse.validate()?;
        Ok(scenario)
    }

    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// True model and starting model on a shared grid
    ///
    /// Anomaly faces become grid planes, so both meshes are derived from the
    /// true model's geometry.
    pub fn meshes(&self) -> Result<(Mesh, Mesh)> {
        let builder = self
            .true_strata
            .iter()
            .cloned()
            .fold(self.mesh.clone(), StructuredMeshBuilder::stratum);
        let truth = builder.build()?;
        let initial = truth.with_uniform_mu(self.initial_mu.unwrap_or(self.mesh.background_mu));
        Ok((truth, initial))
    }

    pub fn segments(&self) -> Result<Vec<CurrentSegment>> {
        if self.sources.is_empty() {
            return Err(InverseError::InvalidOptions(
                "scenario needs at least one current source".to_string(),
            ));
        }
        Ok(discretize_all(&self.sources)?)
    }

    /// Synthesise data on the true model and invert from the starting model
    pub fn run(&self, observer: &mut dyn IterationObserver) -> Result<(Mesh, InversionReport)> {
        let (truth, mut mesh) = self.meshes()?;
        let model = ForwardModel::new(
            self.forward.clone(),
            self.sensors.sensors(),
            self.segments()?,
            self.inverse.response,
        )
        .with_background(&mesh)?;

        let observed = model.response(&truth)?;
        let engine = InversionEngine::new(self.inverse.clone())?;
        let report = engine.invert_with_observer(&model, &observed, &mut mesh, observer)?;
        Ok((truth, report))
    }
}
