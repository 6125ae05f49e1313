//! End-to-end inversion scenarios on a coarse 3×3×3 grid
//!
//! Observations are synthesised from a model with a single anomalous centre
//! cell; the inversion starts from the uniform background.

use approx::assert_relative_eq;
use math_magneto_fem::{
    AssemblyStrategy, AxisSplitting, CurrentSegment, ForwardConfig, LineSource, Mesh, Point3D,
    SensorComponent, StructuredMeshBuilder, plane_sensor_grid,
};
use math_magneto_inverse::{
    ForwardModel, InverseError, InverseOptions, InversionEngine, InversionMethod, IterationRecord,
    JacobianBuilder, JacobianConfig, ObserverAction, ResponseKind, StopReason,
};
use ndarray::Array1;

const BACKGROUND_MU: f64 = 1.0;
const ANOMALY_MU: f64 = 1.2;
const CENTER: usize = 13;

fn background_mesh() -> Mesh {
    let axis = AxisSplitting::uniform(-15.0, 15.0, 3);
    StructuredMeshBuilder::new(axis.clone(), axis.clone(), axis)
        .background_mu(BACKGROUND_MU)
        .build()
        .unwrap()
}

fn true_mesh() -> Mesh {
    let mut mesh = background_mesh();
    mesh.set_mu(CENTER, ANOMALY_MU).unwrap();
    mesh
}

fn segments() -> Vec<CurrentSegment> {
    LineSource::new(Point3D::new(-10.0, 2.0, -3.0), Point3D::new(10.0, 2.0, -3.0), 1.0, 4)
        .discretize()
        .unwrap()
}

fn forward_config() -> ForwardConfig {
    ForwardConfig {
        assembly: AssemblyStrategy::Ordered,
        ..ForwardConfig::default()
    }
}

fn model(response: ResponseKind) -> ForwardModel {
    let sensors = plane_sensor_grid((-10.0, 10.0), (-10.0, 10.0), (5, 5), 0.0, SensorComponent::Bz);
    ForwardModel::new(forward_config(), sensors, segments(), response)
        .with_background(&background_mesh())
        .unwrap()
}

fn options(method: InversionMethod) -> InverseOptions {
    InverseOptions {
        method,
        response: ResponseKind::Components,
        lambda: 1e-3,
        relative_regularization: true,
        use_first_order: true,
        use_second_order: false,
        max_iterations: 3,
        functional_threshold: 1e-8,
        jacobian: JacobianConfig {
            threads: Some(2),
            ..JacobianConfig::default()
        },
        ..InverseOptions::default()
    }
}

#[test]
fn test_center_cell_is_identified() {
    assert_relative_eq!(true_mesh().element(CENTER).unwrap().center().x, 0.0, epsilon = 1e-12);
}

#[test]
fn test_gauss_newton_reduces_functional() {
    let model = model(ResponseKind::Components);
    let observed = model.response(&true_mesh()).unwrap();
    assert!(observed.iter().any(|v| v.abs() > 0.0));

    let mut mesh = background_mesh();
    let engine = InversionEngine::new(options(InversionMethod::GaussNewton)).unwrap();
    let report = engine.invert(&model, &observed, &mut mesh).unwrap();

    let initial = report.initial_functional().unwrap();
    assert!(initial > 0.0);
    assert!(
        report.records.iter().skip(1).any(|r| r.functional < initial) || report.final_functional < initial,
        "functional never decreased: {:?}",
        report.records.iter().map(|r| r.functional).collect::<Vec<_>>()
    );
    assert!(
        report.mu[CENTER] > BACKGROUND_MU,
        "centre cell moved the wrong way: {}",
        report.mu[CENTER]
    );
    assert_eq!(mesh.mu_values(), report.mu.as_slice());
    assert_eq!(report.final_field.len(), 25);
}

#[test]
fn test_born_reduces_functional() {
    let model = model(ResponseKind::Components);
    let observed = model.response(&true_mesh()).unwrap();

    let mut mesh = background_mesh();
    let engine = InversionEngine::new(options(InversionMethod::Born)).unwrap();
    let report = engine.invert(&model, &observed, &mut mesh).unwrap();

    let initial = report.initial_functional().unwrap();
    assert!(report.final_functional < initial);
    assert!(report.mu[CENTER] > BACKGROUND_MU);
}

#[test]
fn test_stagnation_raises_lambda_and_enables_smoothing() {
    let model = model(ResponseKind::Components);
    let observed = model.response(&true_mesh()).unwrap();

    let mut mesh = background_mesh();
    let engine = InversionEngine::new(InverseOptions {
        relative_tolerance: 1e10,
        ..options(InversionMethod::GaussNewton)
    })
    .unwrap();
    let report = engine.invert(&model, &observed, &mut mesh).unwrap();

    assert!(report.records.len() >= 2, "stopped early: {:?}", report.stop_reason);
    let (first, second) = (&report.records[0], &report.records[1]);
    assert!(!first.stagnated);
    assert_eq!(first.gamma, Some(0.0));
    assert!(second.stagnated);

    let lambda0 = first.lambda.unwrap();
    let lambda1 = second.lambda.unwrap();
    assert!(lambda1 >= lambda0, "λ went from {lambda0:e} to {lambda1:e}");
    assert!(second.gamma.unwrap() > 0.0);
}

#[test]
fn test_second_order_smoothing_still_converges() {
    let model = model(ResponseKind::Components);
    let observed = model.response(&true_mesh()).unwrap();

    let mut mesh = background_mesh();
    let engine = InversionEngine::new(InverseOptions {
        use_second_order: true,
        ..options(InversionMethod::GaussNewton)
    })
    .unwrap();
    let report = engine.invert(&model, &observed, &mut mesh).unwrap();

    let updates: Vec<_> = report.records.iter().filter(|r| r.lambda.is_some()).collect();
    assert!(!updates.is_empty());
    for record in &updates {
        assert!(record.gamma.unwrap() > 0.0, "iteration {} has no smoothing", record.iteration);
    }
    assert!(report.final_functional < report.initial_functional().unwrap());
}

#[test]
fn test_exact_fit_stops_immediately() {
    let model = model(ResponseKind::Magnitude);
    let observed = model.response(&background_mesh()).unwrap();

    let mut mesh = background_mesh();
    let engine = InversionEngine::new(InverseOptions::default()).unwrap();
    let report = engine.invert(&model, &observed, &mut mesh).unwrap();

    assert_eq!(report.stop_reason, StopReason::ExactFit);
    assert_eq!(report.iterations(), 1);
    assert!(report.mu.iter().all(|&mu| mu == BACKGROUND_MU));
}

#[test]
fn test_observer_can_stop_and_sees_every_iteration() {
    let model = model(ResponseKind::Components);
    let observed = model.response(&true_mesh()).unwrap();

    let mut seen: Vec<IterationRecord> = Vec::new();
    let mut observer = |record: &IterationRecord| {
        seen.push(record.clone());
        ObserverAction::Stop
    };

    let mut mesh = background_mesh();
    let engine = InversionEngine::new(options(InversionMethod::GaussNewton)).unwrap();
    let report = engine
        .invert_with_observer(&model, &observed, &mut mesh, &mut observer)
        .unwrap();

    assert_eq!(report.stop_reason, StopReason::StoppedByObserver);
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].iteration, 0);
    assert!(seen[0].lambda.is_some());
    assert_eq!(report.records, seen);
}

#[test]
fn test_zero_time_budget() {
    let model = model(ResponseKind::Magnitude);
    let observed = model.response(&true_mesh()).unwrap();

    let mut mesh = background_mesh();
    let engine = InversionEngine::new(InverseOptions {
        time_budget_secs: Some(0.0),
        ..InverseOptions::default()
    })
    .unwrap();
    let report = engine.invert(&model, &observed, &mut mesh).unwrap();
    assert_eq!(report.stop_reason, StopReason::TimeBudget);
    assert!(report.records[0].lambda.is_none());
}

#[test]
fn test_observed_length_checked() {
    let model = model(ResponseKind::Magnitude);
    let mut mesh = background_mesh();
    let engine = InversionEngine::new(InverseOptions::default()).unwrap();

    let result = engine.invert(&model, &Array1::zeros(3), &mut mesh);
    assert!(matches!(result, Err(InverseError::DimensionMismatch { .. })));
    let result = engine.invert(&model, &Array1::zeros(0), &mut mesh);
    assert!(matches!(result, Err(InverseError::EmptyObservations)));
}

#[test]
fn test_jacobian_first_order_consistency() {
    let model = model(ResponseKind::Components);
    let mesh = background_mesh();
    let base = model.response(&mesh).unwrap();

    let column = |step: f64| {
        let builder = JacobianBuilder::new(JacobianConfig {
            relative_step: step,
            threads: Some(2),
            ..JacobianConfig::default()
        })
        .unwrap();
        builder.build(&model, &mesh, &base).unwrap().column(CENTER).to_owned()
    };
    let j1 = column(0.1);
    let j2 = column(0.05);
    let j4 = column(0.025);

    let norm = |v: Array1<f64>| v.dot(&v).sqrt();
    let coarse = norm(&j1 - &j2);
    let fine = norm(&j2 - &j4);
    assert!(fine > 0.0);
    let ratio = coarse / fine;
    assert!((1.5..2.7).contains(&ratio), "difference ratio {ratio}");
}

#[test]
fn test_jacobian_independent_of_worker_count() {
    let model = model(ResponseKind::Magnitude);
    let mesh = true_mesh();

    let build = |threads: usize| {
        JacobianBuilder::new(JacobianConfig {
            threads: Some(threads),
            ..JacobianConfig::default()
        })
        .unwrap()
        .build_around(&model, &mesh)
        .unwrap()
    };
    let (single, base_single) = build(1);
    let (multi, base_multi) = build(3);

    assert_eq!(base_single, base_multi);
    assert_eq!(single, multi);
    assert_eq!(single.dim(), (25, 27));
}
