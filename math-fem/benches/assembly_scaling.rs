//! Benchmark: edge-element assembly and forward solve scaling
//!
//! Measures how the magnetostatic pipeline scales with mesh size for both
//! parallel scatter strategies.
//!
//! Run with:
//!   cargo bench -p math-magneto-fem --bench assembly_scaling
//!
//! Thread scaling:
//!   RAYON_NUM_THREADS=1 cargo bench -p math-magneto-fem --bench assembly_scaling
//!   RAYON_NUM_THREADS=4 cargo bench -p math-magneto-fem --bench assembly_scaling

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use math_magneto_fem::{
    AssemblyOptions, AssemblyStrategy, AxisSplitting, CurrentSegment, ForwardSolver, LineSource,
    Mesh, Point3D, SensorComponent, StructuredMeshBuilder, assemble_system, plane_sensor_grid,
};
use std::time::Duration;

fn cube_mesh(n: usize) -> Mesh {
    let axis = AxisSplitting::uniform(-10.0, 10.0, n);
    StructuredMeshBuilder::new(axis.clone(), axis.clone(), axis)
        .build()
        .expect("valid mesh")
}

fn source() -> Vec<CurrentSegment> {
    LineSource::new(Point3D::new(-5.0, 0.1, -2.0), Point3D::new(5.0, 0.1, -2.0), 1.0, 8)
        .discretize()
        .expect("valid source")
}

fn bench_assembly(c: &mut Criterion) {
    let mut group = c.benchmark_group("edge_assembly");
    group.warm_up_time(Duration::from_secs(2));
    group.measurement_time(Duration::from_secs(5));

    let segments = source();
    for &n in &[4, 6, 8] {
        let mesh = cube_mesh(n);
        group.throughput(Throughput::Elements(mesh.num_elements() as u64));

        for strategy in [AssemblyStrategy::PerDofLocks, AssemblyStrategy::Ordered] {
            let options = AssemblyOptions {
                strategy,
                ..AssemblyOptions::default()
            };
            group.bench_with_input(
                BenchmarkId::new(format!("{strategy:?}"), n),
                &mesh,
                |b, mesh| b.iter(|| black_box(assemble_system(mesh, &segments, &options))),
            );
        }
    }

    group.finish();
}

fn bench_forward_solve(c: &mut Criterion) {
    let mut group = c.benchmark_group("forward_solve");
    group.sample_size(10);

    let segments = source();
    let sensors = plane_sensor_grid((-8.0, 8.0), (-8.0, 8.0), (9, 9), 0.0, SensorComponent::Bz);
    let solver = ForwardSolver::default();

    for &n in &[4, 6] {
        let mesh = cube_mesh(n);
        group.bench_with_input(BenchmarkId::new("calculate", n), &mesh, |b, mesh| {
            b.iter(|| black_box(solver.calculate(mesh, &sensors, &segments)))
        });

        let prepared = solver.prepare(&mesh).expect("factorisation");
        group.bench_with_input(BenchmarkId::new("prepared", n), &prepared, |b, prepared| {
            b.iter(|| black_box(prepared.calculate(&sensors, &segments)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_assembly, bench_forward_solve);
criterion_main!(benches);
