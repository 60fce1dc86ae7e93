use criterion::{black_box, criterion_group, criterion_main, Criterion};
use immersed_layers::cache::{BasicIlmCache, CacheOptions};
use immersed_layers::grid::{CellData, PhysicalGrid};
use immersed_layers::matrices::{create_rtlinvr, SchurSolver};
use immersed_layers::operators::mask;
use immersed_layers::surface::Circle;
use nalgebra::DVector;

pub fn assembly_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("assembly");
    group.sample_size(10);

    for dx in [0.04, 0.02] {
        let grid = PhysicalGrid::from_limits([-2.0, 2.0], [-2.0, 2.0], dx).unwrap();
        let circle = Circle::with_spacing([0.0, 0.0], 1.0, 1.5 * dx);
        let mut cache = BasicIlmCache::from_body(&grid, circle, &CacheOptions::default()).unwrap();
        let n = cache.num_points();

        let size = format!("{}x{} grid", grid.nx(), grid.ny());
        group.bench_function(
            format!("Assembly of {n}x{n} Schur complement on a {size}"),
            |b| b.iter(|| black_box(create_rtlinvr(&cache).unwrap())),
        );

        let solver = SchurSolver::factorize(create_rtlinvr(&cache).unwrap()).unwrap();
        let rhs = DVector::from_element(n, 1.0);
        let mut out = DVector::zeros(n);
        group.bench_function(format!("Solve with {n}x{n} Schur complement"), |b| {
            b.iter(|| solver.solve(black_box(&mut out), &rhs).unwrap())
        });

        let mut field = CellData::new(&grid);
        group.bench_function(format!("Mask on a {size}"), |b| {
            b.iter(|| mask(black_box(&mut field), &mut cache).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, assembly_benchmark);
criterion_main!(benches);
