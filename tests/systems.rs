//! Problems solved through systems
use approx::assert_relative_eq;
use immersed_layers::cache::BasicIlmCache;
use immersed_layers::forcing::{ForcingModel, ForcingRegion};
use immersed_layers::grid::PhysicalGrid;
use immersed_layers::problems::{DirichletPoisson, NeumannPoisson, PoissonSolution};
use immersed_layers::surface::{BodyList, Circle, ScalarData};
use immersed_layers::system::{
    construct_system, update_system, BoundaryConditions, IlmProblem, ProblemSpec,
};
use immersed_layers::types::{BoundaryRole, GridLocation};
use nalgebra::DVector;
use std::time::Instant;

type Spec = ProblemSpec<f64, (), (), ScalarData<f64>>;

/// A unit circle in a 4x4 box
fn unit_circle_spec(dx: f64) -> Spec {
    let grid = PhysicalGrid::from_limits([-2.0, 2.0], [-2.0, 2.0], dx).unwrap();
    let bodies = BodyList::from_body(Circle::with_spacing([0.0, 0.0], 1.0, 1.5 * dx));
    ProblemSpec::new(grid, bodies, ())
}

/// The same data on both sides of the surface
fn both_sides(
    data: impl Fn(&BasicIlmCache<f64>, usize) -> f64 + Send + Sync + Copy + 'static,
) -> BoundaryConditions<f64, (), ScalarData<f64>> {
    let side = move |cache: &BasicIlmCache<f64>, _: &(), _: f64| {
        ScalarData::from_fn(cache.num_points(), |k| data(cache, k))
    };
    BoundaryConditions::new()
        .with(BoundaryRole::Exterior, side)
        .with(BoundaryRole::Interior, side)
}

/// Data `exterior` on the outside of the surface and `interior` on the inside
fn two_sides(
    exterior: impl Fn(&BasicIlmCache<f64>, usize) -> f64 + Send + Sync + Copy + 'static,
    interior: impl Fn(&BasicIlmCache<f64>, usize) -> f64 + Send + Sync + Copy + 'static,
) -> BoundaryConditions<f64, (), ScalarData<f64>> {
    BoundaryConditions::new()
        .with(BoundaryRole::Exterior, move |cache: &BasicIlmCache<f64>, _: &(), _: f64| {
            ScalarData::from_fn(cache.num_points(), |k| exterior(cache, k))
        })
        .with(BoundaryRole::Interior, move |cache: &BasicIlmCache<f64>, _: &(), _: f64| {
            ScalarData::from_fn(cache.num_points(), |k| interior(cache, k))
        })
}

/// Values of a solution at cell centres between `r_min` and `r_max` from the origin
fn between(
    solution: &PoissonSolution<f64>,
    grid: &PhysicalGrid<f64>,
    r_min: f64,
    r_max: f64,
) -> Vec<([f64; 2], f64)> {
    let mut values = vec![];
    for j in 0..grid.ny() {
        for i in 0..grid.nx() {
            let [x, y] = grid.coordinates(GridLocation::Cell, i, j);
            let r = (x * x + y * y).sqrt();
            if r >= r_min && r < r_max {
                values.push(([x, y], solution.field[(i, j)]));
            }
        }
    }
    values
}

/// Values of a solution at cell centres within `radius` of the origin
fn inside(
    solution: &PoissonSolution<f64>,
    grid: &PhysicalGrid<f64>,
    radius: f64,
) -> Vec<([f64; 2], f64)> {
    between(solution, grid, 0.0, radius)
}

#[test]
fn test_dirichlet_circle_harmonic_interior() {
    let spec = unit_circle_spec(0.05).with_bcs(both_sides(|cache, k| cache.points().u[k]));
    let mut system = construct_system(DirichletPoisson::new(spec)).unwrap();
    let solution = DirichletPoisson::solve(&mut system, &0.0).unwrap();

    let values = inside(&solution, system.base().grid(), 0.6);
    assert!(!values.is_empty());
    for ([x, _], f) in values {
        assert_relative_eq!(f, x, epsilon = 0.05);
    }
}

#[test]
fn test_dirichlet_with_area_forcing() {
    // L f = 1 with f = 0 on the unit circle gives f = (r^2 - 1) / 4 inside
    let spec = unit_circle_spec(0.05)
        .with_bcs(both_sides(|_, _| 0.0))
        .with_forcing(ForcingModel::new(
            ForcingRegion::area(|_: f64, _: f64| true),
            |s: &mut DVector<f64>, _: &(), _, _, _: &()| s.fill(1.0),
        ));
    let mut system = construct_system(DirichletPoisson::new(spec)).unwrap();
    let solution = DirichletPoisson::solve(&mut system, &0.0).unwrap();
    for ([x, y], f) in inside(&solution, system.base().grid(), 0.6) {
        assert_relative_eq!(f, 0.25 * (x * x + y * y - 1.0), epsilon = 0.02);
    }
}

#[test]
fn test_repeated_solves_are_cheap() {
    let spec = unit_circle_spec(0.05).with_bcs(both_sides(|cache, k| cache.points().v[k]));

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(1)
        .build()
        .unwrap();
    let start = Instant::now();
    let mut system = pool
        .install(|| construct_system(DirichletPoisson::new(spec)))
        .unwrap();
    let build = start.elapsed();

    let nsolves = 5;
    let start = Instant::now();
    for i in 0..nsolves {
        DirichletPoisson::solve(&mut system, &(i as f64)).unwrap();
    }
    let solve = start.elapsed() / nsolves;
    assert!(
        solve * 4 < build,
        "solve took {solve:?}, construction took {build:?}"
    );
}

#[test]
fn test_update_round_trip() {
    let spec = unit_circle_spec(0.1).with_bcs(both_sides(|cache, k| cache.points().u[k]));
    let mut system = construct_system(DirichletPoisson::new(spec)).unwrap();
    let before = DirichletPoisson::solve(&mut system, &0.0).unwrap();
    let stencil = system
        .base()
        .regularizer()
        .stencil(GridLocation::Cell)
        .matrix()
        .clone();

    let mut system = update_system(system, None, None).unwrap();
    let after = DirichletPoisson::solve(&mut system, &0.0).unwrap();
    assert_eq!(
        &stencil,
        system.base().regularizer().stencil(GridLocation::Cell).matrix()
    );
    assert_eq!(before.field, after.field);
    assert_eq!(before.single_layer, after.single_layer);
}

#[test]
fn test_neumann_circle_interior_gradient() {
    let spec = unit_circle_spec(0.05).with_bcs(both_sides(|cache, k| cache.normals().u[k]));
    let mut system = construct_system(NeumannPoisson::new(spec)).unwrap();
    let solution = NeumannPoisson::solve(&mut system, &0.0).unwrap();

    let values = inside(&solution, system.base().grid(), 0.6);
    let offset = values.iter().map(|([x, _], f)| f - x).sum::<f64>() / values.len() as f64;
    for ([x, _], f) in values {
        assert_relative_eq!(f - offset, x, epsilon = 0.05);
    }
}

#[test]
fn test_dirichlet_circle_exterior_decays() {
    let spec = unit_circle_spec(0.04).with_bcs(both_sides(|cache, k| cache.points().u[k]));
    let mut system = construct_system(DirichletPoisson::new(spec)).unwrap();
    let solution = DirichletPoisson::solve(&mut system, &0.0).unwrap();

    let values = between(&solution, system.base().grid(), 1.3, 1.6);
    assert!(!values.is_empty());
    for ([x, y], f) in values {
        assert_relative_eq!(f, x / (x * x + y * y), epsilon = 0.05);
    }
}

#[test]
fn test_dirichlet_circle_jump() {
    let spec = unit_circle_spec(0.05)
        .with_bcs(two_sides(|cache, k| cache.points().u[k], |_, _| 0.0));
    let mut system = construct_system(DirichletPoisson::new(spec)).unwrap();
    let solution = DirichletPoisson::solve(&mut system, &0.0).unwrap();

    for (_, f) in inside(&solution, system.base().grid(), 0.6) {
        assert!(f.abs() < 0.05, "interior value {f}");
    }
    for ([x, y], f) in between(&solution, system.base().grid(), 1.3, 1.6) {
        assert_relative_eq!(f, x / (x * x + y * y), epsilon = 0.05);
    }
}

#[test]
fn test_neumann_circle_exterior_dipole() {
    let spec = unit_circle_spec(0.05).with_bcs(both_sides(|cache, k| cache.normals().u[k]));
    let mut system = construct_system(NeumannPoisson::new(spec)).unwrap();
    let solution = NeumannPoisson::solve(&mut system, &0.0).unwrap();

    let values = between(&solution, system.base().grid(), 1.3, 1.6);
    assert!(!values.is_empty());
    for ([x, y], f) in values {
        assert_relative_eq!(f, -x / (x * x + y * y), epsilon = 0.05);
    }
}
