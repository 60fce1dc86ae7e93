use immersed_layers::cache::BasicIlmCache;
use immersed_layers::forcing::{ForcingModel, ForcingRegion};
use immersed_layers::grid::PhysicalGrid;
use immersed_layers::problems::DirichletPoisson;
use immersed_layers::surface::{BodyList, Circle, ScalarData, VectorData};
use immersed_layers::system::{construct_system, BoundaryConditions, IlmProblem, ProblemSpec};
use immersed_layers::types::{BoundaryRole, GridLocation};
use nalgebra::DVector;

fn main() {
    // A unit circle in a 4x4 box, with surface points about 1.5 grid spacings apart
    let dx = 0.04;
    let grid = PhysicalGrid::from_limits([-2.0, 2.0], [-2.0, 2.0], dx).unwrap();
    let bodies = BodyList::from_body(Circle::with_spacing([0.0, 0.0], 1.0, 1.5 * dx));

    // The value of f is x on the outside of the circle and zero on the inside
    let bcs = BoundaryConditions::new()
        .with(BoundaryRole::Exterior, |cache: &BasicIlmCache<f64>, _: &f64, _| {
            ScalarData::from_vector(cache.points().u.clone())
        })
        .with(BoundaryRole::Interior, |cache: &BasicIlmCache<f64>, _: &f64, _| {
            ScalarData::new(cache.num_points())
        });

    // A point source outside the circle, circling the origin with angular speed `omega`
    let start = VectorData::from_components(vec![1.5], vec![0.0]).unwrap();
    let source = ForcingModel::new(
        ForcingRegion::moving_points(start, |_: &(), t: f64, _, omega: &f64| {
            let angle = omega * t;
            let (x, y) = (1.5 * angle.cos(), 1.5 * angle.sin());
            VectorData::from_components(vec![x], vec![y]).unwrap()
        }),
        |s: &mut DVector<f64>, _: &(), _, _, _: &f64| s.fill(1.0),
    );

    let spec = ProblemSpec::new(grid, bodies, 1.0)
        .with_bcs(bcs)
        .with_forcing(source);

    // Construct the system once: this builds and factorizes the Schur complement
    let mut system = construct_system(DirichletPoisson::new(spec)).unwrap();
    let npts = system.base().num_points();
    println!("Built system with {npts} surface points");
    let ones = ScalarData::from_vec(vec![1.0; npts]);

    // Each solve only needs back substitution
    for step in 0..4 {
        let t = step as f64;
        let solution = DirichletPoisson::solve(&mut system, &t).unwrap();
        let grid = system.base().grid();
        let (i, j) = (grid.nx() / 2, grid.ny() / 2);
        let [x, y] = grid.coordinates(GridLocation::Cell, i, j);
        println!(
            "t = {t}: f({x:.2}, {y:.2}) = {:.4}, total single layer strength {:.4}",
            solution.field[(i, j)],
            system.base().surface_dot(&solution.single_layer, &ones)
        );
    }
}
