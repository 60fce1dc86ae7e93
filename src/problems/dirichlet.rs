//! Poisson problem with Dirichlet data on both sides of the surface
use super::{jump_and_mean, PoissonCache, PoissonSolution};
use crate::cache::BasicIlmCache;
use crate::forcing::apply_forcing;
use crate::grid::CellData;
use crate::matrices::{create_rtlinvr, SchurSolver};
use crate::operators::{interpolate, inverse_laplacian, regularize, surface_divergence_normal};
use crate::surface::ScalarData;
use crate::system::{IlmProblem, IlmSystem, ProblemSpec};
use crate::types::{BoundaryRole, IlmScalar, Result};
use log::debug;

/// Poisson problem `L f = q` with `f` given on the exterior and interior sides of the
/// surface.
///
/// The jump in value is known, so the double layer follows from the data. The single layer
/// is chosen so that the mean of the two sides, interpolated onto the surface, matches the
/// mean of the data; this needs the Schur complement `E L^-1 R`, stored weighted by the
/// surface areas.
pub struct DirichletPoisson<T: IlmScalar, P = ()> {
    spec: ProblemSpec<T, P, (), ScalarData<T>>,
}

impl<T: IlmScalar, P> DirichletPoisson<T, P> {
    /// Create the problem
    pub fn new(spec: ProblemSpec<T, P, (), ScalarData<T>>) -> Self {
        Self { spec }
    }
}

impl<T: IlmScalar, P> IlmProblem<T> for DirichletPoisson<T, P> {
    type Phys = P;
    type State = ();
    type BcData = ScalarData<T>;
    type ExtraCache = PoissonCache<T>;
    type CallData = T;
    type Solution = PoissonSolution<T>;

    const REQUIRED_BCS: &'static [BoundaryRole] =
        &[BoundaryRole::Exterior, BoundaryRole::Interior];

    fn spec(&self) -> &ProblemSpec<T, P, (), ScalarData<T>> {
        &self.spec
    }

    fn spec_mut(&mut self) -> &mut ProblemSpec<T, P, (), ScalarData<T>> {
        &mut self.spec
    }

    fn prob_cache(
        _spec: &ProblemSpec<T, P, (), ScalarData<T>>,
        base: &mut BasicIlmCache<T>,
    ) -> Result<PoissonCache<T>> {
        let solver = SchurSolver::factorize(create_rtlinvr(base)?)?;
        Ok(PoissonCache::new(solver, base))
    }

    fn solve(system: &mut IlmSystem<T, Self>, t: &T) -> Result<PoissonSolution<T>> {
        let t = *t;
        let (problem, base, cache, forcing) = system.split_mut();
        let spec = problem.spec();
        let n = base.num_points();
        let (jump, mean) = jump_and_mean(&spec.bcs, base, &spec.phys, t)?;

        // Field with the right jump, ignoring the single layer
        surface_divergence_normal(&mut cache.rhs, &jump, base)?;
        apply_forcing(&mut cache.rhs, &(), t, forcing, &spec.phys)?;
        let mut field = CellData::new(base.grid());
        inverse_laplacian(&mut field, &cache.rhs, base)?;

        // Single layer that corrects the mean on the surface
        interpolate(&mut cache.surface, &field, base)?;
        let residual = &*mean - &*cache.surface;
        let weighted = residual.component_mul(base.regularizer().surface_weights());
        let mut single_layer = ScalarData::new(n);
        cache.solver.solve(&mut single_layer, &weighted)?;
        regularize(&mut cache.rhs, &single_layer, base)?;
        inverse_laplacian(&mut cache.correction, &cache.rhs, base)?;
        *field += &*cache.correction;
        debug!(
            "Solved Dirichlet problem at t = {t:?}, surface residual {:e}",
            residual.norm().to_f64().unwrap_or(f64::NAN)
        );

        Ok(PoissonSolution {
            field,
            single_layer,
            double_layer: jump,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cache::CacheOptions;
    use crate::grid::PhysicalGrid;
    use crate::surface::{BodyList, Circle};
    use crate::system::{construct_system, BoundaryConditions};
    use crate::types::GridLocation;
    use approx::assert_relative_eq;

    const RADIUS: f64 = 0.75;

    fn system(
        data: impl Fn(f64, f64) -> f64 + Send + Sync + Copy + 'static,
    ) -> IlmSystem<f64, DirichletPoisson<f64>> {
        two_sided_system(data, data)
    }

    fn side(
        data: impl Fn(f64, f64) -> f64 + Send + Sync + Copy + 'static,
    ) -> impl Fn(&BasicIlmCache<f64>, &(), f64) -> ScalarData<f64> + Send + Sync + 'static {
        move |cache: &BasicIlmCache<f64>, _: &(), _: f64| {
            let points = cache.points();
            ScalarData::from_fn(points.len(), |k| data(points.u[k], points.v[k]))
        }
    }

    fn two_sided_system(
        exterior: impl Fn(f64, f64) -> f64 + Send + Sync + Copy + 'static,
        interior: impl Fn(f64, f64) -> f64 + Send + Sync + Copy + 'static,
    ) -> IlmSystem<f64, DirichletPoisson<f64>> {
        let grid = PhysicalGrid::from_limits([-1.5, 1.5], [-1.5, 1.5], 0.05).unwrap();
        let bodies = BodyList::from_body(Circle::with_spacing([0.0, 0.0], RADIUS, 0.075));
        let bcs = BoundaryConditions::new()
            .with(BoundaryRole::Exterior, side(exterior))
            .with(BoundaryRole::Interior, side(interior));
        let spec = ProblemSpec::new(grid, bodies, ())
            .with_options(CacheOptions::default())
            .with_bcs(bcs);
        construct_system(DirichletPoisson::new(spec)).unwrap()
    }

    /// Cell values of a solution in an annulus
    fn cells_between(
        system: &IlmSystem<f64, DirichletPoisson<f64>>,
        field: &CellData<f64>,
        r_min: f64,
        r_max: f64,
    ) -> Vec<(f64, f64, f64)> {
        let grid = system.base().grid();
        let [m, n] = grid.dims(GridLocation::Cell);
        let mut values = vec![];
        for j in 0..n {
            for i in 0..m {
                let [x, y] = grid.coordinates(GridLocation::Cell, i, j);
                let r = (x * x + y * y).sqrt();
                if r >= r_min && r < r_max {
                    values.push((x, y, field[(i, j)]));
                }
            }
        }
        values
    }

    #[test]
    fn test_surface_mean_matches_data() {
        let mut system = system(|x, y| x * x - y);
        let solution = DirichletPoisson::solve(&mut system, &0.0).unwrap();
        let mut on_surface = ScalarData::new(system.base().num_points());
        interpolate(&mut on_surface, &solution.field, system.base()).unwrap();
        let points = system.base().points();
        for k in 0..points.len() {
            let expected = points.u[k] * points.u[k] - points.v[k];
            assert_relative_eq!(on_surface[k], expected, epsilon = 1e-8);
        }
        assert!(solution.double_layer.iter().all(|&mu| mu == 0.0));
    }

    #[test]
    fn test_repeated_solves_agree() {
        let mut system = system(|x, _| x);
        let first = DirichletPoisson::solve(&mut system, &0.0).unwrap();
        let second = DirichletPoisson::solve(&mut system, &0.0).unwrap();
        assert_eq!(first.field, second.field);
        assert_eq!(first.single_layer, second.single_layer);
    }

    #[test]
    fn test_linear_data_is_reproduced_inside() {
        let mut system = system(|x, y| 1.0 + x - 0.5 * y);
        let solution = DirichletPoisson::solve(&mut system, &0.0).unwrap();
        let grid = system.base().grid();
        let [m, n] = grid.dims(GridLocation::Cell);
        for j in 0..n {
            for i in 0..m {
                let [x, y] = grid.coordinates(GridLocation::Cell, i, j);
                if x * x + y * y < 0.2 {
                    let expected = 1.0 + x - 0.5 * y;
                    assert_relative_eq!(solution.field[(i, j)], expected, epsilon = 0.05);
                }
            }
        }
    }

    #[test]
    fn test_exterior_field_decays() {
        let mut system = system(|x, _| x);
        let solution = DirichletPoisson::solve(&mut system, &0.0).unwrap();
        let outside = cells_between(&system, &solution.field, 1.0, 1.4);
        assert!(!outside.is_empty());
        for (x, y, f) in outside {
            let expected = RADIUS * RADIUS * x / (x * x + y * y);
            assert_relative_eq!(f, expected, epsilon = 0.05);
        }
    }

    #[test]
    fn test_jump_in_value() {
        // x outside and zero inside: the double layer carries the whole jump
        let mut system = two_sided_system(|x, _| x, |_, _| 0.0);
        let solution = DirichletPoisson::solve(&mut system, &0.0).unwrap();
        let points = system.base().points();
        for k in 0..points.len() {
            assert_relative_eq!(solution.double_layer[k], points.u[k], epsilon = 1e-12);
        }

        for (_, _, f) in cells_between(&system, &solution.field, 0.0, 0.45) {
            assert!(f.abs() < 0.05, "interior value {f}");
        }
        for (x, y, f) in cells_between(&system, &solution.field, 1.0, 1.4) {
            let expected = RADIUS * RADIUS * x / (x * x + y * y);
            assert_relative_eq!(f, expected, epsilon = 0.05);
        }
    }
}
