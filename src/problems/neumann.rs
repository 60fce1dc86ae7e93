//! Poisson problem with Neumann data on both sides of the surface
use super::{jump_and_mean, PoissonCache, PoissonSolution};
use crate::cache::BasicIlmCache;
use crate::forcing::apply_forcing;
use crate::grid::CellData;
use crate::matrices::{create_nclinvctn, SchurSolver};
use crate::operators::{
    inverse_laplacian, regularize, surface_divergence_normal, surface_grad_normal,
};
use crate::surface::ScalarData;
use crate::system::{IlmProblem, IlmSystem, ProblemSpec};
use crate::types::{BoundaryRole, IlmScalar, Result};
use log::debug;
use nalgebra::DMatrix;

/// Poisson problem `L f = q` with the outward normal derivative of `f` given on the
/// exterior and interior sides of the surface.
///
/// The single layer is the jump in normal derivative. The double layer is found so that the
/// mean normal derivative of the field, with the jump of the double layer removed, matches
/// the mean of the data. On the unbounded grid the gradient of a double layer potential
/// splits as `G L^-1 D R (n mu) = R (n mu) + C L_n^-1 C^T R (n mu)`; the first term is the
/// smeared jump itself, so the Schur complement is `n . E C L_n^-1 C^T R n`.
///
/// On a closed body the field inside is only fixed up to a constant, and constants are in
/// the near null space of the Schur complement. The weighted mean of the double layer on
/// each closed body is set to zero.
pub struct NeumannPoisson<T: IlmScalar, P = ()> {
    spec: ProblemSpec<T, P, (), ScalarData<T>>,
}

impl<T: IlmScalar, P> NeumannPoisson<T, P> {
    /// Create the problem
    pub fn new(spec: ProblemSpec<T, P, (), ScalarData<T>>) -> Self {
        Self { spec }
    }
}

/// Subtract `alpha w_b w_b^T` for every closed body `b`, where `w_b` holds the surface
/// weights of that body's points
fn pin_closed_bodies<T: IlmScalar>(matrix: &mut DMatrix<T>, base: &BasicIlmCache<T>) {
    let weights = base.regularizer().surface_weights();
    let scale = matrix.amax();
    let bodies = base.bodies();
    for (b, range) in bodies.ranges().into_iter().enumerate() {
        if !bodies.body(b).is_closed() || range.is_empty() {
            continue;
        }
        let w = weights.rows(range.start, range.len());
        let alpha = scale / w.norm_squared();
        let mut block = matrix.view_mut((range.start, range.start), (range.len(), range.len()));
        block -= (&w * w.transpose()) * alpha;
        debug!("Pinned the mean double layer on body {b}");
    }
}

impl<T: IlmScalar, P> IlmProblem<T> for NeumannPoisson<T, P> {
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
        let mut matrix = create_nclinvctn(base)?;
        pin_closed_bodies(&mut matrix, base);
        let solver = SchurSolver::factorize(matrix)?;
        Ok(PoissonCache::new(solver, base))
    }

    fn solve(system: &mut IlmSystem<T, Self>, t: &T) -> Result<PoissonSolution<T>> {
        let t = *t;
        let (problem, base, cache, forcing) = system.split_mut();
        let spec = problem.spec();
        let n = base.num_points();
        let (single_layer, mean) = jump_and_mean(&spec.bcs, base, &spec.phys, t)?;

        regularize(&mut cache.rhs, &single_layer, base)?;
        apply_forcing(&mut cache.rhs, &(), t, forcing, &spec.phys)?;
        let mut field = CellData::new(base.grid());
        inverse_laplacian(&mut field, &cache.rhs, base)?;

        surface_grad_normal(&mut cache.surface, &field, base)?;
        let residual = &*mean - &*cache.surface;
        let weighted = residual.component_mul(base.regularizer().surface_weights());
        let mut double_layer = ScalarData::new(n);
        cache.solver.solve(&mut double_layer, &weighted)?;
        surface_divergence_normal(&mut cache.rhs, &double_layer, base)?;
        inverse_laplacian(&mut cache.correction, &cache.rhs, base)?;
        *field += &*cache.correction;
        debug!(
            "Solved Neumann problem at t = {t:?}, surface residual {:e}",
            residual.norm().to_f64().unwrap_or(f64::NAN)
        );

        Ok(PoissonSolution {
            field,
            single_layer,
            double_layer,
        })
    }
}
