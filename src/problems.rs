//! Poisson problems with immersed surfaces
//!
//! Both problems solve `L f = q` in the whole domain, where `q` is the sum of the forcing
//! models, with data given on both sides of the immersed surfaces. The field is written as
//! a single layer of strength `sigma` (the jump in normal derivative) plus a double layer
//! of strength `mu` (the jump in value):
//!
//! `f = L^-1 (q + R sigma + D R (n mu))`
//!
//! One of the two strengths follows directly from the boundary data and the other is found
//! from the cached Schur complement.
pub mod dirichlet;
pub mod neumann;

pub use dirichlet::DirichletPoisson;
pub use neumann::NeumannPoisson;

use crate::cache::BasicIlmCache;
use crate::forcing::ForcingCache;
use crate::grid::CellData;
use crate::matrices::SchurSolver;
use crate::surface::ScalarData;
use crate::system::BoundaryConditions;
use crate::types::{real, BoundaryRole, IlmScalar, Result};

/// Solution of a Poisson problem
#[derive(Debug, Clone)]
pub struct PoissonSolution<T: IlmScalar> {
    /// The field at cell centres
    pub field: CellData<T>,
    /// Jump in the normal derivative across the surface
    pub single_layer: ScalarData<T>,
    /// Jump in value across the surface
    pub double_layer: ScalarData<T>,
}

/// Extra cache of the Poisson problems: the factorized Schur complement and work arrays.
#[derive(Debug, Clone)]
pub struct PoissonCache<T: IlmScalar> {
    solver: SchurSolver<T>,
    rhs: CellData<T>,
    correction: CellData<T>,
    surface: ScalarData<T>,
}

impl<T: IlmScalar> PoissonCache<T> {
    fn new(solver: SchurSolver<T>, base: &BasicIlmCache<T>) -> Self {
        Self {
            solver,
            rhs: CellData::new(base.grid()),
            correction: CellData::new(base.grid()),
            surface: ScalarData::new(base.num_points()),
        }
    }

    /// The factorized Schur complement
    pub fn solver(&self) -> &SchurSolver<T> {
        &self.solver
    }
}

/// Jump (exterior minus interior) and mean of the data on the two sides of the surface
fn jump_and_mean<T: IlmScalar, P>(
    bcs: &BoundaryConditions<T, P, ScalarData<T>>,
    base: &BasicIlmCache<T>,
    phys: &P,
    t: T,
) -> Result<(ScalarData<T>, ScalarData<T>)> {
    let n = base.num_points();
    let plus = bcs.evaluate(BoundaryRole::Exterior, base, phys, t)?;
    let minus = bcs.evaluate(BoundaryRole::Interior, base, phys, t)?;
    plus.check(n)?;
    minus.check(n)?;
    let half = real::<T>(0.5);
    Ok((
        ScalarData::from_fn(n, |k| plus[k] - minus[k]),
        ScalarData::from_fn(n, |k| half * (plus[k] + minus[k])),
    ))
}

/// Forcing caches of the Poisson problems
pub type PoissonForcing<T, P> = ForcingCache<T, (), P>;
