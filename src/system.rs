//! Problems and systems
//!
//! A problem is a [`ProblemSpec`] plus an implementation of [`IlmProblem`], which says how
//! to build the problem specific extra cache and how to solve. [`construct_system`] builds
//! the basic immersed layer cache, the extra cache and the forcing caches once; the
//! resulting [`IlmSystem`] is then solved repeatedly with different call data.
use crate::cache::{BasicIlmCache, CacheOptions};
use crate::forcing::{ForcingCache, ForcingModel};
use crate::grid::PhysicalGrid;
use crate::surface::BodyList;
use crate::types::{BoundaryRole, Error, IlmScalar, Result};
use log::info;
use std::collections::HashMap;
use std::sync::Arc;

/// Boundary condition function: `(cache, phys, t) -> data`
pub type BcFn<T, P, D> = dyn Fn(&BasicIlmCache<T>, &P, T) -> D + Send + Sync;

/// Per-step update of the bodies and physical parameters: `(bodies, phys, t)`
pub type StepUpdateFn<T, P> = dyn Fn(&mut BodyList<T>, &mut P, T) + Send + Sync;

/// Boundary conditions keyed by the side of the surface they apply to.
pub struct BoundaryConditions<T: IlmScalar, P, D> {
    conditions: HashMap<BoundaryRole, Arc<BcFn<T, P, D>>>,
}

impl<T: IlmScalar, P, D> Default for BoundaryConditions<T, P, D> {
    fn default() -> Self {
        Self {
            conditions: HashMap::new(),
        }
    }
}

impl<T: IlmScalar, P, D> Clone for BoundaryConditions<T, P, D> {
    fn clone(&self) -> Self {
        Self {
            conditions: self.conditions.clone(),
        }
    }
}

impl<T: IlmScalar, P, D> BoundaryConditions<T, P, D> {
    /// No boundary conditions
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a condition, builder style
    pub fn with(
        mut self,
        role: BoundaryRole,
        condition: impl Fn(&BasicIlmCache<T>, &P, T) -> D + Send + Sync + 'static,
    ) -> Self {
        self.insert(role, condition);
        self
    }

    /// Add or replace a condition
    pub fn insert(
        &mut self,
        role: BoundaryRole,
        condition: impl Fn(&BasicIlmCache<T>, &P, T) -> D + Send + Sync + 'static,
    ) {
        self.conditions.insert(role, Arc::new(condition));
    }

    /// The condition for a role
    pub fn get(&self, role: BoundaryRole) -> Option<&BcFn<T, P, D>> {
        self.conditions.get(&role).map(|c| c.as_ref())
    }

    /// Check if a condition is given for a role
    pub fn contains(&self, role: BoundaryRole) -> bool {
        self.conditions.contains_key(&role)
    }

    /// Evaluate the condition for a role
    pub fn evaluate(
        &self,
        role: BoundaryRole,
        cache: &BasicIlmCache<T>,
        phys: &P,
        t: T,
    ) -> Result<D> {
        self.get(role)
            .map(|condition| condition(cache, phys, t))
            .ok_or(Error::MissingBoundaryCondition(role))
    }
}

/// Everything that defines a problem apart from its kind.
pub struct ProblemSpec<T: IlmScalar, P, S, D> {
    /// Grid
    pub grid: PhysicalGrid<T>,
    /// Immersed bodies
    pub bodies: BodyList<T>,
    /// Options of the basic cache
    pub options: CacheOptions<T>,
    /// Boundary conditions
    pub bcs: BoundaryConditions<T, P, D>,
    /// Forcing models
    pub forcing: Vec<Arc<ForcingModel<T, S, P>>>,
    /// Physical parameters
    pub phys: P,
    /// Update applied by [`advance`]
    pub step_update: Option<Arc<StepUpdateFn<T, P>>>,
}

impl<T: IlmScalar, P, S, D> ProblemSpec<T, P, S, D> {
    /// A problem with default options and no boundary conditions or forcing
    pub fn new(grid: PhysicalGrid<T>, bodies: BodyList<T>, phys: P) -> Self {
        Self {
            grid,
            bodies,
            options: CacheOptions::default(),
            bcs: BoundaryConditions::new(),
            forcing: vec![],
            phys,
            step_update: None,
        }
    }

    /// Set the cache options
    pub fn with_options(mut self, options: CacheOptions<T>) -> Self {
        self.options = options;
        self
    }

    /// Set the boundary conditions
    pub fn with_bcs(mut self, bcs: BoundaryConditions<T, P, D>) -> Self {
        self.bcs = bcs;
        self
    }

    /// Add a forcing model
    pub fn with_forcing(mut self, model: ForcingModel<T, S, P>) -> Self {
        self.forcing.push(Arc::new(model));
        self
    }

    /// Set the per-step update
    pub fn with_step_update(
        mut self,
        update: impl Fn(&mut BodyList<T>, &mut P, T) + Send + Sync + 'static,
    ) -> Self {
        self.step_update = Some(Arc::new(update));
        self
    }
}

/// A kind of problem: how to build its extra cache and how to solve it.
pub trait IlmProblem<T: IlmScalar>: Sized {
    /// Physical parameters
    type Phys;
    /// State passed to forcing models
    type State;
    /// Data returned by boundary condition functions
    type BcData;
    /// Problem specific cached data
    type ExtraCache;
    /// Data given to each solve
    type CallData;
    /// Result of a solve
    type Solution;

    /// Boundary conditions that must be supplied
    const REQUIRED_BCS: &'static [BoundaryRole];

    /// The problem definition
    fn spec(&self) -> &ProblemSpec<T, Self::Phys, Self::State, Self::BcData>;

    /// The problem definition, mutably
    fn spec_mut(&mut self) -> &mut ProblemSpec<T, Self::Phys, Self::State, Self::BcData>;

    /// Build the extra cache from the problem and its basic cache
    fn prob_cache(
        spec: &ProblemSpec<T, Self::Phys, Self::State, Self::BcData>,
        base: &mut BasicIlmCache<T>,
    ) -> Result<Self::ExtraCache>;

    /// Solve the problem.
    ///
    /// Only scratch data is written; cached operators and matrices are left unchanged, so
    /// repeated calls with the same data give the same result.
    fn solve(system: &mut IlmSystem<T, Self>, data: &Self::CallData) -> Result<Self::Solution>;
}

/// Forcing cache of a problem kind
pub type ProblemForcing<T, Pr> =
    ForcingCache<T, <Pr as IlmProblem<T>>::State, <Pr as IlmProblem<T>>::Phys>;

/// A problem with all of its cached data.
///
/// One system must not be solved from two threads at once, since solves share its scratch
/// data.
pub struct IlmSystem<T: IlmScalar, Pr: IlmProblem<T>> {
    problem: Pr,
    base: BasicIlmCache<T>,
    extra: Pr::ExtraCache,
    forcing: Vec<ProblemForcing<T, Pr>>,
}

impl<T: IlmScalar, Pr: IlmProblem<T>> IlmSystem<T, Pr> {
    /// The problem
    pub fn problem(&self) -> &Pr {
        &self.problem
    }

    /// The problem definition
    pub fn spec(&self) -> &ProblemSpec<T, Pr::Phys, Pr::State, Pr::BcData> {
        self.problem.spec()
    }

    /// Physical parameters
    pub fn phys(&self) -> &Pr::Phys {
        &self.problem.spec().phys
    }

    /// The basic immersed layer cache
    pub fn base(&self) -> &BasicIlmCache<T> {
        &self.base
    }

    /// The extra cache
    pub fn extra(&self) -> &Pr::ExtraCache {
        &self.extra
    }

    /// Forcing caches, in the order of the problem's forcing models
    pub fn forcing(&self) -> &[ProblemForcing<T, Pr>] {
        &self.forcing
    }

    /// Borrow the parts of the system separately
    #[allow(clippy::type_complexity)]
    pub fn split_mut(
        &mut self,
    ) -> (
        &Pr,
        &mut BasicIlmCache<T>,
        &mut Pr::ExtraCache,
        &mut [ProblemForcing<T, Pr>],
    ) {
        (
            &self.problem,
            &mut self.base,
            &mut self.extra,
            &mut self.forcing,
        )
    }

    /// Evaluate a boundary condition at time `t`
    pub fn boundary_data(&self, role: BoundaryRole, t: T) -> Result<Pr::BcData> {
        let spec = self.problem.spec();
        spec.bcs.evaluate(role, &self.base, &spec.phys, t)
    }

    /// Take back the problem, discarding the cached data
    pub fn into_problem(self) -> Pr {
        self.problem
    }
}

/// Build the caches of a problem.
///
/// Fails with [`Error::MissingBoundaryCondition`] before any cache is built if a required
/// boundary condition is missing.
pub fn construct_system<T: IlmScalar, Pr: IlmProblem<T>>(problem: Pr) -> Result<IlmSystem<T, Pr>> {
    let spec = problem.spec();
    if let Some(role) = Pr::REQUIRED_BCS
        .iter()
        .find(|role| !spec.bcs.contains(**role))
    {
        return Err(Error::MissingBoundaryCondition(*role));
    }
    let mut base = BasicIlmCache::new(&spec.grid, &spec.bodies, &spec.options)?;
    let extra = Pr::prob_cache(spec, &mut base)?;
    let forcing = spec
        .forcing
        .iter()
        .map(|model| ForcingCache::new(Arc::clone(model), &base))
        .collect::<Result<Vec<_>>>()?;
    info!(
        "Constructed system with {} bodies, {} surface points and {} forcing models on a {}x{} grid",
        spec.bodies.len(),
        base.num_points(),
        forcing.len(),
        spec.grid.nx(),
        spec.grid.ny()
    );
    Ok(IlmSystem {
        problem,
        base,
        extra,
        forcing,
    })
}

/// Rebuild a system after the bodies or the physical parameters change.
///
/// The old system is consumed; everything is rebuilt from the updated problem.
pub fn update_system<T: IlmScalar, Pr: IlmProblem<T>>(
    system: IlmSystem<T, Pr>,
    bodies: Option<BodyList<T>>,
    phys: Option<Pr::Phys>,
) -> Result<IlmSystem<T, Pr>> {
    let mut problem = system.into_problem();
    let spec = problem.spec_mut();
    if let Some(bodies) = bodies {
        spec.bodies = bodies;
    }
    if let Some(phys) = phys {
        spec.phys = phys;
    }
    construct_system(problem)
}

/// Apply the problem's per-step update at time `t` and rebuild the system.
///
/// Without a per-step update the system is returned unchanged.
pub fn advance<T: IlmScalar, Pr: IlmProblem<T>>(
    system: IlmSystem<T, Pr>,
    t: T,
) -> Result<IlmSystem<T, Pr>> {
    let Some(update) = system.spec().step_update.clone() else {
        return Ok(system);
    };
    let mut problem = system.into_problem();
    let spec = problem.spec_mut();
    update(&mut spec.bodies, &mut spec.phys, t);
    construct_system(problem)
}
