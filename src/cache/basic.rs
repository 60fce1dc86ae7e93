//! The basic immersed layer cache
use crate::cache::{CacheOptions, Regularizer};
use crate::ddf::DdfKind;
use crate::grid::{CellData, FaceData, GridOperators, NodeData, PhysicalGrid, TensorData};
use crate::surface::{BasicBody, Body, BodyList, ScalarData, VectorData};
use crate::types::{Error, IlmScalar, Result, ScalingMode};
use log::{debug, warn};
use std::ops::Deref;
use std::sync::Arc;

/// The immutable part of a cache: geometry, stencils and grid operators.
#[derive(Debug)]
pub struct CacheCore<T: IlmScalar> {
    grid: PhysicalGrid<T>,
    bodies: BodyList<T>,
    scaling: ScalingMode,
    ddf: DdfKind,
    points: VectorData<T>,
    normals: VectorData<T>,
    areas: ScalarData<T>,
    regularizer: Regularizer<T>,
    operators: GridOperators<T>,
}

impl<T: IlmScalar> CacheCore<T> {
    fn new(grid: &PhysicalGrid<T>, bodies: &BodyList<T>, options: &CacheOptions<T>) -> Result<Self> {
        let points = bodies.points();
        if points.is_empty() {
            return Err(Error::DimensionMismatch(
                "cannot build a cache for bodies with no surface points".to_string(),
            ));
        }
        let areas = match options.areas() {
            Some(areas) => {
                if areas.len() != points.len() {
                    return Err(Error::DimensionMismatch(format!(
                        "{} areas given for {} surface points",
                        areas.len(),
                        points.len()
                    )));
                }
                areas.clone()
            }
            None => bodies.arclengths(),
        };
        let outside = (0..points.len())
            .filter(|&k| !grid.contains(points.get(k)))
            .count();
        if outside > 0 {
            warn!(
                "{outside} of {} surface points lie outside the grid; their regularization is truncated",
                points.len()
            );
        }

        let normals = bodies.normals();
        let regularizer =
            Regularizer::new(grid, &points, &areas, options.scaling(), options.ddf())?;
        let operators = GridOperators::new(grid, options.scaling());
        debug!(
            "Built cache for {} points on a {}x{} grid with {:?} and {:?}",
            points.len(),
            grid.nx(),
            grid.ny(),
            options.scaling(),
            options.ddf()
        );
        Ok(Self {
            grid: grid.clone(),
            bodies: bodies.clone(),
            scaling: options.scaling(),
            ddf: options.ddf(),
            points,
            normals,
            areas,
            regularizer,
            operators,
        })
    }
}

/// Preallocated working data, grouped by role.
#[derive(Debug, Clone)]
pub(crate) struct IlmScratch<T: IlmScalar> {
    pub(crate) cells: CellData<T>,
    pub(crate) nodes: NodeData<T>,
    pub(crate) faces: FaceData<T>,
    pub(crate) tensor: TensorData<T>,
    pub(crate) scalar: ScalarData<T>,
    pub(crate) vector: VectorData<T>,
}

impl<T: IlmScalar> IlmScratch<T> {
    fn new(grid: &PhysicalGrid<T>, npts: usize) -> Self {
        Self {
            cells: CellData::new(grid),
            nodes: NodeData::new(grid),
            faces: FaceData::new(grid),
            tensor: TensorData::new(grid),
            scalar: ScalarData::new(npts),
            vector: VectorData::new(npts),
        }
    }
}

/// Cache of everything needed to apply immersed layer operators for a set of bodies on a grid.
///
/// The geometry and operators are shared between forks of a cache, while each fork owns its
/// own scratch data. Operators that use scratch data take the cache mutably, so one cache
/// cannot be used by two solves at once; use [`BasicIlmCache::fork`] to give each thread its
/// own copy.
#[derive(Debug)]
pub struct BasicIlmCache<T: IlmScalar> {
    core: Arc<CacheCore<T>>,
    scratch: IlmScratch<T>,
}

impl<T: IlmScalar> BasicIlmCache<T> {
    /// Build a cache for a list of bodies
    pub fn new(
        grid: &PhysicalGrid<T>,
        bodies: &BodyList<T>,
        options: &CacheOptions<T>,
    ) -> Result<Self> {
        let core = CacheCore::new(grid, bodies, options)?;
        let scratch = IlmScratch::new(grid, core.points.len());
        Ok(Self {
            core: Arc::new(core),
            scratch,
        })
    }

    /// Build a cache for a single body
    pub fn from_body(
        grid: &PhysicalGrid<T>,
        body: impl Body<T> + 'static,
        options: &CacheOptions<T>,
    ) -> Result<Self> {
        Self::new(grid, &BodyList::from_body(body), options)
    }

    /// Build a cache from raw surface points
    pub fn from_points(
        grid: &PhysicalGrid<T>,
        points: VectorData<T>,
        closed: bool,
        options: &CacheOptions<T>,
    ) -> Result<Self> {
        Self::from_body(grid, BasicBody::new(points, closed), options)
    }

    /// A copy sharing this cache's geometry and operators, with its own scratch data
    pub fn fork(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
            scratch: IlmScratch::new(&self.core.grid, self.core.points.len()),
        }
    }

    /// Check if two caches share the same geometry and operators
    pub fn shares_core(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.core, &other.core)
    }

    /// The shared part of the cache
    pub fn core(&self) -> &CacheCore<T> {
        &self.core
    }

    pub(crate) fn split_mut(&mut self) -> (&CacheCore<T>, &mut IlmScratch<T>) {
        (&self.core, &mut self.scratch)
    }
}

impl<T: IlmScalar> Deref for BasicIlmCache<T> {
    type Target = CacheCore<T>;

    fn deref(&self) -> &CacheCore<T> {
        &self.core
    }
}

impl<T: IlmScalar> CacheCore<T> {
    /// The grid
    pub fn grid(&self) -> &PhysicalGrid<T> {
        &self.grid
    }

    /// The bodies
    pub fn bodies(&self) -> &BodyList<T> {
        &self.bodies
    }

    /// Operator normalization
    pub fn scaling(&self) -> ScalingMode {
        self.scaling
    }

    /// Discrete delta function
    pub fn ddf(&self) -> DdfKind {
        self.ddf
    }

    /// Number of surface points
    pub fn num_points(&self) -> usize {
        self.points.len()
    }

    /// Surface point positions
    pub fn points(&self) -> &VectorData<T> {
        &self.points
    }

    /// Outward unit normals
    pub fn normals(&self) -> &VectorData<T> {
        &self.normals
    }

    /// Surface areas (arclengths unless given explicitly)
    pub fn areas(&self) -> &ScalarData<T> {
        &self.areas
    }

    /// Regularization and interpolation stencils
    pub fn regularizer(&self) -> &Regularizer<T> {
        &self.regularizer
    }

    /// Grid differential operators
    pub fn grid_operators(&self) -> &GridOperators<T> {
        &self.operators
    }

    /// Weighted inner product of surface data
    pub fn surface_dot(&self, a: &ScalarData<T>, b: &ScalarData<T>) -> T {
        self.regularizer.surface_dot(a, b)
    }

    /// Weighted inner product of vector surface data
    pub fn surface_vector_dot(&self, a: &VectorData<T>, b: &VectorData<T>) -> T {
        let reg = &self.regularizer;
        reg.surface_dot(&a.u, &b.u) + reg.surface_dot(&a.v, &b.v)
    }

    /// Weighted inner product of cell data
    pub fn grid_dot(&self, a: &CellData<T>, b: &CellData<T>) -> T {
        self.regularizer.grid_weight() * a.dot(b)
    }
}
