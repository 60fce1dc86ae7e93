//! Forcing regions and models
//!
//! A forcing model pairs a region (an area, a line or a set of points) with a function that
//! computes the forcing strength from the state, the time and the physical parameters. The
//! geometric part of a region is built once into a [`RegionCache`]; evaluating a model then
//! only computes strengths and spreads them onto the grid.
use crate::cache::regularization::{grid_weight, weights};
use crate::cache::{BasicIlmCache, CacheOptions, Stencil};
use crate::ddf::DdfKind;
use crate::grid::{CellData, PhysicalGrid};
use crate::operators::mask;
use crate::surface::{Body, BodyList, VectorData};
use crate::types::{GridLocation, IlmScalar, Result, ScalingMode};
use itertools::izip;
use log::debug;
use nalgebra::DVector;
use std::sync::Arc;

/// Function writing forcing strengths in place: `(strength, state, t, region, phys)`.
///
/// The strength has one entry per cell (in storage order) for an area region and one entry
/// per point for line and point regions.
pub type StrengthFn<T, S, P> =
    Box<dyn Fn(&mut DVector<T>, &S, T, &RegionCache<T>, &P) + Send + Sync>;

/// Function giving the current positions of point forcing: `(state, t, region, phys)`
pub type PositionFn<T, S, P> =
    Box<dyn Fn(&S, T, &RegionCache<T>, &P) -> VectorData<T> + Send + Sync>;

/// Shape of an area forcing region
pub enum AreaShape<T: IlmScalar> {
    /// Cells whose centre satisfies a predicate
    Predicate(Box<dyn Fn(T, T) -> bool + Send + Sync>),
    /// The interior of a closed body, as given by its immersed layer mask
    Body(Arc<dyn Body<T>>),
}

/// Where a forcing acts.
pub enum ForcingRegion<T: IlmScalar, S, P> {
    /// Forcing over an area
    Area(AreaShape<T>),
    /// Forcing along a curve
    Line(Arc<dyn Body<T>>),
    /// Forcing at points, optionally moving with time or state
    Point {
        /// Positions of the points when the cache is built
        positions: VectorData<T>,
        /// Function giving the positions at each evaluation
        motion: Option<PositionFn<T, S, P>>,
    },
}

impl<T: IlmScalar, S, P> ForcingRegion<T, S, P> {
    /// Area where a predicate of the coordinates holds
    pub fn area(predicate: impl Fn(T, T) -> bool + Send + Sync + 'static) -> Self {
        Self::Area(AreaShape::Predicate(Box::new(predicate)))
    }

    /// Interior of a body
    pub fn area_of(body: impl Body<T> + 'static) -> Self {
        Self::Area(AreaShape::Body(Arc::new(body)))
    }

    /// Curve given by a body
    pub fn line(body: impl Body<T> + 'static) -> Self {
        Self::Line(Arc::new(body))
    }

    /// Fixed points
    pub fn points(positions: VectorData<T>) -> Self {
        Self::Point {
            positions,
            motion: None,
        }
    }

    /// Points whose positions are recomputed at every evaluation
    pub fn moving_points(
        positions: VectorData<T>,
        motion: impl Fn(&S, T, &RegionCache<T>, &P) -> VectorData<T> + Send + Sync + 'static,
    ) -> Self {
        Self::Point {
            positions,
            motion: Some(Box::new(motion)),
        }
    }
}

/// A forcing region with its strength function.
pub struct ForcingModel<T: IlmScalar, S, P> {
    region: ForcingRegion<T, S, P>,
    strength: StrengthFn<T, S, P>,
}

impl<T: IlmScalar, S, P> ForcingModel<T, S, P> {
    /// Create a model
    pub fn new(
        region: ForcingRegion<T, S, P>,
        strength: impl Fn(&mut DVector<T>, &S, T, &RegionCache<T>, &P) + Send + Sync + 'static,
    ) -> Self {
        Self {
            region,
            strength: Box::new(strength),
        }
    }

    /// The region
    pub fn region(&self) -> &ForcingRegion<T, S, P> {
        &self.region
    }
}

/// Precomputed geometry of a forcing region.
#[derive(Debug, Clone)]
pub enum RegionCache<T: IlmScalar> {
    /// Area forcing
    Area {
        /// Indicator of the region at cell centres
        mask: CellData<T>,
        /// x coordinates of the cell centres
        x: CellData<T>,
        /// y coordinates of the cell centres
        y: CellData<T>,
    },
    /// Line forcing
    Line {
        /// Points of the curve
        points: VectorData<T>,
        /// Cell stencil of the curve
        stencil: Stencil<T>,
        /// Surface weight of each point
        weights: DVector<T>,
    },
    /// Point forcing
    Point {
        /// Current positions
        positions: VectorData<T>,
        /// Cell stencil of the current positions
        stencil: Stencil<T>,
    },
}

impl<T: IlmScalar> RegionCache<T> {
    /// Length of the strength vector of this region
    pub fn strength_len(&self) -> usize {
        match self {
            RegionCache::Area { mask, .. } => mask.len(),
            RegionCache::Line { points, .. } => points.len(),
            RegionCache::Point { positions, .. } => positions.len(),
        }
    }

    /// Cell centre coordinates, for area regions
    pub fn coordinates(&self) -> Option<(&CellData<T>, &CellData<T>)> {
        match self {
            RegionCache::Area { x, y, .. } => Some((x, y)),
            _ => None,
        }
    }

    /// Point positions, for line and point regions
    pub fn positions(&self) -> Option<&VectorData<T>> {
        match self {
            RegionCache::Area { .. } => None,
            RegionCache::Line { points, .. } => Some(points),
            RegionCache::Point { positions, .. } => Some(positions),
        }
    }
}

/// A forcing model with the cached geometry of its region.
pub struct ForcingCache<T: IlmScalar, S, P> {
    model: Arc<ForcingModel<T, S, P>>,
    region: RegionCache<T>,
    grid: PhysicalGrid<T>,
    ddf: DdfKind,
    grid_weight: T,
    strength: DVector<T>,
}

impl<T: IlmScalar, S, P> ForcingCache<T, S, P> {
    /// Build the region cache of a model on the grid of a base cache
    pub fn new(model: Arc<ForcingModel<T, S, P>>, base: &BasicIlmCache<T>) -> Result<Self> {
        let grid = base.grid().clone();
        let scaling = base.scaling();
        let ddf = base.ddf();
        let region = match model.region() {
            ForcingRegion::Area(shape) => {
                let mask = match shape {
                    AreaShape::Predicate(predicate) => CellData::from_fn(&grid, |x, y| {
                        if predicate(x, y) {
                            T::one()
                        } else {
                            T::zero()
                        }
                    }),
                    AreaShape::Body(body) => body_mask(&grid, body, scaling, ddf)?,
                };
                RegionCache::Area {
                    mask,
                    x: CellData::from_fn(&grid, |x, _| x),
                    y: CellData::from_fn(&grid, |_, y| y),
                }
            }
            ForcingRegion::Line(body) => {
                let points = body.points();
                let areas = body.arclengths().into_inner();
                let (weights, _) = weights(&grid, scaling, &areas);
                RegionCache::Line {
                    stencil: Stencil::new(&grid, GridLocation::Cell, &points, ddf),
                    points,
                    weights,
                }
            }
            ForcingRegion::Point { positions, .. } => RegionCache::Point {
                stencil: Stencil::new(&grid, GridLocation::Cell, positions, ddf),
                positions: positions.clone(),
            },
        };
        debug!(
            "Built forcing region cache with {} strength values",
            region.strength_len()
        );
        Ok(Self {
            strength: DVector::zeros(region.strength_len()),
            model,
            region,
            grid_weight: grid_weight(&grid, scaling),
            grid,
            ddf,
        })
    }

    /// The cached region
    pub fn region(&self) -> &RegionCache<T> {
        &self.region
    }

    /// The strengths from the last evaluation
    pub fn strength(&self) -> &DVector<T> {
        &self.strength
    }

    /// Evaluate the model and add the forcing to `out`
    pub fn apply(&mut self, out: &mut CellData<T>, state: &S, t: T, phys: &P) -> Result<()> {
        out.check(&self.grid)?;
        let model = Arc::clone(&self.model);
        if let ForcingRegion::Point {
            motion: Some(motion),
            ..
        } = model.region()
        {
            // Moving points need a fresh stencil at every evaluation
            let positions = motion(state, t, &self.region, phys);
            self.region = RegionCache::Point {
                stencil: Stencil::new(&self.grid, GridLocation::Cell, &positions, self.ddf),
                positions,
            };
        }

        let len = self.region.strength_len();
        if self.strength.len() == len {
            self.strength.fill(T::zero());
        } else {
            self.strength = DVector::zeros(len);
        }
        (model.strength)(&mut self.strength, state, t, &self.region, phys);

        let scale = T::one() / self.grid_weight;
        match &self.region {
            RegionCache::Area { mask, .. } => {
                for (o, &m, &s) in izip!(out.iter_mut(), mask.iter(), self.strength.iter()) {
                    *o += m * s;
                }
                Ok(())
            }
            RegionCache::Line {
                stencil, weights, ..
            } => stencil.spread_add(out, &self.strength, weights, scale),
            RegionCache::Point { stencil, .. } => {
                let ones = DVector::from_element(len, T::one());
                stencil.spread_add(out, &self.strength, &ones, scale)
            }
        }
    }
}

fn body_mask<T: IlmScalar>(
    grid: &PhysicalGrid<T>,
    body: &Arc<dyn Body<T>>,
    scaling: ScalingMode,
    ddf: DdfKind,
) -> Result<CellData<T>> {
    let mut bodies = BodyList::new();
    bodies.push_shared(Arc::clone(body));
    let mut options = CacheOptions::default();
    options.set_scaling(scaling);
    options.set_ddf(ddf);
    let mut cache = BasicIlmCache::new(grid, &bodies, &options)?;
    let mut out = CellData::new(grid);
    mask(&mut out, &mut cache)?;
    Ok(out)
}

/// Evaluate every forcing model and add the results to `out`.
///
/// Unlike the surface operators this accumulates, so that several models can act on the
/// same field.
pub fn apply_forcing<T: IlmScalar, S, P>(
    out: &mut CellData<T>,
    state: &S,
    t: T,
    caches: &mut [ForcingCache<T, S, P>],
    phys: &P,
) -> Result<()> {
    for cache in caches.iter_mut() {
        cache.apply(out, state, t, phys)?;
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::surface::{Circle, Plate};
    use approx::assert_relative_eq;

    fn base() -> BasicIlmCache<f64> {
        let grid = PhysicalGrid::from_limits([-1.0, 1.0], [-1.0, 1.0], 0.05).unwrap();
        BasicIlmCache::from_body(
            &grid,
            Circle::new([0.0, 0.0], 0.4, 34),
            &CacheOptions::default(),
        )
        .unwrap()
    }

    fn integral(field: &CellData<f64>, grid: &PhysicalGrid<f64>) -> f64 {
        field.sum() * grid.cell_area()
    }

    fn centroid_x(field: &CellData<f64>, grid: &PhysicalGrid<f64>) -> f64 {
        let x = CellData::from_fn(grid, |x, _| x);
        field.dot(&x) / field.sum()
    }

    #[test]
    fn test_point_source() {
        let base = base();
        let positions = VectorData::from_components(vec![0.13], vec![-0.21]).unwrap();
        let model = ForcingModel::new(
            ForcingRegion::points(positions),
            |s: &mut DVector<f64>, _: &(), _, _, _: &()| s.fill(1.0),
        );
        let mut caches = vec![ForcingCache::new(Arc::new(model), &base).unwrap()];
        let mut out = CellData::new(base.grid());
        apply_forcing(&mut out, &(), 0.0, &mut caches, &()).unwrap();
        assert_relative_eq!(integral(&out, base.grid()), 1.0, epsilon = 1e-12);
        assert_relative_eq!(centroid_x(&out, base.grid()), 0.13, epsilon = 1e-12);

        apply_forcing(&mut out, &(), 0.0, &mut caches, &()).unwrap();
        assert_relative_eq!(integral(&out, base.grid()), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_moving_point_source() {
        let base = base();
        let start = VectorData::from_components(vec![0.0], vec![0.0]).unwrap();
        let model = ForcingModel::new(
            ForcingRegion::moving_points(start, |_: &(), t: f64, _, phys: &f64| {
                VectorData::from_components(vec![phys * t], vec![0.0]).unwrap()
            }),
            |s: &mut DVector<f64>, _: &(), _, _, _: &f64| s.fill(1.0),
        );
        let mut caches = vec![ForcingCache::new(Arc::new(model), &base).unwrap()];

        let mut out = CellData::new(base.grid());
        apply_forcing(&mut out, &(), 0.0, &mut caches, &0.1).unwrap();
        assert_relative_eq!(centroid_x(&out, base.grid()), 0.0, epsilon = 1e-12);

        let mut out = CellData::new(base.grid());
        apply_forcing(&mut out, &(), 2.0, &mut caches, &0.1).unwrap();
        assert_relative_eq!(centroid_x(&out, base.grid()), 0.2, epsilon = 1e-12);
        let positions = caches[0].region().positions().unwrap();
        assert_relative_eq!(positions.u[0], 0.2);
    }

    #[test]
    fn test_area_forcing() {
        let base = base();
        let model = ForcingModel::new(
            ForcingRegion::area(|x: f64, y: f64| x * x + y * y < 0.25),
            |s: &mut DVector<f64>, _: &(), t: f64, _, _: &()| s.fill(2.0 * t),
        );
        let mut caches = vec![ForcingCache::new(Arc::new(model), &base).unwrap()];
        let mut out = CellData::new(base.grid());
        apply_forcing(&mut out, &(), 1.0, &mut caches, &()).unwrap();
        let expected = CellData::from_fn(base.grid(), |x, y| {
            if x * x + y * y < 0.25 {
                2.0
            } else {
                0.0
            }
        });
        assert_eq!(out, expected);
    }

    #[test]
    fn test_area_forcing_uses_coordinates() {
        let base = base();
        let model = ForcingModel::new(
            ForcingRegion::area(|_: f64, _: f64| true),
            |s: &mut DVector<f64>, _: &(), _, region: &RegionCache<f64>, _: &()| {
                if let Some((x, _)) = region.coordinates() {
                    s.copy_from_slice(x.as_slice());
                }
            },
        );
        let mut caches = vec![ForcingCache::new(Arc::new(model), &base).unwrap()];
        let mut out = CellData::new(base.grid());
        apply_forcing(&mut out, &(), 0.0, &mut caches, &()).unwrap();
        assert_eq!(out, CellData::from_fn(base.grid(), |x, _| x));
    }

    #[test]
    fn test_body_area_forcing_matches_mask() {
        let mut base = base();
        let model = ForcingModel::new(
            ForcingRegion::area_of(Circle::new([0.0, 0.0], 0.4, 34)),
            |s: &mut DVector<f64>, _: &(), _, _, _: &()| s.fill(1.0),
        );
        let mut caches = vec![ForcingCache::new(Arc::new(model), &base).unwrap()];
        let mut out = CellData::new(base.grid());
        apply_forcing(&mut out, &(), 0.0, &mut caches, &()).unwrap();

        let mut expected = CellData::new(base.grid());
        mask(&mut expected, &mut base).unwrap();
        assert_relative_eq!(*out, *expected, epsilon = 1e-12);
    }

    #[test]
    fn test_line_forcing() {
        let base = base();
        let model = ForcingModel::new(
            ForcingRegion::line(Plate::new([-0.5, 0.1], [0.5, 0.1], 31)),
            |s: &mut DVector<f64>, _: &(), _, _, _: &()| s.fill(3.0),
        );
        let mut caches = vec![ForcingCache::new(Arc::new(model), &base).unwrap()];
        let mut out = CellData::new(base.grid());
        apply_forcing(&mut out, &(), 0.0, &mut caches, &()).unwrap();
        assert_relative_eq!(integral(&out, base.grid()), 3.0, epsilon = 1e-10);
    }

    #[test]
    fn test_index_scaled_point_source() {
        let grid = PhysicalGrid::from_limits([-1.0, 1.0], [-1.0, 1.0], 0.05).unwrap();
        let mut options = CacheOptions::default();
        options.set_scaling(ScalingMode::IndexScaling);
        let base =
            BasicIlmCache::from_body(&grid, Circle::new([0.0, 0.0], 0.4, 34), &options).unwrap();
        let positions = VectorData::from_components(vec![0.3, -0.3], vec![0.0, 0.2]).unwrap();
        let model = ForcingModel::new(
            ForcingRegion::points(positions),
            |s: &mut DVector<f64>, _: &(), _, _, _: &()| s.fill(0.5),
        );
        let mut caches = vec![ForcingCache::new(Arc::new(model), &base).unwrap()];
        let mut out = CellData::new(&grid);
        apply_forcing(&mut out, &(), 0.0, &mut caches, &()).unwrap();
        assert_relative_eq!(out.sum(), 1.0, epsilon = 1e-12);
    }
}
