//! Regularization and interpolation between surface points and grid data
use crate::ddf::DdfKind;
use crate::grid::PhysicalGrid;
use crate::surface::VectorData;
use crate::types::{check_len, check_shape, real, GridLocation, IlmScalar, Result, ScalingMode};
use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::{CooMatrix, CsrMatrix};

/// Sparse matrix of discrete delta function values between surface points and the points of
/// one grid location.
///
/// Entry `(g, k)` is the tensor product kernel evaluated at the offset, in index units,
/// between grid point `g` and surface point `k`. Grid points are numbered `i + j * m`,
/// matching the storage order of grid data.
#[derive(Debug, Clone)]
pub struct Stencil<T: IlmScalar> {
    location: GridLocation,
    dims: [usize; 2],
    matrix: CsrMatrix<T>,
    transpose: CsrMatrix<T>,
    clipped: usize,
}

impl<T: IlmScalar> Stencil<T> {
    /// Build the stencil for a set of points
    pub fn new(
        grid: &PhysicalGrid<T>,
        location: GridLocation,
        points: &VectorData<T>,
        ddf: DdfKind,
    ) -> Self {
        let dims = grid.dims(location);
        let npts = points.len();
        let support = real::<T>(ddf.support());
        let offset = location.offset();
        let origin = grid.origin();
        let dx = grid.dx();

        let mut coo = CooMatrix::new(dims[0] * dims[1], npts);
        let mut clipped = 0;
        for k in 0..npts {
            // Position of the point in the index space of this location
            let xi = (points.u[k] - origin[0]) / dx - real::<T>(offset[0]);
            let eta = (points.v[k] - origin[1]) / dx - real::<T>(offset[1]);
            let (ilo, ihi, xcut) = index_range(xi, support, dims[0]);
            let (jlo, jhi, ycut) = index_range(eta, support, dims[1]);
            if xcut || ycut {
                clipped += 1;
            }
            for j in jlo..jhi {
                let wy = ddf.evaluate(real::<T>(j as f64) - eta);
                if wy == T::zero() {
                    continue;
                }
                for i in ilo..ihi {
                    let wx = ddf.evaluate(real::<T>(i as f64) - xi);
                    if wx != T::zero() {
                        coo.push(i + j * dims[0], k, wx * wy);
                    }
                }
            }
        }
        if clipped > 0 {
            log::debug!(
                "{clipped} of {npts} points have {location:?} stencils cut by the grid boundary"
            );
        }

        let matrix = CsrMatrix::from(&coo);
        let transpose = matrix.transpose();
        Self {
            location,
            dims,
            matrix,
            transpose,
            clipped,
        }
    }

    /// Grid location of the stencil
    pub fn location(&self) -> GridLocation {
        self.location
    }

    /// Number of surface points
    pub fn num_points(&self) -> usize {
        self.matrix.ncols()
    }

    /// Number of points whose stencil was cut by the grid boundary
    pub fn num_clipped(&self) -> usize {
        self.clipped
    }

    /// The stencil matrix, grid points by surface points
    pub fn matrix(&self) -> &CsrMatrix<T> {
        &self.matrix
    }

    /// The transpose of the stencil matrix
    pub fn transpose(&self) -> &CsrMatrix<T> {
        &self.transpose
    }

    fn check(&self, grid_data: (usize, usize), surface_len: usize) -> Result<()> {
        check_shape("grid data", self.dims, grid_data)?;
        check_len("surface data", self.num_points(), surface_len)
    }

    fn spread_impl(
        &self,
        out: &mut DMatrix<T>,
        f: &DVector<T>,
        weights: &DVector<T>,
        scale: T,
        accumulate: bool,
    ) -> Result<()> {
        self.check(out.shape(), f.len())?;
        check_len("surface weights", self.num_points(), weights.len())?;
        let values = out.as_mut_slice();
        for (g, row) in self.matrix.row_iter().enumerate() {
            let mut sum = T::zero();
            for (&k, &w) in row.col_indices().iter().zip(row.values()) {
                sum += w * weights[k] * f[k];
            }
            if accumulate {
                values[g] += scale * sum;
            } else {
                values[g] = scale * sum;
            }
        }
        Ok(())
    }

    /// Overwrite `out` with `scale * K diag(weights) f`
    pub fn spread(
        &self,
        out: &mut DMatrix<T>,
        f: &DVector<T>,
        weights: &DVector<T>,
        scale: T,
    ) -> Result<()> {
        self.spread_impl(out, f, weights, scale, false)
    }

    /// Add `scale * K diag(weights) f` to `out`
    pub fn spread_add(
        &self,
        out: &mut DMatrix<T>,
        f: &DVector<T>,
        weights: &DVector<T>,
        scale: T,
    ) -> Result<()> {
        self.spread_impl(out, f, weights, scale, true)
    }

    /// Overwrite `out` with `K^T g`
    pub fn gather(&self, out: &mut DVector<T>, g: &DMatrix<T>) -> Result<()> {
        self.check(g.shape(), out.len())?;
        let values = g.as_slice();
        for (k, row) in self.transpose.row_iter().enumerate() {
            out[k] = row
                .col_indices()
                .iter()
                .zip(row.values())
                .fold(T::zero(), |acc, (&i, &w)| acc + w * values[i]);
        }
        Ok(())
    }
}

/// Grid indices within the support of a kernel centred at `centre`, clipped to `0..n`, and
/// whether any were cut off
fn index_range<T: IlmScalar>(centre: T, support: T, n: usize) -> (usize, usize, bool) {
    let lo = (centre - support).ceil().to_isize().unwrap_or(0);
    let hi = (centre + support).floor().to_isize().unwrap_or(-1) + 1;
    let cut = lo < 0 || hi > n as isize;
    let clip = |i: isize| i.clamp(0, n as isize) as usize;
    (clip(lo), clip(hi).max(clip(lo)), cut)
}

/// Weights that make regularization and interpolation adjoint.
///
/// Regularization is `R = K diag(w_s) / w_g` and interpolation is `E = K^T`, where `w_s`
/// is the surface weight of each point and `w_g` the weight of one grid point. Then
/// `sum(w_g * (R f) * g) = sum(w_s * f * (E g))`.
pub fn weights<T: IlmScalar>(
    grid: &PhysicalGrid<T>,
    scaling: ScalingMode,
    areas: &DVector<T>,
) -> (DVector<T>, T) {
    match scaling {
        ScalingMode::GridScaling => (areas.clone(), grid_weight(grid, scaling)),
        ScalingMode::IndexScaling => (areas / grid.dx(), grid_weight(grid, scaling)),
    }
}

/// Weight of one grid point: the cell area, or one in index units
pub fn grid_weight<T: IlmScalar>(grid: &PhysicalGrid<T>, scaling: ScalingMode) -> T {
    match scaling {
        ScalingMode::GridScaling => grid.cell_area(),
        ScalingMode::IndexScaling => T::one(),
    }
}

/// Regularization and interpolation for every grid location.
#[derive(Debug, Clone)]
pub struct Regularizer<T: IlmScalar> {
    stencils: [Stencil<T>; 4],
    surface_weights: DVector<T>,
    grid_weight: T,
}

fn location_index(location: GridLocation) -> usize {
    match location {
        GridLocation::Cell => 0,
        GridLocation::XFace => 1,
        GridLocation::YFace => 2,
        GridLocation::Node => 3,
    }
}

impl<T: IlmScalar> Regularizer<T> {
    /// Build stencils at all locations for a set of points with the given areas
    pub fn new(
        grid: &PhysicalGrid<T>,
        points: &VectorData<T>,
        areas: &DVector<T>,
        scaling: ScalingMode,
        ddf: DdfKind,
    ) -> Result<Self> {
        check_len("surface areas", points.len(), areas.len())?;
        let stencils = GridLocation::ALL.map(|location| Stencil::new(grid, location, points, ddf));
        let (surface_weights, grid_weight) = weights(grid, scaling, areas);
        Ok(Self {
            stencils,
            surface_weights,
            grid_weight,
        })
    }

    /// Stencil for a grid location
    pub fn stencil(&self, location: GridLocation) -> &Stencil<T> {
        &self.stencils[location_index(location)]
    }

    /// Surface weight of each point
    pub fn surface_weights(&self) -> &DVector<T> {
        &self.surface_weights
    }

    /// Weight of one grid point
    pub fn grid_weight(&self) -> T {
        self.grid_weight
    }

    /// Surface inner product
    pub fn surface_dot(&self, a: &DVector<T>, b: &DVector<T>) -> T {
        a.iter()
            .zip(b.iter())
            .zip(self.surface_weights.iter())
            .fold(T::zero(), |acc, ((&x, &y), &w)| acc + x * y * w)
    }

    /// Regularize surface data onto a grid location, overwriting `out`
    pub fn regularize(
        &self,
        location: GridLocation,
        out: &mut DMatrix<T>,
        f: &DVector<T>,
    ) -> Result<()> {
        self.stencil(location)
            .spread(out, f, &self.surface_weights, T::one() / self.grid_weight)
    }

    /// Interpolate grid data at a location onto the surface, overwriting `out`
    pub fn interpolate(
        &self,
        location: GridLocation,
        out: &mut DVector<T>,
        g: &DMatrix<T>,
    ) -> Result<()> {
        self.stencil(location).gather(out, g)
    }
}
