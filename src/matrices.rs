//! Matrix operator builders
//!
//! Composite operators on surface data are materialized column by column, by applying them
//! to unit vectors. Columns are computed in parallel; each worker thread owns a fork of the
//! cache so that scratch data is never shared.
use crate::cache::BasicIlmCache;
use crate::grid::{CellData, FaceData, NodeData};
use crate::operators::{
    interpolate, interpolate_vector, inverse_laplacian, normal_interpolate, regularize,
    regularize_normal, regularize_vector, surface_divergence_normal, surface_grad_normal,
};
use crate::surface::{ScalarData, VectorData};
use crate::types::{check_len, Error, GridLocation, IlmScalar, Result};
use log::debug;
use nalgebra::{DMatrix, DVector, Dyn, LU};
use nalgebra_sparse::CsrMatrix;
use rayon::prelude::*;

/// Per-thread data used while assembling columns
struct ColumnWorker<T: IlmScalar> {
    cache: BasicIlmCache<T>,
    scalar: ScalarData<T>,
    vector: VectorData<T>,
    cells: [CellData<T>; 2],
    nodes: [NodeData<T>; 2],
    faces: FaceData<T>,
}

impl<T: IlmScalar> ColumnWorker<T> {
    fn new(cache: &BasicIlmCache<T>) -> Self {
        let grid = cache.grid();
        let n = cache.num_points();
        Self {
            cache: cache.fork(),
            scalar: ScalarData::new(n),
            vector: VectorData::new(n),
            cells: [CellData::new(grid), CellData::new(grid)],
            nodes: [NodeData::new(grid), NodeData::new(grid)],
            faces: FaceData::new(grid),
        }
    }

    /// Set the scalar input to unit vector `k`
    fn unit_scalar(&mut self, k: usize) {
        self.scalar.fill(T::zero());
        self.scalar[k] = T::one();
    }

    /// Set the vector input to unit vector `k` of the stacked components
    fn unit_vector(&mut self, k: usize) {
        let n = self.vector.len();
        self.vector.fill_zero();
        if k < n {
            self.vector.u[k] = T::one();
        } else {
            self.vector.v[k - n] = T::one();
        }
    }
}

fn assemble_columns<T, F>(
    cache: &BasicIlmCache<T>,
    name: &str,
    ncols: usize,
    column: F,
) -> Result<DMatrix<T>>
where
    T: IlmScalar,
    F: Fn(&mut ColumnWorker<T>, usize) -> Result<DVector<T>> + Sync + Send,
{
    debug!(
        "Assembling {name} with {ncols} columns on a {}x{} grid",
        cache.grid().nx(),
        cache.grid().ny()
    );
    let columns = (0..ncols)
        .into_par_iter()
        .map_init(|| ColumnWorker::new(cache), |worker, k| column(worker, k))
        .collect::<Result<Vec<_>>>()?;
    Ok(DMatrix::from_columns(&columns))
}

/// Multiply row `k` of a matrix by surface weight `k`, repeating the weights for every
/// block of rows
fn weigh_rows<T: IlmScalar>(mut matrix: DMatrix<T>, weights: &DVector<T>) -> DMatrix<T> {
    let n = weights.len();
    for (k, mut row) in matrix.row_iter_mut().enumerate() {
        row *= weights[k % n];
    }
    matrix
}

/// Assemble `W E L^-1 R`, the single layer Schur complement of the Dirichlet problem.
///
/// `W` is the diagonal of surface weights, which makes the matrix symmetric. Right hand
/// sides must be weighted the same way before solving.
pub fn create_rtlinvr<T: IlmScalar>(cache: &BasicIlmCache<T>) -> Result<DMatrix<T>> {
    let n = cache.num_points();
    let matrix = assemble_columns(cache, "E L^-1 R", n, |w, k| {
        w.unit_scalar(k);
        let [rhs, field] = &mut w.cells;
        regularize(rhs, &w.scalar, &w.cache)?;
        inverse_laplacian(field, rhs, &w.cache)?;
        let mut out = ScalarData::new(n);
        interpolate(&mut out, field, &w.cache)?;
        Ok(out.into_inner())
    })?;
    Ok(weigh_rows(matrix, cache.regularizer().surface_weights()))
}

/// Assemble `W E C L_n^-1 C^T R` acting on stacked vector surface data `[u; v]`.
///
/// This is the Schur complement of a streamfunction problem with vector surface data. It
/// is symmetric and negative semi-definite.
pub fn create_clinvct<T: IlmScalar>(cache: &BasicIlmCache<T>) -> Result<DMatrix<T>> {
    let n = cache.num_points();
    let matrix = assemble_columns(cache, "E C L^-1 C^T R", 2 * n, |w, k| {
        w.unit_vector(k);
        let ops = w.cache.grid_operators();
        let [vorticity, streamfunction] = &mut w.nodes;
        regularize_vector(&mut w.faces, &w.vector, &w.cache)?;
        ops.rot(vorticity, &w.faces)?;
        ops.inverse_laplacian_nodes(streamfunction, vorticity)?;
        ops.curl(&mut w.faces, streamfunction)?;
        let mut out = VectorData::new(n);
        interpolate_vector(&mut out, &w.faces, &w.cache)?;
        Ok(out.stacked())
    })?;
    Ok(weigh_rows(matrix, cache.regularizer().surface_weights()))
}

/// Assemble `W n . E G L^-1 D R n`, the double layer Schur complement.
///
/// The matrix is symmetric and positive semi-definite. The gradient is sampled across the
/// jump of the double layer, so it includes the smeared jump `W n . E R n` as well as the
/// normal derivative of the potential; see [`create_nclinvctn`].
pub fn create_glinvd<T: IlmScalar>(cache: &BasicIlmCache<T>) -> Result<DMatrix<T>> {
    let n = cache.num_points();
    let matrix = assemble_columns(cache, "n.E G L^-1 D R n", n, |w, k| {
        w.unit_scalar(k);
        let [rhs, field] = &mut w.cells;
        surface_divergence_normal(rhs, &w.scalar, &mut w.cache)?;
        inverse_laplacian(field, rhs, &w.cache)?;
        let mut out = ScalarData::new(n);
        surface_grad_normal(&mut out, field, &mut w.cache)?;
        Ok(out.into_inner())
    })?;
    Ok(weigh_rows(matrix, cache.regularizer().surface_weights()))
}

/// Assemble `W n . E C L_n^-1 C^T R n`, the normal derivative of a double layer potential
/// on the surface.
///
/// On the unbounded grid `G L^-1 D q = q + C L_n^-1 C^T q`, so this is the gradient of the
/// double layer potential with the jump removed, which is continuous across the surface.
/// The matrix is symmetric and negative semi-definite; a constant on a closed body is in
/// its near null space.
pub fn create_nclinvctn<T: IlmScalar>(cache: &BasicIlmCache<T>) -> Result<DMatrix<T>> {
    let n = cache.num_points();
    let matrix = assemble_columns(cache, "n.E C L^-1 C^T R n", n, |w, k| {
        w.unit_scalar(k);
        let [vorticity, streamfunction] = &mut w.nodes;
        regularize_normal(&mut w.faces, &w.scalar, &mut w.cache)?;
        let ops = w.cache.grid_operators();
        ops.rot(vorticity, &w.faces)?;
        ops.inverse_laplacian_nodes(streamfunction, vorticity)?;
        ops.curl(&mut w.faces, streamfunction)?;
        let mut out = ScalarData::new(n);
        normal_interpolate(&mut out, &w.faces, &mut w.cache)?;
        Ok(out.into_inner())
    })?;
    Ok(weigh_rows(matrix, cache.regularizer().surface_weights()))
}

/// Low pass filter of surface data, `C = diag(1 / rowsum(M)) M` where `M = K^T K` is the
/// overlap of the cell stencils of the surface points.
///
/// Rows of the filter sum to one, so constants are preserved, while data that oscillates
/// from point to point is damped.
#[derive(Debug, Clone)]
pub struct SurfaceFilter<T: IlmScalar> {
    matrix: CsrMatrix<T>,
}

impl<T: IlmScalar> SurfaceFilter<T> {
    /// The filter matrix
    pub fn matrix(&self) -> &CsrMatrix<T> {
        &self.matrix
    }

    /// Apply the filter once, overwriting `out`
    pub fn apply(&self, out: &mut ScalarData<T>, f: &ScalarData<T>) -> Result<()> {
        check_len("filter input", self.matrix.ncols(), f.len())?;
        check_len("filter output", self.matrix.nrows(), out.len())?;
        for (k, row) in self.matrix.row_iter().enumerate() {
            out[k] = row
                .col_indices()
                .iter()
                .zip(row.values())
                .fold(T::zero(), |acc, (&j, &c)| acc + c * f[j]);
        }
        Ok(())
    }

    /// Apply the filter `power` times, overwriting `out`
    pub fn apply_power(
        &self,
        out: &mut ScalarData<T>,
        f: &ScalarData<T>,
        power: usize,
    ) -> Result<()> {
        if power == 0 {
            return Err(Error::Configuration(
                "a filter must be applied at least once".to_string(),
            ));
        }
        self.apply(out, f)?;
        let mut work = out.clone();
        for _ in 1..power {
            std::mem::swap(out, &mut work);
            self.apply(out, &work)?;
        }
        Ok(())
    }

    /// Apply the filter to each component of vector data, overwriting `out`
    pub fn apply_vector(&self, out: &mut VectorData<T>, f: &VectorData<T>) -> Result<()> {
        out.check(f.len())?;
        let mut filtered = ScalarData::new(f.len());
        self.apply(&mut filtered, &ScalarData::from_vector(f.u.clone()))?;
        out.u.copy_from(&*filtered);
        self.apply(&mut filtered, &ScalarData::from_vector(f.v.clone()))?;
        out.v.copy_from(&*filtered);
        Ok(())
    }
}

/// Build the surface filter of a cache from its cell stencil
pub fn create_surface_filter<T: IlmScalar>(cache: &BasicIlmCache<T>) -> Result<SurfaceFilter<T>> {
    let stencil = cache.regularizer().stencil(GridLocation::Cell);
    let mut matrix = stencil.transpose() * stencil.matrix();
    for mut row in matrix.row_iter_mut() {
        let total = row.values().iter().fold(T::zero(), |acc, &v| acc + v);
        if total > T::zero() {
            for value in row.values_mut() {
                *value /= total;
            }
        }
    }
    debug!("Built surface filter with {} nonzeros", matrix.nnz());
    Ok(SurfaceFilter { matrix })
}

/// A factorized Schur complement.
///
/// Factorizing once and solving by back substitution makes repeated solves cheap.
#[derive(Debug, Clone)]
pub struct SchurSolver<T: IlmScalar> {
    lu: LU<T, Dyn, Dyn>,
    size: usize,
}

impl<T: IlmScalar> SchurSolver<T> {
    /// Factorize a square matrix
    pub fn factorize(matrix: DMatrix<T>) -> Result<Self> {
        let (rows, cols) = matrix.shape();
        if rows != cols {
            return Err(Error::DimensionMismatch(format!(
                "a Schur complement must be square, got {rows}x{cols}"
            )));
        }
        let lu = matrix.lu();
        if !lu.is_invertible() {
            return Err(Error::SingularMatrix(format!(
                "the {rows}x{rows} Schur complement has a zero pivot"
            )));
        }
        Ok(Self { lu, size: rows })
    }

    /// Size of the system
    pub fn size(&self) -> usize {
        self.size
    }

    /// Solve `S out = rhs`, overwriting `out`
    pub fn solve(&self, out: &mut DVector<T>, rhs: &DVector<T>) -> Result<()> {
        check_len("Schur complement right hand side", self.size, rhs.len())?;
        check_len("Schur complement solution", self.size, out.len())?;
        out.copy_from(rhs);
        if self.lu.solve_mut(out) {
            Ok(())
        } else {
            Err(Error::SingularMatrix(
                "back substitution failed".to_string(),
            ))
        }
    }
}
