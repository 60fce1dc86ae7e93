//! Discrete differential operators on a staggered grid
//!
//! Cell data is treated as zero outside the grid and node data as zero on the domain
//! boundary. With these conventions the operators form adjoint pairs under the plain sum
//! inner product: `divergence = -grad^T`, `rot = curl^T` and
//! `tensor_divergence = -tensor_grad^T`.
//!
//! The inverse Laplacians solve on the unbounded grid, so the fields they return are not
//! affected by the edges of the domain.
use crate::grid::{CellData, FaceData, LatticePoisson, NodeData, PhysicalGrid, TensorData};
use crate::types::{IlmScalar, Result, ScalingMode};
use nalgebra::DMatrix;

/// Value of cell-centred data, zero outside the grid
#[inline]
fn cell_value<T: IlmScalar>(f: &DMatrix<T>, i: isize, j: isize) -> T {
    if i < 0 || j < 0 || i >= f.nrows() as isize || j >= f.ncols() as isize {
        T::zero()
    } else {
        f[(i as usize, j as usize)]
    }
}

/// Value of node data at corner `(a, b)`, counting corners from the grid origin
#[inline]
fn corner_value<T: IlmScalar>(f: &DMatrix<T>, a: usize, b: usize) -> T {
    if a == 0 || b == 0 || a > f.nrows() || b > f.ncols() {
        T::zero()
    } else {
        f[(a - 1, b - 1)]
    }
}

/// Grid differential operators for one grid and scaling.
#[derive(Debug, Clone)]
pub struct GridOperators<T: IlmScalar> {
    grid: PhysicalGrid<T>,
    h: T,
    cell_poisson: LatticePoisson<T>,
    node_poisson: LatticePoisson<T>,
}

impl<T: IlmScalar> GridOperators<T> {
    /// Create the operators; the stencil spacing is `dx` under grid scaling and 1 under index scaling
    pub fn new(grid: &PhysicalGrid<T>, scaling: ScalingMode) -> Self {
        let h = match scaling {
            ScalingMode::GridScaling => grid.dx(),
            ScalingMode::IndexScaling => T::one(),
        };
        let (nx, ny) = (grid.nx(), grid.ny());
        Self {
            grid: grid.clone(),
            h,
            cell_poisson: LatticePoisson::new(nx, ny, h),
            node_poisson: LatticePoisson::new(nx - 1, ny - 1, h),
        }
    }

    /// The grid
    pub fn grid(&self) -> &PhysicalGrid<T> {
        &self.grid
    }

    /// Stencil spacing
    pub fn spacing(&self) -> T {
        self.h
    }

    /// Divergence of face data, stored at cell centres
    pub fn divergence(&self, out: &mut CellData<T>, q: &FaceData<T>) -> Result<()> {
        out.check(&self.grid)?;
        q.check(&self.grid)?;
        let (nx, ny) = (self.grid.nx(), self.grid.ny());
        for j in 0..ny {
            for i in 0..nx {
                out[(i, j)] =
                    (q.u[(i + 1, j)] - q.u[(i, j)] + q.v[(i, j + 1)] - q.v[(i, j)]) / self.h;
            }
        }
        Ok(())
    }

    /// Gradient of cell data, stored on faces
    pub fn grad(&self, out: &mut FaceData<T>, f: &CellData<T>) -> Result<()> {
        out.check(&self.grid)?;
        f.check(&self.grid)?;
        let f: &DMatrix<T> = f;
        let (nx, ny) = (self.grid.nx() as isize, self.grid.ny() as isize);
        for j in 0..ny {
            for i in 0..=nx {
                out.u[(i as usize, j as usize)] =
                    (cell_value(f, i, j) - cell_value(f, i - 1, j)) / self.h;
            }
        }
        for j in 0..=ny {
            for i in 0..nx {
                out.v[(i as usize, j as usize)] =
                    (cell_value(f, i, j) - cell_value(f, i, j - 1)) / self.h;
            }
        }
        Ok(())
    }

    /// Curl of node data (a streamfunction), stored on faces
    pub fn curl(&self, out: &mut FaceData<T>, psi: &NodeData<T>) -> Result<()> {
        out.check(&self.grid)?;
        psi.check(&self.grid)?;
        let psi: &DMatrix<T> = psi;
        let (nx, ny) = (self.grid.nx(), self.grid.ny());
        for j in 0..ny {
            for i in 0..=nx {
                out.u[(i, j)] = (corner_value(psi, i, j + 1) - corner_value(psi, i, j)) / self.h;
            }
        }
        for j in 0..=ny {
            for i in 0..nx {
                out.v[(i, j)] = -(corner_value(psi, i + 1, j) - corner_value(psi, i, j)) / self.h;
            }
        }
        Ok(())
    }

    /// Curl of face data (a vorticity), stored at interior nodes
    pub fn rot(&self, out: &mut NodeData<T>, q: &FaceData<T>) -> Result<()> {
        out.check(&self.grid)?;
        q.check(&self.grid)?;
        let (mx, my) = out.shape();
        for b in 1..=my {
            for a in 1..=mx {
                out[(a - 1, b - 1)] = (q.v[(a, b)] - q.v[(a - 1, b)] - q.u[(a, b)]
                    + q.u[(a, b - 1)])
                    / self.h;
            }
        }
        Ok(())
    }

    /// Laplacian of cell data, zero outside the grid
    pub fn laplacian(&self, out: &mut CellData<T>, f: &CellData<T>) -> Result<()> {
        out.check(&self.grid)?;
        f.check(&self.grid)?;
        self.cell_poisson.apply(out, f);
        Ok(())
    }

    /// Inverse Laplacian of cell data on the unbounded grid
    pub fn inverse_laplacian(&self, out: &mut CellData<T>, rhs: &CellData<T>) -> Result<()> {
        out.check(&self.grid)?;
        rhs.check(&self.grid)?;
        self.cell_poisson.solve(out, rhs);
        Ok(())
    }

    /// Laplacian of node data
    pub fn laplacian_nodes(&self, out: &mut NodeData<T>, f: &NodeData<T>) -> Result<()> {
        out.check(&self.grid)?;
        f.check(&self.grid)?;
        self.node_poisson.apply(out, f);
        Ok(())
    }

    /// Inverse Laplacian of node data
    pub fn inverse_laplacian_nodes(&self, out: &mut NodeData<T>, rhs: &NodeData<T>) -> Result<()> {
        out.check(&self.grid)?;
        rhs.check(&self.grid)?;
        self.node_poisson.solve(out, rhs);
        Ok(())
    }

    /// Divergence of a symmetric tensor field, stored on faces
    pub fn tensor_divergence(&self, out: &mut FaceData<T>, t: &TensorData<T>) -> Result<()> {
        out.check(&self.grid)?;
        t.check(&self.grid)?;
        let (nx, ny) = (self.grid.nx(), self.grid.ny());
        for j in 0..ny {
            for i in 0..=nx {
                let (ii, jj) = (i as isize, j as isize);
                out.u[(i, j)] = (cell_value(&t.xx, ii, jj) - cell_value(&t.xx, ii - 1, jj)
                    + corner_value(&t.xy, i, j + 1)
                    - corner_value(&t.xy, i, j))
                    / self.h;
            }
        }
        for j in 0..=ny {
            for i in 0..nx {
                let (ii, jj) = (i as isize, j as isize);
                out.v[(i, j)] = (corner_value(&t.xy, i + 1, j) - corner_value(&t.xy, i, j)
                    + cell_value(&t.yy, ii, jj)
                    - cell_value(&t.yy, ii, jj - 1))
                    / self.h;
            }
        }
        Ok(())
    }

    /// Symmetric gradient of face data; the xy component holds `du/dy + dv/dx`
    pub fn tensor_grad(&self, out: &mut TensorData<T>, q: &FaceData<T>) -> Result<()> {
        out.check(&self.grid)?;
        q.check(&self.grid)?;
        let (nx, ny) = (self.grid.nx(), self.grid.ny());
        for j in 0..ny {
            for i in 0..nx {
                out.xx[(i, j)] = (q.u[(i + 1, j)] - q.u[(i, j)]) / self.h;
                out.yy[(i, j)] = (q.v[(i, j + 1)] - q.v[(i, j)]) / self.h;
            }
        }
        let (mx, my) = out.xy.shape();
        for b in 1..=my {
            for a in 1..=mx {
                out.xy[(a - 1, b - 1)] = (q.u[(a, b)] - q.u[(a, b - 1)] + q.v[(a, b)]
                    - q.v[(a - 1, b)])
                    / self.h;
            }
        }
        Ok(())
    }
}
