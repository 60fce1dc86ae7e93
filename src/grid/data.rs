//! Data stored on a grid
//!
//! Scalar data is stored in a `DMatrix` whose row index is the x index and whose column
//! index is the y index, so the column-major storage of the matrix is the flat index
//! `i + j * nx` used by the regularization stencils.
use crate::grid::PhysicalGrid;
use crate::types::{check_shape, GridLocation, IlmScalar, Result};
use nalgebra::DMatrix;
use std::ops::{Deref, DerefMut};

macro_rules! scalar_grid_data {
    ($name:ident, $location:expr, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq)]
        pub struct $name<T: IlmScalar>(DMatrix<T>);

        impl<T: IlmScalar> $name<T> {
            /// Location of the data
            pub const LOCATION: GridLocation = $location;

            /// Create zero data on a grid
            pub fn new(grid: &PhysicalGrid<T>) -> Self {
                let [m, n] = grid.dims($location);
                Self(DMatrix::zeros(m, n))
            }

            /// Create data by evaluating a function at the physical coordinates of each point
            pub fn from_fn(grid: &PhysicalGrid<T>, f: impl Fn(T, T) -> T) -> Self {
                let [m, n] = grid.dims($location);
                Self(DMatrix::from_fn(m, n, |i, j| {
                    let [x, y] = grid.coordinates($location, i, j);
                    f(x, y)
                }))
            }

            /// Wrap an existing matrix, checking its shape against the grid
            pub fn from_matrix(grid: &PhysicalGrid<T>, data: DMatrix<T>) -> Result<Self> {
                check_shape(stringify!($name), grid.dims($location), data.shape())?;
                Ok(Self(data))
            }

            /// Check that the data is sized for a grid
            pub fn check(&self, grid: &PhysicalGrid<T>) -> Result<()> {
                check_shape(stringify!($name), grid.dims($location), self.0.shape())
            }

            /// Sum of the products of the entries of two fields
            pub fn dot(&self, other: &Self) -> T {
                self.0.dot(&other.0)
            }

            /// Unwrap into the underlying matrix
            pub fn into_inner(self) -> DMatrix<T> {
                self.0
            }
        }

        impl<T: IlmScalar> Deref for $name<T> {
            type Target = DMatrix<T>;
            fn deref(&self) -> &DMatrix<T> {
                &self.0
            }
        }

        impl<T: IlmScalar> DerefMut for $name<T> {
            fn deref_mut(&mut self) -> &mut DMatrix<T> {
                &mut self.0
            }
        }
    };
}

scalar_grid_data!(
    CellData,
    GridLocation::Cell,
    "Scalar data at cell centres."
);
scalar_grid_data!(
    NodeData,
    GridLocation::Node,
    "Scalar data at interior cell corners. Corners on the domain boundary are zero."
);

/// Vector data on cell faces: the x component on x-faces and the y component on y-faces.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceData<T: IlmScalar> {
    /// x component, `(nx + 1) x ny`
    pub u: DMatrix<T>,
    /// y component, `nx x (ny + 1)`
    pub v: DMatrix<T>,
}

impl<T: IlmScalar> FaceData<T> {
    /// Create zero data on a grid
    pub fn new(grid: &PhysicalGrid<T>) -> Self {
        let [mu, nu] = grid.dims(GridLocation::XFace);
        let [mv, nv] = grid.dims(GridLocation::YFace);
        Self {
            u: DMatrix::zeros(mu, nu),
            v: DMatrix::zeros(mv, nv),
        }
    }

    /// Create data by evaluating a vector function at each face
    pub fn from_fn(grid: &PhysicalGrid<T>, f: impl Fn(T, T) -> [T; 2]) -> Self {
        let [mu, nu] = grid.dims(GridLocation::XFace);
        let [mv, nv] = grid.dims(GridLocation::YFace);
        Self {
            u: DMatrix::from_fn(mu, nu, |i, j| {
                let [x, y] = grid.coordinates(GridLocation::XFace, i, j);
                f(x, y)[0]
            }),
            v: DMatrix::from_fn(mv, nv, |i, j| {
                let [x, y] = grid.coordinates(GridLocation::YFace, i, j);
                f(x, y)[1]
            }),
        }
    }

    /// Check that the data is sized for a grid
    pub fn check(&self, grid: &PhysicalGrid<T>) -> Result<()> {
        check_shape("FaceData.u", grid.dims(GridLocation::XFace), self.u.shape())?;
        check_shape("FaceData.v", grid.dims(GridLocation::YFace), self.v.shape())
    }

    /// Set all values to zero
    pub fn fill_zero(&mut self) {
        self.u.fill(T::zero());
        self.v.fill(T::zero());
    }

    /// Sum of the products of the entries of two face fields
    pub fn dot(&self, other: &Self) -> T {
        self.u.dot(&other.u) + self.v.dot(&other.v)
    }
}

/// Symmetric tensor data: diagonal components at cell centres, off-diagonal at interior nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct TensorData<T: IlmScalar> {
    /// xx component, at cell centres
    pub xx: DMatrix<T>,
    /// yy component, at cell centres
    pub yy: DMatrix<T>,
    /// xy (= yx) component, at interior nodes
    pub xy: DMatrix<T>,
}

impl<T: IlmScalar> TensorData<T> {
    /// Create zero data on a grid
    pub fn new(grid: &PhysicalGrid<T>) -> Self {
        let [mc, nc] = grid.dims(GridLocation::Cell);
        let [mn, nn] = grid.dims(GridLocation::Node);
        Self {
            xx: DMatrix::zeros(mc, nc),
            yy: DMatrix::zeros(mc, nc),
            xy: DMatrix::zeros(mn, nn),
        }
    }

    /// Check that the data is sized for a grid
    pub fn check(&self, grid: &PhysicalGrid<T>) -> Result<()> {
        check_shape("TensorData.xx", grid.dims(GridLocation::Cell), self.xx.shape())?;
        check_shape("TensorData.yy", grid.dims(GridLocation::Cell), self.yy.shape())?;
        check_shape("TensorData.xy", grid.dims(GridLocation::Node), self.xy.shape())
    }

    /// Full contraction of two symmetric tensor fields
    pub fn dot(&self, other: &Self) -> T {
        self.xx.dot(&other.xx) + self.yy.dot(&other.yy) + self.xy.dot(&other.xy)
    }
}
