//! Uniform Cartesian grid
use crate::types::{real, Error, GridLocation, IlmScalar, Result};

/// A uniform two dimensional Cartesian grid with `nx` by `ny` square cells.
///
/// The grid does not own any data. Caches keep a copy of it and grid data is sized from it.
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicalGrid<T: IlmScalar> {
    nx: usize,
    ny: usize,
    dx: T,
    origin: [T; 2],
}

impl<T: IlmScalar> PhysicalGrid<T> {
    /// Create a grid from the number of cells, the cell size and the lower left corner
    pub fn new(nx: usize, ny: usize, dx: T, origin: [T; 2]) -> Result<Self> {
        if nx < 2 || ny < 2 {
            return Err(Error::DimensionMismatch(format!(
                "a grid needs at least 2x2 cells, got {nx}x{ny}"
            )));
        }
        if dx <= T::zero() {
            return Err(Error::Configuration(format!(
                "grid spacing must be positive, got {dx}"
            )));
        }
        Ok(Self { nx, ny, dx, origin })
    }

    /// Create the smallest grid with spacing `dx` that covers the given limits
    pub fn from_limits(xlim: [T; 2], ylim: [T; 2], dx: T) -> Result<Self> {
        if dx <= T::zero() {
            return Err(Error::Configuration(format!(
                "grid spacing must be positive, got {dx}"
            )));
        }
        let count = |lim: [T; 2]| {
            ((lim[1] - lim[0]) / dx - real::<T>(1e-8))
                .ceil()
                .to_usize()
                .unwrap_or(0)
        };
        Self::new(count(xlim), count(ylim), dx, [xlim[0], ylim[0]])
    }

    /// Number of cells in the x direction
    pub fn nx(&self) -> usize {
        self.nx
    }

    /// Number of cells in the y direction
    pub fn ny(&self) -> usize {
        self.ny
    }

    /// Cell size
    pub fn dx(&self) -> T {
        self.dx
    }

    /// Lower left corner
    pub fn origin(&self) -> [T; 2] {
        self.origin
    }

    /// Extent in the x direction
    pub fn xlim(&self) -> [T; 2] {
        [
            self.origin[0],
            self.origin[0] + self.dx * real::<T>(self.nx as f64),
        ]
    }

    /// Extent in the y direction
    pub fn ylim(&self) -> [T; 2] {
        [
            self.origin[1],
            self.origin[1] + self.dx * real::<T>(self.ny as f64),
        ]
    }

    /// Area of one cell
    pub fn cell_area(&self) -> T {
        self.dx * self.dx
    }

    /// Number of points of data stored at a location
    pub fn dims(&self, location: GridLocation) -> [usize; 2] {
        location.dims(self.nx, self.ny)
    }

    /// Physical coordinates of point `(i, j)` of a location
    pub fn coordinates(&self, location: GridLocation, i: usize, j: usize) -> [T; 2] {
        let offset = location.offset();
        [
            self.origin[0] + self.dx * (real::<T>(i as f64) + real::<T>(offset[0])),
            self.origin[1] + self.dx * (real::<T>(j as f64) + real::<T>(offset[1])),
        ]
    }

    /// Check if a point lies within the grid extents
    pub fn contains(&self, point: [T; 2]) -> bool {
        let xlim = self.xlim();
        let ylim = self.ylim();
        point[0] >= xlim[0] && point[0] <= xlim[1] && point[1] >= ylim[0] && point[1] <= ylim[1]
    }
}
