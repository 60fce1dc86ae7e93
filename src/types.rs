//! General type definitions
use nalgebra::RealField;
use num::ToPrimitive;
use rustfft::FftNum;

/// Scalar type used by caches and operators.
///
/// Blanket implemented for every real floating point type that both `nalgebra` and
/// `rustfft` support, so both `f32` and `f64` can be used.
pub trait IlmScalar: RealField + Copy + ToPrimitive + FftNum {}
impl<T: RealField + Copy + ToPrimitive + FftNum> IlmScalar for T {}

/// Convert an `f64` constant into the working scalar type
pub(crate) fn real<T: IlmScalar>(value: f64) -> T {
    nalgebra::convert(value)
}

/// Normalization applied to every operator in a cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ScalingMode {
    /// Operators carry the physical grid spacing
    #[default]
    GridScaling,
    /// Operators are dimensionless and use index units
    IndexScaling,
}

/// Location of grid data within a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GridLocation {
    /// Cell centres
    Cell,
    /// Faces normal to the x direction
    XFace,
    /// Faces normal to the y direction
    YFace,
    /// Interior cell corners
    Node,
}

impl GridLocation {
    /// All locations, in the order in which stencils are stored
    pub const ALL: [GridLocation; 4] = [
        GridLocation::Cell,
        GridLocation::XFace,
        GridLocation::YFace,
        GridLocation::Node,
    ];

    /// Offset of the first point of this location from the grid origin, in index units
    pub fn offset(&self) -> [f64; 2] {
        match self {
            GridLocation::Cell => [0.5, 0.5],
            GridLocation::XFace => [0.0, 0.5],
            GridLocation::YFace => [0.5, 0.0],
            GridLocation::Node => [1.0, 1.0],
        }
    }

    /// Number of points in each direction for a grid with `nx` by `ny` cells
    pub fn dims(&self, nx: usize, ny: usize) -> [usize; 2] {
        match self {
            GridLocation::Cell => [nx, ny],
            GridLocation::XFace => [nx + 1, ny],
            GridLocation::YFace => [nx, ny + 1],
            GridLocation::Node => [nx.saturating_sub(1), ny.saturating_sub(1)],
        }
    }
}

/// Role of a boundary condition on an immersed surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoundaryRole {
    /// Data on the exterior side of the surface (the side the normals point into)
    Exterior,
    /// Data on the interior side of the surface
    Interior,
}

/// Error type
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Incompatible sizes when constructing a cache or system
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),
    /// Data passed to an operator does not have the shape the cache expects
    #[error("Shape mismatch for {what}: expected {expected}, found {found}")]
    ShapeMismatch {
        /// Description of the offending argument
        what: &'static str,
        /// Expected length or shape
        expected: String,
        /// Actual length or shape
        found: String,
    },
    /// A Schur complement could not be factorized
    #[error("Singular matrix: {0}")]
    SingularMatrix(String),
    /// A problem requires a boundary condition that has not been supplied
    #[error("Missing boundary condition: {0:?}")]
    MissingBoundaryCondition(BoundaryRole),
    /// Invalid options
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Result type
pub type Result<T> = std::result::Result<T, Error>;

/// Check that a length matches the expected one
pub(crate) fn check_len(what: &'static str, expected: usize, found: usize) -> Result<()> {
    if expected == found {
        Ok(())
    } else {
        Err(Error::ShapeMismatch {
            what,
            expected: expected.to_string(),
            found: found.to_string(),
        })
    }
}

/// Check that a 2D shape matches the expected one
pub(crate) fn check_shape(
    what: &'static str,
    expected: [usize; 2],
    found: (usize, usize),
) -> Result<()> {
    if expected[0] == found.0 && expected[1] == found.1 {
        Ok(())
    } else {
        Err(Error::ShapeMismatch {
            what,
            expected: format!("{}x{}", expected[0], expected[1]),
            found: format!("{}x{}", found.0, found.1),
        })
    }
}
