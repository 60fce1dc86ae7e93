//! Cartesian grids, grid data and grid differential operators

pub mod cartesian;
pub mod data;
pub mod operators;
pub mod poisson;

pub use cartesian::PhysicalGrid;
pub use data::{CellData, FaceData, NodeData, TensorData};
pub use operators::GridOperators;
pub use poisson::{lattice_green, LatticePoisson};
