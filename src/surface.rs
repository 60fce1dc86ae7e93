//! Immersed surfaces and data stored on them

pub mod body;
pub mod data;

pub use body::{BasicBody, Body, BodyList, Circle, Ellipse, Plate};
pub use data::{ScalarData, VectorData};
