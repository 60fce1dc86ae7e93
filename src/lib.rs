//! Immersed layers
//!
//! Caches and operators for solving PDEs on Cartesian grids with immersed surfaces.
//!
//! A [`cache::BasicIlmCache`] is built once for a grid and a set of bodies. The functions in
//! [`operators`] then move data between the surface and the grid, and [`matrices`] builds
//! the Schur complements that couple them. [`system`] ties a problem definition to its
//! caches so that it can be solved repeatedly without rebuilding them.
#![cfg_attr(feature = "strict", deny(warnings))]
#![warn(missing_docs)]

#[macro_use]
extern crate lazy_static;

pub mod cache;
pub mod ddf;
pub mod forcing;
pub mod grid;
pub mod matrices;
pub mod operators;
pub mod problems;
pub mod surface;
pub mod system;
pub mod types;
