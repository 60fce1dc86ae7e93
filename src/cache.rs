//! Immersed layer caches
//!
//! A cache holds everything that depends on the grid and the surface geometry: the
//! regularization stencils, surface normals and areas, grid operators and scratch data.

pub mod basic;
pub mod regularization;

pub use basic::{BasicIlmCache, CacheCore};
pub use regularization::{Regularizer, Stencil};

use crate::ddf::DdfKind;
use crate::surface::ScalarData;
use crate::types::{IlmScalar, ScalingMode};

/// Options used when building a cache
#[derive(Debug, Clone, PartialEq)]
pub struct CacheOptions<T: IlmScalar> {
    scaling: ScalingMode,
    ddf: DdfKind,
    areas: Option<ScalarData<T>>,
}

impl<T: IlmScalar> Default for CacheOptions<T> {
    fn default() -> Self {
        Self {
            scaling: ScalingMode::GridScaling,
            ddf: DdfKind::Roma,
            areas: None,
        }
    }
}

impl<T: IlmScalar> CacheOptions<T> {
    /// Operator normalization
    pub fn scaling(&self) -> ScalingMode {
        self.scaling
    }

    /// Set the operator normalization
    pub fn set_scaling(&mut self, scaling: ScalingMode) {
        self.scaling = scaling;
    }

    /// Discrete delta function used for regularization
    pub fn ddf(&self) -> DdfKind {
        self.ddf
    }

    /// Set the discrete delta function used for regularization
    pub fn set_ddf(&mut self, ddf: DdfKind) {
        self.ddf = ddf;
    }

    /// Explicit surface areas, if any
    pub fn areas(&self) -> Option<&ScalarData<T>> {
        self.areas.as_ref()
    }

    /// Use explicit surface areas instead of the arclengths of the bodies
    pub fn set_areas(&mut self, areas: Option<ScalarData<T>>) {
        self.areas = areas;
    }
}
