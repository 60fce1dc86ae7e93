//! Discrete delta functions
//!
//! A discrete delta function (DDF) is a compactly supported kernel in index units. The two
//! dimensional kernel is the tensor product `phi(rx) * phi(ry)` of the one dimensional kernel.
use crate::types::{real, IlmScalar};
use nalgebra::ComplexField;

/// Kind of discrete delta function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DdfKind {
    /// Three point kernel of Roma, Peskin and Berger
    #[default]
    Roma,
    /// Two point linear hat
    Witchhat,
    /// Four point M4' kernel
    M4Prime,
    /// Four point cosine kernel
    Cosine,
}

impl DdfKind {
    /// Half width of the support, in index units
    pub fn support(&self) -> f64 {
        match self {
            DdfKind::Roma => 1.5,
            DdfKind::Witchhat => 1.0,
            DdfKind::M4Prime => 2.0,
            DdfKind::Cosine => 2.0,
        }
    }

    /// Evaluate the one dimensional kernel at an offset `r` in index units
    pub fn evaluate<T: IlmScalar>(&self, r: T) -> T {
        let r = ComplexField::abs(r);
        let one = T::one();
        match self {
            DdfKind::Roma => {
                if r <= real(0.5) {
                    let third = real::<T>(1.0 / 3.0);
                    third * (one + (one - real::<T>(3.0) * r * r).sqrt())
                } else if r <= real(1.5) {
                    let s = one - r;
                    let root = (one - real::<T>(3.0) * s * s).sqrt();
                    real::<T>(1.0 / 6.0) * (real::<T>(5.0) - real::<T>(3.0) * r - root)
                } else {
                    T::zero()
                }
            }
            DdfKind::Witchhat => {
                if r < one {
                    one - r
                } else {
                    T::zero()
                }
            }
            DdfKind::M4Prime => {
                if r < one {
                    one - real::<T>(2.5) * r * r + real::<T>(1.5) * r * r * r
                } else if r < real(2.0) {
                    let s = real::<T>(2.0) - r;
                    real::<T>(0.5) * s * s * (one - r)
                } else {
                    T::zero()
                }
            }
            DdfKind::Cosine => {
                if r <= real(2.0) {
                    real::<T>(0.25) * (one + (T::pi() * r / real(2.0)).cos())
                } else {
                    T::zero()
                }
            }
        }
    }
}
