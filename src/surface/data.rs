//! Data stored at surface points
use crate::types::{check_len, Error, IlmScalar, Result};
use nalgebra::DVector;
use std::ops::{Deref, DerefMut};

/// Scalar data at surface points.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarData<T: IlmScalar>(DVector<T>);

impl<T: IlmScalar> ScalarData<T> {
    /// Create zero data for `n` points
    pub fn new(n: usize) -> Self {
        Self(DVector::zeros(n))
    }

    /// Create data from a vector of values
    pub fn from_vec(values: Vec<T>) -> Self {
        Self(DVector::from_vec(values))
    }

    /// Wrap an existing vector
    pub fn from_vector(values: DVector<T>) -> Self {
        Self(values)
    }

    /// Create data by evaluating a function at each point index
    pub fn from_fn(n: usize, f: impl Fn(usize) -> T) -> Self {
        Self(DVector::from_fn(n, |k, _| f(k)))
    }

    /// Check the number of points
    pub fn check(&self, n: usize) -> Result<()> {
        check_len("ScalarData", n, self.0.len())
    }

    /// Sum of the products of the entries of two sets of data
    pub fn dot(&self, other: &Self) -> T {
        self.0.dot(&other.0)
    }

    /// Unwrap into the underlying vector
    pub fn into_inner(self) -> DVector<T> {
        self.0
    }
}

impl<T: IlmScalar> Deref for ScalarData<T> {
    type Target = DVector<T>;
    fn deref(&self) -> &DVector<T> {
        &self.0
    }
}

impl<T: IlmScalar> DerefMut for ScalarData<T> {
    fn deref_mut(&mut self) -> &mut DVector<T> {
        &mut self.0
    }
}

/// Vector data at surface points, stored as separate x and y components.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorData<T: IlmScalar> {
    /// x components
    pub u: DVector<T>,
    /// y components
    pub v: DVector<T>,
}

impl<T: IlmScalar> VectorData<T> {
    /// Create zero data for `n` points
    pub fn new(n: usize) -> Self {
        Self {
            u: DVector::zeros(n),
            v: DVector::zeros(n),
        }
    }

    /// Create data from its two components
    pub fn from_components(u: Vec<T>, v: Vec<T>) -> Result<Self> {
        check_len("VectorData.v", u.len(), v.len())?;
        Ok(Self {
            u: DVector::from_vec(u),
            v: DVector::from_vec(v),
        })
    }

    /// Create data by evaluating a function at each point index
    pub fn from_fn(n: usize, f: impl Fn(usize) -> [T; 2]) -> Self {
        let mut out = Self::new(n);
        for k in 0..n {
            let [a, b] = f(k);
            out.u[k] = a;
            out.v[k] = b;
        }
        out
    }

    /// Number of points
    pub fn len(&self) -> usize {
        self.u.len()
    }

    /// Check if there are no points
    pub fn is_empty(&self) -> bool {
        self.u.is_empty()
    }

    /// The value at point `k`
    pub fn get(&self, k: usize) -> [T; 2] {
        [self.u[k], self.v[k]]
    }

    /// Check the number of points
    pub fn check(&self, n: usize) -> Result<()> {
        check_len("VectorData.u", n, self.u.len())?;
        check_len("VectorData.v", n, self.v.len())
    }

    /// Set all values to zero
    pub fn fill_zero(&mut self) {
        self.u.fill(T::zero());
        self.v.fill(T::zero());
    }

    /// Sum of the products of the entries of two vector fields
    pub fn dot(&self, other: &Self) -> T {
        self.u.dot(&other.u) + self.v.dot(&other.v)
    }

    /// Stack the components into one vector `[u; v]` of length `2n`
    pub fn stacked(&self) -> DVector<T> {
        let n = self.len();
        DVector::from_fn(2 * n, |k, _| if k < n { self.u[k] } else { self.v[k - n] })
    }

    /// Split a stacked vector `[u; v]` into vector data
    pub fn from_stacked(values: &DVector<T>) -> Result<Self> {
        if values.len() % 2 != 0 {
            return Err(Error::ShapeMismatch {
                what: "stacked VectorData",
                expected: "an even length".to_string(),
                found: values.len().to_string(),
            });
        }
        let n = values.len() / 2;
        Ok(Self {
            u: values.rows(0, n).into_owned(),
            v: values.rows(n, n).into_owned(),
        })
    }

    /// Concatenate vector data
    pub fn concat<'a>(parts: impl IntoIterator<Item = &'a VectorData<T>>) -> Self
    where
        T: 'a,
    {
        let mut u = Vec::new();
        let mut v = Vec::new();
        for part in parts {
            u.extend(part.u.iter().copied());
            v.extend(part.v.iter().copied());
        }
        Self {
            u: DVector::from_vec(u),
            v: DVector::from_vec(v),
        }
    }
}
