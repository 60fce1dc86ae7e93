//! Poisson solver on an unbounded grid
//!
//! The inverse of the five point Laplacian is a discrete convolution with its lattice
//! Green's function. Data is zero outside the block of points it is stored on, and the
//! solution is the restriction of the unbounded solution to that block, so no walls are
//! imposed. The convolution is carried out with zero padded FFTs.
use crate::types::{real, IlmScalar};
use nalgebra::DMatrix;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::f64::consts::PI;
use std::fmt;
use std::sync::Arc;

/// Largest offset, in either direction, at which the Green's function is integrated; the
/// far field expansion is used beyond it
const NEAR_FIELD: usize = 24;

/// Number of Simpson intervals for the near field integrals
const INTERVALS: usize = 4096;

/// Euler-Mascheroni constant
const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// `G(m, n) = (1/2pi) int_0^pi (1 - cos(m xi) exp(-n t)) / sinh(t) dxi` with
/// `cosh(t) = 2 - cos(xi)`
fn integrate(m: usize, n: usize) -> f64 {
    if m == 0 && n == 0 {
        return 0.0;
    }
    let (mf, nf) = (m as f64, n as f64);
    let integrand = |xi: f64| {
        if xi == 0.0 {
            return nf;
        }
        let s = 2.0 * (0.5 * xi).sin().powi(2);
        let sinh_t = (s * (2.0 + s)).sqrt();
        let t = sinh_t.asinh();
        (1.0 - (mf * xi).cos() * (-nf * t).exp()) / sinh_t
    };
    let step = PI / INTERVALS as f64;
    let mut sum = integrand(0.0) + integrand(PI);
    for k in 1..INTERVALS {
        let weight = if k % 2 == 1 { 4.0 } else { 2.0 };
        sum += weight * integrand(k as f64 * step);
    }
    sum * step / 3.0 / (2.0 * PI)
}

/// Two term expansion of the Green's function for large offsets
fn far_field(m: usize, n: usize) -> f64 {
    let (x, y) = (m as f64, n as f64);
    let r2 = x * x + y * y;
    let angular = x.powi(4) - 6.0 * x * x * y * y + y.powi(4);
    (0.5 * r2.ln() + EULER_GAMMA + 1.5 * 2f64.ln()) / (2.0 * PI)
        - angular / (24.0 * PI * r2.powi(3))
}

lazy_static! {
    static ref NEAR_FIELD_TABLE: Vec<f64> = {
        let size = NEAR_FIELD + 1;
        let mut table = vec![0.0; size * size];
        for m in 0..size {
            for n in 0..=m {
                let value = integrate(m, n);
                table[m + n * size] = value;
                table[n + m * size] = value;
            }
        }
        table
    };
}

/// Lattice Green's function of the five point Laplacian in index units.
///
/// `G` satisfies `G(i+1, j) + G(i-1, j) + G(i, j+1) + G(i, j-1) - 4 G(i, j) = delta(i, j)`
/// and is normalized so that `G(0, 0) = 0`. It grows like `ln(r) / 2pi`.
pub fn lattice_green(i: isize, j: isize) -> f64 {
    let (m, n) = (i.unsigned_abs(), j.unsigned_abs());
    if m > NEAR_FIELD || n > NEAR_FIELD {
        far_field(m, n)
    } else {
        NEAR_FIELD_TABLE[m + n * (NEAR_FIELD + 1)]
    }
}

/// Write the column major `rows x cols` array `src` into `dst` transposed
fn transpose<T: Copy>(src: &[T], rows: usize, cols: usize, dst: &mut [T]) {
    for j in 0..cols {
        for i in 0..rows {
            dst[j + i * cols] = src[i + j * rows];
        }
    }
}

/// Exact inverse of the five point Laplacian on an unbounded grid, for data stored on an
/// `m x n` block of points.
#[derive(Clone)]
pub struct LatticePoisson<T: IlmScalar> {
    shape: (usize, usize),
    padded: (usize, usize),
    h: T,
    spectrum: Arc<Vec<Complex<T>>>,
    forward_x: Arc<dyn Fft<T>>,
    forward_y: Arc<dyn Fft<T>>,
    inverse_x: Arc<dyn Fft<T>>,
    inverse_y: Arc<dyn Fft<T>>,
}

impl<T: IlmScalar> fmt::Debug for LatticePoisson<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LatticePoisson")
            .field("shape", &self.shape)
            .field("padded", &self.padded)
            .field("h", &self.h)
            .finish()
    }
}

impl<T: IlmScalar> LatticePoisson<T> {
    /// Create a solver for an `m x n` block with stencil spacing `h`
    pub fn new(m: usize, n: usize, h: T) -> Self {
        // Twice the block size holds every offset between two points of the block
        let (p, q) = ((2 * m).max(1), (2 * n).max(1));
        let mut planner = FftPlanner::new();
        let mut solver = Self {
            shape: (m, n),
            padded: (p, q),
            h,
            spectrum: Arc::new(vec![]),
            forward_x: planner.plan_fft_forward(p),
            forward_y: planner.plan_fft_forward(q),
            inverse_x: planner.plan_fft_inverse(p),
            inverse_y: planner.plan_fft_inverse(q),
        };

        let mut kernel = Vec::with_capacity(p * q);
        for b in 0..q {
            let dy = if b < n { b } else { q - b };
            for a in 0..p {
                let dx = if a < m { a } else { p - a };
                let g = lattice_green(dx as isize, dy as isize);
                kernel.push(Complex::new(real::<T>(g), T::zero()));
            }
        }
        solver.spectrum = Arc::new(solver.forward(&mut kernel, q));
        solver
    }

    /// Shape of the data this solver acts on
    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    /// FFT of a padded array whose first `columns` columns may be nonzero; the result is
    /// stored transposed
    fn forward(&self, buffer: &mut [Complex<T>], columns: usize) -> Vec<Complex<T>> {
        let (p, q) = self.padded;
        self.forward_x.process(&mut buffer[..p * columns]);
        let mut transposed = vec![Complex::new(T::zero(), T::zero()); p * q];
        transpose(buffer, p, q, &mut transposed);
        self.forward_y.process(&mut transposed);
        transposed
    }

    /// Inverse of [`Self::forward`], unnormalized, computing the first `columns` columns
    fn inverse(&self, transposed: &mut [Complex<T>], buffer: &mut [Complex<T>], columns: usize) {
        let (p, q) = self.padded;
        self.inverse_y.process(transposed);
        transpose(transposed, q, p, buffer);
        self.inverse_x.process(&mut buffer[..p * columns]);
    }

    /// Solve `L out = rhs`, overwriting `out`
    pub fn solve(&self, out: &mut DMatrix<T>, rhs: &DMatrix<T>) {
        let (m, n) = self.shape;
        if m == 0 || n == 0 {
            return;
        }
        let (p, q) = self.padded;
        let mut buffer = vec![Complex::new(T::zero(), T::zero()); p * q];
        for j in 0..n {
            for i in 0..m {
                buffer[i + j * p] = Complex::new(rhs[(i, j)], T::zero());
            }
        }
        let mut transformed = self.forward(&mut buffer, n);
        for (value, g) in transformed.iter_mut().zip(self.spectrum.iter()) {
            *value = *value * *g;
        }
        self.inverse(&mut transformed, &mut buffer, n);

        let scale = self.h * self.h / real::<T>((p * q) as f64);
        for j in 0..n {
            for i in 0..m {
                out[(i, j)] = buffer[i + j * p].re * scale;
            }
        }
    }

    /// Apply the five point Laplacian, treating data outside the block as zero, overwriting
    /// `out`
    pub fn apply(&self, out: &mut DMatrix<T>, f: &DMatrix<T>) {
        let (m, n) = self.shape;
        let value = |i: usize, j: usize| f[(i, j)];
        let four = real::<T>(4.0);
        let h2 = self.h * self.h;
        for j in 0..n {
            for i in 0..m {
                let mut sum = -four * value(i, j);
                if i > 0 {
                    sum += value(i - 1, j);
                }
                if i + 1 < m {
                    sum += value(i + 1, j);
                }
                if j > 0 {
                    sum += value(i, j - 1);
                }
                if j + 1 < n {
                    sum += value(i, j + 1);
                }
                out[(i, j)] = sum / h2;
            }
        }
    }
}
