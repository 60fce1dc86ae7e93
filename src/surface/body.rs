//! Immersed bodies
//!
//! A body is an ordered set of surface points. Closed bodies are assumed to be traversed
//! counter-clockwise, so that the normals computed from neighbouring points point outward.
use crate::surface::{ScalarData, VectorData};
use crate::types::{check_len, real, IlmScalar, Result};
use std::ops::Range;
use std::sync::Arc;

/// Tangent at point `k`, from the neighbouring points
fn tangent<T: IlmScalar>(points: &VectorData<T>, closed: bool, k: usize) -> [T; 2] {
    let n = points.len();
    let (prev, next) = if closed {
        ((k + n - 1) % n, (k + 1) % n)
    } else {
        (k.saturating_sub(1), (k + 1).min(n - 1))
    };
    let [x0, y0] = points.get(prev);
    let [x1, y1] = points.get(next);
    [x1 - x0, y1 - y0]
}

/// An immersed body.
pub trait Body<T: IlmScalar>: Send + Sync {
    /// Surface point coordinates
    fn points(&self) -> VectorData<T>;

    /// Whether the last point connects back to the first
    fn is_closed(&self) -> bool;

    /// Number of surface points
    fn len(&self) -> usize {
        self.points().len()
    }

    /// Check if the body has no points
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Unit normals, by central differences of neighbouring points
    fn normals(&self) -> VectorData<T> {
        let points = self.points();
        let closed = self.is_closed();
        VectorData::from_fn(points.len(), |k| {
            let [tx, ty] = tangent(&points, closed, k);
            let norm = (tx * tx + ty * ty).sqrt();
            if norm > T::zero() {
                [ty / norm, -tx / norm]
            } else {
                [T::zero(), T::zero()]
            }
        })
    }

    /// Arclength associated with each point
    fn arclengths(&self) -> ScalarData<T> {
        let points = self.points();
        let closed = self.is_closed();
        let half = real::<T>(0.5);
        ScalarData::from_fn(points.len(), |k| {
            let [tx, ty] = tangent(&points, closed, k);
            (tx * tx + ty * ty).sqrt() * half
        })
    }
}

/// A body given by its raw points.
#[derive(Debug, Clone, PartialEq)]
pub struct BasicBody<T: IlmScalar> {
    points: VectorData<T>,
    closed: bool,
}

impl<T: IlmScalar> BasicBody<T> {
    /// Create a body from its points
    pub fn new(points: VectorData<T>, closed: bool) -> Self {
        Self { points, closed }
    }

    /// Create a body from coordinate lists
    pub fn from_coordinates(x: Vec<T>, y: Vec<T>, closed: bool) -> Result<Self> {
        Ok(Self::new(VectorData::from_components(x, y)?, closed))
    }

    /// Copy the points of another body
    pub fn from_body(body: &dyn Body<T>) -> Self {
        Self::new(body.points(), body.is_closed())
    }

    /// Move the body by a displacement
    pub fn translate(&mut self, displacement: [T; 2]) {
        self.points.u.add_scalar_mut(displacement[0]);
        self.points.v.add_scalar_mut(displacement[1]);
    }

    /// Rotate the body counter-clockwise by `angle` about `centre`
    pub fn rotate(&mut self, angle: T, centre: [T; 2]) {
        let (s, c) = (angle.sin(), angle.cos());
        for k in 0..self.points.len() {
            let x = self.points.u[k] - centre[0];
            let y = self.points.v[k] - centre[1];
            self.points.u[k] = centre[0] + c * x - s * y;
            self.points.v[k] = centre[1] + s * x + c * y;
        }
    }
}

impl<T: IlmScalar> Body<T> for BasicBody<T> {
    fn points(&self) -> VectorData<T> {
        self.points.clone()
    }
    fn is_closed(&self) -> bool {
        self.closed
    }
    fn len(&self) -> usize {
        self.points.len()
    }
}

/// A circle discretized by equally spaced points.
#[derive(Debug, Clone, PartialEq)]
pub struct Circle<T: IlmScalar> {
    /// Centre
    pub centre: [T; 2],
    /// Radius
    pub radius: T,
    /// Number of points
    pub npts: usize,
}

impl<T: IlmScalar> Circle<T> {
    /// Create a circle
    pub fn new(centre: [T; 2], radius: T, npts: usize) -> Self {
        Self {
            centre,
            radius,
            npts,
        }
    }

    /// Create a circle whose point spacing is about `ds`
    pub fn with_spacing(centre: [T; 2], radius: T, ds: T) -> Self {
        let circumference = real::<T>(2.0) * T::pi() * radius;
        let npts = (circumference / ds).round().to_usize().unwrap_or(0).max(3);
        Self::new(centre, radius, npts)
    }
}

impl<T: IlmScalar> Body<T> for Circle<T> {
    fn points(&self) -> VectorData<T> {
        let step = real::<T>(2.0) * T::pi() / real::<T>(self.npts as f64);
        VectorData::from_fn(self.npts, |k| {
            let theta = step * real::<T>(k as f64);
            [
                self.centre[0] + self.radius * theta.cos(),
                self.centre[1] + self.radius * theta.sin(),
            ]
        })
    }
    fn is_closed(&self) -> bool {
        true
    }
    fn len(&self) -> usize {
        self.npts
    }
}

/// An ellipse discretized by points equally spaced in angle.
#[derive(Debug, Clone, PartialEq)]
pub struct Ellipse<T: IlmScalar> {
    /// Centre
    pub centre: [T; 2],
    /// Semi-axis in the x direction
    pub a: T,
    /// Semi-axis in the y direction
    pub b: T,
    /// Number of points
    pub npts: usize,
}

impl<T: IlmScalar> Ellipse<T> {
    /// Create an ellipse
    pub fn new(centre: [T; 2], a: T, b: T, npts: usize) -> Self {
        Self { centre, a, b, npts }
    }
}

impl<T: IlmScalar> Body<T> for Ellipse<T> {
    fn points(&self) -> VectorData<T> {
        let step = real::<T>(2.0) * T::pi() / real::<T>(self.npts as f64);
        VectorData::from_fn(self.npts, |k| {
            let theta = step * real::<T>(k as f64);
            [
                self.centre[0] + self.a * theta.cos(),
                self.centre[1] + self.b * theta.sin(),
            ]
        })
    }
    fn is_closed(&self) -> bool {
        true
    }
    fn len(&self) -> usize {
        self.npts
    }
}

/// A straight open segment.
#[derive(Debug, Clone, PartialEq)]
pub struct Plate<T: IlmScalar> {
    /// First end point
    pub start: [T; 2],
    /// Last end point
    pub end: [T; 2],
    /// Number of points, including both ends
    pub npts: usize,
}

impl<T: IlmScalar> Plate<T> {
    /// Create a plate
    pub fn new(start: [T; 2], end: [T; 2], npts: usize) -> Self {
        Self { start, end, npts }
    }
}

impl<T: IlmScalar> Body<T> for Plate<T> {
    fn points(&self) -> VectorData<T> {
        let denom = real::<T>(self.npts.saturating_sub(1).max(1) as f64);
        VectorData::from_fn(self.npts, |k| {
            let s = real::<T>(k as f64) / denom;
            [
                self.start[0] + s * (self.end[0] - self.start[0]),
                self.start[1] + s * (self.end[1] - self.start[1]),
            ]
        })
    }
    fn is_closed(&self) -> bool {
        false
    }
    fn len(&self) -> usize {
        self.npts
    }
}

/// An ordered collection of bodies, whose surface data is concatenated.
#[derive(Clone)]
pub struct BodyList<T: IlmScalar> {
    bodies: Vec<Arc<dyn Body<T>>>,
}

impl<T: IlmScalar> BodyList<T> {
    /// Create an empty list
    pub fn new() -> Self {
        Self { bodies: vec![] }
    }

    /// Create a list holding one body
    pub fn from_body(body: impl Body<T> + 'static) -> Self {
        let mut list = Self::new();
        list.push(body);
        list
    }

    /// Add a body
    pub fn push(&mut self, body: impl Body<T> + 'static) {
        self.bodies.push(Arc::new(body));
    }

    /// Add a shared body
    pub fn push_shared(&mut self, body: Arc<dyn Body<T>>) {
        self.bodies.push(body);
    }

    /// Number of bodies
    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    /// Check if there are no bodies
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Body `i`
    pub fn body(&self, i: usize) -> &dyn Body<T> {
        self.bodies[i].as_ref()
    }

    /// Total number of surface points
    pub fn num_points(&self) -> usize {
        self.bodies.iter().map(|b| b.len()).sum()
    }

    /// Range of the concatenated point indices that belong to each body
    pub fn ranges(&self) -> Vec<Range<usize>> {
        let mut start = 0;
        self.bodies
            .iter()
            .map(|b| {
                let range = start..start + b.len();
                start = range.end;
                range
            })
            .collect()
    }

    /// Concatenated points
    pub fn points(&self) -> VectorData<T> {
        let parts = self.bodies.iter().map(|b| b.points()).collect::<Vec<_>>();
        VectorData::concat(&parts)
    }

    /// Concatenated normals
    pub fn normals(&self) -> VectorData<T> {
        let parts = self.bodies.iter().map(|b| b.normals()).collect::<Vec<_>>();
        VectorData::concat(&parts)
    }

    /// Concatenated arclengths
    pub fn arclengths(&self) -> ScalarData<T> {
        ScalarData::from_vec(
            self.bodies
                .iter()
                .flat_map(|b| b.arclengths().iter().copied().collect::<Vec<_>>())
                .collect(),
        )
    }

    /// Check that a set of surface data matches the total number of points
    pub fn check(&self, data: &VectorData<T>) -> Result<()> {
        check_len("BodyList surface data", self.num_points(), data.len())
    }
}

impl<T: IlmScalar> Default for BodyList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: IlmScalar> std::fmt::Debug for BodyList<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BodyList")
            .field("bodies", &self.len())
            .field("points", &self.num_points())
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_circle_normals_point_outward() {
        let circle = Circle::new([0.5, -0.25], 2.0, 64);
        let points = circle.points();
        let normals = circle.normals();
        for k in 0..64 {
            let [x, y] = points.get(k);
            let [nx, ny] = normals.get(k);
            assert_relative_eq!(nx, (x - 0.5) / 2.0, epsilon = 1e-12);
            assert_relative_eq!(ny, (y + 0.25) / 2.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_circle_perimeter() {
        let circle = Circle::<f64>::new([0.0, 0.0], 1.0, 200);
        let total = circle.arclengths().sum();
        assert_relative_eq!(total, 2.0 * std::f64::consts::PI, max_relative = 1e-3);
    }

    #[test]
    fn test_plate() {
        let plate = Plate::<f64>::new([0.0, 0.0], [0.0, 1.0], 11);
        assert_relative_eq!(plate.arclengths().sum(), 1.0, epsilon = 1e-12);
        let normals = plate.normals();
        for k in 0..11 {
            assert_relative_eq!(normals.u[k], 1.0, epsilon = 1e-12);
            assert_relative_eq!(normals.v[k], 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_basic_body_matches_circle() {
        let circle = Circle::<f64>::new([0.0, 0.0], 1.0, 40);
        let body = BasicBody::from_body(&circle);
        assert_eq!(body.points(), circle.points());
        assert_eq!(body.normals(), circle.normals());
        assert_eq!(body.arclengths(), circle.arclengths());
    }

    #[test]
    fn test_translate_rotate() {
        let mut body = BasicBody::from_coordinates(vec![1.0, 0.0], vec![0.0, 1.0], false).unwrap();
        body.rotate(std::f64::consts::FRAC_PI_2, [0.0, 0.0]);
        body.translate([1.0, 2.0]);
        let p = body.points();
        assert_relative_eq!(p.u[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(p.v[0], 3.0, epsilon = 1e-12);
        assert_relative_eq!(p.u[1], 0.0, epsilon = 1e-12);
        assert_relative_eq!(p.v[1], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_body_list() {
        let mut bodies = BodyList::new();
        bodies.push(Circle::<f64>::new([0.0, 0.0], 0.5, 20));
        bodies.push(Plate::new([1.0, 0.0], [2.0, 0.0], 5));
        assert_eq!(bodies.len(), 2);
        assert_eq!(bodies.num_points(), 25);
        assert_eq!(bodies.ranges(), vec![0..20, 20..25]);
        let points = bodies.points();
        assert_eq!(points.len(), 25);
        assert_relative_eq!(points.u[20], 1.0);
        assert_eq!(bodies.arclengths().len(), 25);
    }
}
