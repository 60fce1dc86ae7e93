//! Surface-grid operators on a full cache
use approx::assert_relative_eq;
use immersed_layers::cache::{BasicIlmCache, CacheOptions};
use immersed_layers::grid::{CellData, FaceData, NodeData, PhysicalGrid};
use immersed_layers::matrices::create_surface_filter;
use immersed_layers::operators::{
    complementary_mask, curl_interpolate, interpolate, mask, normal_interpolate, regularize,
    regularize_normal, surface_curl, surface_divergence_normal, surface_grad_normal,
};
use immersed_layers::surface::{Body, BodyList, Circle, Plate, ScalarData, VectorData};
use immersed_layers::types::{IlmScalar, ScalingMode};
use paste::paste;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn circle_cache<T: IlmScalar>(radius: f64, dx: f64, scaling: ScalingMode) -> BasicIlmCache<T> {
    let real = |x: f64| nalgebra::convert::<f64, T>(x);
    let limits = [real(-1.0), real(1.0)];
    let grid = PhysicalGrid::from_limits(limits, limits, real(dx)).unwrap();
    let circle = Circle::with_spacing([T::zero(), T::zero()], real(radius), real(1.5 * dx));
    cache(&grid, circle, scaling)
}

fn cache<T: IlmScalar>(
    grid: &PhysicalGrid<T>,
    body: impl Body<T> + 'static,
    scaling: ScalingMode,
) -> BasicIlmCache<T> {
    let mut options = CacheOptions::default();
    options.set_scaling(scaling);
    BasicIlmCache::from_body(grid, body, &options).unwrap()
}

#[test]
fn test_mask_area() {
    for scaling in [ScalingMode::GridScaling, ScalingMode::IndexScaling] {
        let mut cache = circle_cache::<f64>(0.5, 0.02, scaling);
        let mut inside = CellData::new(cache.grid());
        mask(&mut inside, &mut cache).unwrap();
        let area = inside.sum() * cache.grid().cell_area();
        assert_relative_eq!(area, std::f64::consts::PI * 0.25, max_relative = 0.05);
    }
}

#[test]
fn test_complementary_mask() {
    let mut cache = circle_cache::<f64>(0.5, 0.04, ScalingMode::GridScaling);
    let mut inside = CellData::new(cache.grid());
    let mut outside = CellData::new(cache.grid());
    mask(&mut inside, &mut cache).unwrap();
    // Dirty output
    outside.fill(7.0);
    complementary_mask(&mut outside, &mut cache).unwrap();
    for (a, b) in inside.iter().zip(outside.iter()) {
        assert_eq!(*b, 1.0 - *a);
    }
}

macro_rules! adjoint_tests {
    ($($scalar:ident: $tol:expr),*) => {
        $(
            paste! {
                #[test]
                fn [<test_regularize_interpolate_adjoint_ $scalar>]() {
                    let mut rng = StdRng::seed_from_u64(7);
                    for scaling in [ScalingMode::GridScaling, ScalingMode::IndexScaling] {
                        let cache = circle_cache::<$scalar>(0.45, 0.05, scaling);
                        let n = cache.num_points();
                        let f = ScalarData::from_vec(
                            (0..n).map(|_| rng.gen::<$scalar>() - 0.5).collect(),
                        );
                        let mut g = CellData::new(cache.grid());
                        g.apply(|v| *v = rng.gen::<$scalar>() - 0.5);

                        let mut rf = CellData::new(cache.grid());
                        regularize(&mut rf, &f, &cache).unwrap();
                        let mut eg = ScalarData::new(n);
                        interpolate(&mut eg, &g, &cache).unwrap();

                        let lhs = cache.grid_dot(&rf, &g);
                        let rhs = cache.surface_dot(&f, &eg);
                        assert_relative_eq!(lhs, rhs, max_relative = $tol);
                    }
                }
            }
        )*
    };
}

adjoint_tests!(f32: 1e-3, f64: 1e-10);

#[test]
fn test_normal_amplification() {
    // Regularizing along the normal and interpolating back multiplies smooth data by about
    // the sum of the squared kernel weights, which is 1/2 for the Roma kernel.
    let dx = 0.02;
    for (scaling, expected) in [
        (ScalingMode::GridScaling, 0.5 / dx),
        (ScalingMode::IndexScaling, 0.5),
    ] {
        let mut cache = circle_cache::<f64>(0.5, dx, scaling);
        let n = cache.num_points();
        let points = cache.points().clone();
        let f = ScalarData::from_fn(n, |k| (2.0 * points.v[k].atan2(points.u[k])).cos());
        let mut q = FaceData::new(cache.grid());
        regularize_normal(&mut q, &f, &mut cache).unwrap();
        let mut out = ScalarData::new(n);
        normal_interpolate(&mut out, &q, &mut cache).unwrap();
        let ratio = out.norm() / f.norm();
        assert!(
            ratio > 0.6 * expected && ratio < 1.4 * expected,
            "amplification {ratio} not close to {expected}"
        );
    }
}

#[test]
fn test_filter_smooths_surface_noise() {
    // An even number of points, so that alternating data has no defect
    let grid = PhysicalGrid::from_limits([-1.0, 1.0], [-1.0, 1.0], 0.02).unwrap();
    let cache = cache(&grid, Circle::new([0.0, 0.0], 0.5, 104), ScalingMode::GridScaling);
    let n = cache.num_points();
    let filter = create_surface_filter(&cache).unwrap();
    let noisy = ScalarData::from_fn(n, |k| 1.0 + if k % 2 == 0 { 0.1 } else { -0.1 });
    let mut smooth = ScalarData::new(n);
    filter.apply_power(&mut smooth, &noisy, 6).unwrap();
    let max_deviation = smooth.iter().fold(0.0f64, |m, &v: &f64| m.max((v - 1.0).abs()));
    assert!(max_deviation < 0.01);

    let constant = ScalarData::from_vec(vec![2.0; n]);
    filter.apply_power(&mut smooth, &constant, 3).unwrap();
    assert_relative_eq!(*smooth, *constant, epsilon = 1e-12);
}

#[test]
fn test_adjoints_on_two_bodies() {
    // A closed and an open body, with different point areas
    let grid = PhysicalGrid::from_limits([-1.0, 1.0], [-1.0, 1.0], 0.04).unwrap();
    let mut bodies = BodyList::new();
    bodies.push(Circle::with_spacing([-0.4, 0.1], 0.3, 0.05));
    bodies.push(Plate::new([0.2, -0.6], [0.6, 0.5], 12));
    let mut rng = StdRng::seed_from_u64(11);
    for scaling in [ScalingMode::GridScaling, ScalingMode::IndexScaling] {
        let mut options = CacheOptions::default();
        options.set_scaling(scaling);
        let mut cache = BasicIlmCache::new(&grid, &bodies, &options).unwrap();
        let n = cache.num_points();
        let w = cache.regularizer().grid_weight();
        let mut random = || rng.gen::<f64>() - 0.5;
        let f = ScalarData::from_vec((0..n).map(|_| random()).collect());
        let mut g = CellData::new(cache.grid());
        g.apply(|v| *v = random());
        let mut psi = NodeData::new(cache.grid());
        psi.apply(|v| *v = random());
        let fv = VectorData::from_components(
            (0..n).map(|_| random()).collect(),
            (0..n).map(|_| random()).collect(),
        )
        .unwrap();

        let mut rf = CellData::new(cache.grid());
        regularize(&mut rf, &f, &cache).unwrap();
        let mut eg = ScalarData::new(n);
        interpolate(&mut eg, &g, &cache).unwrap();
        assert_relative_eq!(
            cache.grid_dot(&rf, &g),
            cache.surface_dot(&f, &eg),
            max_relative = 1e-10
        );

        let mut df = CellData::new(cache.grid());
        surface_divergence_normal(&mut df, &f, &mut cache).unwrap();
        let mut gn = ScalarData::new(n);
        surface_grad_normal(&mut gn, &g, &mut cache).unwrap();
        assert_relative_eq!(
            cache.grid_dot(&df, &g),
            -cache.surface_dot(&f, &gn),
            max_relative = 1e-9
        );

        let mut cf = NodeData::new(cache.grid());
        surface_curl(&mut cf, &fv, &mut cache).unwrap();
        let mut cpsi = VectorData::new(n);
        curl_interpolate(&mut cpsi, &psi, &mut cache).unwrap();
        assert_relative_eq!(
            w * cf.dot(&psi),
            cache.surface_vector_dot(&fv, &cpsi),
            max_relative = 1e-9
        );
    }
}
