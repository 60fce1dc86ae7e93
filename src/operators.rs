//! Surface-grid operators
//!
//! Every operator takes its output first, then its input, then the cache, and fully
//! overwrites the output. Operators that need intermediate data take the cache mutably
//! and use its scratch data, so the output may hold anything on entry.
//!
//! With `R` the regularization, `E` its adjoint interpolation, `n` the surface normals and
//! `D`, `G`, `C` the grid divergence, gradient and curl, the operators are:
//!
//! | operator | action |
//! |---|---|
//! | [`surface_divergence`] | `D R f` |
//! | [`surface_divergence_normal`] | `D R (n f)` |
//! | [`surface_divergence_symm`] | `D_t R (n f + f n)` |
//! | [`surface_grad`] | `E G g` |
//! | [`surface_grad_normal`] | `n . E G g` |
//! | [`surface_grad_symm`] | `(E (G_t q)) . n`, symmetrized |
//! | [`surface_curl`] | `C^T R f` |
//! | [`surface_curl_normal`] | `C^T R (n f)` |
//! | [`surface_curl_cross`] | `C^T R (n x f)` |
//! | [`surface_curl_scalar`] | `C R f` |
//! | [`curl_interpolate`] | `E C psi` |
//! | [`curl_normal_interpolate`] | `n . E C psi` |
//!
//! Under the weighted inner products of the cache, `surface_grad` is minus the adjoint of
//! `surface_divergence` (likewise for the normal and symmetric versions) and
//! `curl_interpolate` is the adjoint of `surface_curl`.
use crate::cache::{BasicIlmCache, CacheCore};
use crate::grid::{CellData, FaceData, NodeData};
use crate::surface::{ScalarData, VectorData};
use crate::types::{check_len, real, GridLocation, IlmScalar, Result};

fn regularize_faces<T: IlmScalar>(
    core: &CacheCore<T>,
    out: &mut FaceData<T>,
    f: &VectorData<T>,
) -> Result<()> {
    let reg = core.regularizer();
    reg.regularize(GridLocation::XFace, &mut out.u, &f.u)?;
    reg.regularize(GridLocation::YFace, &mut out.v, &f.v)
}

fn interpolate_faces<T: IlmScalar>(
    core: &CacheCore<T>,
    out: &mut VectorData<T>,
    q: &FaceData<T>,
) -> Result<()> {
    let reg = core.regularizer();
    reg.interpolate(GridLocation::XFace, &mut out.u, &q.u)?;
    reg.interpolate(GridLocation::YFace, &mut out.v, &q.v)
}

/// `out = n f`
fn times_normal<T: IlmScalar>(
    out: &mut VectorData<T>,
    normals: &VectorData<T>,
    f: &ScalarData<T>,
) -> Result<()> {
    f.check(normals.len())?;
    for k in 0..normals.len() {
        out.u[k] = normals.u[k] * f[k];
        out.v[k] = normals.v[k] * f[k];
    }
    Ok(())
}

/// `out = n . q`
fn dot_normal<T: IlmScalar>(
    out: &mut ScalarData<T>,
    normals: &VectorData<T>,
    q: &VectorData<T>,
) -> Result<()> {
    out.check(normals.len())?;
    for k in 0..normals.len() {
        out[k] = normals.u[k] * q.u[k] + normals.v[k] * q.v[k];
    }
    Ok(())
}

/// Regularize surface data onto cell centres
pub fn regularize<T: IlmScalar>(
    out: &mut CellData<T>,
    f: &ScalarData<T>,
    cache: &BasicIlmCache<T>,
) -> Result<()> {
    cache
        .regularizer()
        .regularize(GridLocation::Cell, out, f)
}

/// Interpolate cell data onto the surface
pub fn interpolate<T: IlmScalar>(
    out: &mut ScalarData<T>,
    g: &CellData<T>,
    cache: &BasicIlmCache<T>,
) -> Result<()> {
    cache
        .regularizer()
        .interpolate(GridLocation::Cell, out, g)
}

/// Regularize vector surface data onto faces
pub fn regularize_vector<T: IlmScalar>(
    out: &mut FaceData<T>,
    f: &VectorData<T>,
    cache: &BasicIlmCache<T>,
) -> Result<()> {
    regularize_faces(cache.core(), out, f)
}

/// Interpolate face data onto the surface
pub fn interpolate_vector<T: IlmScalar>(
    out: &mut VectorData<T>,
    q: &FaceData<T>,
    cache: &BasicIlmCache<T>,
) -> Result<()> {
    interpolate_faces(cache.core(), out, q)
}

/// Regularize surface data onto nodes
pub fn regularize_nodes<T: IlmScalar>(
    out: &mut NodeData<T>,
    f: &ScalarData<T>,
    cache: &BasicIlmCache<T>,
) -> Result<()> {
    cache
        .regularizer()
        .regularize(GridLocation::Node, out, f)
}

/// Interpolate node data onto the surface
pub fn interpolate_nodes<T: IlmScalar>(
    out: &mut ScalarData<T>,
    psi: &NodeData<T>,
    cache: &BasicIlmCache<T>,
) -> Result<()> {
    cache
        .regularizer()
        .interpolate(GridLocation::Node, out, psi)
}

/// Regularize scalar surface data times the normals onto faces
pub fn regularize_normal<T: IlmScalar>(
    out: &mut FaceData<T>,
    f: &ScalarData<T>,
    cache: &mut BasicIlmCache<T>,
) -> Result<()> {
    let (core, scratch) = cache.split_mut();
    times_normal(&mut scratch.vector, core.normals(), f)?;
    regularize_faces(core, out, &scratch.vector)
}

/// Interpolate face data onto the surface and take the normal component
pub fn normal_interpolate<T: IlmScalar>(
    out: &mut ScalarData<T>,
    q: &FaceData<T>,
    cache: &mut BasicIlmCache<T>,
) -> Result<()> {
    let (core, scratch) = cache.split_mut();
    interpolate_faces(core, &mut scratch.vector, q)?;
    dot_normal(out, core.normals(), &scratch.vector)
}

/// Divergence of regularized vector surface data
pub fn surface_divergence<T: IlmScalar>(
    out: &mut CellData<T>,
    f: &VectorData<T>,
    cache: &mut BasicIlmCache<T>,
) -> Result<()> {
    let (core, scratch) = cache.split_mut();
    regularize_faces(core, &mut scratch.faces, f)?;
    core.grid_operators().divergence(out, &scratch.faces)
}

/// Double layer potential: divergence of regularized scalar surface data times the normals
pub fn surface_divergence_normal<T: IlmScalar>(
    out: &mut CellData<T>,
    f: &ScalarData<T>,
    cache: &mut BasicIlmCache<T>,
) -> Result<()> {
    let (core, scratch) = cache.split_mut();
    times_normal(&mut scratch.vector, core.normals(), f)?;
    regularize_faces(core, &mut scratch.faces, &scratch.vector)?;
    core.grid_operators().divergence(out, &scratch.faces)
}

/// Divergence of the regularized symmetric tensor `n f + f n` formed from vector surface data
pub fn surface_divergence_symm<T: IlmScalar>(
    out: &mut FaceData<T>,
    f: &VectorData<T>,
    cache: &mut BasicIlmCache<T>,
) -> Result<()> {
    let (core, scratch) = cache.split_mut();
    let npts = core.num_points();
    f.check(npts)?;
    let n = core.normals();
    let reg = core.regularizer();
    let two = real::<T>(2.0);

    for k in 0..npts {
        scratch.scalar[k] = two * n.u[k] * f.u[k];
    }
    reg.regularize(GridLocation::Cell, &mut scratch.tensor.xx, &scratch.scalar)?;
    for k in 0..npts {
        scratch.scalar[k] = two * n.v[k] * f.v[k];
    }
    reg.regularize(GridLocation::Cell, &mut scratch.tensor.yy, &scratch.scalar)?;
    for k in 0..npts {
        scratch.scalar[k] = n.u[k] * f.v[k] + n.v[k] * f.u[k];
    }
    reg.regularize(GridLocation::Node, &mut scratch.tensor.xy, &scratch.scalar)?;

    core.grid_operators().tensor_divergence(out, &scratch.tensor)
}

/// Interpolated gradient of cell data
pub fn surface_grad<T: IlmScalar>(
    out: &mut VectorData<T>,
    g: &CellData<T>,
    cache: &mut BasicIlmCache<T>,
) -> Result<()> {
    let (core, scratch) = cache.split_mut();
    core.grid_operators().grad(&mut scratch.faces, g)?;
    interpolate_faces(core, out, &scratch.faces)
}

/// Normal component of the interpolated gradient of cell data
pub fn surface_grad_normal<T: IlmScalar>(
    out: &mut ScalarData<T>,
    g: &CellData<T>,
    cache: &mut BasicIlmCache<T>,
) -> Result<()> {
    let (core, scratch) = cache.split_mut();
    core.grid_operators().grad(&mut scratch.faces, g)?;
    interpolate_faces(core, &mut scratch.vector, &scratch.faces)?;
    dot_normal(out, core.normals(), &scratch.vector)
}

/// Traction-like product of the interpolated symmetric gradient of face data with the normals
pub fn surface_grad_symm<T: IlmScalar>(
    out: &mut VectorData<T>,
    q: &FaceData<T>,
    cache: &mut BasicIlmCache<T>,
) -> Result<()> {
    let (core, scratch) = cache.split_mut();
    let npts = core.num_points();
    out.check(npts)?;
    core.grid_operators().tensor_grad(&mut scratch.tensor, q)?;
    let reg = core.regularizer();
    reg.interpolate(GridLocation::Cell, &mut scratch.vector.u, &scratch.tensor.xx)?;
    reg.interpolate(GridLocation::Cell, &mut scratch.vector.v, &scratch.tensor.yy)?;
    reg.interpolate(GridLocation::Node, &mut scratch.scalar, &scratch.tensor.xy)?;

    let n = core.normals();
    let two = real::<T>(2.0);
    for k in 0..npts {
        let (exx, eyy, gxy) = (scratch.vector.u[k], scratch.vector.v[k], scratch.scalar[k]);
        out.u[k] = two * n.u[k] * exx + n.v[k] * gxy;
        out.v[k] = two * n.v[k] * eyy + n.u[k] * gxy;
    }
    Ok(())
}

/// Curl of regularized vector surface data, at nodes
pub fn surface_curl<T: IlmScalar>(
    out: &mut NodeData<T>,
    f: &VectorData<T>,
    cache: &mut BasicIlmCache<T>,
) -> Result<()> {
    let (core, scratch) = cache.split_mut();
    regularize_faces(core, &mut scratch.faces, f)?;
    core.grid_operators().rot(out, &scratch.faces)
}

/// Curl of regularized scalar surface data times the normals
pub fn surface_curl_normal<T: IlmScalar>(
    out: &mut NodeData<T>,
    f: &ScalarData<T>,
    cache: &mut BasicIlmCache<T>,
) -> Result<()> {
    let (core, scratch) = cache.split_mut();
    times_normal(&mut scratch.vector, core.normals(), f)?;
    regularize_faces(core, &mut scratch.faces, &scratch.vector)?;
    core.grid_operators().rot(out, &scratch.faces)
}

/// Curl of the regularized cross product of the normals with scalar surface data
///
/// In two dimensions `n x f` for an out-of-plane `f` is `(n_y f, -n_x f)`.
pub fn surface_curl_cross<T: IlmScalar>(
    out: &mut NodeData<T>,
    f: &ScalarData<T>,
    cache: &mut BasicIlmCache<T>,
) -> Result<()> {
    let (core, scratch) = cache.split_mut();
    let n = core.normals();
    f.check(n.len())?;
    for k in 0..n.len() {
        scratch.vector.u[k] = n.v[k] * f[k];
        scratch.vector.v[k] = -n.u[k] * f[k];
    }
    regularize_faces(core, &mut scratch.faces, &scratch.vector)?;
    core.grid_operators().rot(out, &scratch.faces)
}

/// Curl of scalar surface data regularized onto nodes, on faces
pub fn surface_curl_scalar<T: IlmScalar>(
    out: &mut FaceData<T>,
    f: &ScalarData<T>,
    cache: &mut BasicIlmCache<T>,
) -> Result<()> {
    let (core, scratch) = cache.split_mut();
    core.regularizer()
        .regularize(GridLocation::Node, &mut scratch.nodes, f)?;
    core.grid_operators().curl(out, &scratch.nodes)
}

/// Interpolated curl of node data
pub fn curl_interpolate<T: IlmScalar>(
    out: &mut VectorData<T>,
    psi: &NodeData<T>,
    cache: &mut BasicIlmCache<T>,
) -> Result<()> {
    let (core, scratch) = cache.split_mut();
    core.grid_operators().curl(&mut scratch.faces, psi)?;
    interpolate_faces(core, out, &scratch.faces)
}

/// Normal component of the interpolated curl of node data
pub fn curl_normal_interpolate<T: IlmScalar>(
    out: &mut ScalarData<T>,
    psi: &NodeData<T>,
    cache: &mut BasicIlmCache<T>,
) -> Result<()> {
    let (core, scratch) = cache.split_mut();
    core.grid_operators().curl(&mut scratch.faces, psi)?;
    interpolate_faces(core, &mut scratch.vector, &scratch.faces)?;
    dot_normal(out, core.normals(), &scratch.vector)
}

/// Indicator of the interior of the bodies: about 1 inside and 0 outside.
///
/// Computed as the field whose jump across the surface is -1, `-L^-1 D R n`.
pub fn mask<T: IlmScalar>(out: &mut CellData<T>, cache: &mut BasicIlmCache<T>) -> Result<()> {
    let (core, scratch) = cache.split_mut();
    check_len("normals", core.num_points(), scratch.vector.len())?;
    scratch.vector.u.copy_from(&core.normals().u);
    scratch.vector.v.copy_from(&core.normals().v);
    regularize_faces(core, &mut scratch.faces, &scratch.vector)?;
    let ops = core.grid_operators();
    ops.divergence(&mut scratch.cells, &scratch.faces)?;
    ops.inverse_laplacian(out, &scratch.cells)?;
    out.neg_mut();
    Ok(())
}

/// Indicator of the exterior of the bodies, exactly `1 - mask`
pub fn complementary_mask<T: IlmScalar>(
    out: &mut CellData<T>,
    cache: &mut BasicIlmCache<T>,
) -> Result<()> {
    mask(out, cache)?;
    out.apply(|value| *value = T::one() - *value);
    Ok(())
}

/// Solve the grid Poisson equation `L out = rhs` with the cache's grid operators
pub fn inverse_laplacian<T: IlmScalar>(
    out: &mut CellData<T>,
    rhs: &CellData<T>,
    cache: &BasicIlmCache<T>,
) -> Result<()> {
    cache.grid_operators().inverse_laplacian(out, rhs)
}
