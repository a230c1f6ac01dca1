//! Shared linear-algebra aliases. The engine works in `f64` throughout the
//! CPU path — the scenario tolerances in the test suite go down to 1e-12,
//! which `f32` cannot hold across a multi-pass optimization loop.

/// A point or displacement in ℝ³.
pub type Vec3 = nalgebra::Vector3<f64>;
/// A 3×3 matrix; used both for the metric tensor `M(p)` and for small
/// local linear solves (quadric optimal-position, QEM-style).
pub type Mat3 = nalgebra::Matrix3<f64>;

/// Evaluate `dxᵀ M dx` for a displacement `dx` under metric `m`.
#[inline]
pub fn metric_quadratic_form(m: &Mat3, dx: &Vec3) -> f64 {
    dx.dot(&(m * dx))
}

/// Euclidean signed volume of a tetrahedron, 6× the usual formula omitted
/// (callers divide where they need the true volume; the sign is what the
/// positive-volume invariant cares about).
#[inline]
pub fn signed_volume6(a: &Vec3, b: &Vec3, c: &Vec3, d: &Vec3) -> f64 {
    (b - a).cross(&(c - a)).dot(&(d - a))
}

/// True if `v` is symmetric positive definite within a loose numerical
/// tolerance (used to sanity-check sampler output in debug builds).
pub fn is_spd(m: &Mat3, eps: f64) -> bool {
    let sym_err = (m - m.transpose()).abs().max();
    if sym_err > eps {
        return false;
    }
    match m.symmetric_eigen().eigenvalues.iter().cloned().reduce(f64::min) {
        Some(min_eig) => min_eig > -eps,
        None => false,
    }
}
