//! Per-element and per-patch mesh quality, plus the quality self-test that
//! must pass before a [`crate::scheduler::Scheduler`] run is trusted.
//!
//! Quality is a corner-Jacobian shape metric: at a fixed reference corner
//! of each element kind, compare the actual edge Jacobian `J` to the ideal
//! (regular) element's Jacobian `W` via `A = S J W⁻¹`, where `S` is the
//! Cholesky factor of the local metric (so an anisotropic metric reshapes
//! what counts as "ideal"). `q(A) = 3 det(A)^(2/3) / tr(AᵀA)` is in `(0,
//! 1]` by AM-GM, with `1` iff `A` is a scalar multiple of an orthogonal
//! matrix — i.e. `J` is an isotropically-scaled copy of `W`.

use std::sync::OnceLock;

use crate::error::{Error, Result};
use crate::geometry::{Mat3, Vec3};
use crate::mesh::{Element, ElementKind, Mesh};
use crate::sampler::{MetricSampler, RefTetHint};

fn ideal_tet_weight() -> &'static Mat3 {
    static W: OnceLock<Mat3> = OnceLock::new();
    W.get_or_init(|| {
        let v0 = Vec3::new(0.0, 0.0, 0.0);
        let v1 = Vec3::new(1.0, 0.0, 0.0);
        let v2 = Vec3::new(0.5, 3f64.sqrt() / 2.0, 0.0);
        let v3 = Vec3::new(0.5, 3f64.sqrt() / 6.0, (2.0 / 3.0f64).sqrt());
        Mat3::from_columns(&[v1 - v0, v2 - v0, v3 - v0])
    })
}

fn ideal_pri_weight() -> &'static Mat3 {
    static W: OnceLock<Mat3> = OnceLock::new();
    W.get_or_init(|| {
        let v0 = Vec3::new(0.0, 0.0, 0.0);
        let v1 = Vec3::new(1.0, 0.0, 0.0);
        let v2 = Vec3::new(0.5, 3f64.sqrt() / 2.0, 0.0);
        let v3 = Vec3::new(0.0, 0.0, 1.0);
        Mat3::from_columns(&[v1 - v0, v2 - v0, v3 - v0])
    })
}

// The ideal hex (unit cube) weight matrix is the identity, so hex quality
// skips the `W^-1` multiply entirely.

/// `3 det(A)^(2/3) / tr(AᵀA)`, 0 for non-positive `det`.
fn shape_metric(a: &Mat3) -> f64 {
    let det = a.determinant();
    if det <= 0.0 {
        return 0.0;
    }
    let trace = (a.transpose() * a).trace();
    if trace <= 0.0 {
        return 0.0;
    }
    (3.0 * det.powf(2.0 / 3.0) / trace).clamp(0.0, 1.0)
}

/// Cholesky factor `S` with `SᵀS = M`, used to fold the local metric into
/// the Jacobian before comparing to the ideal reference shape. Falls back
/// to the identity (Euclidean) if `M` isn't numerically SPD.
fn metric_factor(m: &Mat3) -> Mat3 {
    m.cholesky().map(|c| c.l().transpose()).unwrap_or_else(Mat3::identity)
}

fn corner_quality(sampler: &dyn MetricSampler, hint: &RefTetHint, corner: Vec3, j: Mat3, w_inv: &Mat3) -> f64 {
    let s = if sampler.is_metric_wise() {
        metric_factor(&sampler.metric_at(corner, hint).unwrap_or_else(|_| Mat3::identity()))
    } else {
        Mat3::identity()
    };
    shape_metric(&(s * j * w_inv))
}

pub fn tet_quality(sampler: &dyn MetricSampler, hint: &RefTetHint, verts: &[Vec3; 4]) -> f64 {
    let j = Mat3::from_columns(&[verts[1] - verts[0], verts[2] - verts[0], verts[3] - verts[0]]);
    let w_inv = ideal_tet_weight().try_inverse().expect("ideal tet weight is nonsingular");
    corner_quality(sampler, hint, verts[0], j, &w_inv)
}

pub fn pri_quality(sampler: &dyn MetricSampler, hint: &RefTetHint, verts: &[Vec3; 6]) -> f64 {
    let j = Mat3::from_columns(&[verts[1] - verts[0], verts[2] - verts[0], verts[3] - verts[0]]);
    let w_inv = ideal_pri_weight().try_inverse().expect("ideal prism weight is nonsingular");
    corner_quality(sampler, hint, verts[0], j, &w_inv)
}

pub fn hex_quality(sampler: &dyn MetricSampler, hint: &RefTetHint, verts: &[Vec3; 8]) -> f64 {
    let j = Mat3::from_columns(&[verts[1] - verts[0], verts[3] - verts[0], verts[4] - verts[0]]);
    corner_quality(sampler, hint, verts[0], j, &Mat3::identity())
}

pub fn element_quality(sampler: &dyn MetricSampler, hint: &RefTetHint, element: &Element, positions: &[Vec3]) -> f64 {
    let local: Vec<Vec3> = element.vertices().iter().map(|&v| positions[v as usize]).collect();
    match element.kind() {
        ElementKind::Tet => tet_quality(sampler, hint, &[local[0], local[1], local[2], local[3]]),
        ElementKind::Pri => pri_quality(sampler, hint, &[local[0], local[1], local[2], local[3], local[4], local[5]]),
        ElementKind::Hex => hex_quality(
            sampler,
            hint,
            &[local[0], local[1], local[2], local[3], local[4], local[5], local[6], local[7]],
        ),
    }
}

/// Harmonic mean of `element_quality` over `v`'s incident elements, so a
/// single sliver dominates the score (a plain average would hide it).
pub fn patch_quality(mesh: &Mesh, sampler: &dyn MetricSampler, hint: &RefTetHint, v: u32) -> f64 {
    let incident = &mesh.topology.incident_elements[v as usize];
    if incident.is_empty() {
        return 1.0;
    }
    let mut reciprocal_sum = 0.0;
    let positions: Vec<Vec3> = mesh.vertices.iter().map(|vx| vx.position).collect();
    for &eid in incident {
        let q = element_quality(sampler, hint, &mesh.elements[eid as usize], &positions).max(1e-9);
        reciprocal_sum += 1.0 / q;
    }
    incident.len() as f64 / reciprocal_sum
}

/// Fixed-width histogram of per-element quality values, plotted by
/// [`crate::benchmark`] after each pass.
#[derive(Clone, Debug)]
pub struct QualityHistogram {
    buckets: Vec<u32>,
    sum: f64,
    min: f64,
    max: f64,
    count: u64,
}

impl QualityHistogram {
    pub fn new(bucket_count: usize) -> Self {
        Self { buckets: vec![0; bucket_count], sum: 0.0, min: f64::INFINITY, max: f64::NEG_INFINITY, count: 0 }
    }

    pub fn record(&mut self, q: f64) {
        let bucket = ((q.clamp(0.0, 1.0) * self.buckets.len() as f64) as usize).min(self.buckets.len() - 1);
        self.buckets[bucket] += 1;
        self.sum += q;
        self.min = self.min.min(q);
        self.max = self.max.max(q);
        self.count += 1;
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 { 0.0 } else { self.sum / self.count as f64 }
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn buckets(&self) -> &[u32] {
        &self.buckets
    }
}

/// Builds every ideal reference shape and asserts it scores `1.0 ± 1e-6`
/// under the Euclidean metric. Run once at startup; a failure here means
/// the quality formulas themselves are broken, not the mesh being
/// optimized, so it's treated as fatal rather than skip-and-log.
pub fn self_test() -> Result<()> {
    let euclid = crate::sampler::AnalyticSampler::new(|_p: Vec3| Mat3::identity());
    let hint = RefTetHint::new();

    let tet_verts = [
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(0.5, 3f64.sqrt() / 2.0, 0.0),
        Vec3::new(0.5, 3f64.sqrt() / 6.0, (2.0 / 3.0f64).sqrt()),
    ];
    let q = tet_quality(&euclid, &hint, &tet_verts);
    if (q - 1.0).abs() > 1e-6 {
        return Err(Error::InvalidMeasure { element_kind: ElementKind::Tet, quality: q });
    }

    let pri_verts = [
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(0.5, 3f64.sqrt() / 2.0, 0.0),
        Vec3::new(0.0, 0.0, 1.0),
        Vec3::new(1.0, 0.0, 1.0),
        Vec3::new(0.5, 3f64.sqrt() / 2.0, 1.0),
    ];
    let q = pri_quality(&euclid, &hint, &pri_verts);
    if (q - 1.0).abs() > 1e-6 {
        return Err(Error::InvalidMeasure { element_kind: ElementKind::Pri, quality: q });
    }

    let hex_verts = [
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(1.0, 1.0, 0.0),
        Vec3::new(0.0, 1.0, 0.0),
        Vec3::new(0.0, 0.0, 1.0),
        Vec3::new(1.0, 0.0, 1.0),
        Vec3::new(1.0, 1.0, 1.0),
        Vec3::new(0.0, 1.0, 1.0),
    ];
    let q = hex_quality(&euclid, &hint, &hex_verts);
    if (q - 1.0).abs() > 1e-6 {
        return Err(Error::InvalidMeasure { element_kind: ElementKind::Hex, quality: q });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn self_test_passes() {
        assert!(self_test().is_ok());
    }

    #[test]
    fn sliver_tet_has_low_quality() {
        let euclid = crate::sampler::AnalyticSampler::new(|_p: Vec3| Mat3::identity());
        let hint = RefTetHint::new();
        let verts = [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(2.0, 0.0, 0.0001),
            Vec3::new(1.5, 0.0001, 0.0),
        ];
        let q = tet_quality(&euclid, &hint, &verts);
        assert!(q < 0.1);
    }

    #[test]
    fn histogram_tracks_mean_min_max() {
        let mut h = QualityHistogram::new(10);
        h.record(0.2);
        h.record(0.8);
        h.record(1.0);
        assert!((h.mean() - (2.0 / 3.0)).abs() < 1e-9);
        assert_eq!(h.min(), 0.2);
        assert_eq!(h.max(), 1.0);
        assert_eq!(h.count(), 3);
    }
}
