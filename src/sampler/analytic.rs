//! Closed-form metric sampler: no state, no acceleration structure. Used
//! for synthetic scenarios (the S1–S6 test meshes) where the target metric
//! field has a known formula.

use crate::error::Result;
use crate::geometry::{Mat3, Vec3};
use crate::sampler::{MetricSampler, RefTetHint};

/// Samples `M(p) = f(p)` for a caller-supplied closed-form `f`.
pub struct AnalyticSampler<F>
where
    F: Fn(Vec3) -> Mat3 + Send + Sync,
{
    field: F,
}

impl<F> AnalyticSampler<F>
where
    F: Fn(Vec3) -> Mat3 + Send + Sync,
{
    pub fn new(field: F) -> Self {
        Self { field }
    }

    /// Uniform isotropic metric scaled by `k` (target edge length `1/k`),
    /// the reference field used by the scaling-parameter scenarios.
    pub fn uniform(k: f64) -> AnalyticSampler<impl Fn(Vec3) -> Mat3 + Send + Sync> {
        AnalyticSampler::new(move |_p| Mat3::identity() * (k * k))
    }

    /// Diagonal anisotropic metric with aspect ratio `a` stretched along
    /// `x`, the reference field used by the anisotropy-parameter scenarios.
    pub fn anisotropic(k: f64, a: f64) -> AnalyticSampler<impl Fn(Vec3) -> Mat3 + Send + Sync> {
        AnalyticSampler::new(move |_p| {
            Mat3::from_diagonal(&Vec3::new(k * k / (a * a), k * k, k * k))
        })
    }
}

impl<F> MetricSampler for AnalyticSampler<F>
where
    F: Fn(Vec3) -> Mat3 + Send + Sync,
{
    fn metric_at(&self, p: Vec3, _hint: &RefTetHint) -> Result<Mat3> {
        Ok((self.field)(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_field_is_isotropic_everywhere() {
        let sampler = AnalyticSampler::uniform(2.0);
        let hint = RefTetHint::new();
        let m1 = sampler.metric_at(Vec3::new(0.0, 0.0, 0.0), &hint).unwrap();
        let m2 = sampler.metric_at(Vec3::new(50.0, -3.0, 7.0), &hint).unwrap();
        assert_eq!(m1, m2);
        assert!((m1[(0, 0)] - 4.0).abs() < 1e-12);
    }

    #[test]
    fn anisotropic_field_stretches_x_axis() {
        let sampler = AnalyticSampler::anisotropic(1.0, 4.0);
        let hint = RefTetHint::new();
        let m = sampler.metric_at(Vec3::zeros(), &hint).unwrap();
        assert!(m[(0, 0)] < m[(1, 1)]);
    }
}
