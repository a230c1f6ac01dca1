//! Engine-wide configuration (§6's recognized option table), loaded via
//! [`crate::io::load_config_file`] or built programmatically.

use serde::{Deserialize, Serialize};

use crate::geometry::Vec3;
use crate::mesh::Mesh;
use crate::sampler::{AnalyticSampler, MetricSampler, RefTetHint, TextureSampler};
use crate::scheduler::Schedule;

/// Engine-wide tunables: metric field shape plus per-implementation thread
/// counts, and the [`Schedule`] driving the outer optimization loop.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Uniform scaling `K` of the metric field; larger `K` means more,
    /// smaller elements.
    pub metric_scaling: f64,
    /// Anisotropy factor `A` of the metric field.
    pub metric_aspect_ratio: f64,
    /// Texture sampler grid resolution per axis.
    pub metric_discretization_depth: u32,
    /// GPU evaluator workgroup size, GLSL path (1..=1024).
    pub glsl_evaluator_threads: u32,
    /// GPU evaluator workgroup size, CUDA path (1..=1024).
    pub cuda_evaluator_threads: u32,
    /// GPU smoother workgroup size, GLSL path.
    pub glsl_smoother_threads: u32,
    /// GPU smoother workgroup size, CUDA path.
    pub cuda_smoother_threads: u32,
    pub schedule: Schedule,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            metric_scaling: 1.0,
            metric_aspect_ratio: 1.0,
            metric_discretization_depth: 32,
            glsl_evaluator_threads: 16,
            cuda_evaluator_threads: 32,
            glsl_smoother_threads: 16,
            cuda_smoother_threads: 32,
            schedule: Schedule::default(),
        }
    }
}

impl EngineConfig {
    #[inline(always)]
    pub fn metric_scaling(mut self, k: f64) -> Self {
        self.metric_scaling = k;
        self
    }

    #[inline(always)]
    pub fn metric_aspect_ratio(mut self, a: f64) -> Self {
        self.metric_aspect_ratio = a;
        self
    }

    #[inline(always)]
    pub fn schedule(mut self, schedule: Schedule) -> Self {
        self.schedule = schedule;
        self
    }

    /// Clamps both GPU evaluator thread counts into the documented `1..=1024`
    /// test range; out-of-range values from a loaded config are silently
    /// clamped rather than rejected, matching the "skip-and-log" posture
    /// for everything that isn't `InvalidMeasure`/`ImplementationMissing`.
    pub fn clamp_thread_counts(mut self) -> Self {
        self.glsl_evaluator_threads = self.glsl_evaluator_threads.clamp(1, 1024);
        self.cuda_evaluator_threads = self.cuda_evaluator_threads.clamp(1, 1024);
        self.glsl_smoother_threads = self.glsl_smoother_threads.clamp(1, 1024);
        self.cuda_smoother_threads = self.cuda_smoother_threads.clamp(1, 1024);
        self
    }

    /// Builds the metric sampler described by `metric_scaling`,
    /// `metric_aspect_ratio`, and `metric_discretization_depth`: the
    /// anisotropic analytic field those two scalars parametrize (§6),
    /// discretized onto a `metric_discretization_depth`-per-axis texture
    /// grid over `[origin, origin + extent]` the way a GPU evaluator pass
    /// would sample it, rather than evaluating the closed form directly.
    pub fn build_sampler(&self, origin: Vec3, extent: Vec3) -> TextureSampler {
        let field = AnalyticSampler::anisotropic(self.metric_scaling, self.metric_aspect_ratio);
        let hint = RefTetHint::new();
        TextureSampler::discretize(
            move |p| field.metric_at(p, &hint).unwrap_or_else(|_| crate::geometry::Mat3::identity()),
            origin,
            extent,
            self.metric_discretization_depth as usize,
        )
    }
}

/// Axis-aligned bounding box of every alive vertex, padded by `margin` on
/// each side so a [`TextureSampler`] grid built from it covers the whole
/// mesh instead of clipping at the boundary.
pub fn mesh_bounds(mesh: &Mesh, margin: f64) -> (Vec3, Vec3) {
    let mut lo = Vec3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY);
    let mut hi = Vec3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
    for v in mesh.vertices.iter().filter(|v| v.is_alive()) {
        lo = lo.inf(&v.position);
        hi = hi.sup(&v.position);
    }
    let pad = Vec3::new(margin, margin, margin);
    (lo - pad, hi - lo + pad * 2.0)
}
