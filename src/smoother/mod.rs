//! The smoother family: vertex-wise relocation algorithms sharing the
//! driver in [`vertex_wise`], plus the element-wise GETMe smoother. Every
//! smoother is selectable under all four [`Implementation`]s; `Glsl` and
//! `Cuda` share the same [`crate::gpu::GpuBackend`] contract (this port
//! standardizes the actual compute kernel on wgpu/WGSL — see
//! `crate::gpu` — but ships no per-algorithm kernel, so requesting either
//! without a registered one raises `ImplementationMissing`).

pub mod getme;
pub mod gradient_descent;
pub mod laplace;
pub mod multi_elem;
pub mod multi_pos;
pub mod nelder_mead;
pub mod quality_laplace;
pub mod spawn_search;
pub mod vertex_wise;

pub use getme::GetmeSmoother;
pub use gradient_descent::GradientDescentSmoother;
pub use laplace::LaplaceSmoother;
pub use multi_elem::MultiElemSmoother;
pub use multi_pos::MultiPosSmoother;
pub use nelder_mead::NelderMeadSmoother;
pub use quality_laplace::QualityLaplaceSmoother;
pub use spawn_search::SpawnSearchSmoother;
pub use vertex_wise::VertexWiseDriver;

use crate::error::{Error, Result};
use crate::mesh::Mesh;
use crate::sampler::MetricSampler;

/// How a smoother (or the evaluator) executes its inner loop. All four are
/// selectable by name for every smoother; `Thread` is the only one that
/// changes wall-clock behavior in this CPU-only build.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Implementation {
    Serial,
    Thread,
    Glsl,
    Cuda,
}

impl Implementation {
    pub fn is_gpu(self) -> bool {
        matches!(self, Implementation::Glsl | Implementation::Cuda)
    }

    pub fn name(self) -> &'static str {
        match self {
            Implementation::Serial => "serial",
            Implementation::Thread => "thread",
            Implementation::Glsl => "glsl",
            Implementation::Cuda => "cuda",
        }
    }
}

/// Everything a smoother pass needs beyond the mesh itself: the metric
/// sampler, the chosen implementation, and the shared per-vertex-wise
/// knobs (most algorithms only read a handful of these).
pub struct MeshCrew<'a> {
    pub sampler: &'a dyn MetricSampler,
    pub implementation: Implementation,
    /// Algorithm-specific coefficients; see each smoother's doc comment
    /// for which of these it reads.
    pub move_coeff: f64,
    pub security_cycle_count: u32,
    pub gradient_step: f64,
}

impl<'a> MeshCrew<'a> {
    pub fn new(sampler: &'a dyn MetricSampler, implementation: Implementation) -> Self {
        Self { sampler, implementation, move_coeff: 0.5, security_cycle_count: 20, gradient_step: 1e-3 }
    }
}

/// Per-smoother micro-convergence: stop once `pass >= min_iteration` and
/// every one of `min_gain`, `mean_gain`, `sum_gain` is below
/// `gain_threshold`. Independent of the scheduler's own termination (§4.6).
pub struct TerminationPolicy {
    pub min_iteration: u32,
    pub gain_threshold: f64,
    pub max_iteration: u32,
}

impl Default for TerminationPolicy {
    fn default() -> Self {
        Self { min_iteration: 2, gain_threshold: 1e-4, max_iteration: 200 }
    }
}

impl TerminationPolicy {
    pub fn should_stop(&self, pass: u32, min_gain: f64, mean_gain: f64, sum_gain: f64) -> bool {
        if pass >= self.max_iteration {
            return true;
        }
        pass >= self.min_iteration
            && min_gain < self.gain_threshold
            && mean_gain < self.gain_threshold
            && sum_gain < self.gain_threshold
    }
}

/// A smoother: relocates interior vertices to improve mesh-wide quality.
pub trait Smoother {
    fn smooth(&self, mesh: &mut Mesh, crew: &MeshCrew) -> Result<()>;

    fn name(&self) -> &'static str;
}

/// Translates an independent-group partition into a sequence of dispatches
/// under the chosen [`Implementation`]. Groups always run in order (a
/// group boundary is a barrier); within a group, `Thread` fans out with
/// rayon, `Serial` walks in place.
pub struct IndependentDispatch;

impl IndependentDispatch {
    pub fn run<F>(mesh: &Mesh, implementation: Implementation, per_vertex: F) -> Result<()>
    where
        F: Fn(u32) + Sync,
    {
        match implementation {
            Implementation::Serial => {
                for group in &mesh.topology.independent_groups {
                    for &v in group {
                        per_vertex(v);
                    }
                }
                Ok(())
            }
            Implementation::Thread => {
                use rayon::prelude::*;
                for group in &mesh.topology.independent_groups {
                    group.par_iter().for_each(|&v| per_vertex(v));
                }
                Ok(())
            }
            Implementation::Glsl => Err(Error::ImplementationMissing { name: "glsl" }),
            Implementation::Cuda => Err(Error::ImplementationMissing { name: "cuda" }),
        }
    }
}
