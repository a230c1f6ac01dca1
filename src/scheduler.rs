//! Scheduler: composes relocation passes (a chosen [`Smoother`] run to
//! convergence) and BATR topology passes under an *outer* termination
//! policy (§4.6). This is distinct from [`crate::smoother::TerminationPolicy`],
//! which governs a single smoother call's own per-pass gain check — the
//! scheduler's policy only ever looks at the mesh-wide histogram between
//! whole global passes.
//!
//! A global pass is: `relocationPassCount` smoother calls, then (if
//! enabled) `topoOperationPassCount` BATR passes, then `refinementSweepCount`
//! further smoother calls to resettle vertices BATR just split or merged,
//! before the pass is scored and the auto-pilot predicate is checked.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::evaluator::{self, QualityHistogram};
use crate::geometry::Vec3;
use crate::mesh::Mesh;
use crate::sampler::{MetricSampler, RefTetHint};
use crate::smoother::{MeshCrew, Smoother};
use crate::topologist::{BatrReport, Topologist};

/// Outer scheduling knobs (§4.6).
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Schedule {
    pub auto_pilot_enabled: bool,
    pub min_qual_threshold: f64,
    pub qual_mean_threshold: f64,
    pub topo_operation_enabled: bool,
    pub topo_operation_pass_count: u32,
    pub refinement_sweep_count: u32,
    pub relocation_pass_count: u32,
    pub global_pass_count: u32,
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            auto_pilot_enabled: false,
            min_qual_threshold: 0.3,
            qual_mean_threshold: 0.6,
            topo_operation_enabled: true,
            topo_operation_pass_count: 1,
            refinement_sweep_count: 1,
            relocation_pass_count: 5,
            global_pass_count: 20,
        }
    }
}

/// What one global pass accomplished, kept for [`crate::benchmark`].
#[derive(Clone, Debug, Default)]
pub struct GlobalPassRecord {
    pub min_quality: f64,
    pub mean_quality: f64,
    pub batr: Option<BatrReport>,
}

pub struct Scheduler {
    pub schedule: Schedule,
    pub topologist: Topologist,
}

impl Scheduler {
    pub fn new(schedule: Schedule, topologist: Topologist) -> Self {
        Self { schedule, topologist }
    }

    /// Runs global passes until `globalPassCount` is exhausted or, with
    /// auto-pilot enabled, both quality thresholds are met. Fails fast if
    /// the evaluator's regular-element self-test doesn't hold (`InvalidMeasure`
    /// is fatal at initialization, §7).
    pub fn run(&self, mesh: &mut Mesh, smoother: &dyn Smoother, crew: &MeshCrew) -> Result<Vec<GlobalPassRecord>> {
        evaluator::self_test()?;

        let mut history = Vec::with_capacity(self.schedule.global_pass_count as usize);
        for _ in 0..self.schedule.global_pass_count {
            for _ in 0..self.schedule.relocation_pass_count.max(1) {
                smoother.smooth(mesh, crew)?;
            }

            let batr = if self.schedule.topo_operation_enabled {
                let mut total = BatrReport::default();
                for _ in 0..self.schedule.topo_operation_pass_count.max(1) {
                    let r = self.topologist.run(mesh, crew.sampler)?;
                    total.edge_ops_passes += r.edge_ops_passes;
                    total.face_swaps += r.face_swaps;
                    total.edge_swaps += r.edge_swaps;
                }
                for _ in 0..self.schedule.refinement_sweep_count {
                    smoother.smooth(mesh, crew)?;
                }
                Some(total)
            } else {
                None
            };

            let hist = mesh_histogram(mesh, crew.sampler);
            let record = GlobalPassRecord { min_quality: hist.min(), mean_quality: hist.mean(), batr };
            let stop = self.schedule.auto_pilot_enabled
                && record.min_quality >= self.schedule.min_qual_threshold
                && record.mean_quality >= self.schedule.qual_mean_threshold;
            history.push(record);
            if stop {
                break;
            }
        }

        Ok(history)
    }
}

/// Mesh-wide quality histogram over every alive element, for termination
/// checks and [`crate::benchmark`] plots.
pub fn mesh_histogram(mesh: &Mesh, sampler: &dyn MetricSampler) -> QualityHistogram {
    let hint = RefTetHint::new();
    let positions: Vec<Vec3> = mesh.vertices.iter().map(|v| v.position).collect();
    let mut hist = QualityHistogram::new(32);
    for (_, element) in mesh.alive_elements() {
        hist.record(evaluator::element_quality(sampler, &hint, element, &positions));
    }
    hist
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Mat3;
    use crate::mesh::{Element, Vertex};
    use crate::sampler::AnalyticSampler;
    use crate::smoother::{laplace::laplace_smoother, Implementation};

    #[test]
    fn scheduler_runs_the_configured_number_of_global_passes() {
        let mut mesh = Mesh::new();
        mesh.add_vertex(Vertex::fixed(Vec3::new(0.0, 0.0, 0.0), crate::mesh::VOLUME_CONSTRAINT));
        mesh.add_vertex(Vertex::fixed(Vec3::new(1.0, 0.0, 0.0), crate::mesh::VOLUME_CONSTRAINT));
        mesh.add_vertex(Vertex::fixed(Vec3::new(0.0, 1.0, 0.0), crate::mesh::VOLUME_CONSTRAINT));
        mesh.add_vertex(Vertex::interior(Vec3::new(0.3, 0.3, 1.0)));
        mesh.add_element(Element::Tet([0, 1, 2, 3]));
        mesh.compile_topology();

        let sampler = AnalyticSampler::new(|_p| Mat3::identity());
        let crew = MeshCrew::new(&sampler, Implementation::Serial);
        let schedule = Schedule {
            auto_pilot_enabled: false,
            topo_operation_enabled: false,
            relocation_pass_count: 2,
            global_pass_count: 3,
            ..Schedule::default()
        };
        let scheduler = Scheduler::new(schedule, Topologist::default());
        let smoother = laplace_smoother();

        let history = scheduler.run(&mut mesh, &smoother, &crew).unwrap();
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn auto_pilot_stops_early_once_thresholds_are_met() {
        let mut mesh = Mesh::new();
        mesh.add_vertex(Vertex::interior(Vec3::new(0.0, 0.0, 0.0)));
        mesh.add_vertex(Vertex::interior(Vec3::new(1.0, 0.0, 0.0)));
        mesh.add_vertex(Vertex::interior(Vec3::new(0.5, 3f64.sqrt() / 2.0, 0.0)));
        mesh.add_vertex(Vertex::interior(Vec3::new(0.5, 3f64.sqrt() / 6.0, (2.0 / 3.0f64).sqrt())));
        mesh.add_element(Element::Tet([0, 1, 2, 3]));
        mesh.compile_topology();

        let sampler = AnalyticSampler::new(|_p| Mat3::identity());
        let crew = MeshCrew::new(&sampler, Implementation::Serial);
        let schedule = Schedule {
            auto_pilot_enabled: true,
            min_qual_threshold: 0.9,
            qual_mean_threshold: 0.9,
            topo_operation_enabled: false,
            relocation_pass_count: 1,
            global_pass_count: 10,
            ..Schedule::default()
        };
        let scheduler = Scheduler::new(schedule, Topologist::default());
        let smoother = laplace_smoother();

        let history = scheduler.run(&mut mesh, &smoother, &crew).unwrap();
        assert_eq!(history.len(), 1);
    }
}
