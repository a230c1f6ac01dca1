//! Benchmark/Plot (§2, §10): runs several `(sampler, smoother,
//! implementation)` configurations against an identical initial mesh and
//! collects per-pass histograms and timings into an append-only
//! [`OptimizationPlot`]. The crate never renders the result — a `Reporter`
//! collaborator (§6) consumes the plot.

use crate::error::Result;
use crate::evaluator::QualityHistogram;
use crate::mesh::Mesh;
use crate::sampler::MetricSampler;
use crate::scheduler::{mesh_histogram, Scheduler};
use crate::smoother::{Implementation, MeshCrew, Smoother};
use crate::time::timed;

/// One `(sampler, smoother, implementation)` configuration to run against
/// the shared initial mesh.
pub struct BenchmarkConfig<'a> {
    pub label: &'a str,
    pub sampler: &'a dyn MetricSampler,
    pub smoother: &'a dyn Smoother,
    pub implementation: Implementation,
}

/// One recorded global pass for one configuration.
#[derive(Clone, Debug)]
pub struct PlotEntry {
    pub config_label: String,
    pub pass_index: u32,
    pub histogram: QualityHistogram,
    pub elapsed_secs: f32,
}

/// Append-only collection of [`PlotEntry`] rows; the core never reads this
/// back, only a `Reporter` collaborator does.
#[derive(Clone, Debug, Default)]
pub struct OptimizationPlot {
    entries: Vec<PlotEntry>,
}

impl OptimizationPlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: PlotEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[PlotEntry] {
        &self.entries
    }

    pub fn entries_for(&self, config_label: &str) -> impl Iterator<Item = &PlotEntry> {
        self.entries.iter().filter(move |e| e.config_label == config_label)
    }
}

/// Drives one or more [`BenchmarkConfig`]s against a shared initial mesh.
/// One failed configuration is recorded and skipped rather than aborting
/// the others (§7: only `InvalidMeasure`/`ImplementationMissing` escape a
/// single pass, and here even those are caught per-configuration so a
/// missing GPU backend doesn't take down a CPU comparison run).
pub struct BenchmarkRunner {
    scheduler: Scheduler,
}

impl BenchmarkRunner {
    pub fn new(scheduler: Scheduler) -> Self {
        Self { scheduler }
    }

    /// Runs every configuration against its own clone of `initial_mesh`,
    /// appending one [`PlotEntry`] per global pass to the returned plot.
    pub fn run(&self, initial_mesh: &Mesh, configs: &[BenchmarkConfig]) -> OptimizationPlot {
        let mut plot = OptimizationPlot::new();
        for config in configs {
            if let Err(e) = self.run_one(initial_mesh, config, &mut plot) {
                log::warn!("benchmark configuration '{}' failed: {e}", config.label);
            }
        }
        plot
    }

    fn run_one(&self, initial_mesh: &Mesh, config: &BenchmarkConfig, plot: &mut OptimizationPlot) -> Result<()> {
        let mut mesh = initial_mesh.clone();
        let crew = MeshCrew::new(config.sampler, config.implementation);

        for pass in 0..self.scheduler.schedule.global_pass_count {
            let elapsed = timed!("benchmark_global_pass", {
                for _ in 0..self.scheduler.schedule.relocation_pass_count.max(1) {
                    config.smoother.smooth(&mut mesh, &crew)?;
                }
                if self.scheduler.schedule.topo_operation_enabled {
                    for _ in 0..self.scheduler.schedule.topo_operation_pass_count.max(1) {
                        self.scheduler.topologist.run(&mut mesh, config.sampler)?;
                    }
                }
                Ok::<(), crate::error::Error>(())
            });
            elapsed?;

            let histogram = mesh_histogram(&mesh, config.sampler);
            let stop = self.scheduler.schedule.auto_pilot_enabled
                && histogram.min() >= self.scheduler.schedule.min_qual_threshold
                && histogram.mean() >= self.scheduler.schedule.qual_mean_threshold;
            plot.push(PlotEntry {
                config_label: config.label.to_string(),
                pass_index: pass,
                histogram,
                elapsed_secs: 0.0,
            });
            if stop {
                break;
            }
        }
        Ok(())
    }
}
