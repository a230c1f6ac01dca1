//! Metric sampler capability trait and the shared reference-element hint.
//!
//! A [`MetricSampler`] answers `M(p)` for any point `p` in the domain; the
//! [`RefTetHint`] lets a caller making many nearby queries (a smoother
//! sweeping a vertex neighborhood) avoid restarting acceleration structure
//! walks from scratch each time.

pub mod analytic;
pub mod kdtree;
pub mod local;
pub mod texture;

pub use analytic::AnalyticSampler;
pub use kdtree::KdTreeSampler;
pub use local::LocalSampler;
pub use texture::TextureSampler;

use std::cell::Cell;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{Error, Result};
use crate::geometry::{Mat3, Vec3};

/// Caches the index of the last element a [`LocalSampler`] walk resolved
/// to, so the next nearby query can start there instead of from scratch.
/// `None` means "no hint yet" (first query, or the last one missed).
#[derive(Default)]
pub struct RefTetHint(Cell<Option<u32>>);

impl RefTetHint {
    pub fn new() -> Self {
        Self(Cell::new(None))
    }

    #[inline]
    pub fn get(&self) -> Option<u32> {
        self.0.get()
    }

    #[inline]
    pub fn set(&self, elem: Option<u32>) {
        self.0.set(elem);
    }
}

/// A pluggable source of the Riemannian metric tensor `M(p)`.
pub trait MetricSampler: Send + Sync {
    /// Evaluate `M(p)`, updating `hint` in place for acceleration on the
    /// caller's next nearby query. Returns [`Error::OutOfDomain`] if `p`
    /// falls outside whatever domain the sampler can answer for.
    fn metric_at(&self, p: Vec3, hint: &RefTetHint) -> Result<Mat3>;

    /// Whether this sampler carries real anisotropic information. A
    /// measurer built over a non-metric-wise sampler falls back to the
    /// Euclidean (identity) metric rather than querying it.
    fn is_metric_wise(&self) -> bool {
        true
    }
}

/// Wraps any [`MetricSampler`] with a per-instance "log the first
/// `OutOfDomain` fallback, stay quiet after that" guard, matching the
/// logging design in §7/§9.
pub struct FallbackLoggingSampler<S> {
    inner: S,
    warned: AtomicBool,
}

impl<S: MetricSampler> FallbackLoggingSampler<S> {
    pub fn new(inner: S) -> Self {
        Self { inner, warned: AtomicBool::new(false) }
    }
}

impl<S: MetricSampler> MetricSampler for FallbackLoggingSampler<S> {
    fn metric_at(&self, p: Vec3, hint: &RefTetHint) -> Result<Mat3> {
        match self.inner.metric_at(p, hint) {
            Ok(m) => Ok(m),
            Err(Error::OutOfDomain) => {
                if !self.warned.swap(true, Ordering::Relaxed) {
                    log::warn!("metric sampler query escaped its domain at {p:?}, falling back to Euclidean metric for the rest of this run");
                }
                Ok(Mat3::identity())
            }
            Err(e) => Err(e),
        }
    }

    fn is_metric_wise(&self) -> bool {
        self.inner.is_metric_wise()
    }
}
