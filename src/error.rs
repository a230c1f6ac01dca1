// src/error.rs
//! Crate-wide error type and the per-pass error taxonomy from the error
//! handling design: most variants are local to a single vertex/element and
//! are caught at that scope rather than propagated — see
//! [`crate::scheduler`] and [`crate::topologist`] for where each variant is
//! raised and absorbed.

use std::fmt;
use thiserror::Error;

use crate::mesh::element::ElementKind;

/// Crate error type. `InvalidMeasure` and `ImplementationMissing` are the
/// only two variants meant to escape a single pass; everything else is
/// caught and turned into a skip-and-log by the component that raised it.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// The evaluator's startup self-test found a regular element whose
    /// quality is not within `1e-6` of 1. Fatal at initialization.
    #[error("quality self-test failed for {element_kind:?}: got {quality}, expected 1.0 +/- 1e-6")]
    InvalidMeasure { element_kind: ElementKind, quality: f64 },

    /// A metric sampler query landed outside the domain it can answer for
    /// (e.g. the local-tet walk escaped the source mesh). Callers fall back
    /// to the Euclidean measure; this variant exists so the fallback can be
    /// logged once per sampler.
    #[error("metric sampler query escaped its domain")]
    OutOfDomain,

    /// A topology edit (split/merge/swap) would make some element's volume
    /// non-positive. The edit is rejected and the mesh restored.
    #[error("topology edit rejected: {reason}")]
    NonConformal { reason: &'static str },

    /// A boundary projection failed to converge; the vertex is skipped for
    /// the remainder of the current pass.
    #[error("boundary projection failed to converge for vertex {vertex}")]
    BoundaryViolation { vertex: u32 },

    /// A zero-length edge or zero-area face was encountered where a
    /// well-formed one was expected.
    #[error("degenerate geometry: {reason}")]
    Degenerate { reason: &'static str },

    /// The caller asked for a smoother/sampler/backend name that isn't
    /// registered. Not locally recoverable — surfaced to the caller.
    #[error("implementation not registered: {name}")]
    ImplementationMissing { name: &'static str },

    /// I/O errors from mesh document / config loading.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Mesh document (de)serialization.
    #[error("mesh document error: {0}")]
    Json(#[from] serde_json::Error),

    /// Simple custom message (allocation only when the error happens).
    #[error("{0}")]
    Custom(String),

    /// Context chaining, cheap on the `Ok` path.
    #[error("{message}: {source}")]
    WithContext {
        message: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    #[inline]
    pub fn custom<S: Into<String>>(msg: S) -> Self {
        Self::Custom(msg.into())
    }

    #[inline]
    pub fn format(args: fmt::Arguments) -> Self {
        Self::Custom(fmt::format(args))
    }

    /// Add context to any error (chainable, `anyhow`-style).
    #[inline]
    pub fn context<C: Into<String>>(self, context: C) -> Self {
        Self::WithContext {
            message: context.into(),
            source: Box::new(self),
        }
    }

    #[inline]
    pub fn msg(msg: &'static str) -> Self {
        Self::Custom(msg.into())
    }

    /// Errors local to a single vertex/element/pass — safe to skip-and-log
    /// rather than abort the run (§7 of the error handling design).
    #[inline]
    pub fn is_local_to_pass(&self) -> bool {
        matches!(
            self,
            Error::OutOfDomain
                | Error::NonConformal { .. }
                | Error::BoundaryViolation { .. }
                | Error::Degenerate { .. }
        )
    }
}

/// Convenient `Result` alias — use `crate::error::Result<T>` everywhere.
pub type Result<T> = std::result::Result<T, Error>;
