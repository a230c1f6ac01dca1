//! Scoped timing for the benchmark runner, via a `tracing` span and a
//! debug-level log of the elapsed wall-clock time.

/// Runs `$block` inside a `tracing` span named `$name`, logging the
/// elapsed wall-clock time at debug level. Evaluates to `$block`'s value.
#[macro_export]
macro_rules! timed {
    ($name:literal, $block:expr) => {{
        let _span = tracing::info_span!($name).entered();
        let start = std::time::Instant::now();
        let result = $block;
        let elapsed = start.elapsed().as_secs_f32();
        tracing::debug!(?elapsed, concat!($name, " took"));
        result
    }};
}

pub use timed;
