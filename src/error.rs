//! Error types for the delay-feedback solver.
//!
//! Every failure is fatal for the run: a bad parameter invalidates all derived
//! indices, and a non-finite cell poisons every cell in its future light cone.
//! Library code propagates these with `?`; the binaries log and exit non-zero.

use thiserror::Error;

/// Result type for solver operations.
pub type Result<T> = std::result::Result<T, FdtdError>;

/// Errors that can occur while preparing, running or exporting a simulation.
#[derive(Error, Debug)]
pub enum FdtdError {
    /// A parameter violates a grid invariant.
    #[error("sanity_check: {0}")]
    Config(String),

    /// A required key is absent from the parameter file.
    #[error("parameter `{0}` is not given")]
    MissingParameter(&'static str),

    /// The parameter file is not valid `key = value` syntax.
    #[error("failed to parse parameter file: {0}")]
    Parse(#[from] toml::de::Error),

    /// The input condition cannot be used by the requested operation.
    #[error("{op}: unsupported input condition (init_cond={init_cond})")]
    UnsupportedInput { op: &'static str, init_cond: u32 },

    /// A buffer could not be allocated.
    #[error("{op}: cannot allocate memory for {cells} cells")]
    Allocation { op: &'static str, cells: usize },

    /// A seed series or the recurrence produced NaN or infinity.
    #[error("{op}: non-finite value produced (at j={t} and i={x})")]
    NonFinite { op: &'static str, t: usize, x: usize },

    /// An average operator was asked for a column outside the grid.
    #[error("{op}: column {x} beyond {side} boundary (valid range 1..={max})")]
    OutOfBounds {
        op: &'static str,
        x: isize,
        max: usize,
        side: &'static str,
    },

    /// The wavefront schedule cannot guarantee causal ordering.
    #[error("wavefront schedule: {0}")]
    Schedule(String),

    /// Worker pool construction failed.
    #[error("thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// Array shape mismatch.
    #[error("shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    /// Summary serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FdtdError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a schedule error.
    pub fn schedule(msg: impl Into<String>) -> Self {
        Self::Schedule(msg.into())
    }

    /// True for errors detected before any grid memory is touched.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::MissingParameter(_) | Self::Parse(_)
        )
    }
}
