//! ## Errors for Scorecard Features
//!
//! This module defines the error type shared by every transformer and the pipeline.
//! It uses the `thiserror` crate to derive the `Error` trait.
//!
//! The `ScorecardResult` type alias is the result type returned across the library.
//!
//! ### Example
//!
//! ```rust
//! use scorecard_features::exceptions::{ScorecardError, ScorecardResult};
//!
//! fn check_stat(keyword: &str) -> ScorecardResult<()> {
//!     Err(ScorecardError::ConfigurationError(format!("unsupported statistic '{}'", keyword)))
//! }
//! ```

use thiserror::Error;

/// Errors raised by Scorecard Features transformers.
#[derive(Debug, Error)]
pub enum ScorecardError {
    /// Wraps errors from DataFusion.
    #[error("DataFusion error: {0}")]
    DataFusionError(#[from] datafusion::error::DataFusionError),

    /// Wraps errors from Arrow.
    #[error("Arrow error: {0}")]
    ArrowError(#[from] arrow::error::ArrowError),

    /// A referenced column does not exist in the DataFrame.
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// A date-valued column holds a value that cannot be parsed.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// A transformer was configured with values it cannot work with
    /// (e.g. an unknown statistic keyword or unexpected label classes).
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// An invalid argument was passed to a transformer or pipeline.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The transform method was called before fit on a stateful transformer.
    #[error("Transform called before fit for stateful transformer")]
    FitNotCalled,

    /// A pipeline step failed; `source` is the step's own error, unchanged.
    #[error("Pipeline step '{step}' failed while {stage}: {source}")]
    StepFailed {
        step: String,
        /// `"fitting"` or `"transforming"`.
        stage: &'static str,
        #[source]
        source: Box<ScorecardError>,
    },
}

impl ScorecardError {
    pub(crate) fn in_step(self, step: &str, stage: &'static str) -> Self {
        ScorecardError::StepFailed {
            step: step.to_string(),
            stage,
            source: Box::new(self),
        }
    }
}

/// Result type for Scorecard Features operations.
pub type ScorecardResult<T> = std::result::Result<T, ScorecardError>;
