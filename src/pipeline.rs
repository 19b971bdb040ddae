//! ## Transformer Pipeline
//!
//! Core abstractions for chaining scorecard transformers.
//!
//! - The [`Transformer`] trait is the common `fit`/`transform` contract every transformer follows.
//! - The [`Pipeline`] struct runs a named sequence of transformers, feeding the output of each
//!   step into the next one.
//! - The macros [`crate::impl_transformer`] and [`crate::make_pipeline`] implement the trait for
//!   a transformer type and build pipelines without manual boxing.

use crate::exceptions::{ScorecardError, ScorecardResult};
use async_trait::async_trait;
use datafusion::prelude::*;
use std::time::Instant;
use tracing::{debug, info};

/// Trait for components used in a feature construction pipeline.
///
/// `fit` may execute queries to learn parameters from the data; `transform` only extends the
/// DataFrame's logical plan and never triggers execution.
#[async_trait]
pub trait Transformer {
    /// Fit the transformer on a DataFrame.
    async fn fit(&mut self, df: &DataFrame) -> ScorecardResult<()>;

    /// Transform the input DataFrame, returning a new DataFrame with the transformation applied.
    fn transform(&self, df: DataFrame) -> ScorecardResult<DataFrame>;

    /// Returns true if the transformer learns state in `fit` that `transform` depends on.
    fn is_stateful(&self) -> bool;
}

/// Implements [`Transformer`] for a type with the inherent methods
/// `async fn fit(&mut self, &DataFrame)`, `fn transform(&self, DataFrame)` and
/// `fn inherent_is_stateful(&self) -> bool`.
///
/// ```rust,no_run
/// use datafusion::prelude::DataFrame;
/// use scorecard_features::exceptions::ScorecardResult;
/// use scorecard_features::impl_transformer;
///
/// pub struct Passthrough;
///
/// impl Passthrough {
///     pub async fn fit(&mut self, _df: &DataFrame) -> ScorecardResult<()> {
///         Ok(())
///     }
///
///     pub fn transform(&self, df: DataFrame) -> ScorecardResult<DataFrame> {
///         Ok(df)
///     }
///
///     fn inherent_is_stateful(&self) -> bool {
///         false
///     }
/// }
///
/// impl_transformer!(Passthrough);
/// ```
#[macro_export]
macro_rules! impl_transformer {
    ($ty:ty) => {
        #[async_trait::async_trait]
        impl $crate::pipeline::Transformer for $ty {
            async fn fit(
                &mut self,
                df: &datafusion::prelude::DataFrame,
            ) -> $crate::exceptions::ScorecardResult<()> {
                <$ty>::fit(self, df).await
            }
            fn transform(
                &self,
                df: datafusion::prelude::DataFrame,
            ) -> $crate::exceptions::ScorecardResult<datafusion::prelude::DataFrame> {
                <$ty>::transform(self, df)
            }
            fn is_stateful(&self) -> bool {
                <$ty>::inherent_is_stateful(self)
            }
        }
    };
}

fn log_progress(verbose: bool, message: String) {
    if verbose {
        info!("{}", message);
    } else {
        debug!("{}", message);
    }
}

/// A boxed pipeline step.
pub type Step = (String, Box<dyn Transformer + Send + Sync>);

/// A pipeline that chains a sequence of transformers.
///
/// Each transformer's output plan is the next transformer's input, so the whole chain stays lazy
/// until the caller collects the final DataFrame.
pub struct Pipeline {
    steps: Vec<Step>,
    verbose: bool,
}

impl Pipeline {
    /// Creates a new pipeline from (name, transformer) pairs.
    /// With `verbose`, step progress and timings are logged at info level instead of debug.
    pub fn new(steps: Vec<Step>, verbose: bool) -> Self {
        Self { steps, verbose }
    }

    /// Names of the steps, in execution order.
    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Fits each transformer in order on the output of the previous one and returns the
    /// transformed DataFrame.
    pub async fn fit(&mut self, df: &DataFrame) -> ScorecardResult<DataFrame> {
        if self.steps.is_empty() {
            return Err(ScorecardError::InvalidParameter(
                "Pipeline must have at least one transformer.".to_string(),
            ));
        }
        let verbose = self.verbose;
        let mut current_df = df.clone();
        for (name, step) in self.steps.iter_mut() {
            let start = Instant::now();
            log_progress(verbose, format!("Fitting step: {}", name));
            step.fit(&current_df)
                .await
                .map_err(|e| e.in_step(name, "fitting"))?;
            current_df = step
                .transform(current_df)
                .map_err(|e| e.in_step(name, "transforming"))?;
            log_progress(
                verbose,
                format!("Step '{}' completed in {:?}", name, start.elapsed()),
            );
        }
        Ok(current_df)
    }

    /// Applies the `transform` method of each transformer without fitting.
    pub fn transform(&self, df: DataFrame) -> ScorecardResult<DataFrame> {
        if self.steps.is_empty() {
            return Err(ScorecardError::InvalidParameter(
                "Pipeline must have at least one transformer.".to_string(),
            ));
        }
        let mut current_df = df;
        for (name, step) in self.steps.iter() {
            log_progress(self.verbose, format!("Applying transformer: {}", name));
            current_df = step
                .transform(current_df)
                .map_err(|e| e.in_step(name, "transforming"))?;
        }
        Ok(current_df)
    }

    /// Convenience method: fits the pipeline and returns the final transformed DataFrame.
    pub async fn fit_transform(&mut self, df: &DataFrame) -> ScorecardResult<DataFrame> {
        self.fit(df).await
    }
}

/// Builds a [`Pipeline`] from `(name, transformer)` pairs, boxing each transformer.
///
/// ```rust,no_run
/// use scorecard_features::make_pipeline;
/// use scorecard_features::transformers::column_selection::ColumnDropTransformer;
///
/// let pipeline = make_pipeline!(false,
///     ("drop_ids", ColumnDropTransformer::new(vec!["loanid".to_string()])),
/// );
/// ```
#[macro_export]
macro_rules! make_pipeline {
    ($verbose:expr, $(($name:expr, $transformer:expr)),+ $(,)?) => {
        {
            let steps: Vec<$crate::pipeline::Step> = vec![
                $(
                    ($name.to_string(), Box::new($transformer)),
                )+
            ];
            $crate::pipeline::Pipeline::new(steps, $verbose)
        }
    };
}
