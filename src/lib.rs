//! # Scorecard Features
//!
//! Feature engineering transformers for credit-scoring datasets, built on
//! [Apache DataFusion](https://datafusion.apache.org/) DataFrames.
//!
//! Raw application and repayment rows are turned into model-ready features by chaining
//! transformers in a [`pipeline::Pipeline`]:
//!
//! - [`transformers::aggregation`]: per-customer distinct counts and means.
//! - [`transformers::datetime_features`]: day, minute and year deltas between date columns.
//! - [`transformers::imputation`]: missing indicators, constant fills and label-conditioned fills.
//! - [`transformers::column_selection`]: dropping columns.
//! - [`transformers::categorical_encoding`]: one-hot encoding without the reference level.
//!
//! Every transformer has an async `fit` and a lazy `transform`; nothing is executed until the
//! resulting DataFrame is collected.

pub mod exceptions;
mod logging;
pub mod pipeline;
pub mod transformers;
