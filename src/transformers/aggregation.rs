//! ## Transformers for per-customer aggregation
//!
//! This module collapses application-level rows into customer-level features.
//!
//! Currently, the following transformers are implemented:
//!
//! - **GetUnique:** Counts the distinct non-missing values of each column per customer.
//! - **GetUid:** Lists the distinct values of one or more columns across the whole table.
//! - **GetMean:** Averages each column per customer, skipping missing values.
//!
//! Grouping transformers emit one row per distinct customer key, sorted by key, and group on
//! [`CUSTOMER_KEY`] unless another key is set with `with_key`.

use crate::exceptions::{ScorecardError, ScorecardResult};
use crate::impl_transformer;
use crate::transformers::{validate_columns, CUSTOMER_KEY};
use datafusion::dataframe::DataFrame;
use datafusion::functions_aggregate::expr_fn::{avg, count_distinct};
use datafusion::logical_expr::{col, Expr};

/// Groups `df` by `key` with one aggregate per target column (aliased to the column's name)
/// and sorts the result by key.
fn aggregate_by_key<F>(
    df: DataFrame,
    key: &str,
    columns: &[String],
    aggregate: F,
) -> ScorecardResult<DataFrame>
where
    F: Fn(Expr) -> Expr,
{
    let aggr_exprs: Vec<Expr> = columns
        .iter()
        .map(|name| aggregate(col(name)).alias(name))
        .collect();
    df.aggregate(vec![col(key)], aggr_exprs)?
        .sort(vec![col(key).sort(true, false)])
        .map_err(ScorecardError::from)
}

fn check_not_key(columns: &[String], key: &str) -> ScorecardResult<()> {
    if columns.iter().any(|c| c == key) {
        return Err(ScorecardError::InvalidParameter(format!(
            "Cannot aggregate the grouping key '{}' onto itself",
            key
        )));
    }
    Ok(())
}

/// Counts, per customer, how many distinct non-missing values each target column holds.
/// A customer whose values are all missing gets a count of 0.
pub struct GetUnique {
    pub columns: Vec<String>,
    pub key: String,
}

impl GetUnique {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            key: CUSTOMER_KEY.to_string(),
        }
    }

    /// Group on `key` instead of the default customer key.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Stateless transformer: fit only validates the input.
    pub async fn fit(&mut self, df: &DataFrame) -> ScorecardResult<()> {
        validate_columns(df, &[&self.key])?;
        validate_columns(df, &self.columns)
    }

    /// Returns the key column plus one Int64 count column per target column.
    pub fn transform(&self, df: DataFrame) -> ScorecardResult<DataFrame> {
        validate_columns(&df, &[&self.key])?;
        validate_columns(&df, &self.columns)?;
        check_not_key(&self.columns, &self.key)?;
        aggregate_by_key(df, &self.key, &self.columns, count_distinct)
    }

    fn inherent_is_stateful(&self) -> bool {
        false
    }
}

/// Returns the distinct values of the target columns across the whole table.
///
/// The result is sorted ascending with nulls last; a missing value counts as one distinct value.
pub struct GetUid {
    pub columns: Vec<String>,
}

impl GetUid {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns }
    }

    /// Stateless transformer: fit only validates the input.
    pub async fn fit(&mut self, df: &DataFrame) -> ScorecardResult<()> {
        validate_columns(df, &self.columns)
    }

    pub fn transform(&self, df: DataFrame) -> ScorecardResult<DataFrame> {
        validate_columns(&df, &self.columns)?;
        if self.columns.is_empty() {
            return Err(ScorecardError::InvalidParameter(
                "GetUid needs at least one column".to_string(),
            ));
        }
        let selection: Vec<Expr> = self.columns.iter().map(|c| col(c)).collect();
        let order: Vec<_> = self
            .columns
            .iter()
            .map(|c| col(c).sort(true, false))
            .collect();
        df.select(selection)?
            .distinct()?
            .sort(order)
            .map_err(ScorecardError::from)
    }

    fn inherent_is_stateful(&self) -> bool {
        false
    }
}

/// Averages each target column per customer. Missing values are skipped; a customer with no
/// values at all gets a missing mean.
pub struct GetMean {
    pub columns: Vec<String>,
    pub key: String,
}

impl GetMean {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            key: CUSTOMER_KEY.to_string(),
        }
    }

    /// Group on `key` instead of the default customer key.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Stateless transformer: fit only validates the input.
    pub async fn fit(&mut self, df: &DataFrame) -> ScorecardResult<()> {
        validate_columns(df, &[&self.key])?;
        validate_columns(df, &self.columns)
    }

    /// Returns the key column plus one Float64 mean column per target column.
    pub fn transform(&self, df: DataFrame) -> ScorecardResult<DataFrame> {
        validate_columns(&df, &[&self.key])?;
        validate_columns(&df, &self.columns)?;
        check_not_key(&self.columns, &self.key)?;
        aggregate_by_key(df, &self.key, &self.columns, avg)
    }

    fn inherent_is_stateful(&self) -> bool {
        false
    }
}

impl_transformer!(GetUnique);
impl_transformer!(GetUid);
impl_transformer!(GetMean);
