//! ## Transformers for date-arithmetic features
//!
//! This module derives features from the gap between two date columns, such as the time between
//! an application and its approval or the age of an account in years.
//!
//! Currently, the following transformers are implemented:
//!
//! - **DaydeltaTransformer:** Per-customer mean of whole days from the second date to the first,
//!   counting only positive gaps.
//! - **TimedeltaTransformer:** Per-customer mean of the sub-hour remainder of the gap, in minutes.
//! - **AgeYears:** Row-level calendar-year difference; the first date column is dropped.
//! - **ApprovalPeriod:** Row-level sub-hour remainder of the gap in minutes; both date columns
//!   are dropped.
//!
//! Date columns may hold ISO-8601 strings, dates or timestamps. Parsing happens inside the plan,
//! so no helper columns ever appear in the output. `fit` materialises both date columns and
//! reports unparseable values as [`ScorecardError::ParseError`]; when only `transform` is used,
//! a bad value fails the eventual `collect()` instead.

use crate::exceptions::{ScorecardError, ScorecardResult};
use crate::impl_transformer;
use crate::transformers::{validate_columns, CUSTOMER_KEY};
use datafusion::arrow::datatypes::{DataType, TimeUnit};
use datafusion::dataframe::DataFrame;
use datafusion::functions_aggregate::expr_fn::avg;
use datafusion::logical_expr::{cast, col, lit, Case as DFCase, Expr};
use datafusion_functions::datetime::{date_part, to_unixtime};
use tracing::debug;

const SECONDS_PER_DAY: i64 = 86_400;
const SECONDS_PER_HOUR: i64 = 3_600;

/// Parses a date-like column into a second-resolution timestamp.
fn parsed_datetime(name: &str) -> Expr {
    cast(col(name), DataType::Timestamp(TimeUnit::Second, None))
}

/// Signed number of seconds from `t2` to `t1` (Int64).
fn seconds_between(t1: &str, t2: &str) -> Expr {
    to_unixtime().call(vec![parsed_datetime(t1)]) - to_unixtime().call(vec![parsed_datetime(t2)])
}

/// Whole days from `t2` to `t1` when `t1` is later, 0 otherwise, missing if either date is.
fn positive_days_expr(t1: &str, t2: &str) -> Expr {
    let diff = seconds_between(t1, t2);
    Expr::Case(DFCase {
        expr: None,
        when_then_expr: vec![
            (
                Box::new(diff.clone().gt(lit(0_i64))),
                Box::new(diff.clone() / lit(SECONDS_PER_DAY)),
            ),
            (Box::new(diff.is_not_null()), Box::new(lit(0_i64))),
        ],
        else_expr: None,
    })
}

/// Remainder of the gap modulo one hour, in fractional minutes within `[0, 60)`.
fn sub_hour_minutes_expr(t1: &str, t2: &str) -> Expr {
    let diff = seconds_between(t1, t2);
    let hour = lit(SECONDS_PER_HOUR);
    // Euclidean remainder: `%` keeps the dividend's sign.
    let remainder = ((diff % hour.clone()) + hour.clone()) % hour;
    cast(remainder, DataType::Float64) / lit(60.0)
}

/// Every column of `df` except `dropped`, in schema order.
fn retained_columns(df: &DataFrame, dropped: &[&String]) -> Vec<Expr> {
    df.schema()
        .fields()
        .iter()
        .filter(|f| !dropped.contains(&f.name()))
        .map(|f| col(f.name()))
        .collect()
}

/// Runs the parse for both date columns so malformed values surface before any transform.
async fn validate_parseable(df: &DataFrame, t1: &str, t2: &str) -> ScorecardResult<()> {
    validate_columns(df, &[t1, t2])?;
    let parsed = df.clone().select(vec![
        parsed_datetime(t1).alias("__parsed_t1"),
        parsed_datetime(t2).alias("__parsed_t2"),
    ])?;
    parsed.collect().await.map_err(|e| {
        ScorecardError::ParseError(format!(
            "Columns '{}' and '{}' must hold valid dates: {}",
            t1, t2, e
        ))
    })?;
    debug!("Date columns '{}' and '{}' parsed cleanly", t1, t2);
    Ok(())
}

/// Per-customer mean of the whole days elapsed from `t2_col` to `t1_col`.
///
/// A row where `t1_col` is not strictly later than `t2_col` contributes 0 rather than a negative
/// number of days.
pub struct DaydeltaTransformer {
    pub t1_col: String,
    pub t2_col: String,
    pub col_name: String,
    pub key: String,
}

impl DaydeltaTransformer {
    pub fn new(t1_col: String, t2_col: String, col_name: String) -> Self {
        Self {
            t1_col,
            t2_col,
            col_name,
            key: CUSTOMER_KEY.to_string(),
        }
    }

    /// Group on `key` instead of the default customer key.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Stateless transformer: fit checks that both date columns parse.
    pub async fn fit(&mut self, df: &DataFrame) -> ScorecardResult<()> {
        validate_columns(df, &[&self.key])?;
        validate_parseable(df, &self.t1_col, &self.t2_col).await
    }

    /// Returns the key column and `col_name` (Float64), one row per customer.
    ///
    /// The plan is lazy: only `fit` reports malformed dates as `ParseError`. Without a prior
    /// `fit`, a bad date fails the plan's `collect()` with a DataFusion cast error.
    pub fn transform(&self, df: DataFrame) -> ScorecardResult<DataFrame> {
        validate_columns(&df, &[&self.key, &self.t1_col, &self.t2_col])?;
        let days = positive_days_expr(&self.t1_col, &self.t2_col);
        df.aggregate(vec![col(&self.key)], vec![avg(days).alias(&self.col_name)])?
            .sort(vec![col(&self.key).sort(true, false)])
            .map_err(ScorecardError::from)
    }

    fn inherent_is_stateful(&self) -> bool {
        false
    }
}

/// Per-customer mean of the gap from `t2_col` to `t1_col` modulo one hour, in minutes.
pub struct TimedeltaTransformer {
    pub t1_col: String,
    pub t2_col: String,
    pub col_name: String,
    pub key: String,
}

impl TimedeltaTransformer {
    pub fn new(t1_col: String, t2_col: String, col_name: String) -> Self {
        Self {
            t1_col,
            t2_col,
            col_name,
            key: CUSTOMER_KEY.to_string(),
        }
    }

    /// Group on `key` instead of the default customer key.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Stateless transformer: fit checks that both date columns parse.
    pub async fn fit(&mut self, df: &DataFrame) -> ScorecardResult<()> {
        validate_columns(df, &[&self.key])?;
        validate_parseable(df, &self.t1_col, &self.t2_col).await
    }

    /// Returns the key column and `col_name` (Float64), one row per customer.
    ///
    /// The plan is lazy: only `fit` reports malformed dates as `ParseError`. Without a prior
    /// `fit`, a bad date fails the plan's `collect()` with a DataFusion cast error.
    pub fn transform(&self, df: DataFrame) -> ScorecardResult<DataFrame> {
        validate_columns(&df, &[&self.key, &self.t1_col, &self.t2_col])?;
        let minutes = sub_hour_minutes_expr(&self.t1_col, &self.t2_col);
        df.aggregate(
            vec![col(&self.key)],
            vec![avg(minutes).alias(&self.col_name)],
        )?
        .sort(vec![col(&self.key).sort(true, false)])
        .map_err(ScorecardError::from)
    }

    fn inherent_is_stateful(&self) -> bool {
        false
    }
}

/// Calendar-year difference `year(t1_col) - year(t2_col)` as Int64; month and day are ignored.
/// `t1_col` is dropped from the output, `t2_col` is kept.
pub struct AgeYears {
    pub t1_col: String,
    pub t2_col: String,
    pub col_name: String,
}

impl AgeYears {
    pub fn new(t1_col: String, t2_col: String, col_name: String) -> Self {
        Self {
            t1_col,
            t2_col,
            col_name,
        }
    }

    /// Stateless transformer: fit checks that both date columns parse.
    pub async fn fit(&mut self, df: &DataFrame) -> ScorecardResult<()> {
        validate_parseable(df, &self.t1_col, &self.t2_col).await
    }

    /// Appends `col_name` to the retained columns.
    ///
    /// The plan is lazy: only `fit` reports malformed dates as `ParseError`. Without a prior
    /// `fit`, a bad date fails the plan's `collect()` with a DataFusion cast error.
    pub fn transform(&self, df: DataFrame) -> ScorecardResult<DataFrame> {
        validate_columns(&df, &[&self.t1_col, &self.t2_col])?;
        let year_of = |name: &str| {
            cast(
                date_part().call(vec![lit("year"), parsed_datetime(name)]),
                DataType::Int64,
            )
        };
        let years = year_of(&self.t1_col) - year_of(&self.t2_col);

        let mut exprs = retained_columns(&df, &[&self.t1_col]);
        exprs.push(years.alias(&self.col_name));
        df.select(exprs).map_err(ScorecardError::from)
    }

    fn inherent_is_stateful(&self) -> bool {
        false
    }
}

/// Row-level gap from `t2_col` to `t1_col` modulo one hour, in minutes (Float64).
/// Both date columns are dropped from the output.
pub struct ApprovalPeriod {
    pub t1_col: String,
    pub t2_col: String,
    pub col_name: String,
}

impl ApprovalPeriod {
    pub fn new(t1_col: String, t2_col: String, col_name: String) -> Self {
        Self {
            t1_col,
            t2_col,
            col_name,
        }
    }

    /// Stateless transformer: fit checks that both date columns parse.
    pub async fn fit(&mut self, df: &DataFrame) -> ScorecardResult<()> {
        validate_parseable(df, &self.t1_col, &self.t2_col).await
    }

    /// Appends `col_name` to the retained columns.
    ///
    /// The plan is lazy: only `fit` reports malformed dates as `ParseError`. Without a prior
    /// `fit`, a bad date fails the plan's `collect()` with a DataFusion cast error.
    pub fn transform(&self, df: DataFrame) -> ScorecardResult<DataFrame> {
        validate_columns(&df, &[&self.t1_col, &self.t2_col])?;
        let minutes = sub_hour_minutes_expr(&self.t1_col, &self.t2_col);

        let mut exprs = retained_columns(&df, &[&self.t1_col, &self.t2_col]);
        exprs.push(minutes.alias(&self.col_name));
        df.select(exprs).map_err(ScorecardError::from)
    }

    fn inherent_is_stateful(&self) -> bool {
        false
    }
}

impl_transformer!(DaydeltaTransformer);
impl_transformer!(TimedeltaTransformer);
impl_transformer!(AgeYears);
impl_transformer!(ApprovalPeriod);
