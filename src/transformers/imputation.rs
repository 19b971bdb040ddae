//! ## Transformers for missing values
//!
//! This module provides transformers that flag or fill missing values.
//!
//! Currently, the following transformers are implemented:
//!
//! - **ReferredTransformer**: Adds a 1/0 indicator telling whether a column is present.
//! - **VarFillNa**: Fills missing values with a fixed constant.
//! - **StatFillNa**: Fills missing values with a statistic (mean, median or mode) computed
//!   separately for each outcome label class.
//!
//! Each transformer returns a new DataFrame; row order is preserved.
//! Errors are returned as `ScorecardError` and results are wrapped in `ScorecardResult`.

use crate::exceptions::{ScorecardError, ScorecardResult};
use crate::impl_transformer;
use crate::transformers::{all_columns, validate_columns, BAD_LABEL, GOOD_LABEL};
use datafusion::arrow::datatypes::DataType;
use datafusion::functions_aggregate::expr_fn::{avg, count, median};
use datafusion::logical_expr::{cast, col, lit, not, Case as DFCase, Expr};
use datafusion::prelude::*;
use datafusion::scalar::ScalarValue;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Constructs an expression equivalent to SQL COALESCE(col, fallback).
fn coalesce_expr_for(name: &str, fallback: Expr) -> Expr {
    Expr::Case(DFCase {
        expr: None,
        when_then_expr: vec![(Box::new(not(col(name).is_null())), Box::new(col(name)))],
        else_expr: Some(Box::new(fallback)),
    })
}

/// Replaces every column in `target_cols` for which `get_replacement` returns an expression,
/// keeping the column's name and position.
fn replace_columns<F>(
    df: DataFrame,
    target_cols: &[String],
    get_replacement: F,
) -> ScorecardResult<DataFrame>
where
    F: Fn(&str) -> Option<Expr>,
{
    let exprs: Vec<Expr> = df
        .schema()
        .fields()
        .iter()
        .map(|field| {
            let name = field.name();
            match target_cols.contains(name).then(|| get_replacement(name)) {
                Some(Some(expr)) => expr.alias(name),
                _ => col(name),
            }
        })
        .collect();
    df.select(exprs).map_err(ScorecardError::from)
}

/// Adds a binary indicator column: 1 when `column` holds a value, 0 when it is missing.
/// The source column is kept.
pub struct ReferredTransformer {
    pub column: String,
    pub col_name: String,
}

impl ReferredTransformer {
    pub fn new(column: String, col_name: String) -> Self {
        Self { column, col_name }
    }

    /// Stateless transformer: fit only validates the input.
    pub async fn fit(&mut self, df: &DataFrame) -> ScorecardResult<()> {
        validate_columns(df, &[&self.column])
    }

    pub fn transform(&self, df: DataFrame) -> ScorecardResult<DataFrame> {
        validate_columns(&df, &[&self.column])?;
        let indicator = Expr::Case(DFCase {
            expr: None,
            when_then_expr: vec![(
                Box::new(col(&self.column).is_null()),
                Box::new(lit(0_i64)),
            )],
            else_expr: Some(Box::new(lit(1_i64))),
        })
        .alias(&self.col_name);
        let mut exprs = all_columns(&df);
        exprs.push(indicator);
        df.select(exprs).map_err(ScorecardError::from)
    }

    fn inherent_is_stateful(&self) -> bool {
        false
    }
}

/// Replaces missing values in the target columns with a fixed value.
pub struct VarFillNa {
    pub columns: Vec<String>,
    pub value: ScalarValue,
}

impl VarFillNa {
    /// Create a new constant imputer; `value` may be any scalar (e.g. `0.0`, `"unknown"`).
    pub fn new(columns: Vec<String>, value: impl Into<ScalarValue>) -> Self {
        Self {
            columns,
            value: value.into(),
        }
    }

    /// Stateless transformer: fit only validates the input.
    pub async fn fit(&mut self, df: &DataFrame) -> ScorecardResult<()> {
        validate_columns(df, &self.columns)?;
        if self.value.is_null() {
            return Err(ScorecardError::InvalidParameter(
                "VarFillNa needs a non-null fill value".to_string(),
            ));
        }
        Ok(())
    }

    pub fn transform(&self, df: DataFrame) -> ScorecardResult<DataFrame> {
        validate_columns(&df, &self.columns)?;
        replace_columns(df, &self.columns, |name| {
            Some(coalesce_expr_for(name, lit(self.value.clone())))
        })
    }

    fn inherent_is_stateful(&self) -> bool {
        false
    }
}

/// Statistic used by [`StatFillNa`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Statistic {
    /// Arithmetic mean.
    Mean,
    /// Exact median, computed in floating point.
    Median,
    /// Most frequent value; ties go to the smallest value.
    Mode,
}

impl FromStr for Statistic {
    type Err = ScorecardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Mean" => Ok(Statistic::Mean),
            "Median" => Ok(Statistic::Median),
            "Mode" => Ok(Statistic::Mode),
            other => Err(ScorecardError::ConfigurationError(format!(
                "Unsupported statistic '{}', expected one of Mean, Median, Mode",
                other
            ))),
        }
    }
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Statistic::Mean => "Mean",
            Statistic::Median => "Median",
            Statistic::Mode => "Mode",
        };
        f.write_str(name)
    }
}

/// What [`StatFillNa`] does with missing rows whose label is neither class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownLabelPolicy {
    /// Leave the value missing.
    #[default]
    LeaveMissing,
    /// Fail `fit` with a configuration error.
    Reject,
}

/// Label-conditioned imputation.
///
/// `fit` computes one statistic of `col_1` for each outcome class in `col_2` (`"Bad"` and
/// `"Good"`), using only rows where `col_1` is present. `transform` then fills each missing
/// `col_1` with the statistic of its row's class. A class without any usable rows gets no
/// statistic, so its missing rows stay missing.
pub struct StatFillNa {
    pub col_1: String,
    pub col_2: String,
    pub stat: Statistic,
    pub unknown_labels: UnknownLabelPolicy,
    pub stat_bad: Option<ScalarValue>,
    pub stat_good: Option<ScalarValue>,
    fitted: bool,
}

impl StatFillNa {
    pub fn new(col_1: String, col_2: String, stat: Statistic) -> Self {
        Self {
            col_1,
            col_2,
            stat,
            unknown_labels: UnknownLabelPolicy::default(),
            stat_bad: None,
            stat_good: None,
            fitted: false,
        }
    }

    /// Create an imputer from a statistic keyword (`"Mean"`, `"Median"` or `"Mode"`).
    pub fn from_keyword(col_1: String, col_2: String, stat: &str) -> ScorecardResult<Self> {
        Ok(Self::new(col_1, col_2, stat.parse()?))
    }

    pub fn with_unknown_label_policy(mut self, policy: UnknownLabelPolicy) -> Self {
        self.unknown_labels = policy;
        self
    }

    /// Computes the statistic of `col_1` over rows labelled `label`.
    async fn class_statistic(
        &self,
        df: &DataFrame,
        label: &str,
    ) -> ScorecardResult<Option<ScalarValue>> {
        let rows = df.clone().filter(
            col(&self.col_2)
                .eq(lit(label))
                .and(col(&self.col_1).is_not_null()),
        )?;
        let stat_df = match self.stat {
            Statistic::Mean => rows.aggregate(vec![], vec![avg(col(&self.col_1)).alias("stat")])?,
            Statistic::Median => {
                // `median` keeps the input type; integer columns would truncate even-sized medians.
                let value = cast(col(&self.col_1), DataType::Float64);
                rows.aggregate(vec![], vec![median(value).alias("stat")])?
            }
            Statistic::Mode => rows
                .aggregate(
                    vec![col(&self.col_1)],
                    vec![count(col(&self.col_1)).alias("cnt")],
                )?
                .sort(vec![
                    col("cnt").sort(false, false),
                    col(&self.col_1).sort(true, false),
                ])?
                .limit(0, Some(1))?
                .select(vec![col(&self.col_1).alias("stat")])?,
        };
        let batches = stat_df.collect().await?;
        for batch in batches {
            if batch.num_rows() > 0 {
                let scalar = ScalarValue::try_from_array(batch.column(0), 0)?;
                return Ok((!scalar.is_null()).then_some(scalar));
            }
        }
        Ok(None)
    }

    /// Counts rows with a missing `col_1` whose label is neither class (or missing).
    async fn unknown_label_rows(&self, df: &DataFrame) -> ScorecardResult<usize> {
        let unknown = col(&self.col_2)
            .in_list(vec![lit(BAD_LABEL), lit(GOOD_LABEL)], true)
            .or(col(&self.col_2).is_null());
        let rows = df
            .clone()
            .filter(col(&self.col_1).is_null().and(unknown))?
            .count()
            .await?;
        Ok(rows)
    }

    /// Learns the per-class statistics from the DataFrame.
    pub async fn fit(&mut self, df: &DataFrame) -> ScorecardResult<()> {
        validate_columns(df, &[&self.col_1, &self.col_2])?;
        if self.unknown_labels == UnknownLabelPolicy::Reject {
            let unknown = self.unknown_label_rows(df).await?;
            if unknown > 0 {
                return Err(ScorecardError::ConfigurationError(format!(
                    "{} row(s) with missing '{}' have a '{}' label other than '{}' or '{}'",
                    unknown, self.col_1, self.col_2, BAD_LABEL, GOOD_LABEL
                )));
            }
        }
        self.stat_bad = self.class_statistic(df, BAD_LABEL).await?;
        self.stat_good = self.class_statistic(df, GOOD_LABEL).await?;
        self.fitted = true;
        debug!(
            "StatFillNa fitted {} of '{}' by '{}': bad={:?}, good={:?}",
            self.stat, self.col_1, self.col_2, self.stat_bad, self.stat_good
        );
        Ok(())
    }

    /// Fills missing `col_1` values with the fitted statistic of each row's class.
    pub fn transform(&self, df: DataFrame) -> ScorecardResult<DataFrame> {
        if !self.fitted {
            return Err(ScorecardError::FitNotCalled);
        }
        validate_columns(&df, &[&self.col_1, &self.col_2])?;

        let when_then_expr: Vec<(Box<Expr>, Box<Expr>)> = [
            (BAD_LABEL, &self.stat_bad),
            (GOOD_LABEL, &self.stat_good),
        ]
        .into_iter()
        .filter_map(|(label, stat)| {
            stat.as_ref().map(|value| {
                (
                    Box::new(
                        col(&self.col_1)
                            .is_null()
                            .and(col(&self.col_2).eq(lit(label))),
                    ),
                    Box::new(lit(value.clone())),
                )
            })
        })
        .collect();
        if when_then_expr.is_empty() {
            return Ok(df);
        }

        let fill = Expr::Case(DFCase {
            expr: None,
            when_then_expr,
            else_expr: Some(Box::new(col(&self.col_1))),
        });
        replace_columns(df, std::slice::from_ref(&self.col_1), |_| {
            Some(fill.clone())
        })
    }

    fn inherent_is_stateful(&self) -> bool {
        true
    }
}

impl_transformer!(ReferredTransformer);
impl_transformer!(VarFillNa);
impl_transformer!(StatFillNa);
