//! # Transformer Implementations
//!
//! The submodules contain the scorecard transformers, grouped by the kind of feature they build.
//! Shared constants for the credit dataset layout live here.

use crate::exceptions::{ScorecardError, ScorecardResult};
use datafusion::dataframe::DataFrame;
use datafusion::logical_expr::{col, Expr};

pub mod aggregation;
pub mod categorical_encoding;
pub mod column_selection;
pub mod datetime_features;
pub mod imputation;

/// Column identifying a customer across application-level rows.
pub const CUSTOMER_KEY: &str = "customerid";

/// Outcome label value for a defaulted loan.
pub const BAD_LABEL: &str = "Bad";

/// Outcome label value for a repaid loan.
pub const GOOD_LABEL: &str = "Good";

/// Returns an error naming the first column of `target_cols` that the DataFrame lacks.
pub(crate) fn validate_columns<S: AsRef<str>>(
    df: &DataFrame,
    target_cols: &[S],
) -> ScorecardResult<()> {
    let schema = df.schema();
    for col_name in target_cols {
        let col_name = col_name.as_ref();
        if schema.field_with_name(None, col_name).is_err() {
            return Err(ScorecardError::MissingColumn(format!(
                "Column '{}' not found in DataFrame",
                col_name
            )));
        }
    }
    Ok(())
}

/// Column expressions for every field of the DataFrame, in schema order.
pub(crate) fn all_columns(df: &DataFrame) -> Vec<Expr> {
    df.schema().fields().iter().map(|f| col(f.name())).collect()
}
