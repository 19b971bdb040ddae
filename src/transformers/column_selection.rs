//! ## Transformers for selecting columns
//!
//! - **ColumnDropTransformer:** Removes the named columns from the DataFrame.
//!
//! Dropping is destructive: re-adding a column with the same name afterwards does not bring the
//! original values back.

use crate::exceptions::{ScorecardError, ScorecardResult};
use crate::impl_transformer;
use crate::transformers::validate_columns;
use datafusion::dataframe::DataFrame;
use datafusion::logical_expr::{col, Expr};

/// Removes the given columns. Every named column must exist.
pub struct ColumnDropTransformer {
    pub columns: Vec<String>,
}

impl ColumnDropTransformer {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns }
    }

    /// Stateless transformer: fit only validates the input.
    pub async fn fit(&mut self, df: &DataFrame) -> ScorecardResult<()> {
        validate_columns(df, &self.columns)
    }

    pub fn transform(&self, df: DataFrame) -> ScorecardResult<DataFrame> {
        validate_columns(&df, &self.columns)?;
        let retained: Vec<Expr> = df
            .schema()
            .fields()
            .iter()
            .filter(|f| !self.columns.contains(f.name()))
            .map(|f| col(f.name()))
            .collect();
        if retained.is_empty() {
            return Err(ScorecardError::InvalidParameter(
                "Cannot drop every column of the DataFrame".to_string(),
            ));
        }
        df.select(retained).map_err(ScorecardError::from)
    }

    fn inherent_is_stateful(&self) -> bool {
        false
    }
}

impl_transformer!(ColumnDropTransformer);
