//! # Categorical Encoding
//!
//! - **Encoder:** One-hot encodes categorical columns, leaving out the first category of each
//!   column as the reference level (k categories become k - 1 indicator columns).
//!
//! Categories are learned in `fit` and sorted in the column's own order (numeric columns sort
//! numerically, text columns lexicographically), so the output schema is a deterministic function
//! of (column, sorted categories): `<column>_<category>` for every category but the first.

use crate::exceptions::{ScorecardError, ScorecardResult};
use crate::impl_transformer;
use crate::transformers::validate_columns;
use arrow::array::{Array, StringArray};
use arrow::datatypes::DataType;
use datafusion::logical_expr::{cast, col, lit, Case as DFCase, Expr};
use datafusion::prelude::*;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// The column's values as text, so non-string categoricals encode the same way.
fn text_of(col_name: &str) -> Expr {
    cast(col(col_name), DataType::Utf8)
}

/// Extract the distinct non-null values of a column, sorted in the column's own order
/// (numerically for numbers) and then rendered as text.
async fn extract_sorted_categories(
    df: &DataFrame,
    col_name: &str,
) -> ScorecardResult<Vec<String>> {
    let distinct_df = df
        .clone()
        .select(vec![col(col_name)])?
        .filter(col(col_name).is_not_null())?
        .distinct()?
        .sort(vec![col(col_name).sort(true, false)])?
        .select(vec![text_of(col_name).alias(col_name)])?;
    let batches = distinct_df.collect().await?;
    let mut values = Vec::new();
    for batch in batches {
        let array = batch
            .column(0)
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| {
                ScorecardError::InvalidParameter(format!(
                    "Expected Utf8 categories for column {}",
                    col_name
                ))
            })?;
        for i in 0..array.len() {
            if !array.is_null(i) {
                values.push(array.value(i).to_string());
            }
        }
    }
    Ok(values)
}

/// One-hot encoder that drops the first (smallest) category of each column.
///
/// Encoded columns are removed and their indicator columns (Int32, 1 or 0) are appended after
/// the remaining columns. A missing value, or a category not seen during `fit`, encodes as all
/// zeros.
pub struct Encoder {
    pub columns: Vec<String>,
    /// Sorted categories learned for each column.
    pub categories: HashMap<String, Vec<String>>,
    fitted: bool,
}

impl Encoder {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            categories: HashMap::new(),
            fitted: false,
        }
    }

    /// Learn the sorted categories of each target column.
    pub async fn fit(&mut self, df: &DataFrame) -> ScorecardResult<()> {
        validate_columns(df, &self.columns)?;
        self.categories.clear();
        for col_name in &self.columns {
            let values = extract_sorted_categories(df, col_name).await?;
            debug!("Encoder learned {} categories for '{}'", values.len(), col_name);
            self.categories.insert(col_name.clone(), values);
        }
        self.fitted = true;
        Ok(())
    }

    /// Names of the indicator columns generated for `column`, in output order.
    pub fn indicator_names(&self, column: &str) -> Vec<String> {
        self.categories
            .get(column)
            .map(|cats| {
                cats.iter()
                    .skip(1)
                    .map(|cat| format!("{}_{}", column, cat))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Replace each target column with its indicator columns.
    pub fn transform(&self, df: DataFrame) -> ScorecardResult<DataFrame> {
        if !self.fitted {
            return Err(ScorecardError::FitNotCalled);
        }
        validate_columns(&df, &self.columns)?;

        let mut exprs = vec![];
        let mut taken: HashSet<String> = HashSet::new();
        for field in df.schema().fields() {
            if !self.columns.contains(field.name()) {
                exprs.push(col(field.name()));
                taken.insert(field.name().clone());
            }
        }
        for col_name in &self.columns {
            let cats = self.categories.get(col_name).map(Vec::as_slice).unwrap_or(&[]);
            for (cat, new_col_name) in cats.iter().skip(1).zip(self.indicator_names(col_name)) {
                if !taken.insert(new_col_name.clone()) {
                    return Err(ScorecardError::InvalidParameter(format!(
                        "Indicator column '{}' collides with an existing column",
                        new_col_name
                    )));
                }
                let indicator = Expr::Case(DFCase {
                    expr: None,
                    when_then_expr: vec![(
                        Box::new(text_of(col_name).eq(lit(cat.clone()))),
                        Box::new(lit(1_i32)),
                    )],
                    else_expr: Some(Box::new(lit(0_i32))),
                })
                .alias(new_col_name);
                exprs.push(indicator);
            }
        }
        df.select(exprs).map_err(ScorecardError::from)
    }

    fn inherent_is_stateful(&self) -> bool {
        true
    }
}

impl_transformer!(Encoder);
