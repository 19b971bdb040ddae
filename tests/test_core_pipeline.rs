use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Float64Array, Int32Array, Int64Array, StringArray};
use arrow::compute::concat_batches;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use datafusion::datasource::MemTable;
use datafusion::prelude::{DataFrame, SessionContext};
use scorecard_features::exceptions::{ScorecardError, ScorecardResult};
use scorecard_features::make_pipeline;
use scorecard_features::pipeline::{Pipeline, Transformer};
use scorecard_features::transformers::aggregation::GetMean;
use scorecard_features::transformers::categorical_encoding::Encoder;
use scorecard_features::transformers::column_selection::ColumnDropTransformer;
use scorecard_features::transformers::datetime_features::{AgeYears, ApprovalPeriod};
use scorecard_features::transformers::imputation::{
    ReferredTransformer, StatFillNa, Statistic, VarFillNa,
};

/// Application-level rows resembling a loan performance extract.
async fn create_performance_df() -> DataFrame {
    let schema = Arc::new(Schema::new(vec![
        Field::new("customerid", DataType::Utf8, false),
        Field::new("loanamount", DataType::Float64, true),
        Field::new("approveddate", DataType::Utf8, true),
        Field::new("creationdate", DataType::Utf8, true),
        Field::new("birthdate", DataType::Utf8, true),
        Field::new("referredby", DataType::Utf8, true),
        Field::new("bank_account_type", DataType::Utf8, true),
        Field::new("good_bad_flag", DataType::Utf8, true),
    ]));
    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from(vec!["c1", "c2", "c3", "c4"])),
        Arc::new(Float64Array::from(vec![
            Some(10000.0),
            None,
            Some(30000.0),
            None,
        ])),
        Arc::new(StringArray::from(vec![
            "2017-07-25 08:22:56",
            "2017-07-05 17:04:41",
            "2017-07-06 14:52:57",
            "2017-07-27 19:00:41",
        ])),
        Arc::new(StringArray::from(vec![
            "2017-07-25 07:22:47",
            "2017-07-05 16:04:18",
            "2017-07-06 13:52:51",
            "2017-07-27 18:00:35",
        ])),
        Arc::new(StringArray::from(vec![
            "1972-01-15",
            "1985-08-23",
            "1984-09-18",
            "1977-10-10",
        ])),
        Arc::new(StringArray::from(vec![
            None,
            Some("8a858899538ddb8e015390510b321f08"),
            None,
            None,
        ])),
        Arc::new(StringArray::from(vec!["Savings", "Other", "Savings", "Current"])),
        Arc::new(StringArray::from(vec!["Good", "Bad", "Bad", "Good"])),
    ];
    let batch = RecordBatch::try_new(schema.clone(), columns).unwrap();
    let mem_table = MemTable::try_new(schema, vec![vec![batch]]).unwrap();
    let ctx = SessionContext::new();
    ctx.register_table("performance", Arc::new(mem_table)).unwrap();
    ctx.table("performance").await.unwrap()
}

async fn collect_batch(df: DataFrame) -> RecordBatch {
    let batches = df.collect().await.unwrap();
    concat_batches(&batches[0].schema(), &batches).unwrap()
}

fn build_pipeline() -> Pipeline {
    make_pipeline!(false,
        ("referred", ReferredTransformer::new("referredby".to_string(), "is_referred".to_string())),
        ("drop_referrer", ColumnDropTransformer::new(vec!["referredby".to_string()])),
        ("fill_amount", StatFillNa::new("loanamount".to_string(), "good_bad_flag".to_string(), Statistic::Mean)),
        ("approval", ApprovalPeriod::new("approveddate".to_string(), "creationdate".to_string(), "approvalperiod".to_string())),
        ("encode_account", Encoder::new(vec!["bank_account_type".to_string()])),
    )
}

#[tokio::test]
async fn test_credit_pipeline_fit_transform() -> ScorecardResult<()> {
    let df = create_performance_df().await;
    let mut pipeline = build_pipeline();
    assert_eq!(
        pipeline.step_names(),
        vec!["referred", "drop_referrer", "fill_amount", "approval", "encode_account"]
    );

    let batch = collect_batch(pipeline.fit_transform(&df).await?).await;
    let names: Vec<String> = batch
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().to_string())
        .collect();
    assert_eq!(
        names,
        vec![
            "customerid",
            "loanamount",
            "birthdate",
            "good_bad_flag",
            "is_referred",
            "approvalperiod",
            "bank_account_type_Other",
            "bank_account_type_Savings",
        ]
    );

    let referred = batch
        .column(batch.schema().index_of("is_referred")?)
        .as_any()
        .downcast_ref::<Int64Array>()
        .expect("Expected Int64Array");
    assert_eq!(referred.values().to_vec(), vec![0, 1, 0, 0]);

    let amounts = batch
        .column(batch.schema().index_of("loanamount")?)
        .as_any()
        .downcast_ref::<Float64Array>()
        .expect("Expected Float64Array");
    // c2 is Bad (Bad mean = 30000), c4 is Good (Good mean = 10000).
    assert_eq!(amounts.values().to_vec(), vec![10000.0, 30000.0, 30000.0, 10000.0]);

    let approval = batch
        .column(batch.schema().index_of("approvalperiod")?)
        .as_any()
        .downcast_ref::<Float64Array>()
        .expect("Expected Float64Array");
    approx::assert_relative_eq!(approval.value(0), 9.0 / 60.0, epsilon = 1e-9);
    approx::assert_relative_eq!(approval.value(1), 23.0 / 60.0, epsilon = 1e-9);

    let savings = batch
        .column(batch.schema().index_of("bank_account_type_Savings")?)
        .as_any()
        .downcast_ref::<Int32Array>()
        .expect("Expected Int32Array");
    assert_eq!(savings.values().to_vec(), vec![1, 0, 1, 0]);
    Ok(())
}

#[tokio::test]
async fn test_fitted_pipeline_transforms_new_data() -> ScorecardResult<()> {
    let df = create_performance_df().await;
    let mut pipeline = build_pipeline();
    let fitted = collect_batch(pipeline.fit(&df).await?).await;
    let replayed = collect_batch(pipeline.transform(create_performance_df().await)?).await;
    assert_eq!(fitted, replayed);
    Ok(())
}

#[tokio::test]
async fn test_pipeline_chains_row_level_and_aggregate_steps() -> ScorecardResult<()> {
    let df = create_performance_df().await;
    let mut pipeline = make_pipeline!(true,
        ("age", AgeYears::new("approveddate".to_string(), "birthdate".to_string(), "age".to_string())),
        ("fill", VarFillNa::new(vec!["loanamount".to_string()], 0.0)),
        ("mean", GetMean::new(vec!["age".to_string(), "loanamount".to_string()])),
    );
    let batch = collect_batch(pipeline.fit_transform(&df).await?).await;
    assert_eq!(batch.num_rows(), 4);
    let age = batch
        .column(batch.schema().index_of("age")?)
        .as_any()
        .downcast_ref::<Float64Array>()
        .expect("Expected Float64Array");
    assert_eq!(age.values().to_vec(), vec![45.0, 32.0, 33.0, 40.0]);
    Ok(())
}

#[tokio::test]
async fn test_pipeline_transform_without_fit_fails_for_stateful_steps() {
    let df = create_performance_df().await;
    let pipeline = build_pipeline();
    match pipeline.transform(df) {
        Err(ScorecardError::StepFailed {
            step,
            stage,
            source,
        }) => {
            assert_eq!(step, "fill_amount");
            assert_eq!(stage, "transforming");
            assert!(matches!(*source, ScorecardError::FitNotCalled));
        }
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("transform before fit should fail"),
    }
}

#[tokio::test]
async fn test_pipeline_step_errors_keep_their_variant() {
    let df = create_performance_df().await;
    let mut pipeline = make_pipeline!(false,
        ("drop", ColumnDropTransformer::new(vec!["gender".to_string()])),
    );
    match pipeline.fit(&df).await {
        Err(ScorecardError::StepFailed {
            step,
            stage,
            source,
        }) => {
            assert_eq!(step, "drop");
            assert_eq!(stage, "fitting");
            match *source {
                ScorecardError::MissingColumn(msg) => assert!(msg.contains("gender")),
                other => panic!("step error should be kept as is, got: {}", other),
            }
        }
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("fitting on a missing column should fail"),
    }
}

#[tokio::test]
async fn test_empty_pipeline_is_rejected() {
    let df = create_performance_df().await;
    let mut pipeline = Pipeline::new(vec![], false);
    assert!(matches!(
        pipeline.fit(&df).await,
        Err(ScorecardError::InvalidParameter(_))
    ));
    assert!(matches!(
        pipeline.transform(df),
        Err(ScorecardError::InvalidParameter(_))
    ));
}

#[test]
fn test_statefulness_flags() {
    let encoder: Box<dyn Transformer + Send + Sync> =
        Box::new(Encoder::new(vec!["bank_account_type".to_string()]));
    let imputer: Box<dyn Transformer + Send + Sync> = Box::new(StatFillNa::new(
        "loanamount".to_string(),
        "good_bad_flag".to_string(),
        Statistic::Median,
    ));
    let dropper: Box<dyn Transformer + Send + Sync> =
        Box::new(ColumnDropTransformer::new(vec!["referredby".to_string()]));
    let mean: Box<dyn Transformer + Send + Sync> =
        Box::new(GetMean::new(vec!["loanamount".to_string()]));
    assert!(encoder.is_stateful());
    assert!(imputer.is_stateful());
    assert!(!dropper.is_stateful());
    assert!(!mean.is_stateful());
}
