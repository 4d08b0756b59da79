//! Integration tests for descriptive analysis and the superhost model

use airbnb_eda::analysis::{describe, rating_by_superhost, superhost_by_response_time, ColumnType, Design, SuperhostModel};
use airbnb_eda::config::PipelineConfig;
use airbnb_eda::preprocessing::ListingPipeline;
use airbnb_eda::schema::ResponseTime;
use polars::prelude::*;

/// Projected-shape table large enough to fit the model after cleaning
fn projected_listings(n: usize) -> DataFrame {
    let mut host_id = Vec::with_capacity(n);
    let mut response = Vec::with_capacity(n);
    let mut superhost = Vec::with_capacity(n);
    let mut price = Vec::with_capacity(n);
    let mut rating = Vec::with_capacity(n);

    for i in 0..n {
        let score = 3.5 + (i % 16) as f64 * 0.1;
        let chance = (score - 3.5) / 1.5;
        let draw = ((i * 53) % 97) as f64 / 97.0;

        host_id.push(1_000 + i as i64);
        response.push(ResponseTime::ALL[i % ResponseTime::ALL.len()].label());
        superhost.push(if draw < chance { "t" } else { "f" });
        price.push(format!("${}.00", 40 + (i % 50) * 7));
        rating.push(score);
    }

    df!(
        "host_id" => &host_id,
        "host_response_time" => &response,
        "host_is_superhost" => &superhost,
        "price" => &price,
        "review_scores_rating" => &rating
    ).unwrap()
}

#[test]
fn test_model_on_cleaned_table() {
    let cleaned = ListingPipeline::new(PipelineConfig::default())
        .clean(&projected_listings(400))
        .unwrap()
        .table;
    assert_eq!(cleaned.height(), 400);

    let summary = SuperhostModel::new().fit_frame(&cleaned).unwrap();

    assert!(summary.converged);
    assert_eq!(summary.n_obs, 400);
    assert_eq!(summary.reference_category, "a few days or more");
    // intercept + three non-reference levels + rating
    assert_eq!(summary.coefficients.len(), 5);
    assert!(summary.coefficient("review_scores_rating").unwrap().estimate > 0.0);
    assert!(summary.pseudo_r2 > 0.0 && summary.pseudo_r2 < 1.0);
}

#[test]
fn test_predict_proba_matches_design() {
    let cleaned = ListingPipeline::new(PipelineConfig::default())
        .clean(&projected_listings(200))
        .unwrap()
        .table;
    let design = Design::from_frame(&cleaned).unwrap();

    let mut model = SuperhostModel::new();
    model.fit(&design.x, &design.y, &design.names).unwrap();
    let proba = model.predict_proba(&design.x).unwrap();

    assert_eq!(proba.len(), cleaned.height());
    assert!(proba.iter().all(|p| (0.0..=1.0).contains(p)));

    // fitted logit reproduces the observed base rate
    let mean_p = proba.mean().unwrap();
    let mean_y = design.y.mean().unwrap();
    assert!((mean_p - mean_y).abs() < 1e-6);
}

#[test]
fn test_model_rejects_single_class() {
    let df = df!(
        "host_response_time" => &["within an hour", "within a day", "within an hour"],
        "review_scores_rating" => &[4.0, 4.5, 5.0],
        "host_is_superhost_binary" => &[1.0, 1.0, 1.0]
    ).unwrap();

    assert!(SuperhostModel::new().fit_frame(&df).is_err());
}

#[test]
fn test_describe_cleaned_table() {
    let cleaned = ListingPipeline::new(PipelineConfig::default())
        .clean(&projected_listings(80))
        .unwrap()
        .table;

    let summaries = describe(&cleaned).unwrap();
    let price = summaries.iter().find(|s| s.name == "price").unwrap();
    assert_eq!(price.dtype, ColumnType::Numeric);
    assert!(price.max.unwrap() < 1000.0);

    let flag = summaries.iter().find(|s| s.name == "host_is_superhost").unwrap();
    assert_eq!(flag.dtype, ColumnType::Boolean);

    let response = summaries.iter().find(|s| s.name == "host_response_time").unwrap();
    assert_eq!(response.dtype, ColumnType::Categorical);
    assert_eq!(response.unique_count, Some(4));

    let breakdown = superhost_by_response_time(&cleaned).unwrap();
    assert_eq!(breakdown.iter().map(|r| r.listings).sum::<usize>(), 80);

    let split = rating_by_superhost(&cleaned).unwrap();
    assert_eq!(split.iter().map(|r| r.listings).sum::<usize>(), 80);
}
