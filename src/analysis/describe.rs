//! Descriptive statistics over the analysis dataset

use crate::error::Result;
use crate::schema::{self, HOST_IS_SUPERHOST, HOST_IS_SUPERHOST_BINARY, HOST_RESPONSE_TIME, REVIEW_SCORES_RATING};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Most frequent categories reported per text column
const TOP_CATEGORIES: usize = 5;

/// Broad column type used when summarizing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnType {
    Numeric,
    Boolean,
    Categorical,
    Unknown,
}

/// Per-column summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSummary {
    pub name: String,
    pub dtype: ColumnType,
    pub count: usize,
    pub null_count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub median: Option<f64>,
    pub max: Option<f64>,
    pub unique_count: Option<usize>,
    /// Most frequent labels with their counts, descending
    pub top: Option<Vec<(String, usize)>>,
}

impl ColumnSummary {
    fn new(name: impl Into<String>, dtype: ColumnType, series: &Series) -> Self {
        Self {
            name: name.into(),
            dtype,
            count: series.len() - series.null_count(),
            null_count: series.null_count(),
            mean: None,
            std: None,
            min: None,
            median: None,
            max: None,
            unique_count: None,
            top: None,
        }
    }

    /// Summarize a numeric (or boolean, as 0/1) series
    pub fn from_numeric_series(name: &str, series: &Series, dtype: ColumnType) -> Result<Self> {
        let mut summary = Self::new(name, dtype, series);
        let values = series.cast(&DataType::Float64)?;
        let ca = values.f64()?;

        summary.mean = ca.mean();
        summary.std = ca.std(1);
        summary.min = ca.min();
        summary.median = ca.median();
        summary.max = ca.max();
        Ok(summary)
    }

    /// Summarize a text or categorical series
    pub fn from_categorical_series(name: &str, series: &Series) -> Result<Self> {
        let mut summary = Self::new(name, ColumnType::Categorical, series);
        let labels = series.cast(&DataType::String)?;

        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for label in labels.str()?.into_iter().flatten() {
            *counts.entry(label.to_string()).or_insert(0) += 1;
        }

        summary.unique_count = Some(counts.len());
        let mut top: Vec<(String, usize)> = counts.into_iter().collect();
        top.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        top.truncate(TOP_CATEGORIES);
        summary.top = Some(top);
        Ok(summary)
    }
}

/// Summarize every column of `df`
pub fn describe(df: &DataFrame) -> Result<Vec<ColumnSummary>> {
    df.get_columns()
        .iter()
        .map(|col| {
            let name = col.name().as_str();
            let series = col.as_materialized_series();
            match series.dtype() {
                dtype if dtype.is_primitive_numeric() => {
                    ColumnSummary::from_numeric_series(name, series, ColumnType::Numeric)
                }
                DataType::Boolean => ColumnSummary::from_numeric_series(name, series, ColumnType::Boolean),
                DataType::String | DataType::Categorical(_, _) => {
                    ColumnSummary::from_categorical_series(name, series)
                }
                _ => Ok(ColumnSummary::new(name, ColumnType::Unknown, series)),
            }
        })
        .collect()
}

/// Null count per column, in column order
pub fn null_counts(df: &DataFrame) -> Vec<(String, usize)> {
    df.get_columns()
        .iter()
        .map(|col| (col.name().to_string(), col.null_count()))
        .collect()
}

/// Superhost share within one response-time category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseTimeBreakdown {
    pub response_time: String,
    pub listings: usize,
    pub superhosts: usize,
    pub superhost_share: f64,
    pub mean_rating: Option<f64>,
}

/// Cross-tabulate superhost status against response time.
/// Rows with a null label or flag are skipped.
pub fn superhost_by_response_time(df: &DataFrame) -> Result<Vec<ResponseTimeBreakdown>> {
    schema::require_columns(df, &[HOST_RESPONSE_TIME, HOST_IS_SUPERHOST_BINARY, REVIEW_SCORES_RATING])?;
    let labels = df.column(HOST_RESPONSE_TIME)?.as_materialized_series().cast(&DataType::String)?;
    let binary = df.column(HOST_IS_SUPERHOST_BINARY)?.as_materialized_series().cast(&DataType::Float64)?;
    let rating = df.column(REVIEW_SCORES_RATING)?.as_materialized_series().cast(&DataType::Float64)?;

    // label -> (listings, superhosts, rating sum, rated listings)
    let mut groups: BTreeMap<String, (usize, usize, f64, usize)> = BTreeMap::new();
    for ((label, flag), score) in labels.str()?.into_iter().zip(binary.f64()?).zip(rating.f64()?) {
        let (Some(label), Some(flag)) = (label, flag) else { continue };
        let entry = groups.entry(label.to_string()).or_insert((0, 0, 0.0, 0));
        entry.0 += 1;
        if flag == 1.0 {
            entry.1 += 1;
        }
        if let Some(score) = score {
            entry.2 += score;
            entry.3 += 1;
        }
    }

    Ok(groups
        .into_iter()
        .map(|(response_time, (listings, superhosts, rating_sum, rated))| ResponseTimeBreakdown {
            response_time,
            listings,
            superhosts,
            superhost_share: superhosts as f64 / listings as f64,
            mean_rating: (rated > 0).then(|| rating_sum / rated as f64),
        })
        .collect())
}

/// Rating distribution for superhosts versus other hosts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingBySuperhost {
    pub is_superhost: bool,
    pub listings: usize,
    pub mean_rating: Option<f64>,
    pub median_rating: Option<f64>,
}

/// Mean and median rating split by the superhost flag
pub fn rating_by_superhost(df: &DataFrame) -> Result<Vec<RatingBySuperhost>> {
    schema::require_columns(df, &[HOST_IS_SUPERHOST, REVIEW_SCORES_RATING])?;
    let flags = df.column(HOST_IS_SUPERHOST)?.as_materialized_series().cast(&DataType::Boolean)?;
    let rating = df.column(REVIEW_SCORES_RATING)?.as_materialized_series().cast(&DataType::Float64)?;

    [false, true]
        .into_iter()
        .map(|wanted| -> Result<RatingBySuperhost> {
            let mask: BooleanChunked = flags
                .bool()?
                .into_iter()
                .map(|flag| Some(flag == Some(wanted)))
                .collect();
            let subset = rating.filter(&mask)?;
            let scores = subset.f64()?;
            Ok(RatingBySuperhost {
                is_superhost: wanted,
                listings: subset.len(),
                mean_rating: scores.mean(),
                median_rating: scores.median(),
            })
        })
        .collect()
}
