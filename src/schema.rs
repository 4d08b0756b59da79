//! Listing column names and the schema contract checked at stage boundaries

use crate::error::{EdaError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const HOST_ID: &str = "host_id";
pub const HOST_RESPONSE_TIME: &str = "host_response_time";
pub const HOST_IS_SUPERHOST: &str = "host_is_superhost";
pub const HOST_TOTAL_LISTINGS_COUNT: &str = "host_total_listings_count";
pub const NEIGHBOURHOOD_CLEANSED: &str = "neighbourhood_cleansed";
pub const BATHROOMS: &str = "bathrooms";
pub const BEDROOMS: &str = "bedrooms";
pub const PRICE: &str = "price";
pub const NUMBER_OF_REVIEWS: &str = "number_of_reviews";
pub const REVIEW_SCORES_RATING: &str = "review_scores_rating";
pub const REVIEW_SCORES_ACCURACY: &str = "review_scores_accuracy";
pub const REVIEW_SCORES_VALUE: &str = "review_scores_value";

/// Derived by the superhost filter
pub const HOST_IS_SUPERHOST_BINARY: &str = "host_is_superhost_binary";

/// Sentinel used by the raw data for "no response time recorded"
pub const NOT_APPLICABLE: &str = "N/A";

/// Declared type of a projected column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnKind {
    /// Whole numbers, stored as Int64
    Integer,
    /// Measurements and scores, stored as Float64
    Float,
    /// Free text or labels, stored as String
    Text,
    /// `t`/`f` flag; left as loaded, the superhost filter coerces it
    Flag,
}

impl ColumnKind {
    fn target_dtype(&self) -> Option<DataType> {
        match self {
            ColumnKind::Integer => Some(DataType::Int64),
            ColumnKind::Float => Some(DataType::Float64),
            ColumnKind::Text => Some(DataType::String),
            ColumnKind::Flag => None,
        }
    }
}

/// One entry of the projection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub kind: ColumnKind,
}

const fn spec(name: &'static str, kind: ColumnKind) -> ColumnSpec {
    ColumnSpec { name, kind }
}

/// Columns kept by the projector, in output order
pub const SELECTED_COLUMNS: [ColumnSpec; 12] = [
    spec(HOST_ID, ColumnKind::Integer),
    spec(HOST_RESPONSE_TIME, ColumnKind::Text),
    spec(HOST_IS_SUPERHOST, ColumnKind::Flag),
    spec(HOST_TOTAL_LISTINGS_COUNT, ColumnKind::Integer),
    spec(NEIGHBOURHOOD_CLEANSED, ColumnKind::Text),
    spec(BATHROOMS, ColumnKind::Float),
    spec(BEDROOMS, ColumnKind::Float),
    spec(PRICE, ColumnKind::Text),
    spec(NUMBER_OF_REVIEWS, ColumnKind::Integer),
    spec(REVIEW_SCORES_RATING, ColumnKind::Float),
    spec(REVIEW_SCORES_ACCURACY, ColumnKind::Float),
    spec(REVIEW_SCORES_VALUE, ColumnKind::Float),
];

/// Names of [`SELECTED_COLUMNS`]
pub fn selected_column_names() -> Vec<&'static str> {
    SELECTED_COLUMNS.iter().map(|c| c.name).collect()
}

/// Fail with `MissingColumn` for the first absent name
pub fn require_columns(df: &DataFrame, names: &[&str]) -> Result<()> {
    for name in names {
        if df.column(name).is_err() {
            return Err(EdaError::MissingColumn(name.to_string()));
        }
    }
    Ok(())
}

/// All names from `names` that `df` lacks
pub fn missing_columns(df: &DataFrame, names: &[&str]) -> Vec<String> {
    names
        .iter()
        .filter(|name| df.column(name).is_err())
        .map(|name| name.to_string())
        .collect()
}

/// Cast a column to its declared dtype. Values that do not survive the cast
/// are a schema violation, reported as `ParseError`.
pub fn conform_column(df: &DataFrame, column: &ColumnSpec) -> Result<Series> {
    let series = df
        .column(column.name)
        .map_err(|_| EdaError::MissingColumn(column.name.to_string()))?
        .as_materialized_series()
        .clone();

    let Some(target) = column.kind.target_dtype() else {
        return Ok(series);
    };
    if series.dtype() == &target {
        return Ok(series);
    }

    series.strict_cast(&target).map_err(|e| {
        EdaError::ParseError(format!(
            "column '{}' ({}) does not conform to {}: {}",
            column.name,
            series.dtype(),
            target,
            e
        ))
    })
}

/// Host response time category
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ResponseTime {
    WithinAnHour,
    WithinAFewHours,
    WithinADay,
    AFewDaysOrMore,
}

impl ResponseTime {
    pub const ALL: [ResponseTime; 4] = [
        ResponseTime::WithinAnHour,
        ResponseTime::WithinAFewHours,
        ResponseTime::WithinADay,
        ResponseTime::AFewDaysOrMore,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ResponseTime::WithinAnHour => "within an hour",
            ResponseTime::WithinAFewHours => "within a few hours",
            ResponseTime::WithinADay => "within a day",
            ResponseTime::AFewDaysOrMore => "a few days or more",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|rt| rt.label() == label)
    }
}

impl fmt::Display for ResponseTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
