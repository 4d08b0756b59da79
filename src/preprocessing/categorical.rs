//! Response-time label cleanup

use super::StageReport;
use crate::error::{Result, Stage};
use crate::schema::{self, ResponseTime, HOST_RESPONSE_TIME, NOT_APPLICABLE};
use polars::prelude::*;
use std::collections::BTreeSet;
use tracing::{info, warn};

/// Relabel the `N/A` sentinel to null, drop null rows and store the column as
/// a categorical.
pub fn canonicalize_response_time(df: &DataFrame) -> Result<(DataFrame, StageReport)> {
    schema::require_columns(df, &[HOST_RESPONSE_TIME])?;
    let raw = df
        .column(HOST_RESPONSE_TIME)?
        .as_materialized_series()
        .cast(&DataType::String)?;
    let raw = raw.str()?;

    let nulls_in = raw.null_count();
    let mut sentinels = 0usize;
    let mut unknown: BTreeSet<String> = BTreeSet::new();

    let labels: StringChunked = raw
        .into_iter()
        .map(|value| match value {
            Some(NOT_APPLICABLE) => {
                sentinels += 1;
                None
            }
            Some(label) => {
                if ResponseTime::from_label(label).is_none() {
                    unknown.insert(label.to_string());
                }
                Some(label)
            }
            None => None,
        })
        .collect();
    let labels = labels.with_name(HOST_RESPONSE_TIME.into());

    if !unknown.is_empty() {
        warn!(labels = ?unknown, "Unexpected response time labels kept as categories");
    }

    let keep = labels.is_not_null();
    let mut table = df.clone();
    table.with_column(labels.into_series())?;
    let mut table = table.filter(&keep)?;

    let categorical = table
        .column(HOST_RESPONSE_TIME)?
        .as_materialized_series()
        .cast(&DataType::Categorical(None, CategoricalOrdering::Lexical))?;
    table.with_column(categorical)?;

    let report = StageReport::new(
        Stage::CanonicalizeResponseTime,
        df.height(),
        table.height(),
        table.width(),
    )
    .with_nulls_in(nulls_in + sentinels);
    info!(
        nulls = nulls_in,
        sentinels,
        dropped = report.rows_dropped(),
        rows_out = report.rows_out,
        "Canonicalized host response time"
    );
    Ok((table, report))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(df: &DataFrame) -> Vec<String> {
        df.column(HOST_RESPONSE_TIME)
            .unwrap()
            .as_materialized_series()
            .cast(&DataType::String)
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .map(|v| v.unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_sentinel_and_null_rows_dropped() {
        let df = df!(
            "host_response_time" => &[Some("within an hour"), Some("N/A"), None, Some("within a day")],
            "review_scores_rating" => &[4.9, 4.8, 4.0, 3.5]
        ).unwrap();

        let (out, report) = canonicalize_response_time(&df).unwrap();

        assert_eq!(out.height(), 2);
        assert_eq!(report.nulls_in, Some(2));
        assert_eq!(labels(&out), vec!["within an hour", "within a day"]);
        assert!(matches!(
            out.column(HOST_RESPONSE_TIME).unwrap().dtype(),
            DataType::Categorical(_, _)
        ));
    }

    #[test]
    fn test_unknown_labels_are_kept() {
        let df = df!("host_response_time" => &["within a few hours", "never"]).unwrap();
        let (out, _) = canonicalize_response_time(&df).unwrap();
        assert_eq!(labels(&out), vec!["within a few hours", "never"]);
    }

    #[test]
    fn test_all_sentinels_yields_empty_table() {
        let df = df!("host_response_time" => &["N/A", "N/A"]).unwrap();
        let (out, report) = canonicalize_response_time(&df).unwrap();
        assert_eq!(out.height(), 0);
        assert_eq!(report.rows_dropped(), 2);
    }
}
