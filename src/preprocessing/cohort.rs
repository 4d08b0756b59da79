//! Single-listing host cohort

use super::StageReport;
use crate::error::{Result, Stage};
use crate::schema::{self, HOST_ID};
use polars::prelude::*;
use std::collections::HashMap;
use tracing::info;

/// Keep only rows whose `host_id` occurs exactly once. Every listing of a
/// multi-listing host is dropped; none is kept as a representative.
pub fn single_listing_hosts(df: &DataFrame) -> Result<(DataFrame, StageReport)> {
    schema::require_columns(df, &[HOST_ID])?;
    let ids = df
        .column(HOST_ID)?
        .as_materialized_series()
        .cast(&DataType::Int64)?;
    let ids = ids.i64()?;

    let mut counts: HashMap<Option<i64>, usize> = HashMap::new();
    for id in ids.into_iter() {
        *counts.entry(id).or_insert(0) += 1;
    }

    let keep: BooleanChunked = ids
        .into_iter()
        .map(|id| Some(counts.get(&id).copied().unwrap_or(0) == 1))
        .collect();
    let table = df.filter(&keep)?;

    let multi_listing_hosts = counts.values().filter(|&&n| n > 1).count();
    let report = StageReport::new(Stage::CohortFilter, df.height(), table.height(), table.width());
    info!(
        hosts = counts.len(),
        multi_listing_hosts,
        dropped = report.rows_dropped(),
        rows_out = report.rows_out,
        "Restricted to single-listing hosts"
    );
    Ok((table, report))
}
