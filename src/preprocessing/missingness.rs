//! Missing-value policy for the superhost flag and the overall rating

use super::StageReport;
use crate::error::{EdaError, Result, Stage};
use crate::schema::{self, HOST_IS_SUPERHOST, HOST_IS_SUPERHOST_BINARY, REVIEW_SCORES_RATING};
use polars::prelude::*;
use tracing::{info, warn};

/// Interpret a raw flag value. The listings export writes `t` and `f`.
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "t" | "true" | "1" => Some(true),
        "f" | "false" | "0" => Some(false),
        _ => None,
    }
}

fn superhost_flags(series: &Series) -> Result<BooleanChunked> {
    let flags = match series.dtype() {
        DataType::Boolean => series.bool()?.clone(),
        DataType::String => series
            .str()?
            .into_iter()
            .map(|v| v.and_then(parse_flag))
            .collect::<BooleanChunked>(),
        dtype if dtype.is_integer() => series
            .cast(&DataType::Int64)?
            .i64()?
            .into_iter()
            .map(|v| match v {
                Some(1) => Some(true),
                Some(0) => Some(false),
                _ => None,
            })
            .collect::<BooleanChunked>(),
        other => {
            return Err(EdaError::DataError(format!(
                "column '{}' has unsupported type {} for a flag",
                HOST_IS_SUPERHOST, other
            )))
        }
    };
    Ok(flags.with_name(HOST_IS_SUPERHOST.into()))
}

/// Drop rows without a superhost flag, store the flag as Boolean and add
/// `host_is_superhost_binary` (1.0 for superhosts, 0.0 otherwise).
pub fn drop_missing_superhost(df: &DataFrame) -> Result<(DataFrame, StageReport)> {
    schema::require_columns(df, &[HOST_IS_SUPERHOST])?;
    let raw = df.column(HOST_IS_SUPERHOST)?.as_materialized_series();
    let nulls_in = raw.null_count();

    let flags = superhost_flags(raw)?;
    let unreadable = flags.null_count().saturating_sub(nulls_in);
    if unreadable > 0 {
        warn!(rows = unreadable, "Unrecognized superhost flags treated as missing");
    }

    let keep = flags.is_not_null();
    let mut table = df.clone();
    table.with_column(flags.into_series())?;
    let mut table = table.filter(&keep)?;

    let binary = table
        .column(HOST_IS_SUPERHOST)?
        .as_materialized_series()
        .bool()?
        .into_iter()
        .map(|v| v.map(|is_superhost| if is_superhost { 1.0 } else { 0.0 }))
        .collect::<Float64Chunked>()
        .with_name(HOST_IS_SUPERHOST_BINARY.into());
    table.with_column(binary.into_series())?;

    let report = StageReport::new(Stage::DropMissingSuperhost, df.height(), table.height(), table.width())
        .with_nulls_in(nulls_in);
    info!(
        nulls = nulls_in,
        dropped = report.rows_dropped(),
        rows_out = report.rows_out,
        "Dropped listings without superhost flag"
    );
    Ok((table, report))
}

/// Drop rows without an overall review rating
pub fn drop_missing_rating(df: &DataFrame) -> Result<(DataFrame, StageReport)> {
    schema::require_columns(df, &[REVIEW_SCORES_RATING])?;
    let rating = df.column(REVIEW_SCORES_RATING)?.as_materialized_series();
    let nulls_in = rating.null_count();

    let table = df.filter(&rating.is_not_null())?;

    let report = StageReport::new(Stage::DropMissingRating, df.height(), table.height(), table.width())
        .with_nulls_in(nulls_in);
    info!(
        nulls = nulls_in,
        dropped = report.rows_dropped(),
        rows_out = report.rows_out,
        "Dropped listings without review rating"
    );
    Ok((table, report))
}
