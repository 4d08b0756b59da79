//! Price normalization and outlier trimming
//!
//! Raw prices carry locale formatting (`"$1,234.00"`). The normalizer strips
//! the currency symbol and thousands separators, parses the residue as an
//! integer and excludes everything at or above the configured ceiling.
//! Excluded rows are handed back separately for inspection; they never reach
//! the persisted dataset.

use super::StageReport;
use crate::config::PRICE_CEILING;
use crate::error::{EdaError, Result, Stage};
use crate::schema::{self, PRICE};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Unparseable prices logged individually before the rest are only counted
const MAX_LOGGED_PARSE_FAILURES: usize = 5;

/// Parse a currency string into whole currency units.
///
/// `$` and `,` are removed and surrounding whitespace ignored. The residue must
/// be a non-negative integer literal; a fractional part is accepted only when
/// it is all zeros, as in `"$150.00"`.
pub fn parse_price(raw: &str) -> Option<i64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, '$' | ','))
        .collect();

    let (whole, fraction) = cleaned.split_once('.').unwrap_or((cleaned.as_str(), ""));
    if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if !fraction.bytes().all(|b| b == b'0') {
        return None;
    }
    whole.parse::<i64>().ok()
}

/// Audit figures for the price stage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceReport {
    pub ceiling: i64,
    pub rows_in: usize,
    pub parse_failures: usize,
    pub outliers_dropped: usize,
    /// Smallest parsed price before trimming
    pub min_observed: Option<i64>,
    /// Largest parsed price before trimming
    pub max_observed: Option<i64>,
    pub rows_out: usize,
}

/// Output of [`PriceNormalizer::normalize`]
#[derive(Debug, Clone)]
pub struct PriceNormalization {
    /// Rows with a parsed price below the ceiling
    pub table: DataFrame,
    /// Rows with a parsed price at or above the ceiling
    pub outliers: DataFrame,
    pub report: PriceReport,
}

impl PriceNormalization {
    pub fn stage_report(&self) -> StageReport {
        StageReport::new(
            Stage::NormalizePrice,
            self.report.rows_in,
            self.report.rows_out,
            self.table.width(),
        )
    }
}

/// Converts `price` to Int64 and trims outliers
#[derive(Debug, Clone)]
pub struct PriceNormalizer {
    ceiling: i64,
}

impl Default for PriceNormalizer {
    fn default() -> Self {
        Self::new(PRICE_CEILING)
    }
}

impl PriceNormalizer {
    /// `ceiling` is an exclusive upper bound
    pub fn new(ceiling: i64) -> Self {
        Self { ceiling }
    }

    pub fn ceiling(&self) -> i64 {
        self.ceiling
    }

    pub fn normalize(&self, df: &DataFrame) -> Result<PriceNormalization> {
        schema::require_columns(df, &[PRICE])?;
        let raw = df
            .column(PRICE)?
            .as_materialized_series()
            .cast(&DataType::String)?;
        let raw = raw.str()?;

        let mut parsed: Vec<Option<i64>> = Vec::with_capacity(raw.len());
        let mut failures: Vec<EdaError> = Vec::new();
        let mut parse_failures = 0usize;

        for (row, value) in raw.into_iter().enumerate() {
            let price = value.and_then(parse_price);
            if price.is_none() {
                parse_failures += 1;
                if failures.len() < MAX_LOGGED_PARSE_FAILURES {
                    failures.push(EdaError::PriceParseError {
                        row,
                        raw: value.unwrap_or("<null>").to_string(),
                    });
                }
            }
            parsed.push(price);
        }

        for failure in &failures {
            warn!(error = %failure, "Dropping row with unparseable price");
        }

        let min_observed = parsed.iter().flatten().copied().min();
        let max_observed = parsed.iter().flatten().copied().max();

        let parsed_ok: Vec<bool> = parsed.iter().map(Option::is_some).collect();
        let below_ceiling: Vec<bool> = parsed
            .iter()
            .filter_map(|p| *p)
            .map(|p| p < self.ceiling)
            .collect();
        let above_or_at: Vec<bool> = below_ceiling.iter().map(|keep| !keep).collect();

        let mut with_price = df.clone();
        with_price.with_column(Series::new(PRICE.into(), parsed))?;
        let parsed_rows = with_price.filter(&BooleanChunked::new("parsed".into(), parsed_ok.as_slice()))?;

        let table = parsed_rows.filter(&BooleanChunked::new("keep".into(), below_ceiling.as_slice()))?;
        let outliers = parsed_rows.filter(&BooleanChunked::new("outlier".into(), above_or_at.as_slice()))?;

        let report = PriceReport {
            ceiling: self.ceiling,
            rows_in: df.height(),
            parse_failures,
            outliers_dropped: outliers.height(),
            min_observed,
            max_observed,
            rows_out: table.height(),
        };

        info!(
            rows_in = report.rows_in,
            parse_failures = report.parse_failures,
            outliers_dropped = report.outliers_dropped,
            min_price = ?report.min_observed,
            max_price = ?report.max_observed,
            ceiling = self.ceiling,
            rows_out = report.rows_out,
            "Normalized prices"
        );

        Ok(PriceNormalization { table, outliers, report })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_price_formats() {
        assert_eq!(parse_price("$1,234"), Some(1234));
        assert_eq!(parse_price("$45"), Some(45));
        assert_eq!(parse_price(" $150.00 "), Some(150));
        assert_eq!(parse_price("80"), Some(80));
        assert_eq!(parse_price("$0"), Some(0));
    }

    #[test]
    fn test_parse_price_rejects_garbage() {
        assert_eq!(parse_price(""), None);
        assert_eq!(parse_price("$"), None);
        assert_eq!(parse_price("$12.50"), None);
        assert_eq!(parse_price("-$5"), None);
        assert_eq!(parse_price("free"), None);
        assert_eq!(parse_price("€40"), None);
    }

    #[test]
    fn test_normalize_trims_and_counts() {
        let df = df!(
            "host_id" => &[1i64, 2, 3, 4, 5],
            "price" => &[Some("$1,234"), Some("$45"), Some("call us"), None, Some("$999")]
        ).unwrap();

        let result = PriceNormalizer::default().normalize(&df).unwrap();

        assert_eq!(result.report.parse_failures, 2);
        assert_eq!(result.report.outliers_dropped, 1);
        assert_eq!(result.report.min_observed, Some(45));
        assert_eq!(result.report.max_observed, Some(1234));
        assert_eq!(result.table.height(), 2);
        assert_eq!(result.outliers.height(), 1);

        let prices: Vec<Option<i64>> = result
            .table
            .column("price").unwrap()
            .as_materialized_series()
            .i64().unwrap()
            .into_iter()
            .collect();
        assert_eq!(prices, vec![Some(45), Some(999)]);

        let outlier_price = result.outliers.column("price").unwrap().as_materialized_series().i64().unwrap().get(0);
        assert_eq!(outlier_price, Some(1234));
    }

    #[test]
    fn test_ceiling_is_exclusive() {
        let df = df!("price" => &["$999", "$1,000"]).unwrap();
        let result = PriceNormalizer::new(1000).normalize(&df).unwrap();
        assert_eq!(result.table.height(), 1);
        assert_eq!(result.report.outliers_dropped, 1);
    }

    #[test]
    fn test_missing_price_column() {
        let df = df!("host_id" => &[1i64]).unwrap();
        let err = PriceNormalizer::default().normalize(&df).unwrap_err();
        assert!(matches!(err, EdaError::MissingColumn(_)));
    }
}
