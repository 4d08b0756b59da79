//! Listing cleaning stages
//!
//! Each stage borrows the table produced by the previous one and returns a
//! new, narrower table together with a [`StageReport`]:
//! - [`Projector`] - fixed column selection and schema contract
//! - [`PriceNormalizer`] - currency text to integer price, outlier trim
//! - [`drop_missing_superhost`] / [`drop_missing_rating`] - missing-value policy
//! - [`canonicalize_response_time`] - `N/A` sentinel removal, categorical cast
//! - [`single_listing_hosts`] - cohort restriction
//!
//! [`ListingPipeline`] sequences them between the loader and the persister.

mod categorical;
mod cohort;
mod missingness;
mod pipeline;
mod price;
mod projector;

pub use categorical::canonicalize_response_time;
pub use cohort::single_listing_hosts;
pub use missingness::{drop_missing_rating, drop_missing_superhost, parse_flag};
pub use pipeline::{CleaningOutcome, ListingPipeline, PipelineOutcome, PipelineReport};
pub use price::{parse_price, PriceNormalization, PriceNormalizer, PriceReport};
pub use projector::Projector;

use crate::error::Stage;
use serde::{Deserialize, Serialize};

/// Row accounting for one stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageReport {
    pub stage: Stage,
    pub rows_in: usize,
    pub rows_out: usize,
    pub columns_out: usize,
    /// Nulls in the stage's key column, counted on the stage input
    pub nulls_in: Option<usize>,
}

impl StageReport {
    pub fn new(stage: Stage, rows_in: usize, rows_out: usize, columns_out: usize) -> Self {
        Self {
            stage,
            rows_in,
            rows_out,
            columns_out,
            nulls_in: None,
        }
    }

    pub fn with_nulls_in(mut self, nulls: usize) -> Self {
        self.nulls_in = Some(nulls);
        self
    }

    pub fn rows_dropped(&self) -> usize {
        self.rows_in.saturating_sub(self.rows_out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_report_rows_dropped() {
        let report = StageReport::new(Stage::CohortFilter, 10, 7, 13).with_nulls_in(2);
        assert_eq!(report.rows_dropped(), 3);
        assert_eq!(report.nulls_in, Some(2));
    }

    #[test]
    fn test_stage_report_serialize() {
        let report = StageReport::new(Stage::NormalizePrice, 5, 4, 12);
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"stage\":\"normalize_price\""));
    }
}
