//! Listing pipeline driver

use super::{
    canonicalize_response_time, drop_missing_rating, drop_missing_superhost, single_listing_hosts,
    PriceNormalizer, PriceReport, Projector, StageReport,
};
use crate::config::{ArtifactPaths, PipelineConfig};
use crate::error::{Result, Stage};
use crate::utils::{DataLoader, DataSaver};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::info;

/// Tables and reports produced by the in-memory cleaning stages
#[derive(Debug, Clone)]
pub struct CleaningOutcome {
    /// Final analysis dataset
    pub table: DataFrame,
    /// Rows excluded by the price ceiling, kept for inspection
    pub price_outliers: DataFrame,
    pub price: PriceReport,
    pub stages: Vec<StageReport>,
}

/// Serializable record of one full run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    pub config: PipelineConfig,
    pub artifacts: ArtifactPaths,
    pub stages: Vec<StageReport>,
    pub price: PriceReport,
    pub elapsed_secs: f64,
}

/// Result of [`ListingPipeline::run`]
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub raw_rows: usize,
    pub projected: DataFrame,
    pub cleaning: CleaningOutcome,
    pub report: PipelineReport,
}

/// Load → project → normalize price → missingness and cohort filters → persist
#[derive(Debug, Clone)]
pub struct ListingPipeline {
    config: PipelineConfig,
    projector: Projector,
    price: PriceNormalizer,
}

impl ListingPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        let price = PriceNormalizer::new(config.price_ceiling);
        Self {
            config,
            projector: Projector::new(),
            price,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every stage against the configured source and write all artifacts
    pub fn run(&self) -> Result<PipelineOutcome> {
        let start = Instant::now();
        self.config.validate()?;
        let paths = self.config.artifact_paths();

        let loader = DataLoader::new()
            .with_infer_schema_length(self.config.infer_schema_length)
            .with_http_timeout(Duration::from_secs(self.config.http_timeout_secs));
        let raw = loader
            .load_listings(&self.config.source_url)
            .map_err(|e| e.in_stage(Stage::Load, 0))?;

        if let Some(raw_copy) = &paths.raw_copy {
            DataSaver::save_csv(&raw, raw_copy).map_err(|e| e.in_stage(Stage::Persist, raw.height()))?;
            info!(path = %raw_copy.display(), "Wrote raw copy");
        }

        let projected = self.project(&raw)?;
        DataSaver::save_parquet(&projected, &paths.select_variables)
            .map_err(|e| e.in_stage(Stage::Persist, projected.height()))?;
        info!(path = %paths.select_variables.display(), "Wrote projected dataset");

        let cleaning = self.clean(&projected)?;

        let mut stages = Vec::with_capacity(cleaning.stages.len() + 2);
        stages.push(StageReport::new(Stage::Load, raw.height(), raw.height(), raw.width()));
        stages.extend(cleaning.stages.iter().cloned());

        self.persist(&cleaning.table, &paths)?;
        stages.push(StageReport::new(
            Stage::Persist,
            cleaning.table.height(),
            cleaning.table.height(),
            cleaning.table.width(),
        ));

        let report = PipelineReport {
            config: self.config.clone(),
            artifacts: paths.clone(),
            stages,
            price: cleaning.price.clone(),
            elapsed_secs: start.elapsed().as_secs_f64(),
        };
        write_report(&report, &paths)?;

        info!(
            raw_rows = raw.height(),
            final_rows = cleaning.table.height(),
            elapsed_secs = report.elapsed_secs,
            "Pipeline finished"
        );

        Ok(PipelineOutcome {
            raw_rows: raw.height(),
            projected,
            cleaning,
            report,
        })
    }

    /// Column selection on a loaded table
    pub fn project(&self, raw: &DataFrame) -> Result<DataFrame> {
        let (projected, _) = self
            .projector
            .project(raw)
            .map_err(|e| e.in_stage(Stage::Project, raw.height()))?;
        Ok(projected)
    }

    /// Price normalization and the missingness and cohort filters, without IO
    pub fn clean(&self, projected: &DataFrame) -> Result<CleaningOutcome> {
        let mut stages = vec![StageReport::new(
            Stage::Project,
            projected.height(),
            projected.height(),
            projected.width(),
        )];

        let normalized = self
            .price
            .normalize(projected)
            .map_err(|e| e.in_stage(Stage::NormalizePrice, projected.height()))?;
        stages.push(normalized.stage_report());

        let filters: [(Stage, fn(&DataFrame) -> Result<(DataFrame, StageReport)>); 4] = [
            (Stage::DropMissingSuperhost, drop_missing_superhost),
            (Stage::DropMissingRating, drop_missing_rating),
            (Stage::CanonicalizeResponseTime, canonicalize_response_time),
            (Stage::CohortFilter, single_listing_hosts),
        ];

        let mut table = normalized.table;
        for (stage, filter) in filters {
            let (next, report) = filter(&table).map_err(|e| e.in_stage(stage, table.height()))?;
            stages.push(report);
            table = next;
        }

        Ok(CleaningOutcome {
            table,
            price_outliers: normalized.outliers,
            price: normalized.report,
            stages,
        })
    }

    fn persist(&self, table: &DataFrame, paths: &ArtifactPaths) -> Result<()> {
        DataSaver::save_parquet(table, &paths.analysis_dataset)
            .map_err(|e| e.in_stage(Stage::Persist, table.height()))?;
        info!(
            path = %paths.analysis_dataset.display(),
            rows = table.height(),
            cols = table.width(),
            "Wrote analysis dataset"
        );
        Ok(())
    }
}

fn write_report(report: &PipelineReport, paths: &ArtifactPaths) -> Result<()> {
    DataSaver::save_json(report, &paths.report).map_err(|e| e.in_stage(Stage::Persist, 0))?;
    info!(path = %paths.report.display(), "Wrote pipeline report");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EdaError;

    fn projected_fixture() -> DataFrame {
        df!(
            "host_id" => &[1i64, 2, 3, 4, 7, 7],
            "host_response_time" => &[Some("within an hour"), Some("N/A"), Some("within a day"), Some("within an hour"), Some("within an hour"), Some("within a few hours")],
            "host_is_superhost" => &[Some("t"), Some("f"), None, Some("f"), Some("t"), Some("t")],
            "price" => &["$45", "$60", "$70", "$1,234", "$80", "$90"],
            "review_scores_rating" => &[Some(4.8), Some(4.8), Some(4.1), Some(4.9), Some(5.0), Some(4.5)]
        ).unwrap()
    }

    #[test]
    fn test_clean_applies_stages_in_order() {
        let pipeline = ListingPipeline::new(PipelineConfig::default());
        let outcome = pipeline.clean(&projected_fixture()).unwrap();

        // host 1 is the only survivor: 2 is N/A, 3 has no flag, 4 is an outlier, 7 lists twice
        assert_eq!(outcome.table.height(), 1);
        assert_eq!(outcome.price_outliers.height(), 1);

        let stages: Vec<Stage> = outcome.stages.iter().map(|s| s.stage).collect();
        assert_eq!(
            stages,
            vec![
                Stage::Project,
                Stage::NormalizePrice,
                Stage::DropMissingSuperhost,
                Stage::DropMissingRating,
                Stage::CanonicalizeResponseTime,
                Stage::CohortFilter,
            ]
        );
        for pair in outcome.stages.windows(2) {
            assert_eq!(pair[0].rows_out, pair[1].rows_in);
            assert!(pair[1].rows_out <= pair[1].rows_in);
        }
    }

    #[test]
    fn test_clean_error_carries_stage() {
        let df = df!("price" => &["$10"]).unwrap();
        let err = ListingPipeline::new(PipelineConfig::default()).clean(&df).unwrap_err();

        match err {
            EdaError::Stage { stage, rows, .. } => {
                assert_eq!(stage, Stage::DropMissingSuperhost);
                assert_eq!(rows, 1);
            }
            other => panic!("expected stage error, got {other:?}"),
        }
    }
}
