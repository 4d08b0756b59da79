//! Column selection

use super::StageReport;
use crate::error::{Result, Stage};
use crate::schema::{self, ColumnSpec, SELECTED_COLUMNS};
use polars::prelude::*;
use tracing::info;

/// Keeps a fixed list of columns, cast to their declared types
#[derive(Debug, Clone)]
pub struct Projector {
    columns: Vec<ColumnSpec>,
}

impl Default for Projector {
    fn default() -> Self {
        Self::new()
    }
}

impl Projector {
    /// Project onto [`SELECTED_COLUMNS`]
    pub fn new() -> Self {
        Self::with_columns(SELECTED_COLUMNS.to_vec())
    }

    /// Project onto a custom column list
    pub fn with_columns(columns: Vec<ColumnSpec>) -> Self {
        Self { columns }
    }

    /// Columns kept, in output order
    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    /// Select the configured columns in order. Rows are never dropped.
    pub fn project(&self, df: &DataFrame) -> Result<(DataFrame, StageReport)> {
        let names: Vec<&str> = self.columns.iter().map(|c| c.name).collect();
        schema::require_columns(df, &names)?;

        let columns = self
            .columns
            .iter()
            .map(|spec| schema::conform_column(df, spec).map(Column::from))
            .collect::<Result<Vec<_>>>()?;
        let projected = DataFrame::new(columns)?;

        let report = StageReport::new(Stage::Project, df.height(), projected.height(), projected.width());
        info!(
            rows = projected.height(),
            cols_in = df.width(),
            cols_out = projected.width(),
            "Projected listing columns"
        );
        Ok((projected, report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EdaError;
    use crate::schema::ColumnKind;

    #[test]
    fn test_project_keeps_order_and_rows() {
        let df = df!(
            "extra" => &["a", "b"],
            "price" => &["$10", "$20"],
            "host_id" => &[2i64, 1]
        ).unwrap();

        let projector = Projector::with_columns(vec![
            ColumnSpec { name: "host_id", kind: ColumnKind::Integer },
            ColumnSpec { name: "price", kind: ColumnKind::Text },
        ]);
        let (out, report) = projector.project(&df).unwrap();

        let names: Vec<String> = out.get_column_names().into_iter().map(|s| s.to_string()).collect();
        assert_eq!(names, vec!["host_id", "price"]);
        assert_eq!(out.height(), 2);
        assert_eq!(report.rows_dropped(), 0);
        assert_eq!(out.column("host_id").unwrap().as_materialized_series().i64().unwrap().get(0), Some(2));
    }

    #[test]
    fn test_project_missing_column() {
        let df = df!("host_id" => &[1i64]).unwrap();
        let err = Projector::new().project(&df).unwrap_err();
        assert!(matches!(err, EdaError::MissingColumn(name) if name == "host_response_time"));
    }

    #[test]
    fn test_numeric_price_becomes_text() {
        let df = df!("price" => &[45i64, 1234]).unwrap();
        let projector = Projector::with_columns(vec![ColumnSpec { name: "price", kind: ColumnKind::Text }]);
        let (out, _) = projector.project(&df).unwrap();
        assert_eq!(out.column("price").unwrap().dtype(), &DataType::String);
    }
}
