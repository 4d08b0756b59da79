//! Exploratory analysis over the cleaned listings
//!
//! - [`describe`] summaries and cross-tabulations
//! - [`model`] logistic regression of superhost status

pub mod describe;
pub mod model;

pub use describe::{
    describe, null_counts, rating_by_superhost, superhost_by_response_time, ColumnSummary, ColumnType,
    RatingBySuperhost, ResponseTimeBreakdown,
};
pub use model::{Coefficient, Design, ModelSummary, SuperhostModel};
