//! Airbnb listings EDA - cleaning pipeline and exploratory analysis
//!
//! Turns a raw Inside Airbnb `listings.csv.gz` snapshot into an analysis-ready
//! columnar dataset of single-listing hosts, then describes and models it.
//!
//! # Modules
//!
//! ## Pipeline
//! - [`config`] - Run configuration and artifact naming
//! - [`schema`] - Column names and the projected schema contract
//! - [`preprocessing`] - Projection, price normalization, missingness and cohort filters
//! - [`utils`] - Loading and atomic persistence
//!
//! ## Analysis
//! - [`analysis`] - Summaries and the superhost logistic model
//!
//! ## Services
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;

pub mod config;
pub mod schema;
pub mod preprocessing;
pub mod analysis;
pub mod utils;

pub mod cli;

pub use error::{EdaError, Result};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::analysis::{describe, ModelSummary, SuperhostModel};
    pub use crate::config::{ArtifactPaths, PipelineConfig};
    pub use crate::error::{EdaError, Result, Stage};
    pub use crate::preprocessing::{ListingPipeline, PipelineOutcome, PriceNormalizer, Projector, StageReport};
    pub use crate::schema::ResponseTime;
    pub use crate::utils::{DataLoader, DataSaver};
}
