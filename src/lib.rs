//! Prever: Obesity-level classification pipeline in pure Rust.
//!
//! Prever takes the raw obesity survey CSV from schema validation through
//! deterministic categorical encoding, gradient-boosted multi-class
//! training, paired artifact persistence, and single-record inference with
//! clinically ordered probabilities. A read-only aggregation reader backs
//! analytical views over the same dataset.
//!
//! # Quick Start
//!
//! ```no_run
//! use prever::prelude::*;
//!
//! # fn main() -> prever::error::Result<()> {
//! // Train from the survey CSV and persist the model/encoder pair.
//! let schema = FeatureSchema::obesity();
//! let params = Hyperparameters::new().with_n_estimators(200).with_seed(42);
//! let report = train_from_csv("Obesity.csv", "artifacts", &schema, &params)?;
//! println!("holdout accuracy: {:.3}", report.accuracy);
//!
//! // Load the pair and classify a record.
//! let ctx = InferenceContext::load("artifacts", FeatureSchema::obesity())?;
//! let record = PredictionRecord::new()
//!     .with_field("Gender", "Female")
//!     .with_number("Age", 21.0)
//!     .with_number("Height", 1.62)
//!     .with_number("Weight", 64.0);
//! // ... remaining survey fields ...
//! let result = ctx.predict(&record)?;
//! println!("{}", result.label);
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`primitives`]: Core Vector and Matrix types
//! - [`schema`]: Feature definitions and the clinical class ordering
//! - [`dataset`]: Raw CSV loading and column validation
//! - [`encoding`]: Deterministic categorical encoders and the derived BMI
//! - [`tree`]: Regression trees and the gradient boosting classifier
//! - [`model_selection`]: Stratified train/test splitting
//! - [`metrics`]: Accuracy, precision/recall/F1, confusion matrix
//! - [`pipeline`]: End-to-end training, evaluation, and grid search
//! - [`artifact`]: Paired model/encoder persistence
//! - [`inference`]: Single-record prediction against a loaded pair
//! - [`insights`]: Read-only aggregation queries over the raw dataset

pub mod artifact;
pub mod dataset;
pub mod encoding;
pub mod error;
pub mod inference;
pub mod insights;
pub mod metrics;
pub mod model_selection;
pub mod pipeline;
pub mod prelude;
pub mod primitives;
pub mod schema;
pub mod tree;
