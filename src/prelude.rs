//! Convenience re-exports for common usage.
//!
//! # Usage
//!
//! ```
//! use prever::prelude::*;
//! ```

pub use crate::primitives::{Matrix, Vector};
pub use crate::dataset::RawDataset;
pub use crate::schema::{FeatureSchema, CLINICAL_ORDER};
pub use crate::encoding::{CategoryEncoder, EncoderSet};
pub use crate::tree::GradientBoostingClassifier;
pub use crate::pipeline::{train, train_from_csv, Hyperparameters, TrainingReport};
pub use crate::inference::{InferenceContext, PredictionRecord, PredictionResult};
pub use crate::insights::InsightsReader;
pub use crate::metrics::{accuracy, f1_score, Average};
pub use crate::error::{PreverError, Result};
