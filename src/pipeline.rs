//! End-to-end training pipeline.
//!
//! Wires the stages together: load the raw CSV, validate it against the
//! schema, fit the encoders, split, train the boosted ensemble, evaluate on
//! the holdout, and persist the model/encoder pair plus a JSON report.

use crate::artifact;
use crate::dataset::RawDataset;
use crate::encoding::{encoded_feature_names, EncoderSet};
use crate::error::{PreverError, Result};
use crate::metrics::{accuracy, classification_report, confusion_matrix, f1_score, Average};
use crate::model_selection::stratified_train_test_split;
use crate::primitives::Matrix;
use crate::schema::FeatureSchema;
use crate::tree::GradientBoostingClassifier;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// File name of the evaluation report written next to the artifacts.
pub const REPORT_FILE: &str = "report.json";

/// Training hyperparameters with builder-style setters.
///
/// # Examples
///
/// ```
/// use prever::pipeline::Hyperparameters;
///
/// let params = Hyperparameters::new()
///     .with_n_estimators(200)
///     .with_max_depth(5)
///     .with_seed(42);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hyperparameters {
    /// Number of boosting rounds.
    pub n_estimators: usize,
    /// Shrinkage applied to each tree's contribution.
    pub learning_rate: f32,
    /// Maximum depth of each regression tree.
    pub max_depth: usize,
    /// Fraction of each class held out for evaluation.
    pub test_size: f32,
    /// Seed for the stratified split. None means nondeterministic.
    pub seed: Option<u64>,
    /// Optional gate: training fails if holdout accuracy falls below this.
    pub min_accuracy: Option<f32>,
}

impl Hyperparameters {
    /// Creates the default configuration: 100 rounds, learning rate 0.1,
    /// depth 3, 20% holdout, seed 42.
    #[must_use]
    pub fn new() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 3,
            test_size: 0.2,
            seed: Some(42),
            min_accuracy: None,
        }
    }

    /// Sets the number of boosting rounds.
    #[must_use]
    pub fn with_n_estimators(mut self, n_estimators: usize) -> Self {
        self.n_estimators = n_estimators;
        self
    }

    /// Sets the learning rate.
    #[must_use]
    pub fn with_learning_rate(mut self, learning_rate: f32) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    /// Sets the maximum tree depth.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Sets the holdout fraction.
    #[must_use]
    pub fn with_test_size(mut self, test_size: f32) -> Self {
        self.test_size = test_size;
        self
    }

    /// Sets the split seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Sets the minimum holdout accuracy required for training to succeed.
    #[must_use]
    pub fn with_min_accuracy(mut self, min_accuracy: f32) -> Self {
        self.min_accuracy = Some(min_accuracy);
        self
    }
}

impl Default for Hyperparameters {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-class evaluation row, keyed by the decoded class label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    /// Decoded class label.
    pub label: String,
    /// Precision for this class.
    pub precision: f32,
    /// Recall for this class.
    pub recall: f32,
    /// F1 for this class.
    pub f1: f32,
    /// Number of true holdout instances.
    pub support: usize,
}

/// Evaluation summary of one training run, written to `report.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    /// Run id shared with the persisted artifacts (empty until saved).
    pub run_id: String,
    /// Hyperparameters the run used.
    pub params: Hyperparameters,
    /// Number of training samples.
    pub n_train: usize,
    /// Number of holdout samples.
    pub n_test: usize,
    /// Holdout accuracy.
    pub accuracy: f32,
    /// Macro-averaged holdout F1.
    pub macro_f1: f32,
    /// Per-class precision/recall/F1 rows in native class order.
    pub per_class: Vec<ClassMetrics>,
    /// Confusion matrix, rows = true class, columns = predicted class,
    /// in native class order.
    pub confusion: Vec<Vec<usize>>,
    /// Class labels in native class order, indexing the matrix above.
    pub class_labels: Vec<String>,
}

/// Everything a training run produces before persistence.
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    /// The trained classifier.
    pub model: GradientBoostingClassifier,
    /// The fitted encoder set.
    pub encoders: EncoderSet,
    /// Holdout evaluation.
    pub report: TrainingReport,
}

/// Trains a classifier on an in-memory dataset.
///
/// Encoders are fit on the full dataset before the split so both partitions
/// share the same codes, then the model trains on the stratified training
/// partition and is evaluated on the holdout.
///
/// # Errors
///
/// Propagates schema, encoding, split, and fit errors. Also fails when
/// `min_accuracy` is set and the holdout accuracy falls below it.
pub fn train(
    data: &RawDataset,
    schema: &FeatureSchema,
    params: &Hyperparameters,
) -> Result<TrainingOutcome> {
    data.validate_columns(schema)?;

    let encoders = EncoderSet::fit(data, schema)?;
    let (x, y) = encoders.encode_dataset(data, schema)?;
    let (x_train, x_test, y_train, y_test) =
        stratified_train_test_split(&x, &y, params.test_size, params.seed)?;

    let mut model = GradientBoostingClassifier::new()
        .with_n_estimators(params.n_estimators)
        .with_learning_rate(params.learning_rate)
        .with_max_depth(params.max_depth);
    model.fit(&x_train, &y_train)?;

    let report = evaluate(&model, &encoders, &x_test, &y_test, x_train.n_rows(), params)?;

    if let Some(threshold) = params.min_accuracy {
        if report.accuracy < threshold {
            return Err(PreverError::Other(format!(
                "holdout accuracy {:.4} below required minimum {threshold:.4}",
                report.accuracy
            )));
        }
    }

    Ok(TrainingOutcome {
        model,
        encoders,
        report,
    })
}

/// Trains from a CSV file and persists the artifact pair plus the report.
///
/// Writes `model.bin`, `encoders.bin`, and `report.json` into
/// `artifact_dir`. The returned report carries the run id stamped into the
/// artifacts.
///
/// # Errors
///
/// Propagates loading, training, and persistence errors.
pub fn train_from_csv<P: AsRef<Path>, Q: AsRef<Path>>(
    dataset_path: P,
    artifact_dir: Q,
    schema: &FeatureSchema,
    params: &Hyperparameters,
) -> Result<TrainingReport> {
    let data = RawDataset::from_csv(dataset_path)?;
    let mut outcome = train(&data, schema, params)?;

    let stamp = artifact::save_pair(
        &artifact_dir,
        &outcome.model,
        &outcome.encoders,
        encoded_feature_names(schema),
    )?;
    outcome.report.run_id = stamp.run_id;

    write_report(&artifact_dir, &outcome.report)?;
    Ok(outcome.report)
}

/// Candidate values for an exhaustive hyperparameter sweep.
#[derive(Debug, Clone)]
pub struct ParamGrid {
    /// Boosting round counts to try.
    pub n_estimators: Vec<usize>,
    /// Tree depths to try.
    pub max_depth: Vec<usize>,
    /// Learning rates to try.
    pub learning_rate: Vec<f32>,
}

impl Default for ParamGrid {
    fn default() -> Self {
        Self {
            n_estimators: vec![100, 200],
            max_depth: vec![3, 5],
            learning_rate: vec![0.01, 0.1],
        }
    }
}

/// Result of a grid search: the winning configuration and its score.
#[derive(Debug, Clone)]
pub struct GridSearchResult {
    /// Hyperparameters of the best candidate.
    pub best_params: Hyperparameters,
    /// Holdout accuracy of the best candidate.
    pub best_accuracy: f32,
    /// Number of candidates evaluated.
    pub n_candidates: usize,
}

/// Evaluates every grid combination with [`train`] and returns the one
/// with the highest holdout accuracy. Ties keep the earlier candidate.
///
/// # Errors
///
/// Returns an error on an empty grid, and propagates training errors.
pub fn grid_search(
    data: &RawDataset,
    schema: &FeatureSchema,
    base: &Hyperparameters,
    grid: &ParamGrid,
) -> Result<GridSearchResult> {
    if grid.n_estimators.is_empty() || grid.max_depth.is_empty() || grid.learning_rate.is_empty() {
        return Err("Parameter grid must have at least one value per axis".into());
    }

    let mut best: Option<(Hyperparameters, f32)> = None;
    let mut n_candidates = 0;

    for &n_estimators in &grid.n_estimators {
        for &max_depth in &grid.max_depth {
            for &learning_rate in &grid.learning_rate {
                let candidate = base
                    .clone()
                    .with_n_estimators(n_estimators)
                    .with_max_depth(max_depth)
                    .with_learning_rate(learning_rate);
                let outcome = train(data, schema, &candidate)?;
                n_candidates += 1;

                let is_better = best
                    .as_ref()
                    .map_or(true, |(_, acc)| outcome.report.accuracy > *acc);
                if is_better {
                    best = Some((candidate, outcome.report.accuracy));
                }
            }
        }
    }

    let (best_params, best_accuracy) = best.expect("grid has at least one candidate");
    Ok(GridSearchResult {
        best_params,
        best_accuracy,
        n_candidates,
    })
}

fn evaluate(
    model: &GradientBoostingClassifier,
    encoders: &EncoderSet,
    x_test: &Matrix<f32>,
    y_test: &[usize],
    n_train: usize,
    params: &Hyperparameters,
) -> Result<TrainingReport> {
    let y_pred = model.predict(x_test)?;

    let per_class = classification_report(&y_pred, y_test)
        .into_iter()
        .map(|row| {
            Ok(ClassMetrics {
                label: encoders.decode_class(row.class)?.to_string(),
                precision: row.precision,
                recall: row.recall,
                f1: row.f1,
                support: row.support,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let cm = confusion_matrix(&y_pred, y_test);
    let confusion: Vec<Vec<usize>> = (0..cm.n_rows()).map(|i| cm.row(i).to_vec()).collect();

    Ok(TrainingReport {
        run_id: String::new(),
        params: params.clone(),
        n_train,
        n_test: y_test.len(),
        accuracy: accuracy(&y_pred, y_test),
        macro_f1: f1_score(&y_pred, y_test, Average::Macro),
        per_class,
        confusion,
        class_labels: encoders.class_labels().to_vec(),
    })
}

fn write_report<P: AsRef<Path>>(dir: P, report: &TrainingReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report)
        .map_err(|e| PreverError::Serialization(e.to_string()))?;
    fs::write(dir.as_ref().join(REPORT_FILE), json)?;
    Ok(())
}
