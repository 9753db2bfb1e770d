//! Multi-class gradient boosting classifier.
//!
//! Implements gradient boosting with regression trees as weak learners
//! under a softmax objective, the multi-class analogue of log-loss
//! boosting.

use super::DecisionTreeRegressor;
use crate::error::Result;
use crate::primitives::Matrix;
use serde::{Deserialize, Serialize};

/// Gradient boosting classifier for K-class problems.
///
/// # Algorithm
///
/// 1. Initialize each class score with the log of its prior frequency.
/// 2. For each boosting round:
///    - Compute per-sample class probabilities via softmax of the scores.
///    - For each class, fit a small regression tree to the residuals
///      `one_hot(y) - p` and add `learning_rate` times its prediction to
///      that class's score.
/// 3. `predict_proba` = softmax of the accumulated scores, so every
///    probability vector sums to 1 up to floating-point error.
///
/// # Examples
///
/// ```
/// use prever::tree::GradientBoostingClassifier;
/// use prever::primitives::Matrix;
///
/// let x = Matrix::from_vec(6, 1, vec![0.0, 0.1, 5.0, 5.1, 10.0, 10.1]).expect("valid dims");
/// let y = [0, 0, 1, 1, 2, 2];
///
/// let mut model = GradientBoostingClassifier::new()
///     .with_n_estimators(20)
///     .with_max_depth(2);
/// model.fit(&x, &y).expect("fit succeeds");
/// assert_eq!(model.predict(&x).expect("fitted"), vec![0, 0, 1, 1, 2, 2]);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingClassifier {
    /// Number of boosting rounds
    n_estimators: usize,
    /// Learning rate (shrinkage parameter)
    learning_rate: f32,
    /// Maximum depth of each tree
    max_depth: usize,
    /// Minimum samples per leaf of each tree
    min_samples_leaf: usize,
    /// Number of target classes (set by fit)
    n_classes: usize,
    /// Initial per-class scores (log priors)
    init_scores: Vec<f32>,
    /// Fitted trees: one per class per round, outer index is the round
    rounds: Vec<Vec<DecisionTreeRegressor>>,
}

impl GradientBoostingClassifier {
    /// Creates a classifier with default parameters.
    ///
    /// # Default Parameters
    ///
    /// - `n_estimators`: 100
    /// - `learning_rate`: 0.1
    /// - `max_depth`: 3
    /// - `min_samples_leaf`: 1
    #[must_use]
    pub fn new() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 3,
            min_samples_leaf: 1,
            n_classes: 0,
            init_scores: Vec::new(),
            rounds: Vec::new(),
        }
    }

    /// Sets the number of boosting rounds.
    #[must_use]
    pub fn with_n_estimators(mut self, n_estimators: usize) -> Self {
        self.n_estimators = n_estimators;
        self
    }

    /// Sets the learning rate (shrinkage parameter).
    ///
    /// Lower values require more trees but often generalize better.
    /// Typical values: 0.01 - 0.3
    #[must_use]
    pub fn with_learning_rate(mut self, learning_rate: f32) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    /// Sets the maximum depth of each tree. Typical values: 3-8
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Sets the minimum samples per leaf of each tree.
    #[must_use]
    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf.max(1);
        self
    }

    /// Trains the classifier.
    ///
    /// # Arguments
    ///
    /// - `x`: Feature matrix (`n_samples` × `n_features`)
    /// - `y`: Class indices in `0..n_classes`; the class count is inferred
    ///   as `max(y) + 1`
    ///
    /// # Errors
    ///
    /// Returns an error on dimension mismatch, empty data, or fewer than
    /// two classes.
    pub fn fit(&mut self, x: &Matrix<f32>, y: &[usize]) -> Result<()> {
        let n_samples = x.n_rows();
        if n_samples != y.len() {
            return Err("x and y must have the same number of samples".into());
        }
        if n_samples == 0 {
            return Err("Cannot fit with 0 samples".into());
        }

        let n_classes = y.iter().max().map_or(0, |&m| m + 1);
        if n_classes < 2 {
            return Err("Need at least 2 classes to fit a classifier".into());
        }
        self.n_classes = n_classes;

        // Log priors as initial scores; the floor keeps ln() finite for a
        // class absent from the training partition.
        let mut counts = vec![0usize; n_classes];
        for &label in y {
            counts[label] += 1;
        }
        self.init_scores = counts
            .iter()
            .map(|&c| ((c as f32 / n_samples as f32).max(1e-6)).ln())
            .collect();

        // Current raw scores, per class per sample.
        let mut scores: Vec<Vec<f32>> = self
            .init_scores
            .iter()
            .map(|&s| vec![s; n_samples])
            .collect();

        self.rounds = Vec::with_capacity(self.n_estimators);

        for _ in 0..self.n_estimators {
            let probs = softmax_columns(&scores, n_samples);

            let mut round_trees = Vec::with_capacity(n_classes);
            for class in 0..n_classes {
                let residuals: Vec<f32> = (0..n_samples)
                    .map(|i| {
                        let target = if y[i] == class { 1.0 } else { 0.0 };
                        target - probs[i][class]
                    })
                    .collect();

                let mut tree = DecisionTreeRegressor::new()
                    .with_max_depth(self.max_depth)
                    .with_min_samples_leaf(self.min_samples_leaf);
                tree.fit(x, &residuals)?;

                let updates = tree.predict(x);
                for (i, &update) in updates.iter().enumerate() {
                    scores[class][i] += self.learning_rate * update;
                }
                round_trees.push(tree);
            }
            self.rounds.push(round_trees);
        }

        Ok(())
    }

    /// Predicts class probabilities for every row.
    ///
    /// Each returned distribution sums to 1.0 up to floating-point error.
    ///
    /// # Errors
    ///
    /// Returns an error if the model has not been trained.
    pub fn predict_proba(&self, x: &Matrix<f32>) -> Result<Vec<Vec<f32>>> {
        if self.rounds.is_empty() {
            return Err("Model not trained yet".into());
        }

        Ok((0..x.n_rows())
            .map(|row| self.predict_proba_one(x.row(row)))
            .collect())
    }

    /// Predicts the probability distribution for a single sample.
    ///
    /// # Panics
    ///
    /// Panics if called before `fit()`.
    #[must_use]
    pub fn predict_proba_one(&self, sample: &[f32]) -> Vec<f32> {
        assert!(!self.rounds.is_empty(), "Model not trained yet");

        let mut raw = self.init_scores.clone();
        for round in &self.rounds {
            for (class, tree) in round.iter().enumerate() {
                raw[class] += self.learning_rate * tree.predict_one(sample);
            }
        }
        softmax(&raw)
    }

    /// Predicts class indices (arg-max of the probabilities; ties go to
    /// the lowest native index).
    ///
    /// # Errors
    ///
    /// Returns an error if the model has not been trained.
    pub fn predict(&self, x: &Matrix<f32>) -> Result<Vec<usize>> {
        let probas = self.predict_proba(x)?;
        Ok(probas.iter().map(|probs| argmax(probs)).collect())
    }

    /// Returns the number of fitted boosting rounds.
    #[must_use]
    pub fn n_rounds(&self) -> usize {
        self.rounds.len()
    }

    /// Returns the number of target classes (0 before fitting).
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Returns the learning rate.
    #[must_use]
    pub fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    /// Returns the max depth.
    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }
}

impl Default for GradientBoostingClassifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Index of the largest value; the first one wins on ties.
fn argmax(values: &[f32]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] {
            best = i;
        }
    }
    best
}

/// Numerically stable softmax.
fn softmax(raw: &[f32]) -> Vec<f32> {
    let max = raw.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = raw.iter().map(|&r| (r - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.iter().map(|&e| e / sum).collect()
}

/// Softmax across classes for each sample, given per-class score vectors.
fn softmax_columns(scores: &[Vec<f32>], n_samples: usize) -> Vec<Vec<f32>> {
    (0..n_samples)
        .map(|i| {
            let raw: Vec<f32> = scores.iter().map(|class_scores| class_scores[i]).collect();
            softmax(&raw)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_cluster_data() -> (Matrix<f32>, Vec<usize>) {
        let x = Matrix::from_vec(
            9,
            2,
            vec![
                0.0, 0.0, 0.2, 0.1, 0.1, 0.3, // class 0
                5.0, 5.0, 5.2, 4.9, 5.1, 5.3, // class 1
                10.0, 0.0, 10.2, 0.1, 9.9, 0.2, // class 2
            ],
        )
        .expect("valid dims");
        let y = vec![0, 0, 0, 1, 1, 1, 2, 2, 2];
        (x, y)
    }

    #[test]
    fn test_fit_and_predict_clusters() {
        let (x, y) = three_cluster_data();
        let mut model = GradientBoostingClassifier::new()
            .with_n_estimators(30)
            .with_max_depth(2);
        model.fit(&x, &y).expect("fit succeeds");

        assert_eq!(model.n_classes(), 3);
        assert_eq!(model.n_rounds(), 30);
        assert_eq!(model.predict(&x).expect("fitted"), y);
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let (x, y) = three_cluster_data();
        let mut model = GradientBoostingClassifier::new().with_n_estimators(10);
        model.fit(&x, &y).expect("fit succeeds");

        for probs in model.predict_proba(&x).expect("fitted") {
            let sum: f32 = probs.iter().sum();
            assert!((sum - 1.0).abs() < 1e-6, "probabilities sum to {sum}");
            assert!(probs.iter().all(|&p| (0.0..=1.0).contains(&p)));
        }
    }

    #[test]
    fn test_predict_before_fit_errors() {
        let model = GradientBoostingClassifier::new();
        let x = Matrix::from_vec(1, 1, vec![0.0]).expect("valid dims");
        assert!(model.predict(&x).is_err());
        assert!(model.predict_proba(&x).is_err());
    }

    #[test]
    fn test_fit_rejects_single_class() {
        let x = Matrix::from_vec(3, 1, vec![1.0, 2.0, 3.0]).expect("valid dims");
        let mut model = GradientBoostingClassifier::new();
        assert!(model.fit(&x, &[0, 0, 0]).is_err());
    }

    #[test]
    fn test_fit_rejects_dimension_mismatch() {
        let x = Matrix::from_vec(2, 1, vec![1.0, 2.0]).expect("valid dims");
        let mut model = GradientBoostingClassifier::new();
        assert!(model.fit(&x, &[0]).is_err());
    }

    #[test]
    fn test_single_sample_proba_matches_batch() {
        let (x, y) = three_cluster_data();
        let mut model = GradientBoostingClassifier::new().with_n_estimators(5);
        model.fit(&x, &y).expect("fit succeeds");

        let batch = model.predict_proba(&x).expect("fitted");
        let single = model.predict_proba_one(x.row(4));
        assert_eq!(batch[4], single);
    }

    #[test]
    fn test_argmax_first_wins_on_tie() {
        assert_eq!(argmax(&[0.4, 0.4, 0.2]), 0);
        assert_eq!(argmax(&[0.1, 0.5, 0.4]), 1);
    }

    #[test]
    fn test_softmax_stability() {
        let probs = softmax(&[1000.0, 1000.0]);
        assert!((probs[0] - 0.5).abs() < 1e-6);
        let sum: f32 = softmax(&[-500.0, 0.0, 500.0]).iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_builder_getters() {
        let model = GradientBoostingClassifier::new()
            .with_learning_rate(0.05)
            .with_max_depth(4);
        assert!((model.learning_rate() - 0.05).abs() < f32::EPSILON);
        assert_eq!(model.max_depth(), 4);
    }
}
