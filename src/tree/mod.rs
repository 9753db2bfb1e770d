//! Decision tree learners.
//!
//! Provides the CART regression tree that gradient boosting fits to
//! per-class residuals.

mod gradient_boosting;

pub use gradient_boosting::GradientBoostingClassifier;

use crate::error::Result;
use crate::primitives::Matrix;
use serde::{Deserialize, Serialize};

/// Leaf node in a regression tree.
///
/// Contains the predicted value (mean of training targets) and the number
/// of training samples that reached this leaf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionLeaf {
    /// Predicted value for this leaf (mean of y values)
    pub value: f32,
    /// Number of training samples in this leaf
    pub n_samples: usize,
}

/// Internal node in a regression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionNode {
    /// Index of the feature to split on
    pub feature_idx: usize,
    /// Threshold value for the split
    pub threshold: f32,
    /// Left subtree (samples where feature <= threshold)
    pub left: Box<RegressionTreeNode>,
    /// Right subtree (samples where feature > threshold)
    pub right: Box<RegressionTreeNode>,
}

/// A node in a regression tree (either internal node or leaf).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RegressionTreeNode {
    /// Internal decision node with split condition
    Node(RegressionNode),
    /// Leaf node with value prediction
    Leaf(RegressionLeaf),
}

impl RegressionTreeNode {
    /// Returns the depth of the tree rooted at this node.
    ///
    /// Leaf nodes have depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        match self {
            RegressionTreeNode::Leaf(_) => 0,
            RegressionTreeNode::Node(node) => 1 + node.left.depth().max(node.right.depth()),
        }
    }
}

/// Decision tree regressor using the CART algorithm.
///
/// Uses mean squared error as the splitting criterion; leaf nodes predict
/// the mean of their target values.
///
/// # Examples
///
/// ```
/// use prever::tree::DecisionTreeRegressor;
/// use prever::primitives::Matrix;
///
/// let x = Matrix::from_vec(4, 1, vec![1.0, 2.0, 10.0, 11.0]).expect("valid dims");
/// let y = [0.0, 0.0, 1.0, 1.0];
///
/// let mut tree = DecisionTreeRegressor::new().with_max_depth(2);
/// tree.fit(&x, &y).expect("fit succeeds");
/// let preds = tree.predict(&x);
/// assert!(preds[0] < 0.5 && preds[3] > 0.5);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTreeRegressor {
    tree: Option<RegressionTreeNode>,
    max_depth: Option<usize>,
    min_samples_split: usize,
    min_samples_leaf: usize,
}

impl DecisionTreeRegressor {
    /// Creates a new decision tree regressor with default parameters.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tree: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }

    /// Sets the maximum depth of the tree (root has depth 0).
    #[must_use]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Sets the minimum number of samples required to split a node.
    #[must_use]
    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples.max(2);
        self
    }

    /// Sets the minimum number of samples required at a leaf.
    #[must_use]
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples.max(1);
        self
    }

    /// Fits the tree to training data.
    ///
    /// # Errors
    ///
    /// Returns an error if x and y disagree in length or are empty.
    pub fn fit(&mut self, x: &Matrix<f32>, y: &[f32]) -> Result<()> {
        let (n_rows, _) = x.shape();
        if n_rows != y.len() {
            return Err("Number of samples in X and y must match".into());
        }
        if n_rows == 0 {
            return Err("Cannot fit with zero samples".into());
        }

        self.tree = Some(build_regression_tree(
            x,
            y,
            0,
            self.max_depth,
            self.min_samples_split,
            self.min_samples_leaf,
        ));
        Ok(())
    }

    /// Predicts target values for all rows of a matrix.
    ///
    /// # Panics
    ///
    /// Panics if called before `fit()`.
    #[must_use]
    pub fn predict(&self, x: &Matrix<f32>) -> Vec<f32> {
        (0..x.n_rows()).map(|row| self.predict_one(x.row(row))).collect()
    }

    /// Predicts the value for a single sample.
    ///
    /// # Panics
    ///
    /// Panics if called before `fit()`.
    #[must_use]
    pub fn predict_one(&self, x: &[f32]) -> f32 {
        let mut node = self.tree.as_ref().expect("Model not fitted");
        loop {
            match node {
                RegressionTreeNode::Leaf(leaf) => return leaf.value,
                RegressionTreeNode::Node(internal) => {
                    if x[internal.feature_idx] <= internal.threshold {
                        node = &internal.left;
                    } else {
                        node = &internal.right;
                    }
                }
            }
        }
    }

    /// Returns the root node, if fitted.
    #[must_use]
    pub fn root(&self) -> Option<&RegressionTreeNode> {
        self.tree.as_ref()
    }
}

impl Default for DecisionTreeRegressor {
    fn default() -> Self {
        Self::new()
    }
}

fn mean_f32(values: &[f32]) -> f32 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f32>() / values.len() as f32
    }
}

fn variance_f32(y: &[f32]) -> f32 {
    if y.len() <= 1 {
        return 0.0;
    }
    let mean = mean_f32(y);
    y.iter().map(|&v| (v - mean).powi(2)).sum::<f32>() / y.len() as f32
}

/// Weighted MSE of a candidate split.
fn split_mse(y_left: &[f32], y_right: &[f32]) -> f32 {
    let n_left = y_left.len() as f32;
    let n_right = y_right.len() as f32;
    let n_total = n_left + n_right;
    if n_total == 0.0 {
        return 0.0;
    }
    (n_left / n_total) * variance_f32(y_left) + (n_right / n_total) * variance_f32(y_right)
}

/// Finds the best (feature, threshold) pair by variance reduction, or None
/// if no split improves on the current node.
fn find_best_split(x: &Matrix<f32>, y: &[f32]) -> Option<(usize, f32)> {
    let (n_samples, n_features) = x.shape();
    if n_samples < 2 {
        return None;
    }

    let current_variance = variance_f32(y);
    let mut best_gain = 0.0;
    let mut best: Option<(usize, f32)> = None;

    for feature_idx in 0..n_features {
        let mut values: Vec<f32> = (0..n_samples).map(|i| x.get(i, feature_idx)).collect();
        values.sort_by(|a, b| a.partial_cmp(b).expect("feature values are not NaN"));
        values.dedup();

        for pair in values.windows(2) {
            let threshold = (pair[0] + pair[1]) / 2.0;

            let mut y_left = Vec::new();
            let mut y_right = Vec::new();
            for (row, &y_val) in y.iter().enumerate() {
                if x.get(row, feature_idx) <= threshold {
                    y_left.push(y_val);
                } else {
                    y_right.push(y_val);
                }
            }
            if y_left.is_empty() || y_right.is_empty() {
                continue;
            }

            let gain = current_variance - split_mse(&y_left, &y_right);
            if gain > best_gain {
                best_gain = gain;
                best = Some((feature_idx, threshold));
            }
        }
    }

    best
}

fn make_leaf(y: &[f32]) -> RegressionTreeNode {
    RegressionTreeNode::Leaf(RegressionLeaf {
        value: mean_f32(y),
        n_samples: y.len(),
    })
}

fn at_max_depth(depth: usize, max_depth: Option<usize>) -> bool {
    max_depth.is_some_and(|max_d| depth >= max_d)
}

/// Builds a regression tree recursively.
fn build_regression_tree(
    x: &Matrix<f32>,
    y: &[f32],
    depth: usize,
    max_depth: Option<usize>,
    min_samples_split: usize,
    min_samples_leaf: usize,
) -> RegressionTreeNode {
    let n_samples = y.len();

    if n_samples < min_samples_split
        || at_max_depth(depth, max_depth)
        || variance_f32(y) < 1e-10
    {
        return make_leaf(y);
    }

    let Some((feature_idx, threshold)) = find_best_split(x, y) else {
        return make_leaf(y);
    };

    let mut left_indices = Vec::new();
    let mut right_indices = Vec::new();
    for row in 0..n_samples {
        if x.get(row, feature_idx) <= threshold {
            left_indices.push(row);
        } else {
            right_indices.push(row);
        }
    }

    if left_indices.len() < min_samples_leaf || right_indices.len() < min_samples_leaf {
        return make_leaf(y);
    }

    let left_y: Vec<f32> = left_indices.iter().map(|&i| y[i]).collect();
    let right_y: Vec<f32> = right_indices.iter().map(|&i| y[i]).collect();

    let left_child = build_regression_tree(
        &x.take_rows(&left_indices),
        &left_y,
        depth + 1,
        max_depth,
        min_samples_split,
        min_samples_leaf,
    );
    let right_child = build_regression_tree(
        &x.take_rows(&right_indices),
        &right_y,
        depth + 1,
        max_depth,
        min_samples_split,
        min_samples_leaf,
    );

    RegressionTreeNode::Node(RegressionNode {
        feature_idx,
        threshold,
        left: Box::new(left_child),
        right: Box::new(right_child),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step_data() -> (Matrix<f32>, Vec<f32>) {
        let x = Matrix::from_vec(6, 1, vec![1.0, 2.0, 3.0, 10.0, 11.0, 12.0]).expect("valid dims");
        let y = vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        (x, y)
    }

    #[test]
    fn test_fit_predict_step_function() {
        let (x, y) = step_data();
        let mut tree = DecisionTreeRegressor::new();
        tree.fit(&x, &y).expect("fit succeeds");

        let preds = tree.predict(&x);
        for (pred, target) in preds.iter().zip(y.iter()) {
            assert!((pred - target).abs() < 1e-6, "pred {pred} vs {target}");
        }
    }

    #[test]
    fn test_fit_dimension_mismatch() {
        let x = Matrix::from_vec(2, 1, vec![1.0, 2.0]).expect("valid dims");
        let mut tree = DecisionTreeRegressor::new();
        assert!(tree.fit(&x, &[1.0]).is_err());
    }

    #[test]
    fn test_fit_empty() {
        let x = Matrix::from_vec(0, 1, vec![]).expect("valid dims");
        let mut tree = DecisionTreeRegressor::new();
        assert!(tree.fit(&x, &[]).is_err());
    }

    #[test]
    fn test_max_depth_zero_yields_single_leaf() {
        let (x, y) = step_data();
        let mut tree = DecisionTreeRegressor::new().with_max_depth(0);
        tree.fit(&x, &y).expect("fit succeeds");

        let root = tree.root().expect("fitted");
        assert_eq!(root.depth(), 0);
        // Single leaf predicts the global mean.
        assert!((tree.predict_one(&[5.0]) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_min_samples_leaf_blocks_small_splits() {
        let (x, y) = step_data();
        let mut tree = DecisionTreeRegressor::new().with_min_samples_leaf(4);
        tree.fit(&x, &y).expect("fit succeeds");
        // 3/3 split violates the 4-sample leaf minimum, so the root stays a leaf.
        assert_eq!(tree.root().expect("fitted").depth(), 0);
    }

    #[test]
    fn test_constant_target_is_leaf() {
        let x = Matrix::from_vec(4, 1, vec![1.0, 2.0, 3.0, 4.0]).expect("valid dims");
        let y = vec![2.5; 4];
        let mut tree = DecisionTreeRegressor::new();
        tree.fit(&x, &y).expect("fit succeeds");
        assert_eq!(tree.root().expect("fitted").depth(), 0);
        assert!((tree.predict_one(&[9.0]) - 2.5).abs() < 1e-6);
    }

    #[test]
    fn test_builder_clamps() {
        let tree = DecisionTreeRegressor::new()
            .with_min_samples_split(0)
            .with_min_samples_leaf(0);
        // Clamped to the legal minima.
        assert_eq!(tree.min_samples_split, 2);
        assert_eq!(tree.min_samples_leaf, 1);
    }
}
