//! Classification metrics for evaluating the trained model.
//!
//! Provides accuracy, precision, recall, F1-score, and confusion matrix
//! computation for the seven-class task.

use crate::primitives::Matrix;

/// Averaging strategy for multi-class metrics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Average {
    /// Calculate metrics for each label, return unweighted mean.
    Macro,
    /// Calculate metrics globally by counting total TP, FP, FN.
    Micro,
    /// Weighted mean by support (number of true instances per label).
    Weighted,
}

/// Compute classification accuracy.
///
/// # Panics
///
/// Panics if vectors have different lengths or are empty.
///
/// # Examples
///
/// ```
/// use prever::metrics::accuracy;
///
/// let y_true = vec![0, 1, 2, 0];
/// let y_pred = vec![0, 1, 1, 0];
/// assert!((accuracy(&y_pred, &y_true) - 0.75).abs() < 1e-6);
/// ```
#[must_use]
pub fn accuracy(y_pred: &[usize], y_true: &[usize]) -> f32 {
    assert_eq!(y_pred.len(), y_true.len(), "Vectors must have same length");
    assert!(!y_true.is_empty(), "Vectors cannot be empty");

    let correct = y_pred
        .iter()
        .zip(y_true.iter())
        .filter(|(p, t)| p == t)
        .count();

    correct as f32 / y_true.len() as f32
}

/// Compute precision score (TP / (TP + FP)) under an averaging strategy.
///
/// # Panics
///
/// Panics if vectors have different lengths or are empty.
#[must_use]
pub fn precision(y_pred: &[usize], y_true: &[usize], average: Average) -> f32 {
    let counts = ClassCounts::from_labels(y_pred, y_true);
    counts.aggregate(average, |c, i| class_precision(c.tp[i], c.fp[i]))
}

/// Compute recall score (TP / (TP + FN)) under an averaging strategy.
///
/// # Panics
///
/// Panics if vectors have different lengths or are empty.
#[must_use]
pub fn recall(y_pred: &[usize], y_true: &[usize], average: Average) -> f32 {
    let counts = ClassCounts::from_labels(y_pred, y_true);
    counts.aggregate(average, |c, i| class_recall(c.tp[i], c.fn_counts[i]))
}

/// Compute F1 score (harmonic mean of precision and recall).
///
/// # Panics
///
/// Panics if vectors have different lengths or are empty.
///
/// # Examples
///
/// ```
/// use prever::metrics::{f1_score, Average};
///
/// let y_true = vec![0, 1, 2, 0, 1, 2];
/// let y_pred = vec![0, 2, 1, 0, 0, 1];
/// let f1 = f1_score(&y_pred, &y_true, Average::Macro);
/// assert!((0.0..=1.0).contains(&f1));
/// ```
#[must_use]
pub fn f1_score(y_pred: &[usize], y_true: &[usize], average: Average) -> f32 {
    let counts = ClassCounts::from_labels(y_pred, y_true);
    counts.aggregate(average, |c, i| {
        class_f1(c.tp[i], c.fp[i], c.fn_counts[i])
    })
}

/// Compute the confusion matrix.
///
/// Element `[i, j]` is the count of samples with true label i and
/// predicted label j.
///
/// # Panics
///
/// Panics if vectors have different lengths or are empty.
#[must_use]
pub fn confusion_matrix(y_pred: &[usize], y_true: &[usize]) -> Matrix<usize> {
    assert_eq!(y_pred.len(), y_true.len(), "Vectors must have same length");
    assert!(!y_true.is_empty(), "Vectors cannot be empty");

    let n_classes = n_classes_of(y_pred, y_true);
    let mut data = vec![0usize; n_classes * n_classes];
    for (&true_label, &pred_label) in y_true.iter().zip(y_pred.iter()) {
        data[true_label * n_classes + pred_label] += 1;
    }

    Matrix::from_vec(n_classes, n_classes, data)
        .expect("confusion matrix dimensions match data length")
}

/// Per-class precision/recall/F1 alongside support, the per-class half of
/// a classification report.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassReport {
    /// Native class index.
    pub class: usize,
    /// Precision for this class.
    pub precision: f32,
    /// Recall for this class.
    pub recall: f32,
    /// F1 for this class.
    pub f1: f32,
    /// Number of true instances.
    pub support: usize,
}

/// Per-class report rows, indexed by native class.
///
/// # Panics
///
/// Panics if vectors have different lengths or are empty.
#[must_use]
pub fn classification_report(y_pred: &[usize], y_true: &[usize]) -> Vec<ClassReport> {
    let counts = ClassCounts::from_labels(y_pred, y_true);
    (0..counts.n_classes)
        .map(|i| ClassReport {
            class: i,
            precision: class_precision(counts.tp[i], counts.fp[i]),
            recall: class_recall(counts.tp[i], counts.fn_counts[i]),
            f1: class_f1(counts.tp[i], counts.fp[i], counts.fn_counts[i]),
            support: counts.support[i],
        })
        .collect()
}

fn n_classes_of(y_pred: &[usize], y_true: &[usize]) -> usize {
    y_true
        .iter()
        .chain(y_pred.iter())
        .max()
        .map_or(0, |&m| m + 1)
}

/// TP/FP/FN/support tallies per class.
struct ClassCounts {
    n_classes: usize,
    tp: Vec<usize>,
    fp: Vec<usize>,
    fn_counts: Vec<usize>,
    support: Vec<usize>,
}

impl ClassCounts {
    fn from_labels(y_pred: &[usize], y_true: &[usize]) -> Self {
        assert_eq!(y_pred.len(), y_true.len(), "Vectors must have same length");
        assert!(!y_true.is_empty(), "Vectors cannot be empty");

        let n_classes = n_classes_of(y_pred, y_true);
        let mut tp = vec![0usize; n_classes];
        let mut fp = vec![0usize; n_classes];
        let mut fn_counts = vec![0usize; n_classes];
        let mut support = vec![0usize; n_classes];

        for (&true_label, &pred_label) in y_true.iter().zip(y_pred.iter()) {
            support[true_label] += 1;
            if true_label == pred_label {
                tp[true_label] += 1;
            } else {
                fp[pred_label] += 1;
                fn_counts[true_label] += 1;
            }
        }

        Self {
            n_classes,
            tp,
            fp,
            fn_counts,
            support,
        }
    }

    fn aggregate<F: Fn(&Self, usize) -> f32>(&self, average: Average, per_class: F) -> f32 {
        if self.n_classes == 0 {
            return 0.0;
        }
        match average {
            Average::Micro => {
                let total_tp: usize = self.tp.iter().sum();
                let total_fp: usize = self.fp.iter().sum();
                let total_fn: usize = self.fn_counts.iter().sum();
                // Micro precision, recall, and F1 coincide on these totals.
                class_f1(total_tp, total_fp, total_fn)
            }
            Average::Macro => {
                let sum: f32 = (0..self.n_classes).map(|i| per_class(self, i)).sum();
                sum / self.n_classes as f32
            }
            Average::Weighted => {
                let total_support: usize = self.support.iter().sum();
                if total_support == 0 {
                    return 0.0;
                }
                (0..self.n_classes)
                    .map(|i| per_class(self, i) * self.support[i] as f32 / total_support as f32)
                    .sum()
            }
        }
    }
}

fn class_precision(tp: usize, fp: usize) -> f32 {
    if tp + fp == 0 {
        0.0
    } else {
        tp as f32 / (tp + fp) as f32
    }
}

fn class_recall(tp: usize, fn_count: usize) -> f32 {
    if tp + fn_count == 0 {
        0.0
    } else {
        tp as f32 / (tp + fn_count) as f32
    }
}

fn class_f1(tp: usize, fp: usize, fn_count: usize) -> f32 {
    let prec = class_precision(tp, fp);
    let rec = class_recall(tp, fn_count);
    if prec + rec == 0.0 {
        0.0
    } else {
        2.0 * prec * rec / (prec + rec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accuracy_perfect_and_zero() {
        assert!((accuracy(&[0, 1, 2], &[0, 1, 2]) - 1.0).abs() < 1e-6);
        assert!(accuracy(&[1, 2, 0], &[0, 1, 2]).abs() < 1e-6);
    }

    #[test]
    #[should_panic(expected = "same length")]
    fn test_accuracy_length_mismatch_panics() {
        let _ = accuracy(&[0], &[0, 1]);
    }

    #[test]
    fn test_precision_recall_macro() {
        let y_true = vec![0, 0, 1, 1];
        let y_pred = vec![0, 1, 1, 1];
        // Class 0: precision 1.0, recall 0.5; class 1: precision 2/3, recall 1.0.
        assert!((precision(&y_pred, &y_true, Average::Macro) - (1.0 + 2.0 / 3.0) / 2.0).abs() < 1e-6);
        assert!((recall(&y_pred, &y_true, Average::Macro) - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_micro_f1_equals_accuracy_multiclass() {
        let y_true = vec![0, 1, 2, 0, 1, 2];
        let y_pred = vec![0, 2, 1, 0, 0, 1];
        let micro = f1_score(&y_pred, &y_true, Average::Micro);
        assert!((micro - accuracy(&y_pred, &y_true)).abs() < 1e-6);
    }

    #[test]
    fn test_f1_bounds() {
        let y_true = vec![0, 1, 2, 0, 1, 2];
        let y_pred = vec![0, 2, 1, 0, 0, 1];
        for avg in [Average::Macro, Average::Micro, Average::Weighted] {
            let f1 = f1_score(&y_pred, &y_true, avg);
            assert!((0.0..=1.0).contains(&f1));
        }
    }

    #[test]
    fn test_confusion_matrix_counts() {
        let y_true = vec![0, 0, 1, 1, 2, 2];
        let y_pred = vec![0, 1, 1, 1, 2, 0];
        let cm = confusion_matrix(&y_pred, &y_true);
        assert_eq!(cm.shape(), (3, 3));
        assert_eq!(cm.get(0, 0), 1);
        assert_eq!(cm.get(0, 1), 1);
        assert_eq!(cm.get(1, 1), 2);
        assert_eq!(cm.get(2, 0), 1);
        assert_eq!(cm.get(2, 2), 1);
    }

    #[test]
    fn test_classification_report_support() {
        let y_true = vec![0, 0, 0, 1];
        let y_pred = vec![0, 0, 1, 1];
        let report = classification_report(&y_pred, &y_true);
        assert_eq!(report.len(), 2);
        assert_eq!(report[0].support, 3);
        assert_eq!(report[1].support, 1);
        assert!((report[0].precision - 1.0).abs() < 1e-6);
        assert!((report[0].recall - 2.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_absent_class_scores_zero() {
        // Class 2 appears only in predictions; its recall has no support.
        let y_true = vec![0, 1];
        let y_pred = vec![0, 2];
        let report = classification_report(&y_pred, &y_true);
        assert_eq!(report.len(), 3);
        assert_eq!(report[2].support, 0);
        assert!(report[2].recall.abs() < 1e-6);
    }
}
