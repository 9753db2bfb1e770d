//! Train/validation splitting.
//!
//! Provides a seeded, stratified holdout split so every class keeps its
//! proportion in both partitions and retraining with the same seed is
//! reproducible.

use crate::error::{PreverError, Result};
use crate::primitives::Matrix;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::BTreeMap;

/// Splits samples into stratified train/test partitions.
///
/// Indices are grouped per class, shuffled (with `random_state` when
/// given), and a `test_size` fraction of each class goes to the test
/// partition. Classes with a single sample stay in the training partition.
///
/// # Arguments
///
/// * `x` - Feature matrix (`n_samples` × `n_features`)
/// * `y` - Class indices, one per row of `x`
/// * `test_size` - Fraction in (0, 1) held out per class
/// * `random_state` - Seed for reproducible shuffling
///
/// # Errors
///
/// Returns an error on empty data, mismatched lengths, or a `test_size`
/// outside (0, 1).
///
/// # Examples
///
/// ```
/// use prever::model_selection::stratified_train_test_split;
/// use prever::primitives::Matrix;
///
/// let x = Matrix::from_vec(8, 1, (0..8).map(|i| i as f32).collect()).expect("valid dims");
/// let y = vec![0, 0, 0, 0, 1, 1, 1, 1];
///
/// let (x_train, x_test, y_train, y_test) =
///     stratified_train_test_split(&x, &y, 0.25, Some(42)).expect("valid split");
/// assert_eq!(x_train.n_rows(), 6);
/// assert_eq!(x_test.n_rows(), 2);
/// assert_eq!(y_train.iter().filter(|&&c| c == 0).count(), 3);
/// assert_eq!(y_test.iter().filter(|&&c| c == 0).count(), 1);
/// ```
#[allow(clippy::type_complexity)]
pub fn stratified_train_test_split(
    x: &Matrix<f32>,
    y: &[usize],
    test_size: f32,
    random_state: Option<u64>,
) -> Result<(Matrix<f32>, Matrix<f32>, Vec<usize>, Vec<usize>)> {
    let n_samples = x.n_rows();
    if n_samples == 0 {
        return Err("Cannot split an empty dataset".into());
    }
    if n_samples != y.len() {
        return Err("x and y must have the same number of samples".into());
    }
    if !(0.0..=1.0).contains(&test_size) || test_size == 0.0 || test_size == 1.0 {
        return Err(PreverError::Other(format!(
            "test_size must be in (0, 1), got {test_size}"
        )));
    }

    // Group indices by class label.
    let mut class_indices: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (i, &label) in y.iter().enumerate() {
        class_indices.entry(label).or_default().push(i);
    }

    let mut train_indices = Vec::new();
    let mut test_indices = Vec::new();

    for indices in class_indices.values() {
        let mut indices = indices.clone();
        if let Some(seed) = random_state {
            let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
            indices.shuffle(&mut rng);
        } else {
            let mut rng = rand::thread_rng();
            indices.shuffle(&mut rng);
        }

        // At least one test sample per class once a class has two or more,
        // never all of them.
        let class_size = indices.len();
        let mut n_test = (class_size as f32 * test_size).round() as usize;
        if class_size >= 2 {
            n_test = n_test.clamp(1, class_size - 1);
        } else {
            n_test = 0;
        }

        test_indices.extend_from_slice(&indices[..n_test]);
        train_indices.extend_from_slice(&indices[n_test..]);
    }

    let y_train: Vec<usize> = train_indices.iter().map(|&i| y[i]).collect();
    let y_test: Vec<usize> = test_indices.iter().map(|&i| y[i]).collect();

    Ok((
        x.take_rows(&train_indices),
        x.take_rows(&test_indices),
        y_train,
        y_test,
    ))
}
