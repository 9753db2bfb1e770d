//! Read-only aggregation over the raw survey dataset.
//!
//! Backs analytical views: class distribution, categorical breakdowns,
//! cross tabulations, and per-group numeric means. The reader never mutates
//! its source and every query failure is per-query, so a dashboard can
//! degrade one panel without taking the rest down.

use crate::dataset::RawDataset;
use crate::error::{PreverError, Result};
use crate::primitives::Matrix;
use crate::schema::{severity_rank, FeatureSchema};
use std::collections::BTreeMap;
use std::path::Path;

/// A cross tabulation of two categorical columns.
///
/// `counts[i, j]` is the number of rows with row label `rows[i]` and
/// column label `cols[j]`.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossTab {
    /// Distinct labels of the first column, sorted.
    pub rows: Vec<String>,
    /// Distinct labels of the second column, sorted.
    pub cols: Vec<String>,
    /// Count matrix, `rows.len()` × `cols.len()`.
    pub counts: Matrix<usize>,
}

impl CrossTab {
    /// Looks up the count for a label pair, or None if either label is
    /// absent.
    #[must_use]
    pub fn get(&self, row: &str, col: &str) -> Option<usize> {
        let i = self.rows.iter().position(|r| r == row)?;
        let j = self.cols.iter().position(|c| c == col)?;
        Some(self.counts.get(i, j))
    }
}

/// Read-only view over the raw dataset for aggregation queries.
pub struct InsightsReader {
    data: RawDataset,
    schema: FeatureSchema,
    source: String,
}

impl InsightsReader {
    /// Opens the dataset CSV for querying.
    ///
    /// # Errors
    ///
    /// Returns `DataUnavailable` if the file cannot be read or parsed.
    /// The caller may retry later; nothing is cached across calls.
    pub fn from_csv<P: AsRef<Path>>(path: P, schema: FeatureSchema) -> Result<Self> {
        let source = path.as_ref().display().to_string();
        let data = RawDataset::from_csv(&path).map_err(|e| PreverError::DataUnavailable {
            path: source.clone(),
            message: e.to_string(),
        })?;
        Ok(Self {
            data,
            schema,
            source,
        })
    }

    /// Wraps an already loaded dataset.
    #[must_use]
    pub fn from_dataset(data: RawDataset, schema: FeatureSchema) -> Self {
        Self {
            data,
            schema,
            source: "<memory>".to_string(),
        }
    }

    /// Number of survey rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.data.n_rows()
    }

    /// Counts rows per target class, ordered by clinical severity, least
    /// to most severe. Only observed classes appear.
    ///
    /// # Errors
    ///
    /// `DataUnavailable` if the target column is absent.
    pub fn class_distribution(&self) -> Result<Vec<(String, usize)>> {
        let mut counts = self.count_by(self.schema.target())?;
        counts.sort_by_key(|(label, _)| {
            (
                severity_rank(label).unwrap_or(usize::MAX),
                label.to_string(),
            )
        });
        Ok(counts)
    }

    /// Counts rows per distinct value of a column, sorted by label.
    ///
    /// # Errors
    ///
    /// `DataUnavailable` if the column is absent.
    pub fn count_by(&self, column: &str) -> Result<Vec<(String, usize)>> {
        let values = self.column(column)?;
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for value in values {
            *counts.entry(value).or_insert(0) += 1;
        }
        Ok(counts
            .into_iter()
            .map(|(label, count)| (label.to_string(), count))
            .collect())
    }

    /// Cross-tabulates two categorical columns.
    ///
    /// # Errors
    ///
    /// `DataUnavailable` if either column is absent.
    pub fn cross_tab(&self, row_column: &str, col_column: &str) -> Result<CrossTab> {
        let row_values = self.column(row_column)?;
        let col_values = self.column(col_column)?;

        let rows = dedup_sorted(&row_values);
        let cols = dedup_sorted(&col_values);

        let mut data = vec![0usize; rows.len() * cols.len()];
        for (rv, cv) in row_values.iter().zip(col_values.iter()) {
            let i = rows.iter().position(|r| r == rv).unwrap_or_default();
            let j = cols.iter().position(|c| c == cv).unwrap_or_default();
            data[i * cols.len() + j] += 1;
        }

        let counts = Matrix::from_vec(rows.len(), cols.len(), data)
            .map_err(|e| PreverError::Other(e.to_string()))?;
        Ok(CrossTab { rows, cols, counts })
    }

    /// Mean of a numeric column per distinct value of a grouping column,
    /// sorted by group label.
    ///
    /// # Errors
    ///
    /// `DataUnavailable` if either column is absent, `InvalidInput` if a
    /// cell of the numeric column does not parse.
    pub fn mean_by(&self, numeric_column: &str, group_column: &str) -> Result<Vec<(String, f32)>> {
        let values = self.column(numeric_column)?;
        let groups = self.column(group_column)?;

        let mut sums: BTreeMap<&str, (f32, usize)> = BTreeMap::new();
        for (raw, group) in values.iter().zip(groups.iter()) {
            let v: f32 = raw
                .trim()
                .parse()
                .map_err(|_| PreverError::InvalidInput {
                    message: format!(
                        "column '{numeric_column}' expects numbers, got '{raw}'"
                    ),
                })?;
            let entry = sums.entry(group).or_insert((0.0, 0));
            entry.0 += v;
            entry.1 += 1;
        }

        Ok(sums
            .into_iter()
            .map(|(group, (sum, count))| (group.to_string(), sum / count as f32))
            .collect())
    }

    fn column(&self, name: &str) -> Result<Vec<&str>> {
        self.data
            .column(name)
            .map_err(|e| PreverError::DataUnavailable {
                path: self.source.clone(),
                message: e.to_string(),
            })
    }
}

fn dedup_sorted(values: &[&str]) -> Vec<String> {
    let mut distinct: Vec<String> = values.iter().map(|v| (*v).to_string()).collect();
    distinct.sort();
    distinct.dedup();
    distinct
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader() -> InsightsReader {
        let csv = "Gender,Age,Height,Weight,family_history,FAVC,FCVC,NCP,CAEC,SMOKE,CH2O,SCC,FAF,TUE,CALC,MTRANS,Obesity\n\
                   Female,21,1.62,64,yes,no,2,3,Sometimes,no,2,no,0,1,no,Public_Transportation,Normal_Weight\n\
                   Male,23,1.80,87,no,yes,3,3,Frequently,no,2,no,1,0,Sometimes,Automobile,Overweight_Level_I\n\
                   Female,26,1.58,52,no,no,3,3,Sometimes,no,2,no,2,1,no,Walking,Insufficient_Weight\n\
                   Male,30,1.75,110,yes,yes,2,3,Sometimes,no,2,no,0,2,no,Automobile,Obesity_Type_II\n\
                   Female,24,1.65,68,yes,no,2,3,Sometimes,no,2,no,1,1,no,Walking,Normal_Weight\n";
        let data = RawDataset::from_csv_str(csv).expect("valid CSV");
        InsightsReader::from_dataset(data, FeatureSchema::obesity())
    }

    #[test]
    fn test_from_csv_missing_file() {
        let err = InsightsReader::from_csv("/nonexistent/data.csv", FeatureSchema::obesity())
            .map(|_| ())
            .unwrap_err();
        assert!(matches!(err, PreverError::DataUnavailable { .. }));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_class_distribution_clinical_order() {
        let dist = reader().class_distribution().expect("target present");
        let labels: Vec<&str> = dist.iter().map(|(l, _)| l.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "Insufficient_Weight",
                "Normal_Weight",
                "Overweight_Level_I",
                "Obesity_Type_II"
            ]
        );
        assert_eq!(dist[1].1, 2);
    }

    #[test]
    fn test_count_by_sorted_labels() {
        let counts = reader().count_by("MTRANS").expect("column present");
        assert_eq!(
            counts,
            vec![
                ("Automobile".to_string(), 2),
                ("Public_Transportation".to_string(), 1),
                ("Walking".to_string(), 2),
            ]
        );
    }

    #[test]
    fn test_count_by_missing_column() {
        let err = reader().count_by("Mood").unwrap_err();
        assert!(matches!(err, PreverError::DataUnavailable { .. }));
    }

    #[test]
    fn test_cross_tab_counts_and_total() {
        let tab = reader()
            .cross_tab("family_history", "Gender")
            .expect("columns present");
        assert_eq!(tab.rows, vec!["no".to_string(), "yes".to_string()]);
        assert_eq!(tab.cols, vec!["Female".to_string(), "Male".to_string()]);
        assert_eq!(tab.get("yes", "Female"), Some(2));
        assert_eq!(tab.get("no", "Male"), Some(1));
        assert_eq!(tab.get("yes", "Other"), None);

        // Cell counts partition the dataset.
        let total: usize = tab.counts.as_slice().iter().sum();
        assert_eq!(total, reader().n_rows());
    }

    #[test]
    fn test_mean_by_groups() {
        let means = reader().mean_by("Age", "Gender").expect("columns present");
        let female = means
            .iter()
            .find(|(g, _)| g == "Female")
            .map(|(_, m)| *m)
            .expect("group exists");
        assert!((female - (21.0 + 26.0 + 24.0) / 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_mean_by_non_numeric_column() {
        let err = reader().mean_by("Gender", "MTRANS").unwrap_err();
        assert!(matches!(err, PreverError::InvalidInput { .. }));
    }
}
