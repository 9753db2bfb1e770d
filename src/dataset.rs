//! Raw tabular dataset container and CSV loading.
//!
//! The raw dataset keeps every cell as text; typing happens later, when the
//! encoder set turns rows into numeric vectors against the schema. Survey
//! values never contain commas or quoting, so the header CSV is parsed
//! directly.

use crate::error::{PreverError, Result};
use crate::schema::FeatureSchema;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

/// Column renames applied on load, mirroring the canonical names the rest
/// of the pipeline uses. Public datasets ship with the long-form headers.
const RENAMES: [(&str, &str); 2] = [
    ("family_history_with_overweight", "family_history"),
    ("Obesity_level", "Obesity"),
];

/// An immutable table of string cells with named columns.
///
/// # Examples
///
/// ```
/// use prever::dataset::RawDataset;
///
/// let data = RawDataset::new(
///     vec!["Gender".to_string(), "Age".to_string()],
///     vec![
///         vec!["Female".to_string(), "21".to_string()],
///         vec!["Male".to_string(), "34".to_string()],
///     ],
/// )
/// .expect("columns and rows agree");
/// assert_eq!(data.n_rows(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct RawDataset {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RawDataset {
    /// Creates a dataset from column names and rows.
    ///
    /// # Errors
    ///
    /// Returns an error if there are no columns, names are duplicated, or
    /// any row width disagrees with the header.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self> {
        if columns.is_empty() {
            return Err("Dataset must have at least one column".into());
        }

        let unique: BTreeSet<&str> = columns.iter().map(String::as_str).collect();
        if unique.len() != columns.len() {
            return Err("Duplicate column names not allowed".into());
        }

        for (i, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(PreverError::Other(format!(
                    "row {i} has {} cells, header has {} columns",
                    row.len(),
                    columns.len()
                )));
            }
        }

        Ok(Self { columns, rows })
    }

    /// Loads a dataset from a header CSV file, applying the canonical
    /// column renames.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read, or a parse error
    /// if a row width disagrees with the header.
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_csv_str(&text)
    }

    /// Parses a dataset from CSV text. The first line is the header.
    ///
    /// # Errors
    ///
    /// Returns an error on an empty input or ragged rows.
    pub fn from_csv_str(text: &str) -> Result<Self> {
        let mut lines = text.lines().filter(|l| !l.trim().is_empty());

        let header = lines.next().ok_or("CSV input is empty")?;
        let columns: Vec<String> = header
            .trim_start_matches('\u{feff}')
            .split(',')
            .map(|name| {
                let name = name.trim();
                RENAMES
                    .iter()
                    .find(|(from, _)| *from == name)
                    .map_or(name, |(_, to)| *to)
                    .to_string()
            })
            .collect();

        let rows: Vec<Vec<String>> = lines
            .map(|line| line.split(',').map(|cell| cell.trim().to_string()).collect())
            .collect();

        Self::new(columns, rows)
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// Returns the number of columns.
    #[must_use]
    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    /// Returns the column names in order.
    #[must_use]
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(String::as_str).collect()
    }

    /// Returns the index of a column, if present.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Returns all values of a column.
    ///
    /// # Errors
    ///
    /// Returns `SchemaMismatch` if the column doesn't exist.
    pub fn column(&self, name: &str) -> Result<Vec<&str>> {
        let idx = self
            .column_index(name)
            .ok_or_else(|| PreverError::missing_column(name))?;
        Ok(self.rows.iter().map(|row| row[idx].as_str()).collect())
    }

    /// Returns one row as (column, value) pairs.
    ///
    /// # Panics
    ///
    /// Panics if the row index is out of bounds.
    #[must_use]
    pub fn row(&self, idx: usize) -> Vec<(&str, &str)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.rows[idx].iter().map(String::as_str))
            .collect()
    }

    /// Returns the cell at (row, column index).
    ///
    /// # Panics
    ///
    /// Panics if either index is out of bounds.
    #[must_use]
    pub fn value(&self, row: usize, col: usize) -> &str {
        &self.rows[row][col]
    }

    /// Checks that the dataset columns are exactly the schema features plus
    /// the target, in any order.
    ///
    /// # Errors
    ///
    /// Returns `SchemaMismatch` naming the missing or unexpected columns.
    pub fn validate_columns(&self, schema: &FeatureSchema) -> Result<()> {
        let mut expected: BTreeSet<&str> = schema.feature_names().into_iter().collect();
        expected.insert(schema.target());

        let present: BTreeSet<&str> = self.columns.iter().map(String::as_str).collect();

        let missing: Vec<&str> = expected.difference(&present).copied().collect();
        let extra: Vec<&str> = present.difference(&expected).copied().collect();

        if !missing.is_empty() || !extra.is_empty() {
            return Err(PreverError::SchemaMismatch {
                expected: format!("columns {:?}", expected.iter().collect::<Vec<_>>()),
                actual: format!("missing {missing:?}, unexpected {extra:?}"),
            });
        }
        Ok(())
    }
}
