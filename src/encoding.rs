//! Deterministic categorical encoding.
//!
//! Each binary/ordinal/nominal feature gets a [`CategoryEncoder`], a
//! bijection between string labels and integer codes fit once from training
//! data. Codes follow lexicographic label order: the original tooling
//! assigned ordinal codes in order of first appearance, which silently
//! changes across dataset shuffles, so the sorted rule is the reproducible
//! one and is what this module guarantees.
//!
//! Encoders are immutable after fitting. Encoding a label that was never
//! seen during fitting is always an [`UnknownCategory`] error, never a
//! default code.
//!
//! [`UnknownCategory`]: crate::error::PreverError::UnknownCategory

use crate::dataset::RawDataset;
use crate::error::{PreverError, Result};
use crate::primitives::Matrix;
use crate::schema::{FeatureDef, FeatureKind, FeatureSchema, DERIVED_BMI};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Label ↔ code bijection for one categorical feature.
///
/// Codes are the indices of the lexicographically sorted distinct labels
/// observed at fit time, so refitting on the same data (in any row order)
/// yields identical codes.
///
/// # Examples
///
/// ```
/// use prever::encoding::CategoryEncoder;
///
/// let enc = CategoryEncoder::fit(["Sometimes", "no", "Always", "no"].into_iter());
/// assert_eq!(enc.encode("Always"), Some(0));
/// assert_eq!(enc.encode("Sometimes"), Some(1));
/// assert_eq!(enc.encode("no"), Some(2));
/// assert_eq!(enc.decode(2), Some("no"));
/// assert_eq!(enc.encode("Daily"), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryEncoder {
    labels: Vec<String>,
}

impl CategoryEncoder {
    /// Fits an encoder on the distinct labels of an iterator.
    #[must_use]
    pub fn fit<'a, I: Iterator<Item = &'a str>>(values: I) -> Self {
        let distinct: BTreeSet<&str> = values.collect();
        Self {
            labels: distinct.into_iter().map(str::to_string).collect(),
        }
    }

    /// Returns the code for a label, or None if unseen.
    #[must_use]
    pub fn encode(&self, label: &str) -> Option<usize> {
        self.labels.binary_search_by(|l| l.as_str().cmp(label)).ok()
    }

    /// Returns the label for a code, or None if out of range.
    #[must_use]
    pub fn decode(&self, code: usize) -> Option<&str> {
        self.labels.get(code).map(String::as_str)
    }

    /// Returns the sorted labels; the index of a label is its code.
    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Number of distinct labels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// True if the encoder saw no labels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Observed [min, max] of a numeric feature in the training data.
///
/// Used at inference for an advisory only: values outside the range are
/// flagged, never rejected.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NumericRange {
    /// Smallest training value.
    pub min: f32,
    /// Largest training value.
    pub max: f32,
}

impl NumericRange {
    /// True if a value falls inside the observed training range.
    #[must_use]
    pub fn contains(&self, value: f32) -> bool {
        value >= self.min && value <= self.max
    }
}

/// The full set of fitted encoders: one per categorical feature, the target
/// encoder, and the numeric training ranges.
///
/// Created once during training, persisted alongside the model, and loaded
/// read-only at inference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncoderSet {
    feature_encoders: BTreeMap<String, CategoryEncoder>,
    target: CategoryEncoder,
    numeric_ranges: BTreeMap<String, NumericRange>,
}

impl EncoderSet {
    /// Fits encoders for every categorical feature and the target on the
    /// full dataset, and records numeric training ranges.
    ///
    /// Fitting happens before any train/validation split so both partitions
    /// share the same codes.
    ///
    /// # Errors
    ///
    /// Returns `SchemaMismatch` if a schema column is absent from the
    /// dataset, or `InvalidInput` if a numeric cell does not parse.
    pub fn fit(data: &RawDataset, schema: &FeatureSchema) -> Result<Self> {
        let mut feature_encoders = BTreeMap::new();
        for feature in schema.categorical_features() {
            let values = data.column(&feature.name)?;
            feature_encoders.insert(
                feature.name.clone(),
                CategoryEncoder::fit(values.into_iter()),
            );
        }

        let mut numeric_ranges = BTreeMap::new();
        for feature in schema.numeric_features() {
            let values = data.column(&feature.name)?;
            let mut min = f32::INFINITY;
            let mut max = f32::NEG_INFINITY;
            for raw in values {
                let v = parse_numeric(&feature.name, raw)?;
                min = min.min(v);
                max = max.max(v);
            }
            if min.is_finite() {
                numeric_ranges.insert(feature.name.clone(), NumericRange { min, max });
            }
        }

        let target = CategoryEncoder::fit(data.column(schema.target())?.into_iter());

        Ok(Self {
            feature_encoders,
            target,
            numeric_ranges,
        })
    }

    /// Encodes one raw value for a feature.
    ///
    /// Numeric features parse straight through; categorical features go
    /// through their fitted encoder.
    ///
    /// # Errors
    ///
    /// `UnknownCategory` for an out-of-vocabulary label, `InvalidInput` for
    /// an unparsable numeric value, `SchemaMismatch` if no encoder was
    /// fitted for a categorical feature.
    pub fn encode_value(&self, feature: &FeatureDef, raw: &str) -> Result<f32> {
        match feature.kind {
            FeatureKind::Numeric => parse_numeric(&feature.name, raw),
            FeatureKind::Binary | FeatureKind::Ordinal | FeatureKind::Nominal => {
                let encoder = self.feature_encoders.get(&feature.name).ok_or_else(|| {
                    PreverError::SchemaMismatch {
                        expected: format!("fitted encoder for '{}'", feature.name),
                        actual: "no encoder in set".to_string(),
                    }
                })?;
                encoder
                    .encode(raw)
                    .map(|code| code as f32)
                    .ok_or_else(|| PreverError::UnknownCategory {
                        feature: feature.name.clone(),
                        value: raw.to_string(),
                    })
            }
        }
    }

    /// Encodes the whole dataset into a feature matrix and target labels.
    ///
    /// The matrix columns are the schema features in order, plus the
    /// derived BMI column when the schema carries Weight and Height.
    ///
    /// # Errors
    ///
    /// Propagates any per-value encoding error; training aborts on the
    /// first bad cell.
    pub fn encode_dataset(
        &self,
        data: &RawDataset,
        schema: &FeatureSchema,
    ) -> Result<(Matrix<f32>, Vec<usize>)> {
        let n_rows = data.n_rows();
        let width = encoded_width(schema);
        let target_idx = data
            .column_index(schema.target())
            .ok_or_else(|| PreverError::missing_column(schema.target()))?;

        let mut cells = Vec::with_capacity(n_rows * width);
        let mut labels = Vec::with_capacity(n_rows);

        for row in 0..n_rows {
            let mut encoded = Vec::with_capacity(width);
            for feature in schema.features() {
                let col = data
                    .column_index(&feature.name)
                    .ok_or_else(|| PreverError::missing_column(&feature.name))?;
                encoded.push(self.encode_value(feature, data.value(row, col))?);
            }
            if let Some(bmi) = derived_bmi(schema, &encoded) {
                encoded.push(bmi);
            }
            cells.extend_from_slice(&encoded);

            labels.push(self.encode_class(data.value(row, target_idx))?);
        }

        let matrix = Matrix::from_vec(n_rows, width, cells)
            .map_err(|e| PreverError::Other(e.to_string()))?;
        Ok((matrix, labels))
    }

    /// Encodes a target class label to its native index.
    ///
    /// # Errors
    ///
    /// `UnknownCategory` if the label was never seen during fitting.
    pub fn encode_class(&self, label: &str) -> Result<usize> {
        self.target
            .encode(label)
            .ok_or_else(|| PreverError::UnknownCategory {
                feature: "target".to_string(),
                value: label.to_string(),
            })
    }

    /// Decodes a native class index back to its label.
    ///
    /// # Errors
    ///
    /// `InvalidInput` if the index is out of range.
    pub fn decode_class(&self, index: usize) -> Result<&str> {
        self.target
            .decode(index)
            .ok_or_else(|| PreverError::InvalidInput {
                message: format!(
                    "class index {index} out of range (0..{})",
                    self.target.len()
                ),
            })
    }

    /// Number of target classes observed during fitting.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.target.len()
    }

    /// Target labels in native (code) order.
    #[must_use]
    pub fn class_labels(&self) -> &[String] {
        self.target.labels()
    }

    /// Returns the encoder for a categorical feature, if fitted.
    #[must_use]
    pub fn feature_encoder(&self, name: &str) -> Option<&CategoryEncoder> {
        self.feature_encoders.get(name)
    }

    /// Returns the observed training range of a numeric feature.
    #[must_use]
    pub fn numeric_range(&self, name: &str) -> Option<NumericRange> {
        self.numeric_ranges.get(name).copied()
    }
}

/// Width of an encoded feature vector for the given schema.
#[must_use]
pub fn encoded_width(schema: &FeatureSchema) -> usize {
    schema.features().len() + usize::from(bmi_inputs(schema).is_some())
}

/// Column names of the encoded feature vector, in order.
#[must_use]
pub fn encoded_feature_names(schema: &FeatureSchema) -> Vec<String> {
    let mut names: Vec<String> = schema
        .features()
        .iter()
        .map(|f| f.name.clone())
        .collect();
    if bmi_inputs(schema).is_some() {
        names.push(DERIVED_BMI.to_string());
    }
    names
}

/// Computes the derived BMI column (Weight / Height²) from an encoded row,
/// when the schema carries both inputs.
pub(crate) fn derived_bmi(schema: &FeatureSchema, encoded: &[f32]) -> Option<f32> {
    let (w_idx, h_idx) = bmi_inputs(schema)?;
    let height = encoded[h_idx];
    if height == 0.0 {
        return Some(0.0);
    }
    Some(encoded[w_idx] / (height * height))
}

fn bmi_inputs(schema: &FeatureSchema) -> Option<(usize, usize)> {
    let names = schema.feature_names();
    let w = names.iter().position(|&n| n == "Weight")?;
    let h = names.iter().position(|&n| n == "Height")?;
    Some((w, h))
}

fn parse_numeric(feature: &str, raw: &str) -> Result<f32> {
    raw.trim()
        .parse::<f32>()
        .map_err(|_| PreverError::InvalidInput {
            message: format!("feature '{feature}' expects a number, got '{raw}'"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FeatureSchema;

    fn tiny_csv() -> &'static str {
        "Gender,Age,Height,Weight,family_history,FAVC,FCVC,NCP,CAEC,SMOKE,CH2O,SCC,FAF,TUE,CALC,MTRANS,Obesity\n\
         Female,21,1.62,64,yes,no,2,3,Sometimes,no,2,no,0,1,no,Public_Transportation,Normal_Weight\n\
         Male,23,1.80,87,no,yes,3,3,Frequently,no,2,no,1,0,Sometimes,Automobile,Overweight_Level_I\n\
         Female,26,1.58,52,no,no,3,3,Sometimes,no,2,no,2,1,no,Walking,Insufficient_Weight\n"
    }

    fn fitted() -> (RawDataset, FeatureSchema, EncoderSet) {
        let data = RawDataset::from_csv_str(tiny_csv()).expect("valid CSV");
        let schema = FeatureSchema::obesity();
        let encoders = EncoderSet::fit(&data, &schema).expect("fit succeeds");
        (data, schema, encoders)
    }

    #[test]
    fn test_encoder_sorted_codes() {
        let enc = CategoryEncoder::fit(["yes", "no", "yes"].into_iter());
        assert_eq!(enc.encode("no"), Some(0));
        assert_eq!(enc.encode("yes"), Some(1));
        assert_eq!(enc.len(), 2);
    }

    #[test]
    fn test_encoder_roundtrip() {
        let enc = CategoryEncoder::fit(["Walking", "Bike", "Automobile"].into_iter());
        for label in enc.labels().to_vec() {
            let code = enc.encode(&label).expect("fitted label encodes");
            assert_eq!(enc.decode(code), Some(label.as_str()));
        }
    }

    #[test]
    fn test_encoder_unseen_label() {
        let enc = CategoryEncoder::fit(["no", "yes"].into_iter());
        assert_eq!(enc.encode("maybe"), None);
        assert_eq!(enc.decode(2), None);
    }

    #[test]
    fn test_fit_missing_categorical_column() {
        let data = RawDataset::from_csv_str("Gender,Age\nFemale,21\n").expect("valid CSV");
        let schema = FeatureSchema::obesity();
        let err = EncoderSet::fit(&data, &schema).unwrap_err();
        assert!(matches!(
            err,
            crate::error::PreverError::SchemaMismatch { .. }
        ));
    }

    #[test]
    fn test_encode_value_unknown_category() {
        let (_, schema, encoders) = fitted();
        let gender = schema.feature("Gender").expect("defined");
        let err = encoders.encode_value(gender, "Other").unwrap_err();
        assert!(matches!(
            err,
            crate::error::PreverError::UnknownCategory { .. }
        ));
    }

    #[test]
    fn test_encode_value_bad_number() {
        let (_, schema, encoders) = fitted();
        let age = schema.feature("Age").expect("defined");
        let err = encoders.encode_value(age, "twenty").unwrap_err();
        assert!(matches!(err, crate::error::PreverError::InvalidInput { .. }));
    }

    #[test]
    fn test_encode_dataset_shape_and_bmi() {
        let (data, schema, encoders) = fitted();
        let (x, y) = encoders.encode_dataset(&data, &schema).expect("encodes");
        // 16 schema features + derived BMI
        assert_eq!(x.shape(), (3, 17));
        assert_eq!(y.len(), 3);

        // Row 0: 64 kg at 1.62 m
        let bmi = x.get(0, 16);
        assert!((bmi - 64.0 / (1.62 * 1.62)).abs() < 1e-4);
    }

    #[test]
    fn test_encode_dataset_deterministic() {
        let (data, schema, encoders) = fitted();
        let (x1, y1) = encoders.encode_dataset(&data, &schema).expect("encodes");
        let (x2, y2) = encoders.encode_dataset(&data, &schema).expect("encodes");
        assert_eq!(x1.as_slice(), x2.as_slice());
        assert_eq!(y1, y2);
    }

    #[test]
    fn test_target_roundtrip() {
        let (_, _, encoders) = fitted();
        for label in encoders.class_labels().to_vec() {
            let code = encoders.encode_class(&label).expect("seen label");
            assert_eq!(encoders.decode_class(code).expect("valid code"), label);
        }
        assert_eq!(encoders.n_classes(), 3);
    }

    #[test]
    fn test_decode_class_out_of_range() {
        let (_, _, encoders) = fitted();
        assert!(encoders.decode_class(99).is_err());
    }

    #[test]
    fn test_numeric_ranges_recorded() {
        let (_, _, encoders) = fitted();
        let age = encoders.numeric_range("Age").expect("Age is numeric");
        assert_eq!(age.min, 21.0);
        assert_eq!(age.max, 26.0);
        assert!(age.contains(23.0));
        assert!(!age.contains(60.0));
    }

    #[test]
    fn test_encoded_feature_names_include_bmi() {
        let schema = FeatureSchema::obesity();
        let names = encoded_feature_names(&schema);
        assert_eq!(names.len(), 17);
        assert_eq!(names.last().map(String::as_str), Some(DERIVED_BMI));
    }
}
