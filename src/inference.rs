//! Single-record inference against a loaded artifact pair.
//!
//! An [`InferenceContext`] loads the model and encoders once, verifies they
//! belong together, and then serves any number of predictions. Bad input in
//! one record (a missing field, an unknown category, an unparsable number)
//! rejects only that record; the context stays usable.
//!
//! Probabilities come back ordered by clinical severity, least to most
//! severe, regardless of the native class indices the model was trained
//! against.

use crate::artifact;
use crate::encoding::{derived_bmi, encoded_width, EncoderSet};
use crate::error::{PreverError, Result};
use crate::primitives::Matrix;
use crate::schema::{severity_rank, FeatureSchema};
use crate::tree::GradientBoostingClassifier;
use std::collections::BTreeMap;
use std::path::Path;

/// One record to classify, keyed by raw feature name.
///
/// Values are raw strings exactly as they would appear in the survey CSV;
/// the context encodes them with the persisted encoders.
///
/// # Examples
///
/// ```
/// use prever::inference::PredictionRecord;
///
/// let record = PredictionRecord::new()
///     .with_field("Gender", "Female")
///     .with_number("Age", 21.0)
///     .with_number("Height", 1.62)
///     .with_number("Weight", 64.0);
/// assert_eq!(record.get("Gender"), Some("Female"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PredictionRecord {
    values: BTreeMap<String, String>,
}

impl PredictionRecord {
    /// Creates an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a raw string field.
    #[must_use]
    pub fn with_field(mut self, name: &str, value: &str) -> Self {
        self.values.insert(name.to_string(), value.to_string());
        self
    }

    /// Sets a numeric field.
    #[must_use]
    pub fn with_number(mut self, name: &str, value: f32) -> Self {
        self.values.insert(name.to_string(), value.to_string());
        self
    }

    /// Returns a field's raw value, if set.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }
}

/// One class probability, labeled.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassProbability {
    /// Decoded class label.
    pub label: String,
    /// Probability mass assigned to this class.
    pub probability: f32,
}

/// Outcome of classifying one record.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionResult {
    /// Predicted class label. Probability ties resolve toward the less
    /// severe class.
    pub label: String,
    /// All class probabilities in clinical severity order, least to most
    /// severe. They sum to 1.
    pub probabilities: Vec<ClassProbability>,
    /// Body mass index derived from the record's Weight and Height, when
    /// both are present in the schema.
    pub bmi: Option<f32>,
    /// Names of numeric features whose value fell outside the training
    /// range. Advisory only; the prediction is still served.
    pub out_of_range: Vec<String>,
}

/// A loaded, verified model/encoder pair ready to serve predictions.
#[derive(Debug)]
pub struct InferenceContext {
    model: GradientBoostingClassifier,
    encoders: EncoderSet,
    schema: FeatureSchema,
    /// Native class index of each clinically ordered position.
    class_order: Vec<usize>,
}

impl InferenceContext {
    /// Loads the artifact pair from a directory and verifies it against
    /// the schema.
    ///
    /// # Errors
    ///
    /// Returns `ArtifactMismatch` if the pair is incomplete, from
    /// different runs, or does not cover the schema's features.
    pub fn load<P: AsRef<Path>>(artifact_dir: P, schema: FeatureSchema) -> Result<Self> {
        let (model_artifact, encoder_artifact) = artifact::load_pair(artifact_dir)?;
        let encoders = encoder_artifact.encoders;

        let expected_width = encoded_width(&schema);
        if model_artifact.feature_names.len() != expected_width {
            return Err(PreverError::ArtifactMismatch {
                message: format!(
                    "model was trained on {} features, schema encodes {expected_width}",
                    model_artifact.feature_names.len()
                ),
            });
        }
        for feature in schema.categorical_features() {
            if encoders.feature_encoder(&feature.name).is_none() {
                return Err(PreverError::ArtifactMismatch {
                    message: format!("no encoder persisted for feature '{}'", feature.name),
                });
            }
        }

        let class_order = clinical_class_order(&encoders);

        Ok(Self {
            model: model_artifact.model,
            encoders,
            schema,
            class_order,
        })
    }

    /// Builds a context from in-memory parts, skipping disk entirely.
    ///
    /// Useful right after training, before or instead of persistence.
    #[must_use]
    pub fn from_parts(
        model: GradientBoostingClassifier,
        encoders: EncoderSet,
        schema: FeatureSchema,
    ) -> Self {
        let class_order = clinical_class_order(&encoders);
        Self {
            model,
            encoders,
            schema,
            class_order,
        }
    }

    /// Classifies one record.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for a missing field or unparsable number,
    /// `UnknownCategory` for a label the encoders never saw. All of these
    /// reject the record only; the context remains valid.
    pub fn predict(&self, record: &PredictionRecord) -> Result<PredictionResult> {
        let (row, out_of_range) = self.encode_record(record)?;

        let x = Matrix::from_vec(1, row.len(), row.clone())
            .map_err(|e| PreverError::Other(e.to_string()))?;
        let probs = self
            .model
            .predict_proba(&x)?
            .pop()
            .ok_or_else(|| PreverError::Other("empty probability row".to_string()))?;

        let probabilities: Vec<ClassProbability> = self
            .class_order
            .iter()
            .map(|&native| {
                Ok(ClassProbability {
                    label: self.encoders.decode_class(native)?.to_string(),
                    probability: probs[native],
                })
            })
            .collect::<Result<Vec<_>>>()?;

        // Arg-max over the severity-ordered list; strict comparison keeps
        // the less severe class on ties.
        let best = probabilities
            .iter()
            .enumerate()
            .fold(0, |best, (i, p)| {
                if p.probability > probabilities[best].probability {
                    i
                } else {
                    best
                }
            });

        Ok(PredictionResult {
            label: probabilities[best].label.clone(),
            probabilities,
            bmi: derived_bmi(&self.schema, &row),
            out_of_range,
        })
    }

    /// The schema this context validates records against.
    #[must_use]
    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Class labels in clinical severity order.
    #[must_use]
    pub fn class_labels(&self) -> Result<Vec<&str>> {
        self.class_order
            .iter()
            .map(|&native| self.encoders.decode_class(native))
            .collect()
    }

    fn encode_record(&self, record: &PredictionRecord) -> Result<(Vec<f32>, Vec<String>)> {
        let mut row = Vec::with_capacity(encoded_width(&self.schema));
        let mut out_of_range = Vec::new();

        for feature in self.schema.features() {
            let raw = record
                .get(&feature.name)
                .ok_or_else(|| PreverError::missing_field(&feature.name))?;
            let encoded = self.encoders.encode_value(feature, raw)?;

            if !feature.kind.is_categorical() {
                if let Some(range) = self.encoders.numeric_range(&feature.name) {
                    if !range.contains(encoded) {
                        out_of_range.push(feature.name.clone());
                    }
                }
            }
            row.push(encoded);
        }

        if let Some(bmi) = derived_bmi(&self.schema, &row) {
            row.push(bmi);
        }

        Ok((row, out_of_range))
    }
}

/// Native class indices sorted by clinical severity. Labels outside the
/// known severity scale sort after it, alphabetically.
fn clinical_class_order(encoders: &EncoderSet) -> Vec<usize> {
    let mut order: Vec<usize> = (0..encoders.n_classes()).collect();
    order.sort_by_key(|&native| {
        let label = encoders.decode_class(native).unwrap_or_default();
        (
            severity_rank(label).unwrap_or(usize::MAX),
            label.to_string(),
        )
    });
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::RawDataset;
    use crate::pipeline::{train, Hyperparameters};
    use std::fmt::Write as _;

    fn survey_csv(per_class: usize) -> String {
        let mut csv = String::from(
            "Gender,Age,Height,Weight,family_history,FAVC,FCVC,NCP,CAEC,SMOKE,CH2O,SCC,FAF,TUE,CALC,MTRANS,Obesity\n",
        );
        let classes = [
            ("Insufficient_Weight", 45.0),
            ("Normal_Weight", 65.0),
            ("Obesity_Type_I", 95.0),
        ];
        for (label, base_weight) in classes {
            for i in 0..per_class {
                let gender = if i % 2 == 0 { "Female" } else { "Male" };
                writeln!(
                    csv,
                    "{gender},{},1.70,{},yes,no,2,3,Sometimes,no,2,no,1,1,no,Walking,{label}",
                    20 + i,
                    base_weight + i as f32,
                )
                .expect("write to String cannot fail");
            }
        }
        csv
    }

    fn trained_context() -> InferenceContext {
        let data = RawDataset::from_csv_str(&survey_csv(8)).expect("valid CSV");
        let schema = FeatureSchema::obesity();
        let params = Hyperparameters::new()
            .with_n_estimators(10)
            .with_test_size(0.25)
            .with_seed(42);
        let outcome = train(&data, &schema, &params).expect("trains");
        InferenceContext::from_parts(outcome.model, outcome.encoders, schema)
    }

    fn full_record() -> PredictionRecord {
        PredictionRecord::new()
            .with_field("Gender", "Female")
            .with_number("Age", 22.0)
            .with_number("Height", 1.70)
            .with_number("Weight", 66.0)
            .with_field("family_history", "yes")
            .with_field("FAVC", "no")
            .with_number("FCVC", 2.0)
            .with_number("NCP", 3.0)
            .with_field("CAEC", "Sometimes")
            .with_field("SMOKE", "no")
            .with_number("CH2O", 2.0)
            .with_field("SCC", "no")
            .with_number("FAF", 1.0)
            .with_number("TUE", 1.0)
            .with_field("CALC", "no")
            .with_field("MTRANS", "Walking")
    }

    #[test]
    fn test_predict_returns_clinical_order_probabilities() {
        let ctx = trained_context();
        let result = ctx.predict(&full_record()).expect("predicts");

        let labels: Vec<&str> = result
            .probabilities
            .iter()
            .map(|p| p.label.as_str())
            .collect();
        assert_eq!(
            labels,
            vec!["Insufficient_Weight", "Normal_Weight", "Obesity_Type_I"]
        );

        let total: f32 = result.probabilities.iter().map(|p| p.probability).sum();
        assert!((total - 1.0).abs() < 1e-5);
        assert!(labels.contains(&result.label.as_str()));
    }

    #[test]
    fn test_predicted_label_is_argmax() {
        let ctx = trained_context();
        let result = ctx.predict(&full_record()).expect("predicts");

        let max = result
            .probabilities
            .iter()
            .map(|p| p.probability)
            .fold(f32::NEG_INFINITY, f32::max);
        let picked = result
            .probabilities
            .iter()
            .find(|p| p.label == result.label)
            .expect("predicted label appears in the vector");
        assert_eq!(picked.probability, max);

        // On equal probabilities the earliest (least severe) entry wins.
        let first_at_max = result
            .probabilities
            .iter()
            .find(|p| p.probability == max)
            .expect("max exists");
        assert_eq!(result.label, first_at_max.label);
    }

    #[test]
    fn test_exact_tie_prefers_less_severe_class() {
        // Constant features carry no signal: every tree degenerates to a
        // zero leaf, so both classes keep exactly equal probability. The
        // native (lexicographic) order puts Obesity_Type_I first; the
        // clinical tie-break must still pick Overweight_Level_I.
        let mut csv = String::from(
            "Gender,Age,Height,Weight,family_history,FAVC,FCVC,NCP,CAEC,SMOKE,CH2O,SCC,FAF,TUE,CALC,MTRANS,Obesity\n",
        );
        for label in ["Overweight_Level_I", "Obesity_Type_I"] {
            for _ in 0..4 {
                writeln!(
                    csv,
                    "Female,25,1.70,70,yes,no,2,3,Sometimes,no,2,no,1,1,no,Walking,{label}"
                )
                .expect("write to String cannot fail");
            }
        }
        let data = RawDataset::from_csv_str(&csv).expect("valid CSV");
        let schema = FeatureSchema::obesity();
        let encoders = EncoderSet::fit(&data, &schema).expect("fit succeeds");
        let (x, y) = encoders.encode_dataset(&data, &schema).expect("encodes");
        let mut model = GradientBoostingClassifier::new().with_n_estimators(5);
        model.fit(&x, &y).expect("fit succeeds");
        let ctx = InferenceContext::from_parts(model, encoders, schema);

        let record = PredictionRecord::new()
            .with_field("Gender", "Female")
            .with_number("Age", 25.0)
            .with_number("Height", 1.70)
            .with_number("Weight", 70.0)
            .with_field("family_history", "yes")
            .with_field("FAVC", "no")
            .with_number("FCVC", 2.0)
            .with_number("NCP", 3.0)
            .with_field("CAEC", "Sometimes")
            .with_field("SMOKE", "no")
            .with_number("CH2O", 2.0)
            .with_field("SCC", "no")
            .with_number("FAF", 1.0)
            .with_number("TUE", 1.0)
            .with_field("CALC", "no")
            .with_field("MTRANS", "Walking");
        let result = ctx.predict(&record).expect("predicts");

        let diff =
            (result.probabilities[0].probability - result.probabilities[1].probability).abs();
        assert!(diff < 1e-6, "classes should be tied, diff was {diff}");
        assert_eq!(result.probabilities[0].label, "Overweight_Level_I");
        assert_eq!(result.label, "Overweight_Level_I");
    }

    #[test]
    fn test_predict_reports_bmi() {
        let ctx = trained_context();
        let result = ctx.predict(&full_record()).expect("predicts");
        let bmi = result.bmi.expect("Weight and Height are in the schema");
        assert!((bmi - 66.0 / (1.70 * 1.70)).abs() < 1e-4);
    }

    #[test]
    fn test_predict_missing_field_is_recoverable() {
        let ctx = trained_context();
        let incomplete = PredictionRecord::new().with_field("Gender", "Female");
        let err = ctx.predict(&incomplete).unwrap_err();
        assert!(err.is_recoverable());
        assert!(err.to_string().contains("Age"));

        // Context still serves after a rejected record.
        assert!(ctx.predict(&full_record()).is_ok());
    }

    #[test]
    fn test_predict_unknown_category_is_recoverable() {
        let ctx = trained_context();
        let record = full_record().with_field("MTRANS", "Teleport");
        let err = ctx.predict(&record).unwrap_err();
        assert!(matches!(err, PreverError::UnknownCategory { .. }));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_predict_bad_number_is_recoverable() {
        let ctx = trained_context();
        let record = full_record().with_field("Age", "twenty");
        let err = ctx.predict(&record).unwrap_err();
        assert!(matches!(err, PreverError::InvalidInput { .. }));
    }

    #[test]
    fn test_out_of_range_is_advisory() {
        let ctx = trained_context();
        let record = full_record().with_number("Age", 90.0);
        let result = ctx.predict(&record).expect("still predicts");
        assert!(result.out_of_range.contains(&"Age".to_string()));
    }

    #[test]
    fn test_in_range_record_has_no_warnings() {
        let ctx = trained_context();
        let result = ctx.predict(&full_record()).expect("predicts");
        assert!(result.out_of_range.is_empty());
    }

    #[test]
    fn test_class_labels_in_severity_order() {
        let ctx = trained_context();
        let labels = ctx.class_labels().expect("decodable");
        assert_eq!(
            labels,
            vec!["Insufficient_Weight", "Normal_Weight", "Obesity_Type_I"]
        );
    }
}
