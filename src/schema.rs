//! Feature schema registry for the obesity survey dataset.
//!
//! The schema is the single source of truth for which columns exist, what
//! kind of values they carry, and the canonical clinical ordering of the
//! seven output classes. Training and inference share the same immutable
//! schema; any disagreement between schema and data is a fatal
//! `SchemaMismatch`, never a silent default.

use serde::{Deserialize, Serialize};

/// The seven obesity levels in clinical severity order, least to most
/// severe. Used for display and reporting only; the model trains against
/// its own native (lexicographic) class indices.
pub const CLINICAL_ORDER: [&str; 7] = [
    "Insufficient_Weight",
    "Normal_Weight",
    "Overweight_Level_I",
    "Overweight_Level_II",
    "Obesity_Type_I",
    "Obesity_Type_II",
    "Obesity_Type_III",
];

/// Name of the body-mass-index column derived from Weight and Height
/// during encoding (it never appears in the raw CSV).
pub const DERIVED_BMI: &str = "IMC";

/// Returns the clinical severity rank of a class label (0 = least severe),
/// or None for an unknown label.
#[must_use]
pub fn severity_rank(label: &str) -> Option<usize> {
    CLINICAL_ORDER.iter().position(|&c| c == label)
}

/// The kind of values a feature column carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureKind {
    /// Decimal values, passed through unencoded.
    Numeric,
    /// Exactly two string tokens, encoded to {0, 1}.
    Binary,
    /// Categorical with a meaningful order (e.g. consumption frequency).
    Ordinal,
    /// Categorical with no inherent order (e.g. transport mode).
    Nominal,
}

impl FeatureKind {
    /// True for kinds that go through a fitted category encoder.
    #[must_use]
    pub fn is_categorical(self) -> bool {
        !matches!(self, FeatureKind::Numeric)
    }
}

/// Definition of one feature column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureDef {
    /// Column name, exactly as in the CSV header.
    pub name: String,
    /// Value kind.
    pub kind: FeatureKind,
    /// Expected labels for binary/ordinal/nominal features, in their
    /// documented survey order. Empty for numeric features.
    pub allowed_values: Vec<String>,
}

impl FeatureDef {
    fn numeric(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: FeatureKind::Numeric,
            allowed_values: Vec::new(),
        }
    }

    fn with_values(name: &str, kind: FeatureKind, values: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            kind,
            allowed_values: values.iter().map(|v| (*v).to_string()).collect(),
        }
    }
}

/// Ordered, immutable list of feature definitions plus the target column.
///
/// # Examples
///
/// ```
/// use prever::schema::FeatureSchema;
///
/// let schema = FeatureSchema::obesity();
/// assert_eq!(schema.features().len(), 16);
/// assert_eq!(schema.target(), "Obesity");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureSchema {
    features: Vec<FeatureDef>,
    target: String,
}

impl FeatureSchema {
    /// Builds a schema from feature definitions and a target column name.
    #[must_use]
    pub fn new(features: Vec<FeatureDef>, target: String) -> Self {
        Self { features, target }
    }

    /// The fixed schema of the obesity survey dataset: 16 features plus
    /// the seven-class `Obesity` target.
    #[must_use]
    pub fn obesity() -> Self {
        let yes_no = ["no", "yes"];
        let frequency = ["no", "Sometimes", "Frequently", "Always"];
        let features = vec![
            FeatureDef::with_values("Gender", FeatureKind::Binary, &["Female", "Male"]),
            FeatureDef::numeric("Age"),
            FeatureDef::numeric("Height"),
            FeatureDef::numeric("Weight"),
            FeatureDef::with_values("family_history", FeatureKind::Binary, &yes_no),
            FeatureDef::with_values("FAVC", FeatureKind::Binary, &yes_no),
            FeatureDef::numeric("FCVC"),
            FeatureDef::numeric("NCP"),
            FeatureDef::with_values("CAEC", FeatureKind::Ordinal, &frequency),
            FeatureDef::with_values("SMOKE", FeatureKind::Binary, &yes_no),
            FeatureDef::numeric("CH2O"),
            FeatureDef::with_values("SCC", FeatureKind::Binary, &yes_no),
            FeatureDef::numeric("FAF"),
            FeatureDef::numeric("TUE"),
            FeatureDef::with_values("CALC", FeatureKind::Ordinal, &frequency),
            FeatureDef::with_values(
                "MTRANS",
                FeatureKind::Nominal,
                &[
                    "Automobile",
                    "Motorbike",
                    "Bike",
                    "Public_Transportation",
                    "Walking",
                ],
            ),
        ];
        Self::new(features, "Obesity".to_string())
    }

    /// Returns the ordered feature definitions.
    #[must_use]
    pub fn features(&self) -> &[FeatureDef] {
        &self.features
    }

    /// Returns the target column name.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Returns the feature names in schema order.
    #[must_use]
    pub fn feature_names(&self) -> Vec<&str> {
        self.features.iter().map(|f| f.name.as_str()).collect()
    }

    /// Looks up a feature definition by name.
    #[must_use]
    pub fn feature(&self, name: &str) -> Option<&FeatureDef> {
        self.features.iter().find(|f| f.name == name)
    }

    /// Returns the categorical (binary/ordinal/nominal) features.
    pub fn categorical_features(&self) -> impl Iterator<Item = &FeatureDef> {
        self.features.iter().filter(|f| f.kind.is_categorical())
    }

    /// Returns the numeric features.
    pub fn numeric_features(&self) -> impl Iterator<Item = &FeatureDef> {
        self.features.iter().filter(|f| !f.kind.is_categorical())
    }
}
