//! Persistence of the trained model / encoder set pair.
//!
//! Training produces exactly two artifacts, serialized with bincode. Each
//! carries a [`RunStamp`] with the format version and a run id shared by
//! both files of the same training run. Loading verifies the stamps agree,
//! so a pair assembled from different runs (or a crash between the two
//! writes) is rejected as `ArtifactMismatch` instead of silently serving a
//! model with the wrong encoders.
//!
//! Writes go to a `.tmp` sibling first and are renamed into place, so a
//! crash mid-write can never leave a truncated artifact under the final
//! name.

use crate::encoding::EncoderSet;
use crate::error::{PreverError, Result};
use crate::tree::GradientBoostingClassifier;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Current artifact format version. Bumped on breaking layout changes.
pub const FORMAT_VERSION: u16 = 1;

/// File name of the model artifact inside the artifact directory.
pub const MODEL_FILE: &str = "model.bin";

/// File name of the encoder artifact inside the artifact directory.
pub const ENCODERS_FILE: &str = "encoders.bin";

/// Identity of one training run, embedded in both artifacts of its pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStamp {
    /// Artifact format version.
    pub format_version: u16,
    /// Unique id of the training run that produced the pair.
    pub run_id: String,
}

impl RunStamp {
    /// Generates a fresh stamp for a new training run.
    #[must_use]
    pub fn generate() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_millis());
        let suffix: u32 = rand::random();
        Self {
            format_version: FORMAT_VERSION,
            run_id: format!("{millis:x}-{suffix:08x}"),
        }
    }
}

/// The persisted model artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    /// Run identity, matched against the encoder artifact at load.
    pub stamp: RunStamp,
    /// Names of the encoded feature columns the model was trained on,
    /// in order.
    pub feature_names: Vec<String>,
    /// The trained classifier.
    pub model: GradientBoostingClassifier,
}

/// The persisted encoder artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncoderArtifact {
    /// Run identity, matched against the model artifact at load.
    pub stamp: RunStamp,
    /// The fitted encoder set.
    pub encoders: EncoderSet,
}

/// Writes the model and encoder artifacts as one stamped pair.
///
/// # Errors
///
/// Returns an I/O error if the directory or files cannot be written, or a
/// serialization error if encoding fails.
pub fn save_pair<P: AsRef<Path>>(
    dir: P,
    model: &GradientBoostingClassifier,
    encoders: &EncoderSet,
    feature_names: Vec<String>,
) -> Result<RunStamp> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    let stamp = RunStamp::generate();
    let model_artifact = ModelArtifact {
        stamp: stamp.clone(),
        feature_names,
        model: model.clone(),
    };
    let encoder_artifact = EncoderArtifact {
        stamp: stamp.clone(),
        encoders: encoders.clone(),
    };

    write_atomic(&dir.join(MODEL_FILE), &model_artifact)?;
    write_atomic(&dir.join(ENCODERS_FILE), &encoder_artifact)?;

    Ok(stamp)
}

/// Loads and verifies the artifact pair from a directory.
///
/// # Errors
///
/// Returns `ArtifactMismatch` if either file is missing, a format version
/// is unsupported, the run ids disagree, or the model's class count does
/// not match the target encoder.
pub fn load_pair<P: AsRef<Path>>(dir: P) -> Result<(ModelArtifact, EncoderArtifact)> {
    let dir = dir.as_ref();
    let model_path = dir.join(MODEL_FILE);
    let encoders_path = dir.join(ENCODERS_FILE);

    match (model_path.exists(), encoders_path.exists()) {
        (true, true) => {}
        (false, false) => {
            return Err(PreverError::ArtifactMismatch {
                message: format!("no trained artifacts found in '{}'", dir.display()),
            });
        }
        (present_model, _) => {
            let (found, missing) = if present_model {
                (MODEL_FILE, ENCODERS_FILE)
            } else {
                (ENCODERS_FILE, MODEL_FILE)
            };
            return Err(PreverError::ArtifactMismatch {
                message: format!("found '{found}' but its pair '{missing}' is missing"),
            });
        }
    }

    let model_artifact: ModelArtifact = read_artifact(&model_path)?;
    let encoder_artifact: EncoderArtifact = read_artifact(&encoders_path)?;

    for (name, stamp) in [
        (MODEL_FILE, &model_artifact.stamp),
        (ENCODERS_FILE, &encoder_artifact.stamp),
    ] {
        if stamp.format_version != FORMAT_VERSION {
            return Err(PreverError::ArtifactMismatch {
                message: format!(
                    "'{name}' has format version {}, supported version is {FORMAT_VERSION}",
                    stamp.format_version
                ),
            });
        }
    }

    if model_artifact.stamp.run_id != encoder_artifact.stamp.run_id {
        return Err(PreverError::ArtifactMismatch {
            message: format!(
                "model run '{}' does not match encoder run '{}'",
                model_artifact.stamp.run_id, encoder_artifact.stamp.run_id
            ),
        });
    }

    if model_artifact.model.n_classes() != encoder_artifact.encoders.n_classes() {
        return Err(PreverError::ArtifactMismatch {
            message: format!(
                "model predicts {} classes but the target encoder has {}",
                model_artifact.model.n_classes(),
                encoder_artifact.encoders.n_classes()
            ),
        });
    }

    Ok((model_artifact, encoder_artifact))
}

fn write_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let bytes =
        bincode::serialize(value).map_err(|e| PreverError::Serialization(e.to_string()))?;

    let tmp = path.with_extension("bin.tmp");
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

fn read_artifact<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let bytes = fs::read(path)?;
    bincode::deserialize(&bytes).map_err(|e| {
        PreverError::Serialization(format!("'{}': {e}", path.display()))
    })
}
