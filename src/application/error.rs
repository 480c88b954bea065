// Errors raised while locating and loading artifacts
use crate::domain::artifact::ArtifactKind;
use std::path::PathBuf;

/// Remediation shown alongside a model that fails to deserialize.
pub const VERSION_MISMATCH_HINT: &str = "The library version used to load the model might differ \
from the one used to train and save it. Re-export the model with a matching version \
(for scikit-learn models: pip install --upgrade scikit-learn) and try again.";

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("Missing {kind} file: {}", path.display())]
    Missing { kind: ArtifactKind, path: PathBuf },

    #[error("Error reading CSV file: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("The model file {} could not be loaded: {message}", path.display())]
    Deserialization { path: PathBuf, message: String },

    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
