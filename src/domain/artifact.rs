// Artifact naming - maps a selection to the files produced by the training pipeline
use super::selection::{DatasetId, ModelLabel, Selection};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    ProcessedData,
    Model,
    Dashboard,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArtifactKind::ProcessedData => "processed data",
            ArtifactKind::Model => "model",
            ArtifactKind::Dashboard => "dashboard",
        };
        f.write_str(name)
    }
}

pub fn processed_csv(dataset: &DatasetId) -> String {
    format!("{}_Processed_Data.csv", dataset)
}

pub fn model_file(dataset: &DatasetId, model: &ModelLabel) -> String {
    format!("{}_{}_Model.pkl", dataset, model.key())
}

pub fn dashboard_file(dataset: &DatasetId, model: &ModelLabel) -> String {
    format!("{}_{}_Dashboard.html", dataset, model.key())
}

/// The three filenames for one selection, relative to the artifact root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    pub csv: PathBuf,
    pub model: PathBuf,
    pub dashboard: PathBuf,
}

impl ResolvedPaths {
    pub fn resolve(selection: &Selection) -> Self {
        Self {
            csv: PathBuf::from(processed_csv(&selection.dataset)),
            model: PathBuf::from(model_file(&selection.dataset, &selection.model)),
            dashboard: PathBuf::from(dashboard_file(&selection.dataset, &selection.model)),
        }
    }

    pub fn entries(&self) -> [(ArtifactKind, &PathBuf); 3] {
        [
            (ArtifactKind::ProcessedData, &self.csv),
            (ArtifactKind::Model, &self.model),
            (ArtifactKind::Dashboard, &self.dashboard),
        ]
    }
}
