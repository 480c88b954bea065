// Selection domain model - what the user picked for the current request
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DatasetId(String);

impl DatasetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Human-readable model architecture name, e.g. "Random Forest".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelLabel(String);

impl ModelLabel {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Filename-safe key: every space becomes an underscore.
    pub fn key(&self) -> String {
        self.0.replace(' ', "_")
    }
}

impl fmt::Display for ModelLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-request selection state handed to services and the page renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub dataset: DatasetId,
    pub model: ModelLabel,
}

impl Selection {
    pub fn new(dataset: DatasetId, model: ModelLabel) -> Self {
        Self { dataset, model }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("Unknown dataset: {0}")]
    UnknownDataset(String),

    #[error("Unknown model: {0}")]
    UnknownModel(String),

    #[error("Catalog has no {0} configured")]
    EmptyCatalog(&'static str),
}

/// The closed sets of datasets and models the dashboard offers.
#[derive(Debug, Clone)]
pub struct Catalog {
    datasets: Vec<DatasetId>,
    models: Vec<ModelLabel>,
}

impl Catalog {
    pub fn new(datasets: Vec<DatasetId>, models: Vec<ModelLabel>) -> Result<Self, SelectionError> {
        if datasets.is_empty() {
            return Err(SelectionError::EmptyCatalog("datasets"));
        }
        if models.is_empty() {
            return Err(SelectionError::EmptyCatalog("models"));
        }
        Ok(Self { datasets, models })
    }

    pub fn datasets(&self) -> &[DatasetId] {
        &self.datasets
    }

    pub fn models(&self) -> &[ModelLabel] {
        &self.models
    }

    /// Build a selection from raw request values.
    /// Absent values fall back to the first catalog entry, unknown ones are rejected.
    pub fn select(&self, dataset: Option<&str>, model: Option<&str>) -> Result<Selection, SelectionError> {
        let dataset = match dataset {
            None => self.datasets[0].clone(),
            Some(raw) => self
                .datasets
                .iter()
                .find(|d| d.as_str() == raw)
                .cloned()
                .ok_or_else(|| SelectionError::UnknownDataset(raw.to_string()))?,
        };

        let model = match model {
            None => self.models[0].clone(),
            Some(raw) => self
                .models
                .iter()
                .find(|m| m.as_str() == raw)
                .cloned()
                .ok_or_else(|| SelectionError::UnknownModel(raw.to_string()))?,
        };

        Ok(Selection::new(dataset, model))
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            datasets: ["FAUJI", "OGDCL"].into_iter().map(DatasetId::new).collect(),
            models: ["Logistic Regression", "Random Forest", "SVM", "Voting Ensemble"]
                .into_iter()
                .map(ModelLabel::new)
                .collect(),
        }
    }
}
