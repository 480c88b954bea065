// Status service - Use case for reporting which artifacts are present
use crate::application::artifact_store::ArtifactStore;
use crate::domain::artifact::{ArtifactKind, ResolvedPaths};
use crate::domain::selection::Selection;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize)]
pub struct ArtifactEntry {
    pub kind: ArtifactKind,
    pub path: String,
    pub exists: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArtifactStatus {
    pub dataset: String,
    pub model: String,
    pub artifacts: Vec<ArtifactEntry>,
}

#[derive(Clone)]
pub struct StatusService {
    store: Arc<dyn ArtifactStore>,
}

impl StatusService {
    pub fn new(store: Arc<dyn ArtifactStore>) -> Self {
        Self { store }
    }

    pub async fn status(&self, selection: &Selection) -> ArtifactStatus {
        let paths = ResolvedPaths::resolve(selection);

        let mut artifacts = Vec::with_capacity(3);
        for (kind, path) in paths.entries() {
            artifacts.push(ArtifactEntry {
                kind,
                path: path.display().to_string(),
                exists: self.store.exists(path).await,
            });
        }

        ArtifactStatus {
            dataset: selection.dataset.to_string(),
            model: selection.model.to_string(),
            artifacts,
        }
    }
}
