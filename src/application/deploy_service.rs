// Deploy service - Use case for validating a model and loading its dashboard
use crate::application::artifact_store::ArtifactStore;
use crate::application::error::ArtifactError;
use crate::application::model_validator::ModelValidator;
use crate::domain::artifact::{ArtifactKind, ResolvedPaths};
use crate::domain::loaded::ModelSummary;
use crate::domain::selection::{ModelLabel, Selection};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployStage {
    Idle,
    CheckingModel,
    CheckingDashboard,
    LoadingModel,
    Rendering,
    Failed,
}

// Stage plus the data it carries into the next transition
enum Step {
    Idle,
    CheckingModel,
    CheckingDashboard,
    LoadingModel,
    Rendering(LoadedDashboard),
    Failed(ArtifactError),
}

impl Step {
    fn stage(&self) -> DeployStage {
        match self {
            Step::Idle => DeployStage::Idle,
            Step::CheckingModel => DeployStage::CheckingModel,
            Step::CheckingDashboard => DeployStage::CheckingDashboard,
            Step::LoadingModel => DeployStage::LoadingModel,
            Step::Rendering(_) => DeployStage::Rendering,
            Step::Failed(_) => DeployStage::Failed,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadedDashboard {
    pub summary: ModelSummary,
    pub html: String,
}

/// Result of one deploy action. Nothing is retried; a new action starts from `Idle`.
#[derive(Debug)]
pub struct DeployReport {
    pub model: ModelLabel,
    pub stages: Vec<DeployStage>,
    pub outcome: Result<LoadedDashboard, ArtifactError>,
}

impl DeployReport {
    pub fn final_stage(&self) -> DeployStage {
        self.stages.last().copied().unwrap_or(DeployStage::Idle)
    }
}

#[derive(Clone)]
pub struct DeployService {
    store: Arc<dyn ArtifactStore>,
    validator: Arc<dyn ModelValidator>,
}

impl DeployService {
    pub fn new(store: Arc<dyn ArtifactStore>, validator: Arc<dyn ModelValidator>) -> Self {
        Self { store, validator }
    }

    pub async fn deploy(&self, selection: &Selection) -> DeployReport {
        let start_time = Instant::now();
        let paths = ResolvedPaths::resolve(selection);

        let mut step = Step::Idle;
        let mut stages = vec![DeployStage::Idle];

        let outcome = loop {
            step = match step {
                Step::Idle => Step::CheckingModel,
                Step::CheckingModel => match self.require(ArtifactKind::Model, &paths.model).await {
                    Ok(()) => Step::CheckingDashboard,
                    Err(e) => Step::Failed(e),
                },
                Step::CheckingDashboard => {
                    match self.require(ArtifactKind::Dashboard, &paths.dashboard).await {
                        Ok(()) => Step::LoadingModel,
                        Err(e) => Step::Failed(e),
                    }
                }
                Step::LoadingModel => match self.load(&paths).await {
                    Ok(loaded) => Step::Rendering(loaded),
                    Err(e) => Step::Failed(e),
                },
                Step::Rendering(loaded) => break Ok(loaded),
                Step::Failed(e) => break Err(e),
            };

            let stage = step.stage();
            tracing::debug!("Deploy {}: {:?} -> {:?}", selection.model, stages.last(), stage);
            stages.push(stage);
        };

        match &outcome {
            Ok(loaded) => tracing::info!(
                "Deployed {} for {} in {}ms (model: {} bytes, {} root)",
                selection.model,
                selection.dataset,
                start_time.elapsed().as_millis(),
                loaded.summary.size_bytes,
                loaded.summary.root_kind
            ),
            Err(e) => tracing::warn!("Deploy {} failed: {}", selection.model, e),
        }

        DeployReport {
            model: selection.model.clone(),
            stages,
            outcome,
        }
    }

    /// Validate the model, then read the dashboard it belongs to.
    async fn load(&self, paths: &ResolvedPaths) -> Result<LoadedDashboard, ArtifactError> {
        let summary = self.load_model(&paths.model).await?;
        let html = self.read_dashboard(&paths.dashboard).await?;
        Ok(LoadedDashboard { summary, html })
    }

    async fn require(&self, kind: ArtifactKind, path: &Path) -> Result<(), ArtifactError> {
        if self.store.exists(path).await {
            Ok(())
        } else {
            Err(ArtifactError::Missing {
                kind,
                path: path.to_path_buf(),
            })
        }
    }

    async fn load_model(&self, path: &Path) -> Result<ModelSummary, ArtifactError> {
        let bytes = self.store.read_bytes(path).await.map_err(|source| ArtifactError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        self.validator
            .validate(&bytes)
            .map_err(|e| ArtifactError::Deserialization {
                path: path.to_path_buf(),
                message: e.to_string(),
            })
    }

    async fn read_dashboard(&self, path: &Path) -> Result<String, ArtifactError> {
        self.store.read_text(path).await.map_err(|source| ArtifactError::Read {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::artifact_store::memory::MemoryStore;
    use crate::application::model_validator::ValidationError;
    use crate::domain::selection::DatasetId;
    use std::path::PathBuf;

    struct AcceptPrefix(&'static [u8]);

    impl ModelValidator for AcceptPrefix {
        fn validate(&self, bytes: &[u8]) -> Result<ModelSummary, ValidationError> {
            if bytes.starts_with(self.0) {
                Ok(ModelSummary {
                    size_bytes: bytes.len(),
                    root_kind: "dict",
                })
            } else {
                Err(ValidationError("unsupported pickle protocol: 9".to_string()))
            }
        }
    }

    fn svm() -> Selection {
        Selection::new(DatasetId::new("FAUJI"), ModelLabel::new("SVM"))
    }

    fn deploy_service(store: Arc<MemoryStore>) -> DeployService {
        DeployService::new(store, Arc::new(AcceptPrefix(b"ok")))
    }

    #[tokio::test]
    async fn test_missing_model_short_circuits() {
        let store = Arc::new(
            MemoryStore::new().with_file("FAUJI_SVM_Dashboard.html", "<html></html>"),
        );

        let report = deploy_service(store.clone()).deploy(&svm()).await;

        assert_eq!(
            report.stages,
            vec![DeployStage::Idle, DeployStage::CheckingModel, DeployStage::Failed]
        );
        match report.outcome {
            Err(ArtifactError::Missing { kind, path }) => {
                assert_eq!(kind, ArtifactKind::Model);
                assert_eq!(path, PathBuf::from("FAUJI_SVM_Model.pkl"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert!(store.opened().is_empty());
    }

    #[tokio::test]
    async fn test_missing_dashboard_fails_before_loading_model() {
        let store = Arc::new(MemoryStore::new().with_file("FAUJI_SVM_Model.pkl", "ok"));

        let report = deploy_service(store.clone()).deploy(&svm()).await;

        assert_eq!(report.final_stage(), DeployStage::Failed);
        assert!(matches!(
            report.outcome,
            Err(ArtifactError::Missing {
                kind: ArtifactKind::Dashboard,
                ..
            })
        ));
        assert!(store.opened().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_model_is_not_rendered() {
        let store = Arc::new(
            MemoryStore::new()
                .with_file("FAUJI_SVM_Model.pkl", "garbage")
                .with_file("FAUJI_SVM_Dashboard.html", "<html></html>"),
        );

        let report = deploy_service(store.clone()).deploy(&svm()).await;

        assert_eq!(
            report.stages,
            vec![
                DeployStage::Idle,
                DeployStage::CheckingModel,
                DeployStage::CheckingDashboard,
                DeployStage::LoadingModel,
                DeployStage::Failed,
            ]
        );
        let err = report.outcome.unwrap_err();
        assert!(matches!(err, ArtifactError::Deserialization { .. }));
        assert!(err.to_string().contains("unsupported pickle protocol: 9"));
        assert_eq!(store.opened(), vec![PathBuf::from("FAUJI_SVM_Model.pkl")]);
    }

    #[tokio::test]
    async fn test_valid_artifacts_render_dashboard_verbatim() {
        let html = "<html><body><div id=\"chart\">é &amp; ü</div></body></html>";
        let store = Arc::new(
            MemoryStore::new()
                .with_file("FAUJI_SVM_Model.pkl", "ok-model")
                .with_file("FAUJI_SVM_Dashboard.html", html),
        );

        let report = deploy_service(store).deploy(&svm()).await;

        assert_eq!(
            report.stages,
            vec![
                DeployStage::Idle,
                DeployStage::CheckingModel,
                DeployStage::CheckingDashboard,
                DeployStage::LoadingModel,
                DeployStage::Rendering,
            ]
        );
        assert_eq!(report.final_stage(), DeployStage::Rendering);
        let loaded = report.outcome.unwrap();
        assert_eq!(loaded.html, html);
        assert_eq!(loaded.summary.size_bytes, 8);
    }

    #[tokio::test]
    async fn test_non_utf8_dashboard_is_a_read_error() {
        let store = Arc::new(
            MemoryStore::new()
                .with_file("FAUJI_SVM_Model.pkl", "ok")
                .with_file("FAUJI_SVM_Dashboard.html", vec![0xff, 0xfe, 0x00]),
        );

        let report = deploy_service(store).deploy(&svm()).await;

        assert_eq!(report.final_stage(), DeployStage::Failed);
        assert!(matches!(report.outcome, Err(ArtifactError::Read { .. })));
    }
}
