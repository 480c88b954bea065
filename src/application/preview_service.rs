// Preview service - Use case for showing the head of a processed dataset
use crate::application::artifact_store::ArtifactStore;
use crate::application::error::ArtifactError;
use crate::domain::artifact::{processed_csv, ArtifactKind};
use crate::domain::loaded::DataPreview;
use crate::domain::selection::DatasetId;
use crate::infrastructure::csv_preview::parse_preview;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Clone)]
pub struct PreviewService {
    store: Arc<dyn ArtifactStore>,
    max_rows: usize,
}

impl PreviewService {
    pub fn new(store: Arc<dyn ArtifactStore>, max_rows: usize) -> Self {
        Self { store, max_rows }
    }

    pub async fn preview(&self, dataset: &DatasetId) -> Result<DataPreview, ArtifactError> {
        let path = PathBuf::from(processed_csv(dataset));

        if !self.store.exists(&path).await {
            tracing::warn!("Processed data not found: {}", path.display());
            return Err(ArtifactError::Missing {
                kind: ArtifactKind::ProcessedData,
                path,
            });
        }

        let bytes = match self.store.read_bytes(&path).await {
            Ok(bytes) => bytes,
            Err(source) => return Err(ArtifactError::Read { path, source }),
        };

        match parse_preview(&bytes, self.max_rows) {
            Ok(preview) => {
                tracing::debug!(
                    "Loaded {}: {} rows, {} columns",
                    path.display(),
                    preview.total_rows,
                    preview.columns.len()
                );
                Ok(preview)
            }
            Err(e) => {
                tracing::warn!("Could not parse {}: {}", path.display(), e);
                Err(ArtifactError::Parse {
                    path,
                    message: e.to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::artifact_store::memory::MemoryStore;

    fn service(store: MemoryStore) -> PreviewService {
        PreviewService::new(Arc::new(store), 5)
    }

    #[tokio::test]
    async fn test_missing_csv_names_the_file() {
        let err = service(MemoryStore::new())
            .preview(&DatasetId::new("FAUJI"))
            .await
            .unwrap_err();

        match &err {
            ArtifactError::Missing { kind, path } => {
                assert_eq!(*kind, ArtifactKind::ProcessedData);
                assert_eq!(path, &PathBuf::from("FAUJI_Processed_Data.csv"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(err.to_string().contains("FAUJI_Processed_Data.csv"));
    }

    #[tokio::test]
    async fn test_preview_keeps_first_five_rows() {
        let mut csv = String::from("Date,Close,Regime\n");
        for day in 1..=8 {
            csv.push_str(&format!("2024-01-0{},{}.5,{}\n", day, 100 + day, day % 3));
        }
        let store = MemoryStore::new().with_file("OGDCL_Processed_Data.csv", csv);

        let preview = service(store)
            .preview(&DatasetId::new("OGDCL"))
            .await
            .unwrap();

        assert_eq!(preview.columns, vec!["Date", "Close", "Regime"]);
        assert_eq!(preview.rows.len(), 5);
        assert_eq!(preview.total_rows, 8);
        assert_eq!(preview.rows[0], vec!["2024-01-01", "101.5", "1"]);
    }

    #[tokio::test]
    async fn test_malformed_csv_is_a_parse_error() {
        let store = MemoryStore::new()
            .with_file("FAUJI_Processed_Data.csv", "a,b\n1,2\n3,4,5\n");

        let err = service(store)
            .preview(&DatasetId::new("FAUJI"))
            .await
            .unwrap_err();

        assert!(matches!(err, ArtifactError::Parse { .. }));
        assert!(err.to_string().starts_with("Error reading CSV file:"));
    }
}
