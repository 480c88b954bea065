// Filesystem artifact store rooted at the configured directory
use crate::application::artifact_store::ArtifactStore;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn locate(&self, name: &Path) -> PathBuf {
        self.root.join(name)
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn exists(&self, name: &Path) -> bool {
        let path = self.locate(name);
        match tokio::fs::try_exists(&path).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!("Could not check {}: {}", path.display(), e);
                false
            }
        }
    }

    async fn read_bytes(&self, name: &Path) -> std::io::Result<Vec<u8>> {
        tokio::fs::read(self.locate(name)).await
    }

    async fn read_text(&self, name: &Path) -> std::io::Result<String> {
        tokio::fs::read_to_string(self.locate(name)).await
    }
}
