// Store trait for artifact file access
use async_trait::async_trait;
use std::path::Path;

#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Whether an artifact with this relative name is present
    async fn exists(&self, name: &Path) -> bool;

    /// Read raw bytes (serialized models, CSV files)
    async fn read_bytes(&self, name: &Path) -> std::io::Result<Vec<u8>>;

    /// Read a UTF-8 text file (dashboards)
    async fn read_text(&self, name: &Path) -> std::io::Result<String>;
}
