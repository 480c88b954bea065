// Validation seam for serialized models
use crate::domain::loaded::ModelSummary;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

/// Checks that a serialized model can be loaded.
///
/// The loaded object is discarded; the dashboard never runs inference. The only
/// contract is that the bytes deserialize, so an incompatible export shows up as
/// an error before its dashboard is displayed.
pub trait ModelValidator: Send + Sync {
    fn validate(&self, bytes: &[u8]) -> Result<ModelSummary, ValidationError>;
}
