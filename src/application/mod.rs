// Application layer - Use cases over the artifact store
pub mod artifact_store;
pub mod deploy_service;
pub mod error;
pub mod model_validator;
pub mod preview_service;
pub mod status_service;
