// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod csv_preview;
pub mod fs_store;
pub mod html;
pub mod joblib_arrays;
pub mod pickle_validator;
