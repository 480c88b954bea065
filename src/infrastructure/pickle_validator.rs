// Python pickle model validation
use crate::application::model_validator::{ModelValidator, ValidationError};
use crate::domain::loaded::ModelSummary;
use crate::infrastructure::joblib_arrays::strip_inline_arrays;
use serde_pickle::{DeOptions, Value};

/// Validates pickled models (`.pkl`, written by `pickle.dump` or an uncompressed `joblib.dump`).
///
/// Array buffers joblib writes between opcodes are cut out first. Class references
/// such as estimator types cannot be resolved outside Python, so they are replaced
/// with `None` instead of failing the load. Truncated or corrupt streams, unsupported
/// opcodes and compressed joblib archives still fail.
#[derive(Debug, Clone, Default)]
pub struct PickleModelValidator;

impl PickleModelValidator {
    pub fn new() -> Self {
        Self
    }
}

impl ModelValidator for PickleModelValidator {
    fn validate(&self, bytes: &[u8]) -> Result<ModelSummary, ValidationError> {
        let stream = strip_inline_arrays(bytes).map_err(|e| ValidationError(e.to_string()))?;

        let options = DeOptions::new().replace_unresolved_globals();
        let value = serde_pickle::value_from_slice(&stream, options)
            .map_err(|e| ValidationError(e.to_string()))?;

        Ok(ModelSummary {
            size_bytes: bytes.len(),
            root_kind: root_kind(&value),
        })
    }
}

fn root_kind(value: &Value) -> &'static str {
    match value {
        Value::None => "None",
        Value::Bool(_) => "bool",
        Value::I64(_) | Value::Int(_) => "int",
        Value::F64(_) => "float",
        Value::Bytes(_) => "bytes",
        Value::String(_) => "str",
        Value::List(_) => "list",
        Value::Tuple(_) => "tuple",
        Value::Set(_) => "set",
        Value::FrozenSet(_) => "frozenset",
        Value::Dict(_) => "dict",
    }
}
