// snapcart/core/src/error.rs

use thiserror::Error;

/// Errors raised by the pipeline machinery itself.
///
/// Pipelines carry their own handler error type; it must be constructible from
/// `FlowError` so configuration problems surface through the same channel.
#[derive(Debug, Error)]
pub enum FlowError {
  #[error("step not found: {step_name}")]
  StepNotFound { step_name: String },

  #[error("non-optional step '{step_name}' has no handlers")]
  HandlerMissing { step_name: String },

  #[error("context type mismatch, expected {expected_type}")]
  TypeMismatch { expected_type: String },

  #[error("no pipeline registered for context type {type_name}")]
  NotRegistered { type_name: String },

  #[error("handler failed: {source}")]
  Handler {
    #[source]
    source: anyhow::Error,
  },

  #[error("internal flow error: {0}")]
  Internal(String),
}

impl From<anyhow::Error> for FlowError {
  fn from(source: anyhow::Error) -> Self {
    FlowError::Handler { source }
  }
}

pub type FlowResult<T, E = FlowError> = std::result::Result<T, E>;
