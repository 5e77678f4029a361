// snapcart/core/tests/common/mod.rs
#![allow(dead_code)]

use flow::{ContextData, FlowError, Handler, PipelineControl};
use once_cell::sync::Lazy;
use tracing::Level;

/// Context used across the pipeline tests: a tiny order draft.
#[derive(Clone, Debug, Default)]
pub struct DraftContext {
  pub total_paise: i64,
  pub notes: String,
  pub trail: Vec<String>,
  pub stop_at: Option<String>,
  pub express: bool,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TestError {
  #[error("flow: {0}")]
  Flow(String),

  #[error("handler: {0}")]
  Handler(String),
}

impl From<FlowError> for TestError {
  fn from(err: FlowError) -> Self {
    TestError::Flow(format!("{:?}", err))
  }
}

/// Adds `amount` to the draft total and records `label` in the trail.
pub fn add_amount(label: &'static str, amount: i64) -> Handler<DraftContext, TestError> {
  Box::new(move |ctx: ContextData<DraftContext>| {
    Box::pin(async move {
      let mut guard = ctx.write();
      guard.total_paise += amount;
      guard.trail.push(label.to_string());
      if guard.stop_at.as_deref() == Some(label) {
        return Ok(PipelineControl::Stop);
      }
      Ok(PipelineControl::Continue)
    })
  })
}

/// Records `label` and fails with `message`.
pub fn fail_with(label: &'static str, message: &'static str) -> Handler<DraftContext, TestError> {
  Box::new(move |ctx: ContextData<DraftContext>| {
    Box::pin(async move {
      ctx.write().trail.push(label.to_string());
      Err(TestError::Handler(message.to_string()))
    })
  })
}

static TRACING: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING);
}
