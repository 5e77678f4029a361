// snapcart/core/src/pipeline/hooks.rs

//! Handler registration. User closures return any future whose error converts
//! into the pipeline's `Err`; they are boxed into [`Handler`]s here.

use crate::core::context_data::ContextData;
use crate::core::control::PipelineControl;
use crate::core::handler::Handler;
use crate::error::FlowError;
use crate::pipeline::definition::Pipeline;
use std::future::Future;
use tracing::{event, Level};

/// Which handler list of a step a handler lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
  Before,
  On,
  After,
}

impl Phase {
  pub(crate) fn label(self) -> &'static str {
    match self {
      Phase::Before => "before",
      Phase::On => "on",
      Phase::After => "after",
    }
  }
}

fn box_handler<TData, Err, F, E>(handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static) -> Handler<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: 'static,
  F: Future<Output = Result<PipelineControl, E>> + Send + 'static,
  E: Into<Err> + 'static,
{
  Box::new(move |ctx_data| {
    let fut = handler_fn(ctx_data);
    Box::pin(async move { fut.await.map_err(Into::into) })
  })
}

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  fn push_handler(&mut self, phase: Phase, step_name: &str, handler: Handler<TData, Err>) {
    self.ensure_step_exists(step_name);
    let map = match phase {
      Phase::Before => &mut self.before,
      Phase::On => &mut self.on,
      Phase::After => &mut self.after,
    };
    let list = map.entry(step_name.to_string()).or_default();
    list.push(handler);
    event!(Level::TRACE, step_name, phase = phase.label(), handlers = list.len(), "Handler registered.");
  }

  /// Adds a handler that runs before the step's `on` handlers.
  pub fn before_root<F, E>(&mut self, step_name: &str, handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static)
  where
    F: Future<Output = Result<PipelineControl, E>> + Send + 'static,
    E: Into<Err> + 'static,
  {
    self.push_handler(Phase::Before, step_name, box_handler(handler_fn));
  }

  /// Adds a main handler for the step.
  pub fn on_root<F, E>(&mut self, step_name: &str, handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static)
  where
    F: Future<Output = Result<PipelineControl, E>> + Send + 'static,
    E: Into<Err> + 'static,
  {
    self.push_handler(Phase::On, step_name, box_handler(handler_fn));
  }

  /// Adds a handler that runs after the step's `on` handlers.
  pub fn after_root<F, E>(&mut self, step_name: &str, handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static)
  where
    F: Future<Output = Result<PipelineControl, E>> + Send + 'static,
    E: Into<Err> + 'static,
  {
    self.push_handler(Phase::After, step_name, box_handler(handler_fn));
  }
}
