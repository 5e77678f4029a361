// snapcart/core/src/pipeline/definition.rs

use crate::core::handler::Handler;
use crate::core::step::{SkipCondition, StepDef};
use crate::error::FlowError;
use std::collections::HashMap;

/// Handler lists for each step, keyed by step name.
pub(crate) type HandlerMap<TData, Err> = HashMap<String, Vec<Handler<TData, Err>>>;

/// An ordered set of named steps over the context type `TData`.
///
/// `Err` is what handlers return and what [`Pipeline::run`] reports. It must be
/// buildable from [`FlowError`] so that missing handlers and similar setup
/// mistakes come back through the same type.
pub struct Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub(crate) steps: Vec<StepDef<TData>>,
  pub(crate) before: HandlerMap<TData, Err>,
  pub(crate) on: HandlerMap<TData, Err>,
  pub(crate) after: HandlerMap<TData, Err>,
}

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Builds a pipeline from `(name, optional, skip_if)` tuples.
  ///
  /// Panics on duplicate step names: that is a wiring bug, not a runtime error.
  pub fn new(step_defs: &[(&str, bool, Option<SkipCondition<TData>>)]) -> Self {
    let mut pipeline = Self {
      steps: Vec::with_capacity(step_defs.len()),
      before: HashMap::new(),
      on: HashMap::new(),
      after: HashMap::new(),
    };
    for (name, optional, skip_if) in step_defs {
      pipeline.ensure_step_absent(name);
      pipeline.steps.push(StepDef::new(*name, *optional, skip_if.clone()));
    }
    pipeline
  }

  /// Step names in execution order.
  pub fn step_names(&self) -> Vec<&str> {
    self.steps.iter().map(|s| s.name.as_str()).collect()
  }

  pub fn has_step(&self, step_name: &str) -> bool {
    self.position_of(step_name).is_some()
  }

  fn position_of(&self, step_name: &str) -> Option<usize> {
    self.steps.iter().position(|s| s.name == step_name)
  }

  /// Index of `step_name`, panicking when the step was never declared.
  pub(crate) fn ensure_step_exists(&self, step_name: &str) -> usize {
    match self.position_of(step_name) {
      Some(idx) => idx,
      None => panic!("pipeline setup error: {}", FlowError::StepNotFound { step_name: step_name.to_string() }),
    }
  }

  fn ensure_step_absent(&self, step_name: &str) {
    if self.has_step(step_name) {
      panic!("pipeline setup error: step '{}' is declared twice", step_name);
    }
  }

  pub fn insert_before_step(
    &mut self,
    existing_step: &str,
    new_step: impl Into<String>,
    optional: bool,
    skip_if: Option<SkipCondition<TData>>,
  ) {
    let idx = self.ensure_step_exists(existing_step);
    let name = new_step.into();
    self.ensure_step_absent(&name);
    self.steps.insert(idx, StepDef::new(name, optional, skip_if));
  }

  pub fn insert_after_step(
    &mut self,
    existing_step: &str,
    new_step: impl Into<String>,
    optional: bool,
    skip_if: Option<SkipCondition<TData>>,
  ) {
    let idx = self.ensure_step_exists(existing_step);
    let name = new_step.into();
    self.ensure_step_absent(&name);
    self.steps.insert(idx + 1, StepDef::new(name, optional, skip_if));
  }

  /// Removes a step together with its handlers. Unknown names are ignored.
  pub fn remove_step(&mut self, step_name: &str) {
    if let Some(idx) = self.position_of(step_name) {
      self.steps.remove(idx);
      self.before.remove(step_name);
      self.on.remove(step_name);
      self.after.remove(step_name);
    }
  }

  pub fn set_optional(&mut self, step_name: &str, optional: bool) {
    let idx = self.ensure_step_exists(step_name);
    self.steps[idx].optional = optional;
  }

  pub fn set_skip_condition(&mut self, step_name: &str, skip_if: Option<SkipCondition<TData>>) {
    let idx = self.ensure_step_exists(step_name);
    self.steps[idx].skip_if = skip_if;
  }
}
