// snapcart/core/src/registry.rs

//! `Flows<E>`: pipelines looked up by the type of context they run on.

use crate::core::context_data::ContextData;
use crate::core::control::PipelineResult;
use crate::error::FlowError;
use crate::pipeline::Pipeline;

use async_trait::async_trait;
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{event, instrument, Level};

/// Object-safe view of a `Pipeline<TData, PErr>` that returns the registry's error type.
#[async_trait]
trait ErasedPipeline<AppErr>: Send + Sync
where
  AppErr: std::error::Error + Send + Sync + 'static,
{
  async fn run_erased(&self, ctx: Box<dyn Any + Send>) -> Result<PipelineResult, AppErr>;
}

struct TypedPipeline<TData, PErr, AppErr>
where
  TData: 'static + Send + Sync,
  PErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pipeline: Pipeline<TData, PErr>,
  _app_err: PhantomData<fn() -> AppErr>,
}

#[async_trait]
impl<TData, PErr, AppErr> ErasedPipeline<AppErr> for TypedPipeline<TData, PErr, AppErr>
where
  TData: 'static + Send + Sync,
  PErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
  AppErr: std::error::Error + From<PErr> + From<FlowError> + Send + Sync + 'static,
{
  async fn run_erased(&self, ctx: Box<dyn Any + Send>) -> Result<PipelineResult, AppErr> {
    let ctx_data = match ctx.downcast::<ContextData<TData>>() {
      Ok(boxed) => *boxed,
      Err(_) => {
        let expected_type = std::any::type_name::<ContextData<TData>>().to_string();
        event!(Level::ERROR, %expected_type, "Registry handed a context of the wrong type.");
        return Err(AppErr::from(FlowError::TypeMismatch { expected_type }));
      }
    };
    self.pipeline.run(ctx_data).await.map_err(AppErr::from)
  }
}

/// Registry of pipelines, one per context type.
///
/// `AppErr` is what [`Flows::run`] returns. Each registered pipeline may use its
/// own handler error type as long as it converts into `AppErr`.
pub struct Flows<AppErr = FlowError>
where
  AppErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pipelines: RwLock<HashMap<TypeId, Arc<dyn ErasedPipeline<AppErr>>>>,
}

impl<AppErr> Default for Flows<AppErr>
where
  AppErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  fn default() -> Self {
    Self::new()
  }
}

impl<AppErr> Flows<AppErr>
where
  AppErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub fn new() -> Self {
    Self {
      pipelines: RwLock::new(HashMap::new()),
    }
  }

  /// Registers `pipeline` for `TData`, replacing any earlier registration.
  pub fn register_pipeline<TData, PErr>(&self, pipeline: Pipeline<TData, PErr>)
  where
    TData: 'static + Send + Sync,
    PErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
    AppErr: From<PErr>,
  {
    let type_name = std::any::type_name::<TData>();
    let runner = TypedPipeline::<TData, PErr, AppErr> {
      pipeline,
      _app_err: PhantomData,
    };
    let replaced = self
      .pipelines
      .write()
      .insert(TypeId::of::<TData>(), Arc::new(runner))
      .is_some();
    event!(Level::DEBUG, context_type = %type_name, replaced, "Pipeline registered.");
  }

  pub fn is_registered<TData: 'static + Send + Sync>(&self) -> bool {
    self.pipelines.read().contains_key(&TypeId::of::<TData>())
  }

  pub fn len(&self) -> usize {
    self.pipelines.read().len()
  }

  pub fn is_empty(&self) -> bool {
    self.pipelines.read().is_empty()
  }

  /// Runs the pipeline registered for `TData`. The caller keeps its own clone of
  /// `ctx_data` to read results afterwards.
  #[instrument(name = "Flows::run", skip_all, fields(context_type = %std::any::type_name::<TData>()))]
  pub async fn run<TData>(&self, ctx_data: ContextData<TData>) -> Result<PipelineResult, AppErr>
  where
    TData: 'static + Send + Sync,
  {
    let runner = self.pipelines.read().get(&TypeId::of::<TData>()).cloned();
    let Some(runner) = runner else {
      let type_name = std::any::type_name::<TData>().to_string();
      event!(Level::ERROR, %type_name, "No pipeline registered.");
      return Err(AppErr::from(FlowError::NotRegistered { type_name }));
    };
    runner.run_erased(Box::new(ctx_data)).await
  }
}
