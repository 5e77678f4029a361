// snapcart/core/src/core/handler.rs

use crate::core::context_data::ContextData;
use crate::core::control::PipelineControl;
use std::future::Future;
use std::pin::Pin;

/// Boxed future produced by a [`Handler`].
pub type HandlerFuture<Err> = Pin<Box<dyn Future<Output = Result<PipelineControl, Err>> + Send>>;

/// A step handler after registration.
///
/// Handlers receive their own clone of the context handle. A handler must drop
/// any guard it took from [`ContextData::read`] or [`ContextData::write`]
/// before its first `.await`.
pub type Handler<TData, Err> = Box<dyn Fn(ContextData<TData>) -> HandlerFuture<Err> + Send + Sync>;
