// snapcart/core/src/lib.rs

//! Step pipelines for the Snapcart API.
//!
//! A [`Pipeline`] is an ordered list of named steps. Each step owns up to three
//! handler lists (`before`, `on`, `after`) that receive a shared
//! [`ContextData`] and answer with a [`PipelineControl`]. Pipelines are stored
//! in a [`Flows`] registry keyed by their context type, so an HTTP handler only
//! needs to build a context value and call [`Flows::run`].
//!
//! ```ignore
//! let mut p = Pipeline::<SignupCtx, AppError>::new(&[
//!   ("validate", false, None),
//!   ("persist", false, None),
//!   ("welcome_email", true, None),
//! ]);
//! p.on_root("validate", |ctx| Box::pin(async move { /* ... */ Ok::<_, AppError>(PipelineControl::Continue) }));
//! flows.register_pipeline(p);
//! flows.run(ContextData::new(signup_ctx)).await?;
//! ```

pub mod core;
pub mod error;
pub mod pipeline;
pub mod registry;

pub use crate::core::context_data::ContextData;
pub use crate::core::control::{PipelineControl, PipelineResult};
pub use crate::core::handler::Handler;
pub use crate::core::step::{SkipCondition, StepDef};
pub use crate::error::{FlowError, FlowResult};
pub use crate::pipeline::Pipeline;
pub use crate::registry::Flows;
