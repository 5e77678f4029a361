// snapcart/core/src/pipeline/execution.rs

use crate::core::context_data::ContextData;
use crate::core::control::{PipelineControl, PipelineResult};
use crate::core::handler::Handler;
use crate::core::step::StepDef;
use crate::error::FlowError;
use crate::pipeline::definition::Pipeline;
use crate::pipeline::hooks::Phase;
use tracing::{event, instrument, Instrument, Level};

/// Outcome of one step.
enum StepOutcome<Err> {
  Continue,
  Stop,
  Failed(Err),
}

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Runs every step in order against `ctx_data`.
  ///
  /// - a step whose `skip_if` answers `true` is skipped;
  /// - `before`, `on` and `after` handlers run in that order;
  /// - [`PipelineControl::Stop`] ends the run with [`PipelineResult::Stopped`];
  /// - a non-optional step with no handlers fails with [`FlowError::HandlerMissing`];
  /// - a failing handler aborts the run, unless its step is optional, in which
  ///   case the error is logged and the next step runs.
  #[instrument(
    name = "Pipeline::run",
    skip_all,
    fields(context_type = %std::any::type_name::<TData>(), steps = self.steps.len()),
    err(Display)
  )]
  pub async fn run(&self, ctx_data: ContextData<TData>) -> Result<PipelineResult, Err> {
    event!(Level::DEBUG, "Pipeline run starting.");

    for (index, step) in self.steps.iter().enumerate() {
      let span = tracing::info_span!("pipeline_step", step_name = %step.name, step_index = index, optional = step.optional);
      let outcome = self.run_step(step, ctx_data.clone()).instrument(span).await;

      match outcome {
        StepOutcome::Continue => {}
        StepOutcome::Stop => {
          event!(Level::INFO, step_name = %step.name, "Pipeline stopped by handler.");
          return Ok(PipelineResult::Stopped);
        }
        StepOutcome::Failed(err) if step.optional => {
          event!(Level::WARN, step_name = %step.name, error = %err, "Optional step failed, continuing.");
        }
        StepOutcome::Failed(err) => return Err(err),
      }
    }

    event!(Level::DEBUG, "Pipeline run completed.");
    Ok(PipelineResult::Completed)
  }

  async fn run_step(&self, step: &StepDef<TData>, ctx_data: ContextData<TData>) -> StepOutcome<Err> {
    if let Some(skip_if) = &step.skip_if {
      if skip_if(ctx_data.clone()) {
        event!(Level::DEBUG, "Step skipped by condition.");
        return StepOutcome::Continue;
      }
    }

    let phases: [(Phase, Option<&Vec<Handler<TData, Err>>>); 3] = [
      (Phase::Before, self.before.get(&step.name)),
      (Phase::On, self.on.get(&step.name)),
      (Phase::After, self.after.get(&step.name)),
    ];

    let handler_count: usize = phases.iter().map(|(_, h)| h.map_or(0, Vec::len)).sum();
    if handler_count == 0 {
      if step.optional {
        event!(Level::DEBUG, "Optional step has no handlers.");
        return StepOutcome::Continue;
      }
      event!(Level::ERROR, "Non-optional step has no handlers.");
      return StepOutcome::Failed(Err::from(FlowError::HandlerMissing {
        step_name: step.name.clone(),
      }));
    }

    for (phase, handlers) in phases {
      let Some(handlers) = handlers else { continue };
      for (handler_index, handler) in handlers.iter().enumerate() {
        match handler(ctx_data.clone()).await {
          Ok(PipelineControl::Continue) => {}
          Ok(PipelineControl::Stop) => {
            event!(Level::DEBUG, phase = phase.label(), handler_index, "Handler requested stop.");
            return StepOutcome::Stop;
          }
          Err(err) => {
            event!(Level::DEBUG, phase = phase.label(), handler_index, error = %err, "Handler failed.");
            return StepOutcome::Failed(err);
          }
        }
      }
    }
    StepOutcome::Continue
  }
}
