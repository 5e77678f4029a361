// snapcart/core/src/core/control.rs

/// Verdict returned by every handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineControl {
  /// Run the next handler, phase or step.
  Continue,
  /// Halt the whole pipeline. Nothing after the current handler runs.
  Stop,
}

/// How a pipeline run ended when no handler failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineResult {
  /// Every step that was not skipped ran to the end.
  Completed,
  /// A handler returned [`PipelineControl::Stop`].
  Stopped,
}
