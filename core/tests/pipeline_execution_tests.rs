// snapcart/core/tests/pipeline_execution_tests.rs
mod common;

use common::*;
use flow::{ContextData, FlowError, Pipeline, PipelineControl, PipelineResult, SkipCondition};
use serial_test::serial;
use std::sync::Arc;

#[tokio::test]
#[serial]
async fn steps_run_in_declaration_order() {
  setup_tracing();
  let mut p = Pipeline::<DraftContext, TestError>::new(&[
    ("subtotal", false, None),
    ("shipping", false, None),
    ("rounding", false, None),
  ]);
  p.on_root("subtotal", add_amount("subtotal", 1_000));
  p.on_root("shipping", add_amount("shipping", 40));
  p.on_root("rounding", add_amount("rounding", 0));

  let ctx = ContextData::new(DraftContext::default());
  let result = p.run(ctx.clone()).await;

  assert_eq!(result, Ok(PipelineResult::Completed));
  let guard = ctx.read();
  assert_eq!(guard.total_paise, 1_040);
  assert_eq!(guard.trail, vec!["subtotal", "shipping", "rounding"]);
}

#[tokio::test]
#[serial]
async fn stop_halts_remaining_steps() {
  setup_tracing();
  let mut p = Pipeline::<DraftContext, TestError>::new(&[
    ("subtotal", false, None),
    ("shipping", false, None),
    ("rounding", false, None),
  ]);
  p.on_root("subtotal", add_amount("subtotal", 500));
  p.on_root("shipping", add_amount("shipping", 40));
  p.on_root("rounding", add_amount("rounding", 1));

  let ctx = ContextData::new(DraftContext {
    stop_at: Some("shipping".to_string()),
    ..Default::default()
  });
  let result = p.run(ctx.clone()).await;

  assert_eq!(result, Ok(PipelineResult::Stopped));
  assert_eq!(ctx.read().trail, vec!["subtotal", "shipping"]);
  assert_eq!(ctx.read().total_paise, 540);
}

#[tokio::test]
#[serial]
async fn required_step_error_aborts_run() {
  setup_tracing();
  let mut p = Pipeline::<DraftContext, TestError>::new(&[
    ("subtotal", false, None),
    ("reserve_stock", false, None),
    ("shipping", false, None),
  ]);
  p.on_root("subtotal", add_amount("subtotal", 100));
  p.on_root("reserve_stock", fail_with("reserve_stock", "out of stock"));
  p.on_root("shipping", add_amount("shipping", 40));

  let ctx = ContextData::new(DraftContext::default());
  let result = p.run(ctx.clone()).await;

  assert_eq!(result, Err(TestError::Handler("out of stock".to_string())));
  assert_eq!(ctx.read().trail, vec!["subtotal", "reserve_stock"]);
}

#[tokio::test]
#[serial]
async fn optional_step_error_is_logged_and_skipped() {
  setup_tracing();
  let mut p = Pipeline::<DraftContext, TestError>::new(&[
    ("subtotal", false, None),
    ("send_receipt", true, None),
    ("shipping", false, None),
  ]);
  p.on_root("subtotal", add_amount("subtotal", 100));
  p.on_root("send_receipt", fail_with("send_receipt", "mailer down"));
  p.on_root("shipping", add_amount("shipping", 40));

  let ctx = ContextData::new(DraftContext::default());
  let result = p.run(ctx.clone()).await;

  assert_eq!(result, Ok(PipelineResult::Completed));
  assert_eq!(ctx.read().trail, vec!["subtotal", "send_receipt", "shipping"]);
  assert_eq!(ctx.read().total_paise, 140);
}

#[tokio::test]
#[serial]
async fn skip_condition_is_evaluated_against_current_state() {
  setup_tracing();
  let mut p = Pipeline::<DraftContext, TestError>::new(&[
    ("subtotal", false, None),
    (
      "shipping",
      false,
      Some(Arc::new(|ctx: ContextData<DraftContext>| ctx.read().total_paise >= 499) as SkipCondition<DraftContext>),
    ),
  ]);
  p.on_root("subtotal", add_amount("subtotal", 500));
  p.on_root("shipping", add_amount("shipping", 40));

  let ctx = ContextData::new(DraftContext::default());
  assert_eq!(p.run(ctx.clone()).await, Ok(PipelineResult::Completed));
  assert_eq!(ctx.read().total_paise, 500);
  assert_eq!(ctx.read().trail, vec!["subtotal"]);
}

#[tokio::test]
#[serial]
async fn required_step_without_handlers_fails() {
  setup_tracing();
  let p = Pipeline::<DraftContext, TestError>::new(&[("persist", false, None)]);

  let result = p.run(ContextData::new(DraftContext::default())).await;
  match result {
    Err(TestError::Flow(msg)) => {
      assert!(msg.contains("HandlerMissing"));
      assert!(msg.contains("persist"));
    }
    other => panic!("expected HandlerMissing, got {:?}", other),
  }
}

#[tokio::test]
#[serial]
async fn optional_step_without_handlers_is_fine() {
  setup_tracing();
  let p = Pipeline::<DraftContext, TestError>::new(&[("notify", true, None)]);
  let result = p.run(ContextData::new(DraftContext::default())).await;
  assert_eq!(result, Ok(PipelineResult::Completed));
}

#[tokio::test]
#[serial]
async fn phases_run_before_on_after() {
  setup_tracing();
  let mut p = Pipeline::<DraftContext, TestError>::new(&[("price", false, None)]);
  p.after_root("price", add_amount("after", 1));
  p.on_root("price", add_amount("on", 10));
  p.before_root("price", add_amount("before", 100));

  let ctx = ContextData::new(DraftContext::default());
  p.run(ctx.clone()).await.unwrap();
  assert_eq!(ctx.read().trail, vec!["before", "on", "after"]);
  assert_eq!(ctx.read().total_paise, 111);
}

#[tokio::test]
#[serial]
async fn handler_error_type_converts_into_pipeline_error() {
  setup_tracing();
  let mut p = Pipeline::<DraftContext, TestError>::new(&[("fails", false, None)]);
  p.on_root("fails", |_ctx: ContextData<DraftContext>| {
    Box::pin(async move { Err::<PipelineControl, FlowError>(FlowError::Internal("boom".to_string())) })
  });

  match p.run(ContextData::new(DraftContext::default())).await {
    Err(TestError::Flow(msg)) => assert!(msg.contains("boom")),
    other => panic!("expected converted FlowError, got {:?}", other),
  }
}

#[tokio::test]
#[serial]
async fn handlers_see_each_others_writes() {
  setup_tracing();
  let mut p = Pipeline::<DraftContext, TestError>::new(&[("mark", false, None), ("check", false, None)]);
  p.on_root("mark", |ctx: ContextData<DraftContext>| {
    Box::pin(async move {
      ctx.update(|d| d.express = true);
      tokio::task::yield_now().await;
      Ok::<_, TestError>(PipelineControl::Continue)
    })
  });
  p.on_root("check", |ctx: ContextData<DraftContext>| {
    Box::pin(async move {
      if !ctx.snapshot(|d| d.express) {
        return Err(TestError::Handler("express flag lost".to_string()));
      }
      ctx.write().notes.push_str("express");
      Ok(PipelineControl::Continue)
    })
  });

  let ctx = ContextData::new(DraftContext::default());
  assert_eq!(p.run(ctx.clone()).await, Ok(PipelineResult::Completed));
  assert_eq!(ctx.read().notes, "express");
}
