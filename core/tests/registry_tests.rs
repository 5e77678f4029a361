// snapcart/core/tests/registry_tests.rs
mod common;

use common::*;
use flow::{ContextData, FlowError, Flows, Pipeline, PipelineControl, PipelineResult};

#[derive(Debug, Default)]
struct LoginCtx {
  token: Option<String>,
}

#[derive(Debug, Default)]
struct CartCtx {
  quantity: i32,
}

#[tokio::test]
async fn dispatches_by_context_type() {
  setup_tracing();
  let flows = Flows::<TestError>::new();

  let mut login = Pipeline::<LoginCtx, TestError>::new(&[("issue_token", false, None)]);
  login.on_root("issue_token", |ctx: ContextData<LoginCtx>| {
    Box::pin(async move {
      ctx.write().token = Some("t-1".to_string());
      Ok::<_, TestError>(PipelineControl::Continue)
    })
  });
  flows.register_pipeline(login);

  let mut cart = Pipeline::<CartCtx, FlowError>::new(&[("bump", false, None)]);
  cart.on_root("bump", |ctx: ContextData<CartCtx>| {
    Box::pin(async move {
      ctx.write().quantity += 2;
      Ok::<_, FlowError>(PipelineControl::Continue)
    })
  });
  flows.register_pipeline(cart);

  assert_eq!(flows.len(), 2);
  assert!(flows.is_registered::<LoginCtx>());

  let login_ctx = ContextData::new(LoginCtx::default());
  assert_eq!(flows.run(login_ctx.clone()).await, Ok(PipelineResult::Completed));
  assert_eq!(login_ctx.read().token.as_deref(), Some("t-1"));

  let cart_ctx = ContextData::new(CartCtx::default());
  assert_eq!(flows.run(cart_ctx.clone()).await, Ok(PipelineResult::Completed));
  assert_eq!(cart_ctx.read().quantity, 2);
}

#[tokio::test]
async fn unregistered_context_type_is_an_error() {
  setup_tracing();
  let flows = Flows::<TestError>::new();
  assert!(flows.is_empty());

  match flows.run(ContextData::new(CartCtx::default())).await {
    Err(TestError::Flow(msg)) => {
      assert!(msg.contains("NotRegistered"));
      assert!(msg.contains("CartCtx"));
    }
    other => panic!("expected NotRegistered, got {:?}", other),
  }
}

#[tokio::test]
async fn re_registering_replaces_previous_pipeline() {
  setup_tracing();
  let flows = Flows::<TestError>::new();

  for amount in [1, 7] {
    let mut p = Pipeline::<DraftContext, TestError>::new(&[("add", false, None)]);
    p.on_root("add", add_amount("add", amount));
    flows.register_pipeline(p);
  }

  let ctx = ContextData::new(DraftContext::default());
  flows.run(ctx.clone()).await.unwrap();
  assert_eq!(flows.len(), 1);
  assert_eq!(ctx.read().total_paise, 7);
}

#[tokio::test]
async fn stop_result_passes_through_registry() {
  setup_tracing();
  let flows = Flows::<TestError>::new();
  let mut p = Pipeline::<DraftContext, TestError>::new(&[("a", false, None), ("b", false, None)]);
  p.on_root("a", add_amount("a", 1));
  p.on_root("b", add_amount("b", 1));
  flows.register_pipeline(p);

  let ctx = ContextData::new(DraftContext {
    stop_at: Some("a".to_string()),
    ..Default::default()
  });
  assert_eq!(flows.run(ctx.clone()).await, Ok(PipelineResult::Stopped));
  assert_eq!(ctx.read().trail, vec!["a"]);
}
