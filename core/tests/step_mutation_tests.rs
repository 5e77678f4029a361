// snapcart/core/tests/step_mutation_tests.rs
mod common;

use common::*;
use flow::{ContextData, Pipeline, PipelineResult};
use std::sync::Arc;

#[tokio::test]
async fn inserted_steps_take_their_position() {
  setup_tracing();
  let mut p = Pipeline::<DraftContext, TestError>::new(&[("subtotal", false, None), ("shipping", false, None)]);
  p.insert_before_step("subtotal", "load_cart", false, None);
  p.insert_after_step("subtotal", "offers", false, None);

  assert_eq!(p.step_names(), vec!["load_cart", "subtotal", "offers", "shipping"]);

  p.on_root("load_cart", add_amount("load_cart", 0));
  p.on_root("subtotal", add_amount("subtotal", 1_000));
  p.on_root("offers", add_amount("offers", -100));
  p.on_root("shipping", add_amount("shipping", 40));

  let ctx = ContextData::new(DraftContext::default());
  p.run(ctx.clone()).await.unwrap();
  assert_eq!(ctx.read().trail, vec!["load_cart", "subtotal", "offers", "shipping"]);
  assert_eq!(ctx.read().total_paise, 940);
}

#[tokio::test]
async fn removed_step_drops_its_handlers() {
  setup_tracing();
  let mut p = Pipeline::<DraftContext, TestError>::new(&[("subtotal", false, None), ("shipping", false, None)]);
  p.on_root("subtotal", add_amount("subtotal", 10));
  p.on_root("shipping", add_amount("shipping", 40));
  p.remove_step("shipping");
  p.remove_step("does_not_exist");

  assert!(!p.has_step("shipping"));
  let ctx = ContextData::new(DraftContext::default());
  p.run(ctx.clone()).await.unwrap();
  assert_eq!(ctx.read().total_paise, 10);
}

#[tokio::test]
async fn optional_flag_and_skip_condition_can_be_changed() {
  setup_tracing();
  let mut p = Pipeline::<DraftContext, TestError>::new(&[("notify", false, None), ("express", false, None)]);
  p.set_optional("notify", true);
  p.on_root("express", add_amount("express", 99));
  p.set_skip_condition("express", Some(Arc::new(|ctx: ContextData<DraftContext>| !ctx.read().express)));

  let ctx = ContextData::new(DraftContext::default());
  assert_eq!(p.run(ctx.clone()).await, Ok(PipelineResult::Completed));
  assert_eq!(ctx.read().total_paise, 0);

  let ctx = ContextData::new(DraftContext {
    express: true,
    ..Default::default()
  });
  p.run(ctx.clone()).await.unwrap();
  assert_eq!(ctx.read().total_paise, 99);
}

#[test]
#[should_panic(expected = "step not found")]
fn registering_on_unknown_step_panics() {
  let mut p = Pipeline::<DraftContext, TestError>::new(&[("subtotal", false, None)]);
  p.on_root("subtotl", add_amount("typo", 1));
}

#[test]
#[should_panic(expected = "declared twice")]
fn duplicate_step_names_panic() {
  let _ = Pipeline::<DraftContext, TestError>::new(&[("subtotal", false, None), ("subtotal", true, None)]);
}
