// snapcart/core/benches/flow_benchmarks.rs
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use flow::{ContextData, FlowError, Flows, Handler, Pipeline, PipelineControl, SkipCondition};
use std::sync::Arc;
use tokio::runtime::Runtime;

#[derive(Clone, Debug, Default)]
struct QuoteContext {
  lines: u64,
  total_paise: i64,
}

fn add_line_handler(price_paise: i64) -> Handler<QuoteContext, FlowError> {
  Box::new(move |ctx: ContextData<QuoteContext>| {
    Box::pin(async move {
      let mut quote = ctx.write();
      quote.lines += 1;
      quote.total_paise += price_paise;
      Ok(PipelineControl::Continue)
    })
  })
}

fn leaked_step_names(count: usize) -> Vec<&'static str> {
  (0..count)
    .map(|i| Box::leak(format!("line_{}", i).into_boxed_str()) as &'static str)
    .collect()
}

fn build_pipeline(steps: usize, skip_every_other: bool) -> Pipeline<QuoteContext, FlowError> {
  let names = leaked_step_names(steps);
  let defs: Vec<(&str, bool, Option<SkipCondition<QuoteContext>>)> = names
    .iter()
    .enumerate()
    .map(|(i, name)| {
      let skip: Option<SkipCondition<QuoteContext>> = if skip_every_other && i % 2 == 1 {
        Some(Arc::new(|_ctx: ContextData<QuoteContext>| true))
      } else {
        None
      };
      (*name, skip.is_some(), skip)
    })
    .collect();
  let mut pipeline = Pipeline::new(&defs);
  for name in names {
    pipeline.on_root(name, add_line_handler(9_900));
  }
  pipeline
}

fn bench_pipeline_steps(c: &mut Criterion) {
  let mut group = c.benchmark_group("PipelineSteps");
  let rt = Runtime::new().unwrap();

  for steps in [1usize, 5, 20] {
    for skip in [false, true] {
      let pipeline = Arc::new(build_pipeline(steps, skip));
      group.throughput(Throughput::Elements(steps as u64));
      group.bench_with_input(
        BenchmarkId::new(if skip { "half_skipped" } else { "all_run" }, steps),
        &steps,
        |b, _| {
          b.to_async(&rt).iter_batched(
            || ContextData::new(QuoteContext::default()),
            |ctx| {
              let p = pipeline.clone();
              async move { p.run(ctx).await.unwrap() }
            },
            criterion::BatchSize::SmallInput,
          );
        },
      );
    }
  }
  group.finish();
}

fn bench_context_access(c: &mut Criterion) {
  let mut group = c.benchmark_group("ContextAccess");
  let ctx = ContextData::new(QuoteContext::default());

  group.bench_function("snapshot", |b| b.iter(|| criterion::black_box(ctx.snapshot(|q| q.total_paise))));
  group.bench_function("update", |b| {
    b.iter(|| {
      ctx.update(|q| q.total_paise += 1);
    })
  });
  group.finish();
}

fn bench_registry_dispatch(c: &mut Criterion) {
  let mut group = c.benchmark_group("RegistryDispatch");
  let rt = Runtime::new().unwrap();

  let flows = Arc::new(Flows::<FlowError>::new());
  flows.register_pipeline(build_pipeline(3, false));

  group.throughput(Throughput::Elements(1));
  group.bench_function("quote_context", |b| {
    b.to_async(&rt).iter_batched(
      || ContextData::new(QuoteContext::default()),
      |ctx| {
        let flows = flows.clone();
        async move { flows.run(ctx).await.unwrap() }
      },
      criterion::BatchSize::SmallInput,
    );
  });
  group.finish();
}

criterion_group!(benches, bench_pipeline_steps, bench_context_access, bench_registry_dispatch);
criterion_main!(benches);
