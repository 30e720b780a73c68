use bt_core::{Context, ModelTask, ParallelPolicy};
use bt_exec::BtExecutor;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn bench_parallel_conditions(c: &mut Criterion) {
    let conditions = (0..32)
        .map(|i| ModelTask::condition_fn(format!("cond{i}"), |_ctx| true))
        .collect::<Vec<_>>();
    // Repeat keeps the tree alive so every iteration measures a steady-state tick.
    let tree = ModelTask::repeat(ModelTask::parallel(ParallelPolicy::Sequence, conditions));
    let mut exec = BtExecutor::new(tree, Context::new());

    c.bench_function("bt-exec/tick(parallel conditions=32)", |b| {
        b.iter(|| {
            black_box(exec.tick().ok());
        })
    });
}

fn bench_dynamic_priority(c: &mut Criterion) {
    let ctx = Context::new();
    ctx.set_variable("alarm", false);
    let children = (0..8)
        .map(|i| {
            let guard = ModelTask::condition_fn(format!("guard{i}"), move |ctx| {
                i == 7 || ctx.get::<bool>("alarm").unwrap_or(false)
            });
            ModelTask::guarded(&ModelTask::wait(u32::MAX), guard)
        })
        .collect::<Vec<_>>();
    let tree = ModelTask::dynamic_priority_list(children);
    let mut exec = BtExecutor::new(tree, ctx);

    c.bench_function("bt-exec/tick(dynamic priority guards=8)", |b| {
        b.iter(|| {
            black_box(exec.tick().ok());
        })
    });
}

criterion_group!(benches, bench_parallel_conditions, bench_dynamic_priority);
criterion_main!(benches);
