mod common;

use bt_core::{Context, ExecutorConfig, ModelTask, ParallelPolicy, Position, Status};
use bt_exec::trace::TAG_PREEMPT;
use bt_exec::{BtExecutor, TraceLog};
use common::{flag, running, scripted, succeeds, Log};

#[test]
fn dynamic_list_preempts_lower_priority_child() {
    let log = Log::default();
    let ctx = Context::new();
    ctx.set_variable("alarm", false);

    let tree = ModelTask::dynamic_priority_list(vec![
        ModelTask::guarded(&scripted("flee", &log, &[Status::Success]), flag("alarm")),
        running("patrol", &log),
    ]);
    let trace = TraceLog::new();
    let mut exec = BtExecutor::new(tree, ctx.clone()).with_trace_sink(trace.clone());

    // Tick 1 spawns the list, tick 2 evaluates guards and picks the fallback.
    exec.tick().unwrap();
    assert!(log.spawned().is_empty());
    assert_eq!(exec.tick().unwrap(), Status::Running);
    assert_eq!(log.spawned(), ["patrol"]);

    assert_eq!(exec.tick().unwrap(), Status::Running);
    assert_eq!(log.count("tick:patrol"), 1);

    ctx.set_variable("alarm", true);
    assert_eq!(exec.tick().unwrap(), Status::Running);
    assert!(log.contains("abort:patrol"));
    assert_eq!(log.spawned(), ["patrol", "flee"]);
    assert!(exec.task_at(&Position::from_moves(vec![1])).is_none());
    assert!(exec.task_at(&Position::from_moves(vec![0])).is_some());
    assert_eq!(trace.positions_tagged(TAG_PREEMPT), [Position::from_moves(vec![1])]);

    // The next tick reports the new child's result.
    assert_eq!(exec.tick().unwrap(), Status::Success);
    assert_eq!(exec.tick_count(), 5);
}

#[test]
fn dynamic_list_keeps_the_current_child_while_guards_hold() {
    let log = Log::default();
    let ctx = Context::new();
    ctx.set_variable("alarm", true);

    let tree = ModelTask::dynamic_priority_list(vec![
        ModelTask::guarded(&running("flee", &log), flag("alarm")),
        running("patrol", &log),
    ]);
    let mut exec = BtExecutor::new(tree, ctx);
    for _ in 0..6 {
        assert_eq!(exec.tick().unwrap(), Status::Running);
    }
    assert_eq!(log.spawned(), ["flee"]);
    assert_eq!(log.count("tick:flee"), 4);
    assert!(!log.contains("abort:flee"));
}

#[test]
fn dynamic_list_drops_a_child_whose_guard_fails() {
    let log = Log::default();
    let ctx = Context::new();
    ctx.set_variable("a", true);

    let tree = ModelTask::dynamic_priority_list(vec![ModelTask::guarded(
        &running("only", &log),
        flag("a"),
    )]);
    let mut exec = BtExecutor::new(tree, ctx.clone());
    exec.tick().unwrap();
    exec.tick().unwrap();
    assert_eq!(log.spawned(), ["only"]);

    ctx.set_variable("a", false);
    assert_eq!(exec.tick().unwrap(), Status::Failure);
    assert!(log.contains("abort:only"));
}

#[test]
fn guard_still_running_after_its_budget_holds_the_list() {
    let log = Log::default();
    // The guard needs one tick to spawn and three more to resolve.
    let guard = ModelTask::wait(3);
    let tree = ModelTask::dynamic_priority_list(vec![
        ModelTask::guarded(&running("high", &log), guard),
        running("low", &log),
    ]);
    let config = ExecutorConfig::default().with_guard_ticks_per_evaluation(1);
    let mut exec = BtExecutor::with_config(tree, Context::new(), config);

    exec.tick().unwrap();
    exec.tick().unwrap();
    exec.tick().unwrap();
    assert!(log.spawned().is_empty());

    exec.tick().unwrap();
    assert_eq!(log.spawned(), ["high"]);
}

#[test]
fn static_list_commits_to_its_first_choice() {
    let log = Log::default();
    let ctx = Context::new();

    let tree = ModelTask::static_priority_list(vec![
        ModelTask::guarded(&running("flee", &log), flag("alarm")),
        scripted("patrol", &log, &[Status::Running, Status::Success]),
    ]);
    let mut exec = BtExecutor::new(tree, ctx.clone());
    exec.tick().unwrap();
    assert_eq!(exec.tick().unwrap(), Status::Running);
    assert_eq!(log.spawned(), ["patrol"]);

    // Guards are not looked at again once a child runs.
    ctx.set_variable("alarm", true);
    assert_eq!(exec.tick().unwrap(), Status::Running);
    assert_eq!(exec.tick().unwrap(), Status::Success);
    assert_eq!(log.spawned(), ["patrol"]);
}

#[test]
fn static_list_fails_when_every_guard_fails() {
    let log = Log::default();
    let tree = ModelTask::static_priority_list(vec![
        ModelTask::guarded(&running("a", &log), ModelTask::failure()),
        ModelTask::guarded(&running("b", &log), flag("never")),
    ]);
    let mut exec = BtExecutor::new(tree, Context::new());
    assert_eq!(exec.run(10).unwrap(), Status::Failure);
    assert!(log.spawned().is_empty());
}

#[test]
fn guard_state_survives_guard_reevaluation() {
    let log = Log::default();
    // The guard succeeds twice, then its limit is exhausted.
    let guard = ModelTask::limit(2, ModelTask::success());
    let tree = ModelTask::dynamic_priority_list(vec![
        ModelTask::guarded(&running("high", &log), guard),
        running("low", &log),
    ]);
    let mut exec = BtExecutor::new(tree, Context::new());
    exec.run(8).unwrap();

    assert_eq!(log.spawned(), ["high", "low"]);
    assert_eq!(log.count("abort:high"), 1);
}

#[test]
fn finished_dynamic_list_aborts_guards_still_running() {
    let log = Log::default();
    let guard_log = Log::default();
    let tree = ModelTask::dynamic_priority_list(vec![
        succeeds("child0", &log),
        ModelTask::guarded(&running("child1", &log), running("g", &guard_log)),
    ]);
    let mut exec = BtExecutor::new(tree, Context::new());

    assert_eq!(exec.run(10).unwrap(), Status::Success);
    assert_eq!(log.spawned(), ["child0"]);
    assert_eq!(guard_log.entries(), ["spawn:g", "abort:g"]);
}

#[test]
fn failing_dynamic_list_aborts_only_its_child() {
    let log = Log::default();
    let guard_log = Log::default();
    let ctx = Context::new();
    ctx.set_variable("a", true);
    let tree = ModelTask::dynamic_priority_list(vec![ModelTask::guarded(
        &running("only", &log),
        ModelTask::sequence(vec![flag("a"), succeeds("g", &guard_log)]),
    )]);
    let mut exec = BtExecutor::new(tree, ctx.clone());
    exec.tick().unwrap();
    exec.tick().unwrap();
    assert_eq!(log.spawned(), ["only"]);

    ctx.set_variable("a", false);
    assert_eq!(exec.run(10).unwrap(), Status::Failure);
    assert!(log.contains("abort:only"));
    assert!(!guard_log.contains("abort:g"));
}

#[test]
fn losing_its_guard_drops_the_child_without_preemption() {
    let log = Log::default();
    let ctx = Context::new();
    ctx.set_variable("alarm", true);
    let tree = ModelTask::dynamic_priority_list(vec![
        ModelTask::guarded(&running("flee", &log), flag("alarm")),
        running("patrol", &log),
    ]);
    let trace = TraceLog::new();
    let mut exec = BtExecutor::new(tree, ctx.clone()).with_trace_sink(trace.clone());
    exec.tick().unwrap();
    exec.tick().unwrap();
    assert_eq!(log.spawned(), ["flee"]);

    ctx.set_variable("alarm", false);
    assert_eq!(exec.tick().unwrap(), Status::Running);
    assert!(log.contains("abort:flee"));
    assert_eq!(log.spawned(), ["flee", "patrol"]);
    assert!(trace.positions_tagged(TAG_PREEMPT).is_empty());
}

#[test]
fn unresolved_higher_guard_keeps_the_active_child() {
    let log = Log::default();
    let ctx = Context::new();
    // Once "slow" is set the guard runs far longer than one pass.
    let guard = ModelTask::sequence(vec![flag("slow"), ModelTask::wait(1000)]);
    let tree = ModelTask::dynamic_priority_list(vec![
        ModelTask::guarded(&running("high", &log), guard),
        running("low", &log),
    ]);
    let config = ExecutorConfig::default().with_guard_ticks_per_evaluation(1);
    let mut exec = BtExecutor::with_config(tree, ctx.clone(), config);
    exec.tick().unwrap();
    exec.tick().unwrap();
    assert_eq!(log.spawned(), ["low"]);

    ctx.set_variable("slow", true);
    for _ in 0..5 {
        assert_eq!(exec.tick().unwrap(), Status::Running);
    }
    assert_eq!(log.spawned(), ["low"]);
    assert!(!log.contains("abort:low"));
    assert_eq!(log.count("tick:low"), 5);
}

#[test]
fn interrupter_inside_a_guard_resolves_in_the_guard_executor() {
    let log = Log::default();
    let guard_log = Log::default();
    // The guard interrupts its own long-running branch with a success.
    let guard = ModelTask::parallel(
        ParallelPolicy::Sequence,
        vec![
            ModelTask::interrupter("gi", running("gw", &guard_log)),
            ModelTask::sequence(vec![
                ModelTask::wait(1),
                ModelTask::perform_interruption("gi", Status::Success),
            ]),
        ],
    );
    let tree = ModelTask::static_priority_list(vec![
        ModelTask::guarded(&running("body", &log), guard),
        running("fallback", &log),
    ]);
    let mut exec = BtExecutor::new(tree, Context::new());

    exec.tick().unwrap();
    assert_eq!(exec.tick().unwrap(), Status::Running);
    assert_eq!(log.spawned(), ["body"]);
    assert_eq!(guard_log.count("abort:gw"), 1);
    // The guard's interrupter never lived in the outer registry.
    assert!(exec.execution_interrupter(&"gi".into()).is_none());
}
