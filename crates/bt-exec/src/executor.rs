use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use bt_core::rng::derive_seed;
use bt_core::{
    Context, ExecutorConfig, InterrupterId, ModelRef, Position, Result, SplitMix64, Status,
    TaskState,
};

use crate::arena::{Arena, TaskId};
use crate::task::ExecutionTask;
use crate::trace::{TraceEvent, TraceSink};

/// The two bookkeeping lists of an executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskList {
    /// Tasks ticked on every executor tick.
    Tickable,
    /// Tasks currently spawned and not yet finished or terminated.
    Open,
}

/// Requested list mutations, applied only between ticking passes.
#[derive(Debug, Default)]
struct PendingMutations {
    tickable_insertions: BTreeSet<TaskId>,
    tickable_removals: BTreeSet<TaskId>,
    open_insertions: BTreeSet<TaskId>,
    open_removals: BTreeSet<TaskId>,
}

impl PendingMutations {
    fn insertions(&mut self, list: TaskList) -> &mut BTreeSet<TaskId> {
        match list {
            TaskList::Tickable => &mut self.tickable_insertions,
            TaskList::Open => &mut self.open_insertions,
        }
    }

    fn removals(&mut self, list: TaskList) -> &mut BTreeSet<TaskId> {
        match list {
            TaskList::Tickable => &mut self.tickable_removals,
            TaskList::Open => &mut self.open_removals,
        }
    }

    fn is_empty(&self) -> bool {
        self.tickable_insertions.is_empty()
            && self.tickable_removals.is_empty()
            && self.open_insertions.is_empty()
            && self.open_removals.is_empty()
    }
}

type TaskStateTable = Rc<RefCell<BTreeMap<Position, TaskState>>>;

/// Scheduler driving one behaviour tree.
///
/// The first [`BtExecutor::tick`] spawns the root task; every later tick
/// ticks the tasks registered as tickable. Insertions into and removals from
/// the tickable/open lists requested while ticking are queued and applied
/// before and after the ticking pass, so every task sees the same list for
/// the whole tick.
pub struct BtExecutor {
    tree: ModelRef,
    context: Context,
    config: ExecutorConfig,
    pub(crate) tasks: Arena<ExecutionTask>,
    root: Option<TaskId>,
    tickable: BTreeSet<TaskId>,
    open: BTreeSet<TaskId>,
    pending: PendingMutations,
    interrupters: BTreeMap<InterrupterId, TaskId>,
    states: TaskStateTable,
    rng: SplitMix64,
    ticks: u64,
    terminated: bool,
    trace: Option<Box<dyn TraceSink>>,
}

impl BtExecutor {
    pub fn new(tree: ModelRef, context: Context) -> Self {
        Self::with_config(tree, context, ExecutorConfig::default())
    }

    pub fn with_config(tree: ModelRef, context: Context, config: ExecutorConfig) -> Self {
        Self {
            tree,
            context,
            rng: SplitMix64::new(config.seed),
            config,
            tasks: Arena::default(),
            root: None,
            tickable: BTreeSet::new(),
            open: BTreeSet::new(),
            pending: PendingMutations::default(),
            interrupters: BTreeMap::new(),
            states: TaskStateTable::default(),
            ticks: 0,
            terminated: false,
            trace: None,
        }
    }

    /// Record lifecycle transitions into `sink`.
    pub fn with_trace_sink(mut self, sink: impl TraceSink + 'static) -> Self {
        self.trace = Some(Box::new(sink));
        self
    }

    /// Executor for a guard subtree evaluated on behalf of the task at `owner`.
    pub(crate) fn nested(&self, guard: ModelRef, context: Context, owner: &Position, stream: u64) -> Self {
        let seed = derive_seed(self.config.seed, owner.digest(), stream);
        Self::with_config(guard, context, self.config.with_seed(seed))
    }

    /// Run one scheduling step and return the status of the tree.
    pub fn tick(&mut self) -> Result<Status> {
        let status = self.status();
        if status.is_finished() || status == Status::Terminated {
            return Ok(status);
        }

        self.ticks += 1;
        self.apply_pending();

        match self.root {
            None => {
                let root = self.create_task(self.tree.clone(), None, Position::root());
                self.root = Some(root);
                let context = self.context.clone();
                self.spawn_task(root, context)?;
            }
            Some(_) => {
                let snapshot: Vec<TaskId> = self.tickable.iter().copied().collect();
                for id in snapshot {
                    // Tasks released earlier in this pass are skipped.
                    if self.tasks.contains(id) {
                        self.tick_task(id)?;
                    }
                }
            }
        }

        self.apply_pending();
        Ok(self.status())
    }

    /// Tick until the tree finishes or `max_ticks` ticks have run.
    pub fn run(&mut self, max_ticks: u64) -> Result<Status> {
        for _ in 0..max_ticks {
            let status = self.tick()?;
            if status != Status::Running {
                return Ok(status);
            }
        }
        Ok(self.status())
    }

    /// Terminate the whole tree. Idempotent.
    pub fn terminate(&mut self) -> Result<()> {
        self.terminated = true;
        if let Some(root) = self.root {
            if self.tasks.contains(root) {
                self.terminate_task(root)?;
            }
        }
        self.apply_pending();
        Ok(())
    }

    pub fn status(&self) -> Status {
        match self.root.and_then(|root| self.tasks.get(root)) {
            Some(task) => task.status(),
            None if self.terminated => Status::Terminated,
            None => Status::Uninitialized,
        }
    }

    pub fn root_context(&self) -> &Context {
        &self.context
    }

    pub fn behaviour_tree(&self) -> &ModelRef {
        &self.tree
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn root(&self) -> Option<TaskId> {
        self.root
    }

    /// Number of executor ticks run so far.
    pub fn tick_count(&self) -> u64 {
        self.ticks
    }

    pub fn task(&self, id: TaskId) -> Option<&ExecutionTask> {
        self.tasks.get(id)
    }

    /// Number of live execution tasks (including finished ones not yet released).
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Live task at `position`, if any.
    pub fn task_at(&self, position: &Position) -> Option<TaskId> {
        self.tasks
            .iter()
            .find(|(_, task)| task.position() == position)
            .map(|(id, _)| id)
    }

    pub fn tickable_tasks(&self) -> Vec<TaskId> {
        self.tickable.iter().copied().collect()
    }

    pub fn open_tasks(&self) -> Vec<TaskId> {
        self.open.iter().copied().collect()
    }

    pub fn has_pending_mutations(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn request_insertion_into_list(&mut self, list: TaskList, id: TaskId) {
        self.pending.insertions(list).insert(id);
    }

    pub fn request_removal_from_list(&mut self, list: TaskList, id: TaskId) {
        self.pending.removals(list).insert(id);
    }

    pub fn cancel_insertion_request(&mut self, list: TaskList, id: TaskId) {
        self.pending.insertions(list).remove(&id);
    }

    pub fn cancel_removal_request(&mut self, list: TaskList, id: TaskId) {
        self.pending.removals(list).remove(&id);
    }

    /// Apply queued insertions, then queued removals.
    fn apply_pending(&mut self) {
        let pending = std::mem::take(&mut self.pending);
        self.tickable.extend(pending.tickable_insertions);
        self.open.extend(pending.open_insertions);
        for id in pending.tickable_removals {
            self.tickable.remove(&id);
        }
        for id in pending.open_removals {
            self.open.remove(&id);
        }
    }

    pub fn task_state(&self, position: &Position) -> Option<TaskState> {
        self.states.borrow().get(position).cloned()
    }

    /// Store `state` for `position`; `None` clears it.
    pub fn set_task_state(&mut self, position: Position, state: Option<TaskState>) {
        let mut states = self.states.borrow_mut();
        match state {
            Some(state) => {
                states.insert(position, state);
            }
            None => {
                states.remove(&position);
            }
        }
    }

    pub fn clear_task_state(&mut self, position: &Position) {
        self.states.borrow_mut().remove(position);
    }

    /// Share `other`'s state table from now on.
    pub fn copy_tasks_states(&mut self, other: &BtExecutor) {
        self.states = other.states.clone();
    }

    pub fn shares_task_states_with(&self, other: &BtExecutor) -> bool {
        Rc::ptr_eq(&self.states, &other.states)
    }

    pub fn register_interrupter(&mut self, id: InterrupterId, task: TaskId) {
        self.interrupters.insert(id, task);
    }

    /// Remove `id` from the registry if it still maps to `task`.
    pub fn unregister_interrupter(&mut self, id: &InterrupterId, task: TaskId) {
        if self.interrupters.get(id) == Some(&task) {
            self.interrupters.remove(id);
        }
    }

    pub fn execution_interrupter(&self, id: &InterrupterId) -> Option<TaskId> {
        self.interrupters
            .get(id)
            .copied()
            .filter(|task| self.tasks.contains(*task))
    }

    /// Force the interrupter `task` to resolve to `desired` on its next tick.
    ///
    /// Returns `false` when `task` is not an interrupter or has already finished.
    pub fn interrupt(&mut self, task: TaskId, desired: Status) -> Result<bool> {
        let interrupted = self.with_behaviour(task, |behaviour, exec| {
            behaviour.interrupt(exec, task, desired)
        })?;
        if interrupted {
            self.emit(crate::trace::TAG_INTERRUPT, task);
            tracing::debug!(task = %task, status = %desired, "interrupter forced");
        }
        Ok(interrupted)
    }

    pub(crate) fn rng_mut(&mut self) -> &mut SplitMix64 {
        &mut self.rng
    }

    pub(crate) fn emit(&mut self, tag: &'static str, id: TaskId) {
        let Some(sink) = self.trace.as_mut() else {
            return;
        };
        let Some(task) = self.tasks.get(id) else {
            return;
        };
        sink.emit(TraceEvent::new(
            self.ticks,
            tag,
            task.position().clone(),
            task.status(),
        ));
    }
}

impl std::fmt::Debug for BtExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BtExecutor")
            .field("tree", &self.tree.label())
            .field("status", &self.status())
            .field("ticks", &self.ticks)
            .field("tasks", &self.tasks.len())
            .field("tickable", &self.tickable.len())
            .field("open", &self.open.len())
            .finish()
    }
}
