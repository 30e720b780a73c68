use bt_core::{
    BtError, Context, ModelKind, ModelRef, ModelTask, Position, Result, Status, StatusChange,
    TaskState,
};

use crate::arena::TaskId;
use crate::composite::{DynamicPriorityList, ParallelTask, SequentialTask, StaticPriorityList};
use crate::decorator::{InterrupterTask, LimitTask, MappingDecorator, RepeatTask};
use crate::executor::{BtExecutor, TaskList};
use crate::leaf::{
    ConstantLeaf, PerformInterruptionLeaf, SubtreeLookupLeaf, UserLeaf, VariableRenamerLeaf,
    WaitLeaf,
};
use crate::trace::{TAG_FINISH, TAG_SPAWN, TAG_TERMINATE};

/// Whether a task may be spawned, ticked, or neither.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gate {
    Spawnable,
    Tickable,
    Terminated,
}

/// Node-specific half of an execution task.
///
/// The executor owns the generic protocol (gates, list registration, state
/// persistence, parent notification); implementations only describe what
/// their node does when spawned, ticked and terminated.
pub(crate) trait Behaviour {
    fn spawn(&mut self, exec: &mut BtExecutor, me: TaskId) -> Result<()>;

    /// Must return `Running`, `Success` or `Failure`.
    fn tick(&mut self, exec: &mut BtExecutor, me: TaskId) -> Result<Status>;

    /// Terminate live children and stop any external work.
    fn terminate(&mut self, exec: &mut BtExecutor, me: TaskId) -> Result<()>;

    fn store_state(&self) -> Option<TaskState> {
        None
    }

    fn store_termination_state(&self) -> Option<TaskState> {
        None
    }

    fn restore_state(&mut self, _state: Option<&TaskState>) {}

    /// Only interrupters accept interruptions.
    fn interrupt(&mut self, _exec: &mut BtExecutor, _me: TaskId, _desired: Status) -> Result<bool> {
        Ok(false)
    }
}

/// Runtime instance of one conceptual node.
pub struct ExecutionTask {
    model: ModelRef,
    parent: Option<TaskId>,
    children: Vec<TaskId>,
    position: Position,
    status: Status,
    gate: Gate,
    context: Option<Context>,
    behaviour: Option<Box<dyn Behaviour>>,
}

impl ExecutionTask {
    pub fn model(&self) -> &ModelRef {
        &self.model
    }

    pub fn parent(&self) -> Option<TaskId> {
        self.parent
    }

    /// Children created so far and not yet released.
    pub fn children(&self) -> &[TaskId] {
        &self.children
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn gate(&self) -> Gate {
        self.gate
    }

    /// Context assigned at spawn.
    pub fn context(&self) -> Option<&Context> {
        self.context.as_ref()
    }
}

impl std::fmt::Debug for ExecutionTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionTask")
            .field("model", &self.model.label())
            .field("position", &self.position)
            .field("status", &self.status)
            .field("gate", &self.gate)
            .field("children", &self.children)
            .finish()
    }
}

/// Runtime counterpart of a conceptual node.
pub(crate) fn behaviour_for(model: &ModelTask) -> Box<dyn Behaviour> {
    let children = model.children().to_vec();
    let first = children.first().cloned();
    match model.kind() {
        ModelKind::Sequence => Box::new(SequentialTask::sequence(children, false)),
        ModelKind::Selector => Box::new(SequentialTask::selector(children, false)),
        ModelKind::RandomSequence => Box::new(SequentialTask::sequence(children, true)),
        ModelKind::RandomSelector => Box::new(SequentialTask::selector(children, true)),
        ModelKind::Parallel(policy) => Box::new(ParallelTask::new(*policy, children)),
        ModelKind::StaticPriorityList => Box::new(StaticPriorityList::new(children)),
        ModelKind::DynamicPriorityList => Box::new(DynamicPriorityList::new(children)),
        ModelKind::Inverter => Box::new(MappingDecorator::inverter(first)),
        ModelKind::Succeeder => Box::new(MappingDecorator::succeeder(first)),
        ModelKind::HierarchicalContextManager => Box::new(MappingDecorator::hierarchical(first)),
        ModelKind::SafeContextManager => Box::new(MappingDecorator::safe(first)),
        ModelKind::SafeOutputContextManager { outputs } => {
            Box::new(MappingDecorator::safe_output(first, outputs.clone()))
        }
        ModelKind::Limit { max_runs } => Box::new(LimitTask::new(*max_runs, first)),
        ModelKind::Repeat => Box::new(RepeatTask::forever(first)),
        ModelKind::UntilFail => Box::new(RepeatTask::until_fail(first)),
        ModelKind::Interrupter { id } => Box::new(InterrupterTask::new(id.clone(), first)),
        ModelKind::Success => Box::new(ConstantLeaf(Status::Success)),
        ModelKind::Failure => Box::new(ConstantLeaf(Status::Failure)),
        ModelKind::Wait { ticks } => Box::new(WaitLeaf::new(*ticks)),
        ModelKind::SubtreeLookup { name } => Box::new(SubtreeLookupLeaf::new(name.clone())),
        ModelKind::VariableRenamer { from, to } => {
            Box::new(VariableRenamerLeaf::new(from.clone(), to.clone()))
        }
        ModelKind::PerformInterruption { target, desired } => {
            Box::new(PerformInterruptionLeaf::new(target.clone(), *desired))
        }
        ModelKind::Action { factory, .. } | ModelKind::Condition { factory, .. } => {
            Box::new(UserLeaf::new(factory.create()))
        }
    }
}

impl BtExecutor {
    /// Create an unspawned task for `model`.
    ///
    /// Most callers never need this: the executor creates the root and
    /// composites create their children. It is exposed for embedders that
    /// drive the task protocol by hand.
    pub fn create_task(&mut self, model: ModelRef, parent: Option<TaskId>, position: Position) -> TaskId {
        let behaviour = behaviour_for(&model);
        let id = self.tasks.insert(ExecutionTask {
            model,
            parent,
            children: Vec::new(),
            position,
            status: Status::Uninitialized,
            gate: Gate::Spawnable,
            context: None,
            behaviour: Some(behaviour),
        });
        if let Some(parent) = parent.and_then(|p| self.tasks.get_mut(p)) {
            parent.children.push(id);
        }
        id
    }

    /// First-time activation of a task.
    pub fn spawn_task(&mut self, id: TaskId, context: Context) -> Result<()> {
        let task = self.tasks.get_mut(id).ok_or(BtError::UnknownTask)?;
        if task.gate != Gate::Spawnable {
            return Err(BtError::AlreadySpawned {
                position: task.position.clone(),
            });
        }
        task.gate = Gate::Tickable;
        task.status = Status::Running;
        task.context = Some(context);
        let position = task.position.clone();

        self.request_insertion_into_list(TaskList::Open, id);
        let state = self.task_state(&position);
        tracing::trace!(position = %position, restored = state.is_some(), "spawn");
        self.emit(TAG_SPAWN, id);

        self.with_behaviour(id, |behaviour, exec| {
            behaviour.restore_state(state.as_ref());
            behaviour.spawn(exec, id)
        })
    }

    /// Tick one task and, if it finished, notify its parent.
    pub fn tick_task(&mut self, id: TaskId) -> Result<Status> {
        let task = self.tasks.get(id).ok_or(BtError::UnknownTask)?;
        match task.gate {
            Gate::Spawnable => {
                return Err(BtError::NotSpawned {
                    position: task.position.clone(),
                })
            }
            Gate::Terminated => return Ok(Status::Terminated),
            Gate::Tickable => {}
        }
        if task.status.is_finished() {
            return Ok(task.status);
        }

        let status = self.with_behaviour(id, |behaviour, exec| behaviour.tick(exec, id))?;

        // The task may have been terminated (or released) by its own tick.
        let Some(task) = self.tasks.get_mut(id) else {
            return Ok(Status::Terminated);
        };
        if !status.is_tick_result() {
            return Err(BtError::InvalidTickStatus {
                position: task.position.clone(),
                status,
            });
        }
        if task.gate == Gate::Terminated {
            return Ok(Status::Terminated);
        }

        let old = std::mem::replace(&mut task.status, status);
        if status == Status::Running {
            return Ok(status);
        }

        let parent = task.parent;
        let position = task.position.clone();
        let state = task.behaviour.as_ref().and_then(|b| b.store_state());
        self.set_task_state(position.clone(), state);
        self.request_removal_from_list(TaskList::Tickable, id);
        self.request_removal_from_list(TaskList::Open, id);
        tracing::trace!(position = %position, status = %status, "finish");
        self.emit(TAG_FINISH, id);

        if let Some(parent) = parent {
            self.child_finished(parent, id, StatusChange { old, new: status })?;
        }
        Ok(status)
    }

    /// Forcibly stop a task and its live descendants. Idempotent.
    pub fn terminate_task(&mut self, id: TaskId) -> Result<()> {
        let task = self.tasks.get_mut(id).ok_or(BtError::UnknownTask)?;
        match task.gate {
            Gate::Spawnable => {
                return Err(BtError::TerminatedBeforeSpawn {
                    position: task.position.clone(),
                })
            }
            Gate::Terminated => return Ok(()),
            Gate::Tickable => {}
        }
        if task.status.is_finished() {
            return Ok(());
        }

        task.gate = Gate::Terminated;
        task.status = Status::Terminated;
        let position = task.position.clone();
        // A task terminated from inside its own tick has its behaviour checked out.
        let Some(mut behaviour) = task.behaviour.take() else {
            self.request_removal_from_list(TaskList::Tickable, id);
            self.request_removal_from_list(TaskList::Open, id);
            return Ok(());
        };

        self.request_removal_from_list(TaskList::Tickable, id);
        self.request_removal_from_list(TaskList::Open, id);
        self.set_task_state(position.clone(), behaviour.store_termination_state());
        tracing::trace!(position = %position, "terminate");
        self.emit(TAG_TERMINATE, id);

        let result = behaviour.terminate(self, id);
        if let Some(task) = self.tasks.get_mut(id) {
            task.behaviour = Some(behaviour);
        }
        result
    }

    /// Direct event propagation: a finished child re-ticks its parent.
    fn child_finished(&mut self, parent: TaskId, child: TaskId, change: StatusChange) -> Result<()> {
        tracing::trace!(parent = %parent, child = %child, old = %change.old, new = %change.new, "child finished");
        if !self.tasks.contains(parent) {
            return Ok(());
        }
        self.tick_task(parent).map(|_| ())
    }

    /// Check out `id`'s behaviour, run `f`, and put it back.
    pub(crate) fn with_behaviour<R>(
        &mut self,
        id: TaskId,
        f: impl FnOnce(&mut Box<dyn Behaviour>, &mut BtExecutor) -> Result<R>,
    ) -> Result<R> {
        let task = self.tasks.get_mut(id).ok_or(BtError::UnknownTask)?;
        let Some(mut behaviour) = task.behaviour.take() else {
            return Err(BtError::BehaviourInUse {
                position: task.position.clone(),
            });
        };
        let result = f(&mut behaviour, &mut *self);
        if let Some(task) = self.tasks.get_mut(id) {
            task.behaviour = Some(behaviour);
        }
        result
    }

    /// Create and spawn the child of `parent` reached by move `index`, sharing its context.
    pub(crate) fn spawn_child(&mut self, parent: TaskId, model: ModelRef, index: usize) -> Result<TaskId> {
        let context = self.task_context(parent)?;
        self.spawn_child_in(parent, model, index, context)
    }

    pub(crate) fn spawn_child_in(
        &mut self,
        parent: TaskId,
        model: ModelRef,
        index: usize,
        context: Context,
    ) -> Result<TaskId> {
        let position = self
            .tasks
            .get(parent)
            .ok_or(BtError::UnknownTask)?
            .position
            .child(index);
        let child = self.create_task(model, Some(parent), position);
        self.spawn_task(child, context)?;
        Ok(child)
    }

    /// Drop a task and its descendants from the arena, terminating any still running.
    pub(crate) fn release_task(&mut self, id: TaskId) -> Result<()> {
        let Some(task) = self.tasks.get(id) else {
            return Ok(());
        };
        if task.gate == Gate::Tickable && task.status == Status::Running {
            self.terminate_task(id)?;
        }
        if let Some(parent) = self.tasks.get(id).and_then(|t| t.parent) {
            if let Some(parent) = self.tasks.get_mut(parent) {
                parent.children.retain(|c| *c != id);
            }
        }
        self.forget_subtree(id);
        Ok(())
    }

    fn forget_subtree(&mut self, id: TaskId) {
        let Some(task) = self.tasks.remove(id) else {
            return;
        };
        for list in [TaskList::Tickable, TaskList::Open] {
            self.cancel_insertion_request(list, id);
            self.request_removal_from_list(list, id);
        }
        for child in task.children {
            self.forget_subtree(child);
        }
    }

    pub(crate) fn task_context(&self, id: TaskId) -> Result<Context> {
        let task = self.tasks.get(id).ok_or(BtError::UnknownTask)?;
        task.context.clone().ok_or_else(|| BtError::NotSpawned {
            position: task.position.clone(),
        })
    }

    pub(crate) fn task_position(&self, id: TaskId) -> Result<Position> {
        self.tasks
            .get(id)
            .map(|t| t.position.clone())
            .ok_or(BtError::UnknownTask)
    }

    /// Status of `id`; released tasks read as `Terminated`.
    pub fn status_of(&self, id: TaskId) -> Status {
        self.tasks
            .get(id)
            .map(|t| t.status)
            .unwrap_or(Status::Terminated)
    }
}
