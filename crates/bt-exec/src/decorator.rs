//! Single-child tasks that reshape their child's status, context or lifetime.

use bt_core::{Context, InterrupterId, ModelRef, Result, Status, TaskState};

use crate::arena::TaskId;
use crate::executor::{BtExecutor, TaskList};
use crate::task::Behaviour;

/// The decorated child: its model and, once spawned, its task.
///
/// A decorator built without a child (a malformed tree) fails on its first tick.
struct SingleChild {
    model: Option<ModelRef>,
    task: Option<TaskId>,
}

impl SingleChild {
    fn new(model: Option<ModelRef>) -> Self {
        Self { model, task: None }
    }

    fn spawn(&mut self, exec: &mut BtExecutor, me: TaskId, context: Option<Context>) -> Result<()> {
        let Some(model) = self.model.clone() else {
            exec.request_insertion_into_list(TaskList::Tickable, me);
            return Ok(());
        };
        let context = match context {
            Some(context) => context,
            None => exec.task_context(me)?,
        };
        self.task = Some(exec.spawn_child_in(me, model, 0, context)?);
        Ok(())
    }

    /// Child status with `Terminated` read as `Failure`; `None` without a child.
    fn status(&self, exec: &BtExecutor) -> Option<Status> {
        let status = exec.status_of(self.task?);
        Some(match status {
            Status::Terminated => Status::Failure,
            Status::Uninitialized => Status::Running,
            other => other,
        })
    }

    /// Drop the finished child and spawn a fresh instance at the same position.
    fn respawn(&mut self, exec: &mut BtExecutor, me: TaskId) -> Result<()> {
        if let Some(old) = self.task.take() {
            exec.release_task(old)?;
        }
        self.spawn(exec, me, None)
    }

    fn terminate(&self, exec: &mut BtExecutor) -> Result<()> {
        match self.task {
            Some(task) if exec.task(task).is_some() => exec.terminate_task(task),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone)]
enum Scope {
    Inherit,
    Hierarchical,
    Safe,
    SafeOutput(Vec<String>),
}

/// Forwards its child's result through `map`, optionally in a substituted context.
///
/// Covers the inverter, the succeeder and the three context managers.
pub(crate) struct MappingDecorator {
    child: SingleChild,
    map: fn(Status) -> Status,
    scope: Scope,
}

impl MappingDecorator {
    fn new(child: Option<ModelRef>, map: fn(Status) -> Status, scope: Scope) -> Self {
        Self {
            child: SingleChild::new(child),
            map,
            scope,
        }
    }

    pub fn inverter(child: Option<ModelRef>) -> Self {
        Self::new(child, Status::inverted, Scope::Inherit)
    }

    pub fn succeeder(child: Option<ModelRef>) -> Self {
        Self::new(child, |_| Status::Success, Scope::Inherit)
    }

    pub fn hierarchical(child: Option<ModelRef>) -> Self {
        Self::new(child, std::convert::identity, Scope::Hierarchical)
    }

    pub fn safe(child: Option<ModelRef>) -> Self {
        Self::new(child, std::convert::identity, Scope::Safe)
    }

    pub fn safe_output(child: Option<ModelRef>, outputs: Vec<String>) -> Self {
        Self::new(child, std::convert::identity, Scope::SafeOutput(outputs))
    }
}

impl Behaviour for MappingDecorator {
    fn spawn(&mut self, exec: &mut BtExecutor, me: TaskId) -> Result<()> {
        let context = exec.task_context(me)?;
        let context = match &self.scope {
            Scope::Inherit => context,
            Scope::Hierarchical => Context::hierarchical(&context),
            Scope::Safe => Context::safe(&context),
            Scope::SafeOutput(outputs) => Context::safe_output(&context, outputs.iter().cloned()),
        };
        self.child.spawn(exec, me, Some(context))
    }

    fn tick(&mut self, exec: &mut BtExecutor, _me: TaskId) -> Result<Status> {
        Ok(match self.child.status(exec) {
            None => Status::Failure,
            Some(Status::Running) => Status::Running,
            Some(finished) => (self.map)(finished),
        })
    }

    fn terminate(&mut self, exec: &mut BtExecutor, _me: TaskId) -> Result<()> {
        self.child.terminate(exec)
    }
}

const RUNS: &str = "runs";

/// Lets its child run at most `max_runs` times over the lifetime of the
/// executor, counted per position through the task state table.
pub(crate) struct LimitTask {
    child: SingleChild,
    max_runs: u32,
    runs: u32,
    exhausted: bool,
}

impl LimitTask {
    pub fn new(max_runs: u32, child: Option<ModelRef>) -> Self {
        Self {
            child: SingleChild::new(child),
            max_runs,
            runs: 0,
            exhausted: false,
        }
    }
}

impl Behaviour for LimitTask {
    fn spawn(&mut self, exec: &mut BtExecutor, me: TaskId) -> Result<()> {
        if self.runs >= self.max_runs {
            self.exhausted = true;
            exec.request_insertion_into_list(TaskList::Tickable, me);
            return Ok(());
        }
        self.runs += 1;
        self.child.spawn(exec, me, None)
    }

    fn tick(&mut self, exec: &mut BtExecutor, _me: TaskId) -> Result<Status> {
        if self.exhausted {
            return Ok(Status::Failure);
        }
        Ok(self.child.status(exec).unwrap_or(Status::Failure))
    }

    fn terminate(&mut self, exec: &mut BtExecutor, _me: TaskId) -> Result<()> {
        self.child.terminate(exec)
    }

    fn store_state(&self) -> Option<TaskState> {
        Some(TaskState::with(RUNS, self.runs))
    }

    fn store_termination_state(&self) -> Option<TaskState> {
        self.store_state()
    }

    fn restore_state(&mut self, state: Option<&TaskState>) {
        self.runs = state.and_then(|s| s.get::<u32>(RUNS)).copied().unwrap_or(0);
    }
}

/// Re-runs its child whenever it finishes; with `until_fail`, stops with
/// `Success` the first time the child fails.
pub(crate) struct RepeatTask {
    child: SingleChild,
    until_fail: bool,
}

impl RepeatTask {
    pub fn forever(child: Option<ModelRef>) -> Self {
        Self {
            child: SingleChild::new(child),
            until_fail: false,
        }
    }

    pub fn until_fail(child: Option<ModelRef>) -> Self {
        Self {
            child: SingleChild::new(child),
            until_fail: true,
        }
    }
}

impl Behaviour for RepeatTask {
    fn spawn(&mut self, exec: &mut BtExecutor, me: TaskId) -> Result<()> {
        self.child.spawn(exec, me, None)
    }

    fn tick(&mut self, exec: &mut BtExecutor, me: TaskId) -> Result<Status> {
        let Some(task) = self.child.task else {
            return Ok(Status::Failure);
        };
        match exec.status_of(task) {
            Status::Success => {}
            Status::Failure if self.until_fail => return Ok(Status::Success),
            Status::Failure => {}
            Status::Terminated => return Ok(Status::Failure),
            Status::Running | Status::Uninitialized => return Ok(Status::Running),
        }
        // The new instance reports no earlier than its own first tick.
        self.child.respawn(exec, me)?;
        Ok(Status::Running)
    }

    fn terminate(&mut self, exec: &mut BtExecutor, _me: TaskId) -> Result<()> {
        self.child.terminate(exec)
    }
}

/// Decorator that can be forced to finish from elsewhere in the tree.
///
/// Registered with its executor under `id` while alive; a perform-interruption
/// leaf looks it up there and calls [`BtExecutor::interrupt`].
pub(crate) struct InterrupterTask {
    id: InterrupterId,
    child: SingleChild,
    interruption: Option<Status>,
}

impl InterrupterTask {
    pub fn new(id: InterrupterId, child: Option<ModelRef>) -> Self {
        Self {
            id,
            child: SingleChild::new(child),
            interruption: None,
        }
    }
}

impl Behaviour for InterrupterTask {
    fn spawn(&mut self, exec: &mut BtExecutor, me: TaskId) -> Result<()> {
        exec.register_interrupter(self.id.clone(), me);
        self.child.spawn(exec, me, None)
    }

    fn tick(&mut self, exec: &mut BtExecutor, me: TaskId) -> Result<Status> {
        let status = match self.interruption {
            Some(desired) => desired,
            None => self.child.status(exec).unwrap_or(Status::Failure),
        };
        if status != Status::Running {
            exec.unregister_interrupter(&self.id, me);
        }
        Ok(status)
    }

    fn terminate(&mut self, exec: &mut BtExecutor, me: TaskId) -> Result<()> {
        exec.unregister_interrupter(&self.id, me);
        self.child.terminate(exec)
    }

    fn interrupt(&mut self, exec: &mut BtExecutor, me: TaskId, desired: Status) -> Result<bool> {
        if !desired.is_finished() {
            tracing::debug!(interrupter = %self.id, status = %desired, "ignoring interruption without a final status");
            return Ok(false);
        }
        if self.interruption.is_some() || exec.status_of(me) != Status::Running {
            return Ok(false);
        }
        self.interruption = Some(desired);
        self.child.terminate(exec)?;
        // Nothing else will tick us now that the child is gone.
        exec.request_insertion_into_list(TaskList::Tickable, me);
        Ok(true)
    }
}
