//! Leaf tasks. Every leaf is tickable from spawn until it finishes.

use bt_core::{InterrupterId, LeafTask, Result, Status, TaskState};

use crate::arena::TaskId;
use crate::executor::{BtExecutor, TaskList};
use crate::task::Behaviour;

/// Adapter running a user [`LeafTask`] (actions and conditions).
pub(crate) struct UserLeaf {
    leaf: Box<dyn LeafTask>,
}

impl UserLeaf {
    pub fn new(leaf: Box<dyn LeafTask>) -> Self {
        Self { leaf }
    }
}

impl Behaviour for UserLeaf {
    fn spawn(&mut self, exec: &mut BtExecutor, me: TaskId) -> Result<()> {
        exec.request_insertion_into_list(TaskList::Tickable, me);
        let context = exec.task_context(me)?;
        self.leaf.start(&context);
        Ok(())
    }

    fn tick(&mut self, exec: &mut BtExecutor, me: TaskId) -> Result<Status> {
        let context = exec.task_context(me)?;
        Ok(self.leaf.tick(&context))
    }

    fn terminate(&mut self, exec: &mut BtExecutor, me: TaskId) -> Result<()> {
        let context = exec.task_context(me)?;
        self.leaf.abort(&context);
        Ok(())
    }

    fn store_state(&self) -> Option<TaskState> {
        self.leaf.store_state()
    }

    fn store_termination_state(&self) -> Option<TaskState> {
        self.leaf.store_termination_state()
    }

    fn restore_state(&mut self, state: Option<&TaskState>) {
        self.leaf.restore_state(state);
    }
}

/// `Success` / `Failure` leaves.
pub(crate) struct ConstantLeaf(pub Status);

impl Behaviour for ConstantLeaf {
    fn spawn(&mut self, exec: &mut BtExecutor, me: TaskId) -> Result<()> {
        exec.request_insertion_into_list(TaskList::Tickable, me);
        Ok(())
    }

    fn tick(&mut self, _exec: &mut BtExecutor, _me: TaskId) -> Result<Status> {
        Ok(self.0)
    }

    fn terminate(&mut self, _exec: &mut BtExecutor, _me: TaskId) -> Result<()> {
        Ok(())
    }
}

/// Runs for a fixed number of ticks, then succeeds.
pub(crate) struct WaitLeaf {
    ticks: u32,
    elapsed: u32,
}

impl WaitLeaf {
    pub fn new(ticks: u32) -> Self {
        Self { ticks, elapsed: 0 }
    }
}

impl Behaviour for WaitLeaf {
    fn spawn(&mut self, exec: &mut BtExecutor, me: TaskId) -> Result<()> {
        self.elapsed = 0;
        exec.request_insertion_into_list(TaskList::Tickable, me);
        Ok(())
    }

    fn tick(&mut self, _exec: &mut BtExecutor, _me: TaskId) -> Result<Status> {
        self.elapsed = self.elapsed.saturating_add(1);
        if self.elapsed >= self.ticks {
            Ok(Status::Success)
        } else {
            Ok(Status::Running)
        }
    }

    fn terminate(&mut self, _exec: &mut BtExecutor, _me: TaskId) -> Result<()> {
        Ok(())
    }
}

/// Splices in a tree registered in the context under `name`.
///
/// The looked-up root takes move 0 below this task. When no tree is
/// registered the leaf fails on its first tick.
pub(crate) struct SubtreeLookupLeaf {
    name: String,
    child: Option<TaskId>,
}

impl SubtreeLookupLeaf {
    pub fn new(name: String) -> Self {
        Self { name, child: None }
    }
}

impl Behaviour for SubtreeLookupLeaf {
    fn spawn(&mut self, exec: &mut BtExecutor, me: TaskId) -> Result<()> {
        let context = exec.task_context(me)?;
        match context.get_named_tree(&self.name) {
            Some(tree) => {
                self.child = Some(exec.spawn_child_in(me, tree, 0, context)?);
            }
            None => {
                tracing::debug!(name = %self.name, "named subtree not found");
                exec.request_insertion_into_list(TaskList::Tickable, me);
            }
        }
        Ok(())
    }

    fn tick(&mut self, exec: &mut BtExecutor, _me: TaskId) -> Result<Status> {
        let Some(child) = self.child else {
            return Ok(Status::Failure);
        };
        Ok(match exec.status_of(child) {
            Status::Terminated => Status::Failure,
            Status::Uninitialized => Status::Running,
            other => other,
        })
    }

    fn terminate(&mut self, exec: &mut BtExecutor, _me: TaskId) -> Result<()> {
        match self.child {
            Some(child) if exec.task(child).is_some() => exec.terminate_task(child),
            _ => Ok(()),
        }
    }
}

/// Moves the context variable `from` to `to`. Always succeeds; a missing
/// `from` leaves the context untouched.
///
/// Both ends follow the write rules of the task's context. In a hierarchical
/// context `to` is written to the local layer and only the local `from` is
/// cleared, so a `from` inherited from the parent stays visible: the value is
/// copied down, not moved out of the parent.
pub(crate) struct VariableRenamerLeaf {
    from: String,
    to: String,
}

impl VariableRenamerLeaf {
    pub fn new(from: String, to: String) -> Self {
        Self { from, to }
    }
}

impl Behaviour for VariableRenamerLeaf {
    fn spawn(&mut self, exec: &mut BtExecutor, me: TaskId) -> Result<()> {
        exec.request_insertion_into_list(TaskList::Tickable, me);
        Ok(())
    }

    fn tick(&mut self, exec: &mut BtExecutor, me: TaskId) -> Result<Status> {
        let context = exec.task_context(me)?;
        if let Some(value) = context.get_variable(&self.from) {
            context.set_shared(self.to.clone(), value);
            context.clear_variable(&self.from);
        }
        Ok(Status::Success)
    }

    fn terminate(&mut self, _exec: &mut BtExecutor, _me: TaskId) -> Result<()> {
        Ok(())
    }
}

/// Forces the interrupter registered as `target` to finish with `desired`.
///
/// Always succeeds: an interrupter that is not alive any more has nothing to
/// interrupt.
pub(crate) struct PerformInterruptionLeaf {
    target: InterrupterId,
    desired: Status,
}

impl PerformInterruptionLeaf {
    pub fn new(target: InterrupterId, desired: Status) -> Self {
        Self { target, desired }
    }
}

impl Behaviour for PerformInterruptionLeaf {
    fn spawn(&mut self, exec: &mut BtExecutor, me: TaskId) -> Result<()> {
        exec.request_insertion_into_list(TaskList::Tickable, me);
        Ok(())
    }

    fn tick(&mut self, exec: &mut BtExecutor, _me: TaskId) -> Result<Status> {
        match exec.execution_interrupter(&self.target) {
            Some(interrupter) => {
                exec.interrupt(interrupter, self.desired)?;
            }
            None => {
                tracing::debug!(interrupter = %self.target, "no live interrupter to interrupt");
            }
        }
        Ok(Status::Success)
    }

    fn terminate(&mut self, _exec: &mut BtExecutor, _me: TaskId) -> Result<()> {
        Ok(())
    }
}
