use bt_core::rng::permutation;
use bt_core::{ModelRef, Result, Status};

use crate::arena::TaskId;
use crate::executor::{BtExecutor, TaskList};
use crate::task::Behaviour;

/// Sequence and selector, optionally visiting children in random order.
///
/// A sequence advances while children succeed; a selector advances while
/// children fail. Only one child is alive at a time, and progress is driven
/// entirely by child completion events, so the task never asks to be ticked
/// unless it has no children at all.
pub(crate) struct SequentialTask {
    children: Vec<ModelRef>,
    /// Status that moves on to the next child.
    advance_on: Status,
    random: bool,
    order: Vec<usize>,
    cursor: usize,
    active: Option<TaskId>,
}

impl SequentialTask {
    pub fn sequence(children: Vec<ModelRef>, random: bool) -> Self {
        Self::new(children, Status::Success, random)
    }

    pub fn selector(children: Vec<ModelRef>, random: bool) -> Self {
        Self::new(children, Status::Failure, random)
    }

    fn new(children: Vec<ModelRef>, advance_on: Status, random: bool) -> Self {
        Self {
            children,
            advance_on,
            random,
            order: Vec::new(),
            cursor: 0,
            active: None,
        }
    }

    fn spawn_current(&mut self, exec: &mut BtExecutor, me: TaskId) -> Result<()> {
        let index = self.order[self.cursor];
        let child = exec.spawn_child(me, self.children[index].clone(), index)?;
        self.active = Some(child);
        Ok(())
    }
}

impl Behaviour for SequentialTask {
    fn spawn(&mut self, exec: &mut BtExecutor, me: TaskId) -> Result<()> {
        let n = self.children.len();
        self.order = if self.random {
            permutation(exec.rng_mut(), n)
        } else {
            (0..n).collect()
        };
        self.cursor = 0;

        if n == 0 {
            // Nothing to wait for: report on the next tick.
            exec.request_insertion_into_list(TaskList::Tickable, me);
            return Ok(());
        }
        self.spawn_current(exec, me)
    }

    fn tick(&mut self, exec: &mut BtExecutor, me: TaskId) -> Result<Status> {
        let Some(active) = self.active else {
            // Empty: a sequence of nothing succeeds, a selector of nothing fails.
            return Ok(self.advance_on);
        };

        let status = match exec.status_of(active) {
            Status::Running | Status::Uninitialized => return Ok(Status::Running),
            Status::Terminated => Status::Failure,
            finished => finished,
        };
        if status != self.advance_on {
            return Ok(status);
        }

        self.cursor += 1;
        if self.cursor >= self.order.len() {
            return Ok(status);
        }
        self.spawn_current(exec, me)?;
        exec.release_task(active)?;
        Ok(Status::Running)
    }

    fn terminate(&mut self, exec: &mut BtExecutor, _me: TaskId) -> Result<()> {
        match self.active {
            Some(active) if exec.task(active).is_some() => exec.terminate_task(active),
            _ => Ok(()),
        }
    }
}
