use bt_core::{Context, ModelRef, Position, Result, Status};

use crate::arena::TaskId;
use crate::executor::{BtExecutor, TaskList};
use crate::task::Behaviour;
use crate::trace::TAG_PREEMPT;

/// Guard executors of a priority list, one slot per child.
///
/// A child without a guard is always eligible. Guards run in nested
/// executors sharing the list's context; each executor keeps its own task
/// state table, which survives guard re-creation through
/// [`BtExecutor::copy_tasks_states`].
struct GuardSet {
    slots: Vec<Option<GuardSlot>>,
    budget: u32,
}

struct GuardSlot {
    guard: ModelRef,
    executor: BtExecutor,
}

/// Outcome of scanning guards in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Selection {
    /// Highest-priority eligible child.
    Chosen(usize),
    /// Guard at this index is still running; nothing below it can be decided.
    Pending(usize),
    AllFailed,
}

impl GuardSet {
    fn new(exec: &BtExecutor, position: &Position, context: &Context, children: &[ModelRef]) -> Self {
        let slots = children
            .iter()
            .enumerate()
            .map(|(i, child)| {
                child.guard().map(|guard| GuardSlot {
                    guard: guard.clone(),
                    executor: exec.nested(guard.clone(), context.clone(), position, i as u64),
                })
            })
            .collect();
        Self {
            slots,
            budget: exec.config().guard_ticks_per_evaluation.max(1),
        }
    }

    fn len(&self) -> usize {
        self.slots.len()
    }

    /// Give every guard its first tick.
    fn prime(&mut self) -> Result<()> {
        for slot in self.slots.iter_mut().flatten() {
            slot.executor.tick()?;
        }
        Ok(())
    }

    /// Tick guard `i` until it resolves or its per-pass budget runs out.
    ///
    /// With `restart`, a guard that resolved in an earlier pass is replaced
    /// by a fresh executor so it is evaluated again.
    fn evaluate(&mut self, i: usize, restart: bool) -> Result<Status> {
        let Some(slot) = self.slots[i].as_mut() else {
            return Ok(Status::Success);
        };

        if restart && slot.executor.status().is_finished() {
            let context = slot.executor.root_context().clone();
            let mut fresh = BtExecutor::with_config(slot.guard.clone(), context, *slot.executor.config());
            fresh.copy_tasks_states(&slot.executor);
            slot.executor = fresh;
        }

        let mut status = slot.executor.status();
        let mut ticks = 0;
        while !status.is_finished() && ticks < self.budget {
            status = slot.executor.tick()?;
            ticks += 1;
        }
        Ok(match status {
            Status::Success | Status::Failure => status,
            _ => Status::Running,
        })
    }

    /// Scan guards from highest priority, evaluating only as far as needed.
    fn select(&mut self, restart: bool) -> Result<Selection> {
        for i in 0..self.len() {
            match self.evaluate(i, restart)? {
                Status::Success => return Ok(Selection::Chosen(i)),
                Status::Failure => continue,
                _ => return Ok(Selection::Pending(i)),
            }
        }
        Ok(Selection::AllFailed)
    }

    fn terminate(&mut self) -> Result<()> {
        for slot in self.slots.iter_mut().flatten() {
            slot.executor.terminate()?;
        }
        Ok(())
    }
}

fn forwarded(status: Status) -> Status {
    match status {
        Status::Terminated => Status::Failure,
        Status::Uninitialized => Status::Running,
        other => other,
    }
}

/// Priority list whose guards are evaluated until a child is chosen, and never again.
pub(crate) struct StaticPriorityList {
    children: Vec<ModelRef>,
    guards: Option<GuardSet>,
    active: Option<TaskId>,
}

impl StaticPriorityList {
    pub fn new(children: Vec<ModelRef>) -> Self {
        Self {
            children,
            guards: None,
            active: None,
        }
    }
}

impl Behaviour for StaticPriorityList {
    fn spawn(&mut self, exec: &mut BtExecutor, me: TaskId) -> Result<()> {
        let context = exec.task_context(me)?;
        let position = exec.task_position(me)?;
        let mut guards = GuardSet::new(exec, &position, &context, &self.children);
        guards.prime()?;
        self.guards = Some(guards);
        exec.request_insertion_into_list(TaskList::Tickable, me);
        Ok(())
    }

    fn tick(&mut self, exec: &mut BtExecutor, me: TaskId) -> Result<Status> {
        if let Some(active) = self.active {
            return Ok(forwarded(exec.status_of(active)));
        }
        let Some(guards) = self.guards.as_mut() else {
            return Ok(Status::Failure);
        };

        match guards.select(false)? {
            Selection::Chosen(index) => {
                guards.terminate()?;
                self.guards = None;
                let child = exec.spawn_child(me, self.children[index].clone(), index)?;
                self.active = Some(child);
                // From here on progress comes from the child's completion event.
                exec.request_removal_from_list(TaskList::Tickable, me);
                Ok(Status::Running)
            }
            Selection::Pending(_) => Ok(Status::Running),
            Selection::AllFailed => Ok(Status::Failure),
        }
    }

    fn terminate(&mut self, exec: &mut BtExecutor, _me: TaskId) -> Result<()> {
        if let Some(guards) = self.guards.as_mut() {
            guards.terminate()?;
        }
        match self.active {
            Some(active) if exec.task(active).is_some() => exec.terminate_task(active),
            _ => Ok(()),
        }
    }
}

/// Priority list that re-evaluates guards every tick and preempts lower-priority children.
pub(crate) struct DynamicPriorityList {
    children: Vec<ModelRef>,
    guards: Option<GuardSet>,
    active: Option<(usize, TaskId)>,
    /// Lowest index whose guard was not known to have failed after the last
    /// pass; `children.len()` once every guard failed. An active child above
    /// it lost its guard.
    most_relevant_guard: usize,
}

impl DynamicPriorityList {
    pub fn new(children: Vec<ModelRef>) -> Self {
        Self {
            children,
            guards: None,
            active: None,
            most_relevant_guard: 0,
        }
    }

    fn drop_active(&mut self, exec: &mut BtExecutor) -> Result<()> {
        if let Some((_, child)) = self.active.take() {
            exec.release_task(child)?;
        }
        Ok(())
    }

    /// Terminate the guard executors; the list is done evaluating them.
    fn stop_guards(&mut self) -> Result<()> {
        if let Some(mut guards) = self.guards.take() {
            guards.terminate()?;
        }
        Ok(())
    }
}

impl Behaviour for DynamicPriorityList {
    fn spawn(&mut self, exec: &mut BtExecutor, me: TaskId) -> Result<()> {
        let context = exec.task_context(me)?;
        let position = exec.task_position(me)?;
        let mut guards = GuardSet::new(exec, &position, &context, &self.children);
        guards.prime()?;
        self.guards = Some(guards);
        self.most_relevant_guard = 0;
        exec.request_insertion_into_list(TaskList::Tickable, me);
        Ok(())
    }

    fn tick(&mut self, exec: &mut BtExecutor, me: TaskId) -> Result<Status> {
        if let Some((_, child)) = self.active {
            let status = exec.status_of(child);
            if status.is_finished() {
                self.stop_guards()?;
                return Ok(status);
            }
        }
        let selection = match self.guards.as_mut() {
            Some(guards) => guards.select(true)?,
            None => return Ok(Status::Failure),
        };
        self.most_relevant_guard = match selection {
            Selection::Chosen(i) | Selection::Pending(i) => i,
            Selection::AllFailed => self.children.len(),
        };
        tracing::trace!(most_relevant_guard = self.most_relevant_guard, "guards evaluated");

        // Every guard above the most relevant one failed in this pass.
        if let Some((current, _)) = self.active {
            if current < self.most_relevant_guard {
                self.drop_active(exec)?;
            }
        }

        match selection {
            Selection::Chosen(index) => {
                if let Some((current, child)) = self.active {
                    if current == index {
                        return Ok(forwarded(exec.status_of(child)));
                    }
                    tracing::debug!(from = current, to = index, "priority list preempting child");
                    exec.emit(TAG_PREEMPT, child);
                    self.drop_active(exec)?;
                }
                let child = exec.spawn_child(me, self.children[index].clone(), index)?;
                self.active = Some((index, child));
                Ok(Status::Running)
            }
            Selection::Pending(_) => Ok(Status::Running),
            Selection::AllFailed => {
                self.stop_guards()?;
                Ok(Status::Failure)
            }
        }
    }

    fn terminate(&mut self, exec: &mut BtExecutor, _me: TaskId) -> Result<()> {
        if let Some(guards) = self.guards.as_mut() {
            guards.terminate()?;
        }
        match self.active {
            Some((_, child)) if exec.task(child).is_some() => exec.terminate_task(child),
            _ => Ok(()),
        }
    }
}
