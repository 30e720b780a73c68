use std::rc::Rc;

use crate::{Context, Status, TaskState};

/// User-supplied leaf behaviour (actions and conditions).
///
/// A leaf that drives a long-running external effect starts it in
/// [`LeafTask::start`] and polls it from [`LeafTask::tick`]. `tick` must
/// return `Running`, `Success` or `Failure`; anything else is rejected by the
/// executor as a protocol violation.
pub trait LeafTask: 'static {
    fn start(&mut self, _context: &Context) {}

    fn tick(&mut self, context: &Context) -> Status;

    /// Called when the leaf is terminated while still running.
    fn abort(&mut self, _context: &Context) {}

    /// State persisted when the leaf finishes.
    fn store_state(&self) -> Option<TaskState> {
        None
    }

    /// State persisted when the leaf is terminated.
    fn store_termination_state(&self) -> Option<TaskState> {
        None
    }

    /// Receives whatever was last persisted at this leaf's position, before `start`.
    fn restore_state(&mut self, _state: Option<&TaskState>) {}
}

/// Manufactures a fresh [`LeafTask`] each time the leaf is spawned.
pub trait LeafFactory: 'static {
    fn create(&self) -> Box<dyn LeafTask>;
}

impl<F> LeafFactory for F
where
    F: Fn() -> Box<dyn LeafTask> + 'static,
{
    fn create(&self) -> Box<dyn LeafTask> {
        self()
    }
}

/// Leaf that evaluates a predicate over the context on its first tick.
pub struct Condition {
    predicate: Rc<dyn Fn(&Context) -> bool>,
}

impl Condition {
    pub fn new(predicate: impl Fn(&Context) -> bool + 'static) -> Self {
        Self {
            predicate: Rc::new(predicate),
        }
    }

    /// Factory producing a `Condition` sharing this predicate.
    pub fn factory(predicate: impl Fn(&Context) -> bool + 'static) -> Rc<dyn LeafFactory> {
        let predicate: Rc<dyn Fn(&Context) -> bool> = Rc::new(predicate);
        Rc::new(move || {
            Box::new(Condition {
                predicate: predicate.clone(),
            }) as Box<dyn LeafTask>
        })
    }
}

impl LeafTask for Condition {
    fn tick(&mut self, context: &Context) -> Status {
        Status::from_bool((self.predicate)(context))
    }
}
