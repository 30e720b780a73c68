#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::cell::RefCell;
use std::rc::Rc;

use bt_core::{Position, Status};

pub const TAG_SPAWN: &str = "bt.spawn";
pub const TAG_FINISH: &str = "bt.finish";
pub const TAG_TERMINATE: &str = "bt.terminate";
pub const TAG_PREEMPT: &str = "bt.preempt";
pub const TAG_INTERRUPT: &str = "bt.interrupt";

/// One lifecycle transition of an execution task.
///
/// Plain data so it can be recorded while ticking and inspected afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TraceEvent {
    /// Executor tick during which the transition happened (first tick is 1).
    pub tick: u64,
    pub tag: Cow<'static, str>,
    pub position: Position,
    pub status: Status,
}

impl TraceEvent {
    pub fn new(tick: u64, tag: impl Into<Cow<'static, str>>, position: Position, status: Status) -> Self {
        Self {
            tick,
            tag: tag.into(),
            position,
            status,
        }
    }
}

pub trait TraceSink {
    fn emit(&mut self, event: TraceEvent);
}

#[derive(Debug, Default)]
pub struct NullTraceSink;

impl TraceSink for NullTraceSink {
    fn emit(&mut self, _event: TraceEvent) {}
}

#[derive(Debug, Default)]
pub struct VecTraceSink {
    pub events: Vec<TraceEvent>,
}

impl TraceSink for VecTraceSink {
    fn emit(&mut self, event: TraceEvent) {
        self.events.push(event);
    }
}

/// Cloneable sink: keep one handle, give the other to the executor.
#[derive(Debug, Clone, Default)]
pub struct TraceLog {
    events: Rc<RefCell<Vec<TraceEvent>>>,
}

impl TraceLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TraceEvent> {
        self.events.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }

    /// Positions of the events carrying `tag`, in emission order.
    pub fn positions_tagged(&self, tag: &str) -> Vec<Position> {
        self.events
            .borrow()
            .iter()
            .filter(|e| e.tag == tag)
            .map(|e| e.position.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

impl TraceSink for TraceLog {
    fn emit(&mut self, event: TraceEvent) {
        self.events.borrow_mut().push(event);
    }
}
