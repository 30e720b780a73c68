#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use bt_core::{Context, LeafTask, ModelRef, ModelTask, Status};

/// Shared event log written by [`Scripted`] leaves: `spawn:a`, `tick:a`, `abort:a`.
#[derive(Debug, Clone, Default)]
pub struct Log(Rc<RefCell<Vec<String>>>);

impl Log {
    pub fn push(&self, event: impl Into<String>) {
        self.0.borrow_mut().push(event.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.borrow().clone()
    }

    pub fn count(&self, event: &str) -> usize {
        self.0.borrow().iter().filter(|e| *e == event).count()
    }

    pub fn contains(&self, event: &str) -> bool {
        self.count(event) > 0
    }

    /// Names of the leaves spawned so far, in spawn order.
    pub fn spawned(&self) -> Vec<String> {
        self.0
            .borrow()
            .iter()
            .filter_map(|e| e.strip_prefix("spawn:").map(str::to_string))
            .collect()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

/// Leaf that plays back `script` one status per tick, repeating the last one.
struct Scripted {
    name: String,
    script: Rc<[Status]>,
    cursor: usize,
    log: Log,
}

impl LeafTask for Scripted {
    fn start(&mut self, _context: &Context) {
        self.log.push(format!("spawn:{}", self.name));
    }

    fn tick(&mut self, _context: &Context) -> Status {
        self.log.push(format!("tick:{}", self.name));
        let status = self.script[self.cursor.min(self.script.len() - 1)];
        self.cursor += 1;
        status
    }

    fn abort(&mut self, _context: &Context) {
        self.log.push(format!("abort:{}", self.name));
    }
}

pub fn scripted(name: &str, log: &Log, script: &[Status]) -> ModelRef {
    assert!(!script.is_empty(), "script needs at least one status");
    let name = name.to_string();
    let script: Rc<[Status]> = script.into();
    let log = log.clone();
    let leaf_name = name.clone();
    ModelTask::action(
        name,
        Rc::new(move || {
            Box::new(Scripted {
                name: leaf_name.clone(),
                script: script.clone(),
                cursor: 0,
                log: log.clone(),
            }) as Box<dyn LeafTask>
        }),
    )
}

/// Leaf that never finishes on its own.
pub fn running(name: &str, log: &Log) -> ModelRef {
    scripted(name, log, &[Status::Running])
}

pub fn succeeds(name: &str, log: &Log) -> ModelRef {
    scripted(name, log, &[Status::Success])
}

pub fn fails(name: &str, log: &Log) -> ModelRef {
    scripted(name, log, &[Status::Failure])
}

/// Leaf that writes `value` under `name` and succeeds.
struct Write {
    name: String,
    value: i64,
}

impl LeafTask for Write {
    fn tick(&mut self, context: &Context) -> Status {
        context.set_variable(self.name.clone(), self.value);
        Status::Success
    }
}

pub fn writes(name: &str, value: i64) -> ModelRef {
    let name = name.to_string();
    ModelTask::action(
        format!("write:{name}"),
        Rc::new(move || {
            Box::new(Write {
                name: name.clone(),
                value,
            }) as Box<dyn LeafTask>
        }),
    )
}

/// Condition reading a boolean flag from the context (missing reads as `false`).
pub fn flag(name: &'static str) -> ModelRef {
    ModelTask::condition_fn(name, move |ctx| ctx.get::<bool>(name).unwrap_or(false))
}
