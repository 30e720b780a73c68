//! Tick-driven behaviour tree executor built on `bt-core`.
//!
//! A [`BtExecutor`] turns an immutable [`bt_core::ModelTask`] tree into
//! execution tasks on demand, ticks the tasks that asked to be ticked, and
//! propagates child completion upwards without waiting for the next tick.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod arena;
mod composite;
mod decorator;
pub mod executor;
mod leaf;
pub mod task;
pub mod trace;

pub use arena::TaskId;
pub use executor::{BtExecutor, TaskList};
pub use task::{ExecutionTask, Gate};
pub use trace::{NullTraceSink, TraceEvent, TraceLog, TraceSink, VecTraceSink};

pub use bt_core;
