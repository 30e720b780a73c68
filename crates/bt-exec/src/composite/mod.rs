//! Composite tasks: several children, one combined status.

mod parallel;
mod priority;
mod sequence;

pub(crate) use parallel::ParallelTask;
pub(crate) use priority::{DynamicPriorityList, StaticPriorityList};
pub(crate) use sequence::SequentialTask;
