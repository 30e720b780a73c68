//! Behaviour tree kernel types shared by the executor and by tree providers.
//!
//! The conceptual tree ([`ModelTask`]) is immutable data; everything that runs
//! lives in `bt-exec`.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod config;
pub mod context;
pub mod error;
pub mod leaf;
pub mod model;
pub mod position;
pub mod rng;
pub mod state;
pub mod status;

pub use config::ExecutorConfig;
pub use context::{Context, Variable};
pub use error::{BtError, Result};
pub use leaf::{Condition, LeafFactory, LeafTask};
pub use model::{InterrupterId, ModelKind, ModelRef, ModelTask, ParallelPolicy};
pub use position::Position;
pub use rng::{DeterministicRng, SplitMix64};
pub use state::TaskState;
pub use status::{Status, StatusChange};
