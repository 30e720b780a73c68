#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Tuning knobs of a `BtExecutor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ExecutorConfig {
    /// Upper bound on ticks given to one guard executor per evaluation pass of a
    /// priority list. Short guards resolve within one outer tick; a guard that
    /// never finishes cannot stall the outer tick.
    pub guard_ticks_per_evaluation: u32,

    /// Seed of the executor's deterministic RNG (random sequence/selector ordering).
    pub seed: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            guard_ticks_per_evaluation: 20,
            seed: 0,
        }
    }
}

impl ExecutorConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_guard_ticks_per_evaluation(mut self, ticks: u32) -> Self {
        self.guard_ticks_per_evaluation = ticks.max(1);
        self
    }
}
