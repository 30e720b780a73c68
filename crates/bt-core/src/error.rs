use thiserror::Error;

use crate::{Position, Status};

/// Protocol violations raised by the execution engine.
///
/// Task failure is never an error: it is reported as [`Status::Failure`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BtError {
    #[error("task at {position} ticked before being spawned")]
    NotSpawned { position: Position },

    #[error("task at {position} spawned twice")]
    AlreadySpawned { position: Position },

    #[error("task at {position} terminated before being spawned")]
    TerminatedBeforeSpawn { position: Position },

    #[error("task at {position} returned {status} from its tick routine")]
    InvalidTickStatus { position: Position, status: Status },

    #[error("unknown or released task handle")]
    UnknownTask,

    #[error("task at {position} re-entered while its behaviour is executing")]
    BehaviourInUse { position: Position },
}

pub type Result<T, E = BtError> = std::result::Result<T, E>;
