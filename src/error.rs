use thiserror::Error;

use crate::cpu::Mode;

/// The five fatal-error categories a run can end in. Every variant is fatal:
/// there is no recovery path inside the simulator, because a recoverable
/// fault would require a fault-handler ISA this instruction set doesn't have.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("Memory violation: address {addr} is not reachable in {mode:?} mode")]
    Protection { addr: i32, mode: Mode },

    #[error("channel or I/O failure: {0}")]
    Protocol(String),

    #[error("unknown opcode {0} in IR")]
    Decode(i32),

    #[error("program image error: {0}")]
    Loader(String),

    #[error("invalid arguments: {0}")]
    Args(String),
}

pub type SimResult<T> = Result<T, SimError>;
