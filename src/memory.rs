//! The memory context: owns the 2000-cell store exclusively and serves it to
//! the CPU context as a request/response loop over the channel pair.

use log::trace;

use crate::channel::{CellReceiver, CellSender};
use crate::error::SimError;

pub const STORE_SIZE: usize = 2000;
pub const USER_REGION_END: i32 = 999;
pub const SYSTEM_REGION_START: i32 = 1000;
pub const SYSTEM_REGION_END: i32 = 1999;

/// Command opcodes, chosen by the original design as the ASCII code points
/// of 'R' and 'W', plus 99 for EXIT. The numeric values are load-bearing:
/// EXIT's value doubles as the sentinel the CPU's terminate instruction
/// emits, so they must not be renumbered even though they're now named.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Read = 82,
    Write = 87,
    Exit = 99,
}

impl TryFrom<i32> for Command {
    type Error = SimError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            82 => Ok(Command::Read),
            87 => Ok(Command::Write),
            99 => Ok(Command::Exit),
            other => Err(SimError::Protocol(format!(
                "unrecognised memory command opcode {other}"
            ))),
        }
    }
}

/// Runs the memory server loop to completion. Consumes the store (it is
/// never touched again after the memory thread joins) and the CPU-facing
/// ends of the channel pair.
///
/// Addresses arriving from the CPU are trusted here: protection is enforced
/// CPU-side before a command is ever emitted. A `debug_assert` still guards
/// the raw index so a defect in the CPU-side checker fails a test loudly
/// instead of silently reading/writing the wrong cell in release builds.
pub fn run(
    mut store: Box<[i32; STORE_SIZE]>,
    mut inbound: CellReceiver,
    mut outbound: CellSender,
) -> Result<(), SimError> {
    loop {
        let opcode = inbound.recv_cell()?;
        match Command::try_from(opcode)? {
            Command::Read => {
                let addr = inbound.recv_cell()?;
                debug_assert!((0..STORE_SIZE as i32).contains(&addr), "address {addr} out of range");
                let value = store[addr as usize];
                trace!("memory: read mem[{addr}] -> {value}");
                outbound.send_cell(value)?;
            }
            Command::Write => {
                let addr = inbound.recv_cell()?;
                let value = inbound.recv_cell()?;
                debug_assert!((0..STORE_SIZE as i32).contains(&addr), "address {addr} out of range");
                trace!("memory: write mem[{addr}] <- {value}");
                store[addr as usize] = value;
            }
            Command::Exit => {
                trace!("memory: exit command observed, terminating");
                return Ok(());
            }
        }
    }
}
