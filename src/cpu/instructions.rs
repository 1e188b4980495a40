//! The instruction set: an exhaustive tagged enum over every opcode spec.md
//! defines, so a missing case is a compile-time error and the DECODE error
//! category collapses to the single `TryFrom` failure path (per DESIGN
//! NOTES §9).

use std::fmt;

use crate::error::SimError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    LoadValue,     // 1  AC <- immediate
    LoadAddr,      // 2  AC <- mem[immediate]
    LoadInd,       // 3  AC <- mem[mem[immediate]]
    LoadIdxX,      // 4  AC <- mem[immediate + X]
    LoadIdxY,      // 5  AC <- mem[immediate + Y]
    LoadSpX,       // 6  AC <- mem[SP + X]
    Store,         // 7  mem[immediate] <- AC
    Rand,          // 8  AC <- random in [1, 100]
    Put,           // 9  write AC to the port named by the immediate
    AddX,          // 10 AC <- AC + X
    AddY,          // 11 AC <- AC + Y
    SubX,          // 12 AC <- AC - X
    SubY,          // 13 AC <- AC - Y
    CopyToX,       // 14 X <- AC
    CopyFromX,     // 15 AC <- X
    CopyToY,       // 16 Y <- AC
    CopyFromY,     // 17 AC <- Y
    CopyToSp,      // 18 SP <- AC
    CopyFromSp,    // 19 AC <- SP
    Jump,          // 20 PC <- immediate
    JumpIfZero,    // 21 if AC == 0, PC <- immediate
    JumpIfNotZero, // 22 if AC != 0, PC <- immediate
    Call,          // 23 push return address, PC <- immediate
    Return,        // 24 pop return address into PC
    IncX,          // 25 X <- X + 1
    DecX,          // 26 X <- X - 1
    PushAc,        // 27 push AC
    PopAc,         // 28 pop into AC
    SysCall,       // 29 enter kernel mode, PC <- 1500
    SysReturn,     // 30 leave kernel mode
    End,           // 50 emit EXIT, halt
}

impl TryFrom<i32> for Op {
    type Error = SimError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Ok(match value {
            1 => Op::LoadValue,
            2 => Op::LoadAddr,
            3 => Op::LoadInd,
            4 => Op::LoadIdxX,
            5 => Op::LoadIdxY,
            6 => Op::LoadSpX,
            7 => Op::Store,
            8 => Op::Rand,
            9 => Op::Put,
            10 => Op::AddX,
            11 => Op::AddY,
            12 => Op::SubX,
            13 => Op::SubY,
            14 => Op::CopyToX,
            15 => Op::CopyFromX,
            16 => Op::CopyToY,
            17 => Op::CopyFromY,
            18 => Op::CopyToSp,
            19 => Op::CopyFromSp,
            20 => Op::Jump,
            21 => Op::JumpIfZero,
            22 => Op::JumpIfNotZero,
            23 => Op::Call,
            24 => Op::Return,
            25 => Op::IncX,
            26 => Op::DecX,
            27 => Op::PushAc,
            28 => Op::PopAc,
            29 => Op::SysCall,
            30 => Op::SysReturn,
            50 => Op::End,
            other => return Err(SimError::Decode(other)),
        })
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_every_table_entry() {
        let cases = [
            (1, Op::LoadValue),
            (9, Op::Put),
            (23, Op::Call),
            (24, Op::Return),
            (30, Op::SysReturn),
            (50, Op::End),
        ];
        for (code, expected) in cases {
            assert_eq!(Op::try_from(code).unwrap(), expected);
        }
    }

    #[test]
    fn rejects_unknown_opcode() {
        assert!(matches!(Op::try_from(31), Err(SimError::Decode(31))));
        assert!(matches!(Op::try_from(99), Err(SimError::Decode(99))));
    }
}
