//! The CPU context: the register file, the fetch-decode-execute loop, and
//! the mode/timer state machine. This module owns the register file
//! exclusively — the only way it touches the memory context's state is by
//! issuing READ/WRITE commands over the channel pair.

pub mod instructions;

use log::{debug, trace};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::channel::{CellReceiver, CellSender};
use crate::error::SimError;
use crate::memory::{SYSTEM_REGION_END, SYSTEM_REGION_START, USER_REGION_END};
use instructions::Op;

/// The CPU's privilege mode. spec.md calls this "a boolean mode flag"; a
/// two-variant enum is the same thing with illegal states unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    User,
    Kernel,
}

const TIMER_HANDLER_ENTRY: i32 = 1000;
const SYSCALL_HANDLER_ENTRY: i32 = 1500;
const EXIT_COMMAND: i32 = 99;

pub struct Cpu {
    pc: i32,
    sp: i32,
    ir: i32,
    ac: i32,
    x: i32,
    y: i32,
    mode: Mode,
    timer: u64,
    interrupt_period: u32,
    rng: StdRng,
}

impl Cpu {
    /// Builds a fresh CPU: PC=0, SP=1000, mode=User, timer=0, as specified.
    /// AC/X/Y/IR are left at 0, which is within spec (unspecified on entry,
    /// but must be written before being read by a well-formed program).
    pub fn new(interrupt_period: u32) -> Self {
        Cpu {
            pc: 0,
            sp: USER_REGION_END + 1,
            ir: 0,
            ac: 0,
            x: 0,
            y: 0,
            mode: Mode::User,
            timer: 0,
            interrupt_period,
            rng: seeded_rng(),
        }
    }

    #[cfg(test)]
    fn with_rng(interrupt_period: u32, rng: StdRng) -> Self {
        let mut cpu = Self::new(interrupt_period);
        cpu.rng = rng;
        cpu
    }

    pub fn pc(&self) -> i32 {
        self.pc
    }
    pub fn sp(&self) -> i32 {
        self.sp
    }
    pub fn ac(&self) -> i32 {
        self.ac
    }
    pub fn x(&self) -> i32 {
        self.x
    }
    pub fn y(&self) -> i32 {
        self.y
    }
    pub fn mode(&self) -> Mode {
        self.mode
    }
    pub fn timer(&self) -> u64 {
        self.timer
    }

    fn validate(&self, addr: i32) -> Result<(), SimError> {
        let in_range = match self.mode {
            Mode::User => (0..=USER_REGION_END).contains(&addr),
            Mode::Kernel => (SYSTEM_REGION_START..=SYSTEM_REGION_END).contains(&addr),
        };
        if in_range {
            Ok(())
        } else {
            Err(SimError::Protection {
                addr,
                mode: self.mode,
            })
        }
    }

    fn read_cell(
        &self,
        addr: i32,
        tx: &mut CellSender,
        rx: &mut CellReceiver,
    ) -> Result<i32, SimError> {
        self.validate(addr)?;
        tx.send_cell(82)?;
        tx.send_cell(addr)?;
        rx.recv_cell()
    }

    fn write_cell(&self, addr: i32, value: i32, tx: &mut CellSender) -> Result<(), SimError> {
        self.validate(addr)?;
        tx.send_cell(87)?;
        tx.send_cell(addr)?;
        tx.send_cell(value)?;
        Ok(())
    }

    /// Saves PC then SP onto the system stack (1999, then 1998), switches to
    /// kernel mode, and resumes execution at `entry`. Shared by the timer
    /// interrupt and SysCall, which save identical state — only the mode
    /// flip happens at a different point relative to PC's own advance (see
    /// the SysCall arm below), which is why the flip itself stays outside
    /// this helper.
    fn enter_kernel(&mut self, tx: &mut CellSender, entry: i32) -> Result<(), SimError> {
        self.write_cell(SYSTEM_REGION_END, self.pc, tx)?;
        self.write_cell(SYSTEM_REGION_END - 1, self.sp, tx)?;
        self.sp = SYSTEM_REGION_END - 1;
        self.pc = entry;
        Ok(())
    }

    fn maybe_timer_interrupt(&mut self, tx: &mut CellSender) -> Result<(), SimError> {
        if self.mode == Mode::User
            && self.interrupt_period > 0
            && self.timer % self.interrupt_period as u64 == 0
        {
            debug!("timer interrupt at pc={}, entering kernel mode", self.pc);
            self.mode = Mode::Kernel;
            self.enter_kernel(tx, TIMER_HANDLER_ENTRY)?;
        }
        Ok(())
    }

    /// Runs the fetch-decode-execute loop to completion: either opcode 50
    /// retires and this returns `Ok(())`, or a fatal error aborts the run.
    pub fn run(&mut self, tx: &mut CellSender, rx: &mut CellReceiver) -> Result<(), SimError> {
        loop {
            let fetch_pc = self.pc;
            self.ir = self.read_cell(fetch_pc, tx, rx)?;
            let op = Op::try_from(self.ir)?;

            let halted = self.execute(op, tx, rx)?;
            trace!("retired {op} fetched at pc={fetch_pc}, new pc={}", self.pc);
            if halted {
                return Ok(());
            }

            self.timer += 1;
            self.maybe_timer_interrupt(tx)?;
        }
    }

    /// Executes one instruction. Returns `Ok(true)` if the CPU should halt
    /// (opcode 50), which also skips the timer increment/interrupt check
    /// exactly as the reference implementation does for its terminal case.
    fn execute(
        &mut self,
        op: Op,
        tx: &mut CellSender,
        rx: &mut CellReceiver,
    ) -> Result<bool, SimError> {
        match op {
            Op::LoadValue => {
                self.pc = self.pc.wrapping_add(1);
                self.ac = self.read_cell(self.pc, tx, rx)?;
                self.pc = self.pc.wrapping_add(1);
            }
            Op::LoadAddr => {
                self.pc = self.pc.wrapping_add(1);
                let addr = self.read_cell(self.pc, tx, rx)?;
                self.ac = self.read_cell(addr, tx, rx)?;
                self.pc = self.pc.wrapping_add(1);
            }
            Op::LoadInd => {
                self.pc = self.pc.wrapping_add(1);
                let addr = self.read_cell(self.pc, tx, rx)?;
                let indirect = self.read_cell(addr, tx, rx)?;
                self.ac = self.read_cell(indirect, tx, rx)?;
                self.pc = self.pc.wrapping_add(1);
            }
            Op::LoadIdxX => {
                self.pc = self.pc.wrapping_add(1);
                let addr = self.read_cell(self.pc, tx, rx)?;
                self.ac = self.read_cell(addr.wrapping_add(self.x), tx, rx)?;
                self.pc = self.pc.wrapping_add(1);
            }
            Op::LoadIdxY => {
                self.pc = self.pc.wrapping_add(1);
                let addr = self.read_cell(self.pc, tx, rx)?;
                self.ac = self.read_cell(addr.wrapping_add(self.y), tx, rx)?;
                self.pc = self.pc.wrapping_add(1);
            }
            Op::LoadSpX => {
                self.pc = self.pc.wrapping_add(1);
                self.ac = self.read_cell(self.sp.wrapping_add(self.x), tx, rx)?;
            }
            Op::Store => {
                self.pc = self.pc.wrapping_add(1);
                let addr = self.read_cell(self.pc, tx, rx)?;
                self.write_cell(addr, self.ac, tx)?;
                self.pc = self.pc.wrapping_add(1);
            }
            Op::Rand => {
                self.pc = self.pc.wrapping_add(1);
                self.ac = self.rng.gen_range(1..=100);
            }
            Op::Put => {
                self.pc = self.pc.wrapping_add(1);
                let port = self.read_cell(self.pc, tx, rx)?;
                self.put(port);
                self.pc = self.pc.wrapping_add(1);
            }
            Op::AddX => {
                self.pc = self.pc.wrapping_add(1);
                self.ac = self.ac.wrapping_add(self.x);
            }
            Op::AddY => {
                self.pc = self.pc.wrapping_add(1);
                self.ac = self.ac.wrapping_add(self.y);
            }
            Op::SubX => {
                self.pc = self.pc.wrapping_add(1);
                self.ac = self.ac.wrapping_sub(self.x);
            }
            Op::SubY => {
                self.pc = self.pc.wrapping_add(1);
                self.ac = self.ac.wrapping_sub(self.y);
            }
            Op::CopyToX => {
                self.pc = self.pc.wrapping_add(1);
                self.x = self.ac;
            }
            Op::CopyFromX => {
                self.pc = self.pc.wrapping_add(1);
                self.ac = self.x;
            }
            Op::CopyToY => {
                self.pc = self.pc.wrapping_add(1);
                self.y = self.ac;
            }
            Op::CopyFromY => {
                self.pc = self.pc.wrapping_add(1);
                self.ac = self.y;
            }
            Op::CopyToSp => {
                self.pc = self.pc.wrapping_add(1);
                self.sp = self.ac;
            }
            Op::CopyFromSp => {
                self.pc = self.pc.wrapping_add(1);
                self.ac = self.sp;
            }
            Op::Jump => {
                self.pc = self.pc.wrapping_add(1);
                self.pc = self.read_cell(self.pc, tx, rx)?;
            }
            Op::JumpIfZero => {
                self.pc = self.pc.wrapping_add(1);
                if self.ac == 0 {
                    self.pc = self.read_cell(self.pc, tx, rx)?;
                } else {
                    self.pc = self.pc.wrapping_add(1);
                }
            }
            Op::JumpIfNotZero => {
                self.pc = self.pc.wrapping_add(1);
                if self.ac != 0 {
                    self.pc = self.read_cell(self.pc, tx, rx)?;
                } else {
                    self.pc = self.pc.wrapping_add(1);
                }
            }
            Op::Call => {
                // The return address saved is the address of this Call's own
                // immediate operand cell, not its value — Return adds 1 to
                // land on the instruction that follows the Call.
                self.pc = self.pc.wrapping_add(1);
                self.sp = self.sp.wrapping_sub(1);
                self.write_cell(self.sp, self.pc, tx)?;
                self.pc = self.read_cell(self.pc, tx, rx)?;
            }
            Op::Return => {
                self.pc = self.sp;
                self.pc = self.read_cell(self.pc, tx, rx)?;
                self.sp = self.sp.wrapping_add(1);
                self.pc = self.pc.wrapping_add(1);
            }
            Op::IncX => {
                self.pc = self.pc.wrapping_add(1);
                self.x = self.x.wrapping_add(1);
            }
            Op::DecX => {
                self.pc = self.pc.wrapping_add(1);
                self.x = self.x.wrapping_sub(1);
            }
            Op::PushAc => {
                self.pc = self.pc.wrapping_add(1);
                self.sp = self.sp.wrapping_sub(1);
                self.write_cell(self.sp, self.ac, tx)?;
            }
            Op::PopAc => {
                self.pc = self.pc.wrapping_add(1);
                self.ac = self.read_cell(self.sp, tx, rx)?;
                self.sp = self.sp.wrapping_add(1);
            }
            Op::SysCall => {
                debug!("syscall at pc={}, entering kernel mode", self.pc);
                self.mode = Mode::Kernel;
                self.pc = self.pc.wrapping_add(1);
                self.enter_kernel(tx, SYSCALL_HANDLER_ENTRY)?;
            }
            Op::SysReturn => {
                let saved_sp = self.read_cell(self.sp, tx, rx)?;
                self.sp = self.sp.wrapping_add(1);
                let saved_pc = self.read_cell(self.sp, tx, rx)?;
                self.mode = Mode::User;
                self.sp = saved_sp;
                self.pc = saved_pc;
                debug!("sysreturn to pc={}, leaving kernel mode", self.pc);
            }
            Op::End => {
                tx.send_cell(EXIT_COMMAND)?;
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn put(&self, port: i32) {
        match port {
            1 => {
                print!("{}", self.ac);
            }
            2 => {
                print!("{}", (self.ac as u8) as char);
            }
            _ => {}
        }
        use std::io::Write;
        let _ = std::io::stdout().flush();
    }
}

/// Seeds the CPU's PRNG once at startup. `ACCUMULON_SEED`, when set and
/// parseable as a `u64`, makes Rand (opcode 8) deterministic for tests; the
/// default path seeds from OS entropy. Either way this is one RNG instance
/// for the whole run, fixing the reference source's per-call reseed defect.
fn seeded_rng() -> StdRng {
    match std::env::var("ACCUMULON_SEED").ok().and_then(|s| s.parse::<u64>().ok()) {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_rng(rand::rngs::OsRng).expect("OS entropy source failed"),
    }
}
