//! Command-line surface: a program image path and an optional interrupt
//! period, as spec'd in §6.1.

use std::path::PathBuf;

use clap::Parser;

use crate::error::SimError;

const DEFAULT_INTERRUPT_PERIOD: u32 = 1000;

#[derive(Debug, Parser)]
#[command(name = "accumulon", about = "A minimal accumulator-machine simulator")]
pub struct Args {
    /// Path to a program image in the cursor/signed-integer text format.
    pub program_image: PathBuf,

    /// Number of instructions between timer interrupts. Must be nonzero.
    #[arg(default_value_t = DEFAULT_INTERRUPT_PERIOD, value_parser = parse_interrupt_period)]
    pub interrupt_period: u32,
}

fn parse_interrupt_period(raw: &str) -> Result<u32, SimError> {
    let period: u32 = raw
        .parse()
        .map_err(|_| SimError::Args(format!("interrupt period \"{raw}\" is not a positive integer")))?;
    if period == 0 {
        return Err(SimError::Args("interrupt period must be nonzero".into()));
    }
    Ok(period)
}

impl Args {
    pub fn parse_args() -> Result<Self, SimError> {
        Args::try_parse().map_err(|e| SimError::Args(e.to_string()))
    }
}
