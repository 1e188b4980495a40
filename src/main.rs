mod args;
mod channel;
mod cpu;
mod error;
mod loader;
mod memory;

use std::process::ExitCode;
use std::thread;

use ansi_term::Colour::Red;
use anyhow::Context;
use log::info;

use args::Args;
use cpu::Cpu;
use error::SimError;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", Red.bold().paint(format!("accumulon: {err:#}")));
            ExitCode::FAILURE
        }
    }
}

fn run() -> anyhow::Result<()> {
    let args = Args::parse_args()?;
    info!(
        "loading {} (interrupt period {})",
        args.program_image.display(),
        args.interrupt_period
    );

    let store = loader::load_image(&args.program_image)
        .with_context(|| format!("loading {}", args.program_image.display()))?;

    let (mut cpu_tx, mem_rx) = channel::cell_link();
    let (mem_tx, mut cpu_rx) = channel::cell_link();

    let memory_thread = thread::Builder::new()
        .name("memory".into())
        .spawn(move || memory::run(store, mem_rx, mem_tx))
        .context("spawning the memory context thread")?;

    let mut cpu = Cpu::new(args.interrupt_period);
    let cpu_result = cpu.run(&mut cpu_tx, &mut cpu_rx);
    drop(cpu_tx);

    let memory_result = memory_thread
        .join()
        .map_err(|_| SimError::Protocol("memory context thread panicked".into()))?;

    cpu_result?;
    memory_result?;

    info!("halted cleanly after {} instructions", cpu.timer());
    Ok(())
}
