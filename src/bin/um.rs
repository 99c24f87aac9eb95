use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use universal_machine::io::{Stdin, Stdout};
use universal_machine::loader::read_program_file;
use universal_machine::machine::Machine;

/// Run a Universal Machine program
#[derive(Parser, Debug)]
#[command(author, version, about, long_about)]
struct Args {
    /// Path to the program file (a scroll of big-endian 32-bit code words)
    program: PathBuf,

    /// Increase log verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn install_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let args = Args::parse();
    install_tracing(args.verbose);

    let program = match read_program_file(&args.program) {
        Ok(bytes) => bytes,
        Err(e) => {
            error!("{e}");
            return ExitCode::from(2);
        }
    };

    let mut machine = match Machine::load(&program) {
        Ok(machine) => machine,
        Err(e) => {
            error!("{e}");
            return ExitCode::from(2);
        }
    };

    let mut input = Stdin;
    let mut output = Stdout;
    match machine.run(&mut input, &mut output) {
        Ok(()) => {
            info!("halted at pc={}", machine.pc());
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
