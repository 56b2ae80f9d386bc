use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

use binpp::{translate_to_bytes, Flags, Vm};

/// A bytecode virtual machine for a small esoteric stack language.
#[derive(Parser, Debug)]
#[command(name = "binpp", version, about, long_about = None)]
struct Cli {
    /// Program to run, or to translate when `--translate` is given.
    /// `--version` short-circuits this requirement.
    file: PathBuf,

    /// Read FILE as textual binary literals and write its compiled byte
    /// form to PATH instead of running it.
    #[arg(short = 't', long = "translate", value_name = "PATH")]
    translate: Option<PathBuf>,

    /// Trace each instruction and block for a line of stdin between steps.
    #[arg(long)]
    step: bool,

    /// Repeat to raise the tracing verbosity (off, error, info, debug).
    #[arg(short = 'v', long = "verbosity", action = clap::ArgAction::Count)]
    verbosity: u8,
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::OFF,
        1 => LevelFilter::ERROR,
        2 => LevelFilter::INFO,
        _ => LevelFilter::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .without_time()
        .init();
}

fn run_translate(source_path: &PathBuf, dest_path: &PathBuf) -> Result<(), ()> {
    let source = match std::fs::read(source_path) {
        Ok(source) => source,
        Err(err) => {
            error!(%err, path = %source_path.display(), "cannot read source file");
            return Err(());
        }
    };

    let bytes = match translate_to_bytes(&source) {
        Ok(bytes) => bytes,
        Err(err) => {
            error!(%err, "translation failed");
            return Err(());
        }
    };

    if let Err(err) = std::fs::write(dest_path, bytes) {
        error!(%err, path = %dest_path.display(), "cannot write translated file");
        return Err(());
    }

    Ok(())
}

fn run_program(source_path: &PathBuf, flags: Flags) -> Result<(), ()> {
    if !source_path.is_file() {
        error!(path = %source_path.display(), "file not found");
        return Err(());
    }

    let source = match std::fs::read(source_path) {
        Ok(source) => source,
        Err(err) => {
            error!(%err, path = %source_path.display(), "cannot read source file");
            return Err(());
        }
    };

    let mut vm = match Vm::from_source(source_path.clone(), &source, flags) {
        Ok(vm) => vm,
        Err(err) => {
            error!(%err, "decode failed");
            return Err(());
        }
    };

    if let Err(err) = vm.run() {
        error!(%err, "fatal error");
        return Err(());
    }

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbosity);

    let result = match &cli.translate {
        Some(dest) => run_translate(&cli.file, dest),
        None => run_program(&cli.file, Flags { step: cli.step }),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(()) => ExitCode::FAILURE,
    }
}
