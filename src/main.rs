use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use log::{error, warn};

use jackc::OutputMode;
use jackc::host::{self, display_name};

/// Compile Jack classes into stack-machine VM code
#[derive(Parser)]
#[command(name = "jackc")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// A .jack file, or a directory whose .jack files are all compiled
  path: PathBuf,

  /// Emit the parse tree as XML instead of VM code
  #[arg(short = 'x', long)]
  xml: bool,

  /// Print artifacts to stdout instead of writing them next to the sources
  #[arg(long)]
  stdout: bool,

  /// Increase logging verbosity (repeat for more)
  #[arg(short, long, action = ArgAction::Count)]
  verbose: u8,

  /// Silence all logging
  #[arg(short, long)]
  quiet: bool,
}

fn main() {
  let cli = Cli::parse();
  match run(&cli) {
    Ok(true) => {}
    Ok(false) => process::exit(1),
    Err(err) => {
      eprintln!("error: {err:#}");
      process::exit(1);
    }
  }
}

/// Compile every unit under `cli.path`. Returns whether all of them succeeded;
/// a failing unit is reported and the rest still compile.
fn run(cli: &Cli) -> Result<bool> {
  stderrlog::new()
    .module("jackc")
    .quiet(cli.quiet)
    .verbosity(usize::from(cli.verbose) + 1)
    .init()
    .context("failed to initialise logging")?;

  let mode = if cli.xml {
    OutputMode::Xml
  } else {
    OutputMode::Vm
  };

  let units = host::discover(&cli.path)?;
  if units.is_empty() {
    warn!("no .jack files found in '{}'", cli.path.display());
  }

  let failures = host::compile_all(&units, mode, |outcome| {
    if cli.stdout {
      print!("{}", outcome.artifact.text);
      return Ok(());
    }
    host::write(outcome)?;
    println!(
      "Compiled '{}' to '{}'",
      display_name(&outcome.source),
      display_name(&outcome.output)
    );
    Ok(())
  });

  for err in &failures {
    eprintln!("{err}\n");
  }
  if !failures.is_empty() {
    error!("{} of {} units failed", failures.len(), units.len());
  }
  Ok(failures.is_empty())
}
