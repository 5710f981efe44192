//! Locating units on disk and pairing each with its output path.
//!
//! A unit is one `.jack` file holding one class named after the file. Output
//! is written next to the source with the extension of the output mode.

use std::borrow::Cow;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::debug;
use snafu::{ResultExt, Snafu, ensure};

use crate::{Artifact, CompileError, OutputMode, compile_unit};

pub const SOURCE_EXTENSION: &str = "jack";

#[derive(Debug, Snafu)]
pub enum HostError {
  #[snafu(display("cannot read '{}': {source}", path.display()))]
  Read { path: PathBuf, source: io::Error },

  #[snafu(display("cannot write '{}': {source}", path.display()))]
  Write { path: PathBuf, source: io::Error },

  #[snafu(display("'{}' is neither a directory nor a .jack file", path.display()))]
  InvalidPath { path: PathBuf },

  #[snafu(display("{source}"))]
  Compile { source: CompileError },
}

/// A compiled unit and where its artifact belongs.
#[derive(Debug)]
pub struct Outcome {
  pub source: PathBuf,
  pub output: PathBuf,
  pub artifact: Artifact,
}

/// List the units under `path`: the file itself, or every source file
/// directly inside a directory, sorted by name.
pub fn discover(path: &Path) -> Result<Vec<PathBuf>, HostError> {
  if path.is_dir() {
    let mut units = Vec::new();
    for entry in fs::read_dir(path).context(ReadSnafu { path })? {
      let candidate = entry.context(ReadSnafu { path })?.path();
      if candidate.is_file() && is_source(&candidate) {
        units.push(candidate);
      }
    }
    units.sort();
    return Ok(units);
  }

  ensure!(path.is_file() && is_source(path), InvalidPathSnafu { path });
  Ok(vec![path.to_path_buf()])
}

fn is_source(path: &Path) -> bool {
  path
    .extension()
    .is_some_and(|ext| ext == SOURCE_EXTENSION)
}

/// Read and compile one unit. The file stem must match the class name.
pub fn compile_file(path: &Path, mode: OutputMode) -> Result<Outcome, HostError> {
  let source = fs::read_to_string(path).context(ReadSnafu { path })?;
  let unit = path
    .file_name()
    .map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned());
  let stem = path.file_stem().map(|stem| stem.to_string_lossy());

  let artifact =
    compile_unit(&unit, &source, mode, stem.as_deref()).context(CompileSnafu)?;
  Ok(Outcome {
    source: path.to_path_buf(),
    output: path.with_extension(mode.extension()),
    artifact,
  })
}

/// Persist an artifact next to its source.
pub fn write(outcome: &Outcome) -> Result<(), HostError> {
  fs::write(&outcome.output, &outcome.artifact.text).context(WriteSnafu {
    path: &outcome.output,
  })?;
  debug!(
    "wrote {} bytes to '{}'",
    outcome.artifact.text.len(),
    outcome.output.display()
  );
  Ok(())
}

/// Compile every unit in order and hand each outcome to `emit`, which prints or
/// persists it. A unit that fails to compile or emit is recorded and the rest
/// still run; the failures are returned in unit order.
pub fn compile_all<F>(units: &[PathBuf], mode: OutputMode, mut emit: F) -> Vec<HostError>
where
  F: FnMut(&Outcome) -> Result<(), HostError>,
{
  let mut failures = Vec::new();
  for unit in units {
    if let Err(err) = compile_file(unit, mode).and_then(|outcome| emit(&outcome)) {
      debug!("unit '{}' failed", unit.display());
      failures.push(err);
    }
  }
  failures
}

pub fn display_name(path: &Path) -> Cow<'_, str> {
  path
    .file_name()
    .map_or_else(|| path.to_string_lossy(), |name| name.to_string_lossy())
}
