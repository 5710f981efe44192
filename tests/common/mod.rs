//! Shared helpers for the integration tests.
//!
//! In a test file, add:
//! ```ignore
//! mod common;
//! use common::*;
//! ```

#![allow(dead_code)]

pub use jackc::{CompileError, ErrorKind, OutputMode, compile};

/// Compile `source` in instruction mode and split the output into lines.
pub fn vm_lines(source: &str) -> Vec<String> {
  compile(source, OutputMode::Vm)
    .unwrap_or_else(|err| panic!("compilation failed:\n{err}"))
    .text
    .lines()
    .map(str::to_string)
    .collect()
}

/// Compile `source` in tree-markup mode.
pub fn xml(source: &str) -> String {
  compile(source, OutputMode::Xml)
    .unwrap_or_else(|err| panic!("compilation failed:\n{err}"))
    .text
}

/// Compile `source` in instruction mode, expecting a failure.
pub fn vm_error(source: &str) -> CompileError {
  match compile(source, OutputMode::Vm) {
    Ok(artifact) => panic!("expected an error, got:\n{}", artifact.text),
    Err(err) => err,
  }
}

/// Wrap statements in a function `Main.main` with the given locals.
pub fn in_main(locals: &str, statements: &str) -> String {
  format!("class Main {{ function void main() {{ {locals} {statements} }} }}")
}

/// Position of `needle` in `lines`, panicking with the listing if absent.
pub fn position(lines: &[String], needle: &str) -> usize {
  lines
    .iter()
    .position(|line| line == needle)
    .unwrap_or_else(|| panic!("'{needle}' not found in:\n{}", lines.join("\n")))
}

/// Assert that `expected` appears in `lines` as a contiguous run.
pub fn assert_sequence(lines: &[String], expected: &[&str]) {
  let found = lines
    .windows(expected.len())
    .any(|window| window.iter().zip(expected).all(|(line, want)| line == want));
  assert!(
    found,
    "sequence {expected:?} not found in:\n{}",
    lines.join("\n")
  );
}
