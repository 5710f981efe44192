//! Crate root: wires together the compilation pipeline for one unit.
//!
//! - `tokenizer` scans source text into a lazy stream of classified tokens.
//! - `parser` walks the grammar with one token of lookahead and reports each
//!   production to a backend.
//! - `codegen` is the backend that emits VM instructions, driving the
//!   `symbol_table`; `markup` is the backend that renders the parse tree.
//! - `error` holds the diagnostics shared by every stage.
//! - `host` locates units on disk for the command-line driver.
//!
//! Units are independent: nothing is shared between two calls to [`compile`].

pub mod codegen;
pub mod error;
pub mod host;
pub mod markup;
pub mod parser;
pub mod symbol_table;
pub mod tokenizer;
pub mod ty;
pub mod vm;

use log::debug;

pub use error::{CompileError, CompileResult, ErrorKind, Site};

use codegen::CodeGen;
use markup::TreeWriter;
use tokenizer::Tokenizer;

/// Unit name used in diagnostics when the caller does not supply one.
pub const ANONYMOUS_UNIT: &str = "<source>";

/// What a compilation produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
  /// Stack-machine instructions, one per line.
  #[default]
  Vm,
  /// The parse tree as nested markup.
  Xml,
}

impl OutputMode {
  pub fn extension(self) -> &'static str {
    match self {
      Self::Vm => "vm",
      Self::Xml => "xml",
    }
  }
}

/// Output of one successfully compiled unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
  pub class_name: String,
  pub mode: OutputMode,
  pub text: String,
}

/// Compile one class.
pub fn compile(source: &str, mode: OutputMode) -> CompileResult<Artifact> {
  compile_unit(ANONYMOUS_UNIT, source, mode, None)
}

/// Compile one class, naming the unit in diagnostics. When `expected_class`
/// is given the declared class name must match it.
pub fn compile_unit(
  unit: &str,
  source: &str,
  mode: OutputMode,
  expected_class: Option<&str>,
) -> CompileResult<Artifact> {
  debug!("compiling unit {unit} ({mode:?})");
  let tokens = Tokenizer::new(unit, source);
  let (class_name, text) = match mode {
    OutputMode::Vm => {
      let mut codegen = CodeGen::new();
      let class_name = parser::parse(tokens, &mut codegen, expected_class)?;
      (class_name, codegen.finish())
    }
    OutputMode::Xml => {
      let mut writer = TreeWriter::new();
      let class_name = parser::parse(tokens, &mut writer, expected_class)?;
      (class_name, writer.finish())
    }
  };
  debug!("unit {unit} compiled: class {class_name}, {} lines", text.lines().count());
  Ok(Artifact {
    class_name,
    mode,
    text,
  })
}
