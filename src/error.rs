//! Diagnostics shared by every stage of a compilation unit.
//!
//! Every failure is fatal for the unit it occurs in. Errors are anchored to a
//! [`Site`] so the report can quote the offending line and point at the
//! column with a caret.

use std::fmt;

use snafu::Snafu;

use crate::symbol_table::{Kind, SymbolError};

pub type CompileResult<T> = Result<T, CompileError>;

/// Category of a [`CompileError`], for callers that branch on the failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  Lexical,
  Syntax,
  UndefinedSymbol,
  DuplicateDeclaration,
  ClassName,
}

/// Where in a unit an error was detected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Site {
  pub unit: String,
  /// 1-based line number.
  pub line: usize,
  /// 1-based column, counted in characters.
  pub column: usize,
  /// The full source line containing the error.
  pub text: String,
}

impl Site {
  /// Resolve a byte offset in `source` into line/column information.
  pub fn locate(unit: &str, source: &str, loc: usize) -> Self {
    let mut loc = loc.min(source.len());
    while !source.is_char_boundary(loc) {
      loc -= 1;
    }
    let line_start = source[..loc].rfind('\n').map_or(0, |i| i + 1);
    let line_end = source[loc..].find('\n').map_or(source.len(), |i| loc + i);
    let line = source[..line_start].matches('\n').count() + 1;
    let column = source[line_start..loc].chars().count() + 1;
    Self {
      unit: unit.to_string(),
      line,
      column,
      text: source[line_start..line_end].trim_end_matches('\r').to_string(),
    }
  }

  /// Caret line aligned under `text`; tabs are kept so the caret lines up.
  fn marker(&self) -> String {
    let mut marker: String = self
      .text
      .chars()
      .take(self.column - 1)
      .map(|c| if c == '\t' { '\t' } else { ' ' })
      .collect();
    marker.push('^');
    marker
  }
}

impl fmt::Display for Site {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "Error in '{}', line {}:", self.unit, self.line)?;
    writeln!(f, "    {}", self.text)?;
    write!(f, "    {}", self.marker())
  }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CompileError {
  #[snafu(display("{site}\nLexicalError: {message}"))]
  Lexical { site: Site, message: String },

  #[snafu(display("{site}\nSyntaxError: {message}"))]
  Syntax { site: Site, message: String },

  #[snafu(display("{site}\nUndefinedSymbolError: undeclared identifier '{name}'"))]
  UndefinedSymbol { site: Site, name: String },

  #[snafu(display(
    "{site}\nDuplicateDeclarationError: '{name}' is already declared as {existing} in this scope"
  ))]
  DuplicateDeclaration {
    site: Site,
    name: String,
    existing: Kind,
  },

  #[snafu(display(
    "{site}\nDuplicateDeclarationError: subroutine '{name}' is already declared in this class"
  ))]
  DuplicateSubroutine { site: Site, name: String },

  #[snafu(display(
    "{site}\nClassNameError: class '{found}' must be declared in a unit named '{expected}'"
  ))]
  ClassName {
    site: Site,
    expected: String,
    found: String,
  },
}

impl CompileError {
  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::Lexical { .. } => ErrorKind::Lexical,
      Self::Syntax { .. } => ErrorKind::Syntax,
      Self::UndefinedSymbol { .. } => ErrorKind::UndefinedSymbol,
      Self::DuplicateDeclaration { .. } | Self::DuplicateSubroutine { .. } => {
        ErrorKind::DuplicateDeclaration
      }
      Self::ClassName { .. } => ErrorKind::ClassName,
    }
  }

  pub fn site(&self) -> &Site {
    match self {
      Self::Lexical { site, .. }
      | Self::Syntax { site, .. }
      | Self::UndefinedSymbol { site, .. }
      | Self::DuplicateDeclaration { site, .. }
      | Self::DuplicateSubroutine { site, .. }
      | Self::ClassName { site, .. } => site,
    }
  }

  /// Anchor a positionless symbol table failure at `site`.
  pub(crate) fn from_symbol(err: SymbolError, site: Site) -> Self {
    match err {
      SymbolError::Duplicate { name, existing } => Self::DuplicateDeclaration {
        site,
        name,
        existing,
      },
      SymbolError::Undefined { name } => Self::UndefinedSymbol { site, name },
    }
  }
}
