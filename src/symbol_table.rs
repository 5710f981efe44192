//! Two-level symbol table: class scope plus the scope of the subroutine
//! currently being compiled.
//!
//! Indices are dense per kind and per scope. The subroutine scope is replaced
//! wholesale at the start of every subroutine, so nothing from a previous
//! subroutine can leak into the next one. Class scope lives for the whole
//! unit and is never reset.

use std::collections::HashMap;
use std::fmt;

use snafu::{OptionExt, Snafu};

use crate::ty::Type;

/// Storage category of a declared identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
  Static,
  Field,
  Argument,
  Local,
}

impl Kind {
  fn is_class_scope(self) -> bool {
    matches!(self, Self::Static | Self::Field)
  }
}

impl fmt::Display for Kind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::Static => "static",
      Self::Field => "field",
      Self::Argument => "argument",
      Self::Local => "local",
    })
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
  pub name: String,
  pub ty: Type,
  pub kind: Kind,
  pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
pub enum SymbolError {
  #[snafu(display("'{name}' is already declared as {existing}"))]
  Duplicate { name: String, existing: Kind },

  #[snafu(display("undeclared identifier '{name}'"))]
  Undefined { name: String },
}

#[derive(Debug, Default)]
struct Scope {
  entries: HashMap<String, Entry>,
}

impl Scope {
  fn count_of(&self, kind: Kind) -> usize {
    self.entries.values().filter(|entry| entry.kind == kind).count()
  }

  fn define(&mut self, name: &str, ty: Type, kind: Kind) -> Result<&Entry, SymbolError> {
    if let Some(existing) = self.entries.get(name) {
      return DuplicateSnafu {
        name,
        existing: existing.kind,
      }
      .fail();
    }
    let entry = Entry {
      name: name.to_string(),
      ty,
      kind,
      index: self.count_of(kind),
    };
    Ok(&*self.entries.entry(name.to_string()).or_insert(entry))
  }
}

#[derive(Debug, Default)]
pub struct SymbolTable {
  class: Scope,
  subroutine: Scope,
}

impl SymbolTable {
  pub fn new() -> Self {
    Self::default()
  }

  /// Replace the subroutine scope. When compiling a method, `receiver` names
  /// the enclosing class and binds the implicit `this` as argument 0.
  pub fn start_subroutine(&mut self, receiver: Option<&str>) {
    self.subroutine = Scope::default();
    if let Some(class_name) = receiver {
      let entry = Entry {
        name: "this".to_string(),
        ty: Type::class(class_name),
        kind: Kind::Argument,
        index: 0,
      };
      self.subroutine.entries.insert(entry.name.clone(), entry);
    }
  }

  /// Declare `name` in the scope its kind belongs to and assign the next
  /// index for that kind.
  pub fn define(&mut self, name: &str, ty: Type, kind: Kind) -> Result<&Entry, SymbolError> {
    let scope = if kind.is_class_scope() {
      &mut self.class
    } else {
      &mut self.subroutine
    };
    scope.define(name, ty, kind)
  }

  /// Subroutine scope first, then class scope.
  pub fn lookup(&self, name: &str) -> Option<&Entry> {
    self
      .subroutine
      .entries
      .get(name)
      .or_else(|| self.class.entries.get(name))
  }

  pub fn resolve(&self, name: &str) -> Result<&Entry, SymbolError> {
    self.lookup(name).context(UndefinedSnafu { name })
  }

  pub fn kind_of(&self, name: &str) -> Result<Kind, SymbolError> {
    self.resolve(name).map(|entry| entry.kind)
  }

  pub fn type_of(&self, name: &str) -> Result<&Type, SymbolError> {
    self.resolve(name).map(|entry| &entry.ty)
  }

  pub fn index_of(&self, name: &str) -> Result<usize, SymbolError> {
    self.resolve(name).map(|entry| entry.index)
  }

  pub fn count_of(&self, kind: Kind) -> usize {
    if kind.is_class_scope() {
      self.class.count_of(kind)
    } else {
      self.subroutine.count_of(kind)
    }
  }
}
