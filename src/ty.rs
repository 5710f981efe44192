use std::fmt;

/// Declared type of a variable. The compiler trusts these declarations and
/// only uses class names to qualify method calls made through a variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
  Int,
  Char,
  Boolean,
  Class(String),
}

impl Type {
  pub fn class(name: impl Into<String>) -> Self {
    Self::Class(name.into())
  }

  pub fn name(&self) -> &str {
    match self {
      Self::Int => "int",
      Self::Char => "char",
      Self::Boolean => "boolean",
      Self::Class(name) => name,
    }
  }
}

impl fmt::Display for Type {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnType {
  Void,
  Value(Type),
}

impl fmt::Display for ReturnType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Void => f.write_str("void"),
      Self::Value(ty) => write!(f, "{ty}"),
    }
  }
}
