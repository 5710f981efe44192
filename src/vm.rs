//! Target stack-machine instructions and the writer that accumulates them.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
  Constant,
  Local,
  Argument,
  This,
  That,
  Pointer,
  Temp,
  Static,
}

impl fmt::Display for Segment {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::Constant => "constant",
      Self::Local => "local",
      Self::Argument => "argument",
      Self::This => "this",
      Self::That => "that",
      Self::Pointer => "pointer",
      Self::Temp => "temp",
      Self::Static => "static",
    })
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arithmetic {
  Add,
  Sub,
  Neg,
  Eq,
  Gt,
  Lt,
  And,
  Or,
  Not,
}

impl fmt::Display for Arithmetic {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::Add => "add",
      Self::Sub => "sub",
      Self::Neg => "neg",
      Self::Eq => "eq",
      Self::Gt => "gt",
      Self::Lt => "lt",
      Self::And => "and",
      Self::Or => "or",
      Self::Not => "not",
    })
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
  Push(Segment, usize),
  Pop(Segment, usize),
  Arithmetic(Arithmetic),
  Label(String),
  Goto(String),
  IfGoto(String),
  Function { name: String, locals: usize },
  Call { name: String, args: usize },
  Return,
}

impl fmt::Display for Instruction {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Push(segment, index) => write!(f, "push {segment} {index}"),
      Self::Pop(segment, index) => write!(f, "pop {segment} {index}"),
      Self::Arithmetic(op) => write!(f, "{op}"),
      Self::Label(label) => write!(f, "label {label}"),
      Self::Goto(label) => write!(f, "goto {label}"),
      Self::IfGoto(label) => write!(f, "if-goto {label}"),
      Self::Function { name, locals } => write!(f, "function {name} {locals}"),
      Self::Call { name, args } => write!(f, "call {name} {args}"),
      Self::Return => f.write_str("return"),
    }
  }
}

/// Line-oriented accumulator for emitted instructions.
#[derive(Debug, Default)]
pub struct VmWriter {
  out: String,
}

impl VmWriter {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn write(&mut self, instruction: Instruction) {
    self.out.push_str(&instruction.to_string());
    self.out.push('\n');
  }

  pub fn push(&mut self, segment: Segment, index: usize) {
    self.write(Instruction::Push(segment, index));
  }

  pub fn pop(&mut self, segment: Segment, index: usize) {
    self.write(Instruction::Pop(segment, index));
  }

  pub fn arithmetic(&mut self, op: Arithmetic) {
    self.write(Instruction::Arithmetic(op));
  }

  pub fn label(&mut self, label: &str) {
    self.write(Instruction::Label(label.to_string()));
  }

  pub fn goto(&mut self, label: &str) {
    self.write(Instruction::Goto(label.to_string()));
  }

  pub fn if_goto(&mut self, label: &str) {
    self.write(Instruction::IfGoto(label.to_string()));
  }

  pub fn function(&mut self, name: &str, locals: usize) {
    self.write(Instruction::Function {
      name: name.to_string(),
      locals,
    });
  }

  pub fn call(&mut self, name: &str, args: usize) {
    self.write(Instruction::Call {
      name: name.to_string(),
      args,
    });
  }

  pub fn ret(&mut self) {
    self.write(Instruction::Return);
  }

  pub fn finish(self) -> String {
    self.out
  }
}
