//! Code generation: lower parse events straight into VM instructions.
//!
//! Every expression leaves exactly one value on the stack. Identifiers are
//! mapped to segments through the symbol table; the object base lives in
//! `pointer 0` (the `this` segment) and array accesses redirect `pointer 1`
//! (the `that` segment).

use log::debug;

use crate::parser::{Backend, BinaryOp, Constant, SubroutineKind, UnaryOp};
use crate::symbol_table::{Kind, SymbolError, SymbolTable};
use crate::ty::{ReturnType, Type};
use crate::vm::{Arithmetic, Segment, VmWriter};

fn segment_of(kind: Kind) -> Segment {
  match kind {
    Kind::Static => Segment::Static,
    Kind::Field => Segment::This,
    Kind::Argument => Segment::Argument,
    Kind::Local => Segment::Local,
  }
}

/// Hands out label numbers for one subroutine.
#[derive(Debug, Default)]
struct LabelAllocator {
  next: usize,
}

impl LabelAllocator {
  fn allocate(&mut self) -> usize {
    let n = self.next;
    self.next += 1;
    n
  }
}

/// State of the subroutine being compiled.
#[derive(Debug)]
struct Context {
  name: String,
  kind: SubroutineKind,
  labels: LabelAllocator,
  /// Label numbers of the enclosing `if`/`while` statements, innermost last.
  branches: Vec<usize>,
}

impl Context {
  fn new(name: &str, kind: SubroutineKind) -> Self {
    Self {
      name: name.to_string(),
      kind,
      labels: LabelAllocator::default(),
      branches: Vec::new(),
    }
  }

  fn label(&self, tag: &str, n: usize) -> String {
    format!("{}.{tag}.{n}", self.name)
  }

  fn open_branch(&mut self) -> usize {
    let n = self.labels.allocate();
    self.branches.push(n);
    n
  }

  fn innermost(&self) -> Option<usize> {
    self.branches.last().copied()
  }
}

/// Instruction-mode backend.
#[derive(Debug, Default)]
pub struct CodeGen {
  class_name: String,
  symbols: SymbolTable,
  context: Option<Context>,
  out: VmWriter,
}

impl CodeGen {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn finish(self) -> String {
    self.out.finish()
  }

  /// The innermost open `if`/`while` of the current subroutine.
  fn innermost(&self) -> Option<(&Context, usize)> {
    let context = self.context.as_ref()?;
    Some((context, context.innermost()?))
  }

  /// Pop the innermost open `if`/`while` of the current subroutine.
  fn close_branch(&mut self) -> Option<(&Context, usize)> {
    let context = self.context.as_mut()?;
    let n = context.branches.pop()?;
    Some((context, n))
  }

  /// Where the implicit receiver of a call lives, if the call has one.
  /// Unqualified calls go through `this`; `name.f()` through a variable when
  /// `name` resolves, otherwise `name` is a class and there is no receiver.
  fn receiver_slot(&self, receiver: Option<&str>) -> Option<(Segment, usize)> {
    match receiver {
      None => Some((Segment::Pointer, 0)),
      Some(name) => self
        .symbols
        .lookup(name)
        .map(|entry| (segment_of(entry.kind), entry.index)),
    }
  }

  fn call_target(&self, receiver: Option<&str>, name: &str) -> String {
    match receiver.map(|receiver| (receiver, self.symbols.lookup(receiver))) {
      None => format!("{}.{name}", self.class_name),
      Some((_, Some(entry))) => format!("{}.{name}", entry.ty),
      Some((class_name, None)) => format!("{class_name}.{name}"),
    }
  }
}

impl Backend for CodeGen {
  fn begin_class(&mut self, name: &str) {
    self.class_name = name.to_string();
  }

  fn declare(&mut self, name: &str, ty: &Type, kind: Kind) -> Result<(), SymbolError> {
    self.symbols.define(name, ty.clone(), kind).map(|_| ())
  }

  fn begin_subroutine(&mut self, kind: SubroutineKind, ret: &ReturnType, name: &str) {
    debug!("compiling {kind:?} {ret} {}.{name}", self.class_name);
    let receiver = (kind == SubroutineKind::Method).then_some(self.class_name.as_str());
    self.symbols.start_subroutine(receiver);
    self.context = Some(Context::new(name, kind));
  }

  fn begin_body(&mut self) {
    let Some(context) = &self.context else {
      return;
    };
    let qualified = format!("{}.{}", self.class_name, context.name);
    let locals = self.symbols.count_of(Kind::Local);
    self.out.function(&qualified, locals);

    match context.kind {
      SubroutineKind::Constructor => {
        let fields = self.symbols.count_of(Kind::Field);
        self.out.push(Segment::Constant, fields);
        self.out.call("Memory.alloc", 1);
        self.out.pop(Segment::Pointer, 0);
      }
      SubroutineKind::Method => {
        self.out.push(Segment::Argument, 0);
        self.out.pop(Segment::Pointer, 0);
      }
      SubroutineKind::Function => {}
    }
  }

  fn end_subroutine(&mut self) {
    self.context = None;
  }

  fn constant(&mut self, value: &Constant) {
    match value {
      Constant::Int(n) => self.out.push(Segment::Constant, usize::from(*n)),
      Constant::Str(text) => {
        self.out.push(Segment::Constant, text.chars().count());
        self.out.call("String.new", 1);
        for c in text.chars() {
          self.out.push(Segment::Constant, c as usize);
          self.out.call("String.appendChar", 2);
        }
      }
      Constant::True => {
        self.out.push(Segment::Constant, 0);
        self.out.arithmetic(Arithmetic::Not);
      }
      Constant::False | Constant::Null => self.out.push(Segment::Constant, 0),
      Constant::This => self.out.push(Segment::Pointer, 0),
    }
  }

  fn push_variable(&mut self, name: &str) -> Result<(), SymbolError> {
    let entry = self.symbols.resolve(name)?;
    self.out.push(segment_of(entry.kind), entry.index);
    Ok(())
  }

  fn pop_variable(&mut self, name: &str) -> Result<(), SymbolError> {
    let entry = self.symbols.resolve(name)?;
    self.out.pop(segment_of(entry.kind), entry.index);
    Ok(())
  }

  fn index(&mut self) {
    self.out.arithmetic(Arithmetic::Add);
  }

  fn load_indirect(&mut self) {
    self.out.pop(Segment::Pointer, 1);
    self.out.push(Segment::That, 0);
  }

  fn store_indirect(&mut self) {
    self.out.pop(Segment::Temp, 0);
    self.out.pop(Segment::Pointer, 1);
    self.out.push(Segment::Temp, 0);
    self.out.pop(Segment::That, 0);
  }

  fn binary(&mut self, op: BinaryOp) {
    match op {
      BinaryOp::Mul => self.out.call("Math.multiply", 2),
      BinaryOp::Div => self.out.call("Math.divide", 2),
      BinaryOp::Add => self.out.arithmetic(Arithmetic::Add),
      BinaryOp::Sub => self.out.arithmetic(Arithmetic::Sub),
      BinaryOp::And => self.out.arithmetic(Arithmetic::And),
      BinaryOp::Or => self.out.arithmetic(Arithmetic::Or),
      BinaryOp::Lt => self.out.arithmetic(Arithmetic::Lt),
      BinaryOp::Gt => self.out.arithmetic(Arithmetic::Gt),
      BinaryOp::Eq => self.out.arithmetic(Arithmetic::Eq),
    }
  }

  fn unary(&mut self, op: UnaryOp) {
    self.out.arithmetic(match op {
      UnaryOp::Neg => Arithmetic::Neg,
      UnaryOp::Not => Arithmetic::Not,
    });
  }

  fn begin_call(&mut self, receiver: Option<&str>) {
    if let Some((segment, index)) = self.receiver_slot(receiver) {
      self.out.push(segment, index);
    }
  }

  fn end_call(&mut self, receiver: Option<&str>, name: &str, args: usize) {
    let implicit = usize::from(self.receiver_slot(receiver).is_some());
    let target = self.call_target(receiver, name);
    self.out.call(&target, args + implicit);
  }

  fn discard(&mut self) {
    self.out.pop(Segment::Temp, 0);
  }

  fn ret(&mut self, has_value: bool) {
    if !has_value {
      self.out.push(Segment::Constant, 0);
    }
    self.out.ret();
  }

  fn begin_if(&mut self) {
    let Some(context) = self.context.as_mut() else {
      return;
    };
    let n = context.open_branch();
    let else_label = context.label("IF_ELSE", n);
    self.out.arithmetic(Arithmetic::Not);
    self.out.if_goto(&else_label);
  }

  fn begin_else(&mut self, has_else: bool) {
    let Some((context, n)) = self.innermost() else {
      return;
    };
    let else_label = context.label("IF_ELSE", n);
    let end_label = context.label("IF_END", n);
    if has_else {
      self.out.goto(&end_label);
    }
    self.out.label(&else_label);
  }

  fn end_if(&mut self) {
    let Some((context, n)) = self.close_branch() else {
      return;
    };
    let end_label = context.label("IF_END", n);
    self.out.label(&end_label);
  }

  fn begin_while(&mut self) {
    let Some(context) = self.context.as_mut() else {
      return;
    };
    let n = context.open_branch();
    let top_label = context.label("WHILE_TOP", n);
    self.out.label(&top_label);
  }

  fn while_condition(&mut self) {
    let Some((context, n)) = self.innermost() else {
      return;
    };
    let end_label = context.label("WHILE_END", n);
    self.out.arithmetic(Arithmetic::Not);
    self.out.if_goto(&end_label);
  }

  fn end_while(&mut self) {
    let Some((context, n)) = self.close_branch() else {
      return;
    };
    let top_label = context.label("WHILE_TOP", n);
    let end_label = context.label("WHILE_END", n);
    self.out.goto(&top_label);
    self.out.label(&end_label);
  }
}
