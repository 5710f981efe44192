//! Recursive-descent parser for one class.
//!
//! There is one procedure per grammar production, one token of lookahead and
//! no backtracking. No tree is built: as each production is recognised the
//! parser reports it to a [`Backend`], which either emits VM instructions or
//! renders the parse structure as markup. Both output modes therefore share
//! the exact same grammar walk.
//!
//! Expressions have no precedence. `a + b * c` is `(a + b) * c`; each operator
//! is handed to the backend as soon as its right-hand term is complete.

use std::collections::HashSet;

use log::trace;

use crate::error::{
  ClassNameSnafu, CompileError, CompileResult, DuplicateSubroutineSnafu, Site, SyntaxSnafu,
};
use crate::symbol_table::{Kind, SymbolError};
use crate::tokenizer::{Keyword, Token, TokenKind, Tokenizer, describe_token};
use crate::ty::{ReturnType, Type};

/// Binary operators recognised by the language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
  Add,
  Sub,
  Mul,
  Div,
  And,
  Or,
  Lt,
  Gt,
  Eq,
}

impl BinaryOp {
  pub fn from_symbol(symbol: char) -> Option<Self> {
    let op = match symbol {
      '+' => Self::Add,
      '-' => Self::Sub,
      '*' => Self::Mul,
      '/' => Self::Div,
      '&' => Self::And,
      '|' => Self::Or,
      '<' => Self::Lt,
      '>' => Self::Gt,
      '=' => Self::Eq,
      _ => return None,
    };
    Some(op)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
  Neg,
  Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubroutineKind {
  Constructor,
  Function,
  Method,
}

/// Literal operand of a term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constant {
  Int(u16),
  Str(String),
  True,
  False,
  Null,
  This,
}

/// Grammar productions that appear as nodes in the tree-markup output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Node {
  Class,
  ClassVarDec,
  SubroutineDec,
  ParameterList,
  SubroutineBody,
  VarDec,
  Statements,
  LetStatement,
  IfStatement,
  WhileStatement,
  DoStatement,
  ReturnStatement,
  Expression,
  Term,
  ExpressionList,
}

impl Node {
  pub fn tag(self) -> &'static str {
    match self {
      Self::Class => "class",
      Self::ClassVarDec => "classVarDec",
      Self::SubroutineDec => "subroutineDec",
      Self::ParameterList => "parameterList",
      Self::SubroutineBody => "subroutineBody",
      Self::VarDec => "varDec",
      Self::Statements => "statements",
      Self::LetStatement => "letStatement",
      Self::IfStatement => "ifStatement",
      Self::WhileStatement => "whileStatement",
      Self::DoStatement => "doStatement",
      Self::ReturnStatement => "returnStatement",
      Self::Expression => "expression",
      Self::Term => "term",
      Self::ExpressionList => "expressionList",
    }
  }
}

/// Receiver of parse events.
///
/// Every method defaults to a no-op so a backend only implements the events
/// it cares about. Events arrive in source order. Hooks that resolve
/// identifiers return a [`SymbolError`]; the parser anchors it at the
/// identifier's position.
pub trait Backend {
  /// A production starts.
  fn open(&mut self, _node: Node) {}

  /// A production ends.
  fn close(&mut self, _node: Node) {}

  /// A token was consumed.
  fn token(&mut self, _token: &Token) {}

  fn begin_class(&mut self, _name: &str) {}

  fn declare(&mut self, _name: &str, _ty: &Type, _kind: Kind) -> Result<(), SymbolError> {
    Ok(())
  }

  /// Name and signature are known; parameters follow.
  fn begin_subroutine(&mut self, _kind: SubroutineKind, _ret: &ReturnType, _name: &str) {}

  /// All locals are declared; statements follow.
  fn begin_body(&mut self) {}

  fn end_subroutine(&mut self) {}

  fn constant(&mut self, _value: &Constant) {}

  fn push_variable(&mut self, _name: &str) -> Result<(), SymbolError> {
    Ok(())
  }

  fn pop_variable(&mut self, _name: &str) -> Result<(), SymbolError> {
    Ok(())
  }

  /// Base and index are on the stack; combine them into an address.
  fn index(&mut self) {}

  /// Replace the address on top of the stack with the value it points at.
  fn load_indirect(&mut self) {}

  /// Store the value on top of the stack through the address beneath it.
  fn store_indirect(&mut self) {}

  fn binary(&mut self, _op: BinaryOp) {}

  fn unary(&mut self, _op: UnaryOp) {}

  /// A call starts; its arguments follow. `receiver` is the name before the
  /// dot, if any.
  fn begin_call(&mut self, _receiver: Option<&str>) {}

  fn end_call(&mut self, _receiver: Option<&str>, _name: &str, _args: usize) {}

  /// Drop the value produced by a `do` call.
  fn discard(&mut self) {}

  fn ret(&mut self, _has_value: bool) {}

  /// The condition of an `if` is on the stack; the then-branch follows.
  fn begin_if(&mut self) {}

  /// The then-branch is complete.
  fn begin_else(&mut self, _has_else: bool) {}

  fn end_if(&mut self) {}

  /// The condition of a `while` follows.
  fn begin_while(&mut self) {}

  /// The condition is on the stack; the body follows.
  fn while_condition(&mut self) {}

  fn end_while(&mut self) {}
}

/// Parse one class from `tokens`, reporting every production to `backend`.
/// `expected_class`, when given, must match the declared class name.
pub fn parse<B: Backend>(
  tokens: Tokenizer<'_>,
  backend: &mut B,
  expected_class: Option<&str>,
) -> CompileResult<String> {
  let stream = TokenStream::new(tokens)?;
  let mut parser = Parser { stream, backend };
  parser.parse_class(expected_class)
}

/// Shape of a term, decided by at most one token past its first.
enum Term {
  Constant(Constant),
  Variable { name: String, loc: usize },
  Array { name: String, loc: usize },
  Call { name: String },
  Paren,
  Unary(UnaryOp),
}

struct Parser<'a, 'b, B: Backend> {
  stream: TokenStream<'a>,
  backend: &'b mut B,
}

impl<B: Backend> Parser<'_, '_, B> {
  fn parse_class(&mut self, expected_class: Option<&str>) -> CompileResult<String> {
    self.backend.open(Node::Class);
    self.expect_keyword(Keyword::Class)?;
    let (name, loc) = self.get_ident()?;
    if let Some(expected) = expected_class
      && expected != name
    {
      return ClassNameSnafu {
        site: self.stream.site(loc),
        expected,
        found: name,
      }
      .fail();
    }
    self.backend.begin_class(&name);
    self.skip('{')?;

    // Class variables must all precede the first subroutine.
    while let Some(kind) = self.class_var_kind() {
      self.parse_class_var_dec(kind)?;
    }
    let mut subroutines = HashSet::new();
    while let Some(kind) = self.subroutine_kind() {
      self.parse_subroutine_dec(kind, &mut subroutines)?;
    }

    self.skip('}')?;
    self.backend.close(Node::Class);

    if !self.stream.is_eof() {
      return Err(self.error_here("all code must be within a single class block"));
    }
    Ok(name)
  }

  fn parse_class_var_dec(&mut self, kind: Kind) -> CompileResult<()> {
    self.backend.open(Node::ClassVarDec);
    self.next()?;
    let ty = self.parse_type()?;
    self.parse_var_names(&ty, kind)?;
    self.skip(';')?;
    self.backend.close(Node::ClassVarDec);
    Ok(())
  }

  /// `declared` holds the subroutine names seen so far in this class.
  fn parse_subroutine_dec(
    &mut self,
    kind: SubroutineKind,
    declared: &mut HashSet<String>,
  ) -> CompileResult<()> {
    self.backend.open(Node::SubroutineDec);
    self.next()?;
    let ret = self.parse_return_type()?;
    let (name, loc) = self.get_ident()?;
    if !declared.insert(name.clone()) {
      return DuplicateSubroutineSnafu {
        site: self.stream.site(loc),
        name,
      }
      .fail();
    }
    self.backend.begin_subroutine(kind, &ret, &name);

    self.skip('(')?;
    self.parse_parameter_list()?;
    self.skip(')')?;
    self.parse_subroutine_body()?;

    self.backend.end_subroutine();
    self.backend.close(Node::SubroutineDec);
    Ok(())
  }

  fn parse_parameter_list(&mut self) -> CompileResult<()> {
    self.backend.open(Node::ParameterList);
    if self.is_type_start() {
      loop {
        let ty = self.parse_type()?;
        self.declare_ident(&ty, Kind::Argument)?;
        if !self.equal(',')? {
          break;
        }
      }
    }
    self.backend.close(Node::ParameterList);
    Ok(())
  }

  fn parse_subroutine_body(&mut self) -> CompileResult<()> {
    self.backend.open(Node::SubroutineBody);
    self.skip('{')?;
    while self.at_keyword(Keyword::Var) {
      self.parse_var_dec()?;
    }
    self.backend.begin_body();
    self.parse_statements()?;
    self.skip('}')?;
    self.backend.close(Node::SubroutineBody);
    Ok(())
  }

  fn parse_var_dec(&mut self) -> CompileResult<()> {
    self.backend.open(Node::VarDec);
    self.expect_keyword(Keyword::Var)?;
    let ty = self.parse_type()?;
    self.parse_var_names(&ty, Kind::Local)?;
    self.skip(';')?;
    self.backend.close(Node::VarDec);
    Ok(())
  }

  /// `varName (',' varName)*`, declaring each name as it is read.
  fn parse_var_names(&mut self, ty: &Type, kind: Kind) -> CompileResult<()> {
    loop {
      self.declare_ident(ty, kind)?;
      if !self.equal(',')? {
        return Ok(());
      }
    }
  }

  fn declare_ident(&mut self, ty: &Type, kind: Kind) -> CompileResult<()> {
    let (name, loc) = self.get_ident()?;
    let declared = self.backend.declare(&name, ty, kind);
    self.anchor(declared, loc)
  }

  fn parse_statements(&mut self) -> CompileResult<()> {
    self.backend.open(Node::Statements);
    loop {
      let keyword = match self.stream.peek().map(|token| &token.kind) {
        Some(TokenKind::Keyword(keyword)) => *keyword,
        _ => break,
      };
      match keyword {
        Keyword::Let => self.parse_let()?,
        Keyword::If => self.parse_if()?,
        Keyword::While => self.parse_while()?,
        Keyword::Do => self.parse_do()?,
        Keyword::Return => self.parse_return()?,
        _ => break,
      }
    }
    self.backend.close(Node::Statements);
    Ok(())
  }

  fn parse_let(&mut self) -> CompileResult<()> {
    self.backend.open(Node::LetStatement);
    self.expect_keyword(Keyword::Let)?;
    let (name, loc) = self.get_ident()?;

    // The target address is complete before the value is evaluated.
    let indexed = self.peek_symbol('[');
    if indexed {
      let base = self.backend.push_variable(&name);
      self.anchor(base, loc)?;
      self.skip('[')?;
      self.parse_expression()?;
      self.skip(']')?;
      self.backend.index();
    }

    self.skip('=')?;
    self.parse_expression()?;

    if indexed {
      self.backend.store_indirect();
    } else {
      let stored = self.backend.pop_variable(&name);
      self.anchor(stored, loc)?;
    }
    self.skip(';')?;
    self.backend.close(Node::LetStatement);
    Ok(())
  }

  fn parse_if(&mut self) -> CompileResult<()> {
    self.backend.open(Node::IfStatement);
    self.expect_keyword(Keyword::If)?;
    self.skip('(')?;
    self.parse_expression()?;
    self.skip(')')?;
    self.backend.begin_if();

    self.parse_block()?;

    let has_else = self.at_keyword(Keyword::Else);
    self.backend.begin_else(has_else);
    if has_else {
      self.next()?;
      self.parse_block()?;
    }
    self.backend.end_if();
    self.backend.close(Node::IfStatement);
    Ok(())
  }

  fn parse_while(&mut self) -> CompileResult<()> {
    self.backend.open(Node::WhileStatement);
    self.expect_keyword(Keyword::While)?;
    self.backend.begin_while();
    self.skip('(')?;
    self.parse_expression()?;
    self.skip(')')?;
    self.backend.while_condition();
    self.parse_block()?;
    self.backend.end_while();
    self.backend.close(Node::WhileStatement);
    Ok(())
  }

  /// `'{' statements '}'`
  fn parse_block(&mut self) -> CompileResult<()> {
    self.skip('{')?;
    self.parse_statements()?;
    self.skip('}')?;
    Ok(())
  }

  fn parse_do(&mut self) -> CompileResult<()> {
    self.backend.open(Node::DoStatement);
    self.expect_keyword(Keyword::Do)?;
    let (name, _) = self.get_ident()?;
    if !self.peek_symbol('.') && !self.peek_symbol('(') {
      return Err(self.unexpected("a subroutine call"));
    }
    self.parse_call(name)?;
    self.skip(';')?;
    self.backend.discard();
    self.backend.close(Node::DoStatement);
    Ok(())
  }

  fn parse_return(&mut self) -> CompileResult<()> {
    self.backend.open(Node::ReturnStatement);
    self.expect_keyword(Keyword::Return)?;
    let has_value = !self.peek_symbol(';');
    if has_value {
      self.parse_expression()?;
    }
    self.skip(';')?;
    self.backend.ret(has_value);
    self.backend.close(Node::ReturnStatement);
    Ok(())
  }

  /// `term (op term)*`, folded strictly left to right.
  fn parse_expression(&mut self) -> CompileResult<()> {
    self.backend.open(Node::Expression);
    self.parse_term()?;
    while let Some(op) = self.binary_op() {
      self.next()?;
      self.parse_term()?;
      self.backend.binary(op);
    }
    self.backend.close(Node::Expression);
    Ok(())
  }

  fn parse_term(&mut self) -> CompileResult<()> {
    self.backend.open(Node::Term);
    match self.classify_term()? {
      Term::Constant(value) => self.backend.constant(&value),
      Term::Variable { name, loc } => {
        let pushed = self.backend.push_variable(&name);
        self.anchor(pushed, loc)?;
      }
      Term::Array { name, loc } => {
        let base = self.backend.push_variable(&name);
        self.anchor(base, loc)?;
        self.skip('[')?;
        self.parse_expression()?;
        self.skip(']')?;
        self.backend.index();
        self.backend.load_indirect();
      }
      Term::Call { name } => self.parse_call(name)?,
      Term::Paren => {
        self.parse_expression()?;
        self.skip(')')?;
      }
      Term::Unary(op) => {
        self.parse_term()?;
        self.backend.unary(op);
      }
    }
    self.backend.close(Node::Term);
    Ok(())
  }

  /// Consume the leading token of a term and decide its shape. An identifier
  /// needs the token after it: `[` starts an array access, `.` or `(` a call.
  fn classify_term(&mut self) -> CompileResult<Term> {
    if matches!(
      self.stream.peek().map(|token| &token.kind),
      Some(TokenKind::Identifier(_))
    ) {
      let (name, loc) = self.get_ident()?;
      let term = if self.peek_symbol('[') {
        Term::Array { name, loc }
      } else if self.peek_symbol('.') || self.peek_symbol('(') {
        Term::Call { name }
      } else {
        Term::Variable { name, loc }
      };
      return Ok(term);
    }

    let term = match self.stream.peek().map(|token| &token.kind) {
      Some(TokenKind::IntConst(value)) => Term::Constant(Constant::Int(*value)),
      Some(TokenKind::StrConst(text)) => Term::Constant(Constant::Str(text.clone())),
      Some(TokenKind::Keyword(Keyword::True)) => Term::Constant(Constant::True),
      Some(TokenKind::Keyword(Keyword::False)) => Term::Constant(Constant::False),
      Some(TokenKind::Keyword(Keyword::Null)) => Term::Constant(Constant::Null),
      Some(TokenKind::Keyword(Keyword::This)) => Term::Constant(Constant::This),
      Some(TokenKind::Symbol('(')) => Term::Paren,
      Some(TokenKind::Symbol('-')) => Term::Unary(UnaryOp::Neg),
      Some(TokenKind::Symbol('~')) => Term::Unary(UnaryOp::Not),
      _ => return Err(self.unexpected("a term")),
    };
    self.next()?;
    Ok(term)
  }

  /// `((className | varName) '.')? subroutineName '(' expressionList ')'`,
  /// entered with the first name already consumed.
  fn parse_call(&mut self, name: String) -> CompileResult<()> {
    let (receiver, subroutine) = if self.equal('.')? {
      let (subroutine, _) = self.get_ident()?;
      (Some(name), subroutine)
    } else {
      (None, name)
    };
    self.backend.begin_call(receiver.as_deref());
    self.skip('(')?;
    let args = self.parse_expression_list()?;
    self.skip(')')?;
    self.backend.end_call(receiver.as_deref(), &subroutine, args);
    Ok(())
  }

  /// Returns how many expressions were compiled.
  fn parse_expression_list(&mut self) -> CompileResult<usize> {
    self.backend.open(Node::ExpressionList);
    let mut count = 0;
    if self.is_term_start() {
      self.parse_expression()?;
      count += 1;
      while self.equal(',')? {
        self.parse_expression()?;
        count += 1;
      }
    }
    self.backend.close(Node::ExpressionList);
    Ok(count)
  }

  fn parse_type(&mut self) -> CompileResult<Type> {
    let ty = match self.stream.peek().map(|token| &token.kind) {
      Some(TokenKind::Keyword(Keyword::Int)) => Type::Int,
      Some(TokenKind::Keyword(Keyword::Char)) => Type::Char,
      Some(TokenKind::Keyword(Keyword::Boolean)) => Type::Boolean,
      Some(TokenKind::Identifier(name)) => Type::class(name.as_str()),
      _ => return Err(self.unexpected("a type (int, char, boolean or a class name)")),
    };
    self.next()?;
    Ok(ty)
  }

  fn parse_return_type(&mut self) -> CompileResult<ReturnType> {
    if self.at_keyword(Keyword::Void) {
      self.next()?;
      return Ok(ReturnType::Void);
    }
    if !self.is_type_start() {
      return Err(self.unexpected("a return type (void or a type)"));
    }
    self.parse_type().map(ReturnType::Value)
  }

  fn class_var_kind(&self) -> Option<Kind> {
    match self.stream.peek()?.kind {
      TokenKind::Keyword(Keyword::Static) => Some(Kind::Static),
      TokenKind::Keyword(Keyword::Field) => Some(Kind::Field),
      _ => None,
    }
  }

  fn subroutine_kind(&self) -> Option<SubroutineKind> {
    match self.stream.peek()?.kind {
      TokenKind::Keyword(Keyword::Constructor) => Some(SubroutineKind::Constructor),
      TokenKind::Keyword(Keyword::Function) => Some(SubroutineKind::Function),
      TokenKind::Keyword(Keyword::Method) => Some(SubroutineKind::Method),
      _ => None,
    }
  }

  fn binary_op(&self) -> Option<BinaryOp> {
    match self.stream.peek()?.kind {
      TokenKind::Symbol(symbol) => BinaryOp::from_symbol(symbol),
      _ => None,
    }
  }

  fn is_type_start(&self) -> bool {
    matches!(
      self.stream.peek().map(|token| &token.kind),
      Some(
        TokenKind::Keyword(Keyword::Int | Keyword::Char | Keyword::Boolean)
          | TokenKind::Identifier(_)
      )
    )
  }

  fn is_term_start(&self) -> bool {
    matches!(
      self.stream.peek().map(|token| &token.kind),
      Some(
        TokenKind::IntConst(_)
          | TokenKind::StrConst(_)
          | TokenKind::Identifier(_)
          | TokenKind::Keyword(Keyword::True | Keyword::False | Keyword::Null | Keyword::This)
          | TokenKind::Symbol('(' | '-' | '~')
      )
    )
  }

  fn at_keyword(&self, keyword: Keyword) -> bool {
    self
      .stream
      .peek()
      .is_some_and(|token| token.is_keyword(keyword))
  }

  fn peek_symbol(&self, symbol: char) -> bool {
    self.stream.peek().is_some_and(|token| token.is_symbol(symbol))
  }

  /// Consume the current token and hand it to the backend.
  fn next(&mut self) -> CompileResult<Token> {
    let Some(token) = self.stream.advance()? else {
      return Err(self.unexpected("more input"));
    };
    trace!("{} {}", token.kind.category(), token.kind);
    self.backend.token(&token);
    Ok(token)
  }

  /// Consume the current token if it is `symbol`.
  fn equal(&mut self, symbol: char) -> CompileResult<bool> {
    if self.peek_symbol(symbol) {
      self.next()?;
      return Ok(true);
    }
    Ok(false)
  }

  fn skip(&mut self, symbol: char) -> CompileResult<()> {
    if self.equal(symbol)? {
      Ok(())
    } else {
      Err(self.unexpected(&format!("'{symbol}'")))
    }
  }

  fn expect_keyword(&mut self, keyword: Keyword) -> CompileResult<()> {
    if !self.at_keyword(keyword) {
      return Err(self.unexpected(&format!("'{keyword}'")));
    }
    self.next()?;
    Ok(())
  }

  /// Consume an identifier, returning its name and location.
  fn get_ident(&mut self) -> CompileResult<(String, usize)> {
    let name = match self.stream.peek().map(|token| &token.kind) {
      Some(TokenKind::Identifier(name)) => name.clone(),
      _ => return Err(self.unexpected("an identifier")),
    };
    let token = self.next()?;
    Ok((name, token.loc))
  }

  fn anchor<T>(&self, result: Result<T, SymbolError>, loc: usize) -> CompileResult<T> {
    result.map_err(|err| CompileError::from_symbol(err, self.stream.site(loc)))
  }

  fn error_here(&self, message: impl Into<String>) -> CompileError {
    SyntaxSnafu {
      site: self.stream.site(self.stream.loc()),
      message: message.into(),
    }
    .build()
  }

  fn unexpected(&self, expected: &str) -> CompileError {
    let got = describe_token(self.stream.peek());
    self.error_here(format!("expected {expected}, but got \"{got}\""))
  }
}

/// One-token lookahead over the lazy tokenizer.
struct TokenStream<'a> {
  tokens: Tokenizer<'a>,
  current: Option<Token>,
}

impl<'a> TokenStream<'a> {
  fn new(mut tokens: Tokenizer<'a>) -> CompileResult<Self> {
    let current = tokens.next().transpose()?;
    Ok(Self { tokens, current })
  }

  fn peek(&self) -> Option<&Token> {
    self.current.as_ref()
  }

  /// Take the current token and pull the next one from the tokenizer.
  fn advance(&mut self) -> CompileResult<Option<Token>> {
    let next = self.tokens.next().transpose()?;
    Ok(std::mem::replace(&mut self.current, next))
  }

  fn is_eof(&self) -> bool {
    self.current.is_none()
  }

  /// Byte offset of the current token, or the end of input.
  fn loc(&self) -> usize {
    self
      .peek()
      .map_or(self.tokens.source().len(), |token| token.loc)
  }

  fn site(&self, loc: usize) -> Site {
    self.tokens.site(loc)
  }
}
