//! Lexical analysis: turns the raw source of one unit into a lazy token stream.
//!
//! The tokenizer is forward-only and cannot be restarted. Whitespace and
//! comments are skipped between tokens and never surface to the parser.
//! Keywords are matched before identifiers, and every symbol is a single
//! character, so no multi-character punctuators need disambiguating.

use std::fmt;
use std::iter::FusedIterator;

use crate::error::{CompileError, CompileResult, LexicalSnafu, Site};

/// Largest integer constant the language accepts.
pub const MAX_INT: u16 = 32767;

const SYMBOLS: &[u8] = b"{}()[].,;+-*/&|<>=~";

/// Reserved words of the language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
  Class,
  Constructor,
  Function,
  Method,
  Field,
  Static,
  Var,
  Int,
  Char,
  Boolean,
  Void,
  True,
  False,
  Null,
  This,
  Let,
  Do,
  If,
  Else,
  While,
  Return,
}

impl Keyword {
  pub fn from_word(word: &str) -> Option<Self> {
    let keyword = match word {
      "class" => Self::Class,
      "constructor" => Self::Constructor,
      "function" => Self::Function,
      "method" => Self::Method,
      "field" => Self::Field,
      "static" => Self::Static,
      "var" => Self::Var,
      "int" => Self::Int,
      "char" => Self::Char,
      "boolean" => Self::Boolean,
      "void" => Self::Void,
      "true" => Self::True,
      "false" => Self::False,
      "null" => Self::Null,
      "this" => Self::This,
      "let" => Self::Let,
      "do" => Self::Do,
      "if" => Self::If,
      "else" => Self::Else,
      "while" => Self::While,
      "return" => Self::Return,
      _ => return None,
    };
    Some(keyword)
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Class => "class",
      Self::Constructor => "constructor",
      Self::Function => "function",
      Self::Method => "method",
      Self::Field => "field",
      Self::Static => "static",
      Self::Var => "var",
      Self::Int => "int",
      Self::Char => "char",
      Self::Boolean => "boolean",
      Self::Void => "void",
      Self::True => "true",
      Self::False => "false",
      Self::Null => "null",
      Self::This => "this",
      Self::Let => "let",
      Self::Do => "do",
      Self::If => "if",
      Self::Else => "else",
      Self::While => "while",
      Self::Return => "return",
    }
  }
}

impl fmt::Display for Keyword {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Lexical category of a token, carrying its decoded value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
  Keyword(Keyword),
  Symbol(char),
  Identifier(String),
  IntConst(u16),
  StrConst(String),
}

impl TokenKind {
  /// Category name used by the tree-markup output.
  pub fn category(&self) -> &'static str {
    match self {
      Self::Keyword(_) => "keyword",
      Self::Symbol(_) => "symbol",
      Self::Identifier(_) => "identifier",
      Self::IntConst(_) => "integerConstant",
      Self::StrConst(_) => "stringConstant",
    }
  }
}

/// Renders the token's literal text; string constants without their quotes.
impl fmt::Display for TokenKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Keyword(keyword) => write!(f, "{keyword}"),
      Self::Symbol(symbol) => write!(f, "{symbol}"),
      Self::Identifier(name) => f.write_str(name),
      Self::IntConst(value) => write!(f, "{value}"),
      Self::StrConst(text) => f.write_str(text),
    }
  }
}

/// A classified token plus the byte span it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
  pub kind: TokenKind,
  pub loc: usize,
  pub len: usize,
}

impl Token {
  pub fn new(kind: TokenKind, loc: usize, len: usize) -> Self {
    Self { kind, loc, len }
  }

  pub fn is_symbol(&self, symbol: char) -> bool {
    self.kind == TokenKind::Symbol(symbol)
  }

  pub fn is_keyword(&self, keyword: Keyword) -> bool {
    self.kind == TokenKind::Keyword(keyword)
  }
}

/// Human-friendly description used in diagnostics.
pub fn describe_token(token: Option<&Token>) -> String {
  match token {
    Some(Token {
      kind: TokenKind::StrConst(text),
      ..
    }) => format!("\"{text}\""),
    Some(token) => token.kind.to_string(),
    None => "end of input".to_string(),
  }
}

/// Lazy scanner over one unit's source text.
#[derive(Debug, Clone)]
pub struct Tokenizer<'a> {
  unit: &'a str,
  source: &'a str,
  pos: usize,
  done: bool,
}

impl<'a> Tokenizer<'a> {
  pub fn new(unit: &'a str, source: &'a str) -> Self {
    Self {
      unit,
      source,
      pos: 0,
      done: false,
    }
  }

  pub fn unit(&self) -> &'a str {
    self.unit
  }

  pub fn source(&self) -> &'a str {
    self.source
  }

  pub fn site(&self, loc: usize) -> Site {
    Site::locate(self.unit, self.source, loc)
  }

  fn error(&self, loc: usize, message: impl Into<String>) -> CompileError {
    LexicalSnafu {
      site: self.site(loc),
      message: message.into(),
    }
    .build()
  }

  /// Skip whitespace and comments. Fails on an unterminated block comment.
  fn skip_trivia(&mut self) -> CompileResult<()> {
    let bytes = self.source.as_bytes();
    while self.pos < bytes.len() {
      let rest = &self.source[self.pos..];
      if bytes[self.pos].is_ascii_whitespace() {
        self.pos += 1;
      } else if rest.starts_with("//") {
        self.pos = rest.find('\n').map_or(bytes.len(), |i| self.pos + i + 1);
      } else if rest.starts_with("/*") {
        let Some(end) = rest[2..].find("*/") else {
          return Err(self.error(self.pos, "unterminated block comment"));
        };
        self.pos += end + 4;
      } else {
        break;
      }
    }
    Ok(())
  }

  fn scan(&mut self) -> CompileResult<Option<Token>> {
    self.skip_trivia()?;

    let bytes = self.source.as_bytes();
    let start = self.pos;
    let Some(&c) = bytes.get(start) else {
      return Ok(None);
    };

    if c.is_ascii_digit() {
      let end = self.scan_while(|b| b.is_ascii_digit());
      let text = &self.source[start..end];
      let value = text
        .parse::<u16>()
        .ok()
        .filter(|value| *value <= MAX_INT)
        .ok_or_else(|| {
          self.error(
            start,
            format!("integer constant {text} is outside the range 0..={MAX_INT}"),
          )
        })?;
      return Ok(Some(Token::new(TokenKind::IntConst(value), start, end - start)));
    }

    if c.is_ascii_alphabetic() || c == b'_' {
      let end = self.scan_while(|b| b.is_ascii_alphanumeric() || b == b'_');
      let word = &self.source[start..end];
      let kind = match Keyword::from_word(word) {
        Some(keyword) => TokenKind::Keyword(keyword),
        None => TokenKind::Identifier(word.to_string()),
      };
      return Ok(Some(Token::new(kind, start, end - start)));
    }

    if c == b'"' {
      let body = &self.source[start + 1..];
      return match body.find(['"', '\n']) {
        Some(i) if body.as_bytes()[i] == b'"' => {
          let text = &body[..i];
          // Each character and the length are pushed as integer constants.
          if let Some((offset, c)) = text
            .char_indices()
            .find(|(_, c)| u32::from(*c) > u32::from(MAX_INT))
          {
            return Err(self.error(
              start + 1 + offset,
              format!("character '{c}' cannot appear in a string constant"),
            ));
          }
          if text.chars().count() > usize::from(MAX_INT) {
            return Err(self.error(
              start,
              format!("string constant is longer than {MAX_INT} characters"),
            ));
          }
          let text = text.to_string();
          self.pos = start + i + 2;
          Ok(Some(Token::new(TokenKind::StrConst(text), start, i + 2)))
        }
        _ => Err(self.error(start, "unterminated string constant")),
      };
    }

    if SYMBOLS.contains(&c) {
      self.pos += 1;
      return Ok(Some(Token::new(TokenKind::Symbol(c as char), start, 1)));
    }

    let invalid = self.source[start..].chars().next().unwrap_or('\0');
    Err(self.error(start, format!("invalid character '{invalid}'")))
  }

  fn scan_while(&mut self, accept: impl Fn(u8) -> bool) -> usize {
    let bytes = self.source.as_bytes();
    while self.pos < bytes.len() && accept(bytes[self.pos]) {
      self.pos += 1;
    }
    self.pos
  }
}

impl Iterator for Tokenizer<'_> {
  type Item = CompileResult<Token>;

  fn next(&mut self) -> Option<Self::Item> {
    if self.done {
      return None;
    }
    match self.scan() {
      Ok(Some(token)) => Some(Ok(token)),
      Ok(None) => {
        self.done = true;
        None
      }
      Err(err) => {
        self.done = true;
        Some(Err(err))
      }
    }
  }
}

impl FusedIterator for Tokenizer<'_> {}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::ErrorKind;

  fn tokenize(unit: &str, source: &str) -> CompileResult<Vec<Token>> {
    Tokenizer::new(unit, source).collect()
  }

  fn kinds(source: &str) -> Vec<TokenKind> {
    tokenize("Test.jack", source)
      .unwrap()
      .into_iter()
      .map(|token| token.kind)
      .collect()
  }

  fn lex_error(source: &str) -> CompileError {
    tokenize("Test.jack", source).unwrap_err()
  }

  #[test]
  fn keywords_win_over_identifiers() {
    assert_eq!(
      kinds("class classy _x9"),
      vec![
        TokenKind::Keyword(Keyword::Class),
        TokenKind::Identifier("classy".into()),
        TokenKind::Identifier("_x9".into()),
      ]
    );
  }

  #[test]
  fn comments_and_whitespace_are_discarded() {
    let source = "// line\nlet /* block */ x /** doc\n * more */ = 1;// trailing";
    assert_eq!(
      kinds(source),
      vec![
        TokenKind::Keyword(Keyword::Let),
        TokenKind::Identifier("x".into()),
        TokenKind::Symbol('='),
        TokenKind::IntConst(1),
        TokenKind::Symbol(';'),
      ]
    );
  }

  #[test]
  fn division_is_not_a_comment() {
    assert_eq!(
      kinds("a/b"),
      vec![
        TokenKind::Identifier("a".into()),
        TokenKind::Symbol('/'),
        TokenKind::Identifier("b".into()),
      ]
    );
  }

  #[test]
  fn string_constants_drop_their_quotes() {
    let tokens = tokenize("Test.jack", r#"do Output.printString("a < b");"#).unwrap();
    let string = &tokens[5];
    assert_eq!(string.kind, TokenKind::StrConst("a < b".into()));
    assert_eq!(string.len, 7);
    assert_eq!(describe_token(Some(string)), "\"a < b\"");
  }

  #[test]
  fn integer_range_is_enforced() {
    assert_eq!(kinds("32767"), vec![TokenKind::IntConst(32767)]);
    assert_eq!(lex_error("32768").kind(), ErrorKind::Lexical);
    assert_eq!(lex_error("999999999999").kind(), ErrorKind::Lexical);
  }

  #[test]
  fn string_constants_stay_within_the_integer_range() {
    let err = lex_error("x = \"ok 😀\";");
    assert_eq!(err.kind(), ErrorKind::Lexical);
    assert_eq!(err.site().column, 9);
    assert!(err.to_string().contains("cannot appear in a string constant"));

    assert_eq!(kinds("\"é\""), vec![TokenKind::StrConst("é".into())]);

    let long = format!("\"{}\"", "a".repeat(usize::from(MAX_INT) + 1));
    assert_eq!(lex_error(&long).kind(), ErrorKind::Lexical);
    let longest = format!("\"{}\"", "a".repeat(usize::from(MAX_INT)));
    assert_eq!(kinds(&longest).len(), 1);
  }

  #[test]
  fn unterminated_constructs_fail() {
    assert_eq!(lex_error("\"open").kind(), ErrorKind::Lexical);
    assert_eq!(lex_error("\"split\nline\"").kind(), ErrorKind::Lexical);
    assert_eq!(lex_error("x /* never closed").kind(), ErrorKind::Lexical);
  }

  #[test]
  fn invalid_characters_report_their_position() {
    let err = lex_error("let x = 3 # 4;");
    assert_eq!(err.kind(), ErrorKind::Lexical);
    assert_eq!(err.site().column, 11);
    assert!(err.to_string().contains("invalid character '#'"));
  }

  #[test]
  fn stream_stops_after_an_error() {
    let mut tokens = Tokenizer::new("Test.jack", "x $ y");
    assert!(matches!(tokens.next(), Some(Ok(_))));
    assert!(matches!(tokens.next(), Some(Err(_))));
    assert!(tokens.next().is_none());
  }
}
