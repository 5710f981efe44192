//! Tree-markup backend: renders the parse structure as indented XML.
//!
//! Each production becomes an element and each token a leaf tagged with its
//! lexical category. No symbols are resolved in this mode.

use crate::parser::{Backend, Node};
use crate::tokenizer::Token;

const INDENT: usize = 2;

#[derive(Debug, Default)]
pub struct TreeWriter {
  out: String,
  depth: usize,
}

impl TreeWriter {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn finish(self) -> String {
    self.out
  }

  fn indent(&mut self) {
    self.out.extend(std::iter::repeat_n(' ', self.depth * INDENT));
  }
}

impl Backend for TreeWriter {
  fn open(&mut self, node: Node) {
    self.indent();
    self.out.push_str(&format!("<{}>\n", node.tag()));
    self.depth += 1;
  }

  fn close(&mut self, node: Node) {
    self.depth = self.depth.saturating_sub(1);
    self.indent();
    self.out.push_str(&format!("</{}>\n", node.tag()));
  }

  fn token(&mut self, token: &Token) {
    let tag = token.kind.category();
    let text = escape(&token.kind.to_string());
    self.indent();
    self.out.push_str(&format!("<{tag}> {text} </{tag}>\n"));
  }
}

/// Escape the characters that would otherwise be read as markup.
pub fn escape(text: &str) -> String {
  let mut escaped = String::with_capacity(text.len());
  for c in text.chars() {
    match c {
      '<' => escaped.push_str("&lt;"),
      '>' => escaped.push_str("&gt;"),
      '&' => escaped.push_str("&amp;"),
      '"' => escaped.push_str("&quot;"),
      _ => escaped.push(c),
    }
  }
  escaped
}
