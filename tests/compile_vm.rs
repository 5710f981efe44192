//! End-to-end tests for instruction mode.

mod common;

use common::*;
use jackc::compile_unit;

#[test]
fn empty_main_returns_zero() {
  let lines = vm_lines("class Main { function void main() { return; } }");
  assert_eq!(lines, ["function Main.main 0", "push constant 0", "return"]);
}

#[test]
fn addition_into_a_local() {
  let lines = vm_lines(&in_main("var int x;", "let x = 1 + 2; return;"));
  assert_sequence(&lines, &["push constant 1", "push constant 2", "add", "pop local 0"]);
}

#[test]
fn expressions_fold_left_to_right() {
  let lines = vm_lines(
    "class Main { function void main() { do Output.printInt(1 + (2 * 3)); return; } }",
  );
  assert_eq!(
    lines,
    [
      "function Main.main 0",
      "push constant 1",
      "push constant 2",
      "push constant 3",
      "call Math.multiply 2",
      "add",
      "call Output.printInt 1",
      "pop temp 0",
      "push constant 0",
      "return",
    ]
  );

  let lines = vm_lines(&in_main("var int x;", "let x = 1 + 2 * 3; return;"));
  assert_sequence(
    &lines,
    &[
      "push constant 1",
      "push constant 2",
      "add",
      "push constant 3",
      "call Math.multiply 2",
      "pop local 0",
    ],
  );
}

#[test]
fn method_call_on_a_field_passes_the_receiver() {
  let source = "class Game {
    field int score;
    field Runner obj;
    method void go() { do obj.run(5); return; }
  }";
  let lines = vm_lines(source);
  assert_sequence(
    &lines,
    &["push this 1", "push constant 5", "call Runner.run 2", "pop temp 0"],
  );
}

#[test]
fn method_calls_count_the_receiver() {
  let source = "class Point {
    field int x, y;
    method int plus(int dx, int dy) { return x + dx + dy; }
    method Point shifted() { var Point p; let p = plus(1, 2); return p.plus(3, 4); }
  }";
  let lines = vm_lines(source);
  assert_sequence(
    &lines,
    &["push pointer 0", "push constant 1", "push constant 2", "call Point.plus 3"],
  );
  assert_sequence(
    &lines,
    &["push local 0", "push constant 3", "push constant 4", "call Point.plus 3"],
  );
}

#[test]
fn class_qualified_calls_have_no_receiver() {
  let lines = vm_lines(&in_main("var Array a;", "let a = Array.new(10); return;"));
  assert_sequence(&lines, &["push constant 10", "call Array.new 1", "pop local 0"]);
}

#[test]
fn constructor_allocates_before_assigning_fields() {
  let source = "class Vec3 {
    field int x, y, z;
    constructor Vec3 new(int ax, int ay, int az) {
      let x = ax; let y = ay; let z = az;
      return this;
    }
  }";
  let lines = vm_lines(source);
  assert_eq!(
    &lines[..4],
    [
      "function Vec3.new 0",
      "push constant 3",
      "call Memory.alloc 1",
      "pop pointer 0",
    ]
  );
  assert!(position(&lines, "call Memory.alloc 1") < position(&lines, "pop this 0"));
  assert_sequence(&lines, &["push pointer 0", "return"]);
}

#[test]
fn statics_are_not_counted_as_fields() {
  let source = "class Counter {
    static int instances;
    field int value;
    constructor Counter new() { let instances = instances + 1; return this; }
  }";
  let lines = vm_lines(source);
  assert_sequence(&lines, &["push constant 1", "call Memory.alloc 1"]);
  assert_sequence(
    &lines,
    &["push static 0", "push constant 1", "add", "pop static 0"],
  );
}

#[test]
fn methods_anchor_this_from_argument_zero() {
  let source = "class Box { field int w; method int width() { return w; } }";
  assert_eq!(
    vm_lines(source),
    [
      "function Box.width 0",
      "push argument 0",
      "pop pointer 0",
      "push this 0",
      "return",
    ]
  );
}

#[test]
fn array_store_evaluates_the_index_first() {
  let lines = vm_lines(&in_main("var Array a; var int i;", "let a[i + 1] = i * 2; return;"));
  assert_sequence(
    &lines,
    &[
      "push local 0",
      "push local 1",
      "push constant 1",
      "add",
      "add",
      "push local 1",
      "push constant 2",
      "call Math.multiply 2",
      "pop temp 0",
      "pop pointer 1",
      "push temp 0",
      "pop that 0",
    ],
  );
}

#[test]
fn array_reads_go_through_that() {
  let lines = vm_lines(&in_main("var Array a; var int x;", "let x = a[3]; return;"));
  assert_sequence(
    &lines,
    &[
      "push local 0",
      "push constant 3",
      "add",
      "pop pointer 1",
      "push that 0",
      "pop local 1",
    ],
  );
}

#[test]
fn array_element_copied_to_another_element() {
  let lines = vm_lines(&in_main("var Array a, b;", "let a[0] = b[1]; return;"));
  assert_sequence(
    &lines,
    &[
      "push local 0",
      "push constant 0",
      "add",
      "push local 1",
      "push constant 1",
      "add",
      "pop pointer 1",
      "push that 0",
      "pop temp 0",
      "pop pointer 1",
      "push temp 0",
      "pop that 0",
    ],
  );
}

#[test]
fn unary_operators_apply_after_their_operand() {
  let lines = vm_lines(&in_main("var int x; var boolean b;", "let x = -x; let b = ~(x < 0); return;"));
  assert_sequence(&lines, &["push local 0", "neg", "pop local 0"]);
  assert_sequence(
    &lines,
    &["push local 0", "push constant 0", "lt", "not", "pop local 1"],
  );
}

#[test]
fn comparison_and_logic_operators() {
  let lines = vm_lines(&in_main(
    "var boolean b; var int x;",
    "let b = (x > 1) & (x = 2) | false; let x = x / 4 - 1; return;",
  ));
  assert_sequence(
    &lines,
    &[
      "push local 1",
      "push constant 1",
      "gt",
      "push local 1",
      "push constant 2",
      "eq",
      "and",
      "push constant 0",
      "or",
      "pop local 0",
    ],
  );
  assert_sequence(&lines, &["call Math.divide 2", "push constant 1", "sub"]);
}

#[test]
fn header_counts_every_local() {
  let lines = vm_lines(&in_main("var int a, b; var char c; var Array d;", "return;"));
  assert_eq!(lines[0], "function Main.main 4");
}

#[test]
fn locals_may_shadow_fields() {
  let source = "class S { field int n; method int get() { var int n; let n = 5; return n; } }";
  let lines = vm_lines(source);
  assert_sequence(&lines, &["push constant 5", "pop local 0", "push local 0", "return"]);
}

#[test]
fn while_loop_shape() {
  let lines = vm_lines(&in_main("var int i;", "while (i < 10) { let i = i + 1; } return;"));
  assert_eq!(
    &lines[1..],
    [
      "label main.WHILE_TOP.0",
      "push local 0",
      "push constant 10",
      "lt",
      "not",
      "if-goto main.WHILE_END.0",
      "push local 0",
      "push constant 1",
      "add",
      "pop local 0",
      "goto main.WHILE_TOP.0",
      "label main.WHILE_END.0",
      "push constant 0",
      "return",
    ]
  );
}

#[test]
fn if_else_shape() {
  let lines = vm_lines(&in_main("var int i;", "if (i) { let i = 1; } else { let i = 2; } return;"));
  assert_eq!(
    &lines[1..],
    [
      "push local 0",
      "not",
      "if-goto main.IF_ELSE.0",
      "push constant 1",
      "pop local 0",
      "goto main.IF_END.0",
      "label main.IF_ELSE.0",
      "push constant 2",
      "pop local 0",
      "label main.IF_END.0",
      "push constant 0",
      "return",
    ]
  );
}

#[test]
fn string_constants_are_built_character_by_character() {
  let lines = vm_lines(r#"class Main { function void main() { do Output.printString("ok"); return; } }"#);
  assert_sequence(
    &lines,
    &[
      "push constant 2",
      "call String.new 1",
      "push constant 111",
      "call String.appendChar 2",
      "push constant 107",
      "call String.appendChar 2",
      "call Output.printString 1",
    ],
  );
}

#[test]
fn fields_may_be_used_by_any_subroutine() {
  let source = "class Pair {
    field int a;
    static Pair origin;
    method int first() { return a; }
    function Pair zero() { return origin; }
    field int b;
  }";
  // Class variables may not follow subroutines.
  assert_eq!(vm_error(source).kind(), ErrorKind::Syntax);

  let source = "class Pair {
    field int a;
    static Pair origin;
    method int first() { return a; }
    function Pair zero() { return origin; }
  }";
  let lines = vm_lines(source);
  assert_sequence(&lines, &["push this 0", "return"]);
  assert_sequence(&lines, &["push static 0", "return"]);
}

#[test]
fn undeclared_identifier_produces_no_output() {
  let err = vm_error(&in_main("", "let y = 1; return;"));
  assert_eq!(err.kind(), ErrorKind::UndefinedSymbol);
  assert!(err.to_string().contains("undeclared identifier 'y'"));

  let err = vm_error(&in_main("var int x;", "let x = ghost + 1; return;"));
  assert_eq!(err.kind(), ErrorKind::UndefinedSymbol);
}

#[test]
fn duplicate_declarations_are_rejected() {
  let err = vm_error("class D { field int x; static int x; }");
  assert_eq!(err.kind(), ErrorKind::DuplicateDeclaration);

  let err = vm_error("class D { function void f(int a) { var int a; return; } }");
  assert_eq!(err.kind(), ErrorKind::DuplicateDeclaration);
  assert_eq!(err.site().line, 1);
  assert_eq!(err.site().column, 44);
}

#[test]
fn repeated_subroutine_names_are_rejected() {
  let source = "class C {
    function void f() { while (true) { } return; }
    function void f() { while (true) { } return; }
  }";
  let err = vm_error(source);
  assert_eq!(err.kind(), ErrorKind::DuplicateDeclaration);
  assert_eq!(err.site().line, 3);

  // Distinct names keep their labels apart.
  let lines = vm_lines(
    "class C {
       function void f() { while (true) { } return; }
       function void g() { while (true) { } return; }
     }",
  );
  let labels: Vec<_> = lines.iter().filter(|line| line.starts_with("label ")).collect();
  assert_eq!(
    labels,
    [
      "label f.WHILE_TOP.0",
      "label f.WHILE_END.0",
      "label g.WHILE_TOP.0",
      "label g.WHILE_END.0",
    ]
  );
}

#[test]
fn lexical_errors_stop_compilation() {
  let err = vm_error(&in_main("var int x;", "let x = 40000; return;"));
  assert_eq!(err.kind(), ErrorKind::Lexical);

  let err = vm_error("class Main { /* never closed ");
  assert_eq!(err.kind(), ErrorKind::Lexical);
}

#[test]
fn errors_name_their_unit_and_line() {
  let source = "class Main {\n  function void main() {\n    let = 1;\n  }\n}\n";
  let err = compile_unit("Main.jack", source, OutputMode::Vm, Some("Main")).unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Syntax);
  assert_eq!(err.site().unit, "Main.jack");
  assert_eq!(err.site().line, 3);
  let rendered = err.to_string();
  assert!(rendered.starts_with("Error in 'Main.jack', line 3:"));
  assert!(rendered.contains("        ^"));
}

#[test]
fn class_name_must_match_the_unit() {
  let err = compile_unit("Main.jack", "class Mian { }", OutputMode::Vm, Some("Main")).unwrap_err();
  assert_eq!(err.kind(), ErrorKind::ClassName);

  let artifact = compile_unit("Main.jack", "class Main { }", OutputMode::Vm, Some("Main")).unwrap();
  assert_eq!(artifact.class_name, "Main");
  assert_eq!(artifact.text, "");
}

#[test]
fn one_failing_unit_does_not_affect_another() {
  assert!(compile(&in_main("", "let y = 1; return;"), OutputMode::Vm).is_err());
  let lines = vm_lines("class Main { function void main() { return; } }");
  assert_eq!(lines[0], "function Main.main 0");
}

#[test]
fn compiling_twice_is_byte_identical() {
  let source = "class Loop {
    function int sum(int n) {
      var int i, total;
      while (i < n) { if (i = 3) { let total = total + 1; } let i = i + 1; }
      return total;
    }
  }";
  let first = compile(source, OutputMode::Vm).unwrap();
  let second = compile(source, OutputMode::Vm).unwrap();
  assert_eq!(first, second);
}
