use pretty_assertions::assert_eq;

use crate::*;

fn diet(source: &str) -> String {
    parse_diet(source).render()
}

fn full(source: &str) -> String {
    parse_full(source).render()
}

fn complete_at_end(source: &str) -> CompletionParse {
    parse_for_completion(source, source.len())
}

/// Turn every parsed body back into the span it was read from, so a full
/// unit can be compared with a diet one.
fn elide_bodies(unit: &mut CompilationUnit) {
    fn body(body: &mut Body) {
        if let Body::Parsed(block) = body {
            *body = Body::Elided(block.span);
        }
    }
    fn ty(decl: &mut TypeDecl) {
        for constant in &mut decl.enum_constants {
            if let Some(inner) = &mut constant.body {
                ty(inner);
            }
        }
        for member in &mut decl.members {
            match member {
                Member::Method(method) => {
                    if let Some(b) = &mut method.body {
                        body(b);
                    }
                }
                Member::Initializer(init) => body(&mut init.body),
                Member::Type(inner) => ty(inner),
                Member::Field(_) => {}
            }
        }
    }
    for decl in &mut unit.types {
        ty(decl);
    }
    unit.bodies_parsed = false;
}

#[test]
fn empty_input_is_an_empty_unit() {
    for mode in [ParseMode::Diet, ParseMode::DietWithBodies, ParseMode::Full] {
        let parse = parse("", mode);
        assert!(parse.unit.is_empty());
        assert!(parse.errors.is_empty());
        assert_eq!(parse.render(), "");
    }

    let completion = parse_for_completion("", 0);
    assert!(completion.unit.is_empty());
    assert!(completion.node.is_none());
    assert_eq!(completion.context, None);
}

#[test]
fn dangling_members_yield_an_empty_unit() {
    for source in ["void foo() { }", "int x;", "X() { }", "foo();", "int x, y"] {
        let parse = parse_diet(source);
        assert!(parse.unit.is_empty(), "{source}");
        assert!(!parse.errors.is_empty(), "{source}");
        assert_eq!(parse.render(), "", "{source}");
    }
}

#[test]
fn truncated_method_keeps_header_and_default_constructor() {
    let source = "public class X { void foo(){ System.out.println(); int x; } }";
    let truncated = &source[..source.find("{ System").unwrap()];

    assert_eq!(
        diet(truncated),
        "public class X {\n  public X() { }\n  void foo() { }\n}\n"
    );
    assert_eq!(
        full(truncated),
        "public class X {\n  public X() {\n    super();\n  }\n  void foo() { }\n}\n"
    );
}

#[test]
fn full_parse_renders_statements() {
    let source = "public class X { void foo(){ System.out.println(); int x; } }";
    assert_eq!(
        full(source),
        "\
public class X {
  public X() {
    super();
  }
  void foo() {
    System.out.println();
    int x;
  }
}
"
    );
    assert_eq!(
        diet(source),
        "public class X {\n  public X() { }\n  void foo() { }\n}\n"
    );
}

#[test]
fn completion_in_field_initializer() {
    let source = "package p; public class X { Object o = zzz; }";
    let offset = source.find("zzz").unwrap() + 3;
    let completion = parse_for_completion(source, offset);

    assert_eq!(completion.node.to_string(), "<CompleteOnName:zzz>");
    assert_eq!(completion.context.as_deref(), Some("Object o = <CompleteOnName:zzz>"));
    assert_eq!(
        completion.render(),
        "package p;\npublic class X {\n  Object o = <CompleteOnName:zzz>;\n  public X() { }\n}\n"
    );
}

#[test]
fn missing_semicolon_splits_declarators() {
    let parse = parse_diet("class X { int x, y }");
    assert_eq!(
        parse.render(),
        "class X {\n  int x;\n  int y;\n  public X() { }\n}\n"
    );
    assert_eq!(parse.errors.len(), 1);
    assert_eq!(parse.errors[0].message, "expected `;` after field declaration");
}

#[test]
fn local_class_with_incomplete_extends_is_dropped() {
    let source = "class X { void foo() { class L extends { } int y; } }";
    assert_eq!(
        diet(source),
        "class X {\n  public X() { }\n  void foo() { }\n}\n"
    );
    assert_eq!(
        full(source),
        "class X {\n  public X() {\n    super();\n  }\n  void foo() {\n    int y;\n  }\n}\n"
    );

    let source = "class X { void foo() { class L extends { } Object o = zz";
    let completion = complete_at_end(source);
    assert_eq!(completion.node.to_string(), "<CompleteOnName:zz>");
    assert_eq!(completion.context.as_deref(), Some("Object o = <CompleteOnName:zz>"));
    assert_eq!(
        completion.render(),
        "class X {\n  public X() { }\n  void foo() {\n    Object o = <CompleteOnName:zz>;\n  }\n}\n"
    );
}

#[test]
fn missing_closing_braces_keep_preceding_declarations() {
    let source = "class X { int a; void m() { int b; } class Y { void n() { } ";
    let parse = parse_diet(source);
    assert_eq!(
        parse.render(),
        "\
class X {
  class Y {
    public Y() { }
    void n() { }
  }
  int a;
  public X() { }
  void m() { }
}
"
    );
    assert!(parse
        .errors
        .iter()
        .any(|err| err.message == "expected `}` to close type body"));
}

#[test]
fn members_after_unterminated_body_are_reattached() {
    let source = "class X { void a() { int x; void b() { } int f; }";
    assert_eq!(
        diet(source),
        "class X {\n  int f;\n  public X() { }\n  void a() { }\n  void b() { }\n}\n"
    );
    assert_eq!(
        full(source),
        "\
class X {
  int f;
  public X() {
    super();
  }
  void a() {
    int x;
  }
  void b() { }
}
"
    );
}

#[test]
fn unterminated_anonymous_class_is_dropped() {
    let source = "class X { void m() { Object o = new Object() { int a; ";
    assert_eq!(
        full(source),
        "\
class X {
  public X() {
    super();
  }
  void m() {
    Object o;
  }
}
"
    );

    let source = "class X { Object o = new Object() { int a; ";
    assert_eq!(
        full(source),
        "class X {\n  Object o = new Object();\n  public X() {\n    super();\n  }\n}\n"
    );
}

const VALID: &str = r#"
package com.example;

import java.util.List;
import static java.util.Collections.*;

public abstract class Shape<T extends Comparable<T>> extends Base implements Cloneable, Runnable {
    static int count = 0;
    private final List<Map<String, List<Integer>>> cache;

    static { count = 1; }
    { cache = null; }

    protected Shape(int sides) throws Exception {
        this.sides = sides;
    }

    public abstract double area();

    public void run() {
        for (int i = 0; i < 3; i++) {
            if (i % 2 == 0) continue;
            else total += i;
        }
        try (Reader r = open()) {
            r.read();
        } catch (IOException | RuntimeException e) {
            throw new IllegalStateException(e);
        } finally {
            close();
        }
    }

    enum Kind { ROUND, SQUARE }
}

interface Named {
    String PREFIX = "n:";
    String name();
    default String label() { return PREFIX + name(); }
}
"#;

#[test]
fn diet_matches_full_with_bodies_elided() {
    let diet = parse_diet(VALID);
    let mut full = parse_full(VALID);
    assert!(diet.errors.is_empty(), "{:?}", diet.errors);
    assert!(full.errors.is_empty(), "{:?}", full.errors);

    elide_bodies(&mut full.unit);
    assert_eq!(full.unit, diet.unit);
}

#[test]
fn body_pass_matches_full_parse() {
    let source = r#"
class X {
    Runnable r = () -> { run(); };
    Object o = new Object() {
        public String toString() { return "o"; }
    };
    void m() { int a = 1; }
}
"#;
    let bodies = parse(source, ParseMode::DietWithBodies);
    let full = parse_full(source);
    assert_eq!(bodies.unit, full.unit);
    assert_eq!(
        full.render(),
        r#"class X {
  Runnable r = () -> {
    run();
  };
  Object o = new Object() {
    public String toString() {
      return "o";
    }
  };
  public X() {
    super();
  }
  void m() {
    int a = 1;
  }
}
"#
    );

    let mut diet = parse_diet(source);
    assert!(!diet.unit.bodies_parsed);
    let errors = parse_bodies(&mut diet.unit, source);
    assert!(errors.is_empty());
    assert_eq!(diet.unit, full.unit);
}

#[test]
fn rendering_is_idempotent() {
    let source = "class A { class B { int y; } int x = 1; void m(int a) { } String n() { return null; } }";
    for parse_fn in [parse_diet, parse_full] {
        let first = parse_fn(source).render();
        let second = parse_fn(&first).render();
        assert_eq!(second, first);
    }
}

#[test]
fn renders_enum_with_synthesized_members() {
    let source = "enum Color { RED, GREEN(1) { void f() {} }, BLUE; int v; }";
    assert_eq!(
        diet(source),
        "\
enum Color {
  RED,
  GREEN(1) {
    void f() { }
  },
  BLUE;
  int v;
  public Color() { }
  <clinit>() { }
}
"
    );
}

#[test]
fn interface_field_initializer_synthesizes_clinit() {
    let source = "interface I { int A = 1; void m(); default void n() { } }";
    assert_eq!(
        diet(source),
        "interface I {\n  int A = 1;\n  <clinit>() { }\n  void m();\n  default void n() { }\n}\n"
    );
}

#[test]
fn renders_generic_headers_and_explicit_constructors() {
    let source = "public abstract class A<T extends Comparable<T>> extends B implements C, D { \
                  protected abstract <U> U map(T t) throws IOException; A(int x) { } \
                  Map<String, List<Integer>> m; }";
    assert_eq!(
        diet(source),
        "\
public abstract class A<T extends Comparable<T>> extends B implements C, D {
  Map<String, List<Integer>> m;
  protected abstract <U> U map(T t) throws IOException;
  A(int x) { }
}
"
    );
}

#[test]
fn renders_control_flow() {
    let source = r#"class X { void m(int[] a) {
        int[] b = new int[] {1, 2};
        for (int i = 0; i < a.length; i++) { total += a[i]; }
        if (a != null) return; else throw new IllegalStateException("x");
        while (x) x--;
        String s = switch (k) { case 1 -> "one"; default -> "many"; };
    } }"#;
    assert_eq!(
        full(source),
        r#"class X {
  public X() {
    super();
  }
  void m(int[] a) {
    int[] b = new int[] {1, 2};
    for (int i = 0; i < a.length; i++) {
      total += a[i];
    }
    if (a != null)
      return;
    else
      throw new IllegalStateException("x");
    while (x)
      x--;
    String s = switch (k) {
      case 1 -> "one";
      default -> "many";
    };
  }
}
"#
    );
}

#[test]
fn completion_node_kinds() {
    let cases = [
        ("class X { java.util.Li", "<CompleteOnType:java.util.Li>", "<CompleteOnType:java.util.Li>"),
        ("class X { void m() { foo().ba", "<CompleteOnMemberAccess:foo().ba>", "<CompleteOnMemberAccess:foo().ba>"),
        ("class X { Object o = int.cl", "<CompleteOnClassLiteralAccess:int.cl>", "Object o = <CompleteOnClassLiteralAccess:int.cl>"),
        ("import java.ut", "<CompleteOnName:java.ut>", "import <CompleteOnName:java.ut>"),
        ("class X { void m() { a.b.", "<CompleteOnName:a.b.>", "<CompleteOnName:a.b.>"),
    ];
    for (source, node, context) in cases {
        let completion = complete_at_end(source);
        assert_eq!(completion.node.to_string(), node, "{source}");
        assert_eq!(completion.context.as_deref(), Some(context), "{source}");
    }
}

#[test]
fn completion_prunes_the_enclosing_body() {
    let source = r#"class X { void m() { int a = 1; foo(); String s = "x"; s.len"#;
    let completion = complete_at_end(source);
    assert_eq!(completion.node.to_string(), "<CompleteOnName:s.len>");
    assert_eq!(
        completion.render(),
        "\
class X {
  public X() { }
  void m() {
    int a;
    String s;
    <CompleteOnName:s.len>;
  }
}
"
    );
}

#[test]
fn no_completion_outside_completable_positions() {
    for source in [
        "class X { } ",
        "class X { String s = \"ab",
        "class X { // note",
        "class X { int x = 12",
    ] {
        let completion = complete_at_end(source);
        assert!(completion.node.is_none(), "{source}");
        assert_eq!(completion.node.to_string(), "<NONE>");
        assert_eq!(completion.context, None, "{source}");
    }
}

#[test]
fn completion_ignores_text_after_cursor() {
    let source = "class X { void m() { Object o = zz; } void later() { } }";
    let offset = source.find("zz").unwrap() + 2;
    let completion = parse_for_completion(source, offset);
    assert!(completion.render().contains("Object o = <CompleteOnName:zz>;"));
    assert!(!completion.render().contains("later"));
}

#[test]
fn errors_are_sorted_and_lexical_errors_included() {
    let parse = parse_diet("class X { String s = \"abc\n int y }");
    let starts: Vec<usize> = parse.errors.iter().map(|e| e.range.start).collect();
    let mut sorted = starts.clone();
    sorted.sort();
    assert_eq!(starts, sorted);
    assert!(parse.errors.len() >= 2);
}

#[test]
fn completion_after_whitespace() {
    let cases = [
        ("class X { Object o = ", "<CompleteOnName:>"),
        ("class X { void m() { return ", "<CompleteOnName:>"),
        ("class X { void m() { Object o = new ", "<CompleteOnType:>"),
    ];
    for (source, node) in cases {
        let completion = complete_at_end(source);
        assert_eq!(completion.node.to_string(), node, "{source}");
        assert!(completion.context.is_some(), "{source}");
    }
}

#[test]
fn unclosed_body_drops_local_initializers() {
    let source = "class X { void a() { int x = 5; void b() {} }";
    let expected = "\
class X {
  public X() {
    super();
  }
  void a() {
    int x;
  }
  void b() { }
}
";
    let full = parse_full(source);
    assert_eq!(full.render(), expected);
    assert!(full
        .errors
        .iter()
        .any(|err| err.message == "expected `}` before member declaration"));
    assert_eq!(parse(source, ParseMode::DietWithBodies).unit, full.unit);

    assert!(self::full("class X { void a() { int x = 5; } }").contains("    int x = 5;\n"));
}

#[test]
fn incomplete_type_arguments_keep_the_bare_name() {
    let parse = parse_diet("class X extends A< { }");
    assert_eq!(parse.render(), "class X extends A {\n  public X() { }\n}\n");
    assert!(!parse.errors.is_empty());
    assert!(parse_diet(&parse.render()).errors.is_empty());

    assert_eq!(
        diet("class X { void m() { class L extends A< { } } }"),
        "class X {\n  public X() { }\n  void m() { }\n}\n"
    );
    assert_eq!(
        full("class X { void m() { class L extends A< { } } }"),
        "class X {\n  public X() {\n    super();\n  }\n  void m() { }\n}\n"
    );
}

#[test]
fn unterminated_literal_drops_field_initializer() {
    let parse = parse_diet("class X { String s = \"abc\n  int y; }");
    assert_eq!(
        parse.render(),
        "class X {\n  String s;\n  int y;\n  public X() { }\n}\n"
    );
    assert!(parse
        .errors
        .iter()
        .any(|err| err.message == "unterminated string literal"));

    let parse = parse_diet("class X { int[] a = {1, 2 int y; }");
    assert_eq!(
        parse.render(),
        "class X {\n  int[] a;\n  int y;\n  public X() { }\n}\n"
    );
    assert!(parse
        .errors
        .iter()
        .any(|err| err.message == "unterminated array initializer"));
}

#[test]
fn partial_type_lists_keep_valid_prefix() {
    assert_eq!(
        diet("class X implements A, { }"),
        "class X implements A {\n  public X() { }\n}\n"
    );
    assert_eq!(
        diet("class X { void m() throws E, { } }"),
        "class X {\n  public X() { }\n  void m() throws E { }\n}\n"
    );
}

#[test]
fn trailing_incomplete_parameter_is_dropped_and_reported() {
    let parse = parse_diet("class X { void m(int a, int) { } }");
    assert_eq!(
        parse.render(),
        "class X {\n  public X() { }\n  void m(int a) { }\n}\n"
    );
    assert_eq!(parse.errors.len(), 1);
    assert_eq!(parse.errors[0].message, "expected parameter name");
}

#[test]
fn method_header_without_body_before_member() {
    let source = "class X { void m() int f; }";
    let parse = parse_diet(source);
    assert_eq!(
        parse.render(),
        "class X {\n  int f;\n  public X() { }\n  void m() { }\n}\n"
    );
    assert!(parse
        .errors
        .iter()
        .any(|err| err.message == "expected `{` or `;` after method header"));
    assert_eq!(
        full(source),
        "class X {\n  int f;\n  public X() {\n    super();\n  }\n  void m() { }\n}\n"
    );
}

#[test]
fn modifier_field_in_unclosed_body_joins_nearest_type() {
    assert_eq!(
        diet("class X { void m() { int a; private int f; }"),
        "class X {\n  private int f;\n  public X() { }\n  void m() { }\n}\n"
    );
    assert_eq!(
        diet("class X { class Y { void m() { int a; private int f; } }"),
        "\
class X {
  class Y {
    private int f;
    public Y() { }
    void m() { }
  }
  public X() { }
}
"
    );
}

#[test]
fn member_without_return_type_is_a_constructor() {
    let source = "class X { Y() { } }";
    assert_eq!(diet(source), "class X {\n  Y() { }\n}\n");
    let full = parse_full(source);
    assert_eq!(full.render(), "class X {\n  Y() {\n    super();\n  }\n}\n");
    assert!(full
        .errors
        .iter()
        .any(|err| err.message == "return type for the method is missing"));
}

#[test]
fn explicit_method_type_arguments_are_kept() {
    let source = "class X { Object o = Collections.<String>emptyList(); }";
    let parse = parse_diet(source);
    assert!(parse.errors.is_empty(), "{:?}", parse.errors);
    assert!(parse
        .render()
        .contains("  Object o = Collections.<String>emptyList();\n"));
}

#[test]
fn record_compact_constructor() {
    let source = "record P(int x) { P { if (x == 0) throw new IllegalArgumentException(); } }";
    assert_eq!(diet(source), "record P(int x) {\n  P { }\n}\n");
    let full = parse_full(source);
    assert!(full.errors.is_empty(), "{:?}", full.errors);
    assert_eq!(
        full.render(),
        "\
record P(int x) {
  P {
    if (x == 0)
      throw new IllegalArgumentException();
  }
}
"
    );
}
