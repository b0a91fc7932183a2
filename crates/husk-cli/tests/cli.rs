use assert_cmd::Command;
use assert_fs::prelude::*;
use assert_fs::TempDir;
use predicates::prelude::*;

fn husk() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("husk"))
}

const HELLO: &str = r#"package demo;

import java.util.List;

public class Hello {
    private List<String> names;

    public void greet(String who) {
        System.out.println("Hello " + who);
    }
}
"#;

const MISSING_SEMICOLON: &str = "class X {\n    int x, y\n}\n";

#[test]
fn help_mentions_core_commands() {
    husk().arg("--help").assert().success().stdout(
        predicate::str::contains("parse").and(predicate::str::contains("complete")),
    );
}

#[test]
fn parse_prints_diet_rendering_by_default() {
    let temp = TempDir::new().unwrap();
    let file = temp.child("Hello.java");
    file.write_str(HELLO).unwrap();

    husk().arg("parse").arg(file.path()).assert().success().stdout(
        "package demo;
import java.util.List;
public class Hello {
  private List<String> names;
  public Hello() { }
  public void greet(String who) { }
}
",
    );
}

#[test]
fn parse_full_mode_renders_bodies() {
    let temp = TempDir::new().unwrap();
    let file = temp.child("Hello.java");
    file.write_str(HELLO).unwrap();

    for mode in ["full", "bodies"] {
        husk()
            .arg("parse")
            .arg(file.path())
            .arg("--mode")
            .arg(mode)
            .assert()
            .success()
            .stdout(predicate::str::contains(
                "  public Hello() {\n    super();\n  }\n",
            ))
            .stdout(predicate::str::contains(
                "    System.out.println(\"Hello \" + who);\n",
            ));
    }
}

#[test]
fn config_supplies_mode_and_indent_width() {
    let temp = TempDir::new().unwrap();
    let file = temp.child("Hello.java");
    file.write_str(HELLO).unwrap();
    let config = temp.child("husk.toml");
    config
        .write_str("[parser]\nmode = \"full\"\nindent_width = 4\n")
        .unwrap();

    husk()
        .arg("parse")
        .arg(file.path())
        .arg("--config")
        .arg(config.path())
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "    public Hello() {\n        super();\n    }\n",
        ));
}

#[test]
fn diagnostics_only_fail_in_strict_mode() {
    let temp = TempDir::new().unwrap();
    let file = temp.child("X.java");
    file.write_str(MISSING_SEMICOLON).unwrap();

    husk()
        .arg("parse")
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "  int x;\n  int y;\n",
        ))
        .stdout(predicate::str::contains(
            "error:3:1: expected `;` after field declaration",
        ));

    husk()
        .arg("parse")
        .arg(file.path())
        .arg("--strict")
        .assert()
        .code(1);
}

#[test]
fn parse_json_reports_diagnostics_with_positions() {
    let temp = TempDir::new().unwrap();
    let file = temp.child("X.java");
    file.write_str(MISSING_SEMICOLON).unwrap();

    let output = husk()
        .arg("parse")
        .arg(file.path())
        .arg("--json")
        .output()
        .unwrap();

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let v: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(v["mode"], "Diet");
    assert!(v["rendering"].as_str().unwrap().starts_with("class X {\n"));
    let diagnostics = v["diagnostics"].as_array().unwrap();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0]["line"], 3);
    assert_eq!(diagnostics[0]["column"], 1);
    assert_eq!(
        diagnostics[0]["message"],
        "expected `;` after field declaration"
    );
}

#[test]
fn complete_at_offset_prints_node_and_context() {
    let temp = TempDir::new().unwrap();
    let source = "package p; public class X { Object o = zzz; }";
    let file = temp.child("X.java");
    file.write_str(source).unwrap();
    let offset = source.find("zzz").unwrap() + 3;

    husk()
        .arg("complete")
        .arg(file.path())
        .arg("--offset")
        .arg(offset.to_string())
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "node: <CompleteOnName:zzz>\ncontext: Object o = <CompleteOnName:zzz>\n",
        ))
        .stdout(predicate::str::contains(
            "  Object o = <CompleteOnName:zzz>;\n",
        ));
}

#[test]
fn complete_at_line_col_emits_json() {
    let temp = TempDir::new().unwrap();
    let file = temp.child("X.java");
    file.write_str("package p; public class X { Object o = zzz; }")
        .unwrap();

    let output = husk()
        .arg("complete")
        .arg(file.path())
        .arg("--at")
        .arg("1:43")
        .arg("--json")
        .output()
        .unwrap();

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let v: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(v["offset"], 42);
    assert_eq!(v["node"]["kind"], "Name");
    assert_eq!(v["node"]["prefix"], "zzz");
    assert!(v["node"]["qualifier"].is_null());
    assert_eq!(v["node"]["label"], "<CompleteOnName:zzz>");
    assert_eq!(v["context"], "Object o = <CompleteOnName:zzz>");
}

#[test]
fn complete_requires_a_cursor() {
    let temp = TempDir::new().unwrap();
    let file = temp.child("X.java");
    file.write_str("class X { }").unwrap();

    husk().arg("complete").arg(file.path()).assert().failure();
}

#[test]
fn complete_rejects_offset_past_end() {
    let temp = TempDir::new().unwrap();
    let file = temp.child("X.java");
    file.write_str("class X { }").unwrap();

    husk()
        .arg("complete")
        .arg(file.path())
        .arg("--offset")
        .arg("500")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("past the end of the file"));
}

#[test]
fn missing_file_is_an_operational_error() {
    let temp = TempDir::new().unwrap();

    husk()
        .arg("parse")
        .arg(temp.child("Missing.java").path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("failed to read"));
}

#[test]
fn invalid_config_is_an_operational_error() {
    let temp = TempDir::new().unwrap();
    let file = temp.child("X.java");
    file.write_str("class X { }").unwrap();
    let config = temp.child("husk.toml");
    config.write_str("[parser]\nindent_width = 0\n").unwrap();

    husk()
        .arg("parse")
        .arg(file.path())
        .arg("--config")
        .arg(config.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("indent_width"));
}
