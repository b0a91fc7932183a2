use pretty_assertions::assert_eq;

use husk_core::{LineIndex, TextSize};
use husk_syntax::{parse, Parse, ParseMode};
use std::ffi::OsStr;
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Every `testdata/**/X.java` has `X.diet` and `X.full` next to it: the
/// canonical rendering followed by the diagnostics, if any.
/// Run with `BLESS=1` to regenerate the expectations.
#[test]
fn recovery_corpus() -> io::Result<()> {
    let bless = std::env::var_os("BLESS").is_some();
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let testdata_dir = manifest_dir.join("testdata");

    run_fixtures(&testdata_dir.join("valid"), bless, true)?;
    run_fixtures(&testdata_dir.join("recovery"), bless, false)?;

    Ok(())
}

fn run_fixtures(root: &Path, bless: bool, expect_clean: bool) -> io::Result<()> {
    let fixtures = collect_java_files(root)?;

    for java_path in fixtures {
        let input = read_normalized(&java_path)?;

        let diet = parse(&input, ParseMode::Diet);
        let full = parse(&input, ParseMode::Full);
        let with_bodies = parse(&input, ParseMode::DietWithBodies);

        if expect_clean && !(diet.errors.is_empty() && full.errors.is_empty()) {
            panic!(
                "expected no parse errors for fixture `{}`\n{}",
                java_path.display(),
                format_errors(&input, &full)
            );
        }

        assert_eq!(
            with_bodies.render(),
            full.render(),
            "body pass disagrees with full parse for `{}`",
            java_path.display()
        );

        for (ext, parse) in [("diet", &diet), ("full", &full)] {
            let dump = dump(&input, parse);
            let expected_path = java_path.with_extension(ext);
            if bless {
                write_if_changed(&expected_path, &dump)?;
            } else {
                let expected = read_expected(&expected_path)?;
                assert_eq!(
                    dump,
                    expected,
                    "{ext} mismatch for fixture `{}`",
                    java_path.display()
                );
            }
        }
    }

    Ok(())
}

fn dump(source: &str, parse: &Parse) -> String {
    let mut out = parse.render();
    if !parse.errors.is_empty() {
        out.push_str("--- errors\n");
        out.push_str(&format_errors(source, parse));
    }
    out
}

fn format_errors(source: &str, parse: &Parse) -> String {
    let index = LineIndex::new(source);
    let mut out = String::new();
    for error in &parse.errors {
        let pos = index.line_col(TextSize::from(error.range.start as u32));
        let _ = writeln!(out, "{}:{}: {}", pos.line + 1, pos.col + 1, error.message);
    }
    out
}

fn collect_java_files(root: &Path) -> io::Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    if !root.exists() {
        return Ok(out);
    }
    for entry in fs::read_dir(root)? {
        let path = entry?.path();
        if path.is_file() && path.extension() == Some(OsStr::new("java")) {
            out.push(path);
        }
    }
    out.sort();
    Ok(out)
}

fn read_normalized(path: &Path) -> io::Result<String> {
    let raw = fs::read_to_string(path)?;
    Ok(normalize_newlines(&raw))
}

fn read_expected(path: &Path) -> io::Result<String> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(normalize_newlines(&contents)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!(
                "missing expected file `{}` (run with `BLESS=1` to generate)",
                path.display()
            ),
        )),
        Err(err) => Err(err),
    }
}

fn write_if_changed(path: &Path, contents: &str) -> io::Result<()> {
    if let Ok(existing) = fs::read_to_string(path) {
        if normalize_newlines(&existing) == contents {
            return Ok(());
        }
    }
    fs::write(path, contents)
}

fn normalize_newlines(s: &str) -> String {
    s.replace("\r\n", "\n").replace('\r', "\n")
}
