use anyhow::{bail, Context, Result};
use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};
use husk_config::{HuskConfig, ParseModeSetting};
use husk_core::{LineCol, LineIndex, TextSize};
use husk_syntax::{
    parse, parse_for_completion, render_with, CompletionKind, ParseError, ParseMode,
    RenderOptions,
};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "husk", version, about = "Husk: recovering Java parser (parse, complete)")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse a Java file and print its canonical rendering
    Parse(ParseArgs),
    /// Parse a Java file for completion at a cursor position
    Complete(CompleteArgs),
}

#[derive(Args)]
struct ParseArgs {
    /// File to parse
    file: PathBuf,
    /// How much of each body to parse (defaults to `parser.mode` from the config)
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,
    /// Emit JSON suitable for CI
    #[arg(long)]
    json: bool,
    /// Exit with status 1 when the parse reported diagnostics
    #[arg(long)]
    strict: bool,
    /// Path to a `husk.toml` config file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[derive(Args)]
#[command(group(ArgGroup::new("cursor").required(true).args(["offset", "at"])))]
struct CompleteArgs {
    /// File to parse
    file: PathBuf,
    /// Cursor as a byte offset into the file
    #[arg(long)]
    offset: Option<usize>,
    /// Cursor as a one-based `LINE:COL` pair (column in bytes)
    #[arg(long, value_name = "LINE:COL")]
    at: Option<LineCol>,
    /// Emit JSON suitable for CI
    #[arg(long)]
    json: bool,
    /// Path to a `husk.toml` config file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Diet,
    Bodies,
    Full,
}

impl From<ModeArg> for ParseMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Diet => ParseMode::Diet,
            ModeArg::Bodies => ParseMode::DietWithBodies,
            ModeArg::Full => ParseMode::Full,
        }
    }
}

fn configured_mode(setting: ParseModeSetting) -> ParseMode {
    match setting {
        ParseModeSetting::Diet => ParseMode::Diet,
        ParseModeSetting::DietWithBodies => ParseMode::DietWithBodies,
        ParseModeSetting::Full => ParseMode::Full,
    }
}

fn main() {
    let cli = Cli::parse();
    let exit_code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            2
        }
    };

    std::process::exit(exit_code);
}

fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Command::Parse(args) => {
            let config = load_config(args.config.as_deref())?;
            let source = read_source(&args.file)?;
            let mode = args
                .mode
                .map(ParseMode::from)
                .unwrap_or_else(|| configured_mode(config.parser.mode));

            let result = parse(&source, mode);
            tracing::debug!(
                target: "husk.cli",
                file = %args.file.display(),
                ?mode,
                errors = result.errors.len(),
                "parsed file"
            );

            let options = RenderOptions {
                indent_width: config.parser.indent_width,
            };
            let report = ParseReport {
                file: args.file,
                mode,
                rendering: render_with(&result.unit, &options),
                diagnostics: diagnostics(&source, &result.errors),
            };
            let exit = if args.strict && !report.diagnostics.is_empty() {
                1
            } else {
                0
            };

            if args.json {
                print_json(&report)?;
            } else {
                print!("{}", report.rendering);
                print_diagnostics(&report.diagnostics);
            }
            Ok(exit)
        }
        Command::Complete(args) => {
            let config = load_config(args.config.as_deref())?;
            let source = read_source(&args.file)?;
            let offset = cursor_offset(&source, args.offset, args.at)?;

            let result = parse_for_completion(&source, offset);
            tracing::debug!(
                target: "husk.cli",
                file = %args.file.display(),
                offset,
                node = %result.node,
                "parsed for completion"
            );

            let options = RenderOptions {
                indent_width: config.parser.indent_width,
            };
            let report = CompleteReport {
                file: args.file,
                offset,
                node: NodeReport {
                    label: result.node.to_string(),
                    kind: result.node.kind,
                    qualifier: result.node.qualifier.clone(),
                    prefix: result.node.prefix.clone(),
                },
                context: result.context.clone(),
                rendering: render_with(&result.unit, &options),
                diagnostics: diagnostics(&source, &result.errors),
            };

            if args.json {
                print_json(&report)?;
            } else {
                println!("node: {}", report.node.label);
                match &report.context {
                    Some(context) => println!("context: {context}"),
                    None => println!("context: (none)"),
                }
                print!("{}", report.rendering);
                print_diagnostics(&report.diagnostics);
            }
            Ok(0)
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<HuskConfig> {
    let config = match path {
        Some(path) => HuskConfig::load_from_path(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => HuskConfig::default(),
    };
    husk_config::init_tracing(&config.logging);
    Ok(config)
}

fn read_source(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn cursor_offset(source: &str, offset: Option<usize>, at: Option<LineCol>) -> Result<usize> {
    match (offset, at) {
        (Some(offset), _) => {
            if offset > source.len() {
                bail!(
                    "offset {offset} is past the end of the file ({} bytes)",
                    source.len()
                );
            }
            Ok(offset)
        }
        (None, Some(at)) => {
            let index = LineIndex::new(source);
            match index.offset(at) {
                Some(offset) => Ok(usize::from(offset)),
                None => bail!("position {}:{} is outside the file", at.line + 1, at.col + 1),
            }
        }
        (None, None) => bail!("either --offset or --at is required"),
    }
}

#[derive(Serialize)]
struct ParseReport {
    file: PathBuf,
    mode: ParseMode,
    rendering: String,
    diagnostics: Vec<Diagnostic>,
}

#[derive(Serialize)]
struct CompleteReport {
    file: PathBuf,
    offset: usize,
    node: NodeReport,
    context: Option<String>,
    rendering: String,
    diagnostics: Vec<Diagnostic>,
}

#[derive(Serialize)]
struct NodeReport {
    label: String,
    kind: CompletionKind,
    qualifier: Option<String>,
    prefix: String,
}

/// A [`ParseError`] with its start resolved to a one-based line and column.
#[derive(Serialize)]
struct Diagnostic {
    line: u32,
    column: u32,
    start: usize,
    end: usize,
    message: String,
}

fn diagnostics(source: &str, errors: &[ParseError]) -> Vec<Diagnostic> {
    let index = LineIndex::new(source);
    errors
        .iter()
        .map(|err| {
            let pos = index.line_col(TextSize::from(err.range.start as u32));
            Diagnostic {
                line: pos.line + 1,
                column: pos.col + 1,
                start: err.range.start,
                end: err.range.end,
                message: err.message.clone(),
            }
        })
        .collect()
}

fn print_diagnostics(diagnostics: &[Diagnostic]) {
    for d in diagnostics {
        println!("error:{}:{}: {}", d.line, d.column, d.message);
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value)?;
    println!("{out}");
    Ok(())
}
