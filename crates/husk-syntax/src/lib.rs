//! Recovering structural parser for Java compilation units.
//!
//! Every entry point accepts arbitrary text and always returns a tree:
//! syntax problems become [`ParseError`]s and are repaired locally.
//!
//! - [`parse_diet`]: declarations only; method, constructor and initializer
//!   bodies are elided and only their spans are kept.
//! - [`parse_bodies`]: fills in the bodies of a diet unit from those spans.
//! - [`parse_full`]: declarations and bodies in one pass.
//! - [`parse_for_completion`]: a diet parse of the text before a cursor, with
//!   a [`CompletionNode`] standing in for the identifier being typed.

pub mod ast;
mod bodies;
mod completion;
mod lexer;
mod parser;
pub mod placement;
mod printer;
pub mod recovery;
mod syntax_kind;

pub use ast::*;
pub use bodies::parse_bodies;
pub use completion::{parse_for_completion, CompletionKind, CompletionNode, CompletionParse};
pub use lexer::{lex, lex_with_errors, LexError, Lexer, Token};
pub use printer::{render, render_with, RenderOptions};
pub use syntax_kind::SyntaxKind;

use husk_core::Span;
use serde::Serialize;

use crate::parser::{BodyMode, Parser};

/// A recoverable syntax problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseError {
    pub message: String,
    pub range: Span,
}

impl From<LexError> for ParseError {
    fn from(err: LexError) -> Self {
        ParseError {
            message: err.message,
            range: err.range,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parse {
    pub unit: CompilationUnit,
    pub errors: Vec<ParseError>,
}

impl Parse {
    /// Canonical rendering of the unit with default options.
    pub fn render(&self) -> String {
        render(&self.unit)
    }
}

/// How much of each body a [`parse`] call materializes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum ParseMode {
    #[default]
    Diet,
    DietWithBodies,
    Full,
}

pub fn parse(source: &str, mode: ParseMode) -> Parse {
    match mode {
        ParseMode::Diet => parse_diet(source),
        ParseMode::DietWithBodies => {
            let mut parse = parse_diet(source);
            let errors = parse_bodies(&mut parse.unit, source);
            parse.errors.extend(errors);
            parse.errors.sort_by_key(|err| err.range.start);
            parse
        }
        ParseMode::Full => parse_full(source),
    }
}

/// Parse declarations only, eliding every body.
pub fn parse_diet(source: &str) -> Parse {
    parse_unit(source, BodyMode::Elide)
}

/// Parse declarations and bodies in a single pass.
pub fn parse_full(source: &str) -> Parse {
    let mut parse = parse_unit(source, BodyMode::Parse);
    parse.unit.bodies_parsed = true;
    parse
}

fn parse_unit(source: &str, mode: BodyMode) -> Parse {
    let (tokens, lex_errors) = lex_with_errors(source);
    let tokens: Vec<Token> = tokens
        .into_iter()
        .filter(|t| !t.kind.is_trivia() && t.kind != SyntaxKind::Eof)
        .collect();

    tracing::trace!(target: "husk.syntax", tokens = tokens.len(), ?mode, "parsing compilation unit");

    let mut parser = Parser::new(source, &tokens, mode, source.len());
    let unit = parser.parse_compilation_unit();
    let mut errors: Vec<ParseError> = lex_errors.into_iter().map(ParseError::from).collect();
    errors.extend(parser.finish().errors);
    errors.sort_by_key(|err| err.range.start);

    Parse { unit, errors }
}

#[cfg(test)]
mod tests;
