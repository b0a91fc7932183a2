//! Completion-mode parsing.
//!
//! The source is tokenized only up to the cursor. The identifier the cursor
//! touches is cut to the typed prefix and re-tagged as a
//! [`SyntaxKind::Completion`] token; when the cursor follows a token that
//! demands an operand (`.`, `=`, `new`, `(`, ...) an empty completion token is
//! inserted instead. The parser turns that token into a [`CompletionNode`]
//! whose kind reflects the syntactic slot it landed in.

use std::fmt;

use husk_core::Span;
use serde::Serialize;

use crate::lexer::{lex_with_errors, LexError, Token};
use crate::parser::{BodyMode, Parser};
use crate::{render, CompilationUnit, ParseError, SyntaxKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CompletionKind {
    /// A simple or qualified name in expression, package or import position.
    Name,
    /// A type reference.
    Type,
    /// `.ident` after an expression that is not a plain name.
    MemberAccess,
    /// `.ident` after a primitive or array type (`int.cl`).
    ClassLiteralAccess,
    /// The cursor is not in a completable position.
    None,
}

impl CompletionKind {
    fn label(self) -> &'static str {
        match self {
            CompletionKind::Name => "CompleteOnName",
            CompletionKind::Type => "CompleteOnType",
            CompletionKind::MemberAccess => "CompleteOnMemberAccess",
            CompletionKind::ClassLiteralAccess => "CompleteOnClassLiteralAccess",
            CompletionKind::None => "NONE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CompletionNode {
    pub kind: CompletionKind,
    /// Rendered receiver or qualifier preceding the `.`.
    pub qualifier: Option<String>,
    /// Identifier text typed before the cursor.
    pub prefix: String,
}

impl CompletionNode {
    pub fn new(kind: CompletionKind, qualifier: Option<String>, prefix: impl Into<String>) -> Self {
        CompletionNode {
            kind,
            qualifier,
            prefix: prefix.into(),
        }
    }

    pub fn none() -> Self {
        CompletionNode::new(CompletionKind::None, None, "")
    }

    pub fn is_none(&self) -> bool {
        self.kind == CompletionKind::None
    }
}

impl fmt::Display for CompletionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            return f.write_str("<NONE>");
        }
        write!(f, "<{}:", self.kind.label())?;
        if let Some(qualifier) = &self.qualifier {
            write!(f, "{qualifier}.")?;
        }
        write!(f, "{}>", self.prefix)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionParse {
    /// Diet skeleton of the text before the cursor; the body holding the
    /// cursor is parsed and pruned to what matters for completion.
    pub unit: CompilationUnit,
    pub node: CompletionNode,
    /// Rendering of the smallest statement or declaration containing the node,
    /// without its trailing `;`.
    pub context: Option<String>,
    pub errors: Vec<ParseError>,
}

impl CompletionParse {
    pub fn render(&self) -> String {
        render(&self.unit)
    }
}

/// Parse `source` as if the text ended at byte `offset`, the cursor.
pub fn parse_for_completion(source: &str, offset: usize) -> CompletionParse {
    let mut offset = offset.min(source.len());
    while !source.is_char_boundary(offset) {
        offset -= 1;
    }

    let (tokens, lex_errors, cursor) = cursor_tokens(source, offset);
    tracing::debug!(target: "husk.syntax", offset, ?cursor, "parsing for completion");

    let mut parser = Parser::new(source, &tokens, BodyMode::Completion, offset);
    let unit = parser.parse_compilation_unit();
    let output = parser.finish();

    let node = output.completion.unwrap_or_else(CompletionNode::none);
    let context = if node.is_none() {
        None
    } else {
        output.context.or_else(|| Some(node.to_string()))
    };

    let mut errors: Vec<ParseError> = lex_errors
        .into_iter()
        .filter(|err| err.range.start < offset)
        .map(ParseError::from)
        .collect();
    errors.extend(output.errors);
    errors.sort_by_key(|err| err.range.start);

    CompletionParse {
        unit,
        node,
        context,
        errors,
    }
}

/// Where the cursor sits relative to the token stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Cursor {
    /// A completion token (possibly empty) was emitted.
    Completable,
    /// Between tokens, after something that takes no operand.
    Idle,
    /// Inside a comment or a literal.
    Opaque,
}

/// Significant tokens before the cursor, ending with a completion token when
/// the cursor is in a completable spot.
pub(crate) fn cursor_tokens(source: &str, offset: usize) -> (Vec<Token>, Vec<LexError>, Cursor) {
    let (all, lex_errors) = lex_with_errors(source);
    let mut tokens = Vec::new();

    for tok in all {
        if tok.kind == SyntaxKind::Eof || tok.range.start >= offset {
            break;
        }
        let inside = offset < tok.range.end;
        let touching = offset == tok.range.end;

        if tok.kind.is_trivia() {
            let open_comment = match tok.kind {
                SyntaxKind::LineComment => true,
                SyntaxKind::BlockComment | SyntaxKind::DocComment => {
                    !tok.text(source).ends_with("*/") || tok.range.len() < 4
                }
                _ => false,
            };
            if tok.kind != SyntaxKind::Whitespace && (inside || (touching && open_comment)) {
                return (tokens, lex_errors, Cursor::Opaque);
            }
            continue;
        }

        if is_word(tok, source) {
            if inside || touching {
                tokens.push(Token {
                    kind: SyntaxKind::Completion,
                    range: Span::new(tok.range.start, offset),
                });
                return (tokens, lex_errors, Cursor::Completable);
            }
        } else if matches!(
            tok.kind,
            SyntaxKind::StringLiteral
                | SyntaxKind::CharLiteral
                | SyntaxKind::TextBlock
                | SyntaxKind::Error
        ) {
            if inside || (touching && tok.kind == SyntaxKind::Error) {
                return (tokens, lex_errors, Cursor::Opaque);
            }
        } else if inside {
            // Cursor splits an operator or a number.
            return (tokens, lex_errors, Cursor::Opaque);
        }
        tokens.push(tok);
    }

    if tokens.last().map_or(false, |tok| expects_operand(tok.kind)) {
        tokens.push(Token {
            kind: SyntaxKind::Completion,
            range: Span::point(offset),
        });
        return (tokens, lex_errors, Cursor::Completable);
    }
    (tokens, lex_errors, Cursor::Idle)
}

fn is_word(tok: Token, source: &str) -> bool {
    tok.kind != SyntaxKind::Error
        && tok
            .text(source)
            .chars()
            .next()
            .map_or(false, |c| c == '_' || c == '$' || c.is_alphabetic())
}

/// Tokens after which an identifier is syntactically expected.
fn expects_operand(kind: SyntaxKind) -> bool {
    kind.is_assignment_operator()
        || matches!(
            kind,
            SyntaxKind::Dot
                | SyntaxKind::LParen
                | SyntaxKind::LBracket
                | SyntaxKind::Comma
                | SyntaxKind::At
                | SyntaxKind::Question
                | SyntaxKind::Colon
                | SyntaxKind::Arrow
                | SyntaxKind::Plus
                | SyntaxKind::Minus
                | SyntaxKind::Star
                | SyntaxKind::Slash
                | SyntaxKind::Percent
                | SyntaxKind::Bang
                | SyntaxKind::Tilde
                | SyntaxKind::EqEq
                | SyntaxKind::BangEq
                | SyntaxKind::Less
                | SyntaxKind::LessEq
                | SyntaxKind::GreaterEq
                | SyntaxKind::Amp
                | SyntaxKind::AmpAmp
                | SyntaxKind::Pipe
                | SyntaxKind::PipePipe
                | SyntaxKind::Caret
                | SyntaxKind::NewKw
                | SyntaxKind::ExtendsKw
                | SyntaxKind::ImplementsKw
                | SyntaxKind::ThrowsKw
                | SyntaxKind::ReturnKw
                | SyntaxKind::ThrowKw
                | SyntaxKind::CaseKw
                | SyntaxKind::InstanceofKw
                | SyntaxKind::ImportKw
                | SyntaxKind::PackageKw
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tail(source: &str, offset: usize) -> (Vec<(SyntaxKind, String)>, Cursor) {
        let (tokens, _, cursor) = cursor_tokens(source, offset);
        let tail = tokens
            .iter()
            .rev()
            .take(2)
            .rev()
            .map(|t| (t.kind, t.text(source).to_string()))
            .collect();
        (tail, cursor)
    }

    #[test]
    fn identifier_under_cursor_is_cut_to_prefix() {
        let source = "Object o = zzzz;";
        let (last_two, cursor) = tail(source, 13);
        assert_eq!(cursor, Cursor::Completable);
        assert_eq!(
            last_two,
            vec![
                (SyntaxKind::Eq, "=".to_string()),
                (SyntaxKind::Completion, "zz".to_string())
            ]
        );
    }

    #[test]
    fn empty_prefix_after_dot_and_assignment() {
        let (last_two, cursor) = tail("a.b. ", 4);
        assert_eq!(cursor, Cursor::Completable);
        assert_eq!(last_two[1], (SyntaxKind::Completion, String::new()));

        let (_, cursor) = tail("x = ", 4);
        assert_eq!(cursor, Cursor::Completable);
    }

    #[test]
    fn no_completion_after_closing_brace_or_inside_literals() {
        assert_eq!(tail("class X { } ", 12).1, Cursor::Idle);
        assert_eq!(tail("String s = \"abc", 14).1, Cursor::Opaque);
        assert_eq!(tail("int x; // note", 12).1, Cursor::Opaque);
        assert_eq!(tail("int x; /* a */", 14).1, Cursor::Idle);
        assert_eq!(tail("int x = 12", 10).1, Cursor::Idle);
    }

    #[test]
    fn whitespace_before_cursor_keeps_completion_open() {
        assert_eq!(tail("x = ", 4).1, Cursor::Completable);
        assert_eq!(tail("return ", 7).1, Cursor::Completable);
        assert_eq!(tail("Object o = new ", 15).1, Cursor::Completable);
        assert_eq!(tail("x = /* a */ ", 12).1, Cursor::Completable);
        assert_eq!(tail("x = /* a ", 9).1, Cursor::Opaque);
    }

    #[test]
    fn node_rendering() {
        assert_eq!(
            CompletionNode::new(CompletionKind::Name, None, "zzz").to_string(),
            "<CompleteOnName:zzz>"
        );
        assert_eq!(
            CompletionNode::new(CompletionKind::MemberAccess, Some("foo()".into()), "ba")
                .to_string(),
            "<CompleteOnMemberAccess:foo().ba>"
        );
        assert_eq!(CompletionNode::none().to_string(), "<NONE>");
    }
}
