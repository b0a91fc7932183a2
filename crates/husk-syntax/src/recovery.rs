//! Brace-depth recovery for method and initializer bodies.
//!
//! A body is delimited without parsing it: [`skim_body`] walks the tokens after
//! its `{` while keeping a [`RecoveryStack`] of the constructs it is inside.
//! The body ends at the `}` that empties the stack, at the end of input, or,
//! when a statement position inside a code frame holds something that can
//! only be a member (`public int x;`, `void m() {`), just before that member.
//! In the last case the body was never closed and the member is handed back to
//! the enclosing type.

use crate::lexer::Token;
use crate::placement::{place, scan_shape, Enclosing, Shape};
use crate::SyntaxKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    TypeBody,
    MethodBody,
    InitializerBody,
    LambdaBody,
    Block,
    /// Body of a local or anonymous class inside code.
    LocalTypeBody,
}

impl FrameKind {
    /// Frames whose direct contents are statements.
    pub fn is_code(self) -> bool {
        !matches!(self, FrameKind::TypeBody | FrameKind::LocalTypeBody)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub kind: FrameKind,
    /// Nesting depth of the frame, starting at 1.
    pub depth: usize,
    /// Token index of the `{` that opened the frame.
    pub open: usize,
}

#[derive(Debug, Clone, Default)]
pub struct RecoveryStack {
    frames: Vec<Frame>,
}

impl RecoveryStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: FrameKind, open: usize) -> &Frame {
        let depth = self.frames.len() + 1;
        self.frames.push(Frame { kind, depth, open });
        &self.frames[depth - 1]
    }

    pub fn pop(&mut self) -> Option<Frame> {
        self.frames.pop()
    }

    pub fn innermost(&self) -> Option<&Frame> {
        self.frames.last()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Whether the innermost frame holds statements.
    pub fn in_code(&self) -> bool {
        self.innermost().map_or(false, |frame| frame.kind.is_code())
    }

    /// Pop every frame, innermost first.
    pub fn unwind(&mut self) -> Vec<Frame> {
        let mut popped = Vec::with_capacity(self.frames.len());
        while let Some(frame) = self.frames.pop() {
            popped.push(frame);
        }
        popped
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkimEnd {
    /// The matching `}` was found at `end`.
    Closed,
    /// The body stops before a member starting at `end`.
    MemberBoundary,
    /// Input ran out; `end` is the token count.
    EndOfInput,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Skim {
    pub end: usize,
    pub how: SkimEnd,
}

/// Find where the body opened by `tokens[open]` (a `{`) ends.
pub fn skim_body(tokens: &[Token], open: usize, kind: FrameKind) -> Skim {
    let mut stack = RecoveryStack::new();
    stack.push(kind, open);

    let mut stmt_start = true;
    let mut type_header = false;
    let mut i = open + 1;

    while let Some(tok) = tokens.get(i) {
        match tok.kind {
            SyntaxKind::Eof => break,
            SyntaxKind::LBrace => {
                let frame = if type_header || opens_anonymous_body(tokens, i) {
                    FrameKind::LocalTypeBody
                } else if i > 0 && tokens[i - 1].kind == SyntaxKind::Arrow {
                    FrameKind::LambdaBody
                } else {
                    FrameKind::Block
                };
                type_header = false;
                stack.push(frame, i);
                stmt_start = true;
            }
            SyntaxKind::RBrace => {
                stack.pop();
                if stack.is_empty() {
                    return Skim {
                        end: i,
                        how: SkimEnd::Closed,
                    };
                }
                stmt_start = true;
            }
            SyntaxKind::Semicolon => {
                stmt_start = true;
                type_header = false;
            }
            kind => {
                if stmt_start && stack.in_code() {
                    let scan = scan_shape(tokens, i);
                    let placement =
                        place(Enclosing::CodeBlock, scan.has_member_modifier, scan.shape);
                    if placement.is_member_level() {
                        let unwound = stack.unwind();
                        tracing::debug!(
                            target: "husk.syntax",
                            at = tok.range.start,
                            frames = unwound.len(),
                            ?placement,
                            "body not closed before a member declaration; unwinding"
                        );
                        return Skim {
                            end: i,
                            how: SkimEnd::MemberBoundary,
                        };
                    }
                    if scan.shape == Shape::TypeHeader {
                        type_header = true;
                    }
                } else if starts_type_header(tokens, i, kind) {
                    type_header = true;
                }
                stmt_start = false;
            }
        }
        i += 1;
    }

    let unwound = stack.unwind();
    tracing::debug!(
        target: "husk.syntax",
        frames = unwound.len(),
        "unterminated body at end of input"
    );
    Skim {
        end: i.min(tokens.len()),
        how: SkimEnd::EndOfInput,
    }
}

fn starts_type_header(tokens: &[Token], i: usize, kind: SyntaxKind) -> bool {
    let after_dot = i > 0 && tokens[i - 1].kind == SyntaxKind::Dot;
    match kind {
        SyntaxKind::ClassKw | SyntaxKind::InterfaceKw | SyntaxKind::EnumKw => !after_dot,
        SyntaxKind::RecordKw => {
            tokens.get(i + 1).map(|t| t.kind) == Some(SyntaxKind::Identifier)
                && tokens.get(i + 2).map(|t| t.kind) == Some(SyntaxKind::LParen)
        }
        _ => false,
    }
}

/// Whether the `{` at `brace` follows `new Type(...)`.
pub(crate) fn opens_anonymous_body(tokens: &[Token], brace: usize) -> bool {
    if brace == 0 || tokens[brace - 1].kind != SyntaxKind::RParen {
        return false;
    }

    // Walk back to the matching `(`.
    let mut depth = 0usize;
    let mut i = brace - 1;
    loop {
        match tokens[i].kind {
            SyntaxKind::RParen => depth += 1,
            SyntaxKind::LParen => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            _ => {}
        }
        if i == 0 {
            return false;
        }
        i -= 1;
    }

    // Then over `Outer.Inner<Args>` back to `new`.
    if i == 0 {
        return false;
    }
    i -= 1;
    if tokens[i].kind == SyntaxKind::Greater || tokens[i].kind == SyntaxKind::RightShift {
        let mut depth: i32 = 0;
        loop {
            match tokens[i].kind {
                SyntaxKind::Greater => depth += 1,
                SyntaxKind::RightShift => depth += 2,
                SyntaxKind::Less => depth -= 1,
                _ => {}
            }
            if depth == 0 || i == 0 {
                break;
            }
            i -= 1;
        }
        if i == 0 {
            return false;
        }
        i -= 1;
    }
    loop {
        if !tokens[i].kind.is_identifier_like() || i == 0 {
            return false;
        }
        if tokens[i - 1].kind == SyntaxKind::Dot && i >= 2 {
            i -= 2;
            continue;
        }
        return tokens[i - 1].kind == SyntaxKind::NewKw;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;

    fn significant(text: &str) -> Vec<Token> {
        lex(text)
            .into_iter()
            .filter(|t| !t.kind.is_trivia())
            .collect()
    }

    fn skim(text: &str) -> (Skim, Vec<Token>) {
        let tokens = significant(text);
        let open = tokens
            .iter()
            .position(|t| t.kind == SyntaxKind::LBrace)
            .expect("body brace");
        (skim_body(&tokens, open, FrameKind::MethodBody), tokens)
    }

    #[test]
    fn stack_tracks_depth_and_code_frames() {
        let mut stack = RecoveryStack::new();
        assert!(!stack.in_code());
        assert_eq!(stack.push(FrameKind::TypeBody, 0).depth, 1);
        assert!(!stack.in_code());
        assert_eq!(stack.push(FrameKind::MethodBody, 4).depth, 2);
        assert!(stack.in_code());
        stack.push(FrameKind::LocalTypeBody, 9);
        assert!(!stack.in_code());
        assert_eq!(stack.depth(), 3);

        let popped = stack.unwind();
        assert_eq!(
            popped.iter().map(|f| f.kind).collect::<Vec<_>>(),
            vec![
                FrameKind::LocalTypeBody,
                FrameKind::MethodBody,
                FrameKind::TypeBody
            ]
        );
        assert!(stack.is_empty());
    }

    #[test]
    fn balanced_body_closes_at_matching_brace() {
        let (result, tokens) = skim("void f() { if (a) { b(); } else { c(); } } int x;");
        assert_eq!(result.how, SkimEnd::Closed);
        assert_eq!(tokens[result.end + 1].kind, SyntaxKind::IntKw);
    }

    #[test]
    fn member_modifier_ends_unclosed_body() {
        let (result, tokens) = skim("void f() { int y = 0; public int x; }");
        assert_eq!(result.how, SkimEnd::MemberBoundary);
        assert_eq!(tokens[result.end].kind, SyntaxKind::PublicKw);
    }

    #[test]
    fn method_header_ends_unclosed_body() {
        let (result, tokens) = skim("void f() { int y; void g() { } }");
        assert_eq!(result.how, SkimEnd::MemberBoundary);
        assert_eq!(tokens[result.end].kind, SyntaxKind::VoidKw);
    }

    #[test]
    fn members_of_local_and_anonymous_classes_stay_inside() {
        let (result, _) = skim("void f() { class L { public int x; } g(); }");
        assert_eq!(result.how, SkimEnd::Closed);

        let (result, _) =
            skim("void f() { Runnable r = new Runnable() { public void run() { } }; }");
        assert_eq!(result.how, SkimEnd::Closed);

        let (result, _) = skim("void f() { Object o = new java.util.ArrayList<String>() { private int n; }; }");
        assert_eq!(result.how, SkimEnd::Closed);
    }

    #[test]
    fn class_literals_do_not_open_type_bodies() {
        let (result, tokens) = skim("void f() { Class<?> c = X.class; { int a; } public int z; }");
        assert_eq!(result.how, SkimEnd::MemberBoundary);
        assert_eq!(tokens[result.end].kind, SyntaxKind::PublicKw);
    }

    #[test]
    fn end_of_input_pops_every_frame() {
        let (result, tokens) = skim("void f() { while (x) { y();");
        assert_eq!(result.how, SkimEnd::EndOfInput);
        assert_eq!(tokens[result.end].kind, SyntaxKind::Eof);
    }
}
