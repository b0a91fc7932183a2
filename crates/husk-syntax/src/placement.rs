//! Where a declaration-like construct belongs.
//!
//! Whether `int x;` is a field or a local variable, and whether `foo() {` is a
//! constructor or a stray call, depends only on the kind of region the
//! construct was found in, on whether it carries a member-only modifier, and on
//! its syntactic shape. [`place`] is that decision as a pure function;
//! [`scan_shape`] computes the shape from a token slice without consuming it.

use crate::lexer::Token;
use crate::SyntaxKind;

/// The kind of region a construct starts in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enclosing {
    CompilationUnit,
    TypeBody,
    /// A method, constructor, initializer, lambda or nested block body.
    CodeBlock,
}

/// Syntactic shape of a construct, ignoring its leading modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// `class X`, `interface X`, `enum X`, `record X(`, `@interface X`.
    TypeHeader,
    /// `Type name(`, `void name(`, `<T> ...`.
    MethodHeader,
    /// `Name(Type a, ...)`, or `Name(...)` followed by `{` or `throws`.
    ConstructorHeader,
    /// `name(args)` that cannot be a declaration: a message send.
    Invocation,
    /// `Type name`.
    VariableDecl,
    Statement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// A top-level or member type.
    TypeDeclaration,
    Field,
    Method,
    Constructor,
    LocalType,
    LocalVariable,
    Statement,
    /// Nothing valid can be built here; the construct is skipped.
    Discard,
}

impl Placement {
    /// Placements that belong to a type body. Inside a code block they mean the
    /// block was never closed and the construct must be handed back to the
    /// enclosing type.
    pub fn is_member_level(self) -> bool {
        matches!(
            self,
            Placement::TypeDeclaration
                | Placement::Field
                | Placement::Method
                | Placement::Constructor
                | Placement::Discard
        )
    }
}

pub fn place(enclosing: Enclosing, has_member_modifier: bool, shape: Shape) -> Placement {
    match enclosing {
        Enclosing::CompilationUnit => match shape {
            Shape::TypeHeader => Placement::TypeDeclaration,
            _ => Placement::Discard,
        },
        Enclosing::TypeBody => match shape {
            Shape::TypeHeader => Placement::TypeDeclaration,
            Shape::MethodHeader => Placement::Method,
            Shape::ConstructorHeader => Placement::Constructor,
            Shape::VariableDecl => Placement::Field,
            Shape::Invocation | Shape::Statement => Placement::Discard,
        },
        Enclosing::CodeBlock => match (shape, has_member_modifier) {
            (Shape::TypeHeader, true) => Placement::TypeDeclaration,
            (Shape::TypeHeader, false) => Placement::LocalType,
            (Shape::MethodHeader, _) => Placement::Method,
            (Shape::ConstructorHeader, _) => Placement::Constructor,
            (Shape::VariableDecl, true) => Placement::Field,
            (Shape::VariableDecl, false) => Placement::LocalVariable,
            (Shape::Invocation | Shape::Statement, true) => Placement::Discard,
            (Shape::Invocation | Shape::Statement, false) => Placement::Statement,
        },
    }
}

/// Modifiers that can only appear on members, never on locals.
pub fn is_member_modifier(kind: SyntaxKind) -> bool {
    matches!(
        kind,
        SyntaxKind::PublicKw
            | SyntaxKind::PrivateKw
            | SyntaxKind::ProtectedKw
            | SyntaxKind::StaticKw
            | SyntaxKind::NativeKw
            | SyntaxKind::TransientKw
            | SyntaxKind::VolatileKw
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShapeScan {
    pub shape: Shape,
    pub has_member_modifier: bool,
    /// Index of the first token after the modifiers.
    pub after_modifiers: usize,
}

fn kind_at(tokens: &[Token], idx: usize) -> SyntaxKind {
    tokens.get(idx).map_or(SyntaxKind::Eof, |t| t.kind)
}

/// Classify the construct starting at `start`.
pub fn scan_shape(tokens: &[Token], start: usize) -> ShapeScan {
    let mut i = start;
    let mut has_member_modifier = false;

    loop {
        let kind = kind_at(tokens, i);
        match kind {
            // `synchronized (lock) { ... }` and `default:` are statements.
            SyntaxKind::SynchronizedKw if kind_at(tokens, i + 1) == SyntaxKind::LParen => break,
            SyntaxKind::DefaultKw
                if matches!(kind_at(tokens, i + 1), SyntaxKind::Colon | SyntaxKind::Arrow) =>
            {
                break
            }
            // Contextual: `sealed` may just be a variable name.
            SyntaxKind::SealedKw | SyntaxKind::NonSealedKw => {
                let next = kind_at(tokens, i + 1);
                if next.is_modifier()
                    || matches!(next, SyntaxKind::ClassKw | SyntaxKind::InterfaceKw)
                {
                    i += 1;
                } else {
                    break;
                }
            }
            _ if is_member_modifier(kind) => {
                has_member_modifier = true;
                i += 1;
            }
            _ if kind.is_modifier() => i += 1,
            SyntaxKind::At if kind_at(tokens, i + 1) != SyntaxKind::InterfaceKw => {
                match skip_annotation(tokens, i) {
                    Some(next) => i = next,
                    None => break,
                }
            }
            _ => break,
        }
    }

    let shape = shape_after_modifiers(tokens, i);
    ShapeScan {
        shape,
        has_member_modifier,
        after_modifiers: i,
    }
}

fn shape_after_modifiers(tokens: &[Token], i: usize) -> Shape {
    let kind = kind_at(tokens, i);
    match kind {
        SyntaxKind::ClassKw | SyntaxKind::InterfaceKw | SyntaxKind::EnumKw => Shape::TypeHeader,
        SyntaxKind::At => Shape::TypeHeader,
        SyntaxKind::RecordKw
            if kind_at(tokens, i + 1) == SyntaxKind::Identifier
                && matches!(kind_at(tokens, i + 2), SyntaxKind::LParen | SyntaxKind::Less) =>
        {
            Shape::TypeHeader
        }
        SyntaxKind::Less => Shape::MethodHeader,
        SyntaxKind::VoidKw => Shape::MethodHeader,
        _ if kind.is_identifier_like() && kind_at(tokens, i + 1) == SyntaxKind::LParen => {
            classify_call(tokens, i + 1)
        }
        _ => match scan_type(tokens, i) {
            Some(after) if kind_at(tokens, after).is_identifier_like() => {
                if kind_at(tokens, after + 1) == SyntaxKind::LParen {
                    Shape::MethodHeader
                } else {
                    Shape::VariableDecl
                }
            }
            _ => Shape::Statement,
        },
    }
}

/// Decide whether `name(...)` (with `(` at `lparen`) declares something.
fn classify_call(tokens: &[Token], lparen: usize) -> Shape {
    let close = matching_paren(tokens, lparen);
    let content_end = close.unwrap_or_else(|| unterminated_paren_end(tokens, lparen));
    let params = param_list_shape(tokens, lparen + 1, content_end, close.is_none());

    match (close, params) {
        (_, ParamsShape::NotParams) => Shape::Invocation,
        (None, ParamsShape::Declarations) => Shape::ConstructorHeader,
        (None, ParamsShape::Empty) => Shape::Invocation,
        (Some(close), ParamsShape::Empty) => {
            if matches!(
                kind_at(tokens, close + 1),
                SyntaxKind::LBrace | SyntaxKind::ThrowsKw
            ) {
                Shape::ConstructorHeader
            } else {
                Shape::Invocation
            }
        }
        (Some(_), ParamsShape::Declarations) => Shape::ConstructorHeader,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParamsShape {
    Empty,
    Declarations,
    NotParams,
}

/// Check that `tokens[start..end]` reads as `[mods] Type name, ...`. When
/// `partial` is set the last entry may be cut short.
fn param_list_shape(tokens: &[Token], start: usize, end: usize, partial: bool) -> ParamsShape {
    if start >= end {
        return ParamsShape::Empty;
    }

    let mut i = start;
    loop {
        while i < end {
            match kind_at(tokens, i) {
                SyntaxKind::FinalKw => i += 1,
                SyntaxKind::At => match skip_annotation(tokens, i) {
                    Some(next) => i = next,
                    None => return ParamsShape::NotParams,
                },
                _ => break,
            }
        }

        let Some(mut j) = scan_type(tokens, i).filter(|&j| j <= end) else {
            return if partial && i >= end {
                ParamsShape::Declarations
            } else {
                ParamsShape::NotParams
            };
        };
        if j == end && partial {
            return ParamsShape::Declarations;
        }
        if kind_at(tokens, j) == SyntaxKind::Ellipsis {
            j += 1;
        }
        if j >= end || !kind_at(tokens, j).is_identifier_like() {
            return if partial && j >= end {
                ParamsShape::Declarations
            } else {
                ParamsShape::NotParams
            };
        }
        j += 1;
        while kind_at(tokens, j) == SyntaxKind::LBracket
            && kind_at(tokens, j + 1) == SyntaxKind::RBracket
        {
            j += 2;
        }

        if j >= end {
            return ParamsShape::Declarations;
        }
        if kind_at(tokens, j) != SyntaxKind::Comma {
            return ParamsShape::NotParams;
        }
        i = j + 1;
        if i >= end {
            return if partial {
                ParamsShape::Declarations
            } else {
                ParamsShape::NotParams
            };
        }
    }
}

/// Index of the `)` matching the `(` at `lparen`. Gives up at a token that
/// cannot appear inside a parameter or argument list.
pub(crate) fn matching_paren(tokens: &[Token], lparen: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = lparen;
    while let Some(tok) = tokens.get(i) {
        match tok.kind {
            SyntaxKind::LParen => depth += 1,
            SyntaxKind::RParen => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            SyntaxKind::Semicolon | SyntaxKind::RBrace => return None,
            SyntaxKind::LBrace if depth == 1 => return None,
            _ => {}
        }
        i += 1;
    }
    None
}

fn unterminated_paren_end(tokens: &[Token], lparen: usize) -> usize {
    let mut i = lparen + 1;
    while let Some(tok) = tokens.get(i) {
        if matches!(
            tok.kind,
            SyntaxKind::Semicolon | SyntaxKind::RBrace | SyntaxKind::LBrace | SyntaxKind::Eof
        ) {
            break;
        }
        i += 1;
    }
    i
}

/// Skip `@Name(.Name)*` and an optional balanced argument list.
pub(crate) fn skip_annotation(tokens: &[Token], at: usize) -> Option<usize> {
    let mut i = at + 1;
    if !kind_at(tokens, i).is_identifier_like() {
        return None;
    }
    i += 1;
    while kind_at(tokens, i) == SyntaxKind::Dot && kind_at(tokens, i + 1).is_identifier_like() {
        i += 2;
    }
    if kind_at(tokens, i) == SyntaxKind::LParen {
        let mut depth = 0usize;
        while let Some(tok) = tokens.get(i) {
            match tok.kind {
                SyntaxKind::LParen => depth += 1,
                SyntaxKind::RParen => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(i + 1);
                    }
                }
                SyntaxKind::Semicolon | SyntaxKind::Eof => return None,
                _ => {}
            }
            i += 1;
        }
        return None;
    }
    Some(i)
}

/// If a type starts at `start`, return the index just past it (including
/// array dimensions).
pub(crate) fn scan_type(tokens: &[Token], start: usize) -> Option<usize> {
    let kind = kind_at(tokens, start);
    let mut i = start + 1;
    if kind.is_identifier_like() {
        if kind_at(tokens, i) == SyntaxKind::Less {
            i = skip_type_arguments(tokens, i)?;
        }
        while kind_at(tokens, i) == SyntaxKind::Dot && kind_at(tokens, i + 1).is_identifier_like()
        {
            i += 2;
            if kind_at(tokens, i) == SyntaxKind::Less {
                i = skip_type_arguments(tokens, i)?;
            }
        }
    } else if !kind.is_primitive_type() {
        return None;
    }
    while kind_at(tokens, i) == SyntaxKind::LBracket && kind_at(tokens, i + 1) == SyntaxKind::RBracket
    {
        i += 2;
    }
    Some(i)
}

/// Skip `<...>` starting at `at`, accepting only tokens that can appear in
/// type arguments.
pub(crate) fn skip_type_arguments(tokens: &[Token], at: usize) -> Option<usize> {
    let mut depth: i32 = 0;
    let mut i = at;
    while let Some(tok) = tokens.get(i) {
        match tok.kind {
            SyntaxKind::Less => depth += 1,
            SyntaxKind::Greater => depth -= 1,
            SyntaxKind::RightShift => depth -= 2,
            SyntaxKind::UnsignedRightShift => depth -= 3,
            SyntaxKind::Comma
            | SyntaxKind::Dot
            | SyntaxKind::Question
            | SyntaxKind::ExtendsKw
            | SyntaxKind::SuperKw
            | SyntaxKind::Amp
            | SyntaxKind::LBracket
            | SyntaxKind::RBracket
            | SyntaxKind::At => {}
            kind if kind.is_identifier_like() || kind.is_primitive_type() => {}
            _ => return None,
        }
        i += 1;
        if depth <= 0 {
            return (depth == 0).then_some(i);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;

    fn shape(text: &str) -> ShapeScan {
        let tokens: Vec<Token> = lex(text)
            .into_iter()
            .filter(|t| !t.kind.is_trivia())
            .collect();
        scan_shape(&tokens, 0)
    }

    #[test]
    fn modifiers_decide_between_field_and_local() {
        assert_eq!(
            place(Enclosing::CodeBlock, false, Shape::VariableDecl),
            Placement::LocalVariable
        );
        assert_eq!(
            place(Enclosing::CodeBlock, true, Shape::VariableDecl),
            Placement::Field
        );
        assert_eq!(
            place(Enclosing::TypeBody, false, Shape::VariableDecl),
            Placement::Field
        );
    }

    #[test]
    fn dangling_members_are_discarded_at_top_level() {
        for shape in [
            Shape::MethodHeader,
            Shape::ConstructorHeader,
            Shape::VariableDecl,
            Shape::Invocation,
            Shape::Statement,
        ] {
            assert_eq!(
                place(Enclosing::CompilationUnit, true, shape),
                Placement::Discard
            );
        }
        assert_eq!(
            place(Enclosing::CompilationUnit, false, Shape::TypeHeader),
            Placement::TypeDeclaration
        );
    }

    #[test]
    fn method_headers_end_code_blocks() {
        let placement = place(Enclosing::CodeBlock, false, Shape::MethodHeader);
        assert!(placement.is_member_level());
        assert!(!place(Enclosing::CodeBlock, false, Shape::TypeHeader).is_member_level());
        assert!(place(Enclosing::CodeBlock, true, Shape::TypeHeader).is_member_level());
        assert!(!place(Enclosing::CodeBlock, false, Shape::Statement).is_member_level());
    }

    #[test]
    fn message_sends_are_never_members() {
        assert_eq!(
            place(Enclosing::TypeBody, false, Shape::Invocation),
            Placement::Discard
        );
        assert_eq!(
            place(Enclosing::CodeBlock, false, Shape::Invocation),
            Placement::Statement
        );
    }

    #[test]
    fn scans_declaration_shapes() {
        let scan = shape("public static int x = 1;");
        assert_eq!(scan.shape, Shape::VariableDecl);
        assert!(scan.has_member_modifier);
        assert_eq!(scan.after_modifiers, 2);

        assert_eq!(shape("final List<String> xs;").shape, Shape::VariableDecl);
        assert!(!shape("final List<String> xs;").has_member_modifier);
        assert_eq!(shape("Map<K, List<V>> m() {").shape, Shape::MethodHeader);
        assert_eq!(shape("void run()").shape, Shape::MethodHeader);
        assert_eq!(shape("<T> T id(T t)").shape, Shape::MethodHeader);
        assert_eq!(shape("@Deprecated class A {}").shape, Shape::TypeHeader);
        assert_eq!(shape("record P(int x) {}").shape, Shape::TypeHeader);
        assert_eq!(shape("int[] a;").shape, Shape::VariableDecl);
    }

    #[test]
    fn scans_statement_shapes() {
        assert_eq!(shape("a.b.c = 5;").shape, Shape::Statement);
        assert_eq!(shape("foo.bar();").shape, Shape::Statement);
        assert_eq!(shape("a[i] = 3;").shape, Shape::Statement);
        assert_eq!(shape("i < n;").shape, Shape::Statement);
        assert_eq!(shape("synchronized (this) {}").shape, Shape::Statement);
        assert_eq!(shape("return x;").shape, Shape::Statement);
        assert_eq!(shape("record = 3;").shape, Shape::Statement);
    }

    #[test]
    fn distinguishes_constructors_from_message_sends() {
        assert_eq!(shape("X() {").shape, Shape::ConstructorHeader);
        assert_eq!(shape("X() throws E {").shape, Shape::ConstructorHeader);
        assert_eq!(shape("X(int a, String[] b)").shape, Shape::ConstructorHeader);
        assert_eq!(shape("X(final int a, String... b) {").shape, Shape::ConstructorHeader);
        assert_eq!(shape("X(int a,").shape, Shape::ConstructorHeader);
        assert_eq!(shape("foo();").shape, Shape::Invocation);
        assert_eq!(shape("foo(1, 2) {").shape, Shape::Invocation);
        assert_eq!(shape("foo(a);").shape, Shape::Invocation);
        assert_eq!(shape("foo(a.b());").shape, Shape::Invocation);
    }
}
