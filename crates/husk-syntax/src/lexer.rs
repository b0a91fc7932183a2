use husk_core::Span;

use crate::SyntaxKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: SyntaxKind,
    pub range: Span,
}

impl Token {
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.range.start..self.range.end]
    }
}

/// A problem found while tokenizing. The offending text is still covered by a
/// token, so lexing never stops early.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub message: String,
    pub range: Span,
}

/// Tokenize `text`, including trivia. The last token is always `Eof`.
pub fn lex(text: &str) -> Vec<Token> {
    lex_with_errors(text).0
}

pub fn lex_with_errors(text: &str) -> (Vec<Token>, Vec<LexError>) {
    let mut lexer = Lexer::new(text, 0);
    let mut tokens: Vec<Token> = lexer.by_ref().collect();
    tokens.push(Token {
        kind: SyntaxKind::Eof,
        range: Span::point(text.len()),
    });
    (tokens, lexer.errors)
}

/// Tokenize `source[span]`, reporting ranges relative to the whole source.
/// Trivia is dropped and no `Eof` token is appended.
pub(crate) fn lex_significant(source: &str, span: Span) -> (Vec<Token>, Vec<LexError>) {
    let mut lexer = Lexer::new(&source[span.start..span.end], span.start);
    let tokens = lexer
        .by_ref()
        .filter(|token| !token.kind.is_trivia())
        .collect();
    (tokens, lexer.errors)
}

pub struct Lexer<'a> {
    text: &'a str,
    offset: usize,
    pos: usize,
    errors: Vec<LexError>,
}

impl<'a> Lexer<'a> {
    pub fn new(text: &'a str, offset: usize) -> Self {
        Lexer {
            text,
            offset,
            pos: 0,
            errors: Vec::new(),
        }
    }

    pub fn errors(&self) -> &[LexError] {
        &self.errors
    }

    fn remaining(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn peek_char(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn peek_nth_char(&self, n: usize) -> Option<char> {
        self.remaining().chars().nth(n)
    }

    fn bump_char(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn bump_while(&mut self, pred: impl Fn(char) -> bool) {
        while matches!(self.peek_char(), Some(c) if pred(c)) {
            self.bump_char();
        }
    }

    fn make_range(&self, start_pos: usize) -> Span {
        Span::new(self.offset + start_pos, self.offset + self.pos)
    }

    fn error(&mut self, message: &str, start_pos: usize) {
        let range = self.make_range(start_pos);
        self.errors.push(LexError {
            message: message.to_string(),
            range,
        });
    }

    fn lex_line_comment(&mut self) -> SyntaxKind {
        self.bump_while(|c| c != '\n' && c != '\r');
        SyntaxKind::LineComment
    }

    fn lex_block_comment(&mut self, start: usize) -> SyntaxKind {
        // `/**/` is an ordinary block comment.
        let kind = if self.remaining().starts_with("/**") && !self.remaining().starts_with("/**/")
        {
            SyntaxKind::DocComment
        } else {
            SyntaxKind::BlockComment
        };
        self.pos += 2;
        match self.remaining().find("*/") {
            Some(end) => self.pos += end + 2,
            None => {
                self.pos = self.text.len();
                self.error("unterminated block comment", start);
            }
        }
        kind
    }

    fn lex_identifier(&mut self, start: usize) -> SyntaxKind {
        self.bump_while(is_ident_continue);
        let text = &self.text[start..self.pos];
        if text == "non" && self.remaining().starts_with("-sealed") {
            let after = self.remaining()[7..].chars().next();
            if !after.map_or(false, is_ident_continue) {
                self.pos += 7;
                return SyntaxKind::NonSealedKw;
            }
        }
        SyntaxKind::from_keyword(text).unwrap_or(SyntaxKind::Identifier)
    }

    fn lex_number(&mut self) -> SyntaxKind {
        let rem = self.remaining();
        if rem.starts_with("0x") || rem.starts_with("0X") {
            self.pos += 2;
            self.bump_while(|c| c.is_ascii_hexdigit() || c == '_');
            let mut floating = false;
            if self.peek_char() == Some('.') {
                floating = true;
                self.bump_char();
                self.bump_while(|c| c.is_ascii_hexdigit() || c == '_');
            }
            if matches!(self.peek_char(), Some('p' | 'P')) {
                floating = true;
                self.lex_exponent();
            }
            return self.number_suffix(floating);
        }
        if rem.starts_with("0b") || rem.starts_with("0B") {
            self.pos += 2;
            self.bump_while(|c| c == '0' || c == '1' || c == '_');
            return self.number_suffix(false);
        }

        let mut floating = false;
        self.bump_while(|c| c.is_ascii_digit() || c == '_');
        if self.peek_char() == Some('.') {
            let next = self.peek_nth_char(1);
            let fraction = next.map_or(false, |c| c.is_ascii_digit());
            let bare_dot = !next.map_or(false, |c| c == '.' || is_ident_start(c));
            if fraction || bare_dot {
                floating = true;
                self.bump_char();
                self.bump_while(|c| c.is_ascii_digit() || c == '_');
            }
        }
        if matches!(self.peek_char(), Some('e' | 'E')) {
            floating = true;
            self.lex_exponent();
        }
        self.number_suffix(floating)
    }

    fn lex_exponent(&mut self) {
        self.bump_char();
        if matches!(self.peek_char(), Some('+' | '-')) {
            self.bump_char();
        }
        self.bump_while(|c| c.is_ascii_digit() || c == '_');
    }

    fn number_suffix(&mut self, floating: bool) -> SyntaxKind {
        match self.peek_char() {
            Some('l' | 'L') if !floating => {
                self.bump_char();
                SyntaxKind::LongLiteral
            }
            Some('f' | 'F') => {
                self.bump_char();
                SyntaxKind::FloatLiteral
            }
            Some('d' | 'D') => {
                self.bump_char();
                SyntaxKind::DoubleLiteral
            }
            _ if floating => SyntaxKind::DoubleLiteral,
            _ => SyntaxKind::IntLiteral,
        }
    }

    /// Lex a `'...'` or `"..."` literal whose opening quote was consumed.
    /// Such literals may not span lines.
    fn lex_quoted(&mut self, start: usize, quote: char, kind: SyntaxKind) -> SyntaxKind {
        loop {
            match self.peek_char() {
                None | Some('\n' | '\r') => {
                    let message = if quote == '"' {
                        "unterminated string literal"
                    } else {
                        "unterminated character literal"
                    };
                    self.error(message, start);
                    return SyntaxKind::Error;
                }
                Some('\\') => {
                    self.bump_char();
                    if !matches!(self.peek_char(), None | Some('\n' | '\r')) {
                        self.bump_char();
                    }
                }
                Some(c) => {
                    self.bump_char();
                    if c == quote {
                        return kind;
                    }
                }
            }
        }
    }

    fn lex_text_block(&mut self, start: usize) -> SyntaxKind {
        self.pos += 3;
        loop {
            let rem = self.remaining();
            if rem.is_empty() {
                self.error("unterminated text block", start);
                return SyntaxKind::Error;
            }
            if rem.starts_with("\"\"\"") {
                self.pos += 3;
                return SyntaxKind::TextBlock;
            }
            if rem.starts_with('\\') {
                self.bump_char();
            }
            self.bump_char();
        }
    }

    fn lex_operator(&mut self) -> Option<SyntaxKind> {
        const OPERATORS: &[(&str, SyntaxKind)] = &[
            (">>>=", SyntaxKind::UnsignedRightShiftEq),
            (">>>", SyntaxKind::UnsignedRightShift),
            ("<<=", SyntaxKind::LeftShiftEq),
            (">>=", SyntaxKind::RightShiftEq),
            ("...", SyntaxKind::Ellipsis),
            ("::", SyntaxKind::DoubleColon),
            ("->", SyntaxKind::Arrow),
            ("==", SyntaxKind::EqEq),
            ("!=", SyntaxKind::BangEq),
            ("<=", SyntaxKind::LessEq),
            (">=", SyntaxKind::GreaterEq),
            ("&&", SyntaxKind::AmpAmp),
            ("||", SyntaxKind::PipePipe),
            ("&=", SyntaxKind::AmpEq),
            ("|=", SyntaxKind::PipeEq),
            ("^=", SyntaxKind::CaretEq),
            ("++", SyntaxKind::PlusPlus),
            ("--", SyntaxKind::MinusMinus),
            ("+=", SyntaxKind::PlusEq),
            ("-=", SyntaxKind::MinusEq),
            ("*=", SyntaxKind::StarEq),
            ("/=", SyntaxKind::SlashEq),
            ("%=", SyntaxKind::PercentEq),
            ("<<", SyntaxKind::LeftShift),
            (">>", SyntaxKind::RightShift),
            ("(", SyntaxKind::LParen),
            (")", SyntaxKind::RParen),
            ("{", SyntaxKind::LBrace),
            ("}", SyntaxKind::RBrace),
            ("[", SyntaxKind::LBracket),
            ("]", SyntaxKind::RBracket),
            (";", SyntaxKind::Semicolon),
            (",", SyntaxKind::Comma),
            (".", SyntaxKind::Dot),
            ("@", SyntaxKind::At),
            ("?", SyntaxKind::Question),
            (":", SyntaxKind::Colon),
            ("+", SyntaxKind::Plus),
            ("-", SyntaxKind::Minus),
            ("*", SyntaxKind::Star),
            ("/", SyntaxKind::Slash),
            ("%", SyntaxKind::Percent),
            ("~", SyntaxKind::Tilde),
            ("!", SyntaxKind::Bang),
            ("=", SyntaxKind::Eq),
            ("<", SyntaxKind::Less),
            (">", SyntaxKind::Greater),
            ("&", SyntaxKind::Amp),
            ("|", SyntaxKind::Pipe),
            ("^", SyntaxKind::Caret),
        ];

        let rem = self.remaining();
        let (text, kind) = OPERATORS.iter().find(|(text, _)| rem.starts_with(text))?;
        self.pos += text.len();
        Some(*kind)
    }

    fn next_token(&mut self) -> Option<Token> {
        let start = self.pos;
        let ch = self.peek_char()?;
        let rem = self.remaining();

        let kind = if ch.is_whitespace() {
            self.bump_while(char::is_whitespace);
            SyntaxKind::Whitespace
        } else if rem.starts_with("//") {
            self.lex_line_comment()
        } else if rem.starts_with("/*") {
            self.lex_block_comment(start)
        } else if rem.starts_with("\"\"\"") {
            self.lex_text_block(start)
        } else if ch == '"' {
            self.bump_char();
            self.lex_quoted(start, '"', SyntaxKind::StringLiteral)
        } else if ch == '\'' {
            self.bump_char();
            self.lex_quoted(start, '\'', SyntaxKind::CharLiteral)
        } else if ch.is_ascii_digit()
            || (ch == '.' && self.peek_nth_char(1).map_or(false, |c| c.is_ascii_digit()))
        {
            self.lex_number()
        } else if is_ident_start(ch) {
            self.bump_char();
            self.lex_identifier(start)
        } else if let Some(kind) = self.lex_operator() {
            kind
        } else {
            self.bump_char();
            self.error("unexpected character", start);
            SyntaxKind::Error
        };

        Some(Token {
            kind,
            range: self.make_range(start),
        })
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token()
    }
}

fn is_ident_start(c: char) -> bool {
    c == '_' || c == '$' || unicode_ident::is_xid_start(c)
}

fn is_ident_continue(c: char) -> bool {
    c == '$' || unicode_ident::is_xid_continue(c)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(text: &str) -> Vec<SyntaxKind> {
        lex(text)
            .into_iter()
            .map(|t| t.kind)
            .filter(|k| !k.is_trivia())
            .collect()
    }

    #[test]
    fn keywords_identifiers_and_operators() {
        assert_eq!(
            kinds("public class Foo<T> { x >>>= y->z; }"),
            vec![
                SyntaxKind::PublicKw,
                SyntaxKind::ClassKw,
                SyntaxKind::Identifier,
                SyntaxKind::Less,
                SyntaxKind::Identifier,
                SyntaxKind::Greater,
                SyntaxKind::LBrace,
                SyntaxKind::Identifier,
                SyntaxKind::UnsignedRightShiftEq,
                SyntaxKind::Identifier,
                SyntaxKind::Arrow,
                SyntaxKind::Identifier,
                SyntaxKind::Semicolon,
                SyntaxKind::RBrace,
                SyntaxKind::Eof,
            ]
        );
    }

    #[test]
    fn numeric_literals() {
        assert_eq!(
            kinds("1 2L 0x1F 0b101 1.5 1e3 2f 3d .5 1."),
            vec![
                SyntaxKind::IntLiteral,
                SyntaxKind::LongLiteral,
                SyntaxKind::IntLiteral,
                SyntaxKind::IntLiteral,
                SyntaxKind::DoubleLiteral,
                SyntaxKind::DoubleLiteral,
                SyntaxKind::FloatLiteral,
                SyntaxKind::DoubleLiteral,
                SyntaxKind::DoubleLiteral,
                SyntaxKind::DoubleLiteral,
                SyntaxKind::Eof,
            ]
        );
    }

    #[test]
    fn member_access_on_int_literal_is_not_a_fraction() {
        assert_eq!(
            kinds("1..2"),
            vec![
                SyntaxKind::IntLiteral,
                SyntaxKind::Dot,
                SyntaxKind::DoubleLiteral,
                SyntaxKind::Eof
            ]
        );
    }

    #[test]
    fn unterminated_string_stops_at_line_end() {
        let text = "String s = \"abc\nint x;";
        let (tokens, errors) = lex_with_errors(text);
        let error = tokens
            .iter()
            .find(|t| t.kind == SyntaxKind::Error)
            .expect("error token");
        assert_eq!(error.text(text), "\"abc");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "unterminated string literal");
        assert!(tokens.iter().any(|t| t.kind == SyntaxKind::IntKw));
    }

    #[test]
    fn unterminated_block_comment_runs_to_eof() {
        let (tokens, errors) = lex_with_errors("int /* oops");
        assert_eq!(tokens[2].kind, SyntaxKind::BlockComment);
        assert_eq!(errors[0].message, "unterminated block comment");
    }

    #[test]
    fn doc_comments_and_text_blocks() {
        let text = "/** doc */ /**/ \"\"\"\n  hi \"\"\"";
        let kinds: Vec<_> = lex(text).into_iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                SyntaxKind::DocComment,
                SyntaxKind::Whitespace,
                SyntaxKind::BlockComment,
                SyntaxKind::Whitespace,
                SyntaxKind::TextBlock,
                SyntaxKind::Eof,
            ]
        );
    }

    #[test]
    fn non_sealed_and_unicode_identifiers() {
        assert_eq!(
            kinds("non-sealed class Ünï $x non - y"),
            vec![
                SyntaxKind::NonSealedKw,
                SyntaxKind::ClassKw,
                SyntaxKind::Identifier,
                SyntaxKind::Identifier,
                SyntaxKind::Identifier,
                SyntaxKind::Minus,
                SyntaxKind::Identifier,
                SyntaxKind::Eof,
            ]
        );
    }

    #[test]
    fn significant_tokens_keep_absolute_offsets() {
        let source = "class X { void f() { a(); } }";
        let (tokens, errors) = lex_significant(source, Span::new(20, 26));
        assert!(errors.is_empty());
        assert_eq!(tokens[0].range, Span::new(21, 22));
        assert_eq!(tokens[0].text(source), "a");
        assert_eq!(tokens.len(), 4);
    }
}
