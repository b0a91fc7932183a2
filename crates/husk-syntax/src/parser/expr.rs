use super::Parser;
use crate::ast::*;
use crate::placement::{matching_paren, scan_type};
use crate::printer;
use crate::recovery::FrameKind;
use crate::{CompletionKind, SyntaxKind};

const INSTANCEOF_BP: u8 = 50;

impl Parser<'_> {
    pub(crate) fn parse_expression(&mut self, min_bp: u8) -> Expr {
        let mut lhs = self.parse_unary();

        loop {
            let op = self.current();

            if op == SyntaxKind::InstanceofKw {
                if INSTANCEOF_BP < min_bp {
                    break;
                }
                self.bump();
                self.eat(SyntaxKind::FinalKw);
                let Some(ty) = self.parse_type() else {
                    self.error_here("expected type after `instanceof`");
                    break;
                };
                let binding = if self.at_ident_like() {
                    let tok = self.bump();
                    Some(self.text(tok).to_string())
                } else {
                    None
                };
                lhs = Expr::InstanceOf {
                    expr: Box::new(lhs),
                    ty,
                    binding,
                };
                continue;
            }

            // Conditional.
            if op == SyntaxKind::Question {
                let (l_bp, r_bp) = (2, 1);
                if l_bp < min_bp {
                    break;
                }
                self.bump();
                let then_expr = self.parse_expression(0);
                self.expect(SyntaxKind::Colon, "expected `:` in conditional expression");
                let else_expr = self.parse_expression(r_bp);
                lhs = Expr::Conditional {
                    cond: Box::new(lhs),
                    then_expr: Box::new(then_expr),
                    else_expr: Box::new(else_expr),
                };
                continue;
            }

            if let Some((l_bp, r_bp)) = infix_binding_power(op) {
                if l_bp < min_bp {
                    break;
                }
                let tok = self.bump();
                let op_text = self.text(tok).to_string();
                let rhs = self.parse_expression(r_bp);
                lhs = if op.is_assignment_operator() {
                    Expr::Assign {
                        op: op_text,
                        target: Box::new(lhs),
                        value: Box::new(rhs),
                    }
                } else {
                    Expr::Binary {
                        op: op_text,
                        lhs: Box::new(lhs),
                        rhs: Box::new(rhs),
                    }
                };
                continue;
            }

            break;
        }

        lhs
    }

    fn parse_unary(&mut self) -> Expr {
        match self.current() {
            SyntaxKind::Plus
            | SyntaxKind::Minus
            | SyntaxKind::Bang
            | SyntaxKind::Tilde
            | SyntaxKind::PlusPlus
            | SyntaxKind::MinusMinus => {
                let tok = self.bump();
                let op = self.text(tok).to_string();
                let operand = self.parse_unary();
                Expr::Unary {
                    op,
                    operand: Box::new(operand),
                    postfix: false,
                }
            }
            _ => {
                let primary = self.parse_primary();
                self.parse_postfix(primary)
            }
        }
    }

    fn parse_primary(&mut self) -> Expr {
        let kind = self.current();
        match kind {
            _ if kind.is_literal() => {
                let tok = self.bump();
                Expr::Literal(self.text(tok).to_string())
            }
            SyntaxKind::Error => {
                let tok = self.bump();
                let text = self.text(tok);
                if text.starts_with('"') || text.starts_with('\'') {
                    self.poisoned = true;
                    Expr::Literal(text.to_string())
                } else {
                    self.errors.push(crate::ParseError {
                        message: "unexpected character".to_string(),
                        range: tok.range,
                    });
                    Expr::Error
                }
            }
            SyntaxKind::ThisKw => {
                self.bump();
                Expr::This
            }
            SyntaxKind::SuperKw => {
                self.bump();
                Expr::Super
            }
            SyntaxKind::NewKw => self.parse_new(),
            SyntaxKind::SwitchKw => Expr::Switch(Box::new(self.parse_switch())),
            SyntaxKind::LParen => {
                if self.is_lambda_paren() {
                    self.parse_lambda()
                } else if self.is_cast_expression() {
                    self.bump();
                    let ty = self.parse_type();
                    self.expect(SyntaxKind::RParen, "expected `)` in cast");
                    let operand = self.parse_unary();
                    match ty {
                        Some(ty) => Expr::Cast {
                            ty,
                            expr: Box::new(operand),
                        },
                        None => operand,
                    }
                } else {
                    self.bump();
                    let inner = self.parse_expression(0);
                    self.expect(SyntaxKind::RParen, "expected `)`");
                    Expr::Paren(Box::new(inner))
                }
            }
            SyntaxKind::VoidKw => {
                let tok = self.bump();
                let ty = TypeRef::Primitive {
                    name: self.text(tok).to_string(),
                    dims: 0,
                };
                self.parse_type_literal_tail(ty)
            }
            _ if kind.is_primitive_type() => {
                let tok = self.bump();
                let dims = self.parse_extra_dims();
                let ty = TypeRef::Primitive {
                    name: self.text(tok).to_string(),
                    dims,
                };
                self.parse_type_literal_tail(ty)
            }
            SyntaxKind::Completion => {
                let node = self.completion_node(CompletionKind::Name, None);
                Expr::Completion(node)
            }
            _ if kind.is_identifier_like() => {
                if !self.no_ident_lambda && self.nth(1) == SyntaxKind::Arrow {
                    return self.parse_lambda();
                }
                let tok = self.bump();
                Expr::Name(self.text(tok).to_string())
            }
            _ => {
                self.error_here("expected expression");
                Expr::Error
            }
        }
    }

    /// `.class`, `.ident|` or `::name` after a primitive or array type.
    fn parse_type_literal_tail(&mut self, ty: TypeRef) -> Expr {
        if self.at(SyntaxKind::Dot) {
            match self.nth(1) {
                SyntaxKind::ClassKw => {
                    self.bump();
                    self.bump();
                    return Expr::ClassLiteral(ty);
                }
                SyntaxKind::Completion => {
                    self.bump();
                    let qualifier = printer::type_ref(&ty);
                    let node =
                        self.completion_node(CompletionKind::ClassLiteralAccess, Some(qualifier));
                    return Expr::Completion(node);
                }
                _ => {}
            }
        } else if self.at(SyntaxKind::DoubleColon) {
            self.bump();
            let receiver = Box::new(Expr::Name(printer::type_ref(&ty)));
            if self.eat(SyntaxKind::NewKw) {
                return Expr::MethodRef {
                    receiver,
                    name: "new".to_string(),
                };
            }
        }
        self.error_here("expected `.class`");
        Expr::ClassLiteral(ty)
    }

    fn parse_postfix(&mut self, mut expr: Expr) -> Expr {
        loop {
            match self.current() {
                SyntaxKind::Dot => match self.nth(1) {
                    SyntaxKind::Completion => {
                        self.bump();
                        let (kind, qualifier) = match &expr {
                            Expr::Name(name) => (CompletionKind::Name, name.clone()),
                            other => (CompletionKind::MemberAccess, printer::expr_text(other)),
                        };
                        let node = self.completion_node(kind, Some(qualifier));
                        expr = Expr::Completion(node);
                    }
                    SyntaxKind::ClassKw => {
                        self.bump();
                        self.bump();
                        expr = Expr::ClassLiteral(name_to_type(&expr, 0));
                    }
                    SyntaxKind::NewKw => {
                        self.bump();
                        expr = self.parse_new();
                    }
                    SyntaxKind::Less => {
                        self.bump();
                        let type_args = self.parse_type_arguments().unwrap_or_default();
                        if !self.at_ident_like() {
                            self.error_here("expected method name");
                            break;
                        }
                        let tok = self.bump();
                        let name = self.text(tok).to_string();
                        let args = if self.at(SyntaxKind::LParen) {
                            self.parse_arguments()
                        } else {
                            self.error_here("expected `(`");
                            Vec::new()
                        };
                        expr = Expr::MethodCall {
                            receiver: Some(Box::new(expr)),
                            type_args,
                            name,
                            args,
                        };
                    }
                    next if next.is_identifier_like()
                        || matches!(next, SyntaxKind::ThisKw | SyntaxKind::SuperKw) =>
                    {
                        self.bump();
                        let tok = self.bump();
                        let name = self.text(tok).to_string();
                        expr = if self.at(SyntaxKind::LParen) {
                            let args = self.parse_arguments();
                            Expr::MethodCall {
                                receiver: Some(Box::new(expr)),
                                type_args: Vec::new(),
                                name,
                                args,
                            }
                        } else {
                            match expr {
                                Expr::Name(qualifier) if next.is_identifier_like() => {
                                    Expr::Name(format!("{qualifier}.{name}"))
                                }
                                receiver => Expr::FieldAccess {
                                    receiver: Box::new(receiver),
                                    name,
                                },
                            }
                        };
                    }
                    _ => {
                        self.bump();
                        self.error_here("expected member name after `.`");
                        break;
                    }
                },
                SyntaxKind::LParen => {
                    let name = match &expr {
                        Expr::Name(name) if !name.contains('.') => name.clone(),
                        _ => break,
                    };
                    let args = self.parse_arguments();
                    expr = Expr::MethodCall {
                        receiver: None,
                        type_args: Vec::new(),
                        name,
                        args,
                    };
                }
                SyntaxKind::LBracket if self.nth(1) == SyntaxKind::RBracket => {
                    let dims = self.parse_extra_dims();
                    let ty = name_to_type(&expr, dims);
                    return self.parse_type_literal_tail(ty);
                }
                SyntaxKind::LBracket => {
                    self.bump();
                    let index = self.parse_expression(0);
                    self.expect(SyntaxKind::RBracket, "expected `]`");
                    expr = Expr::ArrayAccess {
                        array: Box::new(expr),
                        index: Box::new(index),
                    };
                }
                SyntaxKind::PlusPlus | SyntaxKind::MinusMinus => {
                    let tok = self.bump();
                    expr = Expr::Unary {
                        op: self.text(tok).to_string(),
                        operand: Box::new(expr),
                        postfix: true,
                    };
                }
                SyntaxKind::DoubleColon => {
                    self.bump();
                    let name = if self.at(SyntaxKind::NewKw) || self.at_ident_like() {
                        let tok = self.bump();
                        self.text(tok).to_string()
                    } else {
                        self.error_here("expected method name after `::`");
                        break;
                    };
                    expr = Expr::MethodRef {
                        receiver: Box::new(expr),
                        name,
                    };
                }
                _ => break,
            }
        }
        expr
    }

    pub(super) fn parse_arguments(&mut self) -> Vec<Expr> {
        self.bump();
        let mut args = Vec::new();
        if self.eat(SyntaxKind::RParen) {
            return args;
        }
        loop {
            let before = self.pos;
            let arg = self.parse_expression(0);
            if self.pos == before {
                break;
            }
            args.push(arg);
            if !self.eat(SyntaxKind::Comma) {
                break;
            }
        }
        self.expect(SyntaxKind::RParen, "expected `)` to close arguments");
        args
    }

    fn parse_new(&mut self) -> Expr {
        self.bump();
        if self.at(SyntaxKind::Less) {
            let _ = self.parse_type_arguments();
        }
        let Some(ty) = self.parse_type_inner(false) else {
            self.error_here("expected type after `new`");
            return Expr::Error;
        };
        if let TypeRef::Completion(node) = ty {
            return Expr::Completion(node);
        }

        if self.at(SyntaxKind::LBracket) {
            let mut dims = Vec::new();
            while self.eat(SyntaxKind::LBracket) {
                if self.eat(SyntaxKind::RBracket) {
                    dims.push(None);
                } else {
                    dims.push(Some(self.parse_expression(0)));
                    self.expect(SyntaxKind::RBracket, "expected `]`");
                }
            }
            let init = self
                .at(SyntaxKind::LBrace)
                .then(|| self.parse_array_initializer());
            return Expr::NewArray { ty, dims, init };
        }

        if !self.at(SyntaxKind::LParen) {
            self.error_here("expected `(` or `[` after type");
            return Expr::New {
                ty,
                args: Vec::new(),
                body: None,
            };
        }
        let args = self.parse_arguments();
        let body = if self.at(SyntaxKind::LBrace) {
            self.parse_anonymous_body()
        } else {
            None
        };
        Expr::New { ty, args, body }
    }

    /// Anonymous class body. Dropped entirely when it is never closed.
    fn parse_anonymous_body(&mut self) -> Option<Box<TypeDecl>> {
        let start = self.current_range().start;
        let mut decl = TypeDecl::new(TypeKind::Class, Modifiers::default(), String::new(), start);
        if self.parse_type_body(&mut decl) {
            return Some(Box::new(decl));
        }
        tracing::debug!(
            target: "husk.syntax",
            at = start,
            "discarding unterminated anonymous class body"
        );
        None
    }

    /// `{ a, b, }`. Poisons the enclosing initializer when not terminated.
    pub(super) fn parse_array_initializer(&mut self) -> Vec<Expr> {
        self.bump();
        let mut items = Vec::new();
        loop {
            match self.current() {
                SyntaxKind::RBrace => {
                    self.bump();
                    return items;
                }
                SyntaxKind::LBrace => items.push(Expr::ArrayInit(self.parse_array_initializer())),
                _ => {
                    let before = self.pos;
                    let item = self.parse_expression(0);
                    if self.pos == before {
                        break;
                    }
                    items.push(item);
                }
            }
            if !self.eat(SyntaxKind::Comma) && !self.at(SyntaxKind::RBrace) {
                break;
            }
        }

        self.poisoned = true;
        self.error_here("unterminated array initializer");
        items
    }

    fn parse_lambda(&mut self) -> Expr {
        let mut params = Vec::new();
        if self.at(SyntaxKind::LParen) {
            self.bump();
            while !matches!(
                self.current(),
                SyntaxKind::RParen | SyntaxKind::Arrow | SyntaxKind::Eof
            ) {
                let before = self.pos;
                if self.at_ident_like()
                    && matches!(self.nth(1), SyntaxKind::Comma | SyntaxKind::RParen)
                {
                    let tok = self.bump();
                    params.push(LambdaParam {
                        ty: None,
                        name: self.text(tok).to_string(),
                    });
                } else {
                    self.parse_modifiers();
                    if let Some(ty) = self.parse_type() {
                        self.eat(SyntaxKind::Ellipsis);
                        if self.at_ident_like() {
                            let tok = self.bump();
                            params.push(LambdaParam {
                                ty: Some(ty),
                                name: self.text(tok).to_string(),
                            });
                        }
                    }
                }
                if self.pos == before || !self.eat(SyntaxKind::Comma) {
                    break;
                }
            }
            self.expect(SyntaxKind::RParen, "expected `)` in lambda parameters");
        } else {
            let tok = self.bump();
            params.push(LambdaParam {
                ty: None,
                name: self.text(tok).to_string(),
            });
        }

        self.expect(SyntaxKind::Arrow, "expected `->` in lambda");
        let body = if self.at(SyntaxKind::LBrace) {
            LambdaBody::Block(self.parse_body(FrameKind::LambdaBody))
        } else {
            LambdaBody::Expr(Box::new(self.parse_expression(0)))
        };
        Expr::Lambda { params, body }
    }

    fn is_lambda_paren(&self) -> bool {
        matching_paren(self.tokens, self.pos).map_or(false, |close| {
            self.tokens.get(close + 1).map(|t| t.kind) == Some(SyntaxKind::Arrow)
        })
    }

    fn is_cast_expression(&self) -> bool {
        let first = self.nth(1);
        let Some(after) = scan_type(self.tokens, self.pos + 1) else {
            return false;
        };
        if self.tokens.get(after).map(|t| t.kind) != Some(SyntaxKind::RParen) {
            return false;
        }
        let next = self
            .tokens
            .get(after + 1)
            .map_or(SyntaxKind::Eof, |t| t.kind);
        if first.is_primitive_type() {
            can_start_expression(next)
        } else {
            // `(a) - b` is a subtraction, not a cast.
            can_start_expression(next)
                && !matches!(
                    next,
                    SyntaxKind::Plus
                        | SyntaxKind::Minus
                        | SyntaxKind::PlusPlus
                        | SyntaxKind::MinusMinus
                )
        }
    }
}

/// Reinterpret a (possibly qualified) name as a type, for class literals.
fn name_to_type(expr: &Expr, dims: usize) -> TypeRef {
    let text = match expr {
        Expr::Name(name) => name.clone(),
        other => printer::expr_text(other),
    };
    TypeRef::Named {
        segments: text
            .split('.')
            .map(|name| TypeSegment {
                name: name.to_string(),
                args: None,
            })
            .collect(),
        dims,
    }
}

fn can_start_expression(kind: SyntaxKind) -> bool {
    kind.is_identifier_like()
        || kind.is_literal()
        || kind.is_primitive_type()
        || matches!(
            kind,
            SyntaxKind::ThisKw
                | SyntaxKind::SuperKw
                | SyntaxKind::NewKw
                | SyntaxKind::SwitchKw
                | SyntaxKind::LParen
                | SyntaxKind::Plus
                | SyntaxKind::Minus
                | SyntaxKind::Bang
                | SyntaxKind::Tilde
                | SyntaxKind::PlusPlus
                | SyntaxKind::MinusMinus
        )
}

fn infix_binding_power(op: SyntaxKind) -> Option<(u8, u8)> {
    // (left, right); larger binds tighter.
    let bp = match op {
        SyntaxKind::Star | SyntaxKind::Slash | SyntaxKind::Percent => (70, 71),
        SyntaxKind::Plus | SyntaxKind::Minus => (60, 61),
        SyntaxKind::LeftShift | SyntaxKind::RightShift | SyntaxKind::UnsignedRightShift => (55, 56),
        SyntaxKind::Less | SyntaxKind::LessEq | SyntaxKind::Greater | SyntaxKind::GreaterEq => {
            (50, 51)
        }
        SyntaxKind::EqEq | SyntaxKind::BangEq => (45, 46),
        SyntaxKind::Amp => (40, 41),
        SyntaxKind::Caret => (39, 40),
        SyntaxKind::Pipe => (38, 39),
        SyntaxKind::AmpAmp => (30, 31),
        SyntaxKind::PipePipe => (20, 21),

        // Assignment (right-associative).
        op if op.is_assignment_operator() => (1, 0),

        _ => return None,
    };
    Some(bp)
}
