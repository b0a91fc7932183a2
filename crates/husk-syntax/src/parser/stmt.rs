use husk_core::Span;

use super::{BodyMode, Parser, TypeOwner};
use crate::ast::*;
use crate::placement::{place, scan_shape, scan_type, Enclosing, Placement, Shape};
use crate::printer;
use crate::SyntaxKind;

impl Parser<'_> {
    /// Statements up to the end of the token range.
    pub(crate) fn parse_block_statements(&mut self) -> Vec<Stmt> {
        self.parse_statements()
    }

    /// Statements up to a closing `}` or the end of input.
    fn parse_statements(&mut self) -> Vec<Stmt> {
        let mut statements = Vec::new();
        while !matches!(self.current(), SyntaxKind::RBrace | SyntaxKind::Eof) {
            self.parse_block_item(&mut statements);
        }
        statements
    }

    /// One block statement. In completion mode only the statement holding the
    /// completion node and the local declarations before it are kept, the
    /// latter without initializers.
    fn parse_block_item(&mut self, out: &mut Vec<Stmt>) {
        let before = self.pos;
        let errors = self.errors.len();
        let had_completion = self.completion.is_some();

        let mut parsed = Vec::new();
        self.parse_statement_into(&mut parsed);

        if self.mode == BodyMode::Completion {
            let holds_completion = !had_completion && self.completion.is_some();
            for stmt in parsed {
                if holds_completion {
                    out.push(stmt);
                } else if let Stmt::LocalVar(mut var) = stmt {
                    var.initializer = None;
                    out.push(Stmt::LocalVar(var));
                }
            }
        } else if self.unclosed {
            out.extend(parsed.into_iter().map(|stmt| match stmt {
                Stmt::LocalVar(mut var) => {
                    var.initializer = None;
                    Stmt::LocalVar(var)
                }
                other => other,
            }));
        } else {
            out.extend(parsed);
        }

        if self.pos == before {
            if self.errors.len() == errors {
                self.error_here("unexpected token in block");
            }
            self.bump();
        }
    }

    fn parse_statement_into(&mut self, out: &mut Vec<Stmt>) {
        let had_completion = self.completion.is_some();
        let len = out.len();
        self.parse_statement_kind(out);
        if out.len() > len {
            if let Some(stmt) = out.last() {
                self.mark_context(had_completion, || printer::statement_context(stmt));
            }
        }
    }

    fn parse_statement_kind(&mut self, out: &mut Vec<Stmt>) {
        match self.current() {
            SyntaxKind::LBrace => out.push(Stmt::Block(self.parse_block())),
            SyntaxKind::Semicolon => {
                self.bump();
                out.push(Stmt::Empty);
            }
            SyntaxKind::IfKw => out.push(self.parse_if()),
            SyntaxKind::WhileKw => {
                self.bump();
                let cond = self.parse_paren_condition();
                let body = Box::new(self.parse_sub_statement());
                out.push(Stmt::While { cond, body });
            }
            SyntaxKind::DoKw => {
                self.bump();
                let body = Box::new(self.parse_sub_statement());
                self.expect(SyntaxKind::WhileKw, "expected `while` after `do` body");
                let cond = self.parse_paren_condition();
                self.expect(SyntaxKind::Semicolon, "expected `;`");
                out.push(Stmt::DoWhile { body, cond });
            }
            SyntaxKind::ForKw => out.push(self.parse_for()),
            SyntaxKind::TryKw => out.push(self.parse_try()),
            SyntaxKind::SwitchKw => out.push(Stmt::Switch(self.parse_switch())),
            SyntaxKind::ReturnKw => {
                self.bump();
                let value = (!self.at_statement_end()).then(|| self.parse_expression(0));
                self.expect(SyntaxKind::Semicolon, "expected `;` after return");
                out.push(Stmt::Return(value));
            }
            SyntaxKind::ThrowKw => {
                self.bump();
                let value = self.parse_expression(0);
                self.expect(SyntaxKind::Semicolon, "expected `;` after throw");
                out.push(Stmt::Throw(value));
            }
            SyntaxKind::BreakKw | SyntaxKind::ContinueKw => {
                let is_break = self.bump().kind == SyntaxKind::BreakKw;
                let label = if self.at_ident_like() {
                    let tok = self.bump();
                    Some(self.text(tok).to_string())
                } else {
                    None
                };
                self.expect(SyntaxKind::Semicolon, "expected `;`");
                out.push(if is_break {
                    Stmt::Break(label)
                } else {
                    Stmt::Continue(label)
                });
            }
            SyntaxKind::AssertKw => {
                self.bump();
                let cond = self.parse_expression(0);
                let message = self
                    .eat(SyntaxKind::Colon)
                    .then(|| self.parse_expression(0));
                self.expect(SyntaxKind::Semicolon, "expected `;` after assert");
                out.push(Stmt::Assert { cond, message });
            }
            SyntaxKind::YieldKw if self.at_yield_statement() => {
                self.bump();
                let value = self.parse_expression(0);
                self.expect(SyntaxKind::Semicolon, "expected `;` after yield");
                out.push(Stmt::Yield(value));
            }
            SyntaxKind::SynchronizedKw if self.nth(1) == SyntaxKind::LParen => {
                self.bump();
                let lock = self.parse_paren_condition();
                let block = self.parse_block_or_error();
                out.push(Stmt::Synchronized { lock, block });
            }
            SyntaxKind::ThisKw | SyntaxKind::SuperKw if self.nth(1) == SyntaxKind::LParen => {
                let kind = if self.bump().kind == SyntaxKind::ThisKw {
                    ConstructorCallKind::This
                } else {
                    ConstructorCallKind::Super
                };
                let args = self.parse_arguments();
                self.expect(SyntaxKind::Semicolon, "expected `;` after constructor call");
                out.push(Stmt::ConstructorCall { kind, args });
            }
            kind if kind.is_identifier_like()
                && kind != SyntaxKind::Completion
                && self.nth(1) == SyntaxKind::Colon =>
            {
                let tok = self.bump();
                let label = self.text(tok).to_string();
                self.bump();
                let body = Box::new(self.parse_sub_statement());
                out.push(Stmt::Labeled { label, body });
            }
            _ => self.parse_declaration_or_expression(out),
        }
    }

    fn parse_declaration_or_expression(&mut self, out: &mut Vec<Stmt>) {
        let start = self.current_range().start;
        let scan = scan_shape(self.tokens, self.pos);
        let mut placement = place(Enclosing::CodeBlock, scan.has_member_modifier, scan.shape);
        if placement == Placement::Statement
            && scan.shape == Shape::Statement
            && self.at_trailing_type_completion(scan.after_modifiers)
            && self.tokens[scan.after_modifiers..]
                .iter()
                .any(|t| t.kind == SyntaxKind::Less)
        {
            placement = Placement::LocalVariable;
        }

        match placement {
            Placement::LocalType => {
                let modifiers = self.parse_modifiers();
                if let Some(ty) = self.parse_type_decl_rest(modifiers, start, TypeOwner::Local) {
                    out.push(Stmt::LocalClass(Box::new(ty)));
                }
            }
            Placement::LocalVariable => {
                let modifiers = self.parse_modifiers();
                let vars = self.parse_local_vars(modifiers);
                out.extend(vars.into_iter().map(Stmt::LocalVar));
                self.expect(SyntaxKind::Semicolon, "expected `;` after local variable");
            }
            Placement::Statement => {
                let before = self.pos;
                let expr = self.parse_expression(0);
                if self.pos == before {
                    return;
                }
                self.expect(SyntaxKind::Semicolon, "expected `;`");
                out.push(Stmt::Expr(expr));
            }
            Placement::TypeDeclaration
            | Placement::Field
            | Placement::Method
            | Placement::Constructor
            | Placement::Discard => {
                self.error_here("member declaration is not allowed here");
                self.discard_member();
            }
        }
    }

    /// `yield` starts a statement unless it is used as a name.
    fn at_yield_statement(&self) -> bool {
        !matches!(
            self.nth(1),
            SyntaxKind::Eq
                | SyntaxKind::Dot
                | SyntaxKind::LBracket
                | SyntaxKind::Semicolon
                | SyntaxKind::PlusPlus
                | SyntaxKind::MinusMinus
                | SyntaxKind::Eof
        ) && !self.nth(1).is_assignment_operator()
    }

    fn at_statement_end(&self) -> bool {
        matches!(
            self.current(),
            SyntaxKind::Semicolon | SyntaxKind::RBrace | SyntaxKind::Eof
        )
    }

    /// Declarators of a local variable declaration, without the `;`.
    fn parse_local_vars(&mut self, modifiers: Modifiers) -> Vec<LocalVar> {
        let Some(ty) = self.parse_type() else {
            self.error_here("expected type");
            return Vec::new();
        };

        let mut vars = Vec::new();
        loop {
            if !self.at_ident_like() {
                if ty.is_completion() {
                    vars.push(LocalVar {
                        modifiers: modifiers.clone(),
                        ty: ty.clone(),
                        name: String::new(),
                        initializer: None,
                    });
                } else {
                    self.error_here("expected variable name");
                }
                break;
            }
            let tok = self.bump();
            let name = self.text(tok).to_string();
            let dims = self.parse_extra_dims();
            let initializer = if self.eat(SyntaxKind::Eq) {
                self.parse_variable_initializer()
            } else {
                None
            };
            vars.push(LocalVar {
                modifiers: modifiers.clone(),
                ty: ty.clone().with_extra_dims(dims),
                name,
                initializer,
            });
            if !self.eat(SyntaxKind::Comma) {
                break;
            }
        }
        vars
    }

    fn parse_block(&mut self) -> Block {
        let open = self.bump();
        let statements = self.parse_statements();
        let end = if self.at(SyntaxKind::RBrace) {
            self.bump().range.start
        } else {
            self.error_here("expected `}` to close block");
            self.current_range().start
        };
        Block {
            statements,
            span: Span::new(open.range.end, end.max(open.range.end)),
        }
    }

    fn parse_block_or_error(&mut self) -> Block {
        if self.at(SyntaxKind::LBrace) {
            self.parse_block()
        } else {
            self.error_here("expected `{`");
            Block {
                statements: Vec::new(),
                span: Span::point(self.last_end),
            }
        }
    }

    /// The body of `if`, `while`, `for`, labels and the like.
    fn parse_sub_statement(&mut self) -> Stmt {
        let start = self.current_range().start;
        if matches!(self.current(), SyntaxKind::Eof | SyntaxKind::RBrace) {
            self.error_here("expected statement");
            return Stmt::Empty;
        }

        let mut statements = Vec::new();
        self.parse_statement_into(&mut statements);
        if statements.len() == 1 {
            if let Some(stmt) = statements.pop() {
                return stmt;
            }
        }
        if statements.is_empty() {
            Stmt::Empty
        } else {
            Stmt::Block(Block {
                statements,
                span: Span::new(start, self.last_end.max(start)),
            })
        }
    }

    fn parse_paren_condition(&mut self) -> Expr {
        self.expect(SyntaxKind::LParen, "expected `(`");
        let cond = self.parse_expression(0);
        self.expect(SyntaxKind::RParen, "expected `)`");
        cond
    }

    fn parse_if(&mut self) -> Stmt {
        self.bump();
        let cond = self.parse_paren_condition();
        let then_branch = Box::new(self.parse_sub_statement());
        let else_branch = self
            .eat(SyntaxKind::ElseKw)
            .then(|| Box::new(self.parse_sub_statement()));
        Stmt::If {
            cond,
            then_branch,
            else_branch,
        }
    }

    fn parse_for(&mut self) -> Stmt {
        self.bump();
        self.expect(SyntaxKind::LParen, "expected `(` after for");

        if self.at_foreach_header() {
            let modifiers = self.parse_modifiers();
            let mut vars = self.parse_local_vars(modifiers);
            self.expect(SyntaxKind::Colon, "expected `:` in enhanced for");
            let iterable = self.parse_expression(0);
            self.expect(SyntaxKind::RParen, "expected `)`");
            let body = Box::new(self.parse_sub_statement());
            if let Some(var) = vars.pop() {
                return Stmt::ForEach {
                    var,
                    iterable,
                    body,
                };
            }
            return Stmt::For {
                init: Vec::new(),
                cond: Some(iterable),
                update: Vec::new(),
                body,
            };
        }

        let mut init = Vec::new();
        if !self.at(SyntaxKind::Semicolon) {
            let scan = scan_shape(self.tokens, self.pos);
            if scan.shape == Shape::VariableDecl {
                let modifiers = self.parse_modifiers();
                init.extend(self.parse_local_vars(modifiers).into_iter().map(Stmt::LocalVar));
            } else {
                init.extend(self.parse_expression_list().into_iter().map(Stmt::Expr));
            }
        }
        self.expect(SyntaxKind::Semicolon, "expected `;` in for header");
        let cond = (!self.at(SyntaxKind::Semicolon)).then(|| self.parse_expression(0));
        self.expect(SyntaxKind::Semicolon, "expected `;` in for header");
        let update = if self.at(SyntaxKind::RParen) {
            Vec::new()
        } else {
            self.parse_expression_list()
        };
        self.expect(SyntaxKind::RParen, "expected `)` to close for header");
        let body = Box::new(self.parse_sub_statement());
        Stmt::For {
            init,
            cond,
            update,
            body,
        }
    }

    fn at_foreach_header(&self) -> bool {
        let scan = scan_shape(self.tokens, self.pos);
        if scan.shape != Shape::VariableDecl {
            return false;
        }
        scan_type(self.tokens, scan.after_modifiers).map_or(false, |after| {
            self.tokens.get(after + 1).map(|t| t.kind) == Some(SyntaxKind::Colon)
        })
    }

    fn parse_expression_list(&mut self) -> Vec<Expr> {
        let mut exprs = Vec::new();
        loop {
            let before = self.pos;
            let expr = self.parse_expression(0);
            if self.pos == before {
                break;
            }
            exprs.push(expr);
            if !self.eat(SyntaxKind::Comma) {
                break;
            }
        }
        exprs
    }

    fn parse_try(&mut self) -> Stmt {
        self.bump();
        let mut resources = Vec::new();
        if self.eat(SyntaxKind::LParen) {
            while !matches!(self.current(), SyntaxKind::RParen | SyntaxKind::Eof) {
                let before = self.pos;
                let scan = scan_shape(self.tokens, self.pos);
                if scan.shape == Shape::VariableDecl {
                    let modifiers = self.parse_modifiers();
                    resources.extend(self.parse_local_vars(modifiers).into_iter().map(Resource::Decl));
                } else {
                    let expr = self.parse_expression(0);
                    if self.pos != before {
                        resources.push(Resource::Expr(expr));
                    }
                }
                if self.pos == before || !self.eat(SyntaxKind::Semicolon) {
                    break;
                }
            }
            self.expect(SyntaxKind::RParen, "expected `)` to close resources");
        }

        let block = self.parse_block_or_error();
        let mut catches = Vec::new();
        while self.eat(SyntaxKind::CatchKw) {
            self.expect(SyntaxKind::LParen, "expected `(` after catch");
            let modifiers = self.parse_modifiers();
            let mut types = Vec::new();
            loop {
                match self.parse_type() {
                    Some(ty) => types.push(ty),
                    None => {
                        self.error_here("expected exception type");
                        break;
                    }
                }
                if !self.eat(SyntaxKind::Pipe) {
                    break;
                }
            }
            let name = if self.at_ident_like() {
                let tok = self.bump();
                self.text(tok).to_string()
            } else {
                self.error_here("expected catch parameter name");
                String::new()
            };
            self.expect(SyntaxKind::RParen, "expected `)`");
            let block = self.parse_block_or_error();
            catches.push(CatchClause {
                modifiers,
                types,
                name,
                block,
            });
        }

        let finally = self
            .eat(SyntaxKind::FinallyKw)
            .then(|| self.parse_block_or_error());
        if resources.is_empty() && catches.is_empty() && finally.is_none() {
            self.error_here("expected `catch` or `finally`");
        }
        Stmt::Try {
            resources,
            block,
            catches,
            finally,
        }
    }

    /// `switch (selector) { cases }`, as a statement or an expression.
    pub(super) fn parse_switch(&mut self) -> Switch {
        self.bump();
        let selector = Box::new(self.parse_paren_condition());
        let mut cases = Vec::new();
        if !self.at(SyntaxKind::LBrace) {
            self.error_here("expected `{` after switch selector");
            return Switch { selector, cases };
        }
        self.bump();

        while !matches!(self.current(), SyntaxKind::RBrace | SyntaxKind::Eof) {
            let labels = if self.eat(SyntaxKind::CaseKw) {
                self.parse_case_labels()
            } else if self.eat(SyntaxKind::DefaultKw) {
                Vec::new()
            } else {
                self.error_here("expected `case` or `default`");
                self.bump();
                continue;
            };

            let arrow = self.eat(SyntaxKind::Arrow);
            let mut body = Vec::new();
            if arrow {
                match self.current() {
                    SyntaxKind::LBrace => body.push(Stmt::Block(self.parse_block())),
                    SyntaxKind::ThrowKw => self.parse_statement_into(&mut body),
                    _ => {
                        let had_completion = self.completion.is_some();
                        let expr = self.parse_expression(0);
                        self.expect(SyntaxKind::Semicolon, "expected `;`");
                        let stmt = Stmt::Expr(expr);
                        self.mark_context(had_completion, || printer::statement_context(&stmt));
                        body.push(stmt);
                    }
                }
            } else {
                self.expect(SyntaxKind::Colon, "expected `:` or `->` after case label");
                while !self.at_case_end() {
                    self.parse_block_item(&mut body);
                }
            }
            cases.push(SwitchCase {
                labels,
                arrow,
                body,
            });
        }
        self.expect(SyntaxKind::RBrace, "expected `}` to close switch");
        Switch { selector, cases }
    }

    fn parse_case_labels(&mut self) -> Vec<Expr> {
        let saved = std::mem::replace(&mut self.no_ident_lambda, true);
        let mut labels = Vec::new();
        loop {
            let before = self.pos;
            let label = if self.at(SyntaxKind::DefaultKw) {
                self.bump();
                Expr::Name("default".to_string())
            } else {
                self.parse_expression(0)
            };
            if self.pos == before {
                break;
            }
            labels.push(label);
            if !self.eat(SyntaxKind::Comma) {
                break;
            }
        }
        self.no_ident_lambda = saved;
        labels
    }

    fn at_case_end(&self) -> bool {
        match self.current() {
            SyntaxKind::CaseKw | SyntaxKind::RBrace | SyntaxKind::Eof => true,
            SyntaxKind::DefaultKw => {
                matches!(self.nth(1), SyntaxKind::Colon | SyntaxKind::Arrow)
            }
            _ => false,
        }
    }
}
