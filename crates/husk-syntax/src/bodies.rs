//! Second pass over a diet unit: parse every elided body from its span.

use husk_core::Span;

use crate::ast::*;
use crate::lexer::lex_significant;
use crate::parser::{BodyMode, Parser};
use crate::ParseError;

/// Populate every [`Body::Elided`] in `unit` by re-reading its span of
/// `source`, which must be the text the unit was parsed from.
///
/// Declarations are left untouched. Lexical errors inside bodies were already
/// reported by the diet parse and are not repeated.
pub fn parse_bodies(unit: &mut CompilationUnit, source: &str) -> Vec<ParseError> {
    let mut filler = BodyFiller {
        source,
        errors: Vec::new(),
        filled: 0,
    };
    for ty in &mut unit.types {
        filler.type_decl(ty);
    }
    unit.bodies_parsed = true;

    tracing::debug!(target: "husk.syntax", bodies = filler.filled, "populated elided bodies");
    let mut errors = filler.errors;
    errors.sort_by_key(|err| err.range.start);
    errors
}

struct BodyFiller<'s> {
    source: &'s str,
    errors: Vec<ParseError>,
    filled: usize,
}

impl BodyFiller<'_> {
    fn type_decl(&mut self, ty: &mut TypeDecl) {
        for constant in &mut ty.enum_constants {
            if let Some(args) = &mut constant.args {
                self.exprs(args);
            }
            if let Some(body) = &mut constant.body {
                self.type_decl(body);
            }
        }
        for member in &mut ty.members {
            match member {
                Member::Field(field) => {
                    if let Some(init) = &mut field.initializer {
                        self.expr(init);
                    }
                }
                Member::Method(method) => {
                    if let Some(body) = &mut method.body {
                        self.body(body);
                    }
                }
                Member::Initializer(init) => self.body(&mut init.body),
                Member::Type(nested) => self.type_decl(nested),
            }
        }
    }

    fn body(&mut self, body: &mut Body) {
        match body {
            Body::Elided(span) => {
                let block = self.parse_span(*span);
                *body = Body::Parsed(block);
            }
            Body::Parsed(block) => self.statements(&mut block.statements),
        }
    }

    fn parse_span(&mut self, span: Span) -> Block {
        self.filled += 1;
        if self.source.get(span.start..span.end).is_none() {
            tracing::debug!(
                target: "husk.syntax",
                start = span.start,
                end = span.end,
                "body span does not fit the source"
            );
            return Block {
                statements: Vec::new(),
                span,
            };
        }

        let (tokens, _) = lex_significant(self.source, span);
        // A closed body's span stops right at its `}`.
        let unclosed = !self.source[span.end..].starts_with('}');
        let mut parser =
            Parser::new(self.source, &tokens, BodyMode::Parse, span.end).with_unclosed(unclosed);
        let statements = parser.parse_block_statements();
        self.errors.extend(parser.finish().errors);
        Block { statements, span }
    }

    fn statements(&mut self, statements: &mut [Stmt]) {
        for stmt in statements {
            self.stmt(stmt);
        }
    }

    fn block(&mut self, block: &mut Block) {
        self.statements(&mut block.statements);
    }

    fn stmt(&mut self, stmt: &mut Stmt) {
        match stmt {
            Stmt::Block(block) => self.block(block),
            Stmt::LocalVar(var) => self.local_var(var),
            Stmt::LocalClass(ty) => self.type_decl(ty),
            Stmt::Expr(expr) | Stmt::Throw(expr) | Stmt::Yield(expr) => self.expr(expr),
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.expr(cond);
                self.stmt(then_branch);
                if let Some(else_branch) = else_branch {
                    self.stmt(else_branch);
                }
            }
            Stmt::While { cond, body } | Stmt::DoWhile { body, cond } => {
                self.expr(cond);
                self.stmt(body);
            }
            Stmt::For {
                init,
                cond,
                update,
                body,
            } => {
                self.statements(init);
                if let Some(cond) = cond {
                    self.expr(cond);
                }
                self.exprs(update);
                self.stmt(body);
            }
            Stmt::ForEach {
                var,
                iterable,
                body,
            } => {
                self.local_var(var);
                self.expr(iterable);
                self.stmt(body);
            }
            Stmt::Labeled { body, .. } => self.stmt(body),
            Stmt::Switch(switch) => self.switch(switch),
            Stmt::Try {
                resources,
                block,
                catches,
                finally,
            } => {
                for resource in resources {
                    match resource {
                        Resource::Decl(var) => self.local_var(var),
                        Resource::Expr(expr) => self.expr(expr),
                    }
                }
                self.block(block);
                for catch in catches {
                    self.block(&mut catch.block);
                }
                if let Some(finally) = finally {
                    self.block(finally);
                }
            }
            Stmt::Synchronized { lock, block } => {
                self.expr(lock);
                self.block(block);
            }
            Stmt::Return(value) => {
                if let Some(value) = value {
                    self.expr(value);
                }
            }
            Stmt::Assert { cond, message } => {
                self.expr(cond);
                if let Some(message) = message {
                    self.expr(message);
                }
            }
            Stmt::ConstructorCall { args, .. } => self.exprs(args),
            Stmt::Break(_) | Stmt::Continue(_) | Stmt::Empty => {}
        }
    }

    fn local_var(&mut self, var: &mut LocalVar) {
        if let Some(init) = &mut var.initializer {
            self.expr(init);
        }
    }

    fn switch(&mut self, switch: &mut Switch) {
        self.expr(&mut switch.selector);
        for case in &mut switch.cases {
            self.exprs(&mut case.labels);
            self.statements(&mut case.body);
        }
    }

    fn exprs(&mut self, exprs: &mut [Expr]) {
        for expr in exprs {
            self.expr(expr);
        }
    }

    fn expr(&mut self, expr: &mut Expr) {
        match expr {
            Expr::Literal(_)
            | Expr::Name(_)
            | Expr::This
            | Expr::Super
            | Expr::ClassLiteral(_)
            | Expr::Completion(_)
            | Expr::Error => {}
            Expr::FieldAccess { receiver, .. } | Expr::MethodRef { receiver, .. } => {
                self.expr(receiver)
            }
            Expr::MethodCall { receiver, args, .. } => {
                if let Some(receiver) = receiver {
                    self.expr(receiver);
                }
                self.exprs(args);
            }
            Expr::New { args, body, .. } => {
                self.exprs(args);
                if let Some(body) = body {
                    self.type_decl(body);
                }
            }
            Expr::NewArray { dims, init, .. } => {
                for dim in dims.iter_mut().flatten() {
                    self.expr(dim);
                }
                if let Some(init) = init {
                    self.exprs(init);
                }
            }
            Expr::ArrayInit(items) => self.exprs(items),
            Expr::ArrayAccess { array, index } => {
                self.expr(array);
                self.expr(index);
            }
            Expr::Unary { operand, .. } => self.expr(operand),
            Expr::Binary { lhs, rhs, .. } => {
                self.expr(lhs);
                self.expr(rhs);
            }
            Expr::Assign { target, value, .. } => {
                self.expr(target);
                self.expr(value);
            }
            Expr::InstanceOf { expr, .. } | Expr::Cast { expr, .. } | Expr::Paren(expr) => {
                self.expr(expr)
            }
            Expr::Conditional {
                cond,
                then_expr,
                else_expr,
            } => {
                self.expr(cond);
                self.expr(then_expr);
                self.expr(else_expr);
            }
            Expr::Lambda { body, .. } => match body {
                LambdaBody::Expr(expr) => self.expr(expr),
                LambdaBody::Block(body) => self.body(body),
            },
            Expr::Switch(switch) => self.switch(switch),
        }
    }
}
