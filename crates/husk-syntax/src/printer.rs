//! Canonical rendering of a [`CompilationUnit`].
//!
//! The output is what tests compare against, so it is fully deterministic:
//! member types are hoisted before the other members, synthesized members are
//! printed at fixed positions, and every construct has exactly one spelling.

use std::fmt;

use serde::Serialize;

use crate::ast::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RenderOptions {
    /// Spaces per nesting level.
    pub indent_width: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions { indent_width: 2 }
    }
}

pub fn render(unit: &CompilationUnit) -> String {
    render_with(unit, &RenderOptions::default())
}

pub fn render_with(unit: &CompilationUnit, options: &RenderOptions) -> String {
    let mut printer = Printer::new(options, unit.bodies_parsed);
    printer.unit(unit);
    printer.out
}

impl fmt::Display for CompilationUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render(self))
    }
}

// Single-line renderings used for completion contexts and qualifiers.

pub(crate) fn type_ref(ty: &TypeRef) -> String {
    inline(|p| p.type_ref(ty))
}

pub(crate) fn expr_text(expr: &Expr) -> String {
    inline(|p| p.expr(expr, 0))
}

pub(crate) fn package_context(decl: &PackageDecl) -> String {
    inline(|p| {
        p.w("package ");
        p.name(&decl.name);
    })
}

pub(crate) fn import_context(decl: &ImportDecl) -> String {
    inline(|p| p.import_head(decl))
}

pub(crate) fn type_header(decl: &TypeDecl) -> String {
    inline(|p| p.type_header(decl))
}

pub(crate) fn method_header(method: &MethodDecl) -> String {
    inline(|p| p.method_header(method))
}

pub(crate) fn field_context(field: &FieldDecl) -> String {
    inline(|p| p.field_head(field, 0))
}

pub(crate) fn statement_context(stmt: &Stmt) -> String {
    let text = inline(|p| p.stmt(stmt, 0));
    text.trim_end().trim_end_matches(';').trim_end().to_string()
}

fn inline(f: impl FnOnce(&mut Printer)) -> String {
    let mut printer = Printer::new(&RenderOptions::default(), true);
    f(&mut printer);
    printer.out
}

struct Printer {
    indent_width: usize,
    bodies_parsed: bool,
    out: String,
}

impl Printer {
    fn new(options: &RenderOptions, bodies_parsed: bool) -> Self {
        Printer {
            indent_width: options.indent_width,
            bodies_parsed,
            out: String::new(),
        }
    }

    fn w(&mut self, text: &str) {
        self.out.push_str(text);
    }

    fn indent(&mut self, depth: usize) {
        self.out
            .extend(std::iter::repeat(' ').take(depth * self.indent_width));
    }

    fn line(&mut self, depth: usize, text: &str) {
        self.indent(depth);
        self.w(text);
        self.w("\n");
    }

    fn separated<T>(&mut self, items: &[T], sep: &str, mut each: impl FnMut(&mut Self, &T)) {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.w(sep);
            }
            each(self, item);
        }
    }

    fn unit(&mut self, unit: &CompilationUnit) {
        if let Some(package) = &unit.package {
            self.w("package ");
            self.name(&package.name);
            self.w(";\n");
        }
        for import in &unit.imports {
            self.import_head(import);
            self.w(";\n");
        }
        for ty in &unit.types {
            self.type_decl(ty, 0);
            self.w("\n");
        }
    }

    fn name(&mut self, name: &Name) {
        match name {
            Name::Path(path) => self.w(path),
            Name::Completion(node) => self.w(&node.to_string()),
        }
    }

    fn import_head(&mut self, import: &ImportDecl) {
        self.w("import ");
        if import.is_static {
            self.w("static ");
        }
        self.name(&import.name);
        if import.is_star {
            self.w(".*");
        }
    }

    // --- declarations ---

    fn modifiers(&mut self, modifiers: &Modifiers) {
        for annotation in &modifiers.annotations {
            self.annotation(annotation);
            self.w(" ");
        }
        for keyword in &modifiers.keywords {
            self.w(keyword.as_str());
            self.w(" ");
        }
    }

    fn annotation(&mut self, annotation: &Annotation) {
        self.w("@");
        self.type_ref(&annotation.name);
        if let Some(args) = &annotation.args {
            self.w("(");
            self.separated(args, ", ", |p, arg| p.expr(arg, 0));
            self.w(")");
        }
    }

    fn type_params(&mut self, params: &[TypeParam]) {
        if params.is_empty() {
            return;
        }
        self.w("<");
        self.separated(params, ", ", |p, param| {
            p.w(&param.name);
            if !param.bounds.is_empty() {
                p.w(" extends ");
                p.separated(&param.bounds, " & ", |p, bound| p.type_ref(bound));
            }
        });
        self.w(">");
    }

    fn type_header(&mut self, ty: &TypeDecl) {
        self.modifiers(&ty.modifiers);
        self.w(ty.kind.keyword());
        self.w(" ");
        self.w(&ty.name);
        self.type_params(&ty.type_params);
        if ty.kind == TypeKind::Record {
            self.w("(");
            self.separated(&ty.record_components, ", ", |p, param| p.param(param));
            self.w(")");
        }
        if let Some(superclass) = &ty.superclass {
            self.w(" extends ");
            self.type_ref(superclass);
        }
        if !ty.interfaces.is_empty() {
            let keyword = if ty.kind == TypeKind::Interface {
                " extends "
            } else {
                " implements "
            };
            self.w(keyword);
            self.separated(&ty.interfaces, ", ", |p, iface| p.type_ref(iface));
        }
    }

    fn type_decl(&mut self, ty: &TypeDecl, depth: usize) {
        self.type_header(ty);
        self.w(" ");
        self.type_body(ty, depth);
    }

    fn type_body(&mut self, ty: &TypeDecl, depth: usize) {
        let empty = ty.members.is_empty()
            && ty.enum_constants.is_empty()
            && !ty.has_default_constructor
            && !ty.has_clinit
            && ty.kind != TypeKind::Enum;
        if empty {
            self.w("{ }");
            return;
        }

        self.w("{\n");
        let inner = depth + 1;

        for nested in ty.member_types() {
            self.indent(inner);
            self.type_decl(nested, inner);
            self.w("\n");
        }

        if ty.kind == TypeKind::Enum {
            if ty.enum_constants.is_empty() {
                self.line(inner, ";");
            }
            let last = ty.enum_constants.len().saturating_sub(1);
            for (i, constant) in ty.enum_constants.iter().enumerate() {
                self.indent(inner);
                self.enum_constant(constant, inner);
                self.w(if i == last { ";\n" } else { ",\n" });
            }
        }

        for member in &ty.members {
            match member {
                Member::Field(field) => {
                    self.indent(inner);
                    self.field_head(field, inner);
                    self.w(";\n");
                }
                Member::Initializer(init) => {
                    self.indent(inner);
                    if init.is_static {
                        self.w("static ");
                    }
                    self.body(&init.body, inner);
                    self.w("\n");
                }
                _ => {}
            }
        }

        if ty.has_default_constructor {
            self.indent(inner);
            self.w("public ");
            self.w(&ty.name);
            if self.bodies_parsed {
                self.w("() {\n");
                self.line(inner + 1, "super();");
                self.indent(inner);
                self.w("}\n");
            } else {
                self.w("() { }\n");
            }
        }
        if ty.has_clinit {
            self.line(inner, "<clinit>() { }");
        }

        for method in ty.methods() {
            self.indent(inner);
            self.method(method, ty.kind, inner);
            self.w("\n");
        }

        self.indent(depth);
        self.w("}");
    }

    fn enum_constant(&mut self, constant: &EnumConstant, depth: usize) {
        for annotation in &constant.annotations {
            self.annotation(annotation);
            self.w(" ");
        }
        self.w(&constant.name);
        if let Some(args) = &constant.args {
            self.args(args, depth);
        }
        if let Some(body) = &constant.body {
            self.w(" ");
            self.type_body(body, depth);
        }
    }

    fn field_head(&mut self, field: &FieldDecl, depth: usize) {
        self.modifiers(&field.modifiers);
        self.type_ref(&field.ty);
        if !field.name.is_empty() {
            self.w(" ");
            self.w(&field.name);
        }
        if let Some(init) = &field.initializer {
            self.w(" = ");
            self.expr(init, depth);
        }
    }

    fn param(&mut self, param: &Param) {
        self.modifiers(&param.modifiers);
        self.type_ref(&param.ty);
        if param.varargs {
            self.w("...");
        }
        if !param.name.is_empty() {
            self.w(" ");
            self.w(&param.name);
        }
    }

    fn method_header(&mut self, method: &MethodDecl) {
        self.modifiers(&method.modifiers);
        if !method.type_params.is_empty() {
            self.type_params(&method.type_params);
            self.w(" ");
        }
        if let Some(ret) = &method.return_type {
            self.type_ref(ret);
            self.w(" ");
        }
        self.w(&method.name);
        if method.is_compact {
            return;
        }
        self.w("(");
        self.separated(&method.params, ", ", |p, param| p.param(param));
        self.w(")");
        if !method.throws.is_empty() {
            self.w(" throws ");
            self.separated(&method.throws, ", ", |p, ty| p.type_ref(ty));
        }
    }

    fn method(&mut self, method: &MethodDecl, owner: TypeKind, depth: usize) {
        self.method_header(method);
        let Some(body) = &method.body else {
            self.w(";");
            return;
        };
        self.w(" ");
        let implicit_super = method.is_constructor
            && owner == TypeKind::Class
            && method.explicit_constructor_call().is_none();
        match body {
            Body::Parsed(block) if implicit_super => {
                self.w("{\n");
                self.line(depth + 1, "super();");
                self.block_lines(&block.statements, depth + 1);
                self.indent(depth);
                self.w("}");
            }
            _ => self.body(body, depth),
        }
    }

    fn body(&mut self, body: &Body, depth: usize) {
        match body {
            Body::Elided(_) => self.w("{ }"),
            Body::Parsed(block) => self.block(block, depth),
        }
    }

    // --- statements ---

    fn block(&mut self, block: &Block, depth: usize) {
        if block.statements.is_empty() {
            self.w("{ }");
            return;
        }
        self.w("{\n");
        self.block_lines(&block.statements, depth + 1);
        self.indent(depth);
        self.w("}");
    }

    fn block_lines(&mut self, statements: &[Stmt], depth: usize) {
        for stmt in statements {
            self.indent(depth);
            self.stmt(stmt, depth);
            self.w("\n");
        }
    }

    /// The body of `if`/`while`/`for`: a block stays on the header line.
    fn clause(&mut self, stmt: &Stmt, depth: usize) {
        match stmt {
            Stmt::Block(block) => {
                self.w(" ");
                self.block(block, depth);
            }
            Stmt::Empty => self.w(";"),
            other => {
                self.w("\n");
                self.indent(depth + 1);
                self.stmt(other, depth + 1);
            }
        }
    }

    fn local_var(&mut self, var: &LocalVar, depth: usize) {
        self.modifiers(&var.modifiers);
        self.type_ref(&var.ty);
        if !var.name.is_empty() {
            self.w(" ");
            self.w(&var.name);
        }
        if let Some(init) = &var.initializer {
            self.w(" = ");
            self.expr(init, depth);
        }
    }

    fn stmt(&mut self, stmt: &Stmt, depth: usize) {
        match stmt {
            Stmt::Block(block) => self.block(block, depth),
            Stmt::LocalVar(var) => {
                self.local_var(var, depth);
                self.w(";");
            }
            Stmt::LocalClass(ty) => self.type_decl(ty, depth),
            Stmt::Expr(expr) => {
                self.expr(expr, depth);
                self.w(";");
            }
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.w("if (");
                self.expr(cond, depth);
                self.w(")");
                self.clause(then_branch, depth);
                if let Some(else_branch) = else_branch {
                    if matches!(**then_branch, Stmt::Block(_)) {
                        self.w(" else");
                    } else {
                        self.w("\n");
                        self.indent(depth);
                        self.w("else");
                    }
                    if let Stmt::If { .. } = **else_branch {
                        self.w(" ");
                        self.stmt(else_branch, depth);
                    } else {
                        self.clause(else_branch, depth);
                    }
                }
            }
            Stmt::While { cond, body } => {
                self.w("while (");
                self.expr(cond, depth);
                self.w(")");
                self.clause(body, depth);
            }
            Stmt::DoWhile { body, cond } => {
                self.w("do");
                self.clause(body, depth);
                if matches!(**body, Stmt::Block(_)) {
                    self.w(" ");
                } else {
                    self.w("\n");
                    self.indent(depth);
                }
                self.w("while (");
                self.expr(cond, depth);
                self.w(");");
            }
            Stmt::For {
                init,
                cond,
                update,
                body,
            } => {
                self.w("for (");
                self.for_init(init, depth);
                self.w(";");
                if let Some(cond) = cond {
                    self.w(" ");
                    self.expr(cond, depth);
                }
                self.w(";");
                if !update.is_empty() {
                    self.w(" ");
                    self.separated(update, ", ", |p, e| p.expr(e, depth));
                }
                self.w(")");
                self.clause(body, depth);
            }
            Stmt::ForEach {
                var,
                iterable,
                body,
            } => {
                self.w("for (");
                self.local_var(var, depth);
                self.w(" : ");
                self.expr(iterable, depth);
                self.w(")");
                self.clause(body, depth);
            }
            Stmt::Labeled { label, body } => {
                self.w(label);
                self.w(": ");
                self.stmt(body, depth);
            }
            Stmt::Switch(switch) => self.switch(switch, depth),
            Stmt::Try {
                resources,
                block,
                catches,
                finally,
            } => {
                self.w("try ");
                if !resources.is_empty() {
                    self.w("(");
                    self.separated(resources, "; ", |p, resource| match resource {
                        Resource::Decl(var) => p.local_var(var, depth),
                        Resource::Expr(expr) => p.expr(expr, depth),
                    });
                    self.w(") ");
                }
                self.block(block, depth);
                for catch in catches {
                    self.w(" catch (");
                    self.modifiers(&catch.modifiers);
                    self.separated(&catch.types, " | ", |p, ty| p.type_ref(ty));
                    self.w(" ");
                    self.w(&catch.name);
                    self.w(") ");
                    self.block(&catch.block, depth);
                }
                if let Some(finally) = finally {
                    self.w(" finally ");
                    self.block(finally, depth);
                }
            }
            Stmt::Synchronized { lock, block } => {
                self.w("synchronized (");
                self.expr(lock, depth);
                self.w(") ");
                self.block(block, depth);
            }
            Stmt::Return(value) => {
                self.w("return");
                if let Some(value) = value {
                    self.w(" ");
                    self.expr(value, depth);
                }
                self.w(";");
            }
            Stmt::Throw(expr) => {
                self.w("throw ");
                self.expr(expr, depth);
                self.w(";");
            }
            Stmt::Break(label) | Stmt::Continue(label) => {
                self.w(if matches!(stmt, Stmt::Break(_)) {
                    "break"
                } else {
                    "continue"
                });
                if let Some(label) = label {
                    self.w(" ");
                    self.w(label);
                }
                self.w(";");
            }
            Stmt::Yield(expr) => {
                self.w("yield ");
                self.expr(expr, depth);
                self.w(";");
            }
            Stmt::Assert { cond, message } => {
                self.w("assert ");
                self.expr(cond, depth);
                if let Some(message) = message {
                    self.w(" : ");
                    self.expr(message, depth);
                }
                self.w(";");
            }
            Stmt::ConstructorCall { kind, args } => {
                self.w(match kind {
                    ConstructorCallKind::This => "this",
                    ConstructorCallKind::Super => "super",
                });
                self.args(args, depth);
                self.w(";");
            }
            Stmt::Empty => self.w(";"),
        }
    }

    /// `int i = 0, j = 1` or `i = 0, j = 1`.
    fn for_init(&mut self, init: &[Stmt], depth: usize) {
        let mut first_var = true;
        for (i, stmt) in init.iter().enumerate() {
            if i > 0 {
                self.w(", ");
            }
            match stmt {
                Stmt::LocalVar(var) if first_var => {
                    first_var = false;
                    self.local_var(var, depth);
                }
                Stmt::LocalVar(var) => {
                    self.w(&var.name);
                    if let Some(init) = &var.initializer {
                        self.w(" = ");
                        self.expr(init, depth);
                    }
                }
                Stmt::Expr(expr) => self.expr(expr, depth),
                other => {
                    let text = statement_context(other);
                    self.w(&text);
                }
            }
        }
    }

    fn switch(&mut self, switch: &Switch, depth: usize) {
        self.w("switch (");
        self.expr(&switch.selector, depth);
        self.w(") {");
        if switch.cases.is_empty() {
            self.w(" }");
            return;
        }
        self.w("\n");
        for case in &switch.cases {
            self.indent(depth + 1);
            if case.labels.is_empty() {
                self.w("default");
            } else {
                self.w("case ");
                self.separated(&case.labels, ", ", |p, label| p.expr(label, depth + 1));
            }
            if case.arrow {
                self.w(" -> ");
                match case.body.as_slice() {
                    [single] => self.stmt(single, depth + 1),
                    body => self.block(
                        &Block {
                            statements: body.to_vec(),
                            span: Default::default(),
                        },
                        depth + 1,
                    ),
                }
                self.w("\n");
            } else {
                self.w(":\n");
                self.block_lines(&case.body, depth + 2);
            }
        }
        self.indent(depth);
        self.w("}");
    }

    // --- expressions ---

    fn args(&mut self, args: &[Expr], depth: usize) {
        self.w("(");
        self.separated(args, ", ", |p, arg| p.expr(arg, depth));
        self.w(")");
    }

    fn expr(&mut self, expr: &Expr, depth: usize) {
        match expr {
            Expr::Literal(text) | Expr::Name(text) => self.w(text),
            Expr::This => self.w("this"),
            Expr::Super => self.w("super"),
            Expr::FieldAccess { receiver, name } => {
                self.expr(receiver, depth);
                self.w(".");
                self.w(name);
            }
            Expr::MethodCall {
                receiver,
                type_args,
                name,
                args,
            } => {
                if let Some(receiver) = receiver {
                    self.expr(receiver, depth);
                    self.w(".");
                }
                if !type_args.is_empty() {
                    self.w("<");
                    self.separated(type_args, ", ", |p, arg| p.type_ref(arg));
                    self.w(">");
                }
                self.w(name);
                self.args(args, depth);
            }
            Expr::New { ty, args, body } => {
                self.w("new ");
                self.type_ref(ty);
                self.args(args, depth);
                if let Some(body) = body {
                    self.w(" ");
                    self.type_body(body, depth);
                }
            }
            Expr::NewArray { ty, dims, init } => {
                self.w("new ");
                self.type_ref(ty);
                for dim in dims {
                    self.w("[");
                    if let Some(dim) = dim {
                        self.expr(dim, depth);
                    }
                    self.w("]");
                }
                if let Some(init) = init {
                    self.w(" ");
                    self.array_init(init, depth);
                }
            }
            Expr::ArrayInit(items) => self.array_init(items, depth),
            Expr::ArrayAccess { array, index } => {
                self.expr(array, depth);
                self.w("[");
                self.expr(index, depth);
                self.w("]");
            }
            Expr::Unary {
                op,
                operand,
                postfix,
            } => {
                if *postfix {
                    self.expr(operand, depth);
                    self.w(op);
                } else {
                    self.w(op);
                    self.expr(operand, depth);
                }
            }
            Expr::Binary { op, lhs, rhs } => {
                self.expr(lhs, depth);
                self.w(" ");
                self.w(op);
                self.w(" ");
                self.expr(rhs, depth);
            }
            Expr::Assign { op, target, value } => {
                self.expr(target, depth);
                self.w(" ");
                self.w(op);
                self.w(" ");
                self.expr(value, depth);
            }
            Expr::InstanceOf { expr, ty, binding } => {
                self.expr(expr, depth);
                self.w(" instanceof ");
                self.type_ref(ty);
                if let Some(binding) = binding {
                    self.w(" ");
                    self.w(binding);
                }
            }
            Expr::Conditional {
                cond,
                then_expr,
                else_expr,
            } => {
                self.expr(cond, depth);
                self.w(" ? ");
                self.expr(then_expr, depth);
                self.w(" : ");
                self.expr(else_expr, depth);
            }
            Expr::Cast { ty, expr } => {
                self.w("(");
                self.type_ref(ty);
                self.w(") ");
                self.expr(expr, depth);
            }
            Expr::Paren(inner) => {
                self.w("(");
                self.expr(inner, depth);
                self.w(")");
            }
            Expr::ClassLiteral(ty) => {
                self.type_ref(ty);
                self.w(".class");
            }
            Expr::Lambda { params, body } => {
                match params.as_slice() {
                    [LambdaParam { ty: None, name }] => self.w(name),
                    _ => {
                        self.w("(");
                        self.separated(params, ", ", |p, param| {
                            if let Some(ty) = &param.ty {
                                p.type_ref(ty);
                                p.w(" ");
                            }
                            p.w(&param.name);
                        });
                        self.w(")");
                    }
                }
                self.w(" -> ");
                match body {
                    LambdaBody::Expr(expr) => self.expr(expr, depth),
                    LambdaBody::Block(body) => self.body(body, depth),
                }
            }
            Expr::MethodRef { receiver, name } => {
                self.expr(receiver, depth);
                self.w("::");
                self.w(name);
            }
            Expr::Switch(switch) => self.switch(switch, depth),
            Expr::Completion(node) => self.w(&node.to_string()),
            Expr::Error => self.w("$missing$"),
        }
    }

    fn array_init(&mut self, items: &[Expr], depth: usize) {
        self.w("{");
        self.separated(items, ", ", |p, item| p.expr(item, depth));
        self.w("}");
    }

    fn type_ref(&mut self, ty: &TypeRef) {
        match ty {
            TypeRef::Primitive { name, dims } => {
                self.w(name);
                self.dims(*dims);
            }
            TypeRef::Named { segments, dims } => {
                self.separated(segments, ".", |p, segment| {
                    p.w(&segment.name);
                    if let Some(args) = &segment.args {
                        p.w("<");
                        p.separated(args, ", ", |p, arg| p.type_ref(arg));
                        p.w(">");
                    }
                });
                self.dims(*dims);
            }
            TypeRef::Wildcard { bound } => {
                self.w("?");
                match bound {
                    Some(WildcardBound::Extends(ty)) => {
                        self.w(" extends ");
                        self.type_ref(ty);
                    }
                    Some(WildcardBound::Super(ty)) => {
                        self.w(" super ");
                        self.type_ref(ty);
                    }
                    None => {}
                }
            }
            TypeRef::Completion(node) => self.w(&node.to_string()),
        }
    }

    fn dims(&mut self, dims: usize) {
        for _ in 0..dims {
            self.w("[]");
        }
    }
}
