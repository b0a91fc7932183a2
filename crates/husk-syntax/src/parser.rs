//! Recursive-descent parser building the structural tree.
//!
//! The same parser serves every mode. What differs is how a body (`{ ... }`
//! after a method, constructor, initializer or lambda header) is handled: the
//! extent of a body is always found by [`skim_body`] first, and only then is
//! its content either elided or parsed by a nested parser restricted to that
//! token range. A body that is never closed therefore cannot swallow the
//! members that follow it.

mod expr;
mod stmt;

use husk_core::Span;

use crate::ast::*;
use crate::lexer::Token;
use crate::placement::{place, scan_shape, Enclosing, Placement};
use crate::printer;
use crate::recovery::{skim_body, FrameKind, SkimEnd};
use crate::{CompletionKind, CompletionNode, ParseError, SyntaxKind};

/// What to do with the content of a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BodyMode {
    /// Keep only the span.
    Elide,
    /// Parse every body.
    Parse,
    /// Parse only the bodies that contain the completion token.
    Completion,
}

/// Who owns a type declaration being parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TypeOwner {
    TopLevel,
    Member,
    /// Declared inside a code block. Incomplete local types are dropped.
    Local,
}

pub(crate) struct ParserOutput {
    pub errors: Vec<ParseError>,
    pub completion: Option<CompletionNode>,
    pub context: Option<String>,
}

pub(crate) struct Parser<'t> {
    source: &'t str,
    /// Significant tokens only; there is no trailing `Eof` token.
    tokens: &'t [Token],
    pos: usize,
    mode: BodyMode,
    errors: Vec<ParseError>,
    /// `>` still to be handed out from a split `>>` / `>>>` token.
    gt_remaining: u8,
    /// End of the previously consumed token.
    last_end: usize,
    /// Set when an unterminated string or array initializer was consumed.
    poisoned: bool,
    /// Disables `ident ->` lambda detection (switch labels).
    no_ident_lambda: bool,
    /// Parsing a body whose closing `}` is missing. Local initializers are
    /// dropped there outside completion mode.
    unclosed: bool,
    completion: Option<CompletionNode>,
    context: Option<String>,
    eof_offset: usize,
}

impl<'t> Parser<'t> {
    pub(crate) fn new(
        source: &'t str,
        tokens: &'t [Token],
        mode: BodyMode,
        eof_offset: usize,
    ) -> Self {
        let last_end = tokens.first().map_or(eof_offset, |t| t.range.start);
        Parser {
            source,
            tokens,
            pos: 0,
            mode,
            errors: Vec::new(),
            gt_remaining: 0,
            last_end,
            poisoned: false,
            no_ident_lambda: false,
            unclosed: false,
            completion: None,
            context: None,
            eof_offset,
        }
    }

    pub(crate) fn with_unclosed(mut self, unclosed: bool) -> Self {
        self.unclosed = unclosed;
        self
    }

    pub(crate) fn finish(self) -> ParserOutput {
        ParserOutput {
            errors: self.errors,
            completion: self.completion,
            context: self.context,
        }
    }

    // --- compilation unit ---

    pub(crate) fn parse_compilation_unit(&mut self) -> CompilationUnit {
        let mut unit = CompilationUnit::default();

        if self.at(SyntaxKind::PackageKw) {
            unit.package = self.parse_package_decl();
        }

        while !self.at(SyntaxKind::Eof) {
            let before = self.pos;
            match self.current() {
                SyntaxKind::ImportKw => {
                    if let Some(import) = self.parse_import_decl() {
                        unit.imports.push(import);
                    }
                }
                SyntaxKind::Semicolon => {
                    self.bump();
                }
                SyntaxKind::PackageKw => {
                    self.error_here("package declaration must come first");
                    let _ = self.parse_package_decl();
                }
                _ => {
                    let scan = scan_shape(self.tokens, self.pos);
                    let placement =
                        place(Enclosing::CompilationUnit, scan.has_member_modifier, scan.shape);
                    if placement == Placement::TypeDeclaration {
                        if let Some(ty) = self.parse_type_decl(TypeOwner::TopLevel) {
                            unit.types.push(ty);
                        }
                    } else {
                        self.recover_top_level();
                    }
                }
            }
            if self.pos == before {
                self.error_here("unexpected token");
                self.bump();
            }
        }

        unit
    }

    fn parse_package_decl(&mut self) -> Option<PackageDecl> {
        let before = self.completion.is_some();
        let start = self.bump().range.start;
        let name = self.parse_qualified_name();
        self.expect(SyntaxKind::Semicolon, "expected `;` after package declaration");
        let decl = PackageDecl {
            name: name?,
            span: Span::new(start, self.last_end),
        };
        self.mark_context(before, || printer::package_context(&decl));
        Some(decl)
    }

    fn parse_import_decl(&mut self) -> Option<ImportDecl> {
        let before = self.completion.is_some();
        let start = self.bump().range.start;
        let is_static = self.eat(SyntaxKind::StaticKw);
        let name = self.parse_qualified_name();
        let mut is_star = false;
        if self.at(SyntaxKind::Dot) && self.nth(1) == SyntaxKind::Star {
            self.bump();
            self.bump();
            is_star = true;
        }
        self.expect(SyntaxKind::Semicolon, "expected `;` after import");
        let decl = ImportDecl {
            name: name?,
            is_static,
            is_star,
            span: Span::new(start, self.last_end),
        };
        self.mark_context(before, || printer::import_context(&decl));
        Some(decl)
    }

    /// `a.b.c`, stopping before `.*`. A completion token anywhere in the path
    /// turns the whole name into a completion node.
    fn parse_qualified_name(&mut self) -> Option<Name> {
        let mut segments: Vec<String> = Vec::new();
        loop {
            if self.at(SyntaxKind::Completion) {
                let qualifier = (!segments.is_empty()).then(|| segments.join("."));
                let node = self.completion_node(CompletionKind::Name, qualifier);
                return Some(Name::Completion(node));
            }
            if !self.at_ident_like() {
                self.error_here("expected name");
                return (!segments.is_empty()).then(|| Name::Path(segments.join(".")));
            }
            let tok = self.bump();
            segments.push(self.text(tok).to_string());
            if self.at(SyntaxKind::Dot) && self.nth(1).is_identifier_like() {
                self.bump();
                continue;
            }
            return Some(Name::Path(segments.join(".")));
        }
    }

    fn recover_top_level(&mut self) {
        let start = self.current_range();
        self.errors.push(ParseError {
            message: "declaration outside of a type".to_string(),
            range: start,
        });

        let mut depth = 0usize;
        let mut first = true;
        loop {
            match self.current() {
                SyntaxKind::Eof => break,
                SyntaxKind::Semicolon if depth == 0 => {
                    self.bump();
                    break;
                }
                SyntaxKind::LBrace => {
                    depth += 1;
                    self.bump();
                }
                SyntaxKind::RBrace => {
                    self.bump();
                    if depth <= 1 {
                        break;
                    }
                    depth -= 1;
                }
                SyntaxKind::ImportKw | SyntaxKind::PackageKw if depth == 0 && !first => break,
                _ if depth == 0
                    && !first
                    && place(
                        Enclosing::CompilationUnit,
                        false,
                        scan_shape(self.tokens, self.pos).shape,
                    ) == Placement::TypeDeclaration =>
                {
                    break
                }
                _ => {
                    self.bump();
                }
            }
            first = false;
        }

        tracing::debug!(
            target: "husk.syntax",
            at = start.start,
            until = self.last_end,
            "discarded top-level construct"
        );
    }

    // --- type declarations ---

    fn parse_type_decl(&mut self, owner: TypeOwner) -> Option<TypeDecl> {
        let start = self.current_range().start;
        let modifiers = self.parse_modifiers();
        self.parse_type_decl_rest(modifiers, start, owner)
    }

    fn parse_type_decl_rest(
        &mut self,
        modifiers: Modifiers,
        start: usize,
        owner: TypeOwner,
    ) -> Option<TypeDecl> {
        let before = self.completion.is_some();
        let kind = match self.current() {
            SyntaxKind::ClassKw => TypeKind::Class,
            SyntaxKind::InterfaceKw => TypeKind::Interface,
            SyntaxKind::EnumKw => TypeKind::Enum,
            SyntaxKind::RecordKw => TypeKind::Record,
            SyntaxKind::At if self.nth(1) == SyntaxKind::InterfaceKw => {
                self.bump();
                TypeKind::Annotation
            }
            _ => {
                self.error_here("expected type declaration");
                return None;
            }
        };
        self.bump();

        let mut header_ok = true;
        let mut clauses_ok = true;

        let name = if self.at_ident_like() {
            let tok = self.bump();
            self.text(tok).to_string()
        } else {
            self.error_here("expected type name");
            header_ok = false;
            String::new()
        };

        let mut decl = TypeDecl::new(kind, modifiers, name, start);
        if self.at(SyntaxKind::Less) {
            decl.type_params = self.parse_type_parameters();
        }
        if kind == TypeKind::Record {
            if self.at(SyntaxKind::LParen) {
                decl.record_components = self.parse_parameter_list();
            } else {
                self.error_here("expected record components");
                clauses_ok = false;
            }
        }

        loop {
            match self.current() {
                SyntaxKind::ExtendsKw => {
                    self.bump();
                    if kind == TypeKind::Interface {
                        let (types, ok) = self.parse_type_list();
                        decl.interfaces.extend(types);
                        clauses_ok &= ok;
                    } else {
                        let errors = self.errors.len();
                        match self.parse_type() {
                            Some(ty) => {
                                decl.superclass = Some(ty);
                                clauses_ok &= self.errors.len() == errors;
                            }
                            None => {
                                self.error_here("expected superclass");
                                clauses_ok = false;
                            }
                        }
                    }
                }
                SyntaxKind::ImplementsKw => {
                    self.bump();
                    let (types, ok) = self.parse_type_list();
                    decl.interfaces.extend(types);
                    clauses_ok &= ok;
                }
                SyntaxKind::PermitsKw => {
                    self.bump();
                    let (_, ok) = self.parse_type_list();
                    clauses_ok &= ok;
                }
                _ => break,
            }
        }

        self.mark_context(before, || printer::type_header(&decl));

        let closed = if self.at(SyntaxKind::LBrace) {
            self.parse_type_body(&mut decl)
        } else {
            self.error_here("expected `{`");
            clauses_ok = false;
            if self.recover_to_type_body() {
                self.parse_type_body(&mut decl)
            } else {
                decl.span = Span::new(start, self.last_end.max(start));
                decl.body_span = Span::point(decl.span.end);
                decl.synthesize();
                false
            }
        };

        if !header_ok || (owner == TypeOwner::Local && (!clauses_ok || !closed)) {
            tracing::debug!(
                target: "husk.syntax",
                at = start,
                ?owner,
                closed,
                "discarding incomplete type declaration"
            );
            return None;
        }
        Some(decl)
    }

    /// Comma-separated types. The flag is false when the list ended on
    /// something that is not a type or a type was malformed; the valid
    /// prefix is still returned.
    fn parse_type_list(&mut self) -> (Vec<TypeRef>, bool) {
        let errors = self.errors.len();
        let mut types = Vec::new();
        loop {
            match self.parse_type() {
                Some(ty) => types.push(ty),
                None => {
                    self.error_here("expected type");
                    return (types, false);
                }
            }
            if !self.eat(SyntaxKind::Comma) {
                return (types, self.errors.len() == errors);
            }
        }
    }

    /// Skip junk in a type header up to its `{`. Gives up at anything that
    /// looks like the start of the body's contents.
    fn recover_to_type_body(&mut self) -> bool {
        loop {
            match self.current() {
                SyntaxKind::LBrace => return true,
                SyntaxKind::RBrace | SyntaxKind::Eof | SyntaxKind::Semicolon | SyntaxKind::At => {
                    return false
                }
                SyntaxKind::VoidKw => return false,
                kind if kind.is_modifier() || kind.is_primitive_type() => return false,
                _ => {
                    self.bump();
                }
            }
        }
    }

    /// Parse `{ members }`. Returns whether the closing brace was found.
    fn parse_type_body(&mut self, decl: &mut TypeDecl) -> bool {
        let open = self.bump();
        let type_name = decl.name.clone();
        let mut closed = false;

        if decl.kind == TypeKind::Enum {
            decl.enum_constants = self.parse_enum_constants();
        }

        let body_end = loop {
            match self.current() {
                SyntaxKind::RBrace => {
                    let close = self.bump();
                    closed = true;
                    break close.range.start;
                }
                SyntaxKind::Eof => {
                    self.error_here("expected `}` to close type body");
                    break self.eof_offset;
                }
                SyntaxKind::Semicolon => {
                    self.bump();
                }
                _ => {
                    let before = self.pos;
                    let errors = self.errors.len();
                    let members = self.parse_member(decl.kind, &type_name);
                    decl.members.extend(members);
                    if self.pos == before {
                        if self.errors.len() == errors {
                            self.error_here("unexpected token in type body");
                        }
                        self.bump();
                    }
                }
            }
        };

        decl.body_span = Span::new(open.range.end, body_end.max(open.range.end));
        decl.span = Span::new(decl.span.start, self.last_end.max(decl.span.start));
        decl.synthesize();
        closed
    }

    fn parse_enum_constants(&mut self) -> Vec<EnumConstant> {
        let mut constants = Vec::new();
        loop {
            match self.current() {
                SyntaxKind::Semicolon => {
                    self.bump();
                    break;
                }
                SyntaxKind::RBrace | SyntaxKind::Eof => break,
                _ => {}
            }

            let start = self.current_range().start;
            let mut annotations = Vec::new();
            while self.at(SyntaxKind::At) {
                match self.parse_annotation() {
                    Some(annotation) => annotations.push(annotation),
                    None => break,
                }
            }
            let is_constant = self.at_ident_like()
                && matches!(
                    self.nth(1),
                    SyntaxKind::LParen
                        | SyntaxKind::Comma
                        | SyntaxKind::Semicolon
                        | SyntaxKind::LBrace
                        | SyntaxKind::RBrace
                        | SyntaxKind::Eof
                );
            if !is_constant {
                if !annotations.is_empty() {
                    self.error_here("expected enum constant");
                }
                break;
            }

            let name_tok = self.bump();
            let name = self.text(name_tok).to_string();
            let args = self.at(SyntaxKind::LParen).then(|| self.parse_arguments());
            let body = if self.at(SyntaxKind::LBrace) {
                let mut body = TypeDecl::new(
                    TypeKind::Class,
                    Modifiers::default(),
                    String::new(),
                    self.current_range().start,
                );
                self.parse_type_body(&mut body).then(|| Box::new(body))
            } else {
                None
            };
            constants.push(EnumConstant {
                annotations,
                name,
                args,
                body,
                span: Span::new(start, self.last_end),
            });

            if !self.eat(SyntaxKind::Comma) {
                self.eat(SyntaxKind::Semicolon);
                break;
            }
        }
        constants
    }

    // --- members ---

    fn parse_member(&mut self, owner: TypeKind, type_name: &str) -> Vec<Member> {
        let start = self.current_range().start;
        let scan = scan_shape(self.tokens, self.pos);
        let modifiers = self.parse_modifiers();

        if self.at(SyntaxKind::LBrace) {
            let is_static = modifiers.has(Modifier::Static);
            let body = self.parse_body(FrameKind::InitializerBody);
            return vec![Member::Initializer(Initializer {
                is_static,
                body,
                span: Span::new(start, self.last_end),
            })];
        }

        if self.at_trailing_type_completion(scan.after_modifiers) {
            return self
                .parse_fields(modifiers, start)
                .into_iter()
                .map(Member::Field)
                .collect();
        }

        if self.at_compact_constructor(owner, type_name) {
            return vec![Member::Method(self.parse_compact_constructor(modifiers, start))];
        }

        match place(Enclosing::TypeBody, scan.has_member_modifier, scan.shape) {
            Placement::TypeDeclaration => self
                .parse_type_decl_rest(modifiers, start, TypeOwner::Member)
                .map(Member::Type)
                .into_iter()
                .collect(),
            Placement::Method | Placement::Constructor => self
                .parse_method(modifiers, start, owner, type_name)
                .map(Member::Method)
                .into_iter()
                .collect(),
            Placement::Field | Placement::LocalVariable => self
                .parse_fields(modifiers, start)
                .into_iter()
                .map(Member::Field)
                .collect(),
            Placement::LocalType | Placement::Statement | Placement::Discard => {
                self.error_here("unexpected statement in type body");
                self.discard_member();
                Vec::new()
            }
        }
    }

    /// Whether everything from `from` to the end of input is a type prefix
    /// ending at the completion token (`public java.util.Li|`).
    fn at_trailing_type_completion(&self, from: usize) -> bool {
        let rest = self.tokens.get(from..).unwrap_or_default();
        rest.last().map_or(false, |t| t.kind == SyntaxKind::Completion)
            && rest.iter().all(|t| {
                t.kind.is_identifier_like()
                    || t.kind.is_primitive_type()
                    || matches!(
                        t.kind,
                        SyntaxKind::Dot
                            | SyntaxKind::Less
                            | SyntaxKind::Greater
                            | SyntaxKind::RightShift
                            | SyntaxKind::Comma
                            | SyntaxKind::Question
                            | SyntaxKind::ExtendsKw
                            | SyntaxKind::SuperKw
                            | SyntaxKind::Amp
                            | SyntaxKind::LBracket
                            | SyntaxKind::RBracket
                    )
            })
    }

    /// Skip a construct that cannot be represented: up to and including its
    /// `;`, or over one balanced brace block.
    fn discard_member(&mut self) {
        let start = self.current_range();
        let mut depth = 0usize;
        loop {
            match self.current() {
                SyntaxKind::Eof => break,
                SyntaxKind::Semicolon if depth == 0 => {
                    self.bump();
                    break;
                }
                SyntaxKind::LBrace => {
                    depth += 1;
                    self.bump();
                }
                SyntaxKind::RBrace => {
                    if depth == 0 {
                        break;
                    }
                    self.bump();
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                _ => {
                    self.bump();
                }
            }
        }
        tracing::debug!(
            target: "husk.syntax",
            at = start.start,
            until = self.last_end,
            "discarded construct that cannot be a member"
        );
    }

    /// `Name {` naming the enclosing record.
    fn at_compact_constructor(&self, owner: TypeKind, type_name: &str) -> bool {
        owner == TypeKind::Record
            && self.at_ident_like()
            && self.nth(1) == SyntaxKind::LBrace
            && self
                .tokens
                .get(self.pos)
                .map_or(false, |&tok| self.text(tok) == type_name)
    }

    /// The canonical record constructor written without a parameter list.
    fn parse_compact_constructor(&mut self, modifiers: Modifiers, start: usize) -> MethodDecl {
        let name_tok = self.bump();
        let mut method = MethodDecl {
            modifiers,
            type_params: Vec::new(),
            return_type: None,
            name: self.text(name_tok).to_string(),
            params: Vec::new(),
            throws: Vec::new(),
            is_constructor: true,
            is_compact: true,
            body: None,
            span: Span::point(start),
        };
        method.body = Some(self.parse_body(FrameKind::MethodBody));
        method.span = Span::new(start, self.last_end.max(start));
        method
    }

    fn parse_method(
        &mut self,
        modifiers: Modifiers,
        start: usize,
        owner: TypeKind,
        type_name: &str,
    ) -> Option<MethodDecl> {
        let before = self.completion.is_some();
        let type_params = if self.at(SyntaxKind::Less) {
            self.parse_type_parameters()
        } else {
            Vec::new()
        };

        let return_type = if self.at_ident_like() && self.nth(1) == SyntaxKind::LParen {
            None
        } else if self.at(SyntaxKind::VoidKw) {
            self.bump();
            Some(TypeRef::Primitive {
                name: "void".to_string(),
                dims: 0,
            })
        } else {
            match self.parse_type() {
                Some(ty) => Some(ty),
                None => {
                    self.error_here("expected return type");
                    self.discard_member();
                    return None;
                }
            }
        };

        if !self.at_ident_like() {
            self.error_here("expected method name");
            self.discard_member();
            return None;
        }
        let name_tok = self.bump();
        let name = self.text(name_tok).to_string();
        if !self.at(SyntaxKind::LParen) {
            self.error_here("expected `(`");
            self.discard_member();
            return None;
        }
        let params = self.parse_parameter_list();

        let mut extra_dims = 0;
        while self.at(SyntaxKind::LBracket) && self.nth(1) == SyntaxKind::RBracket {
            self.bump();
            self.bump();
            extra_dims += 1;
        }
        let return_type = return_type.map(|ty| ty.with_extra_dims(extra_dims));

        let throws = if self.eat(SyntaxKind::ThrowsKw) {
            self.parse_type_list().0
        } else {
            Vec::new()
        };

        // Annotation element default value.
        if self.eat(SyntaxKind::DefaultKw) {
            if self.at(SyntaxKind::LBrace) {
                self.parse_array_initializer();
            } else {
                self.parse_expression(0);
            }
        }

        // Any member without a return type is read as a constructor, so the
        // default constructor and the implicit `super();` agree.
        let is_constructor = return_type.is_none();
        if is_constructor && name != type_name {
            self.errors.push(ParseError {
                message: "return type for the method is missing".to_string(),
                range: name_tok.range,
            });
        }
        let mut method = MethodDecl {
            modifiers,
            type_params,
            return_type,
            name,
            params,
            throws,
            is_constructor,
            is_compact: false,
            body: None,
            span: Span::point(start),
        };
        self.mark_context(before, || printer::method_header(&method));

        method.body = match self.current() {
            SyntaxKind::LBrace => Some(self.parse_body(FrameKind::MethodBody)),
            SyntaxKind::Semicolon => {
                self.bump();
                None
            }
            _ => {
                self.error_here("expected `{` or `;` after method header");
                let bodiless = method.modifiers.has(Modifier::Abstract)
                    || method.modifiers.has(Modifier::Native)
                    || (matches!(owner, TypeKind::Interface | TypeKind::Annotation)
                        && !method.modifiers.has(Modifier::Default)
                        && !method.modifiers.has(Modifier::Static)
                        && !method.modifiers.has(Modifier::Private));
                (!bodiless).then(|| self.empty_body())
            }
        };
        method.span = Span::new(start, self.last_end.max(start));
        Some(method)
    }

    /// `( params )`. Trailing incomplete parameters are dropped; a parameter
    /// whose type is a completion node is kept without a name.
    fn parse_parameter_list(&mut self) -> Vec<Param> {
        self.bump();
        let mut params = Vec::new();
        if self.eat(SyntaxKind::RParen) {
            return params;
        }

        loop {
            let modifiers = self.parse_modifiers();
            let Some(ty) = self.parse_type() else {
                self.error_here("expected parameter type");
                break;
            };
            let varargs = self.eat(SyntaxKind::Ellipsis);
            let (ty, name) = if self.at_ident_like() || self.at(SyntaxKind::ThisKw) {
                let tok = self.bump();
                let mut dims = 0;
                while self.at(SyntaxKind::LBracket) && self.nth(1) == SyntaxKind::RBracket {
                    self.bump();
                    self.bump();
                    dims += 1;
                }
                (ty.with_extra_dims(dims), self.text(tok).to_string())
            } else if ty.is_completion() {
                (ty, String::new())
            } else {
                self.error_here("expected parameter name");
                break;
            };
            params.push(Param {
                modifiers,
                ty,
                name,
                varargs,
            });
            if !self.eat(SyntaxKind::Comma) {
                break;
            }
        }

        if !self.eat(SyntaxKind::RParen) {
            self.error_here("expected `)` to close parameter list");
            while !matches!(
                self.current(),
                SyntaxKind::LBrace
                    | SyntaxKind::RBrace
                    | SyntaxKind::Semicolon
                    | SyntaxKind::ThrowsKw
                    | SyntaxKind::Eof
            ) {
                if self.bump().kind == SyntaxKind::RParen {
                    break;
                }
            }
        }
        params
    }

    /// One field per declarator. A missing `;` is reported but the fields
    /// are kept.
    fn parse_fields(&mut self, modifiers: Modifiers, start: usize) -> Vec<FieldDecl> {
        let before = self.completion.is_some();
        let Some(ty) = self.parse_type() else {
            self.error_here("expected field type");
            self.discard_member();
            return Vec::new();
        };

        let mut fields = Vec::new();
        loop {
            if !self.at_ident_like() {
                if ty.is_completion() {
                    fields.push(FieldDecl {
                        modifiers: modifiers.clone(),
                        ty: ty.clone(),
                        name: String::new(),
                        initializer: None,
                        span: Span::new(start, self.last_end),
                    });
                } else {
                    self.error_here("expected field name");
                }
                break;
            }
            let name_tok = self.bump();
            let name = self.text(name_tok).to_string();
            let dims = self.parse_extra_dims();
            let initializer = if self.eat(SyntaxKind::Eq) {
                self.parse_variable_initializer()
            } else {
                None
            };
            fields.push(FieldDecl {
                modifiers: modifiers.clone(),
                ty: ty.clone().with_extra_dims(dims),
                name,
                initializer,
                span: Span::new(start, self.last_end),
            });
            if !self.eat(SyntaxKind::Comma) {
                break;
            }
        }

        if !self.eat(SyntaxKind::Semicolon) {
            self.error_here("expected `;` after field declaration");
        }
        if let Some(last) = fields.last() {
            self.mark_context(before, || printer::field_context(last));
        }
        fields
    }

    fn parse_extra_dims(&mut self) -> usize {
        let mut dims = 0;
        while self.at(SyntaxKind::LBracket) && self.nth(1) == SyntaxKind::RBracket {
            self.bump();
            self.bump();
            dims += 1;
        }
        dims
    }

    /// Initializer of a field or local. Dropped when it ran into an
    /// unterminated string or array initializer, unless the cursor is in it.
    fn parse_variable_initializer(&mut self) -> Option<Expr> {
        let saved = std::mem::replace(&mut self.poisoned, false);
        let had_completion = self.completion.is_some();
        let expr = if self.at(SyntaxKind::LBrace) {
            Expr::ArrayInit(self.parse_array_initializer())
        } else {
            self.parse_expression(0)
        };
        let poisoned = std::mem::replace(&mut self.poisoned, saved);
        if poisoned && (had_completion || self.completion.is_none()) {
            tracing::debug!(
                target: "husk.syntax",
                at = self.last_end,
                "dropping unterminated initializer"
            );
            return None;
        }
        Some(expr)
    }

    // --- bodies ---

    /// Parse or elide the body whose `{` is the current token.
    pub(crate) fn parse_body(&mut self, kind: FrameKind) -> Body {
        let open = self.pos;
        let open_tok = self.bump();
        let skim = skim_body(self.tokens, open, kind);

        let span_end = match skim.how {
            SkimEnd::EndOfInput => self.eof_offset,
            SkimEnd::Closed | SkimEnd::MemberBoundary => self
                .tokens
                .get(skim.end)
                .map_or(self.eof_offset, |t| t.range.start),
        };
        let span = Span::new(open_tok.range.end, span_end.max(open_tok.range.end));
        let tokens = self.tokens;
        let inner = &tokens[(open + 1).min(skim.end)..skim.end];

        let parse = match self.mode {
            BodyMode::Elide => false,
            BodyMode::Parse => true,
            BodyMode::Completion => inner.iter().any(|t| t.kind == SyntaxKind::Completion),
        };
        let body = if parse {
            tracing::trace!(target: "husk.syntax", start = span.start, end = span.end, "parsing body");
            let unclosed = skim.how != SkimEnd::Closed;
            Body::Parsed(self.parse_nested_block(inner, span, unclosed))
        } else {
            Body::Elided(span)
        };

        self.pos = skim.end;
        match skim.how {
            SkimEnd::Closed => {
                self.bump();
            }
            SkimEnd::MemberBoundary => self.errors.push(ParseError {
                message: "expected `}` before member declaration".to_string(),
                range: Span::point(span_end),
            }),
            SkimEnd::EndOfInput => self.errors.push(ParseError {
                message: "expected `}` to close body".to_string(),
                range: Span::point(span_end),
            }),
        }
        body
    }

    fn parse_nested_block(&mut self, tokens: &[Token], span: Span, unclosed: bool) -> Block {
        let mut nested =
            Parser::new(self.source, tokens, self.mode, span.end).with_unclosed(unclosed);
        let statements = nested.parse_block_statements();
        let output = nested.finish();
        self.errors.extend(output.errors);
        if self.completion.is_none() {
            self.completion = output.completion;
        }
        if self.context.is_none() {
            self.context = output.context;
        }
        Block { statements, span }
    }

    /// The body of a method whose `{` is missing.
    fn empty_body(&self) -> Body {
        let span = Span::point(self.last_end);
        match self.mode {
            BodyMode::Parse => Body::Parsed(Block {
                statements: Vec::new(),
                span,
            }),
            BodyMode::Elide | BodyMode::Completion => Body::Elided(span),
        }
    }

    // --- types ---

    pub(crate) fn parse_type(&mut self) -> Option<TypeRef> {
        self.parse_type_inner(true)
    }

    /// A type reference; `dims` controls whether trailing `[]` are consumed.
    /// Returns `None` without consuming anything when no type starts here.
    fn parse_type_inner(&mut self, dims: bool) -> Option<TypeRef> {
        while self.at(SyntaxKind::At) && self.nth(1) != SyntaxKind::InterfaceKw {
            if self.parse_annotation().is_none() {
                return None;
            }
        }

        let kind = self.current();
        let ty = if kind.is_primitive_type() {
            let tok = self.bump();
            TypeRef::Primitive {
                name: self.text(tok).to_string(),
                dims: 0,
            }
        } else if kind.is_identifier_like() {
            let mut segments: Vec<TypeSegment> = Vec::new();
            loop {
                if self.at(SyntaxKind::Completion) {
                    let qualifier = (!segments.is_empty()).then(|| {
                        printer::type_ref(&TypeRef::Named {
                            segments: segments.clone(),
                            dims: 0,
                        })
                    });
                    let node = self.completion_node(CompletionKind::Type, qualifier);
                    return Some(TypeRef::Completion(node));
                }
                let tok = self.bump();
                let name = self.text(tok).to_string();
                let args = if self.at(SyntaxKind::Less) {
                    self.parse_type_arguments()
                } else {
                    None
                };
                segments.push(TypeSegment { name, args });

                if self.at(SyntaxKind::Dot) {
                    if self.nth(1).is_identifier_like() {
                        self.bump();
                        continue;
                    }
                    self.bump();
                    self.error_here("expected identifier after `.`");
                    return None;
                }
                break;
            }
            TypeRef::Named { segments, dims: 0 }
        } else {
            return None;
        };

        if !dims {
            return Some(ty);
        }
        let extra = self.parse_extra_dims();
        Some(ty.with_extra_dims(extra))
    }

    /// `<...>` after a type name or before a generic method name. `None` when
    /// the list is incomplete; the caller keeps the bare name.
    fn parse_type_arguments(&mut self) -> Option<Vec<TypeRef>> {
        self.bump();
        let mut args = Vec::new();
        if self.at_closing_gt() {
            self.bump_gt();
            return Some(args);
        }

        loop {
            let arg = if self.at(SyntaxKind::Question) {
                self.bump();
                let bound = if self.eat(SyntaxKind::ExtendsKw) {
                    self.parse_type().map(|ty| WildcardBound::Extends(Box::new(ty)))
                } else if self.eat(SyntaxKind::SuperKw) {
                    self.parse_type().map(|ty| WildcardBound::Super(Box::new(ty)))
                } else {
                    None
                };
                TypeRef::Wildcard { bound }
            } else {
                match self.parse_type() {
                    Some(ty) => ty,
                    None => {
                        self.error_here("expected type argument");
                        return None;
                    }
                }
            };
            args.push(arg);
            if !self.eat(SyntaxKind::Comma) {
                break;
            }
        }

        if self.at_closing_gt() {
            self.bump_gt();
            Some(args)
        } else {
            self.error_here("expected `>`");
            None
        }
    }

    fn parse_type_parameters(&mut self) -> Vec<TypeParam> {
        self.bump();
        let mut params = Vec::new();
        loop {
            while self.at(SyntaxKind::At) {
                if self.parse_annotation().is_none() {
                    break;
                }
            }
            if !self.at_ident_like() {
                self.error_here("expected type parameter");
                break;
            }
            let tok = self.bump();
            let name = self.text(tok).to_string();
            let mut bounds = Vec::new();
            if self.eat(SyntaxKind::ExtendsKw) {
                loop {
                    match self.parse_type() {
                        Some(ty) => bounds.push(ty),
                        None => {
                            self.error_here("expected bound");
                            break;
                        }
                    }
                    if !self.eat(SyntaxKind::Amp) {
                        break;
                    }
                }
            }
            params.push(TypeParam { name, bounds });
            if !self.eat(SyntaxKind::Comma) {
                break;
            }
        }

        if self.at_closing_gt() {
            self.bump_gt();
        } else {
            self.error_here("expected `>` to close type parameters");
        }
        params
    }

    // --- modifiers & annotations ---

    /// Mirrors the modifier loop of [`scan_shape`].
    fn parse_modifiers(&mut self) -> Modifiers {
        let mut modifiers = Modifiers::default();
        loop {
            let kind = self.current();
            match kind {
                SyntaxKind::SynchronizedKw if self.nth(1) == SyntaxKind::LParen => break,
                SyntaxKind::DefaultKw
                    if matches!(self.nth(1), SyntaxKind::Colon | SyntaxKind::Arrow) =>
                {
                    break
                }
                SyntaxKind::SealedKw | SyntaxKind::NonSealedKw => {
                    let next = self.nth(1);
                    if next.is_modifier()
                        || matches!(next, SyntaxKind::ClassKw | SyntaxKind::InterfaceKw)
                    {
                        self.bump();
                        modifiers.keywords.push(if kind == SyntaxKind::SealedKw {
                            Modifier::Sealed
                        } else {
                            Modifier::NonSealed
                        });
                    } else {
                        break;
                    }
                }
                SyntaxKind::At if self.nth(1) != SyntaxKind::InterfaceKw => {
                    match self.parse_annotation() {
                        Some(annotation) => modifiers.annotations.push(annotation),
                        None => break,
                    }
                }
                _ => match modifier_keyword(kind) {
                    Some(modifier) => {
                        self.bump();
                        modifiers.keywords.push(modifier);
                    }
                    None => break,
                },
            }
        }
        modifiers
    }

    fn parse_annotation(&mut self) -> Option<Annotation> {
        self.bump();
        if !self.at_ident_like() {
            self.error_here("expected annotation name");
            return None;
        }

        let mut segments: Vec<TypeSegment> = Vec::new();
        let name = loop {
            if self.at(SyntaxKind::Completion) {
                let qualifier = (!segments.is_empty()).then(|| {
                    printer::type_ref(&TypeRef::Named {
                        segments: segments.clone(),
                        dims: 0,
                    })
                });
                let node = self.completion_node(CompletionKind::Type, qualifier);
                break TypeRef::Completion(node);
            }
            let tok = self.bump();
            segments.push(TypeSegment {
                name: self.text(tok).to_string(),
                args: None,
            });
            if self.at(SyntaxKind::Dot) && self.nth(1).is_identifier_like() {
                self.bump();
                continue;
            }
            break TypeRef::Named { segments, dims: 0 };
        };

        let args = if self.at(SyntaxKind::LParen) {
            Some(self.parse_annotation_arguments())
        } else {
            None
        };
        Some(Annotation { name, args })
    }

    fn parse_annotation_arguments(&mut self) -> Vec<Expr> {
        self.bump();
        let mut args = Vec::new();
        while !matches!(self.current(), SyntaxKind::RParen | SyntaxKind::Eof) {
            let before = self.pos;
            let arg = if self.at(SyntaxKind::LBrace) {
                Expr::ArrayInit(self.parse_array_initializer())
            } else if self.at_ident_like()
                && self.nth(1) == SyntaxKind::Eq
                && self.nth(2) == SyntaxKind::LBrace
            {
                let name = self.bump();
                let target = Expr::Name(self.text(name).to_string());
                self.bump();
                Expr::Assign {
                    op: "=".to_string(),
                    target: Box::new(target),
                    value: Box::new(Expr::ArrayInit(self.parse_array_initializer())),
                }
            } else {
                self.parse_expression(0)
            };
            if self.pos == before {
                break;
            }
            args.push(arg);
            if !self.eat(SyntaxKind::Comma) {
                break;
            }
        }
        self.expect(SyntaxKind::RParen, "expected `)` to close annotation");
        args
    }

    // --- completion bookkeeping ---

    /// Consume the completion token and record the node built from it.
    fn completion_node(&mut self, kind: CompletionKind, qualifier: Option<String>) -> CompletionNode {
        let tok = self.bump();
        let node = CompletionNode::new(kind, qualifier, self.text(tok));
        if self.completion.is_none() {
            self.completion = Some(node.clone());
        }
        node
    }

    /// Record `render()` as the completion context if the node was produced
    /// since `before` was sampled and no inner construct claimed it.
    fn mark_context(&mut self, before: bool, render: impl FnOnce() -> String) {
        if !before && self.completion.is_some() && self.context.is_none() {
            self.context = Some(render());
        }
    }

    // --- token cursor ---

    fn nth(&self, n: usize) -> SyntaxKind {
        if n == 0 && self.gt_remaining > 0 {
            return SyntaxKind::Greater;
        }
        self.tokens
            .get(self.pos + n)
            .map_or(SyntaxKind::Eof, |t| t.kind)
    }

    fn current(&self) -> SyntaxKind {
        self.nth(0)
    }

    fn at(&self, kind: SyntaxKind) -> bool {
        self.current() == kind
    }

    fn at_ident_like(&self) -> bool {
        self.current().is_identifier_like()
    }

    fn at_closing_gt(&self) -> bool {
        matches!(
            self.current(),
            SyntaxKind::Greater | SyntaxKind::RightShift | SyntaxKind::UnsignedRightShift
        )
    }

    /// Consume a single `>`, splitting `>>` and `>>>` as needed.
    fn bump_gt(&mut self) {
        if self.gt_remaining == 0 {
            match self.current() {
                SyntaxKind::RightShift => self.gt_remaining = 2,
                SyntaxKind::UnsignedRightShift => self.gt_remaining = 3,
                _ => {}
            }
        }
        self.bump();
    }

    fn bump(&mut self) -> Token {
        let Some(tok) = self.tokens.get(self.pos).copied() else {
            return Token {
                kind: SyntaxKind::Eof,
                range: Span::point(self.eof_offset),
            };
        };
        self.last_end = tok.range.end;
        if self.gt_remaining > 0 {
            self.gt_remaining -= 1;
            if self.gt_remaining == 0 {
                self.pos += 1;
            }
            return Token {
                kind: SyntaxKind::Greater,
                range: tok.range,
            };
        }
        self.pos += 1;
        tok
    }

    fn eat(&mut self, kind: SyntaxKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: SyntaxKind, message: &str) -> bool {
        if self.eat(kind) {
            true
        } else {
            self.error_here(message);
            false
        }
    }

    fn error_here(&mut self, message: &str) {
        let range = self.current_range();
        self.errors.push(ParseError {
            message: message.to_string(),
            range,
        });
    }

    fn current_range(&self) -> Span {
        self.tokens
            .get(self.pos)
            .map_or(Span::point(self.eof_offset), |t| t.range)
    }

    fn text(&self, tok: Token) -> &'t str {
        if tok.kind == SyntaxKind::Greater && self.source.get(tok.range.start..tok.range.end) != Some(">") {
            return ">";
        }
        tok.text(self.source)
    }
}

fn modifier_keyword(kind: SyntaxKind) -> Option<Modifier> {
    Some(match kind {
        SyntaxKind::PublicKw => Modifier::Public,
        SyntaxKind::ProtectedKw => Modifier::Protected,
        SyntaxKind::PrivateKw => Modifier::Private,
        SyntaxKind::AbstractKw => Modifier::Abstract,
        SyntaxKind::StaticKw => Modifier::Static,
        SyntaxKind::FinalKw => Modifier::Final,
        SyntaxKind::TransientKw => Modifier::Transient,
        SyntaxKind::VolatileKw => Modifier::Volatile,
        SyntaxKind::SynchronizedKw => Modifier::Synchronized,
        SyntaxKind::NativeKw => Modifier::Native,
        SyntaxKind::StrictfpKw => Modifier::Strictfp,
        SyntaxKind::DefaultKw => Modifier::Default,
        _ => return None,
    })
}
