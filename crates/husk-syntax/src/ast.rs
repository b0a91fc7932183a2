//! Structural syntax tree.
//!
//! The tree is deliberately shallow: declarations are modelled precisely, while
//! statements and expressions keep just enough structure to be rendered back
//! canonically. Body contents are either elided (only their span is kept) or
//! parsed, depending on the parse mode.

use husk_core::Span;
use serde::Serialize;

use crate::CompletionNode;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompilationUnit {
    pub package: Option<PackageDecl>,
    pub imports: Vec<ImportDecl>,
    pub types: Vec<TypeDecl>,
    /// Whether bodies were populated (full parse or a body pass).
    pub bodies_parsed: bool,
}

impl CompilationUnit {
    /// A unit with nothing representable in it.
    pub fn is_empty(&self) -> bool {
        self.package.is_none() && self.imports.is_empty() && self.types.is_empty()
    }

    /// All type declarations reachable from the unit, outer types first.
    ///
    /// Local and anonymous types inside parsed bodies are not included.
    pub fn all_types(&self) -> Vec<&TypeDecl> {
        fn collect<'a>(ty: &'a TypeDecl, out: &mut Vec<&'a TypeDecl>) {
            out.push(ty);
            for member in &ty.members {
                if let Member::Type(nested) = member {
                    collect(nested, out);
                }
            }
        }

        let mut out = Vec::new();
        for ty in &self.types {
            collect(ty, &mut out);
        }
        out
    }
}

/// A dotted name, or a completion node standing in for one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Name {
    Path(String),
    Completion(CompletionNode),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageDecl {
    pub name: Name,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportDecl {
    pub name: Name,
    pub is_static: bool,
    pub is_star: bool,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TypeKind {
    Class,
    Interface,
    Enum,
    Record,
    Annotation,
}

impl TypeKind {
    pub fn keyword(self) -> &'static str {
        match self {
            TypeKind::Class => "class",
            TypeKind::Interface => "interface",
            TypeKind::Enum => "enum",
            TypeKind::Record => "record",
            TypeKind::Annotation => "@interface",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeDecl {
    pub kind: TypeKind,
    pub modifiers: Modifiers,
    /// Empty for anonymous classes.
    pub name: String,
    pub type_params: Vec<TypeParam>,
    pub record_components: Vec<Param>,
    pub superclass: Option<TypeRef>,
    pub interfaces: Vec<TypeRef>,
    pub enum_constants: Vec<EnumConstant>,
    pub members: Vec<Member>,
    pub has_default_constructor: bool,
    pub has_clinit: bool,
    pub span: Span,
    /// Text between the braces; runs to the end of input when unterminated.
    pub body_span: Span,
}

impl TypeDecl {
    pub(crate) fn new(kind: TypeKind, modifiers: Modifiers, name: String, start: usize) -> Self {
        TypeDecl {
            kind,
            modifiers,
            name,
            type_params: Vec::new(),
            record_components: Vec::new(),
            superclass: None,
            interfaces: Vec::new(),
            enum_constants: Vec::new(),
            members: Vec::new(),
            has_default_constructor: false,
            has_clinit: false,
            span: Span::point(start),
            body_span: Span::point(start),
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.name.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldDecl> {
        self.members.iter().filter_map(|m| match m {
            Member::Field(field) => Some(field),
            _ => None,
        })
    }

    pub fn methods(&self) -> impl Iterator<Item = &MethodDecl> {
        self.members.iter().filter_map(|m| match m {
            Member::Method(method) => Some(method),
            _ => None,
        })
    }

    pub fn member_types(&self) -> impl Iterator<Item = &TypeDecl> {
        self.members.iter().filter_map(|m| match m {
            Member::Type(ty) => Some(ty),
            _ => None,
        })
    }

    /// Any declared constructor suppresses the synthesized default one.
    pub fn has_constructor_candidate(&self) -> bool {
        self.methods().any(|m| m.is_constructor)
    }

    /// Fill in the synthesized flags once the body has been read.
    pub(crate) fn synthesize(&mut self) {
        self.has_default_constructor = matches!(self.kind, TypeKind::Class | TypeKind::Enum)
            && !self.is_anonymous()
            && !self.has_constructor_candidate();

        self.has_clinit = match self.kind {
            TypeKind::Enum => true,
            TypeKind::Interface | TypeKind::Annotation => {
                self.fields().any(|f| f.initializer.is_some())
            }
            TypeKind::Class | TypeKind::Record => self.members.iter().any(|m| match m {
                Member::Initializer(init) => init.is_static,
                Member::Field(field) => field.modifiers.has(Modifier::Static) && field.initializer.is_some(),
                _ => false,
            }),
        };
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Member {
    Field(FieldDecl),
    Method(MethodDecl),
    Initializer(Initializer),
    Type(TypeDecl),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnumConstant {
    pub annotations: Vec<Annotation>,
    pub name: String,
    pub args: Option<Vec<Expr>>,
    pub body: Option<Box<TypeDecl>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDecl {
    pub modifiers: Modifiers,
    pub ty: TypeRef,
    pub name: String,
    pub initializer: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodDecl {
    pub modifiers: Modifiers,
    pub type_params: Vec<TypeParam>,
    /// `None` exactly when `is_constructor` is set.
    pub return_type: Option<TypeRef>,
    pub name: String,
    pub params: Vec<Param>,
    pub throws: Vec<TypeRef>,
    pub is_constructor: bool,
    /// A record's compact canonical constructor, written `Name { ... }`.
    pub is_compact: bool,
    /// `None` for abstract and native methods.
    pub body: Option<Body>,
    pub span: Span,
}

impl MethodDecl {
    /// The explicit `this(...)` / `super(...)` call opening a parsed
    /// constructor body.
    pub fn explicit_constructor_call(&self) -> Option<&Stmt> {
        match &self.body {
            Some(Body::Parsed(block)) => block
                .statements
                .first()
                .filter(|stmt| matches!(stmt, Stmt::ConstructorCall { .. })),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Param {
    pub modifiers: Modifiers,
    pub ty: TypeRef,
    /// Empty when only the type could be read (completion on a parameter type).
    pub name: String,
    pub varargs: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Initializer {
    pub is_static: bool,
    pub body: Body,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Body {
    /// Not parsed; the span covers the text between the braces.
    Elided(Span),
    Parsed(Block),
}

impl Body {
    pub fn is_elided(&self) -> bool {
        matches!(self, Body::Elided(_))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Block {
    pub statements: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeParam {
    pub name: String,
    pub bounds: Vec<TypeRef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Modifier {
    Public,
    Protected,
    Private,
    Abstract,
    Static,
    Final,
    Transient,
    Volatile,
    Synchronized,
    Native,
    Strictfp,
    Default,
    Sealed,
    NonSealed,
}

impl Modifier {
    pub fn as_str(self) -> &'static str {
        match self {
            Modifier::Public => "public",
            Modifier::Protected => "protected",
            Modifier::Private => "private",
            Modifier::Abstract => "abstract",
            Modifier::Static => "static",
            Modifier::Final => "final",
            Modifier::Transient => "transient",
            Modifier::Volatile => "volatile",
            Modifier::Synchronized => "synchronized",
            Modifier::Native => "native",
            Modifier::Strictfp => "strictfp",
            Modifier::Default => "default",
            Modifier::Sealed => "sealed",
            Modifier::NonSealed => "non-sealed",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Modifiers {
    pub annotations: Vec<Annotation>,
    pub keywords: Vec<Modifier>,
}

impl Modifiers {
    pub fn has(&self, modifier: Modifier) -> bool {
        self.keywords.contains(&modifier)
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty() && self.keywords.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Annotation {
    pub name: TypeRef,
    /// `None` for marker annotations written without parentheses.
    pub args: Option<Vec<Expr>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TypeRef {
    Primitive { name: String, dims: usize },
    Named { segments: Vec<TypeSegment>, dims: usize },
    Wildcard { bound: Option<WildcardBound> },
    Completion(CompletionNode),
}

impl TypeRef {
    pub(crate) fn with_extra_dims(self, extra: usize) -> TypeRef {
        match self {
            TypeRef::Primitive { name, dims } => TypeRef::Primitive {
                name,
                dims: dims + extra,
            },
            TypeRef::Named { segments, dims } => TypeRef::Named {
                segments,
                dims: dims + extra,
            },
            other => other,
        }
    }

    pub fn is_completion(&self) -> bool {
        matches!(self, TypeRef::Completion(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeSegment {
    pub name: String,
    /// `Some(vec![])` is the diamond `<>`.
    pub args: Option<Vec<TypeRef>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum WildcardBound {
    Extends(Box<TypeRef>),
    Super(Box<TypeRef>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Stmt {
    Block(Block),
    LocalVar(LocalVar),
    LocalClass(Box<TypeDecl>),
    Expr(Expr),
    If {
        cond: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    While {
        cond: Expr,
        body: Box<Stmt>,
    },
    DoWhile {
        body: Box<Stmt>,
        cond: Expr,
    },
    For {
        init: Vec<Stmt>,
        cond: Option<Expr>,
        update: Vec<Expr>,
        body: Box<Stmt>,
    },
    ForEach {
        var: LocalVar,
        iterable: Expr,
        body: Box<Stmt>,
    },
    Labeled {
        label: String,
        body: Box<Stmt>,
    },
    Switch(Switch),
    Try {
        resources: Vec<Resource>,
        block: Block,
        catches: Vec<CatchClause>,
        finally: Option<Block>,
    },
    Synchronized {
        lock: Expr,
        block: Block,
    },
    Return(Option<Expr>),
    Throw(Expr),
    Break(Option<String>),
    Continue(Option<String>),
    Yield(Expr),
    Assert {
        cond: Expr,
        message: Option<Expr>,
    },
    ConstructorCall {
        kind: ConstructorCallKind,
        args: Vec<Expr>,
    },
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConstructorCallKind {
    This,
    Super,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalVar {
    pub modifiers: Modifiers,
    pub ty: TypeRef,
    pub name: String,
    pub initializer: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Resource {
    Decl(LocalVar),
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatchClause {
    pub modifiers: Modifiers,
    pub types: Vec<TypeRef>,
    pub name: String,
    pub block: Block,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Switch {
    pub selector: Box<Expr>,
    pub cases: Vec<SwitchCase>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwitchCase {
    /// Empty for `default`.
    pub labels: Vec<Expr>,
    pub arrow: bool,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Expr {
    Literal(String),
    /// A simple or qualified name (`a`, `a.b.c`).
    Name(String),
    This,
    Super,
    FieldAccess {
        receiver: Box<Expr>,
        name: String,
    },
    MethodCall {
        receiver: Option<Box<Expr>>,
        /// Explicit type arguments, as in `Collections.<String>emptyList()`.
        type_args: Vec<TypeRef>,
        name: String,
        args: Vec<Expr>,
    },
    New {
        ty: TypeRef,
        args: Vec<Expr>,
        body: Option<Box<TypeDecl>>,
    },
    NewArray {
        ty: TypeRef,
        dims: Vec<Option<Expr>>,
        init: Option<Vec<Expr>>,
    },
    ArrayInit(Vec<Expr>),
    ArrayAccess {
        array: Box<Expr>,
        index: Box<Expr>,
    },
    Unary {
        op: String,
        operand: Box<Expr>,
        postfix: bool,
    },
    Binary {
        op: String,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Assign {
        op: String,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    InstanceOf {
        expr: Box<Expr>,
        ty: TypeRef,
        binding: Option<String>,
    },
    Conditional {
        cond: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },
    Cast {
        ty: TypeRef,
        expr: Box<Expr>,
    },
    Paren(Box<Expr>),
    ClassLiteral(TypeRef),
    Lambda {
        params: Vec<LambdaParam>,
        body: LambdaBody,
    },
    MethodRef {
        receiver: Box<Expr>,
        name: String,
    },
    Switch(Box<Switch>),
    Completion(CompletionNode),
    /// Placeholder for an expression that could not be read.
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LambdaParam {
    pub ty: Option<TypeRef>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum LambdaBody {
    Expr(Box<Expr>),
    Block(Body),
}
