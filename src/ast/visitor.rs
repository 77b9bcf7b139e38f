use super::*;
use std::borrow::Cow;

/// Closed view over every AST node kind.
///
/// Passes that only care about a handful of node kinds match on this view
/// instead of overriding one visitor method per node type; every other node
/// is handled by the generic [`traverse`] walk.
#[derive(Debug, Clone, Copy)]
pub enum Node<'a> {
    Unit(&'a CompilationUnit),
    Package(&'a PackageDecl),
    Import(&'a ImportDecl),
    Class(&'a ClassDecl),
    Interface(&'a InterfaceDecl),
    TypeRef(&'a TypeRef),
    Field(&'a FieldDecl),
    Method(&'a MethodDecl),
    Constructor(&'a ConstructorDecl),
    Parameter(&'a Parameter),
    Block(&'a Block),
    Stmt(&'a Stmt),
    Expr(&'a Expr),
}

/// Token kind of a node, one per grammar construct
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    CompilationUnit,
    PackageDeclaration,
    ImportDeclaration,
    ClassDeclaration,
    InterfaceDeclaration,
    Type,
    FieldDeclaration,
    MethodDeclaration,
    ConstructorDeclaration,
    FormalParameter,
    Block,
    ExpressionStatement,
    LocalVariableDeclaration,
    IfStatement,
    WhileStatement,
    ForStatement,
    ReturnStatement,
    EmptyStatement,
    Literal,
    Name,
    This,
    BinaryExpression,
    UnaryExpression,
    Assignment,
    MethodInvocation,
    FieldAccess,
    ArrayAccess,
    CastExpression,
    InstanceOfExpression,
    ClassInstanceCreation,
    ArrayCreation,
}

impl<'a> Node<'a> {
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Unit(_) => NodeKind::CompilationUnit,
            Node::Package(_) => NodeKind::PackageDeclaration,
            Node::Import(_) => NodeKind::ImportDeclaration,
            Node::Class(_) => NodeKind::ClassDeclaration,
            Node::Interface(_) => NodeKind::InterfaceDeclaration,
            Node::TypeRef(_) => NodeKind::Type,
            Node::Field(_) => NodeKind::FieldDeclaration,
            Node::Method(_) => NodeKind::MethodDeclaration,
            Node::Constructor(_) => NodeKind::ConstructorDeclaration,
            Node::Parameter(_) => NodeKind::FormalParameter,
            Node::Block(_) => NodeKind::Block,
            Node::Stmt(s) => match s {
                Stmt::Expression(_) => NodeKind::ExpressionStatement,
                Stmt::LocalVar(_) => NodeKind::LocalVariableDeclaration,
                Stmt::If(_) => NodeKind::IfStatement,
                Stmt::While(_) => NodeKind::WhileStatement,
                Stmt::For(_) => NodeKind::ForStatement,
                Stmt::Return(_) => NodeKind::ReturnStatement,
                Stmt::Block(_) => NodeKind::Block,
                Stmt::Empty => NodeKind::EmptyStatement,
            },
            Node::Expr(e) => match e {
                Expr::Literal(_) => NodeKind::Literal,
                Expr::Name(_) => NodeKind::Name,
                Expr::This(_) => NodeKind::This,
                Expr::Binary(_) => NodeKind::BinaryExpression,
                Expr::Unary(_) => NodeKind::UnaryExpression,
                Expr::Assignment(_) => NodeKind::Assignment,
                Expr::MethodCall(_) => NodeKind::MethodInvocation,
                Expr::FieldAccess(_) => NodeKind::FieldAccess,
                Expr::ArrayAccess(_) => NodeKind::ArrayAccess,
                Expr::Cast(_) => NodeKind::CastExpression,
                Expr::InstanceOf(_) => NodeKind::InstanceOfExpression,
                Expr::New(_) => NodeKind::ClassInstanceCreation,
                Expr::NewArray(_) => NodeKind::ArrayCreation,
            },
        }
    }

    /// Lexical text carried by the node: identifiers, literal spelling,
    /// operator symbols. Empty for purely structural nodes.
    pub fn lexeme(&self) -> Cow<'a, str> {
        match *self {
            Node::Unit(_) => Cow::Borrowed(""),
            Node::Package(p) => Cow::Borrowed(&p.name),
            Node::Import(i) => Cow::Borrowed(&i.name),
            Node::Class(c) => Cow::Borrowed(&c.name),
            Node::Interface(i) => Cow::Borrowed(&i.name),
            Node::TypeRef(t) => Cow::Owned(t.to_string()),
            Node::Field(f) => Cow::Borrowed(&f.name),
            Node::Method(m) => Cow::Borrowed(&m.name),
            Node::Constructor(c) => Cow::Borrowed(&c.name),
            Node::Parameter(p) => Cow::Borrowed(&p.name),
            Node::Block(_) => Cow::Borrowed(""),
            Node::Stmt(s) => match s {
                Stmt::LocalVar(v) => Cow::Borrowed(&v.name),
                _ => Cow::Borrowed(""),
            },
            Node::Expr(e) => match e {
                Expr::Literal(l) => Cow::Owned(l.value.to_string()),
                Expr::Name(n) => Cow::Borrowed(&n.name),
                Expr::This(_) => Cow::Borrowed("this"),
                Expr::Binary(b) => Cow::Borrowed(b.operator.symbol()),
                Expr::Unary(u) => Cow::Owned(u.operator.to_string()),
                Expr::Assignment(_) => Cow::Borrowed("="),
                Expr::MethodCall(m) => Cow::Borrowed(&m.name),
                Expr::FieldAccess(f) => Cow::Borrowed(&f.name),
                _ => Cow::Borrowed(""),
            },
        }
    }

    /// Direct children in source order
    pub fn children(&self) -> Vec<Node<'a>> {
        let mut out = Vec::new();
        match *self {
            Node::Unit(u) => {
                if let Some(p) = &u.package_decl {
                    out.push(Node::Package(p));
                }
                out.extend(u.imports.iter().map(Node::Import));
                out.push(match &u.type_decl {
                    TypeDecl::Class(c) => Node::Class(c),
                    TypeDecl::Interface(i) => Node::Interface(i),
                });
            }
            Node::Package(_) | Node::Import(_) | Node::TypeRef(_) => {}
            Node::Class(c) => {
                if let Some(e) = &c.extends {
                    out.push(Node::TypeRef(e));
                }
                out.extend(c.implements.iter().map(Node::TypeRef));
                for member in &c.body {
                    out.push(match member {
                        ClassMember::Field(f) => Node::Field(f),
                        ClassMember::Method(m) => Node::Method(m),
                        ClassMember::Constructor(k) => Node::Constructor(k),
                    });
                }
            }
            Node::Interface(i) => {
                out.extend(i.extends.iter().map(Node::TypeRef));
                out.extend(i.body.iter().map(Node::Method));
            }
            Node::Field(f) => {
                out.push(Node::TypeRef(&f.type_ref));
                if let Some(init) = &f.initializer {
                    out.push(Node::Expr(init));
                }
            }
            Node::Method(m) => {
                if let Some(rt) = &m.return_type {
                    out.push(Node::TypeRef(rt));
                }
                out.extend(m.parameters.iter().map(Node::Parameter));
                if let Some(body) = &m.body {
                    out.push(Node::Block(body));
                }
            }
            Node::Constructor(c) => {
                out.extend(c.parameters.iter().map(Node::Parameter));
                out.push(Node::Block(&c.body));
            }
            Node::Parameter(p) => out.push(Node::TypeRef(&p.type_ref)),
            Node::Block(b) => out.extend(b.statements.iter().map(Node::Stmt)),
            Node::Stmt(s) => match s {
                Stmt::Expression(es) => out.push(Node::Expr(&es.expr)),
                Stmt::LocalVar(v) => {
                    out.push(Node::TypeRef(&v.type_ref));
                    out.push(Node::Expr(&v.initializer));
                }
                Stmt::If(i) => {
                    out.push(Node::Expr(&i.condition));
                    out.push(Node::Stmt(&i.then_branch));
                    if let Some(e) = &i.else_branch {
                        out.push(Node::Stmt(e));
                    }
                }
                Stmt::While(w) => {
                    out.push(Node::Expr(&w.condition));
                    out.push(Node::Stmt(&w.body));
                }
                Stmt::For(f) => {
                    if let Some(init) = &f.init {
                        out.push(Node::Stmt(init));
                    }
                    if let Some(c) = &f.condition {
                        out.push(Node::Expr(c));
                    }
                    if let Some(u) = &f.update {
                        out.push(Node::Expr(u));
                    }
                    out.push(Node::Stmt(&f.body));
                }
                Stmt::Return(r) => {
                    if let Some(v) = &r.value {
                        out.push(Node::Expr(v));
                    }
                }
                Stmt::Block(b) => out.extend(b.statements.iter().map(Node::Stmt)),
                Stmt::Empty => {}
            },
            Node::Expr(e) => match e {
                Expr::Literal(_) | Expr::Name(_) | Expr::This(_) => {}
                Expr::Binary(b) => {
                    out.push(Node::Expr(&b.left));
                    out.push(Node::Expr(&b.right));
                }
                Expr::Unary(u) => out.push(Node::Expr(&u.operand)),
                Expr::Assignment(a) => {
                    out.push(Node::Expr(&a.target));
                    out.push(Node::Expr(&a.value));
                }
                Expr::MethodCall(m) => {
                    if let Some(t) = &m.target {
                        out.push(Node::Expr(t));
                    }
                    out.extend(m.arguments.iter().map(Node::Expr));
                }
                Expr::FieldAccess(f) => out.push(Node::Expr(&f.target)),
                Expr::ArrayAccess(a) => {
                    out.push(Node::Expr(&a.array));
                    out.push(Node::Expr(&a.index));
                }
                Expr::Cast(c) => {
                    out.push(Node::TypeRef(&c.target_type));
                    out.push(Node::Expr(&c.expr));
                }
                Expr::InstanceOf(i) => {
                    out.push(Node::Expr(&i.expr));
                    out.push(Node::TypeRef(&i.target_type));
                }
                Expr::New(n) => {
                    out.push(Node::TypeRef(&n.target_type));
                    out.extend(n.arguments.iter().map(Node::Expr));
                }
                Expr::NewArray(n) => {
                    out.push(Node::TypeRef(&n.element_type));
                    out.push(Node::Expr(&n.size));
                }
            },
        }
        out
    }

    pub fn span(&self) -> Span {
        match *self {
            Node::Unit(u) => u.span,
            Node::Package(p) => p.span,
            Node::Import(i) => i.span,
            Node::Class(c) => c.span,
            Node::Interface(i) => i.span,
            Node::TypeRef(t) => t.span,
            Node::Field(f) => f.span,
            Node::Method(m) => m.span,
            Node::Constructor(c) => c.span,
            Node::Parameter(p) => p.span,
            Node::Block(b) => b.span,
            Node::Stmt(s) => match s {
                Stmt::Expression(es) => es.span,
                Stmt::LocalVar(v) => v.span,
                Stmt::If(i) => i.span,
                Stmt::While(w) => w.span,
                Stmt::For(f) => f.span,
                Stmt::Return(r) => r.span,
                Stmt::Block(b) => b.span,
                Stmt::Empty => Span::default(),
            },
            Node::Expr(e) => match e {
                Expr::Literal(l) => l.span,
                Expr::Name(n) => n.span,
                Expr::This(span) => *span,
                Expr::Binary(b) => b.span,
                Expr::Unary(u) => u.span,
                Expr::Assignment(a) => a.span,
                Expr::MethodCall(m) => m.span,
                Expr::FieldAccess(f) => f.span,
                Expr::ArrayAccess(a) => a.span,
                Expr::Cast(c) => c.span,
                Expr::InstanceOf(i) => i.span,
                Expr::New(n) => n.span,
                Expr::NewArray(n) => n.span,
            },
        }
    }
}

impl<'a> From<&'a CompilationUnit> for Node<'a> {
    fn from(unit: &'a CompilationUnit) -> Self {
        Node::Unit(unit)
    }
}

/// Whether the generic walk should descend into a node's children
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Walk {
    Continue,
    /// The visitor handled the subtree itself
    Skip,
}

/// Per-kind hooks for [`traverse`].
///
/// `enter` runs before a node's children (self-first order), `leave` after
/// them (children-first order). A pass overrides only the hook it needs.
pub trait Visitor<'a> {
    type Error;

    fn enter(&mut self, _node: Node<'a>) -> Result<Walk, Self::Error> {
        Ok(Walk::Continue)
    }

    fn leave(&mut self, _node: Node<'a>) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Depth-first walk: `enter`, children (unless skipped), `leave`.
pub fn traverse<'a, V>(node: Node<'a>, visitor: &mut V) -> Result<(), V::Error>
where
    V: Visitor<'a> + ?Sized,
{
    if visitor.enter(node)? == Walk::Continue {
        for child in node.children() {
            traverse(child, visitor)?;
        }
    }
    visitor.leave(node)
}
