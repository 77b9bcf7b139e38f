use super::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

// Package and Import Declarations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageDecl {
    pub name: String,
    #[serde(default)]
    pub span: Span,
}

impl fmt::Display for PackageDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "package {};", self.name)
    }
}

/// `import a.b.C;` or, with `is_wildcard`, `import a.b.*;` (name holds `a.b`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportDecl {
    pub name: String,
    #[serde(default)]
    pub is_wildcard: bool,
    #[serde(default)]
    pub span: Span,
}

impl ImportDecl {
    /// Last segment of a single-type import
    pub fn simple_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }
}

impl fmt::Display for ImportDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_wildcard {
            write!(f, "import {}.*;", self.name)
        } else {
            write!(f, "import {};", self.name)
        }
    }
}

// Type Declarations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TypeDecl {
    Class(ClassDecl),
    Interface(InterfaceDecl),
}

impl TypeDecl {
    pub fn name(&self) -> &str {
        match self {
            TypeDecl::Class(c) => &c.name,
            TypeDecl::Interface(i) => &i.name,
        }
    }

    pub fn modifiers(&self) -> &[Modifier] {
        match self {
            TypeDecl::Class(c) => &c.modifiers,
            TypeDecl::Interface(i) => &i.modifiers,
        }
    }

    pub fn is_interface(&self) -> bool {
        matches!(self, TypeDecl::Interface(_))
    }
}

impl fmt::Display for TypeDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDecl::Class(c) => write!(f, "{}", c),
            TypeDecl::Interface(i) => write!(f, "{}", i),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassDecl {
    #[serde(default)]
    pub modifiers: Vec<Modifier>,
    pub name: String,
    #[serde(default)]
    pub extends: Option<TypeRef>,
    #[serde(default)]
    pub implements: Vec<TypeRef>,
    #[serde(default)]
    pub body: Vec<ClassMember>,
    #[serde(default)]
    pub span: Span,
}

impl ClassDecl {
    pub fn methods(&self) -> impl Iterator<Item = &MethodDecl> {
        self.body.iter().filter_map(|m| match m {
            ClassMember::Method(m) => Some(m),
            _ => None,
        })
    }

    pub fn constructors(&self) -> impl Iterator<Item = &ConstructorDecl> {
        self.body.iter().filter_map(|m| match m {
            ClassMember::Constructor(c) => Some(c),
            _ => None,
        })
    }
}

impl fmt::Display for ClassDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "class {}", self.name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterfaceDecl {
    #[serde(default)]
    pub modifiers: Vec<Modifier>,
    pub name: String,
    #[serde(default)]
    pub extends: Vec<TypeRef>,
    #[serde(default)]
    pub body: Vec<MethodDecl>,
    #[serde(default)]
    pub span: Span,
}

impl fmt::Display for InterfaceDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "interface {}", self.name)
    }
}

// Modifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Modifier {
    Public,
    Protected,
    Abstract,
    Static,
    Final,
    Native,
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Modifier::Public => "public",
            Modifier::Protected => "protected",
            Modifier::Abstract => "abstract",
            Modifier::Static => "static",
            Modifier::Final => "final",
            Modifier::Native => "native",
        };
        f.write_str(s)
    }
}

// Type References
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeRef {
    pub name: String,
    #[serde(default)]
    pub is_array: bool,
    #[serde(default)]
    pub span: Span,
}

impl TypeRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), is_array: false, span: Span::default() }
    }

    pub fn array_of(name: impl Into<String>) -> Self {
        Self { name: name.into(), is_array: true, span: Span::default() }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_array {
            write!(f, "{}[]", self.name)
        } else {
            f.write_str(&self.name)
        }
    }
}

// Class Members
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ClassMember {
    Field(FieldDecl),
    Method(MethodDecl),
    Constructor(ConstructorDecl),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDecl {
    #[serde(default)]
    pub modifiers: Vec<Modifier>,
    pub type_ref: TypeRef,
    pub name: String,
    #[serde(default)]
    pub initializer: Option<Expr>,
    #[serde(default)]
    pub span: Span,
}

/// Method declaration; `return_type == None` means `void`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodDecl {
    #[serde(default)]
    pub modifiers: Vec<Modifier>,
    #[serde(default)]
    pub return_type: Option<TypeRef>,
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub body: Option<Block>,
    #[serde(default)]
    pub span: Span,
}

impl MethodDecl {
    pub fn has_modifier(&self, modifier: Modifier) -> bool {
        self.modifiers.contains(&modifier)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstructorDecl {
    #[serde(default)]
    pub modifiers: Vec<Modifier>,
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    pub body: Block,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    pub type_ref: TypeRef,
    pub name: String,
    #[serde(default)]
    pub span: Span,
}

impl Parameter {
    pub fn new(type_ref: TypeRef, name: impl Into<String>) -> Self {
        Self { type_ref, name: name.into(), span: Span::default() }
    }
}

// Statements
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Block {
    #[serde(default)]
    pub statements: Vec<Stmt>,
    #[serde(default)]
    pub span: Span,
}

impl Block {
    pub fn new(statements: Vec<Stmt>) -> Self {
        Self { statements, span: Span::default() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Stmt {
    Expression(ExprStmt),
    LocalVar(LocalVarDecl),
    If(IfStmt),
    While(WhileStmt),
    For(ForStmt),
    Return(ReturnStmt),
    Block(Block),
    Empty,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExprStmt {
    pub expr: Expr,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalVarDecl {
    pub type_ref: TypeRef,
    pub name: String,
    pub initializer: Expr,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IfStmt {
    pub condition: Expr,
    pub then_branch: Box<Stmt>,
    #[serde(default)]
    pub else_branch: Option<Box<Stmt>>,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhileStmt {
    pub condition: Expr,
    pub body: Box<Stmt>,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForStmt {
    #[serde(default)]
    pub init: Option<Box<Stmt>>,
    #[serde(default)]
    pub condition: Option<Expr>,
    #[serde(default)]
    pub update: Option<Expr>,
    pub body: Box<Stmt>,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnStmt {
    #[serde(default)]
    pub value: Option<Expr>,
    #[serde(default)]
    pub span: Span,
}

// Expressions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Expr {
    Literal(LiteralExpr),
    Name(NameExpr),
    This(Span),
    Binary(BinaryExpr),
    Unary(UnaryExpr),
    Assignment(AssignmentExpr),
    MethodCall(MethodCallExpr),
    FieldAccess(FieldAccessExpr),
    ArrayAccess(ArrayAccessExpr),
    Cast(CastExpr),
    InstanceOf(InstanceOfExpr),
    New(NewExpr),
    NewArray(NewArrayExpr),
}

impl Expr {
    pub fn int(value: i64) -> Self {
        Expr::Literal(LiteralExpr { value: Literal::Integer(value), span: Span::default() })
    }

    pub fn boolean(value: bool) -> Self {
        Expr::Literal(LiteralExpr { value: Literal::Boolean(value), span: Span::default() })
    }

    pub fn name(name: impl Into<String>) -> Self {
        Expr::Name(NameExpr { name: name.into(), span: Span::default() })
    }

    pub fn binary(left: Expr, operator: BinaryOp, right: Expr) -> Self {
        Expr::Binary(BinaryExpr {
            left: Box::new(left),
            operator,
            right: Box::new(right),
            span: Span::default(),
        })
    }

    pub fn unary(operator: UnaryOp, operand: Expr) -> Self {
        Expr::Unary(UnaryExpr { operator, operand: Box::new(operand), span: Span::default() })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiteralExpr {
    pub value: Literal,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Integer(i64),
    Boolean(bool),
    Char(char),
    String(String),
    Null,
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Integer(v) => write!(f, "{}", v),
            Literal::Boolean(v) => write!(f, "{}", v),
            Literal::Char(c) => write!(f, "{:?}", c),
            Literal::String(s) => write!(f, "{:?}", s),
            Literal::Null => f.write_str("null"),
        }
    }
}

/// Simple or qualified name in expression position (locals, parameters)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NameExpr {
    pub name: String,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinaryExpr {
    pub left: Box<Expr>,
    pub operator: BinaryOp,
    pub right: Box<Expr>,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    /// Eager `&`
    BitAnd,
    /// Eager `|`
    BitOr,
    /// Short-circuit `&&`
    And,
    /// Short-circuit `||`
    Or,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnaryExpr {
    pub operator: UnaryOp,
    pub operand: Box<Expr>,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Minus,
    Not,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnaryOp::Minus => f.write_str("-"),
            UnaryOp::Not => f.write_str("!"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentExpr {
    pub target: Box<Expr>,
    pub value: Box<Expr>,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodCallExpr {
    #[serde(default)]
    pub target: Option<Box<Expr>>,
    pub name: String,
    #[serde(default)]
    pub arguments: Vec<Expr>,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldAccessExpr {
    pub target: Box<Expr>,
    pub name: String,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArrayAccessExpr {
    pub array: Box<Expr>,
    pub index: Box<Expr>,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CastExpr {
    pub target_type: TypeRef,
    pub expr: Box<Expr>,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceOfExpr {
    pub expr: Box<Expr>,
    pub target_type: TypeRef,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewExpr {
    pub target_type: TypeRef,
    #[serde(default)]
    pub arguments: Vec<Expr>,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewArrayExpr {
    pub element_type: TypeRef,
    pub size: Box<Expr>,
    #[serde(default)]
    pub span: Span,
}
