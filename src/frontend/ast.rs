//! Abstract syntax tree for the Quasar surface language.
//!
//! The tree is a sum of three categories (declarations, statements,
//! expressions). Expressions carry an inferred [`Type`] slot that the
//! semantic analyzer fills in; the parser leaves it as [`Type::Unknown`].
//! Nodes are created by the parser, annotated by the analyzer, and walked
//! read-only by the emitter.

use crate::utils::location::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A complete compilation unit: one source file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Program {
    /// Top-level declarations and statements in source order
    pub items: Vec<Decl>,
    /// Path of the source file this unit came from
    pub file: String,
    /// Source span
    pub span: Span,
}

/// A type in the Quasar type universe.
///
/// The universe is closed: primitives, homogeneous lists, dicts with
/// hashable keys, nominal structs and enums, module namespaces, and
/// function signatures (symbol table only, never written in annotations).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Type {
    /// 64-bit signed integer
    Int,
    /// 64-bit float
    Float,
    /// Boolean
    Bool,
    /// String
    Str,
    /// Absence of value; also the element type of the empty list literal
    Void,
    /// Opaque type produced by Python-module member access
    Any,
    /// Homogeneous list `[T]`
    List(Box<Type>),
    /// Dict `Dict[K, V]`; key type restricted to int, str, bool
    Dict(Box<Type>, Box<Type>),
    /// Nominal reference to a declared struct
    Struct(String),
    /// Nominal reference to a declared enum
    Enum(String),
    /// Namespace produced by `import`
    Module(String),
    /// Function signature; only present in the symbol table
    Function(Vec<Type>, Box<Type>),
    /// Not yet analyzed
    Unknown,
}

impl Type {
    /// Create a list type.
    pub fn list_of(element: Type) -> Type {
        Type::List(Box::new(element))
    }

    /// Create a dict type.
    pub fn dict_of(key: Type, value: Type) -> Type {
        Type::Dict(Box::new(key), Box::new(value))
    }

    /// Check if this is a primitive type.
    pub fn is_primitive(&self) -> bool {
        matches!(self, Type::Int | Type::Float | Type::Bool | Type::Str)
    }

    /// Check if this type can appear as a positional `print` argument.
    pub fn is_printable(&self) -> bool {
        matches!(self, Type::Int | Type::Float | Type::Bool | Type::Str | Type::Any)
    }

    /// Check if this type may be used as a dict key.
    pub fn is_hashable_key(&self) -> bool {
        matches!(self, Type::Int | Type::Str | Type::Bool)
    }

    /// Check if this is a numeric type.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Int | Type::Float)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => write!(f, "int"),
            Type::Float => write!(f, "float"),
            Type::Bool => write!(f, "bool"),
            Type::Str => write!(f, "str"),
            Type::Void => write!(f, "void"),
            Type::Any => write!(f, "any"),
            Type::List(element) => write!(f, "[{}]", element),
            Type::Dict(key, value) => write!(f, "Dict[{}, {}]", key, value),
            Type::Struct(name) => write!(f, "{}", name),
            Type::Enum(name) => write!(f, "{}", name),
            Type::Module(name) => write!(f, "module {}", name),
            Type::Function(params, ret) => {
                write!(f, "fn(")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", p)?;
                }
                write!(f, ") -> {}", ret)
            }
            Type::Unknown => write!(f, "?"),
        }
    }
}

/// A top-level or block-level declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Decl {
    /// `let name: type = expr`
    Var(VarDecl),
    /// `const name: type = expr`
    Const(ConstDecl),
    /// `fn name(params) -> type { ... }`
    Fn(FnDecl),
    /// `struct Name { field: type, ... }`
    Struct(StructDecl),
    /// `enum Name { Variant, ... }`
    Enum(EnumDecl),
    /// `import ident` or `import "./path.qsr"`
    Import(ImportDecl),
    /// Any statement in declaration position
    Stmt(Stmt),
}

impl Decl {
    /// The source span of this declaration.
    pub fn span(&self) -> Span {
        match self {
            Decl::Var(d) => d.span,
            Decl::Const(d) => d.span,
            Decl::Fn(d) => d.span,
            Decl::Struct(d) => d.span,
            Decl::Enum(d) => d.span,
            Decl::Import(d) => d.span,
            Decl::Stmt(s) => s.span,
        }
    }
}

/// A variable declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarDecl {
    /// Variable name
    pub name: String,
    /// Declared type (mandatory)
    pub ty: Type,
    /// Initializer expression
    pub initializer: Expr,
    /// Source span
    pub span: Span,
}

/// A constant declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstDecl {
    /// Constant name
    pub name: String,
    /// Declared type (mandatory)
    pub ty: Type,
    /// Initializer expression
    pub initializer: Expr,
    /// Source span
    pub span: Span,
}

/// A function declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FnDecl {
    /// Function name
    pub name: String,
    /// Parameters, all explicitly typed
    pub params: Vec<Param>,
    /// Declared return type (mandatory; there are no void functions)
    pub return_type: Type,
    /// Function body
    pub body: Block,
    /// Source span
    pub span: Span,
}

/// A function parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Param {
    /// Parameter name
    pub name: String,
    /// Declared type
    pub ty: Type,
    /// Source span
    pub span: Span,
}

/// A struct declaration with an ordered field list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructDecl {
    /// Struct name
    pub name: String,
    /// Ordered fields
    pub fields: Vec<StructField>,
    /// Source span
    pub span: Span,
}

/// A single struct field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructField {
    /// Field name
    pub name: String,
    /// Declared type
    pub ty: Type,
    /// Source span
    pub span: Span,
}

/// An enum declaration with an ordered variant list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnumDecl {
    /// Enum name
    pub name: String,
    /// Ordered variants
    pub variants: Vec<EnumVariant>,
    /// Source span
    pub span: Span,
}

/// A single enum variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnumVariant {
    /// Variant name
    pub name: String,
    /// Source span
    pub span: Span,
}

/// An import declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportDecl {
    /// Module name (`math`) or quoted relative path (`./util.qsr`)
    pub module: String,
    /// True for quoted local-file imports
    pub is_local: bool,
    /// Source span
    pub span: Span,
}

impl ImportDecl {
    /// The module name this import binds: the identifier itself for
    /// Python imports, the file stem for local imports.
    pub fn binding_name(&self) -> String {
        if self.is_local {
            let path = self.module.trim_start_matches("./");
            let stem = path.strip_suffix(".qsr").unwrap_or(path);
            stem.rsplit('/').next().unwrap_or(stem).to_string()
        } else {
            self.module.clone()
        }
    }
}

/// A brace-delimited block. Blocks may contain nested declarations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    /// Declarations and statements in source order
    pub items: Vec<Decl>,
    /// Source span
    pub span: Span,
}

impl Block {
    /// Check if the block is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// A statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stmt {
    /// The kind of statement
    pub kind: StmtKind,
    /// Source span
    pub span: Span,
}

/// The kind of a statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StmtKind {
    /// Expression statement
    Expr(Expr),
    /// `print(args, sep=..., end=...)`
    Print(PrintStmt),
    /// Assignment to a name, index, or member target
    Assign {
        /// Left-hand side
        target: AssignTarget,
        /// Right-hand side
        value: Expr,
    },
    /// `if cond { ... } else { ... }`
    If {
        /// Condition (must be bool)
        condition: Expr,
        /// Then branch
        then_block: Block,
        /// Optional else branch
        else_block: Option<Block>,
    },
    /// `while cond { ... }`
    While {
        /// Condition (must be bool)
        condition: Expr,
        /// Loop body
        body: Block,
    },
    /// `for var in iterable { ... }`
    For {
        /// Fresh loop variable
        variable: String,
        /// A list or a range
        iterable: Expr,
        /// Loop body
        body: Block,
    },
    /// `return expr` (the expression is mandatory)
    Return(Expr),
    /// `break`
    Break,
    /// `continue`
    Continue,
    /// Nested block statement
    Block(Block),
}

/// A `print` statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrintStmt {
    /// Positional arguments (at least one required)
    pub arguments: Vec<Expr>,
    /// Optional `sep=` expression
    pub sep: Option<Expr>,
    /// Optional `end=` expression
    pub end: Option<Expr>,
}

impl PrintStmt {
    /// Number of real `{}` placeholders in a format string value.
    /// `{{` and `}}` escape to literal braces and do not count.
    pub fn placeholder_count(value: &str) -> usize {
        let stripped = value.replace("{{", "").replace("}}", "");
        stripped.matches("{}").count()
    }

    /// Whether this statement is in format mode: the first positional
    /// argument is a string literal containing at least one placeholder.
    pub fn is_format_mode(&self) -> bool {
        match self.arguments.first().map(|a| &a.kind) {
            Some(ExprKind::StringLit { value, .. }) => Self::placeholder_count(value) > 0,
            _ => false,
        }
    }
}

/// The left-hand side of an assignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AssignTarget {
    /// `x = ...`
    Name {
        /// Target variable name
        name: String,
        /// Source span
        span: Span,
    },
    /// `xs[i] = ...` or `d[k] = ...`
    Index {
        /// Indexed collection
        target: Expr,
        /// Index expression
        index: Expr,
        /// Source span
        span: Span,
    },
    /// `p.x = ...`
    Member {
        /// Receiver expression
        object: Expr,
        /// Field name
        field: String,
        /// Source span
        span: Span,
    },
}

impl AssignTarget {
    /// The source span of this target.
    pub fn span(&self) -> Span {
        match self {
            AssignTarget::Name { span, .. }
            | AssignTarget::Index { span, .. }
            | AssignTarget::Member { span, .. } => *span,
        }
    }
}

/// An expression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expr {
    /// The kind of expression
    pub kind: ExprKind,
    /// Inferred type, filled in during semantic analysis
    pub ty: Type,
    /// Source span
    pub span: Span,
}

impl Expr {
    /// Create a new expression with unknown type.
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self {
            kind,
            ty: Type::Unknown,
            span,
        }
    }

    /// Create an integer literal.
    pub fn int_lit(value: i64, span: Span) -> Self {
        Self::new(ExprKind::IntLit(value), span)
    }

    /// Create an identifier reference.
    pub fn ident(name: impl Into<String>, span: Span) -> Self {
        Self::new(ExprKind::Ident(name.into()), span)
    }
}

/// A single `name: value` entry in a struct initializer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldInit {
    /// Field name
    pub name: String,
    /// Field value
    pub value: Expr,
    /// Source span
    pub span: Span,
}

/// The kind of an expression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExprKind {
    /// Integer literal
    IntLit(i64),
    /// Float literal; the lexeme is kept so emission preserves `1.0`
    FloatLit {
        /// Parsed value
        value: f64,
        /// Verbatim source text
        lexeme: String,
    },
    /// String literal; the lexeme (with quotes and escapes) is kept for
    /// emission, the value for format-placeholder scanning
    StringLit {
        /// Unescaped value
        value: String,
        /// Verbatim source text including quotes
        lexeme: String,
    },
    /// Boolean literal
    BoolLit(bool),
    /// Identifier reference
    Ident(String),
    /// List literal `[a, b, c]`
    ListLit(Vec<Expr>),
    /// Dict literal `{k: v, ...}`
    DictLit(Vec<(Expr, Expr)>),
    /// Range `start..end`
    Range {
        /// Inclusive start
        start: Box<Expr>,
        /// Exclusive end
        end: Box<Expr>,
    },
    /// Binary operation
    Binary {
        /// Operator
        op: BinaryOp,
        /// Left operand
        left: Box<Expr>,
        /// Right operand
        right: Box<Expr>,
    },
    /// Unary operation
    Unary {
        /// Operator
        op: UnaryOp,
        /// Operand
        operand: Box<Expr>,
    },
    /// Function call `name(args)`
    Call {
        /// Called function name
        callee: String,
        /// Arguments
        args: Vec<Expr>,
    },
    /// Method call `recv.name(args)`
    MethodCall {
        /// Receiver expression
        receiver: Box<Expr>,
        /// Method name
        method: String,
        /// Arguments
        args: Vec<Expr>,
    },
    /// Member access `recv.field`
    Member {
        /// Receiver expression
        object: Box<Expr>,
        /// Field name
        field: String,
    },
    /// Index access `recv[index]`
    Index {
        /// Indexed collection
        target: Box<Expr>,
        /// Index expression
        index: Box<Expr>,
    },
    /// Struct initializer `Name { field: expr, ... }`
    StructInit {
        /// Struct name
        name: String,
        /// Field initializers in source order
        fields: Vec<FieldInit>,
    },
    /// Enum variant access `Color.Red`; produced by the analyzer when it
    /// reclassifies a member access whose receiver names a declared enum
    EnumVariant {
        /// Enum name
        enum_name: String,
        /// Variant name
        variant: String,
    },
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Mod,
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `&&`
    And,
    /// `||`
    Or,
}

impl BinaryOp {
    /// Check if this is an arithmetic operator.
    pub fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod
        )
    }

    /// Check if this is an equality operator.
    pub fn is_equality(&self) -> bool {
        matches!(self, BinaryOp::Eq | BinaryOp::Ne)
    }

    /// Check if this is an ordering operator.
    pub fn is_ordering(&self) -> bool {
        matches!(self, BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge)
    }

    /// Check if this is a logical operator.
    pub fn is_logical(&self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        };
        write!(f, "{}", s)
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    /// Negation `-x`
    Neg,
    /// Logical not `!x`
    Not,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnaryOp::Neg => write!(f, "-"),
            UnaryOp::Not => write!(f, "!"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_display() {
        assert_eq!(Type::Int.to_string(), "int");
        assert_eq!(Type::list_of(Type::Str).to_string(), "[str]");
        assert_eq!(
            Type::dict_of(Type::Str, Type::list_of(Type::Int)).to_string(),
            "Dict[str, [int]]"
        );
        assert_eq!(Type::Struct("Point".to_string()).to_string(), "Point");
    }

    #[test]
    fn test_hashable_keys() {
        assert!(Type::Int.is_hashable_key());
        assert!(Type::Str.is_hashable_key());
        assert!(Type::Bool.is_hashable_key());
        assert!(!Type::Float.is_hashable_key());
        assert!(!Type::list_of(Type::Int).is_hashable_key());
    }

    #[test]
    fn test_placeholder_count() {
        assert_eq!(PrintStmt::placeholder_count("x={}"), 1);
        assert_eq!(PrintStmt::placeholder_count("{} and {}"), 2);
        assert_eq!(PrintStmt::placeholder_count("{{}}"), 0);
        assert_eq!(PrintStmt::placeholder_count("{{{}}}"), 1);
        assert_eq!(PrintStmt::placeholder_count("no placeholders"), 0);
    }

    #[test]
    fn test_import_binding_name() {
        let local = ImportDecl {
            module: "./util.qsr".to_string(),
            is_local: true,
            span: Span::dummy(),
        };
        assert_eq!(local.binding_name(), "util");

        let python = ImportDecl {
            module: "math".to_string(),
            is_local: false,
            span: Span::dummy(),
        };
        assert_eq!(python.binding_name(), "math");
    }
}
